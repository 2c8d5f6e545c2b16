//! Hierarchical materialization
//!
//! Section trees and menu trees are built one level at a time. Each level is
//! fetched, projected and localized before its children are requested, and
//! recursion stops when no depth is left or a level comes back empty.
//!
//! Recursion state is passed explicitly ([`RecursionState`]). A menu item that
//! references a content collection swaps in that collection's section
//! [`Branch`], so everything below it is fetched, projected and localized as
//! sections of the referenced content.

mod materializer;

use serde::Serialize;
use std::sync::Arc;

use crate::projection::{CollectionRef, ProjectedDocument, SchemaLookup};
use crate::translation::{Localized, Subject};
use crate::upstream::{ContentDefinition, MenuDefinition};

pub use materializer::{Materializer, TreeLevel};

/// One materialized section or menu item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Set on menu items: whether the item references another collection
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<bool>,

    pub doc: ProjectedDocument,

    pub localized: Localized,

    pub children: Vec<TreeNode>,
}

/// Where a level's documents come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchSource {
    /// Sections of a content collection
    Sections,
    /// Items of a menu
    Items,
}

/// Everything needed to build nodes of one collection's tree
#[derive(Debug, Clone)]
pub struct Branch {
    pub source: BranchSource,
    pub collection: CollectionRef,
    pub schema: SchemaLookup,
    /// Overlay subject of this branch's nodes
    pub subject: Subject,
    pub translations_enabled: bool,
}

impl Branch {
    pub fn sections(content: &ContentDefinition) -> Self {
        let definition = content.section_collection();
        Self {
            source: BranchSource::Sections,
            collection: definition.reference(),
            schema: SchemaLookup::resolve(&definition),
            subject: Subject::Section,
            translations_enabled: definition.translations_enabled,
        }
    }

    pub fn items(menu: &MenuDefinition) -> Self {
        let definition = menu.item_collection();
        Self {
            source: BranchSource::Items,
            collection: definition.reference(),
            schema: SchemaLookup::resolve(&definition),
            subject: Subject::Item,
            translations_enabled: definition.translations_enabled,
        }
    }
}

/// Recursion state for one level of a tree
#[derive(Debug, Clone)]
pub struct RecursionState {
    /// Levels still allowed, this one included
    pub depth_remaining: u32,
    /// Parent node of this level; `None` is the branch root
    pub parent_id: Option<String>,
    pub branch: Arc<Branch>,
}

impl RecursionState {
    pub fn root(branch: Branch, depth: u32) -> Self {
        Self {
            depth_remaining: depth,
            parent_id: None,
            branch: Arc::new(branch),
        }
    }

    pub fn with_parent(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// State for the children of `parent_id` in the same branch
    pub fn child(&self, parent_id: &str) -> Self {
        Self {
            depth_remaining: self.depth_remaining.saturating_sub(1),
            parent_id: Some(parent_id.to_string()),
            branch: self.branch.clone(),
        }
    }

    /// State for the root of another collection's branch one level down
    pub fn enter(&self, branch: Branch) -> Self {
        Self {
            depth_remaining: self.depth_remaining.saturating_sub(1),
            parent_id: None,
            branch: Arc::new(branch),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.depth_remaining == 0
    }
}
