//! Upstream collaborators
//!
//! The delivery core never talks to storage directly. It goes through four
//! narrow traits, one per upstream concern:
//!
//! - [`ContentStore`]: content definitions, entries and sections
//! - [`MenuStore`]: menu definitions and items
//! - [`OverlayStore`]: translation overlays for contents and menus
//! - [`ProjectStore`]: project settings (languages)
//!
//! [`HttpUpstream`] implements all four against the JSON services. Tests
//! plug in in-memory stores instead.

pub mod client;
pub mod wire;

use async_trait::async_trait;
use std::sync::Arc;

use crate::projection::CollectionRef;
use crate::translation::{SubjectRef, TranslationOverlay};
use crate::types::{DeliveryError, Result};

pub use crate::context::Scope;
pub use client::{HttpUpstream, UpstreamConfig};
pub use wire::{
    ContentDefinition, DocumentQuery, FieldContainer, Language, MenuDefinition, ProjectInfo,
    RawEntry, RawItem, RawSection, SectionPage, TranslationSettings,
};

/// Content definitions and their documents
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Content definitions matching `code`; the first one is used
    async fn find_contents(&self, scope: &Scope, code: &str) -> Result<Vec<ContentDefinition>>;

    async fn get_content(&self, scope: &Scope, content_id: &str) -> Result<ContentDefinition>;

    async fn list_entries(
        &self,
        scope: &Scope,
        content_id: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<RawEntry>>;

    /// One level of the section tree under `query.parent_id`
    async fn list_sections(
        &self,
        scope: &Scope,
        content_id: &str,
        query: &DocumentQuery,
    ) -> Result<SectionPage>;
}

/// Navigation menus and their items
#[async_trait]
pub trait MenuStore: Send + Sync {
    async fn find_menus(&self, scope: &Scope, code: &str) -> Result<Vec<MenuDefinition>>;

    /// One level of the item tree under `query.parent_id`
    async fn list_items(
        &self,
        scope: &Scope,
        menu_id: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<RawItem>>;
}

/// Translation overlays
#[async_trait]
pub trait OverlayStore: Send + Sync {
    /// Entity-level overlays of one entry, section or item
    async fn subject_overlays(
        &self,
        scope: &Scope,
        collection: &CollectionRef,
        subject: &SubjectRef,
    ) -> Result<Vec<TranslationOverlay>>;

    /// File-level overlays scoped to one field key
    async fn file_overlays(
        &self,
        scope: &Scope,
        collection: &CollectionRef,
        key: &str,
    ) -> Result<Vec<TranslationOverlay>>;

    /// Whether [`OverlayStore::batch_overlays`] is available for this collection
    fn supports_batch(&self, _collection: &CollectionRef) -> bool {
        false
    }

    /// Entity and file overlays for a whole page of entries in one call
    async fn batch_overlays(
        &self,
        _scope: &Scope,
        collection: &CollectionRef,
        _entry_ids: &[String],
        _file_ids: &[String],
    ) -> Result<Vec<TranslationOverlay>> {
        Err(DeliveryError::TranslationFetchFailed(format!(
            "bulk overlays not supported for collection {}",
            collection.id
        )))
    }
}

/// Project settings
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn get_project(&self, scope: &Scope) -> Result<ProjectInfo>;
}

/// The set of collaborators one delivery instance works against
#[derive(Clone)]
pub struct Upstream {
    pub contents: Arc<dyn ContentStore>,
    pub menus: Arc<dyn MenuStore>,
    pub overlays: Arc<dyn OverlayStore>,
    pub projects: Arc<dyn ProjectStore>,
}

impl Upstream {
    /// Use one HTTP client for every collaborator
    pub fn http(client: HttpUpstream) -> Self {
        let client = Arc::new(client);
        Self {
            contents: client.clone(),
            menus: client.clone(),
            overlays: client.clone(),
            projects: client,
        }
    }
}
