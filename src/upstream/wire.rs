//! Wire types exchanged with the upstream services

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::projection::{CollectionDefinition, CollectionKind, FieldSchema, RawDocument};
use crate::translation::Subject;

/// Field declarations of one document kind within a collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldContainer {
    /// Only meaningful for section trees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationSettings {
    #[serde(default)]
    pub enabled: bool,
}

/// Content collection as stored by the content service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDefinition {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub code: String,

    #[serde(default)]
    pub entries: FieldContainer,

    #[serde(default)]
    pub sections: FieldContainer,

    #[serde(default)]
    pub translations: TranslationSettings,
}

impl ContentDefinition {
    /// Schema of the collection's entries
    pub fn entry_collection(&self) -> CollectionDefinition {
        CollectionDefinition {
            id: self.id.clone(),
            kind: CollectionKind::Content,
            fields: self.entries.fields.clone(),
            translations_enabled: self.translations.enabled,
        }
    }

    /// Schema of the collection's section tree
    pub fn section_collection(&self) -> CollectionDefinition {
        CollectionDefinition {
            id: self.id.clone(),
            kind: CollectionKind::Content,
            fields: self.sections.fields.clone(),
            translations_enabled: self.translations.enabled,
        }
    }
}

/// Navigation menu as stored by the menu service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuDefinition {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub code: String,

    #[serde(default)]
    pub items: FieldContainer,

    #[serde(default)]
    pub translations: TranslationSettings,
}

impl MenuDefinition {
    pub fn item_collection(&self) -> CollectionDefinition {
        CollectionDefinition {
            id: self.id.clone(),
            kind: CollectionKind::Menu,
            fields: self.items.fields.clone(),
            translations_enabled: self.translations.enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntry {
    pub id: String,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub doc: RawDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSection {
    pub id: String,

    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub doc: RawDocument,
}

/// Menu item; `subject`/`subjectId` make it a reference to another collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItem {
    pub id: String,

    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub doc: RawDocument,

    #[serde(default)]
    pub subject: Option<Subject>,

    #[serde(default)]
    pub subject_id: Option<String>,
}

/// One level of a section tree, with the parent section when the store knows it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionPage {
    #[serde(default)]
    pub sections: Vec<RawSection>,

    #[serde(default)]
    pub parent: Option<RawSection>,
}

/// Paging and filter parameters for document fetches
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentQuery {
    pub limit: u32,
    pub page: u32,
    pub since_id: Option<String>,
    pub ids: Vec<String>,
    pub parent_id: Option<String>,
    pub section_code: Option<String>,
    /// Extra filter parameters passed through verbatim
    pub filters: BTreeMap<String, String>,
}

impl Default for DocumentQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            page: 1,
            since_id: None,
            ids: Vec::new(),
            parent_id: None,
            section_code: None,
            filters: BTreeMap::new(),
        }
    }
}

impl DocumentQuery {
    pub fn page(limit: u32, page: u32) -> Self {
        Self {
            limit,
            page,
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = parent_id;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Language {
    pub code: String,

    #[serde(default)]
    pub primary: bool,
}

/// Project settings relevant to delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub languages: Vec<Language>,
}

impl ProjectInfo {
    pub fn language_codes(&self) -> Vec<String> {
        self.languages.iter().map(|l| l.code.clone()).collect()
    }
}
