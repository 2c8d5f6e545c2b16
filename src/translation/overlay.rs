//! Translation overlay records

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;

use crate::projection::ProjectedDocument;

/// Kind of entity an overlay or reference targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    Entry,
    Section,
    Item,
    File,
    /// A content collection (target of menu references)
    Content,
    #[serde(other)]
    Unknown,
}

impl Subject {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Entry => "entry",
            Subject::Section => "section",
            Subject::Item => "item",
            Subject::File => "file",
            Subject::Content => "content",
            Subject::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the entity being localized
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectRef {
    pub subject: Subject,
    pub id: String,
}

impl SubjectRef {
    pub fn new(subject: Subject, id: impl Into<String>) -> Self {
        Self {
            subject,
            id: id.into(),
        }
    }
}

/// Per-language partial patch stored by the translation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationOverlay {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Entity id, or file id for file overlays
    #[serde(default)]
    pub subject_id: String,

    pub subject: Subject,

    /// Field key, set on file overlays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    pub lang: String,

    /// Field key → raw translated value
    #[serde(default)]
    pub value: Map<String, JsonValue>,
}

/// Overlays fetched for one subject
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlaySet {
    /// Entity-level overlays (entry, section, item)
    pub entity: Vec<TranslationOverlay>,
    /// File-level overlays for the subject's file keys
    pub files: Vec<TranslationOverlay>,
}

impl OverlaySet {
    /// Split a mixed overlay list (as returned by the bulk endpoint)
    pub fn partition(overlays: Vec<TranslationOverlay>) -> Self {
        let (files, entity): (Vec<_>, Vec<_>) = overlays
            .into_iter()
            .partition(|overlay| overlay.subject == Subject::File);
        Self { entity, files }
    }

    pub fn is_empty(&self) -> bool {
        self.entity.is_empty() && self.files.is_empty()
    }
}

/// Language code → localized document
pub type Localized = BTreeMap<String, ProjectedDocument>;
