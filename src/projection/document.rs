//! Projected documents
//!
//! A raw document is a loose key → JSON mapping. Projection walks it against
//! the collection schema and produces a [`ProjectedDocument`] whose values are
//! shaped by their field type. File references keep their id internally so
//! file-level overlays can find them, but the id is never serialized.

use serde::ser::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::registry::ProjectorRegistry;
use super::schema::SchemaLookup;

/// File attributes exposed in output and patchable by overlays
pub const FILE_ATTRIBUTES: [&str; 5] = ["width", "height", "contentType", "src", "alt"];

/// Raw stored document
pub type RawDocument = Map<String, JsonValue>;

/// Keys of file-valued fields found while projecting a document
pub type FileKeys = BTreeSet<String>;

/// Projected file reference
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileRef {
    id: Option<String>,
    attributes: Map<String, JsonValue>,
}

impl FileRef {
    /// Project a stored file object, keeping only the public attributes
    pub fn from_raw(raw: &Map<String, JsonValue>) -> Self {
        let id = raw.get("id").and_then(|id| match id {
            JsonValue::String(s) => Some(s.clone()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        });

        let attributes = FILE_ATTRIBUTES
            .iter()
            .filter_map(|key| raw.get(*key).map(|v| (key.to_string(), v.clone())))
            .collect();

        Self { id, attributes }
    }

    /// Stored file id, used for identity matching only
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn get(&self, attribute: &str) -> Option<&JsonValue> {
        self.attributes.get(attribute)
    }

    /// Shallow-merge an overlay patch. Only public attributes are taken; the id never changes.
    pub fn patch(&mut self, patch: &Map<String, JsonValue>) {
        for key in FILE_ATTRIBUTES {
            if let Some(value) = patch.get(key) {
                self.attributes.insert(key.to_string(), value.clone());
            }
        }
    }
}

impl Serialize for FileRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.attributes.serialize(serializer)
    }
}

/// Projected value of one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Single file reference
    File(FileRef),
    /// Element-wise projection of a `list.*` field
    List(Vec<FieldValue>),
    /// Any other projected shape
    Json(JsonValue),
}

impl FieldValue {
    pub fn null() -> Self {
        FieldValue::Json(JsonValue::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Json(JsonValue::Null))
    }

    /// Locate a file by its stored id, directly or inside a list
    pub fn file_mut(&mut self, file_id: &str) -> Option<&mut FileRef> {
        match self {
            FieldValue::File(file) if file.id() == Some(file_id) => Some(file),
            FieldValue::List(items) => items.iter_mut().find_map(|item| match item {
                FieldValue::File(file) if file.id() == Some(file_id) => Some(file),
                _ => None,
            }),
            _ => None,
        }
    }

    /// Ids of every file held by this value, in order
    pub fn file_ids(&self) -> Vec<&str> {
        match self {
            FieldValue::File(file) => file.id().into_iter().collect(),
            FieldValue::List(items) => items.iter().flat_map(|item| item.file_ids()).collect(),
            FieldValue::Json(_) => Vec::new(),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::File(file) => file.serialize(serializer),
            FieldValue::List(items) => items.serialize(serializer),
            FieldValue::Json(value) => value.serialize(serializer),
        }
    }
}

impl From<JsonValue> for FieldValue {
    fn from(value: JsonValue) -> Self {
        FieldValue::Json(value)
    }
}

/// Document projected through its collection schema
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectedDocument {
    fields: BTreeMap<String, FieldValue>,
}

impl ProjectedDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        self.fields.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut FieldValue> {
        self.fields.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Serialized form, as sent to callers
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

impl Serialize for ProjectedDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Optional restriction of which fields are projected
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSelection {
    keys: Option<BTreeSet<String>>,
}

impl FieldSelection {
    /// Every field
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse a comma-separated key list; empty input selects every field
    pub fn parse(list: Option<&str>) -> Self {
        let keys: BTreeSet<String> = list
            .unwrap_or("")
            .split(',')
            .map(|key| key.trim())
            .filter(|key| !key.is_empty())
            .map(|key| key.to_string())
            .collect();

        if keys.is_empty() {
            Self::all()
        } else {
            Self { keys: Some(keys) }
        }
    }

    pub fn allows(&self, key: &str) -> bool {
        match &self.keys {
            Some(keys) => keys.contains(key),
            None => true,
        }
    }
}

/// Result of projecting one raw document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub doc: ProjectedDocument,
    /// Non-null file-valued fields, which need file-level overlay lookups
    pub file_keys: FileKeys,
}

/// Project a raw document through its schema.
///
/// Keys without a schema entry, or outside the selection, are skipped.
pub fn project_document(
    raw: &RawDocument,
    schema: &SchemaLookup,
    registry: &ProjectorRegistry,
    selection: &FieldSelection,
) -> Projection {
    let mut projection = Projection::default();

    for (key, value) in raw {
        if !selection.allows(key) {
            continue;
        }

        let Some(field) = schema.get(key) else {
            debug!("Skipping field '{}' with no schema entry", key);
            continue;
        };

        let projected = registry.project(&field.field_type, field.unit.as_deref(), value);

        if field.field_type.is_file() && !projected.is_null() {
            projection.file_keys.insert(key.clone());
        }

        projection.doc.insert(key.clone(), projected);
    }

    projection
}
