//! Schema resolution
//!
//! Builds the per-collection lookup from field key to declared type and
//! unit. A lookup is built fresh for every collection a request touches and
//! is read-only afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::field_type::FieldType;

/// Declared field of a collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub key: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Measurement unit for dimension/volume/weight fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl FieldSchema {
    pub fn new(key: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            key: key.into(),
            field_type,
            unit: None,
            name: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

/// Which store a collection's documents and overlays live in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    /// Entries and sections of a content collection
    Content,
    /// Items of a navigation menu
    Menu,
}

/// Identity of a collection within its store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionRef {
    pub kind: CollectionKind,
    pub id: String,
}

impl CollectionRef {
    pub fn content(id: impl Into<String>) -> Self {
        Self {
            kind: CollectionKind::Content,
            id: id.into(),
        }
    }

    pub fn menu(id: impl Into<String>) -> Self {
        Self {
            kind: CollectionKind::Menu,
            id: id.into(),
        }
    }
}

/// Schema-bearing collection, reduced to what projection needs
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionDefinition {
    pub id: String,
    pub kind: CollectionKind,
    pub fields: Vec<FieldSchema>,
    pub translations_enabled: bool,
}

impl CollectionDefinition {
    pub fn reference(&self) -> CollectionRef {
        CollectionRef {
            kind: self.kind,
            id: self.id.clone(),
        }
    }
}

/// Field key → schema lookup for one collection
#[derive(Debug, Clone, Default)]
pub struct SchemaLookup {
    fields: HashMap<String, FieldSchema>,
}

impl SchemaLookup {
    /// Build the lookup from a collection definition.
    ///
    /// When a key is declared twice the later declaration wins.
    pub fn resolve(definition: &CollectionDefinition) -> Self {
        Self::from_fields(&definition.fields)
    }

    pub fn from_fields(fields: &[FieldSchema]) -> Self {
        let fields = fields
            .iter()
            .map(|field| (field.key.clone(), field.clone()))
            .collect();
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&FieldSchema> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_from_wire_fields() {
        let fields: Vec<FieldSchema> = serde_json::from_value(json!([
            {"key": "title", "type": "plain", "name": "Title"},
            {"key": "height", "type": "dimension", "unit": "cm"},
            {"key": "gallery", "type": "list.file_reference"},
        ]))
        .unwrap();

        let definition = CollectionDefinition {
            id: "c1".to_string(),
            kind: CollectionKind::Content,
            fields,
            translations_enabled: true,
        };
        let lookup = SchemaLookup::resolve(&definition);

        assert_eq!(lookup.len(), 3);
        assert_eq!(lookup.get("height").unwrap().unit.as_deref(), Some("cm"));
        assert!(lookup.get("gallery").unwrap().field_type.is_file());
        assert!(lookup.get("missing").is_none());
    }

    #[test]
    fn test_later_declaration_wins() {
        let lookup = SchemaLookup::from_fields(&[
            FieldSchema::new("body", FieldType::Plain),
            FieldSchema::new("body", FieldType::RichText),
        ]);
        assert_eq!(lookup.get("body").unwrap().field_type, FieldType::RichText);
    }
}
