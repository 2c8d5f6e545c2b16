//! Field type names as declared by collection schemas
//!
//! Schemas name types with plain strings (`rich_text`, `list.color`, ...).
//! Parsing never fails: anything unrecognised becomes [`FieldType::Custom`],
//! which projects as plain passthrough unless a projector was registered for
//! it.

use serde::{Deserialize, Serialize};
use std::fmt;

const LIST_PREFIX: &str = "list.";

/// Type of a declared field
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Plain,
    RichText,
    FileReference,
    Color,
    Dimension,
    Volume,
    Weight,
    /// `list.<inner>` - element-wise projection of the inner type
    List(Box<FieldType>),
    /// Any type name this crate has no built-in projector for
    Custom(String),
}

impl FieldType {
    /// Parse a schema type name
    pub fn parse(name: &str) -> Self {
        if let Some(inner) = name.strip_prefix(LIST_PREFIX) {
            return FieldType::List(Box::new(FieldType::parse(inner)));
        }

        match name {
            "plain" => FieldType::Plain,
            "rich_text" => FieldType::RichText,
            "file_reference" => FieldType::FileReference,
            "color" => FieldType::Color,
            "dimension" => FieldType::Dimension,
            "volume" => FieldType::Volume,
            "weight" => FieldType::Weight,
            other => FieldType::Custom(other.to_string()),
        }
    }

    /// Fields of this type hold file references whose overlays are keyed by file id
    pub fn is_file(&self) -> bool {
        match self {
            FieldType::FileReference => true,
            FieldType::List(inner) => inner.is_file(),
            _ => false,
        }
    }

    /// Measurement types carry the schema's unit next to the raw value
    pub fn is_measurement(&self) -> bool {
        matches!(
            self,
            FieldType::Dimension | FieldType::Volume | FieldType::Weight
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Plain => write!(f, "plain"),
            FieldType::RichText => write!(f, "rich_text"),
            FieldType::FileReference => write!(f, "file_reference"),
            FieldType::Color => write!(f, "color"),
            FieldType::Dimension => write!(f, "dimension"),
            FieldType::Volume => write!(f, "volume"),
            FieldType::Weight => write!(f, "weight"),
            FieldType::List(inner) => write!(f, "{LIST_PREFIX}{inner}"),
            FieldType::Custom(name) => write!(f, "{name}"),
        }
    }
}

impl From<String> for FieldType {
    fn from(name: String) -> Self {
        FieldType::parse(&name)
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        field_type.to_string()
    }
}
