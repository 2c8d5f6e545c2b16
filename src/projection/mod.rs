//! Field projection for frame-delivery
//!
//! Turns schema-described raw documents into API-shaped output. The flow for
//! one document is:
//!
//! ```text
//! CollectionDefinition ──► SchemaLookup
//!                               │
//! RawDocument ──► project_document ──► ProjectorRegistry (per field)
//!                               │
//!                               ▼
//!                  Projection { doc, file_keys }
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let schema = SchemaLookup::resolve(&definition);
//! let registry = ProjectorRegistry::with_defaults();
//! let projection = project_document(&entry.doc, &schema, &registry, &FieldSelection::all());
//! ```

pub mod color;
pub mod document;
pub mod field_type;
pub mod registry;
pub mod schema;

// Re-export main types
pub use color::{hex_to_rgb, Rgb};
pub use document::{
    project_document, FieldSelection, FieldValue, FileKeys, FileRef, ProjectedDocument,
    Projection, RawDocument, FILE_ATTRIBUTES,
};
pub use field_type::FieldType;
pub use registry::{FieldContext, Projector, ProjectorRegistry};
pub use schema::{CollectionDefinition, CollectionKind, CollectionRef, FieldSchema, SchemaLookup};
