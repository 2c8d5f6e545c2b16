//! Field projector registry
//!
//! Maps each [`FieldType`] to the function that shapes its raw value for
//! output. `list.<T>` fields are projected element-wise through the
//! projector of `T` unless a projector is registered for the list type
//! itself. Types without a projector pass through unchanged.
//!
//! Every projector is total: `null` always projects to `null`, and values of
//! an unexpected shape pass through instead of failing.

use serde_json::{json, Value as JsonValue};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::color::hex_to_rgb;
use super::document::{FieldValue, FileRef};
use super::field_type::FieldType;
use crate::rich_text;

/// Context available to a projector besides the raw value
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldContext<'a> {
    /// Unit declared on the field's schema entry
    pub unit: Option<&'a str>,
}

/// Projector function
pub type Projector = Arc<dyn Fn(&FieldContext<'_>, &JsonValue) -> FieldValue + Send + Sync>;

/// Strategy table from field type to projector
#[derive(Clone, Default)]
pub struct ProjectorRegistry {
    projectors: HashMap<FieldType, Projector>,
}

impl std::fmt::Debug for ProjectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<String> = self.projectors.keys().map(|t| t.to_string()).collect();
        types.sort();
        f.debug_struct("ProjectorRegistry")
            .field("types", &types)
            .finish()
    }
}

impl ProjectorRegistry {
    /// Registry without any projector; everything passes through
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in field types
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(FieldType::Plain, project_plain);
        registry.register(FieldType::RichText, project_rich_text);
        registry.register(FieldType::FileReference, project_file);
        registry.register(FieldType::Color, project_color);
        registry.register(FieldType::Dimension, project_measurement);
        registry.register(FieldType::Volume, project_measurement);
        registry.register(FieldType::Weight, project_measurement);
        registry
    }

    /// Register (or replace) the projector for a field type
    pub fn register<F>(&mut self, field_type: FieldType, projector: F)
    where
        F: Fn(&FieldContext<'_>, &JsonValue) -> FieldValue + Send + Sync + 'static,
    {
        self.projectors.insert(field_type, Arc::new(projector));
    }

    pub fn contains(&self, field_type: &FieldType) -> bool {
        self.projectors.contains_key(field_type)
    }

    /// Project a raw value. Never fails.
    pub fn project(&self, field_type: &FieldType, unit: Option<&str>, raw: &JsonValue) -> FieldValue {
        if raw.is_null() {
            return FieldValue::null();
        }

        let context = FieldContext { unit };

        if let Some(projector) = self.projectors.get(field_type) {
            return projector(&context, raw);
        }

        match (field_type, raw) {
            (FieldType::List(inner), JsonValue::Array(items)) => FieldValue::List(
                items
                    .iter()
                    .map(|item| self.project(inner, unit, item))
                    .collect(),
            ),
            (FieldType::List(_), _) => FieldValue::Json(raw.clone()),
            _ => {
                debug!("No projector for field type '{}', passing through", field_type);
                FieldValue::Json(raw.clone())
            }
        }
    }
}

fn project_plain(_: &FieldContext<'_>, raw: &JsonValue) -> FieldValue {
    FieldValue::Json(raw.clone())
}

fn project_rich_text(_: &FieldContext<'_>, raw: &JsonValue) -> FieldValue {
    match raw.as_str() {
        Some(html) => FieldValue::Json(json!({
            "html": html,
            "nodes": rich_text::parse(html),
        })),
        None => FieldValue::Json(raw.clone()),
    }
}

fn project_file(_: &FieldContext<'_>, raw: &JsonValue) -> FieldValue {
    match raw.as_object() {
        Some(object) => FieldValue::File(FileRef::from_raw(object)),
        None => FieldValue::Json(raw.clone()),
    }
}

fn project_color(_: &FieldContext<'_>, raw: &JsonValue) -> FieldValue {
    let rgb = raw.as_str().and_then(hex_to_rgb);
    FieldValue::Json(json!({
        "hex": raw,
        "rgb": rgb,
    }))
}

fn project_measurement(context: &FieldContext<'_>, raw: &JsonValue) -> FieldValue {
    FieldValue::Json(json!({
        "value": raw,
        "unit": context.unit,
    }))
}
