//! Overlay merging
//!
//! Applies fetched overlays on top of a projected base document:
//!
//! 1. Every requested language starts from a clone of the base document.
//! 2. Entity overlays matching the subject replace fields, re-projected
//!    through the field's type so translated values get the same shape.
//! 3. File overlays scoped to a recorded file key are shallow-merged onto
//!    the file whose stored id equals the overlay's `subjectId`, whether the
//!    field holds a single file or a list. Other files stay untouched.
//!
//! Merging is pure: the base document is only read.

use tracing::debug;

use super::overlay::{Localized, OverlaySet, Subject, SubjectRef, TranslationOverlay};
use crate::projection::{FieldSelection, FileKeys, ProjectedDocument, ProjectorRegistry, SchemaLookup};

/// Merges overlays for documents of one collection
#[derive(Debug, Clone, Copy)]
pub struct Merger<'a> {
    schema: &'a SchemaLookup,
    registry: &'a ProjectorRegistry,
    selection: &'a FieldSelection,
}

impl<'a> Merger<'a> {
    pub fn new(
        schema: &'a SchemaLookup,
        registry: &'a ProjectorRegistry,
        selection: &'a FieldSelection,
    ) -> Self {
        Self {
            schema,
            registry,
            selection,
        }
    }

    /// Build the localized documents for `languages` plus any language an overlay carries
    pub fn merge(
        &self,
        base: &ProjectedDocument,
        file_keys: &FileKeys,
        subject: &SubjectRef,
        languages: &[String],
        overlays: &OverlaySet,
    ) -> Localized {
        let mut localized: Localized = languages
            .iter()
            .map(|lang| (lang.clone(), base.clone()))
            .collect();

        for overlay in overlays.entity.iter().filter(|o| applies_to(o, subject)) {
            let doc = localized
                .entry(overlay.lang.clone())
                .or_insert_with(|| base.clone());
            self.apply_entity_overlay(doc, overlay);
        }

        for overlay in &overlays.files {
            if overlay.subject != Subject::File {
                continue;
            }
            let Some(key) = overlay.key.as_deref() else {
                continue;
            };
            // File overlays are fetched per key for the whole collection, so single files match by id too
            if !file_keys.contains(key) || !holds_file(base, key, &overlay.subject_id) {
                continue;
            }

            let doc = localized
                .entry(overlay.lang.clone())
                .or_insert_with(|| base.clone());
            apply_file_overlay(doc, key, overlay);
        }

        localized
    }

    fn apply_entity_overlay(&self, doc: &mut ProjectedDocument, overlay: &TranslationOverlay) {
        for (key, value) in &overlay.value {
            if !self.selection.allows(key) {
                continue;
            }
            let Some(field) = self.schema.get(key) else {
                debug!(
                    "Ignoring overlay field '{}' with no schema entry ({} {})",
                    key, overlay.subject, overlay.subject_id
                );
                continue;
            };

            let projected = self
                .registry
                .project(&field.field_type, field.unit.as_deref(), value);
            doc.insert(key.clone(), projected);
        }
    }
}

fn applies_to(overlay: &TranslationOverlay, subject: &SubjectRef) -> bool {
    overlay.subject == subject.subject && overlay.subject_id == subject.id
}

fn holds_file(doc: &ProjectedDocument, key: &str, file_id: &str) -> bool {
    doc.get(key)
        .map(|value| value.file_ids().contains(&file_id))
        .unwrap_or(false)
}

fn apply_file_overlay(doc: &mut ProjectedDocument, key: &str, overlay: &TranslationOverlay) {
    let Some(value) = doc.get_mut(key) else {
        return;
    };

    match value.file_mut(&overlay.subject_id) {
        Some(file) => file.patch(&overlay.value),
        None => debug!(
            "File overlay {} for '{}' matches no file in document",
            overlay.subject_id, key
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{project_document, FieldSchema, FieldType, RawDocument};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value as JsonValue};

    fn raw(value: JsonValue) -> RawDocument {
        value.as_object().cloned().unwrap()
    }

    fn overlays(value: JsonValue) -> Vec<TranslationOverlay> {
        serde_json::from_value(value).unwrap()
    }

    fn schema() -> SchemaLookup {
        SchemaLookup::from_fields(&[
            FieldSchema::new("title", FieldType::Plain),
            FieldSchema::new("body", FieldType::RichText),
            FieldSchema::new("tint", FieldType::Color),
            FieldSchema::new("cover", FieldType::FileReference),
            FieldSchema::new("gallery", FieldType::parse("list.file_reference")),
        ])
    }

    fn langs(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_entity_overlay_and_identity_language() {
        let schema = schema();
        let registry = ProjectorRegistry::with_defaults();
        let selection = FieldSelection::all();
        let merger = Merger::new(&schema, &registry, &selection);

        let base = project_document(&raw(json!({"title": "Hello"})), &schema, &registry, &selection);
        let set = OverlaySet {
            entity: overlays(json!([
                {"subjectId": "e1", "subject": "entry", "lang": "fr", "value": {"title": "Bonjour"}},
                {"subjectId": "e2", "subject": "entry", "lang": "fr", "value": {"title": "Autre"}},
                {"subjectId": "e1", "subject": "section", "lang": "fr", "value": {"title": "Mauvais"}},
            ])),
            files: vec![],
        };

        let localized = merger.merge(
            &base.doc,
            &base.file_keys,
            &SubjectRef::new(Subject::Entry, "e1"),
            &langs(&["fr", "de"]),
            &set,
        );

        assert_eq!(localized["fr"].to_json(), json!({"title": "Bonjour"}));
        assert_eq!(localized["de"], base.doc);
        assert_eq!(base.doc.to_json(), json!({"title": "Hello"}));
    }

    #[test]
    fn test_overlay_values_are_reprojected() {
        let schema = schema();
        let registry = ProjectorRegistry::with_defaults();
        let selection = FieldSelection::all();
        let merger = Merger::new(&schema, &registry, &selection);

        let base = project_document(&raw(json!({"title": "x"})), &schema, &registry, &selection);
        let set = OverlaySet {
            entity: overlays(json!([{
                "subjectId": "s1", "subject": "section", "lang": "fr",
                "value": {"body": "<p>Salut</p>", "tint": "#000", "unknown": 1}
            }])),
            files: vec![],
        };

        let localized = merger.merge(
            &base.doc,
            &base.file_keys,
            &SubjectRef::new(Subject::Section, "s1"),
            &[],
            &set,
        );
        let fr = localized["fr"].to_json();

        assert_eq!(fr["body"]["html"], json!("<p>Salut</p>"));
        assert_eq!(fr["body"]["nodes"][0]["type"], json!("P"));
        assert_eq!(fr["tint"], json!({"hex": "#000", "rgb": {"r": 0, "g": 0, "b": 0}}));
        assert!(fr.get("unknown").is_none());
    }

    #[test]
    fn test_file_list_overlay_matches_by_id() {
        let schema = schema();
        let registry = ProjectorRegistry::with_defaults();
        let selection = FieldSelection::all();
        let merger = Merger::new(&schema, &registry, &selection);

        let base = project_document(
            &raw(json!({"gallery": [{"id": "f1", "alt": "a"}, {"id": "f2", "alt": "b"}]})),
            &schema,
            &registry,
            &selection,
        );
        let set = OverlaySet {
            entity: vec![],
            files: overlays(json!([
                {"subjectId": "f1", "subject": "file", "key": "gallery", "lang": "fr", "value": {"alt": "texte"}},
                {"subjectId": "f9", "subject": "file", "key": "gallery", "lang": "fr", "value": {"alt": "nope"}},
            ])),
        };

        let localized = merger.merge(
            &base.doc,
            &base.file_keys,
            &SubjectRef::new(Subject::Entry, "e1"),
            &langs(&["fr"]),
            &set,
        );

        let gallery = localized["fr"].get("gallery").unwrap();
        assert_eq!(gallery.file_ids(), vec!["f1", "f2"]);
        assert_eq!(
            localized["fr"].to_json(),
            json!({"gallery": [{"alt": "texte"}, {"alt": "b"}]})
        );
        assert_eq!(
            base.doc.to_json(),
            json!({"gallery": [{"alt": "a"}, {"alt": "b"}]})
        );
    }

    #[test]
    fn test_single_file_overlay() {
        let schema = schema();
        let registry = ProjectorRegistry::with_defaults();
        let selection = FieldSelection::all();
        let merger = Merger::new(&schema, &registry, &selection);

        let base = project_document(
            &raw(json!({"cover": {"id": "f1", "src": "a.png", "alt": "a"}})),
            &schema,
            &registry,
            &selection,
        );
        let set = OverlaySet {
            entity: vec![],
            files: overlays(json!([
                {"subjectId": "f1", "subject": "file", "key": "cover", "lang": "es", "value": {"alt": "imagen"}},
                {"subjectId": "f1", "subject": "file", "key": "other", "lang": "es", "value": {"alt": "x"}},
            ])),
        };

        let localized = merger.merge(
            &base.doc,
            &base.file_keys,
            &SubjectRef::new(Subject::Entry, "e1"),
            &[],
            &set,
        );

        assert_eq!(
            localized["es"].to_json(),
            json!({"cover": {"src": "a.png", "alt": "imagen"}})
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let schema = schema();
        let registry = ProjectorRegistry::with_defaults();
        let selection = FieldSelection::all();
        let merger = Merger::new(&schema, &registry, &selection);

        let base = project_document(
            &raw(json!({"title": "Hello", "gallery": [{"id": "f1", "alt": "a"}]})),
            &schema,
            &registry,
            &selection,
        );
        let set = OverlaySet {
            entity: overlays(json!([
                {"subjectId": "e1", "subject": "entry", "lang": "fr", "value": {"title": "Bonjour"}}
            ])),
            files: overlays(json!([
                {"subjectId": "f1", "subject": "file", "key": "gallery", "lang": "fr", "value": {"alt": "texte"}}
            ])),
        };
        let subject = SubjectRef::new(Subject::Entry, "e1");

        let first = merger.merge(&base.doc, &base.file_keys, &subject, &langs(&["fr"]), &set);
        let second = merger.merge(&base.doc, &base.file_keys, &subject, &langs(&["fr"]), &set);

        assert_eq!(first, second);
    }

    #[test]
    fn test_selection_filters_overlay_fields() {
        let schema = schema();
        let registry = ProjectorRegistry::with_defaults();
        let selection = FieldSelection::parse(Some("title"));
        let merger = Merger::new(&schema, &registry, &selection);

        let base = project_document(&raw(json!({"title": "Hi", "tint": "#fff"})), &schema, &registry, &selection);
        let set = OverlaySet {
            entity: overlays(json!([
                {"subjectId": "e1", "subject": "entry", "lang": "fr", "value": {"title": "Salut", "tint": "#000"}}
            ])),
            files: vec![],
        };

        let localized = merger.merge(
            &base.doc,
            &base.file_keys,
            &SubjectRef::new(Subject::Entry, "e1"),
            &[],
            &set,
        );
        assert_eq!(localized["fr"].to_json(), json!({"title": "Salut"}));
    }

    #[test]
    fn test_unmatched_file_overlay_adds_no_language() {
        let schema = schema();
        let registry = ProjectorRegistry::with_defaults();
        let selection = FieldSelection::all();
        let merger = Merger::new(&schema, &registry, &selection);

        let base = project_document(&raw(json!({"cover": {"id": "f1"}})), &schema, &registry, &selection);
        let set = OverlaySet {
            entity: vec![],
            files: overlays(json!([
                {"subjectId": "f7", "subject": "file", "key": "cover", "lang": "it", "value": {"alt": "altro"}}
            ])),
        };

        let localized = merger.merge(
            &base.doc,
            &base.file_keys,
            &SubjectRef::new(Subject::Entry, "e1"),
            &[],
            &set,
        );
        assert!(localized.is_empty());
    }
}
