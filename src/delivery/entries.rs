use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use super::{Delivery, EntryRequest};
use crate::context::RequestContext;
use crate::projection::{
    project_document, CollectionRef, FieldSelection, ProjectedDocument, Projection, SchemaLookup,
};
use crate::translation::{Localized, Localizer, Merger, OverlaySet, Subject, SubjectRef};
use crate::types::{DeliveryError, Result};
use crate::upstream::RawEntry;

/// Delivered entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryRecord {
    pub id: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub doc: ProjectedDocument,
    pub localized: Localized,
}

/// Entry with its projection, waiting for overlays
struct ProjectedEntry {
    entry: RawEntry,
    projection: Projection,
}

impl ProjectedEntry {
    fn subject(&self) -> SubjectRef {
        SubjectRef::new(Subject::Entry, self.entry.id.clone())
    }

    fn into_record(self, localized: Localized) -> EntryRecord {
        EntryRecord {
            id: self.entry.id,
            created_at: self.entry.created_at,
            updated_at: self.entry.updated_at,
            doc: self.projection.doc,
            localized,
        }
    }
}

impl Delivery {
    /// List, project and localize one page of a content collection's entries
    pub async fn list_entries(
        &self,
        context: &RequestContext,
        code: &str,
        request: &EntryRequest,
    ) -> Result<Vec<EntryRecord>> {
        let content = self.find_content(context, code).await?;
        let definition = content.entry_collection();
        let collection = definition.reference();
        let schema = SchemaLookup::resolve(&definition);
        let selection = FieldSelection::parse(request.fields.as_deref());

        let entries = context
            .guard(
                self.upstream
                    .contents
                    .list_entries(&context.scope, &content.id, &request.query),
            )
            .await?;
        debug!("Fetched {} entries of '{}'", entries.len(), code);

        let projected: Vec<ProjectedEntry> = entries
            .into_iter()
            .map(|entry| {
                let projection = project_document(&entry.doc, &schema, &self.registry, &selection);
                ProjectedEntry { entry, projection }
            })
            .collect();

        let localizer = Localizer::new(
            self.upstream.overlays.as_ref(),
            context,
            &collection,
            Merger::new(&schema, &self.registry, &selection),
            definition.translations_enabled,
        );

        let bulk = self.config.batch_translations
            && localizer.is_enabled()
            && self.upstream.overlays.supports_batch(&collection);

        if bulk {
            let overlays = self.bulk_overlays(context, &collection, &projected).await?;
            return Ok(projected
                .into_iter()
                .map(|entry| {
                    let localized = match &overlays {
                        Some(set) => localizer.apply(&entry.subject(), &entry.projection, set),
                        None => Localized::new(),
                    };
                    entry.into_record(localized)
                })
                .collect());
        }

        let pending: Vec<_> = projected
            .into_iter()
            .map(|entry| {
                let localizer = &localizer;
                async move {
                    let localized = localizer.localize(&entry.subject(), &entry.projection).await?;
                    Ok::<_, DeliveryError>(entry.into_record(localized))
                }
            })
            .collect();

        stream::iter(pending)
            .buffered(self.config.fanout.max(1))
            .try_collect()
            .await
    }

    /// Overlays of a whole page in one call; `None` when they are unavailable
    async fn bulk_overlays(
        &self,
        context: &RequestContext,
        collection: &CollectionRef,
        entries: &[ProjectedEntry],
    ) -> Result<Option<OverlaySet>> {
        let entry_ids: Vec<String> = entries.iter().map(|e| e.entry.id.clone()).collect();
        let file_ids: Vec<String> = entries
            .iter()
            .flat_map(|e| {
                e.projection
                    .file_keys
                    .iter()
                    .filter_map(|key| e.projection.doc.get(key))
                    .flat_map(|value| value.file_ids())
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
            })
            .collect();

        let result = context
            .guard(self.upstream.overlays.batch_overlays(
                &context.scope,
                collection,
                &entry_ids,
                &file_ids,
            ))
            .await;

        match result {
            Ok(overlays) => Ok(Some(OverlaySet::partition(overlays))),
            Err(DeliveryError::Cancelled) => Err(DeliveryError::Cancelled),
            Err(e) => {
                warn!("Bulk overlays unavailable for {}: {}", collection.id, e);
                Ok(None)
            }
        }
    }
}
