//! Best-effort overlay fetching
//!
//! Fetches the overlays of one subject (entity-level first, then one call per
//! file key) and merges them. Overlay failures never fail the subject: they
//! are logged and the subject gets an empty localized map. Cancellation is
//! the exception and always propagates.

use tracing::{debug, warn};

use super::merge::Merger;
use super::overlay::{Localized, OverlaySet, SubjectRef, TranslationOverlay};
use crate::context::RequestContext;
use crate::projection::{CollectionRef, Projection};
use crate::types::{DeliveryError, Result};
use crate::upstream::OverlayStore;

/// Localizes the documents of one collection within one request
pub struct Localizer<'a> {
    store: &'a dyn OverlayStore,
    context: &'a RequestContext,
    collection: &'a CollectionRef,
    merger: Merger<'a>,
    enabled: bool,
}

impl<'a> Localizer<'a> {
    pub fn new(
        store: &'a dyn OverlayStore,
        context: &'a RequestContext,
        collection: &'a CollectionRef,
        merger: Merger<'a>,
        enabled: bool,
    ) -> Self {
        Self {
            store,
            context,
            collection,
            merger,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Fetch and merge the overlays of one subject
    pub async fn localize(&self, subject: &SubjectRef, projection: &Projection) -> Result<Localized> {
        if !self.enabled {
            return Ok(Localized::new());
        }

        match self.fetch(subject, projection).await {
            Ok(overlays) => Ok(self.apply(subject, projection, &overlays)),
            Err(DeliveryError::Cancelled) => Err(DeliveryError::Cancelled),
            Err(e) => {
                warn!(
                    "Overlays unavailable for {} {} in {}: {}",
                    subject.subject, subject.id, self.collection.id, e
                );
                Ok(Localized::new())
            }
        }
    }

    /// Merge already-fetched overlays, as used by bulk fetching
    pub fn apply(&self, subject: &SubjectRef, projection: &Projection, overlays: &OverlaySet) -> Localized {
        if !self.enabled {
            return Localized::new();
        }

        self.merger.merge(
            &projection.doc,
            &projection.file_keys,
            subject,
            &self.context.languages,
            overlays,
        )
    }

    async fn fetch(&self, subject: &SubjectRef, projection: &Projection) -> Result<OverlaySet> {
        let scope = &self.context.scope;

        let entity = self
            .context
            .guard(self.store.subject_overlays(scope, self.collection, subject))
            .await?;

        let mut files: Vec<TranslationOverlay> = Vec::new();
        for key in &projection.file_keys {
            let overlays = self
                .context
                .guard(self.store.file_overlays(scope, self.collection, key))
                .await?;
            files.extend(overlays);
        }

        debug!(
            "Fetched {} entity and {} file overlays for {} {}",
            entity.len(),
            files.len(),
            subject.subject,
            subject.id
        );

        Ok(OverlaySet { entity, files })
    }
}
