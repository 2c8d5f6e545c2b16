//! Output assembly
//!
//! [`Delivery`] is the entry point used by the HTTP surface. It resolves the
//! collection by code, drives projection, localization and tree
//! materialization, and returns records ready for JSON encoding.

mod entries;
mod trees;

use std::sync::Arc;
use tracing::warn;

use crate::context::RequestContext;
use crate::projection::ProjectorRegistry;
use crate::types::{DeliveryError, Result};
use crate::upstream::{ContentDefinition, DocumentQuery, MenuDefinition, Upstream};

pub use entries::EntryRecord;
pub use trees::{MenuTree, SectionTree};

/// Limits applied to every request
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryConfig {
    /// Page size of each tree level
    pub page_limit: u32,
    /// Concurrent sibling subtrees (1 = sequential)
    pub fanout: usize,
    /// Upper bound on caller-supplied depth levels
    pub max_depth: u32,
    /// Fetch entry page overlays with one bulk call when the store supports it
    pub batch_translations: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            page_limit: 50,
            fanout: 4,
            max_depth: 10,
            batch_translations: false,
        }
    }
}

/// Entry listing parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryRequest {
    pub query: DocumentQuery,
    /// Comma-separated field list; `None` selects every field
    pub fields: Option<String>,
}

/// Section tree parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SectionRequest {
    pub section_id: Option<String>,
    /// Looked up when no `section_id` is given; unresolved codes fall back to the root
    pub section_code: Option<String>,
    pub depth_level: u32,
}

impl Default for SectionRequest {
    fn default() -> Self {
        Self {
            section_id: None,
            section_code: None,
            depth_level: 1,
        }
    }
}

/// Delivery service over one set of upstream collaborators
#[derive(Clone)]
pub struct Delivery {
    upstream: Upstream,
    registry: Arc<ProjectorRegistry>,
    config: DeliveryConfig,
}

impl Delivery {
    pub fn new(upstream: Upstream, config: DeliveryConfig) -> Self {
        Self {
            upstream,
            registry: Arc::new(ProjectorRegistry::with_defaults()),
            config,
        }
    }

    /// Use a custom projector registry
    pub fn with_registry(mut self, registry: ProjectorRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    /// Language codes configured for the caller's project.
    ///
    /// Best-effort: without them localized maps only carry overlay languages.
    /// Only cancellation fails the call.
    pub async fn project_languages(&self, context: &RequestContext) -> Result<Vec<String>> {
        let result = context
            .guard(self.upstream.projects.get_project(&context.scope))
            .await;

        match result {
            Ok(project) => Ok(project.language_codes()),
            Err(DeliveryError::Cancelled) => Err(DeliveryError::Cancelled),
            Err(e) => {
                warn!(
                    "Project languages unavailable for {}: {}",
                    context.scope.project_id, e
                );
                Ok(Vec::new())
            }
        }
    }

    fn depth(&self, requested: u32) -> u32 {
        requested.min(self.config.max_depth)
    }

    async fn find_content(&self, context: &RequestContext, code: &str) -> Result<ContentDefinition> {
        let contents = context
            .guard(self.upstream.contents.find_contents(&context.scope, code))
            .await?;

        contents
            .into_iter()
            .next()
            .ok_or_else(|| DeliveryError::CollectionNotFound(code.to_string()))
    }

    async fn find_menu(&self, context: &RequestContext, code: &str) -> Result<MenuDefinition> {
        let menus = context
            .guard(self.upstream.menus.find_menus(&context.scope, code))
            .await?;

        menus
            .into_iter()
            .next()
            .ok_or_else(|| DeliveryError::CollectionNotFound(code.to_string()))
    }
}
