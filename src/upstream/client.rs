//! HTTP client for the upstream content, menu and project services

use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::debug;

use super::wire::{
    ContentDefinition, DocumentQuery, MenuDefinition, ProjectInfo, RawEntry, RawItem, SectionPage,
};
use super::{ContentStore, MenuStore, OverlayStore, ProjectStore};
use crate::context::Scope;
use crate::projection::{CollectionKind, CollectionRef};
use crate::translation::{SubjectRef, TranslationOverlay};
use crate::types::{DeliveryError, Result};

const CONTENT_SERVICE: &str = "content";
const MENU_SERVICE: &str = "menu";
const PROJECT_SERVICE: &str = "project";

/// Base URLs and limits for the upstream services
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub content_url: String,
    pub menu_url: String,
    pub project_url: String,
    /// Timeout for each upstream call
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            content_url: "http://localhost:3001".to_string(),
            menu_url: "http://localhost:3002".to_string(),
            project_url: "http://localhost:3003".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Deserialize)]
struct ContentsResponse {
    #[serde(default)]
    contents: Vec<ContentDefinition>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    content: Option<ContentDefinition>,
}

#[derive(Deserialize)]
struct EntriesResponse {
    #[serde(default)]
    entries: Vec<RawEntry>,
}

#[derive(Deserialize)]
struct MenusResponse {
    #[serde(default)]
    menus: Vec<MenuDefinition>,
}

#[derive(Deserialize)]
struct ItemsResponse {
    #[serde(default)]
    items: Vec<RawItem>,
}

#[derive(Deserialize)]
struct TranslationsResponse {
    #[serde(default)]
    translations: Vec<TranslationOverlay>,
}

#[derive(Deserialize)]
struct ProjectResponse {
    project: ProjectInfo,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchTranslationsRequest<'a> {
    user_id: &'a str,
    project_id: &'a str,
    content_id: &'a str,
    entry_ids: &'a [String],
    file_ids: &'a [String],
}

/// reqwest-backed implementation of every upstream collaborator
pub struct HttpUpstream {
    config: UpstreamConfig,
    client: Client,
}

impl HttpUpstream {
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    fn scope_params(scope: &Scope) -> Vec<(&'static str, String)> {
        vec![
            ("userId", scope.owner_id.clone()),
            ("projectId", scope.project_id.clone()),
        ]
    }

    fn page_params<'a>(params: &mut Vec<(&'a str, String)>, query: &DocumentQuery) {
        params.push(("limit", query.limit.to_string()));
        params.push(("page", query.page.to_string()));
    }

    /// Base URL and collection id parameter for a collection's overlays
    fn overlay_target(&self, collection: &CollectionRef) -> (&'static str, &str, &'static str) {
        match collection.kind {
            CollectionKind::Content => (CONTENT_SERVICE, &self.config.content_url, "contentId"),
            CollectionKind::Menu => (MENU_SERVICE, &self.config.menu_url, "menuId"),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        service: &'static str,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        debug!("GET {} ({} params)", url, params.len());
        let response = self.client.get(url).query(params).send().await?;
        Self::handle_response(service, response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        service: &'static str,
        url: &str,
        body: &B,
    ) -> Result<T> {
        debug!("POST {}", url);
        let response = self.client.post(url).json(body).send().await?;
        Self::handle_response(service, response).await
    }

    /// Decode a service response. A non-null `error` member always wins over the payload.
    async fn handle_response<T: DeserializeOwned>(
        service: &'static str,
        response: Response,
    ) -> Result<T> {
        let status = response.status();
        let bytes = response.bytes().await?;

        let body: JsonValue = match serde_json::from_slice(&bytes) {
            Ok(body) => body,
            Err(e) if status.is_success() => return Err(e.into()),
            Err(_) => {
                return Err(DeliveryError::Upstream {
                    service,
                    message: format!("HTTP {}", status),
                })
            }
        };

        if let Some(message) = envelope_error(&body) {
            return Err(DeliveryError::Upstream { service, message });
        }

        if !status.is_success() {
            return Err(DeliveryError::Upstream {
                service,
                message: format!("HTTP {}", status),
            });
        }

        Ok(serde_json::from_value(body)?)
    }
}

/// Message of an `{error, description?}` envelope, if the error is set
fn envelope_error(body: &JsonValue) -> Option<String> {
    let error = body.get("error")?;
    let message = match error {
        JsonValue::Null => return None,
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    };

    match body.get("description").and_then(|d| d.as_str()) {
        Some(description) => Some(format!("{}: {}", message, description)),
        None => Some(message),
    }
}

/// Base document fetch failures keep upstream error payloads, everything else is a fetch failure
fn document_error(e: DeliveryError) -> DeliveryError {
    match e {
        DeliveryError::Upstream { .. } | DeliveryError::Cancelled => e,
        other => DeliveryError::DocumentFetchFailed(other.to_string()),
    }
}

fn translation_error(e: DeliveryError) -> DeliveryError {
    match e {
        DeliveryError::Cancelled => e,
        other => DeliveryError::TranslationFetchFailed(other.to_string()),
    }
}

#[async_trait]
impl ContentStore for HttpUpstream {
    async fn find_contents(&self, scope: &Scope, code: &str) -> Result<Vec<ContentDefinition>> {
        let url = format!("{}/api/contents", self.config.content_url);
        let mut params = Self::scope_params(scope);
        params.push(("code", code.to_string()));

        let response: ContentsResponse = self.get_json(CONTENT_SERVICE, &url, &params).await?;
        Ok(response.contents)
    }

    async fn get_content(&self, scope: &Scope, content_id: &str) -> Result<ContentDefinition> {
        let url = format!(
            "{}/api/contents/{}",
            self.config.content_url,
            urlencoding::encode(content_id)
        );
        let params = Self::scope_params(scope);

        let response: ContentResponse = self.get_json(CONTENT_SERVICE, &url, &params).await?;
        response
            .content
            .ok_or_else(|| DeliveryError::CollectionNotFound(content_id.to_string()))
    }

    async fn list_entries(
        &self,
        scope: &Scope,
        content_id: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<RawEntry>> {
        let url = format!("{}/api/entries", self.config.content_url);
        let mut params: Vec<(&str, String)> = Self::scope_params(scope);
        params.push(("contentId", content_id.to_string()));
        Self::page_params(&mut params, query);
        if let Some(ref since_id) = query.since_id {
            params.push(("sinceId", since_id.clone()));
        }
        if !query.ids.is_empty() {
            params.push(("ids", query.ids.join(",")));
        }
        for (key, value) in &query.filters {
            params.push((key.as_str(), value.clone()));
        }

        let response: EntriesResponse = self
            .get_json(CONTENT_SERVICE, &url, &params)
            .await
            .map_err(document_error)?;
        Ok(response.entries)
    }

    async fn list_sections(
        &self,
        scope: &Scope,
        content_id: &str,
        query: &DocumentQuery,
    ) -> Result<SectionPage> {
        let url = format!("{}/api/sections", self.config.content_url);
        let mut params = Self::scope_params(scope);
        params.push(("contentId", content_id.to_string()));
        Self::page_params(&mut params, query);
        if let Some(ref parent_id) = query.parent_id {
            params.push(("parent_id", parent_id.clone()));
        }
        if let Some(ref section_code) = query.section_code {
            params.push(("section_code", section_code.clone()));
        }

        self.get_json(CONTENT_SERVICE, &url, &params)
            .await
            .map_err(document_error)
    }
}

#[async_trait]
impl MenuStore for HttpUpstream {
    async fn find_menus(&self, scope: &Scope, code: &str) -> Result<Vec<MenuDefinition>> {
        let url = format!("{}/api/menus", self.config.menu_url);
        let mut params = Self::scope_params(scope);
        params.push(("code", code.to_string()));

        let response: MenusResponse = self.get_json(MENU_SERVICE, &url, &params).await?;
        Ok(response.menus)
    }

    async fn list_items(
        &self,
        scope: &Scope,
        menu_id: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<RawItem>> {
        let url = format!("{}/api/items", self.config.menu_url);
        let mut params = Self::scope_params(scope);
        params.push(("menuId", menu_id.to_string()));
        Self::page_params(&mut params, query);
        if let Some(ref parent_id) = query.parent_id {
            params.push(("parent_id", parent_id.clone()));
        }

        let response: ItemsResponse = self
            .get_json(MENU_SERVICE, &url, &params)
            .await
            .map_err(document_error)?;
        Ok(response.items)
    }
}

#[async_trait]
impl OverlayStore for HttpUpstream {
    async fn subject_overlays(
        &self,
        scope: &Scope,
        collection: &CollectionRef,
        subject: &SubjectRef,
    ) -> Result<Vec<TranslationOverlay>> {
        let (service, base_url, collection_param) = self.overlay_target(collection);
        let url = format!("{}/api/translations", base_url);
        let mut params = Self::scope_params(scope);
        params.push((collection_param, collection.id.clone()));
        params.push(("subjectId", subject.id.clone()));
        params.push(("subject", subject.subject.as_str().to_string()));

        let response: TranslationsResponse = self
            .get_json(service, &url, &params)
            .await
            .map_err(translation_error)?;
        Ok(response.translations)
    }

    async fn file_overlays(
        &self,
        scope: &Scope,
        collection: &CollectionRef,
        key: &str,
    ) -> Result<Vec<TranslationOverlay>> {
        let (service, base_url, collection_param) = self.overlay_target(collection);
        let url = format!("{}/api/translations", base_url);
        let mut params = Self::scope_params(scope);
        params.push((collection_param, collection.id.clone()));
        params.push(("subject", "file".to_string()));
        params.push(("key", key.to_string()));

        let response: TranslationsResponse = self
            .get_json(service, &url, &params)
            .await
            .map_err(translation_error)?;
        Ok(response.translations)
    }

    fn supports_batch(&self, collection: &CollectionRef) -> bool {
        collection.kind == CollectionKind::Content
    }

    async fn batch_overlays(
        &self,
        scope: &Scope,
        collection: &CollectionRef,
        entry_ids: &[String],
        file_ids: &[String],
    ) -> Result<Vec<TranslationOverlay>> {
        if !self.supports_batch(collection) {
            return Err(DeliveryError::TranslationFetchFailed(format!(
                "bulk overlays unavailable for {:?} collections",
                collection.kind
            )));
        }

        let url = format!("{}/api/translations/batch", self.config.content_url);
        let body = BatchTranslationsRequest {
            user_id: &scope.owner_id,
            project_id: &scope.project_id,
            content_id: &collection.id,
            entry_ids,
            file_ids,
        };

        let response: TranslationsResponse = self
            .post_json(CONTENT_SERVICE, &url, &body)
            .await
            .map_err(translation_error)?;
        Ok(response.translations)
    }
}

#[async_trait]
impl ProjectStore for HttpUpstream {
    async fn get_project(&self, scope: &Scope) -> Result<ProjectInfo> {
        let url = format!(
            "{}/api/projects/{}",
            self.config.project_url,
            urlencoding::encode(&scope.project_id)
        );

        let response: ProjectResponse = self.get_json(PROJECT_SERVICE, &url, &[]).await?;
        Ok(response.project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_error() {
        assert_eq!(envelope_error(&json!({"contents": []})), None);
        assert_eq!(envelope_error(&json!({"error": null, "entries": []})), None);
        assert_eq!(
            envelope_error(&json!({"error": "invalid_request"})),
            Some("invalid_request".to_string())
        );
        assert_eq!(
            envelope_error(&json!({"error": "plan_expired", "description": "Plan expired."})),
            Some("plan_expired: Plan expired.".to_string())
        );
    }

    #[test]
    fn test_error_classification() {
        let upstream = DeliveryError::Upstream {
            service: CONTENT_SERVICE,
            message: "boom".to_string(),
        };
        assert!(matches!(document_error(upstream), DeliveryError::Upstream { .. }));
        assert!(matches!(
            document_error(DeliveryError::InvalidRequest("x".to_string())),
            DeliveryError::DocumentFetchFailed(_)
        ));
        assert!(matches!(
            translation_error(DeliveryError::InvalidRequest("x".to_string())),
            DeliveryError::TranslationFetchFailed(_)
        ));
        assert!(translation_error(DeliveryError::Cancelled).is_cancellation());
    }

    #[test]
    fn test_client_builds_with_defaults() {
        let client = HttpUpstream::new(UpstreamConfig::default()).unwrap();
        assert_eq!(client.config().content_url, "http://localhost:3001");
    }
}
