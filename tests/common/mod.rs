//! In-memory upstream for integration tests
//!
//! Serves contents, menus, documents and overlays from fixtures, records
//! every call in order and can be told to fail or stall specific operations.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use frame_delivery::context::Scope;
use frame_delivery::projection::CollectionRef;
use frame_delivery::translation::{Subject, SubjectRef, TranslationOverlay};
use frame_delivery::upstream::{
    ContentDefinition, ContentStore, DocumentQuery, Language, MenuDefinition, MenuStore,
    OverlayStore, ProjectInfo, ProjectStore, RawEntry, RawItem, RawSection, SectionPage, Upstream,
};
use frame_delivery::{DeliveryError, Result};

#[derive(Default)]
pub struct MemoryUpstream {
    pub contents: Vec<ContentDefinition>,
    pub menus: Vec<MenuDefinition>,
    pub entries: HashMap<String, Vec<RawEntry>>,
    pub sections: HashMap<String, Vec<RawSection>>,
    pub items: HashMap<String, Vec<RawItem>>,
    /// (collection id, overlay)
    pub overlays: Vec<(String, TranslationOverlay)>,
    pub languages: Vec<String>,
    pub batch: bool,
    /// Operations that answer with an error
    pub failing: HashSet<&'static str>,
    /// Tree levels (keyed by parent id, "root" for the top, "project" for the
    /// project lookup) that answer after a delay
    pub delays: HashMap<String, u64>,
    /// Tree levels that never answer
    pub stalled: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

pub fn from_json<T: serde::de::DeserializeOwned>(value: JsonValue) -> T {
    serde_json::from_value(value).unwrap()
}

pub fn scope() -> Scope {
    Scope::new("u1", "p1")
}

fn level_key(parent_id: &Option<String>) -> String {
    parent_id.clone().unwrap_or_else(|| "root".to_string())
}

impl MemoryUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(mut self, content: JsonValue) -> Self {
        self.contents.push(from_json(content));
        self
    }

    pub fn with_menu(mut self, menu: JsonValue) -> Self {
        self.menus.push(from_json(menu));
        self
    }

    pub fn with_entries(mut self, content_id: &str, entries: JsonValue) -> Self {
        self.entries.insert(content_id.to_string(), from_json(entries));
        self
    }

    pub fn with_sections(mut self, content_id: &str, sections: JsonValue) -> Self {
        self.sections.insert(content_id.to_string(), from_json(sections));
        self
    }

    pub fn with_items(mut self, menu_id: &str, items: JsonValue) -> Self {
        self.items.insert(menu_id.to_string(), from_json(items));
        self
    }

    pub fn with_overlays(mut self, collection_id: &str, overlays: JsonValue) -> Self {
        let overlays: Vec<TranslationOverlay> = from_json(overlays);
        self.overlays
            .extend(overlays.into_iter().map(|o| (collection_id.to_string(), o)));
        self
    }

    pub fn with_languages(mut self, languages: &[&str]) -> Self {
        self.languages = languages.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn failing(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    pub fn delayed(mut self, level: &str, millis: u64) -> Self {
        self.delays.insert(level.to_string(), millis);
        self
    }

    pub fn stalled(mut self, level: &str) -> Self {
        self.stalled.insert(level.to_string());
        self
    }

    pub fn batched(mut self) -> Self {
        self.batch = true;
        self
    }

    pub fn into_upstream(self) -> (Arc<MemoryUpstream>, Upstream) {
        let store = Arc::new(self);
        let upstream = Upstream {
            contents: store.clone(),
            menus: store.clone(),
            overlays: store.clone(),
            projects: store.clone(),
        };
        (store, upstream)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn position(&self, call: &str) -> usize {
        self.calls()
            .iter()
            .position(|c| c == call)
            .unwrap_or_else(|| panic!("no call '{}' in {:?}", call, self.calls()))
    }

    fn record(&self, operation: &'static str, call: String) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.contains(operation) {
            return Err(DeliveryError::Upstream {
                service: "memory",
                message: format!("{} unavailable", operation),
            });
        }
        Ok(())
    }

    async fn pace(&self, level: &str) {
        if self.stalled.contains(level) {
            std::future::pending::<()>().await;
        }
        if let Some(millis) = self.delays.get(level) {
            tokio::time::sleep(Duration::from_millis(*millis)).await;
        }
    }
}

#[async_trait]
impl ContentStore for MemoryUpstream {
    async fn find_contents(&self, _scope: &Scope, code: &str) -> Result<Vec<ContentDefinition>> {
        self.record("contents", format!("contents:{}", code))?;
        Ok(self.contents.iter().filter(|c| c.code == code).cloned().collect())
    }

    async fn get_content(&self, _scope: &Scope, content_id: &str) -> Result<ContentDefinition> {
        self.record("content", format!("content:{}", content_id))?;
        self.contents
            .iter()
            .find(|c| c.id == content_id)
            .cloned()
            .ok_or_else(|| DeliveryError::CollectionNotFound(content_id.to_string()))
    }

    async fn list_entries(
        &self,
        _scope: &Scope,
        content_id: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<RawEntry>> {
        self.record("entries", format!("entries:{}", content_id))?;
        let entries = self.entries.get(content_id).cloned().unwrap_or_default();
        Ok(entries
            .into_iter()
            .filter(|e| query.ids.is_empty() || query.ids.contains(&e.id))
            .take(query.limit as usize)
            .collect())
    }

    async fn list_sections(
        &self,
        _scope: &Scope,
        content_id: &str,
        query: &DocumentQuery,
    ) -> Result<SectionPage> {
        let all = self.sections.get(content_id).cloned().unwrap_or_default();

        if let Some(ref code) = query.section_code {
            self.record("sections", format!("section_code:{}", code))?;
            let sections = all
                .into_iter()
                .filter(|s| s.doc.get("code").and_then(|c| c.as_str()) == Some(code.as_str()))
                .collect();
            return Ok(SectionPage {
                sections,
                parent: None,
            });
        }

        let level = level_key(&query.parent_id);
        self.record("sections", format!("sections:{}:{}", content_id, level))?;
        self.pace(&level).await;

        let parent = query
            .parent_id
            .as_ref()
            .and_then(|id| all.iter().find(|s| &s.id == id).cloned());
        let sections = all
            .into_iter()
            .filter(|s| s.parent_id == query.parent_id)
            .take(query.limit as usize)
            .collect();

        Ok(SectionPage { sections, parent })
    }
}

#[async_trait]
impl MenuStore for MemoryUpstream {
    async fn find_menus(&self, _scope: &Scope, code: &str) -> Result<Vec<MenuDefinition>> {
        self.record("menus", format!("menus:{}", code))?;
        Ok(self.menus.iter().filter(|m| m.code == code).cloned().collect())
    }

    async fn list_items(
        &self,
        _scope: &Scope,
        menu_id: &str,
        query: &DocumentQuery,
    ) -> Result<Vec<RawItem>> {
        let level = level_key(&query.parent_id);
        self.record("items", format!("items:{}:{}", menu_id, level))?;
        self.pace(&level).await;

        let items = self.items.get(menu_id).cloned().unwrap_or_default();
        Ok(items
            .into_iter()
            .filter(|i| i.parent_id == query.parent_id)
            .take(query.limit as usize)
            .collect())
    }
}

#[async_trait]
impl OverlayStore for MemoryUpstream {
    async fn subject_overlays(
        &self,
        _scope: &Scope,
        collection: &CollectionRef,
        subject: &SubjectRef,
    ) -> Result<Vec<TranslationOverlay>> {
        self.record("overlays", format!("overlays:{}:{}", subject.subject, subject.id))?;
        Ok(self
            .overlays
            .iter()
            .filter(|(id, o)| {
                id == &collection.id && o.subject == subject.subject && o.subject_id == subject.id
            })
            .map(|(_, o)| o.clone())
            .collect())
    }

    async fn file_overlays(
        &self,
        _scope: &Scope,
        collection: &CollectionRef,
        key: &str,
    ) -> Result<Vec<TranslationOverlay>> {
        self.record("files", format!("files:{}", key))?;
        Ok(self
            .overlays
            .iter()
            .filter(|(id, o)| {
                id == &collection.id && o.subject == Subject::File && o.key.as_deref() == Some(key)
            })
            .map(|(_, o)| o.clone())
            .collect())
    }

    fn supports_batch(&self, _collection: &CollectionRef) -> bool {
        self.batch
    }

    async fn batch_overlays(
        &self,
        _scope: &Scope,
        collection: &CollectionRef,
        entry_ids: &[String],
        file_ids: &[String],
    ) -> Result<Vec<TranslationOverlay>> {
        self.record("batch", format!("batch:{}:{}", entry_ids.len(), file_ids.len()))?;
        Ok(self
            .overlays
            .iter()
            .filter(|(id, o)| {
                id == &collection.id
                    && match o.subject {
                        Subject::File => file_ids.contains(&o.subject_id),
                        _ => entry_ids.contains(&o.subject_id),
                    }
            })
            .map(|(_, o)| o.clone())
            .collect())
    }
}

#[async_trait]
impl ProjectStore for MemoryUpstream {
    async fn get_project(&self, scope: &Scope) -> Result<ProjectInfo> {
        self.record("project", "project".to_string())?;
        self.pace("project").await;
        Ok(ProjectInfo {
            id: scope.project_id.clone(),
            name: "Test project".to_string(),
            languages: self
                .languages
                .iter()
                .enumerate()
                .map(|(i, code)| Language {
                    code: code.clone(),
                    primary: i == 0,
                })
                .collect(),
        })
    }
}
