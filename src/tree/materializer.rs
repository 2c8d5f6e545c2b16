use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use super::{Branch, BranchSource, RecursionState, TreeNode};
use crate::context::RequestContext;
use crate::projection::{project_document, FieldSelection, ProjectorRegistry, RawDocument};
use crate::translation::{Localizer, Merger, Subject, SubjectRef};
use crate::types::Result;
use crate::upstream::{DocumentQuery, RawItem, RawSection, Upstream};

/// Nodes of one level, plus the parent node the store reported for it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeLevel {
    pub nodes: Vec<TreeNode>,
    pub parent: Option<TreeNode>,
}

/// A fetched document of either branch source
struct Row {
    id: String,
    parent_id: Option<String>,
    doc: RawDocument,
    subject: Option<Subject>,
    subject_id: Option<String>,
}

impl From<RawSection> for Row {
    fn from(section: RawSection) -> Self {
        Self {
            id: section.id,
            parent_id: section.parent_id,
            doc: section.doc,
            subject: None,
            subject_id: None,
        }
    }
}

impl From<RawItem> for Row {
    fn from(item: RawItem) -> Self {
        Self {
            id: item.id,
            parent_id: item.parent_id,
            doc: item.doc,
            subject: item.subject,
            subject_id: item.subject_id,
        }
    }
}

/// Builds section and menu trees for one request
pub struct Materializer<'a> {
    upstream: &'a Upstream,
    registry: &'a ProjectorRegistry,
    context: &'a RequestContext,
    selection: FieldSelection,
    page_limit: u32,
    fanout: usize,
}

impl<'a> Materializer<'a> {
    pub fn new(
        upstream: &'a Upstream,
        registry: &'a ProjectorRegistry,
        context: &'a RequestContext,
        page_limit: u32,
        fanout: usize,
    ) -> Self {
        Self {
            upstream,
            registry,
            context,
            selection: FieldSelection::all(),
            page_limit,
            fanout: fanout.max(1),
        }
    }

    /// Materialize the subtree below `state.parent_id`
    pub fn materialize(&self, state: RecursionState) -> BoxFuture<'_, Result<Vec<TreeNode>>> {
        async move {
            if state.is_exhausted() {
                return Ok(Vec::new());
            }
            let (rows, _) = self.fetch_level(&state).await?;
            self.build_nodes(rows, &state).await
        }
        .boxed()
    }

    /// Materialize the subtree below `state.parent_id`, also building the parent the
    /// store reported for this level. Only used for the top level of a tree.
    pub async fn materialize_level(&self, state: RecursionState) -> Result<TreeLevel> {
        if state.is_exhausted() {
            return Ok(TreeLevel::default());
        }

        let (rows, parent) = self.fetch_level(&state).await?;

        let parent = match parent {
            Some(row) => Some(self.build_leaf(&row, &state.branch).await?),
            None => None,
        };
        let nodes = self.build_nodes(rows, &state).await?;

        Ok(TreeLevel { nodes, parent })
    }

    /// Build the nodes of one fetched level, siblings in order
    async fn build_nodes(&self, rows: Vec<Row>, state: &RecursionState) -> Result<Vec<TreeNode>> {
        debug!(
            "Fetched {} {} rows under {:?} ({} levels left)",
            rows.len(),
            state.branch.subject,
            state.parent_id,
            state.depth_remaining
        );

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let pending: Vec<_> = rows
            .into_iter()
            .map(|row| self.build_node(row, state))
            .collect();
        stream::iter(pending)
            .buffered(self.fanout)
            .try_collect()
            .await
    }

    async fn fetch_level(&self, state: &RecursionState) -> Result<(Vec<Row>, Option<Row>)> {
        let scope = &self.context.scope;
        let collection_id = &state.branch.collection.id;
        let query = DocumentQuery::page(self.page_limit, 1).with_parent(state.parent_id.clone());

        match state.branch.source {
            BranchSource::Sections => {
                let page = self
                    .context
                    .guard(self.upstream.contents.list_sections(scope, collection_id, &query))
                    .await?;
                let rows = page.sections.into_iter().map(Row::from).collect();
                Ok((rows, page.parent.map(Row::from)))
            }
            BranchSource::Items => {
                let items = self
                    .context
                    .guard(self.upstream.menus.list_items(scope, collection_id, &query))
                    .await?;
                Ok((items.into_iter().map(Row::from).collect(), None))
            }
        }
    }

    /// Project and localize a row, then materialize its children
    async fn build_node(&self, row: Row, state: &RecursionState) -> Result<TreeNode> {
        let mut node = self.build_leaf(&row, &state.branch).await?;

        if let Some(next) = self.child_state(&row, state).await? {
            node.children = self.materialize(next).await?;
        }

        Ok(node)
    }

    async fn build_leaf(&self, row: &Row, branch: &Branch) -> Result<TreeNode> {
        let projection = project_document(&row.doc, &branch.schema, self.registry, &self.selection);

        let merger = Merger::new(&branch.schema, self.registry, &self.selection);
        let localizer = Localizer::new(
            self.upstream.overlays.as_ref(),
            self.context,
            &branch.collection,
            merger,
            branch.translations_enabled,
        );
        let localized = localizer
            .localize(&SubjectRef::new(branch.subject, row.id.clone()), &projection)
            .await?;

        let reference = match branch.source {
            BranchSource::Items => Some(row.subject.is_some()),
            BranchSource::Sections => None,
        };

        Ok(TreeNode {
            id: row.id.clone(),
            parent_id: row.parent_id.clone(),
            reference,
            doc: projection.doc,
            localized,
            children: Vec::new(),
        })
    }

    /// Where a node's children come from, or `None` when it has none to fetch
    async fn child_state(&self, row: &Row, state: &RecursionState) -> Result<Option<RecursionState>> {
        if state.depth_remaining <= 1 {
            return Ok(None);
        }

        match (row.subject, row.subject_id.as_deref()) {
            (None, _) | (Some(_), None) => Ok(Some(state.child(&row.id))),
            (Some(Subject::Content), Some(content_id)) => {
                let content = self
                    .context
                    .guard(
                        self.upstream
                            .contents
                            .get_content(&self.context.scope, content_id),
                    )
                    .await?;
                Ok(Some(state.enter(Branch::sections(&content))))
            }
            (Some(subject), Some(subject_id)) => {
                debug!(
                    "Item {} references {} {}, which has no tree",
                    row.id, subject, subject_id
                );
                Ok(None)
            }
        }
    }
}
