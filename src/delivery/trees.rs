use serde::Serialize;
use tracing::debug;

use super::{Delivery, SectionRequest};
use crate::context::RequestContext;
use crate::tree::{Branch, Materializer, RecursionState, TreeNode};
use crate::types::Result;
use crate::upstream::{ContentDefinition, DocumentQuery};

/// Section tree of a content collection
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SectionTree {
    pub sections: Vec<TreeNode>,
    /// Section the tree hangs from, when the store reports one
    pub parent: Option<TreeNode>,
}

/// Item tree of a menu
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MenuTree {
    pub items: Vec<TreeNode>,
}

impl Delivery {
    fn materializer<'a>(&'a self, context: &'a RequestContext) -> Materializer<'a> {
        Materializer::new(
            &self.upstream,
            &self.registry,
            context,
            self.config.page_limit,
            self.config.fanout,
        )
    }

    /// Materialize a content collection's section tree
    pub async fn section_tree(
        &self,
        context: &RequestContext,
        code: &str,
        request: &SectionRequest,
    ) -> Result<SectionTree> {
        let content = self.find_content(context, code).await?;

        let parent_id = match (&request.section_id, &request.section_code) {
            (Some(id), _) => Some(id.clone()),
            (None, Some(section_code)) => self.resolve_section_code(context, &content, section_code).await?,
            (None, None) => None,
        };

        let state = RecursionState::root(Branch::sections(&content), self.depth(request.depth_level))
            .with_parent(parent_id);
        let level = self.materializer(context).materialize_level(state).await?;

        Ok(SectionTree {
            sections: level.nodes,
            parent: level.parent,
        })
    }

    /// Materialize a menu's item tree
    pub async fn menu_tree(
        &self,
        context: &RequestContext,
        code: &str,
        depth_level: u32,
    ) -> Result<MenuTree> {
        let menu = self.find_menu(context, code).await?;

        let state = RecursionState::root(Branch::items(&menu), self.depth(depth_level));
        let items = self.materializer(context).materialize(state).await?;

        Ok(MenuTree { items })
    }

    async fn resolve_section_code(
        &self,
        context: &RequestContext,
        content: &ContentDefinition,
        section_code: &str,
    ) -> Result<Option<String>> {
        let query = DocumentQuery {
            section_code: Some(section_code.to_string()),
            ..DocumentQuery::page(self.config.page_limit, 1)
        };

        let page = context
            .guard(
                self.upstream
                    .contents
                    .list_sections(&context.scope, &content.id, &query),
            )
            .await?;

        let section_id = page.sections.into_iter().next().map(|section| section.id);
        if section_id.is_none() {
            debug!("Section code '{}' not found, using the root", section_code);
        }
        Ok(section_id)
    }
}
