//! Node materializer
//!
//! Turns an expanded node into the child view-nodes to render. Small sibling sets are built
//! eagerly from a fresh fetch on every call. Sibling sets above the eager threshold are handed
//! to a `PagedCollection` registered under `(kind, parent id)`, and later expansions reuse its
//! pages until an invalidation drops it.

use crate::error::ApiError;
use crate::expand_state::ExpandStateMirror;
use crate::hierarchy::HierarchyIndex;
use crate::paging::{PageData, PageLoader, PagedCollection, PagedCollectionConfig};
use crate::remote::{CourseContent, CourseContentType, CourseDataService, Example};
use crate::tree::node::{ContentNode, LoadMoreMarker, NodeData, TreeNode};
use crate::tree::registry::CollectionRegistry;
use crate::types::{CacheKey, CollectionKind, NodeKey, NodeKind};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Content row with its precomputed "has further children" flag
#[derive(Debug, Clone)]
struct ContentRow {
    content: CourseContent,
    has_children: bool,
}

/// Per-child point lookups, memoized for the lifetime of one materialization.
///
/// A failed lookup is logged once and leaves the field empty.
struct AuxResolver {
    service: Arc<dyn CourseDataService>,
    course_id: String,
    types: Mutex<HashMap<String, Option<CourseContentType>>>,
    examples: Mutex<HashMap<String, Option<Example>>>,
}

impl AuxResolver {
    fn new(
        service: Arc<dyn CourseDataService>,
        course_id: &str,
        types: Vec<CourseContentType>,
    ) -> Self {
        Self {
            service,
            course_id: course_id.to_string(),
            types: Mutex::new(types.into_iter().map(|t| (t.id.clone(), Some(t))).collect()),
            examples: Mutex::new(HashMap::new()),
        }
    }

    async fn content_type(&self, type_id: &str) -> Option<CourseContentType> {
        let cached = self.types.lock().get(type_id).cloned();
        if let Some(cached) = cached {
            return cached;
        }
        let resolved = match self.service.get_content_type(type_id).await {
            Ok(Some(content_type)) => Some(content_type),
            Ok(None) => {
                warn!(course_id = %self.course_id, type_id, "Content type not found");
                None
            }
            Err(e) => {
                warn!(course_id = %self.course_id, type_id, error = %e, "Content type lookup failed");
                None
            }
        };
        self.types
            .lock()
            .insert(type_id.to_string(), resolved.clone());
        resolved
    }

    async fn example(&self, example_id: &str) -> Option<Example> {
        let cached = self.examples.lock().get(example_id).cloned();
        if let Some(cached) = cached {
            return cached;
        }
        let resolved = match self.service.get_example(example_id).await {
            Ok(example) => example,
            Err(e) => {
                warn!(course_id = %self.course_id, example_id, error = %e, "Example lookup failed");
                None
            }
        };
        self.examples
            .lock()
            .insert(example_id.to_string(), resolved.clone());
        resolved
    }

    async fn resolve(&self, row: &ContentRow) -> TreeNode {
        let content_type = self.content_type(&row.content.course_content_type_id).await;
        let example = match &row.content.example_id {
            Some(example_id) => self.example(example_id).await,
            None => None,
        };
        TreeNode::new(
            NodeData::Content(ContentNode {
                content: row.content.clone(),
                content_type,
                example,
            }),
            row.has_children,
        )
    }
}

fn page_bounds(len: usize, page_index: usize, page_size: usize) -> (usize, usize) {
    let start = page_index.saturating_mul(page_size).min(len);
    let end = start.saturating_add(page_size).min(len);
    (start, end)
}

/// Pages over an ordered content sibling list, resolving auxiliary data per page.
struct ContentPageLoader {
    rows: Arc<Vec<ContentRow>>,
    resolver: Arc<AuxResolver>,
}

#[async_trait]
impl PageLoader<TreeNode> for ContentPageLoader {
    async fn load_page(
        &self,
        page_index: usize,
        page_size: usize,
    ) -> Result<PageData<TreeNode>, ApiError> {
        let (start, end) = page_bounds(self.rows.len(), page_index, page_size);
        let mut nodes = Vec::with_capacity(end - start);
        for row in &self.rows[start..end] {
            nodes.push(self.resolver.resolve(row).await);
        }
        Ok(PageData::new(nodes, self.rows.len()))
    }
}

/// Pages over nodes that need no further lookups.
struct PrebuiltPageLoader {
    nodes: Arc<Vec<TreeNode>>,
}

#[async_trait]
impl PageLoader<TreeNode> for PrebuiltPageLoader {
    async fn load_page(
        &self,
        page_index: usize,
        page_size: usize,
    ) -> Result<PageData<TreeNode>, ApiError> {
        let (start, end) = page_bounds(self.nodes.len(), page_index, page_size);
        Ok(PageData::new(
            self.nodes[start..end].to_vec(),
            self.nodes.len(),
        ))
    }
}

/// Where a paged sibling list lives
struct PagedScope {
    parent: NodeKey,
    course_id: String,
    kind: CollectionKind,
}

impl PagedScope {
    /// Keyed by the parent's kind and id, so a course and a content row sharing an id never
    /// share a collection. Folder children are keyed by their course.
    fn cache_key(&self) -> CacheKey {
        let owner = match self.parent.kind {
            NodeKind::ContentsFolder | NodeKind::GroupsFolder => {
                NodeKey::new(NodeKind::Course, self.parent.id.clone())
            }
            _ => self.parent.clone(),
        };
        CacheKey::new(self.kind, owner.expand_key())
    }
}

pub struct NodeMaterializer {
    service: Arc<dyn CourseDataService>,
    registry: Arc<CollectionRegistry>,
    mirror: Arc<ExpandStateMirror>,
    paging: PagedCollectionConfig,
    eager_threshold: usize,
}

impl NodeMaterializer {
    pub fn new(
        service: Arc<dyn CourseDataService>,
        registry: Arc<CollectionRegistry>,
        mirror: Arc<ExpandStateMirror>,
        paging: PagedCollectionConfig,
        eager_threshold: usize,
    ) -> Self {
        Self {
            service,
            registry,
            mirror,
            paging,
            eager_threshold,
        }
    }

    pub fn eager_threshold(&self) -> usize {
        self.eager_threshold
    }

    /// Children of `parent`, or the organizations when `parent` is `None`.
    ///
    /// A failing listing call fails the whole materialization. Failing per-child lookups only
    /// empty that child's auxiliary fields.
    pub async fn children_of(&self, parent: Option<&TreeNode>) -> Result<Vec<TreeNode>, ApiError> {
        let Some(parent) = parent else {
            let organizations = self.service.list_organizations().await?;
            return Ok(self.with_expand_hints(
                organizations
                    .into_iter()
                    .map(|o| TreeNode::new(NodeData::Organization(o), true))
                    .collect(),
            ));
        };

        let children = match &parent.data {
            NodeData::Organization(organization) => self
                .service
                .list_course_families(&organization.id)
                .await?
                .into_iter()
                .map(|f| TreeNode::new(NodeData::CourseFamily(f), true))
                .collect(),
            NodeData::CourseFamily(family) => self
                .service
                .list_courses(&family.id)
                .await?
                .into_iter()
                .map(|c| TreeNode::new(NodeData::Course(c), true))
                .collect(),
            NodeData::Course(course) => vec![
                TreeNode::new(
                    NodeData::ContentsFolder {
                        course_id: course.id.clone(),
                    },
                    true,
                ),
                TreeNode::new(
                    NodeData::GroupsFolder {
                        course_id: course.id.clone(),
                    },
                    true,
                ),
            ],
            NodeData::ContentsFolder { course_id } => {
                self.content_children(course_id, None, parent.key()).await?
            }
            NodeData::Content(node) => {
                self.content_children(&node.content.course_id, Some(&node.content.path), parent.key())
                    .await?
            }
            NodeData::GroupsFolder { course_id } => self.group_children(course_id).await?,
            NodeData::Group(group) => self.member_children(&group.course_id, &group.id).await?,
            NodeData::Member(_) | NodeData::LoadMore(_) => Vec::new(),
        };
        Ok(self.with_expand_hints(children))
    }

    /// Next window after a load-more marker, followed by a new marker if more remain.
    pub async fn load_more(&self, marker: &LoadMoreMarker) -> Result<Vec<TreeNode>, ApiError> {
        let scope = PagedScope {
            parent: marker.parent.clone(),
            course_id: marker.course_id.clone(),
            kind: marker.collection_kind,
        };
        let key = scope.cache_key();
        let collection = self.registry.get(&key).ok_or_else(|| {
            ApiError::NotFound(format!(
                "Collection {} was refreshed; expand its parent again",
                key
            ))
        })?;
        let nodes = Self::window(&collection, &scope, marker.current_offset).await;
        Ok(self.with_expand_hints(nodes))
    }

    /// Materialize a single content node by id, with its auxiliary data resolved.
    pub async fn content_node(&self, course_id: &str, content_id: &str) -> Result<TreeNode, ApiError> {
        let contents = self.service.list_course_contents(course_id).await?;
        let index = HierarchyIndex::build(&contents);
        let content = contents
            .iter()
            .find(|c| c.id == content_id)
            .ok_or_else(|| {
                ApiError::NotFound(format!("Content {} in course {}", content_id, course_id))
            })?;
        let row = ContentRow {
            content: content.clone(),
            has_children: index.has_children_path(&content.path),
        };
        let types = self
            .service
            .list_content_types(course_id)
            .await
            .unwrap_or_else(|e| {
                warn!(course_id, error = %e, "Listing content types failed; resolving per child");
                Vec::new()
            });
        let resolver = AuxResolver::new(Arc::clone(&self.service), course_id, types);
        let mut nodes = self.with_expand_hints(vec![resolver.resolve(&row).await]);
        nodes
            .pop()
            .ok_or_else(|| ApiError::NotFound(format!("Content {}", content_id)))
    }

    async fn content_children(
        &self,
        course_id: &str,
        parent_path: Option<&str>,
        parent: NodeKey,
    ) -> Result<Vec<TreeNode>, ApiError> {
        let scope = PagedScope {
            parent,
            course_id: course_id.to_string(),
            kind: CollectionKind::Contents,
        };
        if let Some(collection) = self.registry.get(&scope.cache_key()) {
            debug!(cache_key = %scope.cache_key(), "Reusing paged children");
            return Ok(Self::window(&collection, &scope, 0).await);
        }

        let contents: Vec<CourseContent> = self
            .service
            .list_course_contents(course_id)
            .await?
            .into_iter()
            .filter(|c| c.archived_at.is_none())
            .collect();
        let types = match self.service.list_content_types(course_id).await {
            Ok(types) => types,
            Err(e) => {
                warn!(course_id, error = %e, "Listing content types failed; resolving per child");
                Vec::new()
            }
        };

        let index = HierarchyIndex::build(&contents);
        let siblings = match parent_path {
            Some(path) => index.children_of_path(path),
            None => index.roots(),
        };
        let rows: Vec<ContentRow> = siblings
            .iter()
            .map(|content| ContentRow {
                content: (*content).clone(),
                has_children: index.has_children_path(&content.path),
            })
            .collect();
        let resolver = Arc::new(AuxResolver::new(
            Arc::clone(&self.service),
            course_id,
            types,
        ));

        if rows.len() <= self.eager_threshold {
            debug!(course_id, count = rows.len(), "Materializing content eagerly");
            let mut nodes = Vec::with_capacity(rows.len());
            for row in &rows {
                nodes.push(resolver.resolve(row).await);
            }
            return Ok(nodes);
        }

        debug!(course_id, count = rows.len(), "Paging content children");
        let loader = ContentPageLoader {
            rows: Arc::new(rows),
            resolver,
        };
        let collection = self.paged(&scope, loader);
        Ok(Self::window(&collection, &scope, 0).await)
    }

    async fn group_children(&self, course_id: &str) -> Result<Vec<TreeNode>, ApiError> {
        let scope = PagedScope {
            parent: NodeKey::new(NodeKind::GroupsFolder, course_id),
            course_id: course_id.to_string(),
            kind: CollectionKind::Groups,
        };
        let nodes = || async {
            Ok::<_, ApiError>(self
                .service
                .list_course_groups(course_id)
                .await?
                .into_iter()
                .map(|g| TreeNode::new(NodeData::Group(g), true))
                .collect())
        };
        self.prebuilt_children(&scope, nodes).await
    }

    async fn member_children(
        &self,
        course_id: &str,
        group_id: &str,
    ) -> Result<Vec<TreeNode>, ApiError> {
        let scope = PagedScope {
            parent: NodeKey::new(NodeKind::Group, group_id),
            course_id: course_id.to_string(),
            kind: CollectionKind::Members,
        };
        let nodes = || async {
            Ok::<_, ApiError>(self
                .service
                .list_group_members(course_id, group_id)
                .await?
                .into_iter()
                .map(|m| TreeNode::new(NodeData::Member(m), false))
                .collect())
        };
        self.prebuilt_children(&scope, nodes).await
    }

    async fn prebuilt_children<F, Fut>(
        &self,
        scope: &PagedScope,
        fetch: F,
    ) -> Result<Vec<TreeNode>, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<TreeNode>, ApiError>>,
    {
        if let Some(collection) = self.registry.get(&scope.cache_key()) {
            return Ok(Self::window(&collection, scope, 0).await);
        }
        let nodes = fetch().await?;
        if nodes.len() <= self.eager_threshold {
            return Ok(nodes);
        }
        debug!(cache_key = %scope.cache_key(), count = nodes.len(), "Paging children");
        let collection = self.paged(
            scope,
            PrebuiltPageLoader {
                nodes: Arc::new(nodes),
            },
        );
        Ok(Self::window(&collection, scope, 0).await)
    }

    fn paged<L>(&self, scope: &PagedScope, loader: L) -> PagedCollection<TreeNode>
    where
        L: PageLoader<TreeNode> + 'static,
    {
        let key = scope.cache_key();
        let label = key.to_string();
        let config = self.paging.clone();
        self.registry.get_or_insert_with(key, &scope.course_id, move || {
            PagedCollection::new(label, config, loader)
        })
    }

    /// One page-sized window starting at `offset`, plus a load-more marker if more remain.
    async fn window(
        collection: &PagedCollection<TreeNode>,
        scope: &PagedScope,
        offset: usize,
    ) -> Vec<TreeNode> {
        let page_size = collection.config().page_size;
        let mut nodes = collection.get_items(offset, page_size).await;
        let next_offset = offset + nodes.len();
        let total = collection.total_count().unwrap_or(0);
        if !nodes.is_empty() && next_offset < total {
            nodes.push(TreeNode::new(
                NodeData::LoadMore(LoadMoreMarker {
                    parent: scope.parent.clone(),
                    course_id: scope.course_id.clone(),
                    collection_kind: scope.kind,
                    current_offset: next_offset,
                    page_size,
                }),
                false,
            ));
        }
        nodes
    }

    fn with_expand_hints(&self, mut nodes: Vec<TreeNode>) -> Vec<TreeNode> {
        for node in nodes.iter_mut().filter(|n| n.has_children) {
            node.expanded = self.mirror.is_expanded(&node.expand_key());
        }
        nodes
    }
}
