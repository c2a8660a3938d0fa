//! Tree provider
//!
//! Owns the remote service, the collection registry, the expand-state mirror and the
//! notification sink for one session, and exposes the tree's command surface. Every mutation
//! goes through the invalidation coordinator before it returns, so no stale page is served
//! after a mutating call completes.

use crate::config::TreeConfig;
use crate::error::ApiError;
use crate::expand_state::{ExpandStateMirror, ExpandStateStore};
use crate::paging::CollectionState;
use crate::remote::{
    CourseContent, CourseContentUpdate, CourseDataService, CourseGroup, EntityRef, Example,
    NewCourseContent,
};
use crate::tree::assignment::{AssignmentOutcome, AssignmentProtocol, ConfirmationPrompt};
use crate::tree::events::{TreeChange, TreeEvents};
use crate::tree::invalidation::{InvalidationCoordinator, RefreshPlan};
use crate::tree::materializer::NodeMaterializer;
use crate::tree::node::{NodeData, TreeNode};
use crate::tree::registry::CollectionRegistry;
use crate::tree::repository::{CloneRequest, RepositoryService};
use crate::types::{CacheKey, ChangeKind, EntityKind, InvalidationEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// One content update of a batch
#[derive(Debug, Clone)]
pub struct ContentUpdateRequest {
    pub course_id: String,
    pub content_id: String,
    pub update: CourseContentUpdate,
}

pub struct TreeProvider {
    service: Arc<dyn CourseDataService>,
    registry: Arc<CollectionRegistry>,
    mirror: Arc<ExpandStateMirror>,
    events: TreeEvents,
    materializer: NodeMaterializer,
    coordinator: Arc<InvalidationCoordinator>,
    assignment: AssignmentProtocol,
    repository: Option<Arc<dyn RepositoryService>>,
}

impl TreeProvider {
    /// Build a provider; the expand-state store is read once here.
    pub async fn new(
        service: Arc<dyn CourseDataService>,
        config: &TreeConfig,
        expand_store: Arc<dyn ExpandStateStore>,
    ) -> Self {
        let registry = Arc::new(CollectionRegistry::new());
        let mirror = Arc::new(ExpandStateMirror::load(expand_store).await);
        let events = TreeEvents::new();
        let materializer = NodeMaterializer::new(
            Arc::clone(&service),
            Arc::clone(&registry),
            Arc::clone(&mirror),
            config.paging.collection_config(),
            config.materializer.eager_threshold,
        );
        let coordinator = Arc::new(InvalidationCoordinator::new(
            Arc::clone(&registry),
            Arc::clone(&mirror),
            events.clone(),
        ));
        let assignment = AssignmentProtocol::new(Arc::clone(&service), Arc::clone(&coordinator));
        Self {
            service,
            registry,
            mirror,
            events,
            materializer,
            coordinator,
            assignment,
            repository: None,
        }
    }

    pub fn with_repository(mut self, repository: Arc<dyn RepositoryService>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TreeChange> {
        self.events.subscribe()
    }

    pub async fn get_children(&self, parent: Option<&TreeNode>) -> Result<Vec<TreeNode>, ApiError> {
        match self.materializer.children_of(parent).await {
            Ok(children) => Ok(children),
            Err(e) => {
                match parent {
                    None => error!(error = %e, "Listing organizations failed"),
                    Some(node) => warn!(
                        node_id = %node.id(),
                        kind = ?node.kind(),
                        error = %e,
                        "Listing children failed"
                    ),
                }
                Err(e)
            }
        }
    }

    /// Look up one content node, e.g. as an assignment target chosen outside the tree.
    pub async fn find_content(&self, course_id: &str, content_id: &str) -> Result<TreeNode, ApiError> {
        self.materializer.content_node(course_id, content_id).await
    }

    pub async fn load_more(&self, marker: &TreeNode) -> Result<Vec<TreeNode>, ApiError> {
        let marker = marker.as_load_more().ok_or_else(|| {
            ApiError::InvalidNode(format!("'{}' is not a load-more marker", marker.label()))
        })?;
        self.materializer.load_more(marker).await
    }

    pub async fn set_expanded(&self, node: &TreeNode, expanded: bool) {
        self.mirror.set_expanded(&node.expand_key(), expanded).await;
    }

    pub fn is_expanded(&self, node: &TreeNode) -> bool {
        self.mirror.is_expanded(&node.expand_key())
    }

    pub fn refresh_all(&self) {
        self.coordinator.full_refresh();
    }

    pub fn refresh_course(&self, course_id: &str) {
        self.coordinator.force_refresh_course(course_id);
    }

    /// Apply the refresh plan for externally observed changes.
    pub fn apply_changes(&self, changes: &[InvalidationEvent]) -> RefreshPlan {
        self.coordinator.smart_refresh(changes)
    }

    pub async fn create_content(&self, content: &NewCourseContent) -> Result<CourseContent, ApiError> {
        let created = self.service.create_content(content).await?;
        self.coordinator.smart_refresh(&[InvalidationEvent::new(
            EntityKind::CourseContent,
            created.id.clone(),
            ChangeKind::Created,
        )
        .with_course(content.course_id.clone())]);
        Ok(created)
    }

    pub async fn update_content(
        &self,
        course_id: &str,
        content_id: &str,
        update: &CourseContentUpdate,
    ) -> Result<CourseContent, ApiError> {
        let updated = self.service.update_content(content_id, update).await?;
        self.coordinator.smart_refresh(&[InvalidationEvent::new(
            EntityKind::CourseContent,
            content_id,
            ChangeKind::Updated,
        )
        .with_course(course_id)]);
        Ok(updated)
    }

    pub async fn delete_content(&self, course_id: &str, content_id: &str) -> Result<(), ApiError> {
        self.service.delete_content(content_id).await?;
        self.coordinator.smart_refresh(&[InvalidationEvent::new(
            EntityKind::CourseContent,
            content_id,
            ChangeKind::Deleted,
        )
        .with_course(course_id)]);
        Ok(())
    }

    /// Apply several updates, then refresh once for all that succeeded.
    ///
    /// Stops at the first failure; the updates applied before it are still refreshed.
    pub async fn batch_update_contents(
        &self,
        requests: &[ContentUpdateRequest],
    ) -> Result<Vec<CourseContent>, ApiError> {
        let mut updated = Vec::with_capacity(requests.len());
        let mut changes = Vec::with_capacity(requests.len());
        let mut failure = None;
        for request in requests {
            match self
                .service
                .update_content(&request.content_id, &request.update)
                .await
            {
                Ok(content) => {
                    changes.push(
                        InvalidationEvent::new(
                            EntityKind::CourseContent,
                            request.content_id.clone(),
                            ChangeKind::Updated,
                        )
                        .with_course(request.course_id.clone()),
                    );
                    updated.push(content);
                }
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        self.coordinator.smart_refresh(&changes);
        match failure {
            Some(e) => Err(e),
            None => Ok(updated),
        }
    }

    /// Rename the entity behind `node`.
    pub async fn rename(&self, node: &TreeNode, title: &str) -> Result<(), ApiError> {
        let event = match &node.data {
            NodeData::Organization(o) => {
                self.service
                    .rename_entity(&EntityRef::Organization(o.id.clone()), title)
                    .await?;
                InvalidationEvent::new(EntityKind::Organization, o.id.clone(), ChangeKind::Updated)
            }
            NodeData::CourseFamily(f) => {
                self.service
                    .rename_entity(&EntityRef::CourseFamily(f.id.clone()), title)
                    .await?;
                InvalidationEvent::new(EntityKind::CourseFamily, f.id.clone(), ChangeKind::Updated)
                    .with_organization(f.organization_id.clone())
            }
            NodeData::Course(c) => {
                self.service
                    .rename_entity(&EntityRef::Course(c.id.clone()), title)
                    .await?;
                InvalidationEvent::new(EntityKind::Course, c.id.clone(), ChangeKind::Updated)
                    .with_organization(c.organization_id.clone())
            }
            NodeData::Content(c) => {
                let update = CourseContentUpdate {
                    title: Some(title.to_string()),
                    ..Default::default()
                };
                self.service.update_content(&c.content.id, &update).await?;
                InvalidationEvent::new(
                    EntityKind::CourseContent,
                    c.content.id.clone(),
                    ChangeKind::Updated,
                )
                .with_course(c.content.course_id.clone())
            }
            NodeData::Group(g) => {
                self.service
                    .rename_entity(&EntityRef::CourseGroup(g.id.clone()), title)
                    .await?;
                InvalidationEvent::new(EntityKind::CourseGroup, g.id.clone(), ChangeKind::Updated)
                    .with_course(g.course_id.clone())
            }
            _ => {
                return Err(ApiError::InvalidNode(format!(
                    "'{}' cannot be renamed",
                    node.label()
                )))
            }
        };
        self.coordinator.smart_refresh(&[event]);
        Ok(())
    }

    pub async fn rename_content_type(
        &self,
        course_id: &str,
        type_id: &str,
        title: &str,
    ) -> Result<(), ApiError> {
        self.service
            .rename_entity(&EntityRef::CourseContentType(type_id.to_string()), title)
            .await?;
        self.coordinator.smart_refresh(&[InvalidationEvent::new(
            EntityKind::CourseContentType,
            type_id,
            ChangeKind::Updated,
        )
        .with_course(course_id)]);
        Ok(())
    }

    pub async fn create_group(&self, course_id: &str, title: &str) -> Result<CourseGroup, ApiError> {
        let group = self.service.create_course_group(course_id, title).await?;
        self.coordinator.smart_refresh(&[InvalidationEvent::new(
            EntityKind::CourseGroup,
            group.id.clone(),
            ChangeKind::Created,
        )
        .with_course(course_id)]);
        Ok(group)
    }

    /// Release contents to students and force the course to re-render.
    pub async fn release_course(&self, course_id: &str, content_ids: &[String]) -> Result<(), ApiError> {
        info!(course_id, count = content_ids.len(), "Releasing course contents");
        self.service.release_contents(course_id, content_ids).await?;
        self.coordinator.force_refresh_course(course_id);
        Ok(())
    }

    pub async fn assign_example(
        &self,
        target: &TreeNode,
        example: &Example,
        prompt: &dyn ConfirmationPrompt,
    ) -> Result<AssignmentOutcome, ApiError> {
        self.assignment.assign(target, example, prompt).await
    }

    /// Ask the repository service to clone the example attached to a content node.
    pub async fn request_clone(&self, node: &TreeNode) -> Result<PathBuf, ApiError> {
        let repository = self.repository.as_ref().ok_or_else(|| {
            ApiError::ConfigError("No repository service configured".to_string())
        })?;
        let content = node.as_content().ok_or_else(|| {
            ApiError::InvalidNode(format!("'{}' is not course content", node.label()))
        })?;
        let example_id = content.content.example_id.clone().ok_or_else(|| {
            ApiError::InvalidNode(format!("'{}' has no example attached", node.label()))
        })?;
        let request = CloneRequest {
            course_id: content.content.course_id.clone(),
            content_id: content.content.id.clone(),
            example_id,
            example_version: content.content.example_version.clone(),
            repository_url: content.example.as_ref().and_then(|e| e.repository_url.clone()),
            directory: content.example.as_ref().and_then(|e| e.directory.clone()),
        };
        repository.clone_example(&request).await
    }

    pub fn cache_state(&self) -> Vec<(CacheKey, CollectionState)> {
        self.registry.states()
    }
}
