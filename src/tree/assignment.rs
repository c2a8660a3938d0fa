//! Drag-and-drop assignment of an example onto a content node.

use crate::error::ApiError;
use crate::remote::{CourseDataService, Example, LATEST_EXAMPLE_VERSION};
use crate::tree::invalidation::InvalidationCoordinator;
use crate::tree::node::TreeNode;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Asks the user whether an attached example may be replaced.
#[async_trait]
pub trait ConfirmationPrompt: Send + Sync {
    async fn confirm_replace(&self, content_title: &str, current: &str, replacement: &str) -> bool;
}

/// Prompt that answers every question the same way.
pub struct FixedAnswer(pub bool);

#[async_trait]
impl ConfirmationPrompt for FixedAnswer {
    async fn confirm_replace(&self, _content_title: &str, _current: &str, _replacement: &str) -> bool {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentOutcome {
    Assigned {
        course_id: String,
        content_id: String,
        example_id: String,
    },
    /// The user declined to replace the current example; nothing was sent
    Declined,
}

pub struct AssignmentProtocol {
    service: Arc<dyn CourseDataService>,
    coordinator: Arc<InvalidationCoordinator>,
}

impl AssignmentProtocol {
    pub fn new(service: Arc<dyn CourseDataService>, coordinator: Arc<InvalidationCoordinator>) -> Self {
        Self {
            service,
            coordinator,
        }
    }

    /// Attach `example` to `target`.
    ///
    /// Targets that are not submittable content are rejected before any remote call. The
    /// attach error, if any, is returned as is and no cache is touched.
    pub async fn assign(
        &self,
        target: &TreeNode,
        example: &Example,
        prompt: &dyn ConfirmationPrompt,
    ) -> Result<AssignmentOutcome, ApiError> {
        let content = target.as_content().ok_or_else(|| {
            ApiError::UnsupportedDropTarget(format!(
                "Examples can only be dropped onto course content, not '{}'",
                target.label()
            ))
        })?;
        match content.submittable() {
            Some(true) => {}
            Some(false) => {
                return Err(ApiError::UnsupportedDropTarget(format!(
                    "'{}' does not accept examples",
                    target.label()
                )))
            }
            None => {
                return Err(ApiError::UnsupportedDropTarget(format!(
                    "The content type of '{}' is unknown",
                    target.label()
                )))
            }
        }

        let course_id = content.content.course_id.clone();
        let content_id = content.content.id.clone();

        if let Some(current_id) = &content.content.example_id {
            let current = content
                .example
                .as_ref()
                .map(|e| e.title.as_str())
                .unwrap_or(current_id.as_str());
            if !prompt
                .confirm_replace(&target.label(), current, &example.title)
                .await
            {
                info!(course_id = %course_id, content_id = %content_id, "Example replacement declined");
                return Ok(AssignmentOutcome::Declined);
            }
        }

        if let Err(e) = self
            .service
            .attach_example(&course_id, &content_id, &example.id, LATEST_EXAMPLE_VERSION)
            .await
        {
            warn!(course_id = %course_id, content_id = %content_id, error = %e, "Attaching example failed");
            return Err(e);
        }
        info!(
            course_id = %course_id,
            content_id = %content_id,
            example_id = %example.id,
            "Example assigned"
        );

        self.coordinator.force_refresh_course(&course_id);
        Ok(AssignmentOutcome::Assigned {
            course_id,
            content_id,
            example_id: example.id.clone(),
        })
    }
}
