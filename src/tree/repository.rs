//! Repository service used to check out example repositories for content nodes.

use crate::error::ApiError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// What to clone for one content node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneRequest {
    pub course_id: String,
    pub content_id: String,
    pub example_id: String,
    pub example_version: Option<String>,
    pub repository_url: Option<String>,
    pub directory: Option<String>,
}

/// Git clone/open operations; the Git workflow itself lives outside this crate.
#[async_trait]
pub trait RepositoryService: Send + Sync {
    /// Clone (or reuse) the repository and return its local path.
    async fn clone_example(&self, request: &CloneRequest) -> Result<PathBuf, ApiError>;

    async fn open(&self, path: &Path) -> Result<(), ApiError>;
}
