//! Remote course data service
//!
//! The tree consumes the course API only through `CourseDataService`. Authentication
//! and retry policy belong to the HTTP layer underneath it.

pub mod http;
pub mod models;

use crate::error::ApiError;
use async_trait::async_trait;

pub use http::HttpCourseDataService;
pub use models::{
    ContentKind, Course, CourseContent, CourseContentType, CourseContentUpdate, CourseFamily,
    CourseGroup, CourseMember, EntityRef, Example, NewCourseContent, Organization,
};

/// Version tag used when attaching the newest example release
pub const LATEST_EXAMPLE_VERSION: &str = "latest";

#[async_trait]
pub trait CourseDataService: Send + Sync {
    async fn list_organizations(&self) -> Result<Vec<Organization>, ApiError>;

    async fn list_course_families(
        &self,
        organization_id: &str,
    ) -> Result<Vec<CourseFamily>, ApiError>;

    async fn list_courses(&self, course_family_id: &str) -> Result<Vec<Course>, ApiError>;

    /// Every content row of a course, flat; hierarchy comes from the paths.
    async fn list_course_contents(&self, course_id: &str) -> Result<Vec<CourseContent>, ApiError>;

    async fn list_content_types(&self, course_id: &str)
        -> Result<Vec<CourseContentType>, ApiError>;

    async fn get_content_type(&self, type_id: &str) -> Result<Option<CourseContentType>, ApiError>;

    async fn get_example(&self, example_id: &str) -> Result<Option<Example>, ApiError>;

    async fn list_course_groups(&self, course_id: &str) -> Result<Vec<CourseGroup>, ApiError>;

    async fn list_group_members(
        &self,
        course_id: &str,
        group_id: &str,
    ) -> Result<Vec<CourseMember>, ApiError>;

    async fn attach_example(
        &self,
        course_id: &str,
        content_id: &str,
        example_id: &str,
        version: &str,
    ) -> Result<(), ApiError>;

    async fn create_content(&self, content: &NewCourseContent) -> Result<CourseContent, ApiError>;

    async fn update_content(
        &self,
        content_id: &str,
        update: &CourseContentUpdate,
    ) -> Result<CourseContent, ApiError>;

    async fn delete_content(&self, content_id: &str) -> Result<(), ApiError>;

    async fn rename_entity(&self, entity: &EntityRef, title: &str) -> Result<(), ApiError>;

    async fn create_course_group(&self, course_id: &str, title: &str)
        -> Result<CourseGroup, ApiError>;

    /// Release content to students. Long-running on the server side.
    async fn release_contents(&self, course_id: &str, content_ids: &[String])
        -> Result<(), ApiError>;
}
