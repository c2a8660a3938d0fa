//! `reqwest` implementation of the course data service.

use super::models::{
    Course, CourseContent, CourseContentType, CourseContentUpdate, CourseFamily, CourseGroup,
    CourseMember, EntityRef, Example, NewCourseContent, Organization,
};
use super::CourseDataService;
use crate::config::ApiConfig;
use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Course API client over HTTP
///
/// Authentication is injected by the caller through the `reqwest::Client` it hands in
/// (default headers, cookie store, ...); this type never sees credentials.
pub struct HttpCourseDataService {
    client: Client,
    base_url: Url,
}

impl HttpCourseDataService {
    pub fn new(client: Client, base_url: &str) -> Result<Self, ApiError> {
        if base_url.trim().is_empty() {
            return Err(ApiError::ConfigError("API base_url is empty".to_string()));
        }
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized).map_err(|e| {
            ApiError::ConfigError(format!("Invalid API base_url '{}': {}", base_url, e))
        })?;
        Ok(Self { client, base_url })
    }

    /// Build a client with the configured timeout and no extra headers.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Self::new(client, &config.base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| ApiError::ConfigError(format!("Invalid endpoint '{}': {}", path, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path, query)?;
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        let response = Self::check_status(path, response).await?;
        Ok(response.json::<T>().await?)
    }

    /// GET that maps 404 to `None`
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, ApiError> {
        let url = self.endpoint(path, &[])?;
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check_status(path, response).await?;
        Ok(Some(response.json::<T>().await?))
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, ApiError> {
        let url = self.endpoint(path, &[])?;
        debug!(%url, %method, "Sending");
        let response = self.client.request(method, url).json(body).send().await?;
        Self::check_status(path, response).await
    }

    async fn check_status(
        operation: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(operation.to_string()));
        }
        Err(ApiError::remote(
            operation,
            format!("HTTP {}: {}", status.as_u16(), body.trim()),
        ))
    }
}

#[async_trait]
impl CourseDataService for HttpCourseDataService {
    async fn list_organizations(&self) -> Result<Vec<Organization>, ApiError> {
        self.get_json("organizations", &[]).await
    }

    async fn list_course_families(
        &self,
        organization_id: &str,
    ) -> Result<Vec<CourseFamily>, ApiError> {
        self.get_json("course-families", &[("organization_id", organization_id)])
            .await
    }

    async fn list_courses(&self, course_family_id: &str) -> Result<Vec<Course>, ApiError> {
        self.get_json("courses", &[("course_family_id", course_family_id)])
            .await
    }

    async fn list_course_contents(&self, course_id: &str) -> Result<Vec<CourseContent>, ApiError> {
        self.get_json("course-contents", &[("course_id", course_id)])
            .await
    }

    async fn list_content_types(
        &self,
        course_id: &str,
    ) -> Result<Vec<CourseContentType>, ApiError> {
        self.get_json("course-content-types", &[("course_id", course_id)])
            .await
    }

    async fn get_content_type(&self, type_id: &str) -> Result<Option<CourseContentType>, ApiError> {
        self.get_optional(&format!("course-content-types/{}", type_id))
            .await
    }

    async fn get_example(&self, example_id: &str) -> Result<Option<Example>, ApiError> {
        self.get_optional(&format!("examples/{}", example_id)).await
    }

    async fn list_course_groups(&self, course_id: &str) -> Result<Vec<CourseGroup>, ApiError> {
        self.get_json("course-groups", &[("course_id", course_id)])
            .await
    }

    async fn list_group_members(
        &self,
        course_id: &str,
        group_id: &str,
    ) -> Result<Vec<CourseMember>, ApiError> {
        self.get_json(
            "course-members",
            &[("course_id", course_id), ("course_group_id", group_id)],
        )
        .await
    }

    async fn attach_example(
        &self,
        course_id: &str,
        content_id: &str,
        example_id: &str,
        version: &str,
    ) -> Result<(), ApiError> {
        let body = json!({
            "course_id": course_id,
            "example_id": example_id,
            "example_version": version,
        });
        self.send_json(
            reqwest::Method::POST,
            &format!("course-contents/{}/example", content_id),
            &body,
        )
        .await?;
        Ok(())
    }

    async fn create_content(&self, content: &NewCourseContent) -> Result<CourseContent, ApiError> {
        let response = self
            .send_json(reqwest::Method::POST, "course-contents", content)
            .await?;
        Ok(response.json().await?)
    }

    async fn update_content(
        &self,
        content_id: &str,
        update: &CourseContentUpdate,
    ) -> Result<CourseContent, ApiError> {
        let response = self
            .send_json(
                reqwest::Method::PATCH,
                &format!("course-contents/{}", content_id),
                update,
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn delete_content(&self, content_id: &str) -> Result<(), ApiError> {
        let path = format!("course-contents/{}", content_id);
        let url = self.endpoint(&path, &[])?;
        debug!(%url, "DELETE");
        let response = self.client.delete(url).send().await?;
        Self::check_status(&path, response).await?;
        Ok(())
    }

    async fn rename_entity(&self, entity: &EntityRef, title: &str) -> Result<(), ApiError> {
        self.send_json(
            reqwest::Method::PATCH,
            &format!("{}/{}", entity.collection(), entity.id()),
            &json!({ "title": title }),
        )
        .await?;
        Ok(())
    }

    async fn create_course_group(
        &self,
        course_id: &str,
        title: &str,
    ) -> Result<CourseGroup, ApiError> {
        let response = self
            .send_json(
                reqwest::Method::POST,
                "course-groups",
                &json!({ "course_id": course_id, "title": title }),
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn release_contents(
        &self,
        course_id: &str,
        content_ids: &[String],
    ) -> Result<(), ApiError> {
        self.send_json(
            reqwest::Method::POST,
            "system/release",
            &json!({ "course_id": course_id, "course_content_ids": content_ids }),
        )
        .await?;
        Ok(())
    }
}
