//! Course API payloads.

use crate::hierarchy::PathRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub path: String,
}

impl Organization {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseFamily {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub path: String,
    pub organization_id: String,
}

impl CourseFamily {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub path: String,
    pub course_family_id: String,
    pub organization_id: String,
}

impl Course {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.path)
    }
}

/// One row of a course's content tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseContent {
    pub id: String,
    pub course_id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Materialized path, e.g. `"week1.ex1"`
    pub path: String,
    pub position: i64,
    pub course_content_type_id: String,
    #[serde(default)]
    pub example_id: Option<String>,
    #[serde(default)]
    pub example_version: Option<String>,
    #[serde(default)]
    pub archived_at: Option<DateTime<Utc>>,
}

impl CourseContent {
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .unwrap_or_else(|| self.path.rsplit('.').next().unwrap_or(&self.path))
    }

    pub fn has_example(&self) -> bool {
        self.example_id.is_some()
    }
}

impl PathRecord for CourseContent {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn position(&self) -> i64 {
        self.position
    }
}

/// Classification of a content type (e.g. assignment, unit, reading)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentKind {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Whether content of this kind accepts an example and student submissions
    pub submittable: bool,
    #[serde(default)]
    pub has_descendants: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseContentType {
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    pub course_id: String,
    pub course_content_kind: ContentKind,
}

impl CourseContentType {
    pub fn is_submittable(&self) -> bool {
        self.course_content_kind.submittable
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.slug)
    }
}

/// Reusable example that can be attached to submittable content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub id: String,
    pub title: String,
    pub identifier: String,
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub repository_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseGroup {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub course_id: String,
}

impl CourseGroup {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseMember {
    pub id: String,
    pub course_id: String,
    #[serde(default)]
    pub course_group_id: Option<String>,
    pub user_name: String,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    pub role: String,
}

impl CourseMember {
    pub fn display_name(&self) -> String {
        match (&self.given_name, &self.family_name) {
            (Some(given), Some(family)) => format!("{} {}", given, family),
            (Some(given), None) => given.clone(),
            (None, Some(family)) => family.clone(),
            (None, None) => self.user_name.clone(),
        }
    }
}

/// Body of a content create call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCourseContent {
    pub course_id: String,
    pub title: String,
    pub path: String,
    pub position: i64,
    pub course_content_type_id: String,
}

/// Partial content update; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseContentUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_content_type_id: Option<String>,
}

/// Entity addressed by a rename
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "entity", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Organization(String),
    CourseFamily(String),
    Course(String),
    CourseContentType(String),
    CourseGroup(String),
}

impl EntityRef {
    pub fn id(&self) -> &str {
        match self {
            EntityRef::Organization(id)
            | EntityRef::CourseFamily(id)
            | EntityRef::Course(id)
            | EntityRef::CourseContentType(id)
            | EntityRef::CourseGroup(id) => id,
        }
    }

    /// REST collection segment for this entity
    pub fn collection(&self) -> &'static str {
        match self {
            EntityRef::Organization(_) => "organizations",
            EntityRef::CourseFamily(_) => "course-families",
            EntityRef::Course(_) => "courses",
            EntityRef::CourseContentType(_) => "course-content-types",
            EntityRef::CourseGroup(_) => "course-groups",
        }
    }
}
