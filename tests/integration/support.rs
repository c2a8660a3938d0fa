//! In-memory course service with call counting, plus fixture builders.

use async_trait::async_trait;
use coursetree::config::TreeConfig;
use coursetree::error::ApiError;
use coursetree::expand_state::{ExpandStateStore, MemoryExpandStateStore};
use coursetree::remote::{
    ContentKind, Course, CourseContent, CourseContentType, CourseContentUpdate, CourseDataService,
    CourseFamily, CourseGroup, CourseMember, EntityRef, Example, NewCourseContent, Organization,
};
use coursetree::tree::TreeProvider;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub const ASSIGNMENT_TYPE: &str = "t-assignment";
pub const READING_TYPE: &str = "t-reading";

#[derive(Default)]
pub struct MockCourseService {
    pub organizations: Mutex<Vec<Organization>>,
    pub families: Mutex<Vec<CourseFamily>>,
    pub courses: Mutex<Vec<Course>>,
    pub contents: Mutex<Vec<CourseContent>>,
    pub types: Mutex<Vec<CourseContentType>>,
    /// Types only reachable through `get_content_type`, not the course listing
    pub unlisted_types: Mutex<Vec<CourseContentType>>,
    pub examples: Mutex<Vec<Example>>,
    pub groups: Mutex<Vec<CourseGroup>>,
    pub members: Mutex<Vec<CourseMember>>,
    /// `(course, content, example, version)` per attach call
    pub attached: Mutex<Vec<(String, String, String, String)>>,
    calls: Mutex<HashMap<String, usize>>,
    failing: Mutex<HashSet<String>>,
    next_id: Mutex<usize>,
}

impl MockCourseService {
    /// One organization, one family, courses `c1` and `c2`, assignment and reading types.
    pub fn sample() -> Self {
        let service = Self::default();
        *service.organizations.lock() = vec![Organization {
            id: "o1".to_string(),
            title: Some("University".to_string()),
            path: "uni".to_string(),
        }];
        *service.families.lock() = vec![CourseFamily {
            id: "f1".to_string(),
            title: Some("Programming".to_string()),
            path: "uni.prog".to_string(),
            organization_id: "o1".to_string(),
        }];
        *service.courses.lock() = vec![course("c1"), course("c2")];
        *service.types.lock() = vec![
            content_type(ASSIGNMENT_TYPE, "c1", true),
            content_type(READING_TYPE, "c1", false),
            content_type(ASSIGNMENT_TYPE, "c2", true),
        ];
        service
    }

    pub fn with_contents(self, contents: Vec<CourseContent>) -> Self {
        self.contents.lock().extend(contents);
        self
    }

    pub fn with_groups(self, course_id: &str, count: usize) -> Self {
        self.groups.lock().extend((0..count).map(|i| CourseGroup {
            id: format!("{}-g{}", course_id, i),
            title: Some(format!("Group {}", i)),
            course_id: course_id.to_string(),
        }));
        self
    }

    pub fn with_example(self, id: &str, title: &str) -> Self {
        self.examples.lock().push(Example {
            id: id.to_string(),
            title: title.to_string(),
            identifier: format!("examples.{}", id),
            directory: Some(id.to_string()),
            repository_url: None,
        });
        self
    }

    pub fn fail(&self, operation: &str) {
        self.failing.lock().insert(operation.to_string());
    }

    pub fn recover(&self, operation: &str) {
        self.failing.lock().remove(operation);
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.calls.lock().get(operation).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }

    fn record(&self, operation: &str) -> Result<(), ApiError> {
        *self.calls.lock().entry(operation.to_string()).or_insert(0) += 1;
        if self.failing.lock().contains(operation) {
            return Err(ApiError::remote(operation, "HTTP 503: unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl CourseDataService for MockCourseService {
    async fn list_organizations(&self) -> Result<Vec<Organization>, ApiError> {
        self.record("list_organizations")?;
        Ok(self.organizations.lock().clone())
    }

    async fn list_course_families(
        &self,
        organization_id: &str,
    ) -> Result<Vec<CourseFamily>, ApiError> {
        self.record("list_course_families")?;
        Ok(self
            .families
            .lock()
            .iter()
            .filter(|f| f.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn list_courses(&self, course_family_id: &str) -> Result<Vec<Course>, ApiError> {
        self.record("list_courses")?;
        Ok(self
            .courses
            .lock()
            .iter()
            .filter(|c| c.course_family_id == course_family_id)
            .cloned()
            .collect())
    }

    async fn list_course_contents(&self, course_id: &str) -> Result<Vec<CourseContent>, ApiError> {
        self.record("list_course_contents")?;
        Ok(self
            .contents
            .lock()
            .iter()
            .filter(|c| c.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn list_content_types(
        &self,
        course_id: &str,
    ) -> Result<Vec<CourseContentType>, ApiError> {
        self.record("list_content_types")?;
        Ok(self
            .types
            .lock()
            .iter()
            .filter(|t| t.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn get_content_type(&self, type_id: &str) -> Result<Option<CourseContentType>, ApiError> {
        self.record("get_content_type")?;
        let listed = self.types.lock().iter().find(|t| t.id == type_id).cloned();
        Ok(listed.or_else(|| {
            self.unlisted_types
                .lock()
                .iter()
                .find(|t| t.id == type_id)
                .cloned()
        }))
    }

    async fn get_example(&self, example_id: &str) -> Result<Option<Example>, ApiError> {
        self.record("get_example")?;
        Ok(self
            .examples
            .lock()
            .iter()
            .find(|e| e.id == example_id)
            .cloned())
    }

    async fn list_course_groups(&self, course_id: &str) -> Result<Vec<CourseGroup>, ApiError> {
        self.record("list_course_groups")?;
        Ok(self
            .groups
            .lock()
            .iter()
            .filter(|g| g.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn list_group_members(
        &self,
        course_id: &str,
        group_id: &str,
    ) -> Result<Vec<CourseMember>, ApiError> {
        self.record("list_group_members")?;
        Ok(self
            .members
            .lock()
            .iter()
            .filter(|m| m.course_id == course_id && m.course_group_id.as_deref() == Some(group_id))
            .cloned()
            .collect())
    }

    async fn attach_example(
        &self,
        course_id: &str,
        content_id: &str,
        example_id: &str,
        version: &str,
    ) -> Result<(), ApiError> {
        self.record("attach_example")?;
        self.attached.lock().push((
            course_id.to_string(),
            content_id.to_string(),
            example_id.to_string(),
            version.to_string(),
        ));
        if let Some(content) = self
            .contents
            .lock()
            .iter_mut()
            .find(|c| c.id == content_id)
        {
            content.example_id = Some(example_id.to_string());
            content.example_version = Some(version.to_string());
        }
        Ok(())
    }

    async fn create_content(&self, content: &NewCourseContent) -> Result<CourseContent, ApiError> {
        self.record("create_content")?;
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            format!("new-{}", *next)
        };
        let created = CourseContent {
            id,
            course_id: content.course_id.clone(),
            title: Some(content.title.clone()),
            path: content.path.clone(),
            position: content.position,
            course_content_type_id: content.course_content_type_id.clone(),
            example_id: None,
            example_version: None,
            archived_at: None,
        };
        self.contents.lock().push(created.clone());
        Ok(created)
    }

    async fn update_content(
        &self,
        content_id: &str,
        update: &CourseContentUpdate,
    ) -> Result<CourseContent, ApiError> {
        self.record("update_content")?;
        let mut contents = self.contents.lock();
        let content = contents
            .iter_mut()
            .find(|c| c.id == content_id)
            .ok_or_else(|| ApiError::NotFound(format!("course-contents/{}", content_id)))?;
        if let Some(title) = &update.title {
            content.title = Some(title.clone());
        }
        if let Some(path) = &update.path {
            content.path = path.clone();
        }
        if let Some(position) = update.position {
            content.position = position;
        }
        if let Some(type_id) = &update.course_content_type_id {
            content.course_content_type_id = type_id.clone();
        }
        Ok(content.clone())
    }

    async fn delete_content(&self, content_id: &str) -> Result<(), ApiError> {
        self.record("delete_content")?;
        self.contents.lock().retain(|c| c.id != content_id);
        Ok(())
    }

    async fn rename_entity(&self, entity: &EntityRef, title: &str) -> Result<(), ApiError> {
        self.record("rename_entity")?;
        match entity {
            EntityRef::Organization(id) => {
                for o in self.organizations.lock().iter_mut().filter(|o| &o.id == id) {
                    o.title = Some(title.to_string());
                }
            }
            EntityRef::CourseGroup(id) => {
                for g in self.groups.lock().iter_mut().filter(|g| &g.id == id) {
                    g.title = Some(title.to_string());
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn create_course_group(
        &self,
        course_id: &str,
        title: &str,
    ) -> Result<CourseGroup, ApiError> {
        self.record("create_course_group")?;
        let group = CourseGroup {
            id: format!("{}-g-new", course_id),
            title: Some(title.to_string()),
            course_id: course_id.to_string(),
        };
        self.groups.lock().push(group.clone());
        Ok(group)
    }

    async fn release_contents(
        &self,
        _course_id: &str,
        _content_ids: &[String],
    ) -> Result<(), ApiError> {
        self.record("release_contents")?;
        Ok(())
    }
}

pub fn course(id: &str) -> Course {
    Course {
        id: id.to_string(),
        title: Some(format!("Course {}", id)),
        path: format!("uni.prog.{}", id),
        course_family_id: "f1".to_string(),
        organization_id: "o1".to_string(),
    }
}

pub fn content_type(id: &str, course_id: &str, submittable: bool) -> CourseContentType {
    CourseContentType {
        id: id.to_string(),
        slug: id.trim_start_matches("t-").to_string(),
        title: None,
        color: None,
        course_id: course_id.to_string(),
        course_content_kind: ContentKind {
            id: if submittable { "assignment" } else { "unit" }.to_string(),
            title: None,
            submittable,
            has_descendants: !submittable,
        },
    }
}

pub fn content(id: &str, course_id: &str, path: &str, position: i64, type_id: &str) -> CourseContent {
    CourseContent {
        id: id.to_string(),
        course_id: course_id.to_string(),
        title: None,
        path: path.to_string(),
        position,
        course_content_type_id: type_id.to_string(),
        example_id: None,
        example_version: None,
        archived_at: None,
    }
}

/// `count` root-level assignments named `item000`, `item001`, ...
pub fn flat_contents(course_id: &str, count: usize) -> Vec<CourseContent> {
    (0..count)
        .map(|i| {
            content(
                &format!("{}-x{}", course_id, i),
                course_id,
                &format!("item{:03}", i),
                i as i64,
                ASSIGNMENT_TYPE,
            )
        })
        .collect()
}

/// Small pages and thresholds so paging kicks in on tiny fixtures, prefetch off.
pub fn paging_config(eager_threshold: usize, page_size: usize) -> TreeConfig {
    let mut config = TreeConfig::default();
    config.materializer.eager_threshold = eager_threshold;
    config.paging.page_size = page_size;
    config.paging.prefetch_enabled = false;
    config
}

pub async fn provider_with(
    service: Arc<MockCourseService>,
    config: &TreeConfig,
    expanded: &[&str],
) -> TreeProvider {
    let store: Arc<dyn ExpandStateStore> = Arc::new(MemoryExpandStateStore::with_entries(
        expanded.iter().map(|key| (key.to_string(), true)),
    ));
    TreeProvider::new(service, config, store).await
}
