//! View-nodes handed to the UI layer
//!
//! `TreeNode` carries the shared contract (`id`, `label`, `collapsible_hint`, `context_kind`)
//! plus per-kind data in `NodeData`. Per-kind rendering is a match over the tag.

use crate::remote::{
    Course, CourseContent, CourseContentType, CourseFamily, CourseGroup, CourseMember, Example,
    Organization,
};
use crate::types::{CollectionKind, NodeKey, NodeKind};
use serde::Serialize;

/// How the UI should draw the expand affordance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollapsibleHint {
    None,
    Collapsed,
    Expanded,
}

/// Content row together with its resolved auxiliary data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentNode {
    pub content: CourseContent,
    /// Left empty when the type lookup failed
    pub content_type: Option<CourseContentType>,
    /// Left empty when there is no example or its lookup failed
    pub example: Option<Example>,
}

impl ContentNode {
    /// `None` while the content type is unknown.
    pub fn submittable(&self) -> Option<bool> {
        self.content_type.as_ref().map(|t| t.is_submittable())
    }
}

/// Synthetic node asking for the next window of a paged collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadMoreMarker {
    /// Node whose children are paged; its id is the collection's scope id
    pub parent: NodeKey,
    pub course_id: String,
    pub collection_kind: CollectionKind,
    pub current_offset: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeData {
    Organization(Organization),
    CourseFamily(CourseFamily),
    Course(Course),
    ContentsFolder { course_id: String },
    GroupsFolder { course_id: String },
    Content(ContentNode),
    Group(CourseGroup),
    Member(CourseMember),
    LoadMore(LoadMoreMarker),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub data: NodeData,
    pub has_children: bool,
    /// Expand hint read from the expand-state mirror
    pub expanded: bool,
}

impl TreeNode {
    pub fn new(data: NodeData, has_children: bool) -> Self {
        Self {
            data,
            has_children,
            expanded: false,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match &self.data {
            NodeData::Organization(_) => NodeKind::Organization,
            NodeData::CourseFamily(_) => NodeKind::CourseFamily,
            NodeData::Course(_) => NodeKind::Course,
            NodeData::ContentsFolder { .. } => NodeKind::ContentsFolder,
            NodeData::GroupsFolder { .. } => NodeKind::GroupsFolder,
            NodeData::Content(_) => NodeKind::Content,
            NodeData::Group(_) => NodeKind::Group,
            NodeData::Member(_) => NodeKind::Member,
            NodeData::LoadMore(_) => NodeKind::LoadMore,
        }
    }

    /// Folders share the id of their course; the kind keeps the keys apart.
    pub fn id(&self) -> &str {
        match &self.data {
            NodeData::Organization(o) => &o.id,
            NodeData::CourseFamily(f) => &f.id,
            NodeData::Course(c) => &c.id,
            NodeData::ContentsFolder { course_id } | NodeData::GroupsFolder { course_id } => {
                course_id
            }
            NodeData::Content(c) => &c.content.id,
            NodeData::Group(g) => &g.id,
            NodeData::Member(m) => &m.id,
            NodeData::LoadMore(m) => &m.parent.id,
        }
    }

    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.kind(), self.id())
    }

    pub fn expand_key(&self) -> String {
        self.key().expand_key()
    }

    /// Owning course, for everything at or below course level.
    pub fn course_id(&self) -> Option<&str> {
        match &self.data {
            NodeData::Organization(_) | NodeData::CourseFamily(_) => None,
            NodeData::Course(c) => Some(&c.id),
            NodeData::ContentsFolder { course_id } | NodeData::GroupsFolder { course_id } => {
                Some(course_id)
            }
            NodeData::Content(c) => Some(&c.content.course_id),
            NodeData::Group(g) => Some(&g.course_id),
            NodeData::Member(m) => Some(&m.course_id),
            NodeData::LoadMore(m) => Some(&m.course_id),
        }
    }

    pub fn label(&self) -> String {
        match &self.data {
            NodeData::Organization(o) => o.display_title().to_string(),
            NodeData::CourseFamily(f) => f.display_title().to_string(),
            NodeData::Course(c) => c.display_title().to_string(),
            NodeData::ContentsFolder { .. } => "Contents".to_string(),
            NodeData::GroupsFolder { .. } => "Groups".to_string(),
            NodeData::Content(c) => c.content.display_title().to_string(),
            NodeData::Group(g) => g.display_title().to_string(),
            NodeData::Member(m) => m.display_name(),
            NodeData::LoadMore(m) => format!("Load {} more...", m.page_size),
        }
    }

    pub fn collapsible_hint(&self) -> CollapsibleHint {
        match (self.has_children, self.expanded) {
            (false, _) => CollapsibleHint::None,
            (true, false) => CollapsibleHint::Collapsed,
            (true, true) => CollapsibleHint::Expanded,
        }
    }

    /// Context value the UI uses to pick menus and drop handlers.
    pub fn context_kind(&self) -> String {
        match &self.data {
            NodeData::Organization(_) => "organization".to_string(),
            NodeData::CourseFamily(_) => "courseFamily".to_string(),
            NodeData::Course(_) => "course".to_string(),
            NodeData::ContentsFolder { .. } => "courseContents".to_string(),
            NodeData::GroupsFolder { .. } => "courseGroups".to_string(),
            NodeData::Content(c) => {
                let mut kind = String::from("courseContent");
                if c.submittable() == Some(true) {
                    kind.push_str(".submittable");
                }
                if c.content.has_example() {
                    kind.push_str(".hasExample");
                }
                kind
            }
            NodeData::Group(_) => "courseGroup".to_string(),
            NodeData::Member(_) => "courseMember".to_string(),
            NodeData::LoadMore(_) => "loadMore".to_string(),
        }
    }

    pub fn tooltip(&self) -> Option<String> {
        match &self.data {
            NodeData::Course(c) => Some(format!("Course: {}", c.path)),
            NodeData::Content(c) => {
                let mut lines = vec![format!("Path: {}", c.content.path)];
                if let Some(content_type) = &c.content_type {
                    lines.push(format!("Type: {}", content_type.display_title()));
                }
                match (&c.example, &c.content.example_id) {
                    (Some(example), _) => lines.push(format!(
                        "Example: {} ({})",
                        example.title,
                        c.content.example_version.as_deref().unwrap_or("latest")
                    )),
                    (None, Some(example_id)) => lines.push(format!("Example: {}", example_id)),
                    (None, None) => {}
                }
                Some(lines.join("\n"))
            }
            NodeData::Member(m) => Some(format!("{} ({})", m.user_name, m.role)),
            NodeData::LoadMore(m) => Some(format!("Showing {} items", m.current_offset)),
            _ => None,
        }
    }

    pub fn as_content(&self) -> Option<&ContentNode> {
        match &self.data {
            NodeData::Content(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_load_more(&self) -> Option<&LoadMoreMarker> {
        match &self.data {
            NodeData::LoadMore(m) => Some(m),
            _ => None,
        }
    }
}
