//! Core types shared by the cache, the invalidation logic and the view layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of paged collection a cache entry holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionKind {
    /// Children of a content node (or the content roots of a course)
    Contents,
    /// Groups of a course
    Groups,
    /// Members of a group
    Members,
}

impl CollectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Contents => "contents",
            CollectionKind::Groups => "groups",
            CollectionKind::Members => "members",
        }
    }

    /// Collections touched by a membership change.
    pub fn is_membership(&self) -> bool {
        matches!(self, CollectionKind::Groups | CollectionKind::Members)
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CacheKey: (collection kind, scope id), e.g. `contents:course-c1` or `contents:content-42`.
///
/// Selects a paged collection instance and is the unit of invalidation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    pub kind: CollectionKind,
    pub scope_id: String,
}

impl CacheKey {
    pub fn new(kind: CollectionKind, scope_id: impl Into<String>) -> Self {
        Self {
            kind,
            scope_id: scope_id.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.scope_id)
    }
}

/// Entity kinds that can be mutated through the tree's command surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Organization,
    CourseFamily,
    Course,
    CourseContent,
    CourseContentType,
    CourseGroup,
}

impl EntityKind {
    /// Organization and course family changes reshape the top of the tree.
    pub fn is_container_level(&self) -> bool {
        matches!(self, EntityKind::Organization | EntityKind::CourseFamily)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

/// Scope ids known at the time of the mutation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedScope {
    pub course_id: Option<String>,
    pub organization_id: Option<String>,
}

/// Produced by every create/update/delete performed through the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationEvent {
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub change: ChangeKind,
    pub related: RelatedScope,
}

impl InvalidationEvent {
    pub fn new(entity_kind: EntityKind, entity_id: impl Into<String>, change: ChangeKind) -> Self {
        Self {
            entity_kind,
            entity_id: entity_id.into(),
            change,
            related: RelatedScope::default(),
        }
    }

    pub fn with_course(mut self, course_id: impl Into<String>) -> Self {
        self.related.course_id = Some(course_id.into());
        self
    }

    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.related.organization_id = Some(organization_id.into());
        self
    }

    /// Course whose caches this change touches, if one can be determined.
    pub fn course_scope(&self) -> Option<&str> {
        match self.entity_kind {
            EntityKind::Course => self
                .related
                .course_id
                .as_deref()
                .or(Some(self.entity_id.as_str())),
            EntityKind::CourseContent
            | EntityKind::CourseContentType
            | EntityKind::CourseGroup => self.related.course_id.as_deref(),
            EntityKind::Organization | EntityKind::CourseFamily => None,
        }
    }
}

/// View-node kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Organization,
    CourseFamily,
    Course,
    ContentsFolder,
    GroupsFolder,
    Content,
    Group,
    Member,
    LoadMore,
}

impl NodeKind {
    /// Prefix of the persisted expand key `"<prefix>-<node id>"`.
    pub fn expand_prefix(&self) -> &'static str {
        match self {
            NodeKind::Organization => "org",
            NodeKind::CourseFamily => "family",
            NodeKind::Course => "course",
            NodeKind::ContentsFolder => "contents",
            NodeKind::GroupsFolder => "groups",
            NodeKind::Content => "content",
            NodeKind::Group => "group",
            NodeKind::Member => "member",
            NodeKind::LoadMore => "more",
        }
    }
}

/// Identity of a view-node, used for targeted re-render notifications
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeKey {
    pub kind: NodeKind,
    pub id: String,
}

impl NodeKey {
    pub fn new(kind: NodeKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }

    pub fn expand_key(&self) -> String {
        format!("{}-{}", self.kind.expand_prefix(), self.id)
    }
}
