//! Cache invalidation coordinator
//!
//! Maps a batch of mutation events to either a full refresh or a set of course-scoped cache
//! drops. Only container-level changes (organization, course family) or a change whose course
//! cannot be determined escalate to a full refresh.

use crate::expand_state::ExpandStateMirror;
use crate::tree::events::{TreeChange, TreeEvents};
use crate::tree::registry::CollectionRegistry;
use crate::types::{EntityKind, InvalidationEvent, NodeKey, NodeKind};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::info;

/// Which caches of one course a change touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CourseScope {
    /// Group and member collections only
    Membership,
    /// Every collection of the course
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshPlan {
    /// Empty batch
    Nothing,
    Full,
    Scoped(BTreeMap<String, CourseScope>),
}

impl RefreshPlan {
    /// Decide the refresh granularity for a batch of changes.
    pub fn for_changes(changes: &[InvalidationEvent]) -> RefreshPlan {
        if changes.is_empty() {
            return RefreshPlan::Nothing;
        }
        let mut scopes: BTreeMap<String, CourseScope> = BTreeMap::new();
        for change in changes {
            if change.entity_kind.is_container_level() {
                return RefreshPlan::Full;
            }
            let Some(course_id) = change.course_scope() else {
                return RefreshPlan::Full;
            };
            let scope = match change.entity_kind {
                EntityKind::CourseGroup => CourseScope::Membership,
                _ => CourseScope::All,
            };
            let entry = scopes.entry(course_id.to_string()).or_insert(scope);
            *entry = (*entry).max(scope);
        }
        RefreshPlan::Scoped(scopes)
    }
}

pub struct InvalidationCoordinator {
    registry: Arc<CollectionRegistry>,
    mirror: Arc<ExpandStateMirror>,
    events: TreeEvents,
}

impl InvalidationCoordinator {
    pub fn new(
        registry: Arc<CollectionRegistry>,
        mirror: Arc<ExpandStateMirror>,
        events: TreeEvents,
    ) -> Self {
        Self {
            registry,
            mirror,
            events,
        }
    }

    /// Apply the plan for `changes` and notify the UI. Returns the applied plan.
    ///
    /// Scoped refreshes signal a course node when its own row changed (its label is shown
    /// even while collapsed) or when it is expanded. Other collapsed courses pick up fresh
    /// data on their next expansion because their caches are gone.
    pub fn smart_refresh(&self, changes: &[InvalidationEvent]) -> RefreshPlan {
        let plan = RefreshPlan::for_changes(changes);
        let changed_courses: BTreeSet<&str> = changes
            .iter()
            .filter(|c| c.entity_kind == EntityKind::Course)
            .filter_map(|c| c.course_scope())
            .collect();
        match &plan {
            RefreshPlan::Nothing => {}
            RefreshPlan::Full => self.full_refresh(),
            RefreshPlan::Scoped(scopes) => {
                for (course_id, scope) in scopes {
                    let membership_only = *scope == CourseScope::Membership;
                    let dropped = self.registry.invalidate_course(course_id, membership_only);
                    info!(
                        course_id = %course_id,
                        ?scope,
                        dropped,
                        "Scoped cache invalidation"
                    );
                    let node = match scope {
                        CourseScope::All => NodeKey::new(NodeKind::Course, course_id.clone()),
                        CourseScope::Membership => {
                            NodeKey::new(NodeKind::GroupsFolder, course_id.clone())
                        }
                    };
                    if changed_courses.contains(course_id.as_str())
                        || self.mirror.is_expanded(&node.expand_key())
                    {
                        self.events.notify(TreeChange::Node(node));
                    }
                }
            }
        }
        plan
    }

    /// Drop every cache and re-render from the top.
    pub fn full_refresh(&self) {
        let dropped = self.registry.clear();
        info!(dropped, "Full tree refresh");
        self.events.notify(TreeChange::Full);
    }

    /// Drop the course's caches and signal it even when it is collapsed.
    pub fn force_refresh_course(&self, course_id: &str) {
        let dropped = self.registry.invalidate_course(course_id, false);
        info!(course_id, dropped, "Forced course refresh");
        self.events
            .notify(TreeChange::Node(NodeKey::new(NodeKind::Course, course_id)));
    }
}
