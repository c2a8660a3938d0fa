use std::sync::Arc;

use coursetree::error::ApiError;
use coursetree::remote::{CourseContentUpdate, NewCourseContent};
use coursetree::tree::{ContentUpdateRequest, NodeData, RefreshPlan, TreeChange, TreeNode};
use coursetree::types::{ChangeKind, CollectionKind, EntityKind, InvalidationEvent, NodeKey, NodeKind};
use tokio::sync::broadcast::error::TryRecvError;

use crate::support::{
    course, flat_contents, paging_config, provider_with, MockCourseService, ASSIGNMENT_TYPE,
};

fn folder(course_id: &str, groups: bool) -> TreeNode {
    let course_id = course_id.to_string();
    let data = if groups {
        NodeData::GroupsFolder { course_id }
    } else {
        NodeData::ContentsFolder { course_id }
    };
    TreeNode::new(data, true)
}

fn two_paged_courses() -> Arc<MockCourseService> {
    let mut contents = flat_contents("c1", 6);
    contents.extend(flat_contents("c2", 6));
    Arc::new(
        MockCourseService::sample()
            .with_contents(contents)
            .with_groups("c1", 4),
    )
}

fn cached_keys(provider: &coursetree::tree::TreeProvider) -> Vec<String> {
    provider
        .cache_state()
        .into_iter()
        .map(|(key, _)| key.to_string())
        .collect()
}

#[tokio::test]
async fn content_mutation_in_one_course_keeps_other_course_pages() {
    let service = two_paged_courses();
    let provider = provider_with(service.clone(), &paging_config(3, 2), &[]).await;
    provider.get_children(Some(&folder("c1", false))).await.unwrap();
    provider.get_children(Some(&folder("c2", false))).await.unwrap();
    provider.get_children(Some(&folder("c1", true))).await.unwrap();
    assert_eq!(
        cached_keys(&provider),
        vec!["contents:course-c1", "contents:course-c2", "groups:course-c1"]
    );

    let update = CourseContentUpdate {
        title: Some("Renamed".to_string()),
        ..Default::default()
    };
    provider.update_content("c1", "c1-x0", &update).await.unwrap();

    assert_eq!(cached_keys(&provider), vec!["contents:course-c2"]);

    // The next expansion sees the new title, not a stale page.
    let refreshed = provider.get_children(Some(&folder("c1", false))).await.unwrap();
    assert_eq!(refreshed[0].label(), "Renamed");
    assert_eq!(service.calls("list_course_contents"), 3);
}

#[tokio::test]
async fn group_mutation_drops_only_membership_caches() {
    let service = two_paged_courses();
    let provider = provider_with(service.clone(), &paging_config(3, 2), &[]).await;
    provider.get_children(Some(&folder("c1", false))).await.unwrap();
    provider.get_children(Some(&folder("c1", true))).await.unwrap();

    let group = provider.create_group("c1", "Late joiners").await.unwrap();
    assert_eq!(group.course_id, "c1");
    assert_eq!(cached_keys(&provider), vec!["contents:course-c1"]);

    let groups = provider.get_children(Some(&folder("c1", true))).await.unwrap();
    let marker = groups.last().unwrap().as_load_more().unwrap();
    assert_eq!(marker.collection_kind, CollectionKind::Groups);
    assert_eq!(service.calls("list_course_groups"), 2);
}

#[tokio::test]
async fn container_mutation_drops_everything_and_signals_full_refresh() {
    let service = two_paged_courses();
    let provider = provider_with(service.clone(), &paging_config(3, 2), &[]).await;
    provider.get_children(Some(&folder("c1", false))).await.unwrap();
    provider.get_children(Some(&folder("c2", false))).await.unwrap();
    let mut events = provider.subscribe();

    let orgs = provider.get_children(None).await.unwrap();
    provider.rename(&orgs[0], "Renamed University").await.unwrap();

    assert!(provider.cache_state().is_empty());
    assert_eq!(events.try_recv().unwrap(), TreeChange::Full);

    let orgs = provider.get_children(None).await.unwrap();
    assert_eq!(orgs[0].label(), "Renamed University");
}

#[tokio::test]
async fn scoped_refresh_signals_only_expanded_courses() {
    let service = two_paged_courses();
    let provider = provider_with(service.clone(), &paging_config(3, 2), &["course-c1"]).await;
    let mut events = provider.subscribe();

    provider.delete_content("c1", "c1-x1").await.unwrap();
    assert_eq!(
        events.try_recv().unwrap(),
        TreeChange::Node(NodeKey::new(NodeKind::Course, "c1"))
    );

    provider.delete_content("c2", "c2-x1").await.unwrap();
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn release_forces_refresh_of_collapsed_course() {
    let service = two_paged_courses();
    let provider = provider_with(service.clone(), &paging_config(3, 2), &[]).await;
    provider.get_children(Some(&folder("c2", false))).await.unwrap();
    let mut events = provider.subscribe();

    provider
        .release_course("c2", &["c2-x0".to_string()])
        .await
        .unwrap();

    assert_eq!(service.calls("release_contents"), 1);
    assert!(provider.cache_state().is_empty());
    assert_eq!(
        events.try_recv().unwrap(),
        TreeChange::Node(NodeKey::new(NodeKind::Course, "c2"))
    );
}

#[tokio::test]
async fn batch_updates_across_two_courses_collapse_into_one_scoped_refresh() {
    let service = two_paged_courses();
    let provider = provider_with(service.clone(), &paging_config(3, 2), &[]).await;
    provider.get_children(Some(&folder("c1", false))).await.unwrap();
    provider.get_children(Some(&folder("c2", false))).await.unwrap();

    let requests: Vec<ContentUpdateRequest> = [("c1", "c1-x0"), ("c2", "c2-x0"), ("c1", "c1-x2")]
        .iter()
        .map(|(course_id, content_id)| ContentUpdateRequest {
            course_id: course_id.to_string(),
            content_id: content_id.to_string(),
            update: CourseContentUpdate {
                position: Some(100),
                ..Default::default()
            },
        })
        .collect();
    let updated = provider.batch_update_contents(&requests).await.unwrap();
    assert_eq!(updated.len(), 3);
    assert!(provider.cache_state().is_empty());
}

#[tokio::test]
async fn failed_batch_still_refreshes_applied_updates() {
    let service = two_paged_courses();
    let provider = provider_with(service.clone(), &paging_config(3, 2), &[]).await;
    provider.get_children(Some(&folder("c1", false))).await.unwrap();
    provider.get_children(Some(&folder("c2", false))).await.unwrap();

    let requests = vec![
        ContentUpdateRequest {
            course_id: "c1".to_string(),
            content_id: "c1-x0".to_string(),
            update: CourseContentUpdate::default(),
        },
        ContentUpdateRequest {
            course_id: "c2".to_string(),
            content_id: "does-not-exist".to_string(),
            update: CourseContentUpdate::default(),
        },
    ];
    let result = provider.batch_update_contents(&requests).await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
    assert_eq!(cached_keys(&provider), vec!["contents:course-c2"]);
}

#[tokio::test]
async fn create_content_is_visible_immediately() {
    let service = two_paged_courses();
    let provider = provider_with(service.clone(), &paging_config(3, 2), &[]).await;
    provider.get_children(Some(&folder("c1", false))).await.unwrap();

    let created = provider
        .create_content(&NewCourseContent {
            course_id: "c1".to_string(),
            title: "First".to_string(),
            path: "aaa".to_string(),
            position: -1,
            course_content_type_id: ASSIGNMENT_TYPE.to_string(),
        })
        .await
        .unwrap();

    let roots = provider.get_children(Some(&folder("c1", false))).await.unwrap();
    assert_eq!(roots[0].id(), created.id);
}

#[tokio::test]
async fn content_type_change_is_scoped_to_owning_course() {
    let service = two_paged_courses();
    let provider = provider_with(service.clone(), &paging_config(3, 2), &[]).await;
    provider.get_children(Some(&folder("c1", false))).await.unwrap();
    provider.get_children(Some(&folder("c2", false))).await.unwrap();

    provider
        .rename_content_type("c2", ASSIGNMENT_TYPE, "Homework")
        .await
        .unwrap();
    assert_eq!(cached_keys(&provider), vec!["contents:course-c1"]);
}

#[tokio::test]
async fn externally_observed_changes_without_course_escalate() {
    let service = two_paged_courses();
    let provider = provider_with(service.clone(), &paging_config(3, 2), &[]).await;
    provider.get_children(Some(&folder("c1", false))).await.unwrap();

    let plan = provider.apply_changes(&[InvalidationEvent::new(
        EntityKind::CourseContent,
        "c1-x0",
        ChangeKind::Updated,
    )]);
    assert_eq!(plan, RefreshPlan::Full);
    assert!(provider.cache_state().is_empty());
}

#[tokio::test]
async fn renaming_a_course_is_scoped_to_that_course() {
    let service = two_paged_courses();
    let provider = provider_with(service.clone(), &paging_config(3, 2), &[]).await;
    provider.get_children(Some(&folder("c1", false))).await.unwrap();
    provider.get_children(Some(&folder("c2", false))).await.unwrap();

    let mut events = provider.subscribe();

    let c1 = TreeNode::new(NodeData::Course(course("c1")), true);
    provider.rename(&c1, "Intro").await.unwrap();
    assert_eq!(cached_keys(&provider), vec!["contents:course-c2"]);

    // The course is collapsed, but its title is on screen in the family's list.
    assert_eq!(
        events.try_recv().unwrap(),
        TreeChange::Node(NodeKey::new(NodeKind::Course, "c1"))
    );
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}
