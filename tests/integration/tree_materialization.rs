use std::sync::Arc;

use coursetree::config::TreeConfig;
use coursetree::error::ApiError;
use coursetree::tree::{CollapsibleHint, NodeData, TreeNode};
use coursetree::types::{CollectionKind, NodeKind};

use crate::support::{
    content, content_type, flat_contents, paging_config, provider_with, MockCourseService,
    ASSIGNMENT_TYPE, READING_TYPE,
};

fn contents_folder(course_id: &str) -> TreeNode {
    TreeNode::new(
        NodeData::ContentsFolder {
            course_id: course_id.to_string(),
        },
        true,
    )
}

fn week_fixture() -> MockCourseService {
    MockCourseService::sample()
        .with_contents(vec![
            content("1", "c1", "week1", 1, READING_TYPE),
            content("2", "c1", "week2", 2, READING_TYPE),
            content("3", "c1", "week1.ex1", 1, ASSIGNMENT_TYPE),
        ])
        .with_example("e1", "Hello World")
}

#[tokio::test]
async fn walks_containers_down_to_course_folders() {
    let service = Arc::new(MockCourseService::sample());
    let provider = provider_with(service.clone(), &TreeConfig::default(), &[]).await;

    let orgs = provider.get_children(None).await.unwrap();
    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0].label(), "University");

    let families = provider.get_children(Some(&orgs[0])).await.unwrap();
    let courses = provider.get_children(Some(&families[0])).await.unwrap();
    assert_eq!(
        courses.iter().map(|c| c.id()).collect::<Vec<_>>(),
        vec!["c1", "c2"]
    );

    let folders = provider.get_children(Some(&courses[0])).await.unwrap();
    let kinds: Vec<NodeKind> = folders.iter().map(|f| f.kind()).collect();
    assert_eq!(kinds, vec![NodeKind::ContentsFolder, NodeKind::GroupsFolder]);
    assert!(folders.iter().all(|f| f.course_id() == Some("c1")));
}

#[tokio::test]
async fn content_roots_follow_position_and_carry_child_flags() {
    let service = Arc::new(week_fixture());
    let provider = provider_with(service.clone(), &TreeConfig::default(), &["content-1"]).await;

    let roots = provider
        .get_children(Some(&contents_folder("c1")))
        .await
        .unwrap();
    let labels: Vec<String> = roots.iter().map(|n| n.label()).collect();
    assert_eq!(labels, vec!["week1", "week2"]);
    assert!(roots[0].has_children);
    assert!(!roots[1].has_children);
    assert_eq!(roots[0].collapsible_hint(), CollapsibleHint::Expanded);
    assert_eq!(roots[1].collapsible_hint(), CollapsibleHint::None);

    let week1_children = provider.get_children(Some(&roots[0])).await.unwrap();
    assert_eq!(week1_children.len(), 1);
    let ex1 = week1_children[0].as_content().unwrap();
    assert_eq!(ex1.content.path, "week1.ex1");
    assert_eq!(ex1.submittable(), Some(true));

    // Small sibling sets are refetched on every expansion and never cached.
    assert_eq!(service.calls("list_course_contents"), 2);
    assert!(provider.cache_state().is_empty());
}

#[tokio::test]
async fn auxiliary_lookups_degrade_per_child() {
    let service = MockCourseService::sample().with_contents(vec![
        content("1", "c1", "unit", 1, "t-unlisted"),
        content("2", "c1", "task", 2, ASSIGNMENT_TYPE),
    ]);
    service
        .unlisted_types
        .lock()
        .push(content_type("t-unlisted", "c1", false));
    service.contents.lock()[1].example_id = Some("e-missing".to_string());
    let service = Arc::new(service);
    service.fail("get_example");
    let provider = provider_with(service.clone(), &TreeConfig::default(), &[]).await;

    let roots = provider
        .get_children(Some(&contents_folder("c1")))
        .await
        .unwrap();
    assert_eq!(roots.len(), 2);

    let unit = roots[0].as_content().unwrap();
    assert_eq!(unit.content_type.as_ref().map(|t| t.id.as_str()), Some("t-unlisted"));
    assert_eq!(service.calls("get_content_type"), 1);

    let task = roots[1].as_content().unwrap();
    assert!(task.example.is_none());
    assert_eq!(task.content.example_id.as_deref(), Some("e-missing"));
    assert_eq!(service.calls("get_example"), 1);
}

#[tokio::test]
async fn listing_failure_aborts_materialization() {
    let service = Arc::new(week_fixture());
    service.fail("list_course_contents");
    let provider = provider_with(service.clone(), &TreeConfig::default(), &[]).await;

    let result = provider.get_children(Some(&contents_folder("c1"))).await;
    assert!(matches!(result, Err(ApiError::Remote { .. })));

    service.fail("list_organizations");
    let err = provider.get_children(None).await.unwrap_err();
    assert!(err.user_message().contains("list_organizations"));
}

#[tokio::test]
async fn content_type_listing_failure_falls_back_to_point_lookups() {
    let service = Arc::new(week_fixture());
    service.fail("list_content_types");
    let provider = provider_with(service.clone(), &TreeConfig::default(), &[]).await;

    let roots = provider
        .get_children(Some(&contents_folder("c1")))
        .await
        .unwrap();
    assert!(roots.iter().all(|r| r.as_content().unwrap().content_type.is_some()));
    // Both roots share one type, looked up once.
    assert_eq!(service.calls("get_content_type"), 1);
}

#[tokio::test]
async fn archived_content_is_hidden() {
    let service = week_fixture();
    service.contents.lock()[1].archived_at = Some(chrono::Utc::now());
    let provider = provider_with(Arc::new(service), &TreeConfig::default(), &[]).await;

    let roots = provider
        .get_children(Some(&contents_folder("c1")))
        .await
        .unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0].label(), "week1");
}

#[tokio::test]
async fn large_sibling_sets_are_paged_with_load_more_markers() {
    let service = Arc::new(MockCourseService::sample().with_contents(flat_contents("c1", 25)));
    let config = paging_config(10, 10);
    let provider = provider_with(service.clone(), &config, &[]).await;

    let first = provider
        .get_children(Some(&contents_folder("c1")))
        .await
        .unwrap();
    assert_eq!(first.len(), 11);
    let marker = first.last().unwrap().as_load_more().unwrap().clone();
    assert_eq!(marker.collection_kind, CollectionKind::Contents);
    assert_eq!(marker.current_offset, 10);
    assert_eq!(marker.page_size, 10);
    assert_eq!(first[0].label(), "item000");

    let second = provider.load_more(first.last().unwrap()).await.unwrap();
    assert_eq!(second.len(), 11);
    assert_eq!(second[0].label(), "item010");
    assert_eq!(second[10].as_load_more().unwrap().current_offset, 20);

    let last = provider.load_more(second.last().unwrap()).await.unwrap();
    assert_eq!(last.len(), 5);
    assert!(last.iter().all(|n| n.kind() == NodeKind::Content));
    assert_eq!(last[4].label(), "item024");

    // Re-expanding reuses the cached collection instead of refetching.
    let again = provider
        .get_children(Some(&contents_folder("c1")))
        .await
        .unwrap();
    assert_eq!(again.len(), 11);
    assert_eq!(service.calls("list_course_contents"), 1);

    let states = provider.cache_state();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].0.to_string(), "contents:course-c1");
    assert_eq!(states[0].1.total_items, 25);
}

#[tokio::test]
async fn load_more_rejects_other_nodes() {
    let service = Arc::new(MockCourseService::sample());
    let provider = provider_with(service, &TreeConfig::default(), &[]).await;
    let result = provider.load_more(&contents_folder("c1")).await;
    assert!(matches!(result, Err(ApiError::InvalidNode(_))));
}

#[tokio::test]
async fn groups_above_threshold_are_paged() {
    let service = Arc::new(MockCourseService::sample().with_groups("c1", 5));
    let provider = provider_with(service.clone(), &paging_config(3, 2), &[]).await;
    let groups_folder = TreeNode::new(
        NodeData::GroupsFolder {
            course_id: "c1".to_string(),
        },
        true,
    );

    let first = provider.get_children(Some(&groups_folder)).await.unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(first[0].kind(), NodeKind::Group);
    let marker = first[2].as_load_more().unwrap();
    assert_eq!(marker.collection_kind, CollectionKind::Groups);
    assert_eq!(marker.parent.id, "c1");

    let members = provider.get_children(Some(&first[0])).await.unwrap();
    assert!(members.is_empty());
}

#[tokio::test]
async fn find_content_resolves_a_single_node() {
    let service = Arc::new(week_fixture());
    let provider = provider_with(service, &TreeConfig::default(), &[]).await;

    let node = provider.find_content("c1", "1").await.unwrap();
    assert!(node.has_children);
    assert_eq!(node.as_content().unwrap().submittable(), Some(false));

    let missing = provider.find_content("c1", "nope").await;
    assert!(matches!(missing, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn expand_state_round_trips_through_provider() {
    let service = Arc::new(week_fixture());
    let provider = provider_with(service, &TreeConfig::default(), &[]).await;
    let folder = contents_folder("c1");

    assert!(!provider.is_expanded(&folder));
    provider.set_expanded(&folder, true).await;
    assert!(provider.is_expanded(&folder));
}
