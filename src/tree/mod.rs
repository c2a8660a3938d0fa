//! Course tree: view-nodes, materialization, caching and invalidation.

pub mod assignment;
pub mod events;
pub mod invalidation;
pub mod materializer;
pub mod node;
pub mod provider;
pub mod registry;
pub mod repository;

pub use assignment::{AssignmentOutcome, AssignmentProtocol, ConfirmationPrompt, FixedAnswer};
pub use events::{TreeChange, TreeEvents};
pub use invalidation::{CourseScope, InvalidationCoordinator, RefreshPlan};
pub use materializer::NodeMaterializer;
pub use node::{CollapsibleHint, ContentNode, LoadMoreMarker, NodeData, TreeNode};
pub use provider::{ContentUpdateRequest, TreeProvider};
pub use registry::CollectionRegistry;
pub use repository::{CloneRequest, RepositoryService};
