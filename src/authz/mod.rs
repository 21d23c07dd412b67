pub mod engine;
pub mod hierarchy;
pub mod permissions;
pub mod types;

pub use engine::AuthorizationEngine;
pub use hierarchy::ReportingHierarchy;
pub use permissions::PermissionTable;
pub use types::{Actor, HierarchyEntry, Officer, ResolvedRole, RoleAssignment};
