use std::collections::{HashMap, HashSet};

use crate::core::shared::enums::{Permission, RoleType};
use crate::error::WorkflowError;

/// Immutable role to permission grants, built once at start-up.
#[derive(Debug, Clone)]
pub struct PermissionTable {
    grants: HashMap<RoleType, HashSet<Permission>>,
}

impl PermissionTable {
    pub fn standard() -> Self {
        use Permission::*;

        let senior = [
            ViewAllMis,
            ApproveEscalated,
            AllocateTeamLeader,
            ApproveAssignment,
            ApproveMilestone,
            ApproveRevenueShare,
            ApproveInvoice,
            RecordPayment,
            DownloadReports,
        ];
        let head = [
            ViewAllMis,
            AllocateTeamLeader,
            ApproveAssignment,
            ApproveMilestone,
            ApproveRevenueShare,
            DownloadReports,
        ];

        let mut grants: HashMap<RoleType, HashSet<Permission>> = HashMap::new();
        grants.insert(RoleType::Admin, Permission::ALL.iter().copied().collect());
        for role in [RoleType::Dg, RoleType::DdgOne, RoleType::DdgTwo] {
            grants.insert(role, senior.iter().copied().collect());
        }
        for role in [RoleType::RdHead, RoleType::GroupHead] {
            grants.insert(role, head.iter().copied().collect());
        }
        grants.insert(
            RoleType::Finance,
            [ViewAllMis, ApproveInvoice, RecordPayment, DownloadReports]
                .into_iter()
                .collect(),
        );
        grants.insert(
            RoleType::TeamLeader,
            [
                ViewAllMis,
                SetTeam,
                FillAssignmentDetails,
                FillMilestoneDetails,
                DownloadReports,
            ]
            .into_iter()
            .collect(),
        );
        grants.insert(
            RoleType::Officer,
            [ViewAllMis, RegisterAssignment, RaiseRequest]
                .into_iter()
                .collect(),
        );

        Self { grants }
    }

    /// Standard table with the listed roles' grants replaced.
    pub fn with_overrides(overrides: &HashMap<String, Vec<String>>) -> Result<Self, WorkflowError> {
        let mut table = Self::standard();
        for (role, names) in overrides {
            let role: RoleType = role.parse()?;
            let permissions = names
                .iter()
                .map(|name| name.parse::<Permission>())
                .collect::<Result<HashSet<_>, _>>()?;
            table.grants.insert(role, permissions);
        }
        Ok(table)
    }

    pub fn grants(&self, role: RoleType, permission: Permission) -> bool {
        self.grants
            .get(&role)
            .map_or(false, |set| set.contains(&permission))
    }

    pub fn permissions_for(&self, role: RoleType) -> Vec<Permission> {
        let mut list: Vec<Permission> = self
            .grants
            .get(&role)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        list.sort();
        list
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_grants() {
        let table = PermissionTable::standard();
        assert!(table.grants(RoleType::RdHead, Permission::ApproveAssignment));
        assert!(table.grants(RoleType::Finance, Permission::ApproveInvoice));
        assert!(table.grants(RoleType::Officer, Permission::RegisterAssignment));
        assert!(!table.grants(RoleType::Officer, Permission::ApproveAssignment));
        assert!(!table.grants(RoleType::TeamLeader, Permission::ApproveMilestone));
        assert!(!table.grants(RoleType::RdHead, Permission::ApproveInvoice));
    }

    #[test]
    fn test_overrides_replace_role_grants() {
        let mut overrides = HashMap::new();
        overrides.insert("RD_HEAD".to_string(), vec!["approve_invoice".to_string()]);
        let table = PermissionTable::with_overrides(&overrides).unwrap();
        assert!(table.grants(RoleType::RdHead, Permission::ApproveInvoice));
        assert!(!table.grants(RoleType::RdHead, Permission::ApproveAssignment));
        assert!(table.grants(RoleType::GroupHead, Permission::ApproveAssignment));
    }

    #[test]
    fn test_unknown_override_is_rejected() {
        let mut overrides = HashMap::new();
        overrides.insert("RD_HEAD".to_string(), vec!["launch_rockets".to_string()]);
        assert!(matches!(
            PermissionTable::with_overrides(&overrides),
            Err(WorkflowError::Validation(_))
        ));
    }
}
