use chrono::NaiveDate;
use log::{debug, warn};

use super::hierarchy::ReportingHierarchy;
use super::permissions::PermissionTable;
use super::types::{Actor, ResolvedRole};
use crate::core::shared::enums::{Permission, RoleType, ScopeType};
use crate::error::WorkflowError;
use crate::storage::{StoreTx, TxResult};

/// Answers who may do what, and where. Lookups never fail on a missing
/// grant: the answer is simply `false`.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationEngine {
    permissions: PermissionTable,
}

impl AuthorizationEngine {
    pub fn new(permissions: PermissionTable) -> Self {
        Self { permissions }
    }

    pub fn permission_table(&self) -> &PermissionTable {
        &self.permissions
    }

    /// Effective roles of an officer on `on`, most senior first.
    ///
    /// Stored grants are combined with one TEAM_LEADER role per assignment the
    /// officer currently leads (derived from the assignment itself) and the
    /// base OFFICER role everyone holds.
    pub fn resolve_roles(
        &self,
        tx: &mut dyn StoreTx,
        officer_id: &str,
        on: NaiveDate,
    ) -> TxResult<Vec<ResolvedRole>> {
        let mut roles: Vec<ResolvedRole> = Vec::new();

        for grant in tx.role_assignments(officer_id)? {
            if !grant.is_effective_on(on) {
                continue;
            }
            if grant.role_type == RoleType::TeamLeader {
                debug!(
                    "Ignoring stored TEAM_LEADER grant for {}; leadership comes from assignments",
                    officer_id
                );
                continue;
            }
            push_unique(
                &mut roles,
                ResolvedRole {
                    role_type: grant.role_type,
                    scope_type: grant.scope_type,
                    scope_value: grant.scope_value,
                    is_primary: grant.is_primary,
                },
            );
        }

        for assignment_id in tx.assignments_led_by(officer_id)? {
            push_unique(
                &mut roles,
                ResolvedRole::new(
                    RoleType::TeamLeader,
                    ScopeType::Assignment,
                    Some(assignment_id.to_string()),
                ),
            );
        }

        push_unique(
            &mut roles,
            ResolvedRole::new(RoleType::Officer, ScopeType::Individual, None),
        );

        roles.sort_by_key(|r| r.role_type);
        if !roles.iter().any(|r| r.is_primary) {
            if let Some(first) = roles.first_mut() {
                first.is_primary = true;
            }
        }
        Ok(roles)
    }

    /// Builds the caller descriptor. Unknown and deactivated officers are refused.
    pub fn resolve_actor(
        &self,
        tx: &mut dyn StoreTx,
        officer_id: &str,
        on: NaiveDate,
    ) -> TxResult<Actor> {
        let officer = match tx.officer(officer_id)? {
            Some(officer) if officer.is_active => officer,
            Some(_) => {
                warn!("Inactive officer {} attempted access", officer_id);
                return Err(WorkflowError::PermissionDenied(format!(
                    "officer {} is inactive",
                    officer_id
                )));
            }
            None => {
                warn!("Unknown officer {} attempted access", officer_id);
                return Err(WorkflowError::PermissionDenied(format!(
                    "officer {} is not known",
                    officer_id
                )));
            }
        };
        let roles = self.resolve_roles(tx, officer_id, on)?;
        Ok(Actor {
            officer_id: officer.officer_id,
            office_id: officer.office_id,
            roles,
        })
    }

    pub fn has_permission(&self, roles: &[ResolvedRole], permission: Permission) -> bool {
        roles.iter().any(|r| {
            r.role_type == RoleType::Admin || self.permissions.grants(r.role_type, permission)
        })
    }

    pub fn can_act_in_scope(
        &self,
        roles: &[ResolvedRole],
        target_office_id: &str,
        hierarchy: &ReportingHierarchy,
    ) -> bool {
        roles.iter().any(|r| match r.role_type {
            RoleType::Admin | RoleType::Dg | RoleType::DdgOne | RoleType::DdgTwo => true,
            RoleType::RdHead => r.scope_value.as_deref() == Some(target_office_id),
            RoleType::GroupHead => match (hierarchy.group_of_office(target_office_id), &r.scope_value) {
                (Some(group), Some(scope)) => group == scope,
                _ => false,
            },
            RoleType::Finance => match r.scope_type {
                ScopeType::Global => true,
                ScopeType::Office => r.scope_value.as_deref() == Some(target_office_id),
                _ => false,
            },
            RoleType::TeamLeader | RoleType::Officer => false,
        })
    }

    pub fn require_permission(
        &self,
        actor: &Actor,
        permission: Permission,
    ) -> Result<(), WorkflowError> {
        if self.has_permission(&actor.roles, permission) {
            return Ok(());
        }
        warn!(
            "Permission denied: officer {} lacks {}",
            actor.officer_id, permission
        );
        Err(WorkflowError::PermissionDenied(format!(
            "{} is required",
            permission
        )))
    }

    pub fn require_scope(
        &self,
        actor: &Actor,
        target_office_id: &str,
        hierarchy: &ReportingHierarchy,
    ) -> Result<(), WorkflowError> {
        if self.can_act_in_scope(&actor.roles, target_office_id, hierarchy) {
            return Ok(());
        }
        warn!(
            "Permission denied: officer {} cannot act in office {}",
            actor.officer_id, target_office_id
        );
        Err(WorkflowError::PermissionDenied(format!(
            "no authority over office {}",
            target_office_id
        )))
    }
}

fn push_unique(roles: &mut Vec<ResolvedRole>, role: ResolvedRole) {
    if !roles.iter().any(|existing| existing.same_grant(&role)) {
        roles.push(role);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::types::{HierarchyEntry, Officer, RoleAssignment};
    use crate::core::shared::enums::HierarchyEntity;
    use crate::storage::{MemoryStore, Store};
    use std::sync::Arc;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn grant(officer: &str, role: RoleType, scope: ScopeType, value: Option<&str>) -> RoleAssignment {
        RoleAssignment {
            officer_id: officer.to_string(),
            role_type: role,
            scope_type: scope,
            scope_value: value.map(str::to_string),
            is_primary: false,
            effective_from: day(2020, 1, 1),
            effective_to: None,
        }
    }

    fn role(role_type: RoleType, scope: ScopeType, value: Option<&str>) -> ResolvedRole {
        ResolvedRole::new(role_type, scope, value.map(str::to_string))
    }

    fn hierarchy() -> ReportingHierarchy {
        let entries = vec![HierarchyEntry {
            entity_type: HierarchyEntity::Office,
            entity_value: "O1".into(),
            group_code: Some("ES".into()),
            reports_to_role: RoleType::DdgOne,
            effective_from: day(2020, 1, 1),
            effective_to: None,
        }];
        ReportingHierarchy::from_entries(&entries, day(2025, 6, 1))
    }

    fn seeded_store() -> Arc<dyn Store> {
        let store = MemoryStore::new();
        store.add_officer(Officer {
            officer_id: "RD1".into(),
            name: "Regional Head".into(),
            office_id: "O1".into(),
            is_active: true,
        });
        store.add_officer(Officer {
            officer_id: "GONE".into(),
            name: "Retired".into(),
            office_id: "O1".into(),
            is_active: false,
        });
        store.grant_role(grant("RD1", RoleType::RdHead, ScopeType::Office, Some("O1")));
        store.grant_role(grant("RD1", RoleType::RdHead, ScopeType::Office, Some("O1")));
        let mut expired = grant("RD1", RoleType::DdgOne, ScopeType::Global, None);
        expired.effective_to = Some(day(2024, 12, 31));
        store.grant_role(expired);
        Arc::new(store)
    }

    #[test]
    fn test_resolve_roles_adds_base_officer_and_dedupes() {
        let store = seeded_store();
        let engine = AuthorizationEngine::default();
        let roles = store
            .transaction(|tx| engine.resolve_roles(tx, "RD1", day(2025, 6, 1)))
            .unwrap();
        let kinds: Vec<RoleType> = roles.iter().map(|r| r.role_type).collect();
        assert_eq!(kinds, vec![RoleType::RdHead, RoleType::Officer]);
        assert!(roles[0].is_primary);
    }

    #[test]
    fn test_inactive_officer_is_refused() {
        let store = seeded_store();
        let engine = AuthorizationEngine::default();
        let result = store.transaction(|tx| engine.resolve_actor(tx, "GONE", day(2025, 6, 1)));
        assert!(matches!(result, Err(WorkflowError::PermissionDenied(_))));
        let result = store.transaction(|tx| engine.resolve_actor(tx, "NOBODY", day(2025, 6, 1)));
        assert!(matches!(result, Err(WorkflowError::PermissionDenied(_))));
    }

    #[test]
    fn test_admin_satisfies_everything() {
        let engine = AuthorizationEngine::default();
        let roles = vec![role(RoleType::Admin, ScopeType::Global, None)];
        for permission in Permission::ALL {
            assert!(engine.has_permission(&roles, *permission));
        }
        assert!(engine.can_act_in_scope(&roles, "ANY", &hierarchy()));
    }

    #[test]
    fn test_scope_rules() {
        let engine = AuthorizationEngine::default();
        let h = hierarchy();

        let rd = vec![role(RoleType::RdHead, ScopeType::Office, Some("O1"))];
        assert!(engine.can_act_in_scope(&rd, "O1", &h));
        assert!(!engine.can_act_in_scope(&rd, "O2", &h));

        let group = vec![role(RoleType::GroupHead, ScopeType::Group, Some("ES"))];
        assert!(engine.can_act_in_scope(&group, "O1", &h));
        assert!(!engine.can_act_in_scope(&group, "O2", &h));

        let ddg = vec![role(RoleType::DdgTwo, ScopeType::Global, None)];
        assert!(engine.can_act_in_scope(&ddg, "O9", &h));

        let finance = vec![role(RoleType::Finance, ScopeType::Office, Some("O2"))];
        assert!(engine.can_act_in_scope(&finance, "O2", &h));
        assert!(!engine.can_act_in_scope(&finance, "O1", &h));

        let officer = vec![
            role(RoleType::TeamLeader, ScopeType::Assignment, Some("x")),
            role(RoleType::Officer, ScopeType::Individual, None),
        ];
        assert!(!engine.can_act_in_scope(&officer, "O1", &h));
    }

    #[test]
    fn test_require_permission_denies_officer() {
        let engine = AuthorizationEngine::default();
        let actor = Actor {
            officer_id: "OFF1".into(),
            office_id: "O1".into(),
            roles: vec![role(RoleType::Officer, ScopeType::Individual, None)],
        };
        assert!(engine
            .require_permission(&actor, Permission::RegisterAssignment)
            .is_ok());
        assert!(matches!(
            engine.require_permission(&actor, Permission::ApproveAssignment),
            Err(WorkflowError::PermissionDenied(_))
        ));
    }
}
