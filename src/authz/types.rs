use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::shared::enums::{HierarchyEntity, RoleType, ScopeType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Officer {
    pub officer_id: String,
    pub name: String,
    pub office_id: String,
    pub is_active: bool,
}

/// A stored role grant. Rows whose `effective_to` lies in the past are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub officer_id: String,
    pub role_type: RoleType,
    pub scope_type: ScopeType,
    pub scope_value: Option<String>,
    pub is_primary: bool,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
}

impl RoleAssignment {
    pub fn is_effective_on(&self, day: NaiveDate) -> bool {
        self.effective_from <= day && self.effective_to.map_or(true, |to| to >= day)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyEntry {
    pub entity_type: HierarchyEntity,
    pub entity_value: String,
    /// For OFFICE rows, the group the office belongs to.
    pub group_code: Option<String>,
    pub reports_to_role: RoleType,
    pub effective_from: NaiveDate,
    pub effective_to: Option<NaiveDate>,
}

impl HierarchyEntry {
    pub fn is_effective_on(&self, day: NaiveDate) -> bool {
        self.effective_from <= day && self.effective_to.map_or(true, |to| to >= day)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedRole {
    pub role_type: RoleType,
    pub scope_type: ScopeType,
    pub scope_value: Option<String>,
    pub is_primary: bool,
}

impl ResolvedRole {
    pub fn new(role_type: RoleType, scope_type: ScopeType, scope_value: Option<String>) -> Self {
        Self {
            role_type,
            scope_type,
            scope_value,
            is_primary: false,
        }
    }

    fn dedup_key(&self) -> (RoleType, Option<&str>) {
        (self.role_type, self.scope_value.as_deref())
    }

    pub(crate) fn same_grant(&self, other: &ResolvedRole) -> bool {
        self.dedup_key() == other.dedup_key()
    }
}

/// The authenticated caller of every workflow and ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub officer_id: String,
    pub office_id: String,
    pub roles: Vec<ResolvedRole>,
}

impl Actor {
    pub fn holds(&self, role: RoleType) -> bool {
        self.roles.iter().any(|r| r.role_type == role)
    }

    pub fn is_head_or_above(&self) -> bool {
        self.roles.iter().any(|r| r.role_type.is_head_or_above())
    }

    pub fn primary_role(&self) -> Option<&ResolvedRole> {
        self.roles
            .iter()
            .find(|r| r.is_primary)
            .or_else(|| self.roles.first())
    }
}
