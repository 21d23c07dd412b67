#![allow(dead_code)]

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use pmsflow::authz::{Actor, AuthorizationEngine, HierarchyEntry, Officer, PermissionTable, RoleAssignment};
use pmsflow::core::config::WorkflowConfig;
use pmsflow::core::shared::enums::{HierarchyEntity, RoleType, ScopeType, Section, TeamRole};
use pmsflow::ledger::RevenueLedger;
use pmsflow::storage::{MemoryStore, Store};
use pmsflow::workflow::types::*;
use pmsflow::workflow::WorkflowService;

pub const OFFICE: &str = "O1";
pub const OTHER_OFFICE: &str = "O2";

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub workflow: WorkflowService,
    pub ledger: RevenueLedger,
}

fn officer(store: &MemoryStore, id: &str, office: &str) {
    store.add_officer(Officer {
        officer_id: id.to_string(),
        name: id.to_uppercase(),
        office_id: office.to_string(),
        is_active: true,
    });
}

fn grant(store: &MemoryStore, id: &str, role: RoleType, scope: ScopeType, value: Option<&str>) {
    store.grant_role(RoleAssignment {
        officer_id: id.to_string(),
        role_type: role,
        scope_type: scope,
        scope_value: value.map(str::to_string),
        is_primary: true,
        effective_from: day(2020, 1, 1),
        effective_to: None,
    });
}

/// Officers: `admin`, `dg`, `ddg1` (DDG-I), `ddg2` (DDG-II), `head` (RD head of O1),
/// `head2` (RD head of O2), `fin` (finance), and plain officers `tl`, `a`, `b`, `c` in O1.
/// O1 belongs to group G1, which reports to DDG-I.
impl Fixture {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        for (id, office) in [
            ("admin", "HQ"),
            ("dg", "HQ"),
            ("ddg1", "HQ"),
            ("ddg2", "HQ"),
            ("head", OFFICE),
            ("head2", OTHER_OFFICE),
            ("fin", "HQ"),
            ("tl", OFFICE),
            ("a", OFFICE),
            ("b", OFFICE),
            ("c", OFFICE),
        ] {
            officer(&store, id, office);
        }
        grant(&store, "admin", RoleType::Admin, ScopeType::Global, None);
        grant(&store, "dg", RoleType::Dg, ScopeType::Global, None);
        grant(&store, "ddg1", RoleType::DdgOne, ScopeType::Global, None);
        grant(&store, "ddg2", RoleType::DdgTwo, ScopeType::Global, None);
        grant(&store, "head", RoleType::RdHead, ScopeType::Office, Some(OFFICE));
        grant(&store, "head2", RoleType::RdHead, ScopeType::Office, Some(OTHER_OFFICE));
        grant(&store, "fin", RoleType::Finance, ScopeType::Global, None);

        store.add_hierarchy_entry(HierarchyEntry {
            entity_type: HierarchyEntity::Office,
            entity_value: OFFICE.to_string(),
            group_code: Some("G1".to_string()),
            reports_to_role: RoleType::DdgOne,
            effective_from: day(2020, 1, 1),
            effective_to: None,
        });
        store.add_hierarchy_entry(HierarchyEntry {
            entity_type: HierarchyEntity::Group,
            entity_value: "G1".to_string(),
            group_code: None,
            reports_to_role: RoleType::DdgOne,
            effective_from: day(2020, 1, 1),
            effective_to: None,
        });

        let dyn_store: Arc<dyn Store> = store.clone();
        let authz = Arc::new(AuthorizationEngine::new(PermissionTable::standard()));
        let config = WorkflowConfig::default();
        Self {
            workflow: WorkflowService::new(dyn_store.clone(), authz.clone(), config.clone()),
            ledger: RevenueLedger::new(dyn_store, authz, config),
            store,
        }
    }

    pub fn actor(&self, officer_id: &str) -> Actor {
        self.workflow.resolve_actor(officer_id).unwrap()
    }

    pub fn register(&self, kind: &str, total: &str) -> Assignment {
        self.workflow
            .register(
                RegisterAssignmentRequest {
                    title: Some("Energy audit of cement plant".to_string()),
                    assignment_type: Some(kind.to_string()),
                    client: Some("Acme Cements".to_string()),
                    total_value: Some(dec(total)),
                    ..Default::default()
                },
                &self.actor("a"),
            )
            .unwrap()
    }

    /// Registered, approved and led by `tl`: stage DETAIL_ENTRY.
    pub fn in_detail_entry(&self, total: &str) -> Assignment {
        let assignment = self.register("ASSIGNMENT", total);
        let head = self.actor("head");
        self.workflow
            .approve_registration(assignment.id, &head, None)
            .unwrap();
        self.workflow
            .allocate_team_leader(assignment.id, "tl", &head)
            .unwrap()
    }

    /// Fills every section with valid data. Shares: a 60 / b 40.
    /// Milestones: 50% due 2025-06-30 and 50% due 2026-03-31.
    pub fn fill_sections(&self, id: Uuid) {
        let tl = self.actor("tl");
        self.workflow
            .update_basic_details(
                id,
                BasicDetailsUpdate {
                    client: Some("Acme Cements".to_string()),
                    start_date: Some(day(2025, 4, 1)),
                    target_date: Some(day(2026, 3, 31)),
                    ..Default::default()
                },
                &tl,
            )
            .unwrap();
        self.workflow
            .save_expenditure(
                id,
                vec![ExpenditureInput {
                    head_code: "TRAVEL".to_string(),
                    estimated_amount: dec("1500"),
                    actual_amount: None,
                    remarks: None,
                }],
                &tl,
            )
            .unwrap();
        self.workflow
            .save_team(
                id,
                vec![
                    TeamMemberInput {
                        officer_id: "tl".to_string(),
                        role: TeamRole::TeamLeader,
                    },
                    TeamMemberInput {
                        officer_id: "a".to_string(),
                        role: TeamRole::Member,
                    },
                ],
                &tl,
            )
            .unwrap();
        self.workflow
            .save_milestones(
                id,
                vec![
                    MilestoneInput {
                        title: "Inception report".to_string(),
                        target_date: Some(day(2025, 6, 30)),
                        invoice_percent: dec("50"),
                    },
                    MilestoneInput {
                        title: "Final report".to_string(),
                        target_date: Some(day(2026, 3, 31)),
                        invoice_percent: dec("50"),
                    },
                ],
                &tl,
            )
            .unwrap();
        self.workflow
            .save_revenue_shares(
                id,
                vec![
                    RevenueShareInput {
                        officer_id: "a".to_string(),
                        share_percent: dec("60"),
                    },
                    RevenueShareInput {
                        officer_id: "b".to_string(),
                        share_percent: dec("40"),
                    },
                ],
                &tl,
            )
            .unwrap();
    }

    /// Submits and approves every section: stage ACTIVE.
    pub fn activate(&self, id: Uuid) -> Assignment {
        let tl = self.actor("tl");
        let head = self.actor("head");
        let mut last = None;
        for section in Section::ALL {
            self.workflow.submit_section(id, *section, &tl).unwrap();
            last = Some(self.workflow.approve_section(id, *section, &head).unwrap());
        }
        last.unwrap()
    }

    pub fn active_assignment(&self, total: &str) -> Assignment {
        let assignment = self.in_detail_entry(total);
        self.fill_sections(assignment.id);
        self.activate(assignment.id)
    }
}
