use chrono::NaiveDate;
use std::collections::HashMap;

use super::types::HierarchyEntry;
use crate::core::shared::enums::{HierarchyEntity, RoleType};

/// Office to group membership and office/group to responsible DDG, as of one day.
#[derive(Debug, Clone, Default)]
pub struct ReportingHierarchy {
    office_groups: HashMap<String, String>,
    reports_to: HashMap<(HierarchyEntity, String), RoleType>,
}

impl ReportingHierarchy {
    pub fn from_entries(entries: &[HierarchyEntry], on: NaiveDate) -> Self {
        let mut hierarchy = Self::default();
        for entry in entries.iter().filter(|e| e.is_effective_on(on)) {
            if entry.entity_type == HierarchyEntity::Office {
                if let Some(group) = &entry.group_code {
                    hierarchy
                        .office_groups
                        .insert(entry.entity_value.clone(), group.clone());
                }
            }
            hierarchy.reports_to.insert(
                (entry.entity_type, entry.entity_value.clone()),
                entry.reports_to_role,
            );
        }
        hierarchy
    }

    pub fn group_of_office(&self, office_id: &str) -> Option<&str> {
        self.office_groups.get(office_id).map(String::as_str)
    }

    /// The DDG an office reports to, falling back to its group's DDG.
    pub fn responsible_ddg(&self, office_id: &str) -> Option<RoleType> {
        self.reports_to
            .get(&(HierarchyEntity::Office, office_id.to_string()))
            .copied()
            .or_else(|| {
                let group = self.group_of_office(office_id)?;
                self.reports_to
                    .get(&(HierarchyEntity::Group, group.to_string()))
                    .copied()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(
        entity_type: HierarchyEntity,
        value: &str,
        group: Option<&str>,
        ddg: RoleType,
    ) -> HierarchyEntry {
        HierarchyEntry {
            entity_type,
            entity_value: value.to_string(),
            group_code: group.map(str::to_string),
            reports_to_role: ddg,
            effective_from: day(2020, 4, 1),
            effective_to: None,
        }
    }

    #[test]
    fn test_office_group_and_ddg_lookup() {
        let entries = vec![
            entry(HierarchyEntity::Office, "CHN", Some("IE"), RoleType::DdgOne),
            entry(HierarchyEntity::Office, "KOL", Some("ECA"), RoleType::DdgTwo),
            entry(HierarchyEntity::Group, "ECA", None, RoleType::DdgTwo),
        ];
        let h = ReportingHierarchy::from_entries(&entries, day(2025, 6, 1));
        assert_eq!(h.group_of_office("CHN"), Some("IE"));
        assert_eq!(h.responsible_ddg("CHN"), Some(RoleType::DdgOne));
        assert_eq!(h.responsible_ddg("KOL"), Some(RoleType::DdgTwo));
        assert_eq!(h.responsible_ddg("XYZ"), None);
    }

    #[test]
    fn test_group_fallback_and_expired_rows() {
        let mut expired = entry(HierarchyEntity::Office, "PAT", Some("ES"), RoleType::DdgOne);
        expired.effective_to = Some(day(2024, 3, 31));
        let entries = vec![
            expired,
            entry(HierarchyEntity::Office, "BBS", Some("ES"), RoleType::DdgOne),
            entry(HierarchyEntity::Group, "ES", None, RoleType::DdgOne),
        ];
        let h = ReportingHierarchy::from_entries(&entries, day(2025, 6, 1));
        assert_eq!(h.group_of_office("PAT"), None);
        assert_eq!(h.responsible_ddg("PAT"), None);
        assert_eq!(h.group_of_office("BBS"), Some("ES"));
    }
}
