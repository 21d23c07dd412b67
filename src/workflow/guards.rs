//! Pure transition rules. Nothing here touches storage; services call these
//! inside their transaction after loading the locked rows.

use bigdecimal::BigDecimal;

use super::types::SectionStatuses;
use crate::core::shared::enums::{Section, SectionStatus, WorkflowStage};
use crate::error::WorkflowError;

/// Stage after a section change. Only DETAIL_ENTRY with every section
/// approved moves (to ACTIVE); every other input is returned unchanged.
pub fn next_stage(current: WorkflowStage, sections: &SectionStatuses) -> WorkflowStage {
    match current {
        WorkflowStage::DetailEntry if sections.all_approved() => WorkflowStage::Active,
        other => other,
    }
}

/// Edits to an approved section send it back for approval.
pub fn reset_on_edit(sections: &mut SectionStatuses, section: Section) -> bool {
    if sections.get(section) == SectionStatus::Approved {
        sections.set(section, SectionStatus::Submitted);
        return true;
    }
    false
}

pub fn share_total<'a>(percents: impl IntoIterator<Item = &'a BigDecimal>) -> BigDecimal {
    percents
        .into_iter()
        .fold(BigDecimal::from(0), |acc, pct| acc + pct)
}

pub fn shares_balanced(total: &BigDecimal, tolerance: &BigDecimal) -> bool {
    (total - BigDecimal::from(100)).abs() <= *tolerance
}

/// Facts about a section's underlying data needed to decide whether it can be submitted.
#[derive(Debug, Clone, Default)]
pub struct SectionEvidence {
    pub details_filled: bool,
    pub expenditure_items: usize,
    pub active_team_members: usize,
    pub milestones: usize,
    pub share_count: usize,
    pub share_total: BigDecimal,
}

pub fn check_submission(
    section: Section,
    evidence: &SectionEvidence,
    tolerance: &BigDecimal,
) -> Result<(), WorkflowError> {
    let missing = match section {
        Section::Basic if !evidence.details_filled => {
            Some("client, start date and target date must be filled".to_string())
        }
        Section::Cost if evidence.expenditure_items == 0 => {
            Some("at least one expenditure item is required".to_string())
        }
        Section::Team if evidence.active_team_members == 0 => {
            Some("at least one team member is required".to_string())
        }
        Section::Milestone if evidence.milestones == 0 => {
            Some("at least one milestone is required".to_string())
        }
        Section::Revenue if evidence.share_count == 0 => {
            Some("revenue shares are required".to_string())
        }
        Section::Revenue if !shares_balanced(&evidence.share_total, tolerance) => Some(format!(
            "revenue shares total {}, expected 100",
            evidence.share_total
        )),
        _ => None,
    };
    match missing {
        Some(reason) => Err(WorkflowError::IncompleteSection(format!(
            "{}: {}",
            section, reason
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn all(status: SectionStatus) -> SectionStatuses {
        SectionStatuses {
            basic: status,
            cost: status,
            team: status,
            milestone: status,
            revenue: status,
        }
    }

    #[test]
    fn test_next_stage_activates_only_from_detail_entry() {
        let approved = all(SectionStatus::Approved);
        assert_eq!(
            next_stage(WorkflowStage::DetailEntry, &approved),
            WorkflowStage::Active
        );
        assert_eq!(
            next_stage(WorkflowStage::TlAssignment, &approved),
            WorkflowStage::TlAssignment
        );
        assert_eq!(next_stage(WorkflowStage::Active, &approved), WorkflowStage::Active);

        let mut one_short = approved;
        one_short.revenue = SectionStatus::Submitted;
        assert_eq!(
            next_stage(WorkflowStage::DetailEntry, &one_short),
            WorkflowStage::DetailEntry
        );
    }

    #[test]
    fn test_reset_on_edit_only_touches_approved() {
        let mut sections = all(SectionStatus::Approved);
        sections.cost = SectionStatus::Draft;
        assert!(reset_on_edit(&mut sections, Section::Team));
        assert_eq!(sections.team, SectionStatus::Submitted);
        assert!(!reset_on_edit(&mut sections, Section::Cost));
        assert_eq!(sections.cost, SectionStatus::Draft);
    }

    #[test]
    fn test_share_balance_tolerance() {
        let tolerance = dec("0.01");
        let shares = [dec("33.33"), dec("33.33"), dec("33.33")];
        let total = share_total(shares.iter());
        assert_eq!(total, dec("99.99"));
        assert!(shares_balanced(&total, &tolerance));
        assert!(!shares_balanced(&dec("99.98"), &tolerance));
        assert!(!shares_balanced(&dec("100.5"), &tolerance));
    }

    #[test]
    fn test_revenue_submission_requires_balanced_shares() {
        let tolerance = dec("0.01");
        let mut evidence = SectionEvidence {
            share_count: 2,
            share_total: dec("90"),
            ..Default::default()
        };
        assert!(matches!(
            check_submission(Section::Revenue, &evidence, &tolerance),
            Err(WorkflowError::IncompleteSection(_))
        ));
        evidence.share_total = dec("100");
        assert!(check_submission(Section::Revenue, &evidence, &tolerance).is_ok());
    }

    #[test]
    fn test_empty_sections_are_incomplete() {
        let tolerance = dec("0.01");
        let evidence = SectionEvidence::default();
        for section in Section::ALL {
            assert!(
                check_submission(*section, &evidence, &tolerance).is_err(),
                "{} should be incomplete",
                section
            );
        }
    }
}
