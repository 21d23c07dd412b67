//! Physical and timeline progress of an assignment, derived from its milestones.
//!
//! Both figures are percentages rounded to two decimals and are recomputed
//! whenever an invoice is approved or a payment recorded. Milestone weights
//! are not normalized, so physical progress can exceed 100 when the invoice
//! percents do.

use bigdecimal::ToPrimitive;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::shared::enums::MilestoneStatus;
use crate::storage::{StoreTx, TxResult};
use crate::workflow::numbering::financial_year_start;
use crate::workflow::types::{Assignment, Milestone};

const PAID_SCORE: f64 = 100.0;
const INVOICED_SCORE: f64 = 80.0;
const OVERDUE_SCORE: f64 = 50.0;
const MAX_DELAY_PENALTY: f64 = 50.0;
const MIN_SPAN_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub physical_progress_percent: f64,
    pub timeline_progress_percent: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Weighted by each milestone's invoice percent: paid counts fully, invoiced
/// counts 80%, anything else nothing.
pub fn physical_progress(milestones: &[Milestone]) -> f64 {
    let total: f64 = milestones
        .iter()
        .map(|m| {
            let weight = m.invoice_percent.to_f64().unwrap_or(0.0);
            let score = if m.payment_received {
                PAID_SCORE
            } else if m.invoice_raised {
                INVOICED_SCORE
            } else {
                0.0
            };
            weight * score / 100.0
        })
        .sum();
    round2(total)
}

/// 100 minus the delay as a share of the span from the financial year start
/// to the target, with the penalty capped at 50.
fn decayed_score(target: NaiveDate, actual: NaiveDate) -> f64 {
    let delay = (actual - target).num_days().max(0) as f64;
    let span = (target - financial_year_start(target))
        .num_days()
        .max(MIN_SPAN_DAYS) as f64;
    PAID_SCORE - (delay * 100.0 / span).min(MAX_DELAY_PENALTY)
}

/// Score of one milestone as of `today`, or `None` when it should not count
/// (cancelled, undated, or not yet due and not finished).
pub fn milestone_timeline_score(milestone: &Milestone, today: NaiveDate) -> Option<f64> {
    if milestone.status == MilestoneStatus::Cancelled {
        return None;
    }
    let target = milestone.target_date?;

    let completed = milestone.status == MilestoneStatus::Completed || milestone.payment_received;
    if completed {
        let finished = milestone
            .actual_completion_date
            .or(milestone.payment_received_date)
            .unwrap_or(today);
        return Some(if finished <= target {
            PAID_SCORE
        } else {
            decayed_score(target, finished)
        });
    }

    if today <= target {
        return None;
    }
    if milestone.invoice_raised {
        Some(decayed_score(target, today))
    } else {
        Some(OVERDUE_SCORE)
    }
}

pub fn timeline_progress(milestones: &[Milestone], today: NaiveDate) -> f64 {
    if milestones.is_empty() {
        return 0.0;
    }
    let scores: Vec<f64> = milestones
        .iter()
        .filter_map(|m| milestone_timeline_score(m, today))
        .collect();
    if scores.is_empty() {
        return 100.0;
    }
    round2(scores.iter().sum::<f64>() / scores.len() as f64)
}

pub fn report(milestones: &[Milestone], today: NaiveDate) -> ProgressReport {
    ProgressReport {
        physical_progress_percent: physical_progress(milestones),
        timeline_progress_percent: timeline_progress(milestones, today),
    }
}

/// Recomputes the stored progress figures on `assignment`. The caller
/// persists the assignment within the same transaction.
pub fn refresh(
    tx: &mut dyn StoreTx,
    assignment: &mut Assignment,
    today: NaiveDate,
) -> TxResult<ProgressReport> {
    let milestones = tx.milestones(assignment.id)?;
    let report = report(&milestones, today);
    assignment.physical_progress_percent = report.physical_progress_percent;
    assignment.timeline_progress_percent = report.timeline_progress_percent;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::Utc;
    use std::str::FromStr;
    use uuid::Uuid;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn milestone(pct: &str, target: Option<NaiveDate>) -> Milestone {
        Milestone {
            id: Uuid::new_v4(),
            assignment_id: Uuid::nil(),
            milestone_no: 1,
            title: "Inception report".to_string(),
            target_date: target,
            actual_completion_date: None,
            invoice_percent: BigDecimal::from_str(pct).unwrap(),
            invoice_amount: BigDecimal::from(0),
            invoice_raised: false,
            invoice_raised_date: None,
            payment_received: false,
            payment_received_date: None,
            status: MilestoneStatus::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_physical_progress_scores() {
        let mut paid = milestone("30", None);
        paid.invoice_raised = true;
        paid.payment_received = true;
        let mut invoiced = milestone("50", None);
        invoiced.invoice_raised = true;
        let untouched = milestone("20", None);

        // 30 * 1.0 + 50 * 0.8 + 20 * 0
        assert_eq!(physical_progress(&[paid, invoiced, untouched]), 70.0);
        assert_eq!(physical_progress(&[]), 0.0);
    }

    #[test]
    fn test_physical_progress_is_not_capped() {
        let mut first = milestone("80", None);
        first.invoice_raised = true;
        first.payment_received = true;
        let mut second = milestone("70", None);
        second.invoice_raised = true;
        second.payment_received = true;
        assert_eq!(physical_progress(&[first, second]), 150.0);
    }

    #[test]
    fn test_timeline_span_for_january_target_starts_at_april() {
        // 2025-04-01 to 2026-01-31 is 305 days, 61 days late is 20%
        let mut late = milestone("100", Some(day(2026, 1, 31)));
        late.status = MilestoneStatus::Completed;
        late.actual_completion_date = Some(day(2026, 4, 2));
        assert_eq!(milestone_timeline_score(&late, day(2026, 5, 1)), Some(80.0));
    }

    #[test]
    fn test_timeline_empty_and_not_due() {
        let today = day(2025, 6, 1);
        assert_eq!(timeline_progress(&[], today), 0.0);

        let future = milestone("100", Some(day(2025, 9, 30)));
        assert_eq!(timeline_progress(&[future], today), 100.0);
    }

    #[test]
    fn test_timeline_overdue_without_invoice_is_half() {
        let overdue = milestone("50", Some(day(2025, 5, 1)));
        let future = milestone("50", Some(day(2025, 12, 1)));
        assert_eq!(timeline_progress(&[overdue, future], day(2025, 6, 1)), 50.0);
    }

    #[test]
    fn test_timeline_completed_on_time_and_late() {
        let mut on_time = milestone("50", Some(day(2025, 6, 30)));
        on_time.status = MilestoneStatus::Completed;
        on_time.actual_completion_date = Some(day(2025, 6, 20));
        assert_eq!(milestone_timeline_score(&on_time, day(2025, 8, 1)), Some(100.0));

        // span from 2025-04-01 to 2025-06-30 is 90 days, 9 days late is 10%
        let mut late = milestone("50", Some(day(2025, 6, 30)));
        late.status = MilestoneStatus::Completed;
        late.actual_completion_date = Some(day(2025, 7, 9));
        assert_eq!(milestone_timeline_score(&late, day(2025, 8, 1)), Some(90.0));

        let mut very_late = late.clone();
        very_late.actual_completion_date = Some(day(2026, 1, 1));
        assert_eq!(milestone_timeline_score(&very_late, day(2026, 2, 1)), Some(50.0));
    }

    #[test]
    fn test_timeline_uses_minimum_span() {
        // target 10 days into the year: span is raised to 30 days
        let mut m = milestone("100", Some(day(2025, 4, 11)));
        m.invoice_raised = true;
        assert_eq!(milestone_timeline_score(&m, day(2025, 4, 17)), Some(80.0));
    }

    #[test]
    fn test_cancelled_and_undated_are_ignored() {
        let mut cancelled = milestone("50", Some(day(2025, 4, 10)));
        cancelled.status = MilestoneStatus::Cancelled;
        let undated = milestone("50", None);
        assert_eq!(milestone_timeline_score(&cancelled, day(2025, 6, 1)), None);
        assert_eq!(milestone_timeline_score(&undated, day(2025, 6, 1)), None);
        assert_eq!(
            timeline_progress(&[cancelled, undated], day(2025, 6, 1)),
            100.0
        );
    }
}
