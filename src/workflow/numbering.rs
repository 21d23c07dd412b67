use chrono::{Datelike, NaiveDate};

use crate::core::shared::enums::AssignmentType;

/// Financial year label (April to March) containing `date`, e.g. `2025-26`.
pub fn financial_year(date: NaiveDate) -> String {
    let start = financial_year_start(date).year();
    format!("{}-{:02}", start, (start + 1) % 100)
}

/// April 1st opening the financial year that contains `date`.
pub fn financial_year_start(date: NaiveDate) -> NaiveDate {
    let year = if date.month() >= 4 {
        date.year()
    } else {
        date.year() - 1
    };
    NaiveDate::from_ymd_opt(year, 4, 1).unwrap_or(date)
}

pub fn assignment_sequence_key(office_id: &str, fy: &str) -> String {
    format!("ASSIGNMENT/{}/{}", office_id, fy)
}

/// `{prefix}/{office}/{ASG|TRN|DEV}/{seq:03}/{fy}`
pub fn assignment_number(
    prefix: &str,
    office_id: &str,
    kind: AssignmentType,
    sequence: i64,
    fy: &str,
) -> String {
    format!(
        "{}/{}/{}/{:03}/{}",
        prefix,
        office_id,
        kind.number_code(),
        sequence,
        fy
    )
}

pub fn monthly_sequence_key(kind: &str, office_id: &str, date: NaiveDate) -> String {
    format!("{}/{}/{}", kind, office_id, date.format("%Y%m"))
}

/// `{kind}-{office}-{YYYYMM}-{seq:03}`, used for invoice requests and receipts.
pub fn monthly_document_number(kind: &str, office_id: &str, date: NaiveDate, sequence: i64) -> String {
    format!(
        "{}-{}-{}-{:03}",
        kind,
        office_id,
        date.format("%Y%m"),
        sequence
    )
}
