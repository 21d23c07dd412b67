use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::shared::enums::{InvoiceStatus, InvoiceType, PaymentMode, RevenueType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRequest {
    pub id: Uuid,
    pub request_number: String,
    pub assignment_id: Uuid,
    pub milestone_id: Option<Uuid>,
    pub invoice_type: InvoiceType,
    pub invoice_amount: BigDecimal,
    pub fy_period: String,
    pub description: Option<String>,
    pub status: InvoiceStatus,
    pub requested_by: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approval_remarks: Option<String>,
    pub revenue_recognized_80: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub id: Uuid,
    pub receipt_number: String,
    pub invoice_request_id: Uuid,
    pub amount_received: BigDecimal,
    pub receipt_date: NaiveDate,
    pub payment_mode: PaymentMode,
    pub reference_number: Option<String>,
    pub fy_period: String,
    pub remarks: Option<String>,
    pub revenue_recognized_20: BigDecimal,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
}

/// One officer's recognized revenue from one invoice approval or payment receipt.
/// Never updated or deleted once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub officer_id: String,
    pub assignment_id: Uuid,
    pub invoice_request_id: Option<Uuid>,
    pub payment_receipt_id: Option<Uuid>,
    pub source_id: Uuid,
    pub revenue_type: RevenueType,
    pub share_percent: BigDecimal,
    pub amount: BigDecimal,
    pub fy_period: String,
    pub transaction_date: NaiveDate,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceRequestInput {
    pub milestone_id: Option<Uuid>,
    pub invoice_type: InvoiceType,
    pub invoice_amount: BigDecimal,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInput {
    pub amount_received: BigDecimal,
    pub receipt_date: NaiveDate,
    pub payment_mode: PaymentMode,
    pub reference_number: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficerRevenueSummary {
    pub officer_id: String,
    pub fy_period: String,
    pub invoice_80: BigDecimal,
    pub payment_20: BigDecimal,
    pub total: BigDecimal,
    pub assignment_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentRevenueSummary {
    pub assignment_id: Uuid,
    pub total_invoiced: BigDecimal,
    pub total_received: BigDecimal,
    pub revenue_80: BigDecimal,
    pub revenue_20: BigDecimal,
    pub total_recognized: BigDecimal,
}
