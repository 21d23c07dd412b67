use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use super::allocation::{recognized_portion, split_by_shares};
use super::types::*;
use crate::authz::{Actor, AuthorizationEngine};
use crate::core::config::WorkflowConfig;
use crate::core::shared::enums::{
    InvoiceStatus, MilestoneStatus, Permission, RevenueType, WorkflowStage,
};
use crate::error::WorkflowError;
use crate::progress;
use crate::storage::{Store, StoreTx, TxResult};
use crate::workflow::numbering::{financial_year, monthly_document_number, monthly_sequence_key};
use crate::workflow::service::{load_hierarchy, log_activity, required_text};
use crate::workflow::types::Assignment;

const INVOICE_ENTITY: &str = "INVOICE_REQUEST";
const RECEIPT_ENTITY: &str = "PAYMENT_RECEIPT";

/// Share of an invoice recognized on approval; the rest follows payment.
const INVOICE_RECOGNITION_PERCENT: u32 = 80;
const PAYMENT_RECOGNITION_PERCENT: u32 = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceApproval {
    pub invoice: InvoiceRequest,
    pub entries: Vec<LedgerEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecording {
    pub receipt: PaymentReceipt,
    pub entries: Vec<LedgerEntry>,
}

/// Where recognized revenue came from.
enum RevenueSource {
    Invoice { invoice_id: Uuid },
    Payment { receipt_id: Uuid, invoice_id: Uuid },
}

/// Invoicing, payment receipts and the per-officer revenue ledger.
#[derive(Clone)]
pub struct RevenueLedger {
    store: Arc<dyn Store>,
    authz: Arc<AuthorizationEngine>,
    config: WorkflowConfig,
}

impl RevenueLedger {
    pub fn new(
        store: Arc<dyn Store>,
        authz: Arc<AuthorizationEngine>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            store,
            authz,
            config,
        }
    }

    fn require_finance_scope(
        &self,
        tx: &mut dyn StoreTx,
        actor: &Actor,
        permission: Permission,
        office_id: &str,
    ) -> TxResult<()> {
        self.authz.require_permission(actor, permission)?;
        let hierarchy = load_hierarchy(tx)?;
        self.authz.require_scope(actor, office_id, &hierarchy)
    }

    pub fn raise_invoice_request(
        &self,
        assignment_id: Uuid,
        input: InvoiceRequestInput,
        actor: &Actor,
    ) -> Result<InvoiceRequest, WorkflowError> {
        if input.invoice_amount <= BigDecimal::from(0) {
            return Err(WorkflowError::Validation(
                "invoice_amount must be positive".to_string(),
            ));
        }
        let invoice = self.store.transaction(|tx| {
            let assignment = tx.lock_assignment(assignment_id)?;
            if assignment.workflow_stage != WorkflowStage::Active {
                return Err(WorkflowError::InvalidState(format!(
                    "invoices can only be raised on ACTIVE assignments, {} is {}",
                    assignment.assignment_no, assignment.workflow_stage
                )));
            }
            if !assignment.is_led_by(&actor.officer_id) {
                self.require_finance_scope(
                    tx,
                    actor,
                    Permission::ApproveAssignment,
                    &assignment.office_id,
                )?;
            }

            if let Some(milestone_id) = input.milestone_id {
                let milestone = tx
                    .milestones(assignment.id)?
                    .into_iter()
                    .find(|m| m.id == milestone_id)
                    .ok_or_else(|| {
                        WorkflowError::Validation(format!(
                            "milestone {} does not belong to {}",
                            milestone_id, assignment.assignment_no
                        ))
                    })?;
                if milestone.invoice_raised {
                    return Err(WorkflowError::InvalidState(format!(
                        "milestone {} is already invoiced",
                        milestone.milestone_no
                    )));
                }
                let open = tx.invoice_requests_for(assignment.id)?.into_iter().any(|i| {
                    i.milestone_id == Some(milestone_id) && i.status == InvoiceStatus::Pending
                });
                if open {
                    return Err(WorkflowError::InvalidState(format!(
                        "milestone {} already has a pending invoice request",
                        milestone.milestone_no
                    )));
                }
            }

            let today = Utc::now().date_naive();
            let sequence = tx.next_sequence(&monthly_sequence_key("INV", &assignment.office_id, today))?;
            let now = Utc::now();
            let invoice = InvoiceRequest {
                id: Uuid::new_v4(),
                request_number: monthly_document_number("INV", &assignment.office_id, today, sequence),
                assignment_id: assignment.id,
                milestone_id: input.milestone_id,
                invoice_type: input.invoice_type,
                invoice_amount: input.invoice_amount,
                fy_period: financial_year(today),
                description: input.description,
                status: InvoiceStatus::Pending,
                requested_by: actor.officer_id.clone(),
                approved_by: None,
                approved_at: None,
                approval_remarks: None,
                revenue_recognized_80: BigDecimal::from(0),
                created_at: now,
                updated_at: now,
            };
            tx.insert_invoice_request(&invoice)?;
            log_activity(
                tx,
                actor,
                "INVOICE_REQUESTED",
                INVOICE_ENTITY,
                invoice.id,
                Some(invoice.request_number.clone()),
            )?;
            Ok(invoice)
        })?;
        info!(
            "Invoice request {} raised for {} ({})",
            invoice.request_number, assignment_id, invoice.invoice_amount
        );
        Ok(invoice)
    }

    /// Approves a pending invoice and recognizes 80% of it across the
    /// assignment's revenue shares, all in one transaction.
    pub fn approve_invoice(
        &self,
        invoice_id: Uuid,
        approver: &Actor,
        remarks: Option<String>,
    ) -> Result<InvoiceApproval, WorkflowError> {
        let approval = self.store.transaction(|tx| {
            let mut invoice = tx.lock_invoice_request(invoice_id)?;
            let mut assignment = tx.lock_assignment(invoice.assignment_id)?;
            self.require_finance_scope(
                tx,
                approver,
                Permission::ApproveInvoice,
                &assignment.office_id,
            )?;
            if invoice.status != InvoiceStatus::Pending {
                return Err(WorkflowError::InvalidState(format!(
                    "invoice {} is already {}",
                    invoice.request_number, invoice.status
                )));
            }

            let now = Utc::now();
            let today = now.date_naive();
            let revenue_80 =
                recognized_portion(&invoice.invoice_amount, INVOICE_RECOGNITION_PERCENT);
            invoice.status = InvoiceStatus::Approved;
            invoice.approved_by = Some(approver.officer_id.clone());
            invoice.approved_at = Some(now);
            invoice.approval_remarks = remarks.clone();
            invoice.revenue_recognized_80 = revenue_80.clone();
            invoice.updated_at = now;
            tx.update_invoice_request(&invoice)?;

            if let Some(milestone_id) = invoice.milestone_id {
                if let Some(mut milestone) = tx
                    .milestones(assignment.id)?
                    .into_iter()
                    .find(|m| m.id == milestone_id)
                {
                    milestone.invoice_raised = true;
                    milestone.invoice_raised_date = Some(today);
                    milestone.invoice_amount = invoice.invoice_amount.clone();
                    if milestone.status == MilestoneStatus::Pending {
                        milestone.status = MilestoneStatus::InProgress;
                    }
                    milestone.updated_at = now;
                    tx.update_milestone(&milestone)?;
                }
            }

            assignment.invoice_raised_amount =
                &assignment.invoice_raised_amount + &invoice.invoice_amount;
            let entries = self.allocate(
                tx,
                &assignment,
                RevenueSource::Invoice {
                    invoice_id: invoice.id,
                },
                &revenue_80,
                today,
            )?;
            progress::refresh(tx, &mut assignment, today)?;
            assignment.touch();
            tx.update_assignment(&assignment)?;
            log_activity(
                tx,
                approver,
                "INVOICE_APPROVED",
                INVOICE_ENTITY,
                invoice.id,
                remarks,
            )?;
            Ok(InvoiceApproval { invoice, entries })
        })?;
        info!(
            "Invoice {} approved, {} recognized across {} officers",
            approval.invoice.request_number,
            approval.invoice.revenue_recognized_80,
            approval.entries.len()
        );
        Ok(approval)
    }

    pub fn reject_invoice(
        &self,
        invoice_id: Uuid,
        approver: &Actor,
        remarks: String,
    ) -> Result<InvoiceRequest, WorkflowError> {
        let remarks = required_text(Some(remarks), "remarks")?;
        self.store.transaction(|tx| {
            let mut invoice = tx.lock_invoice_request(invoice_id)?;
            let assignment = tx.lock_assignment(invoice.assignment_id)?;
            self.require_finance_scope(
                tx,
                approver,
                Permission::ApproveInvoice,
                &assignment.office_id,
            )?;
            if invoice.status != InvoiceStatus::Pending {
                return Err(WorkflowError::InvalidState(format!(
                    "invoice {} is already {}",
                    invoice.request_number, invoice.status
                )));
            }
            let now = Utc::now();
            invoice.status = InvoiceStatus::Rejected;
            invoice.approved_by = Some(approver.officer_id.clone());
            invoice.approved_at = Some(now);
            invoice.approval_remarks = Some(remarks.clone());
            invoice.updated_at = now;
            tx.update_invoice_request(&invoice)?;
            log_activity(
                tx,
                approver,
                "INVOICE_REJECTED",
                INVOICE_ENTITY,
                invoice.id,
                Some(remarks),
            )?;
            Ok(invoice)
        })
    }

    /// Records the single payment against an approved invoice and recognizes
    /// 20% of the amount received.
    pub fn record_payment(
        &self,
        invoice_id: Uuid,
        input: PaymentInput,
        actor: &Actor,
    ) -> Result<PaymentRecording, WorkflowError> {
        if input.amount_received <= BigDecimal::from(0) {
            return Err(WorkflowError::Validation(
                "amount_received must be positive".to_string(),
            ));
        }
        let recording = self.store.transaction(|tx| {
            let invoice = tx.lock_invoice_request(invoice_id)?;
            let mut assignment = tx.lock_assignment(invoice.assignment_id)?;
            self.require_finance_scope(
                tx,
                actor,
                Permission::RecordPayment,
                &assignment.office_id,
            )?;
            if invoice.status != InvoiceStatus::Approved {
                return Err(WorkflowError::InvalidState(format!(
                    "payments need an approved invoice, {} is {}",
                    invoice.request_number, invoice.status
                )));
            }
            if tx.receipt_for_invoice(invoice.id)?.is_some() {
                return Err(WorkflowError::InvalidState(format!(
                    "payment for {} is already recorded",
                    invoice.request_number
                )));
            }

            let now = Utc::now();
            let revenue_20 =
                recognized_portion(&input.amount_received, PAYMENT_RECOGNITION_PERCENT);
            let sequence = tx.next_sequence(&monthly_sequence_key(
                "RCP",
                &assignment.office_id,
                input.receipt_date,
            ))?;
            let receipt = PaymentReceipt {
                id: Uuid::new_v4(),
                receipt_number: monthly_document_number(
                    "RCP",
                    &assignment.office_id,
                    input.receipt_date,
                    sequence,
                ),
                invoice_request_id: invoice.id,
                amount_received: input.amount_received,
                receipt_date: input.receipt_date,
                payment_mode: input.payment_mode,
                reference_number: input.reference_number,
                fy_period: financial_year(input.receipt_date),
                remarks: input.remarks,
                revenue_recognized_20: revenue_20.clone(),
                updated_by: actor.officer_id.clone(),
                created_at: now,
            };
            tx.insert_payment_receipt(&receipt)?;

            if let Some(milestone_id) = invoice.milestone_id {
                if let Some(mut milestone) = tx
                    .milestones(assignment.id)?
                    .into_iter()
                    .find(|m| m.id == milestone_id)
                {
                    milestone.payment_received = true;
                    milestone.payment_received_date = Some(receipt.receipt_date);
                    milestone.status = MilestoneStatus::Completed;
                    if milestone.actual_completion_date.is_none() {
                        milestone.actual_completion_date = Some(receipt.receipt_date);
                    }
                    milestone.updated_at = now;
                    tx.update_milestone(&milestone)?;
                }
            }

            assignment.payment_received_amount =
                &assignment.payment_received_amount + &receipt.amount_received;
            let entries = self.allocate(
                tx,
                &assignment,
                RevenueSource::Payment {
                    receipt_id: receipt.id,
                    invoice_id: invoice.id,
                },
                &revenue_20,
                receipt.receipt_date,
            )?;
            progress::refresh(tx, &mut assignment, now.date_naive())?;
            assignment.touch();
            tx.update_assignment(&assignment)?;
            log_activity(
                tx,
                actor,
                "PAYMENT_RECORDED",
                RECEIPT_ENTITY,
                receipt.id,
                Some(invoice.request_number.clone()),
            )?;
            Ok(PaymentRecording { receipt, entries })
        })?;
        info!(
            "Payment {} recorded, {} recognized across {} officers",
            recording.receipt.receipt_number,
            recording.receipt.revenue_recognized_20,
            recording.entries.len()
        );
        Ok(recording)
    }

    /// Appends one ledger row per revenue share. Fails the surrounding
    /// transaction when the shares do not balance.
    fn allocate(
        &self,
        tx: &mut dyn StoreTx,
        assignment: &Assignment,
        source: RevenueSource,
        total: &BigDecimal,
        transaction_date: NaiveDate,
    ) -> TxResult<Vec<LedgerEntry>> {
        let shares = tx.revenue_shares(assignment.id)?;
        let splits = split_by_shares(total, &shares, &self.config.share_tolerance)?;

        let (source_id, invoice_request_id, payment_receipt_id, revenue_type) = match source {
            RevenueSource::Invoice { invoice_id } => {
                (invoice_id, Some(invoice_id), None, RevenueType::Invoice80)
            }
            RevenueSource::Payment {
                receipt_id,
                invoice_id,
            } => (
                receipt_id,
                Some(invoice_id),
                Some(receipt_id),
                RevenueType::Payment20,
            ),
        };
        let fy_period = financial_year(transaction_date);
        let now = Utc::now();
        let entries: Vec<LedgerEntry> = splits
            .into_iter()
            .map(|split| LedgerEntry {
                id: Uuid::new_v4(),
                officer_id: split.officer_id,
                assignment_id: assignment.id,
                invoice_request_id,
                payment_receipt_id,
                source_id,
                revenue_type,
                share_percent: split.share_percent,
                amount: split.amount,
                fy_period: fy_period.clone(),
                transaction_date,
                remarks: Some(assignment.assignment_no.clone()),
                created_at: now,
            })
            .collect();
        tx.append_ledger_entries(&entries)?;
        Ok(entries)
    }

    pub fn ledger_entries_for_source(
        &self,
        source_id: Uuid,
        revenue_type: RevenueType,
    ) -> Result<Vec<LedgerEntry>, WorkflowError> {
        self.store
            .transaction(|tx| tx.ledger_entries_for_source(source_id, revenue_type))
    }

    pub fn officer_revenue_summary(
        &self,
        officer_id: &str,
        fy_period: &str,
        actor: &Actor,
    ) -> Result<OfficerRevenueSummary, WorkflowError> {
        if actor.officer_id != officer_id {
            self.authz.require_permission(actor, Permission::ViewAllMis)?;
        }
        let entries = self
            .store
            .transaction(|tx| tx.ledger_entries_for_officer(officer_id, fy_period))?;

        let zero = BigDecimal::from(0);
        let (invoice_80, payment_20) =
            entries
                .iter()
                .fold((zero.clone(), zero), |(inv, pay), e| match e.revenue_type {
                    RevenueType::Invoice80 => (inv + &e.amount, pay),
                    RevenueType::Payment20 => (inv, pay + &e.amount),
                });
        let assignment_count = entries
            .iter()
            .map(|e| e.assignment_id)
            .collect::<HashSet<_>>()
            .len();
        Ok(OfficerRevenueSummary {
            officer_id: officer_id.to_string(),
            fy_period: fy_period.to_string(),
            total: &invoice_80 + &payment_20,
            invoice_80,
            payment_20,
            assignment_count,
        })
    }

    pub fn assignment_revenue_summary(
        &self,
        assignment_id: Uuid,
        actor: &Actor,
    ) -> Result<AssignmentRevenueSummary, WorkflowError> {
        self.authz.require_permission(actor, Permission::ViewAllMis)?;
        self.store.transaction(|tx| {
            if tx.find_assignment(assignment_id)?.is_none() {
                return Err(WorkflowError::NotFound(format!("assignment {}", assignment_id)));
            }
            let zero = BigDecimal::from(0);
            let (total_invoiced, revenue_80) = tx
                .invoice_requests_for(assignment_id)?
                .iter()
                .filter(|i| i.status == InvoiceStatus::Approved)
                .fold((zero.clone(), zero.clone()), |(amount, rev), i| {
                    (amount + &i.invoice_amount, rev + &i.revenue_recognized_80)
                });
            let (total_received, revenue_20) = tx
                .receipts_for(assignment_id)?
                .iter()
                .fold((zero.clone(), zero), |(amount, rev), r| {
                    (amount + &r.amount_received, rev + &r.revenue_recognized_20)
                });
            Ok(AssignmentRevenueSummary {
                assignment_id,
                total_recognized: &revenue_80 + &revenue_20,
                total_invoiced,
                total_received,
                revenue_80,
                revenue_20,
            })
        })
    }

    pub fn invoice_requests(
        &self,
        assignment_id: Uuid,
        actor: &Actor,
    ) -> Result<Vec<InvoiceRequest>, WorkflowError> {
        self.authz.require_permission(actor, Permission::ViewAllMis)?;
        self.store
            .transaction(|tx| tx.invoice_requests_for(assignment_id))
    }
}
