mod common;

use common::*;
use pmsflow::core::shared::enums::{
    InvoiceStatus, InvoiceType, MilestoneStatus, PaymentMode, RevenueType,
};
use pmsflow::ledger::{InvoiceRequest, InvoiceRequestInput, PaymentInput};
use pmsflow::workflow::numbering::financial_year;
use pmsflow::workflow::types::Assignment;
use pmsflow::WorkflowError;

fn first_milestone(fx: &Fixture, assignment: &Assignment) -> uuid::Uuid {
    fx.workflow
        .assignment_detail(assignment.id, &fx.actor("tl"))
        .unwrap()
        .milestones[0]
        .id
}

fn raise(fx: &Fixture, assignment: &Assignment, amount: &str) -> InvoiceRequest {
    fx.ledger
        .raise_invoice_request(
            assignment.id,
            InvoiceRequestInput {
                milestone_id: Some(first_milestone(fx, assignment)),
                invoice_type: InvoiceType::Advance,
                invoice_amount: dec(amount),
                description: Some("Inception report".to_string()),
            },
            &fx.actor("tl"),
        )
        .unwrap()
}

fn payment(amount: &str) -> PaymentInput {
    PaymentInput {
        amount_received: dec(amount),
        receipt_date: day(2025, 7, 15),
        payment_mode: PaymentMode::Neft,
        reference_number: Some("UTR0001".to_string()),
        remarks: None,
    }
}

fn amount_for(entries: &[pmsflow::ledger::LedgerEntry], officer: &str) -> bigdecimal::BigDecimal {
    entries
        .iter()
        .find(|e| e.officer_id == officer)
        .map(|e| e.amount.clone())
        .unwrap()
}

#[test]
fn test_invoice_request_numbering_and_stage() {
    let fx = Fixture::new();
    let not_active = fx.in_detail_entry("20000");
    let early = fx.ledger.raise_invoice_request(
        not_active.id,
        InvoiceRequestInput {
            milestone_id: None,
            invoice_type: InvoiceType::Advance,
            invoice_amount: dec("1000"),
            description: None,
        },
        &fx.actor("tl"),
    );
    assert!(matches!(early, Err(WorkflowError::InvalidState(_))));

    let active = fx.active_assignment("20000");
    let invoice = raise(&fx, &active, "10000");
    let pattern = regex::Regex::new(r"^INV-O1-\d{6}-001$").unwrap();
    assert!(pattern.is_match(&invoice.request_number), "{}", invoice.request_number);
    assert_eq!(invoice.status, InvoiceStatus::Pending);

    let duplicate = fx.ledger.raise_invoice_request(
        active.id,
        InvoiceRequestInput {
            milestone_id: invoice.milestone_id,
            invoice_type: InvoiceType::Advance,
            invoice_amount: dec("10000"),
            description: None,
        },
        &fx.actor("tl"),
    );
    assert!(matches!(duplicate, Err(WorkflowError::InvalidState(_))));
}

#[test]
fn test_invoice_approval_recognizes_eighty_percent() {
    let fx = Fixture::new();
    let active = fx.active_assignment("20000");
    let invoice = raise(&fx, &active, "10000");

    let approval = fx
        .ledger
        .approve_invoice(invoice.id, &fx.actor("fin"), None)
        .unwrap();
    assert_eq!(approval.invoice.status, InvoiceStatus::Approved);
    assert_eq!(approval.invoice.revenue_recognized_80, dec("8000"));
    assert_eq!(approval.entries.len(), 2);
    assert_eq!(amount_for(&approval.entries, "a"), dec("4800"));
    assert_eq!(amount_for(&approval.entries, "b"), dec("3200"));
    assert!(approval
        .entries
        .iter()
        .all(|e| e.revenue_type == RevenueType::Invoice80 && e.source_id == invoice.id));

    let detail = fx.workflow.assignment_detail(active.id, &fx.actor("tl")).unwrap();
    assert_eq!(detail.assignment.invoice_raised_amount, dec("10000"));
    assert!(detail.milestones[0].invoice_raised);
    assert_eq!(detail.milestones[0].status, MilestoneStatus::InProgress);
    // 50% milestone invoiced, scored at 80
    assert_eq!(detail.assignment.physical_progress_percent, 40.0);
}

#[test]
fn test_invoice_approval_is_not_repeatable() {
    let fx = Fixture::new();
    let active = fx.active_assignment("20000");
    let invoice = raise(&fx, &active, "10000");
    let finance = fx.actor("fin");

    fx.ledger.approve_invoice(invoice.id, &finance, None).unwrap();
    let again = fx.ledger.approve_invoice(invoice.id, &finance, None);
    assert!(matches!(again, Err(WorkflowError::InvalidState(_))));
    assert_eq!(fx.store.ledger_entries().len(), 2);
}

#[test]
fn test_invoice_approval_requires_authority() {
    let fx = Fixture::new();
    let active = fx.active_assignment("20000");
    let invoice = raise(&fx, &active, "10000");

    for actor in ["tl", "head"] {
        let result = fx.ledger.approve_invoice(invoice.id, &fx.actor(actor), None);
        assert!(
            matches!(result, Err(WorkflowError::PermissionDenied(_))),
            "{} should not approve invoices",
            actor
        );
    }
    assert!(fx.store.ledger_entries().is_empty());
}

#[test]
fn test_payment_recognizes_twenty_percent() {
    let fx = Fixture::new();
    let active = fx.active_assignment("20000");
    let invoice = raise(&fx, &active, "10000");
    let finance = fx.actor("fin");

    let unapproved = fx.ledger.record_payment(invoice.id, payment("10000"), &finance);
    assert!(matches!(unapproved, Err(WorkflowError::InvalidState(_))));

    fx.ledger.approve_invoice(invoice.id, &finance, None).unwrap();
    let recording = fx
        .ledger
        .record_payment(invoice.id, payment("10000"), &finance)
        .unwrap();
    assert_eq!(recording.receipt.revenue_recognized_20, dec("2000"));
    assert_eq!(recording.receipt.receipt_number, "RCP-O1-202507-001");
    assert_eq!(recording.receipt.fy_period, "2025-26");
    assert_eq!(amount_for(&recording.entries, "a"), dec("1200"));
    assert_eq!(amount_for(&recording.entries, "b"), dec("800"));
    assert!(recording
        .entries
        .iter()
        .all(|e| e.revenue_type == RevenueType::Payment20
            && e.source_id == recording.receipt.id
            && e.fy_period == "2025-26"));

    let second = fx.ledger.record_payment(invoice.id, payment("10000"), &finance);
    assert!(matches!(second, Err(WorkflowError::InvalidState(_))));
    assert_eq!(fx.store.ledger_entries().len(), 4);

    let detail = fx.workflow.assignment_detail(active.id, &fx.actor("tl")).unwrap();
    let milestone = &detail.milestones[0];
    assert!(milestone.payment_received);
    assert_eq!(milestone.status, MilestoneStatus::Completed);
    assert_eq!(milestone.payment_received_date, Some(day(2025, 7, 15)));
    assert_eq!(detail.assignment.payment_received_amount, dec("10000"));
    assert_eq!(detail.assignment.physical_progress_percent, 50.0);
}

#[test]
fn test_partial_payment_recognizes_received_amount() {
    let fx = Fixture::new();
    let active = fx.active_assignment("20000");
    let invoice = raise(&fx, &active, "10000");
    let finance = fx.actor("fin");
    fx.ledger.approve_invoice(invoice.id, &finance, None).unwrap();

    let recording = fx
        .ledger
        .record_payment(invoice.id, payment("5000"), &finance)
        .unwrap();
    assert_eq!(recording.receipt.revenue_recognized_20, dec("1000"));
    assert_eq!(amount_for(&recording.entries, "a"), dec("600"));
    assert_eq!(amount_for(&recording.entries, "b"), dec("400"));
}

#[test]
fn test_inconsistent_shares_roll_back_approval() {
    let fx = Fixture::new();
    let active = fx.active_assignment("20000");
    let invoice = raise(&fx, &active, "10000");

    // editing shares on an active assignment is allowed; it only sends the
    // section back for approval
    fx.workflow
        .save_revenue_shares(
            active.id,
            vec![
                pmsflow::workflow::types::RevenueShareInput {
                    officer_id: "a".to_string(),
                    share_percent: dec("60"),
                },
                pmsflow::workflow::types::RevenueShareInput {
                    officer_id: "b".to_string(),
                    share_percent: dec("30"),
                },
            ],
            &fx.actor("tl"),
        )
        .unwrap();

    let result = fx.ledger.approve_invoice(invoice.id, &fx.actor("fin"), None);
    assert!(matches!(result, Err(WorkflowError::InconsistentShare(_))));
    assert!(fx.store.ledger_entries().is_empty());

    let invoices = fx
        .ledger
        .invoice_requests(active.id, &fx.actor("tl"))
        .unwrap();
    assert_eq!(invoices[0].status, InvoiceStatus::Pending);
    let detail = fx.workflow.assignment_detail(active.id, &fx.actor("tl")).unwrap();
    assert!(!detail.milestones[0].invoice_raised);
    assert_eq!(detail.assignment.invoice_raised_amount, dec("0"));
}

#[test]
fn test_rejected_invoice_cannot_be_paid() {
    let fx = Fixture::new();
    let active = fx.active_assignment("20000");
    let invoice = raise(&fx, &active, "10000");
    let finance = fx.actor("fin");

    let blank = fx.ledger.reject_invoice(invoice.id, &finance, String::new());
    assert!(matches!(blank, Err(WorkflowError::Validation(_))));

    let rejected = fx
        .ledger
        .reject_invoice(invoice.id, &finance, "amount exceeds milestone".to_string())
        .unwrap();
    assert_eq!(rejected.status, InvoiceStatus::Rejected);

    let paid = fx.ledger.record_payment(invoice.id, payment("10000"), &finance);
    assert!(matches!(paid, Err(WorkflowError::InvalidState(_))));
    assert!(fx.store.ledger_entries().is_empty());
}

#[test]
fn test_revenue_summaries() {
    let fx = Fixture::new();
    let active = fx.active_assignment("20000");
    let invoice = raise(&fx, &active, "10000");
    let finance = fx.actor("fin");
    let approval = fx.ledger.approve_invoice(invoice.id, &finance, None).unwrap();
    fx.ledger
        .record_payment(invoice.id, payment("10000"), &finance)
        .unwrap();

    let by_assignment = fx
        .ledger
        .assignment_revenue_summary(active.id, &fx.actor("head"))
        .unwrap();
    assert_eq!(by_assignment.total_invoiced, dec("10000"));
    assert_eq!(by_assignment.total_received, dec("10000"));
    assert_eq!(by_assignment.revenue_80, dec("8000"));
    assert_eq!(by_assignment.revenue_20, dec("2000"));
    assert_eq!(by_assignment.total_recognized, dec("10000"));

    // invoice rows fall in the approval's year, payment rows in 2025-26
    let invoice_fy = approval.entries[0].fy_period.clone();
    let a = fx
        .ledger
        .officer_revenue_summary("a", &invoice_fy, &fx.actor("a"))
        .unwrap();
    assert_eq!(a.invoice_80, dec("4800"));
    assert_eq!(a.assignment_count, 1);
    if invoice_fy == "2025-26" {
        assert_eq!(a.payment_20, dec("1200"));
        assert_eq!(a.total, dec("6000"));
    }

    let b_payments = fx
        .ledger
        .officer_revenue_summary("b", "2025-26", &fx.actor("head"))
        .unwrap();
    assert_eq!(b_payments.payment_20, dec("800"));
    assert_eq!(invoice_fy, financial_year(chrono::Utc::now().date_naive()));
}

#[test]
fn test_ledger_entries_by_source() {
    let fx = Fixture::new();
    let active = fx.active_assignment("20000");
    let invoice = raise(&fx, &active, "10000");
    fx.ledger
        .approve_invoice(invoice.id, &fx.actor("fin"), None)
        .unwrap();

    let rows = fx
        .ledger
        .ledger_entries_for_source(invoice.id, RevenueType::Invoice80)
        .unwrap();
    assert_eq!(rows.len(), 2);
    let payments = fx
        .ledger
        .ledger_entries_for_source(invoice.id, RevenueType::Payment20)
        .unwrap();
    assert!(payments.is_empty());
}

#[test]
fn test_concurrent_invoice_approvals_post_once() {
    let fx = Fixture::new();
    let active = fx.active_assignment("20000");
    let invoice = raise(&fx, &active, "10000");
    let fin = fx.actor("fin");

    let (ledger, fin_ref, invoice_id) = (&fx.ledger, &fin, invoice.id);
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| scope.spawn(move || ledger.approve_invoice(invoice_id, fin_ref, None)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(WorkflowError::InvalidState(_)))));

    let entries = fx
        .ledger
        .ledger_entries_for_source(invoice.id, RevenueType::Invoice80)
        .unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(amount_for(&entries, "a"), dec("4800"));
    assert_eq!(amount_for(&entries, "b"), dec("3200"));
}
