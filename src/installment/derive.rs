use crate::decimal::Money;
use crate::discounts::Discount;
use crate::enrollment::EnrollmentSnapshot;
use crate::types::{BillingPeriod, InstallmentStatus};

/// persisted inputs an installment is derived from
#[derive(Debug, Clone)]
pub struct InstallmentInputs<'a> {
    pub period: BillingPeriod,
    /// calendar month of "now", decides OVERDUE
    pub current_period: BillingPeriod,
    pub enrollments: &'a EnrollmentSnapshot,
    pub discounts: &'a [Discount],
    /// outstanding of the immediate predecessor, if that row exists
    pub previous_outstanding: Option<Money>,
    pub paid_amount: Money,
}

/// derived money fields and status of one installment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallmentState {
    pub subject_total: Money,
    pub outstanding_from_previous: Money,
    /// subject total plus carry-in, the stored gross
    pub total_amount: Money,
    pub discount_amount: Money,
    pub discount_count: usize,
    /// total minus discount, unclamped
    pub final_amount: Money,
    pub paid_amount: Money,
    pub outstanding_amount: Money,
    pub status: InstallmentStatus,
    /// paid beyond the final amount, clamped out of outstanding
    pub overpayment: Money,
}

/// compute an installment from its inputs, no I/O
pub fn derive_installment(inputs: &InstallmentInputs<'_>) -> InstallmentState {
    let subject_total = inputs.enrollments.subject_total;

    let outstanding_from_previous = inputs
        .previous_outstanding
        .filter(|amount| amount.is_positive())
        .unwrap_or(Money::ZERO);
    let total_amount = subject_total + outstanding_from_previous;

    let active: Vec<&Discount> = inputs.discounts.iter().filter(|d| d.is_active).collect();
    let discount_amount: Money = active.iter().map(|d| d.amount).sum();

    let final_amount = total_amount - discount_amount;
    let unclamped = final_amount - inputs.paid_amount;
    let outstanding_amount = unclamped.clamp_non_negative();

    let past_due = inputs.period < inputs.current_period;
    let status = derive_status(final_amount, inputs.paid_amount, past_due);

    InstallmentState {
        subject_total,
        outstanding_from_previous,
        total_amount,
        discount_amount,
        discount_count: active.len(),
        final_amount,
        paid_amount: inputs.paid_amount,
        outstanding_amount,
        status,
        overpayment: (Money::ZERO - unclamped).clamp_non_negative(),
    }
}

/// PAID when covered, PARTIAL when something was paid, otherwise PENDING or OVERDUE
pub fn derive_status(final_amount: Money, paid_amount: Money, past_due: bool) -> InstallmentStatus {
    if paid_amount >= final_amount {
        InstallmentStatus::Paid
    } else if paid_amount.is_positive() {
        InstallmentStatus::Partial
    } else if past_due && paid_amount.is_zero() {
        InstallmentStatus::Overdue
    } else {
        InstallmentStatus::Pending
    }
}
