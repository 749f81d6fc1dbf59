pub mod calculator;
pub mod derive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::enrollment::SubjectCharge;
use crate::types::{BillingPeriod, InstallmentId, InstallmentStatus, StudentId};

pub use calculator::InstallmentCalculator;
pub use derive::{derive_installment, derive_status, InstallmentInputs, InstallmentState};

/// per-student, per-month billing record
///
/// `total_amount` is the gross subject total plus any carry-in; the discount is kept
/// separately so it stays auditable against the gross. Net due is `net_amount()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    pub student_id: StudentId,
    pub month: u32,
    pub year: i32,
    pub total_amount: Money,
    pub paid_amount: Money,
    pub discount_amount: Money,
    pub outstanding_amount: Money,
    pub status: InstallmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Installment {
    pub fn period(&self) -> BillingPeriod {
        BillingPeriod {
            year: self.year,
            month: self.month,
        }
    }

    /// gross total minus discount, may be negative when discounts exceed charges
    pub fn net_amount(&self) -> Money {
        self.total_amount - self.discount_amount
    }

    /// amount paid beyond the net due, absorbed rather than refunded
    pub fn overpaid_amount(&self) -> Money {
        (self.paid_amount - self.net_amount()).clamp_non_negative()
    }

    pub fn has_outstanding(&self) -> bool {
        self.outstanding_amount.is_positive()
    }
}

/// derived fields written by the calculator's upsert; paid amount is never part of it
#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentDraft {
    pub student_id: StudentId,
    pub period: BillingPeriod,
    pub total_amount: Money,
    pub discount_amount: Money,
    pub outstanding_amount: Money,
    pub status: InstallmentStatus,
}

impl InstallmentDraft {
    /// whether writing this draft would change the stored row
    pub fn matches(&self, installment: &Installment) -> bool {
        installment.student_id == self.student_id
            && installment.period() == self.period
            && installment.total_amount == self.total_amount
            && installment.discount_amount == self.discount_amount
            && installment.outstanding_amount == self.outstanding_amount
            && installment.status == self.status
    }
}

/// everything the calculator knows about one computed period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentResult {
    pub installment: Installment,
    pub breakdown: Vec<SubjectCharge>,
    /// positive subject prices only, before carry-in
    pub subject_total: Money,
    pub outstanding_from_previous: Money,
    pub final_amount: Money,
    pub discount_count: usize,
    pub discount_total: Money,
}
