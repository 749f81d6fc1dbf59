pub mod memory;

use chrono::{DateTime, Utc};

use crate::decimal::Money;
use crate::discounts::Discount;
use crate::enrollment::EnrollmentProvider;
use crate::errors::{LedgerError, Result};
use crate::installment::{Installment, InstallmentDraft};
use crate::payments::PaymentRecord;
use crate::types::{BillingPeriod, DiscountId, InstallmentId, InstallmentStatus, StudentId, UserId};

pub use memory::MemoryStore;

/// identity lookups owned by the user subsystem
pub trait StudentDirectory {
    fn student_exists(&self, student_id: StudentId) -> Result<bool>;

    fn student_for_user(&self, user_id: UserId) -> Result<Option<StudentId>>;
}

/// persistence boundary of the ledger
///
/// Each call is atomic on its own. `upsert_installment` is keyed on
/// `(student_id, month, year)` so concurrent calculators converge on one row.
pub trait LedgerStore: Send + Sync {
    fn installment(&self, installment_id: InstallmentId) -> Result<Option<Installment>>;

    fn installment_for_period(
        &self,
        student_id: StudentId,
        period: BillingPeriod,
    ) -> Result<Option<Installment>>;

    /// every installment of the student, in any order
    fn installments_for_student(&self, student_id: StudentId) -> Result<Vec<Installment>>;

    /// create the period's row or overwrite its derived fields; `paid_amount` is left as stored
    fn upsert_installment(&self, draft: &InstallmentDraft, now: DateTime<Utc>) -> Result<Installment>;

    /// store the payment and settle it against its installment as one atomic step
    ///
    /// Fails with `InstallmentNotFound` or `InstallmentStudentMismatch` without
    /// writing anything.
    fn apply_payment(&self, payment: &PaymentRecord, now: DateTime<Utc>) -> Result<AppliedPayment>;

    fn insert_discount(&self, discount: &Discount) -> Result<()>;

    fn discount(&self, discount_id: DiscountId) -> Result<Option<Discount>>;

    fn update_discount(&self, discount: &Discount) -> Result<()>;

    fn discounts_for_student(&self, student_id: StudentId) -> Result<Vec<Discount>>;

    /// payments of one installment, in insertion order
    fn payments_for_installment(&self, installment_id: InstallmentId) -> Result<Vec<PaymentRecord>>;

    fn active_discounts(&self, student_id: StudentId) -> Result<Vec<Discount>> {
        let mut discounts = self.discounts_for_student(student_id)?;
        discounts.retain(|d| d.is_active);
        Ok(discounts)
    }

    /// latest persisted period strictly before `period`
    fn latest_installment_before(
        &self,
        student_id: StudentId,
        period: BillingPeriod,
    ) -> Result<Option<Installment>> {
        Ok(self
            .installments_for_student(student_id)?
            .into_iter()
            .filter(|i| i.period() < period)
            .max_by_key(|i| i.period()))
    }
}

/// installment row after a payment was applied to it
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedPayment {
    pub installment: Installment,
    pub previous_status: InstallmentStatus,
    /// paid total beyond the net due
    pub excess: Money,
}

/// everything the ledger needs from its surroundings
pub trait LedgerBackend: LedgerStore + StudentDirectory + EnrollmentProvider {}

impl<T: LedgerStore + StudentDirectory + EnrollmentProvider> LedgerBackend for T {}

pub(crate) fn ensure_student<S: StudentDirectory + ?Sized>(store: &S, student_id: StudentId) -> Result<()> {
    if store.student_exists(student_id)? {
        Ok(())
    } else {
        Err(LedgerError::StudentNotFound { student_id })
    }
}
