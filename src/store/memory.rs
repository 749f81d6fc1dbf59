use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::decimal::Money;
use crate::discounts::Discount;
use crate::enrollment::{EnrollmentProvider, SubjectEnrollment};
use crate::errors::{LedgerError, Result};
use crate::installment::{Installment, InstallmentDraft};
use crate::payments::{settle_payment, PaymentRecord};
use crate::types::{BillingPeriod, DiscountId, InstallmentId, StudentId, SubjectId, UserId};

use super::{AppliedPayment, LedgerStore, StudentDirectory};

#[derive(Debug, Default)]
struct Tables {
    students: HashMap<StudentId, UserId>,
    profiles: HashMap<UserId, StudentId>,
    enrollments: Vec<SubjectEnrollment>,
    installments: HashMap<InstallmentId, Installment>,
    periods: HashMap<(StudentId, BillingPeriod), InstallmentId>,
    discounts: HashMap<DiscountId, Discount>,
    payments: Vec<PaymentRecord>,
}

/// in-process store backed by hash maps
///
/// All tables sit behind one lock, which gives every trait call the row
/// atomicity a database would. Share it between ledgers with `Arc`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// create a student profile for a user and return its id
    pub fn register_student(&self, user_id: UserId) -> Result<StudentId> {
        let student_id = Uuid::new_v4();
        self.register_student_with_id(student_id, user_id)?;
        Ok(student_id)
    }

    pub fn register_student_with_id(&self, student_id: StudentId, user_id: UserId) -> Result<()> {
        let mut tables = self.write()?;
        tables.students.insert(student_id, user_id);
        tables.profiles.insert(user_id, student_id);
        Ok(())
    }

    /// record a subject enrollment as the catalog would
    pub fn enroll(
        &self,
        student_id: StudentId,
        subject_id: SubjectId,
        subject_name: &str,
        declared_monthly_price: Money,
        enrolled_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut tables = self.write()?;
        if !tables.students.contains_key(&student_id) {
            return Err(LedgerError::StudentNotFound { student_id });
        }
        tables.enrollments.push(SubjectEnrollment {
            student_id,
            subject_id,
            subject_name: subject_name.to_string(),
            declared_monthly_price,
            enrolled_at,
        });
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| LedgerError::storage("memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| LedgerError::storage("memory store lock poisoned"))
    }
}

impl StudentDirectory for MemoryStore {
    fn student_exists(&self, student_id: StudentId) -> Result<bool> {
        Ok(self.read()?.students.contains_key(&student_id))
    }

    fn student_for_user(&self, user_id: UserId) -> Result<Option<StudentId>> {
        Ok(self.read()?.profiles.get(&user_id).copied())
    }
}

impl EnrollmentProvider for MemoryStore {
    fn enrollments_as_of(
        &self,
        student_id: StudentId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SubjectEnrollment>> {
        Ok(self
            .read()?
            .enrollments
            .iter()
            .filter(|e| e.student_id == student_id && e.enrolled_at <= cutoff)
            .cloned()
            .collect())
    }
}

impl LedgerStore for MemoryStore {
    fn installment(&self, installment_id: InstallmentId) -> Result<Option<Installment>> {
        Ok(self.read()?.installments.get(&installment_id).cloned())
    }

    fn installment_for_period(
        &self,
        student_id: StudentId,
        period: BillingPeriod,
    ) -> Result<Option<Installment>> {
        let tables = self.read()?;
        Ok(tables
            .periods
            .get(&(student_id, period))
            .and_then(|id| tables.installments.get(id))
            .cloned())
    }

    fn installments_for_student(&self, student_id: StudentId) -> Result<Vec<Installment>> {
        Ok(self
            .read()?
            .installments
            .values()
            .filter(|i| i.student_id == student_id)
            .cloned()
            .collect())
    }

    fn upsert_installment(&self, draft: &InstallmentDraft, now: DateTime<Utc>) -> Result<Installment> {
        let mut tables = self.write()?;
        let key = (draft.student_id, draft.period);

        if let Some(id) = tables.periods.get(&key).copied() {
            let row = tables
                .installments
                .get_mut(&id)
                .ok_or_else(|| LedgerError::storage(format!("dangling period index for {}", id)))?;
            // unchanged rows keep their timestamp so recomputation is idempotent
            if !draft.matches(row) {
                row.total_amount = draft.total_amount;
                row.discount_amount = draft.discount_amount;
                row.outstanding_amount = draft.outstanding_amount;
                row.status = draft.status;
                row.updated_at = now;
            }
            return Ok(row.clone());
        }

        let installment = Installment {
            id: Uuid::new_v4(),
            student_id: draft.student_id,
            month: draft.period.month,
            year: draft.period.year,
            total_amount: draft.total_amount,
            paid_amount: Money::ZERO,
            discount_amount: draft.discount_amount,
            outstanding_amount: draft.outstanding_amount,
            status: draft.status,
            created_at: now,
            updated_at: now,
        };
        tables.periods.insert(key, installment.id);
        tables.installments.insert(installment.id, installment.clone());
        Ok(installment)
    }

    fn apply_payment(&self, payment: &PaymentRecord, now: DateTime<Utc>) -> Result<AppliedPayment> {
        let mut tables = self.write()?;
        if tables.payments.iter().any(|p| p.id == payment.id) {
            return Err(LedgerError::storage(format!("duplicate payment id {}", payment.id)));
        }
        let installment_id = payment.installment_id;
        let row = tables
            .installments
            .get_mut(&installment_id)
            .ok_or(LedgerError::InstallmentNotFound { installment_id })?;
        if row.student_id != payment.student_id {
            return Err(LedgerError::InstallmentStudentMismatch {
                installment_id,
                student_id: payment.student_id,
                owner: row.student_id,
            });
        }

        let settlement = settle_payment(row, payment.amount);
        let previous_status = row.status;
        row.paid_amount = settlement.paid_amount;
        row.outstanding_amount = settlement.outstanding_amount;
        row.status = settlement.status;
        row.updated_at = now;
        let installment = row.clone();

        tables.payments.push(payment.clone());
        Ok(AppliedPayment {
            installment,
            previous_status,
            excess: settlement.excess,
        })
    }

    fn insert_discount(&self, discount: &Discount) -> Result<()> {
        let mut tables = self.write()?;
        if tables.discounts.contains_key(&discount.id) {
            return Err(LedgerError::storage(format!("duplicate discount id {}", discount.id)));
        }
        tables.discounts.insert(discount.id, discount.clone());
        Ok(())
    }

    fn discount(&self, discount_id: DiscountId) -> Result<Option<Discount>> {
        Ok(self.read()?.discounts.get(&discount_id).cloned())
    }

    fn update_discount(&self, discount: &Discount) -> Result<()> {
        let mut tables = self.write()?;
        match tables.discounts.get_mut(&discount.id) {
            Some(row) => {
                *row = discount.clone();
                Ok(())
            }
            None => Err(LedgerError::DiscountNotFound {
                discount_id: discount.id,
            }),
        }
    }

    fn discounts_for_student(&self, student_id: StudentId) -> Result<Vec<Discount>> {
        Ok(self
            .read()?
            .discounts
            .values()
            .filter(|d| d.student_id == student_id)
            .cloned()
            .collect())
    }

    fn payments_for_installment(&self, installment_id: InstallmentId) -> Result<Vec<PaymentRecord>> {
        Ok(self
            .read()?
            .payments
            .iter()
            .filter(|p| p.installment_id == installment_id)
            .cloned()
            .collect())
    }
}
