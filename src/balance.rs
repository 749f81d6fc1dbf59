use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::Result;
use crate::installment::Installment;
use crate::payments::PaymentRecord;
use crate::store::{ensure_student, LedgerBackend};
use crate::types::StudentId;

/// unresolved balance of a student across persisted installments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutstandingBalance {
    pub student_id: StudentId,
    pub total_outstanding: Money,
    /// oldest period first
    pub installments: Vec<Installment>,
    pub count: usize,
}

/// installment together with the payments recorded against it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentWithPayments {
    pub installment: Installment,
    pub payments: Vec<PaymentRecord>,
}

/// read-only queries over persisted installments; never recomputes
pub struct BalanceAggregator<'a, S> {
    store: &'a S,
}

impl<'a, S: LedgerBackend> BalanceAggregator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn outstanding_balance(&self, student_id: StudentId) -> Result<OutstandingBalance> {
        ensure_student(self.store, student_id)?;

        let mut installments: Vec<Installment> = self
            .store
            .installments_for_student(student_id)?
            .into_iter()
            .filter(Installment::has_outstanding)
            .collect();
        installments.sort_by_key(Installment::period);

        let total_outstanding = installments.iter().map(|i| i.outstanding_amount).sum();
        tracing::debug!(
            student_id = %student_id,
            total = %total_outstanding,
            count = installments.len(),
            "outstanding balance"
        );

        Ok(OutstandingBalance {
            student_id,
            total_outstanding,
            count: installments.len(),
            installments,
        })
    }

    /// installments newest period first, optionally limited to one year
    pub fn student_installments(
        &self,
        student_id: StudentId,
        year: Option<i32>,
    ) -> Result<Vec<InstallmentWithPayments>> {
        ensure_student(self.store, student_id)?;

        let mut installments = self.store.installments_for_student(student_id)?;
        if let Some(year) = year {
            installments.retain(|i| i.year == year);
        }
        installments.sort_by(|a, b| b.period().cmp(&a.period()));

        installments
            .into_iter()
            .map(|installment| {
                let mut payments = self.store.payments_for_installment(installment.id)?;
                payments.sort_by(|a, b| {
                    a.payment_date
                        .cmp(&b.payment_date)
                        .then_with(|| a.created_at.cmp(&b.created_at))
                });
                Ok(InstallmentWithPayments { installment, payments })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use crate::errors::LedgerError;
    use crate::installment::InstallmentDraft;
    use crate::store::{LedgerStore, MemoryStore};
    use crate::types::{BillingPeriod, InstallmentStatus};

    fn seed(store: &MemoryStore, student: StudentId, month: u32, year: i32, outstanding: &str) -> Installment {
        let amount = Money::from_str_exact(outstanding).unwrap();
        let draft = InstallmentDraft {
            student_id: student,
            period: BillingPeriod::new(month, year).unwrap(),
            total_amount: amount,
            discount_amount: Money::ZERO,
            outstanding_amount: amount,
            status: if amount.is_zero() { InstallmentStatus::Paid } else { InstallmentStatus::Pending },
        };
        store
            .upsert_installment(&draft, Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
            .unwrap()
    }

    #[test]
    fn test_sums_only_positive_outstanding_oldest_first() {
        let store = MemoryStore::new();
        let student = store.register_student(Uuid::new_v4()).unwrap();
        seed(&store, student, 3, 2024, "25.10");
        seed(&store, student, 11, 2023, "100.00");
        seed(&store, student, 1, 2024, "0");
        seed(&store, student, 2, 2024, "0.05");

        let balance = BalanceAggregator::new(&store).outstanding_balance(student).unwrap();

        assert_eq!(balance.count, 3);
        assert_eq!(balance.total_outstanding, Money::from_str_exact("125.15").unwrap());
        let periods: Vec<_> = balance.installments.iter().map(|i| i.period().to_string()).collect();
        assert_eq!(periods, vec!["2023-11", "2024-02", "2024-03"]);
        let summed: Money = balance.installments.iter().map(|i| i.outstanding_amount).sum();
        assert_eq!(summed, balance.total_outstanding);
    }

    #[test]
    fn test_empty_balance() {
        let store = MemoryStore::new();
        let student = store.register_student(Uuid::new_v4()).unwrap();

        let balance = BalanceAggregator::new(&store).outstanding_balance(student).unwrap();
        assert_eq!(balance.total_outstanding, Money::ZERO);
        assert!(balance.installments.is_empty());
    }

    #[test]
    fn test_unknown_student() {
        let store = MemoryStore::new();
        let err = BalanceAggregator::new(&store)
            .outstanding_balance(Uuid::new_v4())
            .unwrap_err();
        assert!(matches!(err, LedgerError::StudentNotFound { .. }));
    }

    #[test]
    fn test_installments_newest_first_with_year_filter() {
        let store = MemoryStore::new();
        let student = store.register_student(Uuid::new_v4()).unwrap();
        seed(&store, student, 12, 2023, "10");
        seed(&store, student, 1, 2024, "10");
        seed(&store, student, 4, 2024, "10");

        let aggregator = BalanceAggregator::new(&store);
        let all = aggregator.student_installments(student, None).unwrap();
        let periods: Vec<_> = all.iter().map(|i| i.installment.period().to_string()).collect();
        assert_eq!(periods, vec!["2024-04", "2024-01", "2023-12"]);

        let only_2024 = aggregator.student_installments(student, Some(2024)).unwrap();
        assert_eq!(only_2024.len(), 2);
        assert!(only_2024.iter().all(|i| i.installment.year == 2024 && i.payments.is_empty()));
    }
}
