use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{EventStore, LedgerEvent};
use crate::installment::{InstallmentCalculator, InstallmentResult};
use crate::store::{ensure_student, LedgerBackend};
use crate::types::{BillingPeriod, DiscountId, StudentId, UserId};

/// standing reduction of a student's monthly due, active until cancelled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    pub id: DiscountId,
    pub student_id: StudentId,
    pub amount: Money,
    pub reason: Option<String>,
    pub is_active: bool,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Discount {
    pub fn new(
        student_id: StudentId,
        amount: Money,
        reason: Option<String>,
        created_by: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            amount,
            reason,
            is_active: true,
            created_by,
            created_at,
            cancelled_at: None,
        }
    }

    pub fn cancel(&mut self, timestamp: DateTime<Utc>) {
        self.is_active = false;
        self.cancelled_at = Some(timestamp);
    }
}

/// discount bookkeeping; every change re-runs the current month
pub struct DiscountLedger<'a, S> {
    store: &'a S,
    config: &'a LedgerConfig,
}

impl<'a, S: LedgerBackend> DiscountLedger<'a, S> {
    pub fn new(store: &'a S, config: &'a LedgerConfig) -> Self {
        Self { store, config }
    }

    /// insert an active discount and refresh the current month
    pub fn add(
        &self,
        student_id: StudentId,
        amount: Money,
        reason: Option<String>,
        created_by: UserId,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Discount> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount { amount });
        }
        ensure_student(self.store, student_id)?;
        // the refresh below must not fail after the insert
        self.check_current_month(student_id, time_provider)?;

        let now = time_provider.now();
        let discount = Discount::new(student_id, amount, reason, created_by, now);
        self.store.insert_discount(&discount)?;

        tracing::info!(
            student_id = %student_id,
            discount_id = %discount.id,
            amount = %amount,
            "discount added"
        );
        events.emit(LedgerEvent::DiscountAdded {
            student_id,
            discount_id: discount.id,
            amount,
            created_by,
            timestamp: now,
        });

        self.refresh_current_month(student_id, time_provider, events)?;
        Ok(discount)
    }

    /// deactivate a discount and refresh the current month of its student
    ///
    /// Cancelling an already cancelled discount returns it unchanged.
    pub fn cancel(
        &self,
        discount_id: DiscountId,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Discount> {
        let mut discount = self
            .store
            .discount(discount_id)?
            .ok_or(LedgerError::DiscountNotFound { discount_id })?;

        if !discount.is_active {
            tracing::debug!(discount_id = %discount_id, "discount already cancelled");
            return Ok(discount);
        }

        self.check_current_month(discount.student_id, time_provider)?;

        let now = time_provider.now();
        discount.cancel(now);
        self.store.update_discount(&discount)?;

        tracing::info!(
            student_id = %discount.student_id,
            discount_id = %discount_id,
            amount = %discount.amount,
            "discount cancelled"
        );
        events.emit(LedgerEvent::DiscountCancelled {
            student_id: discount.student_id,
            discount_id,
            amount: discount.amount,
            timestamp: now,
        });

        self.refresh_current_month(discount.student_id, time_provider, events)?;
        Ok(discount)
    }

    /// discounts of a student, oldest first
    pub fn list(&self, student_id: StudentId, include_cancelled: bool) -> Result<Vec<Discount>> {
        ensure_student(self.store, student_id)?;
        let mut discounts = self.store.discounts_for_student(student_id)?;
        if !include_cancelled {
            discounts.retain(|d| d.is_active);
        }
        discounts.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(discounts)
    }

    /// sum and count of the currently active discounts
    pub fn active_total(&self, student_id: StudentId) -> Result<(Money, usize)> {
        let active = self.list(student_id, false)?;
        Ok((active.iter().map(|d| d.amount).sum(), active.len()))
    }

    fn check_current_month(&self, student_id: StudentId, time_provider: &SafeTimeProvider) -> Result<()> {
        let current = BillingPeriod::containing(time_provider.now());
        InstallmentCalculator::new(self.store, self.config).check_carry_forward(student_id, current)
    }

    fn refresh_current_month(
        &self,
        student_id: StudentId,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<InstallmentResult> {
        let current = BillingPeriod::containing(time_provider.now());
        InstallmentCalculator::new(self.store, self.config).calculate(
            student_id,
            current,
            time_provider,
            events,
        )
    }
}
