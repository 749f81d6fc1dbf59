use hourglass_rs::SafeTimeProvider;
use std::sync::Arc;

use crate::balance::{BalanceAggregator, InstallmentWithPayments, OutstandingBalance};
use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::discounts::{Discount, DiscountLedger};
use crate::errors::{LedgerError, Result};
use crate::events::{EventStore, LedgerEvent};
use crate::installment::{InstallmentCalculator, InstallmentResult};
use crate::payments::{PaymentOutcome, PaymentRecord, PaymentRecorder, PaymentRequest};
use crate::store::LedgerBackend;
use crate::types::{BillingPeriod, DiscountId, InstallmentId, StudentId, UserId};

/// entry point for the tuition installment operations
///
/// Callers are expected to be authenticated and authorized already. The store
/// is shared, so several ledgers may serve requests against the same data.
pub struct TuitionLedger<S> {
    store: Arc<S>,
    config: LedgerConfig,
    events: EventStore,
}

impl<S: LedgerBackend> TuitionLedger<S> {
    pub fn new(store: Arc<S>, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        let events = if config.record_events {
            EventStore::new()
        } else {
            EventStore::disabled()
        };
        Ok(Self { store, config, events })
    }

    pub fn with_defaults(store: Arc<S>) -> Self {
        Self {
            store,
            config: LedgerConfig::default(),
            events: EventStore::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// compute and persist the installment of one student and month
    pub fn calculate_monthly_installment(
        &mut self,
        student_id: StudentId,
        month: u32,
        year: i32,
        time_provider: &SafeTimeProvider,
    ) -> Result<InstallmentResult> {
        let period = BillingPeriod::new(month, year)?;
        InstallmentCalculator::new(self.store.as_ref(), &self.config).calculate(
            student_id,
            period,
            time_provider,
            &mut self.events,
        )
    }

    /// compute the month containing `time_provider.now()`
    pub fn calculate_current_installment(
        &mut self,
        student_id: StudentId,
        time_provider: &SafeTimeProvider,
    ) -> Result<InstallmentResult> {
        let period = BillingPeriod::containing(time_provider.now());
        self.calculate_monthly_installment(student_id, period.month, period.year, time_provider)
    }

    /// persisted installments, newest first, each with its payments
    pub fn get_student_installments(
        &self,
        student_id: StudentId,
        year: Option<i32>,
    ) -> Result<Vec<InstallmentWithPayments>> {
        BalanceAggregator::new(self.store.as_ref()).student_installments(student_id, year)
    }

    pub fn get_outstanding_balance(&self, student_id: StudentId) -> Result<OutstandingBalance> {
        BalanceAggregator::new(self.store.as_ref()).outstanding_balance(student_id)
    }

    pub fn add_discount(
        &mut self,
        student_id: StudentId,
        amount: Money,
        reason: Option<String>,
        created_by: UserId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Discount> {
        DiscountLedger::new(self.store.as_ref(), &self.config).add(
            student_id,
            amount,
            reason,
            created_by,
            time_provider,
            &mut self.events,
        )
    }

    pub fn cancel_discount(
        &mut self,
        discount_id: DiscountId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Discount> {
        DiscountLedger::new(self.store.as_ref(), &self.config).cancel(
            discount_id,
            time_provider,
            &mut self.events,
        )
    }

    pub fn list_discounts(&self, student_id: StudentId, include_cancelled: bool) -> Result<Vec<Discount>> {
        DiscountLedger::new(self.store.as_ref(), &self.config).list(student_id, include_cancelled)
    }

    pub fn record_payment(
        &mut self,
        request: PaymentRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<PaymentOutcome> {
        PaymentRecorder::new(self.store.as_ref(), &self.config).record(
            request,
            time_provider,
            &mut self.events,
        )
    }

    pub fn installment_payments(&self, installment_id: InstallmentId) -> Result<Vec<PaymentRecord>> {
        if self.store.installment(installment_id)?.is_none() {
            return Err(LedgerError::InstallmentNotFound { installment_id });
        }
        self.store.payments_for_installment(installment_id)
    }

    pub fn resolve_student_id_for_user(&self, user_id: UserId) -> Result<StudentId> {
        self.store
            .student_for_user(user_id)?
            .ok_or(LedgerError::StudentProfileNotFound { user_id })
    }

    pub fn events(&self) -> &[LedgerEvent] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        self.events.take_events()
    }
}
