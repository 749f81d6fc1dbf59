use hourglass_rs::SafeTimeProvider;

use crate::config::{LedgerConfig, PaymentRecompute};
use crate::errors::{LedgerError, Result};
use crate::events::{EventStore, LedgerEvent};
use crate::installment::InstallmentCalculator;
use crate::store::{ensure_student, LedgerBackend};

use super::{PaymentOutcome, PaymentRecord, PaymentRequest};

/// records payments against existing installments
pub struct PaymentRecorder<'a, S> {
    store: &'a S,
    config: &'a LedgerConfig,
}

impl<'a, S: LedgerBackend> PaymentRecorder<'a, S> {
    pub fn new(store: &'a S, config: &'a LedgerConfig) -> Self {
        Self { store, config }
    }

    /// insert the payment and update paid/outstanding/status of its installment in one store call
    pub fn record(
        &self,
        request: PaymentRequest,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<PaymentOutcome> {
        request.validate()?;
        ensure_student(self.store, request.student_id)?;

        let installment_id = request.installment_id;
        let existing = self
            .store
            .installment(installment_id)?
            .ok_or(LedgerError::InstallmentNotFound { installment_id })?;
        if existing.student_id != request.student_id {
            return Err(LedgerError::InstallmentStudentMismatch {
                installment_id,
                student_id: request.student_id,
                owner: existing.student_id,
            });
        }
        let full_recompute = self.config.payment_recompute == PaymentRecompute::Full;
        let calculator = InstallmentCalculator::new(self.store, self.config);
        if full_recompute {
            // the recompute below must not fail once the payment is stored
            calculator.check_carry_forward(existing.student_id, existing.period())?;
        }

        let now = time_provider.now();
        let payment = PaymentRecord::from_request(request, now);
        let applied = self.store.apply_payment(&payment, now)?;
        let mut installment = applied.installment;

        tracing::info!(
            student_id = %payment.student_id,
            installment_id = %installment_id,
            payment_id = %payment.id,
            amount = %payment.amount,
            paid = %installment.paid_amount,
            outstanding = %installment.outstanding_amount,
            "payment recorded"
        );
        events.emit(LedgerEvent::PaymentRecorded {
            student_id: payment.student_id,
            installment_id,
            payment_id: payment.id,
            amount: payment.amount,
            payment_date: payment.payment_date,
            new_paid_amount: installment.paid_amount,
            new_outstanding_amount: installment.outstanding_amount,
            timestamp: now,
        });
        if applied.excess.is_positive() {
            tracing::warn!(
                installment_id = %installment_id,
                excess = %applied.excess,
                "overpayment absorbed"
            );
            events.emit(LedgerEvent::OverpaymentAbsorbed {
                student_id: payment.student_id,
                installment_id,
                excess: applied.excess,
                timestamp: now,
            });
        }
        if applied.previous_status != installment.status {
            events.emit(LedgerEvent::StatusChanged {
                student_id: payment.student_id,
                installment_id,
                old_status: applied.previous_status,
                new_status: installment.status,
                timestamp: now,
            });
        }

        if full_recompute {
            installment = calculator
                .calculate(installment.student_id, installment.period(), time_provider, events)?
                .installment;
        }

        Ok(PaymentOutcome { payment, installment })
    }
}
