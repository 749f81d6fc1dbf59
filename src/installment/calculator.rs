use hourglass_rs::SafeTimeProvider;

use crate::config::{CarryForwardPolicy, LedgerConfig};
use crate::enrollment::EnrollmentSnapshot;
use crate::errors::{LedgerError, Result};
use crate::events::{EventStore, LedgerEvent};
use crate::store::{ensure_student, LedgerBackend};
use crate::types::{BillingPeriod, StudentId};

use super::derive::{derive_installment, InstallmentInputs};
use super::{InstallmentDraft, InstallmentResult};

/// computes and upserts the installment of one student and month
pub struct InstallmentCalculator<'a, S> {
    store: &'a S,
    config: &'a LedgerConfig,
}

impl<'a, S: LedgerBackend> InstallmentCalculator<'a, S> {
    pub fn new(store: &'a S, config: &'a LedgerConfig) -> Self {
        Self { store, config }
    }

    /// compute `period` for the student, resolving any carry-forward gap first
    pub fn calculate(
        &self,
        student_id: StudentId,
        period: BillingPeriod,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<InstallmentResult> {
        ensure_student(self.store, student_id)?;
        self.resolve_gap(student_id, period, time_provider, events)?;
        self.compute_period(student_id, period, time_provider, events)
    }

    /// fail early, without writing, when `calculate` would reject `period` for a carry-forward gap
    pub fn check_carry_forward(&self, student_id: StudentId, period: BillingPeriod) -> Result<()> {
        self.pending_gap(student_id, period).map(|_| ())
    }

    /// watermark to fill from when allowed, `None` when nothing is missing
    fn pending_gap(&self, student_id: StudentId, period: BillingPeriod) -> Result<Option<BillingPeriod>> {
        if self.config.carry_forward == CarryForwardPolicy::Sequential {
            return Ok(None);
        }
        if self
            .store
            .installment_for_period(student_id, period.previous())?
            .is_some()
        {
            return Ok(None);
        }
        let watermark = match self.store.latest_installment_before(student_id, period)? {
            Some(latest) => latest.period(),
            // first period ever computed for this student, nothing to carry
            None => return Ok(None),
        };

        let missing = watermark.months_until(&period).saturating_sub(1);
        if self.config.carry_forward == CarryForwardPolicy::Strict || missing > self.config.max_gap_periods {
            return Err(LedgerError::CarryForwardGap {
                student_id,
                watermark,
                requested: period,
            });
        }
        Ok(Some(watermark))
    }

    /// make sure the predecessor of `period` exists when an older row does
    fn resolve_gap(
        &self,
        student_id: StudentId,
        period: BillingPeriod,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        let Some(watermark) = self.pending_gap(student_id, period)? else {
            return Ok(());
        };

        tracing::warn!(
            student_id = %student_id,
            watermark = %watermark,
            requested = %period,
            missing = watermark.months_until(&period).saturating_sub(1),
            "filling skipped periods before computing"
        );
        let mut gap = watermark.next();
        while gap < period {
            self.compute_period(student_id, gap, time_provider, events)?;
            events.emit(LedgerEvent::GapPeriodFilled {
                student_id,
                period: gap,
                requested: period,
                timestamp: time_provider.now(),
            });
            gap = gap.next();
        }
        Ok(())
    }

    /// single-period computation: one read of each input, one upsert
    fn compute_period(
        &self,
        student_id: StudentId,
        period: BillingPeriod,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<InstallmentResult> {
        let now = time_provider.now();
        let month_end = period.end()?;

        let enrollments = self.store.enrollments_as_of(student_id, month_end)?;
        let snapshot = EnrollmentSnapshot::from_enrollments(&enrollments, month_end);
        for charge in snapshot.unpriced() {
            tracing::warn!(
                student_id = %student_id,
                subject_id = %charge.subject_id,
                subject = %charge.subject_name,
                "subject has no monthly price"
            );
        }

        let previous_period = period.previous();
        let previous = self.store.installment_for_period(student_id, previous_period)?;
        let discounts = self.store.active_discounts(student_id)?;
        let existing = self.store.installment_for_period(student_id, period)?;

        let state = derive_installment(&InstallmentInputs {
            period,
            current_period: BillingPeriod::containing(now),
            enrollments: &snapshot,
            discounts: &discounts,
            previous_outstanding: previous.as_ref().map(|p| p.outstanding_amount),
            paid_amount: existing.as_ref().map(|e| e.paid_amount).unwrap_or_default(),
        });

        if state.overpayment.is_positive() {
            tracing::warn!(
                student_id = %student_id,
                period = %period,
                overpayment = %state.overpayment,
                "paid exceeds amount due, outstanding clamped to zero"
            );
        }
        tracing::debug!(
            student_id = %student_id,
            period = %period,
            subject_total = %state.subject_total,
            carried = %state.outstanding_from_previous,
            discount = %state.discount_amount,
            paid = %state.paid_amount,
            "derived installment"
        );

        let draft = InstallmentDraft {
            student_id,
            period,
            total_amount: state.total_amount,
            discount_amount: state.discount_amount,
            outstanding_amount: state.outstanding_amount,
            status: state.status,
        };
        let installment = self.store.upsert_installment(&draft, now)?;

        if state.outstanding_from_previous.is_positive() {
            events.emit(LedgerEvent::CarryForwardApplied {
                student_id,
                from_period: previous_period,
                to_period: period,
                amount: state.outstanding_from_previous,
                timestamp: now,
            });
        }
        if let Some(old) = existing.as_ref().filter(|e| e.status != installment.status) {
            events.emit(LedgerEvent::StatusChanged {
                student_id,
                installment_id: installment.id,
                old_status: old.status,
                new_status: installment.status,
                timestamp: now,
            });
        }
        events.emit(LedgerEvent::InstallmentCalculated {
            student_id,
            installment_id: installment.id,
            period,
            total_amount: installment.total_amount,
            discount_amount: installment.discount_amount,
            outstanding_amount: installment.outstanding_amount,
            status: installment.status,
            timestamp: now,
        });

        tracing::info!(
            student_id = %student_id,
            period = %period,
            total = %installment.total_amount,
            outstanding = %installment.outstanding_amount,
            status = %installment.status,
            "installment calculated"
        );

        Ok(InstallmentResult {
            installment,
            breakdown: snapshot.charges,
            subject_total: state.subject_total,
            outstanding_from_previous: state.outstanding_from_previous,
            final_amount: state.final_amount,
            discount_count: state.discount_count,
            discount_total: state.discount_amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use uuid::Uuid;

    use crate::decimal::Money;
    use crate::store::{LedgerStore, MemoryStore};
    use crate::types::InstallmentStatus;

    fn clock(year: i32, month: u32, day: u32) -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(year, month, day, 10, 0, 0).unwrap(),
        ))
    }

    fn student_with_subject(store: &MemoryStore, price: i64) -> StudentId {
        let student = store.register_student(Uuid::new_v4()).unwrap();
        store
            .enroll(
                student,
                Uuid::new_v4(),
                "Mathematics",
                Money::from_major(price),
                Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap(),
            )
            .unwrap();
        student
    }

    fn period(month: u32) -> BillingPeriod {
        BillingPeriod::new(month, 2024).unwrap()
    }

    #[test]
    fn test_first_computation_creates_row() {
        let store = MemoryStore::new();
        let student = student_with_subject(&store, 100);
        let config = LedgerConfig::default();
        let time = clock(2024, 1, 15);
        let mut events = EventStore::new();

        let result = InstallmentCalculator::new(&store, &config)
            .calculate(student, period(1), &time, &mut events)
            .unwrap();

        assert_eq!(result.installment.total_amount, Money::from_major(100));
        assert_eq!(result.installment.outstanding_amount, Money::from_major(100));
        assert_eq!(result.installment.status, InstallmentStatus::Pending);
        assert_eq!(result.breakdown.len(), 1);
        assert_eq!(result.outstanding_from_previous, Money::ZERO);
        assert!(matches!(events.events().last(), Some(LedgerEvent::InstallmentCalculated { .. })));
    }

    #[test]
    fn test_idempotent() {
        let store = MemoryStore::new();
        let student = student_with_subject(&store, 100);
        let config = LedgerConfig::default();
        let time = clock(2024, 3, 15);
        let mut events = EventStore::new();
        let calculator = InstallmentCalculator::new(&store, &config);

        calculator.calculate(student, period(2), &time, &mut events).unwrap();
        let first = calculator.calculate(student, period(3), &time, &mut events).unwrap();
        let second = calculator.calculate(student, period(3), &time, &mut events).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_enrollment_after_month_end_is_ignored() {
        let store = MemoryStore::new();
        let student = student_with_subject(&store, 100);
        store
            .enroll(
                student,
                Uuid::new_v4(),
                "Physics",
                Money::from_major(60),
                Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            )
            .unwrap();
        let config = LedgerConfig::default();
        let time = clock(2024, 2, 10);
        let mut events = EventStore::new();
        let calculator = InstallmentCalculator::new(&store, &config);

        let january = calculator.calculate(student, period(1), &time, &mut events).unwrap();
        assert_eq!(january.subject_total, Money::from_major(100));

        let february = calculator.calculate(student, period(2), &time, &mut events).unwrap();
        assert_eq!(february.subject_total, Money::from_major(160));
    }

    #[test]
    fn test_carry_forward_from_previous_month() {
        let store = MemoryStore::new();
        let student = store.register_student(Uuid::new_v4()).unwrap();
        store
            .enroll(
                student,
                Uuid::new_v4(),
                "Mathematics",
                Money::from_major(50),
                Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
            )
            .unwrap();
        let config = LedgerConfig::default();
        let time = clock(2024, 3, 20);
        let mut events = EventStore::new();
        let calculator = InstallmentCalculator::new(&store, &config);

        calculator.calculate(student, period(3), &time, &mut events).unwrap();

        // march is still unpaid, so april owes its own 50 plus march's 50
        let april = calculator.calculate(student, period(4), &time, &mut events).unwrap();
        assert_eq!(april.outstanding_from_previous, Money::from_major(50));
        assert_eq!(april.installment.total_amount, Money::from_major(100));
        assert!(events.events().iter().any(|e| matches!(e, LedgerEvent::CarryForwardApplied { .. })));
    }

    #[test]
    fn test_carry_without_new_subjects() {
        let store = MemoryStore::new();
        let student = store.register_student(Uuid::new_v4()).unwrap();
        let config = LedgerConfig::default();
        let time = clock(2024, 5, 2);
        let mut events = EventStore::new();

        // an unpaid $50 for march, written as a calculator from another process would
        let draft = InstallmentDraft {
            student_id: student,
            period: period(3),
            total_amount: Money::from_major(50),
            discount_amount: Money::ZERO,
            outstanding_amount: Money::from_major(50),
            status: InstallmentStatus::Overdue,
        };
        store.upsert_installment(&draft, time.now()).unwrap();

        let april = InstallmentCalculator::new(&store, &config)
            .calculate(student, period(4), &time, &mut events)
            .unwrap();
        assert_eq!(april.subject_total, Money::ZERO);
        assert_eq!(april.installment.total_amount, Money::from_major(50));
        assert_eq!(april.installment.outstanding_amount, Money::from_major(50));
        assert_eq!(april.installment.status, InstallmentStatus::Overdue);
    }

    #[test]
    fn test_past_unpaid_month_is_overdue() {
        let store = MemoryStore::new();
        let student = student_with_subject(&store, 100);
        let config = LedgerConfig::default();
        let time = clock(2024, 2, 1);
        let mut events = EventStore::new();
        let calculator = InstallmentCalculator::new(&store, &config);

        let january = calculator.calculate(student, period(1), &time, &mut events).unwrap();
        assert_eq!(january.installment.status, InstallmentStatus::Overdue);

        let march = calculator.calculate(student, period(3), &time, &mut events).unwrap();
        assert_eq!(march.installment.status, InstallmentStatus::Pending);
    }

    #[test]
    fn test_status_change_is_recorded() {
        let store = MemoryStore::new();
        let student = student_with_subject(&store, 100);
        let config = LedgerConfig::default();
        let time = clock(2024, 1, 20);
        let control = time.test_control().unwrap();
        let mut events = EventStore::new();
        let calculator = InstallmentCalculator::new(&store, &config);

        calculator.calculate(student, period(1), &time, &mut events).unwrap();
        control.advance(chrono::Duration::days(15));
        let again = calculator.calculate(student, period(1), &time, &mut events).unwrap();

        assert_eq!(again.installment.status, InstallmentStatus::Overdue);
        assert!(events.events().iter().any(|e| matches!(
            e,
            LedgerEvent::StatusChanged {
                old_status: InstallmentStatus::Pending,
                new_status: InstallmentStatus::Overdue,
                ..
            }
        )));
    }

    #[test]
    fn test_unknown_student() {
        let store = MemoryStore::new();
        let config = LedgerConfig::default();
        let time = clock(2024, 1, 20);
        let mut events = EventStore::new();

        let err = InstallmentCalculator::new(&store, &config)
            .calculate(Uuid::new_v4(), period(1), &time, &mut events)
            .unwrap_err();
        assert!(matches!(err, LedgerError::StudentNotFound { .. }));
    }

    #[test]
    fn test_fill_gaps_computes_skipped_months() {
        let store = MemoryStore::new();
        let student = student_with_subject(&store, 100);
        let config = LedgerConfig::default();
        let time = clock(2024, 6, 10);
        let mut events = EventStore::new();
        let calculator = InstallmentCalculator::new(&store, &config);

        calculator.calculate(student, period(1), &time, &mut events).unwrap();
        events.clear();

        // february to april were never computed
        let may = calculator.calculate(student, period(5), &time, &mut events).unwrap();

        for month in 2..=4 {
            assert!(store.installment_for_period(student, period(month)).unwrap().is_some());
        }
        let filled = events
            .events()
            .iter()
            .filter(|e| matches!(e, LedgerEvent::GapPeriodFilled { .. }))
            .count();
        assert_eq!(filled, 3);
        // january to april each roll 100 more into the next month
        assert_eq!(may.outstanding_from_previous, Money::from_major(400));
        assert_eq!(may.installment.total_amount, Money::from_major(500));
    }

    #[test]
    fn test_sequential_policy_skips_carry() {
        let store = MemoryStore::new();
        let student = student_with_subject(&store, 100);
        let config = LedgerConfig::sequential();
        let time = clock(2024, 6, 10);
        let mut events = EventStore::new();
        let calculator = InstallmentCalculator::new(&store, &config);

        calculator.calculate(student, period(1), &time, &mut events).unwrap();
        let may = calculator.calculate(student, period(5), &time, &mut events).unwrap();

        assert_eq!(may.outstanding_from_previous, Money::ZERO);
        assert!(store.installment_for_period(student, period(3)).unwrap().is_none());
    }

    #[test]
    fn test_strict_policy_rejects_gap() {
        let store = MemoryStore::new();
        let student = student_with_subject(&store, 100);
        let config = LedgerConfig {
            carry_forward: CarryForwardPolicy::Strict,
            ..LedgerConfig::default()
        };
        let time = clock(2024, 6, 10);
        let mut events = EventStore::new();
        let calculator = InstallmentCalculator::new(&store, &config);

        calculator.calculate(student, period(1), &time, &mut events).unwrap();
        calculator.calculate(student, period(2), &time, &mut events).unwrap();

        let err = calculator.calculate(student, period(4), &time, &mut events).unwrap_err();
        assert!(matches!(err, LedgerError::CarryForwardGap { .. }));
        assert!(store.installment_for_period(student, period(4)).unwrap().is_none());
    }

    #[test]
    fn test_gap_longer_than_bound() {
        let store = MemoryStore::new();
        let student = student_with_subject(&store, 100);
        let config = LedgerConfig {
            max_gap_periods: 2,
            ..LedgerConfig::default()
        };
        let time = clock(2024, 6, 10);
        let mut events = EventStore::new();
        let calculator = InstallmentCalculator::new(&store, &config);

        calculator.calculate(student, period(1), &time, &mut events).unwrap();
        assert!(calculator.calculate(student, period(4), &time, &mut events).is_ok());

        let err = calculator.calculate(student, period(8), &time, &mut events).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::CarryForwardGap { watermark, .. } if watermark == period(4)
        ));
    }

    #[test]
    fn test_recomputing_older_month_needs_no_fill() {
        let store = MemoryStore::new();
        let student = student_with_subject(&store, 100);
        let config = LedgerConfig {
            carry_forward: CarryForwardPolicy::Strict,
            ..LedgerConfig::default()
        };
        let time = clock(2024, 6, 10);
        let mut events = EventStore::new();
        let calculator = InstallmentCalculator::new(&store, &config);

        // the very first period of a student is never a gap
        calculator.calculate(student, period(5), &time, &mut events).unwrap();
        assert!(calculator.calculate(student, period(2), &time, &mut events).is_ok());
    }
}
