use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{
    BillingPeriod, DiscountId, InstallmentId, InstallmentStatus, PaymentId, StudentId, UserId,
};

/// all events that can be emitted by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LedgerEvent {
    // installment events
    InstallmentCalculated {
        student_id: StudentId,
        installment_id: InstallmentId,
        period: BillingPeriod,
        total_amount: Money,
        discount_amount: Money,
        outstanding_amount: Money,
        status: InstallmentStatus,
        timestamp: DateTime<Utc>,
    },
    CarryForwardApplied {
        student_id: StudentId,
        from_period: BillingPeriod,
        to_period: BillingPeriod,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    GapPeriodFilled {
        student_id: StudentId,
        period: BillingPeriod,
        requested: BillingPeriod,
        timestamp: DateTime<Utc>,
    },
    StatusChanged {
        student_id: StudentId,
        installment_id: InstallmentId,
        old_status: InstallmentStatus,
        new_status: InstallmentStatus,
        timestamp: DateTime<Utc>,
    },

    // discount events
    DiscountAdded {
        student_id: StudentId,
        discount_id: DiscountId,
        amount: Money,
        created_by: UserId,
        timestamp: DateTime<Utc>,
    },
    DiscountCancelled {
        student_id: StudentId,
        discount_id: DiscountId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentRecorded {
        student_id: StudentId,
        installment_id: InstallmentId,
        payment_id: PaymentId,
        amount: Money,
        payment_date: NaiveDate,
        new_paid_amount: Money,
        new_outstanding_amount: Money,
        timestamp: DateTime<Utc>,
    },
    OverpaymentAbsorbed {
        student_id: StudentId,
        installment_id: InstallmentId,
        excess: Money,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<LedgerEvent>,
    enabled: bool,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            enabled: true,
        }
    }

    /// store that drops everything emitted into it
    pub fn disabled() -> Self {
        Self {
            events: Vec::new(),
            enabled: false,
        }
    }

    pub fn emit(&mut self, event: LedgerEvent) {
        if self.enabled {
            self.events.push(event);
        }
    }

    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
