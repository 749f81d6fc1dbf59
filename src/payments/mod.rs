pub mod recorder;
pub mod settlement;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::installment::Installment;
use crate::types::{InstallmentId, PaymentId, PaymentMethod, StudentId, UserId};

pub use recorder::PaymentRecorder;
pub use settlement::{settle_payment, PaymentSettlement};

/// payment request as received from the caller
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentRequest {
    pub student_id: StudentId,
    pub installment_id: InstallmentId,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub recorded_by: UserId,
}

impl PaymentRequest {
    pub fn new(
        student_id: StudentId,
        installment_id: InstallmentId,
        amount: Money,
        payment_date: NaiveDate,
        recorded_by: UserId,
    ) -> Self {
        Self {
            student_id,
            installment_id,
            amount,
            payment_date,
            method: None,
            notes: None,
            recorded_by,
        }
    }

    pub fn with_method(mut self, method: PaymentMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(LedgerError::InvalidAmount { amount: self.amount });
        }
        Ok(())
    }
}

/// append-only record of money received against one installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub student_id: StudentId,
    pub installment_id: InstallmentId,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub recorded_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl PaymentRecord {
    pub fn from_request(request: PaymentRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id: request.student_id,
            installment_id: request.installment_id,
            amount: request.amount,
            payment_date: request.payment_date,
            payment_method: request.method,
            notes: request.notes,
            recorded_by: request.recorded_by,
            created_at,
        }
    }
}

/// stored payment and the installment after it was applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub payment: PaymentRecord,
    pub installment: Installment,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_validation() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let request = PaymentRequest::new(Uuid::new_v4(), Uuid::new_v4(), Money::ZERO, date, Uuid::new_v4());
        assert!(matches!(request.validate(), Err(LedgerError::InvalidAmount { .. })));

        let negative = PaymentRequest {
            amount: Money::from_major(-5),
            ..request.clone()
        };
        assert!(negative.validate().is_err());

        let valid = PaymentRequest {
            amount: Money::CENT,
            ..request
        };
        assert!(valid.validate().is_ok());
    }

    #[test]
    fn test_record_keeps_request_fields() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let request = PaymentRequest::new(Uuid::new_v4(), Uuid::new_v4(), Money::from_major(40), date, Uuid::new_v4())
            .with_method(PaymentMethod::BankTransfer)
            .with_notes("march tuition");

        let record = PaymentRecord::from_request(request.clone(), Utc::now());
        assert_eq!(record.amount, request.amount);
        assert_eq!(record.payment_method, Some(PaymentMethod::BankTransfer));
        assert_eq!(record.notes.as_deref(), Some("march tuition"));
        assert_eq!(record.installment_id, request.installment_id);
    }
}
