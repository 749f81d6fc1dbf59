use thiserror::Error;

use crate::decimal::Money;
use crate::types::{BillingPeriod, DiscountId, InstallmentId, StudentId, UserId};

/// broad failure class, mapped by callers onto their transport's status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Storage,
    Configuration,
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("student not found: {student_id}")]
    StudentNotFound {
        student_id: StudentId,
    },

    #[error("installment not found: {installment_id}")]
    InstallmentNotFound {
        installment_id: InstallmentId,
    },

    #[error("discount not found: {discount_id}")]
    DiscountNotFound {
        discount_id: DiscountId,
    },

    #[error("no student profile for user {user_id}")]
    StudentProfileNotFound {
        user_id: UserId,
    },

    #[error("invalid amount: {amount} (must be greater than zero)")]
    InvalidAmount {
        amount: Money,
    },

    #[error("installment {installment_id} belongs to student {owner}, not {student_id}")]
    InstallmentStudentMismatch {
        installment_id: InstallmentId,
        student_id: StudentId,
        owner: StudentId,
    },

    #[error("invalid billing period: month {month}, year {year}")]
    InvalidPeriod {
        month: u32,
        year: i32,
    },

    #[error("carry-forward gap for student {student_id}: last computed {watermark}, requested {requested}")]
    CarryForwardGap {
        student_id: StudentId,
        watermark: BillingPeriod,
        requested: BillingPeriod,
    },

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("config io error: {0}")]
    ConfigIo(#[from] std::io::Error),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::StudentNotFound { .. }
            | LedgerError::InstallmentNotFound { .. }
            | LedgerError::DiscountNotFound { .. }
            | LedgerError::StudentProfileNotFound { .. } => ErrorKind::NotFound,
            LedgerError::InvalidAmount { .. }
            | LedgerError::InstallmentStudentMismatch { .. }
            | LedgerError::InvalidPeriod { .. }
            | LedgerError::CarryForwardGap { .. } => ErrorKind::BadRequest,
            LedgerError::Storage { .. } => ErrorKind::Storage,
            LedgerError::InvalidConfiguration { .. }
            | LedgerError::ConfigParse(_)
            | LedgerError::ConfigIo(_) => ErrorKind::Configuration,
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        LedgerError::Storage {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
