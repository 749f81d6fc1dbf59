use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::{LedgerError, Result};

/// unique identifier for a student profile
pub type StudentId = Uuid;

/// unique identifier for an authenticated user account
pub type UserId = Uuid;

/// unique identifier for a billable subject
pub type SubjectId = Uuid;

pub type InstallmentId = Uuid;
pub type DiscountId = Uuid;
pub type PaymentId = Uuid;

/// earliest and latest years accepted for a billing period
pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 9999;

/// settlement status of an installment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallmentStatus {
    /// nothing paid, period not yet over
    Pending,
    /// some payment received, balance remains
    Partial,
    /// paid amount covers the net amount due
    Paid,
    /// nothing paid and the period is in the past
    Overdue,
}

impl InstallmentStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, InstallmentStatus::Paid)
    }
}

impl fmt::Display for InstallmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InstallmentStatus::Pending => "PENDING",
            InstallmentStatus::Partial => "PARTIAL",
            InstallmentStatus::Paid => "PAID",
            InstallmentStatus::Overdue => "OVERDUE",
        };
        f.write_str(label)
    }
}

/// how a payment was made
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Card,
    Cheque,
    Other(String),
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => f.write_str("cash"),
            PaymentMethod::BankTransfer => f.write_str("bank transfer"),
            PaymentMethod::Card => f.write_str("card"),
            PaymentMethod::Cheque => f.write_str("cheque"),
            PaymentMethod::Other(label) => f.write_str(label),
        }
    }
}

/// a calendar month, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BillingPeriod {
    // field order matters for the derived ordering
    pub year: i32,
    pub month: u32,
}

impl BillingPeriod {
    /// validated constructor
    pub fn new(month: u32, year: i32) -> Result<Self> {
        if !(1..=12).contains(&month) || !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(LedgerError::InvalidPeriod { month, year });
        }
        Ok(Self { year, month })
    }

    /// period containing the given instant
    pub fn containing(instant: DateTime<Utc>) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
        }
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// number of months from `self` up to `later`, zero when `later` is not after `self`
    pub fn months_until(&self, later: &BillingPeriod) -> u32 {
        let from = self.year as i64 * 12 + self.month as i64;
        let to = later.year as i64 * 12 + later.month as i64;
        (to - from).max(0) as u32
    }

    /// first instant of the month
    pub fn start(&self) -> Result<DateTime<Utc>> {
        let midnight = self
            .first_day()?
            .and_hms_opt(0, 0, 0)
            .ok_or(LedgerError::InvalidPeriod { month: self.month, year: self.year })?;
        Ok(Utc.from_utc_datetime(&midnight))
    }

    /// last instant of the month (one nanosecond before the next month starts)
    pub fn end(&self) -> Result<DateTime<Utc>> {
        let next_start = self.next().start()?;
        Ok(next_start - Duration::nanoseconds(1))
    }

    fn first_day(&self) -> Result<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
            .ok_or(LedgerError::InvalidPeriod { month: self.month, year: self.year })
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
