use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::Result;
use crate::types::{StudentId, SubjectId};

/// a student's enrollment in one billable subject, supplied by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectEnrollment {
    pub student_id: StudentId,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub declared_monthly_price: Money,
    pub enrolled_at: DateTime<Utc>,
}

/// source of the enrollments effective at a cutoff instant
pub trait EnrollmentProvider {
    /// every enrollment of the student with `enrolled_at <= cutoff`, in any order
    fn enrollments_as_of(
        &self,
        student_id: StudentId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<SubjectEnrollment>>;
}

/// one line of the per-subject breakdown shown next to an installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectCharge {
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub amount: Money,
    pub enrolled_at: DateTime<Utc>,
}

/// priced view of a student's enrollments for one month
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EnrollmentSnapshot {
    pub charges: Vec<SubjectCharge>,
    /// sum of the positive declared prices
    pub subject_total: Money,
}

impl EnrollmentSnapshot {
    /// build from raw enrollments, ignoring any that start after `cutoff`
    pub fn from_enrollments(enrollments: &[SubjectEnrollment], cutoff: DateTime<Utc>) -> Self {
        let mut charges: Vec<SubjectCharge> = enrollments
            .iter()
            .filter(|e| e.enrolled_at <= cutoff)
            .map(|e| SubjectCharge {
                subject_id: e.subject_id,
                subject_name: e.subject_name.clone(),
                amount: e.declared_monthly_price,
                enrolled_at: e.enrolled_at,
            })
            .collect();
        // provider order is arbitrary, keep the breakdown stable between runs
        charges.sort_by(|a, b| {
            a.enrolled_at
                .cmp(&b.enrolled_at)
                .then_with(|| a.subject_id.cmp(&b.subject_id))
        });

        let subject_total = charges
            .iter()
            .filter(|c| c.amount.is_positive())
            .map(|c| c.amount)
            .sum();

        Self {
            charges,
            subject_total,
        }
    }

    /// subjects reported without a usable price
    pub fn unpriced(&self) -> impl Iterator<Item = &SubjectCharge> {
        self.charges.iter().filter(|c| !c.amount.is_positive())
    }
}
