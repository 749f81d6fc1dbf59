//! serialization support for presentation layers
use serde::{Deserialize, Serialize};

use crate::balance::InstallmentWithPayments;
use crate::decimal::Money;
use crate::enrollment::SubjectCharge;
use crate::installment::{Installment, InstallmentResult};
use crate::types::{BillingPeriod, InstallmentId, InstallmentStatus, StudentId};

/// serializable view of an installment with its net figures spelled out
#[derive(Debug, Serialize, Deserialize)]
pub struct InstallmentView {
    pub id: InstallmentId,
    pub student_id: StudentId,
    pub period: BillingPeriod,
    pub status: InstallmentStatus,
    pub amounts: AmountsView,
    pub breakdown: Option<BreakdownView>,
    pub payments: Vec<PaymentLineView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AmountsView {
    pub gross: Money,
    pub discount: Money,
    pub net: Money,
    pub paid: Money,
    pub outstanding: Money,
    pub overpaid: Money,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BreakdownView {
    pub subjects: Vec<SubjectCharge>,
    pub subject_total: Money,
    pub carried_from_previous: Money,
    pub discount_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentLineView {
    pub date: chrono::NaiveDate,
    pub amount: Money,
    pub method: Option<String>,
}

impl InstallmentView {
    pub fn from_installment(installment: &Installment) -> Self {
        InstallmentView {
            id: installment.id,
            student_id: installment.student_id,
            period: installment.period(),
            status: installment.status,
            amounts: AmountsView {
                gross: installment.total_amount,
                discount: installment.discount_amount,
                net: installment.net_amount(),
                paid: installment.paid_amount,
                outstanding: installment.outstanding_amount,
                overpaid: installment.overpaid_amount(),
            },
            breakdown: None,
            payments: Vec::new(),
        }
    }

    pub fn from_result(result: &InstallmentResult) -> Self {
        let mut view = Self::from_installment(&result.installment);
        view.breakdown = Some(BreakdownView {
            subjects: result.breakdown.clone(),
            subject_total: result.subject_total,
            carried_from_previous: result.outstanding_from_previous,
            discount_count: result.discount_count,
        });
        view
    }

    pub fn from_listing(entry: &InstallmentWithPayments) -> Self {
        let mut view = Self::from_installment(&entry.installment);
        view.payments = entry
            .payments
            .iter()
            .map(|p| PaymentLineView {
                date: p.payment_date,
                amount: p.amount,
                method: p.payment_method.as_ref().map(ToString::to_string),
            })
            .collect();
        view
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
