use crate::decimal::Money;
use crate::installment::{derive_status, Installment};
use crate::types::InstallmentStatus;

/// installment fields after one payment, computed from the stored total and discount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentSettlement {
    pub paid_amount: Money,
    pub outstanding_amount: Money,
    pub status: InstallmentStatus,
    /// portion of the paid total beyond the net due
    pub excess: Money,
}

/// apply `amount` to an installment without recomputing its gross or discount
///
/// OVERDUE is never produced here: after a payment the status can only be
/// PARTIAL or PAID (or PENDING for a zero net with nothing paid).
pub fn settle_payment(installment: &Installment, amount: Money) -> PaymentSettlement {
    let paid_amount = installment.paid_amount + amount;
    let final_amount = installment.net_amount();
    let remaining = final_amount - paid_amount;

    PaymentSettlement {
        paid_amount,
        outstanding_amount: remaining.clamp_non_negative(),
        status: derive_status(final_amount, paid_amount, false),
        excess: (Money::ZERO - remaining).clamp_non_negative(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn installment(total: i64, discount: i64, paid: i64, status: InstallmentStatus) -> Installment {
        Installment {
            id: Uuid::new_v4(),
            student_id: Uuid::new_v4(),
            month: 2,
            year: 2024,
            total_amount: Money::from_major(total),
            paid_amount: Money::from_major(paid),
            discount_amount: Money::from_major(discount),
            outstanding_amount: Money::from_major(total - discount - paid).clamp_non_negative(),
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_partial_then_paid() {
        let row = installment(120, 20, 0, InstallmentStatus::Overdue);

        let first = settle_payment(&row, Money::from_major(40));
        assert_eq!(first.paid_amount, Money::from_major(40));
        assert_eq!(first.outstanding_amount, Money::from_major(60));
        assert_eq!(first.status, InstallmentStatus::Partial);

        let row = Installment { paid_amount: first.paid_amount, ..row };
        let second = settle_payment(&row, Money::from_major(60));
        assert_eq!(second.status, InstallmentStatus::Paid);
        assert_eq!(second.outstanding_amount, Money::ZERO);
        assert_eq!(second.excess, Money::ZERO);
    }

    #[test]
    fn test_overpayment_is_absorbed() {
        let row = installment(100, 0, 0, InstallmentStatus::Pending);
        let settled = settle_payment(&row, Money::from_major(150));

        assert_eq!(settled.paid_amount, Money::from_major(150));
        assert_eq!(settled.outstanding_amount, Money::ZERO);
        assert_eq!(settled.status, InstallmentStatus::Paid);
        assert_eq!(settled.excess, Money::from_major(50));
    }

    #[test]
    fn test_exact_cents() {
        let row = installment(100, 0, 0, InstallmentStatus::Pending);
        let amount = Money::from_str_exact("33.33").unwrap();

        let settled = settle_payment(&row, amount);
        assert_eq!(settled.paid_amount, amount);
        assert_eq!(settled.outstanding_amount, Money::from_str_exact("66.67").unwrap());
    }
}
