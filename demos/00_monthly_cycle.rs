/// monthly cycle - installments, carry-forward, discounts and payments under controlled time
use std::sync::Arc;

use chrono::{Datelike, Duration, TimeZone, Utc};
use tuition_ledger::{
    InstallmentView, MemoryStore, Money, PaymentMethod, PaymentRequest, SafeTimeProvider,
    TimeSource, TuitionLedger, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tuition_ledger::init();
    println!("=== monthly cycle example ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 9, 2, 9, 0, 0).unwrap()
    ));
    let controller = time.test_control().unwrap();

    // seed a student with two subjects
    let store = Arc::new(MemoryStore::new());
    let user = Uuid::new_v4();
    let student = store.register_student(user)?;
    store.enroll(student, Uuid::new_v4(), "Mathematics", Money::from_major(120), time.now())?;
    store.enroll(student, Uuid::new_v4(), "Literature", Money::from_str_exact("85.50")?, time.now())?;

    let mut ledger = TuitionLedger::with_defaults(Arc::clone(&store));
    let cashier = Uuid::new_v4();
    println!("student {} resolved from user {}", ledger.resolve_student_id_for_user(user)?, user);

    // september
    let september = ledger.calculate_monthly_installment(student, 9, 2024, &time)?;
    for charge in &september.breakdown {
        println!("  {:<12} ${}", charge.subject_name, charge.amount);
    }
    println!("september due: ${}", september.installment.outstanding_amount);

    let outcome = ledger.record_payment(
        PaymentRequest::new(
            student,
            september.installment.id,
            Money::from_major(150),
            time.now().date_naive(),
            cashier,
        )
        .with_method(PaymentMethod::BankTransfer),
        &time,
    )?;
    println!(
        "paid $150, remaining ${} ({})",
        outcome.installment.outstanding_amount, outcome.installment.status
    );

    // october carries the unpaid september balance
    controller.advance(Duration::days(30));
    println!("\nadvanced to: {}", time.now().format("%Y-%m-%d"));

    let scholarship = ledger.add_discount(
        student,
        Money::from_major(25),
        Some("sibling scholarship".to_string()),
        cashier,
        &time,
    )?;
    let october = ledger.calculate_monthly_installment(student, time.now().month(), 2024, &time)?;
    println!(
        "october: subjects ${} + carried ${} - discount ${} = ${}",
        october.subject_total,
        october.outstanding_from_previous,
        october.discount_total,
        october.installment.outstanding_amount
    );
    println!("{}", InstallmentView::from_result(&october).to_json_pretty()?);

    ledger.cancel_discount(scholarship.id, &time)?;
    let october = ledger.calculate_monthly_installment(student, 10, 2024, &time)?;
    println!("\nafter cancelling the discount: ${}", october.installment.outstanding_amount);

    // summary
    let balance = ledger.get_outstanding_balance(student)?;
    println!("\noutstanding across {} installments: ${}", balance.count, balance.total_outstanding);
    for entry in ledger.get_student_installments(student, Some(2024))? {
        println!(
            "  {} {:<8} outstanding ${} payments {}",
            entry.installment.period(),
            entry.installment.status.to_string(),
            entry.installment.outstanding_amount,
            entry.payments.len()
        );
    }

    println!("\nevents recorded: {}", ledger.take_events().len());
    Ok(())
}
