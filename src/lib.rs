pub mod balance;
pub mod config;
pub mod decimal;
pub mod discounts;
pub mod enrollment;
pub mod errors;
pub mod events;
pub mod installment;
pub mod ledger;
pub mod payments;
pub mod store;
pub mod types;
pub mod view;

use std::sync::Once;

// re-export key types
pub use balance::{BalanceAggregator, InstallmentWithPayments, OutstandingBalance};
pub use config::{CarryForwardPolicy, LedgerConfig, PaymentRecompute};
pub use decimal::Money;
pub use discounts::{Discount, DiscountLedger};
pub use enrollment::{EnrollmentProvider, EnrollmentSnapshot, SubjectCharge, SubjectEnrollment};
pub use errors::{ErrorKind, LedgerError, Result};
pub use events::{EventStore, LedgerEvent};
pub use installment::{
    derive_installment, Installment, InstallmentCalculator, InstallmentInputs, InstallmentResult,
    InstallmentState,
};
pub use ledger::TuitionLedger;
pub use payments::{PaymentOutcome, PaymentRecord, PaymentRecorder, PaymentRequest};
pub use store::{LedgerBackend, LedgerStore, MemoryStore, StudentDirectory};
pub use types::{
    BillingPeriod, DiscountId, InstallmentId, InstallmentStatus, PaymentId, PaymentMethod, StudentId,
    SubjectId, UserId,
};
pub use view::InstallmentView;

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;

static INIT_TRACING: Once = Once::new();

/// install a fmt subscriber honouring `RUST_LOG`, once per process
pub fn init() {
    INIT_TRACING.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("tuition_ledger=info"));
        // another subscriber may already be installed by the host application
        if fmt().with_env_filter(filter).try_init().is_ok() {
            tracing::info!("tuition ledger tracing initialized");
        }
    });
}
