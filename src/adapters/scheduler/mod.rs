//! Background services driven by a timer.

mod recurring_billing;

pub use recurring_billing::{RecurringBillingConfig, RecurringBillingScheduler, RenewalReport};
