pub mod payment_flow;

pub use payment_flow::{PaymentFlow, PaymentForm, PaymentMode, PaymentState, PaymentTimings};
