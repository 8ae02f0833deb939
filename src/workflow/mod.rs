pub mod acquisition;
pub mod notify;
pub mod retry;

pub use acquisition::AcquisitionWorkflow;
pub use notify::{AcquisitionOutcome, Notifier, TracingNotifier};
pub use retry::{RetryDecision, RetryPolicy};
