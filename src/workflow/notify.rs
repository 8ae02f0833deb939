use async_trait::async_trait;

use crate::api::error::ApiError;

#[derive(Debug, Clone, PartialEq)]
pub enum AcquisitionOutcome {
    Acquired {
        order_number: String,
        slot_start: i64,
        slot_end: i64,
        attempts: u32,
    },
    WindowMissed {
        attempts: u32,
        reason: String,
    },
    Fatal {
        attempts: u32,
        error: ApiError,
    },
}

impl AcquisitionOutcome {
    pub fn is_acquired(&self) -> bool {
        matches!(self, AcquisitionOutcome::Acquired { .. })
    }
}

/// Receives the terminal outcome of a workflow run.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, outcome: &AcquisitionOutcome);
}

#[derive(Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, outcome: &AcquisitionOutcome) {
        match outcome {
            AcquisitionOutcome::Acquired {
                order_number,
                slot_start,
                slot_end,
                attempts,
            } => tracing::info!(
                target: "workflow",
                order_number = %order_number,
                slot_start = *slot_start,
                slot_end = *slot_end,
                attempts = *attempts,
                "slot_acquired"
            ),
            AcquisitionOutcome::WindowMissed { attempts, reason } => tracing::warn!(
                target: "workflow",
                attempts = *attempts,
                reason = %reason,
                "window_missed"
            ),
            AcquisitionOutcome::Fatal { attempts, error } => tracing::error!(
                target: "workflow",
                attempts = *attempts,
                kind = ?error.kind,
                code = ?error.code,
                error = %error,
                "acquisition_failed"
            ),
        }
    }
}
