use super::model::CheckedItem;
use super::report::CheckSummary;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Human-interaction pause between the check phase and generation.
///
/// Returning `false` declines the run: nothing is generated or uploaded and
/// the items needing work are reported as cancelled.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    /// Sees the whole check phase output once it is done, even when nothing
    /// needs work and `confirm` is never called
    async fn checked(&self, _checked: &[CheckedItem], _summary: &CheckSummary) {}

    async fn confirm(&self, summary: &CheckSummary) -> bool;
}

/// Waits a fixed delay, giving the operator a chance to interrupt
pub struct DelayedConfirmation {
    delay: Duration,
    cancel: CancellationToken,
}

impl DelayedConfirmation {
    pub fn new(delay: Duration, cancel: CancellationToken) -> Self {
        Self { delay, cancel }
    }
}

#[async_trait]
impl ConfirmationGate for DelayedConfirmation {
    async fn confirm(&self, summary: &CheckSummary) -> bool {
        tracing::info!(
            needs_work = summary.needs_work,
            primary_missing = summary.primary_missing,
            mirror_missing = summary.mirror_missing,
            delay_secs = self.delay.as_secs(),
            "Generation will start after the delay; interrupt to cancel"
        );

        tokio::select! {
            _ = self.cancel.cancelled() => {
                tracing::warn!("Run cancelled by operator before generation");
                false
            }
            _ = tokio::time::sleep(self.delay) => true,
        }
    }
}
