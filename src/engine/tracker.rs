//! Stack lifecycle tracker - polls a stack until it settles
//!
//! The tracker is the only place a workflow suspends. It re-describes the
//! stack every `poll_interval` until the status is terminal, the stack is
//! gone, the optional timeout elapses, or the cancellation flag is raised.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, instrument};

use crate::client::{StackDescriber, StackWaiter};
use crate::engine::error::WorkflowError;
use crate::stack::{Stack, StatusClass};

/// Default delay between two polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct TrackerSettings {
    pub poll_interval: Duration,
    /// Give up after this long; `None` waits until the stack settles
    pub timeout: Option<Duration>,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

pub struct StackTracker<D> {
    describer: D,
    settings: TrackerSettings,
    cancelled: Arc<AtomicBool>,
}

impl<D: StackDescriber> StackTracker<D> {
    pub fn new(describer: D) -> Self {
        Self {
            describer,
            settings: TrackerSettings::default(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_settings(mut self, settings: TrackerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Share a cancellation flag; it is checked before every poll
    pub fn with_cancellation(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn cancellation(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }
}

#[async_trait]
impl<D: StackDescriber> StackWaiter for StackTracker<D> {
    #[instrument(skip(self))]
    async fn await_final_status(&self, name: &str) -> Result<Option<Stack>, WorkflowError> {
        let started = Instant::now();

        loop {
            if self.cancelled.load(Ordering::SeqCst) {
                return Err(WorkflowError::Cancelled(name.to_string()));
            }

            let stack = match self.describer.describe_stack(name).await? {
                Some(stack) => stack,
                None => {
                    debug!("Stack '{}' not found", name);
                    return Ok(None);
                }
            };

            if stack.status.is_terminal() {
                debug!("Stack '{}' settled in {}", name, stack.status);
                return Ok(Some(stack));
            }

            debug!("Stack '{}' is {}, waiting", name, stack.status);

            if let Some(timeout) = self.settings.timeout {
                let waited = started.elapsed();
                if waited + self.settings.poll_interval > timeout {
                    return Err(WorkflowError::Timeout {
                        name: name.to_string(),
                        waited,
                    });
                }
            }

            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}

/// Wait for a stack and require it to exist and be healthy
pub async fn await_healthy(waiter: &dyn StackWaiter, name: &str) -> Result<Stack, WorkflowError> {
    debug!("Waiting for stack '{}' to complete", name);
    let stack = waiter
        .await_final_status(name)
        .await?
        .ok_or_else(|| WorkflowError::not_found(name, "after mutation"))?;

    match stack.outcome() {
        StatusClass::Failed | StatusClass::InProgress => Err(WorkflowError::UnhealthyStatus {
            name: stack.name.clone(),
            status: stack.status.to_string(),
            reason: stack.status_reason.clone(),
        }),
        StatusClass::Succeeded => Ok(stack),
    }
}
