//! Fire-and-forget collaborator calls that must not block the response.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use domain::Step;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::error::CollaboratorError;

/// Tracks detached tasks so shutdown can wait for them.
///
/// Each task is bounded by its own timeout and runs in the span that was
/// current when it was spawned, so its logs keep the request's correlation
/// id.
#[derive(Debug, Clone, Default)]
pub struct BackgroundTasks {
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns `call` for `step`, giving up after `timeout`.
    ///
    /// The outcome is only logged and counted; nothing waits for it.
    pub fn spawn<F>(&self, step: Step, timeout: Duration, call: F)
    where
        F: Future<Output = Result<(), CollaboratorError>> + Send + 'static,
    {
        let span = tracing::info_span!(
            "background",
            task = step.as_str(),
            collaborator = step.collaborator().as_str()
        );
        let task = async move {
            let result = match tokio::time::timeout(timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(CollaboratorError::Timeout(timeout)),
            };
            match result {
                Ok(()) => {
                    metrics::counter!(
                        "checkout_background_tasks_total",
                        "task" => step.as_str(),
                        "outcome" => "success"
                    )
                    .increment(1);
                    tracing::debug!("background task completed");
                }
                Err(error) => {
                    metrics::counter!(
                        "checkout_background_tasks_total",
                        "task" => step.as_str(),
                        "outcome" => "failure"
                    )
                    .increment(1);
                    tracing::warn!(
                        reason = error.reason().as_str(),
                        error = %error,
                        "{}",
                        step.warning_note()
                    );
                }
            }
        };

        let handle = tokio::spawn(task.instrument(span));
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Returns the number of tasks not yet finished.
    pub fn pending(&self) -> usize {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }

    /// Waits until every spawned task has finished.
    pub async fn wait_idle(&self) {
        loop {
            let handles = std::mem::take(
                &mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner),
            );
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if let Err(error) = handle.await {
                    tracing::error!(%error, "background task panicked");
                }
            }
        }
    }
}
