//! Per-request call context passed to every collaborator.

use std::time::Duration;

use tokio::time::Instant;

/// Correlation id and absolute deadline of one inbound checkout request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    correlation_id: String,
    deadline: Instant,
}

impl RequestContext {
    /// Creates a context whose deadline is `budget` from now.
    pub fn new(correlation_id: impl Into<String>, budget: Duration) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            deadline: Instant::now() + budget,
        }
    }

    /// Context for a follow-up that outlives the request: same correlation
    /// id, deadline `budget` from now.
    pub fn detached(&self, budget: Duration) -> Self {
        Self::new(self.correlation_id.clone(), budget)
    }

    /// Id forwarded to collaborators and attached to every log line.
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }
}
