//! Injectable failure policies for simulated collaborators.
//!
//! A collaborator that fails a fixed share of its calls asks its policy on
//! every call instead of rolling dice inline, so tests can swap in a
//! deterministic policy.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// Decides whether the next call handled by a collaborator should fail.
pub trait FailurePolicy: Send + Sync + std::fmt::Debug {
    /// Returns true if the current call should fail.
    fn should_fail(&self) -> bool;
}

/// Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverFail;

impl FailurePolicy for NeverFail {
    fn should_fail(&self) -> bool {
        false
    }
}

/// Always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysFail;

impl FailurePolicy for AlwaysFail {
    fn should_fail(&self) -> bool {
        true
    }
}

/// Failure rate outside `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("invalid failure rate: must be 0.0-1.0, got {0}")]
pub struct InvalidFailureRate(pub f64);

/// Fails each call independently with a fixed probability.
#[derive(Debug)]
pub struct ProbabilisticFailure {
    rate: f64,
    rng: Mutex<StdRng>,
}

impl ProbabilisticFailure {
    /// Creates a policy seeded from the operating system.
    pub fn new(rate: f64) -> Result<Self, InvalidFailureRate> {
        Self::with_rng(rate, StdRng::from_os_rng())
    }

    /// Creates a policy with a fixed seed for reproducible runs.
    pub fn seeded(rate: f64, seed: u64) -> Result<Self, InvalidFailureRate> {
        Self::with_rng(rate, StdRng::seed_from_u64(seed))
    }

    fn with_rng(rate: f64, rng: StdRng) -> Result<Self, InvalidFailureRate> {
        if !(0.0..=1.0).contains(&rate) {
            return Err(InvalidFailureRate(rate));
        }
        Ok(Self {
            rate,
            rng: Mutex::new(rng),
        })
    }

    /// Returns the configured failure rate.
    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl FailurePolicy for ProbabilisticFailure {
    fn should_fail(&self) -> bool {
        if self.rate <= 0.0 {
            return false;
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.random::<f64>() < self.rate
    }
}
