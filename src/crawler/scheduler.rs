//! Scheduling of concurrent crawl work
//!
//! This module handles:
//! - An optional global bound on in-flight network operations
//! - Joining a page's child branches under a failure policy
//!
//! Branches are spawned as tokio tasks, one per child page. The limiter only
//! guards individual network operations, so a parent waiting on its children
//! never holds a permit.

use crate::config::FailurePolicy;
use crate::HarvestError;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;

/// Limits how many network operations run at once
///
/// Cloning shares the same permits.
#[derive(Debug, Clone, Default)]
pub struct RequestLimiter {
    semaphore: Option<Arc<Semaphore>>,
}

impl RequestLimiter {
    /// Creates a limiter; `None` means unbounded
    pub fn new(max_concurrent: Option<u32>) -> Self {
        Self {
            semaphore: max_concurrent.map(|max| Arc::new(Semaphore::new(max as usize))),
        }
    }

    /// A limiter that never waits
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Waits for a permit
    ///
    /// The permit is released when the returned value is dropped. Unbounded
    /// limiters return `None` immediately.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        match &self.semaphore {
            Some(semaphore) => Arc::clone(semaphore).acquire_owned().await.ok(),
            None => None,
        }
    }

    /// Permits currently available, if bounded
    pub fn available(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }
}

/// A crawl branch that ended in an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchFailure {
    /// Page path or resource URL the branch was working on
    pub target: String,

    /// Rendered error
    pub error: String,
}

/// Outcome reported by a spawned branch: its target and result
pub type BranchOutcome = (String, Result<(), HarvestError>);

/// Waits for every branch in `branches`
///
/// # Failure Handling
///
/// | Policy | On a failed branch |
/// |--------|--------------------|
/// | `FailFast` | abort all remaining siblings and return the error |
/// | `Isolate` | pass a [`BranchFailure`] to `record` and keep waiting |
///
/// A branch that panics is treated like a failed branch.
pub async fn join_branches<F>(
    mut branches: JoinSet<BranchOutcome>,
    policy: FailurePolicy,
    mut record: F,
) -> Result<(), HarvestError>
where
    F: FnMut(BranchFailure),
{
    while let Some(joined) = branches.join_next().await {
        let (target, result) = match joined {
            Ok(outcome) => outcome,
            Err(e) => ("<unknown>".to_string(), Err(HarvestError::Task(e.to_string()))),
        };

        let Err(error) = result else {
            continue;
        };

        match policy {
            FailurePolicy::FailFast => {
                tracing::debug!(
                    "Branch {} failed, cancelling {} sibling(s)",
                    target,
                    branches.len()
                );
                branches.abort_all();
                return Err(error);
            }
            FailurePolicy::Isolate => {
                tracing::warn!("Branch {} failed: {}", target, error);
                record(BranchFailure {
                    target,
                    error: error.to_string(),
                });
            }
        }
    }

    Ok(())
}
