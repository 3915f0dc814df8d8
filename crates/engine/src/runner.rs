//! Bounded-concurrency fan-out of independent work items.
//!
//! [`BoundedRunner::run`] maps `N` items to `N` [`Completion`]s with at most
//! `limit` workers in flight. A permit is acquired *before* a worker is
//! spawned, so submitting the `limit + 1`-th item waits for a running one to
//! finish instead of queueing without bound.
//!
//! Workers never share state with each other or with the caller: each returns
//! its [`Outcome`] by value and the runner's join loop is the only place
//! completions are collected. A panicking worker becomes a failure for its own
//! item; its siblings keep running.

use std::any::Any;
use std::future::Future;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use migration::{MigrationError, Outcome};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Concurrency used when the caller does not configure one.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// The result for one input item, tagged with the item's input position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion<V> {
    pub index: usize,
    pub outcome: Outcome<V>,
}

/// Fixed-size worker pool.
#[derive(Debug, Clone, Copy)]
pub struct BoundedRunner {
    limit: NonZeroUsize,
}

impl BoundedRunner {
    /// Creates a runner allowing `limit` concurrent workers.
    ///
    /// Returns a configuration error when `limit` is zero.
    pub fn new(limit: usize) -> Result<Self, MigrationError> {
        NonZeroUsize::new(limit)
            .map(|limit| Self { limit })
            .ok_or_else(|| MigrationError::Configuration {
                message: "max concurrency must be at least 1".to_owned(),
            })
    }

    pub fn limit(&self) -> usize {
        self.limit.get()
    }

    /// Runs `worker` over every item and waits for all of them.
    ///
    /// Exactly one completion is returned per item. Completion order follows
    /// finishing order, not input order; use [`Completion::index`] to match
    /// results to inputs.
    pub async fn run<T, V, F, Fut>(&self, items: Vec<T>, mut worker: F) -> Vec<Completion<V>>
    where
        V: Send + 'static,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Outcome<V>> + Send + 'static,
    {
        let total = items.len();
        let permits = Arc::new(Semaphore::new(self.limit.get()));
        let mut tasks = JoinSet::new();
        let mut completions = Vec::with_capacity(total);
        let mut finished = vec![false; total];

        for (index, item) in items.into_iter().enumerate() {
            let permit = match Arc::clone(&permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    // The semaphore is never closed while this function holds it.
                    finished[index] = true;
                    completions.push(Completion {
                        index,
                        outcome: Outcome::failure("worker pool closed"),
                    });
                    continue;
                }
            };

            let work = match std::panic::catch_unwind(AssertUnwindSafe(|| worker(item))) {
                Ok(work) => work,
                Err(panic) => {
                    finished[index] = true;
                    completions.push(Completion {
                        index,
                        outcome: panicked(index, panic.as_ref()),
                    });
                    continue;
                }
            };

            tasks.spawn(async move {
                let _permit = permit;
                let outcome = match AssertUnwindSafe(work).catch_unwind().await {
                    Ok(outcome) => outcome,
                    Err(panic) => panicked(index, panic.as_ref()),
                };
                (index, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    finished[index] = true;
                    completions.push(Completion { index, outcome });
                }
                Err(e) => error!(error = %e, "worker task did not complete"),
            }
        }

        // A task can only vanish if the runtime cancelled it; it still owes
        // its item an outcome.
        for (index, done) in finished.into_iter().enumerate() {
            if !done {
                completions.push(Completion {
                    index,
                    outcome: Outcome::failure("worker was cancelled"),
                });
            }
        }

        debug!(total, limit = self.limit.get(), "all workers joined");
        completions
    }
}

impl Default for BoundedRunner {
    fn default() -> Self {
        Self {
            limit: NonZeroUsize::new(DEFAULT_CONCURRENCY).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

fn panicked<V>(index: usize, panic: &(dyn Any + Send)) -> Outcome<V> {
    let message = panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned());
    error!(index, %message, "worker panicked");
    Outcome::Failure(format!("worker panicked: {message}"))
}
