//! Bounded-concurrency fan-out with per-task failure isolation.
//!
//! Both the fetch and the enrichment stages fire one task per input, keep at
//! most `limit` of them in flight, and collect every outcome tagged with the
//! key of the input it came from. A failing task never affects its siblings.

use crate::pressure::{NoopMonitor, ResourceMonitor};
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Outcome of one task, tagged with the key of its input.
#[derive(Debug)]
pub struct Attributed<K, T, E> {
    /// Key of the originating input
    pub key: K,
    /// What the task produced
    pub outcome: Result<T, E>,
}

/// Everything a fan-out produced.
#[derive(Debug)]
pub struct FanOutReport<K, T, E> {
    /// One entry per launched task, in completion order
    pub outcomes: Vec<Attributed<K, T, E>>,
    /// Keys of inputs never launched because the run was cancelled
    pub not_started: Vec<K>,
}

impl<K, T, E> FanOutReport<K, T, E> {
    /// Number of successful tasks.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|a| a.outcome.is_ok()).count()
    }

    /// Number of failed tasks.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.outcomes.len() - self.success_count()
    }

    /// Split into successes and attributed failures.
    #[must_use]
    pub fn partition(self) -> (Vec<(K, T)>, Vec<(K, E)>) {
        let mut successes = Vec::new();
        let mut failures = Vec::new();
        for Attributed { key, outcome } in self.outcomes {
            match outcome {
                Ok(value) => successes.push((key, value)),
                Err(err) => failures.push((key, err)),
            }
        }
        (successes, failures)
    }
}

/// Launch policy shared by the concurrent stages.
#[derive(Clone)]
pub struct FanOut {
    limit: usize,
    cancel: CancellationToken,
    monitor: Arc<dyn ResourceMonitor>,
    memory_threshold_percent: f64,
    check_interval: Duration,
}

impl std::fmt::Debug for FanOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOut")
            .field("limit", &self.limit)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("memory_threshold_percent", &self.memory_threshold_percent)
            .field("check_interval", &self.check_interval)
            .finish_non_exhaustive()
    }
}

impl FanOut {
    /// A fan-out with at most `limit` tasks in flight (at least one).
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            cancel: CancellationToken::new(),
            monitor: Arc::new(NoopMonitor),
            memory_threshold_percent: 100.0,
            check_interval: Duration::from_secs(1),
        }
    }

    /// Stop launching new tasks once `cancel` is triggered.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Hold back new launches while memory usage exceeds `threshold_percent`.
    #[must_use]
    pub fn with_resource_budget(
        mut self,
        monitor: Arc<dyn ResourceMonitor>,
        threshold_percent: f64,
        check_interval: Duration,
    ) -> Self {
        self.monitor = monitor;
        self.memory_threshold_percent = threshold_percent;
        self.check_interval = check_interval;
        self
    }

    /// Maximum number of tasks in flight.
    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    fn under_pressure(&self) -> bool {
        match self.monitor.memory_usage_percent() {
            Some(used) if used > self.memory_threshold_percent => {
                warn!(
                    used_percent = used,
                    threshold_percent = self.memory_threshold_percent,
                    "memory pressure, holding back new tasks"
                );
                true
            }
            _ => false,
        }
    }

    /// Run `task` for every input and collect the attributed outcomes.
    ///
    /// Launches wait while `limit` tasks are in flight, and while memory is
    /// over budget with at least one task in flight; with nothing in flight a
    /// task is always launched. After cancellation no new task starts, but
    /// tasks already in flight run to completion.
    pub async fn run<I, K, T, E, KF, F, Fut>(
        &self,
        inputs: Vec<I>,
        key_of: KF,
        task: F,
    ) -> FanOutReport<K, T, E>
    where
        KF: Fn(&I) -> K,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let total = inputs.len();
        let mut pending = inputs.into_iter().peekable();
        let mut in_flight = FuturesUnordered::new();
        let mut outcomes = Vec::with_capacity(total);

        loop {
            let mut throttled = false;
            while in_flight.len() < self.limit
                && pending.peek().is_some()
                && !self.cancel.is_cancelled()
            {
                if !in_flight.is_empty() && self.under_pressure() {
                    throttled = true;
                    break;
                }
                if let Some(input) = pending.next() {
                    let key = key_of(&input);
                    let fut = task(input);
                    in_flight.push(async move {
                        Attributed {
                            key,
                            outcome: fut.await,
                        }
                    });
                }
            }

            if in_flight.is_empty() {
                break;
            }

            if throttled {
                tokio::select! {
                    Some(done) = in_flight.next() => outcomes.push(done),
                    () = tokio::time::sleep(self.check_interval) => {}
                }
            } else if let Some(done) = in_flight.next().await {
                outcomes.push(done);
            }
        }

        let not_started: Vec<K> = pending.map(|input| key_of(&input)).collect();
        if !not_started.is_empty() {
            warn!(
                skipped = not_started.len(),
                "cancelled, remaining tasks not started"
            );
        }
        debug!(total, completed = outcomes.len(), "fan-out finished");

        FanOutReport {
            outcomes,
            not_started,
        }
    }
}
