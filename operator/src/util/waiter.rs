//! Polling until a remote object settles in a target status.
//!
//! A [`StateChange`] repeatedly refreshes a remote object and compares
//! its status against a set of pending and target statuses. Statuses
//! in neither set are terminal failures.

use super::Error;
use std::{fmt::Display, future::Future, time::Duration};
use tokio::time::sleep;

/// Number of consecutive "not found" refreshes tolerated while
/// waiting for a non-empty target.
pub const DEFAULT_NOT_FOUND_CHECKS: usize = 20;

/// First backoff interval when no fixed poll interval is set.
const INITIAL_INTERVAL: Duration = Duration::from_millis(100);

/// Backoff never grows past this.
const MAX_INTERVAL: Duration = Duration::from_secs(10);

/// Timing knobs shared by waiters and retries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Polling {
    /// Wait this long before the first refresh.
    pub delay: Duration,

    /// Lower bound for the exponential backoff interval.
    pub min_interval: Duration,

    /// Fixed interval between refreshes. Disables backoff when set.
    pub poll_interval: Option<Duration>,
}

impl Polling {
    /// Polling at a fixed interval with no initial delay.
    pub fn fixed(interval: Duration) -> Self {
        Polling {
            poll_interval: Some(interval),
            ..Default::default()
        }
    }

    /// Polls every millisecond.
    #[cfg(test)]
    pub fn immediate() -> Self {
        Polling::fixed(Duration::from_millis(1))
    }

    /// The wait before attempt number `attempt` (zero-based).
    pub fn interval(&self, attempt: u32) -> Duration {
        if let Some(fixed) = self.poll_interval {
            return fixed;
        }
        INITIAL_INTERVAL
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(MAX_INTERVAL)
            .max(self.min_interval)
    }
}

/// A single refresh of a remote object.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation<T, S> {
    pub value: T,
    pub status: S,

    /// Failure reason reported alongside the status, if any.
    pub reason: Option<String>,
}

impl<T, S> Observation<T, S> {
    pub fn new(value: T, status: S) -> Self {
        Observation {
            value,
            status,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason;
        self
    }
}

/// Waits for a remote object to move from one of the `pending`
/// statuses into one of the `target` statuses.
#[derive(Clone, Debug)]
pub struct StateChange<S> {
    pub pending: Vec<S>,
    pub target: Vec<S>,
    pub timeout: Duration,

    /// Initial delay, backoff floor and fixed interval.
    pub polling: Polling,
    pub not_found_checks: usize,
    pub continuous_target_occurrence: usize,
}

impl<S> StateChange<S>
where
    S: PartialEq + Clone + Display,
{
    pub fn new(pending: Vec<S>, target: Vec<S>, timeout: Duration) -> Self {
        StateChange {
            pending,
            target,
            timeout,
            polling: Polling::default(),
            not_found_checks: DEFAULT_NOT_FOUND_CHECKS,
            continuous_target_occurrence: 1,
        }
    }

    pub fn polling(mut self, polling: &Polling) -> Self {
        self.polling = polling.clone();
        self
    }

    pub fn not_found_checks(mut self, checks: usize) -> Self {
        self.not_found_checks = checks;
        self
    }

    /// Number of consecutive refreshes that must report a target
    /// status before the wait succeeds.
    pub fn continuous_target_occurrence(mut self, occurrences: usize) -> Self {
        self.continuous_target_occurrence = occurrences.max(1);
        self
    }

    /// Polls `refresh` until a target status is observed, returning the
    /// last refreshed value. `refresh` yields `None` when the object does
    /// not exist; with an empty target that is success and the result
    /// is `None`.
    pub async fn until<T, F, Fut>(&self, mut refresh: F) -> Result<Option<T>, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<Observation<T, S>>, Error>>,
    {
        let mut last_state: Option<String> = None;
        let outcome =
            tokio::time::timeout(self.timeout, self.poll(&mut refresh, &mut last_state)).await;
        match outcome {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout {
                last_state: last_state.unwrap_or_else(|| "unknown".to_owned()),
                expected: self.expected(),
            }),
        }
    }

    /// Like [`StateChange::until`], for waits with a non-empty target
    /// where the object must exist at the end.
    pub async fn until_target<T, F, Fut>(&self, refresh: F) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<Observation<T, S>>, Error>>,
    {
        self.until(refresh).await?.ok_or_else(|| {
            Error::EmptyResult(format!("nothing to return after waiting for '{}'", self.expected()))
        })
    }

    async fn poll<T, F, Fut>(
        &self,
        refresh: &mut F,
        last_state: &mut Option<String>,
    ) -> Result<Option<T>, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<Observation<T, S>>, Error>>,
    {
        if !self.polling.delay.is_zero() {
            sleep(self.polling.delay).await;
        }
        let mut not_found = 0;
        let mut target_hits = 0;
        let mut attempt = 0;
        loop {
            match refresh().await? {
                None if self.target.is_empty() => return Ok(None),
                None => {
                    target_hits = 0;
                    not_found += 1;
                    if not_found > self.not_found_checks {
                        return Err(Error::NotFound(format!(
                            "still missing after {} checks while waiting for '{}'",
                            self.not_found_checks,
                            self.expected()
                        )));
                    }
                }
                Some(observation) => {
                    not_found = 0;
                    *last_state = Some(observation.status.to_string());
                    if self.target.contains(&observation.status) {
                        target_hits += 1;
                        if target_hits >= self.continuous_target_occurrence {
                            return Ok(Some(observation.value));
                        }
                    } else if self.pending.contains(&observation.status) {
                        target_hits = 0;
                    } else {
                        return Err(Error::UnexpectedState {
                            state: observation.status.to_string(),
                            expected: self.expected(),
                            reason: observation.reason,
                        });
                    }
                }
            }
            sleep(self.polling.interval(attempt)).await;
            attempt += 1;
        }
    }

    fn expected(&self) -> String {
        if self.target.is_empty() {
            return "<deleted>".to_owned();
        }
        self.target
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
