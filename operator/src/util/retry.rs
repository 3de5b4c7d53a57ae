use super::{waiter::Polling, Error};
use std::{future::Future, time::Duration};
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Re-invokes `op` with exponential backoff for as long as `predicate`
/// accepts the error and `timeout` has not elapsed. The last error is
/// returned once either condition fails.
pub async fn retry_when<T, F, Fut, P>(timeout: Duration, op: F, predicate: P) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
    P: Fn(&Error) -> bool,
{
    retry_when_with(&Polling::default(), timeout, op, predicate).await
}

/// [`retry_when`] with explicit polling intervals.
pub async fn retry_when_with<T, F, Fut, P>(
    polling: &Polling,
    timeout: Duration,
    mut op: F,
    predicate: P,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
    P: Fn(&Error) -> bool,
{
    let deadline = Instant::now() + timeout;
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if predicate(&err) && Instant::now() < deadline => {
                let wait = polling
                    .interval(attempt)
                    .min(deadline.saturating_duration_since(Instant::now()));
                debug!(attempt, error = %err, "retrying after {:?}", wait);
                sleep(wait).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Retries `find` until it returns a value, for reads that follow a
/// create before the new object is visible. Fails with
/// [`Error::EmptyResult`] if it never shows up.
pub async fn retry_when_not_found<T, F, Fut>(
    polling: &Polling,
    timeout: Duration,
    mut find: F,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, Error>>,
{
    retry_when_with(
        polling,
        timeout,
        || {
            let found = find();
            async move {
                found
                    .await?
                    .ok_or_else(|| Error::EmptyResult("not visible yet".to_owned()))
            }
        },
        Error::is_not_found,
    )
    .await
}
