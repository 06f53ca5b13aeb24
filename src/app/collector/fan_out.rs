//! Bounded, order-preserving, fail-fast fan-out.
//!
//! Used at both levels of a collection pass: across regions, and across describe calls
//! inside one region. With a limit of 1 work items run strictly one after another in
//! input order.

use super::errors::CollectError;
use futures::stream::{self, StreamExt};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Run `task` over `items` with at most `limit` in flight, returning outputs in input order.
///
/// Each task receives a child of `cancel`. The first failure cancels that child token so
/// in-flight siblings stop at their next call boundary and items not yet started return
/// `Cancelled` without issuing any call. The surfaced error is the lowest-index genuine
/// failure observed; `Cancelled` is only surfaced when nothing else failed.
pub(crate) async fn fan_out_fail_fast<I, T, F, Fut>(
    items: Vec<I>,
    limit: usize,
    cancel: &CancellationToken,
    task: F,
) -> Result<Vec<T>, CollectError>
where
    F: Fn(usize, I, CancellationToken) -> Fut,
    Fut: Future<Output = Result<T, CollectError>>,
{
    let total = items.len();
    let token = cancel.child_token();

    let mut results = stream::iter(items.into_iter().enumerate())
        .map(|(index, item)| {
            let work = task(index, item, token.clone());
            async move { (index, work.await) }
        })
        .buffer_unordered(limit.max(1));

    let mut slots: Vec<Option<T>> = std::iter::repeat_with(|| None).take(total).collect();
    let mut failure: Option<(usize, CollectError)> = None;

    while let Some((index, result)) = results.next().await {
        match result {
            Ok(value) => slots[index] = Some(value),
            Err(err) => {
                if failure.is_none() {
                    token.cancel();
                }
                failure = Some(match failure.take() {
                    Some(current) if !supersedes(index, &err, &current) => current,
                    _ => (index, err),
                });
            }
        }
    }

    match failure {
        Some((_, err)) => Err(err),
        None => Ok(slots.into_iter().flatten().collect()),
    }
}

/// Genuine failures beat cancellations; otherwise the lower index wins
fn supersedes(index: usize, err: &CollectError, current: &(usize, CollectError)) -> bool {
    match (err.is_cancelled(), current.1.is_cancelled()) {
        (false, true) => true,
        (true, false) => false,
        _ => index < current.0,
    }
}

/// Await `work` unless `token` is cancelled first.
///
/// Cancellation is checked before `work` is polled, so a call is never issued once the
/// pass has been cancelled.
pub(crate) async fn unless_cancelled<T>(
    token: &CancellationToken,
    region: &str,
    work: impl Future<Output = T>,
) -> Result<T, CollectError> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(CollectError::Cancelled {
            region: region.to_string(),
        }),
        output = work => Ok(output),
    }
}
