//! Bounded fan-out.

use std::future::Future;

use futures::future::join_all;
use tokio::sync::Semaphore;

/// Run `futures` with at most `limit` in flight and return their outputs in
/// input order.
pub async fn gated_join<I, F, T>(limit: usize, futures: I) -> Vec<T>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = T>,
{
    let semaphore = Semaphore::new(limit.max(1));
    let semaphore = &semaphore;

    join_all(futures.into_iter().map(|fut| async move {
        // the semaphore is never closed, so acquire cannot fail
        let _permit = semaphore.acquire().await.ok();
        fut.await
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn preserves_input_order() {
        let out = gated_join(
            3,
            (0..6u64).map(|i| async move {
                // later items finish first
                tokio::time::sleep(Duration::from_millis(30 - i * 5)).await;
                i
            }),
        )
        .await;
        assert_eq!(out, vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn never_exceeds_limit() {
        let in_flight = &AtomicUsize::new(0);
        let peak = &AtomicUsize::new(0);

        gated_join(
            2,
            (0..8).map(|_| async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }),
        )
        .await;

        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_limit_still_makes_progress() {
        let out = gated_join(0, (1..=2).map(|i| async move { i })).await;
        assert_eq!(out, vec![1, 2]);
    }
}
