//! Bounded fan-out with a soft completion deadline.
//!
//! Sub-tasks are spawned onto the runtime and gated by a shared semaphore, so
//! at most `size` of them touch the stores at once. The caller waits for each
//! one until `submitted_at + timeout`; a sub-task that misses its deadline is
//! not cancelled, its result is simply replaced by the caller's fallback.

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{Instant, timeout_at};
use tracing::{error, warn};

use crate::error::{IdentityError, IdentityResult};

#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl WorkerPool {
    pub fn new(size: usize, timeout: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size.max(1))),
            timeout,
        }
    }

    /// Run every task and collect `(key, value)` pairs in submission order.
    ///
    /// A task past its deadline yields `fallback()`. A task that fails or
    /// panics fails the whole fan-out; tasks still running keep running.
    pub async fn fan_out<K, T, Fut>(
        &self,
        stage: &'static str,
        tasks: Vec<(K, Fut)>,
        fallback: impl Fn() -> T,
    ) -> IdentityResult<Vec<(K, T)>>
    where
        K: Debug,
        T: Send + 'static,
        Fut: Future<Output = IdentityResult<T>> + Send + 'static,
    {
        let mut pending = Vec::with_capacity(tasks.len());

        for (key, task) in tasks {
            let permits = Arc::clone(&self.permits);
            let deadline = Instant::now() + self.timeout;
            let handle = tokio::spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|_| IdentityError::Internal("worker pool is closed".to_string()))?;
                task.await
            });
            pending.push((key, deadline, handle));
        }

        let mut results = Vec::with_capacity(pending.len());
        for (key, deadline, handle) in pending {
            match timeout_at(deadline, handle).await {
                Ok(Ok(Ok(value))) => results.push((key, value)),
                Ok(Ok(Err(e))) => {
                    error!("{} task for {:?} failed: {}", stage, key, e);
                    return Err(e);
                }
                Ok(Err(join_error)) => {
                    error!("{} task for {:?} aborted: {}", stage, key, join_error);
                    return Err(IdentityError::Internal(format!(
                        "{} task aborted: {}",
                        stage, join_error
                    )));
                }
                Err(_) => {
                    warn!(
                        "{} task for {:?} exceeded {:?}, using fallback",
                        stage, key, self.timeout
                    );
                    results.push((key, fallback()));
                }
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_results_follow_submission_order() {
        let pool = WorkerPool::new(5, Duration::from_secs(1));
        let tasks: Vec<_> = (0..4u64)
            .map(|i| {
                (i, async move {
                    tokio::time::sleep(Duration::from_millis(40 - i * 10)).await;
                    Ok(i * 10)
                })
            })
            .collect();

        let results = assert_ok!(pool.fan_out("test", tasks, || 0).await);
        assert_eq!(results, vec![(0, 0), (1, 10), (2, 20), (3, 30)]);
    }

    #[tokio::test]
    async fn test_slow_tasks_fall_back_without_cancellation() {
        let pool = WorkerPool::new(2, Duration::from_millis(30));
        let finished = Arc::new(AtomicUsize::new(0));

        let task = |delay_ms: u64, value: i32| {
            let finished = Arc::clone(&finished);
            async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(vec![value])
            }
        };
        let tasks = vec![("fast", task(0, 1)), ("slow", task(120, 2))];

        let results = assert_ok!(pool.fan_out("test", tasks, Vec::new).await);
        assert_eq!(results, vec![("fast", vec![1]), ("slow", vec![])]);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_propagate() {
        let pool = WorkerPool::new(1, Duration::from_secs(1));
        let tasks = vec![(1, async {
            Err::<u8, _>(IdentityError::Internal("boom".to_string()))
        })];

        let result = pool.fan_out("test", tasks, || 0).await;
        assert!(matches!(result, Err(IdentityError::Internal(_))));
    }

    #[tokio::test]
    async fn test_pool_bounds_concurrency() {
        let pool = WorkerPool::new(2, Duration::from_secs(2));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..6)
            .map(|i| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                (i, async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();

        assert_ok!(pool.fan_out("test", tasks, || ()).await);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
