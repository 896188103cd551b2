//! Integration tests for the asynchronous object pool.
//!
//! Tests cover:
//! - Capacity under concurrent fetchers
//! - FIFO hand-off to suspended fetchers
//! - Factory failures and capacity accounting
//! - Scoped leases, discards and close
//! - Statistics

use async_trait::async_trait;
use lazy_pattern_core::error::{ErrorCode, PatternError, Result};
use lazy_pattern_core::pool::{Factory, ObjectPool, PoolConfig, Recyclable, SlotState};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_pending, assert_ready_ok, task};
use tokio_util::sync::CancellationToken;

/// Splits text on a configurable separator.
#[derive(Debug, Default)]
struct Splitter {
    separator: Option<char>,
    uses: usize,
}

impl Splitter {
    fn split(&self, text: &str) -> Vec<String> {
        match self.separator {
            Some(separator) => text.split(separator).map(str::to_string).collect(),
            None => text.split_whitespace().map(str::to_string).collect(),
        }
    }
}

impl Recyclable for Splitter {
    type Args = char;

    fn initialize(&mut self, separator: char) {
        self.separator = Some(separator);
        self.uses += 1;
    }

    fn reset(&mut self) {
        self.separator = None;
    }
}

fn splitter_pool(max_live: usize, timeout: Duration) -> Arc<ObjectPool<Splitter>> {
    Arc::new(
        ObjectPool::new(
            PoolConfig::from_fn(Splitter::default)
                .with_name("splitters")
                .with_max_live(max_live)
                .with_min_warm(0)
                .with_acquire_timeout(timeout),
        )
        .unwrap(),
    )
}

/// Fails the first `failures` calls, then succeeds.
struct FlakyFactory {
    calls: AtomicUsize,
    failures: usize,
}

#[async_trait]
impl Factory<Splitter> for FlakyFactory {
    async fn produce(&self) -> Result<Splitter> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if call < self.failures {
            Err(PatternError::internal("splitter backend unavailable"))
        } else {
            Ok(Splitter::default())
        }
    }
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_fetchers_never_exceed_max_live() {
    let pool = splitter_pool(3, Duration::from_secs(5));
    let in_use = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..24)
        .map(|i| {
            let pool = pool.clone();
            let in_use = in_use.clone();
            let peak = peak.clone();
            tokio::spawn(async move {
                let mut splitter = pool.fetch().await.unwrap();
                let now = in_use.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);

                splitter.initialize(if i % 2 == 0 { ',' } else { ';' });
                let text = if i % 2 == 0 { "a,b,c" } else { "a;b;c" };
                assert_eq!(splitter.split(text).len(), 3);
                tokio::time::sleep(Duration::from_millis(2)).await;

                in_use.fetch_sub(1, Ordering::SeqCst);
                pool.remand(splitter).unwrap();
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(pool.live_count() <= 3);
    assert_eq!(pool.leased_count(), 0);
    assert_eq!(pool.waiting_count(), 0);

    let stats = pool.stats();
    assert_eq!(stats.fetches, 24);
    assert_eq!(stats.remands, 24);
    assert!(stats.constructions <= 3);
    assert!(stats.peak_leased <= 3);

    // Every free instance was reset on return.
    assert!(pool.project(|s| s.separator.is_none()).into_iter().all(|clean| clean));
}

#[tokio::test]
async fn test_waiters_are_served_in_arrival_order() {
    let pool = splitter_pool(1, Duration::from_secs(5));
    let held = pool.fetch().await.unwrap();
    let served = Arc::new(Mutex::new(Vec::new()));

    let mut tasks = Vec::new();
    for i in 0..4 {
        let fetcher = pool.clone();
        let served = served.clone();
        tasks.push(tokio::spawn(async move {
            let splitter = fetcher.fetch().await.unwrap();
            served.lock().push(i);
            fetcher.remand(splitter).unwrap();
        }));
        // Let the fetcher enqueue before spawning the next.
        while pool.waiting_count() < i + 1 {
            tokio::task::yield_now().await;
        }
    }

    pool.remand(held).unwrap();
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(*served.lock(), vec![0, 1, 2, 3]);
    assert_eq!(pool.live_count(), 1);
    assert_eq!(pool.stats().waits, 4);
}

#[tokio::test]
async fn test_fetch_at_capacity_stays_pending_until_remand() {
    let pool = splitter_pool(1, Duration::from_secs(5));
    let held = pool.fetch().await.unwrap();

    let mut fetch = task::spawn(pool.fetch());
    assert_pending!(fetch.poll());
    assert_pending!(fetch.poll());
    assert_eq!(pool.waiting_count(), 1);

    pool.remand(held).unwrap();
    assert!(fetch.is_woken());
    let splitter = assert_ready_ok!(fetch.poll());
    assert_eq!(pool.leased_count(), 1);
    drop(splitter);
}

#[tokio::test]
async fn test_fetch_times_out_then_recovers() {
    let pool = splitter_pool(1, Duration::from_millis(20));
    let held = pool.fetch().await.unwrap();

    let error = pool.fetch().await.unwrap_err();
    assert_eq!(error.code(), ErrorCode::PoolExhausted);
    assert!(error.is_retryable());
    assert_eq!(pool.waiting_count(), 0);

    pool.remand(held).unwrap();
    let splitter = pool.fetch().await.unwrap();
    assert_eq!(pool.leased_count(), 1);
    drop(splitter);

    let stats = pool.stats();
    assert_eq!(stats.timeouts, 1);
    assert_eq!(stats.remands, 2);
}

#[tokio::test]
async fn test_cancelled_waiter_passes_its_turn() {
    let pool = splitter_pool(1, Duration::from_secs(5));
    let held = pool.fetch().await.unwrap();
    let token = CancellationToken::new();

    let impatient = {
        let pool = pool.clone();
        let token = token.clone();
        tokio::spawn(async move { pool.fetch_with_cancel(&token).await.map(|_| ()) })
    };
    while pool.waiting_count() < 1 {
        tokio::task::yield_now().await;
    }

    let patient = {
        let pool = pool.clone();
        tokio::spawn(async move { pool.fetch().await.map(|splitter| splitter.slot()) })
    };
    while pool.waiting_count() < 2 {
        tokio::task::yield_now().await;
    }

    token.cancel();
    let error = impatient.await.unwrap().unwrap_err();
    assert_eq!(error.code(), ErrorCode::FetchCancelled);

    let slot = held.slot();
    pool.remand(held).unwrap();
    assert_eq!(patient.await.unwrap().unwrap(), slot);
    assert_eq!(pool.stats().cancellations, 1);
}

// ============================================================================
// Factory Tests
// ============================================================================

#[tokio::test]
async fn test_factory_failure_releases_capacity() {
    let factory = FlakyFactory {
        calls: AtomicUsize::new(0),
        failures: 2,
    };
    let pool = ObjectPool::new(
        PoolConfig::new(factory)
            .with_name("flaky")
            .with_max_live(1)
            .with_min_warm(0)
            .with_acquire_timeout(Duration::from_millis(50)),
    )
    .unwrap();

    for _ in 0..2 {
        let error = pool.fetch().await.unwrap_err();
        assert_eq!(error.code(), ErrorCode::FactoryFailed);
        assert_eq!(pool.live_count(), 0);
    }

    let splitter = pool.fetch().await.unwrap();
    assert_eq!(pool.live_count(), 1);
    pool.remand(splitter).unwrap();

    let stats = pool.stats();
    assert_eq!(stats.construction_failures, 2);
    assert_eq!(stats.constructions, 1);
    assert_eq!(stats.timeouts, 0);
}

#[tokio::test]
async fn test_prewarm_with_async_factory() {
    let factory = FlakyFactory {
        calls: AtomicUsize::new(0),
        failures: 0,
    };
    let pool = ObjectPool::new(
        PoolConfig::new(factory)
            .with_max_live(4)
            .with_min_warm(3),
    )
    .unwrap();

    assert_eq!(pool.prewarm().await.unwrap(), 3);
    assert_eq!(pool.free_count(), 3);
    assert_eq!(pool.stats().constructions, 3);
}

#[tokio::test]
async fn test_async_closure_factory() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();
    let pool = ObjectPool::new(
        PoolConfig::new(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, PatternError>(Splitter::default())
            }
        })
        .with_max_live(2)
        .with_min_warm(2),
    )
    .unwrap();

    pool.prewarm().await.unwrap();
    let splitter = pool.fetch().await.unwrap();
    drop(splitter);

    assert_eq!(built.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Lease and Lifecycle Tests
// ============================================================================

#[tokio::test]
async fn test_lease_returns_instance_on_success_and_error() {
    let pool = splitter_pool(1, Duration::from_millis(50));

    let words = pool
        .lease(|splitter| {
            Box::pin(async move {
                splitter.initialize('-');
                Ok(splitter.split("x-y"))
            })
        })
        .await
        .unwrap();
    assert_eq!(words, vec!["x", "y"]);
    assert_eq!(pool.free_count(), 1);

    let error = pool
        .lease(|_| Box::pin(async move { Err::<(), _>(PatternError::internal("boom")) }))
        .await
        .unwrap_err();
    assert_eq!(error.code(), ErrorCode::InternalError);
    assert_eq!(pool.free_count(), 1);
    assert_eq!(pool.leased_count(), 0);

    assert_eq!(pool.project(|s| s.uses), vec![1]);
}

#[tokio::test]
async fn test_panic_inside_lease_returns_instance() {
    let pool = splitter_pool(1, Duration::from_millis(50));

    let leaser = pool.clone();
    let outcome = tokio::spawn(async move {
        leaser
            .lease(|splitter| {
                Box::pin(async move {
                    splitter.initialize(',');
                    if splitter.separator.is_some() {
                        panic!("splitter state corrupted");
                    }
                    Ok(())
                })
            })
            .await
    })
    .await;

    assert!(outcome.unwrap_err().is_panic());
    assert_eq!(pool.free_count(), 1);
    assert_eq!(pool.leased_count(), 0);
    assert_eq!(pool.project(|s| (s.separator, s.uses)), vec![(None, 1)]);

    // The returned instance serves the next lease.
    let splitter = pool.fetch().await.unwrap();
    assert_eq!(pool.stats().constructions, 1);
    pool.remand(splitter).unwrap();
}

#[tokio::test]
async fn test_discard_frees_capacity() {
    let pool = splitter_pool(1, Duration::from_millis(50));

    let splitter = pool.fetch().await.unwrap();
    let slot = splitter.slot();
    assert_eq!(pool.slot_state(slot), Some(SlotState::Leased));

    splitter.discard();
    assert_eq!(pool.slot_state(slot), None);
    assert_eq!(pool.live_count(), 0);

    let replacement = pool.fetch().await.unwrap();
    assert_ne!(replacement.slot(), slot);
    assert_eq!(pool.stats().discards, 1);
}

#[tokio::test]
async fn test_handle_from_other_pool_is_rejected() {
    let left = splitter_pool(1, Duration::from_millis(50));
    let right = splitter_pool(1, Duration::from_millis(50));

    let splitter = left.fetch().await.unwrap();
    let error = right.remand(splitter).unwrap_err();

    assert_eq!(error.code(), ErrorCode::ForeignInstance);
    // The rejected handle went home on drop.
    assert_eq!(left.free_count(), 1);
    assert_eq!(right.live_count(), 0);
}

#[tokio::test]
async fn test_close_lifecycle() {
    let pool = splitter_pool(2, Duration::from_millis(50));
    let splitter = pool.fetch().await.unwrap();

    assert_eq!(pool.close().unwrap_err().code(), ErrorCode::PoolBusy);
    assert!(!pool.is_closed());

    pool.remand(splitter).unwrap();
    pool.close().unwrap();
    assert!(pool.is_closed());
    assert_eq!(pool.live_count(), 0);

    assert_eq!(pool.fetch().await.unwrap_err().code(), ErrorCode::PoolClosed);
    assert_eq!(pool.close().unwrap_err().code(), ErrorCode::PoolClosed);
}

#[tokio::test]
async fn test_stats_serialize() {
    let pool = splitter_pool(2, Duration::from_millis(50));
    let a = pool.fetch().await.unwrap();
    let b = pool.fetch().await.unwrap();
    pool.remand(a).unwrap();

    let stats = pool.stats();
    assert_eq!(stats.live, 2);
    assert_eq!(stats.leased, 1);
    assert!((stats.utilization() - 0.5).abs() < f64::EPSILON);

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["name"], "splitters");
    assert_eq!(json["free"], 1);
    drop(b);
}
