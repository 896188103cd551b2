//! Object Pool - bounded, asynchronous recycling of expensive instances.
//!
//! The `ObjectPool` provides:
//! - A hard ceiling on live instances (free + leased + under construction)
//! - FIFO reuse of free instances and FIFO service of suspended fetchers
//! - Direct hand-off of returned instances to the longest waiter
//! - RAII lease handles that return themselves when dropped
//! - Pool statistics and monitoring
//!
//! All bookkeeping lives behind one `parking_lot::Mutex` that is never held
//! across an `.await`, a factory call or a `reset()`.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use metrics::{counter, gauge, histogram};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::config::PoolConfig;
use super::recyclable::Recyclable;
use crate::error::{PatternError, Result};

// =============================================================================
// Slots
// =============================================================================

/// Identity of one pooled instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId(Uuid);

impl SlotId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a live slot. Destroyed slots leave the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Free,
    Leased,
}

/// What a returning instance or released reservation hands to a waiter.
enum Grant<T> {
    /// A ready instance, already marked leased
    Instance(SlotId, T),
    /// A construction reservation, already counted in `constructing`
    Capacity,
}

struct Waiter<T> {
    id: u64,
    tx: oneshot::Sender<Grant<T>>,
}

struct SlotTable<T> {
    /// Free instances, longest-idle first
    free: VecDeque<(SlotId, T)>,
    /// State of every live slot
    slots: HashMap<SlotId, SlotState>,
    /// Reserved capacity for constructions in flight
    constructing: usize,
    /// Suspended fetchers in arrival order
    waiters: VecDeque<Waiter<T>>,
    next_waiter: u64,
    closed: bool,
}

impl<T> SlotTable<T> {
    fn new() -> Self {
        Self {
            free: VecDeque::new(),
            slots: HashMap::new(),
            constructing: 0,
            waiters: VecDeque::new(),
            next_waiter: 0,
            closed: false,
        }
    }

    fn live(&self) -> usize {
        self.slots.len() + self.constructing
    }

    fn leased(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Hand `grant` to the oldest waiter still listening, or park it.
    ///
    /// A waiter whose receiver is gone gets skipped and the grant moves on.
    fn dispatch(&mut self, mut grant: Grant<T>) {
        while let Some(waiter) = self.waiters.pop_front() {
            if let Grant::Instance(slot, _) = &grant {
                self.slots.insert(*slot, SlotState::Leased);
            }

            match waiter.tx.send(grant) {
                Ok(()) => return,
                Err(returned) => grant = returned,
            }
        }

        match grant {
            Grant::Instance(slot, instance) => {
                self.slots.insert(slot, SlotState::Free);
                self.free.push_back((slot, instance));
            }
            Grant::Capacity => {
                self.constructing = self.constructing.saturating_sub(1);
            }
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Internal statistics tracking.
struct PoolStats {
    fetches: AtomicU64,
    immediate_hits: AtomicU64,
    constructions: AtomicU64,
    construction_failures: AtomicU64,
    waits: AtomicU64,
    timeouts: AtomicU64,
    cancellations: AtomicU64,
    remands: AtomicU64,
    discards: AtomicU64,
    destroyed: AtomicU64,
    /// Total time fetchers spent suspended (microseconds)
    total_wait_time_us: AtomicU64,
    peak_leased: AtomicUsize,
}

impl PoolStats {
    fn new() -> Self {
        Self {
            fetches: AtomicU64::new(0),
            immediate_hits: AtomicU64::new(0),
            constructions: AtomicU64::new(0),
            construction_failures: AtomicU64::new(0),
            waits: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            cancellations: AtomicU64::new(0),
            remands: AtomicU64::new(0),
            discards: AtomicU64::new(0),
            destroyed: AtomicU64::new(0),
            total_wait_time_us: AtomicU64::new(0),
            peak_leased: AtomicUsize::new(0),
        }
    }

    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_wait(&self, wait_time: Duration) {
        self.total_wait_time_us
            .fetch_add(wait_time.as_micros() as u64, Ordering::Relaxed);
    }
}

// =============================================================================
// Shared State
// =============================================================================

struct Shared<T: Recyclable> {
    config: PoolConfig<T>,
    table: Mutex<SlotTable<T>>,
    stats: PoolStats,
}

impl<T: Recyclable> Shared<T> {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn publish_leased(&self, leased: usize) {
        self.stats.peak_leased.fetch_max(leased, Ordering::Relaxed);
        gauge!("lazy_pattern_pool_leased", "pool" => self.config.name.clone()).set(leased as f64);
    }

    fn record_fetch(&self, outcome: &'static str) {
        counter!(
            "lazy_pattern_pool_fetch_total",
            "pool" => self.config.name.clone(),
            "outcome" => outcome
        )
        .increment(1);
    }

    fn ensure_leased(&self, table: &SlotTable<T>, slot: SlotId) -> Result<()> {
        match table.slots.get(&slot) {
            Some(SlotState::Leased) => Ok(()),
            Some(SlotState::Free) => Err(PatternError::double_release(self.name(), slot)),
            None => Err(PatternError::foreign_instance(self.name(), slot)),
        }
    }

    /// Reset a leased instance and make it available again.
    ///
    /// A rejected instance is dropped without being reset.
    fn release(&self, slot: SlotId, mut instance: T) -> Result<()> {
        self.ensure_leased(&self.table.lock(), slot)?;

        instance.reset();

        let leased = {
            let mut table = self.table.lock();
            self.ensure_leased(&table, slot)?;
            table.dispatch(Grant::Instance(slot, instance));
            table.leased()
        };

        PoolStats::bump(&self.stats.remands);
        self.publish_leased(leased);

        tracing::debug!(pool_name = %self.name(), slot = %slot, "Instance returned");
        Ok(())
    }

    /// Destroy a leased instance and pass its capacity on.
    fn destroy_leased(&self, slot: SlotId, instance: T) {
        drop(instance);

        let leased = {
            let mut table = self.table.lock();
            if table.slots.remove(&slot).is_none() {
                return;
            }
            table.constructing += 1;
            table.dispatch(Grant::Capacity);
            table.leased()
        };

        PoolStats::bump(&self.stats.discards);
        PoolStats::bump(&self.stats.destroyed);
        self.publish_leased(leased);

        tracing::debug!(pool_name = %self.name(), slot = %slot, "Instance discarded");
    }

    /// Register a constructed instance as leased, consuming its reservation.
    fn admit_leased(&self, reservation: Reservation<'_, T>) -> SlotId {
        let slot = SlotId::new();
        let leased = {
            let mut table = self.table.lock();
            reservation.consume(&mut table);
            table.slots.insert(slot, SlotState::Leased);
            table.leased()
        };

        self.publish_leased(leased);
        slot
    }

    /// Register a constructed instance as free, consuming its reservation.
    fn admit_free(&self, reservation: Reservation<'_, T>, instance: T) {
        let leased = {
            let mut table = self.table.lock();
            reservation.consume(&mut table);
            table.dispatch(Grant::Instance(SlotId::new(), instance));
            table.leased()
        };

        self.publish_leased(leased);
    }

    async fn construct(&self) -> Result<T> {
        match self.config.factory.produce().await {
            Ok(instance) => {
                PoolStats::bump(&self.stats.constructions);
                counter!("lazy_pattern_pool_constructed_total", "pool" => self.config.name.clone())
                    .increment(1);
                Ok(instance)
            }
            Err(error) => {
                PoolStats::bump(&self.stats.construction_failures);
                tracing::warn!(pool_name = %self.name(), error = %error, "Factory failed");
                Err(PatternError::factory_failed_by(self.name(), error))
            }
        }
    }
}

/// Capacity reserved for one construction. Dropping it unconsumed hands the
/// capacity to the next waiter or releases it.
struct Reservation<'a, T: Recyclable> {
    shared: &'a Shared<T>,
    armed: bool,
}

impl<'a, T: Recyclable> Reservation<'a, T> {
    /// Wrap capacity that was already counted in `constructing`.
    fn held(shared: &'a Shared<T>) -> Self {
        Self { shared, armed: true }
    }

    fn consume(mut self, table: &mut SlotTable<T>) {
        self.armed = false;
        table.constructing = table.constructing.saturating_sub(1);
    }
}

impl<T: Recyclable> Drop for Reservation<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.table.lock().dispatch(Grant::Capacity);
        }
    }
}

/// A queued fetcher. Dropping it leaves the queue and re-dispatches anything
/// that was handed over in the meantime.
struct WaitTicket<'a, T: Recyclable> {
    shared: &'a Shared<T>,
    id: u64,
    rx: oneshot::Receiver<Grant<T>>,
    settled: bool,
}

impl<T: Recyclable> WaitTicket<'_, T> {
    /// Leave the queue. Returns a grant that raced with the withdrawal.
    fn withdraw(&mut self) -> Option<Grant<T>> {
        self.settled = true;

        let mut table = self.shared.table.lock();
        table.waiters.retain(|waiter| waiter.id != self.id);
        self.rx.close();
        self.rx.try_recv().ok()
    }
}

impl<T: Recyclable> Drop for WaitTicket<'_, T> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Some(grant) = self.withdraw() {
            self.shared.table.lock().dispatch(grant);
        }
    }
}

enum Acquire<T> {
    Ready(SlotId, T, usize),
    Construct,
    Wait(u64, oneshot::Receiver<Grant<T>>),
}

enum WaitOutcome<T> {
    Granted(Grant<T>),
    TimedOut,
    Cancelled,
    Closed,
}

// =============================================================================
// Lease Handle
// =============================================================================

/// An instance on lease. Dereferences to `T`; dropping it returns the
/// instance to its pool as [`ObjectPool::remand`] would.
pub struct Pooled<T: Recyclable> {
    instance: Option<T>,
    slot: SlotId,
    shared: Arc<Shared<T>>,
}

impl<T: Recyclable> Pooled<T> {
    /// Slot this instance occupies.
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Name of the owning pool.
    pub fn pool_name(&self) -> &str {
        self.shared.name()
    }

    /// Destroy the instance instead of returning it. The freed capacity
    /// goes to the next waiter.
    pub fn discard(mut self) {
        if let Some(instance) = self.instance.take() {
            self.shared.destroy_leased(self.slot, instance);
        }
    }
}

impl<T: Recyclable> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.instance.as_ref().expect("instance present until the handle is consumed")
    }
}

impl<T: Recyclable> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.instance.as_mut().expect("instance present until the handle is consumed")
    }
}

impl<T: Recyclable> Drop for Pooled<T> {
    fn drop(&mut self) {
        if let Some(instance) = self.instance.take() {
            if let Err(error) = self.shared.release(self.slot, instance) {
                error.log();
            }
        }
    }
}

impl<T: Recyclable> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("pool", &self.shared.name())
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Object Pool
// =============================================================================

/// Manages a bounded set of reusable instances.
pub struct ObjectPool<T: Recyclable> {
    shared: Arc<Shared<T>>,
    /// When the pool was created
    created_at: Instant,
}

impl<T: Recyclable> ObjectPool<T> {
    /// Create a new pool. Nothing is constructed until `prewarm()` or `fetch()`.
    pub fn new(config: PoolConfig<T>) -> Result<Self> {
        config.validate()?;

        tracing::info!(
            pool_name = %config.name,
            min_warm = config.min_warm,
            max_live = config.max_live,
            acquire_timeout_ms = config.acquire_timeout.as_millis() as u64,
            "Object pool created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                table: Mutex::new(SlotTable::new()),
                stats: PoolStats::new(),
            }),
            created_at: Instant::now(),
        })
    }

    /// Construct instances until the live count reaches `min_warm`.
    ///
    /// Returns the number of instances created.
    pub async fn prewarm(&self) -> Result<usize> {
        let needed = {
            let mut table = self.shared.table.lock();
            if table.closed {
                return Err(PatternError::pool_closed(self.name()));
            }
            let needed = self.shared.config.min_warm.saturating_sub(table.live());
            table.constructing += needed;
            needed
        };

        let mut reservations: VecDeque<Reservation<'_, T>> =
            (0..needed).map(|_| Reservation::held(&self.shared)).collect();

        while let Some(reservation) = reservations.pop_front() {
            let mut instance = self.shared.construct().await?;
            instance.reset();
            self.shared.admit_free(reservation, instance);
        }

        if needed > 0 {
            tracing::info!(pool_name = %self.name(), created = needed, "Object pool prewarmed");
        }

        Ok(needed)
    }

    /// Lease an instance, waiting up to `acquire_timeout` when the pool is
    /// at capacity.
    pub async fn fetch(&self) -> Result<Pooled<T>> {
        self.acquire(None).await
    }

    /// Like [`fetch`](Self::fetch), but a suspended wait also ends when
    /// `token` is cancelled.
    pub async fn fetch_with_cancel(&self, token: &CancellationToken) -> Result<Pooled<T>> {
        self.acquire(Some(token)).await
    }

    async fn acquire(&self, token: Option<&CancellationToken>) -> Result<Pooled<T>> {
        PoolStats::bump(&self.shared.stats.fetches);

        let step = {
            let mut table = self.shared.table.lock();
            if table.closed {
                return Err(PatternError::pool_closed(self.name()));
            }

            let next_free = table.free.pop_front();
            if let Some((slot, instance)) = next_free {
                table.slots.insert(slot, SlotState::Leased);
                Acquire::Ready(slot, instance, table.leased())
            } else if table.live() < self.shared.config.max_live {
                table.constructing += 1;
                Acquire::Construct
            } else {
                let (tx, rx) = oneshot::channel();
                let id = table.next_waiter;
                table.next_waiter += 1;
                table.waiters.push_back(Waiter { id, tx });
                Acquire::Wait(id, rx)
            }
        };

        match step {
            Acquire::Ready(slot, instance, leased) => {
                self.shared.publish_leased(leased);
                PoolStats::bump(&self.shared.stats.immediate_hits);
                self.shared.record_fetch("hit");
                tracing::debug!(pool_name = %self.name(), slot = %slot, "Instance leased");
                Ok(self.handle(slot, instance))
            }
            Acquire::Construct => {
                let reservation = Reservation::held(&self.shared);
                let outcome = self.lease_constructed(reservation).await;
                self.shared
                    .record_fetch(if outcome.is_ok() { "constructed" } else { "failed" });
                outcome
            }
            Acquire::Wait(id, rx) => self.wait(id, rx, token).await,
        }
    }

    async fn wait(
        &self,
        id: u64,
        rx: oneshot::Receiver<Grant<T>>,
        token: Option<&CancellationToken>,
    ) -> Result<Pooled<T>> {
        PoolStats::bump(&self.shared.stats.waits);
        let start = Instant::now();
        let timeout = self.shared.config.acquire_timeout;

        let mut ticket = WaitTicket {
            shared: &self.shared,
            id,
            rx,
            settled: false,
        };

        let cancelled = async {
            match token {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };

        let outcome = tokio::select! {
            received = tokio::time::timeout(timeout, &mut ticket.rx) => match received {
                Ok(Ok(grant)) => WaitOutcome::Granted(grant),
                Ok(Err(_)) => WaitOutcome::Closed,
                Err(_) => WaitOutcome::TimedOut,
            },
            _ = cancelled => WaitOutcome::Cancelled,
        };

        let wait_time = start.elapsed();
        self.shared.stats.record_wait(wait_time);
        histogram!("lazy_pattern_pool_wait_seconds", "pool" => self.shared.config.name.clone())
            .record(wait_time.as_secs_f64());

        let grant = match outcome {
            WaitOutcome::Granted(grant) => {
                ticket.settled = true;
                grant
            }
            WaitOutcome::TimedOut => match ticket.withdraw() {
                // Handed over just as the timer fired
                Some(grant) => grant,
                None => {
                    PoolStats::bump(&self.shared.stats.timeouts);
                    self.shared.record_fetch("timeout");
                    tracing::warn!(
                        pool_name = %self.name(),
                        timeout_ms = timeout.as_millis() as u64,
                        "Object pool fetch timed out"
                    );
                    return Err(PatternError::pool_exhausted(self.name(), timeout));
                }
            },
            WaitOutcome::Cancelled => {
                if let Some(grant) = ticket.withdraw() {
                    self.shared.table.lock().dispatch(grant);
                }
                PoolStats::bump(&self.shared.stats.cancellations);
                self.shared.record_fetch("cancelled");
                return Err(PatternError::fetch_cancelled(self.name()));
            }
            WaitOutcome::Closed => {
                ticket.settled = true;
                return Err(PatternError::pool_closed(self.name()));
            }
        };
        drop(ticket);

        match grant {
            Grant::Instance(slot, instance) => {
                self.shared.record_fetch("waited");
                tracing::debug!(
                    pool_name = %self.name(),
                    slot = %slot,
                    wait_time_ms = wait_time.as_millis() as u64,
                    "Instance handed to waiter"
                );
                Ok(self.handle(slot, instance))
            }
            Grant::Capacity => {
                let reservation = Reservation::held(&self.shared);
                let outcome = self.lease_constructed(reservation).await;
                self.shared
                    .record_fetch(if outcome.is_ok() { "waited" } else { "failed" });
                outcome
            }
        }
    }

    async fn lease_constructed(&self, reservation: Reservation<'_, T>) -> Result<Pooled<T>> {
        let instance = self.shared.construct().await?;
        let slot = self.shared.admit_leased(reservation);

        tracing::debug!(pool_name = %self.name(), slot = %slot, "Instance constructed and leased");
        Ok(self.handle(slot, instance))
    }

    fn handle(&self, slot: SlotId, instance: T) -> Pooled<T> {
        Pooled {
            instance: Some(instance),
            slot,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Return a leased instance: `reset()` it, mark it free and wake one waiter.
    pub fn remand(&self, mut handle: Pooled<T>) -> Result<()> {
        if !Arc::ptr_eq(&self.shared, &handle.shared) {
            // The handle goes back to its own pool on drop.
            return Err(PatternError::foreign_instance(self.name(), handle.slot));
        }

        match handle.instance.take() {
            Some(instance) => self.shared.release(handle.slot, instance),
            None => Err(PatternError::foreign_instance(self.name(), handle.slot)),
        }
    }

    /// Fetch an instance, run `f` on it, and remand it on every exit path.
    ///
    /// ```rust,ignore
    /// let words = pool
    ///     .lease(|splitter| Box::pin(async move { Ok(splitter.split("a b")) }))
    ///     .await?;
    /// ```
    pub async fn lease<F, R>(&self, f: F) -> Result<R>
    where
        F: for<'a> FnOnce(&'a mut T) -> BoxFuture<'a, Result<R>>,
    {
        let mut handle = self.fetch().await?;
        let result = f(&mut *handle).await;
        self.remand(handle)?;
        result
    }

    /// Destroy up to `count` free instances, longest-idle first.
    ///
    /// Returns the number destroyed.
    pub fn shrink(&self, count: usize) -> usize {
        let destroyed: Vec<T> = {
            let mut table = self.shared.table.lock();
            let take = count.min(table.free.len());
            let mut destroyed = Vec::with_capacity(take);
            for _ in 0..take {
                if let Some((slot, instance)) = table.free.pop_front() {
                    table.slots.remove(&slot);
                    destroyed.push(instance);
                }
            }
            destroyed
        };

        let count = destroyed.len();
        drop(destroyed);

        if count > 0 {
            self.shared
                .stats
                .destroyed
                .fetch_add(count as u64, Ordering::Relaxed);
            tracing::info!(pool_name = %self.name(), destroyed = count, "Object pool shrunk");
        }

        count
    }

    /// Apply `f` to every free instance and collect the results.
    pub fn project<R>(&self, mut f: impl FnMut(&T) -> R) -> Vec<R> {
        let table = self.shared.table.lock();
        table.free.iter().map(|(_, instance)| f(instance)).collect()
    }

    /// Close the pool, destroying every free instance.
    ///
    /// Refused with `PoolBusy` while instances are leased or under
    /// construction. Later calls fail with `PoolClosed`.
    pub fn close(&self) -> Result<()> {
        let drained: VecDeque<(SlotId, T)> = {
            let mut table = self.shared.table.lock();
            if table.closed {
                return Err(PatternError::pool_closed(self.name()));
            }

            let outstanding = table.leased() + table.constructing;
            if outstanding > 0 {
                return Err(PatternError::pool_busy(self.name(), outstanding));
            }

            table.closed = true;
            table.slots.clear();
            std::mem::take(&mut table.free)
        };

        let destroyed = drained.len();
        drop(drained);

        self.shared
            .stats
            .destroyed
            .fetch_add(destroyed as u64, Ordering::Relaxed);

        tracing::info!(pool_name = %self.name(), destroyed, "Object pool closed");
        Ok(())
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Get the pool name.
    pub fn name(&self) -> &str {
        self.shared.name()
    }

    pub fn max_live(&self) -> usize {
        self.shared.config.max_live
    }

    pub fn min_warm(&self) -> usize {
        self.shared.config.min_warm
    }

    pub fn free_count(&self) -> usize {
        self.shared.table.lock().free.len()
    }

    pub fn leased_count(&self) -> usize {
        self.shared.table.lock().leased()
    }

    /// Free + leased + under construction.
    pub fn live_count(&self) -> usize {
        self.shared.table.lock().live()
    }

    pub fn waiting_count(&self) -> usize {
        self.shared.table.lock().waiters.len()
    }

    /// State of a slot, or `None` if it was destroyed or never existed.
    pub fn slot_state(&self, slot: SlotId) -> Option<SlotState> {
        self.shared.table.lock().slots.get(&slot).copied()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.table.lock().closed
    }

    /// Get pool statistics.
    pub fn stats(&self) -> ObjectPoolStats {
        let (free, leased, live, waiting) = {
            let table = self.shared.table.lock();
            (table.free.len(), table.leased(), table.live(), table.waiters.len())
        };

        let stats = &self.shared.stats;
        let waits = stats.waits.load(Ordering::Relaxed);
        let avg_wait_time_us = if waits > 0 {
            stats.total_wait_time_us.load(Ordering::Relaxed) / waits
        } else {
            0
        };

        ObjectPoolStats {
            name: self.name().to_string(),
            max_live: self.max_live(),
            min_warm: self.min_warm(),
            free,
            leased,
            live,
            waiting,
            fetches: stats.fetches.load(Ordering::Relaxed),
            immediate_hits: stats.immediate_hits.load(Ordering::Relaxed),
            constructions: stats.constructions.load(Ordering::Relaxed),
            construction_failures: stats.construction_failures.load(Ordering::Relaxed),
            waits,
            timeouts: stats.timeouts.load(Ordering::Relaxed),
            cancellations: stats.cancellations.load(Ordering::Relaxed),
            remands: stats.remands.load(Ordering::Relaxed),
            discards: stats.discards.load(Ordering::Relaxed),
            destroyed: stats.destroyed.load(Ordering::Relaxed),
            peak_leased: stats.peak_leased.load(Ordering::Relaxed),
            avg_wait_time_us,
            uptime_secs: self.created_at.elapsed().as_secs(),
        }
    }
}

impl<T: Recyclable> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

/// Statistics for an object pool.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectPoolStats {
    /// Pool name
    pub name: String,
    pub max_live: usize,
    pub min_warm: usize,
    /// Free instances
    pub free: usize,
    /// Leased instances
    pub leased: usize,
    /// Free + leased + under construction
    pub live: usize,
    /// Suspended fetchers
    pub waiting: usize,
    /// Total fetch calls
    pub fetches: u64,
    /// Fetches served from the free queue without waiting
    pub immediate_hits: u64,
    /// Successful factory calls
    pub constructions: u64,
    /// Failed factory calls
    pub construction_failures: u64,
    /// Fetches that had to suspend
    pub waits: u64,
    /// Fetches that gave up after `acquire_timeout`
    pub timeouts: u64,
    /// Fetches ended by a cancellation token
    pub cancellations: u64,
    /// Instances returned to the pool
    pub remands: u64,
    /// Instances destroyed by their holder
    pub discards: u64,
    /// Instances destroyed for any reason
    pub destroyed: u64,
    /// Most instances leased at once
    pub peak_leased: usize,
    /// Average suspended wait (microseconds)
    pub avg_wait_time_us: u64,
    /// Pool uptime in seconds
    pub uptime_secs: u64,
}

impl ObjectPoolStats {
    /// Fraction of live instances currently leased.
    pub fn utilization(&self) -> f64 {
        if self.live == 0 {
            0.0
        } else {
            self.leased as f64 / self.live as f64
        }
    }

    /// Fraction of fetches served straight from the free queue.
    pub fn hit_rate(&self) -> f64 {
        if self.fetches == 0 {
            0.0
        } else {
            self.immediate_hits as f64 / self.fetches as f64
        }
    }
}
