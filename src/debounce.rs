//! Per-key debounced jobs.
//!
//! A [`Debouncer`] tracks at most one pending job per key. Scheduling a key
//! that is already pending pushes its deadline out and bumps its sequence
//! number instead of queuing a second job, so a burst of requests inside
//! the idle window collapses into one run. Jobs run when the owner polls
//! with a time at or past their deadline.
//!
//! Time comes from a [`Clock`], so tests drive it with [`ManualClock`].

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the service under test.
///
/// # Examples
///
/// ```rust
/// use zzgear::debounce::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// let start = clock.now();
/// clock.advance(Duration::from_millis(250));
/// assert_eq!(clock.now() - start, Duration::from_millis(250));
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    elapsed_nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed_nanos: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let nanos = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingJob {
    deadline: Instant,
    sequence: u64,
}

/// Single-shot delayed jobs keyed by `K`, reset on reschedule.
///
/// # Examples
///
/// ```rust
/// use zzgear::debounce::Debouncer;
/// use std::time::{Duration, Instant};
///
/// let mut debouncer = Debouncer::new(Duration::from_millis(100));
/// let t0 = Instant::now();
///
/// debouncer.schedule("hero", t0);
/// debouncer.schedule("hero", t0 + Duration::from_millis(80));
///
/// // The second call restarted the window.
/// assert!(debouncer.poll(t0 + Duration::from_millis(120)).is_empty());
/// assert_eq!(debouncer.poll(t0 + Duration::from_millis(180)), vec!["hero"]);
/// ```
#[derive(Debug, Clone)]
pub struct Debouncer<K> {
    delay: Duration,
    pending: HashMap<K, PendingJob>,
    next_sequence: u64,
}

impl<K: Eq + Hash + Clone> Debouncer<K> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: HashMap::new(),
            next_sequence: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule the job for `key`, replacing any pending one.
    ///
    /// Returns the sequence number of the now-current request.
    pub fn schedule(&mut self, key: K, now: Instant) -> u64 {
        self.next_sequence += 1;
        let job = PendingJob {
            deadline: now + self.delay,
            sequence: self.next_sequence,
        };
        if let Some(previous) = self.pending.insert(key, job) {
            tracing::trace!(
                superseded = previous.sequence,
                sequence = job.sequence,
                "debounce timer reset"
            );
        }
        job.sequence
    }

    /// Drop the pending job for `key`. Returns whether one existed.
    pub fn cancel(&mut self, key: &K) -> bool {
        self.pending.remove(key).is_some()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Whether `sequence` is still the latest request for `key`.
    ///
    /// A job started for an older sequence should discard its result.
    pub fn is_current(&self, key: &K, sequence: u64) -> bool {
        self.pending
            .get(key)
            .is_some_and(|job| job.sequence == sequence)
    }

    /// Earliest pending deadline, if any job is pending.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|job| job.deadline).min()
    }

    /// Remove and return every key whose deadline is at or before `now`,
    /// in the order they were last scheduled.
    pub fn poll(&mut self, now: Instant) -> Vec<K> {
        let mut due: Vec<(u64, K)> = self
            .pending
            .iter()
            .filter(|(_, job)| job.deadline <= now)
            .map(|(key, job)| (job.sequence, key.clone()))
            .collect();
        due.sort_by_key(|(sequence, _)| *sequence);
        for (_, key) in &due {
            self.pending.remove(key);
        }
        due.into_iter().map(|(_, key)| key).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(100);

    #[test]
    fn test_fires_once_after_delay() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.schedule(1u32, clock.now());

        clock.advance(Duration::from_millis(99));
        assert!(debouncer.poll(clock.now()).is_empty());
        assert!(debouncer.is_pending(&1));

        clock.advance(Duration::from_millis(1));
        assert_eq!(debouncer.poll(clock.now()), vec![1]);
        assert!(!debouncer.is_pending(&1));
        assert!(debouncer.poll(clock.now()).is_empty());
    }

    #[test]
    fn test_burst_coalesces() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new(DELAY);
        for _ in 0..3 {
            debouncer.schedule("knight", clock.now());
            clock.advance(Duration::from_millis(30));
        }
        assert_eq!(debouncer.len(), 1);

        clock.advance(Duration::from_millis(100));
        assert_eq!(debouncer.poll(clock.now()), vec!["knight"]);
    }

    #[test]
    fn test_sequence_guard() {
        let now = Instant::now();
        let mut debouncer = Debouncer::new(DELAY);
        let first = debouncer.schedule('a', now);
        assert!(debouncer.is_current(&'a', first));

        let second = debouncer.schedule('a', now);
        assert!(!debouncer.is_current(&'a', first));
        assert!(debouncer.is_current(&'a', second));
    }

    #[test]
    fn test_keys_are_independent() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new(DELAY);
        debouncer.schedule("a", clock.now());
        clock.advance(Duration::from_millis(50));
        debouncer.schedule("b", clock.now());

        clock.advance(Duration::from_millis(60));
        assert_eq!(debouncer.poll(clock.now()), vec!["a"]);
        assert_eq!(debouncer.next_deadline(), Some(clock.now() + Duration::from_millis(40)));

        assert!(debouncer.cancel(&"b"));
        assert!(debouncer.is_empty());
    }
}
