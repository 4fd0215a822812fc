//! Timers and bounded cross-thread waits (spec §4.8, component C8).
//!
//! One-shot timers run on a dedicated timer thread and only ever post a
//! system event back to the dispatcher — they never touch shared state
//! directly (spec §4.8, §5 cancellation rule 3). Bounded waits are plain
//! condition variables with an absolute deadline, used by `stop()` and
//! `wait_for_port_delete_done()` (spec §4.7).
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use mlag_common::error::Error;

/// Default reload-delay: ports stay down for this long after Master start,
/// unless sync completes first (spec §6: default 30 000 ms).
pub const DEFAULT_RELOAD_DELAY: Duration = Duration::from_secs(30);

/// Default reconnect backoff (spec §4.4).
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_millis(500);

/// Default bound for `stop()`/`wait_for_port_delete_done()` (spec §4.7).
pub const DEFAULT_BARRIER_TIMEOUT: Duration = Duration::from_secs(5);

/// A one-shot timer. Dropping the handle does not cancel the underlying
/// thread; call [`OneShotTimer::cancel`] explicitly (mirrors the teacher's
/// pattern of explicit stop over implicit `Drop` side effects in
/// thread-owning types, e.g. `nakamoto-wallet::run`'s joined threads).
pub struct OneShotTimer {
    generation: Arc<std::sync::atomic::AtomicU64>,
}

impl OneShotTimer {
    /// Arm a timer that calls `on_fire` after `delay`, unless cancelled
    /// first. `on_fire` must only post a system event (spec §4.8) — it must
    /// never mutate protocol state directly, since it runs on the timer
    /// thread, not the dispatcher thread.
    pub fn arm<F>(delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let generation = Arc::new(std::sync::atomic::AtomicU64::new(0));
        let armed_generation = generation.load(std::sync::atomic::Ordering::SeqCst);
        let guard = generation.clone();

        thread::spawn(move || {
            thread::sleep(delay);
            if guard.load(std::sync::atomic::Ordering::SeqCst) == armed_generation {
                on_fire();
            }
        });

        Self { generation }
    }

    /// Cancel this timer. If it already fired, this is a no-op (spec §8
    /// property 7: reconnect-timer firings are idempotent once stopped).
    pub fn cancel(&self) {
        self.generation
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

/// A bounded condition variable used by `stop()` / `wait_for_port_delete_done()`.
#[derive(Clone)]
pub struct Barrier {
    inner: Arc<(Mutex<u32>, Condvar)>,
}

impl Barrier {
    /// Construct a barrier armed to wait for `expected` bits to be set.
    pub fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(0), Condvar::new())),
        }
    }

    /// OR `bit` into the observed set and wake any waiter.
    pub fn signal(&self, bit: u32) {
        let (lock, cvar) = &*self.inner;
        let mut observed = lock.lock().expect("barrier mutex poisoned");
        *observed |= bit;
        cvar.notify_all();
    }

    /// Block until `observed & expected_mask == expected_mask`, or
    /// `timeout` elapses. Returns the bits actually observed and whether
    /// the full mask was reached (spec §4.7/§8 property 8: timeout is
    /// reported but not fatal).
    pub fn wait(&self, expected_mask: u32, timeout: Duration) -> (u32, Result<(), Error>) {
        let (lock, cvar) = &*self.inner;
        let observed = lock.lock().expect("barrier mutex poisoned");

        let (observed, timeout_result) = cvar
            .wait_timeout_while(observed, timeout, |bits| *bits & expected_mask != expected_mask)
            .expect("barrier mutex poisoned");

        if timeout_result.timed_out() {
            (*observed, Err(Error::Timeout("stop/port-delete barrier".into())))
        } else {
            (*observed, Ok(()))
        }
    }
}

impl Default for Barrier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn cancelled_timer_never_fires() {
        let (tx, rx) = mpsc::channel::<()>();
        let timer = OneShotTimer::arm(Duration::from_millis(20), move || {
            tx.send(()).ok();
        });
        timer.cancel();

        assert!(rx.recv_timeout(Duration::from_millis(60)).is_err());
    }

    #[test]
    fn barrier_reports_timeout_but_returns_observed_bits() {
        let barrier = Barrier::new();
        barrier.signal(0b01);

        let (observed, result) = barrier.wait(0b11, Duration::from_millis(20));

        assert_eq!(observed, 0b01);
        assert!(result.is_err());
    }

    #[test]
    fn barrier_returns_ok_once_all_bits_observed() {
        let barrier = Barrier::new();
        barrier.signal(0b01);
        barrier.signal(0b10);

        let (observed, result) = barrier.wait(0b11, Duration::from_millis(20));

        assert_eq!(observed, 0b11);
        assert!(result.is_ok());
    }
}
