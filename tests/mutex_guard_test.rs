//! Guard contract tests against an instrumented lock backend.
//!
//! `CountingLock` wraps the portable backend and records every lock and
//! unlock, so the tests can check exactly how many calls each exit path makes.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

use ringlink::error::MutexError;
use ringlink::sync::{Mutex, MutexScopeLock, ParkingLock, RawLock};

struct CountingLock {
    inner: ParkingLock,
    locks: AtomicUsize,
    try_locks: AtomicUsize,
    unlocks: AtomicUsize,
}

impl CountingLock {
    fn counts(&self) -> (usize, usize, usize) {
        (
            self.locks.load(Ordering::SeqCst),
            self.try_locks.load(Ordering::SeqCst),
            self.unlocks.load(Ordering::SeqCst),
        )
    }
}

unsafe impl RawLock for CountingLock {
    const NAME: &'static str = "counting";

    fn init() -> Result<Self, MutexError> {
        Ok(Self {
            inner: ParkingLock::init()?,
            locks: AtomicUsize::new(0),
            try_locks: AtomicUsize::new(0),
            unlocks: AtomicUsize::new(0),
        })
    }

    fn lock(&self) {
        self.inner.lock();
        self.locks.fetch_add(1, Ordering::SeqCst);
    }

    fn try_lock(&self) -> bool {
        let acquired = self.inner.try_lock();
        if acquired {
            self.try_locks.fetch_add(1, Ordering::SeqCst);
        }
        acquired
    }

    unsafe fn unlock(&self) {
        self.unlocks.fetch_add(1, Ordering::SeqCst);
        self.inner.unlock();
    }
}

/// Backend whose native init always fails.
struct BrokenLock;

unsafe impl RawLock for BrokenLock {
    const NAME: &'static str = "broken";

    fn init() -> Result<Self, MutexError> {
        Err(MutexError::Init {
            backend: Self::NAME,
            source: std::io::Error::from_raw_os_error(11), // EAGAIN
        })
    }

    fn lock(&self) {}

    fn try_lock(&self) -> bool {
        false
    }

    unsafe fn unlock(&self) {}
}

fn counting_mutex() -> Mutex<CountingLock> {
    Mutex::with_backend().unwrap()
}

fn counts(mutex: &Mutex<CountingLock>) -> (usize, usize, usize) {
    // SAFETY: only the counters are read, the lock state is not touched
    unsafe { mutex.raw() }.counts()
}

#[test]
fn false_condition_never_locks() {
    let mutex = counting_mutex();

    {
        let guard = MutexScopeLock::new(&mutex, false);
        assert!(!guard.is_locked());
    }
    {
        let guard = mutex.lock_if(false);
        assert!(!guard.is_locked());
    }

    assert_eq!(counts(&mutex), (0, 0, 0));
}

#[test]
fn true_condition_unlocks_once() {
    let mutex = counting_mutex();

    {
        let guard = MutexScopeLock::new(&mutex, true);
        assert!(guard.is_locked());
        assert_eq!(counts(&mutex), (1, 0, 0));
    }

    assert_eq!(counts(&mutex), (1, 0, 1));
}

#[test]
fn explicit_unlock_does_not_double_release() {
    let mutex = counting_mutex();

    let guard = mutex.lock();
    guard.unlock();

    assert_eq!(counts(&mutex), (1, 0, 1));
}

#[test]
fn error_path_unlocks_once() {
    fn configure(mutex: &Mutex<CountingLock>, input: &str) -> Result<u32, std::num::ParseIntError> {
        let _guard = mutex.lock();
        let value: u32 = input.parse()?;
        Ok(value * 2)
    }

    let mutex = counting_mutex();

    assert!(configure(&mutex, "not a number").is_err());
    assert_eq!(counts(&mutex), (1, 0, 1));

    assert_eq!(configure(&mutex, "21"), Ok(42));
    assert_eq!(counts(&mutex), (2, 0, 2));
}

#[test]
fn panic_unwind_unlocks_once() {
    let mutex = counting_mutex();

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let _guard = mutex.lock();
        panic!("control thread failed mid-update");
    }));

    assert!(result.is_err());
    assert_eq!(counts(&mutex), (1, 0, 1));

    // Still usable afterwards
    assert!(mutex.try_lock().is_some());
    assert_eq!(counts(&mutex), (1, 1, 2));
}

#[test]
fn failed_try_lock_makes_no_calls() {
    let mutex = counting_mutex();

    let held = mutex.lock();
    assert!(mutex.try_lock().is_none());
    drop(held);

    assert_eq!(counts(&mutex), (1, 0, 1));
}

#[test]
fn init_failure_is_reported() {
    let err = Mutex::<BrokenLock>::with_backend().unwrap_err();
    let MutexError::Init { backend, source } = err;
    assert_eq!(backend, "broken");
    assert_eq!(source.raw_os_error(), Some(11));
}
