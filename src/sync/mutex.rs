//! Mutex with a scoped, optionally conditional guard
//!
//! The mutex carries no data. It guards whatever state its owner says it
//! guards, typically configuration shared between a control thread and the
//! audio thread. Real-time code should use [`Mutex::try_lock`] and fall back
//! to the last known state instead of waiting.

use std::fmt;
use std::marker::PhantomData;

use super::backend::{NativeLock, RawLock};
use crate::error::MutexError;

/// Mutual exclusion over a [`RawLock`] backend.
pub struct Mutex<L: RawLock = NativeLock> {
    raw: L,
}

impl Mutex {
    /// Creates an unlocked mutex on the backend selected for this build.
    ///
    /// A failure here means the native primitive is unusable; the owning
    /// component should fail its own construction.
    pub fn new() -> Result<Self, MutexError> {
        Self::with_backend()
    }
}

impl<L: RawLock> Mutex<L> {
    /// Creates an unlocked mutex on an explicit backend.
    pub fn with_backend() -> Result<Self, MutexError> {
        match L::init() {
            Ok(raw) => {
                tracing::debug!(backend = L::NAME, "mutex initialized");
                Ok(Self { raw })
            }
            Err(err) => {
                tracing::error!(backend = L::NAME, error = %err, "mutex initialization failed");
                Err(err)
            }
        }
    }

    /// Name of the backend this mutex runs on.
    pub fn backend_name(&self) -> &'static str {
        L::NAME
    }

    /// Blocks until the lock is held. Released when the guard drops.
    #[inline]
    pub fn lock(&self) -> MutexScopeLock<'_, L> {
        MutexScopeLock::new(self, true)
    }

    /// Locks only if `condition` is true; otherwise returns a guard that
    /// does nothing.
    #[inline]
    pub fn lock_if(&self, condition: bool) -> MutexScopeLock<'_, L> {
        MutexScopeLock::new(self, condition)
    }

    /// Takes the lock if it is free. Never blocks.
    #[inline]
    pub fn try_lock(&self) -> Option<MutexScopeLock<'_, L>> {
        if self.raw.try_lock() {
            Some(MutexScopeLock::locked(self))
        } else {
            None
        }
    }

    /// The backend this mutex wraps.
    ///
    /// # Safety
    /// Locking or unlocking through the returned reference bypasses the
    /// guards; the caller must keep lock and unlock balanced.
    #[inline]
    pub unsafe fn raw(&self) -> &L {
        &self.raw
    }

    /// Releases a lock whose guard was leaked with `mem::forget`.
    ///
    /// # Safety
    /// The lock must be held by the current thread and no live guard may
    /// still own it.
    #[inline]
    pub unsafe fn force_unlock(&self) {
        self.raw.unlock();
    }
}

impl<L: RawLock> fmt::Debug for Mutex<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex").field("backend", &L::NAME).finish()
    }
}

/// Scope guard for [`Mutex`].
///
/// Unlocks exactly once on drop if it locked, whichever way the scope is
/// left: normal return, early return, `?`, or a panic unwinding through it.
#[must_use = "if unused the Mutex will immediately unlock"]
pub struct MutexScopeLock<'a, L: RawLock = NativeLock> {
    mutex: Option<&'a Mutex<L>>,
    // Unlock must happen on the locking thread
    _not_send: PhantomData<*const ()>,
}

impl<'a, L: RawLock> MutexScopeLock<'a, L> {
    /// Locks `mutex` if `condition` is true.
    pub fn new(mutex: &'a Mutex<L>, condition: bool) -> Self {
        if !condition {
            return Self {
                mutex: None,
                _not_send: PhantomData,
            };
        }

        mutex.raw.lock();
        Self::locked(mutex)
    }

    fn locked(mutex: &'a Mutex<L>) -> Self {
        Self {
            mutex: Some(mutex),
            _not_send: PhantomData,
        }
    }

    /// Whether this guard holds the lock.
    pub fn is_locked(&self) -> bool {
        self.mutex.is_some()
    }

    /// Releases the lock before the end of the scope.
    pub fn unlock(self) {
        drop(self);
    }
}

impl<L: RawLock> Drop for MutexScopeLock<'_, L> {
    fn drop(&mut self) {
        if let Some(mutex) = self.mutex.take() {
            // SAFETY: this guard acquired the lock on this thread
            unsafe { mutex.raw.unlock() };
        }
    }
}

impl<L: RawLock> fmt::Debug for MutexScopeLock<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutexScopeLock")
            .field("locked", &self.is_locked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::ParkingLock;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_lock_excludes_try_lock() {
        let mutex = Mutex::new().unwrap();

        let guard = mutex.lock();
        assert!(guard.is_locked());
        assert!(mutex.try_lock().is_none());

        drop(guard);
        assert!(mutex.try_lock().is_some());
    }

    #[test]
    fn test_conditional_guard() {
        let mutex = Mutex::new().unwrap();

        let guard = mutex.lock_if(false);
        assert!(!guard.is_locked());
        // Nothing was taken
        assert!(mutex.try_lock().is_some());
        drop(guard);

        let guard = MutexScopeLock::new(&mutex, true);
        assert!(guard.is_locked());
        assert!(mutex.try_lock().is_none());
        guard.unlock();
        assert!(mutex.try_lock().is_some());
    }

    #[test]
    fn test_early_return_releases() {
        fn guarded(mutex: &Mutex, fail: bool) -> Result<u32, &'static str> {
            let _guard = mutex.lock();
            if fail {
                return Err("bail");
            }
            Ok(1)
        }

        let mutex = Mutex::new().unwrap();
        assert!(guarded(&mutex, true).is_err());
        assert!(mutex.try_lock().is_some());
        assert_eq!(guarded(&mutex, false), Ok(1));
        assert!(mutex.try_lock().is_some());
    }

    #[test]
    fn test_force_unlock_after_forget() {
        let mutex = Mutex::new().unwrap();

        std::mem::forget(mutex.lock());
        assert!(mutex.try_lock().is_none());

        unsafe { mutex.force_unlock() };
        assert!(mutex.try_lock().is_some());
    }

    #[test]
    fn test_mutual_exclusion() {
        let mutex = Arc::new(Mutex::<ParkingLock>::with_backend().unwrap());
        let inside = Arc::new(AtomicBool::new(false));
        let entries = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let mutex = Arc::clone(&mutex);
                let inside = Arc::clone(&inside);
                let entries = Arc::clone(&entries);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let _guard = mutex.lock();
                        assert!(!inside.swap(true, Ordering::SeqCst));
                        entries.fetch_add(1, Ordering::Relaxed);
                        inside.store(false, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(entries.load(Ordering::Relaxed), 800);
    }

    #[test]
    fn test_lock_blocks_until_released() {
        let mutex = Arc::new(Mutex::new().unwrap());
        let released = Arc::new(AtomicBool::new(false));

        let guard = mutex.lock();
        let waiter = {
            let mutex = Arc::clone(&mutex);
            let released = Arc::clone(&released);
            thread::spawn(move || {
                let _guard = mutex.lock();
                released.load(Ordering::SeqCst)
            })
        };

        thread::sleep(Duration::from_millis(20));
        released.store(true, Ordering::SeqCst);
        drop(guard);

        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_backend_name() {
        let mutex = Mutex::<ParkingLock>::with_backend().unwrap();
        assert_eq!(mutex.backend_name(), "parking_lot");
        assert!(format!("{:?}", mutex).contains("parking_lot"));
    }
}
