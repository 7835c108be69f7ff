//! POSIX backend over `pthread_mutex_t`.

use std::cell::UnsafeCell;
use std::io;
use std::mem::MaybeUninit;

use super::RawLock;
use crate::error::MutexError;

/// `pthread_mutex_t` with `PTHREAD_MUTEX_NORMAL` semantics.
///
/// The native handle is boxed once at construction: a pthread mutex must not
/// move after `pthread_mutex_init`, while the owning `Mutex` is free to.
pub struct PthreadLock {
    inner: Box<UnsafeCell<libc::pthread_mutex_t>>,
}

// SAFETY: pthread mutexes are designed to be shared between threads; the
// handle is only touched through the pthread API.
unsafe impl Send for PthreadLock {}
unsafe impl Sync for PthreadLock {}

fn check(backend_call: &'static str, rc: libc::c_int) -> Result<(), MutexError> {
    if rc == 0 {
        return Ok(());
    }
    tracing::error!(call = backend_call, rc, "pthread mutex setup failed");
    Err(MutexError::Init {
        backend: PthreadLock::NAME,
        source: io::Error::from_raw_os_error(rc),
    })
}

unsafe impl RawLock for PthreadLock {
    const NAME: &'static str = "pthread";

    fn init() -> Result<Self, MutexError> {
        let inner = Box::new(UnsafeCell::new(libc::PTHREAD_MUTEX_INITIALIZER));
        let mut attr = MaybeUninit::<libc::pthread_mutexattr_t>::uninit();

        // SAFETY: attr is initialized by pthread_mutexattr_init before any
        // other use and destroyed on every path after that.
        unsafe {
            check(
                "pthread_mutexattr_init",
                libc::pthread_mutexattr_init(attr.as_mut_ptr()),
            )?;

            let result = check(
                "pthread_mutexattr_settype",
                libc::pthread_mutexattr_settype(attr.as_mut_ptr(), libc::PTHREAD_MUTEX_NORMAL),
            )
            .and_then(|()| {
                check(
                    "pthread_mutex_init",
                    libc::pthread_mutex_init(inner.get(), attr.as_ptr()),
                )
            });

            libc::pthread_mutexattr_destroy(attr.as_mut_ptr());
            result?;
        }

        Ok(Self { inner })
    }

    #[inline]
    fn lock(&self) {
        // SAFETY: the mutex was initialized in init() and is pinned in its box
        let rc = unsafe { libc::pthread_mutex_lock(self.inner.get()) };
        debug_assert_eq!(rc, 0, "pthread_mutex_lock failed");
    }

    #[inline]
    fn try_lock(&self) -> bool {
        // SAFETY: see lock()
        unsafe { libc::pthread_mutex_trylock(self.inner.get()) == 0 }
    }

    #[inline]
    unsafe fn unlock(&self) {
        let rc = libc::pthread_mutex_unlock(self.inner.get());
        debug_assert_eq!(rc, 0, "pthread_mutex_unlock failed");
    }
}

impl Drop for PthreadLock {
    fn drop(&mut self) {
        // SAFETY: &mut self means no guard can still hold the lock
        unsafe {
            libc::pthread_mutex_destroy(self.inner.get());
        }
    }
}
