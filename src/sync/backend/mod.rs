//! Lock backends
//!
//! [`RawLock`] is the only interface [`Mutex`](super::Mutex) talks to. The
//! backend used by default ([`NativeLock`]) is picked here and nowhere else:
//!
//! | target            | `parking-lot-mutex` | backend         |
//! |-------------------|---------------------|-----------------|
//! | unix              | off                 | [`PthreadLock`] |
//! | unix              | on                  | [`ParkingLock`] |
//! | everything else   | any                 | [`ParkingLock`] |

mod parking;
#[cfg(unix)]
mod pthread;

pub use parking::ParkingLock;
#[cfg(unix)]
pub use pthread::PthreadLock;

use crate::error::MutexError;

/// A raw, data-less mutual exclusion primitive.
///
/// # Safety
/// Implementations must provide real mutual exclusion: after `lock` returns
/// or `try_lock` returns `true`, no other caller may acquire the lock until
/// `unlock` is called.
pub unsafe trait RawLock: Sized {
    /// Short name used in logs and errors.
    const NAME: &'static str;

    /// Creates an unlocked primitive.
    fn init() -> Result<Self, MutexError>;

    /// Blocks until the lock is held by the caller.
    fn lock(&self);

    /// Acquires the lock if it is free. Never blocks.
    fn try_lock(&self) -> bool;

    /// Releases the lock.
    ///
    /// # Safety
    /// The lock must be held by the current thread.
    unsafe fn unlock(&self);
}

/// Backend selected for this build.
#[cfg(all(unix, not(feature = "parking-lot-mutex")))]
pub type NativeLock = PthreadLock;

/// Backend selected for this build.
#[cfg(any(not(unix), feature = "parking-lot-mutex"))]
pub type NativeLock = ParkingLock;
