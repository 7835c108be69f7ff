//! Portable backend over `parking_lot::RawMutex`.

use parking_lot::lock_api::RawMutex as _;

use super::RawLock;
use crate::error::MutexError;

/// Word-sized raw mutex from `parking_lot`. Needs no native handle, so
/// initialization cannot fail.
pub struct ParkingLock {
    raw: parking_lot::RawMutex,
}

unsafe impl RawLock for ParkingLock {
    const NAME: &'static str = "parking_lot";

    fn init() -> Result<Self, MutexError> {
        Ok(Self {
            raw: parking_lot::RawMutex::INIT,
        })
    }

    #[inline]
    fn lock(&self) {
        self.raw.lock();
    }

    #[inline]
    fn try_lock(&self) -> bool {
        self.raw.try_lock()
    }

    #[inline]
    unsafe fn unlock(&self) {
        self.raw.unlock();
    }
}
