//! Sync module: mutex for state that does not fit SPSC ownership
//!
//! The ring buffer needs no lock. This is for everything else, e.g. a
//! parameter block written by a control thread and read by the audio thread,
//! or quiescing both sides around `RingBuffer::clear`.

mod backend;
mod mutex;

#[cfg(unix)]
pub use backend::PthreadLock;
pub use backend::{NativeLock, ParkingLock, RawLock};
pub use mutex::{Mutex, MutexScopeLock};
