//! Core module: Lock-Free SPSC Sample Ring Buffer
//!
//! Design principles:
//! - Lock-Free: only atomic loads and stores, no Mutex/RwLock, no CAS
//! - No-Allocation: the backing store is inline and fixed at compile time
//! - Cursor ownership: each cursor is stored by exactly one thread

mod ring_buffer;

pub use ring_buffer::{RingBuffer, SampleRingBuffer};
