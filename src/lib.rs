//! ringlink - wait-free sample transfer between an audio callback and its
//! feeder thread.
//!
//! - [`RingBuffer`](crate::core::RingBuffer): fixed-capacity SPSC ring buffer, capacity and
//!   element type fixed at compile time, no locks and no allocation on the
//!   read/feed paths.
//! - [`Mutex`](crate::sync::Mutex): thin mutex with a scoped, optionally conditional guard
//!   for the state that does not fit single-writer/single-reader ownership.
//!
//! ```
//! use ringlink::core::SampleRingBuffer;
//!
//! let ring: SampleRingBuffer<8> = SampleRingBuffer::new();
//! ring.feed(0.25);
//! ring.feed(-0.5);
//! assert_eq!(ring.num_buffered(), 2);
//! assert_eq!(ring.read(), Some(0.25));
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod sync;
