//! ringlink - latency report for the ring buffer and mutex primitives
//!
//! Usage:
//!   cargo run --release -- [ITERATIONS]

use std::time::Instant;

use ringlink::core::RingBuffer;
use ringlink::sync::Mutex;

const DEFAULT_ITERATIONS: usize = 1_000_000;

fn main() {
    let iterations = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_ITERATIONS);

    println!("ringlink - primitive latency report");
    println!("===================================\n");

    benchmark_ring_buffer(iterations);

    if let Err(e) = benchmark_mutex(iterations) {
        eprintln!("mutex benchmark failed: {}", e);
        std::process::exit(1);
    }

    println!("\nAll benchmarks complete.");
    println!("For the two-thread simulation run: cargo run --release --bin ringlink_stress");
}

fn report(label: &str, iterations: usize, elapsed_ns: f64) {
    let per_op = elapsed_ns / iterations as f64;
    println!(
        "  {:<14} {:>8.2} ns/op ({:.2} M ops/sec)",
        label,
        per_op,
        1_000.0 / per_op
    );
}

fn benchmark_ring_buffer(iterations: usize) {
    println!("Ring Buffer (lock-free SPSC, f32 samples)");
    println!("-----------------------------------------");

    let rb: Box<RingBuffer<f32, 65536>> = Box::default();
    println!("  Lock-free slots: {}", RingBuffer::<f32, 65536>::is_lock_free());

    // Warm up
    for i in 0..1000 {
        rb.feed(i as f32);
    }
    rb.sync_write_pos();

    // feed + read in lockstep, never more than one element buffered
    let start = Instant::now();
    for i in 0..iterations {
        rb.feed(i as f32);
        std::hint::black_box(rb.read());
    }
    report("feed+read", iterations, start.elapsed().as_nanos() as f64);

    // try_feed against a buffer kept half full
    rb.clear();
    for _ in 0..rb.capacity() / 2 {
        rb.feed(0.0);
    }
    let start = Instant::now();
    for i in 0..iterations {
        rb.try_feed(i as f32);
        rb.skip(1);
    }
    report("try_feed+skip", iterations, start.elapsed().as_nanos() as f64);

    // Block-sized transfers, the shape of a real audio callback
    rb.clear();
    let block = [0.5f32; 256];
    let mut out = [0.0f32; 256];
    let blocks = (iterations / block.len()).max(1);
    let start = Instant::now();
    for _ in 0..blocks {
        rb.feed_slice(&block);
        std::hint::black_box(rb.read_slice(&mut out));
    }
    report(
        "slice (per el.)",
        blocks * block.len(),
        start.elapsed().as_nanos() as f64,
    );
    println!();
}

fn benchmark_mutex(iterations: usize) -> Result<(), ringlink::error::MutexError> {
    let mutex = Mutex::new()?;

    println!("Mutex ({} backend, uncontended)", mutex.backend_name());
    println!("---------------------------------------");

    let start = Instant::now();
    for _ in 0..iterations {
        let guard = mutex.lock();
        std::hint::black_box(&guard);
    }
    report("lock/unlock", iterations, start.elapsed().as_nanos() as f64);

    let start = Instant::now();
    for _ in 0..iterations {
        std::hint::black_box(mutex.try_lock());
    }
    report("try_lock", iterations, start.elapsed().as_nanos() as f64);

    let start = Instant::now();
    for i in 0..iterations {
        let guard = mutex.lock_if(i % 2 == 0);
        std::hint::black_box(&guard);
    }
    report("lock_if(1/2)", iterations, start.elapsed().as_nanos() as f64);

    Ok(())
}
