//! ringlink stress run - feeder thread into a simulated audio callback
//!
//! - Feeder: pushes a numbered sample stream in chunks, never more than the
//!   ring can hold, and periodically rewrites a shared gain block under the
//!   mutex.
//! - Audio: drains one block per quantum, checks the numbering for gaps or
//!   reordering, and reads the gain with `try_lock` so it never waits.
//!
//! Usage:
//!   cargo run --release --bin ringlink_stress [OPTIONS]

use std::cell::UnsafeCell;
use std::error::Error;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use ringlink::config::{StressConfig, STRESS_RING_LENGTH};
use ringlink::core::RingBuffer;
use ringlink::error::ConfigError;
use ringlink::sync::Mutex;

/// Sample numbers wrap here so every value is exact in an `f32`.
const SEQUENCE_MASK: u32 = (1 << 24) - 1;

/// Run statistics
struct StressStats {
    samples_fed: AtomicU64,
    samples_read: AtomicU64,
    blocks: AtomicU64,
    underruns: AtomicU64,
    order_violations: AtomicU64,
    feeder_waits: AtomicU64,
    gain_updates: AtomicU64,
    lock_misses: AtomicU64,
    late_quanta: AtomicU64,
}

impl StressStats {
    fn new() -> Self {
        Self {
            samples_fed: AtomicU64::new(0),
            samples_read: AtomicU64::new(0),
            blocks: AtomicU64::new(0),
            underruns: AtomicU64::new(0),
            order_violations: AtomicU64::new(0),
            feeder_waits: AtomicU64::new(0),
            gain_updates: AtomicU64::new(0),
            lock_misses: AtomicU64::new(0),
            late_quanta: AtomicU64::new(0),
        }
    }

    fn print_stats(&self, elapsed: Duration) {
        let fed = self.samples_fed.load(Ordering::Relaxed);
        let read = self.samples_read.load(Ordering::Relaxed);
        let rate = read as f64 / elapsed.as_secs_f64();

        info!(
            elapsed_s = elapsed.as_secs_f64(),
            fed,
            read,
            samples_per_sec = rate.round(),
            blocks = self.blocks.load(Ordering::Relaxed),
            "stress run finished"
        );
        info!(
            underruns = self.underruns.load(Ordering::Relaxed),
            late_quanta = self.late_quanta.load(Ordering::Relaxed),
            feeder_waits = self.feeder_waits.load(Ordering::Relaxed),
            gain_updates = self.gain_updates.load(Ordering::Relaxed),
            lock_misses = self.lock_misses.load(Ordering::Relaxed),
            "scheduling"
        );

        let violations = self.order_violations.load(Ordering::Relaxed);
        if violations > 0 {
            error!(violations, "samples arrived out of order");
        }
    }
}

/// Gain block written by the feeder and read by the audio thread.
#[derive(Debug, Clone, Copy)]
struct GainParams {
    gain: f32,
    version: u64,
}

impl Default for GainParams {
    fn default() -> Self {
        Self {
            gain: 1.0,
            version: 0,
        }
    }
}

/// `GainParams` behind a data-less mutex.
struct SharedParams {
    lock: Mutex,
    params: UnsafeCell<GainParams>,
}

// SAFETY: params is only accessed while lock is held
unsafe impl Sync for SharedParams {}

impl SharedParams {
    fn new(lock: Mutex) -> Self {
        Self {
            lock,
            params: UnsafeCell::new(GainParams::default()),
        }
    }

    fn update(&self, f: impl FnOnce(&mut GainParams)) {
        let _guard = self.lock.lock();
        // SAFETY: guarded by self.lock
        f(unsafe { &mut *self.params.get() });
    }

    /// Copies the params out. With `wait == false` this gives up instead of
    /// blocking when the control thread holds the lock.
    fn snapshot(&self, wait: bool) -> Option<GainParams> {
        let guard = if wait {
            Some(self.lock.lock())
        } else {
            self.lock.try_lock()
        };
        // SAFETY: guarded by the lock held in `guard`
        guard.map(|_guard| unsafe { *self.params.get() })
    }
}

struct Engine {
    ring: RingBuffer<f32, STRESS_RING_LENGTH>,
    params: SharedParams,
    running: AtomicBool,
    stats: StressStats,
}

fn run_feeder(engine: &Engine, config: &StressConfig) {
    let backoff = config.quantum() / 4;
    let mut chunk = vec![0.0f32; config.feed_chunk];
    let mut next: u32 = 0;
    let mut chunks: u64 = 0;

    while engine.running.load(Ordering::Acquire) {
        // Only the reader frees space, so a chunk that fits now still fits
        // when feed_slice runs
        let free = engine.ring.capacity() - engine.ring.num_buffered();
        if free < chunk.len() {
            engine.stats.feeder_waits.fetch_add(1, Ordering::Relaxed);
            thread::sleep(backoff);
            continue;
        }

        for sample in chunk.iter_mut() {
            *sample = next as f32;
            next = (next + 1) & SEQUENCE_MASK;
        }
        let fed = engine.ring.feed_slice(&chunk);
        engine
            .stats
            .samples_fed
            .fetch_add(fed as u64, Ordering::Relaxed);

        chunks += 1;
        if chunks % config.gain_update_every == 0 {
            engine.params.update(|params| {
                params.version += 1;
                params.gain = if params.version % 2 == 0 { 1.0 } else { 0.5 };
            });
            engine.stats.gain_updates.fetch_add(1, Ordering::Relaxed);
        }
    }

    debug!(chunks, "feeder stopped");
}

fn run_audio_callback(engine: &Engine, config: &StressConfig) {
    let quantum = config.quantum();
    let stats = &engine.stats;
    let mut block = vec![0.0f32; config.block_size];
    let mut params = GainParams::default();
    let mut expected: u32 = 0;
    let mut deadline = Instant::now();

    while engine.running.load(Ordering::Acquire) {
        match engine.params.snapshot(!config.rt_try_lock) {
            Some(latest) => params = latest,
            None => {
                stats.lock_misses.fetch_add(1, Ordering::Relaxed);
            }
        }

        let got = engine.ring.read_slice(&mut block);
        if got < block.len() {
            stats.underruns.fetch_add(1, Ordering::Relaxed);
        }

        let mut peak = 0.0f32;
        for &sample in &block[..got] {
            let seq = sample as u32;
            if seq != expected {
                stats.order_violations.fetch_add(1, Ordering::Relaxed);
            }
            expected = (seq + 1) & SEQUENCE_MASK;
            peak = peak.max(sample * params.gain);
        }
        std::hint::black_box(peak);

        stats.samples_read.fetch_add(got as u64, Ordering::Relaxed);
        stats.blocks.fetch_add(1, Ordering::Relaxed);

        deadline += quantum;
        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        } else {
            stats.late_quanta.fetch_add(1, Ordering::Relaxed);
            deadline = now;
        }
    }

    debug!(gain_version = params.version, "audio callback stopped");
}

fn run_stress(config: StressConfig) -> Result<(), Box<dyn Error>> {
    // A mutex that cannot be built aborts the run before any thread starts
    let lock = Mutex::new()?;
    info!(
        backend = lock.backend_name(),
        ring_length = STRESS_RING_LENGTH,
        lock_free_slots = RingBuffer::<f32, STRESS_RING_LENGTH>::is_lock_free(),
        block_size = config.block_size,
        feed_chunk = config.feed_chunk,
        sample_rate = config.sample_rate,
        "starting stress run"
    );

    let engine = Arc::new(Engine {
        ring: RingBuffer::new(),
        params: SharedParams::new(lock),
        running: AtomicBool::new(true),
        stats: StressStats::new(),
    });
    let config = Arc::new(config);

    let feeder = {
        let engine = Arc::clone(&engine);
        let config = Arc::clone(&config);
        thread::Builder::new()
            .name("feeder".into())
            .spawn(move || run_feeder(&engine, &config))?
    };
    let audio = {
        let engine = Arc::clone(&engine);
        let config = Arc::clone(&config);
        thread::Builder::new()
            .name("audio".into())
            .spawn(move || run_audio_callback(&engine, &config))?
    };

    let start = Instant::now();
    thread::sleep(config.duration());
    engine.running.store(false, Ordering::Release);

    feeder.join().map_err(|_| "feeder thread panicked")?;
    audio.join().map_err(|_| "audio thread panicked")?;
    let elapsed = start.elapsed();

    let leftover = engine.ring.num_buffered();
    // Both sides are joined, so the reset cannot race
    engine.ring.clear();
    debug!(leftover, "ring drained");

    engine.stats.print_stats(elapsed);

    if engine.stats.order_violations.load(Ordering::Relaxed) > 0 {
        return Err("ring buffer delivered samples out of order".into());
    }
    Ok(())
}

fn arg_value<T: FromStr>(args: &[String], i: usize, flag: &str) -> Result<T, ConfigError> {
    let raw = args
        .get(i + 1)
        .ok_or_else(|| ConfigError::Invalid(format!("{flag} needs a value")))?;
    raw.parse()
        .map_err(|_| ConfigError::Invalid(format!("{flag}: cannot parse {raw:?}")))
}

fn print_help() {
    println!("ringlink stress run - feeder thread into a simulated audio callback\n");
    println!("Usage: ringlink_stress [OPTIONS]\n");
    println!("Options:");
    println!("  -c, --config <PATH>     TOML config file (flags override it)");
    println!("  -d, --duration <MS>     Run length in ms (default: 2000)");
    println!("  -b, --block <N>         Samples per audio quantum (default: 256)");
    println!("  -r, --rate <HZ>         Simulated sample rate (default: 48000)");
    println!("      --chunk <N>         Samples per feeder chunk (default: 64)");
    println!("      --blocking-lock     Audio thread waits on the mutex");
    println!("  -v, --verbose           Debug logging");
    println!("  -h, --help              Show this help");
}

/// Builds the config from `--config` and the flags. Unknown arguments are
/// returned rather than logged, since tracing is not installed yet.
fn parse_args() -> Result<(StressConfig, Vec<String>), ConfigError> {
    let args: Vec<String> = std::env::args().collect();

    // The config file is the base layer, so find it before any override
    let mut config = match args
        .iter()
        .position(|arg| arg == "--config" || arg == "-c")
    {
        Some(i) => StressConfig::load(arg_value::<String>(&args, i, "--config")?)?,
        None => StressConfig::default(),
    };

    let mut ignored = Vec::new();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => i += 1,
            "--duration" | "-d" => {
                config.duration_ms = arg_value(&args, i, "--duration")?;
                i += 1;
            }
            "--block" | "-b" => {
                config.block_size = arg_value(&args, i, "--block")?;
                i += 1;
            }
            "--rate" | "-r" => {
                config.sample_rate = arg_value(&args, i, "--rate")?;
                i += 1;
            }
            "--chunk" => {
                config.feed_chunk = arg_value(&args, i, "--chunk")?;
                i += 1;
            }
            "--blocking-lock" => config.rt_try_lock = false,
            "--verbose" | "-v" => config.verbose = true,
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => ignored.push(other.to_string()),
        }
        i += 1;
    }

    config.validate()?;
    Ok((config, ignored))
}

fn init_tracing(config: &StressConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_directive()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() {
    let (config, ignored) = match parse_args() {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    // File and flags are merged, so `verbose` from either one applies
    init_tracing(&config);
    for arg in &ignored {
        warn!(arg = %arg, "ignoring unknown argument");
    }
    debug!(?config, "stress configuration");

    if let Err(e) = run_stress(config) {
        error!("stress run failed: {}", e);
        std::process::exit(1);
    }
}
