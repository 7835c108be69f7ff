//! Configuration for the feeder/audio-callback stress run.
//!
//! Values come from three layers, later ones winning: built-in defaults, an
//! optional TOML file, then command-line flags (parsed by the binary).

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Slots in the stress run's ring buffer. One is never filled.
pub const STRESS_RING_LENGTH: usize = 4096;

/// Stress run configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StressConfig {
    /// How long both threads run, in milliseconds.
    pub duration_ms: u64,
    /// Samples the audio thread drains per quantum.
    pub block_size: usize,
    /// Simulated output rate; sets the quantum period.
    pub sample_rate: u32,
    /// Samples the feeder pushes per chunk.
    pub feed_chunk: usize,
    /// Feeder updates the shared gain every this many chunks.
    pub gain_update_every: u64,
    /// Audio thread reads the gain with `try_lock` instead of `lock`.
    pub rt_try_lock: bool,
    /// Debug-level logging when `RUST_LOG` is not set.
    pub verbose: bool,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            duration_ms: 2_000,
            block_size: 256,
            sample_rate: 48_000,
            feed_chunk: 64,
            gain_update_every: 32,
            rt_try_lock: true,
            verbose: false,
        }
    }
}

impl StressConfig {
    /// Parses a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), "loaded stress config");
        Ok(config)
    }

    /// Checks the values against the ring capacity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let capacity = STRESS_RING_LENGTH - 1;

        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be positive".into()));
        }
        if self.block_size == 0 || self.block_size > capacity {
            return Err(ConfigError::Invalid(format!(
                "block_size must be in 1..={capacity}, got {}",
                self.block_size
            )));
        }
        if self.feed_chunk == 0 || self.feed_chunk > capacity {
            return Err(ConfigError::Invalid(format!(
                "feed_chunk must be in 1..={capacity}, got {}",
                self.feed_chunk
            )));
        }
        if self.gain_update_every == 0 {
            return Err(ConfigError::Invalid(
                "gain_update_every must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Wall-clock length of one audio quantum.
    pub fn quantum(&self) -> Duration {
        Duration::from_nanos(self.block_size as u64 * 1_000_000_000 / u64::from(self.sample_rate))
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Default `EnvFilter` directive for the stress binary.
    pub fn log_directive(&self) -> &'static str {
        if self.verbose {
            "ringlink=debug"
        } else {
            "ringlink=info"
        }
    }
}
