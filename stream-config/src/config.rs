//! Typed configuration snapshot with defaults and validation

use std::path::Path;

use crate::error::ConfigError;
use crate::parse;

/// Hard floor for any configured bitrate (bits per second)
pub const ABS_MIN_BITRATE_BPS: i64 = 300 * 1000;
/// Hard ceiling for any configured bitrate (bits per second)
pub const ABS_MAX_BITRATE_BPS: i64 = 30 * 1000 * 1000;

/// Allowed SRT latency range (milliseconds)
pub const MIN_SRT_LATENCY_MS: i64 = 100;
pub const MAX_SRT_LATENCY_MS: i64 = 10_000;
pub const DEFAULT_SRT_LATENCY_MS: i64 = 2_000;

// File-format defaults ([general] / [srt])
const DEF_MIN_BITRATE_KBPS: i64 = 300;
const DEF_MAX_BITRATE_KBPS: i64 = 6_000;
const DEF_BALANCER: &str = "adaptive";

/// Convert a configured kilobit/s value to runtime bits per second.
///
/// The single choke point between file units and runtime units.
pub fn bitrate_bps(kbps: i64) -> i64 {
    kbps * 1000
}

/// `[adaptive]` tuning, kilobits per second and milliseconds as in the file.
///
/// A zero value means "use the algorithm default".
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveSection {
    pub incr_step: i64,
    pub decr_step: i64,
    pub incr_interval: u64,
    pub decr_interval: u64,
    /// Accepted and carried for forward compatibility; the algorithm
    /// currently uses its built-in loss threshold.
    pub loss_threshold: f64,
}

impl Default for AdaptiveSection {
    fn default() -> Self {
        Self {
            incr_step: 30,
            decr_step: 100,
            incr_interval: 500,
            decr_interval: 200,
            loss_threshold: 0.5,
        }
    }
}

/// `[aimd]` tuning, kilobits per second and milliseconds as in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct AimdSection {
    pub incr_step: i64,
    pub decr_mult: f64,
    pub incr_interval: u64,
    pub decr_interval: u64,
}

impl Default for AimdSection {
    fn default() -> Self {
        Self {
            incr_step: 50,
            decr_mult: 0.75,
            incr_interval: 500,
            decr_interval: 200,
        }
    }
}

/// Immutable configuration snapshot.
///
/// Bitrate fields hold kilobits per second exactly as written in the file;
/// use the `*_bps` accessors at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub min_bitrate: i64,
    pub max_bitrate: i64,
    pub balancer: String,
    pub srt_latency: i64,
    pub adaptive: AdaptiveSection,
    pub aimd: AimdSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_bitrate: DEF_MIN_BITRATE_KBPS,
            max_bitrate: DEF_MAX_BITRATE_KBPS,
            balancer: DEF_BALANCER.to_string(),
            srt_latency: DEFAULT_SRT_LATENCY_MS,
            adaptive: AdaptiveSection::default(),
            aimd: AimdSection::default(),
        }
    }
}

impl Config {
    /// Parse configuration text, starting from defaults.
    ///
    /// Unknown sections and keys are ignored; the parser itself never fails.
    pub fn from_ini_str(input: &str) -> Self {
        let mut cfg = Config::default();
        parse::apply_ini(&mut cfg, input);
        cfg
    }

    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let cfg = Self::from_ini_str(&content);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize to the canonical INI layout.
    pub fn to_ini_string(&self) -> String {
        parse::serialize_ini(self)
    }

    /// Check bounds and latency against the allowed ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let min_bps = self.min_bitrate_bps();
        let max_bps = self.max_bitrate_bps();
        for (field, value) in [("min_bitrate", min_bps), ("max_bitrate", max_bps)] {
            if !(ABS_MIN_BITRATE_BPS..=ABS_MAX_BITRATE_BPS).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    field,
                    value,
                    min: ABS_MIN_BITRATE_BPS,
                    max: ABS_MAX_BITRATE_BPS,
                });
            }
        }
        if min_bps > max_bps {
            return Err(ConfigError::InvertedBounds {
                min: min_bps,
                max: max_bps,
            });
        }
        if !(MIN_SRT_LATENCY_MS..=MAX_SRT_LATENCY_MS).contains(&self.srt_latency) {
            return Err(ConfigError::OutOfRange {
                field: "latency",
                value: self.srt_latency,
                min: MIN_SRT_LATENCY_MS,
                max: MAX_SRT_LATENCY_MS,
            });
        }
        Ok(())
    }

    pub fn min_bitrate_bps(&self) -> i64 {
        bitrate_bps(self.min_bitrate)
    }

    pub fn max_bitrate_bps(&self) -> i64 {
        bitrate_bps(self.max_bitrate)
    }
}
