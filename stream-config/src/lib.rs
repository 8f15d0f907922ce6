//! Configuration for the uplink encoder
//!
//! Covers the INI-style configuration file, the legacy two-line bitrate
//! bounds file, and the typed configuration snapshot handed to the rest of
//! the system.
//!
//! # Components
//!
//! - [`config`]: typed configuration with defaults and range validation
//! - [`parse`]: sectioned key/value parser and canonical serializer
//! - [`bitrate_file`]: legacy min/max bounds file
//!
//! Bitrates are kilobits per second in every file format and bits per second
//! everywhere at runtime; [`config::bitrate_bps`] is the only place the
//! conversion happens.

mod bitrate_file;
mod config;
mod error;
mod parse;

pub use bitrate_file::{load_bitrate_file, BitrateBounds};
pub use config::{
    bitrate_bps, AdaptiveSection, AimdSection, Config, ABS_MAX_BITRATE_BPS, ABS_MIN_BITRATE_BPS,
    DEFAULT_SRT_LATENCY_MS, MAX_SRT_LATENCY_MS, MIN_SRT_LATENCY_MS,
};
pub use error::ConfigError;
