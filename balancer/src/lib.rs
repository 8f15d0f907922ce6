//! Bitrate balancer algorithms for live SRT streaming
//!
//! A balancer turns periodic transport telemetry (RTT, send-buffer
//! occupancy, throughput, cumulative loss counters) into a target encoder
//! bitrate. Algorithms share one contract so the encoder can switch between
//! them by name.
//!
//! # Components
//!
//! - [`clock`]: monotonic millisecond timestamps, injectable for tests
//! - [`registry`]: name lookup over the registered algorithms
//! - [`runner`]: owns one algorithm instance and mediates bounds reloads
//! - `adaptive` / `aimd` / `fixed`: the algorithm implementations
//!
//! The balancer core is synchronous and performs no I/O; it is driven with
//! one [`Sample`] per telemetry tick and always produces an [`Output`].

pub mod clock;
pub mod registry;
pub mod runner;

mod adaptive;
mod aimd;
mod error;
mod fixed;

pub use error::BalancerError;
pub use runner::Runner;

/// One telemetry observation, taken every update tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Monotonic timestamp in milliseconds
    pub timestamp: u64,
    /// Smoothed round-trip time reported by the transport (ms)
    pub rtt: f64,
    /// Outstanding unacknowledged packets in the send buffer
    pub buffer_size: i64,
    /// Current send rate (Mbps)
    pub send_rate_mbps: f64,
    /// Cumulative packets lost over the session
    pub pkt_loss_total: i64,
    /// Cumulative packets retransmitted over the session
    pub pkt_retrans_total: i64,
}

/// Balancer decision plus the observability fields shown on the overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Output {
    /// Target encoder bitrate (bps, rounded down to a 100 kbps multiple)
    pub new_bitrate: i64,
    /// Smoothed throughput estimate
    pub throughput: f64,
    /// Current RTT (ms)
    pub rtt: i64,
    /// RTT thresholds in effect (ms)
    pub rtt_th_min: i64,
    pub rtt_th_max: i64,
    /// Current buffer size and the three buffer thresholds (packets)
    pub bs: i64,
    pub bs_th1: i64,
    pub bs_th2: i64,
    pub bs_th3: i64,
}

/// Configuration handed to an algorithm at init, all bitrates in bps.
///
/// Tuning values of zero mean "use the algorithm default".
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmConfig {
    pub min_bitrate: i64,
    pub max_bitrate: i64,
    pub srt_latency: i64,
    pub srt_pkt_size: i64,
    pub adaptive: AdaptiveParams,
    pub aimd: AimdParams,
}

/// Adaptive algorithm tuning (bps / ms).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AdaptiveParams {
    pub incr_step: i64,
    pub decr_step: i64,
    pub incr_interval: u64,
    pub decr_interval: u64,
}

/// AIMD algorithm tuning (bps / ms, multiplier in (0, 1)).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AimdParams {
    pub incr_step: i64,
    pub decr_mult: f64,
    pub incr_interval: u64,
    pub decr_interval: u64,
}

/// A running balancer algorithm instance.
///
/// `step` is total: it must not fail and must not perform I/O. State is
/// dropped when the instance is dropped.
pub trait Balancer: Send {
    fn step(&mut self, sample: &Sample) -> Output;
}

/// Round a bitrate down to the nearest 100 kbps multiple for publishing.
///
/// Internal state keeps the unrounded value so repeated small increments
/// aggregate instead of being rounded away.
pub fn round_down_100k(bps: i64) -> i64 {
    bps / (100 * 1000) * (100 * 1000)
}
