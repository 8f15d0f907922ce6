//! Adapter contracts around the control loop
//!
//! The loop drives three collaborators it does not own: the encoder, the
//! on-screen overlay, and the pipeline progress indicator. Each has a
//! GStreamer-backed implementation in the media host and a fake in the loop
//! tests.

use balancer::Output;

/// Applies a new target bitrate to the video encoder.
pub trait EncoderControl: Send {
    /// Bitrate in bits per second. Implementations that have no dynamically
    /// controllable encoder silently ignore the call; unit conversion (bps
    /// vs kbps elements) is concealed behind the adapter.
    fn set_bitrate(&mut self, bitrate_bps: i64);
}

/// Receives the per-tick stats line. Formatting is adapter-owned.
pub trait OverlaySink: Send {
    fn update(&mut self, output: &Output);
}

/// Reports pipeline progress for stall detection.
pub trait PipelineMonitor: Send {
    /// Current playback position, or `None` when the pipeline cannot report
    /// one right now.
    fn progress(&self) -> Option<i64>;
}
