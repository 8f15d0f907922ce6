//! The periodic control loop
//!
//! Every 20 ms: read transport telemetry, feed the balancer, push the result
//! to the encoder and the overlay. Every second: check pipeline progress and
//! a pending reload request. The loop owns the balancer runner; everything
//! else is reached through adapter contracts so the whole loop runs against
//! fakes in tests.
//!
//! Lifecycle: the session is connected before the loop starts; the loop then
//! stays in its running state, briefly entering a reload when SIGHUP asked
//! for one, until a stop is requested or a fatal condition (ACK timeout,
//! pipeline stall, failed reload) drains it.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use balancer::clock::Clock;
use balancer::{Runner, Sample};
use srt_link::{AckWatchdog, Session};
use stream_config::{load_bitrate_file, Config};
use tokio::time::MissedTickBehavior;

use crate::adapters::{EncoderControl, OverlaySink, PipelineMonitor};

/// Telemetry and bitrate update period
pub const UPDATE_INTERVAL: Duration = Duration::from_millis(20);
/// Pipeline progress and reload-flag polling period
pub const STALL_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Why the loop exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The stop flag was set by a signal or the media host
    Requested,
    /// No new ACKs arrived within the timeout
    AckTimeout,
    /// The pipeline position stopped advancing
    PipelineStall,
    /// The balancer could not be re-initialized after a bounds reload
    ReloadFailed,
}

impl std::fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ShutdownReason::Requested => "stop requested",
            ShutdownReason::AckTimeout => "SRT connection timed out",
            ShutdownReason::PipelineStall => "pipeline stall",
            ShutdownReason::ReloadFailed => "reload failed",
        };
        f.write_str(text)
    }
}

/// Flags shared with the signal handlers and the send path.
#[derive(Debug, Clone, Default)]
pub struct ControlFlags {
    pub stop: Arc<AtomicBool>,
    pub reload: Arc<AtomicBool>,
}

impl ControlFlags {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Where hot-reloaded bounds come from. The config file wins; the legacy
/// bitrate file is only consulted when no config file was given.
#[derive(Debug, Clone, Default)]
pub struct ReloadSources {
    pub config_file: Option<PathBuf>,
    pub bitrate_file: Option<PathBuf>,
}

/// The loop's external collaborators.
pub struct Adapters {
    pub encoder: Box<dyn EncoderControl>,
    pub overlay: Box<dyn OverlaySink>,
    pub monitor: Box<dyn PipelineMonitor>,
}

/// Detects a stalled pipeline: the same position reported by two
/// consecutive observations. Failed position queries are skipped.
#[derive(Debug, Default)]
pub struct StallDetector {
    prev: Option<i64>,
}

impl StallDetector {
    pub fn observe(&mut self, position: Option<i64>) -> bool {
        let Some(pos) = position else {
            return false;
        };
        let stalled = self.prev == Some(pos);
        self.prev = Some(pos);
        stalled
    }
}

pub struct ControlLoop {
    session: Arc<dyn Session>,
    runner: Runner,
    adapters: Adapters,
    clock: Arc<dyn Clock>,
    flags: ControlFlags,
    reload_sources: ReloadSources,
    watchdog: AckWatchdog,
    stall: StallDetector,
    last_applied: Option<i64>,
}

impl ControlLoop {
    pub fn new(
        session: Arc<dyn Session>,
        runner: Runner,
        adapters: Adapters,
        clock: Arc<dyn Clock>,
        flags: ControlFlags,
        reload_sources: ReloadSources,
    ) -> Self {
        Self {
            session,
            runner,
            adapters,
            clock,
            flags,
            reload_sources,
            watchdog: AckWatchdog::with_default_timeout(),
            stall: StallDetector::default(),
            last_applied: None,
        }
    }

    /// Seed the encoder change detection, for when a bitrate was already
    /// applied before the loop started.
    pub fn with_initial_bitrate(mut self, bitrate_bps: i64) -> Self {
        self.last_applied = Some(bitrate_bps);
        self
    }

    /// Drive the loop until a stop is requested or a fatal condition hits.
    pub async fn run(mut self) -> ShutdownReason {
        let mut update = tokio::time::interval(UPDATE_INTERVAL);
        update.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut stall_check = tokio::time::interval(STALL_CHECK_INTERVAL);
        stall_check.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(balancer = self.runner.name(), "control loop running");

        loop {
            tokio::select! {
                _ = update.tick() => {
                    if self.flags.stop.load(Ordering::SeqCst) {
                        tracing::info!("stop requested, draining");
                        return ShutdownReason::Requested;
                    }
                    if self.flags.reload.swap(false, Ordering::SeqCst) && !self.handle_reload() {
                        return ShutdownReason::ReloadFailed;
                    }
                    if let Some(reason) = self.telemetry_tick() {
                        return reason;
                    }
                }
                _ = stall_check.tick() => {
                    if self.stall.observe(self.adapters.monitor.progress()) {
                        tracing::error!("pipeline stall detected, will exit now");
                        return ShutdownReason::PipelineStall;
                    }
                }
            }
        }
    }

    // One telemetry acquisition and balancer step. Acquisition failures are
    // transient: skip the tick, touch no state.
    fn telemetry_tick(&mut self) -> Option<ShutdownReason> {
        let stats = match self.session.stats() {
            Ok(stats) => stats,
            Err(err) => {
                tracing::debug!("skipping update, {err}");
                return None;
            }
        };
        let buffer_size = match self.session.buffer_size() {
            Ok(size) => size,
            Err(err) => {
                tracing::debug!("skipping update, {err}");
                return None;
            }
        };

        let now = self.clock.now_ms();
        if self.watchdog.observe(stats.ack_count, now) {
            tracing::error!("the SRT connection timed out, exiting");
            return Some(ShutdownReason::AckTimeout);
        }

        let sample = Sample {
            timestamp: now,
            rtt: stats.rtt_ms,
            buffer_size,
            send_rate_mbps: stats.send_rate_mbps,
            pkt_loss_total: stats.pkt_loss_total,
            pkt_retrans_total: stats.pkt_retrans_total,
        };
        let output = self.runner.step(&sample);

        if self.last_applied != Some(output.new_bitrate) {
            self.adapters.encoder.set_bitrate(output.new_bitrate);
            self.last_applied = Some(output.new_bitrate);
        }
        self.adapters.overlay.update(&output);
        None
    }

    // Apply one pending reload. Returns false only when the balancer could
    // not be re-initialized, which is fatal.
    fn handle_reload(&mut self) -> bool {
        let mut reloaded = false;

        if let Some(path) = &self.reload_sources.config_file {
            match Config::load(path) {
                Ok(cfg) => {
                    match self
                        .runner
                        .update_bounds(cfg.min_bitrate_bps(), cfg.max_bitrate_bps())
                    {
                        Ok(()) => {
                            tracing::info!(
                                min_kbps = cfg.min_bitrate,
                                max_kbps = cfg.max_bitrate,
                                "config reloaded"
                            );
                            reloaded = true;
                        }
                        Err(err) => {
                            tracing::error!("balancer re-init failed after reload: {err}");
                            return false;
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), "failed to reload config file: {err}");
                }
            }
        }

        if !reloaded {
            if let Some(path) = &self.reload_sources.bitrate_file {
                match load_bitrate_file(path) {
                    Ok(bounds) => match self.runner.update_bounds(bounds.min_bps, bounds.max_bps) {
                        Ok(()) => {
                            tracing::info!(
                                min_bps = bounds.min_bps,
                                max_bps = bounds.max_bps,
                                "bitrate bounds reloaded"
                            );
                        }
                        Err(err) => {
                            tracing::error!("balancer re-init failed after reload: {err}");
                            return false;
                        }
                    },
                    Err(err) => {
                        tracing::warn!(path = %path.display(), "failed to reload bitrate file: {err}");
                    }
                }
            }
        }

        true
    }
}
