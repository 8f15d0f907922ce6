//! Pipeline loading and element plumbing
//!
//! The pipeline description is a user-supplied launch string. Elements are
//! found by their conventional names: `appsink` for the SRT output tap,
//! `venc_bps` / `venc_kbps` for the encoder, `overlay` for the stats line,
//! `a_delay` / `v_delay` and `ptsfixup` for the timestamp helpers.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app as gst_app;
use tokio::sync::mpsc;

use crate::adapters::PipelineMonitor;
use crate::ptsfixup::{PtsAction, PtsFixup};

/// Read the launch string, rejecting an empty file.
pub fn load_launch_string(path: &Path) -> Result<String> {
    let launch = std::fs::read_to_string(path)
        .with_context(|| format!("failed to open the pipeline file {}", path.display()))?;
    if launch.trim().is_empty() {
        bail!("the pipeline file {} is empty", path.display());
    }
    tracing::info!("gstreamer pipeline: {}", launch.trim());
    Ok(launch)
}

pub struct PipelineHost {
    pipeline: gst::Pipeline,
}

impl PipelineHost {
    pub fn from_launch(launch: &str) -> Result<Self> {
        let element = gst::parse::launch(launch)
            .context("failed to parse the pipeline description")?;
        let pipeline = element
            .downcast::<gst::Pipeline>()
            .map_err(|_| anyhow!("the pipeline description is not a full pipeline"))?;
        Ok(Self { pipeline })
    }

    pub fn pipeline(&self) -> &gst::Pipeline {
        &self.pipeline
    }

    pub fn play(&self) -> Result<()> {
        self.pipeline
            .set_state(gst::State::Playing)
            .context("failed to start the pipeline")?;
        Ok(())
    }

    pub fn shutdown(&self) {
        let _ = self.pipeline.set_state(gst::State::Null);
    }

    /// Watch the bus from a dedicated thread; errors and end-of-stream
    /// request a stop.
    pub fn spawn_bus_watch(&self, stop: Arc<AtomicBool>) {
        let Some(bus) = self.pipeline.bus() else {
            return;
        };
        std::thread::spawn(move || loop {
            if stop.load(Ordering::SeqCst) {
                return;
            }
            let Some(msg) = bus.timed_pop(gst::ClockTime::from_mseconds(250)) else {
                continue;
            };
            match msg.view() {
                gst::MessageView::Error(err) => {
                    let source = err.src().map(|s| s.name().to_string()).unwrap_or_default();
                    tracing::error!(source = %source, "gstreamer error: {}", err.error());
                    stop.store(true, Ordering::SeqCst);
                    return;
                }
                gst::MessageView::Eos(..) => {
                    tracing::info!("gstreamer end of stream");
                    stop.store(true, Ordering::SeqCst);
                    return;
                }
                _ => {}
            }
        });
    }

    pub fn monitor(&self) -> PipelineProgress {
        PipelineProgress {
            pipeline: self.pipeline.clone(),
        }
    }

    /// Bridge the `appsink` element into a channel of raw sample payloads.
    ///
    /// Returns `None` when the pipeline has no appsink. The callback blocks
    /// when the channel is full: transport packets are never dropped here,
    /// backpressure reaches the pipeline instead.
    pub fn appsink_bridge(&self, depth: usize) -> Option<mpsc::Receiver<Vec<u8>>> {
        let appsink = self
            .pipeline
            .by_name("appsink")?
            .downcast::<gst_app::AppSink>()
            .ok()?;

        let (tx, rx) = mpsc::channel(depth);
        appsink.set_callbacks(
            gst_app::AppSinkCallbacks::builder()
                .new_sample(move |sink| {
                    let sample = sink.pull_sample().map_err(|_| gst::FlowError::Error)?;
                    let buffer = sample.buffer().ok_or(gst::FlowError::Error)?;
                    let map = buffer.map_readable().map_err(|_| gst::FlowError::Error)?;
                    if tx.blocking_send(map.as_slice().to_vec()).is_err() {
                        return Err(gst::FlowError::Eos);
                    }
                    Ok(gst::FlowSuccess::Ok)
                })
                .build(),
        );
        Some(rx)
    }

    /// Shift audio (positive delay) or video (negative) timestamps through
    /// the matching identity element.
    pub fn apply_av_delay(&self, delay_ms: i64) {
        let name = if delay_ms >= 0 { "a_delay" } else { "v_delay" };
        let Some(element) = self.pipeline.by_name(name) else {
            tracing::warn!("no {name} element in the pipeline, not applying a delay");
            return;
        };
        let Some(pad) = element.static_pad("src") else {
            return;
        };

        let offset = gst::ClockTime::from_mseconds(delay_ms.unsigned_abs());
        pad.add_probe(gst::PadProbeType::BUFFER, move |_pad, info| {
            if let Some(gst::PadProbeData::Buffer(ref mut buffer)) = info.data {
                let buffer = buffer.make_mut();
                if let Some(pts) = buffer.pts() {
                    buffer.set_pts(pts + offset);
                }
            }
            gst::PadProbeReturn::Ok
        });
    }

    /// Install the PTS regularizer on the `ptsfixup` identity element.
    pub fn install_pts_fixup(&self) {
        let Some(element) = self.pipeline.by_name("ptsfixup") else {
            tracing::warn!("no ptsfixup element in the pipeline, not removing PTS jitter");
            return;
        };
        let Some(pad) = element.static_pad("sink") else {
            return;
        };

        let fixup = Mutex::new(PtsFixup::new());
        pad.add_probe(gst::PadProbeType::BUFFER, move |pad, info| {
            if let Some(gst::PadProbeData::Buffer(ref mut buffer)) = info.data {
                let buffer = buffer.make_mut();
                // Downstream elements must key off the PTS
                buffer.set_dts(None::<gst::ClockTime>);

                if let Some(pts) = buffer.pts() {
                    let nominal = nominal_frame_period(pad);
                    let action = fixup
                        .lock()
                        .unwrap()
                        .process(pts.nseconds() as i64, nominal);
                    match action {
                        PtsAction::Passthrough => {}
                        PtsAction::Set(out) => {
                            buffer.set_pts(gst::ClockTime::from_nseconds(out as u64));
                        }
                        PtsAction::Drop => {
                            buffer.set_flags(gst::BufferFlags::DROPPABLE);
                        }
                    }
                }
            }
            gst::PadProbeReturn::Ok
        });
    }
}

/// Frame period in nanoseconds from the pad's negotiated caps.
fn nominal_frame_period(pad: &gst::Pad) -> Option<i64> {
    let caps = pad.current_caps()?;
    let structure = caps.structure(0)?;
    let framerate = structure.get::<gst::Fraction>("framerate").ok()?;
    if framerate.numer() <= 0 {
        return None;
    }
    Some(1_000_000_000i64 * framerate.denom() as i64 / framerate.numer() as i64)
}

/// Stall-detection progress source backed by a position query.
pub struct PipelineProgress {
    pipeline: gst::Pipeline,
}

impl PipelineMonitor for PipelineProgress {
    fn progress(&self) -> Option<i64> {
        self.pipeline
            .query_position::<gst::ClockTime>()
            .map(|t| t.nseconds() as i64)
    }
}
