//! GStreamer media host
//!
//! Owns the capture pipeline and the SRT output, bridges the appsink sample
//! flow into fixed-size SRT payloads, and runs the control loop against the
//! live session.

mod encoder;
mod link;
mod overlay;
mod pipeline;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use gstreamer as gst;

use balancer::clock::MonotonicClock;
use balancer::Runner;
use srt_link::{connect_with_retry, ConnectParams, PacketSink};

use crate::cli::Cli;
use crate::control::{Adapters, ControlFlags, ControlLoop, ReloadSources};
use crate::packetizer::Packetizer;
use crate::signals;

use encoder::GstEncoderControl;
use link::GstSrtConnector;
use overlay::GstOverlaySink;
use pipeline::PipelineHost;

pub fn run(cli: Cli, runner: Runner, srt_latency: i64, pkt_size: usize) -> Result<()> {
    gst::init().context("failed to initialize gstreamer")?;

    let launch = pipeline::load_launch_string(&cli.pipeline_file)?;
    let host = PipelineHost::from_launch(&launch)?;

    let flags = ControlFlags::new();
    host.spawn_bus_watch(flags.stop.clone());

    let mut encoder = GstEncoderControl::from_pipeline(host.pipeline());
    let max_bps = runner.config().max_bitrate;
    if encoder.is_available() {
        // Start the encoder at the configured maximum
        use crate::adapters::EncoderControl;
        encoder.set_bitrate(max_bps);
    }

    let overlay = GstOverlaySink::from_pipeline(host.pipeline());

    tracing::info!(av_delay_ms = cli.av_delay, "A-V delay");
    host.apply_av_delay(cli.av_delay);
    host.install_pts_fixup();

    let frames = host.appsink_bridge(32);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build the runtime")?;

    runtime.block_on(async {
        signals::install(&flags);

        let params = ConnectParams {
            host: cli.host.clone(),
            port: cli.port,
            stream_id: cli.stream_id.clone(),
            latency_ms: srt_latency,
            pkt_size,
        };
        let Some(session) = connect_with_retry(&GstSrtConnector, &params, &flags.stop).await
        else {
            tracing::info!("stop requested before the SRT connection came up");
            host.shutdown();
            return Ok(());
        };

        host.play()?;

        // Send path: appsink samples split/merged into SRT payloads. A send
        // failure is fatal for the whole process.
        match frames {
            Some(mut frames) => {
                let sink = session.clone();
                let stop = flags.stop.clone();
                tokio::spawn(async move {
                    let mut packetizer = Packetizer::new(pkt_size);
                    while let Some(data) = frames.recv().await {
                        for pkt in packetizer.push(&data) {
                            if let Err(err) = sink.send(&pkt).await {
                                if !stop.swap(true, Ordering::SeqCst) {
                                    tracing::error!("the SRT connection failed, exiting: {err}");
                                }
                                return;
                            }
                        }
                    }
                });
            }
            None => {
                tracing::warn!("no appsink element in the pipeline, nothing will be sent over SRT");
            }
        }

        let control = ControlLoop::new(
            session.clone(),
            runner,
            Adapters {
                encoder: Box::new(encoder),
                overlay: Box::new(overlay),
                monitor: Box::new(host.monitor()),
            },
            Arc::new(MonotonicClock::new()),
            flags.clone(),
            ReloadSources {
                config_file: cli.config_file.clone(),
                bitrate_file: cli.bitrate_file.clone(),
            },
        )
        .with_initial_bitrate(max_bps);

        let reason = control.run().await;
        tracing::info!(%reason, "shutting down");

        // If the drain below wedges, the watchdog ends the process
        signals::arm_exit_watchdog(Duration::from_secs(3));
        session.close();
        host.shutdown();
        Ok(())
    })
}
