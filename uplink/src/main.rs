//! uplink: live video encoder with dynamic SRT bitrate control
//!
//! Loads a GStreamer pipeline description, streams its output over SRT, and
//! drives the encoder bitrate from transport telemetry through a pluggable
//! balancer algorithm. Configuration reloads on SIGHUP without restarting
//! the stream.

mod adapters;
mod cli;
mod control;
mod packetizer;
mod ptsfixup;
mod signals;

#[cfg(feature = "media")]
mod media;

use anyhow::{Context, Result};
use clap::Parser;

use balancer::{registry, BalancerError, Runner};
use srt_link::{DEFAULT_PKT_SIZE, REDUCED_PKT_SIZE};
use stream_config::{load_bitrate_file, Config};

use crate::cli::Cli;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::default();
    if let Some(path) = &cli.config_file {
        config = Config::load(path)
            .with_context(|| format!("failed to load config file {}", path.display()))?;
        tracing::info!(path = %path.display(), "loaded configuration");
    }

    // Legacy bounds file: validated up front, applied after the runner is
    // built so it wins over the config file (last write wins)
    let legacy_bounds = match &cli.bitrate_file {
        Some(path) => Some(
            load_bitrate_file(path)
                .with_context(|| format!("failed to read bitrate file {}", path.display()))?,
        ),
        None => None,
    };

    // Explicit -l beats the config file, which beats the default
    let srt_latency = cli.latency.unwrap_or(config.srt_latency);
    let pkt_size = if cli.reduced_pkt_size {
        REDUCED_PKT_SIZE
    } else {
        DEFAULT_PKT_SIZE
    };

    let mut runner = match Runner::new(&config, cli.balancer.as_deref(), srt_latency, pkt_size as i64)
    {
        Ok(runner) => runner,
        Err(BalancerError::UnknownAlgorithm(name)) => {
            eprintln!("Unknown balancer algorithm: {name}\n");
            eprint!("{}", registry::available_summary());
            std::process::exit(1);
        }
        Err(err) => return Err(err).context("failed to initialize the balancer"),
    };

    if let Some(bounds) = legacy_bounds {
        runner
            .update_bounds(bounds.min_bps, bounds.max_bps)
            .context("failed to apply the bitrate file bounds")?;
    }

    #[cfg(feature = "media")]
    return media::run(cli, runner, srt_latency, pkt_size);

    #[cfg(not(feature = "media"))]
    {
        let _ = (runner, srt_latency, pkt_size);
        anyhow::bail!(
            "this build carries no media pipeline host; rebuild with `--features media` \
             to stream {} to {}:{}",
            cli.pipeline_file.display(),
            cli.host,
            cli.port
        );
    }
}
