//! Command-line interface
//!
//! Positional pipeline file plus SRT target, with short options matching the
//! historical encoder tools so existing launcher scripts keep working.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "uplink",
    version,
    disable_version_flag = true,
    about = "Live video encoder with dynamic SRT bitrate control",
    after_help = cli_footer()
)]
pub struct Cli {
    /// GStreamer pipeline description file
    pub pipeline_file: PathBuf,

    /// SRT server hostname or address
    pub host: String,

    /// SRT server port
    pub port: u16,

    /// Print the version and exit
    #[arg(short = 'v', action = clap::ArgAction::Version)]
    version: Option<bool>,

    /// Configuration file (INI format)
    #[arg(short = 'c', value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Audio-video delay in milliseconds
    #[arg(
        short = 'd',
        value_name = "MS",
        default_value_t = 0,
        allow_negative_numbers = true,
        value_parser = clap::value_parser!(i64).range(-10_000..=10_000)
    )]
    pub av_delay: i64,

    /// SRT stream ID
    #[arg(short = 's', value_name = "STREAMID")]
    pub stream_id: Option<String>,

    /// SRT latency in milliseconds (default 2000, config file can override)
    #[arg(
        short = 'l',
        value_name = "MS",
        value_parser = clap::value_parser!(i64).range(100..=10_000)
    )]
    pub latency: Option<i64>,

    /// Use the reduced SRT packet size (6 instead of 7 TS packets)
    #[arg(short = 'r')]
    pub reduced_pkt_size: bool,

    /// Legacy two-line bitrate bounds file (line 1 min bps, line 2 max bps)
    #[arg(short = 'b', value_name = "FILE")]
    pub bitrate_file: Option<PathBuf>,

    /// Balancer algorithm (overrides the config file)
    #[arg(short = 'a', value_name = "NAME")]
    pub balancer: Option<String>,
}

fn cli_footer() -> String {
    format!(
        "{}\nSend SIGHUP to reload the configuration while running.",
        balancer::registry::available_summary()
    )
}
