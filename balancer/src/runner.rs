//! Balancer runner
//!
//! Resolves an algorithm from the configuration (or a CLI override), owns
//! its state for the session, and rebuilds that state when the bitrate
//! bounds are hot-reloaded.

use stream_config::{bitrate_bps, Config};

use crate::registry::{self, AlgorithmDescriptor};
use crate::{AdaptiveParams, AimdParams, AlgorithmConfig, Balancer, BalancerError, Output, Sample};

pub struct Runner {
    descriptor: &'static AlgorithmDescriptor,
    state: Box<dyn Balancer>,
    config: AlgorithmConfig,
}

impl Runner {
    /// Resolve the algorithm and initialize its state.
    ///
    /// An unknown `override_name` is an error; an unknown name in the config
    /// file falls back to the default algorithm with a warning.
    pub fn new(
        cfg: &Config,
        override_name: Option<&str>,
        srt_latency: i64,
        srt_pkt_size: i64,
    ) -> Result<Self, BalancerError> {
        let descriptor = match override_name {
            Some(name) => registry::find(name)
                .ok_or_else(|| BalancerError::UnknownAlgorithm(name.to_string()))?,
            None => registry::find(&cfg.balancer).unwrap_or_else(|| {
                tracing::warn!(
                    balancer = %cfg.balancer,
                    "unknown balancer in config, using the default"
                );
                registry::default_algorithm()
            }),
        };

        let config = AlgorithmConfig {
            min_bitrate: cfg.min_bitrate_bps(),
            max_bitrate: cfg.max_bitrate_bps(),
            srt_latency,
            srt_pkt_size,
            adaptive: AdaptiveParams {
                incr_step: bitrate_bps(cfg.adaptive.incr_step),
                decr_step: bitrate_bps(cfg.adaptive.decr_step),
                incr_interval: cfg.adaptive.incr_interval,
                decr_interval: cfg.adaptive.decr_interval,
            },
            aimd: AimdParams {
                incr_step: bitrate_bps(cfg.aimd.incr_step),
                decr_mult: cfg.aimd.decr_mult,
                incr_interval: cfg.aimd.incr_interval,
                decr_interval: cfg.aimd.decr_interval,
            },
        };

        let state = descriptor.init(&config)?;
        tracing::info!(balancer = descriptor.name, "balancer selected");
        tracing::info!(
            min_kbps = config.min_bitrate / 1000,
            max_kbps = config.max_bitrate / 1000,
            "bitrate range"
        );

        Ok(Self {
            descriptor,
            state,
            config,
        })
    }

    /// Feed one telemetry sample through the algorithm.
    pub fn step(&mut self, sample: &Sample) -> Output {
        self.state.step(sample)
    }

    /// Replace the bitrate bounds and reinitialize the algorithm.
    ///
    /// Accumulated smoothing state is intentionally discarded: the new
    /// bounds describe a different operating envelope.
    pub fn update_bounds(&mut self, min_bps: i64, max_bps: i64) -> Result<(), BalancerError> {
        self.config.min_bitrate = min_bps;
        self.config.max_bitrate = max_bps;
        self.state = self.descriptor.init(&self.config)?;
        Ok(())
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn config(&self) -> &AlgorithmConfig {
        &self.config
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("algorithm", &self.descriptor.name)
            .field("config", &self.config)
            .finish()
    }
}
