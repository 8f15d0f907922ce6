//! Fixed balancer: constant bitrate, no adaptation
//!
//! Snapshots the configured maximum at init and returns it on every step.
//! Useful on links with known capacity and for A/B-ing the adaptive
//! algorithms.

use crate::{round_down_100k, AlgorithmConfig, Balancer, BalancerError, Output, Sample};

pub(crate) fn build(config: &AlgorithmConfig) -> Result<Box<dyn Balancer>, BalancerError> {
    Ok(Box::new(FixedBalancer::new(config)?))
}

#[derive(Debug)]
pub(crate) struct FixedBalancer {
    fixed_bitrate: i64,
}

impl FixedBalancer {
    pub(crate) fn new(config: &AlgorithmConfig) -> Result<Self, BalancerError> {
        if config.min_bitrate <= 0 || config.max_bitrate < config.min_bitrate {
            return Err(BalancerError::InitFailure(format!(
                "invalid bitrate bounds: {} - {} bps",
                config.min_bitrate, config.max_bitrate
            )));
        }
        Ok(Self {
            fixed_bitrate: round_down_100k(config.max_bitrate),
        })
    }
}

impl Balancer for FixedBalancer {
    fn step(&mut self, sample: &Sample) -> Output {
        Output {
            new_bitrate: self.fixed_bitrate,
            throughput: 0.0,
            rtt: sample.rtt.round() as i64,
            rtt_th_min: 0,
            rtt_th_max: 0,
            bs: sample.buffer_size,
            bs_th1: 0,
            bs_th2: 0,
            bs_th3: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AdaptiveParams, AimdParams};

    fn test_config(max: i64) -> AlgorithmConfig {
        AlgorithmConfig {
            min_bitrate: 500_000,
            max_bitrate: max,
            srt_latency: 2000,
            srt_pkt_size: 1316,
            adaptive: AdaptiveParams::default(),
            aimd: AimdParams::default(),
        }
    }

    #[test]
    fn test_indifferent_to_samples() {
        let mut b = FixedBalancer::new(&test_config(4_000_000)).unwrap();
        for rtt in [20.0, 600.0] {
            let out = b.step(&Sample {
                timestamp: 500,
                rtt,
                buffer_size: 250,
                send_rate_mbps: 3.0,
                pkt_loss_total: 9,
                pkt_retrans_total: 9,
            });
            assert_eq!(out.new_bitrate, 4_000_000);
        }
    }

    #[test]
    fn test_rounds_down_at_init() {
        let mut b = FixedBalancer::new(&test_config(4_250_000)).unwrap();
        let out = b.step(&Sample {
            timestamp: 500,
            rtt: 20.0,
            buffer_size: 0,
            send_rate_mbps: 0.0,
            pkt_loss_total: 0,
            pkt_retrans_total: 0,
        });
        assert_eq!(out.new_bitrate, 4_200_000);
    }

    #[test]
    fn test_echoes_sample_in_observability_fields() {
        let mut b = FixedBalancer::new(&test_config(4_000_000)).unwrap();
        let out = b.step(&Sample {
            timestamp: 500,
            rtt: 33.4,
            buffer_size: 17,
            send_rate_mbps: 3.0,
            pkt_loss_total: 0,
            pkt_retrans_total: 0,
        });
        assert_eq!(out.rtt, 33);
        assert_eq!(out.bs, 17);
        assert_eq!(out.rtt_th_min, 0);
        assert_eq!(out.rtt_th_max, 0);
        assert_eq!(out.bs_th1, 0);
    }
}
