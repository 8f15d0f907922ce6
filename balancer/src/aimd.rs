//! AIMD balancer: additive increase, multiplicative decrease
//!
//! Classic TCP-style congestion control. Bitrate grows linearly while the
//! link looks healthy and is cut by a fraction on congestion, giving fair
//! sharing and stable convergence at the cost of slower adaptation than the
//! default algorithm.

use crate::{round_down_100k, AlgorithmConfig, Balancer, BalancerError, Output, Sample};

// Defaults (used when the config carries zeros)
const DEF_INCR_STEP: i64 = 50 * 1000;
const DEF_DECR_MULT: f64 = 0.75;
const DEF_INCR_INTERVAL: u64 = 500;
const DEF_DECR_INTERVAL: u64 = 200;

// Congestion detection
const RTT_MULT: f64 = 1.5; // congested when RTT > baseline * 1.5
const RTT_BASELINE_EMA: f64 = 0.95;
const BS_THRESHOLD: i64 = 100; // packets

pub(crate) fn build(config: &AlgorithmConfig) -> Result<Box<dyn Balancer>, BalancerError> {
    Ok(Box::new(AimdBalancer::new(config)?))
}

#[derive(Debug)]
pub(crate) struct AimdBalancer {
    min_bitrate: i64,
    max_bitrate: i64,
    srt_latency: i64,

    incr_step: i64,
    decr_mult: f64,
    incr_interval: u64,
    decr_interval: u64,

    cur_bitrate: i64,

    // Slow estimate of the attainable minimum RTT
    rtt_baseline: f64,

    next_incr_ts: u64,
    next_decr_ts: u64,
}

impl AimdBalancer {
    pub(crate) fn new(config: &AlgorithmConfig) -> Result<Self, BalancerError> {
        if config.min_bitrate <= 0 || config.max_bitrate < config.min_bitrate {
            return Err(BalancerError::InitFailure(format!(
                "invalid bitrate bounds: {} - {} bps",
                config.min_bitrate, config.max_bitrate
            )));
        }

        let tuning = &config.aimd;
        Ok(Self {
            min_bitrate: config.min_bitrate,
            max_bitrate: config.max_bitrate,
            srt_latency: config.srt_latency,
            incr_step: if tuning.incr_step > 0 { tuning.incr_step } else { DEF_INCR_STEP },
            decr_mult: if tuning.decr_mult > 0.0 { tuning.decr_mult } else { DEF_DECR_MULT },
            incr_interval: if tuning.incr_interval > 0 { tuning.incr_interval } else { DEF_INCR_INTERVAL },
            decr_interval: if tuning.decr_interval > 0 { tuning.decr_interval } else { DEF_DECR_INTERVAL },
            // Start optimistic
            cur_bitrate: config.max_bitrate,
            rtt_baseline: 0.0,
            next_incr_ts: 0,
            next_decr_ts: 0,
        })
    }
}

impl Balancer for AimdBalancer {
    fn step(&mut self, sample: &Sample) -> Output {
        let rtt = sample.rtt;

        // Track the RTT baseline: seed with the first sample, jump down
        // quickly, drift up slowly
        if self.rtt_baseline == 0.0 {
            self.rtt_baseline = rtt;
        } else if rtt < self.rtt_baseline {
            self.rtt_baseline = rtt;
        } else {
            self.rtt_baseline =
                self.rtt_baseline * RTT_BASELINE_EMA + rtt * (1.0 - RTT_BASELINE_EMA);
        }

        let rtt_threshold = (self.rtt_baseline * RTT_MULT) as i64;

        let mut congested = false;
        if rtt >= (self.srt_latency / 3) as f64 {
            // Emergency: drop straight to the minimum
            self.cur_bitrate = self.min_bitrate;
            self.next_decr_ts = sample.timestamp + self.decr_interval;
            congested = true;
        } else if rtt > rtt_threshold as f64 || sample.buffer_size > BS_THRESHOLD {
            congested = true;
        }

        if congested && sample.timestamp > self.next_decr_ts {
            self.cur_bitrate = (self.cur_bitrate as f64 * self.decr_mult) as i64;
            self.next_decr_ts = sample.timestamp + self.decr_interval;
        } else if !congested && sample.timestamp > self.next_incr_ts {
            self.cur_bitrate += self.incr_step;
            self.next_incr_ts = sample.timestamp + self.incr_interval;
        }

        self.cur_bitrate = self.cur_bitrate.clamp(self.min_bitrate, self.max_bitrate);

        Output {
            new_bitrate: round_down_100k(self.cur_bitrate),
            throughput: 0.0, // not tracked by AIMD
            rtt: rtt.round() as i64,
            rtt_th_min: self.rtt_baseline as i64,
            rtt_th_max: rtt_threshold,
            bs: sample.buffer_size,
            bs_th1: BS_THRESHOLD,
            bs_th2: BS_THRESHOLD,
            bs_th3: BS_THRESHOLD,
        }
    }
}
