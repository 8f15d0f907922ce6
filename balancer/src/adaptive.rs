//! Adaptive balancer: RTT and buffer-based bitrate control
//!
//! The default algorithm. It smooths the transport telemetry into averages
//! and jitter envelopes, derives congestion thresholds from them, and picks
//! one of four actions per tick: emergency drop to the minimum, fast
//! decrease, slow decrease, or rate-limited increase.

use crate::{round_down_100k, AlgorithmConfig, Balancer, BalancerError, Output, Sample};

// Default tuning (used when the config carries zeros)
const DEF_INCR_STEP: i64 = 30 * 1000;
const DEF_DECR_STEP: i64 = 100 * 1000;
const DEF_INCR_INTERVAL: u64 = 500;
const DEF_DECR_INTERVAL: u64 = 200;
// Heavy congestion re-arms faster than the configured decrease interval
const FAST_DECR_INTERVAL: u64 = 250;

// Scaling of the proportional part of increase/decrease steps
const INCR_SCALE: i64 = 30;
const DECR_SCALE: i64 = 10;

// Exponential moving average weights
const EMA_SLOW: f64 = 0.99;
const EMA_FAST: f64 = 0.01;
const EMA_RTT_DELTA: f64 = 0.8;
const EMA_RTT_DELTA_NEW: f64 = 0.2;
const EMA_THROUGHPUT: f64 = 0.97;
const EMA_THROUGHPUT_NEW: f64 = 0.03;
const EMA_LOSS: f64 = 0.9;
const EMA_LOSS_NEW: f64 = 0.1;

// Congestion when more than this many lost+retransmitted packets per tick
// survive the smoothing
const LOSS_RATE_THRESHOLD: f64 = 0.5;

// RTT floor tracking
const RTT_MIN_DRIFT: f64 = 1.001;
const RTT_IGNORE_VALUE: i64 = 100; // reported when the transport has no measurement
const RTT_INITIAL: i64 = 300;
const RTT_MIN_INITIAL: f64 = 200.0;

// Threshold shaping
const BS_TH3_MULT: f64 = 4.0;
const BS_TH2_JITTER_MULT: f64 = 3.0;
const BS_TH1_JITTER_MULT: f64 = 2.5;
const BS_TH_MIN: f64 = 50.0;
const RTT_JITTER_MULT: f64 = 4.0;
const RTT_AVG_FRACTION: f64 = 0.15;
const RTT_STABLE_DELTA: f64 = 0.01;
const RTT_MIN_JITTER: f64 = 1.0;

pub(crate) fn build(config: &AlgorithmConfig) -> Result<Box<dyn Balancer>, BalancerError> {
    Ok(Box::new(AdaptiveBalancer::new(config)?))
}

/// State of one adaptive session. Created at init, replaced on bounds reload.
#[derive(Debug)]
pub(crate) struct AdaptiveBalancer {
    // Configuration
    min_bitrate: i64,
    max_bitrate: i64,
    srt_latency: i64,
    srt_pkt_size: i64,
    incr_step: i64,
    decr_step: i64,
    incr_interval: u64,
    decr_interval: u64,

    // Current bitrate, unrounded
    cur_bitrate: i64,

    // Buffer size smoothing
    bs_avg: f64,
    bs_jitter: f64,
    prev_bs: i64,

    // RTT smoothing
    rtt_avg: f64,
    rtt_min: f64,
    rtt_jitter: f64,
    rtt_avg_delta: f64,
    prev_rtt: i64,

    // Throughput smoothing
    throughput: f64,

    // Packet loss smoothing
    loss_rate: f64,
    prev_pkt_loss: i64,
    prev_pkt_retrans: i64,

    // Rate limiting of bitrate changes
    next_incr_ts: u64,
    next_decr_ts: u64,
}

impl AdaptiveBalancer {
    pub(crate) fn new(config: &AlgorithmConfig) -> Result<Self, BalancerError> {
        if config.min_bitrate <= 0 || config.max_bitrate < config.min_bitrate {
            return Err(BalancerError::InitFailure(format!(
                "invalid bitrate bounds: {} - {} bps",
                config.min_bitrate, config.max_bitrate
            )));
        }

        let tuning = &config.adaptive;
        Ok(Self {
            min_bitrate: config.min_bitrate,
            max_bitrate: config.max_bitrate,
            srt_latency: config.srt_latency,
            srt_pkt_size: config.srt_pkt_size,
            incr_step: if tuning.incr_step > 0 { tuning.incr_step } else { DEF_INCR_STEP },
            decr_step: if tuning.decr_step > 0 { tuning.decr_step } else { DEF_DECR_STEP },
            incr_interval: if tuning.incr_interval > 0 { tuning.incr_interval } else { DEF_INCR_INTERVAL },
            decr_interval: if tuning.decr_interval > 0 { tuning.decr_interval } else { DEF_DECR_INTERVAL },

            // Start optimistic, at the configured maximum
            cur_bitrate: config.max_bitrate,

            bs_avg: 0.0,
            bs_jitter: 0.0,
            prev_bs: 0,

            rtt_avg: 0.0,
            rtt_min: RTT_MIN_INITIAL,
            rtt_jitter: 0.0,
            rtt_avg_delta: 0.0,
            prev_rtt: RTT_INITIAL,

            throughput: 0.0,

            loss_rate: 0.0,
            prev_pkt_loss: 0,
            prev_pkt_retrans: 0,

            next_incr_ts: 0,
            next_decr_ts: 0,
        })
    }

    // Buffer occupancy equivalent of holding `rtt_ms` worth of data at the
    // current throughput estimate
    fn rtt_to_bs(&self, rtt_ms: i64) -> i64 {
        ((self.throughput / 8.0) * rtt_ms as f64 / self.srt_pkt_size as f64) as i64
    }
}

impl Balancer for AdaptiveBalancer {
    fn step(&mut self, sample: &Sample) -> Output {
        let bs = sample.buffer_size;
        let rtt = sample.rtt;
        let rtt_int = rtt.round() as i64;
        let now = sample.timestamp;

        // Packet loss tracking. Counter resets show up as negative deltas
        // and are treated as zero.
        let loss_delta = (sample.pkt_loss_total - self.prev_pkt_loss).max(0);
        let retrans_delta = (sample.pkt_retrans_total - self.prev_pkt_retrans).max(0);
        self.prev_pkt_loss = sample.pkt_loss_total;
        self.prev_pkt_retrans = sample.pkt_retrans_total;

        if loss_delta > 0 || retrans_delta > 0 {
            let new_loss = (loss_delta + retrans_delta) as f64;
            self.loss_rate = self.loss_rate * EMA_LOSS + new_loss * EMA_LOSS_NEW;
        } else {
            self.loss_rate *= EMA_LOSS;
        }
        let pkt_loss_congestion = self.loss_rate > LOSS_RATE_THRESHOLD;

        // Send buffer size stats: rolling average plus a decaying envelope
        // of forward jumps
        self.bs_avg = self.bs_avg * EMA_SLOW + bs as f64 * EMA_FAST;
        self.bs_jitter *= EMA_SLOW;
        let delta_bs = (bs - self.prev_bs) as f64;
        if delta_bs > self.bs_jitter {
            self.bs_jitter = delta_bs;
        }
        self.prev_bs = bs;

        // RTT stats
        if self.rtt_avg == 0.0 {
            self.rtt_avg = rtt;
        } else {
            self.rtt_avg = self.rtt_avg * EMA_SLOW + rtt * EMA_FAST;
        }

        let delta_rtt = rtt - self.prev_rtt as f64;
        self.rtt_avg_delta = self.rtt_avg_delta * EMA_RTT_DELTA + delta_rtt * EMA_RTT_DELTA_NEW;
        self.prev_rtt = rtt_int;

        // The floor drifts up so it can track a route change; a sample only
        // lowers it while the RTT is not rising
        self.rtt_min *= RTT_MIN_DRIFT;
        if rtt_int != RTT_IGNORE_VALUE && rtt < self.rtt_min && self.rtt_avg_delta < 1.0 {
            self.rtt_min = rtt;
        }

        self.rtt_jitter *= EMA_SLOW;
        if delta_rtt > self.rtt_jitter {
            self.rtt_jitter = delta_rtt;
        }

        // Rolling average of the network throughput
        self.throughput *= EMA_THROUGHPUT;
        self.throughput += (sample.send_rate_mbps * 1000.0 * 1000.0 / 1024.0) * EMA_THROUGHPUT_NEW;

        // Thresholds
        let bs_th3 = ((self.bs_avg + self.bs_jitter) * BS_TH3_MULT) as i64;
        let mut bs_th2 =
            BS_TH_MIN.max(self.bs_avg + (self.bs_jitter * BS_TH2_JITTER_MULT).max(self.bs_avg)) as i64;
        // Never let the medium threshold exceed half the configured latency
        // worth of buffered data
        bs_th2 = bs_th2.min(self.rtt_to_bs(self.srt_latency / 2));
        let bs_th1 = BS_TH_MIN.max(self.bs_avg + self.bs_jitter * BS_TH1_JITTER_MULT) as i64;
        let rtt_th_max = (self.rtt_avg
            + (self.rtt_jitter * RTT_JITTER_MULT).max(self.rtt_avg * RTT_AVG_FRACTION))
            as i64;
        let rtt_th_min = (self.rtt_min + RTT_MIN_JITTER.max(self.rtt_jitter * 2.0)) as i64;

        // Decision, in strict priority order:
        // 1. emergency: RTT at a third of the latency budget, or the buffer
        //    blown far past its average
        // 2. heavy: RTT at a fifth of the budget, buffer past bs_th2, or
        //    sustained packet loss
        // 3. light: RTT or buffer past the jitter-derived thresholds
        // 4. stable: RTT low and flat, no loss -> increase
        let mut bitrate = self.cur_bitrate;

        if bitrate > self.min_bitrate && (rtt_int >= self.srt_latency / 3 || bs > bs_th3) {
            bitrate = self.min_bitrate;
            self.next_decr_ts = now + self.decr_interval;
        } else if now > self.next_decr_ts
            && (rtt_int > self.srt_latency / 5 || bs > bs_th2 || pkt_loss_congestion)
        {
            bitrate -= self.decr_step + bitrate / DECR_SCALE;
            self.next_decr_ts = now + FAST_DECR_INTERVAL;
        } else if now > self.next_decr_ts && (rtt_int > rtt_th_max || bs > bs_th1) {
            bitrate -= self.decr_step;
            self.next_decr_ts = now + self.decr_interval;
        } else if now > self.next_incr_ts
            && rtt_int < rtt_th_min
            && self.rtt_avg_delta < RTT_STABLE_DELTA
            && !pkt_loss_congestion
        {
            bitrate += self.incr_step + bitrate / INCR_SCALE;
            self.next_incr_ts = now + self.incr_interval;
        }

        self.cur_bitrate = bitrate.clamp(self.min_bitrate, self.max_bitrate);

        Output {
            new_bitrate: round_down_100k(self.cur_bitrate),
            throughput: self.throughput,
            rtt: rtt_int,
            rtt_th_min,
            rtt_th_max,
            bs,
            bs_th1,
            bs_th2,
            bs_th3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AdaptiveParams, AimdParams};

    fn test_config(min: i64, max: i64) -> AlgorithmConfig {
        AlgorithmConfig {
            min_bitrate: min,
            max_bitrate: max,
            srt_latency: 2000,
            srt_pkt_size: 1316,
            adaptive: AdaptiveParams::default(),
            aimd: AimdParams::default(),
        }
    }

    fn good_sample(timestamp: u64) -> Sample {
        Sample {
            timestamp,
            rtt: 30.0,
            buffer_size: 10,
            send_rate_mbps: 5.0,
            pkt_loss_total: 0,
            pkt_retrans_total: 0,
        }
    }

    #[test]
    fn test_starts_at_max() {
        let mut b = AdaptiveBalancer::new(&test_config(500_000, 6_000_000)).unwrap();
        let out = b.step(&good_sample(500));
        assert_eq!(out.new_bitrate, 6_000_000);
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        assert!(matches!(
            AdaptiveBalancer::new(&test_config(6_000_000, 500_000)),
            Err(BalancerError::InitFailure(_))
        ));
    }

    #[test]
    fn test_zero_tuning_uses_defaults() {
        let b = AdaptiveBalancer::new(&test_config(500_000, 6_000_000)).unwrap();
        assert_eq!(b.incr_step, DEF_INCR_STEP);
        assert_eq!(b.decr_step, DEF_DECR_STEP);
        assert_eq!(b.incr_interval, DEF_INCR_INTERVAL);
        assert_eq!(b.decr_interval, DEF_DECR_INTERVAL);
    }

    #[test]
    fn test_emergency_rtt_drops_to_min() {
        let mut b = AdaptiveBalancer::new(&test_config(500_000, 6_000_000)).unwrap();
        for i in 1..=5 {
            b.step(&good_sample(i * 500));
        }
        // latency 2000 -> emergency at RTT >= 666
        let out = b.step(&Sample {
            timestamp: 3000,
            rtt: 700.0,
            buffer_size: 50,
            send_rate_mbps: 5.0,
            pkt_loss_total: 0,
            pkt_retrans_total: 0,
        });
        assert_eq!(out.new_bitrate, 500_000);
    }

    #[test]
    fn test_sustained_buffer_growth_drops_to_min() {
        // A single spike raises the jitter envelope along with the buffer,
        // so the drop to minimum needs sustained growth with small deltas.
        let mut b = AdaptiveBalancer::new(&test_config(500_000, 6_000_000)).unwrap();
        for i in 1..=10 {
            b.step(&good_sample(i * 500));
        }
        let mut reached_min = false;
        for i in 0..40 {
            let out = b.step(&Sample {
                timestamp: 5500 + i * 500,
                rtt: 30.0,
                buffer_size: 10 + (i as i64 + 1) * 30,
                send_rate_mbps: 5.0,
                pkt_loss_total: 0,
                pkt_retrans_total: 0,
            });
            if out.new_bitrate == 500_000 {
                reached_min = true;
                break;
            }
        }
        assert!(reached_min, "growing send buffer never forced the minimum");
    }

    #[test]
    fn test_recovers_after_congestion() {
        let mut b = AdaptiveBalancer::new(&test_config(500_000, 6_000_000)).unwrap();
        b.step(&Sample {
            timestamp: 500,
            rtt: 700.0,
            buffer_size: 300,
            send_rate_mbps: 2.0,
            pkt_loss_total: 0,
            pkt_retrans_total: 0,
        });
        assert_eq!(b.cur_bitrate, 500_000);

        let mut last = 0;
        for i in 0..60 {
            let out = b.step(&good_sample(1000 + i * 500));
            assert!(out.new_bitrate >= last, "bitrate regressed during recovery");
            last = out.new_bitrate;
        }
        assert!(last > 500_000, "bitrate did not recover: {last}");
    }

    #[test]
    fn test_increase_rate_limited() {
        let mut b = AdaptiveBalancer::new(&test_config(500_000, 6_000_000)).unwrap();
        // Force the bitrate down so increases are observable
        b.cur_bitrate = 1_000_000;

        // Ticks every 20 ms; increases allowed once per incr_interval (500 ms)
        let mut increases = 0;
        let mut prev = b.cur_bitrate;
        for i in 1..=100 {
            b.step(&good_sample(i * 20));
            if b.cur_bitrate > prev {
                increases += 1;
            }
            prev = b.cur_bitrate;
        }
        // 2000 ms of ticks -> at most 4 increase windows (plus the initial one)
        assert!(increases <= 5, "too many increases: {increases}");
        assert!(increases >= 3, "too few increases: {increases}");
    }

    #[test]
    fn test_heavy_decrease_rate_limited() {
        let mut b = AdaptiveBalancer::new(&test_config(500_000, 30_000_000)).unwrap();
        // Heavy congestion via RTT above latency/5 but below latency/3
        let heavy = |ts: u64| Sample {
            timestamp: ts,
            rtt: 500.0,
            buffer_size: 10,
            send_rate_mbps: 5.0,
            pkt_loss_total: 0,
            pkt_retrans_total: 0,
        };
        let mut decreases = 0;
        let mut prev = b.cur_bitrate;
        for i in 1..=50 {
            b.step(&heavy(i * 20));
            if b.cur_bitrate < prev {
                decreases += 1;
            }
            prev = b.cur_bitrate;
        }
        // 1000 ms of ticks, one decrease per 250 ms fast interval
        assert!(decreases <= 4, "too many decreases: {decreases}");
        assert!(decreases >= 2, "too few decreases: {decreases}");
    }

    #[test]
    fn test_loss_rate_grows_until_congestion() {
        let mut b = AdaptiveBalancer::new(&test_config(500_000, 6_000_000)).unwrap();
        let mut prev_rate = 0.0;
        let mut ticks_to_congestion = None;
        for i in 1..=20 {
            b.step(&Sample {
                timestamp: i * 500,
                rtt: 30.0,
                buffer_size: 10,
                send_rate_mbps: 5.0,
                pkt_loss_total: i as i64,
                pkt_retrans_total: 0,
            });
            assert!(b.loss_rate > prev_rate, "loss rate must grow monotonically");
            prev_rate = b.loss_rate;
            if b.loss_rate > LOSS_RATE_THRESHOLD && ticks_to_congestion.is_none() {
                ticks_to_congestion = Some(i);
            }
        }
        // One new loss per tick crosses 0.5 within seven ticks
        assert!(ticks_to_congestion.expect("loss congestion never reached") <= 7);
    }

    #[test]
    fn test_loss_congestion_blocks_increase() {
        let mut b = AdaptiveBalancer::new(&test_config(500_000, 6_000_000)).unwrap();
        b.cur_bitrate = 2_000_000;

        let before = b.cur_bitrate;
        for i in 1..=10 {
            b.step(&Sample {
                timestamp: i * 500,
                rtt: 30.0,
                buffer_size: 10,
                send_rate_mbps: 5.0,
                pkt_loss_total: i as i64 * 5,
                pkt_retrans_total: i as i64 * 3,
            });
            assert!(b.cur_bitrate <= before, "bitrate rose under packet loss");
        }
        assert!(b.cur_bitrate < before, "bitrate did not fall under packet loss");
    }

    #[test]
    fn test_retrograde_counters_do_not_widen_loss_rate() {
        let mut b = AdaptiveBalancer::new(&test_config(500_000, 6_000_000)).unwrap();
        b.step(&Sample {
            pkt_loss_total: 100,
            pkt_retrans_total: 50,
            ..good_sample(500)
        });
        let rate_after_loss = b.loss_rate;

        // Counter reset: totals go backwards, deltas must clamp to zero
        b.step(&Sample {
            pkt_loss_total: 10,
            pkt_retrans_total: 5,
            ..good_sample(1000)
        });
        assert!(b.loss_rate < rate_after_loss);
    }

    #[test]
    fn test_rtt_min_tracks_floor() {
        let mut b = AdaptiveBalancer::new(&test_config(500_000, 6_000_000)).unwrap();
        b.step(&good_sample(500));
        assert!((b.rtt_min - 30.0).abs() < f64::EPSILON);

        // Without lower samples the floor drifts upward
        let floor = b.rtt_min;
        b.step(&Sample {
            rtt: 60.0,
            ..good_sample(1000)
        });
        assert!(b.rtt_min > floor);
    }

    #[test]
    fn test_rtt_ignore_value_not_taken_as_floor() {
        let mut b = AdaptiveBalancer::new(&test_config(500_000, 6_000_000)).unwrap();
        // 100 ms is the transport's "no measurement" marker
        b.step(&Sample {
            rtt: 100.0,
            ..good_sample(500)
        });
        assert!((b.rtt_min - RTT_MIN_INITIAL * RTT_MIN_DRIFT).abs() < 0.01);
    }

    #[test]
    fn test_output_rounded_and_clamped() {
        let mut b = AdaptiveBalancer::new(&test_config(550_000, 6_000_000)).unwrap();
        b.cur_bitrate = 555_555;
        let out = b.step(&Sample {
            timestamp: 500,
            rtt: 700.0,
            buffer_size: 500,
            send_rate_mbps: 1.0,
            pkt_loss_total: 0,
            pkt_retrans_total: 0,
        });
        // Emergency drop lands on min, published rounded down
        assert_eq!(out.new_bitrate, 500_000);
        assert_eq!(b.cur_bitrate, 550_000);
        assert_eq!(out.new_bitrate % 100_000, 0);
    }
}
