//! End-to-end balancer scenarios driven through the runner, with
//! deterministic sample streams standing in for a live SRT session.

use balancer::{round_down_100k, Runner, Sample};
use stream_config::Config;

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

fn base_config() -> Config {
    Config {
        min_bitrate: 500,
        max_bitrate: 6000,
        ..Config::default()
    }
}

#[test]
fn adaptive_cold_start_on_pristine_link() {
    let mut runner = Runner::new(&base_config(), None, 2000, 1316).unwrap();

    let mut prev = 0;
    let mut last = 0;
    for i in 1..=20 {
        let out = runner.step(&good_sample(i * 500));
        assert!(out.new_bitrate >= prev, "bitrate regressed on a clean link");
        prev = out.new_bitrate;
        last = out.new_bitrate;
    }
    assert_eq!(last, 6_000_000);
}

#[test]
fn adaptive_emergency_drop() {
    let mut runner = Runner::new(&base_config(), None, 2000, 1316).unwrap();
    for i in 1..=20 {
        runner.step(&good_sample(i * 500));
    }

    let out = runner.step(&Sample {
        timestamp: 10_500,
        rtt: 700.0,
        buffer_size: 50,
        send_rate_mbps: 5.0,
        pkt_loss_total: 0,
        pkt_retrans_total: 0,
    });
    assert_eq!(out.new_bitrate, 500_000);
}

#[test]
fn adaptive_loss_only_congestion() {
    let mut runner = Runner::new(&base_config(), None, 2000, 1316).unwrap();
    for i in 1..=20 {
        runner.step(&good_sample(i * 500));
    }
    let pre_loss = runner.step(&good_sample(10_500)).new_bitrate;

    // Clean RTT and buffer, but the cumulative counters keep rising
    let mut outputs = Vec::new();
    for i in 1..=10u64 {
        let out = runner.step(&Sample {
            timestamp: 10_500 + i * 500,
            rtt: 30.0,
            buffer_size: 10,
            send_rate_mbps: 5.0,
            pkt_loss_total: i as i64 * 5,
            pkt_retrans_total: i as i64 * 3,
        });
        outputs.push(out.new_bitrate);
    }

    for pair in outputs.windows(2) {
        assert!(pair[1] <= pair[0], "bitrate rose during sustained loss");
    }
    assert!(
        *outputs.last().unwrap() < pre_loss,
        "sustained loss did not reduce the bitrate"
    );
}

#[test]
fn aimd_arithmetic_climb() {
    let cfg = Config {
        balancer: "aimd".to_string(),
        ..base_config()
    };
    let mut runner = Runner::new(&cfg, None, 2000, 1316).unwrap();

    // Pull the rate down once so the climb is observable
    runner.step(&good_sample(500));
    runner.step(&Sample {
        timestamp: 1000,
        rtt: 700.0,
        buffer_size: 10,
        send_rate_mbps: 5.0,
        pkt_loss_total: 0,
        pkt_retrans_total: 0,
    });

    let mut prev = None;
    for i in 3..=30 {
        let out = runner.step(&good_sample(i * 500));
        if let Some(prev) = prev {
            let diff: i64 = out.new_bitrate - prev;
            if diff != 0 {
                assert!(
                    (50_000..=150_000).contains(&diff),
                    "climb step {diff} outside the additive window"
                );
            }
        }
        prev = Some(out.new_bitrate);
    }
}

#[test]
fn aimd_multiplicative_decrease() {
    let cfg = Config {
        balancer: "aimd".to_string(),
        ..base_config()
    };
    let mut runner = Runner::new(&cfg, None, 2000, 1316).unwrap();

    // Climb until the published rate is at least 3 Mbps
    let mut ts = 0;
    let mut bitrate = 0;
    while bitrate < 3_000_000 {
        ts += 500;
        bitrate = runner.step(&good_sample(ts)).new_bitrate;
    }

    let out = runner.step(&Sample {
        timestamp: ts + 500,
        rtt: 500.0,
        buffer_size: 200,
        send_rate_mbps: 5.0,
        pkt_loss_total: 0,
        pkt_retrans_total: 0,
    });
    let lo = (bitrate as f64 * 0.60) as i64;
    let hi = (bitrate as f64 * 0.85) as i64;
    assert!(
        (lo..=hi).contains(&out.new_bitrate),
        "decrease landed at {} from {bitrate}",
        out.new_bitrate
    );
}

#[test]
fn fixed_indifference() {
    let cfg = Config {
        max_bitrate: 4000,
        balancer: "fixed".to_string(),
        ..base_config()
    };
    let mut runner = Runner::new(&cfg, None, 2000, 1316).unwrap();

    for (i, rtt) in [20.0, 600.0, 20.0, 600.0].iter().enumerate() {
        let out = runner.step(&Sample {
            timestamp: (i as u64 + 1) * 500,
            rtt: *rtt,
            buffer_size: 10,
            send_rate_mbps: 4.0,
            pkt_loss_total: 0,
            pkt_retrans_total: 0,
        });
        assert_eq!(out.new_bitrate, 4_000_000);
    }
}

#[test]
fn hot_reload_rebounds_outputs() {
    let mut runner = Runner::new(&base_config(), None, 2000, 1316).unwrap();
    for i in 1..=10 {
        runner.step(&good_sample(i * 500));
    }

    runner.update_bounds(1_000_000, 3_000_000).unwrap();
    for i in 11..=30 {
        let out = runner.step(&good_sample(i * 500));
        assert!(
            (1_000_000..=3_000_000).contains(&out.new_bitrate),
            "output {} escaped the reloaded bounds",
            out.new_bitrate
        );
    }
}

#[test]
fn outputs_always_within_bounds_and_rounded() {
    for name in ["adaptive", "aimd", "fixed"] {
        let cfg = Config {
            balancer: name.to_string(),
            ..base_config()
        };
        let mut runner = Runner::new(&cfg, None, 2000, 1316).unwrap();

        // A hostile mix of clean, congested and lossy ticks
        for i in 1..=100u64 {
            let out = runner.step(&Sample {
                timestamp: i * 20,
                rtt: if i % 7 == 0 { 900.0 } else { 25.0 + (i % 5) as f64 },
                buffer_size: if i % 11 == 0 { 400 } else { 8 },
                send_rate_mbps: 5.0,
                pkt_loss_total: (i / 3) as i64,
                pkt_retrans_total: (i / 4) as i64,
            });
            assert!(
                (500_000..=6_000_000).contains(&out.new_bitrate),
                "{name}: {} out of bounds",
                out.new_bitrate
            );
            assert_eq!(out.new_bitrate % 100_000, 0, "{name}: unrounded output");
        }
    }
}

#[test]
fn backward_timestamps_never_crash() {
    for name in ["adaptive", "aimd", "fixed"] {
        let cfg = Config {
            balancer: name.to_string(),
            ..base_config()
        };
        let mut runner = Runner::new(&cfg, None, 2000, 1316).unwrap();
        for ts in [5000u64, 4000, 4500, 0, 5000] {
            let out = runner.step(&good_sample(ts));
            assert_eq!(out.new_bitrate % 100_000, 0);
        }
    }
}

#[test]
fn degenerate_bounds_pin_the_output() {
    for name in ["adaptive", "aimd", "fixed"] {
        let cfg = Config {
            min_bitrate: 4000,
            max_bitrate: 4000,
            balancer: name.to_string(),
            ..base_config()
        };
        let mut runner = Runner::new(&cfg, None, 2000, 1316).unwrap();
        for i in 1..=20u64 {
            let out = runner.step(&Sample {
                timestamp: i * 500,
                rtt: if i % 2 == 0 { 700.0 } else { 20.0 },
                buffer_size: (i as i64 % 3) * 150,
                send_rate_mbps: 4.0,
                pkt_loss_total: i as i64,
                pkt_retrans_total: 0,
            });
            assert_eq!(out.new_bitrate, round_down_100k(4_000_000));
        }
    }
}
