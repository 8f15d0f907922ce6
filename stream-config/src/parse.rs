//! Sectioned key/value parser and canonical serializer
//!
//! The file format is a small INI dialect: `[section]` headers, `key = value`
//! lines, `#` or `;` comments. Section names are case-insensitive, keys are
//! exact. Lines before the first header belong to `[general]`. Unknown
//! sections and keys are ignored so configs can carry forward-compatible
//! entries.

use crate::config::Config;

/// Apply every recognized `key = value` line of `input` onto `cfg`.
pub(crate) fn apply_ini(cfg: &mut Config, input: &str) {
    let mut section = String::from("general");

    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(rest) = line.strip_prefix('[') {
            // A header without a closing bracket is skipped
            if let Some((name, _)) = rest.split_once(']') {
                section = name.trim().to_ascii_lowercase();
            }
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            apply_entry(cfg, &section, key.trim(), value.trim());
        }
    }
}

fn apply_entry(cfg: &mut Config, section: &str, key: &str, value: &str) {
    match (section, key) {
        ("general", "min_bitrate") => cfg.min_bitrate = int(value),
        ("general", "max_bitrate") => cfg.max_bitrate = int(value),
        ("general", "balancer") => cfg.balancer = value.to_string(),

        ("srt", "latency") => cfg.srt_latency = int(value),

        ("adaptive", "incr_step") => cfg.adaptive.incr_step = int(value),
        ("adaptive", "decr_step") => cfg.adaptive.decr_step = int(value),
        ("adaptive", "incr_interval") => cfg.adaptive.incr_interval = uint(value),
        ("adaptive", "decr_interval") => cfg.adaptive.decr_interval = uint(value),
        ("adaptive", "loss_threshold") => cfg.adaptive.loss_threshold = float(value),

        ("aimd", "incr_step") => cfg.aimd.incr_step = int(value),
        ("aimd", "decr_mult") => cfg.aimd.decr_mult = float(value),
        ("aimd", "incr_interval") => cfg.aimd.incr_interval = uint(value),
        ("aimd", "decr_interval") => cfg.aimd.decr_interval = uint(value),

        _ => {
            tracing::debug!(section, key, "ignoring unknown config entry");
        }
    }
}

// Unparseable numbers become zero, which downstream means "use the default"
// for tuning knobs and fails range validation for bounds.
fn int(value: &str) -> i64 {
    value.parse().unwrap_or(0)
}

fn uint(value: &str) -> u64 {
    value.parse().unwrap_or(0)
}

fn float(value: &str) -> f64 {
    value.parse().unwrap_or(0.0)
}

/// Emit the canonical INI layout: every section, every key, file units.
pub(crate) fn serialize_ini(cfg: &Config) -> String {
    let mut out = String::new();

    out.push_str("[general]\n");
    out.push_str(&format!("min_bitrate = {}\n", cfg.min_bitrate));
    out.push_str(&format!("max_bitrate = {}\n", cfg.max_bitrate));
    out.push_str(&format!("balancer = {}\n", cfg.balancer));

    out.push_str("\n[srt]\n");
    out.push_str(&format!("latency = {}\n", cfg.srt_latency));

    out.push_str("\n[adaptive]\n");
    out.push_str(&format!("incr_step = {}\n", cfg.adaptive.incr_step));
    out.push_str(&format!("decr_step = {}\n", cfg.adaptive.decr_step));
    out.push_str(&format!("incr_interval = {}\n", cfg.adaptive.incr_interval));
    out.push_str(&format!("decr_interval = {}\n", cfg.adaptive.decr_interval));
    out.push_str(&format!("loss_threshold = {}\n", cfg.adaptive.loss_threshold));

    out.push_str("\n[aimd]\n");
    out.push_str(&format!("incr_step = {}\n", cfg.aimd.incr_step));
    out.push_str(&format!("decr_mult = {}\n", cfg.aimd.decr_mult));
    out.push_str(&format!("incr_interval = {}\n", cfg.aimd.incr_interval));
    out.push_str(&format!("decr_interval = {}\n", cfg.aimd.decr_interval));

    out
}
