//! Legacy two-line bitrate bounds file
//!
//! Line 1 is the minimum and line 2 the maximum, both base-10 bits per
//! second within the absolute corridor. Anything else rejects the file.

use std::path::Path;

use crate::config::{ABS_MAX_BITRATE_BPS, ABS_MIN_BITRATE_BPS};
use crate::error::ConfigError;

/// Bitrate bounds read from a legacy `-b` file, in bits per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitrateBounds {
    pub min_bps: i64,
    pub max_bps: i64,
}

/// Load and validate a legacy bitrate bounds file.
pub fn load_bitrate_file(path: &Path) -> Result<BitrateBounds, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_bitrate_file(&content)
}

fn parse_bitrate_file(content: &str) -> Result<BitrateBounds, ConfigError> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() < 2 {
        return Err(ConfigError::BitrateFile(
            "expected two lines (min and max bitrate in bps)".to_string(),
        ));
    }
    // Trailing blank lines are fine; any further content is not.
    if lines[2..].iter().any(|l| !l.trim().is_empty()) {
        return Err(ConfigError::BitrateFile(
            "unexpected content after the max bitrate line".to_string(),
        ));
    }

    let min_bps = parse_bitrate(lines[0])?;
    let max_bps = parse_bitrate(lines[1])?;
    if min_bps > max_bps {
        return Err(ConfigError::InvertedBounds {
            min: min_bps,
            max: max_bps,
        });
    }

    Ok(BitrateBounds { min_bps, max_bps })
}

fn parse_bitrate(line: &str) -> Result<i64, ConfigError> {
    let value: i64 = line
        .trim()
        .parse()
        .map_err(|_| ConfigError::BitrateFile(format!("not a bitrate: {:?}", line)))?;
    if !(ABS_MIN_BITRATE_BPS..=ABS_MAX_BITRATE_BPS).contains(&value) {
        return Err(ConfigError::OutOfRange {
            field: "bitrate",
            value,
            min: ABS_MIN_BITRATE_BPS,
            max: ABS_MAX_BITRATE_BPS,
        });
    }
    Ok(value)
}
