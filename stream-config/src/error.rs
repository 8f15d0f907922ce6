use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{field} is out of range: {value} (allowed {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("min_bitrate {min} bps exceeds max_bitrate {max} bps")]
    InvertedBounds { min: i64, max: i64 },

    #[error("invalid bitrate file: {0}")]
    BitrateFile(String),
}
