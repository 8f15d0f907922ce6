use thiserror::Error;

/// Connect-time failures, categorized so the retry loop can explain itself.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("connection timed out")]
    Timeout,

    #[error("streamid already in use")]
    StreamIdConflict,

    #[error("invalid streamid")]
    StreamIdForbidden,

    #[error("failed to resolve address: {0}")]
    AddressResolution(String),

    #[error("failed to open the SRT socket: {0}")]
    SocketCreate(String),

    #[error("failed to set SRT socket options: {0}")]
    OptionSet(String),

    #[error("{0}")]
    Other(String),
}

/// Mid-session failures. Send failures are fatal for the session; stats
/// failures are transient and the caller skips the tick.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("send failed: {0}")]
    Send(String),

    #[error("statistics unavailable: {0}")]
    Stats(String),

    #[error("session closed")]
    Closed,
}
