//! SRT transport session contracts
//!
//! The encoder talks to its SRT session through two small contracts:
//! telemetry delivery and packet sending. This crate defines those
//! contracts, the connect-time error taxonomy, the indefinite connect/retry
//! helper, and the ACK watchdog that detects a dead session. The concrete
//! session implementation lives with the media host.

mod error;
mod retry;
mod session;
mod stats;
mod watchdog;

pub use error::{ConnectError, LinkError};
pub use retry::{connect_with_retry, CONNECT_RETRY_DELAY};
pub use session::{ConnectParams, Connector, PacketSink, Session, Telemetry};
pub use stats::LinkStats;
pub use watchdog::AckWatchdog;

/// MPEG-TS packet size in bytes
pub const TS_PKT_SIZE: usize = 188;
/// Default SRT payload: seven TS packets per SRT packet
pub const DEFAULT_PKT_SIZE: usize = TS_PKT_SIZE * 7;
/// Reduced SRT payload for links with a smaller usable MTU
pub const REDUCED_PKT_SIZE: usize = TS_PKT_SIZE * 6;

/// Maximum interval between received ACKs before the session is considered
/// dead (ms)
pub const ACK_TIMEOUT_MS: u64 = 6000;
