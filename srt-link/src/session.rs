//! Session contracts consumed by the control loop and the send path

use async_trait::async_trait;

use crate::error::{ConnectError, LinkError};
use crate::stats::LinkStats;

/// Parameters for establishing one SRT caller session.
#[derive(Debug, Clone)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    /// Opaque stream identifier forwarded to the server, if any
    pub stream_id: Option<String>,
    /// Requested transport latency (ms)
    pub latency_ms: i64,
    /// SRT payload size in bytes
    pub pkt_size: usize,
}

/// Establishes sessions. One implementation per transport backend.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        params: &ConnectParams,
    ) -> Result<std::sync::Arc<dyn Session>, ConnectError>;
}

/// Telemetry delivery: a point-in-time statistics reading plus the send
/// buffer occupancy. Failures are transient; the caller skips the tick.
pub trait Telemetry: Send + Sync {
    fn stats(&self) -> Result<LinkStats, LinkError>;

    /// Outstanding packets queued for (re)transmission.
    fn buffer_size(&self) -> Result<i64, LinkError>;
}

/// Packet sending. May block briefly on the underlying socket; a failure is
/// fatal for the session.
#[async_trait]
pub trait PacketSink: Send + Sync {
    async fn send(&self, pkt: &[u8]) -> Result<usize, LinkError>;
}

/// A live SRT session.
pub trait Session: Telemetry + PacketSink {
    /// Tear the session down. Idempotent.
    fn close(&self);
}
