/// One reading of the transport's session statistics.
///
/// The loss and retransmit counters are cumulative over the session and
/// treated as non-decreasing; consumers clamp negative deltas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinkStats {
    /// Smoothed round-trip time (ms)
    pub rtt_ms: f64,
    /// Current send rate (Mbps)
    pub send_rate_mbps: f64,
    /// Cumulative packets lost
    pub pkt_loss_total: i64,
    /// Cumulative packets retransmitted
    pub pkt_retrans_total: i64,
    /// Cumulative ACKs received
    pub ack_count: u64,
}
