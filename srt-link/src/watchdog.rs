//! ACK watchdog
//!
//! SRT keeps acknowledging received data while the session is alive. Once
//! ACKs have been seen at least once, a long gap without a new one means the
//! peer is gone even if the socket has not errored yet.

use crate::ACK_TIMEOUT_MS;

#[derive(Debug)]
pub struct AckWatchdog {
    timeout_ms: u64,
    last_ack_count: u64,
    last_ack_ts: u64,
}

impl AckWatchdog {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            last_ack_count: 0,
            last_ack_ts: 0,
        }
    }

    pub fn with_default_timeout() -> Self {
        Self::new(ACK_TIMEOUT_MS)
    }

    /// Record an ACK counter reading. Returns `true` when the session has
    /// timed out. The watchdog only arms after the first ACK is observed.
    pub fn observe(&mut self, ack_count: u64, now_ms: u64) -> bool {
        if ack_count != self.last_ack_count {
            self.last_ack_count = ack_count;
            self.last_ack_ts = now_ms;
        }

        self.last_ack_count != 0 && now_ms.saturating_sub(self.last_ack_ts) > self.timeout_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_armed_before_first_ack() {
        let mut dog = AckWatchdog::new(6000);
        assert!(!dog.observe(0, 0));
        assert!(!dog.observe(0, 100_000), "must not fire before any ACK");
    }

    #[test]
    fn test_fires_after_silence() {
        let mut dog = AckWatchdog::new(6000);
        assert!(!dog.observe(1, 1000));
        assert!(!dog.observe(1, 5000));
        assert!(!dog.observe(1, 7000)); // 6000 ms exactly is still fine
        assert!(dog.observe(1, 7001));
    }

    #[test]
    fn test_new_acks_rearm() {
        let mut dog = AckWatchdog::new(6000);
        assert!(!dog.observe(1, 1000));
        assert!(!dog.observe(2, 6900));
        assert!(!dog.observe(2, 12_000));
        assert!(dog.observe(2, 12_901));
    }
}
