//! Fixed-size packet assembly for the SRT send path
//!
//! Pipeline samples arrive in arbitrary sizes; SRT wants payloads of exactly
//! the negotiated packet size. The packetizer splits and merges sample data
//! across calls, carrying the remainder to the next sample.

pub struct Packetizer {
    pkt_size: usize,
    pending: Vec<u8>,
}

impl Packetizer {
    pub fn new(pkt_size: usize) -> Self {
        Self {
            pkt_size,
            pending: Vec::with_capacity(pkt_size),
        }
    }

    /// Append sample data and return every completed packet.
    pub fn push(&mut self, mut data: &[u8]) -> Vec<Vec<u8>> {
        let mut packets = Vec::new();
        while !data.is_empty() {
            let take = (self.pkt_size - self.pending.len()).min(data.len());
            self.pending.extend_from_slice(&data[..take]);
            data = &data[take..];

            if self.pending.len() == self.pkt_size {
                packets.push(std::mem::replace(
                    &mut self.pending,
                    Vec::with_capacity(self.pkt_size),
                ));
            }
        }
        packets
    }

    /// Bytes carried over, waiting for the next sample.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
