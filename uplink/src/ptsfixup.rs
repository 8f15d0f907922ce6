//! PTS regularization for capture sources with jittery timestamps
//!
//! Live capture hardware produces presentation timestamps that wobble around
//! the nominal frame period and drift slowly with temperature and voltage.
//! The fixer keeps a rolling estimate of the real period and re-times each
//! buffer onto a regular grid. As long as an input timestamp lands within
//! two periods of the previous output it is treated as a continuous read;
//! otherwise the discontinuity is handled by skipping output periods or
//! dropping the buffer.
//!
//! The arithmetic lives here, free of GStreamer types; the media host feeds
//! it from a pad probe on the `ptsfixup` identity element.

// Rolling-average weights for the period estimate. The rounding term avoids
// precision loss from the integer division.
const AVG_MULT: i64 = 1000;
const AVG_WEIGHT: i64 = 3;
const AVG_PREV: i64 = AVG_MULT - AVG_WEIGHT;
const AVG_ROUNDING: i64 = AVG_MULT / 2;

/// What to do with the buffer carrying `input_pts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PtsAction {
    /// Leave the timestamp alone (fixer not started yet)
    Passthrough,
    /// Rewrite the timestamp to this value (nanoseconds)
    Set(i64),
    /// The buffer is a re-read or arrived out of order; mark it droppable
    Drop,
}

#[derive(Debug, Default)]
pub struct PtsFixup {
    period: i64,
    out_pts: Option<i64>,
    prev_in_pts: i64,
}

impl PtsFixup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one buffer timestamp (nanoseconds).
    ///
    /// `nominal_period` is the frame duration from the negotiated caps; it
    /// is only used to seed the estimate on the first frame and may be
    /// `None` until caps are known.
    pub fn process(&mut self, input_pts: i64, nominal_period: Option<i64>) -> PtsAction {
        let action = match self.out_pts {
            None => {
                if let Some(period) = nominal_period.filter(|p| *p > 0) {
                    self.out_pts = Some(input_pts);
                    self.period = period;
                    tracing::info!(period_ns = period, "pts fixup started");
                }
                PtsAction::Passthrough
            }
            Some(out) => {
                self.period = (self.period * AVG_PREV + AVG_ROUNDING) / AVG_MULT
                    + ((input_pts - self.prev_in_pts) * AVG_WEIGHT + AVG_ROUNDING) / AVG_MULT;
                // A PTS discontinuity can briefly poison the estimate; keep
                // the divisor sane
                if self.period < 1 {
                    self.period = 1;
                }

                let diff = input_pts - out;
                let incr = (diff / 2 + self.period) / self.period * self.period;
                if incr > 0 {
                    let next = out + incr;
                    self.out_pts = Some(next);
                    PtsAction::Set(next)
                } else {
                    PtsAction::Drop
                }
            }
        };
        self.prev_in_pts = input_pts;
        action
    }
}
