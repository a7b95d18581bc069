use super::MinBlepTable;
use crate::dsp::consts::QUALITY;

const BUF_LEN: usize = 2 * QUALITY;

/// Schedules minBLEP corrections into a short ring of future samples.
///
/// Every insertion adds a scaled slice of the shared step table to the next
/// `2 * QUALITY` samples; `process` pops one sample of the accumulated
/// correction per call. Fixed size, never allocates.
#[derive(Debug, Clone, Copy)]
pub struct MinBlepGenerator {
    buf: [f32; BUF_LEN],
    pos: usize,
}

impl Default for MinBlepGenerator {
    fn default() -> Self {
        Self {
            buf: [0.0; BUF_LEN],
            pos: 0,
        }
    }
}

impl MinBlepGenerator {
    /// Place a discontinuity of size `jump` at sub-sample offset `p`, where
    /// `-1 < p <= 0` is measured back from the current frame.
    ///
    /// Offsets outside that window are ignored.
    pub fn insert(&mut self, p: f32, jump: f32, table: &MinBlepTable) {
        if !(p > -1.0 && p <= 0.0) {
            return;
        }
        let oversample = table.oversample() as f32;
        for j in 0..table.span() {
            let index = (j as f32 - p) * oversample;
            let slot = (self.pos + j) % BUF_LEN;
            self.buf[slot] += jump * (table.interpolate(index) - 1.0);
        }
    }

    /// Pop the correction for the current sample and advance.
    #[inline(always)]
    pub fn process(&mut self) -> f32 {
        let v = self.buf[self.pos];
        self.buf[self.pos] = 0.0;
        self.pos = (self.pos + 1) % BUF_LEN;
        v
    }

    /// True if any correction is still in flight.
    pub fn is_pending(&self) -> bool {
        self.buf.iter().any(|&v| v != 0.0)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
