//! The contract the test driver needs from a modem engine.
//!
//! The driver never looks inside an engine. Everything it knows about frame
//! sizes comes from [`FrameParams`] and [`Modem::required_input_samples`].

use crate::error::Result;

/// Read-only frame sizes reported by a configured modem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameParams {
    /// Bits consumed per modulate call and produced per demodulate call
    pub bits_per_frame: usize,
    /// Samples produced per modulate call (nominal demodulate input)
    pub samples_per_frame: usize,
    /// Samples representing one transmitted symbol
    pub samples_per_symbol: usize,
}

impl FrameParams {
    /// Smallest input a demodulate call may legally request.
    pub fn min_input_samples(&self) -> usize {
        self.samples_per_frame
            .saturating_sub(2 * self.samples_per_symbol)
    }

    /// Largest input a demodulate call may legally request.
    ///
    /// Also the size of the demodulator's input buffer.
    pub fn max_input_samples(&self) -> usize {
        self.samples_per_frame + 2 * self.samples_per_symbol
    }

    /// Number of samples a whole-frame modulation of `bit_count` bits produces.
    /// Trailing bits short of one frame are not counted.
    pub fn modulated_len(&self, bit_count: usize) -> usize {
        (bit_count / self.bits_per_frame) * self.samples_per_frame
    }
}

/// A binary FSK modem engine driven one frame at a time.
///
/// Calls must be made in strict stream order: the demodulator's timing state
/// carries over from one call to the next.
pub trait Modem {
    fn frame_params(&self) -> FrameParams;

    /// Samples the next [`demodulate`](Modem::demodulate) call will consume.
    /// Changes between calls; query it right before every call.
    fn required_input_samples(&self) -> usize;

    /// Modulate exactly one frame of bits into exactly one frame of samples.
    fn modulate(&mut self, samples_out: &mut [f32], bits_in: &[u8]) -> Result<()>;

    /// Demodulate exactly `required_input_samples()` samples into one frame of bits.
    fn demodulate(&mut self, bits_out: &mut [u8], samples_in: &[f32]) -> Result<()>;
}

impl<M: Modem + ?Sized> Modem for &mut M {
    fn frame_params(&self) -> FrameParams {
        (**self).frame_params()
    }

    fn required_input_samples(&self) -> usize {
        (**self).required_input_samples()
    }

    fn modulate(&mut self, samples_out: &mut [f32], bits_in: &[u8]) -> Result<()> {
        (**self).modulate(samples_out, bits_in)
    }

    fn demodulate(&mut self, bits_out: &mut [u8], samples_in: &[f32]) -> Result<()> {
        (**self).demodulate(bits_out, samples_in)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_window_bounds() {
        let params = FrameParams {
            bits_per_frame: 50,
            samples_per_frame: 4000,
            samples_per_symbol: 80,
        };
        assert_eq!(params.min_input_samples(), 3840);
        assert_eq!(params.max_input_samples(), 4160);
    }

    #[test]
    fn test_modulated_len_drops_partial_frame() {
        let params = FrameParams {
            bits_per_frame: 50,
            samples_per_frame: 4000,
            samples_per_symbol: 80,
        };
        assert_eq!(params.modulated_len(0), 0);
        assert_eq!(params.modulated_len(49), 0);
        assert_eq!(params.modulated_len(50), 4000);
        assert_eq!(params.modulated_len(149), 8000);
    }
}
