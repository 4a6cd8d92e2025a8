//! Frame-by-frame drive loops.
//!
//! Both loops walk their input strictly in order and never hand the modem a
//! partial frame.

use crate::buffer::{BitBuffer, SampleBuffer};
use crate::error::{FskTestError, Result};
use crate::modem::Modem;
use crate::stream::SampleSource;
use log::debug;
use std::io::Write;

/// What a demodulation pass consumed and produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemodSummary {
    pub frames: usize,
    pub samples_consumed: usize,
    pub bits_written: usize,
}

/// Modulate every whole symbol group in `bits` into a new sample buffer.
///
/// The buffer holds exactly `(bits.len() / group) * samples_per_frame`
/// samples; a trailing partial group is not modulated.
pub fn modulate_frames<M: Modem + ?Sized>(modem: &mut M, bits: &BitBuffer) -> Result<SampleBuffer> {
    let params = modem.frame_params();
    if bits.quantum() != params.bits_per_frame {
        return Err(FskTestError::InvalidInputSize {
            expected: params.bits_per_frame,
            actual: bits.quantum(),
        });
    }

    let mut samples = SampleBuffer::for_modulation(&params, bits.len())?;
    let mut frames = 0;
    for (group, frame) in bits.groups().zip(samples.frames_mut(params.samples_per_frame)) {
        modem.modulate(frame, group)?;
        frames += 1;
    }

    debug!(
        "Modulated {} frames ({} bits) into {} samples",
        frames,
        frames * params.bits_per_frame,
        samples.len()
    );
    Ok(samples)
}

/// Demodulate from `source` until it cannot supply a full frame, writing each
/// frame's bits to `sink` as soon as they are produced.
///
/// The modem's required input count is queried before every call.
pub fn demodulate_frames<M, S, W>(modem: &mut M, source: &mut S, sink: &mut W) -> Result<DemodSummary>
where
    M: Modem + ?Sized,
    S: SampleSource + ?Sized,
    W: Write + ?Sized,
{
    let params = modem.frame_params();
    let min = params.min_input_samples();
    let max = params.max_input_samples();

    let mut input = SampleBuffer::for_demodulation(&params)?;
    let mut bits = vec![0u8; params.bits_per_frame];
    let mut summary = DemodSummary::default();

    loop {
        let nin = modem.required_input_samples();
        if nin < min || nin > max {
            return Err(FskTestError::FrameContract {
                required: nin,
                min,
                max,
            });
        }

        let frame = &mut input.as_mut_slice()[..nin];
        let got = source.read_samples(frame)?;
        if got < nin {
            debug!("Input exhausted: {} of {} samples for next frame", got, nin);
            break;
        }

        modem.demodulate(&mut bits, frame)?;
        sink.write_all(&bits)?;

        summary.frames += 1;
        summary.samples_consumed += nin;
        summary.bits_written += bits.len();
    }

    debug!(
        "Demodulated {} frames from {} samples",
        summary.frames, summary.samples_consumed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsk::{FskConfig, FskModem};
    use crate::stream::SliceSource;

    #[test]
    fn test_modulate_frames_sample_count() {
        let mut modem = FskModem::new(FskConfig::default()).unwrap();
        let mut bits = BitBuffer::with_capacity(50, 0).unwrap();
        for _ in 0..3 {
            bits.push_group(&[1u8; 50]).unwrap();
        }
        let samples = modulate_frames(&mut modem, &bits).unwrap();
        assert_eq!(samples.len(), 3 * 4000);
    }

    #[test]
    fn test_modulate_frames_rejects_mismatched_group() {
        let mut modem = FskModem::new(FskConfig::default()).unwrap();
        let bits = BitBuffer::with_capacity(40, 80).unwrap();
        assert!(modulate_frames(&mut modem, &bits).is_err());
    }

    #[test]
    fn test_demodulate_frames_empty_source() {
        let mut modem = FskModem::new(FskConfig::default()).unwrap();
        let samples = vec![0.0f32; 3999];
        let mut out = Vec::new();
        let summary =
            demodulate_frames(&mut modem, &mut SliceSource::new(&samples), &mut out).unwrap();
        assert_eq!(summary, DemodSummary::default());
        assert!(out.is_empty());
    }
}
