//! Frame-aligned bit and sample buffers.

use crate::error::{FskTestError, Result};
use crate::modem::FrameParams;
use crate::stream::read_full;
use log::debug;
use rand::Rng;
use std::io::Read;
use std::slice::{ChunksExact, ChunksExactMut};

fn try_zeroed<T: Clone + Default>(len: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| FskTestError::Allocation { requested: len })?;
    v.resize(len, T::default());
    Ok(v)
}

/// Growable buffer of single-bit symbols, one byte per bit.
///
/// Capacity is tracked in whole bits and only ever grows, one symbol group
/// (`quantum`) at a time.
#[derive(Debug, Clone)]
pub struct BitBuffer {
    bits: Vec<u8>,
    capacity: usize,
    quantum: usize,
    growth_events: usize,
}

impl BitBuffer {
    pub fn with_capacity(quantum: usize, capacity: usize) -> Result<Self> {
        if quantum == 0 {
            return Err(FskTestError::InvalidConfig(
                "symbol group size must be positive".into(),
            ));
        }
        let mut bits = Vec::new();
        bits.try_reserve_exact(capacity)
            .map_err(|_| FskTestError::Allocation { requested: capacity })?;
        Ok(Self {
            bits,
            capacity,
            quantum,
            growth_events: 0,
        })
    }

    /// Exactly `count` uniformly random bits drawn from `rng`.
    pub fn random<R: Rng + ?Sized>(count: usize, quantum: usize, rng: &mut R) -> Result<Self> {
        let mut buf = Self::with_capacity(quantum, count)?;
        buf.bits.extend((0..count).map(|_| u8::from(rng.gen::<bool>())));
        Ok(buf)
    }

    /// Read whole symbol groups from `reader` until it runs dry.
    ///
    /// `capacity_hint` is the expected number of bits (usually the file
    /// length). A trailing group cut short by end of stream is dropped.
    pub fn read_framed<R: Read + ?Sized>(
        reader: &mut R,
        quantum: usize,
        capacity_hint: usize,
    ) -> Result<Self> {
        let mut buf = Self::with_capacity(quantum, capacity_hint)?;
        let mut group = vec![0u8; quantum];
        loop {
            let got = read_full(reader, &mut group)?;
            if got < quantum {
                if got > 0 {
                    debug!("Discarding {} trailing bits short of a full group", got);
                }
                break;
            }
            buf.push_group(&group)?;
        }
        Ok(buf)
    }

    /// Append one symbol group, growing first if it would not fit.
    pub fn push_group(&mut self, group: &[u8]) -> Result<()> {
        if group.len() != self.quantum {
            return Err(FskTestError::InvalidInputSize {
                expected: self.quantum,
                actual: group.len(),
            });
        }
        if self.bits.len() + self.quantum > self.capacity {
            self.grow()?;
        }
        self.bits.extend_from_slice(group);
        Ok(())
    }

    /// Add exactly one symbol group of capacity.
    pub fn grow(&mut self) -> Result<()> {
        let new_capacity = self.capacity + self.quantum;
        self.bits
            .try_reserve_exact(new_capacity - self.bits.len())
            .map_err(|_| FskTestError::Allocation {
                requested: new_capacity,
            })?;
        self.capacity = new_capacity;
        self.growth_events += 1;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn quantum(&self) -> usize {
        self.quantum
    }

    pub fn growth_events(&self) -> usize {
        self.growth_events
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bits
    }

    /// Whole symbol groups, in order. A partial tail is not yielded.
    pub fn groups(&self) -> ChunksExact<'_, u8> {
        self.bits.chunks_exact(self.quantum)
    }
}

/// Owned audio sample buffer sized to the modem's frame contract.
#[derive(Debug, Clone, Default)]
pub struct SampleBuffer {
    samples: Vec<f32>,
}

impl SampleBuffer {
    /// Room for the whole-frame modulation of `bit_count` bits.
    pub fn for_modulation(params: &FrameParams, bit_count: usize) -> Result<Self> {
        Ok(Self {
            samples: try_zeroed(params.modulated_len(bit_count))?,
        })
    }

    /// Room for the largest input a single demodulate call may ask for.
    pub fn for_demodulation(params: &FrameParams) -> Result<Self> {
        Ok(Self {
            samples: try_zeroed(params.max_input_samples())?,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn frames_mut(&mut self, frame_len: usize) -> ChunksExactMut<'_, f32> {
        self.samples.chunks_exact_mut(frame_len)
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.samples
    }
}
