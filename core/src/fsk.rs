use crate::error::{FskTestError, Result};
use crate::modem::{FrameParams, Modem};
use crate::probe::{NullProbe, Probe};
use log::{debug, warn};
use std::f64::consts::TAU;

// Binary FSK reference engine
//
// Frame layout:
// - Ts = Fs / Rs samples per symbol (must divide exactly)
// - 50 symbols (bits) per modulate/demodulate call, N = 50 * Ts samples
//
// Modulation is continuous-phase: bit 0 sends f1, bit 1 sends f2.
//
// Demodulation is non-coherent. Each symbol window is correlated against both
// tones and the larger magnitude wins. Symbol timing is tracked from the
// Rs-rate component of | |c1| - |c2| |, which peaks where the correlation
// window lines up with a symbol. A timing correction shows up as a change in
// the number of samples the next demodulate call asks for.

/// Symbols (bits) carried by one frame
pub const FSK_FRAME_SYMBOLS: usize = 50;

/// Minimum ratio of the Rs-rate timing component to the mean metric before
/// the estimate is trusted. Frames without bit transitions fall below it.
const FSK_TIMING_MIN_CONFIDENCE: f64 = 0.05;

/// Timing errors smaller than this fraction of a symbol are left alone.
const FSK_TIMING_DEADBAND: f64 = 0.125;

/// Modem configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FskConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Symbol rate in baud
    pub symbol_rate: u32,
    /// Tone for bit 0 in Hz
    pub f1: u32,
    /// Tone for bit 1 in Hz
    pub f2: u32,
}

impl Default for FskConfig {
    fn default() -> Self {
        Self {
            sample_rate: crate::SELF_TEST_SAMPLE_RATE,
            symbol_rate: crate::SELF_TEST_SYMBOL_RATE,
            f1: crate::SELF_TEST_F1,
            f2: crate::SELF_TEST_F2,
        }
    }
}

impl FskConfig {
    pub fn samples_per_symbol(&self) -> usize {
        (self.sample_rate / self.symbol_rate) as usize
    }

    /// Check the rates and tones describe a modem that can be built.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 || self.symbol_rate == 0 {
            return Err(FskTestError::InvalidConfig(
                "sample rate and symbol rate must be positive".into(),
            ));
        }
        if self.sample_rate % self.symbol_rate != 0 {
            return Err(FskTestError::InvalidConfig(format!(
                "sample rate {} must be an integer multiple of symbol rate {}",
                self.sample_rate, self.symbol_rate
            )));
        }
        if self.samples_per_symbol() < 2 {
            return Err(FskTestError::InvalidConfig(format!(
                "need at least 2 samples per symbol, got {}",
                self.samples_per_symbol()
            )));
        }
        let nyquist = self.sample_rate / 2;
        for f in [self.f1, self.f2] {
            if f == 0 || f >= nyquist {
                return Err(FskTestError::InvalidConfig(format!(
                    "tone {} Hz outside (0, {}) Hz",
                    f, nyquist
                )));
            }
        }
        if self.f1 == self.f2 {
            return Err(FskTestError::InvalidConfig(format!(
                "tones must differ, both are {} Hz",
                self.f1
            )));
        }
        Ok(())
    }
}

/// Binary FSK modem with symbol timing recovery
///
/// Reports its internal state to the probe `P`:
/// - `tx_bits`: every modulated bit
/// - `nin`: samples consumed by each demodulate call
/// - `rx_timing`: timing estimate per call, in symbols
/// - `rx_bits`: every demodulated bit
pub struct FskModem<P: Probe = NullProbe> {
    params: FrameParams,
    omega: [f64; 2],
    tx_phase: f64,
    /// exp(-j * omega * n) for n in 0..N, per tone
    osc: [Vec<(f64, f64)>; 2],
    /// Unconsumed receive samples, decode starts at `rx_offset`
    rx: Vec<f32>,
    rx_offset: usize,
    nin: usize,
    mags: [Vec<f32>; 2],
    probe: P,
}

impl FskModem<NullProbe> {
    pub fn new(config: FskConfig) -> Result<Self> {
        Self::with_probe(config, NullProbe)
    }
}

impl<P: Probe> FskModem<P> {
    pub fn with_probe(config: FskConfig, probe: P) -> Result<Self> {
        config.validate()?;

        let ts = config.samples_per_symbol();
        let n = ts * FSK_FRAME_SYMBOLS;
        let params = FrameParams {
            bits_per_frame: FSK_FRAME_SYMBOLS,
            samples_per_frame: n,
            samples_per_symbol: ts,
        };

        let omega = [config.f1, config.f2].map(|f| TAU * f as f64 / config.sample_rate as f64);
        let osc = omega.map(|w| {
            (0..n)
                .map(|i| {
                    let phase = w * i as f64;
                    (phase.cos(), -phase.sin())
                })
                .collect::<Vec<_>>()
        });

        debug!(
            "FSK modem: Fs={} Rs={} f1={} f2={} Ts={} N={}",
            config.sample_rate, config.symbol_rate, config.f1, config.f2, ts, n
        );

        Ok(Self {
            params,
            omega,
            tx_phase: 0.0,
            osc,
            // One symbol of silence as history so timing can move earlier
            rx: vec![0.0; ts],
            rx_offset: ts,
            nin: n,
            mags: [Vec::with_capacity(n), Vec::with_capacity(n)],
            probe,
        })
    }

    /// Tear down the modem and hand back its probe.
    pub fn into_probe(self) -> P {
        self.probe
    }

    /// Symbol timing estimate in samples, relative to the current decode
    /// offset. `None` when the frame has too few transitions to tell.
    fn estimate_timing(&self) -> Option<f64> {
        let ts = self.params.samples_per_symbol;
        let span = self.params.samples_per_frame - ts;

        let mut re = 0.0f64;
        let mut im = 0.0f64;
        let mut total = 0.0f64;
        for i in 0..span {
            let m = (self.mags[0][i] - self.mags[1][i]).abs() as f64;
            let phase = TAU * (i % ts) as f64 / ts as f64;
            re += m * phase.cos();
            im -= m * phase.sin();
            total += m;
        }

        if total <= 0.0 || re.hypot(im) < FSK_TIMING_MIN_CONFIDENCE * total {
            return None;
        }
        Some(-im.atan2(re) / TAU * ts as f64)
    }

    /// Move the decode offset by `delta` samples, keeping it within
    /// [Ts/2, 3Ts/2). Wrapping drops or repeats one symbol.
    fn retime(&mut self, delta: isize) -> usize {
        let ts = self.params.samples_per_symbol as isize;
        let half = ts / 2;
        let mut offset = self.rx_offset as isize + delta;
        if offset < half {
            offset += ts;
            warn!("Timing slip: skipping one symbol");
        } else if offset >= half + ts {
            offset -= ts;
            warn!("Timing slip: repeating one symbol");
        }
        offset as usize
    }
}

/// Magnitude of the `ts`-sample correlation against one tone, for every
/// window start in `0..=frame.len() - ts`.
fn sliding_magnitudes(frame: &[f32], osc: &[(f64, f64)], ts: usize, out: &mut Vec<f32>) {
    out.clear();
    let (mut re, mut im) = (0.0f64, 0.0f64);
    for n in 0..ts {
        re += frame[n] as f64 * osc[n].0;
        im += frame[n] as f64 * osc[n].1;
    }
    out.push(re.hypot(im) as f32);

    for i in 1..=frame.len() - ts {
        let old = frame[i - 1] as f64;
        let new = frame[i + ts - 1] as f64;
        re += new * osc[i + ts - 1].0 - old * osc[i - 1].0;
        im += new * osc[i + ts - 1].1 - old * osc[i - 1].1;
        out.push(re.hypot(im) as f32);
    }
}

impl<P: Probe> Modem for FskModem<P> {
    fn frame_params(&self) -> FrameParams {
        self.params
    }

    fn required_input_samples(&self) -> usize {
        self.nin
    }

    fn modulate(&mut self, samples_out: &mut [f32], bits_in: &[u8]) -> Result<()> {
        let params = self.params;
        if bits_in.len() != params.bits_per_frame {
            return Err(FskTestError::InvalidInputSize {
                expected: params.bits_per_frame,
                actual: bits_in.len(),
            });
        }
        if samples_out.len() != params.samples_per_frame {
            return Err(FskTestError::InvalidInputSize {
                expected: params.samples_per_frame,
                actual: samples_out.len(),
            });
        }

        let symbols = samples_out.chunks_exact_mut(params.samples_per_symbol);
        for (&bit, symbol) in bits_in.iter().zip(symbols) {
            let omega = self.omega[usize::from(bit != 0)];
            for sample in symbol.iter_mut() {
                *sample = self.tx_phase.cos() as f32;
                self.tx_phase = (self.tx_phase + omega) % TAU;
            }
        }

        let tx_bits: Vec<i32> = bits_in.iter().map(|&b| i32::from(b != 0)).collect();
        self.probe.samp_i("tx_bits", &tx_bits);
        Ok(())
    }

    fn demodulate(&mut self, bits_out: &mut [u8], samples_in: &[f32]) -> Result<()> {
        let params = self.params;
        if samples_in.len() != self.nin {
            return Err(FskTestError::InvalidInputSize {
                expected: self.nin,
                actual: samples_in.len(),
            });
        }
        if bits_out.len() != params.bits_per_frame {
            return Err(FskTestError::InvalidInputSize {
                expected: params.bits_per_frame,
                actual: bits_out.len(),
            });
        }

        let ts = params.samples_per_symbol;
        let n = params.samples_per_frame;
        self.rx.extend_from_slice(samples_in);

        let frame = &self.rx[self.rx_offset..self.rx_offset + n];
        for (osc, mags) in self.osc.iter().zip(self.mags.iter_mut()) {
            sliding_magnitudes(frame, osc, ts, mags);
        }

        for (k, bit) in bits_out.iter_mut().enumerate() {
            let i = k * ts;
            *bit = u8::from(self.mags[1][i] > self.mags[0][i]);
        }

        let timing = self.estimate_timing();
        let delta = timing
            .filter(|t| t.abs() >= FSK_TIMING_DEADBAND * ts as f64)
            .map_or(0, |t| t.round() as isize);

        let consumed = self.nin;
        self.rx.drain(..n);
        let offset = self.retime(delta);
        self.nin = n + offset - self.rx.len();
        self.rx_offset = offset;

        if delta != 0 {
            debug!("Timing correction {} samples, next nin {}", delta, self.nin);
        }

        let rx_bits: Vec<i32> = bits_out.iter().map(|&b| i32::from(b)).collect();
        self.probe.samp_i("nin", &[consumed as i32]);
        self.probe
            .samp_f("rx_timing", &[(timing.unwrap_or(0.0) / ts as f64) as f32]);
        self.probe.samp_i("rx_bits", &rx_bits);
        Ok(())
    }
}
