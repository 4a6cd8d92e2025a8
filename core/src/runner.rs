//! Runs one test plan end to end.
//!
//! Resource order on every run: the modem configuration is checked first,
//! then stimulus and result files are opened, then the probe log, then the
//! modem. Teardown runs in reverse and also happens on error
//! paths, through `Drop`.

use crate::buffer::BitBuffer;
use crate::channel::AwgnChannel;
use crate::drive::{demodulate_frames, modulate_frames};
use crate::error::{FskTestError, Result};
use crate::fsk::FskModem;
use crate::mode::{FileTest, SelfTestConfig, TestMode, TestPlan};
use crate::modem::Modem;
use crate::probe::ProbeLog;
use crate::stream::{write_samples, SampleReader, SliceSource};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub mode: TestMode,
    /// Bits fed to the modulator
    pub bits_modulated: usize,
    /// Samples the modulator produced
    pub samples_modulated: usize,
    /// Demodulate calls made
    pub frames_demodulated: usize,
    /// Samples the demodulator consumed
    pub samples_demodulated: usize,
    /// Bits the demodulator produced
    pub bits_demodulated: usize,
    /// Self test only: demodulated bits that differ from the transmitted ones
    pub bit_errors: Option<usize>,
}

impl RunReport {
    fn new(mode: TestMode) -> Self {
        Self {
            mode,
            bits_modulated: 0,
            samples_modulated: 0,
            frames_demodulated: 0,
            samples_demodulated: 0,
            bits_demodulated: 0,
            bit_errors: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: RunReport,
    /// Modulator output, empty for demodulate-only runs
    pub modulated: Vec<f32>,
}

pub fn run(plan: &TestPlan) -> Result<RunOutcome> {
    match plan {
        TestPlan::SelfTest(cfg) => run_self_test(cfg),
        TestPlan::File(test) => run_file_test(test),
    }
}

pub fn run_self_test(cfg: &SelfTestConfig) -> Result<RunOutcome> {
    info!(
        "Self test: {} bits, Fs={} Rs={} f1={} f2={}",
        cfg.bits, cfg.modem.sample_rate, cfg.modem.symbol_rate, cfg.modem.f1, cfg.modem.f2
    );

    cfg.modem.validate()?;
    let probe = ProbeLog::open(&cfg.probe_tag, &cfg.probe_log)?;
    let mut modem = FskModem::with_probe(cfg.modem, probe)?;
    let params = modem.frame_params();
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut report = RunReport::new(TestMode::SelfTest);

    let bits = BitBuffer::random(cfg.bits, params.bits_per_frame, &mut rng)?;
    let samples = modulate_frames(&mut modem, &bits)?;
    report.bits_modulated = bits.len();
    report.samples_modulated = samples.len();

    let impaired = match cfg.ebno_db {
        Some(ebno_db) => {
            let channel = AwgnChannel::from_ebno(ebno_db, params.samples_per_symbol)?;
            info!("Channel: AWGN at Eb/No {} dB", channel.ebno_db());
            let mut noisy = samples.clone();
            channel.apply(noisy.as_mut_slice(), &mut rng);
            Some(noisy)
        }
        None => None,
    };
    let received = impaired.as_ref().unwrap_or(&samples);

    let mut decoded = Vec::with_capacity(bits.len());
    let summary = demodulate_frames(
        &mut modem,
        &mut SliceSource::new(received.as_slice()),
        &mut decoded,
    )?;
    report.frames_demodulated = summary.frames;
    report.samples_demodulated = summary.samples_consumed;
    report.bits_demodulated = summary.bits_written;
    report.bit_errors = Some(
        bits.as_slice()
            .iter()
            .zip(&decoded)
            .filter(|(tx, rx)| tx != rx)
            .count(),
    );

    modem.into_probe().close()?;
    log_report(&report);

    Ok(RunOutcome {
        report,
        modulated: samples.into_vec(),
    })
}

pub fn run_file_test(test: &FileTest) -> Result<RunOutcome> {
    if test.mode == TestMode::SelfTest {
        return Err(self_test_with_files());
    }
    test.modem.validate()?;

    let input = File::open(&test.input).map_err(|e| FskTestError::resource(&test.input, e))?;
    let output =
        File::create(&test.output).map_err(|e| FskTestError::resource(&test.output, e))?;

    info!(
        "{:?}: {} -> {}, Fs={} Rs={} f1={} f2={}",
        test.mode,
        test.input.display(),
        test.output.display(),
        test.modem.sample_rate,
        test.modem.symbol_rate,
        test.modem.f1,
        test.modem.f2
    );

    let probe = ProbeLog::open(&test.probe_tag, &test.probe_log)?;
    let mut modem = FskModem::with_probe(test.modem, probe)?;
    let mut report = RunReport::new(test.mode);
    let mut modulated = Vec::new();

    match test.mode {
        TestMode::ModulateOnly => {
            let params = modem.frame_params();
            let hint = capacity_hint(input.metadata()?.len())?;
            let bits = BitBuffer::read_framed(
                &mut BufReader::new(input),
                params.bits_per_frame,
                hint,
            )?;
            let samples = modulate_frames(&mut modem, &bits)?;

            let mut writer = BufWriter::new(output);
            write_samples(&mut writer, samples.as_slice())?;
            writer.flush()?;

            report.bits_modulated = bits.len();
            report.samples_modulated = samples.len();
            modulated = samples.into_vec();
        }
        TestMode::DemodulateOnly => {
            let mut source = SampleReader::new(BufReader::new(input));
            let mut writer = BufWriter::new(output);
            let summary = demodulate_frames(&mut modem, &mut source, &mut writer)?;
            writer.flush()?;

            report.frames_demodulated = summary.frames;
            report.samples_demodulated = summary.samples_consumed;
            report.bits_demodulated = summary.bits_written;
        }
        TestMode::SelfTest => return Err(self_test_with_files()),
    }

    modem.into_probe().close()?;
    log_report(&report);
    Ok(RunOutcome { report, modulated })
}

fn self_test_with_files() -> FskTestError {
    FskTestError::Usage("self test does not take stimulus files".into())
}

/// Bits to reserve for a bits file of `len` bytes.
fn capacity_hint(len: u64) -> Result<usize> {
    usize::try_from(len).map_err(|_| FskTestError::Allocation {
        requested: usize::MAX,
    })
}

fn log_report(report: &RunReport) {
    if report.mode != TestMode::DemodulateOnly {
        info!(
            "Modulated {} bits into {} samples",
            report.bits_modulated, report.samples_modulated
        );
    }
    if report.mode != TestMode::ModulateOnly {
        info!(
            "Demodulated {} frames ({} samples) into {} bits",
            report.frames_demodulated, report.samples_demodulated, report.bits_demodulated
        );
    }
    if let Some(errors) = report.bit_errors {
        info!("Bit errors: {} of {}", errors, report.bits_modulated);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_hint_from_file_length() {
        assert_eq!(capacity_hint(0).unwrap(), 0);
        assert_eq!(capacity_hint(4000).unwrap(), 4000);
    }

    #[cfg(target_pointer_width = "32")]
    #[test]
    fn test_capacity_hint_too_large_for_target() {
        assert!(matches!(
            capacity_hint(u64::from(u32::MAX) + 1),
            Err(FskTestError::Allocation { .. })
        ));
    }

    #[test]
    fn test_file_test_rejects_self_test_mode() {
        let test = FileTest {
            mode: TestMode::SelfTest,
            modem: crate::FskConfig::default(),
            input: "absent_in.bin".into(),
            output: "absent_out.bin".into(),
            probe_tag: crate::PROBE_TAG.to_string(),
            probe_log: "absent_log.txt".into(),
        };
        assert!(run_file_test(&test).unwrap_err().is_usage());
        assert!(!std::path::Path::new("absent_out.bin").exists());
    }
}
