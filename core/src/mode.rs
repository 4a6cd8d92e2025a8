//! Test mode selection from invocation parameters.

use crate::error::{FskTestError, Result};
use crate::fsk::FskConfig;
use log::warn;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Parameter set expected by the file-driven tests
pub const USAGE: &str =
    "Usage: tfsk [(M|D) TXFreq1 TXFreq2 SampleRate BitRate InputFile OutputFile OctaveLogFile]";

/// Number of parameters a file-driven test needs
pub const FILE_TEST_PARAMS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestMode {
    /// Closed loop on pseudo-random bits, no stimulus files
    SelfTest,
    /// Bits file in, samples file out
    ModulateOnly,
    /// Samples file in, bits file out
    DemodulateOnly,
}

impl FromStr for TestMode {
    type Err = FskTestError;

    /// Parses the file-test selector token, `M` or `D` in either case.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "M" | "m" => Ok(TestMode::ModulateOnly),
            "D" | "d" => Ok(TestMode::DemodulateOnly),
            _ => Err(FskTestError::Usage(
                "Must specify mod or demod test with M or D".into(),
            )),
        }
    }
}

/// Built-in closed-loop test.
#[derive(Debug, Clone, PartialEq)]
pub struct SelfTestConfig {
    pub modem: FskConfig,
    pub bits: usize,
    pub seed: u64,
    /// Add white Gaussian noise at this Eb/No (dB) before demodulating
    pub ebno_db: Option<f32>,
    pub probe_tag: String,
    pub probe_log: PathBuf,
}

impl Default for SelfTestConfig {
    fn default() -> Self {
        Self {
            modem: FskConfig::default(),
            bits: crate::SELF_TEST_BITS,
            seed: crate::SELF_TEST_SEED,
            ebno_db: None,
            probe_tag: crate::PROBE_TAG.to_string(),
            probe_log: PathBuf::from(crate::SELF_TEST_PROBE_LOG),
        }
    }
}

/// Stimulus-file test.
#[derive(Debug, Clone, PartialEq)]
pub struct FileTest {
    pub mode: TestMode,
    pub modem: FskConfig,
    pub input: PathBuf,
    pub output: PathBuf,
    pub probe_tag: String,
    pub probe_log: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TestPlan {
    SelfTest(SelfTestConfig),
    File(FileTest),
}

fn parse_positive(name: &str, token: &str) -> Result<u32> {
    match token.trim().parse::<u32>() {
        Ok(v) if v > 0 => Ok(v),
        _ => Err(FskTestError::Usage(format!(
            "{} must be a positive integer, got '{}'\n{}",
            name, token, USAGE
        ))),
    }
}

impl TestPlan {
    /// Resolve invocation parameters (program name excluded) to a test plan.
    ///
    /// No parameters selects the self test. Otherwise the parameters are
    /// `(M|D) TXFreq1 TXFreq2 SampleRate BitRate InputFile OutputFile OctaveLogFile`.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        if args.is_empty() {
            return Ok(TestPlan::SelfTest(SelfTestConfig::default()));
        }
        if args.len() < FILE_TEST_PARAMS {
            return Err(FskTestError::Usage(USAGE.to_string()));
        }
        if args.len() > FILE_TEST_PARAMS {
            warn!(
                "Ignoring {} extra parameters",
                args.len() - FILE_TEST_PARAMS
            );
        }

        let arg = |i: usize| args[i].as_ref();
        let mode: TestMode = arg(0).parse()?;
        let modem = FskConfig {
            f1: parse_positive("TXFreq1", arg(1))?,
            f2: parse_positive("TXFreq2", arg(2))?,
            sample_rate: parse_positive("SampleRate", arg(3))?,
            symbol_rate: parse_positive("BitRate", arg(4))?,
        };
        modem
            .validate()
            .map_err(|e| FskTestError::Usage(format!("{}\n{}", e, USAGE)))?;

        Ok(TestPlan::File(FileTest {
            mode,
            modem,
            input: PathBuf::from(arg(5)),
            output: PathBuf::from(arg(6)),
            probe_tag: crate::PROBE_TAG.to_string(),
            probe_log: PathBuf::from(arg(7)),
        }))
    }

    pub fn mode(&self) -> TestMode {
        match self {
            TestPlan::SelfTest(_) => TestMode::SelfTest,
            TestPlan::File(test) => test.mode,
        }
    }

    pub fn modem_config(&self) -> &FskConfig {
        match self {
            TestPlan::SelfTest(cfg) => &cfg.modem,
            TestPlan::File(test) => &test.modem,
        }
    }

    pub fn probe_log(&self) -> &Path {
        match self {
            TestPlan::SelfTest(cfg) => &cfg.probe_log,
            TestPlan::File(test) => &test.probe_log,
        }
    }
}
