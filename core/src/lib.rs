//! Conformance test driver for a binary FSK modem
//!
//! Runs the modem's modulate and demodulate entry points frame by frame,
//! either closed-loop on pseudo-random bits (self test) or against raw
//! stimulus files, and records the modem's internal state to an Octave
//! probe log for comparison against a reference model.

pub mod error;
pub mod modem;
pub mod fsk;
pub mod probe;
pub mod buffer;
pub mod stream;
pub mod drive;
pub mod channel;
pub mod mode;
pub mod runner;

pub use buffer::{BitBuffer, SampleBuffer};
pub use error::{FskTestError, Result};
pub use fsk::{FskConfig, FskModem, FSK_FRAME_SYMBOLS};
pub use mode::{FileTest, SelfTestConfig, TestMode, TestPlan, USAGE};
pub use modem::{FrameParams, Modem};
pub use probe::{NullProbe, Probe, ProbeLog};
pub use runner::{run, RunOutcome, RunReport};

// Self test configuration
pub const SELF_TEST_BITS: usize = 10000;
pub const SELF_TEST_SAMPLE_RATE: u32 = 8000;
pub const SELF_TEST_SYMBOL_RATE: u32 = 100;
pub const SELF_TEST_F1: u32 = 1200;
pub const SELF_TEST_F2: u32 = 1600;
pub const SELF_TEST_SEED: u64 = 1;
pub const SELF_TEST_PROBE_LOG: &str = "fsk2_tfsk_log.txt";

/// Tag prefixed to every probe trace name
pub const PROBE_TAG: &str = "fsk2";
