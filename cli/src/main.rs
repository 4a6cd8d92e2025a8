use clap::Parser;
use fsktest_core::{run, FskTestError, RunReport, TestMode, TestPlan};
use hound::WavSpec;
use log::{error, info, LevelFilter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "tfsk")]
#[command(version)]
#[command(about = "Test harness for the binary FSK modem")]
#[command(after_help = fsktest_core::USAGE)]
struct Cli {
    /// Empty for the self test, otherwise: (M|D) TXFreq1 TXFreq2 SampleRate BitRate InputFile OutputFile OctaveLogFile
    #[arg(value_name = "PARAMS", num_args = 0..)]
    params: Vec<String>,

    /// Add white Gaussian noise at this Eb/No (dB) in the self test
    #[arg(long, value_name = "DB", allow_negative_numbers = true)]
    ebno: Option<f32>,

    /// Also write the modulated samples to a 32-bit float WAV file
    #[arg(long, value_name = "PATH")]
    wav: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] FskTestError),

    #[error("WAV export failed: {0}")]
    Wav(#[from] hound::Error),
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match execute(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Core(FskTestError::Usage(msg))) => {
            eprintln!("{}", msg);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli) -> Result<(), CliError> {
    let mut plan = TestPlan::from_args(&cli.params)?;
    match &mut plan {
        TestPlan::SelfTest(cfg) => cfg.ebno_db = cli.ebno,
        TestPlan::File(_) if cli.ebno.is_some() => {
            info!("--ebno only applies to the self test, ignoring");
        }
        TestPlan::File(_) => {}
    }

    let outcome = run(&plan)?;
    print_report(&outcome.report);
    println!("Probe log written to {}", plan.probe_log().display());

    if let Some(path) = &cli.wav {
        if outcome.modulated.is_empty() {
            info!("No modulated samples to export, skipping {}", path.display());
        } else {
            write_wav(path, &outcome.modulated, plan.modem_config().sample_rate)?;
            println!(
                "Wrote {} samples to {}",
                outcome.modulated.len(),
                path.display()
            );
        }
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    match report.mode {
        TestMode::SelfTest => {
            println!(
                "Self test: {} bits modulated into {} samples",
                report.bits_modulated, report.samples_modulated
            );
            println!(
                "Demodulated {} frames into {} bits",
                report.frames_demodulated, report.bits_demodulated
            );
            if let Some(errors) = report.bit_errors {
                let ber = if report.bits_demodulated > 0 {
                    errors as f64 / report.bits_demodulated.min(report.bits_modulated) as f64
                } else {
                    0.0
                };
                println!("Bit errors: {} (BER {:.4})", errors, ber);
            }
        }
        TestMode::ModulateOnly => {
            println!(
                "Modulated {} bits into {} samples",
                report.bits_modulated, report.samples_modulated
            );
        }
        TestMode::DemodulateOnly => {
            println!(
                "Demodulated {} frames ({} samples) into {} bits",
                report.frames_demodulated, report.samples_demodulated, report.bits_demodulated
            );
        }
    }
}

fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()
}
