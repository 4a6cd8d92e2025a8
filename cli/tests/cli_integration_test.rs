use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_tfsk(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tfsk"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute tfsk")
}

fn combined(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string() + &String::from_utf8_lossy(&output.stdout)
}

fn file_args<'a>(mode: &'a str, input: &'a str, output: &'a str) -> Vec<&'a str> {
    vec![mode, "1200", "1600", "8000", "100", input, output, "probe.txt"]
}

#[test]
fn test_self_test_default_run() {
    let dir = TempDir::new().unwrap();
    let output = run_tfsk(dir.path(), &[]);

    assert!(output.status.success(), "self test failed: {}", combined(&output));
    let text = combined(&output);
    assert!(text.contains("Bit errors: 0"), "unexpected output: {}", text);

    let log = fs::read_to_string(dir.path().join("fsk2_tfsk_log.txt")).unwrap();
    assert!(log.contains("# name: fsk2_rx_bits"));
}

#[test]
fn test_too_few_params_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let output = run_tfsk(dir.path(), &["M", "1200", "1600"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(combined(&output).contains("Usage"));
    assert!(!dir.path().join("fsk2_tfsk_log.txt").exists());
}

#[test]
fn test_bad_mode_token_is_usage_error() {
    let dir = TempDir::new().unwrap();
    let output = run_tfsk(dir.path(), &file_args("X", "in.bin", "out.bin"));

    assert_eq!(output.status.code(), Some(1));
    assert!(combined(&output).contains("M or D"));
    assert!(!dir.path().join("out.bin").exists());
}

#[test]
fn test_unbuildable_modem_keeps_existing_files() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bits.bin"), [0u8; 50]).unwrap();
    fs::write(dir.path().join("out.bin"), b"IMPORTANT PRIOR RESULTS").unwrap();
    fs::write(dir.path().join("probe.txt"), b"old log").unwrap();

    let output = run_tfsk(
        dir.path(),
        &["M", "1200", "1600", "8000", "300", "bits.bin", "out.bin", "probe.txt"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(combined(&output).contains("integer multiple"));
    assert_eq!(fs::read(dir.path().join("out.bin")).unwrap(), b"IMPORTANT PRIOR RESULTS");
    assert_eq!(fs::read(dir.path().join("probe.txt")).unwrap(), b"old log");
}

#[test]
fn test_help_exits_zero() {
    let dir = TempDir::new().unwrap();
    let output = run_tfsk(dir.path(), &["--help"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("OctaveLogFile"));
}

#[test]
fn test_modulate_then_demodulate() {
    let dir = TempDir::new().unwrap();
    let bits: Vec<u8> = (0..250u32).map(|i| ((i * 13) >> 2 & 1) as u8).collect();
    fs::write(dir.path().join("bits.bin"), &bits).unwrap();

    let output = run_tfsk(dir.path(), &file_args("M", "bits.bin", "samples.bin"));
    assert!(output.status.success(), "modulate failed: {}", combined(&output));
    assert_eq!(
        fs::metadata(dir.path().join("samples.bin")).unwrap().len(),
        5 * 4000 * 4
    );

    let output = run_tfsk(dir.path(), &file_args("d", "samples.bin", "decoded.bin"));
    assert!(output.status.success(), "demodulate failed: {}", combined(&output));
    assert_eq!(fs::read(dir.path().join("decoded.bin")).unwrap(), bits);
    assert!(dir.path().join("probe.txt").exists());
}

#[test]
fn test_missing_input_file() {
    let dir = TempDir::new().unwrap();
    let output = run_tfsk(dir.path(), &file_args("D", "absent.bin", "out.bin"));

    assert_eq!(output.status.code(), Some(1));
    assert!(combined(&output).contains("absent.bin"));
}

#[test]
fn test_short_demod_input_gives_empty_output() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("samples.bin"), vec![0u8; 40]).unwrap();

    let output = run_tfsk(dir.path(), &file_args("D", "samples.bin", "bits.bin"));
    assert!(output.status.success(), "{}", combined(&output));
    assert_eq!(fs::metadata(dir.path().join("bits.bin")).unwrap().len(), 0);
}

#[test]
fn test_wav_export() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("bits.bin"), [1u8; 100]).unwrap();

    let mut args = file_args("M", "bits.bin", "samples.bin");
    args.extend(["--wav", "samples.wav"]);
    let output = run_tfsk(dir.path(), &args);
    assert!(output.status.success(), "{}", combined(&output));

    let reader = hound::WavReader::open(dir.path().join("samples.wav")).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 1);
    assert_eq!(spec.sample_rate, 8000);
    assert_eq!(spec.bits_per_sample, 32);
    assert_eq!(spec.sample_format, hound::SampleFormat::Float);
    assert_eq!(reader.len(), 2 * 4000);
}
