//! Probe logging of modem internals.
//!
//! Traces are accumulated in memory and written as Octave text matrices when
//! the log is closed, so a reference model can load them with `load`.

use crate::error::{FskTestError, Result};
use log::{debug, warn};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Sink for named traces of modem state.
pub trait Probe {
    fn samp_f(&mut self, name: &str, values: &[f32]);
    fn samp_i(&mut self, name: &str, values: &[i32]);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProbe;

impl Probe for NullProbe {
    fn samp_f(&mut self, _name: &str, _values: &[f32]) {}
    fn samp_i(&mut self, _name: &str, _values: &[i32]) {}
}

impl<P: Probe + ?Sized> Probe for &mut P {
    fn samp_f(&mut self, name: &str, values: &[f32]) {
        (**self).samp_f(name, values)
    }

    fn samp_i(&mut self, name: &str, values: &[i32]) {
        (**self).samp_i(name, values)
    }
}

#[derive(Debug)]
enum TraceData {
    Float(Vec<f32>),
    Int(Vec<i32>),
}

impl TraceData {
    fn len(&self) -> usize {
        match self {
            TraceData::Float(v) => v.len(),
            TraceData::Int(v) => v.len(),
        }
    }
}

#[derive(Debug)]
struct Trace {
    name: String,
    data: TraceData,
}

/// Probe log bound to one output file for the duration of a run.
///
/// The file is created on [`open`](ProbeLog::open). Traces are written by
/// [`close`](ProbeLog::close), or by `Drop` if the run bails out early, so the
/// log is finalised exactly once on every path.
#[derive(Debug)]
pub struct ProbeLog {
    tag: String,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    traces: Vec<Trace>,
}

impl ProbeLog {
    pub fn open(tag: &str, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| FskTestError::resource(&path, e))?;
        debug!("Probe log '{}' opened at {}", tag, path.display());
        Ok(Self {
            tag: tag.to_string(),
            path,
            writer: Some(BufWriter::new(file)),
            traces: Vec::new(),
        })
    }

    /// Number of values recorded so far under `name`.
    pub fn trace_len(&self, name: &str) -> Option<usize> {
        self.traces
            .iter()
            .find(|t| t.name == name)
            .map(|t| t.data.len())
    }

    /// Write all traces and release the file.
    pub fn close(mut self) -> Result<()> {
        self.finish()
    }

    fn trace_mut(&mut self, name: &str, make: fn() -> TraceData) -> &mut TraceData {
        let idx = match self.traces.iter().position(|t| t.name == name) {
            Some(idx) => idx,
            None => {
                self.traces.push(Trace {
                    name: name.to_string(),
                    data: make(),
                });
                self.traces.len() - 1
            }
        };
        &mut self.traces[idx].data
    }

    fn finish(&mut self) -> Result<()> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(());
        };

        for trace in &self.traces {
            writeln!(writer, "# name: {}_{}", self.tag, trace.name)?;
            writeln!(writer, "# type: matrix")?;
            writeln!(writer, "# rows: 1")?;
            writeln!(writer, "# columns: {}", trace.data.len())?;
            match &trace.data {
                TraceData::Float(values) => {
                    for v in values {
                        write!(writer, " {}", v)?;
                    }
                }
                TraceData::Int(values) => {
                    for v in values {
                        write!(writer, " {}", v)?;
                    }
                }
            }
            writeln!(writer)?;
            writeln!(writer)?;
            writeln!(writer)?;
        }
        writer.flush()?;

        debug!(
            "Probe log '{}' closed with {} traces",
            self.tag,
            self.traces.len()
        );
        Ok(())
    }
}

impl Probe for ProbeLog {
    fn samp_f(&mut self, name: &str, values: &[f32]) {
        match self.trace_mut(name, || TraceData::Float(Vec::new())) {
            TraceData::Float(data) => data.extend_from_slice(values),
            TraceData::Int(_) => warn!("Probe trace '{}' is integer, dropping floats", name),
        }
    }

    fn samp_i(&mut self, name: &str, values: &[i32]) {
        match self.trace_mut(name, || TraceData::Int(Vec::new())) {
            TraceData::Int(data) => data.extend_from_slice(values),
            TraceData::Float(_) => warn!("Probe trace '{}' is float, dropping integers", name),
        }
    }
}

impl Drop for ProbeLog {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!("Failed to write probe log {}: {}", self.path.display(), e);
        }
    }
}
