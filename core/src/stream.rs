//! Raw stimulus and result files.
//!
//! Bit files hold one byte (0 or 1) per bit. Sample files hold native-endian
//! `f32` samples. Neither has a header; framing comes from the modem.

use crate::error::Result;
use byteorder::{ByteOrder, NativeEndian};
use std::io::{self, Read, Write};

const SAMPLE_BYTES: usize = std::mem::size_of::<f32>();

/// Fill `buf` from `reader`, stopping early only at end of stream.
/// Returns the number of bytes read.
pub fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Somewhere demodulator input comes from.
pub trait SampleSource {
    /// Read up to `out.len()` samples. A return value short of `out.len()`
    /// means the source is exhausted.
    fn read_samples(&mut self, out: &mut [f32]) -> Result<usize>;
}

/// Samples decoded from a raw native-endian `f32` stream.
pub struct SampleReader<R> {
    inner: R,
    bytes: Vec<u8>,
}

impl<R: Read> SampleReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            bytes: Vec::new(),
        }
    }
}

impl<R: Read> SampleSource for SampleReader<R> {
    fn read_samples(&mut self, out: &mut [f32]) -> Result<usize> {
        self.bytes.resize(out.len() * SAMPLE_BYTES, 0);
        let got = read_full(&mut self.inner, &mut self.bytes)?;
        let whole = got / SAMPLE_BYTES;
        NativeEndian::read_f32_into(&self.bytes[..whole * SAMPLE_BYTES], &mut out[..whole]);
        Ok(whole)
    }
}

/// Walks an in-memory sample buffer front to back.
pub struct SliceSource<'a> {
    samples: &'a [f32],
    cursor: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(samples: &'a [f32]) -> Self {
        Self { samples, cursor: 0 }
    }

    pub fn position(&self) -> usize {
        self.cursor
    }
}

impl SampleSource for SliceSource<'_> {
    fn read_samples(&mut self, out: &mut [f32]) -> Result<usize> {
        let rest = &self.samples[self.cursor..];
        let n = out.len().min(rest.len());
        out[..n].copy_from_slice(&rest[..n]);
        self.cursor += n;
        Ok(n)
    }
}

/// Write samples as raw native-endian `f32` in one operation.
pub fn write_samples<W: Write + ?Sized>(writer: &mut W, samples: &[f32]) -> Result<()> {
    let mut bytes = vec![0u8; samples.len() * SAMPLE_BYTES];
    NativeEndian::write_f32_into(samples, &mut bytes);
    writer.write_all(&bytes)?;
    Ok(())
}

/// Decode a whole raw sample file. Trailing bytes short of one sample are ignored.
pub fn samples_from_bytes(bytes: &[u8]) -> Vec<f32> {
    let whole = bytes.len() / SAMPLE_BYTES;
    let mut samples = vec![0.0; whole];
    NativeEndian::read_f32_into(&bytes[..whole * SAMPLE_BYTES], &mut samples);
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Hands out at most `chunk` bytes per read.
    struct Trickle<R> {
        inner: R,
        chunk: usize,
    }

    impl<R: Read> Read for Trickle<R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.chunk);
            self.inner.read(&mut buf[..n])
        }
    }

    #[test]
    fn test_read_full_across_short_reads() {
        let mut reader = Trickle {
            inner: Cursor::new(vec![7u8; 10]),
            chunk: 3,
        };
        let mut buf = [0u8; 8];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 8);
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 2);
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_sample_reader_partial_tail() {
        let samples = [0.25f32, -0.5, 1.0];
        let mut bytes = Vec::new();
        write_samples(&mut bytes, &samples).unwrap();
        bytes.extend_from_slice(&[0xAA, 0xBB]);

        let mut reader = SampleReader::new(Cursor::new(bytes));
        let mut out = [0.0f32; 2];
        assert_eq!(reader.read_samples(&mut out).unwrap(), 2);
        assert_eq!(out, [0.25, -0.5]);
        assert_eq!(reader.read_samples(&mut out).unwrap(), 1);
        assert_eq!(out[0], 1.0);
        assert_eq!(reader.read_samples(&mut out).unwrap(), 0);
    }

    #[test]
    fn test_slice_source_advances() {
        let samples = [1.0f32, 2.0, 3.0, 4.0, 5.0];
        let mut source = SliceSource::new(&samples);
        let mut out = [0.0f32; 2];
        assert_eq!(source.read_samples(&mut out).unwrap(), 2);
        assert_eq!(out, [1.0, 2.0]);
        assert_eq!(source.read_samples(&mut out).unwrap(), 2);
        assert_eq!(out, [3.0, 4.0]);
        assert_eq!(source.read_samples(&mut out).unwrap(), 1);
        assert_eq!(source.position(), 5);
    }

    #[test]
    fn test_samples_from_bytes_matches_writer() {
        let samples = [0.1f32, 0.2, -0.3];
        let mut bytes = Vec::new();
        write_samples(&mut bytes, &samples).unwrap();
        assert_eq!(bytes.len(), 12);
        assert_eq!(samples_from_bytes(&bytes), samples);
    }
}
