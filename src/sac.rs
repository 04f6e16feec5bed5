//! Reader for binary SAC waveform files.
//!
//! A SAC file is a 632-byte header followed by `npts` 32-bit float samples:
//!
//! | bytes     | content                                   |
//! |-----------|-------------------------------------------|
//! | 0..280    | 70 floats (`delta` is word 0, `b` word 5) |
//! | 280..440  | 40 ints (`nvhdr` is word 6, `npts` word 9) |
//! | 440..632  | character fields (`kstnm` first, 8 bytes) |
//!
//! Files written on either byte order are accepted: the header version
//! `nvhdr` must read as 6 in exactly one of them.

use crate::error::{HvarmaError, Result};
use crate::signal::Signal;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::path::Path;
use tracing::debug;

pub const HEADER_BYTES: usize = 632;
const INT_OFFSET: usize = 280;
const CHAR_OFFSET: usize = 440;
const KCMPNM_OFFSET: usize = CHAR_OFFSET + 160;
const HEADER_VERSION: i32 = 6;

/// Byte order a file was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// One component read from a SAC file.
#[derive(Debug, Clone, PartialEq)]
pub struct SacTrace {
    /// Sample interval in seconds.
    pub delta: f64,
    /// Begin time relative to the reference time, in seconds.
    pub begin: f64,
    pub station: String,
    pub component: String,
    pub endianness: Endianness,
    pub data: Vec<f64>,
}

impl SacTrace {
    pub fn sampling_rate(&self) -> f64 {
        1.0 / self.delta
    }
}

fn char_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .trim()
        .to_string()
}

fn parse<B: ByteOrder>(bytes: &[u8], endianness: Endianness, origin: &str) -> Result<SacTrace> {
    let float = |word: usize| B::read_f32(&bytes[4 * word..4 * word + 4]) as f64;
    let int = |word: usize| B::read_i32(&bytes[INT_OFFSET + 4 * word..INT_OFFSET + 4 * word + 4]);

    let delta = float(0);
    if !delta.is_finite() || delta <= 0.0 {
        return Err(HvarmaError::Input(format!(
            "{}: invalid sample interval {}",
            origin, delta
        )));
    }
    let npts = int(9);
    let npts = usize::try_from(npts)
        .map_err(|_| HvarmaError::Input(format!("{}: negative npts {}", origin, npts)))?;
    let expected = HEADER_BYTES + 4 * npts;
    if bytes.len() < expected {
        return Err(HvarmaError::Input(format!(
            "{}: header announces {} samples but the file holds {} bytes",
            origin,
            npts,
            bytes.len()
        )));
    }

    let mut data = vec![0.0f32; npts];
    B::read_f32_into(&bytes[HEADER_BYTES..expected], &mut data);

    Ok(SacTrace {
        delta,
        begin: float(5),
        station: char_field(&bytes[CHAR_OFFSET..CHAR_OFFSET + 8]),
        component: char_field(&bytes[KCMPNM_OFFSET..KCMPNM_OFFSET + 8]),
        endianness,
        data: data.into_iter().map(f64::from).collect(),
    })
}

/// Decode a SAC file already held in memory.
pub fn parse_sac(bytes: &[u8], origin: &str) -> Result<SacTrace> {
    if bytes.len() < HEADER_BYTES {
        return Err(HvarmaError::Input(format!(
            "{}: {} bytes is shorter than a SAC header",
            origin,
            bytes.len()
        )));
    }
    let version = &bytes[INT_OFFSET + 24..INT_OFFSET + 28];
    if LittleEndian::read_i32(version) == HEADER_VERSION {
        parse::<LittleEndian>(bytes, Endianness::Little, origin)
    } else if BigEndian::read_i32(version) == HEADER_VERSION {
        parse::<BigEndian>(bytes, Endianness::Big, origin)
    } else {
        Err(HvarmaError::Input(format!(
            "{}: not a SAC file (header version is not {})",
            origin, HEADER_VERSION
        )))
    }
}

/// Read one SAC file from disk.
pub fn read_sac(path: impl AsRef<Path>) -> Result<SacTrace> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| HvarmaError::io(path, e))?;
    let trace = parse_sac(&bytes, &path.display().to_string())?;
    debug!(
        path = %path.display(),
        station = %trace.station,
        component = %trace.component,
        npts = trace.data.len(),
        delta = trace.delta,
        "read SAC trace"
    );
    Ok(trace)
}

impl Signal {
    /// Combine three traces into a signal.
    ///
    /// The traces must agree in sampling rate, station and length.
    pub fn from_traces(z: SacTrace, n: SacTrace, e: SacTrace) -> Result<Self> {
        for (name, other) in [("N", &n), ("E", &e)] {
            if (other.delta - z.delta).abs() > f64::EPSILON * z.delta.abs().max(1.0) {
                return Err(HvarmaError::Input(format!(
                    "Sampling rate of {} ({} Hz) differs from Z ({} Hz)",
                    name,
                    other.sampling_rate(),
                    z.sampling_rate()
                )));
            }
            if other.station != z.station {
                return Err(HvarmaError::Input(format!(
                    "Station of {} ({}) differs from Z ({})",
                    name, other.station, z.station
                )));
            }
        }
        let rate = z.sampling_rate();
        Signal::new(z.data, n.data, e.data, rate, z.station)
    }

    /// Load a signal from vertical, north and east SAC files.
    pub fn from_sac(
        z: impl AsRef<Path>,
        n: impl AsRef<Path>,
        e: impl AsRef<Path>,
    ) -> Result<Self> {
        Signal::from_traces(read_sac(z)?, read_sac(n)?, read_sac(e)?)
    }
}
