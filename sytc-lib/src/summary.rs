use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Frame, Result};

/// Failed decode counts by kind.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Failures {
    pub timeout: usize,
    pub truncated: usize,
    pub malformed: usize,
    pub checksum_mismatch: usize,
    pub io: usize,
}

impl Failures {
    pub fn total(&self) -> usize {
        self.timeout + self.truncated + self.malformed + self.checksum_mismatch + self.io
    }
}

/// Tracks stats on frame iteration.
///
/// # Example
/// ```
/// use sytc::{decode_frames, ReaderSource, Summary};
/// let dat: &[u8] = &[
///     0x53, 0x59, 0x54, 0x43, 0x00, 0x01, 0x0a, 0x00, 0x00, 0x01, 0x00, 0x00,
///     0xab, 0xcd, 0xee, 0xee,
/// ];
///
/// let mut summary = Summary::default();
/// for zult in decode_frames(ReaderSource::new(dat)) {
///     summary.add(&zult);
/// }
/// assert_eq!(summary.frames, 1);
/// assert_eq!(summary.first_time, Some(10));
/// ```
#[derive(Debug, Default, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Summary {
    /// Frames successfully decoded.
    pub frames: usize,
    /// Target records across all decoded frames.
    pub targets: usize,
    /// Decoded frames flagged with a bad terminator.
    pub checksum_invalid: usize,
    pub failures: Failures,
    /// Header time of the first decoded frame.
    pub first_time: Option<u16>,
    /// Header time of the last decoded frame.
    pub last_time: Option<u16>,
    /// Decoded frame count per header mode.
    pub modes: BTreeMap<u8, usize>,
}

impl Summary {
    pub fn add(&mut self, zult: &Result<Frame>) {
        match zult {
            Ok(frame) => self.add_frame(frame),
            Err(err) => self.add_error(err),
        }
    }

    pub fn add_frame(&mut self, frame: &Frame) {
        self.frames += 1;
        self.targets += frame.bodies.len();
        if frame.checksum_invalid {
            self.checksum_invalid += 1;
        }
        if self.first_time.is_none() {
            self.first_time = Some(frame.header.time);
        }
        self.last_time = Some(frame.header.time);
        *self.modes.entry(frame.header.mode).or_default() += 1;
    }

    pub fn add_error(&mut self, err: &Error) {
        let failures = &mut self.failures;
        match err {
            Error::Timeout => failures.timeout += 1,
            Error::Truncated { .. } => failures.truncated += 1,
            Error::Malformed { .. } => failures.malformed += 1,
            Error::ChecksumMismatch { .. } => failures.checksum_mismatch += 1,
            Error::Io(_) => failures.io += 1,
        }
    }
}
