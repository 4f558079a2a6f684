//! SYTC frame model and the decoders for each fixed-size section.
//!
//! ```text
//! MARKER(4) | data_length(1) mode(1) time(2, LE) num_targets(1) work_status(1) reserve(2)
//!           | TargetRecord(46) x num_targets
//!           | checksum(2) terminator(2)
//!
//! TargetRecord:
//!   0 tlv_signal  1 distance  2 azimuth  3 status  4 respiration  5 heart_rate
//!   2..22 respiration_curve  22..42 heart_rate_curve  42..46 trailing
//! ```
//!
//! The respiration curve window starts on the azimuth byte, so its first four samples
//! are the same bytes as the azimuth, status, respiration and heart rate fields.
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{synchronizer::MARKER, Error, Result, Section};

/// Frame header, the 8 bytes following the marker.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Header {
    /// Always [MARKER].
    pub start_signal: [u8; 4],
    /// Nominal payload byte count. Informational only, `num_targets` drives parsing.
    pub data_length: u8,
    /// Operating mode.
    pub mode: u8,
    /// Measurement time in minutes.
    pub time: u16,
    /// Number of [TargetRecord]s that follow.
    pub num_targets: u8,
    /// 1 normal, 2 standby, 3 abnormal.
    pub work_status: u8,
    /// Expected to be zero; not checked.
    pub reserve: [u8; 2],
}

impl Header {
    /// Header length in bytes, not including the marker.
    pub const LEN: usize = 8;

    /// Decode a header from the bytes following a marker.
    ///
    /// # Errors
    /// [Error::Truncated] if fewer than [Header::LEN] bytes are provided, or
    /// [Error::Malformed] if `work_status` is not 1, 2 or 3.
    pub fn decode(dat: &[u8]) -> Result<Self> {
        if dat.len() < Self::LEN {
            return Err(Error::Truncated {
                section: Section::Header,
                actual: dat.len(),
                expected: Self::LEN,
            });
        }
        let work_status = dat[5];
        if !(1..=3).contains(&work_status) {
            return Err(Error::Malformed {
                field: "work_status",
                value: work_status,
                index: None,
            });
        }
        Ok(Header {
            start_signal: MARKER,
            data_length: dat[0],
            mode: dat[1],
            time: u16::from_le_bytes([dat[2], dat[3]]),
            num_targets: dat[4],
            work_status,
            reserve: [dat[6], dat[7]],
        })
    }

    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.start_signal);
        buf.push(self.data_length);
        buf.push(self.mode);
        buf.extend_from_slice(&self.time.to_le_bytes());
        buf.push(self.num_targets);
        buf.push(self.work_status);
        buf.extend_from_slice(&self.reserve);
    }

    /// Measurement time as a [Duration].
    pub fn minutes(&self) -> Duration {
        Duration::from_secs(u64::from(self.time) * 60)
    }

    /// Number of body bytes that follow this header.
    pub fn bodies_len(&self) -> usize {
        usize::from(self.num_targets) * TargetRecord::LEN
    }
}

/// Per-target vital sign data.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TargetRecord {
    /// Target slot, 1 or 2. A wire value of 0 decodes as 1.
    pub tlv_signal: u8,
    /// Distance in 0.1m units.
    pub target_distance: u8,
    /// Azimuth in degrees.
    pub target_azimuth: i8,
    /// 1 normal, 2 abnormal.
    pub current_status: u8,
    pub respiration_value: u8,
    pub heart_rate_value: u8,
    /// Record bytes 2..22, overlapping the azimuth through heart rate fields.
    pub respiration_curve: [u8; TargetRecord::CURVE_LEN],
    /// Record bytes 22..42.
    pub heart_rate_curve: [u8; TargetRecord::CURVE_LEN],
    /// Record bytes 42..46, carried through unchanged.
    pub trailing: [u8; 4],
}

impl TargetRecord {
    /// Record length in bytes.
    pub const LEN: usize = 46;
    /// Number of samples in each curve.
    pub const CURVE_LEN: usize = 20;

    const RESPIRATION_CURVE: usize = Self::LEN - 44;
    const HEART_RATE_CURVE: usize = Self::LEN - 24;
    const TRAILING: usize = Self::LEN - 4;

    /// Decode the record at position `index` in the body block.
    ///
    /// # Errors
    /// [Error::Truncated] if fewer than [TargetRecord::LEN] bytes are provided, or
    /// [Error::Malformed] for a `tlv_signal` other than 0, 1 or 2, or a `current_status`
    /// other than 1 or 2.
    pub fn decode(index: usize, dat: &[u8]) -> Result<Self> {
        if dat.len() < Self::LEN {
            return Err(Error::Truncated {
                section: Section::Bodies,
                actual: dat.len(),
                expected: Self::LEN,
            });
        }
        let tlv_signal = match dat[0] {
            0 | 1 => 1,
            2 => 2,
            value => {
                return Err(Error::Malformed {
                    field: "tlv_signal",
                    value,
                    index: Some(index),
                })
            }
        };
        let current_status = match dat[3] {
            v @ (1 | 2) => v,
            value => {
                return Err(Error::Malformed {
                    field: "current_status",
                    value,
                    index: Some(index),
                })
            }
        };

        let mut respiration_curve = [0u8; Self::CURVE_LEN];
        respiration_curve.copy_from_slice(
            &dat[Self::RESPIRATION_CURVE..Self::RESPIRATION_CURVE + Self::CURVE_LEN],
        );
        let mut heart_rate_curve = [0u8; Self::CURVE_LEN];
        heart_rate_curve
            .copy_from_slice(&dat[Self::HEART_RATE_CURVE..Self::HEART_RATE_CURVE + Self::CURVE_LEN]);
        let mut trailing = [0u8; 4];
        trailing.copy_from_slice(&dat[Self::TRAILING..Self::LEN]);

        Ok(TargetRecord {
            tlv_signal,
            target_distance: dat[1],
            // >127 wraps to value - 256
            target_azimuth: i8::from_le_bytes([dat[2]]),
            current_status,
            respiration_value: dat[4],
            heart_rate_value: dat[5],
            respiration_curve,
            heart_rate_curve,
            trailing,
        })
    }

    /// Curves and trailing bytes are written first and the scalar fields last, so where
    /// they overlap the scalars win. A record produced by [TargetRecord::decode] always
    /// encodes back to the same bytes.
    fn encode_into(&self, buf: &mut Vec<u8>) {
        let mut rec = [0u8; Self::LEN];
        rec[Self::RESPIRATION_CURVE..Self::RESPIRATION_CURVE + Self::CURVE_LEN]
            .copy_from_slice(&self.respiration_curve);
        rec[Self::HEART_RATE_CURVE..Self::HEART_RATE_CURVE + Self::CURVE_LEN]
            .copy_from_slice(&self.heart_rate_curve);
        rec[Self::TRAILING..].copy_from_slice(&self.trailing);
        rec[..6].copy_from_slice(&[
            self.tlv_signal,
            self.target_distance,
            self.target_azimuth.to_le_bytes()[0],
            self.current_status,
            self.respiration_value,
            self.heart_rate_value,
        ]);
        buf.extend_from_slice(&rec);
    }
}

/// Decode `count` consecutive [TargetRecord]s.
///
/// Either every record decodes or none are returned.
///
/// # Errors
/// [Error::Truncated] if `dat` holds fewer than `count` records, or the first error from
/// [TargetRecord::decode].
pub fn decode_bodies(count: usize, dat: &[u8]) -> Result<Vec<TargetRecord>> {
    let expected = count * TargetRecord::LEN;
    if dat.len() < expected {
        return Err(Error::Truncated {
            section: Section::Bodies,
            actual: dat.len(),
            expected,
        });
    }
    dat[..expected]
        .chunks_exact(TargetRecord::LEN)
        .enumerate()
        .map(|(idx, chunk)| TargetRecord::decode(idx, chunk))
        .collect()
}

/// Trailing checksum and terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Footer {
    /// Opaque; the algorithm used to fill it is not known, so it is not verified.
    pub checksum: [u8; 2],
    pub terminator: [u8; 2],
}

impl Footer {
    /// Footer length in bytes.
    pub const LEN: usize = 4;
    /// Expected terminator value.
    pub const TERMINATOR: [u8; 2] = [0xee, 0xee];

    /// Split the footer bytes. A bad terminator is not an error here, see
    /// [Footer::is_terminated].
    ///
    /// # Errors
    /// [Error::Truncated] if fewer than [Footer::LEN] bytes are provided.
    pub fn decode(dat: &[u8]) -> Result<Self> {
        if dat.len() < Self::LEN {
            return Err(Error::Truncated {
                section: Section::Footer,
                actual: dat.len(),
                expected: Self::LEN,
            });
        }
        Ok(Footer {
            checksum: [dat[0], dat[1]],
            terminator: [dat[2], dat[3]],
        })
    }

    /// True if the terminator is `0xEE 0xEE`.
    pub fn is_terminated(&self) -> bool {
        self.terminator == Self::TERMINATOR
    }
}

/// One complete decoded message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frame {
    pub header: Header,
    /// Exactly `header.num_targets` records.
    pub bodies: Vec<TargetRecord>,
    pub footer: Footer,
    /// Set when the footer terminator was not `0xEE 0xEE`.
    pub checksum_invalid: bool,
}

impl Frame {
    /// Assemble a well-terminated frame from field values.
    ///
    /// `num_targets` is taken from `bodies` and `data_length` is the payload length,
    /// saturating at 255.
    ///
    /// # Panics
    /// If more than 255 bodies are provided.
    pub fn new(
        mode: u8,
        time: u16,
        work_status: u8,
        bodies: Vec<TargetRecord>,
        checksum: [u8; 2],
    ) -> Self {
        let num_targets = u8::try_from(bodies.len()).expect("at most 255 targets per frame");
        let data_length = u8::try_from(bodies.len() * TargetRecord::LEN).unwrap_or(u8::MAX);
        Frame {
            header: Header {
                start_signal: MARKER,
                data_length,
                mode,
                time,
                num_targets,
                work_status,
                reserve: [0, 0],
            },
            bodies,
            footer: Footer {
                checksum,
                terminator: Footer::TERMINATOR,
            },
            checksum_invalid: false,
        }
    }

    /// Total length on the wire, marker included.
    pub fn wire_len(&self) -> usize {
        MARKER.len() + Header::LEN + self.bodies.len() * TargetRecord::LEN + Footer::LEN
    }

    /// Wire bytes for this frame, starting with the marker.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.wire_len());
        self.header.encode_into(&mut buf);
        for body in &self.bodies {
            body.encode_into(&mut buf);
        }
        buf.extend_from_slice(&self.footer.checksum);
        buf.extend_from_slice(&self.footer.terminator);
        buf
    }

    /// Decode a frame from a fully buffered message that starts with the marker.
    ///
    /// A bad terminator sets [Frame::checksum_invalid] rather than failing.
    ///
    /// # Errors
    /// [Error::Truncated] if `dat` is a strict prefix of [MARKER],
    /// [Error::Malformed] on `start_signal` if it otherwise does not start with [MARKER],
    /// or any section decode error.
    pub fn decode(dat: &[u8]) -> Result<Self> {
        if !dat.starts_with(&MARKER) {
            if MARKER.starts_with(dat) {
                return Err(Error::Truncated {
                    section: Section::Header,
                    actual: dat.len(),
                    expected: MARKER.len() + Header::LEN,
                });
            }
            let (value, _) = dat
                .iter()
                .zip(MARKER)
                .find(|(got, want)| *got != want)
                .unwrap_or((&0, 0));
            return Err(Error::Malformed {
                field: "start_signal",
                value: *value,
                index: None,
            });
        }
        let dat = &dat[MARKER.len()..];
        let header = Header::decode(dat)?;
        let dat = &dat[Header::LEN..];

        let bodies_len = header.bodies_len();
        let bodies = decode_bodies(usize::from(header.num_targets), dat)?;
        let footer = Footer::decode(&dat[bodies_len..])?;

        Ok(Frame::assemble(header, bodies, footer))
    }

    pub(crate) fn assemble(header: Header, bodies: Vec<TargetRecord>, footer: Footer) -> Self {
        let checksum_invalid = !footer.is_terminated();
        Frame {
            header,
            bodies,
            footer,
            checksum_invalid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Record where every byte holds its own offset, with the scalar fields patched in.
    fn record_bytes(tlv: u8, distance: u8, azimuth: u8, status: u8, resp: u8, hr: u8) -> Vec<u8> {
        let mut dat: Vec<u8> = (0..TargetRecord::LEN as u8).collect();
        dat[..6].copy_from_slice(&[tlv, distance, azimuth, status, resp, hr]);
        dat
    }

    #[test]
    fn decode_header() {
        let dat: &[u8] = &[0x2e, 0x01, 0x3c, 0x01, 0x01, 0x02, 0x00, 0x00];

        let header = Header::decode(dat).unwrap();

        assert_eq!(header.start_signal, MARKER);
        assert_eq!(header.data_length, 46);
        assert_eq!(header.mode, 1);
        assert_eq!(header.time, 316);
        assert_eq!(header.num_targets, 1);
        assert_eq!(header.work_status, 2);
        assert_eq!(header.reserve, [0, 0]);
        assert_eq!(header.minutes(), Duration::from_secs(316 * 60));
        assert_eq!(header.bodies_len(), 46);
    }

    #[test]
    fn decode_header_too_short() {
        let zult = Header::decode(&[0x2e, 0x01, 0x00]);
        assert!(
            matches!(
                zult,
                Err(Error::Truncated {
                    section: Section::Header,
                    actual: 3,
                    expected: 8
                })
            ),
            "got {zult:?}"
        );
    }

    #[test]
    fn decode_header_bad_work_status() {
        for bad in [0u8, 4, 0xff] {
            let dat = [0x00, 0x01, 0x00, 0x00, 0x00, bad, 0x00, 0x00];
            let zult = Header::decode(&dat);
            assert!(
                matches!(
                    zult,
                    Err(Error::Malformed {
                        field: "work_status",
                        index: None,
                        ..
                    })
                ),
                "work_status={bad} got {zult:?}"
            );
        }
    }

    #[test]
    fn decode_record() {
        let dat = record_bytes(0, 10, 200, 1, 70, 75);

        let rec = TargetRecord::decode(0, &dat).unwrap();

        assert_eq!(rec.tlv_signal, 1);
        assert_eq!(rec.target_distance, 10);
        assert_eq!(rec.target_azimuth, -56);
        assert_eq!(rec.current_status, 1);
        assert_eq!(rec.respiration_value, 70);
        assert_eq!(rec.heart_rate_value, 75);
        assert_eq!(rec.respiration_curve[..5], [200, 1, 70, 75, 6]);
        assert_eq!(rec.respiration_curve[19], 21);
        assert_eq!(rec.heart_rate_curve[0], 22);
        assert_eq!(rec.heart_rate_curve[19], 41);
        assert_eq!(rec.trailing, [42, 43, 44, 45]);
    }

    #[test]
    fn record_curve_offsets() {
        let mut dat: Vec<u8> = (0..TargetRecord::LEN as u8).collect();
        dat[0] = 1;
        dat[3] = 1;

        let rec = TargetRecord::decode(0, &dat).unwrap();

        let resp: Vec<u8> = (2..22).collect();
        let hr: Vec<u8> = (22..42).collect();
        assert_eq!(rec.respiration_curve[0], 2);
        assert_eq!(rec.respiration_curve[1], 1, "status byte patched");
        assert_eq!(rec.respiration_curve[2..], resp[2..]);
        assert_eq!(rec.heart_rate_curve[..], hr[..]);
        assert_eq!(rec.trailing, [42, 43, 44, 45]);
    }

    #[test]
    fn encode_record_scalars_win_overlap() {
        let dat = record_bytes(2, 33, 190, 2, 15, 80);
        let mut rec = TargetRecord::decode(0, &dat).unwrap();

        let mut buf = Vec::new();
        rec.encode_into(&mut buf);
        assert_eq!(buf, dat, "decoded record re-encodes unchanged");

        rec.respiration_curve[0] = 0x11;
        rec.target_azimuth = -1;
        buf.clear();
        rec.encode_into(&mut buf);
        assert_eq!(buf[2], 0xff);
        assert_eq!(buf[6..], dat[6..]);
    }

    #[test]
    fn decode_record_azimuth_bounds() {
        for (raw, expected) in [(0u8, 0i8), (127, 127), (128, -128), (255, -1)] {
            let rec = TargetRecord::decode(0, &record_bytes(1, 0, raw, 1, 0, 0)).unwrap();
            assert_eq!(rec.target_azimuth, expected, "raw azimuth {raw}");
        }
    }

    #[test]
    fn decode_record_bad_status() {
        let zult = TargetRecord::decode(3, &record_bytes(1, 0, 0, 0, 0, 0));
        assert!(
            matches!(
                zult,
                Err(Error::Malformed {
                    field: "current_status",
                    value: 0,
                    index: Some(3)
                })
            ),
            "got {zult:?}"
        );
    }

    #[test]
    fn decode_bodies_is_all_or_nothing() {
        let mut dat = record_bytes(1, 1, 1, 1, 1, 1);
        dat.extend(record_bytes(2, 2, 2, 9, 2, 2));

        let zult = decode_bodies(2, &dat);
        assert!(
            matches!(zult, Err(Error::Malformed { index: Some(1), .. })),
            "got {zult:?}"
        );

        let zult = decode_bodies(2, &dat[..TargetRecord::LEN + 10]);
        assert!(
            matches!(
                zult,
                Err(Error::Truncated {
                    section: Section::Bodies,
                    actual: 56,
                    expected: 92
                })
            ),
            "got {zult:?}"
        );
    }

    #[test]
    fn decode_zero_bodies() {
        assert!(decode_bodies(0, &[]).unwrap().is_empty());
    }

    #[test]
    fn decode_footer() {
        let footer = Footer::decode(&[0xab, 0xcd, 0xee, 0xee]).unwrap();
        assert_eq!(footer.checksum, [0xab, 0xcd]);
        assert!(footer.is_terminated());

        let footer = Footer::decode(&[0xab, 0xcd, 0xee, 0x00]).unwrap();
        assert!(!footer.is_terminated());

        assert!(Footer::decode(&[0xab, 0xcd, 0xee]).is_err());
    }

    #[test]
    fn frame_new_derives_lengths() {
        let rec = TargetRecord::decode(0, &record_bytes(1, 0, 0, 1, 0, 0)).unwrap();
        let frame = Frame::new(5, 10, 1, vec![rec; 6], [0, 0]);

        assert_eq!(frame.header.num_targets, 6);
        assert_eq!(frame.header.data_length, u8::MAX, "6 * 46 saturates");
        assert_eq!(frame.wire_len(), 4 + 8 + 6 * 46 + 4);
        assert_eq!(frame.encode().len(), frame.wire_len());
    }

    #[test]
    fn encode_then_decode() {
        let rec = TargetRecord::decode(0, &record_bytes(2, 33, 190, 2, 15, 80)).unwrap();
        let frame = Frame::new(3, 0x1234, 3, vec![rec], [0x01, 0x02]);

        let dat = frame.encode();
        assert_eq!(dat[..4], MARKER);
        assert_eq!(dat[6..8], [0x34, 0x12], "time is little-endian");

        assert_eq!(Frame::decode(&dat).unwrap(), frame);
    }

    #[test]
    fn decode_flags_bad_terminator() {
        let mut dat = Frame::new(1, 0, 1, vec![], [0, 0]).encode();
        let n = dat.len();
        dat[n - 1] = 0x00;

        let frame = Frame::decode(&dat).unwrap();
        assert!(frame.checksum_invalid);
        assert_eq!(frame.footer.terminator, [0xee, 0x00]);
    }

    #[test]
    fn decode_without_marker() {
        let mut dat = Frame::new(1, 0, 1, vec![], [0, 0]).encode();
        dat[2] = 0x00;
        let zult = Frame::decode(&dat);
        assert!(
            matches!(
                zult,
                Err(Error::Malformed {
                    field: "start_signal",
                    value: 0,
                    index: None
                })
            ),
            "got {zult:?}"
        );

        let zult = Frame::decode(&MARKER[..2]);
        assert!(
            matches!(
                zult,
                Err(Error::Truncated {
                    section: Section::Header,
                    actual: 2,
                    expected: 12
                })
            ),
            "got {zult:?}"
        );

        assert!(matches!(
            Frame::decode(&[]),
            Err(Error::Truncated { actual: 0, .. })
        ));
    }
}
