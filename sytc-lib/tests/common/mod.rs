use std::{
    io,
    time::{Duration, Instant},
};

use sytc::{ByteSource, Frame, TargetRecord};

pub fn deadline() -> Instant {
    Instant::now() + Duration::from_millis(200)
}

#[allow(dead_code)]
pub fn target(tlv_signal: u8, distance: u8, azimuth: i8, status: u8) -> TargetRecord {
    // curve and trailing bytes count up from 100, the scalars overwrite the front
    let mut rec: Vec<u8> = (100..100 + TargetRecord::LEN as u8).collect();
    rec[..6].copy_from_slice(&[tlv_signal, distance, azimuth as u8, status, 16, 72]);
    TargetRecord::decode(0, &rec).expect("valid record")
}

#[allow(dead_code)]
pub fn frame(num_targets: usize) -> Frame {
    let bodies = (0..num_targets)
        .map(|i| target(1 + (i % 2) as u8, i as u8, -(i as i8 % 100), 1))
        .collect();
    Frame::new(1, 120, 1, bodies, [0xab, 0xcd])
}

/// Serves a byte stream in fixed-size chunks, returning nothing on every other call to
/// mimic a slow serial link. Never exhausted.
#[allow(dead_code)]
pub struct Trickle {
    dat: Vec<u8>,
    pos: usize,
    chunk: usize,
    idle: bool,
}

#[allow(dead_code)]
impl Trickle {
    pub fn new(dat: Vec<u8>, chunk: usize) -> Self {
        Trickle {
            dat,
            pos: 0,
            chunk,
            idle: false,
        }
    }
}

impl ByteSource for Trickle {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.idle = !self.idle;
        if self.idle {
            return Ok(0);
        }
        let n = self.chunk.min(buf.len()).min(self.dat.len() - self.pos);
        buf[..n].copy_from_slice(&self.dat[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Always has one more byte of noise. Never exhausted.
#[allow(dead_code)]
pub struct Babble;

impl ByteSource for Babble {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match buf.first_mut() {
            Some(b) => {
                *b = 0x00;
                Ok(1)
            }
            None => Ok(0),
        }
    }
}
