use std::{
    thread,
    time::{Duration, Instant},
};

use crate::{source::ByteSource, Result};

/// Collects a fixed number of bytes from a [ByteSource], tolerating short reads.
#[derive(Debug, Clone, Copy)]
pub struct ExactReader {
    poll_interval: Duration,
}

impl Default for ExactReader {
    fn default() -> Self {
        Self::new(Self::DEFAULT_POLL_INTERVAL)
    }
}

impl ExactReader {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

    /// `poll_interval` is the longest we sleep after a pull that produced no bytes.
    pub fn new(poll_interval: Duration) -> Self {
        ExactReader { poll_interval }
    }

    /// Read `n` bytes from `source`, giving up at `deadline`.
    ///
    /// Whatever was collected is returned, so a result shorter than `n` means the
    /// deadline elapsed or the source was exhausted first. Reading stops early on
    /// exhaustion since no more bytes can arrive.
    ///
    /// # Errors
    /// Transport errors from `source`. A short read is not an error.
    pub fn read<S>(&self, source: &mut S, n: usize, deadline: Instant) -> Result<Vec<u8>>
    where
        S: ByteSource + ?Sized,
    {
        let mut buf = vec![0u8; n];
        let mut filled = 0;

        while filled < n {
            let got = source.try_read(&mut buf[filled..])?;
            if got > 0 {
                filled += got;
                continue;
            }
            if source.is_exhausted() {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep(self.poll_interval.min(deadline - now));
        }

        buf.truncate(filled);
        Ok(buf)
    }
}
