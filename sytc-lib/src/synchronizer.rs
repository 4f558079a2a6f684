use std::{
    thread,
    time::{Duration, Instant},
};

use tracing::trace;

use crate::{source::ByteSource, Result};

/// Marker at the start of every frame, ASCII `SYTC`.
pub const MARKER: [u8; 4] = [0x53, 0x59, 0x54, 0x43];

/// Synchronizer scans a byte stream for the frame [MARKER].
///
/// Bytes are pulled one at a time through a window the size of the marker, so after any
/// noise or misalignment the stream is left positioned on the byte immediately following
/// the marker. Everything before it is discarded.
#[derive(Debug)]
pub struct Synchronizer {
    window: [u8; MARKER.len()],
    // Number of valid bytes in window
    filled: usize,
    // Bytes discarded by the last scan
    skipped: usize,
    poll_interval: Duration,
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_POLL_INTERVAL)
    }
}

impl Synchronizer {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

    pub fn new(poll_interval: Duration) -> Self {
        Synchronizer {
            window: [0u8; MARKER.len()],
            filled: 0,
            skipped: 0,
            poll_interval,
        }
    }

    /// Number of bytes discarded ahead of the marker by the most recent scan.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn reset(&mut self) {
        self.window = [0u8; MARKER.len()];
        self.filled = 0;
        self.skipped = 0;
    }

    fn push(&mut self, b: u8) {
        if self.filled == self.window.len() {
            self.window.copy_within(1.., 0);
            self.window[self.filled - 1] = b;
            self.skipped += 1;
        } else {
            self.window[self.filled] = b;
            self.filled += 1;
        }
    }

    fn matched(&self) -> bool {
        self.filled == MARKER.len() && self.window == MARKER
    }

    /// Consume bytes from `source` through the next marker.
    ///
    /// Returns `Ok(true)` with the stream positioned just after the marker, or `Ok(false)`
    /// if `deadline` elapsed or the source was exhausted first. State from any previous
    /// scan is discarded on entry.
    ///
    /// # Errors
    /// Transport errors from `source`.
    pub fn find_marker<S>(&mut self, source: &mut S, deadline: Instant) -> Result<bool>
    where
        S: ByteSource + ?Sized,
    {
        self.reset();
        let mut b = [0u8; 1];

        loop {
            let got = source.try_read(&mut b)?;
            if got == 1 {
                self.push(b[0]);
                if self.matched() {
                    trace!(skipped = self.skipped, "found marker");
                    return Ok(true);
                }
            } else if source.is_exhausted() {
                return Ok(false);
            }
            // A source that never goes quiet must still give up at the deadline.
            let now = Instant::now();
            if now >= deadline {
                trace!(skipped = self.skipped, "no marker before deadline");
                return Ok(false);
            }
            if got == 0 {
                thread::sleep(self.poll_interval.min(deadline - now));
            }
        }
    }
}
