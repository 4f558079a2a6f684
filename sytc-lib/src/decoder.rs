use std::time::{Duration, Instant};

use tracing::{debug, span, trace, Level};
use typed_builder::TypedBuilder;

use crate::{
    frame::{decode_bodies, Footer, Frame, Header},
    reader::ExactReader,
    source::ByteSource,
    synchronizer::Synchronizer,
    Error, Result, Section,
};

/// What to do with a frame whose terminator is not `0xEE 0xEE`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TerminatorPolicy {
    /// Produce the frame with [Frame::checksum_invalid] set.
    #[default]
    Flag,
    /// Fail with [Error::ChecksumMismatch].
    Reject,
}

/// Decodes [Frame]s from a [ByteSource].
///
/// Each decode seeks the marker, then reads the header, the target records and the footer,
/// all bounded by one deadline. A failed decode consumes whatever it read and produces no
/// frame; calling again resynchronizes on the next marker.
///
/// # Examples
/// ```
/// use std::time::{Duration, Instant};
/// use sytc::{FrameDecoder, ReaderSource, TerminatorPolicy};
///
/// let dat: &[u8] = &[
///     0x53, 0x59, 0x54, 0x43, // marker
///     0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, // header, no targets
///     0xab, 0xcd, 0xee, 0xee, // footer
/// ];
/// let decoder = FrameDecoder::builder()
///     .timeout(Duration::from_millis(500))
///     .terminator_policy(TerminatorPolicy::Reject)
///     .build();
///
/// let mut source = ReaderSource::new(dat);
/// let frame = decoder
///     .decode_frame(&mut source, Instant::now() + Duration::from_millis(100))
///     .unwrap();
/// assert_eq!(frame.header.mode, 1);
/// assert!(frame.bodies.is_empty());
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct FrameDecoder {
    /// Time allowed for each frame when iterating with [FrameDecoder::frames].
    #[builder(default = Duration::from_secs(1))]
    timeout: Duration,
    /// Longest sleep between pulls from a source that has no data.
    #[builder(default = ExactReader::DEFAULT_POLL_INTERVAL)]
    poll_interval: Duration,
    #[builder(default)]
    terminator_policy: TerminatorPolicy,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl FrameDecoder {
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Decode the next frame from `source`, giving up at `deadline`.
    ///
    /// # Errors
    /// * [Error::Timeout] if no marker was found
    /// * [Error::Truncated] if any section came back short
    /// * [Error::Malformed] for out of range header or record fields
    /// * [Error::ChecksumMismatch] for a bad terminator with [TerminatorPolicy::Reject]
    /// * [Error::Io] for transport errors
    pub fn decode_frame<S>(&self, source: &mut S, deadline: Instant) -> Result<Frame>
    where
        S: ByteSource + ?Sized,
    {
        let span = span!(Level::TRACE, "decode_frame");
        let _guard = span.enter();

        let mut sync = Synchronizer::new(self.poll_interval);
        if !sync.find_marker(source, deadline)? {
            if sync.skipped() > 0 {
                debug!(skipped = sync.skipped(), "no marker before deadline");
            }
            return Err(Error::Timeout);
        }
        if sync.skipped() > 0 {
            debug!(skipped = sync.skipped(), "discarded bytes ahead of marker");
        }

        let reader = ExactReader::new(self.poll_interval);

        let dat = reader.read(source, Header::LEN, deadline)?;
        let header = Header::decode(&dat)?;

        let expected = header.bodies_len();
        let dat = reader.read(source, expected, deadline)?;
        if dat.len() < expected {
            return Err(Error::Truncated {
                section: Section::Bodies,
                actual: dat.len(),
                expected,
            });
        }
        let bodies = decode_bodies(usize::from(header.num_targets), &dat)?;

        let dat = reader.read(source, Footer::LEN, deadline)?;
        let footer = Footer::decode(&dat)?;
        if !footer.is_terminated() {
            debug!(terminator = ?footer.terminator, "bad terminator");
            if self.terminator_policy == TerminatorPolicy::Reject {
                return Err(Error::ChecksumMismatch {
                    terminator: footer.terminator,
                });
            }
        }

        let frame = Frame::assemble(header, bodies, footer);
        trace!(
            mode = frame.header.mode,
            time = frame.header.time,
            num_targets = frame.header.num_targets,
            checksum_invalid = frame.checksum_invalid,
            "decoded frame"
        );
        Ok(frame)
    }

    /// Iterate over the frames in `source`, allowing [FrameDecoder::timeout] for each.
    ///
    /// See [FrameIter] for how errors and the end of the stream are handled.
    pub fn frames<S: ByteSource>(self, source: S) -> FrameIter<S> {
        FrameIter {
            decoder: self,
            source,
            done: false,
        }
    }
}

/// Iterates over decoded frames. Created with [FrameDecoder::frames] or [decode_frames].
///
/// ## Errors
/// Failed decodes are yielded and iteration continues from the current stream position.
/// Once the source is exhausted a trailing timeout or partial frame ends the iterator
/// rather than being yielded. An [Error::Io] is yielded once and ends the iterator.
pub struct FrameIter<S> {
    decoder: FrameDecoder,
    source: S,
    done: bool,
}

impl<S: ByteSource> FrameIter<S> {
    pub fn into_source(self) -> S {
        self.source
    }
}

impl<S: ByteSource> Iterator for FrameIter<S> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let deadline = Instant::now() + self.decoder.timeout;
        match self.decoder.decode_frame(&mut self.source, deadline) {
            Ok(frame) => Some(Ok(frame)),
            Err(Error::Timeout | Error::Truncated { .. }) if self.source.is_exhausted() => {
                self.done = true;
                None
            }
            Err(err @ Error::Io(_)) => {
                self.done = true;
                Some(Err(err))
            }
            Err(err) => Some(Err(err)),
        }
    }
}

/// Decode one frame from `source` using the default [FrameDecoder].
///
/// # Errors
/// See [FrameDecoder::decode_frame].
pub fn decode_frame<S>(source: &mut S, deadline: Instant) -> Result<Frame>
where
    S: ByteSource + ?Sized,
{
    FrameDecoder::default().decode_frame(source, deadline)
}

/// Creates an iterator over the frames in `source` using the default [FrameDecoder].
///
/// Bytes that are not part of a frame are skipped, and any partial frame at the end of an
/// exhausted source is dropped.
pub fn decode_frames<S: ByteSource>(source: S) -> FrameIter<S> {
    FrameDecoder::default().frames(source)
}
