//! Byte suppliers the decoder can pull from.
//!
//! A [ByteSource] never blocks indefinitely; when nothing is available it returns zero
//! bytes so callers can check their deadline and try again.
use std::{
    io::{self, ErrorKind, Read},
    thread,
    time::Duration,
};

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError};
use tracing::debug;

/// Supplies bytes from some transport.
pub trait ByteSource {
    /// Pull up to `buf.len()` bytes into `buf`, returning how many were written. Zero means
    /// nothing was available right now, not necessarily that the stream has ended.
    ///
    /// # Errors
    /// Any transport error that is not simply "no data yet".
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// True once no further bytes can ever arrive.
    fn is_exhausted(&self) -> bool {
        false
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).try_read(buf)
    }

    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).try_read(buf)
    }

    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }
}

/// Adapts a [Read] implementation.
///
/// `WouldBlock`, `TimedOut` and `Interrupted` errors are reported as zero bytes available,
/// which covers non-blocking sockets and serial ports configured with a read timeout.
///
/// By default a zero-length read is taken as end of stream, as it is for files and pipes.
/// Use [ReaderSource::continuous] for readers that return `Ok(0)` on a read timeout.
pub struct ReaderSource<R> {
    reader: R,
    continuous: bool,
    eof: bool,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        ReaderSource {
            reader,
            continuous: false,
            eof: false,
        }
    }

    /// Treat a zero-length read as "no data yet" rather than end of stream.
    #[must_use]
    pub fn continuous(mut self) -> Self {
        self.continuous = true;
        self
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> ByteSource for ReaderSource<R> {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.eof || buf.is_empty() {
            return Ok(0);
        }
        match self.reader.read(buf) {
            Ok(0) => {
                if !self.continuous {
                    self.eof = true;
                }
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(err) => match err.kind() {
                ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted => Ok(0),
                _ => Err(err),
            },
        }
    }

    fn is_exhausted(&self) -> bool {
        self.eof
    }
}

/// Consumes byte chunks sent over a channel, typically by [spawn_reader].
///
/// Each [ByteSource::try_read] waits at most `poll` for a chunk to arrive. Bytes of a chunk
/// that do not fit the caller's buffer are kept for the next read. The source is exhausted
/// once every sender has been dropped and all buffered bytes are consumed.
pub struct ChannelSource {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
    poll: Duration,
    disconnected: bool,
}

impl ChannelSource {
    /// Default wait for a chunk on each read.
    pub const DEFAULT_POLL: Duration = Duration::from_millis(10);

    pub fn new(rx: Receiver<Vec<u8>>) -> Self {
        ChannelSource {
            rx,
            pending: Vec::new(),
            pos: 0,
            poll: Self::DEFAULT_POLL,
            disconnected: false,
        }
    }

    #[must_use]
    pub fn with_poll(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    fn drain_pending(&mut self, buf: &mut [u8]) -> usize {
        let avail = &self.pending[self.pos..];
        let n = avail.len().min(buf.len());
        buf[..n].copy_from_slice(&avail[..n]);
        self.pos += n;
        if self.pos == self.pending.len() {
            self.pending.clear();
            self.pos = 0;
        }
        n
    }
}

impl ByteSource for ChannelSource {
    fn try_read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pos < self.pending.len() {
            return Ok(self.drain_pending(buf));
        }
        if self.disconnected {
            return Ok(0);
        }
        match self.rx.recv_timeout(self.poll) {
            Ok(chunk) => {
                self.pending = chunk;
                self.pos = 0;
                Ok(self.drain_pending(buf))
            }
            Err(RecvTimeoutError::Timeout) => Ok(0),
            Err(RecvTimeoutError::Disconnected) => {
                self.disconnected = true;
                Ok(0)
            }
        }
    }

    fn is_exhausted(&self) -> bool {
        self.disconnected && self.pos >= self.pending.len()
    }
}

/// Pump a blocking reader into a [ChannelSource] from a background thread.
///
/// The thread reads chunks of up to `chunk_size` bytes and exits on end of stream, on a
/// read error, or when the returned source is dropped.
///
/// # Errors
/// If the background thread could not be started.
pub fn spawn_reader<R>(mut reader: R, chunk_size: usize) -> io::Result<ChannelSource>
where
    R: Read + Send + 'static,
{
    const CHANNEL_DEPTH: usize = 64;
    let (tx, rx) = bounded(CHANNEL_DEPTH);
    let chunk_size = chunk_size.max(1);

    thread::Builder::new()
        .name("sytc_reader".into())
        .spawn(move || {
            let mut buf = vec![0u8; chunk_size];
            loop {
                let n = match reader.read(&mut buf) {
                    Ok(0) => {
                        debug!("reader reached end of stream");
                        break;
                    }
                    Ok(n) => n,
                    Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                    Err(err) => {
                        debug!("failed to read: {err}; bailing!");
                        break;
                    }
                };
                if tx.send(buf[..n].to_vec()).is_err() {
                    debug!("source dropped; bailing!");
                    break;
                }
            }
        })?;

    Ok(ChannelSource::new(rx))
}
