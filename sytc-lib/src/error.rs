use std::fmt;

/// The fixed-size part of a frame a read was filling when it came back short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Header,
    Bodies,
    Footer,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Header => write!(f, "header"),
            Section::Bodies => write!(f, "bodies"),
            Section::Footer => write!(f, "footer"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// No sync marker was located before the deadline.
    #[error("sync marker not found before deadline")]
    Timeout,

    /// A fixed-size read came back short.
    #[error("truncated {section}: got {actual} of {expected} bytes")]
    Truncated {
        section: Section,
        /// Number of bytes we got
        actual: usize,
        /// Number of bytes the section requires
        expected: usize,
    },

    /// A field value outside the range the protocol allows.
    #[error("malformed {field}={value} (target {index:?})")]
    Malformed {
        /// Field name as it appears on the decoded type.
        field: &'static str,
        /// Raw wire value.
        value: u8,
        /// Index of the target record, or `None` for header fields.
        index: Option<usize>,
    },

    /// Terminator bytes were not `0xEE 0xEE`. Only produced when the decoder is configured
    /// to reject such frames.
    #[error("bad terminator {terminator:02x?}")]
    ChecksumMismatch { terminator: [u8; 2] },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
