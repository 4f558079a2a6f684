#![doc = include_str!("../README.md")]

mod decoder;
mod error;
mod frame;
mod reader;
mod source;
mod summary;
mod synchronizer;

pub use decoder::{decode_frame, decode_frames, FrameDecoder, FrameIter, TerminatorPolicy};
pub use error::{Error, Result, Section};
pub use frame::{decode_bodies, Footer, Frame, Header, TargetRecord};
pub use reader::ExactReader;
pub use source::{spawn_reader, ByteSource, ChannelSource, ReaderSource};
pub use summary::{Failures, Summary};
pub use synchronizer::{Synchronizer, MARKER};
