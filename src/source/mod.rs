//! Encoder process ownership
//!
//! The source is the single producer of the relay: one external encoder
//! process whose stdout carries the encoded audio. Starting the source yields
//! a [`SourceReader`] that is moved onto the pump thread; the process handle
//! itself stays behind in [`SourceProcess`] so `stop()` can kill it while the
//! pump is blocked in a read.

pub mod config;
pub mod process;
pub mod reader;

pub use config::EncoderConfig;
pub use process::{SourceProcess, SourceState};
pub use reader::{SourceReader, DEFAULT_CHUNK_SIZE};
