//! Pump loop
//!
//! One dedicated OS thread per generation performs the blocking reads from
//! the encoder pipe and hands each chunk to the hub. The thread is the only
//! reader of the pipe and the only writer into subscriber buffers.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::source::SourceReader;

use super::store::BroadcastHub;

/// Why a pump loop stopped
#[derive(Debug)]
pub enum PumpExit {
    /// The pipe reached end-of-stream
    EndOfStream,
    /// The hub moved on from this generation (explicit stop)
    Superseded,
    /// Reading the pipe failed
    ReadError(io::Error),
}

/// Summary handed to the completion callback
#[derive(Debug)]
pub struct PumpSummary {
    pub generation: u64,
    pub chunks: u64,
    pub bytes: u64,
    pub exit: PumpExit,
}

/// Spawn the pump thread for the reader's generation
///
/// When the loop ends, every subscriber of the generation receives its
/// end-of-stream marker and the set is cleared before `on_exit` runs.
pub fn spawn_pump<F>(
    hub: Arc<BroadcastHub>,
    reader: SourceReader,
    on_exit: F,
) -> io::Result<JoinHandle<()>>
where
    F: FnOnce(PumpSummary) + Send + 'static,
{
    let generation = reader.generation();

    thread::Builder::new()
        .name(format!("relay-pump-{generation}"))
        .spawn(move || {
            let summary = run_pump(&hub, reader);
            hub.close_generation(generation);

            tracing::debug!(
                generation = summary.generation,
                chunks = summary.chunks,
                bytes = summary.bytes,
                exit = ?summary.exit,
                "Pump loop finished"
            );

            on_exit(summary);
        })
}

fn run_pump(hub: &BroadcastHub, mut reader: SourceReader) -> PumpSummary {
    let generation = reader.generation();
    let mut chunks = 0u64;
    let mut bytes = 0u64;

    let exit = loop {
        match reader.read_chunk() {
            Ok(Some(chunk)) => {
                let Some(queued) = hub.broadcast(generation, &chunk) else {
                    break PumpExit::Superseded;
                };
                chunks += 1;
                bytes += chunk.len() as u64;
                tracing::trace!(
                    generation = generation,
                    size = chunk.len(),
                    subscribers = queued,
                    "Chunk pumped"
                );
            }
            Ok(None) => break PumpExit::EndOfStream,
            Err(e) => {
                tracing::warn!(generation = generation, error = %e, "Encoder pipe read failed");
                break PumpExit::ReadError(e);
            }
        }
    };

    PumpSummary {
        generation,
        chunks,
        bytes,
        exit,
    }
}
