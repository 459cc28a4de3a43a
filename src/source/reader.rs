//! Blocking reader over the encoder's output pipe

use std::io::{self, Read};

use bytes::{Bytes, BytesMut};

/// Default read block size
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Reads fixed-size blocks from one generation's output pipe
///
/// Owned by exactly one pump thread, so reading never takes a shared lock.
pub struct SourceReader {
    generation: u64,
    pipe: Box<dyn Read + Send>,
    chunk_size: usize,
}

impl SourceReader {
    /// Wrap a readable pipe for the given generation
    pub fn new(generation: u64, pipe: impl Read + Send + 'static, chunk_size: usize) -> Self {
        Self {
            generation,
            pipe: Box::new(pipe),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Generation this reader belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Maximum number of bytes returned per chunk
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Read up to `chunk_size` bytes
    ///
    /// Blocks until data is available. Returns `Ok(None)` once the pipe
    /// reaches end-of-stream (the process exited or was killed).
    pub fn read_chunk(&mut self) -> io::Result<Option<Bytes>> {
        let mut buf = BytesMut::zeroed(self.chunk_size);
        loop {
            match self.pipe.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(Some(buf.freeze()));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl std::fmt::Debug for SourceReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceReader")
            .field("generation", &self.generation)
            .field("chunk_size", &self.chunk_size)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reads_in_chunk_size_blocks() {
        let data: Vec<u8> = (0..10).collect();
        let mut reader = SourceReader::new(1, Cursor::new(data), 4);

        assert_eq!(reader.read_chunk().unwrap().unwrap().as_ref(), &[0, 1, 2, 3]);
        assert_eq!(reader.read_chunk().unwrap().unwrap().as_ref(), &[4, 5, 6, 7]);
        // Short final block
        assert_eq!(reader.read_chunk().unwrap().unwrap().as_ref(), &[8, 9]);
        assert!(reader.read_chunk().unwrap().is_none());
    }

    #[test]
    fn test_empty_pipe_is_end_of_stream() {
        let mut reader = SourceReader::new(3, Cursor::new(Vec::new()), DEFAULT_CHUNK_SIZE);

        assert_eq!(reader.generation(), 3);
        assert!(reader.read_chunk().unwrap().is_none());
    }

    #[test]
    fn test_zero_chunk_size_clamped() {
        let reader = SourceReader::new(1, Cursor::new(Vec::new()), 0);
        assert_eq!(reader.chunk_size(), 1);
    }

    struct InterruptOnce {
        interrupted: bool,
    }

    impl Read for InterruptOnce {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::from(io::ErrorKind::Interrupted));
            }
            buf[0] = 7;
            Ok(1)
        }
    }

    #[test]
    fn test_retries_interrupted_reads() {
        let mut reader = SourceReader::new(1, InterruptOnce { interrupted: false }, 8);
        assert_eq!(reader.read_chunk().unwrap().unwrap().as_ref(), &[7]);
    }
}
