//! Binary key-batch reader.
//!
//! Keys arrive as a stream of fixed-width big-endian unsigned integers; the
//! width (1, 2, 4 or 8 bytes) is a caller parameter. The stream is consumed
//! in 4096-byte blocks; a partial trailing block is consumed down to the
//! nearest key-sized chunk and residue bytes are discarded.
//!
//! Batch assembly drops duplicate keys (first occurrence wins) and sorts
//! ascending, which is exactly the precondition of the bulk drivers.
//! Duplicate counts are reported at trace level; they are not an error.

use std::collections::HashSet;
use std::io::{ErrorKind, Read};

use crate::error::{TreeError, TreeResult};
use crate::key::{read_word, KeyValue, Word, STREAM_WIDTHS};
use crate::tracing_helpers::trace_log;

/// Stream read granularity in bytes.
pub const BLOCK_SIZE: usize = 4096;

/// Reader of fixed-width big-endian key streams.
#[derive(Clone, Copy, Debug)]
pub struct KeyBinaryFactory {
    key_size: usize,
}

impl KeyBinaryFactory {
    /// Create a factory for keys of `key_size` bytes.
    ///
    /// # Errors
    /// [`TreeError::InvariantViolated`] when the width is not 1, 2, 4 or 8.
    pub fn new(key_size: usize) -> TreeResult<Self> {
        if !STREAM_WIDTHS.contains(&key_size) {
            return Err(TreeError::InvariantViolated(format!(
                "unsupported key width {key_size}, expected one of 1, 2, 4, 8"
            )));
        }
        Ok(Self { key_size })
    }

    /// The configured key width in bytes.
    #[inline]
    #[must_use]
    pub const fn key_size(&self) -> usize {
        self.key_size
    }

    /// Read a deduplicated, sorted upsert batch; each value equals its key.
    ///
    /// # Errors
    /// [`TreeError::Io`] when the underlying read fails.
    pub fn unique_key_values<R: Read>(&self, reader: &mut R) -> TreeResult<Vec<KeyValue>> {
        let keys: Vec<Word> = self.read_unique_keys(reader)?;
        Ok(keys.into_iter().map(|k| KeyValue::new(k, k)).collect())
    }

    /// Read a deduplicated, sorted key batch.
    ///
    /// # Errors
    /// [`TreeError::Io`] when the underlying read fails.
    pub fn unique_keys<R: Read>(&self, reader: &mut R) -> TreeResult<Vec<Word>> {
        self.read_unique_keys(reader)
    }

    fn read_unique_keys<R: Read>(&self, reader: &mut R) -> TreeResult<Vec<Word>> {
        let mut seen: HashSet<Word> = HashSet::new();
        let mut keys: Vec<Word> = Vec::new();
        let mut duplicated: u64 = 0;
        let mut buffer: [u8; BLOCK_SIZE] = [0u8; BLOCK_SIZE];

        loop {
            let bytes_read: usize = read_block(reader, &mut buffer)?;
            if bytes_read == 0 {
                break;
            }

            let key_bytes: usize = self.key_size * (bytes_read / self.key_size);
            for chunk in buffer[..key_bytes].chunks_exact(self.key_size) {
                let key: Word = read_word(chunk, self.key_size);
                if seen.insert(key) {
                    keys.push(key);
                } else {
                    duplicated += 1;
                }
            }

            if bytes_read < BLOCK_SIZE {
                break;
            }
        }

        trace_log!(duplicated, "duplicate keys dropped from batch");
        keys.sort_unstable();
        Ok(keys)
    }
}

/// Fill `buf` from the reader, short only at end of stream.
fn read_block<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled: usize = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
