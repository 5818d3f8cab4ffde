use std::io::{self, Write};

use tracing::{debug, trace};

use super::{crc32, ChunkKind, RecordError, BLOCK_SIZE, HEADER_SIZE, MAX_RECORD_LEN};

/// A sink a [`Writer`] can flush whole blocks to.
///
/// The Record Log only ever needs two capabilities from its underlying
/// storage: an append-only block-sized write, and an explicit durability
/// sync. [`std::fs::File`] implements this directly.
pub trait BlockSink: io::Write {
    /// Flushes any OS-level buffering and makes prior writes durable.
    fn sync_block(&mut self) -> io::Result<()>;
}

impl BlockSink for std::fs::File {
    fn sync_block(&mut self) -> io::Result<()> {
        self.sync_all()
    }
}

/// Frames records into fixed [`BLOCK_SIZE`] blocks and writes them to an
/// underlying [`BlockSink`].
///
/// A `Writer` owns one in-memory block buffer and the underlying handle
/// exclusively; it is not safe to share a single instance across threads
/// (see the crate's concurrency model — each log is single-threaded
/// cooperative).
#[derive(Debug)]
pub struct Writer<W: BlockSink> {
    sink: W,
    buf: Box<[u8; BLOCK_SIZE]>,
    /// Write cursor within `buf`; bytes at or beyond this offset are stale
    /// leftovers from a previous record and are only meaningful once a
    /// `flush()` has written the whole block.
    j: usize,
}

impl<W: BlockSink> Writer<W> {
    /// Wraps `sink` in a fresh Record Log writer with an empty block buffer.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            buf: Box::new([0u8; BLOCK_SIZE]),
            j: 0,
        }
    }

    /// Encodes `record` as one or more chunks in the current block buffer,
    /// flushing as needed.
    ///
    /// Returns the number of bytes of `record` written (always
    /// `record.len()` on success). Fails with [`RecordError::TooMuchData`]
    /// if `record` exceeds [`MAX_RECORD_LEN`].
    pub fn write(&mut self, record: &[u8]) -> Result<usize, RecordError> {
        let len = record.len();
        if len > MAX_RECORD_LEN {
            return Err(RecordError::TooMuchData(len));
        }

        if self.j + HEADER_SIZE > BLOCK_SIZE {
            trace!(cursor = self.j, "record log block has no room for a header, flushing");
            self.flush()?;
        }

        let crc = crc32(record);

        if self.j + HEADER_SIZE + len <= BLOCK_SIZE {
            self.write_chunk(crc, len, ChunkKind::Full, record);
            self.j += HEADER_SIZE + len;
            trace!(len, kind = "full", "record log chunk written");
            return Ok(len);
        }

        let first_body = BLOCK_SIZE - self.j - HEADER_SIZE;
        self.write_chunk(crc, len, ChunkKind::First, &record[..first_body]);
        trace!(len = first_body, kind = "first", "record log chunk written");
        self.flush()?;

        let mut consumed = first_body;
        while len - consumed > BLOCK_SIZE - HEADER_SIZE {
            let body = BLOCK_SIZE - HEADER_SIZE;
            self.write_chunk(crc, len, ChunkKind::Mid, &record[consumed..consumed + body]);
            trace!(len = body, kind = "mid", "record log chunk written");
            consumed += body;
            self.flush()?;
        }

        let remaining = len - consumed;
        self.write_chunk(crc, len, ChunkKind::Last, &record[consumed..]);
        self.j = HEADER_SIZE + remaining;
        trace!(len = remaining, kind = "last", "record log chunk written");

        Ok(len)
    }

    /// Writes the current in-memory block to the underlying storage, syncs
    /// it, and resets the write cursor to 0.
    ///
    /// The full [`BLOCK_SIZE`] bytes are always written; bytes beyond the
    /// write cursor are stale leftovers from prior records and act as
    /// harmless padding. Fails with [`RecordError::WriteLoss`] if the
    /// underlying sink returns a short write.
    pub fn flush(&mut self) -> Result<(), RecordError> {
        let n = self.sink.write(self.buf.as_slice())?;
        if n != BLOCK_SIZE {
            return Err(RecordError::WriteLoss {
                wrote: n,
                expected: BLOCK_SIZE,
            });
        }
        self.sink.sync_block()?;
        self.j = 0;
        debug!(bytes = BLOCK_SIZE, "record log block flushed");
        Ok(())
    }

    /// Writes a chunk header at the current cursor and copies `body` after it.
    fn write_chunk(&mut self, crc: u32, total_len: usize, kind: ChunkKind, body: &[u8]) {
        let j = self.j;
        self.buf[j..j + 4].copy_from_slice(&crc.to_le_bytes());
        self.buf[j + 4..j + 6].copy_from_slice(&(total_len as u16).to_le_bytes());
        self.buf[j + 6] = kind as u8;
        self.buf[j + HEADER_SIZE..j + HEADER_SIZE + body.len()].copy_from_slice(body);
    }
}
