use std::io::Read;
use std::ops::Range;

use tracing::{debug, trace, warn};

use super::{crc32, ChunkKind, RecordError, BLOCK_SIZE, HEADER_SIZE};

/// Reassembles records previously framed by [`super::Writer`] from an
/// underlying byte stream.
///
/// Keeps a single [`BLOCK_SIZE`] buffer, refilled one block at a time from
/// the underlying source. A `Reader` owns its buffer and source
/// exclusively — see the crate's concurrency model.
#[derive(Debug)]
pub struct Reader<R: Read> {
    source: R,
    buf: Box<[u8; BLOCK_SIZE]>,
    /// Bytes currently valid in `buf` (less than [`BLOCK_SIZE`] only at the
    /// tail of the stream).
    n: usize,
    /// Read cursor: offset of the next chunk header within `buf`.
    j: usize,
}

impl<R: Read> Reader<R> {
    /// Wraps `source` in a fresh Record Log reader with an empty buffer.
    pub fn new(source: R) -> Self {
        Self {
            source,
            buf: Box::new([0u8; BLOCK_SIZE]),
            n: 0,
            j: 0,
        }
    }

    fn refill(&mut self) -> Result<(), RecordError> {
        let n = self.source.read(self.buf.as_mut_slice())?;
        self.n = n;
        self.j = 0;
        trace!(bytes = n, "record log block (re)filled");
        Ok(())
    }

    /// Reads the next chunk header at the cursor and returns its declared
    /// checksum, total record length, kind, and the buffer range holding
    /// this chunk's body.
    ///
    /// `consumed` is the number of body bytes already reassembled for the
    /// record in progress (0 at the start of a record); the body length for
    /// this chunk is `min(total_len - consumed, BLOCK_SIZE - body_start)`,
    /// since the header's length field is always the *total* record length,
    /// not this chunk's fragment length.
    ///
    /// Returns `Ok(None)` on a clean end-of-stream (no header pending and
    /// the underlying source is exhausted).
    fn next_chunk(
        &mut self,
        consumed: usize,
    ) -> Result<Option<(u32, usize, ChunkKind, Range<usize>)>, RecordError> {
        if self.j + HEADER_SIZE > self.n {
            self.refill()?;
            if self.n == 0 {
                return Ok(None);
            }
            if self.j + HEADER_SIZE > self.n {
                return Err(RecordError::BadFraming(format!(
                    "chunk header at offset {} does not fit in the final {}-byte block",
                    self.j, self.n
                )));
            }
        }

        let crc = u32::from_le_bytes(self.buf[self.j..self.j + 4].try_into().unwrap());
        let total_len =
            u16::from_le_bytes(self.buf[self.j + 4..self.j + 6].try_into().unwrap()) as usize;
        let kind_byte = self.buf[self.j + 6];
        let kind = ChunkKind::from_u8(kind_byte).ok_or_else(|| {
            RecordError::BadFraming(format!("unknown chunk kind byte {kind_byte}"))
        })?;

        let body_start = self.j + HEADER_SIZE;
        let remaining_for_record = total_len.saturating_sub(consumed);
        let body_len_wanted = remaining_for_record.min(BLOCK_SIZE - body_start);
        let available = self.n.saturating_sub(body_start);

        if body_len_wanted > available {
            return Err(RecordError::ShortRead {
                expected: remaining_for_record,
                got: available,
            });
        }

        self.j = body_start + body_len_wanted;
        Ok(Some((crc, total_len, kind, body_start..body_start + body_len_wanted)))
    }

    /// Reads and validates the next complete record.
    ///
    /// Returns `Ok(None)` once the underlying source is cleanly exhausted
    /// between records.
    pub fn read_record(&mut self) -> Result<Option<Vec<u8>>, RecordError> {
        let (crc, total_len, kind, range) = match self.next_chunk(0)? {
            None => return Ok(None),
            Some(header) => header,
        };

        let mut data = Vec::with_capacity(total_len);
        data.extend_from_slice(&self.buf[range.clone()]);

        match kind {
            ChunkKind::Full => {
                if range.len() != total_len {
                    return Err(RecordError::BadFraming(format!(
                        "chunk declared FULL for a {total_len}-byte record but only {} body bytes preceded the block boundary",
                        range.len()
                    )));
                }
            }
            ChunkKind::First => {
                if range.len() >= total_len {
                    return Err(RecordError::BadFraming(
                        "record did not need splitting but a FIRST chunk was written".into(),
                    ));
                }
                loop {
                    let (_, _, next_kind, next_range) = self
                        .next_chunk(data.len())?
                        .ok_or_else(|| {
                            RecordError::BadFraming("stream ended mid-record after FIRST".into())
                        })?;
                    data.extend_from_slice(&self.buf[next_range.clone()]);
                    match next_kind {
                        ChunkKind::Mid => {
                            if data.len() >= total_len {
                                return Err(RecordError::BadFraming(
                                    "record did not need another fragment but a MID chunk was written".into(),
                                ));
                            }
                        }
                        ChunkKind::Last => break,
                        other => {
                            return Err(RecordError::BadFraming(format!(
                                "expected MID or LAST after FIRST, got {other:?}"
                            )));
                        }
                    }
                }
            }
            other => {
                return Err(RecordError::BadFraming(format!(
                    "a record must start with FULL or FIRST, got {other:?}"
                )));
            }
        }

        if data.len() != total_len {
            return Err(RecordError::ShortRead {
                expected: total_len,
                got: data.len(),
            });
        }

        let computed = crc32(&data);
        if computed != crc {
            return Err(RecordError::BadChecksum {
                declared: crc,
                computed,
            });
        }

        debug!(len = total_len, "record log record reassembled");
        Ok(Some(data))
    }

    /// Seeks forward to the next plausible chunk header after a corrupt
    /// block.
    ///
    /// This is a documented no-op today; the on-disk format gives no
    /// self-synchronizing marker to resume from mid-block, so recovery
    /// beyond "stop at the failing point" is left as a future extension.
    pub fn recover(&mut self) -> Result<(), RecordError> {
        warn!("record log recover() called; this is currently a no-op");
        Ok(())
    }
}
