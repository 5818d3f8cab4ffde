use std::io::{Seek, SeekFrom, Write};

use tracing::{debug, trace};

use crate::memtable::OrderedTable;

use super::{SstError, BLOCK_SIZE};

/// Drains an [`OrderedTable`] in key order into a fixed-block Sorted Table
/// File.
///
/// Owns one 64 KiB working block and the underlying sink exclusively; see
/// the crate's concurrency model. `write` calls must supply keys in
/// strictly ascending order — the writer does not sort, since its only
/// caller ([`Writer::from_memtable`]) already drains an ordered source.
#[derive(Debug)]
pub struct Writer<W: Write + Seek> {
    sink: W,
    index: Vec<u64>,
    buf: Box<[u8; BLOCK_SIZE]>,
    /// Write cursor within the current working block.
    idx: usize,
    /// Total bytes already flushed to the underlying sink.
    written: u64,
}

impl<W: Write + Seek> Writer<W> {
    /// Seeks `sink` to its start and initializes an empty working block.
    pub fn new(mut sink: W) -> Result<Self, SstError> {
        sink.seek(SeekFrom::Start(0))?;
        Ok(Self {
            sink,
            index: Vec::new(),
            buf: Box::new([0u8; BLOCK_SIZE]),
            idx: 0,
            written: 0,
        })
    }

    /// Appends one `(key, value)` pair, flushing the current block first if
    /// the pair would not fit.
    pub fn write(&mut self, key: &[u8], value: &[u8]) -> Result<(), SstError> {
        if self.idx + key.len() + value.len() >= BLOCK_SIZE {
            self.flush()?;
        }

        self.index.push(self.written + self.idx as u64);

        let idx = self.idx;
        self.buf[idx..idx + 4].copy_from_slice(&(key.len() as u32).to_le_bytes());
        self.idx += 4;
        let idx = self.idx;
        self.buf[idx..idx + key.len()].copy_from_slice(key);
        self.idx += key.len();
        let idx = self.idx;
        self.buf[idx..idx + 4].copy_from_slice(&(value.len() as u32).to_le_bytes());
        self.idx += 4;
        let idx = self.idx;
        self.buf[idx..idx + value.len()].copy_from_slice(value);
        self.idx += value.len();

        trace!(key_len = key.len(), value_len = value.len(), "sorted table file pair written");
        Ok(())
    }

    /// Writes the current working block (always exactly [`BLOCK_SIZE`]
    /// bytes, trailing bytes past the cursor unspecified padding), advances
    /// the byte counter, and resets the cursor to 0.
    fn flush(&mut self) -> Result<(), SstError> {
        self.sink.write_all(self.buf.as_slice())?;
        self.written += BLOCK_SIZE as u64;
        self.idx = 0;
        debug!(bytes = BLOCK_SIZE, "sorted table file block flushed");
        Ok(())
    }

    /// Finalizes the file: writes the trailing index and its 8-byte length
    /// suffix into the last block, flushing first if they would not fit in
    /// the current one.
    pub fn done(mut self) -> Result<(), SstError> {
        let n = self.index.len();
        let trailer_len = 8 * n + 8;

        if self.idx + trailer_len >= BLOCK_SIZE {
            self.flush()?;
        }

        self.idx = BLOCK_SIZE - trailer_len;
        for offset in &self.index {
            let idx = self.idx;
            self.buf[idx..idx + 8].copy_from_slice(&offset.to_le_bytes());
            self.idx += 8;
        }
        self.buf[BLOCK_SIZE - 8..].copy_from_slice(&(trailer_len as u64).to_le_bytes());

        self.sink.write_all(self.buf.as_slice())?;
        debug!(entries = n, trailer_len, "sorted table file finalized");
        Ok(())
    }

    /// Drains `table` in key-ascending order into a fresh Sorted Table
    /// File over `sink`, then finalizes it.
    pub fn from_memtable(sink: W, table: &OrderedTable) -> Result<(), SstError> {
        let mut writer = Writer::new(sink)?;
        let mut node = table.next(table.first());
        while node != table.end() {
            writer.write(table.key(node), table.value(node))?;
            node = table.next(node);
        }
        writer.done()
    }
}
