use std::io;

use tracing::{debug, trace};

use super::{SstError, BLOCK_SIZE};

/// Random-access byte source a [`Reader`] consults.
///
/// The Sorted Table File only ever needs two capabilities from its
/// underlying storage: reading at an absolute offset, and reporting total
/// file size. [`std::fs::File`] implements this directly via `read_at` on
/// unix (see the inherent impl below for the portable fallback).
pub trait RandomRead {
    /// Fills `dst` from the underlying source starting at `offset`,
    /// returning the number of bytes actually read (short only at EOF).
    fn read_at(&self, dst: &mut [u8], offset: u64) -> io::Result<usize>;

    /// Total size of the underlying source, in bytes.
    fn len(&self) -> io::Result<u64>;
}

impl RandomRead for std::fs::File {
    #[cfg(unix)]
    fn read_at(&self, dst: &mut [u8], offset: u64) -> io::Result<usize> {
        std::os::unix::fs::FileExt::read_at(self, dst, offset)
    }

    #[cfg(not(unix))]
    fn read_at(&self, dst: &mut [u8], offset: u64) -> io::Result<usize> {
        use std::io::{Read, Seek, SeekFrom};
        let mut file = self.try_clone()?;
        file.seek(SeekFrom::Start(offset))?;
        file.read(dst)
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}

/// Reads a Sorted Table File written by [`super::Writer`]: parses the
/// trailing offset index once on open, then serves point lookups via
/// binary search plus a single-block read-through cache.
///
/// Owns its underlying source exclusively; multiple independent readers
/// over distinct files may proceed in parallel (see the crate's
/// concurrency model), since a reader never mutates the file.
#[derive(Debug)]
pub struct Reader<R: RandomRead> {
    source: R,
    file_size: u64,
    /// Absolute offset of every stored pair, ascending by both offset and
    /// stored key (see [`super::writer::Writer`]).
    index: Vec<u64>,
    /// Single-slot block cache: `[cache_start, cache_start + cache_len)`.
    cache: Box<[u8; BLOCK_SIZE]>,
    cache_start: u64,
    cache_len: usize,
}

impl<R: RandomRead> Reader<R> {
    /// Opens `source`, reading and caching its trailer.
    ///
    /// Fails with [`SstError::CorruptSst`] if the file is smaller than its
    /// own declared trailer length, or that length is not of the shape
    /// `8*N + 8`.
    pub fn new(source: R) -> Result<Self, SstError> {
        let file_size = source.len()?;

        if file_size < 8 || file_size % BLOCK_SIZE as u64 != 0 {
            return Err(SstError::CorruptSst(format!(
                "file size {file_size} is not a positive multiple of {BLOCK_SIZE}"
            )));
        }

        let mut len_buf = [0u8; 8];
        source.read_at(&mut len_buf, file_size - 8)?;
        let trailer_len = u64::from_le_bytes(len_buf);

        if trailer_len < 8 || (trailer_len - 8) % 8 != 0 || trailer_len > file_size {
            return Err(SstError::CorruptSst(format!(
                "declared trailer length {trailer_len} is invalid for a {file_size}-byte file"
            )));
        }

        let n = ((trailer_len - 8) / 8) as usize;
        let mut index = Vec::with_capacity(n);
        let mut offsets_buf = vec![0u8; n * 8];
        source.read_at(&mut offsets_buf, file_size - trailer_len)?;
        for chunk in offsets_buf.chunks_exact(8) {
            index.push(u64::from_le_bytes(chunk.try_into().unwrap()));
        }

        debug!(entries = n, file_size, "sorted table file trailer parsed");

        Ok(Self {
            source,
            file_size,
            index,
            cache: Box::new([0u8; BLOCK_SIZE]),
            cache_start: 0,
            cache_len: 0,
        })
    }

    /// Reads `dst.len()` bytes starting at `offset`, served from the
    /// single-block cache where possible.
    ///
    /// When `[offset, offset+dst.len())` is fully contained in the cached
    /// region this is a pure copy; when only a prefix overlaps, that prefix
    /// is copied and the remainder is satisfied by a recursive call after a
    /// refill. A miss refills the cache from the nearest lower block
    /// boundary.
    fn read_at(&mut self, dst: &mut [u8], offset: u64) -> Result<(), SstError> {
        if dst.is_empty() {
            return Ok(());
        }

        let cache_end = self.cache_start + self.cache_len as u64;
        if offset >= self.cache_start && offset < cache_end {
            let avail = (cache_end - offset) as usize;
            let take = avail.min(dst.len());
            let cache_off = (offset - self.cache_start) as usize;
            dst[..take].copy_from_slice(&self.cache[cache_off..cache_off + take]);
            if take == dst.len() {
                return Ok(());
            }
            return self.read_at(&mut dst[take..], offset + take as u64);
        }

        let block_start = (offset / BLOCK_SIZE as u64) * BLOCK_SIZE as u64;
        let want = (self.file_size - block_start).min(BLOCK_SIZE as u64) as usize;
        let n = self.source.read_at(&mut self.cache[..want], block_start)?;
        self.cache_start = block_start;
        self.cache_len = n;
        trace!(block_start, bytes = n, "sorted table file block cache refilled");

        self.read_at(dst, offset)
    }

    /// Decodes the `(key, value)` pair stored at absolute offset `offset`,
    /// returning it plus the offset of the byte following it.
    fn decode_pair_at(&mut self, offset: u64) -> Result<((Vec<u8>, Vec<u8>), u64), SstError> {
        let mut len_buf = [0u8; 4];
        self.read_at(&mut len_buf, offset)?;
        let key_len = u32::from_le_bytes(len_buf) as usize;

        let mut key = vec![0u8; key_len];
        self.read_at(&mut key, offset + 4)?;

        let mut vlen_buf = [0u8; 4];
        self.read_at(&mut vlen_buf, offset + 4 + key_len as u64)?;
        let value_len = u32::from_le_bytes(vlen_buf) as usize;

        let mut value = vec![0u8; value_len];
        self.read_at(&mut value, offset + 4 + key_len as u64 + 4)?;

        let next = offset + 4 + key_len as u64 + 4 + value_len as u64;
        Ok(((key, value), next))
    }

    /// Locates the smallest stored key greater than or equal to `key`,
    /// returning an iterator positioned there.
    ///
    /// Binary searches the trailing index, which is strictly ascending by
    /// both offset and stored key. The iterator's first `next()` call
    /// decodes this pair; if no stored key is `>= key`, the iterator is
    /// immediately exhausted.
    pub fn find(&mut self, key: &[u8]) -> Result<Iterator<'_, R>, SstError> {
        let n = self.index.len();
        let mut lo = 0usize;
        let mut hi = n;

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let (pair, _) = self.decode_pair_at(self.index[mid])?;
            if pair.0.as_slice() < key {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        Ok(Iterator {
            reader: self,
            pos: lo,
            current: None,
            last_error: None,
        })
    }
}

/// Walks stored pairs forward from a [`Reader::find`] anchor point.
#[derive(Debug)]
pub struct Iterator<'a, R: RandomRead> {
    reader: &'a mut Reader<R>,
    /// Index into `reader.index` of the next pair `next()` will decode.
    pos: usize,
    /// The pair most recently decoded by `next()`, if any.
    current: Option<(Vec<u8>, Vec<u8>)>,
    last_error: Option<SstError>,
}

impl<'a, R: RandomRead> Iterator<'a, R> {
    /// Advances to the next stored pair, decoding it.
    ///
    /// Returns `false` once the index is exhausted. On a decode error,
    /// returns `false` and records the error for [`Iterator::error`].
    pub fn next(&mut self) -> bool {
        if self.pos >= self.reader.index.len() {
            return false;
        }

        let offset = self.reader.index[self.pos];
        match self.reader.decode_pair_at(offset) {
            Ok((pair, _)) => {
                self.current = Some(pair);
                self.pos += 1;
                true
            }
            Err(e) => {
                self.last_error = Some(e);
                self.current = None;
                false
            }
        }
    }

    /// The current pair's key. Panics if `next()` has not yet returned
    /// `true`.
    pub fn key(&self) -> &[u8] {
        self.current.as_ref().expect("next() was not called or returned false").0.as_slice()
    }

    /// The current pair's value. Panics if `next()` has not yet returned
    /// `true`.
    pub fn value(&self) -> &[u8] {
        self.current.as_ref().expect("next() was not called or returned false").1.as_slice()
    }

    /// The error that caused the last `next()` to return `false`, if any.
    pub fn error(&self) -> Option<&SstError> {
        self.last_error.as_ref()
    }
}
