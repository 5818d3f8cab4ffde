//! Blocked Record Log
//!
//! A write-ahead-log-style container that frames arbitrary byte records into
//! fixed-size blocks, with per-record CRC-32 validation and fragmentation
//! across block boundaries for records too large to fit in one block.
//!
//! ## Design overview
//!
//! Records are opaque byte slices of any content; the log does not
//! interpret them. Each record is split into one or more **chunks**, each
//! prefixed with a 7-byte header, and chunks are packed back-to-back into
//! fixed [`BLOCK_SIZE`]-byte blocks. A record that does not fit in the
//! remainder of the current block is fragmented into `FIRST`, optionally one
//! `MID`, and a final `LAST` chunk.
//!
//! # On-disk layout
//!
//! ```text
//! [BLOCK 0: 32768 bytes]
//!   [CHUNK_CRC32_LE(4)][CHUNK_LEN_LE(2)][CHUNK_KIND(1)][CHUNK_BODY(..)]
//!   [CHUNK_CRC32_LE(4)][CHUNK_LEN_LE(2)][CHUNK_KIND(1)][CHUNK_BODY(..)]
//!   ...
//!   [padding, if fewer than 7 bytes remain before the block boundary]
//! [BLOCK 1: 32768 bytes]
//!   ...
//! ```
//!
//! - **Chunk header** — CRC-32/IEEE of the full logical record (not the
//!   fragment), the record's total length, and a chunk kind tag
//!   (`FULL`/`FIRST`/`MID`/`LAST`). Both fields are identical across every
//!   chunk belonging to the same record.
//! - **Chunk body** — zero or more bytes of record payload; a `MID` chunk's
//!   body always fills the rest of its block.
//!
//! # Guarantees
//!
//! - **Block alignment:** every write to the underlying storage is exactly
//!   [`BLOCK_SIZE`] bytes.
//! - **Integrity:** a record's CRC-32 is validated against the reassembled
//!   payload on read.
//! - **Ordering:** records appear on disk in the order [`Writer::write`] was
//!   called, durable as of the latest [`Writer::flush`].
//! - **No global state:** a [`Writer`] or [`Reader`] owns its buffer and the
//!   underlying handle exclusively; nothing is shared across instances.

#[cfg(test)]
mod tests;

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;

use std::io;
use thiserror::Error;

/// Size of one Record Log block, in bytes.
pub const BLOCK_SIZE: usize = 32 * 1024;

/// Size of a chunk header, in bytes: 4-byte CRC32 + 2-byte length + 1-byte kind.
pub const HEADER_SIZE: usize = 7;

/// Largest record length the framing can express: it must fit in a
/// `FIRST` + `LAST` pair of chunks (no more than one `MID`).
pub const MAX_RECORD_LEN: usize = 2 * BLOCK_SIZE - 2 * HEADER_SIZE;

/// A chunk's role in reconstructing its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum ChunkKind {
    /// The entire record fits in this one chunk.
    Full = 1,
    /// The first fragment of a record split across 2 or 3 chunks.
    First = 2,
    /// A middle fragment; only present when a record spans 3 chunks.
    Mid = 3,
    /// The final fragment of a split record.
    Last = 4,
}

impl ChunkKind {
    fn from_u8(b: u8) -> Option<Self> {
        match b {
            1 => Some(ChunkKind::Full),
            2 => Some(ChunkKind::First),
            3 => Some(ChunkKind::Mid),
            4 => Some(ChunkKind::Last),
            _ => None,
        }
    }
}

/// Errors returned by Record Log operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RecordError {
    /// The record exceeds [`MAX_RECORD_LEN`] and cannot be framed.
    #[error("record of {0} bytes exceeds the maximum framable length of {MAX_RECORD_LEN} bytes")]
    TooMuchData(usize),

    /// A block-sized write to the underlying storage came up short.
    #[error("short write to record log storage: wrote {wrote} of {expected} bytes")]
    WriteLoss {
        /// Bytes actually written.
        wrote: usize,
        /// Bytes that were supposed to be written (always [`BLOCK_SIZE`]).
        expected: usize,
    },

    /// The chunk kind sequence violates the `FULL | (FIRST, [MID,] LAST)`
    /// grammar, or a chunk's declared body does not fit the block.
    #[error("invalid chunk framing: {0}")]
    BadFraming(String),

    /// The CRC-32 of the reassembled record does not match the header.
    #[error("checksum mismatch: header declared {declared:#010x}, computed {computed:#010x}")]
    BadChecksum {
        /// Checksum recorded in the chunk header.
        declared: u32,
        /// Checksum computed over the reassembled record.
        computed: u32,
    },

    /// The concatenated chunk bodies disagree with the header's declared length.
    #[error("short read: header declared {expected} payload bytes, reassembled {got}")]
    ShortRead {
        /// Length declared in the chunk header.
        expected: usize,
        /// Length actually reassembled from chunk bodies.
        got: usize,
    },

    /// Underlying storage I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn crc32(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}
