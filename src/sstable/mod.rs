//! Sorted Table File
//!
//! An immutable, disk-backed, sorted (key, value) file — the on-disk
//! counterpart of an [`crate::memtable::OrderedTable`]. A writer drains a
//! table in key order into fixed 64 KiB blocks; a reader serves point
//! lookups against the resulting file via a single-block cache and binary
//! search over a trailing offset index.
//!
//! ## Design overview
//!
//! Data blocks hold back-to-back length-prefixed `(key, value)` pairs, none
//! straddling a block boundary. The final block holds a **trailer**: every
//! pair's absolute file offset, packed ascending by emission order (which,
//! because pairs are emitted in key order, is also key order), followed by
//! an 8-byte trailer length. A reader parses the trailer once on open and
//! thereafter serves `find(key)` by binary search over it.
//!
//! # On-disk layout
//!
//! ```text
//! [BLOCK 0: 65536 bytes] [KeyLen32, Key, ValLen32, Val] [KeyLen32, Key, ValLen32, Val] ...
//! [BLOCK 1: 65536 bytes] ...
//! ...
//! [FINAL BLOCK: 65536 bytes]
//!   ... remaining data pairs ...
//!   [Offset64, Offset64, ..., Offset64][TrailerLength64]
//! ```
//!
//! # Guarantees
//!
//! - **Immutability:** once `done()` finalizes a file, it is only ever
//!   opened read-only.
//! - **Block alignment:** file size is always a positive multiple of
//!   [`BLOCK_SIZE`]; the final 8 bytes equal the trailer length.
//! - **Key order:** the trailing index is strictly ascending by both
//!   offset and stored key, which is what the reader's binary search
//!   relies on.

pub mod reader;
pub mod writer;

#[cfg(test)]
mod tests;

pub use reader::{Iterator as SstIterator, RandomRead, Reader};
pub use writer::Writer;

use std::io;
use thiserror::Error;

/// Size of one Sorted Table File block, in bytes.
pub const BLOCK_SIZE: usize = 64 * 1024;

/// Errors returned by Sorted Table File operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SstError {
    /// The file is smaller than its own declared trailer, or the trailer
    /// length is not a valid multiple of 8 plus the 8-byte length field.
    #[error("corrupt sorted table file: {0}")]
    CorruptSst(String),

    /// Underlying storage I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
