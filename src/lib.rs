//! # kvcore
//!
//! On-disk persistence primitives for an LSM-style key/value engine: a
//! blocked, CRC-checked write-ahead log; an in-memory ordered skip list;
//! and an immutable, index-trailed sorted table file.
//!
//! ## Architecture
//!
//! ```text
//! writer ──► record::Writer ──► blocked log file
//!                                     │
//!                                     ▼ (replay)
//!                            memtable::OrderedTable
//!                                     │
//!                                     ▼ sstable::Writer::from_memtable
//!                             sstable file (blocks + index)
//!                                     │
//!                                     ▼ sstable::Reader::find
//!                              point lookup by key
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`record`] | Blocked, CRC-32 checked write-ahead log with chunk fragmentation |
//! | [`memtable`] | 8-level probabilistic skip list over byte-string keys |
//! | [`sstable`] | Immutable, block-packed sorted table file with a trailing offset index |
//!
//! These three components are leaves: compaction, crash recovery beyond
//! corrupt-block detection, MVCC/versioning, and a top-level database
//! façade are out of scope here and are left to a caller composing these
//! primitives.
//!
//! ## Quick start
//!
//! ```rust
//! use kvcore::memtable::OrderedTable;
//! use kvcore::sstable::{Reader, Writer};
//! use std::fs::File;
//! use tempfile::TempDir;
//!
//! let mut table = OrderedTable::new();
//! table.set(b"a", b"1").unwrap();
//! table.set(b"b", b"2").unwrap();
//!
//! let dir = TempDir::new().unwrap();
//! let path = dir.path().join("example.sst");
//! Writer::from_memtable(File::create(&path).unwrap(), &table).unwrap();
//!
//! let mut reader = Reader::new(File::open(&path).unwrap()).unwrap();
//! let mut it = reader.find(b"b").unwrap();
//! assert!(it.next());
//! assert_eq!(it.value(), b"2");
//! ```

#![allow(dead_code)]

pub mod memtable;
pub mod record;
pub mod sstable;
