use crate::memtable::OrderedTable;
use crate::sstable::{Reader, Writer};
use std::fs::File;
use tempfile::TempDir;

fn build_file(tmp: &TempDir, name: &str, table: &OrderedTable) -> File {
    let path = tmp.path().join(name);
    let sink = File::create(&path).unwrap();
    Writer::from_memtable(sink, table).unwrap();
    File::open(&path).unwrap()
}

#[test]
fn test_s5_sst_round_trip() {
    let mut table = OrderedTable::new();
    table.set(b"a", &[1]).unwrap();
    table.set(b"b", &[2]).unwrap();
    table.set(b"c", &[3]).unwrap();

    let tmp = TempDir::new().unwrap();
    let file = build_file(&tmp, "s5.sst", &table);

    let mut reader = Reader::new(file).unwrap();
    let mut it = reader.find(b"b").unwrap();

    assert!(it.next());
    assert_eq!(it.key(), b"b");
    assert_eq!(it.value(), &[2]);

    assert!(it.next());
    assert_eq!(it.key(), b"c");
    assert_eq!(it.value(), &[3]);

    assert!(!it.next());
}

#[test]
fn test_find_missing_key_lands_on_successor() {
    let mut table = OrderedTable::new();
    table.set(b"b", b"2").unwrap();
    table.set(b"d", b"4").unwrap();

    let tmp = TempDir::new().unwrap();
    let file = build_file(&tmp, "succ.sst", &table);

    let mut reader = Reader::new(file).unwrap();
    let mut it = reader.find(b"c").unwrap();
    assert!(it.next());
    assert_eq!(it.key(), b"d");
}

#[test]
fn test_find_past_last_key_is_exhausted() {
    let mut table = OrderedTable::new();
    table.set(b"a", b"1").unwrap();

    let tmp = TempDir::new().unwrap();
    let file = build_file(&tmp, "past.sst", &table);

    let mut reader = Reader::new(file).unwrap();
    let mut it = reader.find(b"z").unwrap();
    assert!(!it.next());
}

#[test]
fn test_empty_value_round_trips() {
    let mut table = OrderedTable::new();
    table.set(b"key", b"").unwrap();

    let tmp = TempDir::new().unwrap();
    let file = build_file(&tmp, "emptyval.sst", &table);

    let mut reader = Reader::new(file).unwrap();
    let mut it = reader.find(b"key").unwrap();
    assert!(it.next());
    assert_eq!(it.key(), b"key");
    assert_eq!(it.value(), b"");
}

#[test]
fn test_file_size_is_multiple_of_block_size() {
    let mut table = OrderedTable::new();
    for i in 0..5_000u32 {
        table.set(format!("key-{i:06}").as_bytes(), &[0xAB; 128]).unwrap();
    }

    let tmp = TempDir::new().unwrap();
    let file = build_file(&tmp, "big.sst", &table);

    let size = file.metadata().unwrap().len();
    assert_eq!(size % crate::sstable::BLOCK_SIZE as u64, 0);
    assert!(size > crate::sstable::BLOCK_SIZE as u64);
}

#[test]
fn test_many_keys_point_lookup_across_blocks() {
    let mut table = OrderedTable::new();
    let keys: Vec<Vec<u8>> = (0..2_000u32).map(|i| format!("key-{i:06}").into_bytes()).collect();
    for key in &keys {
        table.set(key, key).unwrap();
    }

    let tmp = TempDir::new().unwrap();
    let file = build_file(&tmp, "many.sst", &table);
    let mut reader = Reader::new(file).unwrap();

    for key in &keys {
        let mut it = reader.find(key).unwrap();
        assert!(it.next());
        assert_eq!(it.key(), key.as_slice());
        assert_eq!(it.value(), key.as_slice());
    }
}
