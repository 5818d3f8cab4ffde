use crate::record::{Reader, Writer};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use tempfile::TempDir;
use tracing::Level;
use tracing_subscriber::fmt::Subscriber;

fn init_tracing() {
    let _ = Subscriber::builder()
        .with_max_level(Level::TRACE)
        .try_init();
}

fn open_pair(tmp: &TempDir, name: &str) -> (Writer<File>, File) {
    let path = tmp.path().join(name);
    let write_handle = File::create(&path).unwrap();
    let read_handle = File::open(&path).unwrap();
    (Writer::new(write_handle), read_handle)
}

#[test]
fn test_s1_log_round_trip_small() {
    init_tracing();

    let tmp = TempDir::new().unwrap();
    let (mut writer, read_handle) = open_pair(&tmp, "s1.log");

    writer.write(b"Hello, world").unwrap();
    writer.flush().unwrap();

    let crc = crc32fast::hash(b"Hello, world");
    assert_eq!(crc, 0x8bd6_9e52);

    let mut reader = Reader::new(read_handle);
    let record = reader.read_record().unwrap().unwrap();
    assert_eq!(record, b"Hello, world");
    assert!(reader.read_record().unwrap().is_none());
}

#[test]
fn test_s2_log_split_two_chunks() {
    init_tracing();

    let tmp = TempDir::new().unwrap();
    let (mut writer, read_handle) = open_pair(&tmp, "s2.log");

    let record: Vec<u8> = (0..32_762u32).map(|i| (i % 251) as u8).collect();
    writer.write(&record).unwrap();
    writer.flush().unwrap();

    let mut reader = Reader::new(read_handle);
    let got = reader.read_record().unwrap().unwrap();
    assert_eq!(got, record);
}

#[test]
fn test_s3_log_split_three_chunks() {
    init_tracing();

    let tmp = TempDir::new().unwrap();
    let (mut writer, read_handle) = open_pair(&tmp, "s3.log");

    let record: Vec<u8> = (0..65_000u32).map(|i| (i % 241) as u8).collect();
    writer.write(&record).unwrap();
    writer.flush().unwrap();

    let mut reader = Reader::new(read_handle);
    let got = reader.read_record().unwrap().unwrap();
    assert_eq!(got, record);
}

#[test]
fn test_round_trip_many_records_single_flush() {
    init_tracing();

    let tmp = TempDir::new().unwrap();
    let (mut writer, read_handle) = open_pair(&tmp, "many.log");

    let records: Vec<Vec<u8>> = vec![
        b"a".to_vec(),
        b"".to_vec(),
        b"the quick brown fox".to_vec(),
        vec![7u8; 4096],
    ];

    for r in &records {
        writer.write(r).unwrap();
    }
    writer.flush().unwrap();

    let mut reader = Reader::new(read_handle);
    for expected in &records {
        let got = reader.read_record().unwrap().unwrap();
        assert_eq!(&got, expected);
    }
    assert!(reader.read_record().unwrap().is_none());
}

#[test]
fn test_empty_record_round_trip() {
    init_tracing();

    let tmp = TempDir::new().unwrap();
    let (mut writer, read_handle) = open_pair(&tmp, "empty.log");

    let n = writer.write(b"").unwrap();
    assert_eq!(n, 0);
    writer.flush().unwrap();

    let mut reader = Reader::new(read_handle);
    let got = reader.read_record().unwrap().unwrap();
    assert!(got.is_empty());
}

#[test]
fn test_too_much_data_rejected() {
    use crate::record::{RecordError, MAX_RECORD_LEN};

    init_tracing();

    let tmp = TempDir::new().unwrap();
    let (mut writer, _read_handle) = open_pair(&tmp, "toolarge.log");

    let record = vec![0u8; MAX_RECORD_LEN + 1];
    let err = writer.write(&record).unwrap_err();
    assert!(matches!(err, RecordError::TooMuchData(n) if n == MAX_RECORD_LEN + 1));
}

#[test]
fn test_flush_resets_cursor_to_block_boundary() {
    init_tracing();

    let tmp = TempDir::new().unwrap();
    let (mut writer, mut read_handle) = open_pair(&tmp, "cursor.log");

    writer.write(b"first").unwrap();
    writer.flush().unwrap();
    writer.write(b"second").unwrap();
    writer.flush().unwrap();

    let mut contents = Vec::new();
    read_handle.seek(SeekFrom::Start(0)).unwrap();
    read_handle.read_to_end(&mut contents).unwrap();
    assert_eq!(contents.len(), 2 * crate::record::BLOCK_SIZE);
}
