//! Tests for the WAL Writer and Reader
//!
//! These tests verify:
//! - Record layout (header fields, CRC over the data)
//! - LSNs start at 1 and continue across reopen
//! - Sync strategies
//! - The reader walks records and reports damage without advancing

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use roster::config::WalSyncStrategy;
use roster::model::{InstitutionFields, MemberFields};
use roster::wal::{Operation, ReadOutcome, WalEntry, WalReader, WalWriter, HEADER_SIZE};
use roster::RosterError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn update_member(id: i64) -> Operation {
    Operation::UpdateMember {
        id,
        fields: MemberFields::new("Ada", "Lovelace", "ada@x.org", 36, 1),
    }
}

fn read_all(path: &PathBuf) -> Vec<WalEntry> {
    let mut reader = WalReader::open(path).unwrap();
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().unwrap() {
        entries.push(entry);
    }
    entries
}

// =============================================================================
// Record Format Tests
// =============================================================================

#[test]
fn test_record_header_layout() {
    let entry = WalEntry::new(42, Operation::DeleteMember { id: 3 });
    let bytes = entry.serialize().unwrap();

    let lsn = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
    let crc = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
    let len = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;

    assert_eq!(lsn, 42);
    assert_eq!(len, bytes.len() - HEADER_SIZE);
    assert_eq!(crc, crc32fast::hash(&bytes[HEADER_SIZE..]));
}

#[test]
fn test_entry_deserialize_round_trip() {
    let entry = WalEntry::new(
        7,
        Operation::UpdateInstitution {
            id: 2,
            fields: InstitutionFields::new("Universidad de Chile", "Santiago", "Chile"),
        },
    );
    let bytes = entry.serialize().unwrap();

    assert_eq!(WalEntry::deserialize(&bytes).unwrap(), entry);
}

#[test]
fn test_entry_deserialize_rejects_bad_crc() {
    let mut bytes = WalEntry::new(1, update_member(1)).serialize().unwrap();
    bytes[HEADER_SIZE] ^= 0x01;

    assert!(matches!(
        WalEntry::deserialize(&bytes),
        Err(RosterError::WalCorruption(_))
    ));
}

#[test]
fn test_entry_deserialize_rejects_short_input() {
    let bytes = WalEntry::new(1, update_member(1)).serialize().unwrap();

    assert!(WalEntry::deserialize(&bytes[..HEADER_SIZE - 1]).is_err());
    assert!(WalEntry::deserialize(&bytes[..bytes.len() - 1]).is_err());
}

// =============================================================================
// Writer Tests
// =============================================================================

#[test]
fn test_first_lsn_is_one() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    assert_eq!(writer.next_lsn(), 1);
    assert_eq!(writer.append(update_member(1)).unwrap(), 1);
    assert_eq!(writer.append(update_member(2)).unwrap(), 2);
    assert_eq!(writer.next_lsn(), 3);
}

#[test]
fn test_open_creates_file() {
    let (_temp, wal_path) = setup_temp_wal();
    assert!(!wal_path.exists());

    WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();

    assert!(wal_path.exists());
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), 0);
}

#[test]
fn test_lsn_continues_after_reopen() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        for i in 0..3 {
            writer.append(update_member(i)).unwrap();
        }
    }

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(writer.next_lsn(), 4);
    assert_eq!(writer.append(update_member(9)).unwrap(), 4);

    let lsns: Vec<_> = read_all(&wal_path).iter().map(|e| e.lsn).collect();
    assert_eq!(lsns, vec![1, 2, 3, 4]);
}

#[test]
fn test_batched_sync_writes_every_entry() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer =
            WalWriter::open(&wal_path, WalSyncStrategy::EveryNEntries { count: 4 }).unwrap();
        for i in 0..10 {
            writer.append(update_member(i)).unwrap();
        }
        writer.sync().unwrap();
    }

    assert_eq!(read_all(&wal_path).len(), 10);
}

#[test]
fn test_zero_batch_count_behaves_like_every_write() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut writer =
        WalWriter::open(&wal_path, WalSyncStrategy::EveryNEntries { count: 0 }).unwrap();

    writer.append(update_member(1)).unwrap();
    drop(writer);

    assert_eq!(read_all(&wal_path).len(), 1);
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_reader_tracks_position() {
    let (_temp, wal_path) = setup_temp_wal();
    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(Operation::DeleteInstitution { id: 1 }).unwrap();
        writer.append(Operation::DeleteInstitution { id: 2 }).unwrap();
    }
    let file_len = fs::metadata(&wal_path).unwrap().len();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert_eq!(reader.position(), 0);

    assert!(matches!(reader.read_next().unwrap(), ReadOutcome::Entry(_)));
    let first_end = reader.position();
    assert!(first_end > HEADER_SIZE as u64);

    assert!(matches!(reader.read_next().unwrap(), ReadOutcome::Entry(_)));
    assert_eq!(reader.position(), file_len);

    assert!(matches!(reader.read_next().unwrap(), ReadOutcome::End));
}

#[test]
fn test_reader_reports_torn_tail_offset() {
    let (_temp, wal_path) = setup_temp_wal();
    let good = WalEntry::new(1, update_member(1)).serialize().unwrap();
    {
        let mut file = File::create(&wal_path).unwrap();
        file.write_all(&good).unwrap();
        file.write_all(&[1, 2, 3]).unwrap();
    }

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(matches!(reader.read_next().unwrap(), ReadOutcome::Entry(_)));

    match reader.read_next().unwrap() {
        ReadOutcome::Torn { offset } => assert_eq!(offset, good.len() as u64),
        other => panic!("Expected Torn, got {:?}", other),
    }
    assert_eq!(reader.position(), good.len() as u64);
}

#[test]
fn test_next_entry_surfaces_damage_as_error() {
    let (_temp, wal_path) = setup_temp_wal();
    WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite)
        .unwrap()
        .append(update_member(1))
        .unwrap();

    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[0u8; 4]).unwrap();
    drop(file);

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_entry().unwrap().is_some());
    assert!(matches!(
        reader.next_entry(),
        Err(RosterError::WalCorruption(_))
    ));
}
