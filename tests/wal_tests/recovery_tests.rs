//! Tests for WAL Recovery
//!
//! These tests verify:
//! - Recovery from a clean or empty log
//! - Torn tails (partial header / partial data) are cut off
//! - Recovery stops at the first corrupted record and truncates there
//! - Verify reports the same statistics without touching the file

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use roster::config::WalSyncStrategy;
use roster::model::{InstitutionFields, MemberFields};
use roster::wal::{Operation, WalEntry, WalRecovery, WalWriter, MAX_RECORD_SIZE};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn insert(id: i64) -> Operation {
    Operation::InsertInstitution {
        id,
        fields: InstitutionFields::new(format!("inst{}", id), "city", "country"),
    }
}

/// Write entries using WalWriter (produces a well-formed WAL)
fn write_entries_via_writer(path: &Path, count: usize) {
    let mut writer = WalWriter::open(path, WalSyncStrategy::EveryWrite).unwrap();
    for i in 0..count {
        writer.append(insert(i as i64 + 1)).unwrap();
    }
}

/// Write raw byte chunks to a fresh file (for crafting damage)
fn write_raw(path: &Path, chunks: &[&[u8]]) {
    let mut file = File::create(path).unwrap();
    for chunk in chunks {
        file.write_all(chunk).unwrap();
    }
    file.sync_all().unwrap();
}

fn record(lsn: u64) -> Vec<u8> {
    WalEntry::new(lsn, insert(lsn as i64)).serialize().unwrap()
}

// =============================================================================
// Recover: Clean WAL Tests
// =============================================================================

#[test]
fn test_recover_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result.entries_recovered, 0);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 0);
    assert!(!result.was_truncated);
}

#[test]
fn test_recover_multiple_entries_in_order() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 10);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 10);
    assert_eq!(result.entries_recovered, 10);
    assert_eq!(result.last_lsn, 10);
    assert!(!result.was_truncated);

    for (i, entry) in entries.iter().enumerate() {
        assert_eq!(entry.lsn, (i + 1) as u64);
    }
}

#[test]
fn test_recover_preserves_operations() {
    let (_temp, wal_path) = setup_temp_wal();
    let member = MemberFields::new("Ada", "Lovelace", "ada@x.org", 36, 1);

    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(insert(1)).unwrap();
        writer
            .append(Operation::InsertMember { id: 1, fields: member.clone() })
            .unwrap();
        writer.append(Operation::DeleteInstitution { id: 1 }).unwrap();
    }

    let (entries, _) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries[0].operation, insert(1));
    assert_eq!(
        entries[1].operation,
        Operation::InsertMember { id: 1, fields: member }
    );
    assert_eq!(entries[2].operation, Operation::DeleteInstitution { id: 1 });
}

// =============================================================================
// Recover: Torn Tail Tests
// =============================================================================

#[test]
fn test_recover_partial_header_at_tail() {
    let (_temp, wal_path) = setup_temp_wal();
    let good = record(1);
    write_raw(&wal_path, &[good.as_slice(), &[0u8; 8][..]]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(result.last_lsn, 1);
    assert_eq!(result.entries_corrupted, 0);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), good.len() as u64);
}

#[test]
fn test_recover_partial_data_at_tail() {
    let (_temp, wal_path) = setup_temp_wal();
    let good = record(1);
    let mut torn = record(2);
    torn.truncate(20);
    write_raw(&wal_path, &[good.as_slice(), torn.as_slice()]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 1);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), good.len() as u64);
}

// =============================================================================
// Recover: Corruption Tests
// =============================================================================

#[test]
fn test_recover_stops_at_first_corruption() {
    let (_temp, wal_path) = setup_temp_wal();
    let good = record(1);
    let mut bad = record(2);
    let last = bad.len() - 1;
    bad[last] ^= 0xFF;
    let after = record(3);
    write_raw(&wal_path, &[good.as_slice(), bad.as_slice(), after.as_slice()]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    // The valid record behind the damage is dropped too
    assert_eq!(entries.len(), 1);
    assert_eq!(result.entries_recovered, 1);
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(result.last_lsn, 1);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), good.len() as u64);
}

#[test]
fn test_recover_corruption_at_first_entry() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut bytes = record(1);
    bytes[20] ^= 0xFF;
    write_raw(&wal_path, &[bytes.as_slice()]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result.entries_corrupted, 1);
    assert_eq!(result.last_lsn, 0);
    assert!(result.was_truncated);
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), 0);
}

#[test]
fn test_recover_oversized_length_field() {
    let (_temp, wal_path) = setup_temp_wal();
    let good = record(1);

    let mut header = Vec::new();
    header.extend_from_slice(&2u64.to_le_bytes());
    header.extend_from_slice(&0u32.to_le_bytes());
    header.extend_from_slice(&((MAX_RECORD_SIZE + 1) as u32).to_le_bytes());
    write_raw(&wal_path, &[good.as_slice(), header.as_slice()]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(result.entries_corrupted, 1);
    assert!(result.was_truncated);
}

#[test]
fn test_recover_lsn_mismatch_is_corruption() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut bytes = record(1);
    // Rewrite the header LSN; CRC only covers the data
    bytes[0..8].copy_from_slice(&9u64.to_le_bytes());
    write_raw(&wal_path, &[bytes.as_slice()]);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();

    assert!(entries.is_empty());
    assert_eq!(result.entries_corrupted, 1);
}

#[test]
fn test_writer_continues_after_recovery() {
    let (_temp, wal_path) = setup_temp_wal();
    let good = record(1);
    write_raw(&wal_path, &[good.as_slice(), &[0xFF; 3][..]]);

    WalRecovery::recover(&wal_path).unwrap();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(writer.append(insert(2)).unwrap(), 2);
    drop(writer);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(!result.was_truncated);
}

// =============================================================================
// Verify Tests
// =============================================================================

#[test]
fn test_verify_clean_wal() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 5);

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 5);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 5);
    assert!(!result.was_truncated);
}

#[test]
fn test_verify_does_not_modify_file() {
    let (_temp, wal_path) = setup_temp_wal();
    let good = record(1);
    let mut bad = record(2);
    let last = bad.len() - 1;
    bad[last] ^= 0xFF;
    write_raw(&wal_path, &[good.as_slice(), bad.as_slice()]);
    let before = fs::read(&wal_path).unwrap();

    let result = WalRecovery::verify(&wal_path).unwrap();

    assert_eq!(result.entries_recovered, 1);
    assert_eq!(result.entries_corrupted, 1);
    assert!(result.was_truncated);
    assert_eq!(fs::read(&wal_path).unwrap(), before);
}

#[test]
fn test_recover_and_verify_agree() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries_via_writer(&wal_path, 20);

    let verify_result = WalRecovery::verify(&wal_path).unwrap();
    let (entries, recover_result) = WalRecovery::recover(&wal_path).unwrap();

    assert_eq!(entries.len() as u64, recover_result.entries_recovered);
    assert_eq!(recover_result, verify_result);
}
