//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::Result;
use super::{ReadOutcome, WalEntry, WalReader};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries found (recovery stops at the first)
    pub entries_corrupted: u64,

    /// Last valid LSN (0 if none)
    pub last_lsn: u64,

    /// Whether the WAL was (or, for `verify`, would be) truncated
    pub was_truncated: bool,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Stop at the first torn or corrupted record
    /// 3. Truncate the file at that record
    /// 4. Return all valid entries in order
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let (entries, result, cut_at) = Self::scan(path)?;

        if let Some(offset) = cut_at {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(offset)?;
            file.sync_all()?;
            tracing::warn!(
                "WAL {} truncated at offset {} ({} corrupted)",
                path.display(),
                offset,
                result.entries_corrupted
            );
        }

        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (_, result, _) = Self::scan(path)?;
        Ok(result)
    }

    fn scan(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult, Option<u64>)> {
        let mut reader = WalReader::open(path)?;
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();

        let cut_at = loop {
            match reader.read_next()? {
                ReadOutcome::Entry(entry) => {
                    result.entries_recovered += 1;
                    result.last_lsn = entry.lsn;
                    entries.push(entry);
                }
                ReadOutcome::End => break None,
                ReadOutcome::Torn { offset } => break Some(offset),
                ReadOutcome::Corrupted { offset, reason } => {
                    tracing::warn!("Corrupted WAL record at offset {}: {}", offset, reason);
                    result.entries_corrupted += 1;
                    break Some(offset);
                }
            }
        };

        result.was_truncated = cut_at.is_some();
        Ok((entries, result, cut_at))
    }
}
