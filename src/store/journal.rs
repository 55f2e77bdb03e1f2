//! Durable store
//!
//! In-memory tables rebuilt from, and kept in step with, a write-ahead log.
//!
//! ## Write Path
//! 1. Acquire the WAL lock (serializes all writers)
//! 2. Resolve the outcome against the tables (new id / row exists?)
//! 3. Append the operation to the WAL
//! 4. Apply it to the tables under the write lock
//!
//! Updates and deletes that match no row are answered without logging.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::config::WalSyncStrategy;
use crate::error::{Result, RosterError};
use crate::model::{Institution, InstitutionFields, Member, MemberFields, RecordId};
use crate::wal::{Operation, RecoveryResult, WalRecovery, WalWriter};
use super::tables::Tables;
use super::Store;

/// WAL-backed `Store`
pub struct JournalStore {
    /// Location of the log file
    wal_path: PathBuf,

    /// Current state (replayed on open)
    tables: RwLock<Tables>,

    /// Log writer; holding this lock is what makes a caller "the writer"
    wal: Mutex<WalWriter>,

    /// Statistics from the recovery pass on open
    recovery: RecoveryResult,

    /// Set by `close`; later calls fail
    closed: AtomicBool,
}

impl JournalStore {
    const WAL_FILENAME: &'static str = "roster.wal";

    /// Open or create a store in `dir`
    ///
    /// On startup:
    /// 1. Create the directory if needed
    /// 2. Recover the WAL (truncating damaged tails)
    /// 3. Replay recovered operations into fresh tables
    pub fn open(dir: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let wal_path = dir.join(Self::WAL_FILENAME);

        let mut tables = Tables::new();
        let recovery = if wal_path.exists() {
            let (entries, result) = WalRecovery::recover(&wal_path)?;
            for entry in entries {
                tables.apply(entry.operation);
            }
            tracing::info!(
                "WAL recovery: {} entries recovered, {} corrupted, last_lsn={}",
                result.entries_recovered,
                result.entries_corrupted,
                result.last_lsn
            );
            result
        } else {
            RecoveryResult::default()
        };

        let wal = WalWriter::open(&wal_path, sync_strategy)?;

        Ok(Self {
            wal_path,
            tables: RwLock::new(tables),
            wal: Mutex::new(wal),
            recovery,
            closed: AtomicBool::new(false),
        })
    }

    /// Path of the WAL file
    pub fn wal_path(&self) -> &Path {
        &self.wal_path
    }

    /// What recovery found when this store was opened
    pub fn recovery(&self) -> &RecoveryResult {
        &self.recovery
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(RosterError::Storage("store is closed".to_string()));
        }
        Ok(())
    }

    /// Log then apply an operation whose outcome is already decided
    fn commit(&self, wal: &mut WalWriter, operation: Operation) -> Result<u64> {
        wal.append(operation.clone())?;
        Ok(self.tables.write().apply(operation))
    }

    fn mutate_existing(
        &self,
        exists: impl FnOnce(&Tables) -> bool,
        operation: Operation,
    ) -> Result<u64> {
        self.ensure_open()?;
        let mut wal = self.wal.lock();
        let found = {
            let tables = self.tables.read();
            exists(&*tables)
        };
        if !found {
            return Ok(0);
        }
        self.commit(&mut wal, operation)
    }
}

impl Store for JournalStore {
    fn create_institution(&self, fields: InstitutionFields) -> Result<RecordId> {
        self.ensure_open()?;
        let mut wal = self.wal.lock();
        let id = self.tables.read().peek_institution_id()?;
        self.commit(&mut wal, Operation::InsertInstitution { id, fields })?;
        Ok(id)
    }

    fn list_institutions(&self) -> Result<Vec<Institution>> {
        self.ensure_open()?;
        Ok(self.tables.read().list_institutions())
    }

    fn update_institution(&self, id: RecordId, fields: InstitutionFields) -> Result<u64> {
        self.mutate_existing(
            |t| t.has_institution(id),
            Operation::UpdateInstitution { id, fields },
        )
    }

    fn delete_institution(&self, id: RecordId) -> Result<u64> {
        self.mutate_existing(
            |t| t.has_institution(id),
            Operation::DeleteInstitution { id },
        )
    }

    fn create_member(&self, fields: MemberFields) -> Result<RecordId> {
        self.ensure_open()?;
        let mut wal = self.wal.lock();
        let id = self.tables.read().peek_member_id()?;
        self.commit(&mut wal, Operation::InsertMember { id, fields })?;
        Ok(id)
    }

    fn list_members(&self) -> Result<Vec<Member>> {
        self.ensure_open()?;
        Ok(self.tables.read().list_members())
    }

    fn update_member(&self, id: RecordId, fields: MemberFields) -> Result<u64> {
        self.mutate_existing(|t| t.has_member(id), Operation::UpdateMember { id, fields })
    }

    fn delete_member(&self, id: RecordId) -> Result<u64> {
        self.mutate_existing(|t| t.has_member(id), Operation::DeleteMember { id })
    }

    /// Sync the WAL; idempotent
    fn close(&self) -> Result<()> {
        let mut wal = self.wal.lock();
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        wal.sync()?;
        tracing::debug!("Journal store closed at lsn {}", wal.next_lsn() - 1);
        Ok(())
    }
}
