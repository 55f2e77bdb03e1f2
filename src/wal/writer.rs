//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::config::WalSyncStrategy;
use crate::error::{Result, RosterError};
use super::{Operation, WalEntry, WalRecovery};

/// Writes entries to the WAL file
///
/// An append that fails partway is cut back off the file so later records
/// stay reachable by recovery. If even that fails, the writer refuses every
/// further append.
pub struct WalWriter {
    file: File,

    /// Bytes of complete records in the file
    len: u64,

    /// LSN the next append will receive
    next_lsn: u64,

    sync_strategy: WalSyncStrategy,

    /// Appends since the last fsync
    unsynced: usize,

    /// A partial record could not be removed
    failed: bool,
}

impl WalWriter {
    /// Open or create a WAL file, continuing after its last valid LSN
    ///
    /// The file must already be free of torn tails (run `WalRecovery::recover`
    /// first on an existing log).
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let next_lsn = if path.exists() {
            WalRecovery::verify(path)?.last_lsn + 1
        } else {
            1
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            file,
            len,
            next_lsn,
            sync_strategy,
            unsynced: 0,
            failed: false,
        })
    }

    /// Append an operation, returning the LSN it was logged under
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        if self.failed {
            return Err(RosterError::Storage(
                "WAL holds a partial record; reopen the store".to_string(),
            ));
        }

        let lsn = self.next_lsn;
        let record = WalEntry::new(lsn, operation).serialize()?;

        self.len = match append_record(&mut self.file, self.len, &record) {
            Ok(len) => len,
            Err(AppendError::RolledBack(e)) => return Err(e.into()),
            Err(AppendError::Torn { write, truncate }) => {
                tracing::error!(
                    "WAL append failed ({}) and the partial record could not be removed: {}",
                    write,
                    truncate
                );
                self.failed = true;
                return Err(write.into());
            }
        };
        self.next_lsn += 1;
        self.unsynced += 1;

        match self.sync_strategy {
            WalSyncStrategy::EveryWrite => self.sync()?,
            WalSyncStrategy::EveryNEntries { count } => {
                if self.unsynced >= count.max(1) {
                    self.sync()?;
                }
            }
        }

        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// LSN the next append will receive
    pub fn next_lsn(&self) -> u64 {
        self.next_lsn
    }
}

/// Append-only sink that can be cut back to a known length
trait LogFile: Write {
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl LogFile for File {
    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

#[derive(Debug)]
enum AppendError {
    /// The write failed and the file is back to its previous length
    RolledBack(io::Error),

    /// The write failed and so did the truncate
    Torn { write: io::Error, truncate: io::Error },
}

/// Write `record` after `len` bytes of complete records, returning the new length
fn append_record<F: LogFile>(
    file: &mut F,
    len: u64,
    record: &[u8],
) -> std::result::Result<u64, AppendError> {
    match file.write_all(record) {
        Ok(()) => Ok(len + record.len() as u64),
        Err(write) => match file.truncate_to(len) {
            Ok(()) => Err(AppendError::RolledBack(write)),
            Err(truncate) => Err(AppendError::Torn { write, truncate }),
        },
    }
}
