//! Write-Ahead Log (WAL) Module
//!
//! Provides durability for the journaled store through append-only logging.
//!
//! ## Responsibilities
//! - Append a record for every mutation before it is applied
//! - CRC32 checksums for corruption detection
//! - Log Sequence Numbers (LSN) for ordering
//! - Crash recovery and replay
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Entry 1                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Entry 2                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Data   │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//!
//! All integers are little-endian. `Data` is the bincode encoding of the
//! whole `WalEntry`, and the CRC covers `Data` only.

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::{WalEntry, Operation, HEADER_SIZE, MAX_RECORD_SIZE};
pub use writer::WalWriter;
pub use reader::{WalReader, ReadOutcome};
pub use recovery::{WalRecovery, RecoveryResult};
