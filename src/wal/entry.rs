//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Result, RosterError};
use crate::model::{InstitutionFields, MemberFields, RecordId};

/// Record header: lsn (8) + crc (4) + len (4)
pub const HEADER_SIZE: usize = 16;

/// Upper bound on a single record's data section (1 MB)
///
/// Anything larger is treated as a garbage length field.
pub const MAX_RECORD_SIZE: usize = 1024 * 1024;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The mutation to replay
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Mutations that can be logged
///
/// Inserts carry the id the store assigned so replay reproduces it exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    InsertInstitution { id: RecordId, fields: InstitutionFields },
    UpdateInstitution { id: RecordId, fields: InstitutionFields },
    DeleteInstitution { id: RecordId },
    InsertMember { id: RecordId, fields: MemberFields },
    UpdateMember { id: RecordId, fields: MemberFields },
    DeleteMember { id: RecordId },
}

impl WalEntry {
    /// Create an entry stamped with the current time
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Self {
            lsn,
            operation,
            timestamp,
        }
    }

    /// Serialize into a complete on-disk record (header + data)
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let data = bincode::serialize(self)?;
        if data.len() > MAX_RECORD_SIZE {
            return Err(RosterError::Serialization(format!(
                "WAL record too large: {} bytes (max {})",
                data.len(),
                MAX_RECORD_SIZE
            )));
        }

        let crc = crc32fast::hash(&data);

        let mut record = Vec::with_capacity(HEADER_SIZE + data.len());
        record.extend_from_slice(&self.lsn.to_le_bytes());
        record.extend_from_slice(&crc.to_le_bytes());
        record.extend_from_slice(&(data.len() as u32).to_le_bytes());
        record.extend_from_slice(&data);

        Ok(record)
    }

    /// Deserialize a complete record, checking length, CRC and LSN
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let header = RecordHeader::parse(bytes)?;

        let end = HEADER_SIZE + header.len;
        if bytes.len() < end {
            return Err(RosterError::WalCorruption(format!(
                "incomplete record: expected {} bytes, got {}",
                end,
                bytes.len()
            )));
        }

        Self::decode_data(&header, &bytes[HEADER_SIZE..end])
    }

    /// Decode the data section once the header is known
    pub(crate) fn decode_data(header: &RecordHeader, data: &[u8]) -> Result<Self> {
        let actual = crc32fast::hash(data);
        if actual != header.crc {
            return Err(RosterError::WalCorruption(format!(
                "CRC mismatch at lsn {}: expected {:08x}, got {:08x}",
                header.lsn, header.crc, actual
            )));
        }

        let entry: WalEntry = bincode::deserialize(data)?;
        if entry.lsn != header.lsn {
            return Err(RosterError::WalCorruption(format!(
                "LSN mismatch: header says {}, payload says {}",
                header.lsn, entry.lsn
            )));
        }

        Ok(entry)
    }
}

/// Parsed fixed-size record header
#[derive(Debug, Clone, Copy)]
pub(crate) struct RecordHeader {
    pub lsn: u64,
    pub crc: u32,
    pub len: usize,
}

impl RecordHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(RosterError::WalCorruption(format!(
                "incomplete header: expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut lsn = [0u8; 8];
        lsn.copy_from_slice(&bytes[0..8]);
        let mut crc = [0u8; 4];
        crc.copy_from_slice(&bytes[8..12]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[12..16]);

        let len = u32::from_le_bytes(len) as usize;
        if len > MAX_RECORD_SIZE {
            return Err(RosterError::WalCorruption(format!(
                "record length {} exceeds maximum {}",
                len, MAX_RECORD_SIZE
            )));
        }

        Ok(Self {
            lsn: u64::from_le_bytes(lsn),
            crc: u32::from_le_bytes(crc),
            len,
        })
    }
}
