//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{Result, RosterError};
use super::entry::RecordHeader;
use super::{WalEntry, HEADER_SIZE};

/// What the reader found at its current position
#[derive(Debug)]
pub enum ReadOutcome {
    /// A valid entry
    Entry(WalEntry),

    /// Clean end of file
    End,

    /// The file ends partway through a record starting at `offset`
    Torn { offset: u64 },

    /// A complete record starting at `offset` failed validation
    Corrupted { offset: u64, reason: String },
}

/// Reads entries from the WAL file
pub struct WalReader {
    reader: BufReader<File>,

    /// Byte offset of the next record
    position: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Byte offset of the next unread record
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read the record at the current position
    ///
    /// Only advances past records that were fully read.
    pub fn read_next(&mut self) -> Result<ReadOutcome> {
        let offset = self.position;

        let mut header_bytes = [0u8; HEADER_SIZE];
        let got = self.read_full(&mut header_bytes)?;
        if got == 0 {
            return Ok(ReadOutcome::End);
        }
        if got < HEADER_SIZE {
            return Ok(ReadOutcome::Torn { offset });
        }

        // A nonsensical length cannot be skipped over, so it ends the log
        let header = match RecordHeader::parse(&header_bytes) {
            Ok(header) => header,
            Err(e) => {
                return Ok(ReadOutcome::Corrupted {
                    offset,
                    reason: e.to_string(),
                })
            }
        };

        let mut data = vec![0u8; header.len];
        let got = self.read_full(&mut data)?;
        if got < header.len {
            return Ok(ReadOutcome::Torn { offset });
        }

        self.position += (HEADER_SIZE + header.len) as u64;

        match WalEntry::decode_data(&header, &data) {
            Ok(entry) => Ok(ReadOutcome::Entry(entry)),
            Err(e) => Ok(ReadOutcome::Corrupted {
                offset,
                reason: e.to_string(),
            }),
        }
    }

    /// Read the next entry, treating any damage as an error
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        match self.read_next()? {
            ReadOutcome::Entry(entry) => Ok(Some(entry)),
            ReadOutcome::End => Ok(None),
            ReadOutcome::Torn { offset } => Err(RosterError::WalCorruption(format!(
                "partial record at offset {}",
                offset
            ))),
            ReadOutcome::Corrupted { offset, reason } => Err(RosterError::WalCorruption(
                format!("bad record at offset {}: {}", offset, reason),
            )),
        }
    }

    /// Fill `buf` as far as the file allows, returning the byte count
    fn read_full(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(filled)
    }
}
