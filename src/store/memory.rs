//! Volatile store
//!
//! Everything lives in process memory and is lost on exit.

use parking_lot::RwLock;

use crate::error::Result;
use crate::model::{Institution, InstitutionFields, Member, MemberFields, RecordId};
use super::tables::Tables;
use super::Store;

/// In-memory `Store`
///
/// ## Concurrency:
/// - Lists take the read lock (many concurrent readers)
/// - Mutations take the write lock, so id assignment is race-free
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn create_institution(&self, fields: InstitutionFields) -> Result<RecordId> {
        let mut tables = self.tables.write();
        let id = tables.peek_institution_id()?;
        tables.insert_institution(id, fields);
        Ok(id)
    }

    fn list_institutions(&self) -> Result<Vec<Institution>> {
        Ok(self.tables.read().list_institutions())
    }

    fn update_institution(&self, id: RecordId, fields: InstitutionFields) -> Result<u64> {
        Ok(self.tables.write().update_institution(id, fields))
    }

    fn delete_institution(&self, id: RecordId) -> Result<u64> {
        Ok(self.tables.write().delete_institution(id))
    }

    fn create_member(&self, fields: MemberFields) -> Result<RecordId> {
        let mut tables = self.tables.write();
        let id = tables.peek_member_id()?;
        tables.insert_member(id, fields);
        Ok(id)
    }

    fn list_members(&self) -> Result<Vec<Member>> {
        Ok(self.tables.read().list_members())
    }

    fn update_member(&self, id: RecordId, fields: MemberFields) -> Result<u64> {
        Ok(self.tables.write().update_member(id, fields))
    }

    fn delete_member(&self, id: RecordId) -> Result<u64> {
        Ok(self.tables.write().delete_member(id))
    }
}
