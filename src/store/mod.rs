//! Store Module
//!
//! The persistence port the dispatcher calls, plus two bundled adapters.
//!
//! ## Responsibilities
//! - Create/list/update/delete institutions and members
//! - Assign ids (from 1, strictly increasing, never reused)
//! - Resolve each member's institution name at list time (left join)
//! - Own any synchronization; callers share one `Arc<dyn Store>` freely
//!
//! The member → institution reference is deliberately not enforced: a member
//! may point at an id that never existed or was deleted, and simply lists
//! with no institution name.
//!
//! ## Adapters
//! - `MemoryStore`: volatile tables behind a `RwLock`
//! - `JournalStore`: the same tables, made durable by the WAL

mod tables;
mod memory;
mod journal;

pub use memory::MemoryStore;
pub use journal::JournalStore;

use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::model::{Institution, InstitutionFields, Member, MemberFields, RecordId};

/// Persistence port
///
/// Update and delete return the number of affected rows; zero means the id
/// does not exist and is not an error.
pub trait Store: Send + Sync {
    fn create_institution(&self, fields: InstitutionFields) -> Result<RecordId>;

    /// All institutions, ordered by id
    fn list_institutions(&self) -> Result<Vec<Institution>>;

    fn update_institution(&self, id: RecordId, fields: InstitutionFields) -> Result<u64>;

    fn delete_institution(&self, id: RecordId) -> Result<u64>;

    fn create_member(&self, fields: MemberFields) -> Result<RecordId>;

    /// All members, ordered by id, with institution names resolved
    fn list_members(&self) -> Result<Vec<Member>>;

    fn update_member(&self, id: RecordId, fields: MemberFields) -> Result<u64>;

    fn delete_member(&self, id: RecordId) -> Result<u64>;

    /// Release held resources; called once when the server stops
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Open the store a config asks for: journaled if `data_dir` is set
pub fn open_store(config: &Config) -> Result<Arc<dyn Store>> {
    match &config.data_dir {
        Some(dir) => {
            let store = JournalStore::open(Path::new(dir), config.wal_sync_strategy)?;
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}
