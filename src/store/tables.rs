//! In-memory tables shared by both adapters

use std::collections::BTreeMap;

use crate::error::{Result, RosterError};
use crate::model::{Institution, InstitutionFields, Member, MemberFields, RecordId};
use crate::wal::Operation;

/// Row storage plus id counters
///
/// Not synchronized; the owning adapter wraps it in a lock.
pub(crate) struct Tables {
    institutions: BTreeMap<RecordId, InstitutionFields>,
    members: BTreeMap<RecordId, MemberFields>,
    next_institution_id: RecordId,
    next_member_id: RecordId,
}

impl Tables {
    pub fn new() -> Self {
        Self {
            institutions: BTreeMap::new(),
            members: BTreeMap::new(),
            next_institution_id: 1,
            next_member_id: 1,
        }
    }

    // =========================================================================
    // Id Allocation
    // =========================================================================

    /// Id the next institution insert will receive
    pub fn peek_institution_id(&self) -> Result<RecordId> {
        check_id_space(self.next_institution_id)
    }

    /// Id the next member insert will receive
    pub fn peek_member_id(&self) -> Result<RecordId> {
        check_id_space(self.next_member_id)
    }

    // =========================================================================
    // Institutions
    // =========================================================================

    pub fn insert_institution(&mut self, id: RecordId, fields: InstitutionFields) {
        self.institutions.insert(id, fields);
        self.next_institution_id = self.next_institution_id.max(id.saturating_add(1));
    }

    pub fn list_institutions(&self) -> Vec<Institution> {
        self.institutions
            .iter()
            .map(|(id, fields)| Institution::from_fields(*id, fields.clone()))
            .collect()
    }

    pub fn has_institution(&self, id: RecordId) -> bool {
        self.institutions.contains_key(&id)
    }

    pub fn update_institution(&mut self, id: RecordId, fields: InstitutionFields) -> u64 {
        match self.institutions.get_mut(&id) {
            Some(row) => {
                *row = fields;
                1
            }
            None => 0,
        }
    }

    pub fn delete_institution(&mut self, id: RecordId) -> u64 {
        self.institutions.remove(&id).map_or(0, |_| 1)
    }

    // =========================================================================
    // Members
    // =========================================================================

    pub fn insert_member(&mut self, id: RecordId, fields: MemberFields) {
        self.members.insert(id, fields);
        self.next_member_id = self.next_member_id.max(id.saturating_add(1));
    }

    /// Left join: unresolved institution ids list with no name
    pub fn list_members(&self) -> Vec<Member> {
        self.members
            .iter()
            .map(|(id, fields)| {
                let institution_name = self
                    .institutions
                    .get(&fields.institution_id)
                    .map(|inst| inst.name.clone());
                Member::from_fields(*id, fields.clone(), institution_name)
            })
            .collect()
    }

    pub fn has_member(&self, id: RecordId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn update_member(&mut self, id: RecordId, fields: MemberFields) -> u64 {
        match self.members.get_mut(&id) {
            Some(row) => {
                *row = fields;
                1
            }
            None => 0,
        }
    }

    pub fn delete_member(&mut self, id: RecordId) -> u64 {
        self.members.remove(&id).map_or(0, |_| 1)
    }

    // =========================================================================
    // Replay
    // =========================================================================

    /// Apply a logged operation, returning affected rows
    pub fn apply(&mut self, operation: Operation) -> u64 {
        match operation {
            Operation::InsertInstitution { id, fields } => {
                self.insert_institution(id, fields);
                1
            }
            Operation::UpdateInstitution { id, fields } => self.update_institution(id, fields),
            Operation::DeleteInstitution { id } => self.delete_institution(id),
            Operation::InsertMember { id, fields } => {
                self.insert_member(id, fields);
                1
            }
            Operation::UpdateMember { id, fields } => self.update_member(id, fields),
            Operation::DeleteMember { id } => self.delete_member(id),
        }
    }
}

fn check_id_space(next: RecordId) -> Result<RecordId> {
    if next == RecordId::MAX {
        return Err(RosterError::Storage("id space exhausted".to_string()));
    }
    Ok(next)
}
