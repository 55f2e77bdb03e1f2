//! Dispatch Module
//!
//! Routes decoded commands to the store and turns the outcome into a
//! `Response`.
//!
//! ## Responsibilities
//! - Exactly one `Store` call per storable command, none otherwise
//! - Zero affected rows → `NotFound`, never an error
//! - Store failures → `StorageError` carrying the error text (no retry)
//! - No transport knowledge and no state between calls

use std::sync::Arc;

use crate::model::Entity;
use crate::protocol::{Action, Command, Listing, Response};
use crate::store::Store;

/// Stateless command router shared by every listener and worker
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn Store>,
}

impl Dispatcher {
    /// Create a dispatcher over a store
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Execute a command and return a response
    pub fn dispatch(&self, command: Command) -> Response {
        tracing::trace!("Dispatching {:?}", command);

        let outcome = match command {
            Command::CreateInstitution(fields) => self
                .store
                .create_institution(fields)
                .map(|id| Response::created(Entity::Institution, id)),
            Command::ListInstitutions => self
                .store
                .list_institutions()
                .map(|rows| Response::List(Listing::Institutions(rows))),
            Command::UpdateInstitution { id, fields } => self
                .store
                .update_institution(id, fields)
                .map(|rows| Response::affected(Entity::Institution, Action::Updated, id, rows)),
            Command::DeleteInstitution { id } => self
                .store
                .delete_institution(id)
                .map(|rows| Response::affected(Entity::Institution, Action::Deleted, id, rows)),
            Command::CreateMember(fields) => self
                .store
                .create_member(fields)
                .map(|id| Response::created(Entity::Member, id)),
            Command::ListMembers => self
                .store
                .list_members()
                .map(|rows| Response::List(Listing::Members(rows))),
            Command::UpdateMember { id, fields } => self
                .store
                .update_member(id, fields)
                .map(|rows| Response::affected(Entity::Member, Action::Updated, id, rows)),
            Command::DeleteMember { id } => self
                .store
                .delete_member(id)
                .map(|rows| Response::affected(Entity::Member, Action::Deleted, id, rows)),
            Command::Terminate => return Response::SessionEnd,
            Command::Malformed { raw, error } => {
                tracing::debug!("Rejected malformed command {:?}: {}", raw, error);
                return Response::protocol_error(error.to_string());
            }
        };

        outcome.unwrap_or_else(|e| {
            tracing::warn!("Store error: {}", e);
            Response::storage_error(e.to_string())
        })
    }
}
