//! Response definitions
//!
//! Typed dispatch outcomes, rendered to text by the codec.

use crate::model::{Entity, Institution, Member, RecordId};

/// What a successful mutation did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Created,
    Updated,
    Deleted,
}

/// Rows returned by a list command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Institutions(Vec<Institution>),
    Members(Vec<Member>),
}

impl Listing {
    pub fn len(&self) -> usize {
        match self {
            Listing::Institutions(rows) => rows.len(),
            Listing::Members(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Mutation applied; `id` is the new or targeted record
    Ok {
        entity: Entity,
        action: Action,
        id: RecordId,
    },

    /// Update/delete matched no record
    NotFound { entity: Entity, id: RecordId },

    /// Query result, possibly empty
    List(Listing),

    /// The store failed; `detail` is its error text
    StorageError { detail: String },

    /// The command could not be decoded
    ProtocolError { reason: String },

    /// Acknowledges `Terminate`
    SessionEnd,
}

impl Response {
    /// Create an OK response for a newly created record
    pub fn created(entity: Entity, id: RecordId) -> Self {
        Response::Ok {
            entity,
            action: Action::Created,
            id,
        }
    }

    /// Map an affected-row count to OK or NOT_FOUND
    pub fn affected(entity: Entity, action: Action, id: RecordId, rows: u64) -> Self {
        if rows > 0 {
            Response::Ok { entity, action, id }
        } else {
            Response::NotFound { entity, id }
        }
    }

    /// Create a storage ERROR response
    pub fn storage_error(detail: impl Into<String>) -> Self {
        Response::StorageError {
            detail: detail.into(),
        }
    }

    /// Create a protocol ERROR response
    pub fn protocol_error(reason: impl Into<String>) -> Self {
        Response::ProtocolError {
            reason: reason.into(),
        }
    }

    /// Whether a session should close after this response is written
    pub fn ends_session(&self) -> bool {
        matches!(self, Response::SessionEnd)
    }
}
