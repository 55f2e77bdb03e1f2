//! Data model
//!
//! Institutions and the members that reference them.

use serde::{Deserialize, Serialize};

/// Store-assigned record identifier
pub type RecordId = i64;

/// Entity kinds addressed by the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Institution,
    Member,
}

impl Entity {
    /// Capitalized display name ("Institution")
    pub fn title(&self) -> &'static str {
        match self {
            Entity::Institution => "Institution",
            Entity::Member => "Member",
        }
    }

    /// Lowercase display name ("institution")
    pub fn noun(&self) -> &'static str {
        match self {
            Entity::Institution => "institution",
            Entity::Member => "member",
        }
    }
}

/// Caller-supplied institution fields (everything except the id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionFields {
    pub name: String,
    pub city: String,
    pub country: String,
}

impl InstitutionFields {
    pub fn new(
        name: impl Into<String>,
        city: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            city: city.into(),
            country: country.into(),
        }
    }
}

/// Caller-supplied member fields (everything except the id)
///
/// `institution_id` is a plain reference; nothing checks that it resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberFields {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: i32,
    pub institution_id: RecordId,
}

impl MemberFields {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        age: i32,
        institution_id: RecordId,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            age,
            institution_id,
        }
    }
}

/// A stored institution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Institution {
    pub id: RecordId,
    pub name: String,
    pub city: String,
    pub country: String,
}

impl Institution {
    pub fn from_fields(id: RecordId, fields: InstitutionFields) -> Self {
        Self {
            id,
            name: fields.name,
            city: fields.city,
            country: fields.country,
        }
    }
}

/// A stored member, as listed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub age: i32,
    pub institution_id: RecordId,

    /// Resolved at list time; `None` when the referenced institution is absent
    pub institution_name: Option<String>,
}

impl Member {
    pub fn from_fields(
        id: RecordId,
        fields: MemberFields,
        institution_name: Option<String>,
    ) -> Self {
        Self {
            id,
            first_name: fields.first_name,
            last_name: fields.last_name,
            email: fields.email,
            age: fields.age,
            institution_id: fields.institution_id,
            institution_name,
        }
    }
}
