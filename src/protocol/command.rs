//! Command definitions
//!
//! Represents commands from clients.

use thiserror::Error;

use crate::model::{InstitutionFields, MemberFields, RecordId};

/// Command types, one per protocol keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandType {
    CreateInstitution,
    ListInstitutions,
    UpdateInstitution,
    DeleteInstitution,
    CreateMember,
    ListMembers,
    UpdateMember,
    DeleteMember,
    Terminate,
}

impl CommandType {
    /// Every command type, in wire-documentation order
    pub const ALL: [CommandType; 9] = [
        CommandType::CreateInstitution,
        CommandType::ListInstitutions,
        CommandType::UpdateInstitution,
        CommandType::DeleteInstitution,
        CommandType::CreateMember,
        CommandType::ListMembers,
        CommandType::UpdateMember,
        CommandType::DeleteMember,
        CommandType::Terminate,
    ];

    /// Canonical wire keyword
    pub fn keyword(&self) -> &'static str {
        match self {
            CommandType::CreateInstitution => "INSERTAR_UNIVERSIDAD",
            CommandType::ListInstitutions => "CONSULTAR_UNIVERSIDADES",
            CommandType::UpdateInstitution => "ACTUALIZAR_UNIVERSIDAD",
            CommandType::DeleteInstitution => "ELIMINAR_UNIVERSIDAD",
            CommandType::CreateMember => "INSERTAR_ESTUDIANTE",
            CommandType::ListMembers => "CONSULTAR_ESTUDIANTES",
            CommandType::UpdateMember => "ACTUALIZAR_ESTUDIANTE",
            CommandType::DeleteMember => "ELIMINAR_ESTUDIANTE",
            CommandType::Terminate => "SALIR",
        }
    }

    /// Number of `|`-separated arguments after the keyword
    pub fn arity(&self) -> usize {
        match self {
            CommandType::CreateInstitution => 3,
            CommandType::ListInstitutions => 0,
            CommandType::UpdateInstitution => 4,
            CommandType::DeleteInstitution => 1,
            CommandType::CreateMember => 5,
            CommandType::ListMembers => 0,
            CommandType::UpdateMember => 6,
            CommandType::DeleteMember => 1,
            CommandType::Terminate => 0,
        }
    }

    /// Usage line shown when the argument count is wrong
    pub fn syntax(&self) -> &'static str {
        match self {
            CommandType::CreateInstitution => "INSERTAR_UNIVERSIDAD|name|city|country",
            CommandType::ListInstitutions => "CONSULTAR_UNIVERSIDADES",
            CommandType::UpdateInstitution => "ACTUALIZAR_UNIVERSIDAD|id|name|city|country",
            CommandType::DeleteInstitution => "ELIMINAR_UNIVERSIDAD|id",
            CommandType::CreateMember => {
                "INSERTAR_ESTUDIANTE|first_name|last_name|email|age|institution_id"
            }
            CommandType::ListMembers => "CONSULTAR_ESTUDIANTES",
            CommandType::UpdateMember => {
                "ACTUALIZAR_ESTUDIANTE|id|first_name|last_name|email|age|institution_id"
            }
            CommandType::DeleteMember => "ELIMINAR_ESTUDIANTE|id",
            CommandType::Terminate => "SALIR",
        }
    }

    /// Look up a keyword, ignoring ASCII case
    ///
    /// `EXIT` and `QUIT` are accepted as aliases for `SALIR`.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        if keyword.eq_ignore_ascii_case("EXIT") || keyword.eq_ignore_ascii_case("QUIT") {
            return Some(CommandType::Terminate);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.keyword().eq_ignore_ascii_case(keyword))
    }
}

/// A parsed command
///
/// Decoding never fails outright: bad input becomes `Malformed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateInstitution(InstitutionFields),
    ListInstitutions,
    UpdateInstitution { id: RecordId, fields: InstitutionFields },
    DeleteInstitution { id: RecordId },
    CreateMember(MemberFields),
    ListMembers,
    UpdateMember { id: RecordId, fields: MemberFields },
    DeleteMember { id: RecordId },

    /// End the session (TCP) or just acknowledge (UDP)
    Terminate,

    /// Input that could not be decoded; never reaches the store
    Malformed { raw: String, error: DecodeError },
}

impl Command {
    /// Get the command type (`None` for `Malformed`)
    pub fn command_type(&self) -> Option<CommandType> {
        match self {
            Command::CreateInstitution(_) => Some(CommandType::CreateInstitution),
            Command::ListInstitutions => Some(CommandType::ListInstitutions),
            Command::UpdateInstitution { .. } => Some(CommandType::UpdateInstitution),
            Command::DeleteInstitution { .. } => Some(CommandType::DeleteInstitution),
            Command::CreateMember(_) => Some(CommandType::CreateMember),
            Command::ListMembers => Some(CommandType::ListMembers),
            Command::UpdateMember { .. } => Some(CommandType::UpdateMember),
            Command::DeleteMember { .. } => Some(CommandType::DeleteMember),
            Command::Terminate => Some(CommandType::Terminate),
            Command::Malformed { .. } => None,
        }
    }
}

/// Why a line failed to decode
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("empty command")]
    Empty,

    #[error("unrecognized operation: {0}")]
    UnrecognizedOperation(String),

    #[error("wrong argument count (expected {expected}, got {got}; usage: {syntax})")]
    WrongArgumentCount {
        command: CommandType,
        expected: usize,
        got: usize,
        syntax: &'static str,
    },

    #[error("invalid integer for {field}: {value:?}")]
    InvalidInteger { field: &'static str, value: String },

    #[error("invalid character in {field}")]
    InvalidCharacter { field: &'static str },
}
