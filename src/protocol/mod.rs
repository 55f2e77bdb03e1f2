//! Protocol Module
//!
//! Defines the text protocol for client-server communication.
//!
//! ## Protocol Format
//!
//! ### Request Format
//! ```text
//! KEYWORD|arg1|arg2|...
//! ```
//!
//! ### Commands
//! - INSERTAR_UNIVERSIDAD|name|city|country
//! - CONSULTAR_UNIVERSIDADES
//! - ACTUALIZAR_UNIVERSIDAD|id|name|city|country
//! - ELIMINAR_UNIVERSIDAD|id
//! - INSERTAR_ESTUDIANTE|first_name|last_name|email|age|institution_id
//! - CONSULTAR_ESTUDIANTES
//! - ACTUALIZAR_ESTUDIANTE|id|first_name|last_name|email|age|institution_id
//! - ELIMINAR_ESTUDIANTE|id
//! - SALIR (also EXIT, QUIT)
//!
//! ### Response Status Prefixes
//! - `OK:`        mutation applied, or session closed
//! - `NOT_FOUND:` update/delete matched nothing
//! - `ERROR:`     malformed command or storage failure
//! - lists end with `Total: <count>`

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType, DecodeError};
pub use response::{Action, Listing, Response};
pub use codec::{
    check_command, decode_command, encode_command, encode_response, encode_datagram,
    is_final_line, read_line, read_response, write_command, write_response,
    DATAGRAM_GOODBYE_MESSAGE, DELIMITER, MAX_LINE_SIZE, NO_INSTITUTIONS, NO_MEMBERS,
    SERVER_BUSY_MESSAGE, SESSION_END_MESSAGE,
};
