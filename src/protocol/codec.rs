//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! KEYWORD|arg1|arg2|...\n
//! ```
//! One command per line (TCP) or per datagram (UDP). Keywords are matched
//! ignoring ASCII case; arguments are trimmed of surrounding whitespace.
//!
//! ### Response Format
//! One or more `\n`-terminated lines. A response is complete after its
//! final line, which is one of:
//! - `OK: ...`
//! - `NOT_FOUND: ...`
//! - `ERROR: ...`
//! - `Total: <count>` (closes a list)
//! - `No institutions registered.` / `No members registered.` (empty list)

use std::io::{BufRead, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, RosterError};
use crate::model::{Institution, InstitutionFields, Member, MemberFields, RecordId};
use super::{Action, Command, CommandType, DecodeError, Listing, Response};

/// Field separator
pub const DELIMITER: char = '|';

/// Line shown instead of an empty institution table
pub const NO_INSTITUTIONS: &str = "No institutions registered.";

/// Line shown instead of an empty member table
pub const NO_MEMBERS: &str = "No members registered.";

/// Acknowledgment for `Terminate` on a TCP session
pub const SESSION_END_MESSAGE: &str = "OK: Connection closed by server. Goodbye!";

/// Acknowledgment for `Terminate` over UDP, where there is nothing to close
pub const DATAGRAM_GOODBYE_MESSAGE: &str = "OK: Goodbye!";

/// Sent to a TCP client turned away by the connection limit
pub const SERVER_BUSY_MESSAGE: &str = "ERROR: server busy, try again later";

/// Longest command or response line accepted from a stream (bytes)
pub const MAX_LINE_SIZE: usize = 65535;

const INSTITUTION_BANNER_WIDTH: usize = 59;
const MEMBER_BANNER_WIDTH: usize = 79;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Decode one command line
///
/// Never fails: anything unusable comes back as `Command::Malformed`.
pub fn decode_command(line: &str) -> Command {
    match parse_command(line) {
        Ok(command) => command,
        Err(error) => Command::Malformed {
            raw: line.to_string(),
            error,
        },
    }
}

fn parse_command(line: &str) -> std::result::Result<Command, DecodeError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(DecodeError::Empty);
    }

    let mut tokens = line.split(DELIMITER).map(str::trim);
    let keyword = tokens.next().unwrap_or_default();
    let args: Vec<&str> = tokens.collect();

    let command_type = CommandType::from_keyword(keyword)
        .ok_or_else(|| DecodeError::UnrecognizedOperation(keyword.to_string()))?;

    if args.len() != command_type.arity() {
        return Err(DecodeError::WrongArgumentCount {
            command: command_type,
            expected: command_type.arity(),
            got: args.len(),
            syntax: command_type.syntax(),
        });
    }

    // A stored newline would split a list row when it is rendered
    if let Some(index) = args.iter().position(|arg| has_control_char(arg)) {
        return Err(DecodeError::InvalidCharacter {
            field: field_name(command_type, index),
        });
    }

    let command = match command_type {
        CommandType::CreateInstitution => {
            Command::CreateInstitution(InstitutionFields::new(args[0], args[1], args[2]))
        }
        CommandType::ListInstitutions => Command::ListInstitutions,
        CommandType::UpdateInstitution => Command::UpdateInstitution {
            id: parse_id(args[0])?,
            fields: InstitutionFields::new(args[1], args[2], args[3]),
        },
        CommandType::DeleteInstitution => Command::DeleteInstitution {
            id: parse_id(args[0])?,
        },
        CommandType::CreateMember => Command::CreateMember(parse_member_fields(&args)?),
        CommandType::ListMembers => Command::ListMembers,
        CommandType::UpdateMember => Command::UpdateMember {
            id: parse_id(args[0])?,
            fields: parse_member_fields(&args[1..])?,
        },
        CommandType::DeleteMember => Command::DeleteMember {
            id: parse_id(args[0])?,
        },
        CommandType::Terminate => Command::Terminate,
    };

    Ok(command)
}

/// Name of argument `index` as written in the command's syntax
fn field_name(command_type: CommandType, index: usize) -> &'static str {
    command_type
        .syntax()
        .split(DELIMITER)
        .nth(index + 1)
        .unwrap_or("argument")
}

fn has_control_char(value: &str) -> bool {
    value.chars().any(char::is_control)
}

/// `first_name|last_name|email|age|institution_id`
fn parse_member_fields(args: &[&str]) -> std::result::Result<MemberFields, DecodeError> {
    Ok(MemberFields::new(
        args[0],
        args[1],
        args[2],
        parse_int("age", args[3])?,
        parse_int("institution_id", args[4])?,
    ))
}

fn parse_id(value: &str) -> std::result::Result<RecordId, DecodeError> {
    parse_int("id", value)
}

fn parse_int<T: std::str::FromStr>(
    field: &'static str,
    value: &str,
) -> std::result::Result<T, DecodeError> {
    value.parse().map_err(|_| DecodeError::InvalidInteger {
        field,
        value: value.to_string(),
    })
}

/// Encode a command to its wire line (without the terminator)
///
/// `Malformed` encodes back to its raw text.
pub fn encode_command(command: &Command) -> String {
    match command_fields(command) {
        Some(fields) => fields.join("|"),
        None => match command {
            Command::Malformed { raw, .. } => raw.clone(),
            _ => String::new(),
        },
    }
}

/// Check that a command survives the trip over the wire unchanged
///
/// Arguments must not contain the delimiter or control characters, and a
/// `Malformed` raw line must stay on one line.
pub fn check_command(command: &Command) -> Result<()> {
    if let Command::Malformed { raw, .. } = command {
        if raw.contains(['\r', '\n']) {
            return Err(RosterError::Protocol(
                "raw command must be a single line".to_string(),
            ));
        }
        return Ok(());
    }

    let (Some(command_type), Some(fields)) = (command.command_type(), command_fields(command))
    else {
        return Ok(());
    };
    for (index, field) in fields.iter().skip(1).enumerate() {
        if field.contains(DELIMITER) || has_control_char(field) {
            return Err(RosterError::Protocol(format!(
                "{} must not contain '{}' or control characters",
                field_name(command_type, index),
                DELIMITER
            )));
        }
    }
    Ok(())
}

/// Keyword followed by arguments, or `None` for `Malformed`
fn command_fields(command: &Command) -> Option<Vec<String>> {
    let command_type = command.command_type()?;

    let mut fields: Vec<String> = vec![command_type.keyword().to_string()];
    match command {
        Command::CreateInstitution(f) => push_institution(&mut fields, f),
        Command::UpdateInstitution { id, fields: f } => {
            fields.push(id.to_string());
            push_institution(&mut fields, f);
        }
        Command::DeleteInstitution { id } | Command::DeleteMember { id } => {
            fields.push(id.to_string())
        }
        Command::CreateMember(f) => push_member(&mut fields, f),
        Command::UpdateMember { id, fields: f } => {
            fields.push(id.to_string());
            push_member(&mut fields, f);
        }
        Command::ListInstitutions
        | Command::ListMembers
        | Command::Terminate
        | Command::Malformed { .. } => {}
    }

    Some(fields)
}

fn push_institution(out: &mut Vec<String>, f: &InstitutionFields) {
    out.extend([f.name.clone(), f.city.clone(), f.country.clone()]);
}

fn push_member(out: &mut Vec<String>, f: &MemberFields) {
    out.extend([
        f.first_name.clone(),
        f.last_name.clone(),
        f.email.clone(),
        f.age.to_string(),
        f.institution_id.to_string(),
    ]);
}

// =============================================================================
// Response Encoding
// =============================================================================

/// Encode a response to its text lines (without terminators)
pub fn encode_response(response: &Response) -> Vec<String> {
    match response {
        Response::Ok { entity, action, id } => vec![match action {
            Action::Created => format!("OK: {} created with ID: {}", entity.title(), id),
            Action::Updated => format!("OK: {} updated (ID: {})", entity.title(), id),
            Action::Deleted => format!("OK: {} deleted (ID: {})", entity.title(), id),
        }],
        Response::NotFound { entity, id } => {
            vec![format!("NOT_FOUND: No {} found with ID: {}", entity.noun(), id)]
        }
        Response::List(Listing::Institutions(rows)) => encode_institutions(rows),
        Response::List(Listing::Members(rows)) => encode_members(rows),
        Response::StorageError { detail } => vec![format!("ERROR: {}", single_line(detail))],
        Response::ProtocolError { reason } => vec![format!("ERROR: {}", single_line(reason))],
        Response::SessionEnd => vec![SESSION_END_MESSAGE.to_string()],
    }
}

/// Error text must not break line framing
fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

fn encode_institutions(rows: &[Institution]) -> Vec<String> {
    if rows.is_empty() {
        return vec![NO_INSTITUTIONS.to_string()];
    }

    let banner = "=".repeat(INSTITUTION_BANNER_WIDTH);
    let mut lines = Vec::with_capacity(rows.len() + 5);
    lines.push(banner.clone());
    lines.push(format!("{:^width$}", "INSTITUTIONS", width = INSTITUTION_BANNER_WIDTH));
    lines.push(banner.clone());
    for row in rows {
        lines.push(format!(
            "ID: {:<4} | {:<30} | {:<20} | {}",
            row.id,
            single_line(&row.name),
            single_line(&row.city),
            single_line(&row.country)
        ));
    }
    lines.push(banner);
    lines.push(format!("Total: {}", rows.len()));
    lines
}

fn encode_members(rows: &[Member]) -> Vec<String> {
    if rows.is_empty() {
        return vec![NO_MEMBERS.to_string()];
    }

    let banner = "=".repeat(MEMBER_BANNER_WIDTH);
    let mut lines = Vec::with_capacity(rows.len() + 5);
    lines.push(banner.clone());
    lines.push(format!("{:^width$}", "MEMBERS", width = MEMBER_BANNER_WIDTH));
    lines.push(banner.clone());
    for row in rows {
        lines.push(format!(
            "ID: {:<4} | {:<15} {:<15} | {:<25} | Age: {:<3} | {}",
            row.id,
            single_line(&row.first_name),
            single_line(&row.last_name),
            single_line(&row.email),
            row.age,
            single_line(row.institution_name.as_deref().unwrap_or("Unassigned"))
        ));
    }
    lines.push(banner);
    lines.push(format!("Total: {}", rows.len()));
    lines
}

/// Whether `line` is the last line of a response
pub fn is_final_line(line: &str) -> bool {
    const FINAL_PREFIXES: [&str; 4] = ["OK:", "NOT_FOUND:", "ERROR:", "Total:"];

    FINAL_PREFIXES.iter().any(|prefix| line.starts_with(prefix))
        || line == NO_INSTITUTIONS
        || line == NO_MEMBERS
}

/// Encode a response as one datagram payload
///
/// Lines are joined with `\n` and cut to `max_len` bytes on a UTF-8 boundary.
pub fn encode_datagram(response: &Response, max_len: usize) -> Bytes {
    let text = match response {
        Response::SessionEnd => DATAGRAM_GOODBYE_MESSAGE.to_string(),
        other => encode_response(other).join("\n"),
    };

    let mut end = text.len().min(max_len);
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    let mut payload = BytesMut::with_capacity(end);
    payload.put_slice(&text.as_bytes()[..end]);
    payload.freeze()
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one `\n`-terminated line, without its terminator
///
/// Returns `None` at end of stream. Invalid UTF-8 is replaced rather than
/// rejected so it surfaces as a malformed command. A line longer than
/// `MAX_LINE_SIZE` bytes (terminator excluded) is a protocol error.
pub fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let mut buf = Vec::new();
    let limit = MAX_LINE_SIZE as u64 + 2;
    let n = reader.by_ref().take(limit).read_until(b'\n', &mut buf)?;
    if n == 0 {
        return Ok(None);
    }

    while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
        buf.pop();
    }
    if buf.len() > MAX_LINE_SIZE {
        return Err(RosterError::Protocol(format!(
            "line exceeds {} bytes",
            MAX_LINE_SIZE
        )));
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// Write a command line to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(encode_command(command).as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Write every line of a response, flushing once after the group
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    for line in encode_response(response) {
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Read response lines up to and including the final one
pub fn read_response<R: BufRead>(reader: &mut R) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    loop {
        let line = read_line(reader)?.ok_or_else(|| {
            RosterError::Network("connection closed before response completed".to_string())
        })?;
        let done = is_final_line(&line);
        lines.push(line);
        if done {
            return Ok(lines);
        }
    }
}
