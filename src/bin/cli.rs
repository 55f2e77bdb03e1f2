//! Roster CLI Client
//!
//! Command-line interface for sending one command to a Roster server.

use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use roster::client::{TcpClient, UdpClient, DEFAULT_UDP_TIMEOUT_MS};
use roster::model::{InstitutionFields, MemberFields};
use roster::protocol::{check_command, decode_command, Command};

/// Roster CLI
#[derive(Parser, Debug)]
#[command(name = "roster-cli")]
#[command(about = "CLI for the Roster registry")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    server: String,

    /// Transport to use (UDP servers usually listen on port 5001)
    #[arg(short, long, value_enum, default_value_t = TransportArg::Tcp)]
    transport: TransportArg,

    /// How long to wait for a UDP reply (milliseconds)
    #[arg(long, default_value_t = DEFAULT_UDP_TIMEOUT_MS)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum TransportArg {
    Tcp,
    Udp,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Register an institution
    AddInstitution {
        name: String,
        city: String,
        country: String,
    },

    /// List all institutions
    ListInstitutions,

    /// Replace every field of an institution
    UpdateInstitution {
        id: i64,
        name: String,
        city: String,
        country: String,
    },

    /// Delete an institution
    DeleteInstitution { id: i64 },

    /// Register a member
    AddMember {
        first_name: String,
        last_name: String,
        email: String,
        age: i32,
        institution_id: i64,
    },

    /// List all members
    ListMembers,

    /// Replace every field of a member
    UpdateMember {
        id: i64,
        first_name: String,
        last_name: String,
        email: String,
        age: i32,
        institution_id: i64,
    },

    /// Delete a member
    DeleteMember { id: i64 },

    /// Send a raw protocol line, e.g. `CONSULTAR_UNIVERSIDADES`
    Raw { line: String },
}

impl From<Commands> for Command {
    fn from(cmd: Commands) -> Self {
        match cmd {
            Commands::AddInstitution {
                name,
                city,
                country,
            } => Command::CreateInstitution(InstitutionFields::new(name, city, country)),
            Commands::ListInstitutions => Command::ListInstitutions,
            Commands::UpdateInstitution {
                id,
                name,
                city,
                country,
            } => Command::UpdateInstitution {
                id,
                fields: InstitutionFields::new(name, city, country),
            },
            Commands::DeleteInstitution { id } => Command::DeleteInstitution { id },
            Commands::AddMember {
                first_name,
                last_name,
                email,
                age,
                institution_id,
            } => Command::CreateMember(MemberFields::new(
                first_name,
                last_name,
                email,
                age,
                institution_id,
            )),
            Commands::ListMembers => Command::ListMembers,
            Commands::UpdateMember {
                id,
                first_name,
                last_name,
                email,
                age,
                institution_id,
            } => Command::UpdateMember {
                id,
                fields: MemberFields::new(first_name, last_name, email, age, institution_id),
            },
            Commands::DeleteMember { id } => Command::DeleteMember { id },
            Commands::Raw { line } => decode_command(&line),
        }
    }
}

fn main() {
    let args = Args::parse();
    let command = Command::from(args.command);

    if let Err(e) = check_command(&command) {
        eprintln!("Error: {}", e);
        std::process::exit(2);
    }

    // Raw lines are sent as typed, even if they do not decode locally
    let result = match args.transport {
        TransportArg::Tcp => TcpClient::connect(&args.server).and_then(|mut client| {
            let lines = client.send(&command)?;
            if command != Command::Terminate {
                client.close()?;
            }
            Ok(lines)
        }),
        TransportArg::Udp => {
            UdpClient::connect(&args.server, Duration::from_millis(args.timeout_ms))
                .and_then(|client| client.send(&command))
        }
    };

    match result {
        Ok(lines) => {
            for line in lines {
                println!("{}", line);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
