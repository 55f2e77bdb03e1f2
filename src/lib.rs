//! # Roster
//!
//! An institution and member registry served over a pipe-delimited text
//! protocol, on both TCP and UDP:
//! - One worker thread per TCP session, strictly ordered request/response
//! - Stateless UDP front end, one reply datagram per request
//! - Pluggable persistence behind the `Store` trait
//! - Optional write-ahead log for a durable store
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────┐      ┌──────────────────────────┐
//! │      TCP Listener        │      │      UDP Listener        │
//! │ (thread per connection)  │      │   (single recv loop)     │
//! └────────────┬─────────────┘      └────────────┬─────────────┘
//!              │      decode line / encode lines │
//!              └───────────────┬─────────────────┘
//!                              │
//! ┌────────────────────────────▼────────────────────────────────┐
//! │                     Command Dispatcher                      │
//! │            (stateless, one Store call per command)          │
//! └────────────────────────────┬────────────────────────────────┘
//!                              │
//!               ┌──────────────▼──────────────┐
//!               │         dyn Store           │
//!               └──────┬───────────────┬──────┘
//!                      │               │
//!               ┌──────▼──────┐ ┌──────▼──────┐
//!               │ MemoryStore │ │JournalStore │──► WAL
//!               └─────────────┘ └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod model;
pub mod wal;
pub mod store;
pub mod protocol;
pub mod dispatch;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{RosterError, Result};
pub use config::Config;
pub use dispatch::Dispatcher;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Roster
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
