//! Network Module
//!
//! TCP and UDP front ends over one shared `Dispatcher`.
//!
//! ## Architecture
//! - TCP: single acceptor thread, one worker thread per session
//! - UDP: single thread, strictly sequential receive → dispatch → reply
//! - Both stop on a shared `ShutdownSignal`

mod shutdown;
mod server;
mod connection;
mod datagram;
mod daemon;

pub use shutdown::ShutdownSignal;
pub use server::Server;
pub use connection::Connection;
pub use datagram::DatagramServer;
pub use daemon::{Daemon, Transport};
