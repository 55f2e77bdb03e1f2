//! TCP Server
//!
//! Accepts connections and hands each one to its own worker thread.
//!
//! ## Shutdown
//! 1. Stop accepting (the accept loop polls the `ShutdownSignal`)
//! 2. Half-close the read side of every live session, so idle workers see
//!    end-of-stream while busy ones still finish their current response
//! 3. Wait for all workers to exit

use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::sync::WaitGroup;
use parking_lot::Mutex;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::protocol::SERVER_BUSY_MESSAGE;
use super::{Connection, ShutdownSignal};

/// Live sessions by id; each entry is a clone of the session's socket
type SessionRegistry = Arc<Mutex<HashMap<u64, TcpStream>>>;

/// TCP server for Roster
pub struct Server {
    config: Config,
    dispatcher: Dispatcher,
    listener: TcpListener,
    shutdown: ShutdownSignal,
    sessions: SessionRegistry,
    next_session_id: AtomicU64,
}

impl Server {
    /// Bind the listener described by `config.tcp_listen_addr`
    pub fn bind(config: Config, dispatcher: Dispatcher) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(&config.tcp_listen_addr)?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            dispatcher,
            listener,
            shutdown: ShutdownSignal::new(),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_session_id: AtomicU64::new(1),
        })
    }

    /// Stop when `signal` is triggered instead of a private signal
    pub fn with_shutdown(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown = signal;
        self
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle that stops this server when triggered
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Number of sessions currently being served
    pub fn active_connections(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Run the accept loop until shutdown, then drain sessions (blocking)
    pub fn run(&self) -> Result<()> {
        let local_addr = self.local_addr()?;
        let poll = self.config.shutdown_poll_interval();
        let workers = WaitGroup::new();

        tracing::info!("TCP listener on {}", local_addr);

        while !self.shutdown.is_triggered() {
            match self.listener.accept() {
                Ok((stream, peer)) => self.spawn_session(stream, peer, &workers),
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(poll),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => {
                    // Per-connection accept failures (e.g. reset before accept)
                    tracing::warn!("Accept failed on {}: {}", local_addr, e);
                    thread::sleep(poll);
                }
            }
        }

        let live = {
            let sessions = self.sessions.lock();
            for stream in sessions.values() {
                let _ = stream.shutdown(Shutdown::Read);
            }
            sessions.len()
        };
        tracing::info!("TCP listener on {} stopping, draining {} session(s)", local_addr, live);

        workers.wait();
        tracing::info!("TCP listener on {} stopped", local_addr);
        Ok(())
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr, workers: &WaitGroup) {
        // Accepted sockets may inherit the listener's non-blocking mode
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Dropping connection from {}: {}", peer, e);
            return;
        }

        if let Some(max) = self.config.max_connections {
            if self.active_connections() >= max {
                tracing::warn!("Rejecting {}: {} sessions already active", peer, max);
                let mut stream = stream;
                let _ = writeln!(stream, "{}", SERVER_BUSY_MESSAGE);
                let _ = stream.shutdown(Shutdown::Both);
                return;
            }
        }

        let handle = match stream.try_clone() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!("Dropping connection from {}: {}", peer, e);
                return;
            }
        };

        let id = self.next_session_id.fetch_add(1, Ordering::Relaxed);
        self.sessions.lock().insert(id, handle);
        let guard = SessionGuard {
            id,
            sessions: Arc::clone(&self.sessions),
        };

        let dispatcher = self.dispatcher.clone();
        let worker = workers.clone();
        let (read_ms, write_ms) = (self.config.read_timeout_ms, self.config.write_timeout_ms);

        tracing::debug!("Session {} accepted from {}", id, peer);

        let spawned = thread::Builder::new()
            .name(format!("roster-session-{}", id))
            .spawn(move || {
                let _guard = guard;
                let _worker = worker;

                let mut connection = match Connection::new(stream, dispatcher) {
                    Ok(connection) => connection,
                    Err(e) => {
                        tracing::warn!("Session {} setup failed: {}", id, e);
                        return;
                    }
                };
                if let Err(e) = connection.set_timeouts(read_ms, write_ms) {
                    tracing::warn!("Session {} setup failed: {}", id, e);
                    return;
                }
                if let Err(e) = connection.run() {
                    tracing::warn!("Session {} ended with error: {}", id, e);
                }
            });

        if let Err(e) = spawned {
            tracing::warn!("Could not spawn worker for {}: {}", peer, e);
        }
    }
}

/// Removes a session from the registry when its worker ends, however it ends
struct SessionGuard {
    id: u64,
    sessions: SessionRegistry,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.lock().remove(&self.id);
    }
}
