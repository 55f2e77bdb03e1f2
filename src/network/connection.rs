//! Connection Handler
//!
//! Handles individual client connections.
//!
//! ## Session States
//! ```text
//! Reading ──► Dispatching ──► Writing ──┐
//!    ▲                                  │
//!    └──────────────────────────────────┤
//!                                       ▼
//!                                    Closing
//! ```
//! `Closing` is entered on end-of-stream, on any I/O error, after an
//! oversized line has been answered with `ERROR:`, or after the
//! acknowledgment of `SALIR` has been written.

use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::net::{Shutdown, TcpStream};
use std::time::Duration;

use crate::dispatch::Dispatcher;
use crate::error::{Result, RosterError};
use crate::protocol::{decode_command, read_line, write_response, Response};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Shared command router
    dispatcher: Dispatcher,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O over two handles to the same socket.
    pub fn new(stream: TcpStream, dispatcher: Dispatcher) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Responses are flushed as a group; no reason to wait on Nagle
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            dispatcher,
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 = none)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let read_stream = self.reader.get_ref();
        let write_stream = self.writer.get_ref();

        if read_ms > 0 {
            read_stream.set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            write_stream.set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Serve the session to completion, then release the socket
    ///
    /// Consumes the connection so cleanup happens exactly once on every path.
    pub fn run(mut self) -> Result<()> {
        let result = self.handle();
        self.close();
        result
    }

    /// Read, dispatch and answer commands until the session ends
    ///
    /// Peer disconnects and timeouts end the session quietly; other I/O
    /// errors are returned.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let line = match read_line(&mut self.reader) {
                Ok(Some(line)) => line,
                Ok(None) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(RosterError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Connection to {} dropped: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(RosterError::Io(ref e)) if is_timeout(e.kind()) => {
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(RosterError::Protocol(reason)) => {
                    // The rest of the line cannot be resynchronized
                    tracing::warn!("Closing {}: {}", self.peer_addr, reason);
                    let _ = write_response(&mut self.writer, &Response::protocol_error(reason));
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            tracing::trace!("Received from {}: {:?}", self.peer_addr, line);

            let response = self.dispatcher.dispatch(decode_command(&line));

            if let Err(e) = write_response(&mut self.writer, &response) {
                if let RosterError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }

            if response.ends_session() {
                tracing::debug!("Client {} requested disconnect", self.peer_addr);
                return Ok(());
            }
        }
    }

    /// Flush what we can and shut the socket down in both directions
    fn close(mut self) {
        let _ = self.writer.flush();
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
        tracing::debug!("Connection to {} closed", self.peer_addr);
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
    )
}

// Windows reports TimedOut where Unix reports WouldBlock
fn is_timeout(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
