//! UDP Server
//!
//! One datagram in, one datagram back to the sender. No sessions.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};

use bytes::Bytes;

use crate::config::{Config, MAX_UDP_PAYLOAD};
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::protocol::{decode_command, encode_datagram};
use super::ShutdownSignal;

/// UDP server for Roster
///
/// Requests are served strictly one at a time, and each reply goes to the
/// address the request came from.
pub struct DatagramServer {
    config: Config,
    dispatcher: Dispatcher,
    socket: UdpSocket,
    shutdown: ShutdownSignal,
}

impl DatagramServer {
    /// Bind the socket described by `config.udp_listen_addr`
    pub fn bind(config: Config, dispatcher: Dispatcher) -> Result<Self> {
        config.validate()?;
        let socket = UdpSocket::bind(&config.udp_listen_addr)?;

        // Bounded receive so the loop notices shutdown between datagrams
        socket.set_read_timeout(Some(config.shutdown_poll_interval()))?;

        Ok(Self {
            config,
            dispatcher,
            socket,
            shutdown: ShutdownSignal::new(),
        })
    }

    /// Stop when `signal` is triggered instead of a private signal
    pub fn with_shutdown(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown = signal;
        self
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Handle that stops this server when triggered
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.trigger();
    }

    /// Receive, dispatch and reply until shutdown (blocking)
    ///
    /// Oversized datagrams are truncated to the buffer by the OS. Failed
    /// receives or sends are logged and the loop carries on.
    pub fn run(&self) -> Result<()> {
        let local_addr = self.local_addr()?;
        let mut buf = vec![0u8; self.config.datagram_buffer_size];

        tracing::info!("UDP listener on {}", local_addr);

        while !self.shutdown.is_triggered() {
            let (len, peer) = match self.socket.recv_from(&mut buf) {
                Ok(received) => received,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    continue
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    // Windows surfaces ICMP port-unreachable here as a reset
                    tracing::warn!("Receive failed on {}: {}", local_addr, e);
                    continue;
                }
            };

            let reply = self.handle_datagram(&buf[..len], peer);

            if let Err(e) = self.socket.send_to(&reply, peer) {
                tracing::warn!("Reply to {} failed: {}", peer, e);
            }
        }

        tracing::info!("UDP listener on {} stopped", local_addr);
        Ok(())
    }

    /// Turn one request payload into one reply payload
    ///
    /// The reply is cut to whichever is smaller: the configured buffer or
    /// what one UDP datagram can carry.
    pub fn handle_datagram(&self, payload: &[u8], peer: SocketAddr) -> Bytes {
        let text = String::from_utf8_lossy(payload);
        tracing::trace!("Datagram from {}: {:?}", peer, text);

        let response = self.dispatcher.dispatch(decode_command(&text));
        encode_datagram(&response, self.max_reply_size())
    }

    fn max_reply_size(&self) -> usize {
        self.config.datagram_buffer_size.min(MAX_UDP_PAYLOAD)
    }
}
