//! Clients
//!
//! Blocking TCP and UDP clients that speak the text protocol.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs, UdpSocket};
use std::time::Duration;

use crate::config::MAX_DATAGRAM_SIZE;
use crate::error::{Result, RosterError};
use crate::protocol::{check_command, encode_command, read_response, write_command, Command};

/// Default wait for a UDP reply
pub const DEFAULT_UDP_TIMEOUT_MS: u64 = 5000;

/// One TCP session
pub struct TcpClient {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl TcpClient {
    /// Connect to a server
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Give up on a response after this long (`None` = wait forever)
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Send a command and collect every line of its response
    ///
    /// Commands whose fields would not survive the wire are refused before
    /// anything is sent.
    pub fn send(&mut self, command: &Command) -> Result<Vec<String>> {
        check_command(command)?;
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    /// Send `SALIR` and return the server's goodbye line
    pub fn close(mut self) -> Result<Vec<String>> {
        self.send(&Command::Terminate)
    }
}

/// Stateless UDP requester
pub struct UdpClient {
    socket: UdpSocket,
}

impl UdpClient {
    /// Bind an ephemeral local port and aim it at `server`
    pub fn connect(server: impl ToSocketAddrs, timeout: Duration) -> Result<Self> {
        let server = server
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| RosterError::Network("server address did not resolve".to_string()))?;

        let local = if server.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(local)?;
        socket.connect(server)?;
        socket.set_read_timeout(Some(timeout))?;

        Ok(Self { socket })
    }

    /// Send one command datagram and wait for the one reply
    ///
    /// A lost request or reply surfaces as a timeout error; nothing is retried.
    pub fn send(&self, command: &Command) -> Result<Vec<String>> {
        check_command(command)?;
        let line = encode_command(command);
        self.socket.send(line.as_bytes())?;

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let len = self.socket.recv(&mut buf)?;

        let text = std::str::from_utf8(&buf[..len])
            .map_err(|e| RosterError::Protocol(format!("reply is not UTF-8: {}", e)))?;
        Ok(text.lines().map(str::to_string).collect())
    }
}
