//! Both listeners plus the store, started and stopped together

use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;

use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::{Result, RosterError};
use crate::store::Store;
use super::{DatagramServer, Server, ShutdownSignal};

/// Which front ends to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Udp,
    Both,
}

impl Transport {
    fn tcp(&self) -> bool {
        matches!(self, Transport::Tcp | Transport::Both)
    }

    fn udp(&self) -> bool {
        matches!(self, Transport::Udp | Transport::Both)
    }
}

/// Bound listeners sharing one store and one shutdown signal
pub struct Daemon {
    store: Arc<dyn Store>,
    tcp: Option<Server>,
    udp: Option<DatagramServer>,
    shutdown: ShutdownSignal,
}

impl Daemon {
    /// Bind the requested listeners; nothing is served until `run`
    pub fn bind(config: Config, store: Arc<dyn Store>, transport: Transport) -> Result<Self> {
        let dispatcher = Dispatcher::new(Arc::clone(&store));
        let shutdown = ShutdownSignal::new();

        let tcp = if transport.tcp() {
            Some(Server::bind(config.clone(), dispatcher.clone())?.with_shutdown(shutdown.clone()))
        } else {
            None
        };
        let udp = if transport.udp() {
            Some(DatagramServer::bind(config, dispatcher)?.with_shutdown(shutdown.clone()))
        } else {
            None
        };

        Ok(Self {
            store,
            tcp,
            udp,
            shutdown,
        })
    }

    pub fn tcp_addr(&self) -> Option<SocketAddr> {
        self.tcp.as_ref().and_then(|s| s.local_addr().ok())
    }

    pub fn udp_addr(&self) -> Option<SocketAddr> {
        self.udp.as_ref().and_then(|s| s.local_addr().ok())
    }

    /// Trigger this to stop both listeners
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Serve until shutdown, drain, then close the store (blocking)
    ///
    /// If one listener fails the other is stopped too; the first error wins.
    pub fn run(self) -> Result<()> {
        let Daemon {
            store,
            tcp,
            udp,
            shutdown,
        } = self;

        let result = thread::scope(|scope| {
            let tcp_handle = tcp.as_ref().map(|server| {
                let shutdown = shutdown.clone();
                scope.spawn(move || {
                    let result = server.run();
                    if result.is_err() {
                        shutdown.trigger();
                    }
                    result
                })
            });
            let udp_handle = udp.as_ref().map(|server| {
                let shutdown = shutdown.clone();
                scope.spawn(move || {
                    let result = server.run();
                    if result.is_err() {
                        shutdown.trigger();
                    }
                    result
                })
            });

            let mut first_error = None;
            for handle in [tcp_handle, udp_handle].into_iter().flatten() {
                let outcome = handle
                    .join()
                    .unwrap_or_else(|_| Err(RosterError::Network("listener panicked".to_string())));
                if let Err(e) = outcome {
                    first_error.get_or_insert(e);
                }
            }
            first_error.map_or(Ok(()), Err)
        });

        if let Err(e) = store.close() {
            tracing::warn!("Store close failed: {}", e);
            result?;
            return Err(e);
        }
        result
    }
}
