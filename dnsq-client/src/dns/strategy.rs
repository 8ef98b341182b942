use crate::core::{DnsqError, ErrorKind};
use crate::dns::conn::Connection;
use crate::pool::{PoolStrategy, PooledClient};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Transport used to reach a nameserver.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Protocol {
    Udp,
    Tcp,
    Doh,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Udp => write!(f, "udp"),
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Doh => write!(f, "https"),
        }
    }
}

/// Key for pooled connections: a transport plus the host and port it connects to.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct EndpointKey {
    protocol: Protocol,
    host: String,
    port: u16,
}

impl EndpointKey {
    pub fn new(protocol: Protocol, host: impl Into<String>, port: u16) -> Self {
        Self {
            protocol,
            host: host.into(),
            port,
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "{}://[{}]:{}", self.protocol, self.host, self.port)
        } else {
            write!(f, "{}://{}:{}", self.protocol, self.host, self.port)
        }
    }
}

/// UDP sockets are connectionless so they are kept after almost any failure: a
/// late or lost datagram says nothing about the socket itself. Only errors that
/// show the socket can no longer be used cause it to be discarded.
#[derive(Debug, Default, Clone)]
pub struct UdpStrategy;

impl UdpStrategy {
    fn is_hard_fault(err: &DnsqError) -> bool {
        if err.kind() != ErrorKind::Transport {
            return false;
        }

        matches!(
            err.io_kind(),
            Some(
                io::ErrorKind::NotConnected
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::AddrNotAvailable
                    | io::ErrorKind::InvalidInput
                    | io::ErrorKind::UnexpectedEof
            )
        )
    }
}

impl PoolStrategy<EndpointKey, Connection> for UdpStrategy {
    fn is_reusable(&self, _client: &PooledClient<EndpointKey, Connection>) -> bool {
        true
    }

    fn handle_error(&self, _client: &PooledClient<EndpointKey, Connection>, err: &DnsqError) -> bool {
        !Self::is_hard_fault(err)
    }
}

/// TCP connections are discarded after any error since the stream may be left
/// in the middle of a frame, and after sitting idle long enough that the server
/// has likely closed them.
#[derive(Debug, Clone)]
pub struct TcpStrategy {
    max_idle_time: Duration,
}

impl TcpStrategy {
    pub const DEFAULT_MAX_IDLE_TIME: Duration = Duration::from_secs(120);

    pub fn new(max_idle_time: Duration) -> Self {
        Self { max_idle_time }
    }
}

impl Default for TcpStrategy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_IDLE_TIME)
    }
}

impl PoolStrategy<EndpointKey, Connection> for TcpStrategy {
    fn is_reusable(&self, client: &PooledClient<EndpointKey, Connection>) -> bool {
        client.released().elapsed() <= self.max_idle_time
    }

    fn handle_error(&self, _client: &PooledClient<EndpointKey, Connection>, _err: &DnsqError) -> bool {
        false
    }
}

/// DoH hosts that answered with something other than a DNS message.
///
/// Shared between the pool strategy that records failures and the client that
/// decides whether to try DoH for a server at all.
#[derive(Debug, Default)]
pub struct FailureMemory {
    hosts: Mutex<HashMap<String, Instant>>,
    ttl: Option<Duration>,
}

impl FailureMemory {
    /// Create a new instance where hosts are retried after `ttl` or never if `None`.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            hosts: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn mark_unsupported(&self, host: &str) {
        if let Ok(mut hosts) = self.hosts.lock() {
            hosts.insert(host.to_owned(), Instant::now());
        }
    }

    pub fn is_unsupported(&self, host: &str) -> bool {
        let mut hosts = match self.hosts.lock() {
            Ok(h) => h,
            Err(_) => return false,
        };

        match (hosts.get(host), self.ttl) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(marked), Some(ttl)) => {
                if marked.elapsed() > ttl {
                    hosts.remove(host);
                    false
                } else {
                    true
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct DohStrategy {
    memory: Arc<FailureMemory>,
}

impl DohStrategy {
    pub fn new(memory: Arc<FailureMemory>) -> Self {
        Self { memory }
    }

    pub fn memory(&self) -> &FailureMemory {
        &self.memory
    }
}

impl PoolStrategy<EndpointKey, Connection> for DohStrategy {
    fn is_reusable(&self, _client: &PooledClient<EndpointKey, Connection>) -> bool {
        true
    }

    fn handle_error(&self, client: &PooledClient<EndpointKey, Connection>, err: &DnsqError) -> bool {
        match err.kind() {
            ErrorKind::Transport | ErrorKind::Timeout => true,
            _ => {
                tracing::debug!(message = "marking DoH host as unsupported", server = %client.key(), err = %err);
                self.memory.mark_unsupported(client.key().host());
                false
            }
        }
    }
}

/// Per-transport strategies selected by the protocol of each pooled connection.
#[derive(Debug, Clone)]
pub struct TransportStrategy {
    udp: UdpStrategy,
    tcp: TcpStrategy,
    doh: DohStrategy,
}

impl TransportStrategy {
    pub fn new(udp: UdpStrategy, tcp: TcpStrategy, doh: DohStrategy) -> Self {
        Self { udp, tcp, doh }
    }

    pub fn failure_memory(&self) -> &FailureMemory {
        self.doh.memory()
    }
}

impl PoolStrategy<EndpointKey, Connection> for TransportStrategy {
    fn is_reusable(&self, client: &PooledClient<EndpointKey, Connection>) -> bool {
        match client.key().protocol() {
            Protocol::Udp => self.udp.is_reusable(client),
            Protocol::Tcp => self.tcp.is_reusable(client),
            Protocol::Doh => self.doh.is_reusable(client),
        }
    }

    fn handle_error(&self, client: &PooledClient<EndpointKey, Connection>, err: &DnsqError) -> bool {
        match client.key().protocol() {
            Protocol::Udp => self.udp.handle_error(client, err),
            Protocol::Tcp => self.tcp.handle_error(client, err),
            Protocol::Doh => self.doh.handle_error(client, err),
        }
    }
}
