use crate::core::{DnsqError, ErrorKind};
use crate::dns::conn::{Connection, TcpConnection, UdpConnection, DEFAULT_UDP_PAYLOAD_SIZE};
use crate::dns::core::{RecordClass, RecordType};
use crate::dns::doh::{DohConnection, DohMethod, HttpClient, ReqwestClient};
use crate::dns::message::{Flags, Message, MessageId, Question, Record, ResponseCode};
use crate::dns::name::Name;
use crate::dns::rdata::RecordRegistry;
use crate::dns::resolv::ResolvConf;
use crate::dns::strategy::{
    DohStrategy, EndpointKey, FailureMemory, Protocol, TcpStrategy, TransportStrategy, UdpStrategy,
};
use crate::net::{tcp_connect, udp_connect, TlsConfig};
use crate::pool::{ClientFactory, ClientPool, ClientPoolConfig};
use crate::timeout::Timeout;
use rand::seq::SliceRandom;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_PORT: u16 = 53;
const DEFAULT_DOH_PORT: u16 = 443;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_ATTEMPTS: u8 = 1;
const DEFAULT_POOL_MAX_IDLE: u64 = 4;
/// UDP payload size advertised in EDNS OPT records when none is configured.
pub const DEFAULT_EDNS_PAYLOAD_SIZE: u16 = 1232;

/// Hook for attaching a signature (e.g. TSIG) to outgoing requests.
///
/// The signer is given the request and its encoded form and returns a record
/// that is appended as the last record of the additional section.
pub trait Signer: Send + Sync + fmt::Debug {
    fn sign(&self, msg: &Message, bytes: &[u8]) -> Result<Record, DnsqError>;
}

/// DNS-over-HTTPS endpoint offered by a nameserver.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DohEndpoint {
    pub host: String,
    pub port: u16,
}

impl DohEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Nameserver {
    pub addr: SocketAddr,
    pub doh: Option<DohEndpoint>,
}

impl Nameserver {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, doh: None }
    }

    pub fn with_doh(mut self, doh: DohEndpoint) -> Self {
        self.doh = Some(doh);
        self
    }
}

impl From<SocketAddr> for Nameserver {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr)
    }
}

/// Behavior of a `DnsClient` independent of how connections are established.
#[derive(Debug, Clone)]
pub struct DnsClientConfig {
    pub nameservers: Vec<Nameserver>,
    /// Bound for acquiring a connection and, separately, for each exchange.
    pub timeout: Duration,
    /// Number of times the list of nameservers is walked before giving up.
    pub attempts: u8,
    /// Shuffle the nameservers for each query instead of always starting with the first.
    pub rotate: bool,
    pub force_tcp: bool,
    /// Add an EDNS OPT record advertising this UDP payload size to each request.
    pub edns_payload_size: Option<u16>,
    pub dnssec_ok: bool,
    /// Use DNS-over-HTTPS for nameservers that offer it.
    pub prefer_doh: bool,
    /// Treat any response code other than NOERROR as a failure of the nameserver.
    pub failover_on_rcode: bool,
    pub pool_max_idle: u64,
    pub tcp_max_idle_time: Duration,
    /// How long a DoH host that failed to answer with a DNS message is skipped, forever if `None`.
    pub doh_failure_ttl: Option<Duration>,
    pub signer: Option<Arc<dyn Signer>>,
}

impl Default for DnsClientConfig {
    fn default() -> Self {
        Self {
            nameservers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            attempts: DEFAULT_ATTEMPTS,
            rotate: false,
            force_tcp: false,
            edns_payload_size: None,
            dnssec_ok: false,
            prefer_doh: false,
            failover_on_rcode: true,
            pool_max_idle: DEFAULT_POOL_MAX_IDLE,
            tcp_max_idle_time: TcpStrategy::DEFAULT_MAX_IDLE_TIME,
            doh_failure_ttl: None,
            signer: None,
        }
    }
}

impl From<ResolvConf> for DnsClientConfig {
    fn from(conf: ResolvConf) -> Self {
        let mut nameservers: Vec<Nameserver> = conf.nameservers.into_iter().map(Nameserver::new).collect();
        if nameservers.is_empty() {
            // Same fallback as the system resolver when no nameservers are configured
            nameservers.push(Nameserver::new(SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))));
        }

        let defaults = Self::default();
        Self {
            nameservers,
            timeout: conf.options.timeout.unwrap_or(defaults.timeout),
            attempts: conf.options.attempts.unwrap_or(defaults.attempts),
            rotate: conf.options.rotate.unwrap_or(defaults.rotate),
            force_tcp: conf.options.use_vc.unwrap_or(defaults.force_tcp),
            edns_payload_size: conf
                .options
                .edns0
                .filter(|e| *e)
                .map(|_| DEFAULT_EDNS_PAYLOAD_SIZE),
            ..defaults
        }
    }
}

/// Options for establishing new connections.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Local address (and port, if non-zero) to bind UDP and TCP sockets to.
    pub local_addr: Option<SocketAddr>,
    pub doh_method: DohMethod,
    pub doh_path: String,
    pub tls: TlsConfig,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            local_addr: None,
            doh_method: DohMethod::default(),
            doh_path: "/dns-query".to_owned(),
            tls: TlsConfig::default(),
        }
    }
}

/// `ClientFactory` that creates real UDP, TCP, and DNS-over-HTTPS connections.
#[derive(Debug)]
pub struct DefaultConnectionFactory {
    options: ConnectionOptions,
    udp_payload_size: u16,
    http: Arc<dyn HttpClient>,
}

impl DefaultConnectionFactory {
    /// Create a factory using a `reqwest` based HTTP client for DNS-over-HTTPS.
    pub async fn new(config: &DnsClientConfig, options: ConnectionOptions) -> Result<Self, DnsqError> {
        let http = ReqwestClient::new(&options.tls, config.timeout).await?;
        Ok(Self::with_http_client(config, options, Arc::new(http)))
    }

    pub fn with_http_client(config: &DnsClientConfig, options: ConnectionOptions, http: Arc<dyn HttpClient>) -> Self {
        Self {
            options,
            udp_payload_size: config.edns_payload_size.unwrap_or(DEFAULT_UDP_PAYLOAD_SIZE),
            http,
        }
    }

    fn server(key: &EndpointKey) -> Result<SocketAddr, DnsqError> {
        key.host()
            .parse::<IpAddr>()
            .map(|ip| SocketAddr::new(ip, key.port()))
            .map_err(|e| DnsqError::configuration_cause(format!("invalid nameserver address {}", key), e))
    }

    fn doh_uri(&self, key: &EndpointKey) -> String {
        let host = if key.host().contains(':') {
            format!("[{}]", key.host())
        } else {
            key.host().to_owned()
        };

        if key.port() == DEFAULT_DOH_PORT {
            format!("https://{}{}", host, self.options.doh_path)
        } else {
            format!("https://{}:{}{}", host, key.port(), self.options.doh_path)
        }
    }
}

impl ClientFactory<EndpointKey, Connection> for DefaultConnectionFactory {
    async fn make(&self, key: &EndpointKey) -> Result<Connection, DnsqError> {
        match key.protocol() {
            Protocol::Udp => {
                let (read, write) = udp_connect(Self::server(key)?, self.options.local_addr).await?;
                Ok(Connection::Udp(UdpConnection::new(read, write, self.udp_payload_size)))
            }
            Protocol::Tcp => {
                let (read, write) = tcp_connect(Self::server(key)?, self.options.local_addr).await?;
                Ok(Connection::Tcp(TcpConnection::new(read, write)))
            }
            Protocol::Doh => Ok(Connection::Doh(DohConnection::new(
                self.doh_uri(key),
                self.options.doh_method,
                self.http.clone(),
            ))),
        }
    }
}

/// Outcome of a single request sent to a single endpoint.
#[derive(Debug)]
pub struct QueryAttempt {
    endpoint: EndpointKey,
    request: Vec<u8>,
    error: Option<(ErrorKind, String)>,
}

impl QueryAttempt {
    pub fn endpoint(&self) -> &EndpointKey {
        &self.endpoint
    }

    /// Encoded request that was sent.
    pub fn request(&self) -> &[u8] {
        &self.request
    }

    /// Why the attempt failed, `None` if it produced the response.
    pub fn error(&self) -> Option<&str> {
        self.error.as_ref().map(|(_, e)| e.as_str())
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|(k, _)| *k)
    }
}

/// Every endpoint tried while executing a query, in order.
#[derive(Debug, Default)]
pub struct QueryLog {
    attempts: Vec<QueryAttempt>,
}

impl QueryLog {
    pub fn attempts(&self) -> &[QueryAttempt] {
        &self.attempts
    }

    pub fn last_error(&self) -> Option<&str> {
        self.attempts.iter().rev().find_map(|a| a.error())
    }
}

/// DNS client that sends queries to a list of nameservers over pooled
/// UDP, TCP, or DNS-over-HTTPS connections, moving on to the next
/// nameserver when one fails.
#[derive(Debug)]
pub struct DnsClient<F = DefaultConnectionFactory>
where
    F: ClientFactory<EndpointKey, Connection> + Send + Sync,
{
    config: DnsClientConfig,
    pool: ClientPool<EndpointKey, Connection, F, TransportStrategy>,
    memory: Arc<FailureMemory>,
    registry: &'static RecordRegistry,
}

impl<F> DnsClient<F>
where
    F: ClientFactory<EndpointKey, Connection> + Send + Sync,
{
    pub fn new(config: DnsClientConfig, factory: F) -> Self {
        let memory = Arc::new(FailureMemory::new(config.doh_failure_ttl));
        let strategy = TransportStrategy::new(
            UdpStrategy,
            TcpStrategy::new(config.tcp_max_idle_time),
            DohStrategy::new(memory.clone()),
        );
        let pool_config = ClientPoolConfig {
            name: "dns".to_owned(),
            max_idle: config.pool_max_idle,
        };

        Self {
            pool: ClientPool::new(pool_config, factory, strategy),
            memory,
            registry: RecordRegistry::standard(),
            config,
        }
    }

    /// Use `registry` for encoding and decoding record data instead of the standard one.
    pub fn with_registry(mut self, registry: &'static RecordRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &DnsClientConfig {
        &self.config
    }

    /// Hosts that have been found not to support DNS-over-HTTPS.
    pub fn failure_memory(&self) -> &FailureMemory {
        &self.memory
    }

    /// Perform a DNS lookup with the configured nameservers using a new recursive query.
    pub async fn resolve(&self, name: Name, rtype: RecordType, rclass: RecordClass) -> Result<Message, DnsqError> {
        let id = MessageId::random();
        let flags = Flags::default().set_recursion_desired();
        let question = Question::new(name, rtype).set_qclass(rclass);
        let message = Message::new(id, flags).add_question(question);

        self.exchange(&message).await
    }

    /// Send `msg` to the configured nameservers and return the first acceptable response.
    pub async fn exchange(&self, msg: &Message) -> Result<Message, DnsqError> {
        self.exchange_logged(msg).await.0
    }

    /// Like `exchange` but additionally return every attempt made along the way.
    pub async fn exchange_logged(&self, msg: &Message) -> (Result<Message, DnsqError>, QueryLog) {
        let mut log = QueryLog::default();
        let res = self.execute(msg, &mut log).await;
        (res, log)
    }

    async fn execute(&self, msg: &Message, log: &mut QueryLog) -> Result<Message, DnsqError> {
        let (req, bytes) = self.prepare(msg)?;
        if self.config.nameservers.is_empty() {
            return Err(DnsqError::configuration("no nameservers configured"));
        }

        let mut servers: Vec<&Nameserver> = self.config.nameservers.iter().collect();
        if self.config.rotate {
            servers.shuffle(&mut rand::thread_rng());
        }

        let attempts = self.config.attempts.max(1);
        let mut last = None;
        for attempt in 0..attempts {
            for server in servers.iter() {
                match self.query_server(server, &req, &bytes, log).await {
                    Ok(res) => return Ok(res),
                    Err(e) => {
                        tracing::debug!(message = "nameserver failed", attempt = attempt + 1, max_attempts = attempts, server = %server.addr, err = %e);
                        last = Some(e);
                    }
                }
            }
        }

        Err(last.unwrap_or_else(|| DnsqError::transport("all nameservers failed")))
    }

    /// Add EDNS and signature records as configured and encode the request.
    fn prepare(&self, msg: &Message) -> Result<(Message, Vec<u8>), DnsqError> {
        let mut req = msg.clone();
        if let Some(size) = self.config.edns_payload_size {
            if req.opt().is_none() {
                req = req.add_extra(Record::opt(size, self.config.dnssec_ok));
            }
        }

        let mut bytes = req.to_bytes()?;
        if let Some(signer) = &self.config.signer {
            let sig = signer.sign(&req, &bytes)?;
            req = req.add_extra(sig);
            bytes = req.to_bytes()?;
        }

        if bytes.len() > usize::from(u16::MAX) {
            return Err(DnsqError::invalid_data(format!(
                "encoded request of {} bytes is too large",
                bytes.len()
            )));
        }

        Ok((req, bytes))
    }

    async fn query_server(
        &self,
        server: &Nameserver,
        req: &Message,
        bytes: &[u8],
        log: &mut QueryLog,
    ) -> Result<Message, DnsqError> {
        if let Some(doh) = self.doh_endpoint(server) {
            let key = EndpointKey::new(Protocol::Doh, doh.host.as_str(), doh.port);
            match self.attempt(&key, req, bytes, log).await {
                Ok(res) => return Ok(res),
                Err(e) => {
                    if !self.memory.is_unsupported(&doh.host) {
                        return Err(e);
                    }

                    tracing::debug!(message = "DoH not supported, falling back", server = %key, err = %e);
                }
            }
        }

        let protocol = self.transport(req, bytes);
        let host = server.addr.ip().to_string();
        let key = EndpointKey::new(protocol, host.as_str(), server.addr.port());
        let res = self.attempt(&key, req, bytes, log).await?;

        // If the UDP response indicates the message was truncated, we discard
        // it and repeat the query using TCP.
        if protocol == Protocol::Udp && res.flags().is_truncated() {
            tracing::debug!(message = "UDP response truncated, retrying with TCP", flags = ?res.flags(), server = %key);
            let key = EndpointKey::new(Protocol::Tcp, host, server.addr.port());
            self.attempt(&key, req, bytes, log).await
        } else {
            Ok(res)
        }
    }

    fn doh_endpoint<'a>(&self, server: &'a Nameserver) -> Option<&'a DohEndpoint> {
        if !self.config.prefer_doh {
            return None;
        }

        server.doh.as_ref().filter(|d| !self.memory.is_unsupported(&d.host))
    }

    fn transport(&self, req: &Message, bytes: &[u8]) -> Protocol {
        let ceiling = req
            .opt()
            .and_then(|r| r.udp_payload_size())
            .unwrap_or(DEFAULT_UDP_PAYLOAD_SIZE)
            .max(DEFAULT_UDP_PAYLOAD_SIZE);

        let zone_transfer = req.questions().iter().any(|q| q.qtype() == RecordType::AXFR);
        if self.config.force_tcp || zone_transfer || bytes.len() > usize::from(ceiling) {
            Protocol::Tcp
        } else {
            Protocol::Udp
        }
    }

    async fn attempt(
        &self,
        key: &EndpointKey,
        req: &Message,
        bytes: &[u8],
        log: &mut QueryLog,
    ) -> Result<Message, DnsqError> {
        let res = self.send(key, req, bytes).await;
        log.attempts.push(QueryAttempt {
            endpoint: key.clone(),
            request: bytes.to_vec(),
            error: res.as_ref().err().map(|e| (e.kind(), e.to_string())),
        });

        res
    }

    async fn send(&self, key: &EndpointKey, req: &Message, bytes: &[u8]) -> Result<Message, DnsqError> {
        let mut conn = self
            .pool
            .acquire(key)
            .timeout(self.config.timeout, format!("client.acquire {}", key))
            .await?;

        let res = conn
            .exchange(req, bytes, self.registry)
            .timeout(self.config.timeout, format!("client.exchange {}", key))
            .await;

        match res {
            Ok(res) => {
                self.pool.release(conn).await;
                self.validate(key, req, res)
            }
            Err(e) => {
                self.pool.release_err(conn, &e).await;
                Err(e)
            }
        }
    }

    fn validate(&self, key: &EndpointKey, req: &Message, res: Message) -> Result<Message, DnsqError> {
        if res.id() != req.id() {
            return Err(DnsqError::protocol(format!(
                "unexpected DNS MessageId; expected {}, got {}",
                req.id(),
                res.id()
            )));
        }

        if !res.flags().is_response() {
            return Err(DnsqError::protocol(format!("message {} is not a response", res.id())));
        }

        // The response code of a truncated UDP response is checked on the TCP retry instead
        if key.protocol() == Protocol::Udp && res.flags().is_truncated() {
            return Ok(res);
        }

        let code = res.flags().get_response_code();
        if self.config.failover_on_rcode && code != ResponseCode::NoError {
            return Err(DnsqError::protocol(format!("server responded with {:?}", code)));
        }

        Ok(res)
    }
}
