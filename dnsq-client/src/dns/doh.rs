use crate::core::DnsqError;
use crate::dns::message::Message;
use crate::dns::rdata::RecordRegistry;
use crate::dns::wire::ByteCursor;
use crate::net::{tls_client_config, TlsConfig};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{Method, Request, Response};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Media type of DNS wire format messages sent over HTTP (RFC 8484).
pub const DNS_MESSAGE_CONTENT_TYPE: &str = "application/dns-message";

/// HTTP method used to send DNS-over-HTTPS queries.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DohMethod {
    Get,
    #[default]
    Post,
}

impl FromStr for DohMethod {
    type Err = DnsqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_ref() {
            "GET" => Ok(DohMethod::Get),
            "POST" => Ok(DohMethod::Post),
            v => Err(DnsqError::configuration(format!("unsupported DoH method '{}'", v))),
        }
    }
}

/// Something that can perform a single HTTP round trip.
///
/// Errors reaching the server or reading the response should use `ErrorKind::Transport`
/// so that they are not mistaken for a server that doesn't speak DNS-over-HTTPS.
#[async_trait]
pub trait HttpClient: Send + Sync + fmt::Debug {
    async fn send(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, DnsqError>;
}

/// DNS-over-HTTPS endpoint along with the HTTP client used to reach it.
#[derive(Debug, Clone)]
pub struct DohConnection {
    uri: String,
    method: DohMethod,
    client: Arc<dyn HttpClient>,
}

impl DohConnection {
    pub fn new(uri: impl Into<String>, method: DohMethod, client: Arc<dyn HttpClient>) -> Self {
        Self {
            uri: uri.into(),
            method,
            client,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub(crate) async fn exchange(
        &mut self,
        msg: &Message,
        bytes: &[u8],
        registry: &RecordRegistry,
    ) -> Result<Message, DnsqError> {
        let req = self.request(bytes)?;
        let res = self.client.send(req).await?;

        let status = res.status();
        if !status.is_success() {
            return Err(DnsqError::protocol(format!(
                "DoH server {} returned HTTP {}",
                self.uri, status
            )));
        }

        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !is_dns_message(content_type) {
            return Err(DnsqError::protocol(format!(
                "DoH server {} returned unexpected content type '{}'",
                self.uri, content_type
            )));
        }

        let res = Message::read_with_registry(registry, &mut ByteCursor::new(res.body()))?;
        if res.id() != msg.id() {
            Err(DnsqError::protocol(format!(
                "unexpected DNS MessageId; expected {}, got {}",
                msg.id(),
                res.id()
            )))
        } else {
            Ok(res)
        }
    }

    fn request(&self, bytes: &[u8]) -> Result<Request<Vec<u8>>, DnsqError> {
        let builder = Request::builder().header(ACCEPT, DNS_MESSAGE_CONTENT_TYPE);
        let req = match self.method {
            DohMethod::Get => {
                let uri = format!("{}?dns={}", self.uri, URL_SAFE_NO_PAD.encode(bytes));
                builder.method(Method::GET).uri(uri).body(Vec::new())
            }
            DohMethod::Post => builder
                .method(Method::POST)
                .uri(&self.uri)
                .header(CONTENT_TYPE, DNS_MESSAGE_CONTENT_TYPE)
                .body(bytes.to_vec()),
        };

        req.map_err(|e| DnsqError::configuration_cause(format!("invalid DoH URI {}", self.uri), e))
    }
}

fn is_dns_message(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|t| t.trim().eq_ignore_ascii_case(DNS_MESSAGE_CONTENT_TYPE))
        .unwrap_or(false)
}

/// `HttpClient` implementation backed by `reqwest` using `rustls` for TLS.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub async fn new(tls: &TlsConfig, timeout: Duration) -> Result<Self, DnsqError> {
        let tls_config = tls_client_config(tls).await?;
        let client = reqwest::Client::builder()
            .use_preconfigured_tls(tls_config)
            .timeout(timeout)
            .build()
            .map_err(|e| DnsqError::configuration_cause("unable to build HTTP client", e))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn send(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, DnsqError> {
        let uri = req.uri().to_string();
        let req = reqwest::Request::try_from(req)
            .map_err(|e| DnsqError::configuration_cause(format!("invalid DoH request {}", uri), e))?;

        let res = self
            .client
            .execute(req)
            .await
            .map_err(|e| DnsqError::transport_cause(format!("DoH request to {} failed", uri), e))?;

        let mut builder = Response::builder().status(res.status()).version(res.version());
        for (name, value) in res.headers() {
            builder = builder.header(name, value);
        }

        let body = res
            .bytes()
            .await
            .map_err(|e| DnsqError::transport_cause(format!("failed to read DoH response from {}", uri), e))?;

        builder
            .body(body.to_vec())
            .map_err(|e| DnsqError::protocol_cause(format!("invalid DoH response from {}", uri), e))
    }
}
