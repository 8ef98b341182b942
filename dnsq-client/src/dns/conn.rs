use crate::core::DnsqError;
use crate::dns::core::RecordType;
use crate::dns::doh::DohConnection;
use crate::dns::message::{Message, ResponseCode};
use crate::dns::rdata::RecordRegistry;
use crate::dns::wire::ByteCursor;
use std::fmt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

/// Largest DNS message that may be sent over UDP without EDNS.
pub const DEFAULT_UDP_PAYLOAD_SIZE: u16 = 512;

/// A single pooled connection to a nameserver over one of the supported transports.
#[derive(Debug)]
pub enum Connection {
    Udp(UdpConnection),
    Tcp(TcpConnection),
    Doh(DohConnection),
}

impl Connection {
    /// Send the already encoded form of `msg` and wait for the matching response.
    pub async fn exchange(
        &mut self,
        msg: &Message,
        bytes: &[u8],
        registry: &RecordRegistry,
    ) -> Result<Message, DnsqError> {
        match self {
            Connection::Udp(c) => c.exchange(msg, bytes, registry).await,
            Connection::Tcp(c) => c.exchange(msg, bytes, registry).await,
            Connection::Doh(c) => c.exchange(msg, bytes, registry).await,
        }
    }
}

/// Client for a connected datagram socket.
///
/// Responses with an ID that doesn't match the outstanding request are assumed
/// to be late answers to an earlier, abandoned request and are skipped.
pub struct UdpConnection {
    read: Box<dyn AsyncRead + Send + Sync + Unpin>,
    write: Box<dyn AsyncWrite + Send + Sync + Unpin>,
    size: usize,
}

impl UdpConnection {
    pub fn new<R, W>(read: R, write: W, size: u16) -> Self
    where
        R: AsyncRead + Send + Sync + Unpin + 'static,
        W: AsyncWrite + Send + Sync + Unpin + 'static,
    {
        Self {
            read: Box::new(read),
            write: Box::new(write),
            size: usize::from(size.max(DEFAULT_UDP_PAYLOAD_SIZE)),
        }
    }

    async fn exchange(&mut self, msg: &Message, bytes: &[u8], registry: &RecordRegistry) -> Result<Message, DnsqError> {
        self.write.write_all(bytes).await?;
        self.write.flush().await?;

        let mut buf = vec![0; self.size];
        loop {
            let n = self.read.read(&mut buf).await?;
            let res = Message::read_with_registry(registry, &mut ByteCursor::new(&buf[0..n]))?;
            if res.id() == msg.id() {
                return Ok(res);
            }

            tracing::debug!(message = "skipping response with unexpected ID", expected = %msg.id(), actual = %res.id());
        }
    }
}

impl fmt::Debug for UdpConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UdpConnection")
            .field("read", &"...")
            .field("write", &"...")
            .field("size", &self.size)
            .finish()
    }
}

/// Client for a stream connection using two byte length prefixed messages.
pub struct TcpConnection {
    read: BufReader<Box<dyn AsyncRead + Send + Sync + Unpin>>,
    write: BufWriter<Box<dyn AsyncWrite + Send + Sync + Unpin>>,
}

impl TcpConnection {
    pub fn new<R, W>(read: R, write: W) -> Self
    where
        R: AsyncRead + Send + Sync + Unpin + 'static,
        W: AsyncWrite + Send + Sync + Unpin + 'static,
    {
        let read: Box<dyn AsyncRead + Send + Sync + Unpin> = Box::new(read);
        let write: Box<dyn AsyncWrite + Send + Sync + Unpin> = Box::new(write);

        Self {
            read: BufReader::new(read),
            write: BufWriter::new(write),
        }
    }

    async fn exchange(&mut self, msg: &Message, bytes: &[u8], registry: &RecordRegistry) -> Result<Message, DnsqError> {
        let size = u16::try_from(bytes.len())
            .map_err(|e| DnsqError::invalid_data_cause(format!("message of {} bytes too large", bytes.len()), e))?;

        self.write.write_u16(size).await?;
        self.write.write_all(bytes).await?;
        self.write.flush().await?;

        let mut res = self.read_response(msg, registry).await?;
        if !Self::is_zone_transfer(msg) {
            return Ok(res);
        }

        // Zone transfers span any number of messages. The transfer is complete once
        // the SOA record that started it shows up a second time.
        while Self::needs_more(&res) {
            let next = self.read_response(msg, registry).await?;
            if next.flags().get_response_code() != ResponseCode::NoError {
                return Err(DnsqError::protocol(format!(
                    "zone transfer failed part way with response code {:?}",
                    next.flags().get_response_code()
                )));
            }

            for r in next.answers() {
                res = res.add_answer(r.clone());
            }
        }

        Ok(res)
    }

    async fn read_response(&mut self, msg: &Message, registry: &RecordRegistry) -> Result<Message, DnsqError> {
        // Read the prefixed size of the response in big-endian (network)
        // order and then read exactly that many bytes into our buffer.
        let sz = self.read.read_u16().await?;
        let mut buf = vec![0; usize::from(sz)];
        self.read.read_exact(&mut buf).await?;

        let res = Message::read_with_registry(registry, &mut ByteCursor::new(&buf))?;
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

    fn is_zone_transfer(msg: &Message) -> bool {
        msg.questions().iter().any(|q| q.qtype() == RecordType::AXFR)
    }

    fn needs_more(res: &Message) -> bool {
        if res.flags().get_response_code() != ResponseCode::NoError || res.answers().is_empty() {
            return false;
        }

        res.answers().iter().filter(|r| r.rtype() == RecordType::SOA).count() < 2
    }
}

impl fmt::Debug for TcpConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpConnection")
            .field("read", &"...")
            .field("write", &"...")
            .finish()
    }
}
