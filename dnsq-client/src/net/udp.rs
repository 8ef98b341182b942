use crate::core::DnsqError;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf, ReadHalf, WriteHalf};
use tokio::net::UdpSocket;

/// Connected UDP socket exposed as `AsyncRead` and `AsyncWrite`.
///
/// Each write is sent as a single datagram and each read receives a single
/// datagram. Reads into a buffer smaller than the datagram lose the rest of it.
#[derive(Debug)]
pub struct UdpStream {
    sock: UdpSocket,
}

impl UdpStream {
    pub fn new(sock: UdpSocket) -> Self {
        Self { sock }
    }
}

impl AsyncRead for UdpStream {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        self.sock.poll_recv(cx, buf)
    }
}

impl AsyncWrite for UdpStream {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.sock.poll_send(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

pub(crate) async fn udp_connect(
    server: SocketAddr,
    local: Option<SocketAddr>,
) -> Result<(ReadHalf<UdpStream>, WriteHalf<UdpStream>), DnsqError> {
    let local = local.unwrap_or_else(|| {
        if server.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        }
    });

    let sock = UdpSocket::bind(local)
        .await
        .map_err(|e| DnsqError::from((format!("udp bind {}", local), e)))?;
    sock.connect(server)
        .await
        .map_err(|e| DnsqError::from((format!("udp://{}", server), e)))?;

    Ok(tokio::io::split(UdpStream::new(sock)))
}
