use crate::core::DnsqError;
use std::net::SocketAddr;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::{TcpSocket, TcpStream};

pub(crate) async fn tcp_connect(
    server: SocketAddr,
    local: Option<SocketAddr>,
) -> Result<(ReadHalf<TcpStream>, WriteHalf<TcpStream>), DnsqError> {
    let tcp_stream = tcp_stream(server, local).await?;
    Ok(tokio::io::split(tcp_stream))
}

async fn tcp_stream(server: SocketAddr, local: Option<SocketAddr>) -> Result<TcpStream, DnsqError> {
    let res = match local {
        Some(addr) => {
            let sock = if server.is_ipv4() {
                TcpSocket::new_v4()
            } else {
                TcpSocket::new_v6()
            };

            match sock.and_then(|s| s.bind(addr).map(|_| s)) {
                Ok(s) => s.connect(server).await,
                Err(e) => Err(e),
            }
        }
        None => TcpStream::connect(server).await,
    };

    // Each message is written with a single buffered flush so there's no
    // need to delay sending to avoid tiny packets.
    res.and_then(|s| s.set_nodelay(true).map(|_| s))
        .map_err(|e| DnsqError::from((format!("tcp://{}", server), e)))
}
