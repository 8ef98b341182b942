#![allow(clippy::uninlined_format_args)]

use dnsq_client::dns::{Flags, Message, Name, Record, RecordClass, RecordData, RecordDataA, RecordType};
use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, ToSocketAddrs, UdpSocket};

/// Address returned for every A query answered by a stub server.
pub const ANSWER: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 100);

/// Build a response to `req` with a single A record, or no records and the
/// truncated flag set if `truncate` is true.
pub fn response(req: &Message, truncate: bool) -> Message {
    let mut flags = Flags::default()
        .set_response()
        .set_recursion_desired()
        .set_recursion_available();
    if truncate {
        flags = flags.set_truncated();
    }

    let mut res = Message::new(req.id(), flags);
    for q in req.questions() {
        res = res.add_question(q.clone());
    }

    if truncate {
        res
    } else {
        res.add_answer(Record::new(
            Name::from_str("example.com.").unwrap(),
            RecordType::A,
            RecordClass::INET,
            60,
            RecordData::A(RecordDataA::new(ANSWER)),
        ))
    }
}

/// Start a UDP stub server that answers every query, optionally with the truncated
/// flag set. The address of the server and a future that must be `tokio::spawn`'d
/// are returned.
pub async fn udp_server<A>(address: A, truncate: bool) -> (SocketAddr, impl Future<Output = ()>)
where
    A: ToSocketAddrs,
{
    let sock = UdpSocket::bind(address).await.expect("error binding address");
    let local_address = sock.local_addr().expect("error getting local address");

    (local_address, async move {
        let mut buf = vec![0; 4096];
        loop {
            let (n, peer) = match sock.recv_from(&mut buf).await {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("error reading from UDP socket: {}", e);
                    continue;
                }
            };

            let req = match Message::from_bytes(&buf[0..n]) {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("error decoding UDP request: {}", e);
                    continue;
                }
            };

            let bytes = response(&req, truncate).to_bytes().unwrap();
            if let Err(e) = sock.send_to(&bytes, peer).await {
                eprintln!("error writing to UDP client: {}", e);
            }
        }
    })
}

/// Start a TCP stub server that answers every query on every connection. The address
/// of the server and a future that must be `tokio::spawn`'d are returned.
pub async fn tcp_server<A>(address: A) -> (SocketAddr, impl Future<Output = ()>)
where
    A: ToSocketAddrs,
{
    let listener = TcpListener::bind(address).await.expect("error binding address");
    let local_address = listener.local_addr().expect("error getting local address");

    (local_address, async move {
        loop {
            let (mut stream, _) = match listener.accept().await {
                Ok(v) => v,
                Err(e) => {
                    eprintln!("error accepting TCP stream from client: {}", e);
                    continue;
                }
            };

            tokio::spawn(async move {
                loop {
                    let size = match stream.read_u16().await {
                        Ok(v) => v,
                        Err(_) => return,
                    };

                    let mut buf = vec![0; usize::from(size)];
                    if let Err(e) = stream.read_exact(&mut buf).await {
                        eprintln!("error reading from TCP client: {}", e);
                        return;
                    }

                    let req = match Message::from_bytes(&buf) {
                        Ok(m) => m,
                        Err(e) => {
                            eprintln!("error decoding TCP request: {}", e);
                            return;
                        }
                    };

                    let bytes = response(&req, false).to_bytes().unwrap();
                    let mut out = Vec::with_capacity(bytes.len() + 2);
                    out.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
                    out.extend_from_slice(&bytes);

                    if let Err(e) = stream.write_all(&out).await {
                        eprintln!("error writing to TCP client: {}", e);
                        return;
                    }
                }
            });
        }
    })
}
