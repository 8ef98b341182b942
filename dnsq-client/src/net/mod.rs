mod tcp;
mod tls;
mod udp;

pub(crate) use crate::net::tcp::tcp_connect;
pub use crate::net::tls::TlsConfig;
pub(crate) use crate::net::tls::tls_client_config;
pub use crate::net::udp::UdpStream;
pub(crate) use crate::net::udp::udp_connect;
