#![allow(clippy::uninlined_format_args)]
#![warn(missing_debug_implementations, unreachable_pub)]
#![deny(unused_must_use)]

mod core;
pub mod dns;
mod net;
mod pool;
mod timeout;

pub use crate::core::{DnsqError, ErrorKind};
pub use crate::net::{TlsConfig, UdpStream};
pub use crate::pool::{ClientFactory, ClientPool, ClientPoolConfig, PoolStrategy, PooledClient};
pub use crate::timeout::{Timed, Timeout};
