mod client;
mod conn;
mod core;
mod doh;
mod message;
mod name;
mod rdata;
mod resolv;
mod strategy;
mod wire;

pub use crate::dns::client::{
    ConnectionOptions, DefaultConnectionFactory, DnsClient, DnsClientConfig, DohEndpoint, Nameserver, QueryAttempt,
    QueryLog, Signer, DEFAULT_EDNS_PAYLOAD_SIZE,
};
pub use crate::dns::conn::{Connection, TcpConnection, UdpConnection, DEFAULT_UDP_PAYLOAD_SIZE};
pub use crate::dns::core::{RecordClass, RecordType};
pub use crate::dns::doh::{DohConnection, DohMethod, HttpClient, ReqwestClient, DNS_MESSAGE_CONTENT_TYPE};
pub use crate::dns::message::{Flags, Message, MessageId, Operation, Question, Record, ResponseCode};
pub use crate::dns::name::{CompressionMap, Name};
pub use crate::dns::rdata::{
    DecodeFn, EncodeFn, RecordCodec, RecordData, RecordDataA, RecordDataAAAA, RecordDataCNAME, RecordDataMX,
    RecordDataNS, RecordDataOpt, RecordDataOptPair, RecordDataPTR, RecordDataSOA, RecordDataSRV, RecordDataTXT,
    RecordDataUnknown, RecordRegistry,
};
pub use crate::dns::resolv::{config, ResolvConf, ResolvConfOptions};
pub use crate::dns::strategy::{
    DohStrategy, EndpointKey, FailureMemory, Protocol, TcpStrategy, TransportStrategy, UdpStrategy,
};
pub use crate::dns::wire::{ByteCursor, ByteWriter};
