use crate::core::DnsqError;
use crate::dns::core::RecordType;
use crate::dns::name::Name;
use crate::dns::wire::{ByteCursor, ByteWriter};
use byteorder::{NetworkEndian, WriteBytesExt};
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::io::Write;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::OnceLock;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RecordData {
    A(RecordDataA),
    NS(RecordDataNS),
    CNAME(RecordDataCNAME),
    SOA(RecordDataSOA),
    PTR(RecordDataPTR),
    MX(RecordDataMX),
    TXT(RecordDataTXT),
    AAAA(RecordDataAAAA),
    SRV(RecordDataSRV),
    OPT(RecordDataOpt),
    Unknown(RecordDataUnknown),
}

impl RecordData {
    pub fn size(&self) -> usize {
        match self {
            Self::A(rd) => rd.size(),
            Self::NS(rd) => rd.size(),
            Self::CNAME(rd) => rd.size(),
            Self::SOA(rd) => rd.size(),
            Self::PTR(rd) => rd.size(),
            Self::MX(rd) => rd.size(),
            Self::TXT(rd) => rd.size(),
            Self::AAAA(rd) => rd.size(),
            Self::SRV(rd) => rd.size(),
            Self::OPT(rd) => rd.size(),
            Self::Unknown(rd) => rd.size(),
        }
    }
}

impl Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordData::A(rd) => Display::fmt(rd, f),
            RecordData::NS(rd) => Display::fmt(rd, f),
            RecordData::CNAME(rd) => Display::fmt(rd, f),
            RecordData::SOA(rd) => Display::fmt(rd, f),
            RecordData::PTR(rd) => Display::fmt(rd, f),
            RecordData::MX(rd) => Display::fmt(rd, f),
            RecordData::TXT(rd) => Display::fmt(rd, f),
            RecordData::AAAA(rd) => Display::fmt(rd, f),
            RecordData::SRV(rd) => Display::fmt(rd, f),
            RecordData::OPT(rd) => Display::fmt(rd, f),
            RecordData::Unknown(rd) => Display::fmt(rd, f),
        }
    }
}

/// Reads record data for a type from a cursor limited to the record data.
pub type DecodeFn = fn(&mut ByteCursor<'_>) -> Result<RecordData, DnsqError>;

/// Writes record data for a type. Names may be compressed against the message.
pub type EncodeFn = fn(&RecordData, &mut ByteWriter) -> Result<(), DnsqError>;

/// Pair of functions for reading and writing the data of one record type.
#[derive(Debug, Copy, Clone)]
pub struct RecordCodec {
    decode: DecodeFn,
    encode: EncodeFn,
}

impl RecordCodec {
    pub fn new(decode: DecodeFn, encode: EncodeFn) -> Self {
        Self { decode, encode }
    }
}

macro_rules! record_codec {
    ($variant:ident, $data:ty) => {{
        fn decode(buf: &mut ByteCursor<'_>) -> Result<RecordData, DnsqError> {
            Ok(RecordData::$variant(<$data>::read_network_bytes(buf)?))
        }

        fn encode(rdata: &RecordData, buf: &mut ByteWriter) -> Result<(), DnsqError> {
            match rdata {
                RecordData::$variant(rd) => rd.write_network_bytes(buf),
                other => Err(DnsqError::invalid_data(format!(
                    "{} codec cannot write record data {}",
                    stringify!($variant),
                    other
                ))),
            }
        }

        RecordCodec::new(decode, encode)
    }};
}

/// Lookup of record data codecs by record type.
///
/// Types without a codec are read as opaque bytes (`RecordData::Unknown`) so that
/// messages containing them can still be decoded and written back unchanged.
#[derive(Debug, Clone, Default)]
pub struct RecordRegistry {
    codecs: HashMap<RecordType, RecordCodec>,
}

impl RecordRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Shared registry with codecs for all record types this crate has data types for.
    pub fn standard() -> &'static RecordRegistry {
        static STANDARD: OnceLock<RecordRegistry> = OnceLock::new();
        STANDARD.get_or_init(|| {
            let mut reg = Self::empty();
            reg.register(RecordType::A, record_codec!(A, RecordDataA));
            reg.register(RecordType::NS, record_codec!(NS, RecordDataNS));
            reg.register(RecordType::CNAME, record_codec!(CNAME, RecordDataCNAME));
            reg.register(RecordType::SOA, record_codec!(SOA, RecordDataSOA));
            reg.register(RecordType::PTR, record_codec!(PTR, RecordDataPTR));
            reg.register(RecordType::MX, record_codec!(MX, RecordDataMX));
            reg.register(RecordType::TXT, record_codec!(TXT, RecordDataTXT));
            reg.register(RecordType::AAAA, record_codec!(AAAA, RecordDataAAAA));
            reg.register(RecordType::SRV, record_codec!(SRV, RecordDataSRV));
            reg.register(RecordType::OPT, record_codec!(OPT, RecordDataOpt));
            reg
        })
    }

    /// Add or replace the codec for a record type, returning the previous codec.
    pub fn register(&mut self, rtype: RecordType, codec: RecordCodec) -> Option<RecordCodec> {
        self.codecs.insert(rtype, codec)
    }

    pub fn contains(&self, rtype: RecordType) -> bool {
        self.codecs.contains_key(&rtype)
    }

    /// Decode record data of type `rtype` from `buf` which must be limited to exactly
    /// the record data. The codec must consume all of it.
    pub fn decode(&self, rtype: RecordType, buf: &mut ByteCursor<'_>) -> Result<RecordData, DnsqError> {
        let codec = match self.codecs.get(&rtype) {
            Some(c) => c,
            None => return RecordDataUnknown::read_network_bytes(buf).map(RecordData::Unknown),
        };

        let rdata = (codec.decode)(buf)?;
        if !buf.at_end() {
            return Err(DnsqError::invalid_data(format!(
                "{} bytes of {} record data left unread",
                buf.remaining(),
                rtype
            )));
        }

        Ok(rdata)
    }

    pub fn encode(&self, rtype: RecordType, rdata: &RecordData, buf: &mut ByteWriter) -> Result<(), DnsqError> {
        if let RecordData::Unknown(rd) = rdata {
            return rd.write_network_bytes(buf);
        }

        match self.codecs.get(&rtype) {
            Some(c) => (c.encode)(rdata, buf),
            None => Err(DnsqError::invalid_data(format!("no codec registered for {} records", rtype))),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RecordDataA(Ipv4Addr);

impl RecordDataA {
    pub fn new(addr: Ipv4Addr) -> Self {
        Self(addr)
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.0
    }

    pub fn size(&self) -> usize {
        4
    }

    pub fn write_network_bytes(&self, buf: &mut ByteWriter) -> Result<(), DnsqError> {
        Ok(buf.write_all(&self.0.octets())?)
    }

    pub fn read_network_bytes(buf: &mut ByteCursor<'_>) -> Result<Self, DnsqError> {
        let mut bytes = [0_u8; 4];
        bytes.copy_from_slice(buf.consume(4)?);
        Ok(RecordDataA::new(Ipv4Addr::from(bytes)))
    }
}

impl Display for RecordDataA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

macro_rules! name_record_data {
    ($name:ident) => {
        #[derive(Debug, Clone, Eq, PartialEq)]
        pub struct $name(Name);

        impl $name {
            pub fn new(name: Name) -> Self {
                Self(name)
            }

            pub fn name(&self) -> &Name {
                &self.0
            }

            pub fn size(&self) -> usize {
                usize::from(self.0.size())
            }

            pub fn write_network_bytes(&self, buf: &mut ByteWriter) -> Result<(), DnsqError> {
                self.0.write_network_bytes(buf)
            }

            pub fn read_network_bytes(buf: &mut ByteCursor<'_>) -> Result<Self, DnsqError> {
                Ok(Self::new(Name::read_network_bytes(buf)?))
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                Display::fmt(&self.0, f)
            }
        }
    };
}

name_record_data!(RecordDataNS);
name_record_data!(RecordDataCNAME);
name_record_data!(RecordDataPTR);

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RecordDataSOA {
    mname: Name,
    rname: Name,
    serial: u32,
    refresh: u32,
    retry: u32,
    expire: u32,
    minimum: u32,
}

impl RecordDataSOA {
    pub fn new(mname: Name, rname: Name, serial: u32, refresh: u32, retry: u32, expire: u32, minimum: u32) -> Self {
        Self {
            mname,
            rname,
            serial,
            refresh,
            retry,
            expire,
            minimum,
        }
    }

    pub fn mname(&self) -> &Name {
        &self.mname
    }

    pub fn rname(&self) -> &Name {
        &self.rname
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn refresh(&self) -> u32 {
        self.refresh
    }

    pub fn retry(&self) -> u32 {
        self.retry
    }

    pub fn expire(&self) -> u32 {
        self.expire
    }

    pub fn minimum(&self) -> u32 {
        self.minimum
    }

    pub fn size(&self) -> usize {
        usize::from(self.mname.size()) + usize::from(self.rname.size()) + (4 * 5)
    }

    pub fn write_network_bytes(&self, buf: &mut ByteWriter) -> Result<(), DnsqError> {
        self.mname.write_network_bytes(buf)?;
        self.rname.write_network_bytes(buf)?;
        buf.write_u32::<NetworkEndian>(self.serial)?;
        buf.write_u32::<NetworkEndian>(self.refresh)?;
        buf.write_u32::<NetworkEndian>(self.retry)?;
        buf.write_u32::<NetworkEndian>(self.expire)?;
        buf.write_u32::<NetworkEndian>(self.minimum)?;
        Ok(())
    }

    pub fn read_network_bytes(buf: &mut ByteCursor<'_>) -> Result<Self, DnsqError> {
        let mname = Name::read_network_bytes(buf)?;
        let rname = Name::read_network_bytes(buf)?;
        let serial = buf.read_u32()?;
        let refresh = buf.read_u32()?;
        let retry = buf.read_u32()?;
        let expire = buf.read_u32()?;
        let minimum = buf.read_u32()?;

        Ok(Self::new(mname, rname, serial, refresh, retry, expire, minimum))
    }
}

impl Display for RecordDataSOA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {} {}",
            self.mname, self.rname, self.serial, self.refresh, self.retry, self.expire, self.minimum
        )
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RecordDataMX {
    preference: u16,
    exchange: Name,
}

impl RecordDataMX {
    pub fn new(preference: u16, exchange: Name) -> Self {
        Self { preference, exchange }
    }

    pub fn preference(&self) -> u16 {
        self.preference
    }

    pub fn exchange(&self) -> &Name {
        &self.exchange
    }

    pub fn size(&self) -> usize {
        2 + usize::from(self.exchange.size())
    }

    pub fn write_network_bytes(&self, buf: &mut ByteWriter) -> Result<(), DnsqError> {
        buf.write_u16::<NetworkEndian>(self.preference)?;
        self.exchange.write_network_bytes(buf)
    }

    pub fn read_network_bytes(buf: &mut ByteCursor<'_>) -> Result<Self, DnsqError> {
        let preference = buf.read_u16()?;
        let exchange = Name::read_network_bytes(buf)?;
        Ok(Self::new(preference, exchange))
    }
}

impl Display for RecordDataMX {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.preference, self.exchange)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RecordDataTXT(Vec<Vec<u8>>);

impl RecordDataTXT {
    const MAX_LENGTH: usize = 65535;
    const MAX_SEGMENT_LENGTH: usize = 255;

    pub fn new<I, B>(items: I) -> Result<Self, DnsqError>
    where
        I: IntoIterator<Item = B>,
        B: Into<Vec<u8>>,
    {
        let mut segments = Vec::new();
        let mut total = 0;

        for txt in items {
            let bytes = txt.into();
            if bytes.len() > Self::MAX_SEGMENT_LENGTH {
                return Err(DnsqError::invalid_data(format!(
                    "TXT record segment too long; {} bytes, max {} bytes",
                    bytes.len(),
                    Self::MAX_SEGMENT_LENGTH
                )));
            }

            // One extra byte per segment for its length so that anything created
            // here can actually be written
            total += 1 + bytes.len();
            if total > Self::MAX_LENGTH {
                return Err(DnsqError::invalid_data(format!(
                    "TXT record too long; {} bytes, max {} bytes",
                    total,
                    Self::MAX_LENGTH
                )));
            }

            segments.push(bytes);
        }

        Ok(Self(segments))
    }

    pub fn bytes(&self) -> &[Vec<u8>] {
        &self.0
    }

    pub fn size(&self) -> usize {
        self.0.iter().map(|v| v.len()).sum::<usize>() + self.0.len()
    }

    pub fn write_network_bytes(&self, buf: &mut ByteWriter) -> Result<(), DnsqError> {
        for txt in self.0.iter() {
            buf.write_u8(txt.len() as u8)?;
            buf.write_all(txt)?;
        }

        Ok(())
    }

    pub fn read_network_bytes(buf: &mut ByteCursor<'_>) -> Result<Self, DnsqError> {
        let mut all = Vec::new();
        while !buf.at_end() {
            let len = buf.read_u8()?;
            all.push(buf.consume(usize::from(len))?.to_vec());
        }

        Self::new(all)
    }
}

impl Display for RecordDataTXT {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, txt) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }

            // Best effort at showing text, invalid UTF-8 isn't an error here
            write!(f, "\"{}\"", String::from_utf8_lossy(txt).replace('\"', "\\\""))?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RecordDataAAAA(Ipv6Addr);

impl RecordDataAAAA {
    pub fn new(addr: Ipv6Addr) -> Self {
        Self(addr)
    }

    pub fn addr(&self) -> Ipv6Addr {
        self.0
    }

    pub fn size(&self) -> usize {
        16
    }

    pub fn write_network_bytes(&self, buf: &mut ByteWriter) -> Result<(), DnsqError> {
        Ok(buf.write_all(&self.0.octets())?)
    }

    pub fn read_network_bytes(buf: &mut ByteCursor<'_>) -> Result<Self, DnsqError> {
        let mut bytes = [0_u8; 16];
        bytes.copy_from_slice(buf.consume(16)?);
        Ok(RecordDataAAAA::new(Ipv6Addr::from(bytes)))
    }
}

impl Display for RecordDataAAAA {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RecordDataSRV {
    priority: u16,
    weight: u16,
    port: u16,
    target: Name,
}

impl RecordDataSRV {
    pub fn new(priority: u16, weight: u16, port: u16, target: Name) -> Self {
        Self {
            priority,
            weight,
            port,
            target,
        }
    }

    pub fn priority(&self) -> u16 {
        self.priority
    }

    pub fn weight(&self) -> u16 {
        self.weight
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn target(&self) -> &Name {
        &self.target
    }

    pub fn size(&self) -> usize {
        (2 * 3) + usize::from(self.target.size())
    }

    pub fn write_network_bytes(&self, buf: &mut ByteWriter) -> Result<(), DnsqError> {
        buf.write_u16::<NetworkEndian>(self.priority)?;
        buf.write_u16::<NetworkEndian>(self.weight)?;
        buf.write_u16::<NetworkEndian>(self.port)?;
        // SRV targets must not be compressed (RFC 2782)
        self.target.write_uncompressed(buf)
    }

    pub fn read_network_bytes(buf: &mut ByteCursor<'_>) -> Result<Self, DnsqError> {
        let priority = buf.read_u16()?;
        let weight = buf.read_u16()?;
        let port = buf.read_u16()?;
        let target = Name::read_network_bytes(buf)?;

        Ok(Self::new(priority, weight, port, target))
    }
}

impl Display for RecordDataSRV {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.priority, self.weight, self.port, self.target)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RecordDataOptPair {
    code: u16,
    data: Vec<u8>,
}

impl RecordDataOptPair {
    const MAX_DATA_LENGTH: usize = 65535;

    pub fn new(code: u16, data: Vec<u8>) -> Result<Self, DnsqError> {
        if data.len() > Self::MAX_DATA_LENGTH {
            Err(DnsqError::invalid_data(format!(
                "OPT attribute data too long; {} bytes, max {} bytes",
                data.len(),
                Self::MAX_DATA_LENGTH,
            )))
        } else {
            Ok(Self { code, data })
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    fn size(&self) -> usize {
        2 + 2 + self.data.len() // code + data length + data
    }

    fn write_network_bytes(&self, buf: &mut ByteWriter) -> Result<(), DnsqError> {
        buf.write_u16::<NetworkEndian>(self.code)?;
        buf.write_u16::<NetworkEndian>(self.data.len() as u16)?;
        Ok(buf.write_all(&self.data)?)
    }

    fn read_network_bytes(buf: &mut ByteCursor<'_>) -> Result<Self, DnsqError> {
        let code = buf.read_u16()?;
        let data_len = buf.read_u16()?;
        let data = buf.consume(usize::from(data_len))?.to_vec();
        Ok(Self { code, data })
    }
}

impl Display for RecordDataOptPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, String::from_utf8_lossy(&self.data))
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RecordDataOpt {
    options: Vec<RecordDataOptPair>,
}

impl RecordDataOpt {
    const MAX_LENGTH: usize = 65535;

    pub fn new(options: Vec<RecordDataOptPair>) -> Result<Self, DnsqError> {
        let size = Self::options_size(&options);
        if size > Self::MAX_LENGTH {
            Err(DnsqError::invalid_data(format!(
                "OPT record data too long; {} bytes, max {} bytes",
                size,
                Self::MAX_LENGTH,
            )))
        } else {
            Ok(Self { options })
        }
    }

    pub fn empty() -> Self {
        Self { options: Vec::new() }
    }

    fn options_size(opts: &[RecordDataOptPair]) -> usize {
        opts.iter().map(|o| o.size()).sum()
    }

    pub fn options(&self) -> &[RecordDataOptPair] {
        &self.options
    }

    pub fn size(&self) -> usize {
        Self::options_size(&self.options)
    }

    pub fn write_network_bytes(&self, buf: &mut ByteWriter) -> Result<(), DnsqError> {
        for opt in self.options.iter() {
            opt.write_network_bytes(buf)?;
        }

        Ok(())
    }

    pub fn read_network_bytes(buf: &mut ByteCursor<'_>) -> Result<Self, DnsqError> {
        let mut options = Vec::new();
        while !buf.at_end() {
            options.push(RecordDataOptPair::read_network_bytes(buf)?);
        }

        Ok(Self { options })
    }
}

impl Display for RecordDataOpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for opt in self.options.iter() {
            write!(f, "{}", opt)?;
        }

        Ok(())
    }
}

/// Record data for a type without a registered codec, kept as raw bytes.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RecordDataUnknown(Vec<u8>);

impl RecordDataUnknown {
    const MAX_LENGTH: usize = 65535;

    pub fn new(bytes: Vec<u8>) -> Result<Self, DnsqError> {
        if bytes.len() > Self::MAX_LENGTH {
            Err(DnsqError::invalid_data(format!(
                "record data too long; {} bytes, max {} bytes",
                bytes.len(),
                Self::MAX_LENGTH
            )))
        } else {
            Ok(Self(bytes))
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn size(&self) -> usize {
        self.0.len()
    }

    pub fn write_network_bytes(&self, buf: &mut ByteWriter) -> Result<(), DnsqError> {
        Ok(buf.write_all(&self.0)?)
    }

    pub fn read_network_bytes(buf: &mut ByteCursor<'_>) -> Result<Self, DnsqError> {
        let bytes = buf.consume(buf.remaining())?;
        Self::new(bytes.to_vec())
    }
}

impl Display for RecordDataUnknown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\\# {}", self.0.len())?;
        if !self.0.is_empty() {
            write!(f, " ")?;
            for b in self.0.iter() {
                write!(f, "{:02x}", b)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{
        RecordCodec, RecordData, RecordDataA, RecordDataAAAA, RecordDataCNAME, RecordDataMX, RecordDataNS,
        RecordDataOpt, RecordDataOptPair, RecordDataPTR, RecordDataSOA, RecordDataSRV, RecordDataTXT,
        RecordDataUnknown, RecordRegistry,
    };
    use crate::core::{DnsqError, ErrorKind};
    use crate::dns::core::RecordType;
    use crate::dns::name::Name;
    use crate::dns::wire::{ByteCursor, ByteWriter};
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::str::FromStr;

    #[test]
    fn test_record_data_a_write_network_bytes() {
        let rdata = RecordDataA::new(Ipv4Addr::new(127, 0, 0, 1));

        let mut buf = ByteWriter::new();
        rdata.write_network_bytes(&mut buf).unwrap();

        assert_eq!(vec![127, 0, 0, 1], buf.into_inner());
    }

    #[test]
    fn test_record_data_a_read_network_bytes() {
        let bytes = [127, 0, 0, 53];
        let rdata = RecordDataA::read_network_bytes(&mut ByteCursor::new(&bytes)).unwrap();

        assert_eq!(Ipv4Addr::new(127, 0, 0, 53), rdata.addr());
    }

    #[test]
    fn test_record_data_a_read_network_bytes_truncated() {
        let bytes = [127, 0, 0];
        let err = RecordDataA::read_network_bytes(&mut ByteCursor::new(&bytes)).unwrap_err();

        assert_eq!(ErrorKind::Truncated, err.kind());
    }

    #[rustfmt::skip]
    #[test]
    fn test_record_data_ns_write_network_bytes() {
        let name = Name::from_str("ns.example.com.").unwrap();
        let ns = RecordDataNS::new(name);

        let mut buf = ByteWriter::new();
        ns.write_network_bytes(&mut buf).unwrap();

        assert_eq!(
            vec![
                2,                                // length
                110, 115,                         // "ns"
                7,                                // length
                101, 120, 97, 109, 112, 108, 101, // "example"
                3,                                // length
                99, 111, 109,                     // "com"
                0,                                // root
            ],
            buf.into_inner(),
        );
    }

    #[rustfmt::skip]
    #[test]
    fn test_record_data_cname_read_network_bytes() {
        let bytes = [
            3,                                // length
            119, 119, 119,                    // "www"
            7,                                // length
            101, 120, 97, 109, 112, 108, 101, // "example"
            3,                                // length
            99, 111, 109,                     // "com"
            0,                                // root
        ];

        let rdata = RecordDataCNAME::read_network_bytes(&mut ByteCursor::new(&bytes)).unwrap();
        assert_eq!("www.example.com.", rdata.name().to_string());
    }

    #[rustfmt::skip]
    #[test]
    fn test_record_data_soa_write_network_bytes() {
        let mname = Name::from_str("m.example.com.").unwrap();
        let rname = Name::from_str("r.example.com.").unwrap();
        let soa = RecordDataSOA::new(mname, rname, 123456790, 3000, 300, 3600, 600);

        let mut buf = ByteWriter::compressed();
        soa.write_network_bytes(&mut buf).unwrap();

        assert_eq!(
            vec![
                1,                                // length
                109,                              // "m"
                7,                                // length
                101, 120, 97, 109, 112, 108, 101, // "example"
                3,                                // length
                99, 111, 109,                     // "com"
                0,                                // root
                1,                                // length
                114,                              // "r"
                192, 2,                           // pointer to "example.com"
                7, 91, 205, 22,                   // serial
                0, 0, 11, 184,                    // refresh
                0, 0, 1, 44,                      // retry
                0, 0, 14, 16,                     // expire
                0, 0, 2, 88,                      // minimum
            ],
            buf.into_inner(),
        );
    }

    #[rustfmt::skip]
    #[test]
    fn test_record_data_soa_read_network_bytes() {
        let bytes = [
            1,                                // length
            109,                              // "m"
            7,                                // length
            101, 120, 97, 109, 112, 108, 101, // "example"
            3,                                // length
            99, 111, 109,                     // "com"
            0,                                // root
            1,                                // length
            114,                              // "r"
            192, 2,                           // pointer to "example.com"
            7, 91, 205, 22,                   // serial
            0, 0, 11, 184,                    // refresh
            0, 0, 1, 44,                      // retry
            0, 0, 14, 16,                     // expire
            0, 0, 2, 88,                      // minimum
        ];

        let rdata = RecordDataSOA::read_network_bytes(&mut ByteCursor::new(&bytes)).unwrap();
        assert_eq!("m.example.com.", rdata.mname().to_string());
        assert_eq!("r.example.com.", rdata.rname().to_string());
        assert_eq!(123456790, rdata.serial());
        assert_eq!(3000, rdata.refresh());
        assert_eq!(300, rdata.retry());
        assert_eq!(3600, rdata.expire());
        assert_eq!(600, rdata.minimum());
    }

    #[rustfmt::skip]
    #[test]
    fn test_record_data_mx_read_network_bytes() {
        let bytes = [
            0, 10,                            // preference
            4,                                // length
            109, 97, 105, 108,                // "mail"
            7,                                // length
            101, 120, 97, 109, 112, 108, 101, // "example"
            3,                                // length
            99, 111, 109,                     // "com"
            0,                                // root
        ];

        let rdata = RecordDataMX::read_network_bytes(&mut ByteCursor::new(&bytes)).unwrap();
        assert_eq!(10, rdata.preference());
        assert_eq!("mail.example.com.", rdata.exchange().to_string());
        assert_eq!("10 mail.example.com.", rdata.to_string());
    }

    #[test]
    fn test_record_data_ptr_display() {
        let rdata = RecordDataPTR::new(Name::from_str("host.example.com.").unwrap());
        assert_eq!("host.example.com.", rdata.to_string());
        assert_eq!(18, rdata.size());
    }

    #[test]
    fn test_record_data_txt_new_exceeds_max_size() {
        let segments = vec!["a".repeat(255); 257];
        let res = RecordDataTXT::new(segments);
        assert!(res.is_err());
    }

    #[test]
    fn test_record_data_txt_new_segment_too_long() {
        let res = RecordDataTXT::new(vec!["a".repeat(256)]);
        assert!(res.is_err());
    }

    #[test]
    fn test_record_data_txt_size() {
        let rdata = RecordDataTXT::new(vec!["id=hello", "user=world"]).unwrap();
        assert_eq!(20, rdata.size());
    }

    #[rustfmt::skip]
    #[test]
    fn test_record_data_txt_read_network_bytes() {
        let bytes = [
            8,                                      // length
            105, 100, 61, 104, 101, 108, 108, 111,  // id=hello
            10,                                     // length
            117, 115, 101, 114, 61, 119, 111, 114, 108, 100, // user=world
        ];

        let rdata = RecordDataTXT::read_network_bytes(&mut ByteCursor::new(&bytes)).unwrap();
        assert_eq!(vec![b"id=hello".to_vec(), b"user=world".to_vec()], rdata.bytes());
        assert_eq!("\"id=hello\" \"user=world\"", rdata.to_string());
    }

    #[test]
    fn test_record_data_txt_read_network_bytes_segment_past_end() {
        let bytes = [8, 105, 100];
        let err = RecordDataTXT::read_network_bytes(&mut ByteCursor::new(&bytes)).unwrap_err();
        assert_eq!(ErrorKind::Truncated, err.kind());
    }

    #[test]
    fn test_record_data_aaaa_read_network_bytes() {
        let bytes = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1];
        let rdata = RecordDataAAAA::read_network_bytes(&mut ByteCursor::new(&bytes)).unwrap();
        assert_eq!(Ipv6Addr::LOCALHOST, rdata.addr());
    }

    #[rustfmt::skip]
    #[test]
    fn test_record_data_srv_write_network_bytes_uncompressed() {
        let mut buf = ByteWriter::compressed();
        let target = Name::from_str("_sieve.example.com.").unwrap();
        target.write_network_bytes(&mut buf).unwrap();
        let start = buf.offset();

        let rdata = RecordDataSRV::new(100, 20, 4190, target.clone());
        rdata.write_network_bytes(&mut buf).unwrap();
        let bytes = buf.into_inner();

        assert_eq!(
            &[
                0, 100,                           // priority
                0, 20,                            // weight
                16, 94,                           // port
                6,                                // length
                95, 115, 105, 101, 118, 101,      // "_sieve"
                7,                                // length
                101, 120, 97, 109, 112, 108, 101, // "example"
                3,                                // length
                99, 111, 109,                     // "com"
                0,                                // root
            ][..],
            &bytes[start..],
        );
    }

    #[test]
    fn test_record_data_opt_pair_new_exceeds_max_size() {
        let res = RecordDataOptPair::new(0, "a".repeat(65536).into_bytes());
        assert!(res.is_err());
    }

    #[test]
    fn test_record_data_opt_new_exceeds_max_size() {
        let opts = vec![
            RecordDataOptPair::new(0, "a".repeat(65535).into_bytes()).unwrap(),
            RecordDataOptPair::new(1, "a".repeat(65535).into_bytes()).unwrap(),
        ];

        let res = RecordDataOpt::new(opts);
        assert!(res.is_err());
    }

    #[rustfmt::skip]
    #[test]
    fn test_record_data_opt_read_network_bytes() {
        let bytes = [
            0, 1,       // code
            0, 3,       // size
            97, 98, 99, // data
            0, 2,       // code
            0, 0,       // size
        ];

        let rdata = RecordDataOpt::read_network_bytes(&mut ByteCursor::new(&bytes)).unwrap();
        let options = rdata.options();

        assert_eq!(2, options.len());
        assert_eq!(RecordDataOptPair::new(1, b"abc".to_vec()).unwrap(), options[0]);
        assert_eq!(RecordDataOptPair::new(2, Vec::new()).unwrap(), options[1]);
    }

    #[test]
    fn test_record_data_unknown_display() {
        let rdata = RecordDataUnknown::new(vec![0xDE, 0xAD]).unwrap();
        assert_eq!("\\# 2 dead", rdata.to_string());
    }

    #[test]
    fn test_registry_decode_known_type() {
        let bytes = [10, 0, 0, 1];
        let mut cur = ByteCursor::new(&bytes);
        let rdata = RecordRegistry::standard().decode(RecordType::A, &mut cur).unwrap();

        assert_eq!(RecordData::A(RecordDataA::new(Ipv4Addr::new(10, 0, 0, 1))), rdata);
    }

    #[test]
    fn test_registry_decode_unknown_type() {
        let bytes = [1, 2, 3, 4, 5];
        let mut cur = ByteCursor::new(&bytes);
        let rdata = RecordRegistry::standard()
            .decode(RecordType::Unknown(65), &mut cur)
            .unwrap();

        assert_eq!(RecordData::Unknown(RecordDataUnknown::new(bytes.to_vec()).unwrap()), rdata);
        assert!(cur.at_end());
    }

    #[test]
    fn test_registry_decode_trailing_bytes() {
        let bytes = [10, 0, 0, 1, 99];
        let mut cur = ByteCursor::new(&bytes);
        let err = RecordRegistry::standard().decode(RecordType::A, &mut cur).unwrap_err();

        assert_eq!(ErrorKind::InvalidData, err.kind());
    }

    #[test]
    fn test_registry_empty_decodes_everything_as_unknown() {
        let bytes = [10, 0, 0, 1];
        let mut cur = ByteCursor::new(&bytes);
        let rdata = RecordRegistry::empty().decode(RecordType::A, &mut cur).unwrap();

        assert!(matches!(rdata, RecordData::Unknown(_)));
    }

    #[test]
    fn test_registry_encode_mismatched_data() {
        let rdata = RecordData::A(RecordDataA::new(Ipv4Addr::LOCALHOST));
        let mut buf = ByteWriter::new();
        let err = RecordRegistry::standard()
            .encode(RecordType::AAAA, &rdata, &mut buf)
            .unwrap_err();

        assert_eq!(ErrorKind::InvalidData, err.kind());
    }

    #[test]
    fn test_registry_encode_unknown_data_raw() {
        let rdata = RecordData::Unknown(RecordDataUnknown::new(vec![1, 2, 3]).unwrap());
        let mut buf = ByteWriter::new();
        RecordRegistry::empty()
            .encode(RecordType::Unknown(65), &rdata, &mut buf)
            .unwrap();

        assert_eq!(vec![1, 2, 3], buf.into_inner());
    }

    #[test]
    fn test_registry_register_custom_codec() {
        fn decode(buf: &mut ByteCursor<'_>) -> Result<RecordData, DnsqError> {
            // Store everything reversed to prove this codec was used
            let mut bytes = buf.consume(buf.remaining())?.to_vec();
            bytes.reverse();
            Ok(RecordData::Unknown(RecordDataUnknown::new(bytes)?))
        }

        fn encode(rdata: &RecordData, buf: &mut ByteWriter) -> Result<(), DnsqError> {
            RecordRegistry::empty().encode(RecordType::Unknown(65), rdata, buf)
        }

        let mut reg = RecordRegistry::empty();
        assert!(reg.register(RecordType::Unknown(65), RecordCodec::new(decode, encode)).is_none());
        assert!(reg.contains(RecordType::Unknown(65)));

        let bytes = [1, 2, 3];
        let rdata = reg.decode(RecordType::Unknown(65), &mut ByteCursor::new(&bytes)).unwrap();
        assert_eq!(RecordData::Unknown(RecordDataUnknown::new(vec![3, 2, 1]).unwrap()), rdata);
    }
}
