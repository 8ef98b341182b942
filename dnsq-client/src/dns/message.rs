use crate::core::DnsqError;
use crate::dns::core::{RecordClass, RecordType};
use crate::dns::name::Name;
use crate::dns::rdata::{RecordData, RecordDataOpt, RecordRegistry};
use crate::dns::wire::{ByteCursor, ByteWriter};
use byteorder::{NetworkEndian, WriteBytesExt};
use std::fmt;
use std::fmt::{Debug, Formatter};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct MessageId(u16);

impl MessageId {
    pub fn random() -> Self {
        Self(rand::random())
    }

    pub fn size(&self) -> usize {
        2
    }
}

impl From<u16> for MessageId {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<MessageId> for u16 {
    fn from(value: MessageId) -> Self {
        value.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Message {
    id: MessageId,
    flags: Flags,
    questions: Vec<Question>,
    answers: Vec<Record>,
    authority: Vec<Record>,
    extra: Vec<Record>,
}

impl Message {
    const HEADER_SIZE: usize = 12;
    // Root name + type + class
    const MIN_QUESTION_SIZE: usize = 1 + 2 + 2;
    // Root name + type + class + ttl + rdata length
    const MIN_RECORD_SIZE: usize = 1 + 2 + 2 + 4 + 2;

    pub fn new(id: MessageId, flags: Flags) -> Self {
        Self {
            id,
            flags,
            questions: Vec::new(),
            answers: Vec::new(),
            authority: Vec::new(),
            extra: Vec::new(),
        }
    }

    /// Size of this message on the wire without name compression.
    pub fn size(&self) -> usize {
        self.id.size()
            + self.flags.size()
            + (2 * 4) // lengths of questions, answers, authority, extra
            + self.questions.iter().map(|q| q.size()).sum::<usize>()
            + self.answers.iter().map(|r| r.size()).sum::<usize>()
            + self.authority.iter().map(|r| r.size()).sum::<usize>()
            + self.extra.iter().map(|r| r.size()).sum::<usize>()
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn add_question(mut self, q: Question) -> Self {
        self.questions.push(q);
        self
    }

    pub fn answers(&self) -> &[Record] {
        &self.answers
    }

    pub fn add_answer(mut self, r: Record) -> Self {
        self.answers.push(r);
        self
    }

    pub fn authority(&self) -> &[Record] {
        &self.authority
    }

    pub fn add_authority(mut self, r: Record) -> Self {
        self.authority.push(r);
        self
    }

    pub fn extra(&self) -> &[Record] {
        &self.extra
    }

    pub fn add_extra(mut self, r: Record) -> Self {
        self.extra.push(r);
        self
    }

    /// The EDNS OPT pseudo-record in the additional section, if any.
    pub fn opt(&self) -> Option<&Record> {
        self.extra.iter().find(|r| r.rtype() == RecordType::OPT)
    }

    fn header(&self) -> Result<Header, DnsqError> {
        Ok(Header {
            id: self.id,
            flags: self.flags,
            num_questions: Self::section_count("question", self.questions.len())?,
            num_answers: Self::section_count("answer", self.answers.len())?,
            num_authority: Self::section_count("authority", self.authority.len())?,
            num_extra: Self::section_count("additional", self.extra.len())?,
        })
    }

    fn section_count(section: &str, len: usize) -> Result<u16, DnsqError> {
        u16::try_from(len)
            .map_err(|e| DnsqError::invalid_data_cause(format!("too many entries in {} section: {}", section, len), e))
    }

    /// Encode this message into a new buffer with name compression.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DnsqError> {
        let mut buf = ByteWriter::compressed();
        self.write_network_bytes(&mut buf)?;
        Ok(buf.into_inner())
    }

    /// Decode a message using the standard record registry.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DnsqError> {
        Self::read_network_bytes(&mut ByteCursor::new(bytes))
    }

    pub fn write_network_bytes(&self, buf: &mut ByteWriter) -> Result<(), DnsqError> {
        self.write_with_registry(RecordRegistry::standard(), buf)
    }

    pub fn write_with_registry(&self, registry: &RecordRegistry, buf: &mut ByteWriter) -> Result<(), DnsqError> {
        let header = self.header()?;
        header.write_network_bytes(buf)?;

        for q in self.questions.iter() {
            q.write_network_bytes(buf)?;
        }

        for r in self.answers.iter() {
            r.write_network_bytes(registry, buf)?;
        }

        for r in self.authority.iter() {
            r.write_network_bytes(registry, buf)?;
        }

        for r in self.extra.iter() {
            r.write_network_bytes(registry, buf)?;
        }

        Ok(())
    }

    pub fn read_network_bytes(buf: &mut ByteCursor<'_>) -> Result<Self, DnsqError> {
        Self::read_with_registry(RecordRegistry::standard(), buf)
    }

    pub fn read_with_registry(registry: &RecordRegistry, buf: &mut ByteCursor<'_>) -> Result<Self, DnsqError> {
        if buf.remaining() < Self::HEADER_SIZE {
            return Err(DnsqError::truncated(format!(
                "message of {} bytes is shorter than a header",
                buf.remaining()
            )));
        }

        let header = Header::read_network_bytes(buf)?;

        // Reject counts that can't possibly be satisfied before allocating or
        // reading anything based on them.
        let records =
            usize::from(header.num_answers) + usize::from(header.num_authority) + usize::from(header.num_extra);
        let minimum = usize::from(header.num_questions) * Self::MIN_QUESTION_SIZE + records * Self::MIN_RECORD_SIZE;
        if minimum > buf.remaining() {
            return Err(DnsqError::short_packet(format!(
                "header declares {} questions and {} records needing at least {} bytes, {} remain",
                header.num_questions,
                records,
                minimum,
                buf.remaining()
            )));
        }

        let mut questions = Vec::with_capacity(usize::from(header.num_questions));
        for _ in 0..header.num_questions {
            questions.push(Question::read_network_bytes(buf)?);
        }

        let mut answers = Vec::with_capacity(usize::from(header.num_answers));
        for _ in 0..header.num_answers {
            answers.push(Record::read_network_bytes(registry, buf)?);
        }

        let mut authority = Vec::with_capacity(usize::from(header.num_authority));
        for _ in 0..header.num_authority {
            authority.push(Record::read_network_bytes(registry, buf)?);
        }

        let mut extra = Vec::with_capacity(usize::from(header.num_extra));
        for _ in 0..header.num_extra {
            extra.push(Record::read_network_bytes(registry, buf)?);
        }

        Ok(Self {
            id: header.id,
            flags: header.flags,
            questions,
            answers,
            authority,
            extra,
        })
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
struct Header {
    id: MessageId,
    flags: Flags,
    num_questions: u16,
    num_answers: u16,
    num_authority: u16,
    num_extra: u16,
}

impl Header {
    fn write_network_bytes(&self, buf: &mut ByteWriter) -> Result<(), DnsqError> {
        buf.write_u16::<NetworkEndian>(self.id.into())?;
        buf.write_u16::<NetworkEndian>(self.flags.as_u16())?;
        buf.write_u16::<NetworkEndian>(self.num_questions)?;
        buf.write_u16::<NetworkEndian>(self.num_answers)?;
        buf.write_u16::<NetworkEndian>(self.num_authority)?;
        Ok(buf.write_u16::<NetworkEndian>(self.num_extra)?)
    }

    fn read_network_bytes(buf: &mut ByteCursor<'_>) -> Result<Self, DnsqError> {
        let id = MessageId::from(buf.read_u16()?);
        let flags = Flags::try_from(buf.read_u16()?)?;
        let num_questions = buf.read_u16()?;
        let num_answers = buf.read_u16()?;
        let num_authority = buf.read_u16()?;
        let num_extra = buf.read_u16()?;

        Ok(Header {
            id,
            flags,
            num_questions,
            num_answers,
            num_authority,
            num_extra,
        })
    }
}

#[derive(Default, Copy, Clone, Eq, PartialEq)]
#[repr(transparent)]
pub struct Flags(u16);

impl Flags {
    const MASK_QR: u16 = 0b1000_0000_0000_0000; // query / response
    const MASK_OP: u16 = 0b0111_1000_0000_0000; // 4 bits, op code
    const MASK_AA: u16 = 0b0000_0100_0000_0000; // authoritative answer
    const MASK_TC: u16 = 0b0000_0010_0000_0000; // truncated
    const MASK_RD: u16 = 0b0000_0001_0000_0000; // recursion desired
    const MASK_RA: u16 = 0b0000_0000_1000_0000; // recursion available
    const MASK_Z: u16 = 0b0000_0000_0100_0000; // reserved
    const MASK_AD: u16 = 0b0000_0000_0010_0000; // authentic data
    const MASK_CD: u16 = 0b0000_0000_0001_0000; // checking disabled
    const MASK_RC: u16 = 0b0000_0000_0000_1111; // 4 bits, response code

    const OFFSET_QR: usize = 15;
    const OFFSET_OP: usize = 11;
    const OFFSET_AA: usize = 10;
    const OFFSET_TC: usize = 9;
    const OFFSET_RD: usize = 8;
    const OFFSET_RA: usize = 7;
    const OFFSET_Z: usize = 6;
    const OFFSET_AD: usize = 5;
    const OFFSET_CD: usize = 4;
    const OFFSET_RC: usize = 0;

    pub fn size(&self) -> usize {
        2
    }

    pub fn is_query(&self) -> bool {
        self.0 & Self::MASK_QR == 0
    }

    pub fn set_query(self) -> Self {
        Flags(self.0 & !Self::MASK_QR)
    }

    pub fn is_response(&self) -> bool {
        self.0 & Self::MASK_QR > 0
    }

    pub fn set_response(self) -> Self {
        Flags(self.0 | Self::MASK_QR)
    }

    pub fn get_op_code(&self) -> Operation {
        // Flags are only ever built from valid operations
        Operation::try_from((self.0 & Self::MASK_OP) >> Self::OFFSET_OP).unwrap_or_default()
    }

    pub fn set_op_code(self, op: Operation) -> Self {
        let op = (op as u16) << Self::OFFSET_OP;
        Flags((self.0 & !Self::MASK_OP) | op)
    }

    pub fn is_authoritative(&self) -> bool {
        self.0 & Self::MASK_AA > 0
    }

    pub fn set_authoritative(self) -> Self {
        Flags(self.0 | Self::MASK_AA)
    }

    pub fn is_truncated(&self) -> bool {
        self.0 & Self::MASK_TC > 0
    }

    pub fn set_truncated(self) -> Self {
        Flags(self.0 | Self::MASK_TC)
    }

    pub fn is_recursion_desired(&self) -> bool {
        self.0 & Self::MASK_RD > 0
    }

    pub fn set_recursion_desired(self) -> Self {
        Flags(self.0 | Self::MASK_RD)
    }

    pub fn is_recursion_available(&self) -> bool {
        self.0 & Self::MASK_RA > 0
    }

    pub fn set_recursion_available(self) -> Self {
        Flags(self.0 | Self::MASK_RA)
    }

    pub fn is_authentic_data(&self) -> bool {
        self.0 & Self::MASK_AD > 0
    }

    pub fn set_authentic_data(self) -> Self {
        Flags(self.0 | Self::MASK_AD)
    }

    pub fn is_checking_disabled(&self) -> bool {
        self.0 & Self::MASK_CD > 0
    }

    pub fn set_checking_disabled(self) -> Self {
        Flags(self.0 | Self::MASK_CD)
    }

    pub fn get_response_code(&self) -> ResponseCode {
        // Flags are only ever built from valid response codes
        ResponseCode::try_from((self.0 & Self::MASK_RC) >> Self::OFFSET_RC).unwrap_or_default()
    }

    pub fn set_response_code(self, code: ResponseCode) -> Self {
        let code = (code as u16) << Self::OFFSET_RC;
        Flags((self.0 & !Self::MASK_RC) | code)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for Flags {
    type Error = DnsqError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        // Operation and response code must be known values, everything else is
        // an on/off bit where any combination is accepted.
        let _op = Operation::try_from((value & Self::MASK_OP) >> Self::OFFSET_OP)?;
        let _rc = ResponseCode::try_from((value & Self::MASK_RC) >> Self::OFFSET_RC)?;
        Ok(Flags(value))
    }
}

impl Debug for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let qr = (self.0 & Self::MASK_QR) >> Self::OFFSET_QR;
        let op = self.get_op_code();
        let aa = (self.0 & Self::MASK_AA) >> Self::OFFSET_AA;
        let tc = (self.0 & Self::MASK_TC) >> Self::OFFSET_TC;
        let rd = (self.0 & Self::MASK_RD) >> Self::OFFSET_RD;
        let ra = (self.0 & Self::MASK_RA) >> Self::OFFSET_RA;
        let z = (self.0 & Self::MASK_Z) >> Self::OFFSET_Z;
        let ad = (self.0 & Self::MASK_AD) >> Self::OFFSET_AD;
        let cd = (self.0 & Self::MASK_CD) >> Self::OFFSET_CD;
        let rc = self.get_response_code();

        write!(
            f,
            "Flags{{qr = {qr}, op = {op:?}, aa = {aa}, tc = {tc}, rd = {rd}, ra = {ra}, z = {z}, ad = {ad}, cd = {cd}, rc = {rc:?}}}"
        )
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
#[repr(u16)]
pub enum ResponseCode {
    #[default]
    NoError = 0,
    FormatError = 1,
    ServerFailure = 2,
    NameError = 3,
    NotImplemented = 4,
    Refused = 5,
    YxDomain = 6,
    YxRrSet = 7,
    NxRrSet = 8,
    NotAuth = 9,
    NotZone = 10,
}

impl TryFrom<u16> for ResponseCode {
    type Error = DnsqError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ResponseCode::NoError),
            1 => Ok(ResponseCode::FormatError),
            2 => Ok(ResponseCode::ServerFailure),
            3 => Ok(ResponseCode::NameError),
            4 => Ok(ResponseCode::NotImplemented),
            5 => Ok(ResponseCode::Refused),
            6 => Ok(ResponseCode::YxDomain),
            7 => Ok(ResponseCode::YxRrSet),
            8 => Ok(ResponseCode::NxRrSet),
            9 => Ok(ResponseCode::NotAuth),
            10 => Ok(ResponseCode::NotZone),
            _ => Err(DnsqError::invalid_data(format!(
                "invalid or unsupported response code {}",
                value
            ))),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
#[repr(u16)]
pub enum Operation {
    #[default]
    Query = 0,
    IQuery = 1,
    Status = 2,
    Notify = 4,
    Update = 5,
}

impl TryFrom<u16> for Operation {
    type Error = DnsqError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Operation::Query),
            1 => Ok(Operation::IQuery),
            2 => Ok(Operation::Status),
            4 => Ok(Operation::Notify),
            5 => Ok(Operation::Update),
            _ => Err(DnsqError::invalid_data(format!(
                "invalid or unsupported operation {}",
                value
            ))),
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Question {
    name: Name,
    qtype: RecordType,
    qclass: RecordClass,
}

impl Question {
    pub fn new(name: Name, qtype: RecordType) -> Self {
        Self {
            name,
            qtype,
            qclass: RecordClass::INET,
        }
    }

    pub fn size(&self) -> usize {
        usize::from(self.name.size()) + 2 + 2
    }

    pub fn set_qclass(mut self, qclass: RecordClass) -> Self {
        self.qclass = qclass;
        self
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn qtype(&self) -> RecordType {
        self.qtype
    }

    pub fn qclass(&self) -> RecordClass {
        self.qclass
    }

    pub fn write_network_bytes(&self, buf: &mut ByteWriter) -> Result<(), DnsqError> {
        self.name.write_network_bytes(buf)?;
        buf.write_u16::<NetworkEndian>(self.qtype.into())?;
        Ok(buf.write_u16::<NetworkEndian>(self.qclass.into())?)
    }

    pub fn read_network_bytes(buf: &mut ByteCursor<'_>) -> Result<Self, DnsqError> {
        let name = Name::read_network_bytes(buf)?;
        let qtype = RecordType::from(buf.read_u16()?);
        let qclass = RecordClass::from(buf.read_u16()?);
        Ok(Self { name, qtype, qclass })
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Record {
    name: Name,
    rtype: RecordType,
    rclass: RecordClass,
    ttl: u32,
    rdata: RecordData,
}

impl Record {
    const DNSSEC_OK: u32 = 0x0000_8000;

    pub fn new(name: Name, rtype: RecordType, rclass: RecordClass, ttl: u32, rdata: RecordData) -> Self {
        Self {
            name,
            rtype,
            rclass,
            ttl,
            rdata,
        }
    }

    /// EDNS OPT pseudo-record advertising `payload_size` bytes as the largest UDP
    /// response this client can handle (RFC 6891).
    pub fn opt(payload_size: u16, dnssec_ok: bool) -> Self {
        let ttl = if dnssec_ok { Self::DNSSEC_OK } else { 0 };
        Self::new(
            Name::root(),
            RecordType::OPT,
            RecordClass::from(payload_size),
            ttl,
            RecordData::OPT(RecordDataOpt::empty()),
        )
    }

    /// UDP payload size if this is an OPT record, the class field is reused for it.
    pub fn udp_payload_size(&self) -> Option<u16> {
        if self.rtype == RecordType::OPT {
            Some(self.rclass.into())
        } else {
            None
        }
    }

    /// True if this is an OPT record with the DNSSEC OK bit set.
    pub fn dnssec_ok(&self) -> bool {
        self.rtype == RecordType::OPT && self.ttl & Self::DNSSEC_OK > 0
    }

    pub fn size(&self) -> usize {
        usize::from(self.name.size())
            + 2 // type
            + 2 // class
            + 4 // ttl
            + 2 // rdata length
            + self.rdata.size()
    }

    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn rtype(&self) -> RecordType {
        self.rtype
    }

    pub fn rclass(&self) -> RecordClass {
        self.rclass
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn rdata(&self) -> &RecordData {
        &self.rdata
    }

    pub fn write_network_bytes(&self, registry: &RecordRegistry, buf: &mut ByteWriter) -> Result<(), DnsqError> {
        self.name.write_network_bytes(buf)?;
        buf.write_u16::<NetworkEndian>(self.rtype.into())?;
        buf.write_u16::<NetworkEndian>(self.rclass.into())?;
        buf.write_u32::<NetworkEndian>(self.ttl)?;

        // Record data may contain compressed names so its length isn't known until
        // it has been written. Write a placeholder and fill it in afterwards.
        let len_offset = buf.offset();
        buf.write_u16::<NetworkEndian>(0)?;
        let start = buf.offset();
        registry.encode(self.rtype, &self.rdata, buf)?;

        let len = buf.offset() - start;
        let len = u16::try_from(len).map_err(|e| {
            DnsqError::invalid_data_cause(format!("{} record data of {} bytes is too long", self.rtype, len), e)
        })?;

        buf.patch_u16(len_offset, len)
    }

    pub fn read_network_bytes(registry: &RecordRegistry, buf: &mut ByteCursor<'_>) -> Result<Self, DnsqError> {
        let name = Name::read_network_bytes(buf)?;
        let rtype = RecordType::from(buf.read_u16()?);
        let rclass = RecordClass::from(buf.read_u16()?);
        let ttl = buf.read_u32()?;
        let rdata_len = buf.read_u16()?;
        let mut rdata_buf = buf.split_to(usize::from(rdata_len))?;
        let rdata = registry.decode(rtype, &mut rdata_buf)?;

        Ok(Self {
            name,
            rtype,
            rclass,
            ttl,
            rdata,
        })
    }
}
