use std::error;
use std::fmt;
use std::io;
use std::time::Duration;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum ErrorKind {
    /// A read needed more bytes than the buffer had left.
    Truncated,
    /// Header counts declare more entries than the remaining bytes can hold.
    ShortPacket,
    /// A name label length byte used one of the reserved `01` or `10` prefixes.
    InvalidLabelLength,
    /// A compression pointer did not point strictly backwards.
    MalformedPointer,
    /// A decompressed name was longer than 255 bytes.
    NameTooLong,
    /// A compression offset could not be represented in 14 bits.
    PointerRange,
    InvalidData,
    Transport,
    Timeout,
    Protocol,
    Configuration,
}

impl ErrorKind {
    /// Return true if this kind of error was raised by the network or a deadline
    /// rather than by the contents of a message.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport | Self::Timeout)
    }

    /// Return true if this kind of error was raised while encoding or decoding
    /// a message.
    pub fn is_codec(&self) -> bool {
        matches!(
            self,
            Self::Truncated
                | Self::ShortPacket
                | Self::InvalidLabelLength
                | Self::MalformedPointer
                | Self::NameTooLong
                | Self::PointerRange
                | Self::InvalidData
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "truncated data"),
            Self::ShortPacket => write!(f, "short packet"),
            Self::InvalidLabelLength => write!(f, "invalid label length"),
            Self::MalformedPointer => write!(f, "malformed pointer"),
            Self::NameTooLong => write!(f, "name too long"),
            Self::PointerRange => write!(f, "pointer out of range"),
            Self::InvalidData => write!(f, "invalid data"),
            Self::Transport => write!(f, "transport error"),
            Self::Timeout => write!(f, "timeout"),
            Self::Protocol => write!(f, "protocol error"),
            Self::Configuration => write!(f, "configuration error"),
        }
    }
}

#[derive(Debug)]
enum ErrorRepr {
    Message(String),
    Cause(Box<dyn error::Error + Send + Sync + 'static>),
    MessageCause(String, Box<dyn error::Error + Send + Sync + 'static>),
}

#[derive(Debug)]
pub struct DnsqError {
    kind: ErrorKind,
    repr: ErrorRepr,
}

impl DnsqError {
    fn message<S>(kind: ErrorKind, msg: S) -> DnsqError
    where
        S: Into<String>,
    {
        DnsqError {
            kind,
            repr: ErrorRepr::Message(msg.into()),
        }
    }

    fn message_cause<S, E>(kind: ErrorKind, msg: S, e: E) -> DnsqError
    where
        S: Into<String>,
        E: error::Error + Send + Sync + 'static,
    {
        DnsqError {
            kind,
            repr: ErrorRepr::MessageCause(msg.into(), Box::new(e)),
        }
    }

    pub fn truncated<S>(msg: S) -> DnsqError
    where
        S: Into<String>,
    {
        Self::message(ErrorKind::Truncated, msg)
    }

    pub fn short_packet<S>(msg: S) -> DnsqError
    where
        S: Into<String>,
    {
        Self::message(ErrorKind::ShortPacket, msg)
    }

    pub fn invalid_label_length(len: u8) -> DnsqError {
        Self::message(
            ErrorKind::InvalidLabelLength,
            format!("label length byte {:#04x} uses a reserved prefix", len),
        )
    }

    pub fn malformed_pointer<S>(msg: S) -> DnsqError
    where
        S: Into<String>,
    {
        Self::message(ErrorKind::MalformedPointer, msg)
    }

    pub fn name_too_long<S>(msg: S) -> DnsqError
    where
        S: Into<String>,
    {
        Self::message(ErrorKind::NameTooLong, msg)
    }

    pub fn pointer_range(offset: usize) -> DnsqError {
        Self::message(
            ErrorKind::PointerRange,
            format!("offset {} cannot be used as a compression pointer", offset),
        )
    }

    pub fn invalid_data<S>(msg: S) -> DnsqError
    where
        S: Into<String>,
    {
        Self::message(ErrorKind::InvalidData, msg)
    }

    pub fn invalid_data_cause<S, E>(msg: S, e: E) -> DnsqError
    where
        S: Into<String>,
        E: error::Error + Send + Sync + 'static,
    {
        Self::message_cause(ErrorKind::InvalidData, msg, e)
    }

    pub fn transport<S>(msg: S) -> DnsqError
    where
        S: Into<String>,
    {
        Self::message(ErrorKind::Transport, msg)
    }

    pub fn transport_cause<S, E>(msg: S, e: E) -> DnsqError
    where
        S: Into<String>,
        E: error::Error + Send + Sync + 'static,
    {
        Self::message_cause(ErrorKind::Transport, msg, e)
    }

    pub fn timeout<D>(t: Duration, operation: D) -> DnsqError
    where
        D: fmt::Display,
    {
        Self::message(
            ErrorKind::Timeout,
            format!("operation {} timed out after {:?}", operation, t),
        )
    }

    pub fn protocol<S>(msg: S) -> DnsqError
    where
        S: Into<String>,
    {
        Self::message(ErrorKind::Protocol, msg)
    }

    pub fn protocol_cause<S, E>(msg: S, e: E) -> DnsqError
    where
        S: Into<String>,
        E: error::Error + Send + Sync + 'static,
    {
        Self::message_cause(ErrorKind::Protocol, msg, e)
    }

    pub fn configuration<S>(msg: S) -> DnsqError
    where
        S: Into<String>,
    {
        Self::message(ErrorKind::Configuration, msg)
    }

    pub fn configuration_cause<S, E>(msg: S, e: E) -> DnsqError
    where
        S: Into<String>,
        E: error::Error + Send + Sync + 'static,
    {
        Self::message_cause(ErrorKind::Configuration, msg, e)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Kind of the underlying I/O error if this error was caused by one.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        let cause = match &self.repr {
            ErrorRepr::Message(_) => return None,
            ErrorRepr::Cause(e) => e,
            ErrorRepr::MessageCause(_, e) => e,
        };

        cause.downcast_ref::<io::Error>().map(|e| e.kind())
    }
}

impl fmt::Display for DnsqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            ErrorRepr::Message(msg) => write!(f, "{}: {}", self.kind, msg),
            ErrorRepr::Cause(e) => write!(f, "{}: {}", self.kind, e),
            ErrorRepr::MessageCause(msg, e) => write!(f, "{}: {}: {}", self.kind, msg, e),
        }
    }
}

impl error::Error for DnsqError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Message(_) => None,
            ErrorRepr::Cause(e) => Some(e.as_ref()),
            ErrorRepr::MessageCause(_, e) => Some(e.as_ref()),
        }
    }
}

impl From<(String, io::Error)> for DnsqError {
    fn from((msg, e): (String, io::Error)) -> Self {
        Self::message_cause(ErrorKind::Transport, msg, e)
    }
}

impl From<io::Error> for DnsqError {
    fn from(e: io::Error) -> Self {
        DnsqError {
            kind: ErrorKind::Transport,
            repr: ErrorRepr::Cause(Box::new(e)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{DnsqError, ErrorKind};
    use std::io;
    use std::time::Duration;

    #[test]
    fn test_error_kind_is_transport() {
        assert!(ErrorKind::Transport.is_transport());
        assert!(ErrorKind::Timeout.is_transport());
        assert!(!ErrorKind::Protocol.is_transport());
        assert!(!ErrorKind::Truncated.is_transport());
    }

    #[test]
    fn test_error_kind_is_codec() {
        assert!(ErrorKind::MalformedPointer.is_codec());
        assert!(ErrorKind::ShortPacket.is_codec());
        assert!(!ErrorKind::Transport.is_codec());
        assert!(!ErrorKind::Configuration.is_codec());
    }

    #[test]
    fn test_error_from_io_error() {
        let err = DnsqError::from(io::Error::from(io::ErrorKind::BrokenPipe));
        assert_eq!(ErrorKind::Transport, err.kind());
        assert_eq!(Some(io::ErrorKind::BrokenPipe), err.io_kind());
    }

    #[test]
    fn test_error_from_message_io_error() {
        let err = DnsqError::from(("connect".to_owned(), io::Error::from(io::ErrorKind::ConnectionRefused)));
        assert_eq!(ErrorKind::Transport, err.kind());
        assert_eq!(Some(io::ErrorKind::ConnectionRefused), err.io_kind());
        assert!(err.to_string().starts_with("transport error: connect: "));
    }

    #[test]
    fn test_error_io_kind_no_cause() {
        let err = DnsqError::protocol("bad");
        assert_eq!(None, err.io_kind());
    }

    #[test]
    fn test_error_timeout_display() {
        let err = DnsqError::timeout(Duration::from_secs(1), "exchange");
        assert_eq!(ErrorKind::Timeout, err.kind());
        assert_eq!("timeout: operation exchange timed out after 1s", err.to_string());
    }
}
