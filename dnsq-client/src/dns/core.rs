use crate::core::DnsqError;
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u16)]
pub enum RecordType {
    A,
    NS,
    CNAME,
    SOA,
    PTR,
    MX,
    TXT,
    AAAA,
    SRV,
    OPT,
    AXFR,
    ANY,
    Unknown(u16),
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        match value {
            1 => Self::A,
            2 => Self::NS,
            5 => Self::CNAME,
            6 => Self::SOA,
            12 => Self::PTR,
            15 => Self::MX,
            16 => Self::TXT,
            28 => Self::AAAA,
            33 => Self::SRV,
            41 => Self::OPT,
            252 => Self::AXFR,
            255 => Self::ANY,
            v => Self::Unknown(v),
        }
    }
}

impl From<RecordType> for u16 {
    fn from(value: RecordType) -> Self {
        match value {
            RecordType::A => 1,
            RecordType::NS => 2,
            RecordType::CNAME => 5,
            RecordType::SOA => 6,
            RecordType::PTR => 12,
            RecordType::MX => 15,
            RecordType::TXT => 16,
            RecordType::AAAA => 28,
            RecordType::SRV => 33,
            RecordType::OPT => 41,
            RecordType::AXFR => 252,
            RecordType::ANY => 255,
            RecordType::Unknown(c) => c,
        }
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => write!(f, "A"),
            RecordType::NS => write!(f, "NS"),
            RecordType::CNAME => write!(f, "CNAME"),
            RecordType::SOA => write!(f, "SOA"),
            RecordType::PTR => write!(f, "PTR"),
            RecordType::MX => write!(f, "MX"),
            RecordType::TXT => write!(f, "TXT"),
            RecordType::AAAA => write!(f, "AAAA"),
            RecordType::SRV => write!(f, "SRV"),
            RecordType::OPT => write!(f, "OPT"),
            RecordType::AXFR => write!(f, "AXFR"),
            RecordType::ANY => write!(f, "ANY"),
            RecordType::Unknown(t) => write!(f, "TYPE{}", t),
        }
    }
}

impl FromStr for RecordType {
    type Err = DnsqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_uppercase();
        match s.as_ref() {
            "A" => Ok(RecordType::A),
            "NS" => Ok(RecordType::NS),
            "CNAME" => Ok(RecordType::CNAME),
            "SOA" => Ok(RecordType::SOA),
            "PTR" => Ok(RecordType::PTR),
            "MX" => Ok(RecordType::MX),
            "TXT" => Ok(RecordType::TXT),
            "AAAA" => Ok(RecordType::AAAA),
            "SRV" => Ok(RecordType::SRV),
            "OPT" => Ok(RecordType::OPT),
            "AXFR" => Ok(RecordType::AXFR),
            "ANY" => Ok(RecordType::ANY),
            v => v
                .strip_prefix("TYPE")
                .and_then(|n| n.parse::<u16>().ok())
                .map(RecordType::from)
                .ok_or_else(|| DnsqError::configuration(format!("unknown record type '{}'", v))),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u16)]
pub enum RecordClass {
    INET,
    CHAOS,
    HESIOD,
    NONE,
    ANY,
    Unknown(u16),
}

impl From<u16> for RecordClass {
    fn from(value: u16) -> Self {
        match value {
            1 => Self::INET,
            3 => Self::CHAOS,
            4 => Self::HESIOD,
            254 => Self::NONE,
            255 => Self::ANY,
            v => Self::Unknown(v),
        }
    }
}

impl From<RecordClass> for u16 {
    fn from(value: RecordClass) -> Self {
        match value {
            RecordClass::INET => 1,
            RecordClass::CHAOS => 3,
            RecordClass::HESIOD => 4,
            RecordClass::NONE => 254,
            RecordClass::ANY => 255,
            RecordClass::Unknown(c) => c,
        }
    }
}

impl Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordClass::INET => write!(f, "IN"),
            RecordClass::HESIOD => write!(f, "HS"),
            RecordClass::CHAOS => write!(f, "CH"),
            RecordClass::NONE => write!(f, "NONE"),
            RecordClass::ANY => write!(f, "ANY"),
            RecordClass::Unknown(c) => write!(f, "CLASS{}", c),
        }
    }
}

impl FromStr for RecordClass {
    type Err = DnsqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_uppercase();
        match s.as_ref() {
            "IN" | "INET" => Ok(RecordClass::INET),
            "HS" | "HESIOD" => Ok(RecordClass::HESIOD),
            "CH" | "CHAOS" => Ok(RecordClass::CHAOS),
            "NONE" => Ok(RecordClass::NONE),
            "ANY" => Ok(RecordClass::ANY),
            v => v
                .strip_prefix("CLASS")
                .and_then(|n| n.parse::<u16>().ok())
                .map(RecordClass::from)
                .ok_or_else(|| DnsqError::configuration(format!("unknown record class '{}'", v))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{RecordClass, RecordType};
    use std::str::FromStr;

    #[test]
    fn test_record_type_from_u16() {
        assert_eq!(RecordType::A, RecordType::from(1));
        assert_eq!(RecordType::MX, RecordType::from(15));
        assert_eq!(RecordType::SRV, RecordType::from(33));
        assert_eq!(RecordType::AXFR, RecordType::from(252));
        assert_eq!(RecordType::Unknown(99), RecordType::from(99));
    }

    #[test]
    fn test_record_type_to_u16() {
        assert_eq!(1, u16::from(RecordType::A));
        assert_eq!(12, u16::from(RecordType::PTR));
        assert_eq!(41, u16::from(RecordType::OPT));
        assert_eq!(99, u16::from(RecordType::Unknown(99)));
    }

    #[test]
    fn test_record_type_from_str() {
        assert_eq!(RecordType::AAAA, RecordType::from_str("aaaa").unwrap());
        assert_eq!(RecordType::MX, RecordType::from_str("MX").unwrap());
        assert_eq!(RecordType::Unknown(65), RecordType::from_str("TYPE65").unwrap());
        assert_eq!(RecordType::SRV, RecordType::from_str("type33").unwrap());
        assert!(RecordType::from_str("BOGUS").is_err());
    }

    #[test]
    fn test_record_type_display_unknown() {
        assert_eq!("TYPE65", RecordType::Unknown(65).to_string());
    }

    #[test]
    fn test_record_class_from_u16() {
        assert_eq!(RecordClass::INET, RecordClass::from(1));
        assert_eq!(RecordClass::CHAOS, RecordClass::from(3));
        assert_eq!(RecordClass::ANY, RecordClass::from(255));
        assert_eq!(RecordClass::Unknown(1232), RecordClass::from(1232));
    }

    #[test]
    fn test_record_class_to_u16() {
        assert_eq!(1, u16::from(RecordClass::INET));
        assert_eq!(254, u16::from(RecordClass::NONE));
        assert_eq!(4096, u16::from(RecordClass::Unknown(4096)));
    }

    #[test]
    fn test_record_class_from_str() {
        assert_eq!(RecordClass::INET, RecordClass::from_str("in").unwrap());
        assert_eq!(RecordClass::INET, RecordClass::from_str("INET").unwrap());
        assert_eq!(RecordClass::CHAOS, RecordClass::from_str("CH").unwrap());
        assert_eq!(RecordClass::Unknown(7), RecordClass::from_str("CLASS7").unwrap());
        assert!(RecordClass::from_str("BOGUS").is_err());
    }
}
