use crate::core::DnsqError;
use crate::dns::wire::{ByteCursor, ByteWriter};
use byteorder::{NetworkEndian, WriteBytesExt};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::str::FromStr;

/// Domain name made of zero or more labels. A name with no labels is the root.
///
/// Labels are arbitrary bytes (except NUL) and keep the case they were created
/// with. Comparison and hashing ignore ASCII case.
#[derive(Debug, Clone)]
pub struct Name {
    labels: Vec<Vec<u8>>,
}

impl Name {
    const MAX_LENGTH: usize = 255;
    const MAX_LABEL_LENGTH: usize = 63;

    pub fn root() -> Self {
        Name { labels: Vec::new() }
    }

    pub fn from_labels<I, L>(labels: I) -> Result<Self, DnsqError>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[u8]>,
    {
        let mut out = Vec::new();
        let mut size = 1;

        for label in labels {
            let label = label.as_ref();
            if label.is_empty() {
                return Err(DnsqError::invalid_data("name labels may not be empty"));
            }

            if label.len() > Self::MAX_LABEL_LENGTH {
                return Err(DnsqError::invalid_data(format!(
                    "name labels are limited to {} bytes max, got {}",
                    Self::MAX_LABEL_LENGTH,
                    label.len()
                )));
            }

            if label.contains(&0) {
                return Err(DnsqError::invalid_data("name labels may not contain NUL bytes"));
            }

            size += label.len() + 1;
            if size > Self::MAX_LENGTH {
                return Err(DnsqError::name_too_long(format!(
                    "names are limited to {} bytes max",
                    Self::MAX_LENGTH
                )));
            }

            out.push(label.to_vec());
        }

        Ok(Name { labels: out })
    }

    /// Size of this name on the wire when written without compression.
    pub fn size(&self) -> u16 {
        (self.labels.iter().map(|l| l.len()).sum::<usize>() + self.labels.len()) as u16 + 1
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &[u8]> {
        self.labels.iter().map(|l| l.as_slice())
    }

    /// Write this name, using pointers to earlier names in the message when `buf`
    /// has a compression map.
    pub fn write_network_bytes(&self, buf: &mut ByteWriter) -> Result<(), DnsqError> {
        for i in 0..self.labels.len() {
            let suffix = &self.labels[i..];
            if let Some(offset) = buf.names().and_then(|m| m.get(suffix)) {
                buf.write_u16::<NetworkEndian>(Self::POINTER_MASK | offset)?;
                return Ok(());
            }

            let here = buf.offset();
            if let Some(names) = buf.names_mut() {
                // Suffixes that start past the range of a pointer are still written,
                // they just can't be referenced by names written later.
                if let Err(e) = names.insert(suffix, here) {
                    tracing::trace!(message = "unable to record name suffix for compression", name = %self, err = %e);
                }
            }

            let label = &self.labels[i];
            buf.write_u8(label.len() as u8)?;
            buf.write_all(label)?;
        }

        Ok(buf.write_u8(0)?)
    }

    /// Write this name without pointers even if `buf` has a compression map.
    pub fn write_uncompressed(&self, buf: &mut ByteWriter) -> Result<(), DnsqError> {
        for label in self.labels.iter() {
            buf.write_u8(label.len() as u8)?;
            buf.write_all(label)?;
        }

        Ok(buf.write_u8(0)?)
    }

    pub fn read_network_bytes(buf: &mut ByteCursor<'_>) -> Result<Self, DnsqError> {
        let mut labels = Vec::new();
        let mut size = 1;

        loop {
            let here = buf.tell();
            let len = buf.read_u8()?;

            // Only the bytes up to and including the first pointer belong to this
            // name in the message. Anything the pointer refers to is read using a
            // separate cursor so `buf` ends up right after the pointer.
            if Self::is_offset(len) {
                let offset = Self::get_offset(len, buf.read_u8()?);
                Self::read_pointer_into(buf.buffer(), here, offset, &mut labels, &mut size)?;
                break;
            }

            if Self::read_label_into(buf, len, &mut labels, &mut size)? {
                break;
            }
        }

        Ok(Name { labels })
    }

    /// Follow a pointer found at `bound` to `offset`, reading labels (and following
    /// further pointers) until the root label. Every pointer must point strictly
    /// before the previous one so that a finite number of hops is possible.
    fn read_pointer_into(
        msg: &[u8],
        mut bound: usize,
        mut offset: usize,
        out: &mut Vec<Vec<u8>>,
        size: &mut usize,
    ) -> Result<(), DnsqError> {
        let mut cur = ByteCursor::new(msg);

        'hops: loop {
            if offset >= bound {
                return Err(DnsqError::malformed_pointer(format!(
                    "pointer to offset {} is not before offset {}",
                    offset, bound
                )));
            }

            cur.seek(offset)?;
            bound = offset;

            loop {
                let len = cur.read_u8()?;
                if Self::is_offset(len) {
                    offset = Self::get_offset(len, cur.read_u8()?);
                    continue 'hops;
                }

                if Self::read_label_into(&mut cur, len, out, size)? {
                    return Ok(());
                }
            }
        }
    }

    /// Read the next name label of length `len` into `out` and return true if the
    /// label was the root label and this name is complete, false otherwise.
    fn read_label_into(
        buf: &mut ByteCursor<'_>,
        len: u8,
        out: &mut Vec<Vec<u8>>,
        size: &mut usize,
    ) -> Result<bool, DnsqError> {
        if len == 0 {
            return Ok(true);
        }

        // 0b01 and 0b10 prefixes are reserved (or obsolete extended labels)
        if len as usize > Self::MAX_LABEL_LENGTH {
            return Err(DnsqError::invalid_label_length(len));
        }

        *size += len as usize + 1;
        if *size > Self::MAX_LENGTH {
            return Err(DnsqError::name_too_long(format!(
                "max size for name ({}) exceeded reading {} byte label",
                Self::MAX_LENGTH,
                len
            )));
        }

        let label = buf.consume(len as usize)?;
        if label.contains(&0) {
            return Err(DnsqError::invalid_data("name label contains NUL byte"));
        }

        out.push(label.to_vec());
        Ok(false)
    }

    const POINTER_MASK: u16 = 0b1100_0000_0000_0000;

    fn is_offset(len: u8) -> bool {
        len & 0b1100_0000 == 0b1100_0000
    }

    fn get_offset(len: u8, next: u8) -> usize {
        let pointer = ((len & 0b0011_1111) as u16) << 8;
        (pointer | (next as u16)) as usize
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.labels.len() == other.labels.len()
            && self
                .labels
                .iter()
                .zip(other.labels.iter())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.labels.len());
        for label in self.labels.iter() {
            state.write_usize(label.len());
            for b in label.iter() {
                state.write_u8(b.to_ascii_lowercase());
            }
        }
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            return write!(f, ".");
        }

        for label in self.labels.iter() {
            for &b in label.iter() {
                match b {
                    b'.' | b'\\' => write!(f, "\\{}", b as char)?,
                    0x21..=0x7E => write!(f, "{}", b as char)?,
                    _ => write!(f, "\\{:03}", b)?,
                }
            }

            write!(f, ".")?;
        }

        Ok(())
    }
}

impl FromStr for Name {
    type Err = DnsqError;

    /// Parse a name with or without the trailing `.`. Backslash escapes of the
    /// form `\.` and `\DDD` produced by `Display` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s == "." {
            return Ok(Self::root());
        }

        let bytes = s.as_bytes();
        let mut labels = Vec::new();
        let mut label = Vec::new();
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\\' => {
                    let digits = bytes.get(i + 1..i + 4).filter(|d| d.iter().all(u8::is_ascii_digit));
                    if let Some(d) = digits {
                        let v = d.iter().fold(0u32, |acc, c| acc * 10 + (c - b'0') as u32);
                        let v = u8::try_from(v)
                            .map_err(|e| DnsqError::invalid_data_cause(format!("invalid escape in name {}", s), e))?;
                        label.push(v);
                        i += 4;
                    } else if let Some(c) = bytes.get(i + 1) {
                        label.push(*c);
                        i += 2;
                    } else {
                        return Err(DnsqError::invalid_data(format!("dangling escape in name {}", s)));
                    }
                }
                b'.' => {
                    if label.is_empty() {
                        return Err(DnsqError::invalid_data(format!("empty label in name {}", s)));
                    }

                    labels.push(std::mem::take(&mut label));
                    i += 1;
                }
                c => {
                    label.push(c);
                    i += 1;
                }
            }
        }

        if !label.is_empty() {
            labels.push(label);
        }

        Self::from_labels(labels)
    }
}

/// Offsets of name suffixes already written to a message, keyed by the
/// lowercase labels of the suffix.
#[derive(Debug, Default)]
pub struct CompressionMap {
    offsets: HashMap<Vec<Vec<u8>>, u16>,
}

impl CompressionMap {
    const MAX_OFFSET: usize = 0b0011_1111_1111_1111;

    pub fn get(&self, suffix: &[Vec<u8>]) -> Option<u16> {
        self.offsets.get(&Self::key(suffix)).copied()
    }

    /// Record the offset `suffix` was written at. Only the first offset written for
    /// a suffix is kept. Fails if `offset` cannot be represented by a pointer.
    pub fn insert(&mut self, suffix: &[Vec<u8>], offset: usize) -> Result<(), DnsqError> {
        if offset > Self::MAX_OFFSET {
            return Err(DnsqError::pointer_range(offset));
        }

        self.offsets.entry(Self::key(suffix)).or_insert(offset as u16);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    fn key(suffix: &[Vec<u8>]) -> Vec<Vec<u8>> {
        suffix.iter().map(|l| l.to_ascii_lowercase()).collect()
    }
}

#[cfg(test)]
mod test {
    use super::{CompressionMap, Name};
    use crate::core::ErrorKind;
    use crate::dns::wire::{ByteCursor, ByteWriter};
    use std::collections::HashSet;
    use std::io::Write;
    use std::str::FromStr;

    #[test]
    fn test_name_from_str_max_length() {
        let parts = vec![
            "a".repeat(Name::MAX_LABEL_LENGTH),
            "b".repeat(Name::MAX_LABEL_LENGTH),
            "c".repeat(Name::MAX_LABEL_LENGTH),
            "d".repeat(Name::MAX_LABEL_LENGTH),
            "com.".to_owned(),
        ];
        let res = Name::from_str(&parts.join("."));
        assert_eq!(ErrorKind::NameTooLong, res.unwrap_err().kind());
    }

    #[test]
    fn test_name_from_str_error_max_label() {
        let parts = vec!["a".repeat(Name::MAX_LABEL_LENGTH + 1), "com.".to_owned()];
        let res = Name::from_str(&parts.join("."));
        assert_eq!(ErrorKind::InvalidData, res.unwrap_err().kind());
    }

    #[test]
    fn test_name_from_str_error_empty_label() {
        let res = Name::from_str("example..com.");
        assert!(res.is_err());
    }

    #[test]
    fn test_name_from_str_success_fqdn() {
        let name = Name::from_str("example.com.").unwrap();
        assert!(!name.is_root());
        assert_eq!("example.com.", name.to_string());
    }

    #[test]
    fn test_name_from_str_success_not_fqdn() {
        let name = Name::from_str("example.com").unwrap();
        assert_eq!("example.com.", name.to_string());
    }

    #[test]
    fn test_name_from_str_success_root_empty() {
        let name = Name::from_str("").unwrap();
        assert!(name.is_root());
    }

    #[test]
    fn test_name_from_str_success_root_dot() {
        let name = Name::from_str(".").unwrap();
        assert!(name.is_root());
        assert_eq!(".", name.to_string());
    }

    #[test]
    fn test_name_from_str_escapes() {
        let name = Name::from_str("a\\.b.c\\032d.").unwrap();
        let labels: Vec<&[u8]> = name.labels().collect();
        assert_eq!(vec![&b"a.b"[..], &b"c d"[..]], labels);
        assert_eq!("a\\.b.c\\032d.", name.to_string());
    }

    #[test]
    fn test_name_from_labels_nul() {
        let res = Name::from_labels([&b"ex\0ample"[..]]);
        assert_eq!(ErrorKind::InvalidData, res.unwrap_err().kind());
    }

    #[test]
    fn test_name_eq_ignores_case() {
        let a = Name::from_str("WWW.Example.COM.").unwrap();
        let b = Name::from_str("www.example.com.").unwrap();
        assert_eq!(a, b);
        assert_eq!("WWW.Example.COM.", a.to_string());

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_name_size_root() {
        let name = Name::root();
        assert_eq!(1, name.size());
    }

    #[test]
    fn test_name_size_non_root() {
        let name = Name::from_str("example.com.").unwrap();
        assert_eq!(13, name.size());
    }

    #[test]
    fn test_name_write_network_bytes_root() {
        let mut buf = ByteWriter::compressed();
        let name = Name::root();
        name.write_network_bytes(&mut buf).unwrap();

        assert_eq!(vec![0], buf.into_inner());
    }

    #[rustfmt::skip]
    #[test]
    fn test_name_write_network_bytes_not_root() {
        let mut buf = ByteWriter::new();
        let name = Name::from_str("example.com.").unwrap();
        name.write_network_bytes(&mut buf).unwrap();

        assert_eq!(
            vec![
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
    fn test_name_write_network_bytes_compressed() {
        let mut buf = ByteWriter::compressed();
        Name::from_str("example.com.").unwrap().write_network_bytes(&mut buf).unwrap();
        Name::from_str("www.EXAMPLE.com.").unwrap().write_network_bytes(&mut buf).unwrap();
        Name::from_str("example.com.").unwrap().write_network_bytes(&mut buf).unwrap();
        Name::from_str("org.").unwrap().write_network_bytes(&mut buf).unwrap();

        assert_eq!(
            vec![
                7,                                // length
                101, 120, 97, 109, 112, 108, 101, // "example"
                3,                                // length
                99, 111, 109,                     // "com"
                0,                                // root
                3,                                // length
                119, 119, 119,                    // "www"
                192, 0,                           // pointer to offset 0
                192, 0,                           // pointer to offset 0
                3,                                // length
                111, 114, 103,                    // "org"
                0,                                // root
            ],
            buf.into_inner(),
        );
    }

    #[test]
    fn test_name_write_uncompressed_ignores_map() {
        let mut buf = ByteWriter::compressed();
        let name = Name::from_str("example.com.").unwrap();
        name.write_network_bytes(&mut buf).unwrap();
        name.write_uncompressed(&mut buf).unwrap();

        let bytes = buf.into_inner();
        assert_eq!(26, bytes.len());
        assert_eq!(bytes[0..13], bytes[13..26]);
    }

    #[test]
    fn test_name_write_network_bytes_past_pointer_range() {
        let mut buf = ByteWriter::compressed();
        let name = Name::from_str("example.com.").unwrap();
        name.write_network_bytes(&mut buf).unwrap();

        buf.write_all(&[0; 0x4000]).unwrap();
        let start = buf.offset();

        // "www" can't be recorded this far into the message but "example.com" was
        // recorded at the start and is still used.
        let other = Name::from_str("www.example.com.").unwrap();
        other.write_network_bytes(&mut buf).unwrap();
        other.write_network_bytes(&mut buf).unwrap();

        let bytes = buf.into_inner();
        assert_eq!(&[3, b'w', b'w', b'w', 192, 0], &bytes[start..start + 6]);
        assert_eq!(&[3, b'w', b'w', b'w', 192, 0], &bytes[start + 6..]);
    }

    #[test]
    fn test_compression_map_first_offset_wins() {
        let mut map = CompressionMap::default();
        let suffix = vec![b"com".to_vec()];
        map.insert(&suffix, 10).unwrap();
        map.insert(&[b"COM".to_vec()], 20).unwrap();

        assert_eq!(Some(10), map.get(&suffix));
        assert_eq!(1, map.len());
    }

    #[test]
    fn test_compression_map_out_of_range() {
        let mut map = CompressionMap::default();
        let err = map.insert(&[b"com".to_vec()], 0x4000).unwrap_err();

        assert_eq!(ErrorKind::PointerRange, err.kind());
        assert!(map.is_empty());
    }

    #[rustfmt::skip]
    #[test]
    fn test_name_read_network_bytes_no_pointer() {
        let bytes = [
            7,                                // length
            101, 120, 97, 109, 112, 108, 101, // "example"
            3,                                // length
            99, 111, 109,                     // "com"
            0,                                // root
        ];

        let mut cur = ByteCursor::new(&bytes);
        let name = Name::read_network_bytes(&mut cur).unwrap();
        assert_eq!("example.com.", name.to_string());
        assert!(cur.at_end());
    }

    #[rustfmt::skip]
    #[test]
    fn test_name_read_network_bytes_single_pointer() {
        let bytes = [
            7,                                // length
            101, 120, 97, 109, 112, 108, 101, // "example"
            3,                                // length
            99, 111, 109,                     // "com"
            0,                                // root
            3,                                // length
            119, 119, 119,                    // "www"
            192, 0,                           // pointer to offset 0
            255,                              // next field
        ];

        let mut cur = ByteCursor::new(&bytes);
        cur.seek(13).unwrap();

        let name = Name::read_network_bytes(&mut cur).unwrap();
        assert_eq!("www.example.com.", name.to_string());
        assert_eq!(19, cur.tell());
    }

    #[rustfmt::skip]
    #[test]
    fn test_name_read_network_bytes_multiple_pointer() {
        let bytes = [
            7,                                // length
            101, 120, 97, 109, 112, 108, 101, // "example"
            3,                                // length
            99, 111, 109,                     // "com"
            0,                                // root
            3,                                // length
            119, 119, 119,                    // "www"
            192, 0,                           // pointer to offset 0
            3,                                // length
            100, 101, 118,                    // "dev"
            192, 13,                          // pointer to offset 13, "www"
        ];

        let mut cur = ByteCursor::new(&bytes);
        cur.seek(19).unwrap();

        let name = Name::read_network_bytes(&mut cur).unwrap();
        assert_eq!("dev.www.example.com.", name.to_string());
        assert!(cur.at_end());
    }

    #[test]
    fn test_name_read_network_bytes_pointer_loop() {
        let bytes = [
            192, 2, // pointer to offset 2
            192, 0, // pointer to offset 0
        ];

        let mut cur = ByteCursor::new(&bytes);
        let err = Name::read_network_bytes(&mut cur).unwrap_err();
        assert_eq!(ErrorKind::MalformedPointer, err.kind());
    }

    #[test]
    fn test_name_read_network_bytes_pointer_to_self() {
        let bytes = [
            192, 0, // pointer to offset 0
        ];

        let mut cur = ByteCursor::new(&bytes);
        let err = Name::read_network_bytes(&mut cur).unwrap_err();
        assert_eq!(ErrorKind::MalformedPointer, err.kind());
    }

    #[rustfmt::skip]
    #[test]
    fn test_name_read_network_bytes_pointer_cycle_through_labels() {
        let bytes = [
            1, 97,  // "a"
            192, 4, // pointer to offset 4
            1, 98,  // "b"
            192, 0, // pointer to offset 0
        ];

        let mut cur = ByteCursor::new(&bytes);
        cur.seek(4).unwrap();
        let err = Name::read_network_bytes(&mut cur).unwrap_err();
        assert_eq!(ErrorKind::MalformedPointer, err.kind());
    }

    #[test]
    fn test_name_read_network_bytes_reserved_label_length() {
        for len in [64u8, 128, 191] {
            let bytes = [len, 97, 0];
            let mut cur = ByteCursor::new(&bytes);
            let err = Name::read_network_bytes(&mut cur).unwrap_err();
            assert_eq!(ErrorKind::InvalidLabelLength, err.kind());
        }
    }

    #[test]
    fn test_name_read_network_bytes_too_long() {
        let mut bytes = Vec::new();
        for _ in 0..5 {
            bytes.push(63);
            bytes.extend_from_slice(&[b'a'; 63]);
        }
        bytes.push(0);

        let mut cur = ByteCursor::new(&bytes);
        let err = Name::read_network_bytes(&mut cur).unwrap_err();
        assert_eq!(ErrorKind::NameTooLong, err.kind());
    }

    #[test]
    fn test_name_read_network_bytes_max_length() {
        // Three 63 byte labels plus one 61 byte label is exactly 255 bytes
        let mut bytes = Vec::new();
        for _ in 0..3 {
            bytes.push(63);
            bytes.extend_from_slice(&[b'a'; 63]);
        }
        bytes.push(61);
        bytes.extend_from_slice(&[b'b'; 61]);
        bytes.push(0);

        let mut cur = ByteCursor::new(&bytes);
        let name = Name::read_network_bytes(&mut cur).unwrap();
        assert_eq!(255, name.size());
    }

    #[test]
    fn test_name_read_network_bytes_truncated_label() {
        let bytes = [7, 101, 120, 97];
        let mut cur = ByteCursor::new(&bytes);
        let err = Name::read_network_bytes(&mut cur).unwrap_err();
        assert_eq!(ErrorKind::Truncated, err.kind());
    }

    #[test]
    fn test_name_read_network_bytes_nul_in_label() {
        let bytes = [3, 97, 0, 98, 0];
        let mut cur = ByteCursor::new(&bytes);
        let err = Name::read_network_bytes(&mut cur).unwrap_err();
        assert_eq!(ErrorKind::InvalidData, err.kind());
    }

    #[test]
    fn test_name_compressed_round_trip() {
        let names = ["example.com.", "www.example.com.", "mail.example.com.", "example.org.", "."];
        let mut buf = ByteWriter::compressed();
        for n in names.iter() {
            Name::from_str(n).unwrap().write_network_bytes(&mut buf).unwrap();
        }

        let bytes = buf.into_inner();
        let mut cur = ByteCursor::new(&bytes);
        for n in names.iter() {
            let name = Name::read_network_bytes(&mut cur).unwrap();
            assert_eq!(*n, name.to_string());
        }

        assert!(cur.at_end());
    }
}
