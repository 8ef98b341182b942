use crate::core::DnsqError;
use crate::dns::name::CompressionMap;
use byteorder::{ByteOrder, NetworkEndian};
use std::io;

/// Bounds-checked reader over an entire DNS message.
///
/// Reads are limited to `end` which is the length of the message for a cursor
/// created with `new` or the end of a record's data for a cursor created with
/// `split_to`. The full message is always available via `buffer` so that
/// compression pointers can be resolved from anywhere.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            end: buf.len(),
        }
    }

    /// Current absolute offset within the message.
    pub fn tell(&self) -> usize {
        self.pos
    }

    /// Move to an absolute offset within the message. The offset may not be
    /// past the read limit of this cursor.
    pub fn seek(&mut self, offset: usize) -> Result<(), DnsqError> {
        if offset > self.end {
            return Err(DnsqError::truncated(format!(
                "cannot seek to offset {} past end {}",
                offset, self.end
            )));
        }

        self.pos = offset;
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.end - self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.end
    }

    /// The whole message this cursor reads from, regardless of position or limit.
    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    /// Return exactly `n` bytes and advance past them.
    pub fn consume(&mut self, n: usize) -> Result<&'a [u8], DnsqError> {
        if n > self.remaining() {
            return Err(DnsqError::truncated(format!(
                "need {} bytes at offset {}, only {} remain",
                n,
                self.pos,
                self.remaining()
            )));
        }

        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn peek_u8(&self) -> Result<u8, DnsqError> {
        if self.at_end() {
            return Err(DnsqError::truncated(format!("no bytes left at offset {}", self.pos)));
        }

        Ok(self.buf[self.pos])
    }

    pub fn read_u8(&mut self) -> Result<u8, DnsqError> {
        Ok(self.consume(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DnsqError> {
        Ok(NetworkEndian::read_u16(self.consume(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DnsqError> {
        Ok(NetworkEndian::read_u32(self.consume(4)?))
    }

    /// Return a cursor limited to the next `n` bytes and advance this cursor
    /// past them. The returned cursor can still resolve compression pointers
    /// anywhere in the message.
    pub fn split_to(&mut self, n: usize) -> Result<ByteCursor<'a>, DnsqError> {
        if n > self.remaining() {
            return Err(DnsqError::truncated(format!(
                "need {} bytes of record data at offset {}, only {} remain",
                n,
                self.pos,
                self.remaining()
            )));
        }

        let child = ByteCursor {
            buf: self.buf,
            pos: self.pos,
            end: self.pos + n,
        };

        self.pos += n;
        Ok(child)
    }
}

/// Growable buffer a DNS message is encoded into.
///
/// Writers created with `compressed` own a `CompressionMap` and names written
/// to them will use pointers to names previously written to the same message.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
    names: Option<CompressionMap>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compressed() -> Self {
        Self {
            buf: Vec::new(),
            names: Some(CompressionMap::default()),
        }
    }

    /// Offset within the message that the next byte will be written at.
    pub fn offset(&self) -> usize {
        self.buf.len()
    }

    /// Overwrite two bytes at `at` that have already been written.
    pub fn patch_u16(&mut self, at: usize, value: u16) -> Result<(), DnsqError> {
        if at + 2 > self.buf.len() {
            return Err(DnsqError::invalid_data(format!(
                "cannot patch offset {} of {} byte buffer",
                at,
                self.buf.len()
            )));
        }

        NetworkEndian::write_u16(&mut self.buf[at..at + 2], value);
        Ok(())
    }

    pub fn names(&self) -> Option<&CompressionMap> {
        self.names.as_ref()
    }

    pub fn names_mut(&mut self) -> Option<&mut CompressionMap> {
        self.names.as_mut()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

impl io::Write for ByteWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
