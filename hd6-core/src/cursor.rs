use std::io::{self, Cursor, Read, Write};

use byteorder::{LE, ReadBytesExt, WriteBytesExt};
use encoding_rs::SHIFT_JIS;

/// Text encoding of fixed-length string fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextEncoding {
    /// The game's native encoding.
    #[default]
    ShiftJis,
    Utf8,
}

impl TextEncoding {
    /// Decode bytes, replacing undecodable sequences with U+FFFD.
    ///
    /// The second value is `true` when a replacement happened.
    pub fn decode_lossy(self, bytes: &[u8]) -> (String, bool) {
        match self {
            TextEncoding::ShiftJis => {
                let (text, had_errors) = SHIFT_JIS.decode_without_bom_handling(bytes);
                (text.into_owned(), had_errors)
            }
            TextEncoding::Utf8 => match std::str::from_utf8(bytes) {
                Ok(s) => (s.to_string(), false),
                Err(_) => (String::from_utf8_lossy(bytes).into_owned(), true),
            },
        }
    }

    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::ShiftJis => SHIFT_JIS.encode(text).0.into_owned(),
            TextEncoding::Utf8 => text.as_bytes().to_vec(),
        }
    }
}

/// Seekable little-endian cursor over a byte buffer.
///
/// Reads past the end fail with [`io::ErrorKind::UnexpectedEof`].
#[derive(Debug, Clone)]
pub struct ByteCursor<B> {
    inner: Cursor<B>,
}

impl<B> ByteCursor<B>
where
    B: AsRef<[u8]>,
{
    pub fn new(buf: B) -> Self {
        Self {
            inner: Cursor::new(buf),
        }
    }

    pub fn into_inner(self) -> B {
        self.inner.into_inner()
    }

    pub fn get_ref(&self) -> &B {
        self.inner.get_ref()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.get_ref().as_ref().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.inner.position() as usize
    }

    pub fn set_position(&mut self, pos: usize) {
        self.inner.set_position(pos as u64);
    }

    pub fn skip(&mut self, count: usize) {
        let pos = self.position().saturating_add(count);
        self.set_position(pos);
    }

    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.position())
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        self.inner.read_u8()
    }

    pub fn read_u16(&mut self) -> io::Result<u16> {
        self.inner.read_u16::<LE>()
    }

    pub fn read_u24(&mut self) -> io::Result<u32> {
        self.inner.read_u24::<LE>()
    }

    pub fn read_u32(&mut self) -> io::Result<u32> {
        self.inner.read_u32::<LE>()
    }

    pub fn read_i32(&mut self) -> io::Result<i32> {
        self.inner.read_i32::<LE>()
    }

    pub fn read_bytes(&mut self, count: usize) -> io::Result<Vec<u8>> {
        if count > self.remaining() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "read of {count} bytes at {} exceeds buffer of {} bytes",
                    self.position(),
                    self.len()
                ),
            ));
        }
        let mut buf = vec![0; count];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read a `len`-byte, null-padded string. Always consumes `len` bytes.
    pub fn read_fixed_str(&mut self, len: usize, encoding: TextEncoding) -> io::Result<String> {
        let raw = self.read_bytes(len)?;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        Ok(encoding.decode_lossy(&raw[..end]).0)
    }
}

impl<B> ByteCursor<B>
where
    B: AsRef<[u8]>,
    Cursor<B>: Write,
{
    pub fn write_u8(&mut self, value: u8) -> io::Result<()> {
        self.inner.write_u8(value)
    }

    pub fn write_u16(&mut self, value: u16) -> io::Result<()> {
        self.inner.write_u16::<LE>(value)
    }

    pub fn write_u24(&mut self, value: u32) -> io::Result<()> {
        self.inner.write_u24::<LE>(value)
    }

    pub fn write_u32(&mut self, value: u32) -> io::Result<()> {
        self.inner.write_u32::<LE>(value)
    }

    pub fn write_i32(&mut self, value: i32) -> io::Result<()> {
        self.inner.write_i32::<LE>(value)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)
    }

    /// Write `value` as exactly `len` bytes, truncating or zero-padding.
    pub fn write_fixed_str(&mut self, value: &str, len: usize, encoding: TextEncoding) -> io::Result<()> {
        let mut data = encoding.encode(value);
        data.resize(len, 0);
        self.write_bytes(&data)
    }
}
