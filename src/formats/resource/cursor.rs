//! Positioned, endianness-aware reading and writing of container primitives
//!
//! Both halves carry the per-stream `big_endian` and `real_is_double`
//! flags from the container header; "real" values switch between f32 and
//! f64 accordingly. Text is a u32 byte count (including a mandatory
//! trailing NUL) followed by UTF-8 bytes.

use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

use crate::error::{Error, Result};

fn map_eof(err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::TruncatedInput
    } else {
        Error::Io(err)
    }
}

/// Sequential reader over an in-memory container stream.
pub struct Reader<'a> {
    cursor: Cursor<&'a [u8]>,
    pub big_endian: bool,
    pub real_is_double: bool,
}

macro_rules! reader_prim {
    ($name:ident, $ty:ty, $read:ident) => {
        pub fn $name(&mut self) -> Result<$ty> {
            if self.big_endian {
                self.cursor.$read::<BigEndian>().map_err(map_eof)
            } else {
                self.cursor.$read::<LittleEndian>().map_err(map_eof)
            }
        }
    };
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
            big_endian: false,
            real_is_double: false,
        }
    }

    pub fn get_u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(map_eof)
    }

    pub fn get_i8(&mut self) -> Result<i8> {
        self.cursor.read_i8().map_err(map_eof)
    }

    reader_prim!(get_u16, u16, read_u16);
    reader_prim!(get_i16, i16, read_i16);
    reader_prim!(get_u32, u32, read_u32);
    reader_prim!(get_i32, i32, read_i32);
    reader_prim!(get_u64, u64, read_u64);
    reader_prim!(get_i64, i64, read_i64);
    reader_prim!(get_f32, f32, read_f32);
    reader_prim!(get_f64, f64, read_f64);

    /// Read a "real" value at the width selected by `real_is_double`.
    pub fn get_real(&mut self) -> Result<f64> {
        if self.real_is_double {
            self.get_f64()
        } else {
            Ok(f64::from(self.get_f32()?))
        }
    }

    pub fn get_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.cursor.read_exact(&mut buf).map_err(map_eof)?;
        Ok(buf)
    }

    /// Read a length-prefixed, NUL-terminated UTF-8 string.
    pub fn get_unicode(&mut self) -> Result<String> {
        let len = self.get_u32()? as usize;
        if len == 0 {
            return Ok(String::new());
        }
        let buf = self.get_bytes(len)?;
        Ok(String::from_utf8_lossy(&buf[..len - 1]).into_owned())
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn seek(&mut self, pos: u64) {
        self.cursor.set_position(pos);
    }

    /// Move the cursor by a signed byte count, clamped to the stream.
    pub fn skip(&mut self, count: i64) {
        let len = self.cursor.get_ref().len() as i64;
        let pos = (self.cursor.position() as i64 + count).clamp(0, len);
        self.cursor.set_position(pos as u64);
    }

    /// The raw bytes consumed between `start` and the current position.
    pub fn span(&self, start: usize) -> &'a [u8] {
        &self.cursor.get_ref()[start..self.position()]
    }

    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }
}

/// Sequential writer producing an in-memory container stream.
pub struct Writer {
    buf: Vec<u8>,
    pub big_endian: bool,
    pub real_is_double: bool,
}

macro_rules! writer_prim {
    ($name:ident, $ty:ty, $write:ident) => {
        pub fn $name(&mut self, value: $ty) -> Result<()> {
            if self.big_endian {
                self.buf.$write::<BigEndian>(value)?;
            } else {
                self.buf.$write::<LittleEndian>(value)?;
            }
            Ok(())
        }
    };
}

impl Writer {
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            big_endian: false,
            real_is_double: false,
        }
    }

    pub fn store_u8(&mut self, value: u8) -> Result<()> {
        self.buf.write_u8(value)?;
        Ok(())
    }

    pub fn store_i8(&mut self, value: i8) -> Result<()> {
        self.buf.write_i8(value)?;
        Ok(())
    }

    writer_prim!(store_u16, u16, write_u16);
    writer_prim!(store_i16, i16, write_i16);
    writer_prim!(store_u32, u32, write_u32);
    writer_prim!(store_i32, i32, write_i32);
    writer_prim!(store_u64, u64, write_u64);
    writer_prim!(store_i64, i64, write_i64);
    writer_prim!(store_f32, f32, write_f32);
    writer_prim!(store_f64, f64, write_f64);

    /// Write a "real" value at the width selected by `real_is_double`.
    pub fn store_real(&mut self, value: f64) -> Result<()> {
        if self.real_is_double {
            self.store_f64(value)
        } else {
            self.store_f32(value as f32)
        }
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Write a length-prefixed, NUL-terminated UTF-8 string.
    pub fn store_unicode(&mut self, text: &str) -> Result<()> {
        self.store_u32(text.len() as u32 + 1)?;
        self.buf.extend_from_slice(text.as_bytes());
        self.buf.write_u8(0)?;
        Ok(())
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    /// Overwrite a previously written u64 slot (internal-resource offsets).
    pub fn patch_u64(&mut self, pos: usize, value: u64) {
        if self.big_endian {
            BigEndian::write_u64(&mut self.buf[pos..pos + 8], value);
        } else {
            LittleEndian::write_u64(&mut self.buf[pos..pos + 8], value);
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_roundtrip_little_endian() {
        let mut w = Writer::new();
        w.store_u32(0xDEADBEEF).unwrap();
        w.store_i64(-42).unwrap();
        w.store_f32(1.5).unwrap();
        w.store_unicode("locale").unwrap();
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        assert_eq!(r.get_u32().unwrap(), 0xDEADBEEF);
        assert_eq!(r.get_i64().unwrap(), -42);
        assert_eq!(r.get_f32().unwrap(), 1.5);
        assert_eq!(r.get_unicode().unwrap(), "locale");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_roundtrip_big_endian() {
        let mut w = Writer::new();
        w.big_endian = true;
        w.store_u32(0x01020304).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes, [0x01, 0x02, 0x03, 0x04]);

        let mut r = Reader::new(&bytes);
        r.big_endian = true;
        assert_eq!(r.get_u32().unwrap(), 0x01020304);
    }

    #[test]
    fn test_real_width_flag() {
        let mut w = Writer::new();
        w.store_real(2.5).unwrap();
        w.real_is_double = true;
        w.store_real(2.5).unwrap();
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 4 + 8);

        let mut r = Reader::new(&bytes);
        assert_eq!(r.get_real().unwrap(), 2.5);
        r.real_is_double = true;
        assert_eq!(r.get_real().unwrap(), 2.5);
    }

    #[test]
    fn test_unicode_strips_trailing_nul() {
        let mut r = Reader::new(&[3, 0, 0, 0, b'h', b'i', 0]);
        assert_eq!(r.get_unicode().unwrap(), "hi");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_truncated_read() {
        let mut r = Reader::new(&[1, 2]);
        assert!(matches!(r.get_u32(), Err(Error::TruncatedInput)));
    }

    #[test]
    fn test_seek_skip_span() {
        let data = [0u8, 1, 2, 3, 4, 5, 6, 7];
        let mut r = Reader::new(&data);
        r.seek(4);
        assert_eq!(r.get_u8().unwrap(), 4);
        r.skip(-3);
        assert_eq!(r.position(), 2);
        let start = r.position();
        r.skip(4);
        assert_eq!(r.span(start), &[2, 3, 4, 5]);
    }

    #[test]
    fn test_patch_u64() {
        let mut w = Writer::new();
        w.store_u32(7).unwrap();
        let slot = w.position();
        w.store_u64(0).unwrap();
        w.patch_u64(slot, 0x1122334455667788);
        let bytes = w.into_bytes();

        let mut r = Reader::new(&bytes);
        assert_eq!(r.get_u32().unwrap(), 7);
        assert_eq!(r.get_u64().unwrap(), 0x1122334455667788);
    }
}
