// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary record stream
//!
//! [`RecordStream`] walks the flat record sequence of an OpenFlight file:
//! each record is a 2-byte opcode, a 2-byte total length and `length - 4`
//! bytes of fields. The stream keeps the nesting level and the repeat flag
//! used for throw-back. [`FieldReader`] decodes the fields of one record
//! body with [nom](https://docs.rs/nom) number parsers, honouring the
//! stream's byte order.

use std::borrow::Cow;

use memchr::memchr;
use nom::number::complete as num;
pub use nom::number::Endianness;
use nom::IResult;

use crate::error::{Error, Result};
use crate::opcode::Opcode;
use crate::palette::PackedColor;

/// Size of the opcode + length prefix
pub const RECORD_HEADER_LEN: usize = 4;

/// Sequential cursor over the records of one file
#[derive(Debug, Clone)]
pub struct RecordStream<'a> {
    data: &'a [u8],
    endianness: Endianness,
    /// Start of the current record
    position: usize,
    opcode: Opcode,
    length: u16,
    level: i32,
    repeat: bool,
}

impl<'a> RecordStream<'a> {
    /// Create a stream over big-endian data, the byte order OpenFlight uses
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_endianness(data, Endianness::Big)
    }

    /// Create a stream with an explicit byte order
    pub fn with_endianness(data: &'a [u8], endianness: Endianness) -> Self {
        Self {
            data,
            endianness,
            position: 0,
            opcode: Opcode::Unknown(0),
            length: 0,
            level: 0,
            repeat: false,
        }
    }

    /// Move to the next record header.
    ///
    /// Skips the previous record's declared length unless the repeat flag is
    /// set, in which case the flag is cleared and the same header is offered
    /// again. Returns `Ok(false)` once fewer than 4 bytes remain.
    pub fn begin_record(&mut self) -> Result<bool> {
        if self.repeat {
            self.repeat = false;
        } else {
            self.position += self.length as usize;
            self.length = 0;
        }

        let available = self.data.len().saturating_sub(self.position);
        if available < RECORD_HEADER_LEN {
            return Ok(false);
        }

        let mut header = FieldReader::at(
            &self.data[self.position..self.position + RECORD_HEADER_LEN],
            self.endianness,
            self.position,
        );
        let raw = header.i16()?;
        let length = header.u16()?;

        if (length as usize) < RECORD_HEADER_LEN {
            return Err(Error::CorruptRecord {
                offset: self.position,
                opcode: raw,
                length,
            });
        }
        if length as usize > available {
            return Err(Error::Truncated {
                offset: self.position,
                needed: length as usize,
                available,
            });
        }

        self.opcode = Opcode::from_raw(raw);
        self.length = length;
        Ok(true)
    }

    /// Opcode of the current record
    #[inline]
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Declared length of the current record, header included
    #[inline]
    pub fn length(&self) -> u16 {
        self.length
    }

    /// Byte offset of the current record
    #[inline]
    pub fn offset(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn level(&self) -> i32 {
        self.level
    }

    #[inline]
    pub fn set_level(&mut self, level: i32) {
        self.level = level;
    }

    #[inline]
    pub fn repeat(&self) -> bool {
        self.repeat
    }

    /// Offer the current header again on the next [`begin_record`](Self::begin_record)
    #[inline]
    pub fn set_repeat(&mut self) {
        self.repeat = true;
    }

    #[inline]
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Field bytes of the current record
    pub fn body(&self) -> &'a [u8] {
        let start = self.position + RECORD_HEADER_LEN;
        let end = self.position + self.length as usize;
        &self.data[start.min(end)..end]
    }

    /// Field bytes zero-padded to at least `layout_len`.
    ///
    /// Older format revisions write shorter fixed-layout records; the missing
    /// tail reads as zeros.
    pub fn padded_body(&self, layout_len: usize) -> Cow<'a, [u8]> {
        let body = self.body();
        if body.len() >= layout_len {
            Cow::Borrowed(body)
        } else {
            let mut padded = body.to_vec();
            padded.resize(layout_len, 0);
            Cow::Owned(padded)
        }
    }

    /// Field reader over the current record body
    pub fn fields(&self) -> FieldReader<'a> {
        FieldReader::at(
            self.body(),
            self.endianness,
            self.position + RECORD_HEADER_LEN,
        )
    }

    /// Whether the body of the current record is shorter than `layout_len`
    pub fn is_short(&self, layout_len: usize) -> bool {
        self.body().len() < layout_len
    }
}

/// Typed cursor over the fields of one record
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    data: &'a [u8],
    offset: usize,
    /// Absolute file offset of `data[0]`, for error reporting
    base: usize,
    endianness: Endianness,
}

macro_rules! endian_field {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $size:literal) => {
        $(#[$doc])*
        pub fn $name(&mut self) -> Result<$ty> {
            let endianness = self.endianness;
            self.parse($size, num::$name::<&'a [u8], nom::error::Error<&'a [u8]>>(endianness))
        }
    };
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a [u8], endianness: Endianness) -> Self {
        Self::at(data, endianness, 0)
    }

    fn at(data: &'a [u8], endianness: Endianness, base: usize) -> Self {
        Self {
            data,
            offset: 0,
            base,
            endianness,
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn truncated(&self, needed: usize) -> Error {
        Error::Truncated {
            offset: self.base + self.offset,
            needed,
            available: self.remaining(),
        }
    }

    fn parse<T>(
        &mut self,
        size: usize,
        mut parser: impl FnMut(&'a [u8]) -> IResult<&'a [u8], T>,
    ) -> Result<T> {
        match parser(&self.data[self.offset..]) {
            Ok((_, value)) => {
                self.offset += size;
                Ok(value)
            }
            Err(_) => Err(self.truncated(size)),
        }
    }

    pub fn u8(&mut self) -> Result<u8> {
        self.parse(1, num::u8::<&'a [u8], nom::error::Error<&'a [u8]>>)
    }

    pub fn i8(&mut self) -> Result<i8> {
        self.parse(1, num::i8::<&'a [u8], nom::error::Error<&'a [u8]>>)
    }

    /// Single byte, non-zero is true
    pub fn bool(&mut self) -> Result<bool> {
        Ok(self.u8()? != 0)
    }

    endian_field!(i16, i16, 2);
    endian_field!(u16, u16, 2);
    endian_field!(i32, i32, 4);
    endian_field!(u32, u32, 4);
    endian_field!(i64, i64, 8);
    endian_field!(f32, f32, 4);
    endian_field!(f64, f64, 8);

    pub fn f64x3(&mut self) -> Result<[f64; 3]> {
        Ok([self.f64()?, self.f64()?, self.f64()?])
    }

    pub fn f32x3(&mut self) -> Result<[f32; 3]> {
        Ok([self.f32()?, self.f32()?, self.f32()?])
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(self.truncated(len));
        }
        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    /// Skip reserved bytes
    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.bytes(len).map(|_| ())
    }

    /// Fixed-width ASCII field, cut at the first NUL
    pub fn fixed_string(&mut self, len: usize) -> Result<String> {
        self.bytes(len).map(null_terminated)
    }

    /// Packed color stored as A, B, G, R bytes
    pub fn packed_color(&mut self) -> Result<PackedColor> {
        let a = self.u8()?;
        let b = self.u8()?;
        let g = self.u8()?;
        let r = self.u8()?;
        Ok(PackedColor { r, g, b, a })
    }
}

/// Decode a fixed-width byte buffer as a NUL-terminated string
pub fn null_terminated(bytes: &[u8]) -> String {
    let end = memchr(0, bytes).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i16_byte_order() {
        let bytes = [0x00, 0x01];
        assert_eq!(FieldReader::new(&bytes, Endianness::Big).i16().unwrap(), 1);
        assert_eq!(
            FieldReader::new(&bytes, Endianness::Little).i16().unwrap(),
            256
        );
    }

    #[test]
    fn test_wide_reads_byte_order() {
        let bytes = 1.5f64.to_be_bytes();
        assert_eq!(FieldReader::new(&bytes, Endianness::Big).f64().unwrap(), 1.5);

        let bytes = 0x0102_0304i32.to_le_bytes();
        assert_eq!(
            FieldReader::new(&bytes, Endianness::Little).i32().unwrap(),
            0x0102_0304
        );
        assert_eq!(
            FieldReader::new(&bytes, Endianness::Big).i32().unwrap(),
            0x0403_0201
        );
    }

    #[test]
    fn test_read_past_end_is_truncated() {
        let bytes = [0x00];
        let mut reader = FieldReader::new(&bytes, Endianness::Big);
        assert!(matches!(reader.u16(), Err(Error::Truncated { needed: 2, .. })));
    }

    #[test]
    fn test_null_terminated() {
        assert_eq!(null_terminated(b"g1\0\0\0\0\0\0"), "g1");
        assert_eq!(null_terminated(b"abcdefgh"), "abcdefgh");
        assert_eq!(null_terminated(b""), "");
    }

    #[test]
    fn test_begin_record_walks_and_repeats() {
        // PushLevel (10, len 4) then Comment (31, len 8, "hi")
        let data = [0, 10, 0, 4, 0, 31, 0, 8, b'h', b'i', 0, 0];
        let mut stream = RecordStream::new(&data);

        assert!(stream.begin_record().unwrap());
        assert_eq!(stream.opcode(), Opcode::PushLevel);

        assert!(stream.begin_record().unwrap());
        assert_eq!(stream.opcode(), Opcode::Comment);
        assert_eq!(stream.body(), b"hi\0\0");

        stream.set_repeat();
        assert!(stream.begin_record().unwrap());
        assert_eq!(stream.opcode(), Opcode::Comment);
        assert_eq!(stream.offset(), 4);

        assert!(!stream.begin_record().unwrap());
    }

    #[test]
    fn test_begin_record_rejects_bad_lengths() {
        let zero_len = [0, 2, 0, 0];
        assert!(matches!(
            RecordStream::new(&zero_len).begin_record(),
            Err(Error::CorruptRecord { opcode: 2, .. })
        ));

        let overlong = [0, 2, 0, 40, 0, 0];
        assert!(matches!(
            RecordStream::new(&overlong).begin_record(),
            Err(Error::Truncated { needed: 40, available: 6, .. })
        ));
    }

    #[test]
    fn test_trailing_bytes_end_stream() {
        let data = [0, 10, 0, 4, 0xff, 0xff];
        let mut stream = RecordStream::new(&data);
        assert!(stream.begin_record().unwrap());
        assert!(!stream.begin_record().unwrap());
    }

    #[test]
    fn test_padded_body() {
        let data = [0, 2, 0, 6, 7, 8];
        let mut stream = RecordStream::new(&data);
        assert!(stream.begin_record().unwrap());
        assert!(stream.is_short(4));
        assert_eq!(&*stream.padded_body(4), &[7, 8, 0, 0]);
    }
}
