//! Sans-IO parsing primitives for the attribute stream.
//!
//! Every parser works on a byte slice and returns `(value, bytes_consumed)`,
//! or asks for more input with [`ParseError::NeedMoreBytes`]. The caller
//! decides where the bytes come from.

use std::convert::TryFrom;

/// Error type for parsing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Need more bytes to complete parsing. Contains minimum additional bytes needed.
    NeedMoreBytes(u64),
    /// Unsigned LEB128 value wider than 64 bits.
    Overflow,
}

pub type ParseResult<T> = Result<(T, usize), ParseError>;

/// Decoded form of the leading tag of an attribute record.
///
/// A raw tag of `0` is the end-of-list marker and never reaches this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeTag {
    pub id: u64,
    pub ty: u64,
    pub has_children: bool,
    pub encoding: u64,
}

pub mod constants {
    pub const TYPE_INVALID: u64 = 0;
    pub const TYPE_INT: u64 = 1;
    pub const TYPE_UINT: u64 = 2;
    pub const TYPE_STRING: u64 = 3;
    pub const TYPE_RAW: u64 = 4;

    pub const ENCODING_INT_8: u64 = 0;
    pub const ENCODING_INT_16: u64 = 1;
    pub const ENCODING_INT_32: u64 = 2;
    pub const ENCODING_INT_64: u64 = 3;

    pub const ENCODING_STRING_INLINE: u64 = 0;
    pub const ENCODING_STRING_TABLE: u64 = 1;

    pub const ENCODING_RAW_INLINE: u64 = 0;
    pub const ENCODING_RAW_HEAP: u64 = 1;
}

impl AttributeTag {
    /// Splits a non-zero raw tag into its fields.
    pub fn from_raw(tag: u64) -> AttributeTag {
        let t = tag - 1;
        AttributeTag {
            id: t & 0x7f,
            ty: (t >> 7) & 0x7,
            has_children: (t >> 10) & 1 == 1,
            encoding: (t >> 11) & 0x3,
        }
    }

    pub fn to_raw(self) -> u64 {
        (self.id | self.ty << 7 | (self.has_children as u64) << 10 | self.encoding << 11) + 1
    }
}

/// Parse an unsigned LEB128 value of at most 64 bits.
pub fn parse_uleb128(data: &[u8]) -> ParseResult<u64> {
    let mut value = 0u64;

    for (i, byte) in data.iter().enumerate() {
        let shift = 7 * i as u32;
        let bits = u64::from(byte & 0x7f);

        if shift >= 64 || (shift > 0 && bits >> (64 - shift) != 0) {
            return Err(ParseError::Overflow);
        }

        value |= bits << shift;

        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }

    Err(ParseError::NeedMoreBytes(1))
}

/// Parse a big-endian integer `width` bytes wide, sign- or zero-extended.
pub fn parse_be_int(data: &[u8], width: usize, signed: bool) -> ParseResult<i128> {
    if data.len() < width {
        return Err(ParseError::NeedMoreBytes((width - data.len()) as u64));
    }

    let raw = data[..width]
        .iter()
        .fold(0u64, |acc, byte| acc << 8 | u64::from(*byte));

    let value = if signed {
        let shift = 64 - 8 * width as u32;
        i128::from(((raw << shift) as i64) >> shift)
    } else {
        i128::from(raw)
    };

    Ok((value, width))
}

/// Parse a NUL-terminated string, replacing invalid UTF-8.
///
/// The consumed count includes the terminator.
pub fn parse_cstr(data: &[u8]) -> ParseResult<String> {
    match data.iter().position(|b| *b == 0) {
        Some(end) => Ok((String::from_utf8_lossy(&data[..end]).into_owned(), end + 1)),
        None => Err(ParseError::NeedMoreBytes(1)),
    }
}

/// Parse a LEB128 length-prefixed byte string.
pub fn parse_bytes(data: &[u8]) -> ParseResult<Box<[u8]>> {
    let (len, prefix_size) = parse_uleb128(data)?;
    let available = (data.len() - prefix_size) as u64;

    if available < len {
        return Err(ParseError::NeedMoreBytes(len - available));
    }

    // `len <= available` so it fits in usize.
    let len = usize::try_from(len).map_err(|_| ParseError::Overflow)?;
    let total = prefix_size + len;
    Ok((data[prefix_size..total].into(), total))
}

#[cfg(test)]
pub(crate) fn encode_uleb128(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}
