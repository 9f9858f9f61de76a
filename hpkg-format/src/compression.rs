use std::fmt;

#[cfg(feature = "zlib")]
use comde::deflate::DeflateDecompressor;
#[cfg(feature = "zlib")]
use comde::Decompressor;

pub mod constants {
    pub const COMPRESSION_NONE: u16 = 0;
    pub const COMPRESSION_ZLIB: u16 = 1;
}

use self::constants::*;

#[derive(Clone, Copy, Eq, PartialEq)]
pub enum HeapCompression {
    None,
    Zlib,
    Unknown(u16),
}

impl Default for HeapCompression {
    fn default() -> Self {
        Self::None
    }
}

impl fmt::Display for HeapCompression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use HeapCompression::*;

        let s = match self {
            None => "none",
            Zlib => "zlib",
            Unknown(id) => return write!(f, "Unknown(id: {:x})", id),
        };

        write!(f, "{}", s)
    }
}

impl fmt::Debug for HeapCompression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl HeapCompression {
    pub const fn from_id(id: u16) -> HeapCompression {
        match id {
            COMPRESSION_NONE => HeapCompression::None,
            COMPRESSION_ZLIB => HeapCompression::Zlib,
            other => HeapCompression::Unknown(other),
        }
    }

    pub const fn id(self) -> u16 {
        use HeapCompression::*;

        match self {
            None => COMPRESSION_NONE,
            Zlib => COMPRESSION_ZLIB,
            Unknown(id) => id,
        }
    }

    pub const fn is_supported(self) -> bool {
        match self {
            HeapCompression::None => true,
            HeapCompression::Zlib => cfg!(feature = "zlib"),
            HeapCompression::Unknown(_) => false,
        }
    }
}

#[cfg(feature = "zlib")]
const ZLIB_HEADER_LEN: usize = 2;
#[cfg(feature = "zlib")]
const ZLIB_TRAILER_LEN: usize = 4;

/// Inflates one zlib stream (RFC 1950) into a buffer of the expected size.
#[cfg(feature = "zlib")]
pub(crate) fn inflate_zlib(input: &[u8], expected: usize) -> std::io::Result<Vec<u8>> {
    if input.len() < ZLIB_HEADER_LEN + ZLIB_TRAILER_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "zlib stream too short",
        ));
    }

    let (cmf, flg) = (input[0], input[1]);
    if cmf & 0x0f != 8 || (u16::from(cmf) << 8 | u16::from(flg)) % 31 != 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "invalid zlib header",
        ));
    }
    if flg & 0x20 != 0 {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "zlib preset dictionaries are not supported",
        ));
    }

    let body = &input[ZLIB_HEADER_LEN..input.len() - ZLIB_TRAILER_LEN];
    let mut out = BoundedWriter {
        buf: Vec::with_capacity(expected),
        limit: expected,
    };
    DeflateDecompressor.copy(body, &mut out)?;
    Ok(out.buf)
}

/// Refuses writes past `limit` bytes.
#[cfg(feature = "zlib")]
struct BoundedWriter {
    buf: Vec<u8>,
    limit: usize,
}

#[cfg(feature = "zlib")]
impl std::io::Write for BoundedWriter {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        if self.buf.len() + data.len() > self.limit {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("zlib chunk inflates past {} bytes", self.limit),
            ));
        }
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(not(feature = "zlib"))]
pub(crate) fn inflate_zlib(_input: &[u8], _expected: usize) -> std::io::Result<Vec<u8>> {
    Err(std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        format!("Compiled without support for {:?}", HeapCompression::Zlib),
    ))
}

#[cfg(all(test, feature = "zlib"))]
pub(crate) fn deflate_zlib(input: &[u8]) -> Vec<u8> {
    use comde::deflate::DeflateCompressor;
    use comde::Compressor;

    let mut cursor = std::io::Cursor::new(Vec::new());
    DeflateCompressor
        .compress(&mut cursor, &mut &input[..])
        .unwrap();

    let mut out = vec![0x78, 0x9c];
    out.extend_from_slice(&cursor.into_inner());
    // The trailer is not verified on the way back in.
    out.extend_from_slice(&[0, 0, 0, 0]);
    out
}
