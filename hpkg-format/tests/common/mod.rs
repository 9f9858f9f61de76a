//! Builders for small `.hpkg` and `.hpkr` files.

#![allow(dead_code)]

use std::path::PathBuf;

use hpkg_format::parse::constants::*;
use hpkg_format::parse::AttributeTag;
use hpkg_format::AttributeId;
use tempfile::TempDir;

pub fn uleb128(mut value: u64, out: &mut Vec<u8>) {
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

/// An attribute stream, written record by record.
#[derive(Debug, Default)]
pub struct Stream(Vec<u8>);

impl Stream {
    pub fn new() -> Stream {
        Stream::default()
    }

    fn tag(&mut self, id: AttributeId, ty: u64, encoding: u64, children: bool) {
        let tag = AttributeTag {
            id: u64::from(id.code()),
            ty,
            has_children: children,
            encoding,
        };
        uleb128(tag.to_raw(), &mut self.0);
    }

    pub fn string(&mut self, id: AttributeId, value: &str, children: bool) -> &mut Self {
        self.tag(id, TYPE_STRING, ENCODING_STRING_INLINE, children);
        self.0.extend_from_slice(value.as_bytes());
        self.0.push(0);
        self
    }

    pub fn table(&mut self, id: AttributeId, index: u64, children: bool) -> &mut Self {
        self.tag(id, TYPE_STRING, ENCODING_STRING_TABLE, children);
        uleb128(index, &mut self.0);
        self
    }

    pub fn int(&mut self, id: AttributeId, value: i32) -> &mut Self {
        self.tag(id, TYPE_INT, ENCODING_INT_32, false);
        self.0.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn raw_inline(&mut self, id: AttributeId, bytes: &[u8]) -> &mut Self {
        self.tag(id, TYPE_RAW, ENCODING_RAW_INLINE, false);
        uleb128(bytes.len() as u64, &mut self.0);
        self.0.extend_from_slice(bytes);
        self
    }

    pub fn raw_heap(&mut self, id: AttributeId, offset: u64, length: u64) -> &mut Self {
        self.tag(id, TYPE_RAW, ENCODING_RAW_HEAP, false);
        uleb128(length, &mut self.0);
        uleb128(offset, &mut self.0);
        self
    }

    pub fn end(&mut self) -> &mut Self {
        self.0.push(0);
        self
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.0.clone()
    }
}

pub fn string_table(strings: &[&str]) -> Vec<u8> {
    if strings.is_empty() {
        return vec![];
    }
    let mut out = vec![];
    for s in strings {
        out.extend_from_slice(s.as_bytes());
        out.push(0);
    }
    out.push(0);
    out
}

/// A section: its string table followed by its attribute stream.
#[derive(Debug, Default)]
pub struct SectionData {
    pub strings: Vec<String>,
    pub stream: Vec<u8>,
}

impl SectionData {
    pub fn new(strings: &[&str], stream: &Stream) -> SectionData {
        SectionData {
            strings: strings.iter().map(|s| s.to_string()).collect(),
            stream: stream.bytes(),
        }
    }

    fn strings_bytes(&self) -> Vec<u8> {
        let strings: Vec<&str> = self.strings.iter().map(String::as_str).collect();
        string_table(&strings)
    }

    fn write(&self, heap: &mut Vec<u8>) -> (u64, u64, u64) {
        let strings = self.strings_bytes();
        heap.extend_from_slice(&strings);
        heap.extend_from_slice(&self.stream);
        (
            (strings.len() + self.stream.len()) as u64,
            strings.len() as u64,
            self.strings.len() as u64,
        )
    }
}

fn adler32(data: &[u8]) -> u32 {
    let (mut a, mut b) = (1u32, 0u32);
    for byte in data {
        a = (a + u32::from(*byte)) % 65521;
        b = (b + a) % 65521;
    }
    b << 16 | a
}

#[cfg(feature = "zlib")]
fn zlib(data: &[u8]) -> Vec<u8> {
    use hpkg_format::comde::deflate::DeflateCompressor;
    use hpkg_format::comde::Compressor;

    let mut cursor = std::io::Cursor::new(Vec::new());
    DeflateCompressor
        .compress(&mut cursor, &mut &data[..])
        .unwrap();

    let mut out = vec![0x78, 0x9c];
    out.extend_from_slice(&cursor.into_inner());
    out.extend_from_slice(&adler32(data).to_be_bytes());
    out
}

/// Splits `heap` into chunks, compressing each one unless that would not
/// make it smaller, and appends the chunk size table.
#[cfg(feature = "zlib")]
pub fn compress_heap(heap: &[u8], chunk_size: usize) -> Vec<u8> {
    let mut body = vec![];
    let mut table = vec![];
    let chunks: Vec<&[u8]> = heap.chunks(chunk_size).collect();

    for (i, chunk) in chunks.iter().enumerate() {
        let compressed = zlib(chunk);
        let stored = if compressed.len() < chunk.len() {
            compressed
        } else {
            chunk.to_vec()
        };
        if i + 1 < chunks.len() {
            table.extend_from_slice(&((stored.len() - 1) as u16).to_be_bytes());
        }
        body.extend_from_slice(&stored);
    }

    body.extend_from_slice(&table);
    body
}

struct HeapLayout {
    compression: u16,
    chunk_size: u32,
    body: Vec<u8>,
    uncompressed: u64,
}

fn layout(heap: Vec<u8>, chunk_size: Option<u32>) -> HeapLayout {
    let uncompressed = heap.len() as u64;
    match chunk_size {
        None => HeapLayout {
            compression: 0,
            chunk_size: 64 * 1024,
            body: heap,
            uncompressed,
        },
        #[cfg(feature = "zlib")]
        Some(size) => HeapLayout {
            compression: 1,
            chunk_size: size,
            body: compress_heap(&heap, size as usize),
            uncompressed,
        },
        #[cfg(not(feature = "zlib"))]
        Some(_) => panic!("zlib heaps need the zlib feature"),
    }
}

fn heap_header(out: &mut Vec<u8>, magic: &[u8; 4], header_size: u16, layout: &HeapLayout) {
    out.extend_from_slice(magic);
    out.extend_from_slice(&header_size.to_be_bytes());
    out.extend_from_slice(&2u16.to_be_bytes());
    let total = u64::from(header_size) + layout.body.len() as u64;
    out.extend_from_slice(&total.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&layout.compression.to_be_bytes());
    out.extend_from_slice(&layout.chunk_size.to_be_bytes());
    out.extend_from_slice(&(layout.body.len() as u64).to_be_bytes());
    out.extend_from_slice(&layout.uncompressed.to_be_bytes());
}

/// Builds an `.hpkg`. The heap holds `data` first, so raw heap attributes
/// can point at it from offset zero.
#[derive(Debug, Default)]
pub struct HpkgBuilder {
    pub data: Vec<u8>,
    pub toc: SectionData,
    pub attributes: SectionData,
    pub chunk_size: Option<u32>,
}

impl HpkgBuilder {
    pub fn build(&self) -> Vec<u8> {
        let mut heap = self.data.clone();
        let (toc_len, toc_strings_len, toc_strings_count) = self.toc.write(&mut heap);
        let (attr_len, attr_strings_len, attr_strings_count) = self.attributes.write(&mut heap);

        let layout = layout(heap, self.chunk_size);
        let mut out = Vec::with_capacity(80 + layout.body.len());
        heap_header(&mut out, b"hpkg", 80, &layout);
        out.extend_from_slice(&(attr_len as u32).to_be_bytes());
        out.extend_from_slice(&(attr_strings_len as u32).to_be_bytes());
        out.extend_from_slice(&(attr_strings_count as u32).to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&toc_len.to_be_bytes());
        out.extend_from_slice(&toc_strings_len.to_be_bytes());
        out.extend_from_slice(&toc_strings_count.to_be_bytes());
        assert_eq!(out.len(), 80);

        out.extend_from_slice(&layout.body);
        out
    }
}

/// Builds an `.hpkr`. `info` stands in for the repository info and is
/// never decoded.
#[derive(Debug, Default)]
pub struct HpkrBuilder {
    pub info: Vec<u8>,
    pub packages: SectionData,
    pub chunk_size: Option<u32>,
}

impl HpkrBuilder {
    pub fn build(&self) -> Vec<u8> {
        let mut heap = self.info.clone();
        let (len, strings_len, strings_count) = self.packages.write(&mut heap);

        let layout = layout(heap, self.chunk_size);
        let mut out = Vec::with_capacity(72 + layout.body.len());
        heap_header(&mut out, b"hpkr", 72, &layout);
        out.extend_from_slice(&(self.info.len() as u32).to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(&strings_len.to_be_bytes());
        out.extend_from_slice(&strings_count.to_be_bytes());
        assert_eq!(out.len(), 72);

        out.extend_from_slice(&layout.body);
        out
    }
}

pub fn write_temp(name: &str, bytes: &[u8]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    (dir, path)
}
