use crate::attr::{AttributeValue, RawValue, StringValue};
use crate::id::AttributeId;
use crate::parse::constants::*;
use crate::parse::{encode_uleb128, AttributeTag};

/// Encodes attribute streams for tests.
#[derive(Debug, Default)]
pub(crate) struct StreamBuilder {
    bytes: Vec<u8>,
}

impl StreamBuilder {
    pub(crate) fn new() -> StreamBuilder {
        StreamBuilder::default()
    }

    /// Writes one attribute; when `children` is set the caller writes the
    /// child list and closes it with [`StreamBuilder::end`].
    pub(crate) fn attr(
        &mut self,
        id: AttributeId,
        value: AttributeValue,
        children: bool,
    ) -> &mut Self {
        let mut tag = AttributeTag {
            id: u64::from(id.code()),
            ty: 0,
            has_children: children,
            encoding: 0,
        };

        match value {
            AttributeValue::Int(v) => {
                let (ty, encoding, width) = if v >= i128::from(i8::MIN) && v <= i128::from(i8::MAX) {
                    (TYPE_INT, ENCODING_INT_8, 1)
                } else if v >= i128::from(i16::MIN) && v <= i128::from(i16::MAX) {
                    (TYPE_INT, ENCODING_INT_16, 2)
                } else if v >= i128::from(i32::MIN) && v <= i128::from(i32::MAX) {
                    (TYPE_INT, ENCODING_INT_32, 4)
                } else if v >= i128::from(i64::MIN) && v <= i128::from(i64::MAX) {
                    (TYPE_INT, ENCODING_INT_64, 8)
                } else {
                    (TYPE_UINT, ENCODING_INT_64, 8)
                };
                tag.ty = ty;
                tag.encoding = encoding;
                self.tag(tag);
                let be = (v as u64).to_be_bytes();
                self.bytes.extend_from_slice(&be[8 - width..]);
            }
            AttributeValue::String(StringValue::Inline(s)) => {
                tag.ty = TYPE_STRING;
                tag.encoding = ENCODING_STRING_INLINE;
                self.tag(tag);
                self.bytes.extend_from_slice(s.as_bytes());
                self.bytes.push(0);
            }
            AttributeValue::String(StringValue::Table(index)) => {
                tag.ty = TYPE_STRING;
                tag.encoding = ENCODING_STRING_TABLE;
                self.tag(tag);
                encode_uleb128(index, &mut self.bytes);
            }
            AttributeValue::Raw(RawValue::Inline(data)) => {
                tag.ty = TYPE_RAW;
                tag.encoding = ENCODING_RAW_INLINE;
                self.tag(tag);
                encode_uleb128(data.len() as u64, &mut self.bytes);
                self.bytes.extend_from_slice(&data);
            }
            AttributeValue::Raw(RawValue::Heap(coords)) => {
                tag.ty = TYPE_RAW;
                tag.encoding = ENCODING_RAW_HEAP;
                self.tag(tag);
                encode_uleb128(coords.length, &mut self.bytes);
                encode_uleb128(coords.offset, &mut self.bytes);
            }
        }

        self
    }

    pub(crate) fn string(&mut self, id: AttributeId, s: &str) -> &mut Self {
        self.attr(id, AttributeValue::String(StringValue::Inline(s.into())), false)
    }

    pub(crate) fn int(&mut self, id: AttributeId, v: i128) -> &mut Self {
        self.attr(id, AttributeValue::Int(v), false)
    }

    pub(crate) fn tag(&mut self, tag: AttributeTag) -> &mut Self {
        encode_uleb128(tag.to_raw(), &mut self.bytes);
        self
    }

    pub(crate) fn raw_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub(crate) fn end(&mut self) -> &mut Self {
        self.bytes.push(0);
        self
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        self.bytes.clone()
    }
}
