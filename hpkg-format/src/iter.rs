use std::convert::TryFrom;
use std::sync::Arc;

use crate::attr::{Attribute, AttributeValue, RawValue, StringValue};
use crate::context::AttributeContext;
use crate::error::DecodeError;
use crate::heap::{HeapCoordinates, HeapReader};
use crate::id::AttributeId;
use crate::parse::constants::*;
use crate::parse::{
    parse_be_int, parse_bytes, parse_cstr, parse_uleb128, AttributeTag, ParseError, ParseResult,
};

/// Bounds beyond which an attribute stream is treated as corrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Deepest child list allowed below a root attribute.
    pub max_depth: usize,
    /// Most attributes allowed in one list, the root list included.
    pub max_siblings: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        DecodeLimits {
            max_depth: 64,
            max_siblings: 1 << 20,
        }
    }
}

const WINDOW: u64 = 4096;

/// Reads the stream out of the heap a window at a time.
#[derive(Debug)]
struct StreamCursor {
    heap: Arc<dyn HeapReader>,
    buf: Vec<u8>,
    buf_offset: u64,
    pos: usize,
}

impl StreamCursor {
    fn new(heap: Arc<dyn HeapReader>, offset: u64) -> StreamCursor {
        StreamCursor {
            heap,
            buf: Vec::new(),
            buf_offset: offset,
            pos: 0,
        }
    }

    #[inline(always)]
    fn offset(&self) -> u64 {
        self.buf_offset + self.pos as u64
    }

    fn parse<T>(&mut self, parser: impl Fn(&[u8]) -> ParseResult<T>) -> Result<T, DecodeError> {
        loop {
            match parser(&self.buf[self.pos..]) {
                Ok((value, used)) => {
                    self.pos += used;
                    return Ok(value);
                }
                Err(ParseError::NeedMoreBytes(needed)) => self.fill(needed)?,
                Err(ParseError::Overflow) => {
                    return Err(DecodeError::Leb128Overflow(self.offset()))
                }
            }
        }
    }

    fn fill(&mut self, needed: u64) -> Result<(), DecodeError> {
        self.buf_offset = self.offset();
        self.buf.drain(..self.pos);
        self.pos = 0;

        let end = self.buf_offset + self.buf.len() as u64;
        let heap_len = self.heap.heap_len();
        let available = heap_len.saturating_sub(end);
        if available < needed {
            return Err(DecodeError::OutOfBounds {
                offset: end,
                length: needed,
                heap_len,
            });
        }

        let grow = std::cmp::min(std::cmp::max(needed, WINDOW), available);
        let grow = usize::try_from(grow).map_err(|_| DecodeError::TooLarge(grow))?;
        let old_len = self.buf.len();
        self.buf.resize(old_len + grow, 0);

        if let Err(err) = self.heap.read_into(end, &mut self.buf[old_len..]) {
            self.buf.truncate(old_len);
            return Err(err);
        }

        Ok(())
    }
}

enum State {
    Ready(Attribute),
    Exhausted,
    Failed(DecodeError),
}

/// Decodes the root attributes of a stream one at a time, each with its
/// whole subtree attached.
///
/// The next root is decoded eagerly, so [`AttributeIterator::has_next`]
/// always knows whether [`AttributeIterator::next_attribute`] will return
/// an attribute. Once decoding fails the iterator stays failed and keeps
/// returning the same error.
pub struct AttributeIterator {
    context: AttributeContext,
    cursor: StreamCursor,
    limits: DecodeLimits,
    roots: usize,
    state: State,
}

impl AttributeIterator {
    /// Starts decoding at `offset` in the context's heap.
    pub fn new(context: AttributeContext, offset: u64) -> AttributeIterator {
        AttributeIterator::with_limits(context, offset, DecodeLimits::default())
    }

    pub fn with_limits(
        context: AttributeContext,
        offset: u64,
        limits: DecodeLimits,
    ) -> AttributeIterator {
        let cursor = StreamCursor::new(Arc::clone(context.heap()), offset);
        let mut iter = AttributeIterator {
            context,
            cursor,
            limits,
            roots: 0,
            state: State::Exhausted,
        };
        iter.state = iter.advance();
        iter
    }

    /// The context attributes from this iterator must be resolved against.
    #[inline(always)]
    pub fn context(&self) -> &AttributeContext {
        &self.context
    }

    #[inline(always)]
    pub fn limits(&self) -> DecodeLimits {
        self.limits
    }

    #[inline(always)]
    pub fn has_next(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    /// The failure that stopped decoding, if any.
    pub fn error(&self) -> Option<&DecodeError> {
        match &self.state {
            State::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// # Panics
    ///
    /// If the iterator is exhausted.
    pub fn next_attribute(&mut self) -> Result<Attribute, DecodeError> {
        match std::mem::replace(&mut self.state, State::Exhausted) {
            State::Ready(attr) => {
                self.state = self.advance();
                Ok(attr)
            }
            State::Failed(err) => {
                self.state = State::Failed(err.clone());
                Err(err)
            }
            State::Exhausted => panic!("next_attribute called on an exhausted AttributeIterator"),
        }
    }

    fn advance(&mut self) -> State {
        match self.read_attribute(0) {
            Ok(Some(_)) if self.roots == self.limits.max_siblings => {
                State::Failed(DecodeError::TooManySiblings(self.limits.max_siblings))
            }
            Ok(Some(attr)) => {
                self.roots += 1;
                State::Ready(attr)
            }
            Ok(None) => {
                tracing::debug!(roots = self.roots, end = self.cursor.offset(), "attribute stream done");
                State::Exhausted
            }
            Err(err) => {
                tracing::debug!(roots = self.roots, error = %err, "attribute stream failed");
                State::Failed(err)
            }
        }
    }

    fn read_attribute(&mut self, depth: usize) -> Result<Option<Attribute>, DecodeError> {
        let start = self.cursor.offset();
        let raw = self.cursor.parse(parse_uleb128)?;
        if raw == 0 {
            return Ok(None);
        }

        let tag = AttributeTag::from_raw(raw);
        let id = AttributeId::from_code(tag.id).ok_or(DecodeError::UnknownAttributeId {
            id: tag.id,
            offset: start,
        })?;

        let value = self.read_value(tag, start)?;
        let found = value.attribute_type();
        if found != id.attribute_type() {
            return Err(DecodeError::TypeMismatch {
                id,
                expected: id.attribute_type(),
                found,
            });
        }

        let children = if tag.has_children {
            self.read_children(depth + 1)?
        } else {
            Vec::new()
        };

        tracing::trace!(
            offset = format_args!("{:#x}", start),
            id = id.name(),
            depth,
            children = children.len(),
            "decoded attribute"
        );

        Ok(Some(Attribute::with_children(id, value, children)))
    }

    fn read_children(&mut self, depth: usize) -> Result<Vec<Attribute>, DecodeError> {
        if depth > self.limits.max_depth {
            return Err(DecodeError::NestingTooDeep(self.limits.max_depth));
        }

        let mut children = Vec::new();
        while let Some(child) = self.read_attribute(depth)? {
            if children.len() == self.limits.max_siblings {
                return Err(DecodeError::TooManySiblings(self.limits.max_siblings));
            }
            children.push(child);
        }

        Ok(children)
    }

    fn read_value(&mut self, tag: AttributeTag, start: u64) -> Result<AttributeValue, DecodeError> {
        let unknown_encoding = |ty| DecodeError::UnknownEncoding {
            ty,
            encoding: tag.encoding,
            offset: start,
        };

        let value = match tag.ty {
            TYPE_INT | TYPE_UINT => {
                let width = 1usize << tag.encoding;
                let signed = tag.ty == TYPE_INT;
                AttributeValue::Int(self.cursor.parse(|d| parse_be_int(d, width, signed))?)
            }
            TYPE_STRING => match tag.encoding {
                ENCODING_STRING_INLINE => {
                    AttributeValue::String(StringValue::Inline(self.cursor.parse(parse_cstr)?))
                }
                ENCODING_STRING_TABLE => {
                    AttributeValue::String(StringValue::Table(self.cursor.parse(parse_uleb128)?))
                }
                _ => return Err(unknown_encoding(crate::id::AttributeType::String)),
            },
            TYPE_RAW => match tag.encoding {
                ENCODING_RAW_INLINE => {
                    AttributeValue::Raw(RawValue::Inline(self.cursor.parse(parse_bytes)?))
                }
                ENCODING_RAW_HEAP => {
                    let length = self.cursor.parse(parse_uleb128)?;
                    let offset = self.cursor.parse(parse_uleb128)?;
                    AttributeValue::Raw(RawValue::Heap(HeapCoordinates::new(offset, length)))
                }
                _ => return Err(unknown_encoding(crate::id::AttributeType::Raw)),
            },
            other => {
                return Err(DecodeError::InvalidAttributeType {
                    ty: other,
                    offset: start,
                })
            }
        };

        Ok(value)
    }
}

impl std::fmt::Debug for AttributeIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            State::Ready(_) => "ready",
            State::Exhausted => "exhausted",
            State::Failed(_) => "failed",
        };

        f.debug_struct("AttributeIterator")
            .field("offset", &self.cursor.offset())
            .field("roots", &self.roots)
            .field("limits", &self.limits)
            .field("state", &state)
            .finish()
    }
}

/// Yields each root once, then the failure (if any) once, then `None`.
impl Iterator for AttributeIterator {
    type Item = Result<Attribute, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match std::mem::replace(&mut self.state, State::Exhausted) {
            State::Ready(attr) => {
                self.state = self.advance();
                Some(Ok(attr))
            }
            State::Failed(err) => Some(Err(err)),
            State::Exhausted => None,
        }
    }
}

impl std::iter::FusedIterator for AttributeIterator {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::AttributeType;
    use crate::strings::StringTable;
    use crate::test_support::StreamBuilder;

    fn iter_over(stream: Vec<u8>) -> AttributeIterator {
        AttributeIterator::new(AttributeContext::in_memory(stream, StringTable::default()), 0)
    }

    #[test]
    fn roots_in_order_and_node_count() {
        let mut b = StreamBuilder::new();
        b.attr(
            AttributeId::DirectoryEntry,
            AttributeValue::String(StringValue::Inline("bin".into())),
            true,
        )
        .int(AttributeId::FileType, 1)
        .attr(
            AttributeId::DirectoryEntry,
            AttributeValue::String(StringValue::Inline("ls".into())),
            true,
        )
        .int(AttributeId::FilePermissions, 0o755)
        .int(AttributeId::FileMtime, 1_600_000_000)
        .end()
        .end()
        .string(AttributeId::DirectoryEntry, "data")
        .int(AttributeId::FileCrtime, -5)
        .end();
        let records = 7;

        let mut iter = iter_over(b.build());
        let mut roots = vec![];
        while iter.has_next() {
            roots.push(iter.next_attribute().unwrap());
        }

        let ctx = iter.context().clone();
        let names: Vec<_> = roots.iter().map(|r| r.id()).collect();
        assert_eq!(
            names,
            vec![
                AttributeId::DirectoryEntry,
                AttributeId::DirectoryEntry,
                AttributeId::FileCrtime
            ]
        );
        assert_eq!(roots[0].str_value(&ctx).unwrap(), "bin");
        assert_eq!(roots[2].int_value(), -5);
        assert_eq!(roots.iter().map(Attribute::node_count).sum::<usize>(), records);

        let ls = &roots[0].children()[1];
        assert_eq!(ls.str_value(&ctx).unwrap(), "ls");
        assert_eq!(ls.child(AttributeId::FilePermissions).unwrap().int_value(), 0o755);
        assert_eq!(ls.child(AttributeId::FileMtime).unwrap().int_value(), 1_600_000_000);
    }

    #[test]
    fn empty_stream() {
        let iter = iter_over(vec![0]);
        assert!(!iter.has_next());
        assert!(iter.error().is_none());
    }

    #[test]
    #[should_panic(expected = "exhausted")]
    fn next_past_end_panics() {
        let mut iter = iter_over(vec![0]);
        let _ = iter.next_attribute();
    }

    #[test]
    fn int_widths_and_signedness() {
        let mut b = StreamBuilder::new();
        b.int(AttributeId::FileMtime, i128::from(i64::MIN))
            .int(AttributeId::FileMtime, i128::from(u64::MAX))
            .int(AttributeId::FileMtime, 300)
            .end();

        let values: Vec<_> = iter_over(b.build())
            .map(|a| a.unwrap().int_value())
            .collect();
        assert_eq!(
            values,
            vec![i128::from(i64::MIN), i128::from(u64::MAX), 300]
        );
    }

    #[test]
    fn raw_encodings() {
        let mut b = StreamBuilder::new();
        b.attr(
            AttributeId::Data,
            AttributeValue::Raw(RawValue::Inline(vec![1u8, 2, 3].into_boxed_slice())),
            false,
        )
        .attr(
            AttributeId::Data,
            AttributeValue::Raw(RawValue::Heap(HeapCoordinates::new(1, 2))),
            false,
        )
        .end();

        let mut iter = iter_over(b.build());
        let inline = iter.next_attribute().unwrap();
        let heap = iter.next_attribute().unwrap();
        assert!(!iter.has_next());

        let ctx = iter.context();
        assert_eq!(&*inline.bytes(ctx).unwrap().read().unwrap(), &[1, 2, 3]);
        assert_eq!(
            heap.encoded_value(),
            &AttributeValue::Raw(RawValue::Heap(HeapCoordinates::new(1, 2)))
        );
    }

    #[test]
    fn heap_raw_out_of_bounds_decodes_but_fails_to_resolve() {
        // The stream itself is the 12 byte heap.
        let mut b = StreamBuilder::new();
        b.attr(
            AttributeId::Data,
            AttributeValue::Raw(RawValue::Heap(HeapCoordinates::new(10, 5))),
            false,
        )
        .end();
        let mut stream = b.build();
        stream.resize(12, 0xee);

        let mut iter = iter_over(stream);
        let attr = iter.next_attribute().unwrap();
        let ctx = iter.context();
        assert!(matches!(
            attr.value(ctx),
            Err(DecodeError::OutOfBounds {
                offset: 10,
                length: 5,
                heap_len: 12
            })
        ));
    }

    #[test]
    fn failure_is_sticky() {
        let mut b = StreamBuilder::new();
        b.string(AttributeId::PackageName, "ok")
            .tag(AttributeTag {
                id: 120,
                ty: TYPE_INT,
                has_children: false,
                encoding: 0,
            })
            .raw_bytes(&[0]);

        let mut iter = iter_over(b.build());
        assert!(iter.has_next());
        assert!(iter.next_attribute().is_ok());
        assert!(!iter.has_next());

        let first = iter.next_attribute().unwrap_err();
        let second = iter.next_attribute().unwrap_err();
        assert!(matches!(first, DecodeError::UnknownAttributeId { id: 120, .. }));
        assert_eq!(first.to_string(), second.to_string());
        assert!(iter.error().is_some());
    }

    #[test]
    fn iterator_yields_error_once() {
        let stream = vec![0x80];
        let results: Vec<_> = iter_over(stream).collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(DecodeError::OutOfBounds { .. })));
    }

    #[test]
    fn type_mismatch_is_a_decode_error() {
        let mut b = StreamBuilder::new();
        b.int(AttributeId::PackageName, 3).end();

        let err = iter_over(b.build()).next().unwrap().unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TypeMismatch {
                id: AttributeId::PackageName,
                expected: AttributeType::String,
                found: AttributeType::Int,
            }
        ));
    }

    #[test]
    fn invalid_type_and_encoding() {
        let mut b = StreamBuilder::new();
        b.tag(AttributeTag {
            id: 0,
            ty: TYPE_INVALID,
            has_children: false,
            encoding: 0,
        });
        let err = iter_over(b.build()).next().unwrap().unwrap_err();
        assert!(matches!(err, DecodeError::InvalidAttributeType { ty: 0, .. }));

        let mut b = StreamBuilder::new();
        b.tag(AttributeTag {
            id: 0,
            ty: TYPE_STRING,
            has_children: false,
            encoding: 3,
        });
        let err = iter_over(b.build()).next().unwrap().unwrap_err();
        assert!(matches!(err, DecodeError::UnknownEncoding { encoding: 3, .. }));
    }

    #[test]
    fn nesting_limit() {
        let mut b = StreamBuilder::new();
        for _ in 0..4 {
            b.attr(
                AttributeId::DirectoryEntry,
                AttributeValue::String(StringValue::Inline("d".into())),
                true,
            );
        }
        for _ in 0..4 {
            b.end();
        }
        b.end();
        let stream = b.build();

        // The innermost entry opens an empty list four levels down.
        let limits = DecodeLimits {
            max_depth: 4,
            ..DecodeLimits::default()
        };
        let ok = AttributeIterator::with_limits(
            AttributeContext::in_memory(stream.clone(), StringTable::default()),
            0,
            limits,
        );
        assert!(ok.has_next());

        let limits = DecodeLimits {
            max_depth: 3,
            ..DecodeLimits::default()
        };
        let mut too_deep = AttributeIterator::with_limits(
            AttributeContext::in_memory(stream, StringTable::default()),
            0,
            limits,
        );
        assert!(!too_deep.has_next());
        assert!(matches!(
            too_deep.next_attribute(),
            Err(DecodeError::NestingTooDeep(3))
        ));
    }

    #[test]
    fn sibling_limit() {
        let mut b = StreamBuilder::new();
        for i in 0..4 {
            b.int(AttributeId::FileMtime, i);
        }
        b.end();

        let limits = DecodeLimits {
            max_siblings: 3,
            ..DecodeLimits::default()
        };
        let results: Vec<_> = AttributeIterator::with_limits(
            AttributeContext::in_memory(b.build(), StringTable::default()),
            0,
            limits,
        )
        .collect();
        assert_eq!(results.len(), 4);
        assert!(results[..3].iter().all(Result::is_ok));
        assert!(matches!(results[3], Err(DecodeError::TooManySiblings(3))));
    }

    #[test]
    fn long_inline_string_spans_windows() {
        let long = "x".repeat(10_000);
        let mut b = StreamBuilder::new();
        b.string(AttributeId::PackageDescription, &long).end();

        let mut iter = iter_over(b.build());
        let attr = iter.next_attribute().unwrap();
        assert_eq!(attr.str_value(iter.context()).unwrap(), long);
    }

    #[test]
    fn starts_at_offset() {
        let mut stream = vec![0xff; 5];
        let mut b = StreamBuilder::new();
        b.string(AttributeId::PackageName, "late").end();
        stream.extend(b.build());

        let mut iter =
            AttributeIterator::new(AttributeContext::in_memory(stream, StringTable::default()), 5);
        assert_eq!(
            iter.next_attribute().unwrap().str_value(&AttributeContext::default()).unwrap(),
            "late"
        );
    }
}
