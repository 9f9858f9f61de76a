use std::fmt;
use std::hash::{Hash, Hasher};

use crate::context::AttributeContext;
use crate::error::DecodeError;
use crate::heap::{check_bounds, ByteSource, HeapByteSource, HeapCoordinates};
use crate::id::{AttributeId, AttributeType};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StringValue {
    Inline(String),
    /// Index into the section's string table.
    Table(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RawValue {
    Inline(Box<[u8]>),
    Heap(HeapCoordinates),
}

/// An attribute value as decoded, before any context is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeValue {
    Int(i128),
    String(StringValue),
    Raw(RawValue),
}

impl AttributeValue {
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            AttributeValue::Int(_) => AttributeType::Int,
            AttributeValue::String(_) => AttributeType::String,
            AttributeValue::Raw(_) => AttributeType::Raw,
        }
    }
}

/// An attribute value resolved against a context.
#[derive(Debug, Clone)]
pub enum Value<'a> {
    Int(i128),
    String(&'a str),
    Raw(ByteSource<'a>),
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::String(s) => f.write_str(s),
            Value::Raw(ByteSource::Inline(bytes)) => write!(f, "{} bytes inline", bytes.len()),
            Value::Raw(ByteSource::Heap(source)) => {
                write!(f, "{} bytes at {}", source.len(), source.coordinates())
            }
        }
    }
}

/// One decoded node of an attribute tree.
///
/// Equality and hashing only look at the id and the value, never at the
/// children.
#[derive(Debug, Clone)]
pub struct Attribute {
    id: AttributeId,
    value: AttributeValue,
    children: Vec<Attribute>,
}

impl Attribute {
    pub fn new(id: AttributeId, value: AttributeValue) -> Attribute {
        Attribute::with_children(id, value, Vec::new())
    }

    pub fn with_children(
        id: AttributeId,
        value: AttributeValue,
        children: Vec<Attribute>,
    ) -> Attribute {
        Attribute {
            id,
            value,
            children,
        }
    }

    #[inline(always)]
    pub fn id(&self) -> AttributeId {
        self.id
    }

    #[inline(always)]
    pub fn attribute_type(&self) -> AttributeType {
        self.value.attribute_type()
    }

    #[inline(always)]
    pub fn encoded_value(&self) -> &AttributeValue {
        &self.value
    }

    /// Resolves the value. Table strings are looked up in the context's
    /// string table; heap data is bounds checked but not read.
    pub fn value<'a>(&'a self, context: &'a AttributeContext) -> Result<Value<'a>, DecodeError> {
        Ok(match &self.value {
            AttributeValue::Int(v) => Value::Int(*v),
            AttributeValue::String(StringValue::Inline(s)) => Value::String(s.as_str()),
            AttributeValue::String(StringValue::Table(index)) => {
                Value::String(context.strings().get(*index)?)
            }
            AttributeValue::Raw(_) => Value::Raw(self.bytes(context)?),
        })
    }

    /// # Panics
    ///
    /// If the attribute is not an INT.
    pub fn int_value(&self) -> i128 {
        match &self.value {
            AttributeValue::Int(v) => *v,
            other => self.wrong_kind(AttributeType::Int, other),
        }
    }

    /// # Panics
    ///
    /// If the attribute is not a STRING.
    pub fn str_value<'a>(&'a self, context: &'a AttributeContext) -> Result<&'a str, DecodeError> {
        match &self.value {
            AttributeValue::String(StringValue::Inline(s)) => Ok(s.as_str()),
            AttributeValue::String(StringValue::Table(index)) => context.strings().get(*index),
            other => self.wrong_kind(AttributeType::String, other),
        }
    }

    /// Heap spans are bounds checked here and read only when the returned
    /// source is read.
    ///
    /// # Panics
    ///
    /// If the attribute is not RAW.
    pub fn bytes<'a>(&'a self, context: &'a AttributeContext) -> Result<ByteSource<'a>, DecodeError> {
        match &self.value {
            AttributeValue::Raw(RawValue::Inline(bytes)) => Ok(ByteSource::Inline(&bytes[..])),
            AttributeValue::Raw(RawValue::Heap(coords)) => {
                check_bounds(context.heap().heap_len(), coords.offset, coords.length)?;
                Ok(ByteSource::Heap(HeapByteSource::new(
                    context.heap().clone(),
                    *coords,
                )))
            }
            other => self.wrong_kind(AttributeType::Raw, other),
        }
    }

    fn wrong_kind(&self, wanted: AttributeType, found: &AttributeValue) -> ! {
        panic!(
            "attribute '{}' is {}, not {}",
            self.id,
            found.attribute_type(),
            wanted
        )
    }

    #[inline(always)]
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    #[inline(always)]
    pub fn children(&self) -> &[Attribute] {
        &self.children
    }

    /// The first child with the given id.
    pub fn child(&self, id: AttributeId) -> Option<&Attribute> {
        self.children.iter().find(|c| c.id == id)
    }

    pub fn children_with(&self, id: AttributeId) -> impl Iterator<Item = &Attribute> {
        self.children.iter().filter(move |c| c.id == id)
    }

    /// This node plus all of its descendants.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Attribute::node_count).sum::<usize>()
    }
}

impl PartialEq for Attribute {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.value == other.value
    }
}

impl Eq for Attribute {}

impl Hash for Attribute {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.value.hash(state);
    }
}
