use std::sync::Arc;

use crate::heap::{HeapReader, MemoryHeap};
use crate::strings::StringTable;

/// Everything needed to turn a decoded attribute into its value: the heap
/// and the string table of the section the attribute came from.
///
/// Attributes only make sense against the context of the section they were
/// decoded from; a context from another section resolves table strings to
/// the wrong text.
#[derive(Debug, Clone)]
pub struct AttributeContext {
    heap: Arc<dyn HeapReader>,
    strings: Arc<StringTable>,
}

impl AttributeContext {
    pub fn new(heap: Arc<dyn HeapReader>, strings: Arc<StringTable>) -> AttributeContext {
        AttributeContext { heap, strings }
    }

    /// A context over a heap that is already in memory.
    pub fn in_memory<B: Into<Vec<u8>>>(heap: B, strings: StringTable) -> AttributeContext {
        AttributeContext::new(Arc::new(MemoryHeap::new(heap)), Arc::new(strings))
    }

    #[inline(always)]
    pub fn heap(&self) -> &Arc<dyn HeapReader> {
        &self.heap
    }

    #[inline(always)]
    pub fn strings(&self) -> &StringTable {
        &self.strings
    }
}

impl Default for AttributeContext {
    fn default() -> Self {
        AttributeContext::in_memory(Vec::new(), StringTable::default())
    }
}
