use crate::helpers::read_integral;
use crate::{classify, BucketIter, Classification, Family, GroupIter, Result, TypedMemory, Value};

/// A hash container in the inspected process, classified by its type name.
///
/// Handles are cheap views: they hold no copy of the target's memory and
/// re-read it on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    pub value: Value,
    pub class: Classification,
}

impl ContainerHandle {
    pub fn new<M: TypedMemory + ?Sized>(memory: &M, value: Value) -> Result<Self> {
        Ok(Self {
            value,
            class: classify(memory.type_name(value)?),
        })
    }

    /// Element count as recorded by the container itself.
    pub fn len<M: TypedMemory + ?Sized>(&self, memory: &M) -> Result<u64> {
        let table = memory.field(self.value, "table_")?;
        let size = match self.class.family {
            Family::Bucket => memory.field(table, "size_")?,
            Family::Grouped => memory.field(memory.field(table, "size_ctrl")?, "size")?,
        };
        read_integral(memory, size)
    }

    pub fn is_empty<M: TypedMemory + ?Sized>(&self, memory: &M) -> Result<bool> {
        Ok(self.len(memory)? == 0)
    }

    /// Stored values in iteration order.
    pub fn elements<'m, M: TypedMemory + ?Sized>(&self, memory: &'m M) -> Result<Elements<'m, M>> {
        Ok(match self.class.family {
            Family::Bucket => Elements::Bucket(BucketIter::new(memory, self.value)?),
            Family::Grouped => Elements::Grouped(GroupIter::new(memory, self.value)?),
        })
    }
}

pub enum Elements<'m, M: ?Sized> {
    Bucket(BucketIter<'m, M>),
    Grouped(GroupIter<'m, M>),
}

impl<'m, M: TypedMemory + ?Sized> Iterator for Elements<'m, M> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Bucket(iter) => iter.next(),
            Self::Grouped(iter) => iter.next(),
        }
    }
}
