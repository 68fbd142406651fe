use tracing::debug;

use crate::format::render_value;
use crate::helpers::unwrap_element;
use crate::iter::node_value;
use crate::{classify, DisplayHint, Family, Result, TypedMemory, Value};

pub const END_ITERATOR: &str = "iterator = { end iterator }";

/// Formats an iterator into a container: its validity and, when valid, the
/// element it points at.
///
/// A closed addressing iterator holds a node pointer `p` and a bucket
/// position `itb.p`; an open addressing one holds an element pointer `p` and
/// a control pointer `pc`. Either is valid only if both are non-null.
pub struct IteratorFormatter<'m, M: ?Sized> {
    memory: &'m M,
    value: Value,
    family: Family,
}

impl<'m, M: TypedMemory + ?Sized> IteratorFormatter<'m, M> {
    pub fn new(memory: &'m M, value: Value) -> Result<Self> {
        let family = classify(memory.type_name(value)?).family;
        debug!(family = ?family, address = value.address, "constructed iterator formatter");
        Ok(Self {
            memory,
            value,
            family,
        })
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn is_valid(&self) -> Result<bool> {
        let memory = self.memory;
        if memory.read_address(memory.field(self.value, "p")?)? == 0 {
            return Ok(false);
        }
        let position = match self.family {
            Family::Bucket => memory.field(memory.field(self.value, "itb")?, "p")?,
            Family::Grouped => memory.field(self.value, "pc")?,
        };
        Ok(memory.read_address(position)? != 0)
    }

    /// The element the iterator points at, `None` for an end iterator.
    pub fn value(&self) -> Result<Option<Value>> {
        if !self.is_valid()? {
            return Ok(None);
        }
        let target = self.memory.deref(self.memory.field(self.value, "p")?)?;
        let element = match self.family {
            Family::Bucket => node_value(self.memory, target)?,
            Family::Grouped => unwrap_element(self.memory, target)?,
        };
        Ok(Some(element))
    }

    pub fn summary(&self) -> Result<String> {
        match self.value()? {
            Some(value) => Ok(format!(
                "iterator = {{ {} }}",
                render_value(self.memory, value)?
            )),
            None => Ok(END_ITERATOR.to_owned()),
        }
    }

    pub fn display_hint(&self) -> DisplayHint {
        DisplayHint::None
    }
}
