use tracing::trace;

use crate::group::GroupShape;
use crate::helpers::{countr_zero, field_any, read_integral, unwrap_element};
use crate::{Address, Result, TypeId, TypedMemory, Value};

/// Walks a closed addressing table: buckets in index order, each bucket's
/// node chain in link order. Yields the value stored in each node.
///
/// The chain is trusted to be null terminated; a corrupted chain is followed
/// for as long as its addresses stay mapped.
pub struct BucketIter<'m, M: ?Sized> {
    memory: &'m M,
    buckets: Address,
    bucket_ty: TypeId,
    bucket_size: u64,
    bucket_count: u64,
    bucket_index: u64,
    /// The `next` link to follow: a bucket head or a node's successor
    link: Option<Value>,
    done: bool,
}

impl<'m, M: TypedMemory + ?Sized> BucketIter<'m, M> {
    /// Start a traversal of the bucket array `table_.buckets_` of `container`.
    pub fn new(memory: &'m M, container: Value) -> Result<Self> {
        let array = memory.field(memory.field(container, "table_")?, "buckets_")?;
        let bucket_count = read_integral(memory, memory.field(array, "size_")?)?;
        let buckets = memory.field(array, "buckets")?;
        let bucket_ty = memory.pointee(buckets.ty)?;
        let base = memory.read_address(buckets)?;
        Ok(Self {
            memory,
            buckets: base,
            bucket_ty,
            bucket_size: memory.size_of(bucket_ty)? as u64,
            // an unallocated bucket array has nothing to walk
            bucket_count: if base == 0 { 0 } else { bucket_count },
            bucket_index: 0,
            link: None,
            done: false,
        })
    }

    fn step(&mut self) -> Result<Option<Value>> {
        loop {
            if let Some(link) = self.link.take() {
                let address = self.memory.read_address(link)?;
                if address != 0 {
                    let node = Value::cast(address, self.memory.pointee(link.ty)?);
                    self.link = Some(self.memory.field(node, "next")?);
                    return node_value(self.memory, node).map(Some);
                }
            }
            if self.bucket_index == self.bucket_count {
                return Ok(None);
            }
            let bucket = Value::cast(
                self.buckets + self.bucket_index * self.bucket_size,
                self.bucket_ty,
            );
            self.link = Some(self.memory.field(bucket, "next")?);
            self.bucket_index += 1;
        }
    }
}

impl<'m, M: TypedMemory + ?Sized> Iterator for BucketIter<'m, M> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.step().transpose();
        self.done = !matches!(item, Some(Ok(_)));
        item
    }
}

/// The value held by a closed addressing node.
pub fn node_value<M: TypedMemory + ?Sized>(memory: &M, node: Value) -> Result<Value> {
    memory.field(memory.field(node, "buf")?, "t_")
}

/// Walks an open addressing table the way its own iterator does, so elements
/// come out in the container's iteration order.
///
/// Position is a (group, offset) pair; the element slot is
/// `group * slots + offset`. Starting at group 0 offset 0, each step clears
/// the already visited low bits of the group's occupancy mask, skips whole
/// groups while the mask is empty, and lands on its lowest set bit. Landing on
/// the sentinel ends the walk.
pub struct GroupIter<'m, M: ?Sized> {
    memory: &'m M,
    shape: GroupShape,
    groups: Address,
    group_ty: TypeId,
    elements: Address,
    element_ty: TypeId,
    element_size: u64,
    group: u64,
    offset: usize,
    /// False once the walk reached the sentinel, or if there are no elements
    live: bool,
    started: bool,
    done: bool,
}

impl<'m, M: TypedMemory + ?Sized> GroupIter<'m, M> {
    /// Start a traversal of `table_.arrays` of `container`.
    pub fn new(memory: &'m M, container: Value) -> Result<Self> {
        let arrays = memory.field(memory.field(container, "table_")?, "arrays")?;
        let groups = field_any(memory, arrays, &["groups_", "groups"])?;
        let elements = field_any(memory, arrays, &["elements_", "elements"])?;
        let group_ty = memory.pointee(groups.ty)?;
        let element_ty = memory.pointee(elements.ty)?;
        let groups = memory.read_address(groups)?;
        let elements = memory.read_address(elements)?;
        Ok(Self {
            memory,
            shape: GroupShape::of(memory, Value::cast(groups, group_ty))?,
            groups,
            group_ty,
            elements,
            element_ty,
            element_size: memory.size_of(element_ty)? as u64,
            group: 0,
            offset: 0,
            live: elements != 0,
            started: false,
            done: false,
        })
    }

    fn group_value(&self, group: u64) -> Value {
        Value::cast(self.groups + group * self.shape.size as u64, self.group_ty)
    }

    fn occupied(&self, group: u64) -> Result<u32> {
        self.shape.match_occupied(self.memory, self.group_value(group))
    }

    fn advance(&mut self) -> Result<()> {
        let n0 = self.offset;
        let mut mask = (self.occupied(self.group)? >> (n0 + 1)) << (n0 + 1);
        while mask == 0 {
            self.group += 1;
            trace!(group = self.group, "skipping to next group");
            mask = self.occupied(self.group)?;
        }
        let n = countr_zero(mask) as usize;
        if self
            .shape
            .is_sentinel(self.memory, self.group_value(self.group), n)?
        {
            self.live = false;
        } else {
            self.offset = n;
        }
        Ok(())
    }

    fn step(&mut self) -> Result<Option<Value>> {
        if !self.live {
            return Ok(None);
        }
        let started = std::mem::replace(&mut self.started, true);
        // the first slot is only a valid position if it is occupied
        if started || self.occupied(0)? & 1 == 0 {
            self.advance()?;
        }
        if !self.live {
            return Ok(None);
        }
        let slot = self.group * self.shape.slots as u64 + self.offset as u64;
        let element = Value::cast(self.elements + slot * self.element_size, self.element_ty);
        unwrap_element(self.memory, element).map(Some)
    }

    /// Slot index of the current position, if the walk has not ended.
    pub fn position(&self) -> Option<(u64, usize)> {
        (self.started && self.live).then_some((self.group, self.offset))
    }
}

impl<'m, M: TypedMemory + ?Sized> Iterator for GroupIter<'m, M> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.step().transpose();
        self.done = !matches!(item, Some(Ok(_)));
        item
    }
}
