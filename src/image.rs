use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::{Address, Endian, Error, Result, TypeId, TypeInfo, TypeKind, TypedMemory};

/// A frozen memory image: the mapped byte ranges of a process plus the type
/// table describing them.
///
/// This is the offline half of inspection. Whatever captured the process
/// (a core dump reader, a debugger snapshot) copies the interesting ranges in
/// with [`MemoryImage::map`], registers the types it knows about, and the
/// decoders in this crate walk it without the original process being around.
#[derive(Clone)]
pub struct MemoryImage {
    endian: Endian,
    segments: BTreeMap<Address, Vec<u8>>,
    types: Vec<Option<TypeInfo>>,
}

impl Debug for MemoryImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImage")
            .field("endian", &self.endian)
            .field(
                "segments",
                &self
                    .segments
                    .iter()
                    .map(|(base, bytes)| format!("{base:#x}+{}", bytes.len()))
                    .collect::<Vec<_>>(),
            )
            .field("types", &self.types.len())
            .finish()
    }
}

impl Default for MemoryImage {
    fn default() -> Self {
        Self::new(Endian::NATIVE)
    }
}

impl MemoryImage {
    pub fn new(endian: Endian) -> Self {
        Self {
            endian,
            segments: BTreeMap::new(),
            types: Vec::new(),
        }
    }

    pub fn add_type(&mut self, info: TypeInfo) -> TypeId {
        self.types.push(Some(info));
        TypeId(self.types.len() - 1)
    }

    /// Reserve an id for a type that refers to itself, e.g. a list node
    /// holding a pointer to its own type. Fill it in with [`Self::define_type`].
    pub fn declare_type(&mut self) -> TypeId {
        self.types.push(None);
        TypeId(self.types.len() - 1)
    }

    pub fn define_type(&mut self, id: TypeId, info: TypeInfo) {
        if let Some(slot) = self.types.get_mut(id.0) {
            *slot = Some(info);
        }
    }

    /// Find a registered type by its full name.
    pub fn lookup_type(&self, name: &str) -> Option<TypeId> {
        self.types
            .iter()
            .position(|t| matches!(t, Some(info) if info.name == name))
            .map(TypeId)
    }

    /// Copy `bytes` into the image at `address`. A range lying inside an
    /// existing segment is written in place. A range overlapping one or more
    /// segments is merged with them into a single segment, the new bytes on top.
    pub fn map(&mut self, address: Address, bytes: &[u8]) {
        if let Some((base, segment)) = self.containing_mut(address, bytes.len()) {
            let start = (address - base) as usize;
            segment[start..start + bytes.len()].copy_from_slice(bytes);
            return;
        }
        let end = address.saturating_add(bytes.len() as u64);
        let overlapping: Vec<Address> = self
            .segments
            .range(..end)
            .filter(|(base, segment)| base.saturating_add(segment.len() as u64) > address)
            .map(|(base, _)| *base)
            .collect();
        let mut start = address;
        let mut merged_end = end;
        for base in &overlapping {
            start = start.min(*base);
            merged_end = merged_end.max(base.saturating_add(self.segments[base].len() as u64));
        }
        let mut merged = vec![0; (merged_end - start) as usize];
        for base in overlapping {
            if let Some(old) = self.segments.remove(&base) {
                let at = (base - start) as usize;
                merged[at..at + old.len()].copy_from_slice(&old);
            }
        }
        let at = (address - start) as usize;
        merged[at..at + bytes.len()].copy_from_slice(bytes);
        self.segments.insert(start, merged);
    }

    /// Map `len` zero bytes at `address`.
    pub fn map_zeroed(&mut self, address: Address, len: usize) {
        self.map(address, &vec![0; len]);
    }

    pub fn write_unsigned(&mut self, address: Address, size: usize, value: u64) {
        let bytes = match self.endian {
            Endian::Little => value.to_le_bytes()[..size].to_vec(),
            Endian::Big => value.to_be_bytes()[8 - size..].to_vec(),
        };
        self.map(address, &bytes);
    }

    pub fn write_u8(&mut self, address: Address, value: u8) {
        self.write_unsigned(address, 1, value as u64);
    }

    pub fn write_u32(&mut self, address: Address, value: u32) {
        self.write_unsigned(address, 4, value as u64);
    }

    pub fn write_u64(&mut self, address: Address, value: u64) {
        self.write_unsigned(address, 8, value);
    }

    pub fn len(&self) -> usize {
        self.segments.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    fn containing(&self, address: Address, len: usize) -> Option<(Address, &Vec<u8>)> {
        let (base, segment) = self.segments.range(..=address).next_back()?;
        let end = base.checked_add(segment.len() as u64)?;
        if address.checked_add(len as u64)? <= end {
            Some((*base, segment))
        } else {
            None
        }
    }

    fn containing_mut(&mut self, address: Address, len: usize) -> Option<(Address, &mut Vec<u8>)> {
        let (base, segment) = self.segments.range_mut(..=address).next_back()?;
        let end = base.checked_add(segment.len() as u64)?;
        if address.checked_add(len as u64)? <= end {
            Some((*base, segment))
        } else {
            None
        }
    }
}

impl TypedMemory for MemoryImage {
    fn type_info(&self, ty: TypeId) -> Result<&TypeInfo> {
        self.types
            .get(ty.0)
            .and_then(Option::as_ref)
            .ok_or(Error::UnknownType(ty.0))
    }

    fn read_bytes(&self, address: Address, buf: &mut [u8]) -> Result<()> {
        let (base, segment) = self
            .containing(address, buf.len())
            .ok_or(Error::Unmapped {
                address,
                len: buf.len(),
            })?;
        let start = (address - base) as usize;
        buf.copy_from_slice(&segment[start..start + buf.len()]);
        Ok(())
    }

    fn endian(&self) -> Endian {
        self.endian
    }
}

/// Shorthand for the scalar types every layout needs.
impl MemoryImage {
    pub fn add_unsigned(&mut self, name: &str, size: usize) -> TypeId {
        self.add_type(TypeInfo::new(name, size, TypeKind::Unsigned))
    }

    pub fn add_pointer(&mut self, pointee: TypeId) -> TypeId {
        let name = match self.type_info(pointee) {
            Ok(info) => format!("{} *", info.name),
            Err(_) => "void *".to_owned(),
        };
        self.add_type(TypeInfo::new(name, 8, TypeKind::Pointer { pointee }))
    }

    pub fn add_array(&mut self, element: TypeId, len: usize) -> TypeId {
        let (name, size) = match self.type_info(element) {
            Ok(info) => (format!("{} [{len}]", info.name), info.size * len),
            Err(_) => (format!("? [{len}]"), 0),
        };
        self.add_type(TypeInfo::new(name, size, TypeKind::Array { element, len }))
    }
}
