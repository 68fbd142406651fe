//! The typed view of a frozen process that every decoder reads through.
//!
//! A debugger already knows, from debug info, how each type is laid out. This
//! module models just enough of that knowledge to walk containers: named
//! fields at byte offsets, pointers, fixed arrays, integers, template
//! arguments and static constants. Reading is always by value, never by
//! reference into the target.

use crate::{Error, Result};

/// An address in the inspected process. Always 64-bit, whatever the host is.
pub type Address = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endian {
    Little,
    Big,
}

cfg_if::cfg_if! {
    if #[cfg(target_endian = "little")] {
        impl Endian {
            pub const NATIVE: Endian = Endian::Little;
        }
    } else {
        impl Endian {
            pub const NATIVE: Endian = Endian::Big;
        }
    }
}

/// Index of a type in the accessor's type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInfo {
    /// Fully qualified name, template arguments included
    pub name: String,
    pub size: usize,
    pub kind: TypeKind,
    pub template_args: Vec<TypeId>,
    /// Static constexpr members, e.g. a group's `N`
    pub constants: Vec<(String, u64)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Unsigned,
    Signed,
    Pointer { pointee: TypeId },
    Array { element: TypeId, len: usize },
    Struct { fields: Vec<Field> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub offset: usize,
    pub ty: TypeId,
    /// Base-class sub-object; its fields are visible through the outer struct
    pub base: bool,
}

/// A typed object somewhere in the inspected process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Value {
    pub address: Address,
    pub ty: TypeId,
}

impl Value {
    /// Reinterpret `address` as an object of type `ty`.
    pub fn cast(address: Address, ty: TypeId) -> Self {
        Self { address, ty }
    }
}

impl TypeInfo {
    pub fn new(name: impl Into<String>, size: usize, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            size,
            kind,
            template_args: Vec::new(),
            constants: Vec::new(),
        }
    }

    pub fn with_template_args(mut self, args: impl IntoIterator<Item = TypeId>) -> Self {
        self.template_args.extend(args);
        self
    }

    pub fn with_constant(mut self, name: impl Into<String>, value: u64) -> Self {
        self.constants.push((name.into(), value));
        self
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self.kind, TypeKind::Pointer { .. })
    }
}

impl Field {
    pub fn new(name: impl Into<String>, offset: usize, ty: TypeId) -> Self {
        Self {
            name: name.into(),
            offset,
            ty,
            base: false,
        }
    }

    pub fn base(name: impl Into<String>, offset: usize, ty: TypeId) -> Self {
        Self {
            base: true,
            ..Self::new(name, offset, ty)
        }
    }
}

/// Read access to a stopped process or a core image, with type information.
///
/// Implementors provide raw byte reads and a type table; everything else is
/// derived. Nothing here ever writes to the target.
pub trait TypedMemory {
    fn type_info(&self, ty: TypeId) -> Result<&TypeInfo>;

    fn read_bytes(&self, address: Address, buf: &mut [u8]) -> Result<()>;

    fn endian(&self) -> Endian;

    fn type_name(&self, value: Value) -> Result<&str> {
        Ok(self.type_info(value.ty)?.name.as_str())
    }

    fn size_of(&self, ty: TypeId) -> Result<usize> {
        Ok(self.type_info(ty)?.size)
    }

    /// Member `name` of a struct value. Base-class sub-objects are searched
    /// after the direct members, depth first.
    fn field(&self, value: Value, name: &str) -> Result<Value> {
        match find_field(self, value, name)? {
            Some(field) => Ok(field),
            None => Err(Error::NoSuchField {
                ty: self.type_info(value.ty)?.name.clone(),
                field: name.to_owned(),
            }),
        }
    }

    fn index(&self, value: Value, index: usize) -> Result<Value> {
        let info = self.type_info(value.ty)?;
        let TypeKind::Array { element, len } = info.kind else {
            return Err(Error::NotAnArray(info.name.clone()));
        };
        if index >= len {
            return Err(Error::IndexOutOfBounds {
                ty: info.name.clone(),
                index,
                len,
            });
        }
        let stride = self.size_of(element)? as u64;
        Ok(Value::cast(value.address + stride * index as u64, element))
    }

    fn array_len(&self, value: Value) -> Result<usize> {
        let info = self.type_info(value.ty)?;
        match info.kind {
            TypeKind::Array { len, .. } => Ok(len),
            _ => Err(Error::NotAnArray(info.name.clone())),
        }
    }

    /// Integers and pointers of 1, 2, 4 or 8 bytes, zero extended.
    fn read_unsigned(&self, value: Value) -> Result<u64> {
        let info = self.type_info(value.ty)?;
        let size = info.size;
        let readable = matches!(
            info.kind,
            TypeKind::Unsigned | TypeKind::Signed | TypeKind::Pointer { .. }
        );
        if !readable || !matches!(size, 1 | 2 | 4 | 8) {
            return Err(Error::NotAScalar {
                ty: info.name.clone(),
                size,
            });
        }
        let mut buf = [0u8; 8];
        self.read_bytes(value.address, &mut buf[..size])?;
        Ok(match self.endian() {
            Endian::Little => u64::from_le_bytes(buf),
            Endian::Big => u64::from_be_bytes(buf) >> (64 - 8 * size),
        })
    }

    /// Like [`TypedMemory::read_unsigned`] but sign extended.
    fn read_signed(&self, value: Value) -> Result<i64> {
        let raw = self.read_unsigned(value)?;
        let bits = 64 - 8 * self.size_of(value.ty)? as u32;
        Ok(((raw << bits) as i64) >> bits)
    }

    fn read_address(&self, pointer: Value) -> Result<Address> {
        let info = self.type_info(pointer.ty)?;
        if !info.is_pointer() {
            return Err(Error::NotAPointer(info.name.clone()));
        }
        self.read_unsigned(pointer)
    }

    fn deref(&self, pointer: Value) -> Result<Value> {
        let info = self.type_info(pointer.ty)?;
        let TypeKind::Pointer { pointee } = info.kind else {
            return Err(Error::NotAPointer(info.name.clone()));
        };
        match self.read_address(pointer)? {
            0 => Err(Error::NullDereference(info.name.clone())),
            address => Ok(Value::cast(address, pointee)),
        }
    }

    fn pointee(&self, pointer: TypeId) -> Result<TypeId> {
        let info = self.type_info(pointer)?;
        match info.kind {
            TypeKind::Pointer { pointee } => Ok(pointee),
            _ => Err(Error::NotAPointer(info.name.clone())),
        }
    }

    fn template_arg(&self, ty: TypeId, index: usize) -> Result<TypeId> {
        let info = self.type_info(ty)?;
        info.template_args
            .get(index)
            .copied()
            .ok_or_else(|| Error::NoTemplateArgument {
                ty: info.name.clone(),
                index,
            })
    }

    fn constant(&self, ty: TypeId, name: &str) -> Result<Option<u64>> {
        Ok(self
            .type_info(ty)?
            .constants
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v))
    }
}

fn find_field<M: TypedMemory + ?Sized>(
    memory: &M,
    value: Value,
    name: &str,
) -> Result<Option<Value>> {
    let TypeKind::Struct { fields } = &memory.type_info(value.ty)?.kind else {
        return Ok(None);
    };
    if let Some(f) = fields.iter().find(|f| !f.base && f.name == name) {
        return Ok(Some(Value::cast(value.address + f.offset as u64, f.ty)));
    }
    for f in fields.iter().filter(|f| f.base) {
        let base = Value::cast(value.address + f.offset as u64, f.ty);
        if let Some(found) = find_field(memory, base, name)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}
