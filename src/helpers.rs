use crate::{Result, TypedMemory, Value};

pub const ATOMIC_PREFIX: &str = "std::atomic<";
pub const ELEMENT_WRAPPER_PREFIX: &str = "boost::unordered::detail::foa::element_type<";

/// View a `std::atomic<T>` as the plain `T` it wraps. Other values pass
/// through unchanged.
pub fn unwrap_atomic<M: TypedMemory + ?Sized>(memory: &M, value: Value) -> Result<Value> {
    if memory.type_name(value)?.starts_with(ATOMIC_PREFIX) {
        let inner = memory.template_arg(value.ty, 0)?;
        Ok(Value::cast(value.address, inner))
    } else {
        Ok(value)
    }
}

/// Node-based open addressing tables store an `element_type` holding a
/// pointer to the real value; follow it. Other values pass through unchanged.
///
/// The held pointer is read as a plain address, fancy pointers are not
/// supported.
pub fn unwrap_element<M: TypedMemory + ?Sized>(memory: &M, value: Value) -> Result<Value> {
    if memory.type_name(value)?.starts_with(ELEMENT_WRAPPER_PREFIX) {
        memory.deref(memory.field(value, "p")?)
    } else {
        Ok(value)
    }
}

/// Index of the lowest set bit, or 32 for an empty mask.
#[inline]
pub fn countr_zero(mask: u32) -> u32 {
    mask.trailing_zeros()
}

/// Integer stored in `value`, looking through atomics and the
/// `plain_integral`/`atomic_integral` wrappers that keep it in field `n`.
pub(crate) fn read_integral<M: TypedMemory + ?Sized>(memory: &M, value: Value) -> Result<u64> {
    let value = unwrap_atomic(memory, value)?;
    let value = match memory.type_info(value.ty)?.kind {
        crate::TypeKind::Struct { .. } => unwrap_atomic(memory, memory.field(value, "n")?)?,
        _ => value,
    };
    memory.read_unsigned(value)
}

/// The first of `names` that `value` has as a field. Headers differ on
/// some spellings, e.g. `groups_` against `groups`.
pub(crate) fn field_any<M: TypedMemory + ?Sized>(
    memory: &M,
    value: Value,
    names: &[&str],
) -> Result<Value> {
    let mut missing = None;
    for name in names {
        match memory.field(value, name) {
            Err(e @ crate::Error::NoSuchField { .. }) => missing = Some(e),
            found => return found,
        }
    }
    Err(missing.unwrap_or_else(|| crate::Error::NoSuchField {
        ty: memory.type_name(value).unwrap_or_default().to_owned(),
        field: String::new(),
    }))
}
