use crate::Address;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading a frozen memory image.
///
/// None of these are recovered from: inspection is best-effort, so the first
/// failed read ends whatever traversal triggered it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Part of the requested range is not backed by the image
    #[error("address {address:#x} is not mapped ({len} bytes requested)")]
    Unmapped { address: Address, len: usize },

    #[error("unknown type id {0}")]
    UnknownType(usize),

    #[error("type `{ty}` has no field `{field}`")]
    NoSuchField { ty: String, field: String },

    #[error("type `{0}` is not a pointer")]
    NotAPointer(String),

    #[error("type `{0}` is not an array")]
    NotAnArray(String),

    #[error("index {index} out of bounds for `{ty}` of length {len}")]
    IndexOutOfBounds { ty: String, index: usize, len: usize },

    /// Only 1, 2, 4 and 8 byte integers and pointers can be read as scalars
    #[error("type `{ty}` of size {size} cannot be read as an integer")]
    NotAScalar { ty: String, size: usize },

    #[error("dereferenced a null `{0}`")]
    NullDereference(String),

    #[error("type `{ty}` has no template argument {index}")]
    NoTemplateArgument { ty: String, index: usize },

    /// Group control array that is neither 16 bytes nor 2 words
    #[error("group type `{ty}` has an unsupported control array of {len} entries")]
    UnsupportedGroupLayout { ty: String, len: usize },

    /// Group whose slot count `N` does not fit the 15-bit occupancy mask
    #[error("group type `{ty}` declares {slots} slots per group")]
    UnsupportedGroupSlots { ty: String, slots: usize },

    #[error(transparent)]
    Fmt(#[from] std::fmt::Error),
}
