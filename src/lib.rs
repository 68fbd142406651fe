//! Frozen view of [Boost.Unordered](https://github.com/boostorg/unordered) containers.
//!
//! # What is this about
//!
//! 1. A debugger stops a C++ process, or opens its core dump
//! 2. All it has is raw memory and the type layouts from debug info
//! 3. We re-derive the elements of `boost::unordered_*` containers, in the
//!    exact order their own iterators would visit them, without running any
//!    of their code
//!
//! # How it works
//!
//! Closed addressing (`unordered_map`, `unordered_set` and the multi variants)
//!
//! 1. Read the bucket array: `table_.buckets_.{size_, buckets}`
//! 2. Visit buckets in index order, following each bucket's `next` chain
//!    until a null link
//!
//! Open addressing (`unordered_{flat,node}_{map,set}`, `concurrent_*`)
//!
//! 1. Read `table_.arrays.{groups_, elements_}`
//! 2. Decode each group's control words into a 15-bit occupancy mask, either
//!    from 16 control bytes or from 2 bit-interleaved 64-bit words
//! 3. Replay the container's own increment: clear visited bits, skip empty
//!    groups, land on the lowest set bit, stop at the sentinel slot
//!
//! Iterators are valid when both their element and position pointers are
//! non-null, and dereference to the same values the traversal yields.
//!
//! # How to use
//!
//! ```rust
//! use frozen_unordered::{Field, Formatter, MemoryImage, Registry, TypeInfo, TypeKind, Value};
//!
//! let mut image = MemoryImage::default();
//! let uint = image.add_unsigned("unsigned int", 4);
//! let size_t = image.add_unsigned("unsigned long", 8);
//! let storage = image.add_type(TypeInfo::new(
//!     "boost::unordered::detail::value_base<unsigned int>",
//!     4,
//!     TypeKind::Struct { fields: vec![Field::new("t_", 0, uint)] },
//! ));
//! let node = image.declare_type();
//! let node_ptr = image.add_pointer(node);
//! image.define_type(node, TypeInfo::new(
//!     "boost::unordered::detail::node<unsigned int, void *>",
//!     16,
//!     TypeKind::Struct { fields: vec![Field::new("next", 0, node_ptr), Field::new("buf", 8, storage)] },
//! ));
//! let bucket = image.add_type(TypeInfo::new(
//!     "boost::unordered::detail::bucket",
//!     8,
//!     TypeKind::Struct { fields: vec![Field::new("next", 0, node_ptr)] },
//! ));
//! let bucket_ptr = image.add_pointer(bucket);
//! let array = image.add_type(TypeInfo::new(
//!     "boost::unordered::detail::grouped_bucket_array",
//!     24,
//!     TypeKind::Struct {
//!         fields: vec![
//!             Field::new("size_index_", 0, size_t),
//!             Field::new("size_", 8, size_t),
//!             Field::new("buckets", 16, bucket_ptr),
//!         ],
//!     },
//! ));
//! let table = image.add_type(TypeInfo::new(
//!     "boost::unordered::detail::table",
//!     32,
//!     TypeKind::Struct { fields: vec![Field::new("size_", 0, size_t), Field::new("buckets_", 8, array)] },
//! ));
//! let set = image.add_type(TypeInfo::new(
//!     "boost::unordered::unordered_set<unsigned int>",
//!     32,
//!     TypeKind::Struct { fields: vec![Field::new("table_", 0, table)] },
//! ));
//!
//! // two elements, both chained off bucket 0 of 2
//! image.map_zeroed(0x1000, 32);
//! image.write_u64(0x1000, 2);
//! image.write_u64(0x1010, 2);
//! image.write_u64(0x1018, 0x2000);
//! image.map_zeroed(0x2000, 16);
//! image.write_u64(0x2000, 0x3000);
//! image.map_zeroed(0x3000, 32);
//! image.write_u64(0x3000, 0x3010);
//! image.write_u32(0x3008, 7);
//! image.write_u32(0x3018, 9);
//!
//! let registry = Registry::boost();
//! let Some(Formatter::Container(set)) = registry.lookup(&image, Value::cast(0x1000, set))? else {
//!     panic!("not a container");
//! };
//! assert_eq!(set.render()?, "boost::unordered_set with 2 elements = {[0] = 7, [1] = 9}");
//! # Ok::<(), frozen_unordered::Error>(())
//! ```
//!
//! Out of scope: fancy pointers (every stored handle is read as a plain
//! address) and any validation of the container's invariants.

mod classify;
mod container;
mod error;
mod format;
pub mod group;
pub mod helpers;
mod image;
mod inspect;
mod iter;
mod memory;
mod registry;

pub use classify::*;
pub use container::*;
pub use error::*;
pub use format::*;
pub use image::*;
pub use inspect::*;
pub use iter::*;
pub use memory::*;
pub use registry::*;
