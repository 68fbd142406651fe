//! Builds Boost.Unordered containers, as a debugger would see them, inside a
//! `MemoryImage`.
#![allow(dead_code)]

use frozen_unordered::{
    classify,
    group::{packed_set, GroupLayout}, Address, Field, Kind, MemoryImage, TypeId, TypeInfo, TypeKind,
    TypedMemory, Value,
};

pub const SLOTS: usize = 15;
pub const SENTINEL: u8 = 1;

pub struct Fixture {
    pub image: MemoryImage,
    pub uint: TypeId,
    pub uchar: TypeId,
    pub size_t: TypeId,
    pub pair: TypeId,
    next: Address,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        let mut image = MemoryImage::default();
        let uint = image.add_unsigned("unsigned int", 4);
        let uchar = image.add_unsigned("unsigned char", 1);
        let size_t = image.add_unsigned("unsigned long", 8);
        let pair = image.add_type(TypeInfo::new(
            "std::pair<unsigned int const, unsigned int>",
            8,
            TypeKind::Struct {
                fields: vec![Field::new("first", 0, uint), Field::new("second", 4, uint)],
            },
        ));
        Self {
            image,
            uint,
            uchar,
            size_t,
            pair,
            next: 0x10_000,
        }
    }

    /// Map a fresh zeroed block, 16-byte aligned, with a gap after it.
    pub fn alloc(&mut self, len: usize) -> Address {
        let address = self.next;
        self.image.map_zeroed(address, len.max(1));
        self.next += ((len as u64 + 15) & !15) + 0x100;
        address
    }

    pub fn add_struct(&mut self, name: &str, size: usize, fields: Vec<Field>) -> TypeId {
        self.image
            .add_type(TypeInfo::new(name, size, TypeKind::Struct { fields }))
    }

    fn value_type(&self, container_name: &str) -> (TypeId, Kind) {
        match classify(container_name).kind {
            Kind::Map => (self.pair, Kind::Map),
            Kind::Set => (self.uint, Kind::Set),
        }
    }

    fn write_value(&mut self, kind: Kind, address: Address, (key, mapped): (u32, u32)) {
        self.image.write_u32(address, key);
        if kind == Kind::Map {
            self.image.write_u32(address + 4, mapped);
        }
    }

    /// Render every child of the formatter for `value`.
    pub fn render_children(&self, container: Value) -> anyhow::Result<Vec<String>> {
        let formatter = frozen_unordered::ValueFormatter::new(&self.image, container)?;
        let mut out = Vec::new();
        for child in formatter.children()? {
            out.push(frozen_unordered::render_child(&self.image, &child?)?);
        }
        Ok(out)
    }
}

pub struct BucketTable {
    pub container: Value,
    pub node_ptr: TypeId,
    pub bucket_ptr: TypeId,
    pub buckets: Address,
    /// Node addresses per bucket, in link order
    pub nodes: Vec<Vec<Address>>,
}

/// A closed addressing container whose bucket `i` chains `buckets[i]` in order.
pub fn bucket_table(fx: &mut Fixture, name: &str, buckets: &[Vec<(u32, u32)>]) -> BucketTable {
    let (value_ty, kind) = fx.value_type(name);
    let storage = fx.add_struct(
        "boost::unordered::detail::value_base",
        8,
        vec![Field::new("t_", 0, value_ty)],
    );
    let node = fx.image.declare_type();
    let node_ptr = fx.image.add_pointer(node);
    fx.image.define_type(
        node,
        TypeInfo::new(
            "boost::unordered::detail::node<unsigned int, void *>",
            16,
            TypeKind::Struct {
                fields: vec![Field::new("next", 0, node_ptr), Field::new("buf", 8, storage)],
            },
        ),
    );
    let bucket = fx.add_struct(
        "boost::unordered::detail::bucket<node, void *>",
        8,
        vec![Field::new("next", 0, node_ptr)],
    );
    let bucket_ptr = fx.image.add_pointer(bucket);
    let size_t = fx.size_t;
    let array = fx.add_struct(
        "boost::unordered::detail::grouped_bucket_array<bucket>",
        32,
        vec![
            Field::new("size_index_", 0, size_t),
            Field::new("size_", 8, size_t),
            Field::new("buckets", 16, bucket_ptr),
            Field::new("groups", 24, size_t),
        ],
    );
    let table = fx.add_struct(
        "boost::unordered::detail::table<types>",
        40,
        vec![Field::new("size_", 0, size_t), Field::new("buckets_", 8, array)],
    );
    let container_ty = fx.add_struct(name, 40, vec![Field::new("table_", 0, table)]);

    let container = fx.alloc(40);
    let base = if buckets.is_empty() {
        0
    } else {
        fx.alloc(8 * buckets.len())
    };
    let mut nodes = Vec::new();
    for (i, chain) in buckets.iter().enumerate() {
        let addresses: Vec<Address> = chain.iter().map(|_| fx.alloc(16)).collect();
        let mut link = base + 8 * i as u64;
        for (address, element) in addresses.iter().zip(chain) {
            fx.image.write_u64(link, *address);
            fx.write_value(kind, address + 8, *element);
            link = *address;
        }
        nodes.push(addresses);
    }
    let total: usize = buckets.iter().map(Vec::len).sum();
    fx.image.write_u64(container, total as u64);
    fx.image.write_u64(container + 16, buckets.len() as u64);
    fx.image.write_u64(container + 24, base);

    BucketTable {
        container: Value::cast(container, container_ty),
        node_ptr,
        bucket_ptr,
        buckets: base,
        nodes,
    }
}

/// A closed addressing iterator holding `node` and bucket position `bucket`.
pub fn bucket_iterator(fx: &mut Fixture, table: &BucketTable, node: Address, bucket: Address) -> Value {
    let size_t = fx.size_t;
    let position = fx.add_struct(
        "boost::unordered::detail::grouped_bucket_iterator<bucket>",
        16,
        vec![Field::new("p", 0, table.bucket_ptr), Field::new("pbg", 8, size_t)],
    );
    let ty = fx.add_struct(
        "boost::unordered::detail::iterator_detail::iterator<node>",
        24,
        vec![Field::new("p", 0, table.node_ptr), Field::new("itb", 8, position)],
    );
    let address = fx.alloc(24);
    fx.image.write_u64(address, node);
    fx.image.write_u64(address + 8, bucket);
    Value::cast(address, ty)
}

pub struct GroupedSpec<'a> {
    pub name: &'a str,
    pub layout: GroupLayout,
    pub groups: usize,
    /// (global slot index, element); the last slot of the last group is the
    /// sentinel and must stay free
    pub occupied: &'a [(usize, (u32, u32))],
    /// Store elements behind `element_type` wrappers, like node containers
    pub node: bool,
    /// Control words and size are `std::atomic`, like concurrent containers
    pub atomic: bool,
    /// Leave `elements_` null, like a default constructed table
    pub unallocated: bool,
    /// Spell the arrays `groups` and `elements`, like concurrent_table.hpp
    pub bare_array_names: bool,
}

impl<'a> GroupedSpec<'a> {
    pub fn new(name: &'a str, groups: usize, occupied: &'a [(usize, (u32, u32))]) -> Self {
        Self {
            name,
            layout: GroupLayout::Regular,
            groups,
            occupied,
            node: false,
            atomic: false,
            unallocated: false,
            bare_array_names: false,
        }
    }

    pub fn layout(mut self, layout: GroupLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn node(mut self) -> Self {
        self.node = true;
        self
    }

    pub fn atomic(mut self) -> Self {
        self.atomic = true;
        self
    }

    pub fn unallocated(mut self) -> Self {
        self.unallocated = true;
        self
    }

    pub fn bare_array_names(mut self) -> Self {
        self.bare_array_names = true;
        self
    }
}

pub struct GroupedTable {
    pub container: Value,
    pub groups: Address,
    pub elements: Address,
    pub element_ptr: TypeId,
    pub element_size: u64,
    pub value_ty: TypeId,
}

impl GroupedTable {
    pub fn slot_address(&self, slot: usize) -> Address {
        self.elements + slot as u64 * self.element_size
    }

    pub fn control_address(&self, slot: usize) -> Address {
        self.groups + 16 * (slot / SLOTS) as u64 + (slot % SLOTS) as u64
    }
}

fn reduced_hash(slot: usize) -> u8 {
    0x80 | (slot as u8 & 0x7f)
}

fn atomic_of(fx: &mut Fixture, inner: TypeId) -> TypeId {
    let info = fx.image.type_info(inner).expect("registered").clone();
    fx.image.add_type(
        TypeInfo::new(
            format!("std::atomic<{}>", info.name),
            info.size,
            TypeKind::Struct { fields: vec![] },
        )
        .with_template_args([inner]),
    )
}

/// An open addressing container laid out per `spec`.
pub fn grouped_table(fx: &mut Fixture, spec: &GroupedSpec<'_>) -> GroupedTable {
    let (value_ty, kind) = fx.value_type(spec.name);
    let value_size = fx.image.size_of(value_ty).expect("registered") as u64;
    let size_t = fx.size_t;

    let (word, arity) = match spec.layout {
        GroupLayout::Regular => (fx.uchar, 16),
        GroupLayout::Packed => (size_t, 2),
    };
    let integral = if spec.atomic {
        let atomic = atomic_of(fx, word);
        let size = fx.image.size_of(word).expect("registered");
        fx.add_struct(
            "boost::unordered::detail::foa::atomic_integral",
            size,
            vec![Field::new("n", 0, atomic)],
        )
    } else {
        let size = fx.image.size_of(word).expect("registered");
        fx.add_struct(
            "boost::unordered::detail::foa::plain_integral",
            size,
            vec![Field::new("n", 0, word)],
        )
    };
    let m = fx.image.add_array(integral, arity);
    let group = fx.image.add_type(
        TypeInfo::new(
            "boost::unordered::detail::foa::group15<boost::unordered::detail::foa::plain_integral>",
            16,
            TypeKind::Struct {
                fields: vec![Field::new("m", 0, m)],
            },
        )
        .with_constant("N", SLOTS as u64)
        .with_constant("sentinel_", SENTINEL as u64),
    );
    let group_ptr = fx.image.add_pointer(group);

    let (element_ty, element_size) = if spec.node {
        let value_ptr = fx.image.add_pointer(value_ty);
        let wrapper = fx.add_struct(
            "boost::unordered::detail::foa::element_type<unsigned int, void *>",
            8,
            vec![Field::new("p", 0, value_ptr)],
        );
        (wrapper, 8)
    } else {
        (value_ty, value_size)
    };
    let element_ptr = fx.image.add_pointer(element_ty);

    let (groups_field, elements_field) = if spec.bare_array_names {
        ("groups", "elements")
    } else {
        ("groups_", "elements_")
    };
    let arrays = fx.add_struct(
        "boost::unordered::detail::foa::table_arrays<...>",
        32,
        vec![
            Field::new("groups_size_index", 0, size_t),
            Field::new("groups_size_mask", 8, size_t),
            Field::new(groups_field, 16, group_ptr),
            Field::new(elements_field, 24, element_ptr),
        ],
    );
    let size_ty = if spec.atomic {
        atomic_of(fx, size_t)
    } else {
        size_t
    };
    let size_ctrl = fx.add_struct(
        "boost::unordered::detail::foa::size_ctrl_type",
        16,
        vec![Field::new("ml", 0, size_ty), Field::new("size", 8, size_ty)],
    );
    let core = fx.add_struct(
        "boost::unordered::detail::foa::table_core<...>",
        48,
        vec![Field::new("arrays", 0, arrays), Field::new("size_ctrl", 32, size_ctrl)],
    );
    let table = fx.add_struct(
        "boost::unordered::detail::foa::table<...>",
        48,
        vec![Field::base("table_core", 0, core)],
    );
    let container_ty = fx.add_struct(spec.name, 48, vec![Field::new("table_", 0, table)]);

    let slots = spec.groups * SLOTS;
    let groups = fx.alloc(16 * spec.groups);
    let elements = if spec.unallocated {
        0
    } else {
        fx.alloc(element_size as usize * slots)
    };

    let mut control = vec![[0u8; 16]; spec.groups];
    let mut words = vec![[0u64; 2]; spec.groups];
    let mut mark = |slot: usize, hash: u8| {
        control[slot / SLOTS][slot % SLOTS] = hash;
        packed_set(&mut words[slot / SLOTS], slot % SLOTS, hash);
    };
    for (slot, _) in spec.occupied {
        assert!(*slot < slots - 1, "slot {slot} collides with the sentinel");
        mark(*slot, reduced_hash(*slot));
    }
    mark(slots - 1, SENTINEL);

    for g in 0..spec.groups {
        let address = groups + 16 * g as u64;
        match spec.layout {
            GroupLayout::Regular => fx.image.map(address, &control[g]),
            GroupLayout::Packed => {
                fx.image.write_u64(address, words[g][0]);
                fx.image.write_u64(address + 8, words[g][1]);
            }
        }
    }

    if !spec.unallocated {
        for (slot, element) in spec.occupied {
            let slot_address = elements + *slot as u64 * element_size;
            let value_address = if spec.node {
                let boxed = fx.alloc(value_size as usize);
                fx.image.write_u64(slot_address, boxed);
                boxed
            } else {
                slot_address
            };
            fx.write_value(kind, value_address, *element);
        }
    }

    let container = fx.alloc(48);
    fx.image.write_u64(container + 8, spec.groups as u64 - 1);
    fx.image.write_u64(container + 16, groups);
    fx.image.write_u64(container + 24, elements);
    fx.image.write_u64(container + 40, spec.occupied.len() as u64);

    GroupedTable {
        container: Value::cast(container, container_ty),
        groups,
        elements,
        element_ptr,
        element_size,
        value_ty,
    }
}

/// An open addressing iterator holding control pointer `pc` and element `p`.
pub fn grouped_iterator(fx: &mut Fixture, table: &GroupedTable, pc: Address, p: Address) -> Value {
    let uchar_ptr = fx.image.add_pointer(fx.uchar);
    let ty = fx.add_struct(
        "boost::unordered::detail::foa::table_iterator<policy, group15<plain_integral>, false>",
        16,
        vec![Field::new("pc", 0, uchar_ptr), Field::new("p", 8, table.element_ptr)],
    );
    let address = fx.alloc(16);
    fx.image.write_u64(address, pc);
    fx.image.write_u64(address + 8, p);
    Value::cast(address, ty)
}
