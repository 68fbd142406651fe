/// Physical representation of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Closed addressing: buckets heading singly linked node chains
    Bucket,
    /// Open addressing: groups of control words beside an element array
    Grouped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Set,
    Map,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Classification {
    pub family: Family,
    pub kind: Kind,
    pub display_name: String,
}

pub const BUCKET_CONTAINERS: [&str; 4] = [
    "boost::unordered::unordered_map",
    "boost::unordered::unordered_multimap",
    "boost::unordered::unordered_set",
    "boost::unordered::unordered_multiset",
];

pub const BUCKET_ITERATORS: [&str; 2] = [
    "boost::unordered::detail::iterator_detail::iterator",
    "boost::unordered::detail::iterator_detail::c_iterator",
];

pub const GROUPED_CONTAINERS: [&str; 8] = [
    "boost::unordered::unordered_flat_map",
    "boost::unordered::unordered_flat_set",
    "boost::unordered::unordered_node_map",
    "boost::unordered::unordered_node_set",
    "boost::unordered::concurrent_flat_map",
    "boost::unordered::concurrent_flat_set",
    "boost::unordered::concurrent_node_map",
    "boost::unordered::concurrent_node_set",
];

pub const GROUPED_ITERATORS: [&str; 1] = ["boost::unordered::detail::foa::table_iterator"];

/// Name with its template argument list removed.
pub fn strip_template_args(type_name: &str) -> &str {
    match type_name.find('<') {
        Some(i) => &type_name[..i],
        None => type_name,
    }
}

pub fn classify(type_name: &str) -> Classification {
    let base = strip_template_args(type_name);
    let family = if GROUPED_CONTAINERS.contains(&base) || GROUPED_ITERATORS.contains(&base) {
        Family::Grouped
    } else {
        Family::Bucket
    };
    let kind = if base.ends_with("map") {
        Kind::Map
    } else {
        Kind::Set
    };
    Classification {
        family,
        kind,
        display_name: base.replace("boost::unordered::", "boost::"),
    }
}
