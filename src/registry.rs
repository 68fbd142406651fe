use crate::classify::{BUCKET_CONTAINERS, BUCKET_ITERATORS, GROUPED_CONTAINERS, GROUPED_ITERATORS};
use crate::{
    DisplayHint, InspectOptions, IteratorFormatter, Result, TypedMemory, Value, ValueFormatter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Container,
    Iterator,
}

/// Maps templated type names to the formatter that understands them.
///
/// A pattern `name` matches exactly the instantiations `name<...>`; there is
/// no fuzzy matching. Build one at startup and hand it to whatever resolves
/// values.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    patterns: Vec<(String, Role)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every Boost.Unordered container and iterator this crate can decode.
    pub fn boost() -> Self {
        let mut registry = Self::new();
        for name in BUCKET_CONTAINERS.iter().chain(GROUPED_CONTAINERS.iter()) {
            registry.register_container(name);
        }
        for name in BUCKET_ITERATORS.iter().chain(GROUPED_ITERATORS.iter()) {
            registry.register_iterator(name);
        }
        registry
    }

    pub fn register_container(&mut self, name: &str) -> &mut Self {
        self.patterns.push((name.to_owned(), Role::Container));
        self
    }

    pub fn register_iterator(&mut self, name: &str) -> &mut Self {
        self.patterns.push((name.to_owned(), Role::Iterator));
        self
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn role_of(&self, type_name: &str) -> Option<Role> {
        self.patterns
            .iter()
            .find(|(name, _)| {
                type_name
                    .strip_prefix(name.as_str())
                    .and_then(|rest| rest.strip_prefix('<'))
                    .is_some_and(|rest| rest.ends_with('>'))
            })
            .map(|(_, role)| *role)
    }

    /// Formatter for `value`, or `None` if its type is not registered.
    pub fn lookup<'m, M: TypedMemory + ?Sized>(
        &self,
        memory: &'m M,
        value: Value,
    ) -> Result<Option<Formatter<'m, M>>> {
        self.lookup_with(memory, value, InspectOptions::default())
    }

    pub fn lookup_with<'m, M: TypedMemory + ?Sized>(
        &self,
        memory: &'m M,
        value: Value,
        options: InspectOptions,
    ) -> Result<Option<Formatter<'m, M>>> {
        Ok(match self.role_of(memory.type_name(value)?) {
            Some(Role::Container) => Some(Formatter::Container(
                ValueFormatter::new(memory, value)?.with_options(options),
            )),
            Some(Role::Iterator) => Some(Formatter::Iterator(IteratorFormatter::new(
                memory, value,
            )?)),
            None => None,
        })
    }
}

pub enum Formatter<'m, M: ?Sized> {
    Container(ValueFormatter<'m, M>),
    Iterator(IteratorFormatter<'m, M>),
}

impl<'m, M: TypedMemory + ?Sized> Formatter<'m, M> {
    pub fn summary(&self) -> Result<String> {
        match self {
            Self::Container(f) => f.summary(),
            Self::Iterator(f) => f.summary(),
        }
    }

    pub fn display_hint(&self) -> DisplayHint {
        match self {
            Self::Container(f) => f.display_hint(),
            Self::Iterator(f) => f.display_hint(),
        }
    }
}
