use std::fmt::Write;

use tracing::{debug, warn};

use crate::{ContainerHandle, Elements, Kind, Result, TypeKind, TypedMemory, Value};

/// Knobs for a single inspection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InspectOptions {
    /// Stop after this many elements. `None` trusts the container's links
    /// and walks until the structure says it ends.
    pub max_elements: Option<usize>,
}

impl InspectOptions {
    pub fn max_elements(mut self, limit: usize) -> Self {
        self.max_elements = Some(limit);
        self
    }
}

/// How a renderer should lay out a formatter's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayHint {
    /// Children alternate key, value
    Map,
    None,
}

impl DisplayHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Map => "map",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildValue {
    Value(Value),
    /// Position of a set element, standing in for its key
    Ordinal(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Child {
    pub label: String,
    pub value: ChildValue,
}

impl Child {
    fn unlabeled(value: ChildValue) -> Self {
        Self {
            label: String::new(),
            value,
        }
    }
}

/// Formats a container: a one-line summary plus its elements as children.
pub struct ValueFormatter<'m, M: ?Sized> {
    memory: &'m M,
    handle: ContainerHandle,
    options: InspectOptions,
}

impl<'m, M: TypedMemory + ?Sized> ValueFormatter<'m, M> {
    pub fn new(memory: &'m M, value: Value) -> Result<Self> {
        let handle = ContainerHandle::new(memory, value)?;
        debug!(
            container = %handle.class.display_name,
            family = ?handle.class.family,
            kind = ?handle.class.kind,
            address = value.address,
            "constructed container formatter"
        );
        Ok(Self {
            memory,
            handle,
            options: InspectOptions::default(),
        })
    }

    pub fn with_options(mut self, options: InspectOptions) -> Self {
        self.options = options;
        self
    }

    pub fn handle(&self) -> &ContainerHandle {
        &self.handle
    }

    pub fn summary(&self) -> Result<String> {
        Ok(format!(
            "{} with {} elements",
            self.handle.class.display_name,
            self.handle.len(self.memory)?
        ))
    }

    /// Always `Map`: sets pair each value with its ordinal.
    pub fn display_hint(&self) -> DisplayHint {
        DisplayHint::Map
    }

    /// Summary followed by the children laid out as `{[key] = value, ...}`.
    pub fn render(&self) -> Result<String> {
        let mut out = format!("{} = {{", self.summary()?);
        let mut children = self.children()?;
        let mut first = true;
        while let Some(key) = children.next() {
            let key = render_child(self.memory, &key?)?;
            let value = match children.next() {
                Some(value) => render_child(self.memory, &value?)?,
                None => break,
            };
            if !first {
                out.push_str(", ");
            }
            first = false;
            write!(out, "[{key}] = {value}")?;
        }
        out.push('}');
        Ok(out)
    }

    pub fn children(&self) -> Result<Children<'m, M>> {
        Ok(Children {
            memory: self.memory,
            elements: self.handle.elements(self.memory)?,
            kind: self.handle.class.kind,
            limit: self.options.max_elements,
            count: 0,
            pending: None,
            done: false,
        })
    }
}

/// Lazy, single pass sequence of child entries, two per element.
///
/// Map elements become (first, second); set elements become
/// (ordinal, value). The first read error is yielded and ends the sequence.
pub struct Children<'m, M: ?Sized> {
    memory: &'m M,
    elements: Elements<'m, M>,
    kind: Kind,
    limit: Option<usize>,
    count: usize,
    pending: Option<Child>,
    done: bool,
}

impl<'m, M: TypedMemory + ?Sized> Children<'m, M> {
    /// Elements visited so far.
    pub fn visited(&self) -> usize {
        self.count
    }

    fn split(&mut self, element: Value) -> Result<Child> {
        let (first, second) = match self.kind {
            Kind::Map => (
                ChildValue::Value(self.memory.field(element, "first")?),
                ChildValue::Value(self.memory.field(element, "second")?),
            ),
            Kind::Set => (ChildValue::Ordinal(self.count), ChildValue::Value(element)),
        };
        self.count += 1;
        self.pending = Some(Child::unlabeled(second));
        Ok(Child::unlabeled(first))
    }
}

impl<'m, M: TypedMemory + ?Sized> Iterator for Children<'m, M> {
    type Item = Result<Child>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(child) = self.pending.take() {
            return Some(Ok(child));
        }
        if self.done {
            return None;
        }
        let element = self.elements.next();
        if self.limit == Some(self.count) {
            self.done = true;
            return match element {
                None => None,
                Some(Ok(_)) => {
                    warn!(limit = self.count, "element limit reached, traversal truncated");
                    None
                }
                Some(Err(e)) => {
                    warn!(limit = self.count, error = %e, "element past the limit is unreadable");
                    Some(Err(e))
                }
            };
        }
        match element {
            None => {
                self.done = true;
                debug!(elements = self.count, "traversal finished");
                None
            }
            Some(Err(e)) => {
                self.done = true;
                Some(Err(e))
            }
            Some(Ok(element)) => {
                let child = self.split(element);
                if child.is_err() {
                    self.done = true;
                }
                Some(child)
            }
        }
    }
}

/// Render a value the way a debugger prints it: decimal integers, hex
/// pointers, `{a, b}` arrays and `{name = value}` structs.
pub fn render_value<M: TypedMemory + ?Sized>(memory: &M, value: Value) -> Result<String> {
    let mut out = String::new();
    render_into(memory, value, &mut out)?;
    Ok(out)
}

fn render_into<M: TypedMemory + ?Sized>(memory: &M, value: Value, out: &mut String) -> Result<()> {
    match &memory.type_info(value.ty)?.kind {
        TypeKind::Unsigned => write!(out, "{}", memory.read_unsigned(value)?)?,
        TypeKind::Signed => write!(out, "{}", memory.read_signed(value)?)?,
        TypeKind::Pointer { .. } => write!(out, "{:#x}", memory.read_address(value)?)?,
        TypeKind::Array { len, .. } => {
            out.push('{');
            for i in 0..*len {
                if i > 0 {
                    out.push_str(", ");
                }
                render_into(memory, memory.index(value, i)?, out)?;
            }
            out.push('}');
        }
        TypeKind::Struct { fields } => {
            out.push('{');
            for (i, f) in fields.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if f.base {
                    write!(out, "<{}> = ", f.name)?;
                } else {
                    write!(out, "{} = ", f.name)?;
                }
                render_into(memory, Value::cast(value.address + f.offset as u64, f.ty), out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

pub fn render_child<M: TypedMemory + ?Sized>(memory: &M, child: &Child) -> Result<String> {
    match child.value {
        ChildValue::Value(value) => render_value(memory, value),
        ChildValue::Ordinal(n) => Ok(n.to_string()),
    }
}
