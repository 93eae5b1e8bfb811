//! Flat (node table) wire form of a [`StructuredValue`].
//!
//! The component model has no recursive types, so a value tree is carried
//! across the boundary as a table of nodes in post-order. Children are
//! referenced by index and must precede their parent; each node may be
//! referenced exactly once, except the root. Decoding is a single bottom-up
//! pass that cannot loop or expand shared subtrees, and it stops at
//! [`MAX_DEPTH`] so the rebuilt tree is safe to walk recursively.

use crate::{Error, Object, Result, StructuredValue};

/// One entry of a flat value table.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Octets(Vec<u8>),
    List(Vec<u32>),
    Object(Vec<(String, u32)>),
}

/// A structured value flattened into a node table.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatValue {
    pub nodes: Vec<Node>,
    pub root: u32,
}

impl From<&StructuredValue> for FlatValue {
    fn from(value: &StructuredValue) -> Self {
        let mut nodes = Vec::new();
        let root = push(&mut nodes, value);
        Self { nodes, root }
    }
}

impl From<StructuredValue> for FlatValue {
    fn from(value: StructuredValue) -> Self {
        Self::from(&value)
    }
}

fn push(nodes: &mut Vec<Node>, value: &StructuredValue) -> u32 {
    let node = match value {
        StructuredValue::Null => Node::Null,
        StructuredValue::Boolean(b) => Node::Boolean(*b),
        StructuredValue::Integer(i) => Node::Integer(*i),
        StructuredValue::Decimal(d) => Node::Decimal(*d),
        StructuredValue::String(s) => Node::String(s.clone()),
        StructuredValue::Octets(bytes) => Node::Octets(bytes.clone()),
        StructuredValue::List(items) => {
            Node::List(items.iter().map(|item| push(nodes, item)).collect())
        }
        StructuredValue::Object(object) => Node::Object(
            object
                .iter()
                .map(|(key, value)| (key.to_string(), push(nodes, value)))
                .collect(),
        ),
    };
    nodes.push(node);
    (nodes.len() - 1) as u32
}

/// Deepest nesting accepted when rebuilding a value. A lone scalar has
/// depth 1.
pub const MAX_DEPTH: usize = 256;

impl FlatValue {
    /// Rebuild the value tree.
    ///
    /// The table must describe exactly one tree: every node other than the
    /// root is referenced once, and nesting stays within [`MAX_DEPTH`].
    pub fn unflatten(self) -> Result<StructuredValue> {
        let count = self.nodes.len();
        let root = self.root as usize;
        if root >= count {
            return Err(Error::Wire(format!(
                "root {root} out of range ({count} nodes)"
            )));
        }

        let mut built: Vec<Option<StructuredValue>> = Vec::with_capacity(count);
        let mut depths: Vec<usize> = Vec::with_capacity(count);
        for (index, node) in self.nodes.into_iter().enumerate() {
            let mut depth = 1;
            let mut child = |at: u32| {
                let value = take(&mut built, index, at)?;
                depth = depth.max(depths[at as usize] + 1);
                Ok::<_, Error>(value)
            };
            let value = match node {
                Node::Null => StructuredValue::Null,
                Node::Boolean(b) => StructuredValue::Boolean(b),
                Node::Integer(i) => StructuredValue::Integer(i),
                Node::Decimal(d) => StructuredValue::Decimal(d),
                Node::String(s) => StructuredValue::String(s),
                Node::Octets(bytes) => StructuredValue::Octets(bytes),
                Node::List(children) => StructuredValue::List(
                    children
                        .into_iter()
                        .map(&mut child)
                        .collect::<Result<Vec<_>>>()?,
                ),
                Node::Object(fields) => {
                    let mut object = Object::new();
                    for (key, at) in fields {
                        let value = child(at)?;
                        if object.contains_key(&key) {
                            return Err(Error::Wire(format!(
                                "node {index} repeats field '{key}'"
                            )));
                        }
                        object.set(key, value);
                    }
                    StructuredValue::Object(object)
                }
            };
            if depth > MAX_DEPTH {
                return Err(Error::Wire(format!(
                    "node {index} nests deeper than {MAX_DEPTH} levels"
                )));
            }
            built.push(Some(value));
            depths.push(depth);
        }

        let value = built[root].take().ok_or_else(|| {
            Error::Wire(format!("root {root} is also referenced as a child"))
        })?;
        if let Some(orphan) = built.iter().position(Option::is_some) {
            return Err(Error::Wire(format!(
                "node {orphan} is neither the root nor referenced"
            )));
        }
        Ok(value)
    }
}

fn take(built: &mut [Option<StructuredValue>], parent: usize, child: u32) -> Result<StructuredValue> {
    // `built` only holds nodes that precede `parent`.
    built
        .get_mut(child as usize)
        .ok_or_else(|| {
            Error::Wire(format!(
                "node {parent} references node {child}, which does not precede it"
            ))
        })?
        .take()
        .ok_or_else(|| Error::Wire(format!("node {child} is referenced more than once")))
}
