use std::collections::HashSet;

use serde_json::{Map, Number, Value};

use super::graph::{Input, InputError, Node, NodeId};

/// Serialization refuses graphs nested deeper than this.
pub const MAX_SERIALIZE_DEPTH: usize = 512;

/// A named strategy for pulling scannable text out of a structured input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentExtractor {
    /// A string-valued own property of the root object.
    Field(&'static str),
}

impl ContentExtractor {
    pub fn extract<'a>(&self, input: &'a Input) -> Option<&'a str> {
        match self {
            ContentExtractor::Field(key) => {
                let id = input.field(input.root(), key)?;
                match input.node(id) {
                    Node::String(s) => Some(s.as_str()),
                    _ => None,
                }
            }
        }
    }
}

/// Extractors tried in order before falling back to full serialization.
pub const DEFAULT_EXTRACTORS: [ContentExtractor; 2] = [
    ContentExtractor::Field("content"),
    ContentExtractor::Field("code"),
];

/// Text form of an input: the string itself, an extracted field, or the
/// canonical JSON serialization. Unserializable graphs yield an empty string.
pub fn extract_text(input: &Input) -> String {
    if let Some(s) = input.as_str() {
        return s.to_string();
    }
    DEFAULT_EXTRACTORS
        .iter()
        .find_map(|extractor| extractor.extract(input))
        .map(str::to_string)
        .unwrap_or_else(|| input.serialize().unwrap_or_default())
}

impl Input {
    /// Convert to a JSON value. Fails on cycles and on excessive nesting.
    pub fn to_json(&self) -> Result<Value, InputError> {
        let mut on_path = HashSet::new();
        to_value(self, self.root(), 0, &mut on_path)
    }

    /// Canonical compact JSON text.
    pub fn serialize(&self) -> Result<String, InputError> {
        Ok(self.to_json()?.to_string())
    }

    /// Byte length of the canonical serialization, if one exists.
    pub fn serialized_len(&self) -> Option<usize> {
        self.serialize().ok().map(|s| s.len())
    }
}

fn to_value(
    input: &Input,
    id: NodeId,
    depth: usize,
    on_path: &mut HashSet<NodeId>,
) -> Result<Value, InputError> {
    if depth > MAX_SERIALIZE_DEPTH {
        return Err(InputError::TooDeep {
            limit: MAX_SERIALIZE_DEPTH,
        });
    }
    let node = input.node(id);
    if node.is_container() && !on_path.insert(id) {
        return Err(InputError::Cyclic);
    }
    let value = match node {
        Node::Null => Value::Null,
        Node::Bool(b) => Value::Bool(*b),
        Node::Number(n) => number_value(*n),
        Node::String(s) => Value::String(s.clone()),
        Node::Array(items) => Value::Array(
            items
                .iter()
                .map(|child| to_value(input, *child, depth + 1, on_path))
                .collect::<Result<_, _>>()?,
        ),
        Node::Object(fields) => {
            let mut map = Map::new();
            for (key, child) in fields {
                map.insert(key.clone(), to_value(input, *child, depth + 1, on_path)?);
            }
            Value::Object(map)
        }
    };
    on_path.remove(&id);
    Ok(value)
}

/// Integral values print without a fractional part; non-finite values become null.
fn number_value(n: f64) -> Value {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}
