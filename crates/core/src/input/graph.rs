use serde_json::Value;
use thiserror::Error;

/// Identity of a node inside an [`Input`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<NodeId>),
    /// Own properties in insertion order.
    Object(Vec<(String, NodeId)>),
}

impl Node {
    pub fn is_container(&self) -> bool {
        matches!(self, Node::Array(_) | Node::Object(_))
    }

    /// Child ids in declaration order; empty for scalars.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Node::Array(items) => items.clone(),
            Node::Object(fields) => fields.iter().map(|(_, id)| *id).collect(),
            _ => Vec::new(),
        }
    }

    /// Number of direct children; 0 for scalars.
    pub fn child_count(&self) -> usize {
        match self {
            Node::Array(items) => items.len(),
            Node::Object(fields) => fields.len(),
            _ => 0,
        }
    }

    /// The `index`-th child without copying the child list.
    pub fn child(&self, index: usize) -> Option<NodeId> {
        match self {
            Node::Array(items) => items.get(index).copied(),
            Node::Object(fields) => fields.get(index).map(|(_, id)| *id),
            _ => None,
        }
    }

    /// Type tag used for heterogeneity checks.
    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "boolean",
            Node::Number(_) => "number",
            Node::String(_) => "string",
            Node::Array(_) => "array",
            Node::Object(_) => "object",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("input graph contains a circular reference")]
    Cyclic,
    #[error("input nesting exceeds {limit} levels")]
    TooDeep { limit: usize },
    #[error("node {0} is not a container")]
    NotAContainer(usize),
    #[error("node {0} does not exist")]
    UnknownNode(usize),
}

/// A scored payload: an arena of nodes reachable from `root`.
///
/// Containers refer to children by [`NodeId`], so a graph may share
/// subtrees or contain cycles. Every traversal tracks visited ids.
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Input {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn root_node(&self) -> &Node {
        self.node(self.root)
    }

    /// The root value when the whole input is a single string.
    pub fn as_str(&self) -> Option<&str> {
        match self.root_node() {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    /// Look up an own property of an object node.
    pub fn field(&self, id: NodeId, key: &str) -> Option<NodeId> {
        match self.node(id) {
            Node::Object(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| *v),
            _ => None,
        }
    }

    pub fn from_json(value: &Value) -> Self {
        let mut builder = InputBuilder::new();
        let root = builder.json(value);
        builder.build(root)
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Input::from_json(&value)
    }
}

impl From<&Value> for Input {
    fn from(value: &Value) -> Self {
        Input::from_json(value)
    }
}

impl From<&str> for Input {
    fn from(s: &str) -> Self {
        let mut builder = InputBuilder::new();
        let root = builder.string(s);
        builder.build(root)
    }
}

impl From<String> for Input {
    fn from(s: String) -> Self {
        Input::from(s.as_str())
    }
}

/// Incremental constructor for inputs, including self-referential ones.
#[derive(Debug, Default)]
pub struct InputBuilder {
    nodes: Vec<Node>,
}

impl InputBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn null(&mut self) -> NodeId {
        self.push(Node::Null)
    }

    pub fn bool(&mut self, value: bool) -> NodeId {
        self.push(Node::Bool(value))
    }

    pub fn number(&mut self, value: f64) -> NodeId {
        self.push(Node::Number(value))
    }

    pub fn string(&mut self, value: impl Into<String>) -> NodeId {
        self.push(Node::String(value.into()))
    }

    pub fn object(&mut self) -> NodeId {
        self.push(Node::Object(Vec::new()))
    }

    pub fn array(&mut self) -> NodeId {
        self.push(Node::Array(Vec::new()))
    }

    /// Set `key` on an object node; an existing key is overwritten in place.
    pub fn insert(&mut self, object: NodeId, key: &str, child: NodeId) -> Result<(), InputError> {
        if child.0 >= self.nodes.len() {
            return Err(InputError::UnknownNode(child.0));
        }
        match self.nodes.get_mut(object.0) {
            Some(Node::Object(fields)) => {
                match fields.iter_mut().find(|(k, _)| k == key) {
                    Some(slot) => slot.1 = child,
                    None => fields.push((key.to_string(), child)),
                }
                Ok(())
            }
            Some(_) => Err(InputError::NotAContainer(object.0)),
            None => Err(InputError::UnknownNode(object.0)),
        }
    }

    /// Append `child` to an array node.
    pub fn append(&mut self, array: NodeId, child: NodeId) -> Result<(), InputError> {
        if child.0 >= self.nodes.len() {
            return Err(InputError::UnknownNode(child.0));
        }
        match self.nodes.get_mut(array.0) {
            Some(Node::Array(items)) => {
                items.push(child);
                Ok(())
            }
            Some(_) => Err(InputError::NotAContainer(array.0)),
            None => Err(InputError::UnknownNode(array.0)),
        }
    }

    /// Add a JSON subtree, returning the id of its top node.
    pub fn json(&mut self, value: &Value) -> NodeId {
        match value {
            Value::Null => self.null(),
            Value::Bool(b) => self.bool(*b),
            Value::Number(n) => self.number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => self.string(s.as_str()),
            Value::Array(items) => {
                let ids: Vec<NodeId> = items.iter().map(|item| self.json(item)).collect();
                self.push(Node::Array(ids))
            }
            Value::Object(map) => {
                let fields: Vec<(String, NodeId)> =
                    map.iter().map(|(k, v)| (k.clone(), self.json(v))).collect();
                self.push(Node::Object(fields))
            }
        }
    }

    pub fn build(self, root: NodeId) -> Input {
        Input {
            nodes: self.nodes,
            root,
        }
    }
}
