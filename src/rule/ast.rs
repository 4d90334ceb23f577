//! Abstract Syntax Tree for rule expressions

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::ser::{Error as _, SerializeMap};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::Result;

/// Deepest logical nesting `Node` will serialize
///
/// Same-operator chains count as one level, so long `a AND b AND ...` rules
/// stay flat. Kept well under serde_json's recursion limit so anything
/// written by `to_json` can be read back by `from_json`.
pub const MAX_SERIALIZED_NESTING: usize = 60;

/// Input record a rule is evaluated against
pub type Record = HashMap<String, Value>;

/// Stand-in child swapped into nodes while a tree is torn down
static DETACHED: Lazy<Arc<Node>> =
    Lazy::new(|| Arc::new(Node::condition(String::new(), Operator::Equal, false)));

/// AST node for rule expressions
///
/// Nodes are immutable once built. Children sit behind `Arc` so that a
/// combined tree can reuse the subtrees of its inputs without copying them.
///
/// Walking, comparing, rendering and dropping a tree never recurse along a
/// chain of logical nodes, so rules with thousands of conditions are fine.
///
/// In JSON a logical node lists the operands of its whole left-leaning
/// same-operator chain: `a AND b AND c` is one object with three operands
/// rather than two nested ones.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "NodeRepr")]
pub enum Node {
    /// Leaf condition like "age > 30"
    Condition(Condition),
    /// AND / OR over two subtrees
    Logical {
        operator: LogicalOp,
        left: Arc<Node>,
        right: Arc<Node>,
    },
}

impl Node {
    pub fn condition(
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        Node::Condition(Condition {
            field: field.into(),
            operator,
            value: value.into(),
        })
    }

    pub fn logical(
        operator: LogicalOp,
        left: impl Into<Arc<Node>>,
        right: impl Into<Arc<Node>>,
    ) -> Self {
        Node::Logical {
            operator,
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn and(left: impl Into<Arc<Node>>, right: impl Into<Arc<Node>>) -> Self {
        Self::logical(LogicalOp::And, left, right)
    }

    pub fn or(left: impl Into<Arc<Node>>, right: impl Into<Arc<Node>>) -> Self {
        Self::logical(LogicalOp::Or, left, right)
    }

    /// Number of condition leaves in the tree
    pub fn condition_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Node::Condition(_) => count += 1,
                Node::Logical { left, right, .. } => {
                    stack.push(left.as_ref());
                    stack.push(right.as_ref());
                }
            }
        }
        count
    }

    /// Height of the tree, a single condition has depth 1
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 1)];
        while let Some((node, depth)) = stack.pop() {
            match node {
                Node::Condition(_) => max = max.max(depth),
                Node::Logical { left, right, .. } => {
                    stack.push((left.as_ref(), depth + 1));
                    stack.push((right.as_ref(), depth + 1));
                }
            }
        }
        max
    }

    /// Logical nesting with same-operator chains counted once
    ///
    /// A condition is 0, `a AND b AND c` is 1, `a AND (b OR c)` is 2.
    pub fn nesting(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 0)];
        while let Some((node, level)) = stack.pop() {
            match node {
                Node::Condition(_) => max = max.max(level),
                Node::Logical { operator, .. } => {
                    for operand in node.chain_operands(*operator) {
                        stack.push((operand, level + 1));
                    }
                }
            }
        }
        max
    }

    /// Operands of the left-leaning `operator` chain rooted here, in order
    ///
    /// `((a AND b) AND c)` yields `[a, b, c]`. A right child is never
    /// unfolded, which keeps `a AND (b AND c)` distinct.
    fn chain_operands(&self, operator: LogicalOp) -> Vec<&Node> {
        let mut operands = Vec::new();
        let mut current = self;
        loop {
            match current {
                Node::Logical {
                    operator: op,
                    left,
                    right,
                } if *op == operator => {
                    operands.push(right.as_ref());
                    current = left.as_ref();
                }
                _ => {
                    operands.push(current);
                    break;
                }
            }
        }
        operands.reverse();
        operands
    }

    /// Serialize to JSON, failing on trees nested past `MAX_SERIALIZED_NESTING`
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Node> {
        Ok(serde_json::from_str(json)?)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        let mut stack = vec![(self, other)];
        while let Some((a, b)) = stack.pop() {
            match (a, b) {
                (Node::Condition(x), Node::Condition(y)) => {
                    if x != y {
                        return false;
                    }
                }
                (
                    Node::Logical {
                        operator: op_a,
                        left: left_a,
                        right: right_a,
                    },
                    Node::Logical {
                        operator: op_b,
                        left: left_b,
                        right: right_b,
                    },
                ) => {
                    if op_a != op_b {
                        return false;
                    }
                    if !Arc::ptr_eq(left_a, left_b) {
                        stack.push((left_a.as_ref(), left_b.as_ref()));
                    }
                    if !Arc::ptr_eq(right_a, right_b) {
                        stack.push((right_a.as_ref(), right_b.as_ref()));
                    }
                }
                _ => return false,
            }
        }
        true
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        let Node::Logical { left, right, .. } = self else {
            return;
        };
        let mut pending = vec![detach(left), detach(right)];
        while let Some(child) = pending.pop() {
            // Only the last owner unpacks a child, shared subtrees stay alive
            if let Some(mut node) = Arc::into_inner(child) {
                if let Node::Logical { left, right, .. } = &mut node {
                    pending.push(detach(left));
                    pending.push(detach(right));
                }
            }
        }
    }
}

fn detach(child: &mut Arc<Node>) -> Arc<Node> {
    std::mem::replace(child, Arc::clone(&DETACHED))
}

/// Renders the canonical rule string
///
/// Every logical chain is wrapped in parentheses and re-parses to an equal
/// tree. A string literal is quoted with `'`, or with `"` when it contains
/// a `'`. The lexer has no escapes, so a string holding both quote
/// characters renders to text that does not re-parse.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        enum Piece<'a> {
            Tree(&'a Node),
            Operator(LogicalOp),
            Close,
        }

        let mut stack = vec![Piece::Tree(self)];
        while let Some(piece) = stack.pop() {
            match piece {
                Piece::Tree(node) => match node {
                    Node::Condition(cond) => write!(f, "{}", cond)?,
                    Node::Logical { operator, .. } => {
                        f.write_str("(")?;
                        stack.push(Piece::Close);
                        let operands = node.chain_operands(*operator);
                        for (i, operand) in operands.into_iter().enumerate().rev() {
                            stack.push(Piece::Tree(operand));
                            if i > 0 {
                                stack.push(Piece::Operator(*operator));
                            }
                        }
                    }
                },
                Piece::Operator(operator) => write!(f, " {} ", operator)?,
                Piece::Close => f.write_str(")")?,
            }
        }
        Ok(())
    }
}

/// Wire shape of a node
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum NodeRepr {
    Condition(Condition),
    Logical {
        operator: LogicalOp,
        operands: Vec<NodeRepr>,
    },
}

impl TryFrom<NodeRepr> for Node {
    type Error = String;

    fn try_from(repr: NodeRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            NodeRepr::Condition(cond) => Ok(Node::Condition(cond)),
            NodeRepr::Logical { operator, operands } => {
                if operands.len() < 2 {
                    return Err(format!(
                        "logical node needs at least 2 operands, got {}",
                        operands.len()
                    ));
                }
                let mut node: Option<Node> = None;
                for operand in operands {
                    let operand = Node::try_from(operand)?;
                    node = Some(match node {
                        Some(left) => Node::logical(operator, left, operand),
                        None => operand,
                    });
                }
                node.ok_or_else(|| "logical node without operands".to_string())
            }
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let nesting = self.nesting();
        if nesting > MAX_SERIALIZED_NESTING {
            return Err(S::Error::custom(format!(
                "rule nesting {} exceeds the serializable maximum of {}",
                nesting, MAX_SERIALIZED_NESTING
            )));
        }
        Wire(self).serialize(serializer)
    }
}

/// Serializes a node already checked against `MAX_SERIALIZED_NESTING`
struct Wire<'a>(&'a Node);

impl Serialize for Wire<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            Node::Condition(cond) => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("type", "condition")?;
                map.serialize_entry("field", &cond.field)?;
                map.serialize_entry("operator", &cond.operator)?;
                map.serialize_entry("value", &cond.value)?;
                map.end()
            }
            Node::Logical { operator, .. } => {
                let operands: Vec<Wire<'_>> = self
                    .0
                    .chain_operands(*operator)
                    .into_iter()
                    .map(Wire)
                    .collect();
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("type", "logical")?;
                map.serialize_entry("operator", operator)?;
                map.serialize_entry("operands", &operands)?;
                map.end()
            }
        }
    }
}

/// Single condition expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator, self.value)
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    /// Greater than (>)
    #[serde(rename = ">")]
    Greater,
    /// Less than (<)
    #[serde(rename = "<")]
    Less,
    /// Greater than or equal (>=)
    #[serde(rename = ">=")]
    GreaterEqual,
    /// Less than or equal (<=)
    #[serde(rename = "<=")]
    LessEqual,
    /// Equal (=)
    #[serde(rename = "=")]
    Equal,
    /// Not equal (!=)
    #[serde(rename = "!=")]
    NotEqual,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Greater => ">",
            Operator::Less => "<",
            Operator::GreaterEqual => ">=",
            Operator::LessEqual => "<=",
            Operator::Equal => "=",
            Operator::NotEqual => "!=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Operator> {
        match symbol {
            ">" => Some(Operator::Greater),
            "<" => Some(Operator::Less),
            ">=" => Some(Operator::GreaterEqual),
            "<=" => Some(Operator::LessEqual),
            "=" => Some(Operator::Equal),
            "!=" => Some(Operator::NotEqual),
            _ => None,
        }
    }

    /// Whether the operator only makes sense on numbers
    pub fn is_ordering(self) -> bool {
        !matches!(self, Operator::Equal | Operator::NotEqual)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Logical connectives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LogicalOp {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl LogicalOp {
    pub fn keyword(self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<LogicalOp> {
        match keyword {
            "AND" => Some(LogicalOp::And),
            "OR" => Some(LogicalOp::Or),
            _ => None,
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Literal and record value types
///
/// Serialized untagged so JSON numbers, strings and booleans map straight
/// onto the matching variant. Variant order matters for deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write_float(f, *x),
            Value::String(s) if s.contains('\'') => write!(f, "\"{}\"", s),
            Value::String(s) => write!(f, "'{}'", s),
        }
    }
}

/// Plain decimal notation, never an exponent, always with a fractional part
/// so the literal lexes back as the same float
fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    let text = x.to_string();
    if x.is_finite() && !text.contains('.') {
        write!(f, "{}.0", text)
    } else {
        f.write_str(&text)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}
