//! Typed JavaScript syntax tree.
//!
//! The tree-sitter concrete syntax tree is lowered into a small closed set of
//! node kinds. Only the shapes the extractor matches on get their own
//! variant; every other named syntax node becomes [`Node::Other`].

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tree_sitter::{Node as TsNode, Tree};

/// Subtrees nested deeper than this are flattened to their leaves.
pub const MAX_LOWERING_DEPTH: usize = 256;

/// How many syntax nodes are lowered between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 4096;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Node {
    Program {
        body: Vec<Node>,
    },
    CallExpression {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    MemberExpression {
        object: Box<Node>,
        property: Box<Node>,
        computed: bool,
    },
    Identifier {
        name: String,
    },
    Literal {
        value: LiteralValue,
    },
    TemplateLiteral {
        quasis: Vec<String>,
        expressions: Vec<Node>,
    },
    Other {
        kind: String,
        children: Vec<Node>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LiteralValue {
    String(String),
    Number(f64),
    Boolean(bool),
    Null,
    Regex(String),
}

impl Node {
    /// A valid program with no statements.
    pub fn empty_program() -> Self {
        Node::Program { body: Vec::new() }
    }

    pub fn is_empty_program(&self) -> bool {
        matches!(self, Node::Program { body } if body.is_empty())
    }

    pub fn identifier_name(&self) -> Option<&str> {
        match self {
            Node::Identifier { name } => Some(name),
            _ => None,
        }
    }

    /// The value of a string literal node.
    pub fn string_value(&self) -> Option<&str> {
        match self {
            Node::Literal {
                value: LiteralValue::String(value),
            } => Some(value),
            _ => None,
        }
    }

    fn push_children<'a>(&'a self, queue: &mut VecDeque<&'a Node>) {
        match self {
            Node::Program { body } => queue.extend(body),
            Node::CallExpression { callee, arguments } => {
                queue.push_back(callee);
                queue.extend(arguments);
            }
            Node::MemberExpression {
                object, property, ..
            } => {
                queue.push_back(object);
                queue.push_back(property);
            }
            Node::TemplateLiteral { expressions, .. } => queue.extend(expressions),
            Node::Other { children, .. } => queue.extend(children),
            Node::Identifier { .. } | Node::Literal { .. } => {}
        }
    }

    /// Visits this node and all descendants level by level.
    pub fn breadth_first(&self) -> BreadthFirst<'_> {
        BreadthFirst {
            queue: VecDeque::from([self]),
        }
    }
}

/// Worklist-driven breadth-first traversal; never recurses.
pub struct BreadthFirst<'a> {
    queue: VecDeque<&'a Node>,
}

impl<'a> Iterator for BreadthFirst<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;
        node.push_children(&mut self.queue);
        Some(node)
    }
}

fn node_text<'s>(node: TsNode<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

fn is_skipped(node: TsNode<'_>) -> bool {
    matches!(node.kind(), "comment" | "html_comment")
}

fn named_children<'t>(node: TsNode<'t>) -> Vec<TsNode<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| !is_skipped(*child))
        .collect()
}

fn decode_escape(escape: &str) -> String {
    let mut chars = escape.chars();
    if chars.next() != Some('\\') {
        return escape.to_string();
    }
    let Some(marker) = chars.next() else {
        return String::new();
    };
    let rest: String = chars.collect();

    match marker {
        'n' => "\n".to_string(),
        't' => "\t".to_string(),
        'r' => "\r".to_string(),
        'b' => "\u{8}".to_string(),
        'f' => "\u{c}".to_string(),
        'v' => "\u{b}".to_string(),
        '0' if rest.is_empty() => "\0".to_string(),
        '\n' | '\r' | '\u{2028}' | '\u{2029}' => String::new(),
        'x' | 'u' => {
            let hex = rest.trim_start_matches('{').trim_end_matches('}');
            u32::from_str_radix(hex, 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_default()
        }
        other => format!("{other}{rest}"),
    }
}

/// Concatenated, unescaped content of a quoted string node.
fn string_literal_value(node: TsNode<'_>, source: &str) -> String {
    let mut value = String::new();
    for child in named_children(node) {
        match child.kind() {
            "escape_sequence" => value.push_str(&decode_escape(node_text(child, source))),
            _ => value.push_str(node_text(child, source)),
        }
    }
    value
}

/// Lowers nodes that never need a frame of their own.
fn lower_leaf(node: TsNode<'_>, source: &str) -> Option<Node> {
    let text = || node_text(node, source).to_string();
    let lowered = match node.kind() {
        "identifier"
        | "property_identifier"
        | "private_property_identifier"
        | "shorthand_property_identifier"
        | "shorthand_property_identifier_pattern" => Node::Identifier { name: text() },
        "string" => Node::Literal {
            value: LiteralValue::String(string_literal_value(node, source)),
        },
        "number" => Node::Literal {
            value: LiteralValue::Number(
                node_text(node, source)
                    .replace('_', "")
                    .parse::<f64>()
                    .unwrap_or(f64::NAN),
            ),
        },
        "true" => Node::Literal {
            value: LiteralValue::Boolean(true),
        },
        "false" => Node::Literal {
            value: LiteralValue::Boolean(false),
        },
        "null" => Node::Literal {
            value: LiteralValue::Null,
        },
        "regex" => Node::Literal {
            value: LiteralValue::Regex(text()),
        },
        "string_fragment" => Node::Literal {
            value: LiteralValue::String(text()),
        },
        "escape_sequence" => Node::Literal {
            value: LiteralValue::String(decode_escape(node_text(node, source))),
        },
        _ if node.named_child_count() == 0 => Node::Other {
            kind: node.kind().to_string(),
            children: Vec::new(),
        },
        _ => return None,
    };
    Some(lowered)
}

/// Lowers a subtree too deep to keep structurally: its leaves are kept in
/// document order under a single `Other` node.
fn lower_flattened(node: TsNode<'_>, source: &str) -> Node {
    let mut leaves = Vec::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if let Some(leaf) = lower_leaf(current, source) {
            leaves.push(leaf);
            continue;
        }
        let mut children = named_children(current);
        children.reverse();
        stack.extend(children);
    }
    Node::Other {
        kind: node.kind().to_string(),
        children: leaves,
    }
}

fn take_field(lowered: &mut Vec<(usize, Node)>, field_id: Option<usize>) -> Option<Node> {
    let field_id = field_id?;
    let position = lowered.iter().position(|(id, _)| *id == field_id)?;
    Some(lowered.remove(position).1)
}

fn placeholder(kind: &str) -> Node {
    Node::Other {
        kind: kind.to_string(),
        children: Vec::new(),
    }
}

fn build_template(lowered: Vec<(usize, Node)>) -> Node {
    let mut quasis = Vec::new();
    let mut expressions = Vec::new();
    let mut current = String::new();

    for (_, node) in lowered {
        match node {
            Node::Literal {
                value: LiteralValue::String(part),
            } => current.push_str(&part),
            Node::Other { kind, children } if kind == "template_substitution" => {
                quasis.push(std::mem::take(&mut current));
                expressions.extend(children);
            }
            other => expressions.push(other),
        }
    }
    quasis.push(current);

    Node::TemplateLiteral {
        quasis,
        expressions,
    }
}

fn build_node(node: TsNode<'_>, mut lowered: Vec<(usize, Node)>) -> Node {
    let field = |name: &str| node.child_by_field_name(name).map(|child| child.id());

    match node.kind() {
        "program" => Node::Program {
            body: lowered.into_iter().map(|(_, child)| child).collect(),
        },
        "call_expression" => {
            let callee_id = field("function");
            let arguments_id = field("arguments");
            let callee = take_field(&mut lowered, callee_id).unwrap_or_else(|| placeholder("callee"));
            let arguments = match take_field(&mut lowered, arguments_id) {
                Some(Node::Other { kind, children }) if kind == "arguments" => children,
                Some(other) => vec![other],
                None => Vec::new(),
            };
            Node::CallExpression {
                callee: Box::new(callee),
                arguments,
            }
        }
        "member_expression" | "subscript_expression" => {
            let computed = node.kind() == "subscript_expression";
            let object_id = field("object");
            let property_id = if computed { field("index") } else { field("property") };
            let object = take_field(&mut lowered, object_id).unwrap_or_else(|| placeholder("object"));
            let property =
                take_field(&mut lowered, property_id).unwrap_or_else(|| placeholder("property"));
            Node::MemberExpression {
                object: Box::new(object),
                property: Box::new(property),
                computed,
            }
        }
        "template_string" => build_template(lowered),
        kind => Node::Other {
            kind: kind.to_string(),
            children: lowered.into_iter().map(|(_, child)| child).collect(),
        },
    }
}

struct Frame<'t> {
    node: TsNode<'t>,
    children: Vec<TsNode<'t>>,
    next: usize,
    lowered: Vec<(usize, Node)>,
}

impl<'t> Frame<'t> {
    fn new(node: TsNode<'t>) -> Self {
        Self {
            node,
            children: named_children(node),
            next: 0,
            lowered: Vec::new(),
        }
    }
}

/// Lowers a parsed tree into the typed AST using an explicit stack.
///
/// Returns `None` if `cancel` is raised while lowering.
pub fn lower_tree(tree: &Tree, source: &str, cancel: &AtomicBool) -> Option<Node> {
    let root = tree.root_node();
    let mut stack = vec![Frame::new(root)];
    let mut visited = 0usize;

    loop {
        visited += 1;
        if visited % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
            return None;
        }

        let depth = stack.len();
        let frame = stack.last_mut()?;

        if frame.next < frame.children.len() {
            let child = frame.children[frame.next];
            frame.next += 1;

            if let Some(leaf) = lower_leaf(child, source) {
                frame.lowered.push((child.id(), leaf));
            } else if depth >= MAX_LOWERING_DEPTH {
                frame.lowered.push((child.id(), lower_flattened(child, source)));
            } else {
                stack.push(Frame::new(child));
            }
            continue;
        }

        let finished = stack.pop()?;
        let id = finished.node.id();
        let built = build_node(finished.node, finished.lowered);
        match stack.last_mut() {
            Some(parent) => parent.lowered.push((id, built)),
            None => return Some(built),
        }
    }
}
