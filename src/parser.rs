//! Formula compiler and cell-reference token scanning.
//!
//! A formula body such as `(A1+2)*B3` is compiled into an [`ExprTree`] by
//! repeatedly splitting at the lowest-precedence top-level operator, so the
//! tree is built top-down without a separate tokenizer.

use std::collections::{BTreeSet, HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::spreadsheet::parse_cell_name;

/// Deepest nesting the compiler accepts before giving up.
pub const MAX_DEPTH: usize = 1024;

static REF_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z]+[0-9]+").expect("reference pattern is valid"));

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[A-Za-z]+[0-9]+|[0-9]+").expect("token pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// An operator with nothing on one side, e.g. `-5` or `3*-2`.
    #[error("operator is missing an operand")]
    EmptyOperand,
    #[error("expression is nested too deeply")]
    TooDeep,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    fn from_byte(byte: u8) -> Option<Op> {
        match byte {
            b'+' => Some(Op::Add),
            b'-' => Some(Op::Sub),
            b'*' => Some(Op::Mul),
            b'/' => Some(Op::Div),
            _ => None,
        }
    }

    fn apply(self, left: f64, right: f64) -> f64 {
        match self {
            Op::Add => left + right,
            Op::Sub => left - right,
            Op::Mul => left * right,
            Op::Div => left / right,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Constant(f64),
    /// Named input, looked up in the owning tree's environment.
    Variable(String),
    Operator {
        op: Op,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Compiled formula together with the values bound to its variables.
///
/// Every variable the compiler meets is registered in the environment with
/// value `0.0`; callers overwrite entries with [`ExprTree::set_var`] before
/// calling [`ExprTree::eval`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExprTree {
    root: Node,
    vars: HashMap<String, f64>,
}

impl ExprTree {
    /// Compile a formula body (the text after `=`). Whitespace is ignored.
    pub fn compile(expr: &str) -> Result<Self, CompileError> {
        let expr: String = expr.chars().filter(|c| !c.is_whitespace()).collect();
        let mut vars = HashMap::new();
        let root = compile_node(&expr, &mut vars, 0)?;
        Ok(Self { root, vars })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn set_var(&mut self, name: &str, value: f64) {
        self.vars.insert(name.to_string(), value);
    }

    pub fn var(&self, name: &str) -> Option<f64> {
        self.vars.get(name).copied()
    }

    /// Evaluate with IEEE semantics: dividing by zero gives `inf` or `NaN`.
    pub fn eval(&self) -> f64 {
        eval_node(&self.root, &self.vars)
    }

    /// Names of all variable nodes in the tree.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        collect_variables(&self.root, &mut names);
        names
    }
}

fn compile_node(
    expr: &str,
    vars: &mut HashMap<String, f64>,
    depth: usize,
) -> Result<Node, CompileError> {
    if depth > MAX_DEPTH {
        return Err(CompileError::TooDeep);
    }
    if expr.is_empty() {
        return Err(CompileError::EmptyOperand);
    }
    let bytes = expr.as_bytes();

    if is_wrapped(bytes) {
        return compile_node(&expr[1..expr.len() - 1], vars, depth + 1);
    }

    if let Some(index) = split_index(bytes) {
        if let Some(op) = Op::from_byte(bytes[index]) {
            let left = compile_node(&expr[..index], vars, depth + 1)?;
            let right = compile_node(&expr[index + 1..], vars, depth + 1)?;
            return Ok(Node::Operator {
                op,
                left: Box::new(left),
                right: Box::new(right),
            });
        }
    }

    Ok(compile_leaf(expr, vars))
}

fn compile_leaf(token: &str, vars: &mut HashMap<String, f64>) -> Node {
    let numeric = token.starts_with(|c: char| c.is_ascii_digit() || c == '.');
    if numeric {
        if let Ok(number) = token.parse::<f64>() {
            return Node::Constant(number);
        }
    }
    vars.insert(token.to_string(), 0.0);
    Node::Variable(token.to_string())
}

/// True when the opening parenthesis at index 0 is closed by the last byte,
/// so `(A+B)` is wrapped but `(A)+(B)` is not.
fn is_wrapped(bytes: &[u8]) -> bool {
    if bytes.first() != Some(&b'(') {
        return false;
    }
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return i == bytes.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

/// Index of the operator the expression should be split at, scanning from
/// the right: the rightmost top-level `+`/`-` wins, otherwise the rightmost
/// top-level `*`/`/`.
fn split_index(bytes: &[u8]) -> Option<usize> {
    let mut depth = 0i32;
    let mut fallback = None;
    for i in (0..bytes.len()).rev() {
        match bytes[i] {
            b')' => depth += 1,
            b'(' => depth -= 1,
            b'+' | b'-' if depth == 0 => return Some(i),
            b'*' | b'/' if depth == 0 && fallback.is_none() => fallback = Some(i),
            _ => {}
        }
    }
    fallback
}

fn eval_node(node: &Node, vars: &HashMap<String, f64>) -> f64 {
    match node {
        Node::Constant(value) => *value,
        Node::Variable(name) => vars.get(name).copied().unwrap_or(0.0),
        Node::Operator { op, left, right } => op.apply(eval_node(left, vars), eval_node(right, vars)),
    }
}

fn collect_variables(node: &Node, names: &mut BTreeSet<String>) {
    match node {
        Node::Constant(_) => {}
        Node::Variable(name) => {
            names.insert(name.clone());
        }
        Node::Operator { left, right, .. } => {
            collect_variables(left, names);
            collect_variables(right, names);
        }
    }
}

/// Token-level scanning of cell text.
pub struct Parser;

impl Parser {
    /// Every letters-then-digits token in `text`, upper-cased. Applied to raw
    /// cell text whether or not it is a formula.
    pub fn find_refs(text: &str) -> BTreeSet<String> {
        REF_PATTERN
            .find_iter(text)
            .map(|m| m.as_str().to_ascii_uppercase())
            .collect()
    }

    /// Checks that a formula body contains only references and numbers
    /// between its operators. Returns the references on success and `None`
    /// when some operand is an unknown name.
    pub fn check_refs(body: &str) -> Option<BTreeSet<String>> {
        let tokens: HashSet<&str> = TOKEN_PATTERN.find_iter(body).map(|m| m.as_str()).collect();
        let pieces: HashSet<&str> = body.split(['+', '-', '*', '/']).collect();
        if tokens.len() != pieces.len() {
            return None;
        }
        Some(Self::find_refs(body))
    }

    /// Parses `A1:C3` (or a single `B2`) into zero-based `(col, row)` corners,
    /// ordered so the first corner is the top-left one.
    pub fn parse_range(range: &str) -> Option<((usize, usize), (usize, usize))> {
        let range = range.trim();
        let (a, b) = match range.split_once(':') {
            Some((a, b)) => (a.trim(), b.trim()),
            None => (range, range),
        };
        let (c1, r1) = parse_cell_name(a)?;
        let (c2, r2) = parse_cell_name(b)?;
        Some(((c1.min(c2), r1.min(r2)), (c1.max(c2), r1.max(r2))))
    }
}
