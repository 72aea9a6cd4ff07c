// tau-parser - Abstract syntax tree for tau
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The tau abstract syntax tree.
//!
//! Nodes that can fail at compile or run time carry the byte offset of the
//! token that produced them, so diagnostics can point at the source.

use std::fmt;

/// Byte offset into the source text.
pub type Pos = usize;

/// Prefix (unary) operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Minus,
    Bang,
    BwNot,
}

/// Infix (binary) operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BwAnd,
    BwOr,
    BwXor,
    Shl,
    Shr,
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
}

impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrefixOp::Minus => "-",
            PrefixOp::Bang => "!",
            PrefixOp::BwNot => "~",
        })
    }
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InfixOp::Add => "+",
            InfixOp::Sub => "-",
            InfixOp::Mul => "*",
            InfixOp::Div => "/",
            InfixOp::Mod => "%",
            InfixOp::BwAnd => "&",
            InfixOp::BwOr => "|",
            InfixOp::BwXor => "^",
            InfixOp::Shl => "<<",
            InfixOp::Shr => ">>",
            InfixOp::And => "&&",
            InfixOp::Or => "||",
            InfixOp::Eq => "==",
            InfixOp::NotEq => "!=",
            InfixOp::Lt => "<",
            InfixOp::LtEq => "<=",
            InfixOp::Gt => ">",
            InfixOp::GtEq => ">=",
            InfixOp::In => "in",
        })
    }
}

/// A sequence of statements.
pub type Block = Vec<Node>;

/// A tau AST node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Int(i64),
    Float(f64),
    /// A double-quoted string. May contain `{expr}` interpolation segments.
    Str {
        value: String,
        pos: Pos,
    },
    /// A backtick string, taken verbatim.
    RawStr(String),
    Bool(bool),
    Null,
    Ident {
        name: String,
        pos: Pos,
    },
    List(Vec<Node>),
    Map {
        pairs: Vec<(Node, Node)>,
        pos: Pos,
    },
    Prefix {
        op: PrefixOp,
        operand: Box<Node>,
        pos: Pos,
    },
    Infix {
        op: InfixOp,
        left: Box<Node>,
        right: Box<Node>,
        pos: Pos,
    },
    /// `target = value`
    Assign {
        target: Box<Node>,
        value: Box<Node>,
        pos: Pos,
    },
    /// `target op= value`
    CompoundAssign {
        op: InfixOp,
        target: Box<Node>,
        value: Box<Node>,
        pos: Pos,
    },
    /// `++target` / `--target`. `delta` is +1 or -1.
    Step {
        delta: i64,
        target: Box<Node>,
        pos: Pos,
    },
    Block(Block),
    If {
        cond: Box<Node>,
        body: Block,
        /// Either a `Block` or a chained `If`.
        alt: Option<Box<Node>>,
        pos: Pos,
    },
    For {
        init: Option<Box<Node>>,
        cond: Box<Node>,
        post: Option<Box<Node>>,
        body: Block,
        pos: Pos,
    },
    Function {
        name: Option<String>,
        params: Vec<String>,
        body: Block,
        pos: Pos,
    },
    Call {
        func: Box<Node>,
        args: Vec<Node>,
        pos: Pos,
    },
    /// `tau f(args)`
    ConcurrentCall {
        func: Box<Node>,
        args: Vec<Node>,
        pos: Pos,
    },
    Index {
        left: Box<Node>,
        index: Box<Node>,
        pos: Pos,
    },
    /// `left.name`
    Dot {
        left: Box<Node>,
        name: String,
        pos: Pos,
    },
    Return {
        value: Box<Node>,
        pos: Pos,
    },
    Break {
        pos: Pos,
    },
    Continue {
        pos: Pos,
    },
    Import {
        path: Box<Node>,
        pos: Pos,
    },
}

impl Node {
    /// Byte offset of the node, if it carries one.
    pub fn pos(&self) -> Option<Pos> {
        match self {
            Node::Str { pos, .. }
            | Node::Ident { pos, .. }
            | Node::Map { pos, .. }
            | Node::Prefix { pos, .. }
            | Node::Infix { pos, .. }
            | Node::Assign { pos, .. }
            | Node::CompoundAssign { pos, .. }
            | Node::Step { pos, .. }
            | Node::If { pos, .. }
            | Node::For { pos, .. }
            | Node::Function { pos, .. }
            | Node::Call { pos, .. }
            | Node::ConcurrentCall { pos, .. }
            | Node::Index { pos, .. }
            | Node::Dot { pos, .. }
            | Node::Return { pos, .. }
            | Node::Break { pos }
            | Node::Continue { pos }
            | Node::Import { pos, .. } => Some(*pos),
            _ => None,
        }
    }

    /// True when the node is built only from literals and operators, so its
    /// value can be computed at compile time.
    ///
    /// Strings containing braces are excluded: they interpolate at run time.
    pub fn is_const_expression(&self) -> bool {
        match self {
            Node::Int(_) | Node::Float(_) | Node::RawStr(_) | Node::Bool(_) | Node::Null => true,
            Node::Str { value, .. } => !value.contains(['{', '}']),
            Node::Prefix { operand, .. } => operand.is_const_expression(),
            Node::Infix { left, right, .. } => {
                left.is_const_expression() && right.is_const_expression()
            }
            _ => false,
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T], sep: &str) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_block(f: &mut fmt::Formatter<'_>, block: &[Node]) -> fmt::Result {
    f.write_str("{ ")?;
    write_list(f, block, "; ")?;
    f.write_str(" }")
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Int(n) => write!(f, "{}", n),
            Node::Float(n) => write!(f, "{:?}", n),
            Node::Str { value, .. } => write!(f, "{:?}", value),
            Node::RawStr(s) => write!(f, "`{}`", s),
            Node::Bool(b) => write!(f, "{}", b),
            Node::Null => f.write_str("null"),
            Node::Ident { name, .. } => f.write_str(name),
            Node::List(items) => {
                f.write_str("[")?;
                write_list(f, items, ", ")?;
                f.write_str("]")
            }
            Node::Map { pairs, .. } => {
                f.write_str("{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
            Node::Prefix { op, operand, .. } => write!(f, "({}{})", op, operand),
            Node::Infix {
                op, left, right, ..
            } => write!(f, "({} {} {})", left, op, right),
            Node::Assign { target, value, .. } => write!(f, "{} = {}", target, value),
            Node::CompoundAssign {
                op, target, value, ..
            } => write!(f, "{} {}= {}", target, op, value),
            Node::Step { delta, target, .. } => {
                write!(f, "{}{}", if *delta > 0 { "++" } else { "--" }, target)
            }
            Node::Block(block) => write_block(f, block),
            Node::If {
                cond, body, alt, ..
            } => {
                write!(f, "if {} ", cond)?;
                write_block(f, body)?;
                if let Some(alt) = alt {
                    write!(f, " else {}", alt)?;
                }
                Ok(())
            }
            Node::For {
                init,
                cond,
                post,
                body,
                ..
            } => {
                f.write_str("for ")?;
                match (init, post) {
                    (Some(init), Some(post)) => write!(f, "{}; {}; {} ", init, cond, post)?,
                    _ => write!(f, "{} ", cond)?,
                }
                write_block(f, body)
            }
            Node::Function { params, body, .. } => {
                f.write_str("fn(")?;
                write_list(f, params, ", ")?;
                f.write_str(") ")?;
                write_block(f, body)
            }
            Node::Call { func, args, .. } => {
                write!(f, "{}(", func)?;
                write_list(f, args, ", ")?;
                f.write_str(")")
            }
            Node::ConcurrentCall { func, args, .. } => {
                write!(f, "tau {}(", func)?;
                write_list(f, args, ", ")?;
                f.write_str(")")
            }
            Node::Index { left, index, .. } => write!(f, "({}[{}])", left, index),
            Node::Dot { left, name, .. } => write!(f, "{}.{}", left, name),
            Node::Return { value, .. } => write!(f, "return {}", value),
            Node::Break { .. } => f.write_str("break"),
            Node::Continue { .. } => f.write_str("continue"),
            Node::Import { path, .. } => write!(f, "import({})", path),
        }
    }
}
