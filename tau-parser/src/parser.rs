// tau-parser - Parser for tau
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Pratt parser for tau.
//!
//! A program is a sequence of statements separated by newlines or `;`.
//! Almost everything is an expression: `if` and `for` produce values, and
//! assignment yields the assigned value. `return` is the only
//! statement-level form.

use std::fmt;

use thiserror::Error;

use crate::ast::{Block, InfixOp, Node, Pos, PrefixOp};
use crate::lexer::{Lexer, LexerError, Spanned, Token};
use crate::source;

/// A single parse error, anchored to a source position.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{rendered}")]
pub struct ParseError {
    pub message: String,
    pub pos: usize,
    pub line: usize,
    pub column: usize,
    rendered: String,
}

impl ParseError {
    fn new(file: Option<&str>, src: &str, pos: usize, message: String) -> Self {
        let loc = source::locate(src, pos);
        ParseError {
            rendered: source::render(file, src, pos, &message),
            message,
            pos,
            line: loc.lineno,
            column: loc.column,
        }
    }
}

/// Every error collected while parsing one unit.
#[derive(Debug, Clone, PartialEq, Error)]
pub struct ParseErrors(pub Vec<ParseError>);

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", e)?;
        }
        Ok(())
    }
}

/// Binding power of infix operators, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Assignment,
    LogicalOr,
    LogicalAnd,
    BitwiseOr,
    BitwiseXor,
    BitwiseAnd,
    Equality,
    Relational,
    Shift,
    Additive,
    Multiplicative,
    Prefix,
    Call,
    Index,
    Dot,
}

fn precedence_of(token: &Token) -> Precedence {
    match token {
        Token::Assign
        | Token::PlusAssign
        | Token::MinusAssign
        | Token::AsteriskAssign
        | Token::SlashAssign
        | Token::ModulusAssign
        | Token::BwAndAssign
        | Token::BwOrAssign
        | Token::BwXorAssign
        | Token::LShiftAssign
        | Token::RShiftAssign => Precedence::Assignment,
        Token::Or => Precedence::LogicalOr,
        Token::And => Precedence::LogicalAnd,
        Token::BwOr => Precedence::BitwiseOr,
        Token::BwXor => Precedence::BitwiseXor,
        Token::BwAnd => Precedence::BitwiseAnd,
        Token::Equals | Token::NotEquals => Precedence::Equality,
        Token::Lt | Token::Gt | Token::LtEq | Token::GtEq | Token::In => Precedence::Relational,
        Token::LShift | Token::RShift => Precedence::Shift,
        Token::Plus | Token::Minus => Precedence::Additive,
        Token::Asterisk | Token::Slash | Token::Modulus => Precedence::Multiplicative,
        Token::LParen => Precedence::Call,
        Token::LBracket => Precedence::Index,
        Token::Dot => Precedence::Dot,
        _ => Precedence::Lowest,
    }
}

fn binary_op(token: &Token) -> Option<InfixOp> {
    let op = match token {
        Token::Plus => InfixOp::Add,
        Token::Minus => InfixOp::Sub,
        Token::Asterisk => InfixOp::Mul,
        Token::Slash => InfixOp::Div,
        Token::Modulus => InfixOp::Mod,
        Token::BwAnd => InfixOp::BwAnd,
        Token::BwOr => InfixOp::BwOr,
        Token::BwXor => InfixOp::BwXor,
        Token::LShift => InfixOp::Shl,
        Token::RShift => InfixOp::Shr,
        Token::And => InfixOp::And,
        Token::Or => InfixOp::Or,
        Token::Equals => InfixOp::Eq,
        Token::NotEquals => InfixOp::NotEq,
        Token::Lt => InfixOp::Lt,
        Token::LtEq => InfixOp::LtEq,
        Token::Gt => InfixOp::Gt,
        Token::GtEq => InfixOp::GtEq,
        Token::In => InfixOp::In,
        _ => return None,
    };
    Some(op)
}

fn compound_op(token: &Token) -> Option<InfixOp> {
    let op = match token {
        Token::PlusAssign => InfixOp::Add,
        Token::MinusAssign => InfixOp::Sub,
        Token::AsteriskAssign => InfixOp::Mul,
        Token::SlashAssign => InfixOp::Div,
        Token::ModulusAssign => InfixOp::Mod,
        Token::BwAndAssign => InfixOp::BwAnd,
        Token::BwOrAssign => InfixOp::BwOr,
        Token::BwXorAssign => InfixOp::BwXor,
        Token::LShiftAssign => InfixOp::Shl,
        Token::RShiftAssign => InfixOp::Shr,
        _ => return None,
    };
    Some(op)
}

/// Internal result: errors carry a position and message, and are rendered
/// once they reach the top level.
type PResult<T> = std::result::Result<T, (Pos, String)>;

/// The parser converts tokens into AST nodes.
pub struct Parser<'a> {
    file: Option<&'a str>,
    source: &'a str,
    tokens: Vec<Spanned>,
    idx: usize,
    loop_depth: usize,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    /// Create a new parser. Fails if the source cannot be tokenised.
    pub fn new(file: Option<&'a str>, source: &'a str) -> Result<Self, ParseError> {
        let tokens = Lexer::new(source)
            .tokenize()
            .map_err(|LexerError { message, pos }| ParseError::new(file, source, pos, message))?;
        Ok(Parser {
            file,
            source,
            tokens,
            idx: 0,
            loop_depth: 0,
            errors: Vec::new(),
        })
    }

    /// Parse the whole input as a program.
    pub fn parse_program(mut self) -> Result<Block, ParseErrors> {
        let mut program = Vec::new();

        loop {
            self.skip_semicolons();
            if self.at(&Token::Eof) {
                break;
            }
            match self.parse_top_statement() {
                Ok(stmt) => program.push(stmt),
                Err((pos, message)) => {
                    self.errors
                        .push(ParseError::new(self.file, self.source, pos, message));
                    self.synchronize();
                }
            }
        }

        if self.errors.is_empty() {
            Ok(program)
        } else {
            Err(ParseErrors(self.errors))
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn parse_statement(&mut self) -> PResult<Node> {
        if self.at(&Token::Return) {
            let pos = self.advance().pos;
            let value = if matches!(self.cur(), Token::Semicolon | Token::RBrace | Token::Eof) {
                Node::Null
            } else {
                self.parse_expr(Precedence::Lowest)?
            };
            return Ok(Node::Return {
                value: Box::new(value),
                pos,
            });
        }
        self.parse_expr(Precedence::Lowest)
    }

    fn parse_top_statement(&mut self) -> PResult<Node> {
        let stmt = self.parse_statement()?;
        self.end_statement()?;
        Ok(stmt)
    }

    fn end_statement(&mut self) -> PResult<()> {
        match self.cur() {
            Token::Semicolon => {
                self.advance();
                Ok(())
            }
            Token::RBrace | Token::Eof => Ok(()),
            other => Err((
                self.pos(),
                format!("unexpected {} after end of statement", other),
            )),
        }
    }

    fn parse_block(&mut self) -> PResult<Block> {
        self.expect(Token::LBrace)?;
        let mut block = Vec::new();
        loop {
            self.skip_semicolons();
            match self.cur() {
                Token::RBrace => {
                    self.advance();
                    return Ok(block);
                }
                Token::Eof => return Err((self.pos(), "expected }, got EOF".into())),
                _ => {
                    block.push(self.parse_statement()?);
                    self.end_statement()?;
                }
            }
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn parse_expr(&mut self, precedence: Precedence) -> PResult<Node> {
        let mut left = self.parse_prefix()?;
        while precedence < precedence_of(self.cur()) {
            left = self.parse_infix(left)?;
        }
        Ok(left)
    }

    fn parse_prefix(&mut self) -> PResult<Node> {
        let Spanned { token, pos } = self.advance();
        let node = match token {
            Token::Ident(name) => Node::Ident { name, pos },
            Token::Int(n) => Node::Int(n),
            Token::Float(n) => Node::Float(n),
            Token::Str(value) => Node::Str { value, pos },
            Token::RawStr(s) => Node::RawStr(s),
            Token::True => Node::Bool(true),
            Token::False => Node::Bool(false),
            Token::Null => Node::Null,
            Token::Minus => self.parse_prefix_op(PrefixOp::Minus, pos)?,
            Token::Bang => self.parse_prefix_op(PrefixOp::Bang, pos)?,
            Token::BwNot => self.parse_prefix_op(PrefixOp::BwNot, pos)?,
            Token::PlusPlus => self.parse_step(1, pos)?,
            Token::MinusMinus => self.parse_step(-1, pos)?,
            Token::LParen => {
                let inner = self.parse_expr(Precedence::Lowest)?;
                self.expect(Token::RParen)?;
                inner
            }
            Token::LBracket => Node::List(self.parse_expr_list(Token::RBracket)?),
            Token::LBrace => self.parse_map(pos)?,
            Token::If => self.parse_if(pos)?,
            Token::For => self.parse_for(pos)?,
            Token::Function => self.parse_function(pos)?,
            Token::Import => {
                self.expect(Token::LParen)?;
                let mut args = self.parse_expr_list(Token::RParen)?;
                if args.len() != 1 {
                    return Err((
                        pos,
                        format!(
                            "import: expected exactly 1 argument but {} provided",
                            args.len()
                        ),
                    ));
                }
                Node::Import {
                    path: Box::new(args.remove(0)),
                    pos,
                }
            }
            Token::Tau => match self.parse_expr(Precedence::Lowest)? {
                Node::Call { func, args, pos } => Node::ConcurrentCall { func, args, pos },
                _ => return Err((pos, "expected function call after tau".into())),
            },
            Token::Break => {
                if self.loop_depth == 0 {
                    return Err((pos, "break statement not inside \"for\" block".into()));
                }
                Node::Break { pos }
            }
            Token::Continue => {
                if self.loop_depth == 0 {
                    return Err((pos, "continue statement not inside \"for\" block".into()));
                }
                Node::Continue { pos }
            }
            other => return Err((pos, format!("unexpected {}", other))),
        };
        Ok(node)
    }

    fn parse_prefix_op(&mut self, op: PrefixOp, pos: Pos) -> PResult<Node> {
        let operand = self.parse_expr(Precedence::Prefix)?;
        Ok(Node::Prefix {
            op,
            operand: Box::new(operand),
            pos,
        })
    }

    fn parse_step(&mut self, delta: i64, pos: Pos) -> PResult<Node> {
        let target = self.parse_expr(Precedence::Prefix)?;
        Ok(Node::Step {
            delta,
            target: Box::new(target),
            pos,
        })
    }

    fn parse_infix(&mut self, left: Node) -> PResult<Node> {
        let Spanned { token, pos } = self.advance();

        if let Some(op) = binary_op(&token) {
            let right = self.parse_expr(precedence_of(&token))?;
            return Ok(Node::Infix {
                op,
                left: Box::new(left),
                right: Box::new(right),
                pos,
            });
        }

        if let Some(op) = compound_op(&token) {
            let value = self.parse_expr(Precedence::Lowest)?;
            return Ok(Node::CompoundAssign {
                op,
                target: Box::new(left),
                value: Box::new(value),
                pos,
            });
        }

        match token {
            Token::Assign => {
                let mut value = self.parse_expr(Precedence::Lowest)?;
                if let (Node::Ident { name, .. }, Node::Function { name: fn_name, .. }) =
                    (&left, &mut value)
                {
                    *fn_name = Some(name.clone());
                }
                Ok(Node::Assign {
                    target: Box::new(left),
                    value: Box::new(value),
                    pos,
                })
            }
            Token::LParen => {
                let args = self.parse_expr_list(Token::RParen)?;
                Ok(Node::Call {
                    func: Box::new(left),
                    args,
                    pos,
                })
            }
            Token::LBracket => {
                let index = self.parse_expr(Precedence::Lowest)?;
                self.expect(Token::RBracket)?;
                Ok(Node::Index {
                    left: Box::new(left),
                    index: Box::new(index),
                    pos,
                })
            }
            Token::Dot => match self.advance() {
                Spanned {
                    token: Token::Ident(name),
                    ..
                } => Ok(Node::Dot {
                    left: Box::new(left),
                    name,
                    pos,
                }),
                Spanned { token, pos } => Err((
                    pos,
                    format!("expected identifier with dot operator, got {}", token),
                )),
            },
            other => Err((pos, format!("unexpected {}", other))),
        }
    }

    fn parse_if(&mut self, pos: Pos) -> PResult<Node> {
        let cond = self.parse_expr(Precedence::Lowest)?;
        let body = self.parse_block()?;

        if self.at(&Token::Semicolon) && self.peek() == &Token::Else {
            self.advance();
        }

        let alt = if self.at(&Token::Else) {
            self.advance();
            if self.at(&Token::If) {
                let if_pos = self.advance().pos;
                Some(Box::new(self.parse_if(if_pos)?))
            } else {
                Some(Box::new(Node::Block(self.parse_block()?)))
            }
        } else {
            None
        };

        Ok(Node::If {
            cond: Box::new(cond),
            body,
            alt,
            pos,
        })
    }

    fn parse_for(&mut self, pos: Pos) -> PResult<Node> {
        self.loop_depth += 1;
        let result = self.parse_for_inner(pos);
        self.loop_depth -= 1;
        result
    }

    fn parse_for_inner(&mut self, pos: Pos) -> PResult<Node> {
        if self.at(&Token::LBrace) {
            let body = self.parse_block()?;
            return Ok(Node::For {
                init: None,
                cond: Box::new(Node::Bool(true)),
                post: None,
                body,
                pos,
            });
        }

        let first = self.parse_expr(Precedence::Lowest)?;
        if self.at(&Token::LBrace) {
            let body = self.parse_block()?;
            return Ok(Node::For {
                init: None,
                cond: Box::new(first),
                post: None,
                body,
                pos,
            });
        }

        self.expect(Token::Semicolon)?;
        let cond = self.parse_expr(Precedence::Lowest)?;
        self.expect(Token::Semicolon)?;
        let post = self.parse_expr(Precedence::Lowest)?;
        let body = self.parse_block()?;

        Ok(Node::For {
            init: Some(Box::new(first)),
            cond: Box::new(cond),
            post: Some(Box::new(post)),
            body,
            pos,
        })
    }

    fn parse_function(&mut self, pos: Pos) -> PResult<Node> {
        self.expect(Token::LParen)?;
        let mut params = Vec::new();
        loop {
            self.skip_semicolons();
            match self.advance() {
                Spanned {
                    token: Token::RParen,
                    ..
                } => break,
                Spanned {
                    token: Token::Ident(name),
                    ..
                } => {
                    params.push(name);
                    self.skip_semicolons();
                    match self.cur() {
                        Token::Comma => {
                            self.advance();
                        }
                        Token::RParen => {}
                        other => {
                            return Err((self.pos(), format!("expected , or ), got {}", other)));
                        }
                    }
                }
                Spanned { token, pos } => {
                    return Err((pos, format!("expected parameter name, got {}", token)));
                }
            }
        }

        // A loop around the literal does not extend into its body.
        let saved_depth = std::mem::replace(&mut self.loop_depth, 0);
        let body = self.parse_block();
        self.loop_depth = saved_depth;

        Ok(Node::Function {
            name: None,
            params,
            body: body?,
            pos,
        })
    }

    fn parse_map(&mut self, pos: Pos) -> PResult<Node> {
        let mut pairs = Vec::new();
        loop {
            self.skip_semicolons();
            if self.at(&Token::RBrace) {
                self.advance();
                break;
            }
            let key = self.parse_expr(Precedence::Lowest)?;
            self.expect(Token::Colon)?;
            let value = self.parse_expr(Precedence::Lowest)?;
            pairs.push((key, value));
            self.skip_semicolons();
            match self.cur() {
                Token::Comma => {
                    self.advance();
                }
                Token::RBrace => {}
                other => return Err((self.pos(), format!("expected , or }}, got {}", other))),
            }
        }
        Ok(Node::Map { pairs, pos })
    }

    /// Parse comma-separated expressions up to and including `end`.
    fn parse_expr_list(&mut self, end: Token) -> PResult<Vec<Node>> {
        let mut items = Vec::new();
        loop {
            self.skip_semicolons();
            if self.at(&end) {
                self.advance();
                return Ok(items);
            }
            items.push(self.parse_expr(Precedence::Lowest)?);
            self.skip_semicolons();
            if self.at(&Token::Comma) {
                self.advance();
            } else if !self.at(&end) {
                return Err((
                    self.pos(),
                    format!("expected , or {}, got {}", end, self.cur()),
                ));
            }
        }
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn cur(&self) -> &Token {
        self.tokens
            .get(self.idx)
            .map(|s| &s.token)
            .unwrap_or(&Token::Eof)
    }

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.idx + 1)
            .map(|s| &s.token)
            .unwrap_or(&Token::Eof)
    }

    fn pos(&self) -> Pos {
        self.tokens
            .get(self.idx)
            .map(|s| s.pos)
            .unwrap_or(self.source.len())
    }

    fn at(&self, token: &Token) -> bool {
        self.cur() == token
    }

    fn advance(&mut self) -> Spanned {
        match self.tokens.get(self.idx) {
            Some(s) => {
                let s = s.clone();
                if s.token != Token::Eof {
                    self.idx += 1;
                }
                s
            }
            None => Spanned {
                token: Token::Eof,
                pos: self.source.len(),
            },
        }
    }

    fn expect(&mut self, expected: Token) -> PResult<Pos> {
        if self.at(&expected) {
            Ok(self.advance().pos)
        } else {
            Err((
                self.pos(),
                format!("expected {}, got {}", expected, self.cur()),
            ))
        }
    }

    fn skip_semicolons(&mut self) {
        while self.at(&Token::Semicolon) {
            self.advance();
        }
    }

    /// Skip to the start of the next top-level statement after an error.
    fn synchronize(&mut self) {
        while !matches!(self.cur(), Token::Semicolon | Token::Eof) {
            self.advance();
        }
    }
}

/// Parse a program. `file` names the source in diagnostics.
pub fn parse(file: Option<&str>, source: &str) -> Result<Block, ParseErrors> {
    Parser::new(file, source)
        .map_err(|e| ParseErrors(vec![e]))?
        .parse_program()
}

/// Parse a program that did not come from a file.
pub fn parse_str(source: &str) -> Result<Block, ParseErrors> {
    parse(None, source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show(src: &str) -> String {
        let program = parse_str(src).unwrap();
        program
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn error(src: &str) -> ParseError {
        parse_str(src).unwrap_err().0.remove(0)
    }

    #[test]
    fn test_operator_precedence() {
        assert_eq!(show("1 + 2 * 3"), "(1 + (2 * 3))");
        assert_eq!(show("a | b ^ c & d"), "(a | (b ^ (c & d)))");
        assert_eq!(show("-a * b"), "((-a) * b)");
        assert_eq!(show("1 << 2 + 3"), "(1 << (2 + 3))");
        assert_eq!(show("a == b || c < d && e"), "((a == b) || ((c < d) && e))");
        assert_eq!(show("x in xs == true"), "((x in xs) == true)");
    }

    #[test]
    fn test_postfix_binds_tighter_than_prefix() {
        assert_eq!(show("-a.b[0](1)"), "(-(a.b[0])(1))");
        assert_eq!(show("!f(x)"), "(!f(x))");
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(show("a = b = 3"), "a = b = 3");
        assert_eq!(show("a += 1 * 2"), "a += (1 * 2)");
    }

    #[test]
    fn test_named_function_literal() {
        let program = parse_str("fib = fn(n) { n }").unwrap();
        match &program[0] {
            Node::Assign { value, .. } => match value.as_ref() {
                Node::Function { name, params, .. } => {
                    assert_eq!(name.as_deref(), Some("fib"));
                    assert_eq!(params, &vec!["n".to_string()]);
                }
                other => panic!("expected function, got {:?}", other),
            },
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_for_forms() {
        assert_eq!(show("for { x }"), "for true { x }");
        assert_eq!(show("for i < 3 { i }"), "for (i < 3) { i }");
        assert_eq!(
            show("for i = 0; i < 5; ++i { }"),
            "for i = 0; (i < 5); ++i {  }"
        );
    }

    #[test]
    fn test_if_else_chain() {
        assert_eq!(
            show("if a { 1 } else if b { 2 } else { 3 }"),
            "if a { 1 } else if b { 2 } else { 3 }"
        );
        assert_eq!(show("if a {\n1\n}\nelse {\n2\n}"), "if a { 1 } else { 2 }");
    }

    #[test]
    fn test_collections() {
        assert_eq!(show("[1, 2,\n 3,\n]"), "[1, 2, 3]");
        assert_eq!(show("{\"a\": 1, 2: [3]}"), "{\"a\": 1, 2: [3]}");
    }

    #[test]
    fn test_return_without_value() {
        assert_eq!(show("fn() { return }"), "fn() { return null }");
        assert_eq!(show("fn() { return; }"), "fn() { return null }");
    }

    #[test]
    fn test_concurrent_call() {
        assert_eq!(show("tau f(1, 2)"), "tau f(1, 2)");
        assert_eq!(error("tau 1").message, "expected function call after tau");
    }

    #[test]
    fn test_import_arity() {
        assert_eq!(show("import(\"m\")"), "import(\"m\")");
        assert!(error("import(\"a\", \"b\")").message.contains("exactly 1 argument"));
    }

    #[test]
    fn test_break_outside_loop() {
        assert_eq!(
            error("break").message,
            "break statement not inside \"for\" block"
        );
        assert_eq!(
            error("for { fn() { continue } }").message,
            "continue statement not inside \"for\" block"
        );
        assert!(parse_str("for { if x { break } else { continue } }").is_ok());
    }

    #[test]
    fn test_error_rendering() {
        let err = error("a = 1\nb = )");
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 4);
        assert_eq!(
            err.to_string(),
            "error in file <stdin> at line 2:\n    b = )\n        ^\nunexpected )"
        );
    }

    #[test]
    fn test_collects_multiple_errors() {
        let errs = parse_str("a = )\nb = 1\nc = ]").unwrap_err();
        assert_eq!(errs.0.len(), 2);
    }

    #[test]
    fn test_lexer_error_becomes_parse_error() {
        let err = error("x = \"open");
        assert!(err.message.contains("unterminated"));
        assert_eq!(err.column, 4);
    }
}
