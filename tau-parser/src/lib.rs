// tau-parser - Lexer and parser for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # tau-parser
//!
//! Lexer and parser for the tau programming language.
//! Produces an AST of [`Node`]s from source code strings, plus the source
//! location helpers every tau diagnostic is rendered with.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod source;

pub use ast::{Block, InfixOp, Node, Pos, PrefixOp};
pub use lexer::{Lexer, LexerError, Spanned, Token};
pub use parser::{ParseError, ParseErrors, Parser, parse, parse_str};
pub use source::{Location, STDIN_NAME, locate, render};
