// tau-parser - Lexer for tau
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Lexer (tokeniser) for tau source code.
//!
//! Converts a source string into a stream of tokens, each tagged with the byte
//! offset it starts at. Newlines are significant: a newline terminates a
//! statement and is reported as a `Semicolon`, except directly after tokens
//! that cannot end an expression (`(`, `[`, `{`, `,`, `.`, `;`).

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use thiserror::Error;

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    RawStr(String),

    // Assignment
    Assign,         // =
    PlusAssign,     // +=
    MinusAssign,    // -=
    AsteriskAssign, // *=
    SlashAssign,    // /=
    ModulusAssign,  // %=
    BwAndAssign,    // &=
    BwOrAssign,     // |=
    BwXorAssign,    // ^=
    LShiftAssign,   // <<=
    RShiftAssign,   // >>=

    // Operators
    Plus,       // +
    Minus,      // -
    Asterisk,   // *
    Slash,      // /
    Modulus,    // %
    PlusPlus,   // ++
    MinusMinus, // --
    Equals,     // ==
    NotEquals,  // !=
    Bang,       // !
    Lt,         // <
    Gt,         // >
    LtEq,       // <=
    GtEq,       // >=
    And,        // &&
    Or,         // ||
    BwAnd,      // &
    BwOr,       // |
    BwXor,      // ^
    BwNot,      // ~
    LShift,     // <<
    RShift,     // >>

    // Delimiters
    Dot,       // .
    Comma,     // ,
    Colon,     // :
    Semicolon, // ; or significant newline
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    LBracket,  // [
    RBracket,  // ]

    // Keywords
    Function,
    For,
    Continue,
    Break,
    If,
    Else,
    True,
    False,
    Null,
    Return,
    Import,
    In,
    Tau,

    Eof,
}

impl Token {
    /// Map an identifier to its keyword token, if it is one.
    pub fn keyword(ident: &str) -> Option<Token> {
        let tok = match ident {
            "fn" => Token::Function,
            "for" => Token::For,
            "continue" => Token::Continue,
            "break" => Token::Break,
            "if" => Token::If,
            "else" => Token::Else,
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            "return" => Token::Return,
            "import" => Token::Import,
            "in" => Token::In,
            "tau" => Token::Tau,
            _ => return None,
        };
        Some(tok)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "{}", s),
            Token::Int(n) => write!(f, "{}", n),
            Token::Float(n) => write!(f, "{}", n),
            Token::Str(s) => write!(f, "\"{}\"", s),
            Token::RawStr(s) => write!(f, "`{}`", s),
            Token::Assign => write!(f, "="),
            Token::PlusAssign => write!(f, "+="),
            Token::MinusAssign => write!(f, "-="),
            Token::AsteriskAssign => write!(f, "*="),
            Token::SlashAssign => write!(f, "/="),
            Token::ModulusAssign => write!(f, "%="),
            Token::BwAndAssign => write!(f, "&="),
            Token::BwOrAssign => write!(f, "|="),
            Token::BwXorAssign => write!(f, "^="),
            Token::LShiftAssign => write!(f, "<<="),
            Token::RShiftAssign => write!(f, ">>="),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Asterisk => write!(f, "*"),
            Token::Slash => write!(f, "/"),
            Token::Modulus => write!(f, "%"),
            Token::PlusPlus => write!(f, "++"),
            Token::MinusMinus => write!(f, "--"),
            Token::Equals => write!(f, "=="),
            Token::NotEquals => write!(f, "!="),
            Token::Bang => write!(f, "!"),
            Token::Lt => write!(f, "<"),
            Token::Gt => write!(f, ">"),
            Token::LtEq => write!(f, "<="),
            Token::GtEq => write!(f, ">="),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::BwAnd => write!(f, "&"),
            Token::BwOr => write!(f, "|"),
            Token::BwXor => write!(f, "^"),
            Token::BwNot => write!(f, "~"),
            Token::LShift => write!(f, "<<"),
            Token::RShift => write!(f, ">>"),
            Token::Dot => write!(f, "."),
            Token::Comma => write!(f, ","),
            Token::Colon => write!(f, ":"),
            Token::Semicolon => write!(f, "new line"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Function => write!(f, "fn"),
            Token::For => write!(f, "for"),
            Token::Continue => write!(f, "continue"),
            Token::Break => write!(f, "break"),
            Token::If => write!(f, "if"),
            Token::Else => write!(f, "else"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::Return => write!(f, "return"),
            Token::Import => write!(f, "import"),
            Token::In => write!(f, "in"),
            Token::Tau => write!(f, "tau"),
            Token::Eof => write!(f, "EOF"),
        }
    }
}

/// A token together with the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub pos: usize,
}

/// Lexer error with the byte offset it was raised at.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct LexerError {
    pub message: String,
    pub pos: usize,
}

/// The lexer converts source code into tokens.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source code.
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer {
            source,
            chars: source.char_indices().peekable(),
        };
        lexer.skip_blank();
        lexer
    }

    /// Get the next token from the source.
    pub fn next_token(&mut self) -> Result<Spanned, LexerError> {
        self.skip_inline_space();

        let (pos, c) = match self.chars.next() {
            Some(pc) => pc,
            None => {
                return Ok(Spanned {
                    token: Token::Eof,
                    pos: self.source.len(),
                });
            }
        };

        let token = match c {
            '\n' | ';' => {
                self.skip_blank();
                Token::Semicolon
            }
            '#' => {
                self.skip_comment();
                return self.next_token();
            }
            '(' => self.blank_after(Token::LParen),
            '[' => self.blank_after(Token::LBracket),
            '{' => self.blank_after(Token::LBrace),
            ',' => self.blank_after(Token::Comma),
            '.' => self.blank_after(Token::Dot),
            ')' => Token::RParen,
            ']' => Token::RBracket,
            '}' => Token::RBrace,
            ':' => Token::Colon,
            '~' => Token::BwNot,
            '"' => self.read_string(pos)?,
            '`' => self.read_raw_string(pos)?,
            '+' => self.pick(&[('=', Token::PlusAssign), ('+', Token::PlusPlus)], Token::Plus),
            '-' => self.pick(
                &[('=', Token::MinusAssign), ('-', Token::MinusMinus)],
                Token::Minus,
            ),
            '*' => self.pick(&[('=', Token::AsteriskAssign)], Token::Asterisk),
            '/' => self.pick(&[('=', Token::SlashAssign)], Token::Slash),
            '%' => self.pick(&[('=', Token::ModulusAssign)], Token::Modulus),
            '=' => self.pick(&[('=', Token::Equals)], Token::Assign),
            '!' => self.pick(&[('=', Token::NotEquals)], Token::Bang),
            '^' => self.pick(&[('=', Token::BwXorAssign)], Token::BwXor),
            '&' => self.pick(&[('&', Token::And), ('=', Token::BwAndAssign)], Token::BwAnd),
            '|' => self.pick(&[('|', Token::Or), ('=', Token::BwOrAssign)], Token::BwOr),
            '<' => {
                if self.eat('<') {
                    self.pick(&[('=', Token::LShiftAssign)], Token::LShift)
                } else {
                    self.pick(&[('=', Token::LtEq)], Token::Lt)
                }
            }
            '>' => {
                if self.eat('>') {
                    self.pick(&[('=', Token::RShiftAssign)], Token::RShift)
                } else {
                    self.pick(&[('=', Token::GtEq)], Token::Gt)
                }
            }
            c if c.is_ascii_digit() => self.read_number(pos)?,
            c if is_ident_start(c) => self.read_ident(pos),
            c => {
                return Err(LexerError {
                    message: format!("invalid character {:?}", c),
                    pos,
                });
            }
        };

        Ok(Spanned { token, pos })
    }

    /// Collect all tokens into a vector, ending with `Eof`.
    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, LexerError> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                return Ok(tokens);
            }
        }
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn offset(&mut self) -> usize {
        self.chars
            .peek()
            .map(|&(i, _)| i)
            .unwrap_or(self.source.len())
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    /// Consume one of the follow-up characters if present, else yield `single`.
    fn pick(&mut self, options: &[(char, Token)], single: Token) -> Token {
        for (c, tok) in options {
            if self.eat(*c) {
                return tok.clone();
            }
        }
        single
    }

    fn blank_after(&mut self, token: Token) -> Token {
        self.skip_blank();
        token
    }

    fn skip_inline_space(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
            self.chars.next();
        }
    }

    /// Skip all whitespace including newlines, and any comments in between.
    fn skip_blank(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.chars.next();
                }
                Some('#') => self.skip_comment(),
                _ => break,
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.chars.next();
        }
    }

    fn read_ident(&mut self, start: usize) -> Token {
        while matches!(self.peek(), Some(c) if is_ident_char(c)) {
            self.chars.next();
        }
        let end = self.offset();
        let word = &self.source[start..end];
        Token::keyword(word).unwrap_or_else(|| Token::Ident(word.to_string()))
    }

    fn read_number(&mut self, start: usize) -> Result<Token, LexerError> {
        if &self.source[start..start + 1] == "0" && matches!(self.peek(), Some('x' | 'X')) {
            self.chars.next();
            while matches!(self.peek(), Some(c) if c.is_ascii_hexdigit()) {
                self.chars.next();
            }
            let end = self.offset();
            let digits = &self.source[start + 2..end];
            return i64::from_str_radix(digits, 16)
                .map(Token::Int)
                .map_err(|_| LexerError {
                    message: format!("unable to parse {:?} as integer", &self.source[start..end]),
                    pos: start,
                });
        }

        let mut is_float = false;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.chars.next();
        }
        if self.peek() == Some('.') {
            is_float = true;
            self.chars.next();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.chars.next();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            self.chars.next();
            if matches!(self.peek(), Some('+' | '-')) {
                self.chars.next();
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.chars.next();
            }
        }

        let end = self.offset();
        let text = &self.source[start..end];
        if is_float {
            text.parse::<f64>()
                .map(Token::Float)
                .map_err(|_| LexerError {
                    message: format!("unable to parse {:?} as float", text),
                    pos: start,
                })
        } else {
            text.parse::<i64>()
                .map(Token::Int)
                .map_err(|_| LexerError {
                    message: format!("unable to parse {:?} as integer", text),
                    pos: start,
                })
        }
    }

    fn read_string(&mut self, start: usize) -> Result<Token, LexerError> {
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some((_, '"')) => return Ok(Token::Str(s)),
                Some((pos, '\\')) => match self.chars.next() {
                    Some((_, c)) if c != '\n' => s.push(unescape(c).ok_or_else(|| {
                        LexerError {
                            message: format!("unknown escape \"\\{}\"", c),
                            pos,
                        }
                    })?),
                    _ => {
                        return Err(LexerError {
                            message: "unterminated quoted string".into(),
                            pos: start,
                        });
                    }
                },
                Some((_, '\n')) | None => {
                    return Err(LexerError {
                        message: "unterminated quoted string".into(),
                        pos: start,
                    });
                }
                Some((_, c)) => s.push(c),
            }
        }
    }

    fn read_raw_string(&mut self, start: usize) -> Result<Token, LexerError> {
        let body_start = start + 1;
        loop {
            match self.chars.next() {
                Some((end, '`')) => {
                    return Ok(Token::RawStr(self.source[body_start..end].to_string()));
                }
                Some(_) => {}
                None => {
                    return Err(LexerError {
                        message: "unterminated raw string".into(),
                        pos: start,
                    });
                }
            }
        }
    }
}

fn unescape(c: char) -> Option<char> {
    let r = match c {
        'a' => '\x07',
        'b' => '\x08',
        'f' => '\x0c',
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        'v' => '\x0b',
        '\\' => '\\',
        '\'' => '\'',
        '"' => '"',
        _ => return None,
    };
    Some(r)
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(s: &str) -> Result<Vec<Token>, LexerError> {
        let mut lexer = Lexer::new(s);
        Ok(lexer
            .tokenize()?
            .into_iter()
            .map(|s| s.token)
            .filter(|t| *t != Token::Eof)
            .collect())
    }

    #[test]
    fn test_integers_and_floats() {
        assert_eq!(
            tokenize("42 0x1F 1.5 2e3").unwrap(),
            vec![
                Token::Int(42),
                Token::Int(31),
                Token::Float(1.5),
                Token::Float(2000.0)
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokenize("+ += ++ - -= -- << <<= >> >>= <= >= == != && || & | ^ ^= ~").unwrap(),
            vec![
                Token::Plus,
                Token::PlusAssign,
                Token::PlusPlus,
                Token::Minus,
                Token::MinusAssign,
                Token::MinusMinus,
                Token::LShift,
                Token::LShiftAssign,
                Token::RShift,
                Token::RShiftAssign,
                Token::LtEq,
                Token::GtEq,
                Token::Equals,
                Token::NotEquals,
                Token::And,
                Token::Or,
                Token::BwAnd,
                Token::BwOr,
                Token::BwXor,
                Token::BwXorAssign,
                Token::BwNot,
            ]
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            tokenize("fn for tau in foo_1").unwrap(),
            vec![
                Token::Function,
                Token::For,
                Token::Tau,
                Token::In,
                Token::Ident("foo_1".into())
            ]
        );
    }

    #[test]
    fn test_newline_terminates_statement() {
        assert_eq!(
            tokenize("a\nb").unwrap(),
            vec![
                Token::Ident("a".into()),
                Token::Semicolon,
                Token::Ident("b".into())
            ]
        );
    }

    #[test]
    fn test_newline_after_open_delimiter_is_ignored() {
        assert_eq!(
            tokenize("[\n1,\n2]").unwrap(),
            vec![
                Token::LBracket,
                Token::Int(1),
                Token::Comma,
                Token::Int(2),
                Token::RBracket
            ]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            tokenize("1 # comment\n2").unwrap(),
            vec![Token::Int(1), Token::Semicolon, Token::Int(2)]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            tokenize(r#""a\tb\"c""#).unwrap(),
            vec![Token::Str("a\tb\"c".into())]
        );
    }

    #[test]
    fn test_raw_string_keeps_backslashes() {
        assert_eq!(
            tokenize(r"`a\nb`").unwrap(),
            vec![Token::RawStr(r"a\nb".into())]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("\"abc").unwrap_err();
        assert!(err.message.contains("unterminated"));
        assert_eq!(err.pos, 0);
    }

    #[test]
    fn test_positions() {
        let mut lexer = Lexer::new("ab = 12");
        let toks = lexer.tokenize().unwrap();
        let positions: Vec<usize> = toks.iter().map(|t| t.pos).collect();
        assert_eq!(positions, vec![0, 3, 5, 7]);
    }
}
