// tau-parser - Source location rendering for tau diagnostics
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Turning byte offsets into human-readable locations.
//!
//! Every diagnostic produced by the toolchain, whether at parse, compile or
//! run time, is rendered in the same shape:
//!
//! ```text
//! error in file main.tau at line 3:
//!     x = 1 + "a"
//!           ^
//! unsupported operator '+' for types int and string
//! ```

/// Name used in diagnostics when the source did not come from a file.
pub const STDIN_NAME: &str = "<stdin>";

/// A resolved source location: the offending line (left-trimmed), its 1-based
/// number and the column of the offending byte within the trimmed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub line: String,
    pub lineno: usize,
    pub column: usize,
}

/// Resolve a byte offset in `source` into a [`Location`].
///
/// Offsets past the end of the source are clamped to the last byte.
pub fn locate(source: &str, pos: usize) -> Location {
    let mut pos = pos.min(source.len());
    while !source.is_char_boundary(pos) {
        pos -= 1;
    }

    let start = source[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = source[pos..]
        .find('\n')
        .map(|i| pos + i)
        .unwrap_or(source.len());

    let line = source[start..end].trim_start_matches([' ', '\t']);
    let column = line.len().saturating_sub(end - pos);
    let lineno = source[..pos].matches('\n').count() + 1;

    Location {
        line: line.to_string(),
        lineno,
        column,
    }
}

/// Render a full diagnostic for `message` at byte offset `pos`.
pub fn render(file: Option<&str>, source: &str, pos: usize, message: &str) -> String {
    let loc = locate(source, pos);
    format!(
        "error in file {} at line {}:\n    {}\n    {}^\n{}",
        file.unwrap_or(STDIN_NAME),
        loc.lineno,
        loc.line,
        " ".repeat(loc.column),
        message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_first_line() {
        let loc = locate("a = 1 + b", 8);
        assert_eq!(loc.lineno, 1);
        assert_eq!(loc.column, 8);
        assert_eq!(loc.line, "a = 1 + b");
    }

    #[test]
    fn test_locate_trims_indentation() {
        let src = "fn() {\n\t  x = y\n}";
        let pos = src.find('y').unwrap();
        let loc = locate(src, pos);
        assert_eq!(loc.lineno, 2);
        assert_eq!(loc.line, "x = y");
        assert_eq!(loc.column, 4);
    }

    #[test]
    fn test_render_uses_stdin_without_file() {
        let out = render(None, "x = ", 4, "boom");
        assert_eq!(out, "error in file <stdin> at line 1:\n    x = \n        ^\nboom");
    }

    #[test]
    fn test_locate_clamps_past_end() {
        let loc = locate("abc", 99);
        assert_eq!(loc.column, 3);
        assert_eq!(loc.lineno, 1);
    }
}
