// tau-core - Source bookmarks for tau bytecode
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bookmarks map instruction offsets back to source lines.
//!
//! The compiler records one after most emits. When the VM raises an error it
//! looks up the first bookmark at or after the faulting instruction pointer
//! and renders the line it points at.

use tau_parser::source::{self, STDIN_NAME};

/// A mapping from an instruction offset to a source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    /// Length of the instruction buffer right after the bookmarked emit
    pub offset: u32,
    /// 1-based line number
    pub lineno: u32,
    /// Column within the left-trimmed line
    pub column: u32,
    /// The left-trimmed source line
    pub line: String,
}

impl Bookmark {
    pub fn new(src: &str, pos: usize, offset: usize) -> Self {
        let loc = source::locate(src, pos);
        Bookmark {
            offset: offset as u32,
            lineno: loc.lineno as u32,
            column: loc.column as u32,
            line: loc.line,
        }
    }

    /// Render `message` anchored at this bookmark.
    pub fn render(&self, file: Option<&str>, message: &str) -> String {
        format!(
            "error in file {} at line {}:\n    {}\n    {}^\n{}",
            file.unwrap_or(STDIN_NAME),
            self.lineno,
            self.line,
            " ".repeat(self.column as usize),
            message
        )
    }
}

/// Find the bookmark covering instruction pointer `ip`.
pub fn lookup(bookmarks: &[Bookmark], ip: usize) -> Option<&Bookmark> {
    bookmarks.iter().find(|b| b.offset as usize >= ip)
}
