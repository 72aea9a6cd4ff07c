// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Scanner for interpolated string templates.
//!
//! `"a {x + 1} b"` splits into text and code segments. `{{` and `}}` stand
//! for literal braces, braces nested inside a code segment are balanced, and
//! an empty `{}` produces nothing.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bad interpolation syntax")]
pub struct TemplateError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Code(String),
}

/// Split a template into segments. Adjacent text is merged and empty code
/// segments are dropped.
pub fn parse(template: &str) -> Result<Vec<Segment>, TemplateError> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                text.push('{');
            }
            '{' => {
                let code = scan_code(&mut chars)?;
                if code.is_empty() {
                    continue;
                }
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Code(code));
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                text.push('}');
            }
            other => text.push(other),
        }
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

/// Read up to the `}` closing the current code segment.
fn scan_code(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) -> Result<String, TemplateError> {
    let mut code = String::new();
    let mut depth = 0usize;
    loop {
        match chars.next().ok_or(TemplateError)? {
            '{' => {
                depth += 1;
                code.push('{');
            }
            '}' if depth == 0 => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                    code.push('}');
                    continue;
                }
                return Ok(code);
            }
            '}' => {
                depth -= 1;
                code.push('}');
            }
            other => code.push(other),
        }
    }
}

/// Number of code segments in a template.
pub fn count_code(segments: &[Segment]) -> usize {
    segments
        .iter()
        .filter(|s| matches!(s, Segment::Code(_)))
        .count()
}
