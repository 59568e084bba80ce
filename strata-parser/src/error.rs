// MIT License
//
// Copyright (c) 2024 Jerome Johnson
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Error handling for the template parser
//!
//! This module provides the error type produced while splitting a template into tags
//! and assembling the node tree. Errors carry a short excerpt of the offending source
//! and, once located, the line and column where parsing stopped.

use std::fmt::Display;

use thiserror::Error;

/// 1-based line and column of a parse failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Computes the position of a byte offset in `src`
    pub fn of(src: &str, offset: usize) -> Self {
        let mut line = 1;
        let mut column = 1;
        for (i, ch) in src.char_indices() {
            if i >= offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        Self { line, column }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Error type for template parsing failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", located(.position))]
pub struct ParseError {
    pub message: String,
    pub position: Option<Position>,
}

fn located(position: &Option<Position>) -> String {
    match position {
        Some(position) => format!(" at {position}"),
        None => String::new(),
    }
}

static CAP_AT: usize = 32;

/// Returns the last 32 characters of a string for error context
pub(crate) fn rcap(src: &str) -> &str {
    let count = src.chars().count();
    if count > CAP_AT {
        let (start, _) = src.char_indices().nth(count - CAP_AT).unwrap_or((0, ' '));
        &src[start..]
    } else {
        src
    }
}

/// Returns the first 32 characters of a string for error context
pub(crate) fn lcap(src: &str) -> &str {
    match src.char_indices().nth(CAP_AT) {
        Some((end, _)) => &src[..end],
        None => src,
    }
}

impl ParseError {
    /// Creates a new parse error with context from the source near the failure
    pub(crate) fn new(message: &str, near: &str) -> Self {
        Self {
            message: format!("{} near \"{}\"", message, lcap(near)),
            position: None,
        }
    }

    /// Creates an error for unclosed tags
    pub(crate) fn unclosed(preffix: &str) -> Self {
        Self {
            message: format!("unclosed tag near \"{}\"", rcap(preffix)),
            position: None,
        }
    }

    /// Attaches the position of `at` within `src`, unless already located.
    ///
    /// `at` must be a subslice of `src`; anything else leaves the error unlocated.
    pub(crate) fn locate(mut self, src: &str, at: &str) -> Self {
        if self.position.is_some() {
            return self;
        }
        let base = src.as_ptr() as usize;
        let ptr = at.as_ptr() as usize;
        if ptr >= base && ptr <= base + src.len() {
            self.position = Some(Position::of(src, ptr - base));
        }
        self
    }
}

/// Result type for template parsing operations
pub type Result<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_count_lines_and_columns() {
        let src = "ab\ncd\nef";
        assert_eq!(Position::of(src, 0), Position { line: 1, column: 1 });
        assert_eq!(Position::of(src, 4), Position { line: 2, column: 2 });
        assert_eq!(Position::of(src, 6), Position { line: 3, column: 1 });
    }

    #[test]
    fn caps_respect_char_boundaries() {
        let long = "é".repeat(40);
        assert_eq!(lcap(&long).chars().count(), 32);
        assert_eq!(rcap(&long).chars().count(), 32);
        assert_eq!(rcap("short"), "short");
    }

    #[test]
    fn display_includes_position_once_located() {
        let src = "one\n{{";
        let err = ParseError::unclosed("{{").locate(src, &src[4..]);
        assert_eq!(err.to_string(), "unclosed tag near \"{{\" at line 2, column 1");
        let foreign = ParseError::new("empty tag", "x").locate(src, "elsewhere");
        assert_eq!(foreign.position, None);
    }
}
