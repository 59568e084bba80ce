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

//! Tokenization of tag arguments
//!
//! Opening tags carry whitespace separated arguments, for example
//! `{{#def title append}}` or `{{#include "layouts/base.html"}}`. This module walks
//! those arguments one token at a time.

use crate::error::{ParseError, Result, rcap};

/// Types of tokens that can appear in a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    /// A bare word such as a block name or a mode
    Word,
    /// A quoted string literal
    Literal,
}

/// A token found in tag content
#[derive(Debug, Clone)]
pub struct Token<'a> {
    /// The type of token
    pub token_type: TokenType,
    /// The token's value, quotes included for literals
    pub value: &'a str,
    /// The remaining text after this token
    pub tail: &'a str,
}

/// Finds the end of a string literal
fn find_end_of_string(src: &str, quote: char) -> Result<usize> {
    let cliped = &src[1..];
    let mut escaped = false;
    for (i, c) in cliped.char_indices() {
        match c {
            '\\' => escaped = !escaped,
            c if c == quote && !escaped => return Ok(i + 2),
            _ => escaped = false,
        }
    }
    Err(ParseError {
        message: format!("unterminated string near \"{}\"", rcap(src)),
        position: None,
    })
}

/// Finds the end of a bare word
fn find_end(src: &str) -> usize {
    src.find(char::is_whitespace).unwrap_or(src.len())
}

fn parse(src: &str) -> Result<Option<Token<'_>>> {
    Ok(match src.chars().next() {
        None => None,
        Some(quote @ ('"' | '\'')) => {
            let end = find_end_of_string(src, quote)?;
            Some(Token {
                token_type: TokenType::Literal,
                value: &src[..end],
                tail: src[end..].trim_start(),
            })
        }
        Some(_) => {
            let end = find_end(src);
            Some(Token {
                token_type: TokenType::Word,
                value: &src[..end],
                tail: src[end..].trim_start(),
            })
        }
    })
}

impl<'a> Token<'a> {
    /// Parses the first token from a string
    pub fn first(src: &'a str) -> Result<Option<Self>> {
        parse(src.trim())
    }

    /// Parses the next token after this one
    pub fn next(&self) -> Result<Option<Self>> {
        parse(self.tail)
    }

    /// Returns the token text, with quotes and escapes removed from literals
    pub fn text(&self) -> String {
        match self.token_type {
            TokenType::Word => self.value.to_string(),
            TokenType::Literal => {
                let inner = &self.value[1..self.value.len() - 1];
                let mut text = String::with_capacity(inner.len());
                let mut chars = inner.chars();
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => text.extend(chars.next()),
                        c => text.push(c),
                    }
                }
                text
            }
        }
    }
}
