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

//! Tag splitting for templates
//!
//! This module finds the `{{ … }}` tags in a template and classifies them. Each [`Tag`]
//! holds the text that precedes it, its content and the text that follows, so a template
//! is consumed by repeatedly calling [`Tag::next`] until no tag remains.
//!
//! # Tag Types
//!
//! - `{{ value }}` - HTML escaped output (also `{{var …}}` and `{{do …}}` statements)
//! - `{{{ value }}}` - raw output
//! - `{{! comment }}` / `{{!-- comment --}}` - comments
//! - `{{#name …}}` / `{{/name}}` - opening and closing tags
//! - `{{> path}}` - include without overrides
//! - `\{{` and `{{{{raw}}}}…{{{{/raw}}}}` - verbatim text
//!
//! A `~` just inside the delimiters trims whitespace on that side of the tag.

use crate::error::{ParseError, Result};

/// Kinds of tags recognised by the splitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagType {
    /// Comment tag: `{{! comment }}`
    Comment,
    /// Escaped output or statement: `{{ value }}`
    HtmlEscaped,
    /// Unescaped output: `{{{ value }}}`
    Raw,
    /// Opening tag: `{{#block name}}`
    Open,
    /// Closing tag: `{{/block}}`
    Close,
    /// Include shorthand: `{{> path}}`
    Partial,
    /// Verbatim text: `\{{` or a `{{{{raw}}}}` section
    Escaped,
}

/// A tag along with the text around it
#[derive(Debug, Clone, Copy)]
pub struct Tag<'a> {
    /// The type of tag
    pub tag_type: TagType,
    /// Text before the tag
    pub prefix: &'a str,
    /// The tag content, without delimiters or markers
    pub content: &'a str,
    /// Text after the tag
    pub postfix: &'a str,
    /// The tag content followed by its closing delimiter
    pub raw: &'a str,
}

fn trim_marker(src: &str) -> (&str, bool) {
    match src.strip_prefix('~') {
        Some(rest) => (rest, true),
        None => (src, false),
    }
}

impl<'a> Tag<'a> {
    /// Creates a new tag by finding its closing delimiter
    fn close(tag_type: TagType, preffix: &'a str, start: &'a str, end: &'static str) -> Result<Self> {
        match start.find(end) {
            Some(mut pos) => {
                if pos == 0 || start[..pos].trim().is_empty() {
                    return Err(ParseError::new("empty tag", preffix));
                }
                let mut postfix = &start[pos + end.len()..];
                if start[..pos].ends_with('~') {
                    postfix = postfix.trim_start();
                    pos -= 1;
                }
                Ok(Self {
                    tag_type,
                    prefix: preffix,
                    content: &start[..pos],
                    postfix,
                    raw: &start[..pos + end.len()],
                })
            }
            None => Err(ParseError::unclosed(preffix)),
        }
    }

    /// Parses a comment tag
    fn check_comment(preffix: &'a str, start: &'a str) -> Result<Self> {
        match start.strip_prefix("--") {
            Some(rest) => Self::close(TagType::Comment, preffix, rest, "--}}"),
            None => Self::close(TagType::Comment, preffix, start, "}}"),
        }
    }

    /// Finds the closing tag of a `{{{{raw}}}}` section
    fn find_closing_escape(open: Tag<'a>) -> Result<Self> {
        let name = open.content.trim();
        let mut offset = 0;
        loop {
            let rest = &open.postfix[offset..];
            let candidate = rest.find("{{{{/").ok_or_else(|| ParseError::unclosed(open.raw))?;
            let start = candidate + 5;
            let remains = &rest[start..];
            let close = remains.find("}}}}").ok_or_else(|| ParseError::unclosed(open.raw))?;
            if remains[..close].trim() == name {
                return Ok(Self {
                    tag_type: TagType::Escaped,
                    prefix: open.prefix,
                    content: &open.postfix[..offset + candidate],
                    postfix: &remains[close + 4..],
                    raw: open.raw,
                });
            }
            offset += start + close + 4;
        }
    }

    /// Parses the next tag from a template string
    pub fn from(src: &'a str) -> Result<Option<Self>> {
        let Some(start) = src.find("{{") else {
            return Ok(None);
        };
        if src[..start].ends_with('\\') {
            return Ok(Some(Self {
                tag_type: TagType::Escaped,
                prefix: &src[..start - 1],
                content: &src[start..start + 2],
                postfix: &src[start + 2..],
                raw: &src[start..start + 2],
            }));
        }
        let mut prefix = &src[..start];
        let (body, trim) = trim_marker(&src[start + 2..]);
        if trim {
            prefix = prefix.trim_end();
        }
        let Some(marker) = body.chars().next() else {
            return Err(ParseError::unclosed(&src[start..]));
        };
        let rest = &body[marker.len_utf8()..];
        Ok(Some(match marker {
            '{' => {
                if let Some(rest) = rest.strip_prefix('{') {
                    let (rest, trim) = trim_marker(rest);
                    if trim {
                        prefix = prefix.trim_end();
                    }
                    return Ok(Some(Self::find_closing_escape(Self::close(
                        TagType::Escaped,
                        prefix,
                        rest,
                        "}}}}",
                    )?)?));
                }
                let (rest, trim) = trim_marker(rest);
                if trim {
                    prefix = prefix.trim_end();
                }
                Self::close(TagType::Raw, prefix, rest, "}}}")?
            }
            '!' => Self::check_comment(prefix, rest)?,
            '#' => Self::close(TagType::Open, prefix, rest, "}}")?,
            '/' => Self::close(TagType::Close, prefix, rest, "}}")?,
            '>' => Self::close(TagType::Partial, prefix, rest, "}}")?,
            _ => Self::close(TagType::HtmlEscaped, prefix, body, "}}")?,
        }))
    }

    /// Parses the next tag after this one
    pub fn next(&self) -> Result<Option<Self>> {
        Self::from(self.postfix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first(src: &str) -> Tag<'_> {
        Tag::from(src).unwrap().unwrap()
    }

    #[test]
    fn splits_prefix_content_postfix() {
        let tag = first("Hello {{ name }}!");
        assert_eq!(tag.tag_type, TagType::HtmlEscaped);
        assert_eq!(tag.prefix, "Hello ");
        assert_eq!(tag.content, " name ");
        assert_eq!(tag.postfix, "!");
    }

    #[test]
    fn classifies_markers() {
        assert_eq!(first("{{{x}}}").tag_type, TagType::Raw);
        assert_eq!(first("{{! note }}").tag_type, TagType::Comment);
        assert_eq!(first("{{#block a}}").tag_type, TagType::Open);
        assert_eq!(first("{{/block}}").tag_type, TagType::Close);
        assert_eq!(first("{{> nav.html}}").tag_type, TagType::Partial);
        assert_eq!(first("\\{{x}}").tag_type, TagType::Escaped);
    }

    #[test]
    fn long_comments_may_contain_tags() {
        let tag = first("a{{!-- {{so is this}} --}}b");
        assert_eq!(tag.tag_type, TagType::Comment);
        assert_eq!(tag.postfix, "b");
    }

    #[test]
    fn trims_whitespace_around_markers() {
        let tag = first("a   {{~ x ~}}   b");
        assert_eq!(tag.prefix, "a");
        assert_eq!(tag.content, " x ");
        assert_eq!(tag.postfix, "b");
    }

    #[test]
    fn raw_sections_are_verbatim() {
        let tag = first("{{{{skip}}}}wang {{doodle}} {{{{/dandy}}}}{{{{/skip}}}}tail");
        assert_eq!(tag.tag_type, TagType::Escaped);
        assert_eq!(tag.content, "wang {{doodle}} {{{{/dandy}}}}");
        assert_eq!(tag.postfix, "tail");
    }

    #[test]
    fn backslash_escapes_opening_braces() {
        let tag = first("x\\{{y}}");
        assert_eq!(tag.prefix, "x");
        assert_eq!(tag.content, "{{");
        assert_eq!(tag.postfix, "y}}");
        assert!(tag.next().unwrap().is_none());
    }

    #[test]
    fn reports_unclosed_and_empty_tags() {
        assert!(Tag::from("{{ name").is_err());
        assert!(Tag::from("{{").is_err());
        assert!(Tag::from("{{  }}").is_err());
        assert!(Tag::from("no tags here").unwrap().is_none());
    }

    #[test]
    fn handles_multibyte_markers() {
        let tag = first("{{é}}");
        assert_eq!(tag.tag_type, TagType::HtmlEscaped);
        assert_eq!(tag.content, "é");
    }
}
