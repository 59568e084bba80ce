//! Node tree construction
//!
//! Tags are consumed in order while an explicit stack tracks the `block`, `def` and
//! `include` tags that are still open. Closing a tag folds its collected children into
//! a single [`Node`] on the enclosing level.

use std::mem;
use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{Definition, Mode, Node};
use crate::error::{ParseError, Result};
use crate::tag::{Tag, TagType};
use crate::token::Token;

static VAR_BINDING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^([A-Za-z_$][A-Za-z0-9_$]*)\s*=\s*(.+)$").unwrap());

/// The tag that opened a scope
enum Opened {
    Root,
    Block(String),
    Definition(String, Mode),
    Include(String),
}

impl Opened {
    fn label(&self) -> &'static str {
        match self {
            Opened::Root => "template",
            Opened::Block(_) => "block",
            Opened::Definition(..) => "def",
            Opened::Include(_) => "include",
        }
    }
}

/// An open tag and the nodes collected inside it so far
struct Scope<'a> {
    opened: Opened,
    nodes: Vec<Node>,
    /// Content of the opening tag, for error positions
    tag: &'a str,
}

impl<'a> Scope<'a> {
    fn new(opened: Opened, tag: &'a str) -> Self {
        Self {
            opened,
            nodes: Vec::new(),
            tag,
        }
    }
}

struct Builder<'a> {
    src: &'a str,
    current: Scope<'a>,
    open_stack: Vec<Scope<'a>>,
}

/// Returns the remainder of `content` if it starts with `keyword` and whitespace
fn keyword<'a>(content: &'a str, keyword: &str) -> Option<&'a str> {
    let rest = content.strip_prefix(keyword)?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

impl<'a> Builder<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            current: Scope::new(Opened::Root, src),
            open_stack: Vec::new(),
        }
    }

    fn error(&self, message: &str, at: &'a str) -> ParseError {
        ParseError::new(message, at).locate(self.src, at)
    }

    fn text(&mut self, text: &'a str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        if let Opened::Include(_) = self.current.opened {
            if text.trim().is_empty() {
                return Ok(());
            }
            return Err(self.error("only def blocks may appear inside include", text));
        }
        match self.current.nodes.last_mut() {
            Some(Node::Text(last)) => last.push_str(text),
            _ => self.current.nodes.push(Node::Text(text.to_string())),
        }
        Ok(())
    }

    fn push(&mut self, node: Node, at: &'a str) -> Result<()> {
        if let (Opened::Include(_), false) = (&self.current.opened, matches!(node, Node::Definition(_))) {
            return Err(self.error(
                &format!("only def blocks may appear inside include, found {}", node.kind()),
                at,
            ));
        }
        self.current.nodes.push(node);
        Ok(())
    }

    /// Handles `{{ … }}`: output, `var` bindings and `do` statements
    fn statement(&mut self, tag: &Tag<'a>) -> Result<()> {
        let content = tag.content.trim();
        let node = if let Some(binding) = keyword(content, "var") {
            let captures = VAR_BINDING
                .captures(binding)
                .ok_or_else(|| self.error("malformed var binding, expected var name = expression", tag.raw))?;
            Node::Var {
                name: captures[1].to_string(),
                source: captures[2].trim().to_string(),
            }
        } else if let Some(source) = keyword(content, "do") {
            Node::Expression {
                source: source.to_string(),
                buffered: false,
                escape: false,
            }
        } else {
            Node::Expression {
                source: content.to_string(),
                buffered: true,
                escape: true,
            }
        };
        self.push(node, tag.raw)
    }

    fn argument(&self, token: &Token<'a>, tag: &Tag<'a>, what: &str) -> Result<Token<'a>> {
        token
            .next()
            .map_err(|err| err.locate(self.src, tag.raw))?
            .ok_or_else(|| self.error(&format!("expected {what}"), tag.raw))
    }

    fn finished(&self, token: &Token<'a>, tag: &Tag<'a>) -> Result<()> {
        match token.next().map_err(|err| err.locate(self.src, tag.raw))? {
            Some(extra) => Err(self.error(&format!("unexpected argument {}", extra.value), tag.raw)),
            None => Ok(()),
        }
    }

    /// Opens a block, def or include
    fn open(&mut self, tag: &Tag<'a>) -> Result<()> {
        let token = Token::first(tag.content)
            .map_err(|err| err.locate(self.src, tag.raw))?
            .ok_or_else(|| self.error("expected token", tag.raw))?;
        let opened = match token.value {
            "block" => {
                let name = self.argument(&token, tag, "block name")?;
                self.finished(&name, tag)?;
                Opened::Block(name.text())
            }
            "def" => {
                let name = self.argument(&token, tag, "def name")?;
                let mode = match name.next().map_err(|err| err.locate(self.src, tag.raw))? {
                    Some(mode) => {
                        self.finished(&mode, tag)?;
                        mode.value
                            .parse::<Mode>()
                            .map_err(|err| err.locate(self.src, tag.raw))?
                    }
                    None => Mode::default(),
                };
                Opened::Definition(name.text(), mode)
            }
            "include" => {
                let file = self.argument(&token, tag, "include path")?;
                self.finished(&file, tag)?;
                Opened::Include(file.text())
            }
            other => return Err(self.error(&format!("unsupported block helper {other}"), tag.raw)),
        };
        let scope = mem::replace(&mut self.current, Scope::new(opened, tag.raw));
        self.open_stack.push(scope);
        Ok(())
    }

    /// Closes the innermost open tag
    fn close(&mut self, tag: &Tag<'a>) -> Result<()> {
        let name = tag.content.trim();
        let Some(parent) = self.open_stack.pop() else {
            return Err(self.error(&format!("unexpected closing tag {name}"), tag.raw));
        };
        let expected = self.current.opened.label();
        if name != expected {
            self.open_stack.push(parent);
            return Err(self.error(
                &format!("mismatched closing tag {name}, expected {expected}"),
                tag.raw,
            ));
        }
        let closed = mem::replace(&mut self.current, parent);
        let node = match closed.opened {
            Opened::Block(name) => Node::Block {
                name,
                nodes: closed.nodes,
            },
            Opened::Definition(name, mode) => Node::Definition(Definition {
                name,
                mode,
                nodes: closed.nodes,
            }),
            Opened::Include(file) => Node::Include {
                file,
                overrides: closed
                    .nodes
                    .into_iter()
                    .filter_map(|node| match node {
                        Node::Definition(definition) => Some(definition),
                        _ => None,
                    })
                    .collect(),
            },
            Opened::Root => return Err(self.error("unexpected closing tag", tag.raw)),
        };
        self.push(node, tag.raw)
    }

    /// Handles `{{> path}}`
    fn partial(&mut self, tag: &Tag<'a>) -> Result<()> {
        let file = Token::first(tag.content)
            .map_err(|err| err.locate(self.src, tag.raw))?
            .ok_or_else(|| self.error("expected include path", tag.raw))?;
        self.finished(&file, tag)?;
        self.push(
            Node::Include {
                file: file.text(),
                overrides: Vec::new(),
            },
            tag.raw,
        )
    }

    fn finish(self) -> Result<Vec<Node>> {
        if !self.open_stack.is_empty() {
            let label = self.current.opened.label();
            return Err(self.error(&format!("unclosed {label} tag"), self.current.tag));
        }
        Ok(self.current.nodes)
    }
}

fn next_tag<'a>(src: &'a str, rest: &'a str) -> Result<Option<Tag<'a>>> {
    Tag::from(rest).map_err(|err| err.locate(src, &rest[rest.find("{{").unwrap_or(0)..]))
}

/// Parses template source into its node sequence
pub fn parse(src: &str) -> Result<Vec<Node>> {
    let mut builder = Builder::new(src);
    let mut rest = src;
    let mut tag = next_tag(src, rest)?;
    while let Some(current) = tag {
        rest = current.postfix;
        builder.text(current.prefix)?;
        match current.tag_type {
            TagType::Comment => (),
            TagType::HtmlEscaped => builder.statement(&current)?,
            TagType::Raw => builder.push(
                Node::Expression {
                    source: current.content.trim().to_string(),
                    buffered: true,
                    escape: false,
                },
                current.raw,
            )?,
            TagType::Open => builder.open(&current)?,
            TagType::Close => builder.close(&current)?,
            TagType::Partial => builder.partial(&current)?,
            TagType::Escaped => builder.text(current.content)?,
        }
        tag = next_tag(src, rest)?;
    }
    builder.text(rest)?;
    builder.finish()
}
