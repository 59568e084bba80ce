//! Compiler configuration and entry points.
//!
//! ```rust,no_run
//! use serde_json::json;
//! use strata::{Compiler, Options};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let compiler = Compiler::new(Options {
//!     basedir: "templates".into(),
//!     ..Options::default()
//! });
//! let page = compiler.compile("pages/index.html").await?;
//! println!("{}", page.render(&json!({"title": "Home"}))?);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use log::debug;
use serde_json::Value;
use strata_parser::{Node, ParseError};

use crate::error::{RenderError, Result};
use crate::expression::{DefaultEngine, ExpressionEngine};
use crate::job::Job;
use crate::loader::{FileLoader, Loader};
use crate::program::Renderer;

/// Turns template text into nodes
pub trait TemplateParser: Send + Sync {
    fn parse(&self, source: &str) -> Result<Vec<Node>, ParseError>;
}

/// The `{{ }}` syntax of [`strata_parser`]
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultParser;

impl TemplateParser for DefaultParser {
    fn parse(&self, source: &str) -> Result<Vec<Node>, ParseError> {
        strata_parser::parse(source)
    }
}

/// Compiler options
#[derive(Debug, Clone)]
pub struct Options {
    /// Directory template paths are relative to
    pub basedir: PathBuf,
    /// Extension of the templates [`Compiler::compile_directory`] compiles, without the dot
    pub extension: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            basedir: PathBuf::from("."),
            extension: "html".to_string(),
        }
    }
}

/// Compiles templates into [`Renderer`]s.
///
/// Holds the collaborators a compile uses. Every call to [`Compiler::compile`] runs its
/// own job with a fresh cache, so one compiler can serve concurrent compiles.
pub struct Compiler {
    options: Options,
    loader: Box<dyn Loader>,
    parser: Box<dyn TemplateParser>,
    engine: Box<dyn ExpressionEngine>,
}

impl Compiler {
    /// Creates a compiler reading from `options.basedir` with the default syntax and
    /// expression engine
    pub fn new(options: Options) -> Self {
        Self {
            loader: Box::new(FileLoader::new(options.basedir.clone())),
            parser: Box::new(DefaultParser),
            engine: Box::new(DefaultEngine),
            options,
        }
    }

    pub fn with_loader(mut self, loader: impl Loader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn with_parser(mut self, parser: impl TemplateParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    pub fn with_engine(mut self, engine: impl ExpressionEngine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Compiles `file` and everything it includes into a single renderer
    pub async fn compile(&self, file: &str) -> Result<Renderer> {
        debug!("compiling {file}");
        Job::new(self.loader.as_ref(), self.parser.as_ref(), self.engine.as_ref())
            .compile(file)
            .await
    }

    /// Compiles every template the loader lists with the configured extension.
    ///
    /// Each template is compiled as its own root and keyed by its path. The names come
    /// from the same loader that supplies the contents: the default [`FileLoader`] walks
    /// `basedir`, a [`MemoryLoader`](crate::MemoryLoader) lists what it holds, and a
    /// loader that cannot enumerate its templates yields an empty set.
    pub async fn compile_directory(&self) -> Result<TemplateSet> {
        let mut templates = BTreeMap::new();
        for name in self.loader.list(&self.options.extension).await {
            let renderer = self.compile(&name).await?;
            templates.insert(name, renderer);
        }
        debug!("compiled {} template(s)", templates.len());
        Ok(TemplateSet { templates })
    }
}

/// Renderers keyed by template path
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    templates: BTreeMap<String, Renderer>,
}

impl TemplateSet {
    pub fn get(&self, name: &str) -> Option<&Renderer> {
        self.templates.get(name)
    }

    pub fn render(&self, name: &str, bindings: &Value) -> Result<String, RenderError> {
        self.get(name)
            .ok_or_else(|| RenderError::UnknownTemplate(name.to_string()))?
            .render(bindings)
    }

    /// Template names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Compiles `file` relative to the current directory with the default collaborators
pub async fn compile_template(file: &str) -> Result<Renderer> {
    Compiler::new(Options::default()).compile(file).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;
    use serde_json::json;

    #[test]
    fn default_options() {
        let options = Options::default();
        assert_eq!(options.basedir, PathBuf::from("."));
        assert_eq!(options.extension, "html");
    }

    #[tokio::test]
    async fn compiles_through_configured_loader() {
        let compiler = Compiler::new(Options::default())
            .with_loader(MemoryLoader::new().with("hello.html", "Hello {{ name }}!"));
        let renderer = compiler.compile("./hello.html").await.unwrap();
        assert_eq!(
            renderer.render(&json!({"name": "<you>"})).unwrap(),
            "Hello &lt;you&gt;!"
        );
    }

    #[tokio::test]
    async fn directory_compiles_use_the_configured_loader() {
        let loader = MemoryLoader::new()
            .with("b.html", "{{> parts/a.html}}!")
            .with("parts/a.html", "a")
            .with("notes.txt", "{{ not a template");
        let set = Compiler::new(Options {
            basedir: PathBuf::from("does/not/exist"),
            ..Options::default()
        })
        .with_loader(loader)
        .compile_directory()
        .await
        .unwrap();
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["b.html", "parts/a.html"]);
        assert_eq!(set.render("b.html", &Value::Null).unwrap(), "a!");
    }

    #[test]
    fn template_set_reports_unknown_names() {
        let set = TemplateSet::default();
        assert!(set.is_empty());
        assert!(matches!(
            set.render("nope.html", &Value::Null),
            Err(RenderError::UnknownTemplate(name)) if name == "nope.html"
        ));
    }
}
