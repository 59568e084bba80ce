//! One compile request: file resolution, node processing and override resolution.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use log::{debug, trace};
use strata_parser::{Definition, Mode, Node};

use crate::compiler::TemplateParser;
use crate::error::{CompileError, Result};
use crate::expression::{Evaluator, ExpressionEngine};
use crate::loader::Loader;
use crate::path;
use crate::program::{Op, Renderer};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A definition after its body has been compiled
#[derive(Debug, Clone)]
pub(crate) struct CompiledDefinition {
    pub(crate) mode: Mode,
    pub(crate) code: Vec<Op>,
}

/// Compile-time scope. There is one per file level: the root template, and one for
/// every include.
#[derive(Debug)]
pub(crate) struct Context<'p> {
    file: String,
    definitions: HashMap<String, CompiledDefinition>,
    parent: Option<&'p Context<'p>>,
}

impl Context<'static> {
    pub(crate) fn root(file: String) -> Self {
        Context {
            file,
            definitions: HashMap::new(),
            parent: None,
        }
    }
}

impl<'p> Context<'p> {
    pub(crate) fn nested(file: String, parent: &'p Context<'p>) -> Self {
        Context {
            file,
            definitions: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// The nearest definition of `name`, searching outward from this context
    pub(crate) fn find_definition(&self, name: &str) -> Option<&CompiledDefinition> {
        match self.definitions.get(name) {
            Some(definition) => Some(definition),
            None => self.parent.and_then(|parent| parent.find_definition(name)),
        }
    }

    pub(crate) fn define(&mut self, name: impl Into<String>, definition: CompiledDefinition) {
        self.definitions.insert(name.into(), definition);
    }
}

/// Owns the AST cache and expression table of a single compile.
///
/// Both are mutated in place, so a job is never shared between compiles.
pub(crate) struct Job<'c> {
    loader: &'c dyn Loader,
    parser: &'c dyn TemplateParser,
    engine: &'c dyn ExpressionEngine,
    expressions: Vec<Box<dyn Evaluator>>,
    cached_nodes: HashMap<String, Arc<Vec<Node>>>,
    // resolved paths of the files currently being processed, innermost last
    sources: Vec<String>,
}

impl<'c> Job<'c> {
    pub(crate) fn new(
        loader: &'c dyn Loader,
        parser: &'c dyn TemplateParser,
        engine: &'c dyn ExpressionEngine,
    ) -> Self {
        Job {
            loader,
            parser,
            engine,
            expressions: Vec::new(),
            cached_nodes: HashMap::new(),
            sources: Vec::new(),
        }
    }

    pub(crate) async fn compile(mut self, file: &str) -> Result<Renderer> {
        let mut root = Context::root(path::resolve("", file));
        let ops = self.process_file(file, &mut root).await?;
        debug!(
            "compiled {} from {} file(s) with {} expression(s)",
            root.file,
            self.cached_nodes.len(),
            self.expressions.len()
        );
        Ok(Renderer::assemble(ops, self.expressions))
    }

    fn process_file<'a, 'p: 'a>(
        &'a mut self,
        file: &'a str,
        ctx: &'a mut Context<'p>,
    ) -> BoxFuture<'a, Result<Vec<Op>>> {
        Box::pin(async move {
            let including = ctx.parent.map_or("", |parent| parent.file.as_str());
            let path = path::resolve(including, file);
            if self.sources.contains(&path) {
                let mut chain = self.sources.clone();
                chain.push(path.clone());
                return Err(CompileError::Cycle { path, chain });
            }
            let nodes = match self.cached_nodes.get(&path).cloned() {
                Some(nodes) => {
                    trace!("reusing parsed {path}");
                    nodes
                }
                None => {
                    debug!("loading {path}");
                    let text = self.loader.load(&path).await.map_err(|source| CompileError::Load {
                        path: path.clone(),
                        source,
                    })?;
                    let nodes = self.parser.parse(&text).map_err(|source| CompileError::Parse {
                        path: path.clone(),
                        source,
                    })?;
                    let nodes = Arc::new(nodes);
                    self.cached_nodes.insert(path.clone(), Arc::clone(&nodes));
                    nodes
                }
            };
            self.sources.push(path);
            let ops = self.process_nodes(&nodes, ctx).await;
            self.sources.pop();
            ops
        })
    }

    fn process_nodes<'a, 'p: 'a>(
        &'a mut self,
        nodes: &'a [Node],
        ctx: &'a mut Context<'p>,
    ) -> BoxFuture<'a, Result<Vec<Op>>> {
        Box::pin(async move {
            let mut ops = Vec::new();
            for node in nodes {
                match node {
                    Node::Text(text) => ops.push(Op::Text(text.clone())),
                    Node::Definition(definition) => self.process_def(definition, ctx).await?,
                    Node::Block { name, nodes } => {
                        ops.extend(self.process_block(name, nodes, ctx).await?)
                    }
                    Node::Include { file, overrides } => {
                        ops.push(self.process_include(file, overrides, ctx).await?)
                    }
                    Node::Expression {
                        source,
                        buffered,
                        escape,
                    } => ops.push(self.process_expr(source, *buffered, *escape)?),
                    Node::Var { name, source } => ops.push(self.process_var(name, source)?),
                }
            }
            Ok(ops)
        })
    }

    async fn process_def(&mut self, definition: &Definition, ctx: &mut Context<'_>) -> Result<()> {
        let code = self.process_nodes(&definition.nodes, ctx).await?;
        ctx.define(
            definition.name.as_str(),
            CompiledDefinition {
                mode: definition.mode,
                code,
            },
        );
        Ok(())
    }

    async fn process_block(
        &mut self,
        name: &str,
        nodes: &[Node],
        ctx: &mut Context<'_>,
    ) -> Result<Vec<Op>> {
        let definition = ctx.find_definition(name).cloned();
        let mut body = self.process_nodes(nodes, ctx).await?;
        Ok(match definition {
            None => body,
            Some(CompiledDefinition {
                mode: Mode::Append,
                code,
            }) => {
                body.extend(code);
                body
            }
            // prepend drops the block body as well
            Some(CompiledDefinition { code, .. }) => code,
        })
    }

    async fn process_include(
        &mut self,
        file: &str,
        overrides: &[Definition],
        ctx: &mut Context<'_>,
    ) -> Result<Op> {
        let mut inner = Context::nested(path::resolve(&ctx.file, file), &*ctx);
        for definition in overrides {
            self.process_def(definition, &mut inner).await?;
        }
        let body = self.process_file(file, &mut inner).await?;
        Ok(Op::Scoped(body))
    }

    fn process_expr(&mut self, source: &str, buffered: bool, escape: bool) -> Result<Op> {
        let index = self.compile_expression(source)?;
        Ok(if buffered {
            Op::Emit { index, escape }
        } else {
            Op::Eval(index)
        })
    }

    fn process_var(&mut self, name: &str, source: &str) -> Result<Op> {
        let index = self.compile_expression(source)?;
        Ok(Op::Assign {
            name: name.to_string(),
            index,
        })
    }

    fn compile_expression(&mut self, source: &str) -> Result<usize> {
        let evaluator = self
            .engine
            .compile(source)
            .map_err(|err| CompileError::Expression {
                path: self.sources.last().cloned().unwrap_or_default(),
                source: err,
            })?;
        let index = self.expressions.len();
        trace!("expression {index}: {source}");
        self.expressions.push(evaluator);
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::DefaultParser;
    use crate::expression::DefaultEngine;
    use crate::loader::MemoryLoader;

    fn definition(mode: Mode, text: &str) -> CompiledDefinition {
        CompiledDefinition {
            mode,
            code: vec![Op::Text(text.to_string())],
        }
    }

    #[test]
    fn nearest_definition_wins() {
        let mut root = Context::root("index.html".to_string());
        root.define("title", definition(Mode::Override, "root"));
        root.define("footer", definition(Mode::Append, "footer"));
        let mut child = Context::nested("layout.html".to_string(), &root);
        child.define("title", definition(Mode::Override, "child"));
        let grandchild = Context::nested("base.html".to_string(), &child);

        assert_eq!(
            grandchild.find_definition("title").map(|d| d.code.clone()),
            Some(vec![Op::Text("child".to_string())])
        );
        assert_eq!(
            grandchild.find_definition("footer").map(|d| d.mode),
            Some(Mode::Append)
        );
        assert!(grandchild.find_definition("missing").is_none());
    }

    async fn compile_ops(loader: MemoryLoader, file: &str) -> Vec<Op> {
        Job::new(&loader, &DefaultParser, &DefaultEngine)
            .compile(file)
            .await
            .unwrap()
            .ops()
            .to_vec()
    }

    #[tokio::test]
    async fn includes_become_scoped_ops() {
        let loader = MemoryLoader::new()
            .with("index.html", "{{var a = 1}}{{#include \"base.html\"}}{{#def t}}B{{/def}}{{/include}}")
            .with("base.html", "<{{#block t}}A{{/block}}>{{a}}");
        assert_eq!(
            compile_ops(loader, "index.html").await,
            vec![
                Op::Assign {
                    name: "a".to_string(),
                    index: 0
                },
                Op::Scoped(vec![
                    Op::Text("<B>".to_string()),
                    Op::Emit {
                        index: 1,
                        escape: true
                    },
                ]),
            ]
        );
    }

    #[tokio::test]
    async fn overridden_block_bodies_still_compile() {
        let loader = MemoryLoader::new()
            .with("index.html", "{{#include \"base.html\"}}{{#def t}}B{{/def}}{{/include}}")
            .with("base.html", "{{#block t}}{{ 1 + }}{{/block}}");
        let err = Job::new(&loader, &DefaultParser, &DefaultEngine)
            .compile("index.html")
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::Expression { ref path, .. } if path == "base.html"));
    }

    #[tokio::test]
    async fn override_errors_name_the_including_file() {
        let loader = MemoryLoader::new()
            .with("pages/index.html", "{{#include \"/base.html\"}}{{#def t}}{{ ) }}{{/def}}{{/include}}")
            .with("base.html", "{{#block t}}{{/block}}");
        let err = Job::new(&loader, &DefaultParser, &DefaultEngine)
            .compile("pages/index.html")
            .await
            .unwrap_err();
        assert_eq!(err.path(), "pages/index.html");
    }
}
