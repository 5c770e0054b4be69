//! The compiler's per-file passes.

use sable_ast::{Arena, NodeId};
use sable_lexer::ErrorReporter;
use sable_rewrite::HtmlRewriter;

/// Options controlling the rewrite pipeline.
#[derive(Clone, Debug, Default)]
pub struct RewriteOptions {
    /// Experimental feature names, as passed on the command line.
    pub experimental_features: Vec<String>,
}

impl RewriteOptions {
    /// Enables an experimental feature.
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.experimental_features.push(feature.into());
        self
    }

    /// Enables strict HTML rewriting (the `stricthtml` feature).
    pub fn with_strict_html(self) -> Self {
        self.with_feature("stricthtml")
    }
}

/// A pass over one parsed file.
pub trait FilePass {
    fn name(&self) -> &'static str;

    /// Runs the pass; errors go through the reporter, never out of here.
    fn run(&self, arena: &mut Arena, file: NodeId, reporter: &mut ErrorReporter);
}

/// The contextual HTML rewriter as a file pass.
pub struct HtmlRewritePass {
    rewriter: HtmlRewriter,
}

impl HtmlRewritePass {
    pub fn new(options: &RewriteOptions) -> Self {
        Self {
            rewriter: HtmlRewriter::new(&options.experimental_features),
        }
    }
}

impl FilePass for HtmlRewritePass {
    fn name(&self) -> &'static str {
        "html-rewrite"
    }

    fn run(&self, arena: &mut Arena, file: NodeId, reporter: &mut ErrorReporter) {
        self.rewriter.run(arena, file, reporter);
    }
}

/// Runs the pass pipeline over one file.
pub struct PassRunner {
    passes: Vec<Box<dyn FilePass>>,
}

impl PassRunner {
    pub fn new(options: &RewriteOptions) -> Self {
        Self {
            passes: vec![Box::new(HtmlRewritePass::new(options))],
        }
    }

    pub fn run(&self, arena: &mut Arena, file: NodeId, reporter: &mut ErrorReporter) {
        for pass in &self.passes {
            tracing::debug!(pass = pass.name(), "running file pass");
            pass.run(arena, file, reporter);
        }
    }
}
