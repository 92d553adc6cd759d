//! Jekyll-flavoured Markdown rendering for Hiki wiki documents.
//!
//! Pairs the `hikidown-core` compiler with a [`Renderer`] that emits
//! kramdown Markdown carrying YAML front matter, Liquid highlight blocks,
//! and resolved wiki plugin invocations.
//!
//! ```
//! let markdown = hikidown_jekyll::to_markdown(
//!     "0042-report.hiki",
//!     "Issue 42: report\n!Hello\nplain text\n",
//! )
//! .unwrap();
//! assert!(markdown.starts_with("---\n"));
//! assert!(markdown.contains("\n## Hello\n"));
//! ```
#![deny(missing_docs)]

mod frontmatter;
mod output;
mod plugins;

pub use frontmatter::FrontMatter;
pub use output::JekyllOutput;
pub use plugins::{
    Invocation, PluginContext, PluginHandler, PluginRegistry, dispatch_block, dispatch_inline,
    parse_invocation,
};

use hikidown_core::{CompileError, CompileOptions, Compiler};

/// Compiles one Hiki document to Jekyll-ready Markdown.
///
/// `filename` names the source file; its stem drives the front matter
/// and the attachment directory used by `attach_*` plugins.
pub fn to_markdown(filename: &str, src: &str) -> Result<String, CompileError> {
    to_markdown_with_options(filename, src, CompileOptions::default())
}

/// Like [`to_markdown`], with explicit compile options.
pub fn to_markdown_with_options(
    filename: &str,
    src: &str,
    options: CompileOptions,
) -> Result<String, CompileError> {
    let mut output = JekyllOutput::new(filename);
    Compiler::with_options(&mut output, options).compile(src)
}
