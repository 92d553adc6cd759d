#![deny(missing_docs)]
//! hikidown core: a line-oriented wiki-markup compilation engine.
//!
//! The engine scans a document block-by-block and line-by-line, driving
//! calls into a pluggable [`Renderer`]. Plugin invocations (`{{...}}`) are
//! escaped behind placeholder tokens before structural parsing and restored
//! or evaluated on demand.

/// Block-level line classification.
pub mod block;
/// The compilation driver.
pub mod compiler;
/// Pull-based line reading with pushback.
pub mod cursor;
/// Compilation error types.
pub mod error;
/// Inline tokenization: links, URIs, span modifiers.
pub mod inline;
/// The renderer capability contract.
pub mod render;
/// Plugin-block escaping and placeholder bookkeeping.
pub mod vault;

pub use block::{BlockKind, classify};
pub use compiler::{CompileOptions, Compiler};
pub use cursor::LineCursor;
pub use error::CompileError;
pub use inline::{InlineMatch, InlineToken, Modifier, ModifierMatch, find_inline, find_modifier};
pub use render::{Fragment, ListKind, Renderer};
pub use vault::{PlaceholderToken, PluginBlockVault, valid_plugin_syntax};
