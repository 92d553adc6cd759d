//! The renderer capability contract the compiler drives.
//!
//! The core never produces output syntax itself: every structural unit and
//! inline token becomes a call on [`Renderer`]. How headings, tables, or
//! plugin invocations turn into concrete markup is entirely the
//! implementation's business.

use std::fmt;

/// Accumulator for rendered inline markup.
///
/// Block and inline routines obtain one through [`Renderer::container`],
/// append already-rendered fragments to it, and release it by handing it to
/// a block-closing call such as [`Renderer::headline`] or
/// [`Renderer::paragraph`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    buf: String,
}

impl Fragment {
    /// Creates an empty fragment.
    pub fn new() -> Self {
        Fragment::default()
    }

    /// Appends an already-rendered piece of markup.
    pub fn push_markup(&mut self, markup: &str) {
        self.buf.push_str(markup);
    }

    /// Whether nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Borrows the accumulated markup.
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Consumes the fragment, returning the accumulated markup.
    pub fn into_markup(self) -> String {
        self.buf
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buf)
    }
}

/// Marker style of a list item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// A run of `*` markers.
    Unordered,
    /// A run of `#` markers.
    Ordered,
}

/// Capability set consumed by the compiler.
///
/// Implementations own the output buffer. [`reset`](Renderer::reset) is
/// invoked at the start of every compilation pass and
/// [`finish`](Renderer::finish) returns the accumulated document, so
/// consecutive passes through the same renderer are independent.
pub trait Renderer {
    /// Clears all per-document state before a new pass.
    fn reset(&mut self);
    /// Returns the accumulated output, ending the pass.
    fn finish(&mut self) -> String;

    /// Creates an empty inline accumulator.
    fn container(&self) -> Fragment {
        Fragment::new()
    }

    /// The first line of the document, passed through regardless of content.
    fn fileheader(&mut self, line: &str);
    /// A `!` heading with its 1-based level and compiled title.
    fn headline(&mut self, level: usize, title: Fragment);

    /// Opens a run of list items.
    fn list_start(&mut self);
    /// One list item with marker kind, compiled content, and 1-based
    /// nesting level equal to the marker-run length.
    fn listitem(&mut self, kind: ListKind, item: Fragment, level: usize);
    /// Closes a run of list items.
    fn list_end(&mut self);

    /// One `:term:definition` item.
    fn dlist_item(&mut self, term: Fragment, definition: Fragment);

    /// Opens a table.
    fn table_open(&mut self);
    /// Opens a table row.
    fn table_record_open(&mut self);
    /// One cell; spans are `None` unless the cell carried `^`/`>` prefixes.
    fn table_data(&mut self, content: Fragment, rowspan: Option<usize>, colspan: Option<usize>);
    /// Closes a table row.
    fn table_record_close(&mut self);
    /// Emitted once after a row that contained a `!`-flagged cell.
    fn table_head_line(&mut self, columns: usize);
    /// Closes a table.
    fn table_close(&mut self);

    /// Opens a blockquote.
    fn blockquote_open(&mut self);
    /// One quoted line with plugin placeholders already evaluated.
    fn blockquote_line(&mut self, line: Fragment);
    /// Closes a blockquote.
    fn blockquote_close(&mut self);

    /// A `<<<`-fenced literal block with its optional language tag.
    fn block_preformatted(&mut self, text: &str, language: Option<&str>);
    /// An indented literal block.
    fn preformatted(&mut self, text: &str);

    /// A paragraph as one compiled container per source line.
    fn paragraph(&mut self, lines: Vec<Fragment>);
    /// A paragraph consisting of exactly one plugin invocation.
    fn block_plugin(&mut self, source: &str);

    /// Escapes raw document text into an output-safe fragment.
    fn text(&self, raw: &str) -> String;
    /// A link with a pre-compiled title fragment.
    fn hyperlink(&self, target: &str, title: Fragment) -> String;
    /// An image embed; `alt` falls back to a renderer-chosen default.
    fn image_hyperlink(&self, target: &str, alt: Option<&str>) -> String;
    /// Strong emphasis around compiled content.
    fn strong(&self, content: Fragment) -> String;
    /// Emphasis around compiled content.
    fn em(&self, content: Fragment) -> String;
    /// Deleted text around compiled content.
    fn del(&self, content: Fragment) -> String;
    /// Fixed-width text around compiled content.
    fn tt(&self, content: Fragment) -> String;
    /// Resolves one plugin invocation into pre-rendered markup.
    fn inline_plugin(&mut self, source: &str) -> String;
}
