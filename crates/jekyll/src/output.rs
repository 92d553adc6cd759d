//! The Jekyll-flavoured Markdown renderer.

use std::fmt::Write as _;
use std::mem;

use hikidown_core::{Fragment, ListKind, Renderer};

use crate::frontmatter::{FrontMatter, document_stem};
use crate::plugins::{PluginContext, PluginRegistry, dispatch_block, dispatch_inline};

/// Renders compiler events as kramdown-ready Markdown with Jekyll front
/// matter and Liquid tags.
///
/// One value can render many documents; state is cleared on `reset` and
/// drained by `finish`.
pub struct JekyllOutput {
    buf: String,
    footnotes: Vec<String>,
    registry: PluginRegistry,
    attach_dir: String,
    filename: String,
}

impl JekyllOutput {
    /// A renderer for the named source file, with the built-in plugin set.
    pub fn new(filename: &str) -> Self {
        JekyllOutput::with_registry(filename, PluginRegistry::with_builtins())
    }

    /// A renderer with a caller-supplied plugin registry.
    pub fn with_registry(filename: &str, registry: PluginRegistry) -> Self {
        JekyllOutput {
            buf: String::new(),
            footnotes: Vec::new(),
            registry,
            attach_dir: document_stem(filename).to_string(),
            filename: filename.to_string(),
        }
    }

    fn plugin_context(&mut self) -> PluginContext<'_> {
        PluginContext {
            attach_dir: &self.attach_dir,
            footnotes: &mut self.footnotes,
            registry: &self.registry,
        }
    }
}

/// Backslash-escapes a leading `#` so kramdown does not read the line as
/// a heading. Only the first non-whitespace character matters.
fn escape_markdown(text: &str) -> String {
    let trimmed = text.trim_start_matches([' ', '\t']);
    if let Some(rest) = trimmed.strip_prefix('#') {
        let lead = &text[..text.len() - trimmed.len()];
        return format!("{lead}\\#{rest}");
    }
    text.to_string()
}

impl Renderer for JekyllOutput {
    fn reset(&mut self) {
        log::debug!("rendering {}", self.filename);
        self.buf.clear();
        self.footnotes.clear();
    }

    fn finish(&mut self) -> String {
        if !self.footnotes.is_empty() {
            let _ = write!(self.buf, "\n{}\n", self.footnotes.join("\n"));
            self.footnotes.clear();
        }
        mem::take(&mut self.buf)
    }

    fn fileheader(&mut self, line: &str) {
        let front = FrontMatter::for_document(&self.filename, line);
        self.buf.push_str(&front.to_yaml_block());
        self.buf.push('\n');
    }

    fn headline(&mut self, level: usize, title: Fragment) {
        let _ = write!(self.buf, "\n{} {}\n", "#".repeat(level + 1), title);
    }

    fn list_start(&mut self) {
        self.buf.push('\n');
    }

    fn listitem(&mut self, kind: ListKind, item: Fragment, level: usize) {
        let marker = match kind {
            ListKind::Unordered => "*",
            ListKind::Ordered => "1.",
        };
        let _ = writeln!(self.buf, "{}{} {}", " ".repeat(2 * level - 2), marker, item);
    }

    fn list_end(&mut self) {
        self.buf.push('\n');
    }

    fn dlist_item(&mut self, term: Fragment, definition: Fragment) {
        if definition.is_empty() {
            let _ = write!(self.buf, "\n{term}\n");
        } else if term.is_empty() {
            let _ = writeln!(self.buf, ": {definition}");
        } else {
            let _ = write!(self.buf, "\n{term}\n: {definition}\n");
        }
    }

    fn table_open(&mut self) {
        self.buf.push('\n');
    }

    fn table_record_open(&mut self) {}

    fn table_data(&mut self, content: Fragment, _rowspan: Option<usize>, _colspan: Option<usize>) {
        let _ = write!(self.buf, "| {content}");
    }

    fn table_record_close(&mut self) {
        self.buf.push_str("|\n");
    }

    fn table_head_line(&mut self, columns: usize) {
        let _ = writeln!(self.buf, "{}|", "|---".repeat(columns));
    }

    fn table_close(&mut self) {
        self.buf.push('\n');
    }

    fn blockquote_open(&mut self) {
        self.buf.push('\n');
    }

    fn blockquote_line(&mut self, line: Fragment) {
        let _ = writeln!(self.buf, "> {}", escape_markdown(line.as_str()));
    }

    fn blockquote_close(&mut self) {
        self.buf.push('\n');
    }

    fn block_preformatted(&mut self, text: &str, language: Option<&str>) {
        let syntax = language.map(str::to_lowercase);
        let syntax = syntax.as_deref().unwrap_or("text");
        let _ = write!(
            self.buf,
            "\n{{% highlight {syntax} %}}\n{{% raw %}}\n{text}\n{{% endraw %}}\n{{% endhighlight %}}\n\n"
        );
    }

    fn preformatted(&mut self, text: &str) {
        self.block_preformatted(text, None);
    }

    fn paragraph(&mut self, lines: Vec<Fragment>) {
        self.buf.push('\n');
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                self.buf.push('\n');
            }
            self.buf.push_str(line.as_str());
        }
        self.buf.push('\n');
    }

    fn block_plugin(&mut self, source: &str) {
        let mut ctx = self.plugin_context();
        let rendered = dispatch_block(&mut ctx, source);
        let _ = writeln!(self.buf, "{rendered}");
    }

    fn text(&self, raw: &str) -> String {
        html_escape::encode_text(raw).into_owned()
    }

    fn hyperlink(&self, target: &str, title: Fragment) -> String {
        format!("[{title}]({target})")
    }

    fn image_hyperlink(&self, target: &str, alt: Option<&str>) -> String {
        let derived;
        let alt = match alt {
            Some(alt) => alt,
            None => {
                derived = target.rsplit('/').next().unwrap_or(target);
                derived
            }
        };
        format!(
            "![{}]({})",
            html_escape::encode_text(alt),
            html_escape::encode_double_quoted_attribute(target)
        )
    }

    fn strong(&self, content: Fragment) -> String {
        format!("__{content}__")
    }

    fn em(&self, content: Fragment) -> String {
        format!("_{content}_")
    }

    fn del(&self, content: Fragment) -> String {
        format!(" ~~{content}~~ ")
    }

    fn tt(&self, content: Fragment) -> String {
        format!("`{content}`")
    }

    fn inline_plugin(&mut self, source: &str) -> String {
        let mut ctx = self.plugin_context();
        dispatch_inline(&mut ctx, source)
    }
}
