//! The compilation driver: block classification, dispatch, and inline
//! compilation against a [`Renderer`].

use crate::block::{self, BlockKind};
use crate::cursor::LineCursor;
use crate::error::CompileError;
use crate::inline::{self, InlineToken, Modifier};
use crate::render::{Fragment, ListKind, Renderer};
use crate::vault::{PlaceholderToken, PluginBlockVault};

/// Options controlling a compilation pass.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Level assigned to a single-`!` headline; deeper runs add to it, and
    /// runs longer than `7 - base_level` are capped.
    pub base_level: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions { base_level: 1 }
    }
}

/// Compiles one wiki document per invocation, driving calls into a
/// [`Renderer`].
///
/// A pass is purely synchronous: escape plugin blocks, classify and
/// dispatch line runs, tokenize inline content, render. The renderer is
/// reset at the start of every pass so consecutive invocations are
/// independent.
pub struct Compiler<'r, R: Renderer> {
    output: &'r mut R,
    options: CompileOptions,
    vault: PluginBlockVault,
}

impl<'r, R: Renderer> Compiler<'r, R> {
    /// Creates a compiler with default options.
    pub fn new(output: &'r mut R) -> Self {
        Compiler::with_options(output, CompileOptions::default())
    }

    /// Creates a compiler with explicit options.
    pub fn with_options(output: &'r mut R, options: CompileOptions) -> Self {
        Compiler {
            output,
            options,
            vault: PluginBlockVault::new(),
        }
    }

    /// Runs one full pass over `src` and returns the renderer's output.
    pub fn compile(&mut self, src: &str) -> Result<String, CompileError> {
        self.output.reset();
        self.vault = PluginBlockVault::new();
        let escaped = self.vault.escape(src);
        self.compile_blocks(&escaped)?;
        Ok(self.output.finish())
    }

    fn compile_blocks(&mut self, src: &str) -> Result<(), CompileError> {
        let mut f = LineCursor::new(src);
        // The first line is always the file header, whatever it looks like.
        if let Some(first) = f.gets() {
            self.output.fileheader(first);
        }
        while let Some(line) = f.gets() {
            match block::classify(line) {
                BlockKind::Comment | BlockKind::Blank => {}
                BlockKind::Header => self.compile_header(line)?,
                BlockKind::List => {
                    f.ungets(line);
                    self.compile_list(&mut f)?;
                }
                BlockKind::DList => {
                    f.ungets(line);
                    self.compile_dlist(&mut f)?;
                }
                BlockKind::Table => {
                    f.ungets(line);
                    self.compile_table(&mut f)?;
                }
                BlockKind::Blockquote => {
                    f.ungets(line);
                    self.compile_blockquote(&mut f)?;
                }
                BlockKind::IndentedPre => {
                    f.ungets(line);
                    self.compile_indented_pre(&mut f)?;
                }
                BlockKind::FencedPreOpen => self.compile_fenced_pre(line, &mut f)?,
                BlockKind::Paragraph => {
                    f.ungets(line);
                    self.compile_paragraph(&mut f)?;
                }
            }
        }
        Ok(())
    }

    fn compile_header(&mut self, line: &str) -> Result<(), CompileError> {
        let max_run = 7usize.saturating_sub(self.options.base_level).max(1);
        let run = line
            .bytes()
            .take_while(|&b| b == b'!')
            .count()
            .min(max_run);
        let level = self.options.base_level + run - 1;
        let title = self.compile_inline(strip(&line[run..]))?;
        self.output.headline(level, title);
        Ok(())
    }

    fn compile_list(&mut self, f: &mut LineCursor<'_>) -> Result<(), CompileError> {
        self.output.list_start();
        while let Some(line) = f.next_if(block::is_list) {
            let kind = if line.starts_with('*') {
                ListKind::Unordered
            } else {
                ListKind::Ordered
            };
            let run = line
                .bytes()
                .take_while(|&b| matches!(b, b'*' | b'#'))
                .count();
            let item = self.compile_inline(strip(&line[run..]))?;
            self.output.listitem(kind, item, run);
        }
        self.output.list_end();
        Ok(())
    }

    fn compile_dlist(&mut self, f: &mut LineCursor<'_>) -> Result<(), CompileError> {
        while let Some(line) = f.next_if(block::is_dlist) {
            let (term, definition) = block::split_dlist_item(&line[1..]);
            let term = self.compile_inline(term)?;
            let definition = self.compile_inline(definition)?;
            self.output.dlist_item(term, definition);
            skip_comments(f);
        }
        Ok(())
    }

    fn compile_table(&mut self, f: &mut LineCursor<'_>) -> Result<(), CompileError> {
        let mut rows = Vec::new();
        while let Some(line) = f.next_if(block::is_table) {
            rows.push(line);
            skip_comments(f);
        }
        self.output.table_open();
        for row in rows {
            self.output.table_record_open();
            let columns = block::split_columns(&row[2..]);
            let column_count = columns.len();
            let mut have_header = false;
            for column in columns {
                let cell = block::parse_cell(column);
                if cell.header {
                    have_header = true;
                }
                let content = self.compile_inline(cell.text)?;
                self.output.table_data(content, cell.rowspan, cell.colspan);
            }
            self.output.table_record_close();
            if have_header {
                self.output.table_head_line(column_count);
            }
        }
        self.output.table_close();
        Ok(())
    }

    fn compile_blockquote(&mut self, f: &mut LineCursor<'_>) -> Result<(), CompileError> {
        self.output.blockquote_open();
        while let Some(line) = f.next_if(block::is_blockquote) {
            let body = strip_blockquote_prefix(line);
            let mut buf = self.output.container();
            self.vault.evaluate_into(body, &mut buf, self.output)?;
            self.output.blockquote_line(buf);
            skip_comments(f);
        }
        self.output.blockquote_close();
        Ok(())
    }

    fn compile_indented_pre(&mut self, f: &mut LineCursor<'_>) -> Result<(), CompileError> {
        let lines = f.span(block::is_indented_pre);
        let mut text = String::new();
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                text.push('\n');
            }
            // The classifying space or tab is one byte; drop it, then the
            // trailing whitespace.
            text.push_str(rstrip(&line[1..]));
        }
        let text = self.vault.restore(&text)?;
        self.output.preformatted(&text);
        Ok(())
    }

    fn compile_fenced_pre(
        &mut self,
        open_line: &str,
        f: &mut LineCursor<'_>,
    ) -> Result<(), CompileError> {
        let language = fence_language(open_line);
        let body = f.take_through(block::is_fenced_pre_close);
        let text = self.vault.restore(&body.join("\n"))?;
        self.output.block_preformatted(&text, language);
        Ok(())
    }

    fn compile_paragraph(&mut self, f: &mut LineCursor<'_>) -> Result<(), CompileError> {
        let mut lines = f.take_until(block::ends_paragraph);
        lines.retain(|line| !block::is_comment(line));
        if lines.len() == 1
            && let Some(token) = PlaceholderToken::from_exact(strip(lines[0]))
        {
            // A lone plugin invocation occupies the whole paragraph and is
            // treated as block structure, not inline content.
            let source = self.vault.get(token)?.to_string();
            self.output.block_plugin(&source);
            return Ok(());
        }
        let mut rendered = Vec::with_capacity(lines.len());
        for line in lines {
            rendered.push(self.compile_inline(lstrip(line))?);
        }
        self.output.paragraph(rendered);
        Ok(())
    }

    /// Compiles inline markup into a fresh container.
    fn compile_inline(&mut self, text: &str) -> Result<Fragment, CompileError> {
        let mut buf = self.output.container();
        self.compile_inline_into(text, &mut buf)?;
        Ok(buf)
    }

    fn compile_inline_into(
        &mut self,
        mut text: &str,
        buf: &mut Fragment,
    ) -> Result<(), CompileError> {
        while let Some(m) = inline::find_inline(text) {
            self.vault.evaluate_into(&text[..m.start], buf, self.output)?;
            match m.token {
                InlineToken::BracketLink(content) => {
                    let markup = self.compile_bracket_link(content)?;
                    buf.push_markup(&markup);
                }
                InlineToken::Uri(uri) => {
                    let markup = self.compile_uri_autolink(uri);
                    buf.push_markup(&markup);
                }
                InlineToken::ModifierSpan(span) => {
                    let inner = self.compile_modifier(span)?;
                    buf.push_markup(inner.as_str());
                }
            }
            text = &text[m.end..];
        }
        self.vault.evaluate_into(text, buf, self.output)
    }

    /// Compiles span modifiers in `text`. Used both for matched modifier
    /// chunks and for bracket-link titles, which admit modifiers but not
    /// nested links.
    fn compile_modifier(&mut self, mut text: &str) -> Result<Fragment, CompileError> {
        let mut buf = self.output.container();
        while let Some(m) = inline::find_modifier(text) {
            self.vault
                .evaluate_into(&text[..m.start], &mut buf, self.output)?;
            let content = self.compile_inline(m.inner)?;
            let markup = match m.modifier {
                Modifier::Strong => self.output.strong(content),
                Modifier::Em => self.output.em(content),
                Modifier::Del => self.output.del(content),
                Modifier::Tt => self.output.tt(content),
            };
            buf.push_markup(&markup);
            text = &text[m.end..];
        }
        self.vault.evaluate_into(text, &mut buf, self.output)?;
        Ok(buf)
    }

    fn compile_bracket_link(&mut self, link: &str) -> Result<String, CompileError> {
        if let Some((title, target)) = inline::split_link(link) {
            let fixed = inline::fix_uri(target);
            if inline::is_image_target(target) {
                Ok(self.output.image_hyperlink(fixed, Some(title)))
            } else {
                let title = self.compile_modifier(title)?;
                Ok(self.output.hyperlink(fixed, title))
            }
        } else {
            let fixed = inline::fix_uri(link);
            if inline::is_image_target(link) {
                Ok(self.output.image_hyperlink(fixed, None))
            } else {
                let mut title = self.output.container();
                title.push_markup(&self.output.text(link));
                Ok(self.output.hyperlink(fixed, title))
            }
        }
    }

    fn compile_uri_autolink(&mut self, uri: &str) -> String {
        let fixed = inline::fix_uri(uri);
        if inline::is_image_target(uri) {
            self.output.image_hyperlink(fixed, None)
        } else {
            let mut title = self.output.container();
            title.push_markup(&self.output.text(uri));
            self.output.hyperlink(fixed, title)
        }
    }
}

fn skip_comments(f: &mut LineCursor<'_>) {
    while f.next_if(block::is_comment).is_some() {}
}

/// Strips the `""` quote marker plus at most one following space or tab.
fn strip_blockquote_prefix(line: &str) -> &str {
    let rest = &line[2..];
    rest.strip_prefix([' ', '\t']).unwrap_or(rest)
}

/// Extracts the optional `\w+` language tag from a `<<<` opener.
fn fence_language(open_line: &str) -> Option<&str> {
    let rest = open_line[3..].trim_start();
    let len = rest
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count();
    (len > 0).then(|| &rest[..len])
}

fn is_strippable(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '\x0B' | '\x0C')
}

fn rstrip(s: &str) -> &str {
    s.trim_end_matches(is_strippable)
}

fn lstrip(s: &str) -> &str {
    s.trim_start_matches(is_strippable)
}

fn strip(s: &str) -> &str {
    rstrip(lstrip(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every renderer call as one line of a transcript.
    #[derive(Default)]
    struct RecordingRenderer {
        calls: Vec<String>,
    }

    impl RecordingRenderer {
        fn new() -> Self {
            RecordingRenderer::default()
        }
    }

    impl Renderer for RecordingRenderer {
        fn reset(&mut self) {
            self.calls.clear();
        }

        fn finish(&mut self) -> String {
            self.calls.join("\n")
        }

        fn fileheader(&mut self, line: &str) {
            self.calls.push(format!("fileheader({line})"));
        }

        fn headline(&mut self, level: usize, title: Fragment) {
            self.calls.push(format!("headline({level}, {title})"));
        }

        fn list_start(&mut self) {
            self.calls.push("list_start".into());
        }

        fn listitem(&mut self, kind: ListKind, item: Fragment, level: usize) {
            let kind = match kind {
                ListKind::Unordered => "ul",
                ListKind::Ordered => "ol",
            };
            self.calls.push(format!("listitem({kind}, {item}, {level})"));
        }

        fn list_end(&mut self) {
            self.calls.push("list_end".into());
        }

        fn dlist_item(&mut self, term: Fragment, definition: Fragment) {
            self.calls.push(format!("dlist_item({term}, {definition})"));
        }

        fn table_open(&mut self) {
            self.calls.push("table_open".into());
        }

        fn table_record_open(&mut self) {
            self.calls.push("record_open".into());
        }

        fn table_data(&mut self, content: Fragment, rowspan: Option<usize>, colspan: Option<usize>) {
            self.calls
                .push(format!("data({content}, rs={rowspan:?}, cs={colspan:?})"));
        }

        fn table_record_close(&mut self) {
            self.calls.push("record_close".into());
        }

        fn table_head_line(&mut self, columns: usize) {
            self.calls.push(format!("head_line({columns})"));
        }

        fn table_close(&mut self) {
            self.calls.push("table_close".into());
        }

        fn blockquote_open(&mut self) {
            self.calls.push("bq_open".into());
        }

        fn blockquote_line(&mut self, line: Fragment) {
            self.calls.push(format!("bq_line({line})"));
        }

        fn blockquote_close(&mut self) {
            self.calls.push("bq_close".into());
        }

        fn block_preformatted(&mut self, text: &str, language: Option<&str>) {
            self.calls
                .push(format!("block_pre({text:?}, {language:?})"));
        }

        fn preformatted(&mut self, text: &str) {
            self.calls.push(format!("pre({text:?})"));
        }

        fn paragraph(&mut self, lines: Vec<Fragment>) {
            let lines: Vec<String> = lines.into_iter().map(Fragment::into_markup).collect();
            self.calls.push(format!("paragraph({lines:?})"));
        }

        fn block_plugin(&mut self, source: &str) {
            self.calls.push(format!("block_plugin({source})"));
        }

        fn text(&self, raw: &str) -> String {
            raw.to_string()
        }

        fn hyperlink(&self, target: &str, title: Fragment) -> String {
            format!("<a {target}>{title}</a>")
        }

        fn image_hyperlink(&self, target: &str, alt: Option<&str>) -> String {
            format!("<img {target} alt={alt:?}>")
        }

        fn strong(&self, content: Fragment) -> String {
            format!("<strong>{content}</strong>")
        }

        fn em(&self, content: Fragment) -> String {
            format!("<em>{content}</em>")
        }

        fn del(&self, content: Fragment) -> String {
            format!("<del>{content}</del>")
        }

        fn tt(&self, content: Fragment) -> String {
            format!("<tt>{content}</tt>")
        }

        fn inline_plugin(&mut self, source: &str) -> String {
            format!("<plugin {source}>")
        }
    }

    fn transcript(src: &str) -> Vec<String> {
        let mut renderer = RecordingRenderer::new();
        let out = Compiler::new(&mut renderer).compile(src).unwrap();
        out.lines().map(str::to_string).collect()
    }

    #[test]
    fn first_line_is_always_the_fileheader() {
        let calls = transcript("!not a headline\ntext");
        assert_eq!(calls[0], "fileheader(!not a headline)");
        assert_eq!(calls[1], "paragraph([\"text\"])");
    }

    #[test]
    fn headline_levels_follow_run_length() {
        let calls = transcript("t\n!one\n!!two");
        assert_eq!(calls[1], "headline(1, one)");
        assert_eq!(calls[2], "headline(2, two)");
    }

    #[test]
    fn headline_run_is_capped() {
        let calls = transcript("t\n!!!!!!!!seven");
        // More than six markers: the extras stay in the title text.
        assert_eq!(calls[1], "headline(6, !!seven)");
    }

    #[test]
    fn list_nesting_levels_and_kinds() {
        let calls = transcript("t\n*a\n**b\n#c");
        assert_eq!(
            &calls[1..],
            [
                "list_start",
                "listitem(ul, a, 1)",
                "listitem(ul, b, 2)",
                "listitem(ol, c, 1)",
                "list_end",
            ]
        );
    }

    #[test]
    fn list_stops_at_non_matching_line() {
        let calls = transcript("t\n*a\nprose");
        assert_eq!(
            &calls[1..],
            [
                "list_start",
                "listitem(ul, a, 1)",
                "list_end",
                "paragraph([\"prose\"])",
            ]
        );
    }

    #[test]
    fn dlist_splits_term_and_definition() {
        let calls = transcript("t\n:term:def");
        assert_eq!(calls[1], "dlist_item(term, def)");
    }

    #[test]
    fn dlist_survives_interleaved_comments() {
        let calls = transcript("t\n:a:1\n// note\n:b:2");
        assert_eq!(calls[1], "dlist_item(a, 1)");
        assert_eq!(calls[2], "dlist_item(b, 2)");
    }

    #[test]
    fn dlist_colon_inside_link_does_not_split() {
        let calls = transcript("t\n:[[a:b]]:def");
        assert_eq!(calls[1], "dlist_item(<a a:b>a:b</a>, def)");
    }

    #[test]
    fn table_spans_and_cells() {
        let calls = transcript("t\n||>^^foo||bar");
        assert_eq!(
            &calls[1..],
            [
                "table_open",
                "record_open",
                "data(foo, rs=Some(3), cs=Some(2))",
                "data(bar, rs=None, cs=None)",
                "record_close",
                "table_close",
            ]
        );
    }

    #[test]
    fn table_header_row_emits_head_line_once() {
        let calls = transcript("t\n||!a||!b\n||1||2");
        assert_eq!(
            &calls[1..],
            [
                "table_open",
                "record_open",
                "data(a, rs=None, cs=None)",
                "data(b, rs=None, cs=None)",
                "record_close",
                "head_line(2)",
                "record_open",
                "data(1, rs=None, cs=None)",
                "data(2, rs=None, cs=None)",
                "record_close",
                "table_close",
            ]
        );
    }

    #[test]
    fn blockquote_groups_lines() {
        let calls = transcript("t\n\"\" one\n\"\"two");
        assert_eq!(&calls[1..], ["bq_open", "bq_line(one)", "bq_line(two)", "bq_close"]);
    }

    #[test]
    fn indented_pre_strips_one_leading_char() {
        let calls = transcript("t\n  two spaces\n\tone tab  ");
        assert_eq!(calls[1], "pre(\" two spaces\\none tab\")");
    }

    #[test]
    fn fenced_pre_with_language_tag() {
        let calls = transcript("t\n<<< ruby\nputs 1\n>>>\nafter");
        assert_eq!(calls[1], "block_pre(\"puts 1\", Some(\"ruby\"))");
        assert_eq!(calls[2], "paragraph([\"after\"])");
    }

    #[test]
    fn fenced_pre_shows_plugin_syntax_literally() {
        let calls = transcript("t\n<<<\n{{br}}\n>>>");
        assert_eq!(calls[1], "block_pre(\"{{br}}\", None)");
    }

    #[test]
    fn paragraph_groups_until_blank() {
        let calls = transcript("t\nline one\nline two\n\nline three");
        assert_eq!(calls[1], "paragraph([\"line one\", \"line two\"])");
        assert_eq!(calls[2], "paragraph([\"line three\"])");
    }

    #[test]
    fn paragraph_filters_comment_lines() {
        let calls = transcript("t\na\n// hidden\nb");
        assert_eq!(calls[1], "paragraph([\"a\", \"b\"])");
    }

    #[test]
    fn lone_plugin_paragraph_becomes_block_plugin() {
        let calls = transcript("t\n\n{{toc}}\n");
        assert_eq!(calls[1], "block_plugin(toc)");
    }

    #[test]
    fn plugin_with_surrounding_prose_stays_inline() {
        let calls = transcript("t\nsee {{toc}} here");
        assert_eq!(calls[1], "paragraph([\"see <plugin toc> here\"])");
    }

    #[test]
    fn strong_is_single_span() {
        let calls = transcript("t\n'''bold'''");
        assert_eq!(calls[1], "paragraph([\"<strong>bold</strong>\"])");
    }

    #[test]
    fn link_nests_inside_strong() {
        let calls = transcript("t\n'''[[title|target]]'''");
        assert_eq!(
            calls[1],
            "paragraph([\"<strong><a target>title</a></strong>\"])"
        );
    }

    #[test]
    fn modifier_nests_inside_link_title() {
        let calls = transcript("t\n[[''em''|target]]");
        assert_eq!(calls[1], "paragraph([\"<a target><em>em</em></a>\"])");
    }

    #[test]
    fn autolink_and_image_detection() {
        let calls = transcript("t\nsee http://e.com/a.png and http://e.com/b");
        assert_eq!(
            calls[1],
            "paragraph([\"see <img http://e.com/a.png alt=None> and <a http://e.com/b>http://e.com/b</a>\"])"
        );
    }

    #[test]
    fn bracket_link_image_keeps_title_as_alt() {
        let calls = transcript("t\n[[shot|img/shot.png]]");
        assert_eq!(
            calls[1],
            "paragraph([\"<img img/shot.png alt=Some(\\\"shot\\\")>\"])"
        );
    }

    #[test]
    fn scheme_relative_normalization_in_links() {
        let calls = transcript("t\n[[page|http:FrontPage]]");
        assert_eq!(calls[1], "paragraph([\"<a FrontPage>page</a>\"])");
    }

    #[test]
    fn unterminated_markup_degrades_to_text() {
        let calls = transcript("t\n''dangling and [[open");
        assert_eq!(calls[1], "paragraph([\"''dangling and [[open\"])");
    }

    #[test]
    fn consecutive_passes_are_independent() {
        let mut renderer = RecordingRenderer::new();
        let mut compiler = Compiler::new(&mut renderer);
        let first = compiler.compile("t\n*a").unwrap();
        let second = compiler.compile("t\n*a").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn base_level_offsets_headlines() {
        let mut renderer = RecordingRenderer::new();
        let options = CompileOptions { base_level: 2 };
        let out = Compiler::with_options(&mut renderer, options)
            .compile("t\n!one")
            .unwrap();
        assert!(out.lines().any(|l| l == "headline(2, one)"));
    }
}
