//! Block-level line classification and splitting helpers.
//!
//! Each line of the escaped document is matched against an anchored pattern
//! per block kind, in a fixed priority order. Order matters: the blank-line
//! check must run before the paragraph fallback, and a `!` heading must win
//! over the paragraph default.

/// Structural kind of a single source line, in classification priority
/// order. [`Paragraph`](BlockKind::Paragraph) is the fallback when no
/// other pattern matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// `//` comment, consumed and discarded.
    Comment,
    /// `!` heading.
    Header,
    /// `*`/`#` list item.
    List,
    /// `:` definition-list item.
    DList,
    /// `||` table row.
    Table,
    /// `""` blockquote line.
    Blockquote,
    /// Line indented by a space or tab, preformatted.
    IndentedPre,
    /// `<<<` fenced-preformatted opener.
    FencedPreOpen,
    /// Empty line.
    Blank,
    /// Anything else.
    Paragraph,
}

/// Classifies one line by trying each anchored pattern in priority order.
pub fn classify(line: &str) -> BlockKind {
    if is_comment(line) {
        BlockKind::Comment
    } else if is_header(line) {
        BlockKind::Header
    } else if is_list(line) {
        BlockKind::List
    } else if is_dlist(line) {
        BlockKind::DList
    } else if is_table(line) {
        BlockKind::Table
    } else if is_blockquote(line) {
        BlockKind::Blockquote
    } else if is_indented_pre(line) {
        BlockKind::IndentedPre
    } else if is_fenced_pre_open(line) {
        BlockKind::FencedPreOpen
    } else if is_blank(line) {
        BlockKind::Blank
    } else {
        BlockKind::Paragraph
    }
}

pub(crate) fn is_comment(line: &str) -> bool {
    line.starts_with("//")
}

pub(crate) fn is_header(line: &str) -> bool {
    line.starts_with('!')
}

pub(crate) fn is_list(line: &str) -> bool {
    line.starts_with(['*', '#'])
}

pub(crate) fn is_dlist(line: &str) -> bool {
    line.starts_with(':')
}

pub(crate) fn is_table(line: &str) -> bool {
    line.starts_with("||")
}

pub(crate) fn is_blockquote(line: &str) -> bool {
    line.starts_with("\"\"")
}

pub(crate) fn is_indented_pre(line: &str) -> bool {
    line.starts_with([' ', '\t'])
}

pub(crate) fn is_fenced_pre_open(line: &str) -> bool {
    line.starts_with("<<<")
}

pub(crate) fn is_fenced_pre_close(line: &str) -> bool {
    line.starts_with(">>>")
}

pub(crate) fn is_blank(line: &str) -> bool {
    line.is_empty()
}

/// A paragraph ends at a blank line or at any other block start. Comments
/// are not terminators; they are filtered out of the paragraph body.
pub(crate) fn ends_paragraph(line: &str) -> bool {
    is_blank(line)
        || is_header(line)
        || is_list(line)
        || is_dlist(line)
        || is_blockquote(line)
        || is_table(line)
        || is_indented_pre(line)
        || is_fenced_pre_open(line)
}

/// Splits a table-row body (prefix `||` already removed) into cells,
/// dropping the trailing empty cells produced by a closing `||`.
pub(crate) fn split_columns(body: &str) -> Vec<&str> {
    let mut cols: Vec<&str> = body.split("||").collect();
    while cols.last().is_some_and(|c| c.is_empty()) {
        cols.pop();
    }
    cols
}

/// One parsed table cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TableCell<'a> {
    /// The cell carried a `!` prefix, marking its row as a header row.
    pub header: bool,
    /// Row span from `^` prefix characters, count plus one.
    pub rowspan: Option<usize>,
    /// Column span from `>` prefix characters, count plus one.
    pub colspan: Option<usize>,
    /// Remaining cell text.
    pub text: &'a str,
}

/// Parses a cell's `!` header flag and `^`/`>` span prefix. The absence of
/// a span character means no span attribute, not a span of zero.
pub(crate) fn parse_cell(col: &str) -> TableCell<'_> {
    let (header, rest) = match col.strip_prefix('!') {
        Some(rest) => (true, rest),
        None => (false, col),
    };
    let span_len = rest
        .bytes()
        .take_while(|b| matches!(b, b'^' | b'>'))
        .count();
    let (span, text) = rest.split_at(span_len);
    let rows = span.bytes().filter(|&b| b == b'^').count();
    let cols = span.bytes().filter(|&b| b == b'>').count();
    TableCell {
        header,
        rowspan: (rows > 0).then(|| rows + 1),
        colspan: (cols > 0).then(|| cols + 1),
        text,
    }
}

/// Splits a definition line (prefix `:` already removed) at the first `:`
/// that is not inside a `[[...]]` bracket link. Without such a colon the
/// whole line is the term and the definition is empty.
pub(crate) fn split_dlist_item(line: &str) -> (&str, &str) {
    let bytes = line.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b':' {
            return (&line[..i], &line[i + 1..]);
        }
        if bytes[i] == b'['
            && bytes.get(i + 1) == Some(&b'[')
            && let Some(close) = line[i + 2..].find("]]")
            && close >= 1
        {
            i += 2 + close + 2;
            continue;
        }
        // Advance one byte; UTF-8 continuation bytes never equal the ASCII
        // bytes tested above, and slicing only happens at ASCII positions.
        i += 1;
    }
    (line, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_each_kind() {
        assert_eq!(classify("// note"), BlockKind::Comment);
        assert_eq!(classify("!Title"), BlockKind::Header);
        assert_eq!(classify("*item"), BlockKind::List);
        assert_eq!(classify("#item"), BlockKind::List);
        assert_eq!(classify(":term:def"), BlockKind::DList);
        assert_eq!(classify("||a||b"), BlockKind::Table);
        assert_eq!(classify("\"\" quoted"), BlockKind::Blockquote);
        assert_eq!(classify(" indented"), BlockKind::IndentedPre);
        assert_eq!(classify("\tindented"), BlockKind::IndentedPre);
        assert_eq!(classify("<<< ruby"), BlockKind::FencedPreOpen);
        assert_eq!(classify(""), BlockKind::Blank);
        assert_eq!(classify("plain prose"), BlockKind::Paragraph);
    }

    #[test]
    fn blank_is_not_shadowed_by_paragraph() {
        assert_ne!(classify(""), BlockKind::Paragraph);
    }

    #[test]
    fn split_columns_drops_trailing_closer() {
        assert_eq!(split_columns("a||b||"), vec!["a", "b"]);
        assert_eq!(split_columns("a||b"), vec!["a", "b"]);
        assert_eq!(split_columns("a||||"), vec!["a"]);
    }

    #[test]
    fn parse_cell_counts_spans() {
        let cell = parse_cell(">^^foo");
        assert_eq!(
            cell,
            TableCell {
                header: false,
                rowspan: Some(3),
                colspan: Some(2),
                text: "foo",
            }
        );
    }

    #[test]
    fn parse_cell_header_flag_precedes_spans() {
        let cell = parse_cell("!>foo");
        assert!(cell.header);
        assert_eq!(cell.colspan, Some(2));
        assert_eq!(cell.rowspan, None);
        assert_eq!(cell.text, "foo");
    }

    #[test]
    fn parse_cell_without_prefixes() {
        let cell = parse_cell("plain");
        assert_eq!(
            cell,
            TableCell {
                header: false,
                rowspan: None,
                colspan: None,
                text: "plain",
            }
        );
    }

    #[test]
    fn dlist_split_at_first_colon() {
        assert_eq!(split_dlist_item("term:definition"), ("term", "definition"));
        assert_eq!(split_dlist_item("no definition"), ("no definition", ""));
    }

    #[test]
    fn dlist_split_skips_bracket_links() {
        assert_eq!(
            split_dlist_item("[[a:b]]:def"),
            ("[[a:b]]", "def")
        );
        assert_eq!(
            split_dlist_item("see [[x|http://e.com/]]:it"),
            ("see [[x|http://e.com/]]", "it")
        );
    }
}
