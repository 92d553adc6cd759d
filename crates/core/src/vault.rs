//! Plugin-block escaping and placeholder bookkeeping.
//!
//! `{{...}}` plugin invocations must not be parsed by the structural
//! grammar, so before any block classification happens every well-formed
//! plugin block is pulled out of the source and replaced by an opaque
//! placeholder token. The vault is the arena holding the extracted source
//! strings; tokens are indices into it. Blocks are restored verbatim for
//! preformatted output or resolved through the renderer everywhere else.

use std::borrow::Cow;

use crate::error::CompileError;
use crate::render::{Fragment, Renderer};

/// Marker character framing a placeholder index in escaped text.
///
/// U+FFFF is a Unicode noncharacter, so it cannot occur in interchanged
/// text; `escape` additionally strips any occurrence from its input, which
/// keeps the marker disjoint from the document alphabet.
const MARKER: char = '\u{FFFF}';

/// Typed placeholder for one extracted plugin block.
///
/// The token owns its escaped-text form: nothing else in the engine
/// assembles or inspects the marker character directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderToken {
    index: usize,
}

impl PlaceholderToken {
    /// Index into the vault's placeholder table.
    pub fn index(self) -> usize {
        self.index
    }

    /// Appends the token's escaped-text form to `out`.
    fn push_into(self, out: &mut String) {
        out.push(MARKER);
        out.push_str(&self.index.to_string());
        out.push(MARKER);
    }

    /// Parses `text` when it consists of exactly one placeholder token.
    pub fn from_exact(text: &str) -> Option<Self> {
        match parse_token_at(text, 0) {
            Some((token, end)) if end == text.len() => Some(token),
            _ => None,
        }
    }
}

/// One piece of escaped text: either a literal run or a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'t> {
    Literal(&'t str),
    Token(PlaceholderToken),
}

/// Parses a placeholder token starting at byte offset `start`, returning
/// the token and the offset one past its closing marker.
fn parse_token_at(text: &str, start: usize) -> Option<(PlaceholderToken, usize)> {
    let body = text[start..].strip_prefix(MARKER)?;
    let close = body.find(MARKER)?;
    let digits = &body[..close];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index = digits.parse().ok()?;
    let end = start + MARKER.len_utf8() + close + MARKER.len_utf8();
    Some((PlaceholderToken { index }, end))
}

/// Splits escaped text into literal runs and placeholder tokens. Empty
/// literal runs between adjacent tokens are dropped.
fn split_tokens(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(MARKER) {
        match parse_token_at(rest, start) {
            Some((token, end)) => {
                if start > 0 {
                    out.push(Segment::Literal(&rest[..start]));
                }
                out.push(Segment::Token(token));
                rest = &rest[end..];
            }
            None => {
                // Stray marker; unreachable for vault-produced text.
                let cut = start + MARKER.len_utf8();
                out.push(Segment::Literal(&rest[..cut]));
                rest = &rest[cut..];
            }
        }
    }
    if !rest.is_empty() {
        out.push(Segment::Literal(rest));
    }
    out
}

/// Checks whether plugin-block content is syntactically valid: after
/// dropping escaped backslash pairs, escaped quotes, and quoted substrings
/// (which may span lines), no stray quote character may remain.
pub fn valid_plugin_syntax(code: &str) -> bool {
    let code = code.replace("\\\\", "");
    let code = code.replace("\\'", "").replace("\\\"", "");
    let bytes = code.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\'' || b == b'"' {
            match code[i + 1..].find(b as char) {
                Some(j) => i += j + 2,
                None => return false,
            }
        } else {
            i += 1;
        }
    }
    true
}

/// Finds the closing `}}` of a plugin block in `s` (positioned just after
/// the opening `{{`). Candidates whose content fails the validity test are
/// skipped, so plugin arguments may contain a literal `}}` inside quoted
/// strings. Returns the content and the length consumed including the
/// closing marker.
fn extract_block(s: &str) -> Option<(&str, usize)> {
    let mut search = 0;
    while let Some(rel) = s[search..].find("}}") {
        let end = search + rel;
        let content = &s[..end];
        if valid_plugin_syntax(content) {
            return Some((content, end + 2));
        }
        search = end + 2;
    }
    None
}

/// Ordered table of extracted plugin blocks plus the escape, restore, and
/// evaluate operations over placeholder-bearing text.
#[derive(Debug, Default)]
pub struct PluginBlockVault {
    blocks: Vec<String>,
}

impl PluginBlockVault {
    /// Creates an empty vault.
    pub fn new() -> Self {
        PluginBlockVault::default()
    }

    /// Number of extracted plugin blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether no plugin block has been extracted yet.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Looks up a token's plugin-block source.
    ///
    /// A missing index means the scanner and the table desynchronized,
    /// which aborts the compilation.
    pub fn get(&self, token: PlaceholderToken) -> Result<&str, CompileError> {
        self.blocks
            .get(token.index)
            .map(String::as_str)
            .ok_or(CompileError::UnknownPlaceholder {
                index: token.index,
                table_len: self.blocks.len(),
            })
    }

    /// Replaces every well-formed `{{...}}` span in `raw` with a
    /// placeholder token, storing the content in the table.
    ///
    /// A `{{` with no validly-closing `}}` before end of input is left as
    /// literal text.
    pub fn escape(&mut self, raw: &str) -> String {
        let text: Cow<'_, str> = if raw.contains(MARKER) {
            Cow::Owned(raw.chars().filter(|&c| c != MARKER).collect())
        } else {
            Cow::Borrowed(raw)
        };

        let mut out = String::with_capacity(text.len());
        let mut rest = text.as_ref();
        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            match extract_block(after) {
                Some((content, consumed)) => {
                    let token = PlaceholderToken {
                        index: self.blocks.len(),
                    };
                    self.blocks.push(content.to_string());
                    token.push_into(&mut out);
                    rest = &after[consumed..];
                }
                None => {
                    out.push_str("{{");
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Replaces every placeholder token in `text` with its original
    /// `{{...}}` source, verbatim. Used for preformatted blocks where
    /// plugin syntax must be shown rather than evaluated.
    pub fn restore(&self, text: &str) -> Result<String, CompileError> {
        let mut out = String::with_capacity(text.len());
        for segment in split_tokens(text) {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Token(token) => {
                    out.push_str("{{");
                    out.push_str(self.get(token)?);
                    out.push_str("}}");
                }
            }
        }
        Ok(out)
    }

    /// Appends `text` to `buf`, escaping literal runs through the renderer
    /// and resolving placeholder tokens through its inline-plugin
    /// capability. Plugin results are appended as pre-rendered markup.
    pub fn evaluate_into<R: Renderer>(
        &self,
        text: &str,
        buf: &mut Fragment,
        output: &mut R,
    ) -> Result<(), CompileError> {
        for segment in split_tokens(text) {
            match segment {
                Segment::Literal(s) => buf.push_markup(&output.text(s)),
                Segment::Token(token) => {
                    let markup = output.inline_plugin(self.get(token)?);
                    buf.push_markup(&markup);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(vault: &mut PluginBlockVault, text: &str) -> String {
        let escaped = vault.escape(text);
        vault.restore(&escaped).unwrap()
    }

    #[test]
    fn escape_restore_round_trips() {
        let mut vault = PluginBlockVault::new();
        let text = "before {{toc}} middle {{fn('a note')}} after";
        assert_eq!(roundtrip(&mut vault, text), text);
        assert_eq!(vault.len(), 2);
    }

    #[test]
    fn escaped_text_hides_plugin_braces() {
        let mut vault = PluginBlockVault::new();
        let escaped = vault.escape("a {{br}} b");
        assert!(!escaped.contains("{{"));
        assert!(!escaped.contains("br"));
        assert_eq!(vault.get(PlaceholderToken { index: 0 }).unwrap(), "br");
    }

    #[test]
    fn quoted_close_marker_does_not_terminate() {
        let mut vault = PluginBlockVault::new();
        let escaped = vault.escape("{{foo('a}}b')}}");
        assert_eq!(vault.len(), 1);
        assert_eq!(vault.get(PlaceholderToken { index: 0 }).unwrap(), "foo('a}}b')");
        assert_eq!(vault.restore(&escaped).unwrap(), "{{foo('a}}b')}}");
    }

    #[test]
    fn unterminated_quote_never_validates() {
        let mut vault = PluginBlockVault::new();
        let escaped = vault.escape("x {{foo('a)}} y");
        assert!(vault.is_empty());
        assert_eq!(escaped, "x {{foo('a)}} y");
    }

    #[test]
    fn unterminated_brace_is_literal() {
        let mut vault = PluginBlockVault::new();
        let escaped = vault.escape("a {{oops and on");
        assert!(vault.is_empty());
        assert_eq!(escaped, "a {{oops and on");
    }

    #[test]
    fn escaped_quotes_are_ignored_by_validation() {
        assert!(valid_plugin_syntax(r"foo(\'bar)"));
        assert!(valid_plugin_syntax(r#"foo("a b", 'c d')"#));
        assert!(!valid_plugin_syntax("foo('unclosed)"));
        // A double backslash drops first, leaving the quote stray.
        assert!(!valid_plugin_syntax(r"foo(\\')"));
    }

    #[test]
    fn multiline_quoted_argument_is_one_block() {
        let mut vault = PluginBlockVault::new();
        let text = "{{fn('line one\nline two')}}";
        assert_eq!(roundtrip(&mut vault, text), text);
        assert_eq!(vault.len(), 1);
    }

    #[test]
    fn marker_characters_in_input_are_stripped() {
        let mut vault = PluginBlockVault::new();
        let escaped = vault.escape("a\u{FFFF}b {{br}}");
        assert_eq!(vault.restore(&escaped).unwrap(), "ab {{br}}");
    }

    #[test]
    fn from_exact_accepts_only_a_lone_token() {
        let mut vault = PluginBlockVault::new();
        let escaped = vault.escape("{{toc}}");
        let token = PlaceholderToken::from_exact(&escaped).unwrap();
        assert_eq!(token.index(), 0);

        let escaped = vault.escape("see {{toc}}");
        assert!(PlaceholderToken::from_exact(&escaped).is_none());
    }

    #[test]
    fn missing_index_is_an_error() {
        let vault = PluginBlockVault::new();
        let err = vault.get(PlaceholderToken { index: 3 }).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownPlaceholder {
                index: 3,
                table_len: 0
            }
        );
    }
}
