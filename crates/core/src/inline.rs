//! Inline tokenizer: bracket links, autolinked URIs, and span modifiers.
//!
//! Scanning always picks the earliest match in the text; when two
//! alternatives start at the same position, bracket links win over URIs,
//! which win over modifiers. Modifier delimiters are tried longest-first so
//! `'''strong'''` is never mis-read as two empty emphasis spans. All
//! matching is non-greedy to the nearest closing delimiter, and anything
//! unterminated falls through to literal text.

/// Span-modifier kinds, in tie-breaking priority order (longest delimiter
/// first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// `'''strong'''`
    Strong,
    /// `''emphasis''`
    Em,
    /// `==deleted==`
    Del,
    /// `` ``fixed-width`` ``
    Tt,
}

impl Modifier {
    pub(crate) const ALL: [Modifier; 4] = [Modifier::Strong, Modifier::Em, Modifier::Del, Modifier::Tt];

    /// The delimiter characters opening and closing this modifier.
    pub fn delimiter(self) -> &'static str {
        match self {
            Modifier::Strong => "'''",
            Modifier::Em => "''",
            Modifier::Del => "==",
            Modifier::Tt => "``",
        }
    }
}

/// A matched span modifier with its byte range and inner content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModifierMatch<'a> {
    /// Byte offset of the opening delimiter.
    pub start: usize,
    /// Byte offset one past the closing delimiter.
    pub end: usize,
    /// Which delimiter pair matched.
    pub modifier: Modifier,
    /// Content between the delimiters.
    pub inner: &'a str,
}

/// One recognized inline token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineToken<'a> {
    /// `[[...]]` content, brackets excluded.
    BracketLink(&'a str),
    /// A bare URI beginning with a known scheme.
    Uri(&'a str),
    /// A whole `delim...delim` span, delimiters included.
    ModifierSpan(&'a str),
}

/// An inline token together with its byte range in the scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineMatch<'a> {
    /// Byte offset where the token starts.
    pub start: usize,
    /// Byte offset one past the token.
    pub end: usize,
    /// The recognized token.
    pub token: InlineToken<'a>,
}

/// Finds the earliest inline token in `text`, resolving same-position ties
/// as bracket link, then URI, then modifier.
pub fn find_inline(text: &str) -> Option<InlineMatch<'_>> {
    let mut best: Option<InlineMatch<'_>> = None;
    let candidates = [
        find_bracket_link(text),
        find_uri(text),
        find_modifier(text).map(|m| InlineMatch {
            start: m.start,
            end: m.end,
            token: InlineToken::ModifierSpan(&text[m.start..m.end]),
        }),
    ];
    for candidate in candidates.into_iter().flatten() {
        let better = match &best {
            None => true,
            Some(b) => candidate.start < b.start,
        };
        if better {
            best = Some(candidate);
        }
    }
    best
}

/// Finds the earliest non-greedy `delim...delim` occurrence of `delim`,
/// requiring at least one content character.
fn find_delimited<'a>(text: &'a str, delim: &str) -> Option<(usize, usize, &'a str)> {
    find_delimited_pair(text, delim, delim)
}

/// Finds the earliest span-modifier match, trying delimiters longest-first
/// so that same-position ties go to the longer delimiter.
pub fn find_modifier(text: &str) -> Option<ModifierMatch<'_>> {
    let mut best: Option<ModifierMatch<'_>> = None;
    for modifier in Modifier::ALL {
        if let Some((start, end, inner)) = find_delimited(text, modifier.delimiter()) {
            let better = match &best {
                None => true,
                Some(b) => start < b.start,
            };
            if better {
                best = Some(ModifierMatch {
                    start,
                    end,
                    modifier,
                    inner,
                });
            }
        }
    }
    best
}

fn find_bracket_link(text: &str) -> Option<InlineMatch<'_>> {
    let (start, end, inner) = find_delimited_pair(text, "[[", "]]")?;
    Some(InlineMatch {
        start,
        end,
        token: InlineToken::BracketLink(inner),
    })
}

/// Finds the earliest `open_mark ... close_mark` span with at least one
/// content character, closing at the nearest close marker. Returns the
/// open offset, the offset past the close, and the inner content.
fn find_delimited_pair<'a>(
    text: &'a str,
    open_mark: &str,
    close_mark: &str,
) -> Option<(usize, usize, &'a str)> {
    let mut from = 0;
    while let Some(rel) = text[from..].find(open_mark) {
        let open = from + rel;
        let content_start = open + open_mark.len();
        let search = &text[content_start..];
        let close_rel = match search.find(close_mark) {
            // An immediately-adjacent close cannot terminate an empty span;
            // look for a later one instead.
            Some(0) => search[1..].find(close_mark).map(|r| r + 1),
            other => other,
        };
        if let Some(rel) = close_rel {
            let close = content_start + rel;
            return Some((open, close + close_mark.len(), &text[content_start..close]));
        }
        from = open + 1;
    }
    None
}

/// Schemes recognized for autolinking, longest spellings first so `https:`
/// is seen before `http:`.
const SCHEMES: [&str; 5] = ["https:", "http:", "ftp:", "file:", "mailto:"];

fn is_uri_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b";/?:@&=+$,-_.!~*'()#%".contains(&b)
}

fn find_uri(text: &str) -> Option<InlineMatch<'_>> {
    let mut best: Option<(usize, usize)> = None;
    for scheme in SCHEMES {
        let mut from = 0;
        while let Some(rel) = text[from..].find(scheme) {
            let start = from + rel;
            let body_start = start + scheme.len();
            let run = text.as_bytes()[body_start..]
                .iter()
                .take_while(|&&b| is_uri_byte(b))
                .count();
            if run > 0 {
                let better = best.is_none_or(|(s, _)| start < s);
                if better {
                    best = Some((start, body_start + run));
                }
                break;
            }
            from = body_start;
        }
    }
    best.map(|(start, end)| InlineMatch {
        start,
        end,
        token: InlineToken::Uri(&text[start..end]),
    })
}

/// Strips the scheme from `http:`/`https:`/`ftp:`/`file:` targets that are
/// not already protocol-relative (`scheme://`), leaving a scheme-relative
/// form. `mailto:` and everything else pass through unchanged.
pub fn fix_uri(uri: &str) -> &str {
    for scheme in ["https:", "http:", "ftp:", "file:"] {
        if let Some(rest) = uri.strip_prefix(scheme) {
            if rest.starts_with("//") {
                return uri;
            }
            return rest;
        }
    }
    uri
}

const IMAGE_EXTS: [&str; 4] = [".jpg", ".jpeg", ".gif", ".png"];

/// Whether a target's final dot-extension (case-insensitive) names a
/// raster image, making it an image embed rather than a hyperlink.
pub fn is_image_target(uri: &str) -> bool {
    let Some(dot) = uri.rfind('.') else {
        return false;
    };
    let ext = uri[dot..].to_ascii_lowercase();
    IMAGE_EXTS.contains(&ext.as_str())
}

/// Splits bracket-link content at the last `|` into title and target;
/// `None` when there is no `|` and the text serves as both.
pub fn split_link(content: &str) -> Option<(&str, &str)> {
    content
        .rfind('|')
        .map(|i| (&content[..i], &content[i + 1..]))
}
