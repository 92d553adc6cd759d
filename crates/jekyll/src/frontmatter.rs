//! Jekyll front-matter emission.
//!
//! Every compiled document opens with a `---`-delimited YAML block derived
//! from the source file name and the document's first line. Source files
//! are named `NNNN.hiki` for an issue index and `NNNN-tag.hiki` for an
//! article.

use serde::{Deserialize, Serialize};

/// The YAML front-matter block emitted ahead of every document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrontMatter {
    /// Jekyll layout name.
    pub layout: String,
    /// Full document title, taken from the first source line.
    pub title: String,
    /// Abbreviated title used in listings.
    pub short_title: String,
    /// Space-separated Jekyll tags.
    pub tags: String,
}

impl FrontMatter {
    /// Builds the front matter for a document from its source file name
    /// and first line.
    pub fn for_document(filename: &str, first_line: &str) -> Self {
        let stem = document_stem(filename);
        let issue = stem.split('-').next().unwrap_or(stem);
        let article = stem.split('-').nth(1).unwrap_or("");
        // Full-width colons keep the title from reading as a YAML mapping
        // in downstream tooling that re-parses the block loosely.
        let title = first_line.replace(':', "：");
        let tags = if is_index_stem(stem) {
            format!("{issue} index")
        } else {
            format!("{issue} {article}")
        };
        FrontMatter {
            layout: "post".to_string(),
            short_title: title.clone(),
            title,
            tags,
        }
    }

    /// Renders the `---`-delimited YAML block.
    pub fn to_yaml_block(&self) -> String {
        // Serializing a struct of strings cannot fail.
        let body = serde_yaml::to_string(self).unwrap_or_default();
        format!("---\n{body}---\n")
    }
}

/// The source file's base name without its `.hiki` extension; also the
/// name of the document's attachment directory.
pub(crate) fn document_stem(filename: &str) -> &str {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    base.strip_suffix(".hiki").unwrap_or(base)
}

/// Whether a stem names an issue index (`NNNN`) rather than an article.
fn is_index_stem(stem: &str) -> bool {
    stem.len() == 4 && stem.bytes().all(|b| b.is_ascii_digit())
}
