use thiserror::Error;

/// Errors that abort a compilation pass.
///
/// Malformed wiki markup is never an error: unterminated plugin braces,
/// span modifiers, and bracket links all degrade to literal text. The
/// variants here indicate that the scanner and the placeholder table went
/// out of sync, which is a defect in the engine rather than in the input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A placeholder token referenced an index the vault never issued.
    #[error("placeholder index {index} out of range: the vault holds {table_len} plugin blocks")]
    UnknownPlaceholder {
        /// Index carried by the offending token.
        index: usize,
        /// Number of plugin blocks extracted during escaping.
        table_len: usize,
    },
}
