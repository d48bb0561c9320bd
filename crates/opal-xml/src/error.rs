//! Serialization errors

use thiserror::Error;

/// Errors surfaced by the tree-serialization engine and the XML bridge
#[derive(Debug, Error)]
pub enum XmlError {
    /// Document shape the engine cannot interpret
    #[error("malformed document: {reason}")]
    Malformed {
        /// What was wrong
        reason: String,
    },

    /// Underlying XML parser failure
    #[error(transparent)]
    Parse(#[from] quick_xml::Error),

    /// Writer I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Reflection failure while walking properties
    #[error(transparent)]
    Reflect(#[from] opal_reflect::Error),
}

/// Result alias for serialization operations
pub type Result<T> = std::result::Result<T, XmlError>;
