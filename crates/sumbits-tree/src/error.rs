//! Error types for tree construction

use thiserror::Error;

/// Result type for tree operations
pub type TreeResult<T> = std::result::Result<T, TreeError>;

/// Errors that can occur while sizing, splitting or building a tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// A popcount tree needs at least one input bit
    #[error("Invalid width: {0} (at least one input bit is required)")]
    InvalidWidth(usize),
}
