//! Error types for the shared model

/// Errors raised while constructing or decoding model values
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Hash bytes of the wrong size
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidHashLength {
        /// Required length
        expected: usize,
        /// Supplied length
        actual: usize,
    },

    /// Hash text is not hex
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Search evidence violates its shape constraints
    #[error("invalid evidence: {0}")]
    InvalidEvidence(String),

    /// A label that maps to no known category
    #[error("unknown label: '{0}'")]
    UnknownLabel(String),

    /// A model-backed classifier could not produce a label
    #[error("label model failed: {0}")]
    LabelModel(String),
}
