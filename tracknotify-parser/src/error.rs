//! Error types for event extraction

use thiserror::Error;

/// Which of the two parse phases rejected the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    /// The outer LastChange (or property-set) document
    Event,
    /// The DIDL-Lite document carried in `CurrentTrackMetaData@val`
    Metadata,
}

/// Errors that can occur while extracting a track from an event
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The outer event document is not well-formed XML
    #[error("Malformed LastChange event at byte {position}: {message}")]
    MalformedEvent { position: usize, message: String },

    /// The nested DIDL-Lite document is not well-formed XML
    #[error("Malformed DIDL-Lite metadata at byte {position}: {message}")]
    MalformedMetadata { position: usize, message: String },
}

impl ParseError {
    /// The parse phase that failed
    pub fn stage(&self) -> ParseStage {
        match self {
            ParseError::MalformedEvent { .. } => ParseStage::Event,
            ParseError::MalformedMetadata { .. } => ParseStage::Metadata,
        }
    }

    /// Byte offset into the document of the failing phase
    pub fn position(&self) -> usize {
        match self {
            ParseError::MalformedEvent { position, .. }
            | ParseError::MalformedMetadata { position, .. } => *position,
        }
    }
}

/// Result type alias for extraction operations
pub type ParseResult<T> = Result<T, ParseError>;
