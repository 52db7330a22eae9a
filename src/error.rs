use std::path::PathBuf;

use thiserror::Error;

/// Top-level application error covering a conversion run and its outer layers
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Conversion failed: {file} - {source}")]
    Transcode {
        file: PathBuf,
        #[source]
        source: TranscodeError,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File system traversal error: {path} - {reason}")]
    FileSystemTraversal { path: PathBuf, reason: String },

    #[error("Invalid output target: {path} - {reason}")]
    InvalidOutputTarget { path: PathBuf, reason: String },

    #[error("Concurrent operation error: {details}")]
    Concurrency { details: String },
}

/// Failures that abort the conversion of a single document
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed document structure: {details}")]
    Structure { details: String },

    #[error("Document has no root element")]
    EmptyDocument,
}

/// A record element that could not be decoded into a record model.
///
/// Recovered locally: the record is skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("Expected a <{expected}> record, found {found}")]
    NotARecord { expected: String, found: String },

    #[error("Invalid {axis} coordinate '{value}' in point {point}")]
    InvalidCoordinate {
        axis: char,
        value: String,
        point: usize,
    },

    #[error("Record ended before </{element}>")]
    Truncated { element: String },
}

/// The embedded symbol fragment of a record could not be parsed.
///
/// Recovered locally: the record is kept with an absent descriptor.
#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("Malformed symbol fragment: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Symbol fragment ends inside <{element}>")]
    Unclosed { element: String },

    #[error("Unexpected <{child}> inside <{parent}> in symbol fragment")]
    NestedElement { parent: String, child: String },
}

/// A decoded record lacks the data needed to build output nodes.
///
/// Recovered locally: the record is skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("Record has an empty point list")]
    EmptyPointList,
}

impl TranscodeError {
    pub(crate) fn structure(details: impl Into<String>) -> Self {
        TranscodeError::Structure {
            details: details.into(),
        }
    }

    /// Attach the input path to a per-document failure
    pub fn for_file(self, file: impl Into<PathBuf>) -> ConversionError {
        ConversionError::Transcode {
            file: file.into(),
            source: self,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ConversionError>;

/// Single-document result type alias
pub type TranscodeResult<T> = std::result::Result<T, TranscodeError>;
