//! Error types for the IATI conversion pipeline.
//!
//! One enum per stage:
//!
//! - [`ExtractError`] - XML parsing errors
//! - [`BuildError`] - CSV-to-activity assembly errors
//! - [`XmlError`] - XML serialization errors
//! - [`ValidationError`] - CSV validation infrastructure errors
//! - [`ConvertError`] - Top-level orchestration errors
//!
//! The stage errors convert into [`ConvertError`] via `From`, so `?` works
//! across the pipeline.

use thiserror::Error;

// =============================================================================
// Extraction Errors
// =============================================================================

/// Errors while parsing source XML.
///
/// Extraction itself is infallible once a document is parsed: missing optional
/// elements are treated as absence, and a missing `iati-identifier` yields an
/// empty-string key rather than an error.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Malformed XML document.
    #[error("Failed to parse XML: {0}")]
    Parse(#[from] roxmltree::Error),

    /// Failed to read the source file.
    #[error("Failed to read XML file: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Build Errors
// =============================================================================

/// Errors while assembling activities from table rows.
///
/// Building is fail-fast: the first error for any activity aborts the whole
/// batch, annotated with the offending activity identifier.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Assembly of one activity failed.
    #[error("Failed to build activity '{activity_id}': {detail}")]
    Activity { activity_id: String, detail: String },

    /// A code value outside its code list in a position the build cannot
    /// tolerate (e.g. an activity-date type).
    #[error("Invalid code '{value}' for {field}")]
    InvalidCode { field: String, value: String },
}

// =============================================================================
// XML Serialization Errors
// =============================================================================

/// Errors while serializing the assembled activity tree.
#[derive(Debug, Error)]
pub enum XmlError {
    /// Writing an event to the XML writer failed.
    #[error("XML write error: {0}")]
    Write(#[from] std::io::Error),

    /// The serialized buffer was not valid UTF-8.
    #[error("Generated XML is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Infrastructure errors from the CSV validation engine.
///
/// These are distinct from [`crate::validation::ValidationIssue`]s: an issue is
/// a finding about the data, an error here means validation itself could not
/// run.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Failed to read a table file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV content.
    #[error("Invalid CSV format: {0}")]
    Csv(#[from] csv::Error),
}

// =============================================================================
// Converter Errors (top-level)
// =============================================================================

/// Top-level conversion orchestration errors.
///
/// This is the error type behind [`crate::convert::TableConverter`]'s
/// operations. The converter catches it at the public boundary, records the
/// message in `latest_errors`, and returns a boolean failure.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Source XML error.
    #[error("{0}")]
    Extract(#[from] ExtractError),

    /// Activity assembly error.
    #[error("{0}")]
    Build(#[from] BuildError),

    /// XML serialization error.
    #[error("{0}")]
    Xml(#[from] XmlError),

    /// Validation infrastructure error.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Filesystem error.
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The input folder does not exist.
    #[error("CSV folder not found: {0}")]
    FolderNotFound(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Result type for build operations.
pub type BuildResult<T> = Result<T, BuildError>;

/// Result type for XML serialization.
pub type XmlResult<T> = Result<T, XmlError>;

/// Result type for validation infrastructure.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // BuildError -> ConvertError
        let build_err = BuildError::Activity {
            activity_id: "XM-EX-1".into(),
            detail: "invalid activity-date type".into(),
        };
        let convert_err: ConvertError = build_err.into();
        assert!(convert_err.to_string().contains("XM-EX-1"));

        // io::Error -> ExtractError -> ConvertError
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let extract_err: ExtractError = io_err.into();
        let convert_err: ConvertError = extract_err.into();
        assert!(convert_err.to_string().contains("no such file"));
    }

    #[test]
    fn test_build_error_format() {
        let err = BuildError::InvalidCode {
            field: "activity-date type".into(),
            value: "9".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("activity-date type"));
        assert!(msg.contains("'9'"));
    }
}
