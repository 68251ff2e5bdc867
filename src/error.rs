//! Error types for the accessibility toolkit.
//!
//! Two layers share this enum: the low-level PDF object model (parse
//! offsets, missing objects, bad stream filters) and the analysis/fix
//! orchestration (deadlines, download policy, remote storage). Callers that
//! surface errors to end users must go through [`Error::user_message`],
//! which never leaks file paths or library internals.

/// Result type alias for toolkit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during PDF analysis and remediation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Document structure is too damaged to analyze
    #[error("Malformed PDF: {0}")]
    PdfMalformed(String),

    /// Document is encrypted and no password was supplied
    #[error("PDF is encrypted")]
    PdfEncrypted,

    /// Parse error at specific byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where the error occurred
        offset: usize,
        /// Reason for the parse failure
        reason: String,
    },

    /// Invalid cross-reference table
    #[error("Invalid cross-reference table")]
    InvalidXref,

    /// Referenced object not found in cross-reference table
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// Unexpected end of file
    #[error("End of file reached unexpectedly")]
    UnexpectedEof,

    /// Unsupported stream filter
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Per-call deadline exceeded
    #[error("Operation deadline exceeded")]
    Deadline,

    /// Operation was cancelled cooperatively
    #[error("Operation cancelled")]
    Cancelled,

    /// Download of a non-latest fixed version without the override flag
    #[error("Only the latest fixed version is downloadable (requested v{requested}, latest v{latest})")]
    ForbiddenOlderVersion {
        /// Version the caller asked for
        requested: u32,
        /// Newest version on disk
        latest: u32,
    },

    /// Remote object store rejected or dropped an upload
    #[error("Remote storage unavailable: {0}")]
    RemoteStorageUnavailable(String),

    /// Unclassified internal error, logged with full context
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short, caller-safe message with no paths, stack frames, or library
    /// names.
    pub fn user_message(&self) -> String {
        match self {
            Error::PdfEncrypted => {
                "The document is password protected and could not be analyzed.".to_string()
            },
            Error::PdfMalformed(_)
            | Error::ParseError { .. }
            | Error::InvalidXref
            | Error::ObjectNotFound(..)
            | Error::InvalidObjectType { .. }
            | Error::UnexpectedEof
            | Error::UnsupportedFilter(_)
            | Error::Decode(_) => {
                "The document could not be read as a valid PDF.".to_string()
            },
            Error::Deadline | Error::Cancelled => {
                "The operation did not finish in the allowed time.".to_string()
            },
            Error::ForbiddenOlderVersion { .. } => {
                "Only the latest fixed version of this document can be downloaded.".to_string()
            },
            Error::RemoteStorageUnavailable(_) => {
                "The fixed document could not be archived. Please retry.".to_string()
            },
            Error::Io(_) | Error::Internal(_) => {
                "An unexpected error occurred while processing the document.".to_string()
            },
        }
    }

    /// True when the error means the document itself is unusable, as
    /// opposed to an environmental failure.
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            Error::PdfMalformed(_)
                | Error::PdfEncrypted
                | Error::ParseError { .. }
                | Error::InvalidXref
                | Error::ObjectNotFound(..)
                | Error::InvalidObjectType { .. }
                | Error::UnexpectedEof
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = Error::ParseError {
            offset: 1234,
            reason: "invalid token".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("1234"));
        assert!(msg.contains("invalid token"));
    }

    #[test]
    fn test_object_not_found_display() {
        let err = Error::ObjectNotFound(10, 0);
        assert!(format!("{}", err).contains("10 0 R"));
    }

    #[test]
    fn test_user_message_hides_details() {
        let err = Error::PdfMalformed("xref offset 99 beyond EOF in /tmp/secret.pdf".to_string());
        let msg = err.user_message();
        assert!(!msg.contains("/tmp"));
        assert!(!msg.contains("xref"));
    }

    #[test]
    fn test_forbidden_older_version_user_message() {
        let err = Error::ForbiddenOlderVersion {
            requested: 1,
            latest: 3,
        };
        assert!(err.user_message().contains("latest"));
        assert!(!err.is_document_error());
    }

    #[test]
    fn test_encrypted_is_document_error() {
        assert!(Error::PdfEncrypted.is_document_error());
        assert!(!Error::Deadline.is_document_error());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
