//! Storage error types
//!
//! Error codes:
//! - SCALAR_STORAGE_IO_ERROR (ERROR severity)
//! - SCALAR_STORAGE_UNKNOWN_NAMESPACE (ERROR severity)
//! - SCALAR_DATA_CORRUPTION (FATAL severity)

use std::fmt;
use std::io;

use super::NamespaceId;

/// Severity levels for storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, index continues
    Error,
    /// Store cannot be trusted; caller must stop
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Disk I/O failure while appending or replaying the log
    IoError,
    /// Operation addressed a namespace id that was never created
    UnknownNamespace,
    /// Log framing or checksum failure
    DataCorruption,
}

impl StorageErrorCode {
    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::IoError => "SCALAR_STORAGE_IO_ERROR",
            StorageErrorCode::UnknownNamespace => "SCALAR_STORAGE_UNKNOWN_NAMESPACE",
            StorageErrorCode::DataCorruption => "SCALAR_DATA_CORRUPTION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StorageErrorCode::IoError => Severity::Error,
            StorageErrorCode::UnknownNamespace => Severity::Error,
            StorageErrorCode::DataCorruption => Severity::Fatal,
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with code, message and optional context
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl StorageError {
    /// Create an I/O error
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: StorageErrorCode::IoError,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    /// Create an I/O error without an underlying source
    pub fn io_error_no_source(message: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::IoError,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create an unknown namespace error
    pub fn unknown_namespace(id: NamespaceId) -> Self {
        Self {
            code: StorageErrorCode::UnknownNamespace,
            message: format!("Namespace {} does not exist", id),
            details: None,
            source: None,
        }
    }

    /// Create a data corruption error (FATAL)
    pub fn data_corruption(message: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::DataCorruption,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create a data corruption error with byte offset context
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::DataCorruption,
            message: reason.into(),
            details: Some(format!("byte_offset: {}", offset)),
            source: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether this error is fatal
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(StorageErrorCode::IoError.code(), "SCALAR_STORAGE_IO_ERROR");
        assert_eq!(
            StorageErrorCode::UnknownNamespace.code(),
            "SCALAR_STORAGE_UNKNOWN_NAMESPACE"
        );
        assert_eq!(StorageErrorCode::DataCorruption.code(), "SCALAR_DATA_CORRUPTION");
    }

    #[test]
    fn test_only_corruption_is_fatal() {
        assert!(StorageError::data_corruption("bad crc").is_fatal());
        assert!(!StorageError::unknown_namespace(3).is_fatal());
        assert!(!StorageError::io_error(
            "disk full",
            io::Error::new(io::ErrorKind::Other, "disk full")
        )
        .is_fatal());
    }

    #[test]
    fn test_display_includes_offset() {
        let err = StorageError::corruption_at_offset(512, "checksum mismatch");
        let display = err.to_string();
        assert!(display.contains("SCALAR_DATA_CORRUPTION"));
        assert!(display.contains("FATAL"));
        assert!(display.contains("byte_offset: 512"));
    }
}
