//! Error types for image audit operations.

use std::{error::Error, fmt, io};

/// Error type for image audit operations.
#[derive(Debug)]
pub enum AuditError {
    /// An underlying I/O error.
    Io(io::Error),
    /// An extraction pattern failed to compile.
    Pattern(regex::Error),
    /// The remote API rejected or failed a call.
    Remote {
        /// HTTP status observed for the failing call, if any.
        status: Option<u16>,
        /// Request context and failure detail.
        message: String,
    },
    /// A remote payload could not be decoded.
    Decode(String),
    /// A catch-all error with a message.
    Other(String),
}

impl AuditError {
    /// Build a remote failure carrying the observed status code.
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// HTTP status associated with the failure, when one was observed.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => *status,
            _ => None,
        }
    }
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Pattern(err) => write!(f, "invalid extraction pattern: {err}"),
            Self::Remote {
                status: Some(status),
                message,
            } => write!(f, "remote error ({status}): {message}"),
            Self::Remote {
                status: None,
                message,
            } => write!(f, "remote error: {message}"),
            Self::Decode(message) => write!(f, "decode error: {message}"),
            Self::Other(message) => write!(f, "{message}"),
        }
    }
}

impl Error for AuditError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Pattern(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for AuditError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<regex::Error> for AuditError {
    fn from(value: regex::Error) -> Self {
        Self::Pattern(value)
    }
}

impl From<serde_json::Error> for AuditError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value.to_string())
    }
}

/// Convenience result type for image audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::AuditError;
    use std::io;

    #[test]
    fn io_error_formats_message() {
        let error = AuditError::Io(io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(format!("{error}"), "io error: boom");
    }

    #[test]
    fn remote_error_formats_status_when_present() {
        let error = AuditError::remote(Some(404), "GET /repos/acme/api/contents/");
        assert_eq!(
            format!("{error}"),
            "remote error (404): GET /repos/acme/api/contents/"
        );
        assert_eq!(error.status(), Some(404));

        let error = AuditError::remote(None, "connection reset");
        assert_eq!(format!("{error}"), "remote error: connection reset");
        assert_eq!(error.status(), None);
    }

    #[test]
    fn other_error_has_no_status() {
        let error = AuditError::Other("audit failed".to_string());
        assert_eq!(format!("{error}"), "audit failed");
        assert!(error.status().is_none());
    }

    #[test]
    fn from_io_error_maps_variant() {
        let error: AuditError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        match error {
            AuditError::Io(inner) => {
                assert_eq!(inner.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected Io variant, got {other:?}"),
        }
    }

    #[test]
    fn from_regex_error_maps_variant() {
        let error: AuditError = regex::Regex::new("(").unwrap_err().into();
        assert!(matches!(error, AuditError::Pattern(_)));
        assert!(error.to_string().starts_with("invalid extraction pattern"));
    }
}
