//! Error types for the codelens client.

use std::{error::Error, fmt, io};

/// Error type for codelens operations.
#[derive(Debug)]
pub enum CodelensError {
    /// The backend answered with a non-2xx status.
    Http {
        /// HTTP status code.
        status: u16,
        /// Message taken from the `detail` field, or a status line fallback.
        message: String,
    },
    /// The request never produced a usable response (network or decode failure).
    Request(String),
    /// A payload did not match exactly one known analysis shape.
    UnrecognizedResponse(String),
    /// Input rejected before any request was sent.
    Validation(String),
    /// An underlying I/O error.
    Io(io::Error),
    /// Local JSON (de)serialization failure.
    Json(serde_json::Error),
    /// A catch-all error with a message.
    Other(String),
}

impl CodelensError {
    /// HTTP status of the failed response, if the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for CodelensError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http { message, .. } => write!(f, "{message}"),
            Self::Request(message) => write!(f, "{message}"),
            Self::UnrecognizedResponse(message) => {
                write!(f, "unrecognized response shape: {message}")
            }
            Self::Validation(message) => write!(f, "{message}"),
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Json(err) => write!(f, "json error: {err}"),
            Self::Other(message) => write!(f, "{message}"),
        }
    }
}

impl Error for CodelensError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for CodelensError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CodelensError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Convenience result type for codelens.
pub type Result<T> = std::result::Result<T, CodelensError>;

/// Turn any error into the message shown to the user.
pub fn error_message(error: &(dyn Error + 'static)) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        "An unexpected error occurred".to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::{CodelensError, error_message};
    use std::io;

    #[test]
    fn http_error_formats_raw_message() {
        let error = CodelensError::Http {
            status: 404,
            message: "not found".to_string(),
        };
        assert_eq!(format!("{error}"), "not found");
        assert_eq!(error.status(), Some(404));
    }

    #[test]
    fn unrecognized_response_is_prefixed() {
        let error = CodelensError::UnrecognizedResponse("no known shape".to_string());
        assert_eq!(
            format!("{error}"),
            "unrecognized response shape: no known shape"
        );
        assert_eq!(error.status(), None);
    }

    #[test]
    fn from_io_error_maps_variant() {
        let error: CodelensError = io::Error::new(io::ErrorKind::NotFound, "missing").into();
        match error {
            CodelensError::Io(inner) => assert_eq!(inner.kind(), io::ErrorKind::NotFound),
            other => panic!("expected Io variant, got {other:?}"),
        }
    }

    #[test]
    fn error_message_falls_back_for_blank_errors() {
        let error = CodelensError::Other("  ".to_string());
        assert_eq!(error_message(&error), "An unexpected error occurred");
        let error = CodelensError::Validation("too big".to_string());
        assert_eq!(error_message(&error), "too big");
    }
}
