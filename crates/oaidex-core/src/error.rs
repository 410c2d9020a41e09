//! Transport error taxonomy for index submissions

/// Error talking to the search index.
///
/// Every variant answers [`is_retryable`](TransportError::is_retryable) so a
/// caller can decide whether re-submitting the same document makes sense.
#[derive(Debug)]
pub enum TransportError {
    /// HTTP-level failure, with the status code when the server answered
    Http {
        status: Option<u16>,
        message: String,
    },
    /// Local I/O failure (connection refused, timeout, broken pipe, ...)
    Io(std::io::Error),
    /// Request body could not be serialized or response could not be read
    Encode(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Encode(msg) => write!(f, "encode error: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl TransportError {
    /// Misconfiguration on our side; never retryable.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            message.into(),
        ))
    }

    /// Build from a reqwest error without leaking the request URL.
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            return Self::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "request timed out",
            ));
        }
        // Bad client setup or request; resending cannot help
        if e.is_builder() {
            return Self::invalid_input(e.without_url_string());
        }
        if e.is_decode() {
            return Self::Encode(e.without_url_string());
        }
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.without_url_string(),
        }
    }

    /// Transient failures are worth retrying; permanent ones will fail again.
    pub fn is_retryable(&self) -> bool {
        match self {
            // No status means the request never got an answer (connect/DNS)
            Self::Http { status: None, .. } => true,
            Self::Http {
                status: Some(s), ..
            } => matches!(s, 408 | 429 | 500..=599),
            Self::Io(e) => !matches!(
                e.kind(),
                std::io::ErrorKind::InvalidInput | std::io::ErrorKind::InvalidData
            ),
            Self::Encode(_) => false,
        }
    }

    /// Short label for summaries: `transient` or `permanent`.
    pub fn kind_label(&self) -> &'static str {
        if self.is_retryable() {
            "transient"
        } else {
            "permanent"
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encode(e.to_string())
    }
}

/// Strip the URL from a reqwest error message.
trait WithoutUrl {
    fn without_url_string(&self) -> String;
}

impl WithoutUrl for reqwest::Error {
    fn without_url_string(&self) -> String {
        let mut msg = self.to_string();
        if let Some(url) = self.url() {
            msg = msg.replace(&format!(" ({url})"), "");
            msg = msg.replace(url.as_str(), "<endpoint>");
        }
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    fn http_err(status: u16) -> TransportError {
        TransportError::Http {
            status: Some(status),
            message: "test".to_string(),
        }
    }

    #[test]
    fn http_5xx_retryable() {
        assert!(http_err(500).is_retryable());
        assert!(http_err(503).is_retryable());
    }

    #[test]
    fn http_429_and_408_retryable() {
        assert!(http_err(429).is_retryable());
        assert!(http_err(408).is_retryable());
    }

    #[test]
    fn http_4xx_permanent() {
        assert!(!http_err(400).is_retryable());
        assert!(!http_err(401).is_retryable());
        assert!(!http_err(404).is_retryable());
    }

    #[test]
    fn http_without_status_retryable() {
        let err = TransportError::Http {
            status: None,
            message: "connection refused".to_string(),
        };
        assert!(err.is_retryable());
    }

    #[test]
    fn io_timeout_retryable() {
        let err = TransportError::Io(std::io::Error::new(ErrorKind::TimedOut, "timeout"));
        assert!(err.is_retryable());
        assert_eq!(err.kind_label(), "transient");
    }

    #[test]
    fn io_invalid_data_permanent() {
        let err = TransportError::Io(std::io::Error::new(ErrorKind::InvalidData, "bad"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn invalid_input_permanent() {
        let err = TransportError::invalid_input("endpoint \"x\" cannot carry a path");
        assert!(!err.is_retryable());
        assert!(format!("{err}").contains("cannot carry a path"));
    }

    #[test]
    fn reqwest_builder_error_permanent() {
        let e = reqwest::Client::new().get("not a url").build().unwrap_err();
        assert!(e.is_builder());
        let err = TransportError::from_reqwest(&e);
        assert!(!err.is_retryable());
        assert!(matches!(err, TransportError::Io(ref io) if io.kind() == ErrorKind::InvalidInput));
    }

    #[test]
    fn encode_permanent() {
        let err = TransportError::Encode("bad body".to_string());
        assert!(!err.is_retryable());
        assert_eq!(err.kind_label(), "permanent");
    }

    #[test]
    fn display_formats() {
        assert_eq!(format!("{}", http_err(404)), "HTTP 404: test");
        let err = TransportError::Http {
            status: None,
            message: "timeout".to_string(),
        };
        assert_eq!(format!("{err}"), "HTTP error: timeout");
        let err = TransportError::Io(std::io::Error::new(ErrorKind::NotFound, "gone"));
        assert!(format!("{err}").contains("IO error"));
    }
}
