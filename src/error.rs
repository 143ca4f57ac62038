use reqwest::StatusCode;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum SmartObjectsError {
    /// Arguments rejected locally, before any network call.
    #[error("{0}")]
    Validation(String),
    /// The API rejected the request payload (HTTP 400). Holds the raw body.
    #[error("{0}")]
    InvalidArgument(String),
    /// Any status other than 200, 201, 207 or 400, with raw response body.
    #[error("status code: {}, message {body}", status_name(*status))]
    Operation { status: StatusCode, body: String },
    /// The OAuth2 token could not be obtained.
    #[error("Error fetching token: {0}")]
    Authentication(String),
    /// A JSON field has the wrong type for its semantic meaning.
    #[error("Field '{field}' does not match TYPE '{expected}'")]
    Deserialization {
        field: String,
        expected: &'static str,
    },
    /// Response decoding or protocol-shape validation error.
    #[error("decode error: {0}")]
    Decode(String),
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Request body could not be gzip-compressed.
    #[error("compression error: {0}")]
    Compression(std::io::Error),
    /// Response body exceeded the configured buffer size.
    #[error("response body exceeds the {limit} byte buffer")]
    ResponseTooLarge { limit: usize },
    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
    /// The client was disposed before or during the call.
    #[error("client has been disposed")]
    Disposed,
}

impl SmartObjectsError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn type_mismatch(field: impl Into<String>, expected: &'static str) -> Self {
        Self::Deserialization {
            field: field.into(),
            expected,
        }
    }

    /// Returns the HTTP status code carried by remote errors.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::InvalidArgument(_) => Some(StatusCode::BAD_REQUEST),
            Self::Operation { status, .. } => Some(*status),
            Self::Transport(err) => err.status(),
            _ => None,
        }
    }
}

/// Formats a status code as its reason phrase without spaces,
/// e.g. `503` becomes `ServiceUnavailable`.
fn status_name(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => reason
            .split(|c: char| c == ' ' || c == '-')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect(),
        None => status.as_u16().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use crate::SmartObjectsError;

    #[test]
    fn operation_message_uses_status_name() {
        let err = SmartObjectsError::Operation {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: "service out".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "status code: ServiceUnavailable, message service out"
        );
    }

    #[test]
    fn operation_message_handles_lowercase_and_unknown_reasons() {
        let err = SmartObjectsError::Operation {
            status: StatusCode::NON_AUTHORITATIVE_INFORMATION,
            body: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "status code: NonAuthoritativeInformation, message "
        );

        let unknown = StatusCode::from_u16(599).expect("valid status code");
        let err = SmartObjectsError::Operation {
            status: unknown,
            body: "x".to_owned(),
        };
        assert_eq!(err.to_string(), "status code: 599, message x");
    }

    #[test]
    fn argument_errors_keep_raw_message() {
        let err = SmartObjectsError::InvalidArgument("request failed".to_owned());
        assert_eq!(err.to_string(), "request failed");
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn type_mismatch_message() {
        let err = SmartObjectsError::type_mismatch("x_event_type", "TEXT");
        assert_eq!(
            err.to_string(),
            "Field 'x_event_type' does not match TYPE 'TEXT'"
        );
    }
}
