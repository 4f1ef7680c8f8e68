// Assessment service error types
//
// The external assessment service is untrusted and unreliable. Every variant
// here is recoverable: the session orchestrator absorbs it and falls back to
// local-only analysis, so these errors never surface past that layer.

use std::fmt;

/// Failures while obtaining an external qualitative assessment
#[derive(Debug, Clone, PartialEq)]
pub enum AssessmentError {
    /// No endpoint configured; the external call was never attempted
    Disabled,

    /// Could not reach the service
    ConnectFailed { reason: String },

    /// The bounded wait expired before a response arrived
    Timeout { waited_ms: u64 },

    /// Service answered with a non-success HTTP status
    BadStatus { status: u16 },

    /// Response body did not match the expected shape
    MalformedResponse { reason: String },

    /// Service reported an application-level error
    ServiceError { message: String },
}

impl fmt::Display for AssessmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssessmentError::Disabled => write!(f, "assessment service not configured"),
            AssessmentError::ConnectFailed { reason } => {
                write!(f, "failed to reach assessment service: {}", reason)
            }
            AssessmentError::Timeout { waited_ms } => {
                write!(f, "assessment timed out after {} ms", waited_ms)
            }
            AssessmentError::BadStatus { status } => {
                write!(f, "assessment service returned status {}", status)
            }
            AssessmentError::MalformedResponse { reason } => {
                write!(f, "malformed assessment response: {}", reason)
            }
            AssessmentError::ServiceError { message } => {
                write!(f, "assessment service error: {}", message)
            }
        }
    }
}

impl std::error::Error for AssessmentError {}

impl From<std::io::Error> for AssessmentError {
    fn from(err: std::io::Error) -> Self {
        AssessmentError::ConnectFailed {
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AssessmentError {
    fn from(err: serde_json::Error) -> Self {
        AssessmentError::MalformedResponse {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_variants() {
        assert!(format!("{}", AssessmentError::Disabled).contains("not configured"));
        assert!(
            format!("{}", AssessmentError::Timeout { waited_ms: 8000 }).contains("8000 ms")
        );
        assert!(format!("{}", AssessmentError::BadStatus { status: 503 }).contains("503"));
    }

    #[test]
    fn test_from_serde_error() {
        let bad: Result<serde_json::Value, _> = serde_json::from_str("not json");
        let err: AssessmentError = bad.unwrap_err().into();
        assert!(matches!(err, AssessmentError::MalformedResponse { .. }));
    }
}
