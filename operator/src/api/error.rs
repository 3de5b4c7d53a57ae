use std::fmt;

/// Error code returned when the requested object does not exist.
pub const RESOURCE_NOT_FOUND: &str = "ResourceNotFoundException";

/// Error code for requests the service refuses because they
/// conflict with an in-flight mutation.
pub const CONFLICT: &str = "ConflictException";

/// Error code for malformed requests. Some of these are transient,
/// see [`TRANSITIONAL_MESSAGES`].
pub const VALIDATION: &str = "ValidationException";

/// Message fragments of a `ValidationException` that mean the target
/// is mid-transition and the same request will succeed later.
pub const TRANSITIONAL_MESSAGES: &[&str] = &[
    "transitional state",
    "currently being",
    "not in ACTIVE",
    "is in CREATING",
    "is in UPDATING",
    "another operation is in progress",
];

/// Message fragments that mean a freshly created IAM role has not
/// propagated yet.
pub const IAM_PROPAGATION_MESSAGES: &[&str] = &[
    "unable to assume",
    "cannot be assumed",
    "not authorized to perform: sts:AssumeRole",
    "role does not exist",
];

/// An error reported by the AgentCore control plane, reduced to the
/// modeled error code and its message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// Coarse classification of an [`ApiError`] that drives the
/// retry-or-fail decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Throttled,
    Conflict,
    Transitional,
    IamPropagation,
    Internal,
    QuotaExceeded,
    AccessDenied,
    Validation,
    Other,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::new(RESOURCE_NOT_FOUND, message)
    }

    /// Classifies the error by its code, then by message substrings
    /// for the codes the service overloads.
    pub fn kind(&self) -> ErrorKind {
        match self.code.as_str() {
            RESOURCE_NOT_FOUND => ErrorKind::NotFound,
            "ThrottlingException" | "TooManyRequestsException" => ErrorKind::Throttled,
            CONFLICT => ErrorKind::Conflict,
            "InternalServerException"
            | "ServiceUnavailableException"
            | "RequestTimeout"
            | "DispatchFailure" => ErrorKind::Internal,
            "ServiceQuotaExceededException" => ErrorKind::QuotaExceeded,
            VALIDATION | "AccessDeniedException" if self.message_contains(IAM_PROPAGATION_MESSAGES) => {
                ErrorKind::IamPropagation
            }
            VALIDATION if self.message_contains(TRANSITIONAL_MESSAGES) => ErrorKind::Transitional,
            VALIDATION => ErrorKind::Validation,
            "AccessDeniedException" | "UnauthorizedException" => ErrorKind::AccessDenied,
            _ => ErrorKind::Other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// True for errors where repeating the identical request later
    /// is expected to succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Throttled
                | ErrorKind::Conflict
                | ErrorKind::Transitional
                | ErrorKind::Internal
        )
    }

    /// Case-insensitive substring match against any of `needles`.
    pub fn message_contains(&self, needles: &[&str]) -> bool {
        let message = self.message.to_lowercase();
        needles
            .iter()
            .any(|needle| message.contains(&needle.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_code() {
        assert_eq!(ApiError::not_found("gone").kind(), ErrorKind::NotFound);
        assert_eq!(
            ApiError::new("ThrottlingException", "slow down").kind(),
            ErrorKind::Throttled
        );
        assert_eq!(ApiError::new(CONFLICT, "busy").kind(), ErrorKind::Conflict);
        assert_eq!(
            ApiError::new("ServiceQuotaExceededException", "too many").kind(),
            ErrorKind::QuotaExceeded
        );
        assert_eq!(ApiError::new("Weird", "?").kind(), ErrorKind::Other);
    }

    #[test]
    fn validation_messages_distinguish_transient_from_terminal() {
        let transitional = ApiError::new(
            VALIDATION,
            "Memory mem-1 is in a Transitional State and cannot be updated",
        );
        assert_eq!(transitional.kind(), ErrorKind::Transitional);
        assert!(transitional.is_retryable());

        let terminal = ApiError::new(VALIDATION, "eventExpiryDuration must be at most 365");
        assert_eq!(terminal.kind(), ErrorKind::Validation);
        assert!(!terminal.is_retryable());
    }

    #[test]
    fn iam_propagation_is_detected_but_not_generally_retryable() {
        let err = ApiError::new(
            "AccessDeniedException",
            "Role arn:aws:iam::123456789012:role/x cannot be assumed by the service",
        );
        assert_eq!(err.kind(), ErrorKind::IamPropagation);
        assert!(!err.is_retryable());
        assert_eq!(
            ApiError::new("AccessDeniedException", "no").kind(),
            ErrorKind::AccessDenied
        );
    }
}
