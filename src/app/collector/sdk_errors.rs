//! AWS SDK error categorization.
//!
//! The collector never retries: the SDK already applies its own retry policy and the
//! collection contract is fail-fast. Categorizing the final error still matters, because
//! the caller decides whether to re-run the whole collection (throttling, network) or
//! give up and report (permissions, bad input).

use std::fmt;

/// Categorized error types for AWS SDK errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Request was throttled due to rate limiting
    Throttled { service: String, error_code: String },
    /// Request timed out
    Timeout { operation: String },
    /// Network connectivity issues
    NetworkError { message: String },
    /// AWS service temporarily unavailable
    ServiceUnavailable { service: String, message: String },
    /// The collection was cancelled by its caller or by a sibling failure
    Cancelled,
    /// Non-retryable error (permissions, validation, missing resource)
    NonRetryable {
        code: String,
        message: String,
        is_permission_error: bool,
    },
}

impl ErrorCategory {
    /// Whether re-running the whole collection could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCategory::Throttled { .. }
                | ErrorCategory::Timeout { .. }
                | ErrorCategory::NetworkError { .. }
                | ErrorCategory::ServiceUnavailable { .. }
        )
    }

    pub fn short_label(&self) -> &'static str {
        match self {
            ErrorCategory::Throttled { .. } => "throttled",
            ErrorCategory::Timeout { .. } => "timeout",
            ErrorCategory::NetworkError { .. } => "network",
            ErrorCategory::ServiceUnavailable { .. } => "unavailable",
            ErrorCategory::Cancelled => "cancelled",
            ErrorCategory::NonRetryable { .. } => "error",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Throttled { service, error_code } => {
                write!(f, "{} rate limited ({})", service, error_code)
            }
            ErrorCategory::Timeout { operation } => write!(f, "{} timeout", operation),
            ErrorCategory::NetworkError { .. } => write!(f, "network error"),
            ErrorCategory::ServiceUnavailable { service, .. } => {
                write!(f, "{} unavailable", service)
            }
            ErrorCategory::Cancelled => write!(f, "cancelled"),
            ErrorCategory::NonRetryable { code, .. } => write!(f, "{}", code),
        }
    }
}

/// Categorize an `anyhow::Error` wrapping an SDK error.
///
/// The full context chain is inspected, since SDK errors are usually wrapped with
/// `.context()` by the time they reach the collector.
pub fn categorize_error(error: &anyhow::Error, service: &str, operation: &str) -> ErrorCategory {
    let detail = format!("{:#}", error);
    categorize_error_string(&detail, service, operation)
}

/// Categorize an error based on its string representation
pub fn categorize_error_string(error_str: &str, service: &str, operation: &str) -> ErrorCategory {
    const THROTTLING: &[&str] = &[
        "ThrottlingException",
        "Throttling",
        "TooManyRequestsException",
        "RequestLimitExceeded",
        "RateExceeded",
    ];
    const TIMEOUT: &[&str] = &["TimeoutError", "timeout", "timed out", "deadline exceeded"];
    const NETWORK: &[&str] = &[
        "DispatchFailure",
        "connection",
        "Connection",
        "dns error",
        "DNS",
        "socket",
    ];
    const UNAVAILABLE: &[&str] = &[
        "ServiceUnavailable",
        "InternalServerError",
        "InternalServerException",
        "InternalFailure",
        "Service Unavailable",
    ];
    const PERMISSION: &[&str] = &[
        "AccessDenied",
        "UnauthorizedOperation",
        "AuthFailure",
        "InvalidClientTokenId",
        "UnrecognizedClientException",
        "SignatureDoesNotMatch",
        "ExpiredToken",
    ];

    let contains_any = |patterns: &[&str]| patterns.iter().any(|p| error_str.contains(p));

    // Credential and permission failures can mention sockets or connections in their
    // message text and must never be reported as retryable
    if contains_any(PERMISSION) {
        return ErrorCategory::NonRetryable {
            code: extract_error_code(error_str).unwrap_or_else(|| "AccessDenied".to_string()),
            message: truncate_message(error_str, 200),
            is_permission_error: true,
        };
    }

    if contains_any(THROTTLING) {
        return ErrorCategory::Throttled {
            service: service.to_string(),
            error_code: extract_error_code(error_str).unwrap_or_else(|| "Throttling".to_string()),
        };
    }

    if contains_any(TIMEOUT) {
        return ErrorCategory::Timeout {
            operation: operation.to_string(),
        };
    }

    if contains_any(NETWORK) {
        return ErrorCategory::NetworkError {
            message: truncate_message(error_str, 100),
        };
    }

    if contains_any(UNAVAILABLE) {
        return ErrorCategory::ServiceUnavailable {
            service: service.to_string(),
            message: truncate_message(error_str, 100),
        };
    }

    ErrorCategory::NonRetryable {
        code: extract_error_code(error_str).unwrap_or_else(|| "Error".to_string()),
        message: truncate_message(error_str, 200),
        is_permission_error: false,
    }
}

/// Extract an AWS error code such as `ResourceNotFoundException` from a message.
///
/// Looks for the first word ending in `Exception` or `Error`, which covers both the
/// `Code: message` display form and the `code: Some("Code")` debug form.
fn extract_error_code(error_str: &str) -> Option<String> {
    error_str
        .split(|c: char| !c.is_ascii_alphanumeric())
        .find(|word| {
            word.len() < 50
                && word.chars().next().is_some_and(|c| c.is_ascii_uppercase())
                && (word.ends_with("Exception") || word.ends_with("Error"))
        })
        .map(str::to_string)
}

fn truncate_message(msg: &str, max_len: usize) -> String {
    if msg.len() <= max_len {
        return msg.to_string();
    }
    let mut end = max_len - 3;
    while !msg.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &msg[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_categorize_throttling() {
        let cat = categorize_error_string(
            "ThrottlingException: Rate exceeded",
            "ACM",
            "ListCertificates",
        );
        assert_eq!(
            cat,
            ErrorCategory::Throttled {
                service: "ACM".to_string(),
                error_code: "ThrottlingException".to_string(),
            }
        );
        assert!(cat.is_retryable());
    }

    #[test]
    fn test_categorize_timeout() {
        let cat = categorize_error_string(
            "TimeoutError: request timed out after 30s",
            "ACM",
            "DescribeCertificate",
        );
        assert!(matches!(cat, ErrorCategory::Timeout { .. }));
        assert!(cat.is_retryable());
    }

    #[test]
    fn test_categorize_network_error() {
        let cat = categorize_error_string(
            "dispatch failure: DispatchFailure: connection refused",
            "ACM",
            "ListCertificates",
        );
        assert!(matches!(cat, ErrorCategory::NetworkError { .. }));
    }

    #[test]
    fn test_categorize_access_denied() {
        let cat = categorize_error_string(
            "service error: AccessDeniedException: User is not authorized to perform acm:ListCertificates",
            "ACM",
            "ListCertificates",
        );
        assert!(matches!(
            cat,
            ErrorCategory::NonRetryable {
                is_permission_error: true,
                ..
            }
        ));
        assert!(!cat.is_retryable());
        assert_eq!(cat.to_string(), "AccessDeniedException");
    }

    #[test]
    fn test_permission_errors_win_over_network_wording() {
        for (message, code) in [
            (
                "ExpiredTokenException: The security token included in the request is expired (Connection reused)",
                "ExpiredTokenException",
            ),
            (
                "AccessDeniedException: acm:ListCertificates denied for role used by socket proxy",
                "AccessDeniedException",
            ),
            (
                "UnrecognizedClientException: DNS lookup succeeded but the token is invalid",
                "UnrecognizedClientException",
            ),
        ] {
            let cat = categorize_error_string(message, "ACM", "ListCertificates");
            assert!(!cat.is_retryable(), "{} must not be retryable", message);
            assert!(matches!(
                &cat,
                ErrorCategory::NonRetryable {
                    is_permission_error: true,
                    ..
                }
            ));
            assert_eq!(cat.to_string(), code);
        }
    }

    #[test]
    fn test_categorize_missing_certificate() {
        let cat = categorize_error_string(
            "ResourceNotFoundException: Could not find certificate",
            "ACM",
            "DescribeCertificate",
        );
        assert_eq!(
            cat,
            ErrorCategory::NonRetryable {
                code: "ResourceNotFoundException".to_string(),
                message: "ResourceNotFoundException: Could not find certificate".to_string(),
                is_permission_error: false,
            }
        );
    }

    #[test]
    fn test_categorize_walks_context_chain() {
        let error = anyhow::anyhow!("ThrottlingException: slow down")
            .context("Failed to list ACM certificates in us-east-1");
        assert!(categorize_error(&error, "ACM", "List").is_retryable());
    }

    #[test]
    fn test_extract_error_code() {
        assert_eq!(
            extract_error_code("InvalidArnException: bad arn"),
            Some("InvalidArnException".to_string())
        );
        assert_eq!(
            extract_error_code("code: Some(\"ValidationException\")"),
            Some("ValidationException".to_string())
        );
        assert_eq!(extract_error_code("something went wrong"), None);
    }

    #[test]
    fn test_truncate_message() {
        assert_eq!(truncate_message("short", 10), "short");
        assert_eq!(truncate_message("abcdefghijkl", 10), "abcdefg...");
    }
}
