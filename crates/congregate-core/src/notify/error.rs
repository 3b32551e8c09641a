use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Webhook rejected notice (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Webhook not configured: {0}")]
    Unconfigured(String),
}

/// Maximum length for response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl NotifyError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let cut = (0..=MAX_ERROR_BODY_LENGTH)
                .rev()
                .find(|&i| body.is_char_boundary(i))
                .unwrap_or(0);
            format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        NotifyError::Rejected {
            status: status.as_u16(),
            body: Self::truncate_body(body),
        }
    }

    /// Whether resending the same notice later could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            NotifyError::Rejected { status, .. } => *status == 429 || *status >= 500,
            NotifyError::Network(_) => true,
            NotifyError::Unconfigured(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_keeps_status_code() {
        match NotifyError::from_status(StatusCode::FORBIDDEN, "nope") {
            NotifyError::Rejected { status, body } => {
                assert_eq!(status, 403);
                assert_eq!(body, "nope");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_transient_statuses() {
        assert!(NotifyError::from_status(StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(NotifyError::from_status(StatusCode::BAD_GATEWAY, "").is_transient());
        assert!(!NotifyError::from_status(StatusCode::UNAUTHORIZED, "").is_transient());
        assert!(!NotifyError::Unconfigured("ftp://x".to_string()).is_transient());
    }

    #[test]
    fn test_long_body_is_truncated() {
        let body = "é".repeat(400);
        match NotifyError::from_status(StatusCode::INTERNAL_SERVER_ERROR, &body) {
            NotifyError::Rejected { body, .. } => {
                assert!(body.contains("truncated, 800 total bytes"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
