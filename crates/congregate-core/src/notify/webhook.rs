use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use super::{Notifier, NotifyError, PeriodNotice};

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Posts each notice as JSON to a fixed URL. Makes a single attempt per
/// notice.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
    url: String,
    token: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifyError> {
        let url = url.into();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(NotifyError::Unconfigured(format!("not an http(s) URL: {}", url)));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            url,
            token: None,
        })
    }

    /// Send a bearer token with every notice
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, NotifyError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(NotifyError::from_status(status, &body))
        }
    }
}

impl Notifier for WebhookNotifier {
    async fn notify_manager(&self, notice: &PeriodNotice) -> Result<(), NotifyError> {
        let mut request = self.client.post(&self.url).json(notice);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        Self::check_response(response).await?;
        debug!(url = %self.url, manager_id = notice.manager_id, action = %notice.action, "Webhook notice delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_http_url() {
        assert!(matches!(WebhookNotifier::new("ftp://example.org"), Err(NotifyError::Unconfigured(_))));
    }

    #[test]
    fn test_accepts_https_url() {
        let notifier = WebhookNotifier::new("https://hooks.example.org/periods").unwrap();
        assert_eq!(notifier.url(), "https://hooks.example.org/periods");
    }
}
