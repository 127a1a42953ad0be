//! HTTP submission of finished check-ins to the wellness API.

use std::time::Duration;

use reqwest::Client;

use super::traits::{BoxError, SubmissionReceipt, Submitter};
use crate::session::QuickCheckIn;

const QUICK_CHECKIN_PATH: &str = "checkin/quick/";

pub struct HttpSubmitter {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpSubmitter {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            token,
        }
    }

    /// Build with a request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn with_timeout(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token,
        })
    }

    /// `{base_url}/checkin/quick/`, with or without a trailing slash on the base.
    pub fn endpoint(&self) -> Result<url::Url, url::ParseError> {
        let base = format!("{}/", self.base_url.trim_end_matches('/'));
        url::Url::parse(&base)?.join(QUICK_CHECKIN_PATH)
    }
}

impl Submitter for HttpSubmitter {
    async fn submit(&mut self, record: &QuickCheckIn) -> Result<SubmissionReceipt, BoxError> {
        let url = self.endpoint()?;
        tracing::debug!(%url, "posting quick check-in");

        let mut request = self.client.post(url).json(record);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            let detail = body
                .get("detail")
                .and_then(|d| d.as_str())
                .map(|d| format!(": {d}"))
                .unwrap_or_default();
            return Err(format!("quick check-in rejected: HTTP {status}{detail}").into());
        }

        let text = resp.text().await?;
        if text.trim().is_empty() {
            return Ok(SubmissionReceipt::default());
        }
        Ok(serde_json::from_str(&text)?)
    }
}
