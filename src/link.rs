//! Resolution of direct-download links for uploaded objects.

use std::time::Duration;

use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::{debug, warn};

use crate::error::Result;

/// Public host serving object content.
pub const DEFAULT_CONTENT_BASE: &str = "https://drive.google.com";

/// Probes the public content URL of an object and reports where it points.
#[derive(Clone)]
pub struct ContentLinkResolver {
    http: Client,
    content_base: String,
}

impl ContentLinkResolver {
    /// Create a resolver whose HTTP client never follows redirects.
    pub fn new(content_base: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().redirect(Policy::none());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            content_base: content_base.into(),
        })
    }

    /// The templated content URL for an object.
    pub fn canonical_url(&self, object_id: &str) -> String {
        format!("{}/uc?id={}", self.content_base.trim_end_matches('/'), object_id)
    }

    /// Resolve the direct-download link for an object.
    ///
    /// A redirect yields its `location`; any other status yields the
    /// canonical URL itself. Transport errors yield `None`.
    pub async fn resolve(&self, object_id: &str) -> Option<String> {
        let url = self.canonical_url(object_id);

        let response = match self.http.head(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(object_id, error = %e, "content link probe failed");
                return None;
            }
        };

        let status = response.status();
        debug!(object_id, status = status.as_u16(), "content link probe answered");

        if status.is_redirection() {
            return response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
        }

        Some(url)
    }
}
