//! Core HTTP client for the event feed

use std::{future::Future, sync::Arc};

use compact_str::{CompactString, format_compact};
use reqwest::{
    Client, RequestBuilder, Response, StatusCode,
    header::{ACCEPT, AUTHORIZATION},
};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{
    config::ClientConfig,
    error::{ClientError, Result},
    links::LinkSet,
};
use crate::domain::{Event, RateLimit};

/// One page of the feed together with what its headers said
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub links: LinkSet,
    pub rate_limit: RateLimit,
    pub events: Vec<Event>,
}

/// Anything that can serve feed pages by URL.
///
/// Implemented by [`FeedApi`] for the real feed; the walker and the poller
/// only depend on this trait.
pub trait PageSource {
    fn fetch_page(&self, url: &str) -> impl Future<Output = Result<Page>> + Send;
}

impl<T: PageSource> PageSource for Arc<T> {
    fn fetch_page(&self, url: &str) -> impl Future<Output = Result<Page>> + Send {
        (**self).fetch_page(url)
    }
}

/// Error body returned by GitHub alongside non-2xx statuses
#[derive(Debug, Deserialize)]
struct FeedApiError {
    message: CompactString,
}

/// Pure HTTP client for the event feed
#[derive(Debug)]
pub struct FeedApi {
    client: Client,
    config: ClientConfig,
}

impl FeedApi {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request.timeout)
            .user_agent(config.request.user_agent.as_str())
            .build()
            .map_err(ClientError::Transport)?;

        Ok(Self { client, config })
    }

    /// Get current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch a single page of events
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_page(&self, url: &str) -> Result<Page> {
        debug!("Fetching page");
        let response = self.authenticated_request(url).send().await?;
        self.handle_response(response).await
    }

    /// Create authenticated request builder
    fn authenticated_request(&self, url: &str) -> RequestBuilder {
        self.client
            .get(url)
            .header(AUTHORIZATION, format!("token {}", self.config.token))
            .header(ACCEPT, "application/vnd.github+json")
    }

    /// Handle HTTP response, extracting rate-limit counters, links and events
    async fn handle_response(&self, response: Response) -> Result<Page> {
        let url = CompactString::from(response.url().as_str());
        let status = response.status();
        let headers = response.headers().clone();
        let rate_limit = RateLimit::from_headers(&headers);

        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            warn!(
                status = status.as_u16(),
                limit = ?rate_limit.limit,
                remaining = ?rate_limit.remaining,
                "Feed refused request"
            );
            return Err(ClientError::RateLimited(rate_limit));
        }

        let body = response.text().await?;

        if !status.is_success() {
            return Err(ClientError::unexpected_status(
                status.as_u16(),
                url,
                error_message(&body),
            ));
        }

        let events: Vec<Event> = serde_json::from_str(&body)
            .map_err(|e| ClientError::json_parse(url.clone(), "Failed to parse event page", e))?;
        let links = LinkSet::from_headers(&headers)?;

        debug!(
            event_count = events.len(),
            has_next = links.next().is_some(),
            remaining = ?rate_limit.remaining,
            "Page received"
        );

        Ok(Page { links, rate_limit, events })
    }
}

impl PageSource for FeedApi {
    async fn fetch_page(&self, url: &str) -> Result<Page> {
        self.get_page(url).await
    }
}

fn error_message(body: &str) -> CompactString {
    match serde_json::from_str::<FeedApiError>(body) {
        Ok(api_error) => api_error.message,
        Err(_) if body.len() > 200 => {
            let cut = body.char_indices().nth(200).map_or(body.len(), |(i, _)| i);
            format_compact!("{}...", &body[..cut])
        },
        Err(_) => body.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_api_message() {
        assert_eq!(
            error_message(r#"{"message":"Server Error","documentation_url":"x"}"#),
            "Server Error"
        );
        assert_eq!(error_message("bad gateway"), "bad gateway");
    }

    #[test]
    fn error_message_truncates_long_bodies() {
        let body = "x".repeat(500);
        assert_eq!(error_message(&body).len(), 203);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = ClientConfig::new("not a url", "token");
        assert!(matches!(FeedApi::new(config), Err(ClientError::ConfigValidation { .. })));
    }
}
