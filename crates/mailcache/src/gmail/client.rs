//! Gmail API HTTP client
//!
//! Implements [`MailProvider`] against the Gmail REST API.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result, anyhow};
use log::{debug, warn};
use std::time::Duration;
use url::Url;

use super::api::{GmailMessage, ListMessagesResponse, ModifyRequest};
use super::normalize_message;
use crate::models::{EmailId, labels};
use crate::provider::{MailProvider, Page};

/// Supplies bearer tokens for API calls
pub trait TokenSource: Send + Sync {
    fn access_token(&self) -> Result<String>;
}

/// A fixed token obtained elsewhere; never refreshed
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl TokenSource for StaticToken {
    fn access_token(&self) -> Result<String> {
        if self.0.trim().is_empty() {
            anyhow::bail!("Gmail access token is empty");
        }
        Ok(self.0.clone())
    }
}

/// Gmail-backed [`MailProvider`]
pub struct GmailProvider {
    tokens: Box<dyn TokenSource>,
    base_url: String,
    max_retries: u32,
}

impl GmailProvider {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Gmail rejects larger pages
    const MAX_PAGE_SIZE: usize = 500;

    pub fn new(tokens: impl TokenSource + 'static) -> Self {
        Self {
            tokens: Box::new(tokens),
            base_url: Self::BASE_URL.to_string(),
            max_retries: 3,
        }
    }

    /// Attempts per message fetch (at least one)
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Point the client at another API root, e.g. a local stub server
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn bearer(&self) -> Result<String> {
        Ok(format!("Bearer {}", self.tokens.access_token()?))
    }

    fn message_url(&self, id: &EmailId, suffix: &str) -> String {
        format!(
            "{}/users/me/messages/{}{}",
            self.base_url,
            urlencoding::encode(id.as_str()),
            suffix
        )
    }

    /// List message ids matching a search query
    pub fn list_messages(
        &self,
        query: &str,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse> {
        let mut url = Url::parse(&format!("{}/users/me/messages", self.base_url))
            .context("Invalid Gmail base URL")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair(
                "maxResults",
                &max_results.clamp(1, Self::MAX_PAGE_SIZE).to_string(),
            );
        if let Some(token) = page_token {
            url.query_pairs_mut().append_pair("pageToken", token);
        }

        let mut response = ureq::get(url.as_str())
            .header("Authorization", &self.bearer()?)
            .call()
            .context("Failed to send list messages request")?;

        let list: ListMessagesResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse list messages response")?;

        Ok(list)
    }

    /// Get the headers and labels of one message
    pub fn get_message(&self, id: &EmailId) -> Result<GmailMessage> {
        let url = self.message_url(id, "?format=metadata");

        let mut response = ureq::get(&url)
            .header("Authorization", &self.bearer()?)
            .call()
            .context("Failed to send get message request")?;

        let message: GmailMessage = response
            .body_mut()
            .read_json()
            .context("Failed to parse message response")?;

        Ok(message)
    }

    /// Get a message with exponential backoff retry
    fn get_message_with_retry(&self, id: &EmailId) -> Result<GmailMessage> {
        let mut last_error = None;
        let mut delay = Duration::from_millis(100);

        for attempt in 0..self.max_retries {
            match self.get_message(id) {
                Ok(msg) => return Ok(msg),
                Err(e) => {
                    debug!("Fetching message {} failed (attempt {}): {:#}", id, attempt + 1, e);
                    last_error = Some(e);
                    if attempt + 1 < self.max_retries {
                        let jitter = Duration::from_millis(rand_jitter());
                        std::thread::sleep(delay + jitter);
                        delay *= 2;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("No attempts made for message {}", id)))
    }

    /// Add and remove labels on one message
    pub fn modify_message(&self, id: &EmailId, add: &[&str], remove: &[&str]) -> Result<()> {
        let body = ModifyRequest {
            add_label_ids: add.iter().map(|l| l.to_string()).collect(),
            remove_label_ids: remove.iter().map(|l| l.to_string()).collect(),
        };

        ureq::post(&self.message_url(id, "/modify"))
            .header("Authorization", &self.bearer()?)
            .send_json(&body)
            .with_context(|| format!("Failed to modify message {}", id))?;

        Ok(())
    }
}

impl MailProvider for GmailProvider {
    fn fetch_page(&self, query: &str, page_size: usize, page_token: Option<&str>) -> Result<Page> {
        let list = self.list_messages(query, page_size, page_token)?;
        let refs = list.messages.unwrap_or_default();

        let mut items = Vec::with_capacity(refs.len());
        for msg_ref in refs {
            let id = EmailId::new(msg_ref.id);
            let record = self
                .get_message_with_retry(&id)
                .and_then(normalize_message);
            match record {
                Ok(record) => items.push(record),
                // One bad message should not sink the page
                Err(e) => warn!("Skipping message {}: {:#}", id, e),
            }
        }

        Ok(Page {
            items,
            next_page_token: list.next_page_token,
        })
    }

    /// Moves the message to trash
    fn delete(&self, id: &EmailId) -> Result<()> {
        ureq::post(&self.message_url(id, "/trash"))
            .header("Authorization", &self.bearer()?)
            .send_empty()
            .with_context(|| format!("Failed to trash message {}", id))?;
        Ok(())
    }

    fn mark_read(&self, id: &EmailId, is_read: bool) -> Result<()> {
        if is_read {
            self.modify_message(id, &[], &[labels::UNREAD])
        } else {
            self.modify_message(id, &[labels::UNREAD], &[])
        }
    }
}

/// Generate a random jitter value (0-100ms)
fn rand_jitter() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let hasher = RandomState::new().build_hasher();
    hasher.finish() % 100
}
