//! Client for the external mail-retrieval API.
//!
//! The upstream exposes a paginated message listing per address; this
//! service only ever wants the single most-recent message. Failures are
//! surfaced with a descriptive error and never retried automatically; the
//! operator retries through the UI's refresh action.

use reqwest::{StatusCode, header};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

#[derive(Debug, Error)]
pub enum MailApiError {
    #[error("mail retrieval request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail retrieval service responded with status {0}")]
    Status(StatusCode),
}

/// The parts of the most-recent upstream message this service consumes.
#[derive(Debug, Clone)]
pub struct RetrievedMessage {
    pub subject: String,
    pub body: String,
    /// Passed through as an opaque string; the upstream's timestamp format
    /// is not ours to parse.
    pub received_time: String,
    pub sender: Option<String>,
}

#[derive(Clone)]
pub struct MailClient {
    http: reqwest::Client,
    base_url: String,
    public_token: Option<String>,
    cookie: Option<String>,
    sender_keyword: String,
}

impl MailClient {
    pub fn new(
        base_url: String,
        public_token: Option<String>,
        cookie: Option<String>,
        sender_keyword: String,
    ) -> Result<Self, MailApiError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            base_url,
            public_token,
            cookie,
            sender_keyword,
        })
    }

    /// Fetch the single most-recent message for `address`.
    ///
    /// `Ok(None)` when the upstream reports no messages for the address.
    pub async fn fetch_latest_message(
        &self,
        address: &str,
    ) -> Result<Option<RetrievedMessage>, MailApiError> {
        let url = format!("{}/api/messages", self.base_url.trim_end_matches('/'));
        let mut request = self
            .http
            .get(&url)
            .query(&[("email", address), ("page_size", "1"), ("page", "1")])
            .header(header::ACCEPT, "application/json, text/plain, */*");
        if let Some(token) = &self.public_token {
            request = request.header("X-Public-Token", token);
        }
        if let Some(cookie) = &self.cookie {
            request = request.header(header::COOKIE, cookie);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(MailApiError::Status(response.status()));
        }

        let envelope: MessagesEnvelope = response.json().await?;
        Ok(latest_message(envelope))
    }

    /// Sender/subject heuristic: the retrieval inbox receives all kinds of
    /// mail; only messages mentioning the configured keyword in the subject
    /// or sender address are worth running through the extractor.
    pub fn matches_heuristic(&self, message: &RetrievedMessage) -> bool {
        let keyword = self.sender_keyword.to_lowercase();
        message.subject.to_lowercase().contains(&keyword)
            || message
                .sender
                .as_deref()
                .is_some_and(|sender| sender.to_lowercase().contains(&keyword))
    }
}

#[derive(Debug, Deserialize)]
struct MessagesEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<MessagesPage>,
}

#[derive(Debug, Deserialize)]
struct MessagesPage {
    #[serde(default)]
    items: Vec<MessageItem>,
}

#[derive(Debug, Deserialize)]
struct MessageItem {
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    body: Option<MessageBody>,
    #[serde(rename = "receivedDateTime", default)]
    received_date_time: Option<String>,
    #[serde(default)]
    sender: Option<MessageSender>,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageSender {
    #[serde(rename = "emailAddress", default)]
    email_address: Option<MessageAddress>,
}

#[derive(Debug, Deserialize)]
struct MessageAddress {
    #[serde(default)]
    address: Option<String>,
}

/// Flatten the upstream envelope down to the one message this service uses.
fn latest_message(envelope: MessagesEnvelope) -> Option<RetrievedMessage> {
    if !envelope.success {
        return None;
    }
    let item = envelope.data?.items.into_iter().next()?;
    Some(RetrievedMessage {
        subject: item.subject.unwrap_or_default(),
        body: item.body.and_then(|b| b.content).unwrap_or_default(),
        received_time: item.received_date_time.unwrap_or_default(),
        sender: item
            .sender
            .and_then(|s| s.email_address)
            .and_then(|a| a.address),
    })
}
