//! The HTTP ingestion sender.
//!
//! ## Metrics
//!
//! `requests_sent`: Total number of requests sent
//! `request_ok`: Requests answered with 200 or 201
//! `request_failure`: Requests answered with any other status, or that failed
//! in transport
//! `bytes_written`: Total body bytes written
//!

use std::time::Duration;

use metrics::counter;
use reqwest::{StatusCode, Url, header::CONTENT_TYPE};
use synth_match_payload::Event;
use tracing::{debug, trace};

use crate::config::{self, Endpoint};

#[derive(thiserror::Error, Debug)]
/// Errors produced by [`Sender`].
pub enum Error {
    /// The endpoint configuration is unusable
    #[error(transparent)]
    Config(#[from] config::Error),
    /// Wrapper around [`reqwest::Error`] raised while building the client
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    /// An event could not be encoded
    #[error("Event could not be encoded: {0}")]
    Json(#[from] serde_json::Error),
}

/// The result of delivering one event.
///
/// None of these stop a run; the caller logs and moves on.
#[derive(Debug)]
pub enum Outcome {
    /// The endpoint accepted the event with 200 or 201
    Delivered {
        /// Response status
        status: StatusCode,
    },
    /// The endpoint answered with any other status
    Rejected {
        /// Response status
        status: StatusCode,
        /// Response body, empty if unreadable
        body: String,
    },
    /// No response was obtained: connect, DNS, TLS or timeout failure. The
    /// error carries no URL, the ingestion token lives in its query.
    Transport(reqwest::Error),
}

/// Delivers events to the ingestion endpoint one request at a time.
pub struct Sender {
    client: reqwest::Client,
    uri: Url,
    username: String,
    password: String,
    metric_labels: Vec<(String, String)>,
}

// Token and password stay out of logs.
impl std::fmt::Debug for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut uri = self.uri.clone();
        uri.set_query(None);
        f.debug_struct("Sender")
            .field("uri", &uri.as_str())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("metric_labels", &self.metric_labels)
            .finish_non_exhaustive()
    }
}

impl Sender {
    /// Create a new [`Sender`] instance
    ///
    /// # Errors
    ///
    /// Creation will fail if the ingestion URL does not parse or the HTTP
    /// client cannot be constructed.
    pub fn new(endpoint: &Endpoint, request_timeout: Duration) -> Result<Self, Error> {
        let uri = endpoint.ingest_url()?;
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        let metric_labels = vec![
            ("component".to_string(), "sender".to_string()),
            ("table".to_string(), endpoint.table.clone()),
        ];

        Ok(Self {
            client,
            uri,
            username: endpoint.username.clone(),
            password: endpoint.password.clone(),
            metric_labels,
        })
    }

    /// POST `event` as JSON with Basic credentials.
    ///
    /// Only 200 and 201 count as delivery; 202 and every other status are
    /// reported as [`Outcome::Rejected`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the event cannot be encoded. Delivery
    /// failures are not errors, see [`Outcome`].
    pub async fn send(&self, event: &Event<'_>) -> Result<Outcome, Error> {
        let body = serde_json::to_vec(event)?;
        let body_length = body.len();
        let labels = &self.metric_labels;

        trace!("POST {body_length} bytes for event at {}", event.timestamp);
        counter!("requests_sent", labels).increment(1);
        let response = self
            .client
            .post(self.uri.clone())
            .basic_auth(&self.username, Some(&self.password))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(source) => {
                let mut error_labels = labels.clone();
                error_labels.push(("error".to_string(), transport_kind(&source).to_string()));
                counter!("request_failure", &error_labels).increment(1);
                return Ok(Outcome::Transport(source.without_url()));
            }
        };

        counter!("bytes_written", labels).increment(body_length as u64);
        let status = response.status();
        let mut status_labels = labels.clone();
        status_labels.push(("status_code".to_string(), status.as_u16().to_string()));

        if status == StatusCode::OK || status == StatusCode::CREATED {
            counter!("request_ok", &status_labels).increment(1);
            Ok(Outcome::Delivered { status })
        } else {
            counter!("request_failure", &status_labels).increment(1);
            let body = response.text().await.unwrap_or_else(|err| {
                debug!("Failed to read response body: {err}");
                String::new()
            });
            Ok(Outcome::Rejected { status, body })
        }
    }
}

fn transport_kind(err: &reqwest::Error) -> &'static str {
    if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else if err.is_request() {
        "request"
    } else {
        "other"
    }
}
