//! Torn API client: one GET per member, outcome classified for the caller.

use serde::Deserialize;
use thiserror::Error;

use crate::{config::TrackerConfig, error::TrackerResult, types::MemberId};

/// Why a single member's fetch produced no count.
///
/// None of these are fatal. The fetch cycle reports the failure for that
/// member and moves on to the next one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The service answered with its structured error payload instead of
    /// data (bad key, rate limit, unknown user, ...).
    #[error("API Error Code {code}: {message}")]
    Api { code: u16, message: String },

    #[error("Request timed out.")]
    Timeout,

    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("Response did not contain a criminal record total.")]
    MalformedResponse,
}

/// Source of crime counts. The production implementation is [`TornClient`];
/// tests drive the fetch cycle with scripted fakes.
pub trait StatFetcher {
    fn fetch(&self, member_id: MemberId, api_key: &str) -> Result<i64, FetchError>;
}

/// Top-level shape of the user endpoint's reply. The service returns 200
/// for most application-level failures, so an `error` object present in
/// the body outranks any data next to it.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    error: Option<ApiErrorBody>,
    criminalrecord: Option<CriminalRecord>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(rename = "error", default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct CriminalRecord {
    total: Option<i64>,
}

pub struct TornClient {
    http:     reqwest::blocking::Client,
    base_url: String,
}

impl TornClient {
    pub fn new(config: &TrackerConfig) -> TrackerResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
        })
    }

    fn classify(envelope: ApiEnvelope) -> Result<i64, FetchError> {
        if let Some(err) = envelope.error {
            return Err(FetchError::Api {
                code: err.code,
                message: err.message,
            });
        }
        envelope
            .criminalrecord
            .and_then(|record| record.total)
            .ok_or(FetchError::MalformedResponse)
    }
}

impl StatFetcher for TornClient {
    fn fetch(&self, member_id: MemberId, api_key: &str) -> Result<i64, FetchError> {
        let url = format!(
            "{}{member_id}?selections=crimes&key={api_key}",
            self.base_url
        );
        let response = self
            .http
            .get(&url)
            .send()
            .map_err(transport_error)?
            .error_for_status()
            .map_err(transport_error)?;
        let envelope: ApiEnvelope = response.json().map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else if e.is_decode() {
                FetchError::MalformedResponse
            } else {
                transport_error(e)
            }
        })?;
        Self::classify(envelope)
    }
}

fn transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        // Strip the URL before stringifying; it carries the API key.
        FetchError::Transport(e.without_url().to_string())
    }
}
