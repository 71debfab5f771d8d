//! Request builder and response parser for the picture-of-the-day feed.
//!
//! # Design
//! `ApodClient` holds only a base URL and the access key and carries no
//! mutable state between calls. A fetch is split into `build_fetch`, which
//! produces an `HttpRequest`, and `parse_fetch`, which consumes an
//! `HttpResponse`. `fetch` glues the two around a `Transport` for callers that
//! want a single blocking call; each call is independent, with no retries and
//! no caching.

use serde::Deserialize;

use crate::config::ApodConfig;
use crate::date::CalendarDate;
use crate::error::FetchError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;
use crate::types::PictureRecord;

#[derive(Clone)]
pub struct ApodClient {
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for ApodClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApodClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ApodClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn from_config(config: &ApodConfig) -> Self {
        Self::new(&config.base_url, config.api_key())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the GET for `date`, or for the feed's latest entry when `None`.
    ///
    /// The date is formatted from the calendar day exactly as selected; no
    /// timezone conversion happens here.
    pub fn build_fetch(&self, date: Option<CalendarDate>) -> HttpRequest {
        let mut url = format!(
            "{}?api_key={}",
            self.base_url,
            urlencoding::encode(&self.api_key)
        );
        if let Some(date) = date {
            url.push_str(&format!("&date={date}"));
        }
        HttpRequest {
            url,
            headers: vec![("accept".to_string(), "application/json".to_string())],
        }
    }

    pub fn parse_fetch(&self, response: HttpResponse) -> Result<PictureRecord, FetchError> {
        check_status(&response)?;
        serde_json::from_str(&response.body).map_err(|e| FetchError::Decode(e.to_string()))
    }

    /// Build, execute and parse in one blocking call.
    pub fn fetch(
        &self,
        transport: &dyn Transport,
        date: Option<CalendarDate>,
    ) -> Result<PictureRecord, FetchError> {
        let request = self.build_fetch(date);
        let response = transport.execute(&request)?;
        self.parse_fetch(response)
    }
}

/// Error bodies the feed and its gateway emit. The feed itself uses
/// `{"code": 400, "msg": "..."}`; the gateway uses
/// `{"error": {"code": "OVER_RATE_LIMIT", "message": "..."}}`.
#[derive(Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    error: Option<GatewayError>,
}

#[derive(Deserialize)]
struct GatewayError {
    message: Option<String>,
}

/// Map non-2xx statuses to `FetchError::Http`, keeping the server's
/// explanation when the body has one.
fn check_status(response: &HttpResponse) -> Result<(), FetchError> {
    if response.is_success() {
        return Ok(());
    }
    let message = serde_json::from_str::<ErrorBody>(&response.body)
        .ok()
        .and_then(|b| b.msg.or_else(|| b.error.and_then(|e| e.message)));
    Err(FetchError::Http {
        status: response.status,
        message,
    })
}
