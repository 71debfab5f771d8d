//! Local stand-in for the picture-of-the-day endpoint.
//!
//! Serves `GET /planetary/apod` with the same query parameters, status codes
//! and error bodies as the public feed, from an in-memory catalog. Entry
//! types are defined here independently of the client core so integration
//! tests catch schema drift.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};

pub const APOD_PATH: &str = "/planetary/apod";
pub const SERVICE_VERSION: &str = "v1";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One catalog entry, serialized exactly as the feed does.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Apod {
    pub date: String,
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hdurl: Option<String>,
    pub media_type: String,
    pub service_version: String,
    pub title: String,
    pub url: String,
}

impl Apod {
    pub fn image(date: NaiveDate, title: &str) -> Self {
        let stem = date.format("%y%m%d");
        Self {
            date: date.format(DATE_FORMAT).to_string(),
            explanation: format!("{title}, as photographed on {}.", date.format("%B %-d, %Y")),
            hdurl: Some(format!("https://apod.example.test/image/{stem}_hd.jpg")),
            media_type: "image".to_string(),
            service_version: SERVICE_VERSION.to_string(),
            title: title.to_string(),
            url: format!("https://apod.example.test/image/{stem}.jpg"),
        }
    }

    pub fn video(date: NaiveDate, title: &str) -> Self {
        Self {
            date: date.format(DATE_FORMAT).to_string(),
            explanation: format!("{title} (video)."),
            hdurl: None,
            media_type: "video".to_string(),
            service_version: SERVICE_VERSION.to_string(),
            title: title.to_string(),
            url: format!("https://video.example.test/embed/{}", date.format("%Y%m%d")),
        }
    }
}

/// Server state: accepted key, the day the server considers "today", the
/// entries, and an optional number of requests left before rate limiting.
#[derive(Clone, Debug)]
pub struct Catalog {
    pub api_key: String,
    pub today: NaiveDate,
    pub entries: BTreeMap<NaiveDate, Apod>,
    pub request_budget: Option<u32>,
}

impl Catalog {
    pub fn new(api_key: &str, today: NaiveDate) -> Self {
        Self {
            api_key: api_key.to_string(),
            today,
            entries: BTreeMap::new(),
            request_budget: None,
        }
    }

    /// Add an entry keyed by its own `date`. Entries with unparseable dates
    /// are ignored.
    pub fn with_entry(mut self, entry: Apod) -> Self {
        if let Ok(date) = NaiveDate::parse_from_str(&entry.date, DATE_FORMAT) {
            self.entries.insert(date, entry);
        }
        self
    }

    /// Answer 429 once `requests` authenticated requests have been served.
    pub fn with_request_budget(mut self, requests: u32) -> Self {
        self.request_budget = Some(requests);
        self
    }

    /// A small catalog with the first entry, a video, and one for `today`.
    pub fn sample(api_key: &str, today: NaiveDate) -> Self {
        let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap_or(today);
        Self::new(api_key, today)
            .with_entry(Apod::image(day(1995, 6, 16), "Neutron Star Earth"))
            .with_entry(Apod::image(day(2012, 8, 6), "Curiosity Has Landed"))
            .with_entry(Apod::video(day(2021, 2, 18), "Perseverance Descent"))
            .with_entry(Apod::image(today, "Today's Sky"))
    }

    fn epoch() -> NaiveDate {
        NaiveDate::from_ymd_opt(1995, 6, 16).unwrap_or(NaiveDate::MIN)
    }
}

pub type Db = Arc<RwLock<Catalog>>;

#[derive(Deserialize)]
pub struct ApodQuery {
    pub api_key: Option<String>,
    pub date: Option<String>,
}

pub fn app(catalog: Catalog) -> Router {
    app_with_db(Arc::new(RwLock::new(catalog)))
}

/// Router over a shared catalog, for callers that mutate it while serving.
pub fn app_with_db(db: Db) -> Router {
    Router::new().route(APOD_PATH, get(get_apod)).with_state(db)
}

pub async fn run(listener: TcpListener, catalog: Catalog) -> Result<(), std::io::Error> {
    axum::serve(listener, app(catalog)).await
}

async fn get_apod(State(db): State<Db>, Query(query): Query<ApodQuery>) -> Response {
    let mut catalog = db.write().await;

    match query.api_key.as_deref() {
        None | Some("") => {
            return gateway_error(
                StatusCode::FORBIDDEN,
                "API_KEY_MISSING",
                "No api_key was supplied. Get one at https://api.nasa.gov:443",
            )
        }
        Some(key) if key != catalog.api_key => {
            return gateway_error(
                StatusCode::FORBIDDEN,
                "API_KEY_INVALID",
                "An invalid api_key was supplied. Get one at https://api.nasa.gov:443",
            )
        }
        Some(_) => {}
    }

    if let Some(budget) = catalog.request_budget.as_mut() {
        if *budget == 0 {
            tracing::warn!("request budget exhausted");
            return gateway_error(
                StatusCode::TOO_MANY_REQUESTS,
                "OVER_RATE_LIMIT",
                "You have exceeded your rate limit. Try again later.",
            );
        }
        *budget -= 1;
    }

    let today = catalog.today;
    let entry = match query.date.as_deref() {
        None => catalog
            .entries
            .range(..=today)
            .next_back()
            .map(|(_, e)| e.clone()),
        Some(raw) => {
            let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) else {
                return feed_error(
                    StatusCode::BAD_REQUEST,
                    format!("time data '{raw}' does not match format '{DATE_FORMAT}'"),
                );
            };
            if date < Catalog::epoch() || date > today {
                return feed_error(
                    StatusCode::BAD_REQUEST,
                    format!(
                        "Date must be between Jun 16, 1995 and {}.",
                        today.format("%b %d, %Y")
                    ),
                );
            }
            catalog.entries.get(&date).cloned()
        }
    };

    match entry {
        Some(entry) => {
            tracing::debug!(date = %entry.date, "serving entry");
            (StatusCode::OK, Json(entry)).into_response()
        }
        None => feed_error(
            StatusCode::NOT_FOUND,
            format!(
                "No data available for date: {}",
                query.date.as_deref().unwrap_or("latest")
            ),
        ),
    }
}

/// Error body produced by the feed application itself.
fn feed_error(status: StatusCode, msg: String) -> Response {
    let body = json!({
        "code": status.as_u16(),
        "msg": msg,
        "service_version": SERVICE_VERSION,
    });
    (status, Json(body)).into_response()
}

/// Error body produced by the API gateway in front of the feed.
fn gateway_error(status: StatusCode, code: &str, message: &str) -> Response {
    let body = json!({ "error": { "code": code, "message": message } });
    (status, Json(body)).into_response()
}
