//! Client core for the astronomy picture-of-the-day feed.
//!
//! # Overview
//! Fetches one date-keyed record from the feed and keeps the state a
//! single-screen viewer needs: the selected date, the last loaded picture, a
//! loading flag and an error message. Presentation is someone else's job; it
//! subscribes to snapshots and calls the store's commands.
//!
//! # Design
//! - `ApodClient` is stateless. Each fetch is split into `build_fetch`
//!   (produces the request) and `parse_fetch` (consumes the response), so the
//!   I/O boundary is explicit and the core stays deterministic under test.
//! - `PictureStore` owns the state and publishes complete `Snapshot`s. Loads
//!   are begun and completed through `LoadTicket`s; stale completions are
//!   dropped by sequence number.
//! - `StoreDriver` executes tickets through a `Transport` on worker threads.
//! - Dates are local calendar days, bounded by the feed epoch and today.

pub mod client;
pub mod config;
pub mod date;
pub mod driver;
pub mod error;
pub mod http;
pub mod store;
pub mod transport;
pub mod types;

pub use client::ApodClient;
pub use config::ApodConfig;
pub use date::{CalendarDate, Clock, DateBounds, FixedClock, SystemClock, FEED_EPOCH};
pub use driver::StoreDriver;
pub use error::{ConfigError, FailureKind, FetchError, SelectError, TransportError};
pub use http::{HttpRequest, HttpResponse};
pub use store::{LoadTicket, Phase, PictureStore, Snapshot, SubscriptionId};
pub use transport::{Transport, UreqTransport};
pub use types::{MediaType, PictureRecord};
