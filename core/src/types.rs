//! Domain types for the picture-of-the-day feed.
//!
//! # Design
//! The record is display data: apart from the date, nothing is validated.
//! Wire names follow the feed (`media_type`, `service_version`, `url`,
//! `hdurl`); Rust field names follow Rust conventions and serde bridges the
//! two. A missing required field fails the whole decode, so a partially
//! populated record can never exist.

use serde::{Deserialize, Serialize};

use crate::date::CalendarDate;

/// One day's entry in the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PictureRecord {
    pub date: CalendarDate,
    pub title: String,
    pub explanation: String,
    /// Standard-resolution asset (or the embed URL for videos).
    #[serde(rename = "url")]
    pub media_url: String,
    /// High-resolution asset; the feed omits it for videos and some images.
    #[serde(rename = "hdurl", default, skip_serializing_if = "Option::is_none")]
    pub hd_url: Option<String>,
    pub media_type: MediaType,
    /// Opaque, passed through untouched.
    pub service_version: String,
}

impl PictureRecord {
    /// URL to show for an image entry: the HD asset when the feed has one.
    /// `None` for videos and unsupported media.
    pub fn preferred_image_url(&self) -> Option<&str> {
        match self.media_type {
            MediaType::Image => Some(self.hd_url.as_deref().unwrap_or(&self.media_url)),
            _ => None,
        }
    }
}

/// Kind of asset behind `media_url`.
///
/// The feed occasionally publishes kinds other than image and video; those
/// decode to `Unsupported` carrying the raw value instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MediaType {
    Image,
    Video,
    Unsupported(String),
}

impl MediaType {
    pub fn is_supported(&self) -> bool {
        !matches!(self, MediaType::Unsupported(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            MediaType::Image => "image",
            MediaType::Video => "video",
            MediaType::Unsupported(raw) => raw,
        }
    }
}

impl From<String> for MediaType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "image" => MediaType::Image,
            "video" => MediaType::Video,
            _ => MediaType::Unsupported(raw),
        }
    }
}

impl From<MediaType> for String {
    fn from(m: MediaType) -> Self {
        match m {
            MediaType::Unsupported(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}
