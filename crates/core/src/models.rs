//! Response and request shapes exchanged with the backend recommendation API.
//!
//! These are contracts owned by the backend. Unknown keys are ignored, nullable fields accept
//! either `null` or omission, and every other field must be present with the declared JSON type.
//! Deserializing into these types is the schema validation performed by the fetch client.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A media attachment on a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub url: String,
    pub medium: Option<String>,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Media {
    pub fn is_image(&self) -> bool {
        self.medium.as_deref() == Some("image")
            || self
                .mime_type
                .as_deref()
                .is_some_and(|t| t.starts_with("image/"))
    }
}

/// A piece of content as the backend publishes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: i64,
    pub date: String,
    pub title: String,
    /// HTML fragment.
    pub description: String,
    pub url: String,
    pub media: Option<Vec<Media>>,
    pub source_id: i64,
    pub content_type: Option<String>,
}

impl ContentItem {
    /// Publication time, if `date` is RFC 3339 or a naive ISO-8601 timestamp (read as UTC).
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.date) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&self.date, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    /// Hostname of the canonical URL.
    pub fn host(&self) -> Option<String> {
        Url::parse(&self.url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_owned))
    }

    /// The first attachment, when it is an image.
    pub fn lead_image(&self) -> Option<&Media> {
        self.media
            .as_deref()
            .and_then(|media| media.first())
            .filter(|m| m.is_image())
    }
}

/// How a user feels about a content item, derived from the sign of the rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Upvoted,
    Downvoted,
    Neutral,
}

impl Sentiment {
    pub fn from_rating(rating: i64) -> Self {
        match rating {
            r if r > 0 => Sentiment::Upvoted,
            r if r < 0 => Sentiment::Downvoted,
            _ => Sentiment::Neutral,
        }
    }

    /// The rating value submitted as feedback for this sentiment.
    pub fn rating(self) -> i64 {
        match self {
            Sentiment::Upvoted => 1,
            Sentiment::Downvoted => -1,
            Sentiment::Neutral => 0,
        }
    }
}

/// A content item as seen by one user: a snapshot of their rating plus the source URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContentItem {
    #[serde(flatten)]
    pub item: ContentItem,
    pub rating: i64,
    pub source_url: String,
}

impl UserContentItem {
    pub fn sentiment(&self) -> Sentiment {
        Sentiment::from_rating(self.rating)
    }
}

/// A user-curated topic collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flavour {
    pub id: i64,
    pub nickname: Option<String>,
}

impl Flavour {
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or("Untitled flavour")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlavourDetails {
    pub nickname: Option<String>,
}

/// A user's signed rating of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub content_id: i64,
    pub rating: i64,
}

// Envelopes and request bodies.

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedPage {
    pub content: Vec<UserContentItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OnboardingPage {
    pub content: Vec<ContentItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FlavourList {
    pub flavours: Vec<Flavour>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FlavourEnvelope {
    pub flavour: FlavourDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CreatedFlavour {
    pub id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NewFlavour {
    pub content_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OnboardingSelection {
    pub selected_content: Vec<i64>,
}
