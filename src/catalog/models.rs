use chrono::NaiveDate;
use serde::Deserialize;

/// Response envelope shared by every catalog endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub error: bool,
    #[serde(default)]
    pub error_message: String,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// An authoritative show record from the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct ShowRecord {
    #[serde(rename = "showid")]
    pub id: i64,
    #[serde(rename = "showdate")]
    pub date: NaiveDate,
    /// Absent for a handful of historical shows; shows without a venue id
    /// never participate in run grouping.
    #[serde(rename = "venueid", default)]
    pub venue_id: Option<i64>,
    #[serde(rename = "venue", default)]
    pub venue_name: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(rename = "setlist_notes", default)]
    pub notes: Option<String>,
}

/// A raw setlist payload for one show. The body is the semi-structured
/// free-text blob parsed by the `setlist` module.
#[derive(Debug, Clone, Deserialize)]
pub struct SetlistRecord {
    #[serde(rename = "showdate")]
    pub date: NaiveDate,
    #[serde(rename = "setlistdata")]
    pub body: String,
    #[serde(rename = "venueid", default)]
    pub venue_id: Option<i64>,
}

/// A venue record from the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct VenueRecord {
    #[serde(rename = "venueid")]
    pub id: i64,
    #[serde(rename = "venuename")]
    pub name: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}
