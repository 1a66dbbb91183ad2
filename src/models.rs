//! Data models for the earthquake backend's JSON payloads.
//!
//! Field names follow the backend's camelCase contract. Records are
//! immutable once fetched; a new fetch replaces them wholesale.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::SeismodashError;

/// Where an earthquake happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// An observed earthquake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarthquakeRecord {
    /// Backend identifier (numeric or string on the wire)
    #[serde(deserialize_with = "de_id")]
    pub id: String,

    pub magnitude: f64,

    /// Depth in kilometers
    pub depth: f64,

    pub location: Location,

    #[serde(with = "timestamp")]
    pub occurrence_date: NaiveDateTime,
}

impl EarthquakeRecord {
    /// Validate the record structure.
    pub fn validate(&self) -> Result<(), SeismodashError> {
        if self.id.is_empty() {
            return Err(SeismodashError::Validation("empty earthquake ID".into()));
        }
        if !self.magnitude.is_finite() {
            return Err(SeismodashError::Validation(format!(
                "earthquake {} has non-finite magnitude",
                self.id
            )));
        }
        Ok(())
    }
}

/// A backend-computed earthquake prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    #[serde(deserialize_with = "de_id")]
    pub id: String,

    pub magnitude: f64,

    pub depth: f64,

    pub location: Location,

    #[serde(with = "timestamp")]
    pub occurrence_date: NaiveDateTime,

    /// Likelihood in [0, 1]
    pub possibility: f64,

    #[serde(with = "timestamp")]
    pub prediction_date: NaiveDateTime,
}

impl PredictionRecord {
    /// Validate the record structure.
    pub fn validate(&self) -> Result<(), SeismodashError> {
        if self.id.is_empty() {
            return Err(SeismodashError::Validation("empty prediction ID".into()));
        }
        if !(0.0..=1.0).contains(&self.possibility) {
            return Err(SeismodashError::Validation(format!(
                "prediction {} has possibility {} outside [0, 1]",
                self.id, self.possibility
            )));
        }
        Ok(())
    }
}

/// Read access shared by observed and predicted earthquakes.
pub trait Quake {
    fn id(&self) -> &str;
    fn magnitude(&self) -> f64;
    fn depth(&self) -> f64;
    fn location(&self) -> &Location;
    fn occurrence_date(&self) -> NaiveDateTime;

    /// Only predictions carry a possibility.
    fn possibility(&self) -> Option<f64> {
        None
    }

    fn prediction_date(&self) -> Option<NaiveDateTime> {
        None
    }
}

impl Quake for EarthquakeRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn magnitude(&self) -> f64 {
        self.magnitude
    }

    fn depth(&self) -> f64 {
        self.depth
    }

    fn location(&self) -> &Location {
        &self.location
    }

    fn occurrence_date(&self) -> NaiveDateTime {
        self.occurrence_date
    }
}

impl Quake for PredictionRecord {
    fn id(&self) -> &str {
        &self.id
    }

    fn magnitude(&self) -> f64 {
        self.magnitude
    }

    fn depth(&self) -> f64 {
        self.depth
    }

    fn location(&self) -> &Location {
        &self.location
    }

    fn occurrence_date(&self) -> NaiveDateTime {
        self.occurrence_date
    }

    fn possibility(&self) -> Option<f64> {
        Some(self.possibility)
    }

    fn prediction_date(&self) -> Option<NaiveDateTime> {
        Some(self.prediction_date)
    }
}

/// One page of a server-side paginated result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult<T> {
    pub content: Vec<T>,

    #[serde(default)]
    pub total_elements: u64,

    #[serde(default)]
    pub total_pages: u32,

    /// 0-based page index
    #[serde(default, alias = "number")]
    pub page_number: u32,

    #[serde(default, alias = "size")]
    pub page_size: u32,
}

impl<T> PageResult<T> {
    /// An empty page, used when a query is known to match nothing.
    #[must_use]
    pub fn empty(page_size: u32) -> Self {
        Self {
            content: Vec::new(),
            total_elements: 0,
            total_pages: 0,
            page_number: 0,
            page_size,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// The logged-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    #[serde(deserialize_with = "de_id")]
    pub id: String,

    pub email: String,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    #[serde(default, deserialize_with = "de_authorities")]
    pub authorities: Vec<String>,

    #[serde(default, alias = "verified")]
    pub is_verified: bool,
}

impl UserSession {
    #[must_use]
    pub fn display_name(&self) -> String {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }
}

/// An entry from the report listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    #[serde(deserialize_with = "de_id")]
    pub id: String,

    #[serde(default, alias = "title", alias = "fileName")]
    pub name: String,

    #[serde(default)]
    pub created_at: Option<String>,
}

/// A downloaded report document.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub filename: String,
    pub content: Vec<u8>,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/verify`.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyRequest {
    pub email: String,
    pub code: String,
}

/// Body of the resend and forgot-password calls.
#[derive(Debug, Clone, Serialize)]
pub struct EmailRequest {
    pub email: String,
}

/// Body of `PATCH /user/me`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Accept ids sent either as JSON numbers or strings.
fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Num(i64),
        Str(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Num(n) => n.to_string(),
        RawId::Str(s) => s,
    })
}

/// Accept authorities as plain strings or `{ "authority": "..." }` objects.
fn de_authorities<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAuthority {
        Plain(String),
        Object { authority: String },
    }

    let raw = Vec::<RawAuthority>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|a| match a {
            RawAuthority::Plain(s) | RawAuthority::Object { authority: s } => s,
        })
        .collect())
}

/// Wire format for backend timestamps.
///
/// Accepts a bare date, a local date-time with optional fractional seconds,
/// or RFC 3339. Always writes `YYYY-MM-DDTHH:MM:SS`.
pub mod timestamp {
    use chrono::{DateTime, NaiveDate, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    /// Parse any of the accepted timestamp shapes.
    #[must_use]
    pub fn parse(s: &str) -> Option<NaiveDateTime> {
        let s = s.trim();
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(dt);
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
            return Some(dt);
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.naive_utc());
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {s}")))
    }
}

/// Start of the given day as a timestamp.
#[must_use]
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(chrono::NaiveTime::MIN)
}

/// Last second of the given day as a timestamp.
#[must_use]
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59)
        .unwrap_or_else(|| start_of_day(date))
}
