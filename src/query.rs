//! Request parameters derived from the filter criteria.
//!
//! Pure conversions: nothing here touches the network. Default values are
//! left out of the request, except `maxMagnitude`, which the backend
//! expects on every filter call.

use serde::Serialize;

use crate::filters::{FilterCriteria, MIN_MAGNITUDE};
use crate::models::{end_of_day, start_of_day, timestamp};
use crate::transform::PageNumber;

/// Query string of `GET /earthquake/filter`.
#[derive(Debug, Clone, PartialEq)]
pub struct EarthquakeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub city: Option<String>,
    pub min_magnitude: Option<f64>,
    pub max_magnitude: f64,
    /// 0-based backend page index
    pub page: u32,
    pub size: u32,
}

impl EarthquakeQuery {
    #[must_use]
    pub fn new(criteria: &FilterCriteria, page: PageNumber, size: u32) -> Self {
        Self {
            start_date: criteria
                .start_date
                .map(|d| start_of_day(d).format(timestamp::FORMAT).to_string()),
            end_date: criteria
                .end_date
                .map(|d| end_of_day(d).format(timestamp::FORMAT).to_string()),
            city: criteria.city().map(str::to_string),
            min_magnitude: (criteria.min_magnitude > MIN_MAGNITUDE)
                .then_some(criteria.min_magnitude),
            max_magnitude: criteria.max_magnitude,
            page: page.api_index(),
            size,
        }
    }

    /// Key/value pairs in the order the backend documents them.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(7);
        if let Some(v) = &self.start_date {
            pairs.push(("startDate", v.clone()));
        }
        if let Some(v) = &self.end_date {
            pairs.push(("endDate", v.clone()));
        }
        if let Some(v) = &self.city {
            pairs.push(("city", v.clone()));
        }
        if let Some(v) = self.min_magnitude {
            pairs.push(("minMagnitude", v.to_string()));
        }
        pairs.push(("maxMagnitude", self.max_magnitude.to_string()));
        pairs.push(("page", self.page.to_string()));
        pairs.push(("size", self.size.to_string()));
        pairs
    }
}

/// JSON body of `POST /predicted-earthquake/filter`.
///
/// Unlike the earthquake query, absent values are sent as explicit nulls.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionQuery {
    pub min_magnitude: f64,
    pub max_magnitude: f64,
    pub city: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// 0-based backend page index
    pub page: u32,
    pub size: u32,
}

impl PredictionQuery {
    #[must_use]
    pub fn new(criteria: &FilterCriteria, page: PageNumber, size: u32) -> Self {
        let base = EarthquakeQuery::new(criteria, page, size);
        Self {
            min_magnitude: criteria.min_magnitude,
            max_magnitude: base.max_magnitude,
            city: base.city,
            start_date: base.start_date,
            end_date: base.end_date,
            page: base.page,
            size: base.size,
        }
    }
}
