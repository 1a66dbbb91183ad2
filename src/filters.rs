//! Filter criteria and the state container that owns them.
//!
//! The store is passed around explicitly; there is no global filter state.
//! Merges are whole-field replacements and never validate.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::colorize::normalize_city;
use crate::models::{Quake, end_of_day, start_of_day};
use crate::storage::{FILTERS_KEY, LocalStore};

/// Lowest magnitude the dashboard filters on.
pub const MIN_MAGNITUDE: f64 = 0.0;

/// Highest magnitude the dashboard filters on.
pub const MAX_MAGNITUDE: f64 = 10.0;

/// User-selected constraints applied to queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    #[serde(default)]
    pub city: Option<String>,

    #[serde(default = "default_min_magnitude")]
    pub min_magnitude: f64,

    #[serde(default = "default_max_magnitude")]
    pub max_magnitude: f64,
}

fn default_min_magnitude() -> f64 {
    MIN_MAGNITUDE
}

fn default_max_magnitude() -> f64 {
    MAX_MAGNITUDE
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            city: None,
            min_magnitude: MIN_MAGNITUDE,
            max_magnitude: MAX_MAGNITUDE,
        }
    }
}

impl FilterCriteria {
    /// True when nothing narrows the result set, so the summary feed applies.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.start_date.is_none()
            && self.end_date.is_none()
            && self.city().is_none()
            && self.min_magnitude <= MIN_MAGNITUDE
            && self.max_magnitude >= MAX_MAGNITUDE
    }

    /// City filter with blank values treated as absent.
    #[must_use]
    pub fn city(&self) -> Option<&str> {
        self.city
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }

    /// True when the magnitude bounds cannot match anything.
    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.min_magnitude > self.max_magnitude
    }

    /// Check if a record passes all criteria.
    #[must_use]
    pub fn matches<Q: Quake>(&self, record: &Q) -> bool {
        self.check_magnitude(record) && self.check_city(record) && self.check_dates(record)
    }

    /// Keep only the records that pass; order is preserved.
    #[must_use]
    pub fn retain_matching<Q: Quake>(&self, mut records: Vec<Q>) -> Vec<Q> {
        records.retain(|r| self.matches(r));
        records
    }

    fn check_magnitude<Q: Quake>(&self, record: &Q) -> bool {
        let mag = record.magnitude();
        mag >= self.min_magnitude && mag <= self.max_magnitude
    }

    fn check_city<Q: Quake>(&self, record: &Q) -> bool {
        match self.city() {
            None => true,
            Some(city) => normalize_city(city) == normalize_city(&record.location().city),
        }
    }

    fn check_dates<Q: Quake>(&self, record: &Q) -> bool {
        let when = record.occurrence_date();
        let after_start = self.start_date.is_none_or(|d| when >= start_of_day(d));
        let before_end = self.end_date.is_none_or(|d| when <= end_of_day(d));
        after_start && before_end
    }
}

/// A partial update to [`FilterCriteria`].
///
/// Outer `None` leaves a field untouched. For optional fields the inner
/// value distinguishes "clear" (`Some(None)`) from "set".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterPatch {
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub city: Option<Option<String>>,
    pub min_magnitude: Option<f64>,
    pub max_magnitude: Option<f64>,
}

impl FilterPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    #[must_use]
    pub fn start_date(mut self, date: Option<NaiveDate>) -> Self {
        self.start_date = Some(date);
        self
    }

    #[must_use]
    pub fn end_date(mut self, date: Option<NaiveDate>) -> Self {
        self.end_date = Some(date);
        self
    }

    #[must_use]
    pub fn city(mut self, city: Option<String>) -> Self {
        self.city = Some(city);
        self
    }

    #[must_use]
    pub fn min_magnitude(mut self, value: f64) -> Self {
        self.min_magnitude = Some(value);
        self
    }

    #[must_use]
    pub fn max_magnitude(mut self, value: f64) -> Self {
        self.max_magnitude = Some(value);
        self
    }
}

/// Owns the active [`FilterCriteria`], optionally mirrored to a [`LocalStore`].
#[derive(Debug, Clone, Default)]
pub struct FilterStore {
    criteria: FilterCriteria,
    persist: Option<LocalStore>,
}

impl FilterStore {
    /// A store that lives only in memory.
    #[must_use]
    pub fn new(criteria: FilterCriteria) -> Self {
        Self {
            criteria,
            persist: None,
        }
    }

    /// Restore the criteria mirrored in `store`, or start from defaults.
    ///
    /// An unreadable mirror is logged and replaced by defaults.
    #[must_use]
    pub fn load(store: LocalStore) -> Self {
        let criteria = match store.get::<FilterCriteria>(FILTERS_KEY) {
            Ok(Some(c)) => c,
            Ok(None) => FilterCriteria::default(),
            Err(e) => {
                warn!("ignoring stored filters: {}", e);
                FilterCriteria::default()
            }
        };

        Self {
            criteria,
            persist: Some(store),
        }
    }

    #[must_use]
    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Merge `patch` into the current criteria, replacing only provided keys.
    pub fn apply_partial(&mut self, patch: FilterPatch) -> &FilterCriteria {
        if patch.is_empty() {
            return &self.criteria;
        }

        let c = &mut self.criteria;
        if let Some(v) = patch.start_date {
            c.start_date = v;
        }
        if let Some(v) = patch.end_date {
            c.end_date = v;
        }
        if let Some(v) = patch.city {
            c.city = v;
        }
        if let Some(v) = patch.min_magnitude {
            c.min_magnitude = v;
        }
        if let Some(v) = patch.max_magnitude {
            c.max_magnitude = v;
        }

        info!(criteria = ?self.criteria, "filters updated");
        self.save();
        &self.criteria
    }

    /// Return to the default criteria.
    pub fn reset(&mut self) -> &FilterCriteria {
        self.criteria = FilterCriteria::default();
        self.save();
        &self.criteria
    }

    fn save(&self) {
        if let Some(store) = &self.persist {
            if let Err(e) = store.set(FILTERS_KEY, &self.criteria) {
                warn!("failed to persist filters: {}", e);
            }
        }
    }
}
