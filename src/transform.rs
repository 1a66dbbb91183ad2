//! Sorting and pagination of fetched result sets.
//!
//! Sortable fields are a closed enum with explicit accessors; the dotted
//! names (`location.city`) only exist at the parsing boundary. Sorting is
//! stable. Page numbers shown to users are 1-based, the backend's are
//! 0-based, and [`PageNumber`] is the only place that converts between them.

use std::cmp::Ordering;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::Quake;

/// Default number of rows per table page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// A field records can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortField {
    Magnitude,
    Depth,
    City,
    Latitude,
    Longitude,
    OccurrenceDate,
    Possibility,
    PredictionDate,
}

/// Value extracted from a record for comparison.
#[derive(Debug, Clone, PartialEq)]
enum SortValue<'a> {
    Number(f64),
    Text(&'a str),
    Date(NaiveDateTime),
}

impl SortValue<'_> {
    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            // a field always yields the same variant
            _ => Ordering::Equal,
        }
    }
}

impl SortField {
    /// Wire/UI name of the field, including the dotted location paths.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Magnitude => "magnitude",
            Self::Depth => "depth",
            Self::City => "location.city",
            Self::Latitude => "location.latitude",
            Self::Longitude => "location.longitude",
            Self::OccurrenceDate => "occurrenceDate",
            Self::Possibility => "possibility",
            Self::PredictionDate => "predictionDate",
        }
    }

    fn value<'a, Q: Quake>(self, record: &'a Q) -> Option<SortValue<'a>> {
        match self {
            Self::Magnitude => Some(SortValue::Number(record.magnitude())),
            Self::Depth => Some(SortValue::Number(record.depth())),
            Self::City => Some(SortValue::Text(&record.location().city)),
            Self::Latitude => Some(SortValue::Number(record.location().latitude)),
            Self::Longitude => Some(SortValue::Number(record.location().longitude)),
            Self::OccurrenceDate => Some(SortValue::Date(record.occurrence_date())),
            Self::Possibility => record.possibility().map(SortValue::Number),
            Self::PredictionDate => record.prediction_date().map(SortValue::Date),
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "magnitude" | "mag" => Ok(Self::Magnitude),
            "depth" => Ok(Self::Depth),
            "location.city" | "city" => Ok(Self::City),
            "location.latitude" | "latitude" | "lat" => Ok(Self::Latitude),
            "location.longitude" | "longitude" | "lon" => Ok(Self::Longitude),
            "occurrencedate" | "date" | "time" => Ok(Self::OccurrenceDate),
            "possibility" | "probability" => Ok(Self::Possibility),
            "predictiondate" => Ok(Self::PredictionDate),
            _ => Err(format!("unknown sort field: {s}")),
        }
    }
}

/// Sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

impl std::str::FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Ascending),
            "desc" | "descending" => Ok(Self::Descending),
            _ => Err(format!("unknown sort direction: {s} (expected: asc, desc)")),
        }
    }
}

/// Field plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: SortField,
    pub direction: SortDirection,
}

impl SortSpec {
    #[must_use]
    pub const fn new(key: SortField, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Compare two records. Records lacking the field go after the ones
    /// that have it, in either direction.
    fn compare<Q: Quake>(&self, a: &Q, b: &Q) -> Ordering {
        match (self.key.value(a), self.key.value(b)) {
            (Some(x), Some(y)) => {
                let ord = x.compare(&y);
                match self.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

/// Stable in-place sort; equal keys keep their relative order.
pub fn sort_records<Q: Quake>(records: &mut [Q], spec: &SortSpec) {
    records.sort_by(|a, b| spec.compare(a, b));
}

/// A 1-based page number as shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PageNumber(u32);

impl PageNumber {
    pub const FIRST: Self = Self(1);

    /// Build from a 1-based number; zero is treated as the first page.
    #[must_use]
    pub fn new(one_based: u32) -> Self {
        Self(one_based.max(1))
    }

    /// Build from a backend (0-based) page index.
    #[must_use]
    pub fn from_api_index(index: u32) -> Self {
        Self(index.saturating_add(1))
    }

    /// The backend (0-based) index for this page.
    #[must_use]
    pub fn api_index(self) -> u32 {
        self.0 - 1
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for PageNumber {
    fn default() -> Self {
        Self::FIRST
    }
}

/// `ceil(total / page_size)`; a zero page size yields zero pages.
#[must_use]
pub fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Start and end offsets of `page` within `total` items, clamped to the data.
#[must_use]
pub fn page_bounds(total: usize, page_size: usize, page: PageNumber) -> (usize, usize) {
    let index = usize::try_from(page.api_index()).unwrap_or(usize::MAX);
    let start = index.saturating_mul(page_size).min(total);
    let end = start.saturating_add(page_size).min(total);
    (start, end)
}

/// The slice of `items` on `page`.
#[must_use]
pub fn paginate<T>(items: &[T], page_size: usize, page: PageNumber) -> &[T] {
    let (start, end) = page_bounds(items.len(), page_size, page);
    &items[start..end]
}

/// Table state: current sort and page, with the reset rules applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableView {
    sort: Option<SortSpec>,
    page: PageNumber,
    page_size: usize,
}

impl Default for TableView {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl TableView {
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            sort: None,
            page: PageNumber::FIRST,
            page_size: page_size.max(1),
        }
    }

    #[must_use]
    pub fn sort(&self) -> Option<SortSpec> {
        self.sort
    }

    #[must_use]
    pub fn page(&self) -> PageNumber {
        self.page
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Apply a sort; always returns to the first page.
    pub fn set_sort(&mut self, spec: SortSpec) {
        self.sort = Some(spec);
        self.page = PageNumber::FIRST;
    }

    /// Header click: same key flips the direction, a new key sorts
    /// ascending. Returns to the first page.
    pub fn toggle_sort(&mut self, key: SortField) {
        let direction = match self.sort {
            Some(s) if s.key == key => s.direction.flipped(),
            _ => SortDirection::Ascending,
        };
        self.set_sort(SortSpec::new(key, direction));
    }

    /// Move to another page; the sort is kept.
    pub fn set_page(&mut self, page: PageNumber) {
        self.page = page;
    }

    /// Filters changed: back to the first page.
    pub fn filters_changed(&mut self) {
        self.page = PageNumber::FIRST;
    }

    /// Sort a copy of `records` and cut out the current page.
    #[must_use]
    pub fn render<Q: Quake + Clone>(&self, records: &[Q]) -> TablePage<Q> {
        let mut sorted = records.to_vec();
        if let Some(spec) = &self.sort {
            sort_records(&mut sorted, spec);
        }

        let total = sorted.len();
        let total_pages = page_count(total, self.page_size);
        let rows = paginate(&sorted, self.page_size, self.page).to_vec();
        TablePage {
            rows,
            page: self.page,
            total_pages,
            total_elements: total,
        }
    }
}

/// The rows to display plus pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePage<T> {
    pub rows: Vec<T>,
    pub page: PageNumber,
    pub total_pages: usize,
    pub total_elements: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EarthquakeRecord, Location, PredictionRecord};
    use pretty_assertions::assert_eq;

    fn quake(id: usize, city: &str, magnitude: f64) -> EarthquakeRecord {
        EarthquakeRecord {
            id: id.to_string(),
            magnitude,
            depth: 10.0,
            location: Location {
                city: city.into(),
                latitude: 38.0,
                longitude: 30.0,
            },
            occurrence_date: NaiveDateTime::default(),
        }
    }

    fn ids<Q: Quake>(records: &[Q]) -> Vec<String> {
        records.iter().map(|r| r.id().to_string()).collect()
    }

    fn twelve() -> Vec<EarthquakeRecord> {
        let mags = [3.1, 4.0, 7.4, 5.2, 3.8, 6.1, 4.4, 5.9, 3.3, 6.6, 4.9, 5.0];
        let cities = ["Izmir", "Van", "Hatay"];
        mags.iter()
            .enumerate()
            .map(|(i, m)| quake(i, cities[i % 3], *m))
            .collect()
    }

    #[test]
    fn test_sort_is_stable() {
        let mut records = vec![
            quake(0, "Van", 5.0),
            quake(1, "Adana", 4.0),
            quake(2, "Van", 3.0),
            quake(3, "Adana", 6.0),
            quake(4, "Van", 2.0),
        ];
        let spec = SortSpec::new(SortField::City, SortDirection::Ascending);
        sort_records(&mut records, &spec);
        assert_eq!(ids(&records), vec!["1", "3", "0", "2", "4"]);

        let desc = SortSpec::new(SortField::City, SortDirection::Descending);
        sort_records(&mut records, &desc);
        assert_eq!(ids(&records), vec!["0", "2", "4", "1", "3"]);
    }

    #[test]
    fn test_sort_idempotent() {
        let mut records = twelve();
        for field in [SortField::City, SortField::Magnitude, SortField::Depth] {
            for direction in [SortDirection::Ascending, SortDirection::Descending] {
                let spec = SortSpec::new(field, direction);
                sort_records(&mut records, &spec);
                let once = ids(&records);
                sort_records(&mut records, &spec);
                assert_eq!(ids(&records), once);
            }
        }
    }

    #[test]
    fn test_missing_field_sorts_last() {
        let mut records = twelve();
        let spec = SortSpec::new(SortField::Possibility, SortDirection::Descending);
        sort_records(&mut records, &spec);
        assert_eq!(ids(&records), ids(&twelve()));
    }

    #[test]
    fn test_sort_predictions_by_possibility() {
        let prediction = |id: &str, possibility: f64| PredictionRecord {
            id: id.into(),
            magnitude: 5.0,
            depth: 10.0,
            location: Location {
                city: "Bolu".into(),
                latitude: 40.7,
                longitude: 31.6,
            },
            occurrence_date: NaiveDateTime::default(),
            possibility,
            prediction_date: NaiveDateTime::default(),
        };
        let mut records = vec![prediction("a", 0.2), prediction("b", 0.9), prediction("c", 0.5)];
        sort_records(
            &mut records,
            &SortSpec::new(SortField::Possibility, SortDirection::Descending),
        );
        assert_eq!(ids(&records), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_field_names() {
        assert_eq!("location.city".parse::<SortField>(), Ok(SortField::City));
        assert_eq!("occurrenceDate".parse::<SortField>(), Ok(SortField::OccurrenceDate));
        assert!("location.country".parse::<SortField>().is_err());
        for field in [SortField::City, SortField::Latitude, SortField::PredictionDate] {
            assert_eq!(field.as_str().parse::<SortField>(), Ok(field));
        }
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 5), 0);
        assert_eq!(page_count(1, 5), 1);
        assert_eq!(page_count(10, 5), 2);
        assert_eq!(page_count(12, 5), 3);
        assert_eq!(page_count(12, 0), 0);
    }

    #[test]
    fn test_last_page_size() {
        for total in 1..40usize {
            for size in 1..8usize {
                let pages = page_count(total, size);
                let last = PageNumber::new(u32::try_from(pages).expect("fits"));
                let (start, end) = page_bounds(total, size, last);
                let len = end - start;
                assert_eq!(len, total - size * (pages - 1));
                assert!((1..=size).contains(&len));
            }
        }
    }

    #[test]
    fn test_page_index_boundary() {
        assert_eq!(PageNumber::FIRST.api_index(), 0);
        assert_eq!(PageNumber::from_api_index(0), PageNumber::FIRST);

        let total_pages = 7u32;
        let last = PageNumber::new(total_pages);
        assert_eq!(last.api_index(), total_pages - 1);
        assert_eq!(PageNumber::from_api_index(total_pages - 1), last);

        assert_eq!(PageNumber::new(0), PageNumber::FIRST);
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let items: Vec<u32> = (0..12).collect();
        assert!(paginate(&items, 5, PageNumber::new(4)).is_empty());
        assert_eq!(paginate(&items, 5, PageNumber::new(3)), &[10, 11]);
    }

    #[test]
    fn test_twelve_records_page_of_five() {
        let records = twelve();
        let mut table = TableView::new(5);
        table.set_sort(SortSpec::new(SortField::Magnitude, SortDirection::Descending));

        let page = table.render(&records);
        assert_eq!(page.rows.len(), 5);
        assert_eq!(page.rows[0].magnitude, 7.4);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_elements, 12);

        table.set_page(PageNumber::new(3));
        let last = table.render(&records);
        assert_eq!(last.rows.len(), 2);
        assert_eq!(last.rows[1].magnitude, 3.1);
    }

    #[test]
    fn test_table_reset_rules() {
        let mut table = TableView::new(5);
        table.set_sort(SortSpec::new(SortField::Depth, SortDirection::Ascending));
        table.set_page(PageNumber::new(3));
        assert_eq!(table.sort().map(|s| s.key), Some(SortField::Depth));
        assert_eq!(table.page().get(), 3);

        table.toggle_sort(SortField::Depth);
        assert_eq!(table.page(), PageNumber::FIRST);
        assert_eq!(
            table.sort().map(|s| s.direction),
            Some(SortDirection::Descending)
        );

        table.set_page(PageNumber::new(2));
        table.filters_changed();
        assert_eq!(table.page(), PageNumber::FIRST);
        assert_eq!(
            table.sort().map(|s| s.direction),
            Some(SortDirection::Descending)
        );

        table.toggle_sort(SortField::City);
        assert_eq!(
            table.sort(),
            Some(SortSpec::new(SortField::City, SortDirection::Ascending))
        );
    }
}
