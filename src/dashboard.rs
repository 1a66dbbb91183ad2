//! Ties filters, fetching and table state together.
//!
//! Planning is pure: [`plan`] turns the criteria and table state into a
//! [`FetchPlan`] without touching the network. Each view hands out a
//! [`Ticket`] per fetch and only accepts the response carrying the latest
//! one, so a slow response to an older request can never overwrite newer
//! data.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::colorize::{CityAggregates, MapMetric};
use crate::errors::SeismodashError;
use crate::filters::{FilterCriteria, FilterPatch, FilterStore};
use crate::models::{EarthquakeRecord, PageResult, PredictionRecord, Quake};
use crate::query::{EarthquakeQuery, PredictionQuery};
use crate::transform::{PageNumber, SortField, SortSpec, TablePage, TableView, sort_records};

/// What to fetch for the current state.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchPlan {
    /// No filter active: fetch the small summary set and paginate locally
    Summary,
    /// Server-side filtering and pagination
    Filtered {
        criteria: FilterCriteria,
        page: PageNumber,
        size: u32,
    },
    /// The criteria cannot match anything; no request is made
    Empty,
}

/// Choose the fetch strategy for `criteria` and the table's current page.
#[must_use]
pub fn plan(criteria: &FilterCriteria, table: &TableView) -> FetchPlan {
    if criteria.is_inverted() {
        return FetchPlan::Empty;
    }
    if criteria.is_default() {
        return FetchPlan::Summary;
    }
    FetchPlan::Filtered {
        criteria: criteria.clone(),
        page: table.page(),
        size: u32::try_from(table.page_size()).unwrap_or(u32::MAX),
    }
}

/// Backend calls the dashboard needs.
pub trait QuakeSource {
    fn most_severe_earthquakes(&self) -> Result<Vec<EarthquakeRecord>, SeismodashError>;
    fn filter_earthquakes(
        &self,
        query: &EarthquakeQuery,
    ) -> Result<PageResult<EarthquakeRecord>, SeismodashError>;
    fn most_possible_predictions(&self) -> Result<Vec<PredictionRecord>, SeismodashError>;
    fn filter_predictions(
        &self,
        query: &PredictionQuery,
    ) -> Result<PageResult<PredictionRecord>, SeismodashError>;
}

impl QuakeSource for ApiClient {
    fn most_severe_earthquakes(&self) -> Result<Vec<EarthquakeRecord>, SeismodashError> {
        ApiClient::most_severe_earthquakes(self)
    }

    fn filter_earthquakes(
        &self,
        query: &EarthquakeQuery,
    ) -> Result<PageResult<EarthquakeRecord>, SeismodashError> {
        ApiClient::filter_earthquakes(self, query)
    }

    fn most_possible_predictions(&self) -> Result<Vec<PredictionRecord>, SeismodashError> {
        ApiClient::most_possible_predictions(self)
    }

    fn filter_predictions(
        &self,
        query: &PredictionQuery,
    ) -> Result<PageResult<PredictionRecord>, SeismodashError> {
        ApiClient::filter_predictions(self, query)
    }
}

/// A record family the dashboard can show.
pub trait Dataset: Quake + Clone + Sized {
    /// Label used in logs.
    const NAME: &'static str;

    /// The metric the map colors this family by.
    const METRIC: MapMetric;

    fn fetch_summary<S: QuakeSource>(source: &S) -> Result<Vec<Self>, SeismodashError>;

    fn fetch_page<S: QuakeSource>(
        source: &S,
        criteria: &FilterCriteria,
        page: PageNumber,
        size: u32,
    ) -> Result<PageResult<Self>, SeismodashError>;
}

impl Dataset for EarthquakeRecord {
    const NAME: &'static str = "earthquakes";
    const METRIC: MapMetric = MapMetric::Magnitude;

    fn fetch_summary<S: QuakeSource>(source: &S) -> Result<Vec<Self>, SeismodashError> {
        source.most_severe_earthquakes()
    }

    fn fetch_page<S: QuakeSource>(
        source: &S,
        criteria: &FilterCriteria,
        page: PageNumber,
        size: u32,
    ) -> Result<PageResult<Self>, SeismodashError> {
        source.filter_earthquakes(&EarthquakeQuery::new(criteria, page, size))
    }
}

impl Dataset for PredictionRecord {
    const NAME: &'static str = "predictions";
    const METRIC: MapMetric = MapMetric::Possibility;

    fn fetch_summary<S: QuakeSource>(source: &S) -> Result<Vec<Self>, SeismodashError> {
        source.most_possible_predictions()
    }

    fn fetch_page<S: QuakeSource>(
        source: &S,
        criteria: &FilterCriteria,
        page: PageNumber,
        size: u32,
    ) -> Result<PageResult<Self>, SeismodashError> {
        source.filter_predictions(&PredictionQuery::new(criteria, page, size))
    }
}

/// Records as they came back from the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    /// Whole summary set, paginated locally
    Summary(Vec<T>),
    /// One server-side page
    Page(PageResult<T>),
}

impl<T> Fetched<T> {
    #[must_use]
    pub fn records(&self) -> &[T] {
        match self {
            Self::Summary(v) => v,
            Self::Page(p) => &p.content,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

/// Run `plan` against `source`.
///
/// # Errors
///
/// Propagates the backend error unchanged.
pub fn execute<T: Dataset, S: QuakeSource>(
    source: &S,
    plan: &FetchPlan,
) -> Result<Fetched<T>, SeismodashError> {
    match plan {
        FetchPlan::Summary => T::fetch_summary(source).map(Fetched::Summary),
        FetchPlan::Filtered {
            criteria,
            page,
            size,
        } => T::fetch_page(source, criteria, *page, *size).map(Fetched::Page),
        FetchPlan::Empty => Ok(Fetched::Page(PageResult::empty(0))),
    }
}

/// Identifies one issued fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Generation counter: only the most recently issued ticket is current.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    issued: u64,
}

impl RequestTracker {
    pub fn issue(&mut self) -> Ticket {
        self.issued += 1;
        Ticket(self.issued)
    }

    #[must_use]
    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.issued
    }
}

/// What a view currently shows.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    /// Nothing requested yet
    Idle,
    Loading,
    /// The fetch succeeded but matched nothing
    Empty,
    Loaded(T),
    /// User-facing error text
    Failed(String),
}

impl<T> LoadState<T> {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// One table of records with its fetch bookkeeping.
#[derive(Debug, Clone)]
pub struct View<T> {
    table: TableView,
    tracker: RequestTracker,
    state: LoadState<Fetched<T>>,
    /// The latest issued plan pages on the server
    paged: bool,
}

impl<T: Dataset> View<T> {
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            table: TableView::new(page_size),
            tracker: RequestTracker::default(),
            state: LoadState::Idle,
            paged: false,
        }
    }

    #[must_use]
    pub fn table(&self) -> &TableView {
        &self.table
    }

    #[must_use]
    pub fn state(&self) -> &LoadState<Fetched<T>> {
        &self.state
    }

    /// Issue a new fetch for `criteria`; earlier tickets become stale.
    pub fn begin(&mut self, criteria: &FilterCriteria) -> (Ticket, FetchPlan) {
        let ticket = self.tracker.issue();
        let plan = plan(criteria, &self.table);
        debug!(dataset = T::NAME, ?ticket, ?plan, "fetch started");
        self.paged = matches!(plan, FetchPlan::Filtered { .. });
        self.state = LoadState::Loading;
        (ticket, plan)
    }

    /// Store a fetch result. Returns `false`, leaving the view untouched,
    /// when `ticket` is no longer the latest.
    pub fn complete(
        &mut self,
        ticket: Ticket,
        result: Result<Fetched<T>, SeismodashError>,
    ) -> bool {
        if !self.tracker.is_current(ticket) {
            debug!(dataset = T::NAME, ?ticket, "discarding stale response");
            return false;
        }

        self.state = match result {
            Ok(fetched) if fetched.is_empty() => LoadState::Empty,
            Ok(fetched) => LoadState::Loaded(fetched),
            Err(e) => {
                warn!(dataset = T::NAME, "fetch failed: {}", e);
                LoadState::Failed(e.user_message())
            }
        };
        true
    }

    /// Begin, execute and complete in one go.
    pub fn refresh<S: QuakeSource>(&mut self, source: &S, criteria: &FilterCriteria) {
        let (ticket, plan) = self.begin(criteria);
        let result = execute(source, &plan);
        self.complete(ticket, result);
    }

    /// Re-sort; returns to the first page.
    ///
    /// Returns `true` when the first page must be fetched again. While a
    /// server-paged fetch is in flight this holds too, and the caller's new
    /// ticket makes the pending response stale.
    pub fn set_sort(&mut self, spec: SortSpec) -> bool {
        let was_first = self.table.page() == PageNumber::FIRST;
        self.table.set_sort(spec);
        self.is_server_paged() && !was_first
    }

    /// Change page; returns `true` when the new page must be fetched.
    pub fn set_page(&mut self, page: PageNumber) -> bool {
        let changed = self.table.page() != page;
        self.table.set_page(page);
        changed && self.is_server_paged()
    }

    /// Header click on `key`; returns `true` when the first page must be
    /// fetched again.
    pub fn toggle_sort(&mut self, key: SortField) -> bool {
        let was_first = self.table.page() == PageNumber::FIRST;
        self.table.toggle_sort(key);
        self.is_server_paged() && !was_first
    }

    fn filters_changed(&mut self) {
        self.table.filters_changed();
        // anything still in flight was planned for the old criteria
        self.tracker.issue();
        self.state = LoadState::Idle;
        self.paged = false;
    }

    fn is_server_paged(&self) -> bool {
        self.paged
    }

    /// All fetched records, unsorted.
    #[must_use]
    pub fn records(&self) -> &[T] {
        match &self.state {
            LoadState::Loaded(f) => f.records(),
            _ => &[],
        }
    }

    /// The rows to display for the current sort and page.
    #[must_use]
    pub fn rows(&self) -> Option<TablePage<T>> {
        match &self.state {
            LoadState::Loaded(Fetched::Summary(records)) => Some(self.table.render(records)),
            LoadState::Loaded(Fetched::Page(page)) => {
                let mut rows = page.content.clone();
                if let Some(spec) = self.table.sort() {
                    sort_records(&mut rows, &spec);
                }
                Some(TablePage {
                    rows,
                    page: PageNumber::from_api_index(page.page_number),
                    total_pages: usize::try_from(page.total_pages).unwrap_or(usize::MAX),
                    total_elements: usize::try_from(page.total_elements).unwrap_or(usize::MAX),
                })
            }
            _ => None,
        }
    }

    /// Per-city aggregates for the map.
    #[must_use]
    pub fn aggregates(&self) -> CityAggregates {
        CityAggregates::from_records(T::METRIC, self.records())
    }
}

/// Summary of a view for JSON output.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ViewStatus<T> {
    Idle,
    Loading,
    Empty,
    Loaded(TablePage<T>),
    Failed { message: String },
}

impl<T: Dataset> From<&View<T>> for ViewStatus<T> {
    fn from(view: &View<T>) -> Self {
        match view.state() {
            LoadState::Idle => Self::Idle,
            LoadState::Loading => Self::Loading,
            LoadState::Empty => Self::Empty,
            LoadState::Failed(message) => Self::Failed {
                message: message.clone(),
            },
            LoadState::Loaded(_) => view.rows().map_or(Self::Empty, Self::Loaded),
        }
    }
}

/// Filters plus the earthquake and prediction tables.
#[derive(Debug, Clone)]
pub struct Dashboard {
    filters: FilterStore,
    pub earthquakes: View<EarthquakeRecord>,
    pub predictions: View<PredictionRecord>,
}

impl Dashboard {
    #[must_use]
    pub fn new(filters: FilterStore, page_size: usize) -> Self {
        Self {
            filters,
            earthquakes: View::new(page_size),
            predictions: View::new(page_size),
        }
    }

    #[must_use]
    pub fn criteria(&self) -> &FilterCriteria {
        self.filters.criteria()
    }

    /// Apply a filter patch; both tables go back to their first page.
    pub fn apply_filters(&mut self, patch: FilterPatch) {
        if patch.is_empty() {
            return;
        }
        self.filters.apply_partial(patch);
        self.earthquakes.filters_changed();
        self.predictions.filters_changed();
        info!("filters applied, tables reset to first page");
    }

    /// Restore the default filters.
    pub fn reset_filters(&mut self) {
        self.filters.reset();
        self.earthquakes.filters_changed();
        self.predictions.filters_changed();
    }

    /// Refresh both tables synchronously.
    pub fn refresh<S: QuakeSource>(&mut self, source: &S) {
        let criteria = self.filters.criteria().clone();
        self.earthquakes.refresh(source, &criteria);
        self.predictions.refresh(source, &criteria);
    }
}
