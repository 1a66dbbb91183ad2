//! Web server for the dashboard UI.
//!
//! Provides a local dashboard using:
//! - Axum for HTTP server
//! - HTMX for table paging and sorting without heavy JavaScript
//! - JSON endpoints carrying the map's per-city colors
//!
//! Backend calls are blocking and run on `spawn_blocking`. Requests can
//! overlap; each view's ticket counter drops responses that were overtaken.

use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::{
    Form, Json, Router,
    extract::{Query, State},
    response::{Html, IntoResponse},
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::colorize::{CityAggregates, MapFill, MapMetric, magnitude_color, probability_color, region_fill};
use crate::dashboard::{Dashboard, Dataset, LoadState, View, ViewStatus, execute};
use crate::errors::SeismodashError;
use crate::filters::{FilterPatch, MAX_MAGNITUDE, MIN_MAGNITUDE};
use crate::models::{EarthquakeRecord, PredictionRecord};
use crate::transform::{PageNumber, SortDirection, SortField, SortSpec, TablePage};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "127.0.0.1".to_string(),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    client: Arc<ApiClient>,
    dashboard: Arc<Mutex<Dashboard>>,
}

impl AppState {
    #[must_use]
    pub fn new(client: ApiClient, dashboard: Dashboard) -> Self {
        Self {
            client: Arc::new(client),
            dashboard: Arc::new(Mutex::new(dashboard)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Dashboard> {
        self.dashboard.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/table", get(table_handler))
        .route("/filters", post(filters_handler))
        .route("/api/map/severity", get(severity_map_handler))
        .route("/api/map/prediction", get(prediction_map_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Start the web server.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or serving fails.
pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("🌍 seismodash UI starting at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Which table a request addresses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    #[default]
    Earthquakes,
    Predictions,
}

impl TableKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Earthquakes => "earthquakes",
            Self::Predictions => "predictions",
        }
    }
}

/// Query of `GET /table`.
#[derive(Debug, Default, Deserialize)]
pub struct TableParams {
    #[serde(default)]
    pub view: TableKind,
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub page: Option<u32>,
    #[serde(default)]
    pub refresh: bool,
}

type Select<T> = fn(&mut Dashboard) -> &mut View<T>;

fn earthquakes(dash: &mut Dashboard) -> &mut View<EarthquakeRecord> {
    &mut dash.earthquakes
}

fn predictions(dash: &mut Dashboard) -> &mut View<PredictionRecord> {
    &mut dash.predictions
}

/// Apply the sort and page from `params`, fetch when the view needs it, and
/// return what the view shows afterwards.
async fn load_view<T>(state: &AppState, select: Select<T>, params: &TableParams) -> ViewStatus<T>
where
    T: Dataset + Send + 'static,
{
    let pending = {
        let mut dash = state.lock();
        let criteria = dash.criteria().clone();
        let view = select(&mut dash);

        let mut needs_fetch = params.refresh
            || matches!(view.state(), LoadState::Idle | LoadState::Failed(_));

        if let Some(key) = params.sort.as_deref().and_then(|s| s.parse::<SortField>().ok()) {
            needs_fetch |= match params.dir.as_deref().map(str::parse::<SortDirection>) {
                Some(Ok(direction)) => view.set_sort(SortSpec::new(key, direction)),
                _ => view.toggle_sort(key),
            };
        }
        if let Some(page) = params.page {
            needs_fetch |= view.set_page(PageNumber::new(page));
        }

        needs_fetch.then(|| view.begin(&criteria))
    };

    if let Some((ticket, plan)) = pending {
        let client = Arc::clone(&state.client);
        let result = tokio::task::spawn_blocking(move || execute::<T, _>(client.as_ref(), &plan))
            .await
            .unwrap_or_else(|e| {
                Err(SeismodashError::InvalidResponse(format!("fetch task failed: {e}")))
            });

        let mut dash = state.lock();
        if !select(&mut dash).complete(ticket, result) {
            tracing::debug!(dataset = T::NAME, "response overtaken by a newer request");
        }
    }

    let mut dash = state.lock();
    ViewStatus::from(&*select(&mut dash))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Main page handler - serves the HTML UI.
async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Table fragment for HTMX swaps.
async fn table_handler(
    State(state): State<AppState>,
    Query(params): Query<TableParams>,
) -> Html<String> {
    let html = match params.view {
        TableKind::Earthquakes => {
            render_table(params.view, &load_view(&state, earthquakes, &params).await)
        }
        TableKind::Predictions => {
            render_table(params.view, &load_view(&state, predictions, &params).await)
        }
    };
    Html(html)
}

/// Fields of the filter form; blank inputs arrive as empty strings.
#[derive(Debug, Default, Deserialize)]
pub struct FilterForm {
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub min_magnitude: String,
    #[serde(default)]
    pub max_magnitude: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

impl FilterForm {
    /// Every field is sent, so every key is replaced; blanks clear.
    fn to_patch(&self) -> Result<FilterPatch, String> {
        let number = |label: &str, s: &str| -> Result<Option<f64>, String> {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<f64>()
                .map(Some)
                .map_err(|_| format!("{label} must be a number"))
        };
        let date = |label: &str, s: &str| -> Result<Option<NaiveDate>, String> {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| format!("{label} must be YYYY-MM-DD"))
        };

        let city = self.city.trim();
        Ok(FilterPatch::default()
            .city((!city.is_empty()).then(|| city.to_string()))
            .start_date(date("Start date", &self.start_date)?)
            .end_date(date("End date", &self.end_date)?)
            .min_magnitude(number("Minimum magnitude", &self.min_magnitude)?.unwrap_or(MIN_MAGNITUDE))
            .max_magnitude(number("Maximum magnitude", &self.max_magnitude)?.unwrap_or(MAX_MAGNITUDE)))
    }
}

/// Apply the filter form and tell both tables to reload.
async fn filters_handler(
    State(state): State<AppState>,
    Form(form): Form<FilterForm>,
) -> impl IntoResponse {
    match form.to_patch() {
        Ok(patch) => {
            state.lock().apply_filters(patch);
            (
                [("HX-Trigger", "filters-changed")],
                Html(r#"<span class="form-status">Filters applied</span>"#.to_string()),
            )
        }
        Err(message) => (
            [("HX-Trigger", "filters-rejected")],
            Html(format!(
                r#"<span class="form-status form-error">{}</span>"#,
                escape_html(&message)
            )),
        ),
    }
}

/// One region of the map response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionFill {
    pub city: String,
    pub value: f64,
    pub count: usize,
    #[serde(flatten)]
    pub fill: MapFill,
}

/// Per-city colors for a choropleth.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapResponse {
    pub metric: MapMetric,
    pub regions: Vec<RegionFill>,
    /// Style for regions with no records
    pub no_data: MapFill,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MapResponse {
    fn new(aggregates: &CityAggregates, error: Option<String>) -> Self {
        let regions = aggregates
            .ranked()
            .into_iter()
            .map(|stat| RegionFill {
                city: stat.name.clone(),
                value: stat.value,
                count: stat.count,
                fill: aggregates.fill_for(&stat.name),
            })
            .collect();
        Self {
            metric: aggregates.metric(),
            regions,
            no_data: region_fill(aggregates.metric(), None),
            error,
        }
    }
}

fn failure<T>(status: &ViewStatus<T>) -> Option<String> {
    match status {
        ViewStatus::Failed { message } => Some(message.clone()),
        _ => None,
    }
}

/// Severity map: colored by the highest magnitude per city.
async fn severity_map_handler(State(state): State<AppState>) -> Json<MapResponse> {
    let status = load_view(&state, earthquakes, &TableParams::default()).await;
    let aggregates = state.lock().earthquakes.aggregates();
    Json(MapResponse::new(&aggregates, failure(&status)))
}

/// Prediction map: colored by the highest probability per city.
async fn prediction_map_handler(State(state): State<AppState>) -> Json<MapResponse> {
    let status = load_view(&state, predictions, &TableParams::default()).await;
    let aggregates = state.lock().predictions.aggregates();
    Json(MapResponse::new(&aggregates, failure(&status)))
}

/// Health check endpoint.
async fn health_handler() -> &'static str {
    "OK"
}

// ============================================================================
// HTML fragments
// ============================================================================

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn columns(kind: TableKind) -> &'static [(SortField, &'static str)] {
    match kind {
        TableKind::Earthquakes => &[
            (SortField::Magnitude, "Magnitude"),
            (SortField::Depth, "Depth (km)"),
            (SortField::City, "City"),
            (SortField::Latitude, "Latitude"),
            (SortField::Longitude, "Longitude"),
            (SortField::OccurrenceDate, "Date"),
        ],
        TableKind::Predictions => &[
            (SortField::Magnitude, "Magnitude"),
            (SortField::Possibility, "Probability"),
            (SortField::City, "City"),
            (SortField::Depth, "Depth (km)"),
            (SortField::PredictionDate, "Predicted for"),
        ],
    }
}

fn cell<T: Dataset>(record: &T, field: SortField) -> String {
    let loc = record.location();
    match field {
        SortField::Magnitude => format!(
            r#"<span class="mag-chip" style="background:{}">{:.1}</span>"#,
            magnitude_color(Some(record.magnitude())),
            record.magnitude()
        ),
        SortField::Possibility => record.possibility().map_or_else(String::new, |p| {
            format!(
                r#"<span class="mag-chip" style="background:{}">{:.0}%</span>"#,
                probability_color(p),
                p * 100.0
            )
        }),
        SortField::Depth => format!("{:.1}", record.depth()),
        SortField::City => escape_html(&loc.city),
        SortField::Latitude => format!("{:.3}", loc.latitude),
        SortField::Longitude => format!("{:.3}", loc.longitude),
        SortField::OccurrenceDate => record.occurrence_date().format("%Y-%m-%d %H:%M").to_string(),
        SortField::PredictionDate => record
            .prediction_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
    }
}

fn message_fragment(kind: TableKind, class: &str, text: &str, poll: bool) -> String {
    let reload = if poll {
        format!(
            r##" hx-get="/table?view={}" hx-trigger="load delay:500ms" hx-target="#table-{}""##,
            kind.as_str(),
            kind.as_str()
        )
    } else {
        String::new()
    };
    format!(r#"<div class="{class}"{reload}>{}</div>"#, escape_html(text))
}

fn render_rows<T: Dataset>(kind: TableKind, page: &TablePage<T>) -> String {
    let view = kind.as_str();
    let mut html = String::from(r#"<table class="quake-table"><thead><tr>"#);
    for (field, label) in columns(kind) {
        let _ = write!(
            html,
            r##"<th hx-get="/table?view={view}&sort={}" hx-target="#table-{view}">{label}</th>"##,
            field.as_str()
        );
    }
    html.push_str("</tr></thead><tbody>");
    for record in &page.rows {
        html.push_str("<tr>");
        for (field, _) in columns(kind) {
            let _ = write!(html, "<td>{}</td>", cell(record, *field));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");

    let current = page.page.get();
    let last = u32::try_from(page.total_pages).unwrap_or(u32::MAX);
    let _ = write!(html, r#"<div class="pager">"#);
    if current > 1 {
        let _ = write!(
            html,
            r##"<button class="btn btn-ghost" hx-get="/table?view={view}&page={}" hx-target="#table-{view}">‹ Prev</button>"##,
            current - 1
        );
    }
    let _ = write!(
        html,
        r#"<span class="pager-info">Page {current} of {last} · {} records</span>"#,
        page.total_elements
    );
    if current < last {
        let _ = write!(
            html,
            r##"<button class="btn btn-ghost" hx-get="/table?view={view}&page={}" hx-target="#table-{view}">Next ›</button>"##,
            current + 1
        );
    }
    html.push_str("</div>");
    html
}

fn render_table<T: Dataset>(kind: TableKind, status: &ViewStatus<T>) -> String {
    match status {
        ViewStatus::Idle | ViewStatus::Loading => {
            message_fragment(kind, "empty-state", "Loading…", true)
        }
        ViewStatus::Empty => message_fragment(kind, "empty-state", "No data", false),
        ViewStatus::Failed { message } => message_fragment(kind, "error", message, false),
        ViewStatus::Loaded(page) => render_rows(kind, page),
    }
}

// ============================================================================
// HTML Template (embedded for single-binary deployment)
// ============================================================================

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en" data-theme="dark">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>seismodash · Earthquake Monitoring &amp; Prediction</title>

    <link rel="preconnect" href="https://fonts.googleapis.com">
    <link rel="preconnect" href="https://fonts.gstatic.com" crossorigin>
    <link href="https://fonts.googleapis.com/css2?family=Inter:wght@400;500;600;700&display=swap" rel="stylesheet">

    <script src="https://unpkg.com/htmx.org@1.9.10"></script>

    <style>
        :root {
            --font: 'Inter', -apple-system, BlinkMacSystemFont, sans-serif;
            --bg-primary: #ffffff;
            --bg-secondary: #f8fafc;
            --bg-elevated: #ffffff;
            --text-primary: #0f172a;
            --text-secondary: #475569;
            --border: #e2e8f0;
            --accent: #6366f1;
            --danger: #ef4444;
            --radius-sm: 6px;
            --radius-md: 10px;
        }

        [data-theme="dark"] {
            --bg-primary: #09090b;
            --bg-secondary: #0f0f12;
            --bg-elevated: #1c1c1f;
            --text-primary: #fafafa;
            --text-secondary: #a1a1aa;
            --border: #27272a;
            --accent: #818cf8;
        }

        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: var(--font);
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.6;
        }

        .header { border-bottom: 1px solid var(--border); padding: 1rem 2rem; display: flex; justify-content: space-between; }
        .logo { font-weight: 700; color: var(--text-primary); text-decoration: none; }
        .main { padding: 1.5rem 2rem; display: grid; gap: 1.5rem; }
        .panel { background: var(--bg-elevated); border: 1px solid var(--border); border-radius: var(--radius-md); padding: 1rem; }
        .panel h2 { font-size: 1rem; margin-bottom: 0.75rem; }

        .filters { display: flex; flex-wrap: wrap; gap: 0.75rem; align-items: end; }
        .filters label { display: grid; font-size: 0.8rem; color: var(--text-secondary); }
        .filters input { background: var(--bg-secondary); color: var(--text-primary); border: 1px solid var(--border); border-radius: var(--radius-sm); padding: 0.35rem 0.5rem; }
        .form-status { font-size: 0.85rem; color: var(--text-secondary); }
        .form-error, .error { color: var(--danger); }

        .btn { border: 1px solid var(--border); border-radius: var(--radius-sm); padding: 0.35rem 0.75rem; cursor: pointer; background: transparent; color: var(--text-primary); }
        .btn-primary { background: var(--accent); border-color: var(--accent); color: #fff; }

        .quake-table { width: 100%; border-collapse: collapse; font-size: 0.9rem; }
        .quake-table th { text-align: left; cursor: pointer; color: var(--text-secondary); border-bottom: 1px solid var(--border); padding: 0.4rem; }
        .quake-table td { padding: 0.4rem; border-bottom: 1px solid var(--border); }
        .mag-chip { display: inline-block; min-width: 3rem; text-align: center; border-radius: var(--radius-sm); color: #111; font-weight: 600; }
        .pager { display: flex; gap: 0.75rem; align-items: center; margin-top: 0.75rem; }
        .pager-info { color: var(--text-secondary); font-size: 0.85rem; }
        .empty-state { color: var(--text-secondary); padding: 1rem; text-align: center; }

        .region-list { display: flex; flex-wrap: wrap; gap: 0.5rem; }
        .region { border-radius: var(--radius-sm); padding: 0.3rem 0.6rem; color: #111; font-size: 0.85rem; cursor: default; }
    </style>
</head>
<body>
    <header class="header">
        <a href="/" class="logo">🌍 seismodash</a>
        <button class="btn" onclick="toggleTheme()">🌙</button>
    </header>

    <main class="main">
        <section class="panel">
            <h2>Filters</h2>
            <form class="filters" hx-post="/filters" hx-target="#filter-status">
                <label>City <input name="city" type="text"></label>
                <label>Min magnitude <input name="min_magnitude" type="number" step="0.1" min="0" max="10"></label>
                <label>Max magnitude <input name="max_magnitude" type="number" step="0.1" min="0" max="10"></label>
                <label>Start date <input name="start_date" type="date"></label>
                <label>End date <input name="end_date" type="date"></label>
                <button class="btn btn-primary" type="submit">Apply</button>
                <span id="filter-status"></span>
            </form>
        </section>

        <section class="panel">
            <h2>Severity map</h2>
            <div id="map-severity" class="region-list"></div>
        </section>

        <section class="panel">
            <h2>Earthquakes</h2>
            <div id="table-earthquakes"
                 hx-get="/table?view=earthquakes"
                 hx-trigger="load, filters-changed from:body">
                <div class="empty-state">Loading…</div>
            </div>
        </section>

        <section class="panel">
            <h2>Prediction map</h2>
            <div id="map-prediction" class="region-list"></div>
        </section>

        <section class="panel">
            <h2>Predictions</h2>
            <div id="table-predictions"
                 hx-get="/table?view=predictions"
                 hx-trigger="load, filters-changed from:body">
                <div class="empty-state">Loading…</div>
            </div>
        </section>
    </main>

    <script>
        function toggleTheme() {
            const html = document.documentElement;
            const next = html.getAttribute('data-theme') === 'dark' ? 'light' : 'dark';
            html.setAttribute('data-theme', next);
            localStorage.setItem('theme', next);
        }
        document.documentElement.setAttribute('data-theme', localStorage.getItem('theme') || 'dark');

        async function loadMap(kind) {
            const el = document.getElementById('map-' + kind);
            const res = await fetch('/api/map/' + kind);
            const data = await res.json();
            el.innerHTML = '';
            if (data.error) {
                el.innerHTML = '<div class="error"></div>';
                el.firstChild.textContent = data.error;
                return;
            }
            if (data.regions.length === 0) {
                el.innerHTML = '<div class="empty-state">No data</div>';
                return;
            }
            for (const r of data.regions) {
                const chip = document.createElement('span');
                chip.className = 'region';
                chip.textContent = r.city + ' · ' + r.value.toFixed(2);
                chip.style.background = r.fill;
                chip.style.opacity = r.opacity;
                chip.onmouseenter = () => { chip.style.background = r.hover; };
                chip.onmouseleave = () => { chip.style.background = r.fill; };
                el.appendChild(chip);
            }
        }

        function loadMaps() { loadMap('severity'); loadMap('prediction'); }
        loadMaps();
        document.body.addEventListener('filters-changed', loadMaps);
    </script>
</body>
</html>
"##;
