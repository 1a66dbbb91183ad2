//! Earthquake backend API client.
//!
//! Provides blocking HTTP access to the backend's REST endpoints.
//! Uses reqwest with rustls for TLS. Every request shares one cookie jar so
//! the session established by login carries over to later calls.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::ApiConfig;
use crate::errors::SeismodashError;
use crate::models::{
    EarthquakeRecord, EmailRequest, LoginRequest, PageResult, PredictionRecord, ProfileUpdate,
    RegisterRequest, ReportDocument, ReportSummary, UserSession, VerifyRequest,
};
use crate::query::{EarthquakeQuery, PredictionQuery};

/// User agent string for API requests.
const USER_AGENT: &str = concat!("seismodash/", env!("CARGO_PKG_VERSION"));

/// Which record family a statistics endpoint covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsResource {
    Earthquake,
    Prediction,
}

impl StatsResource {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Earthquake => "/earthquake",
            Self::Prediction => "/predicted-earthquake",
        }
    }
}

impl std::str::FromStr for StatsResource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "earthquake" | "earthquakes" => Ok(Self::Earthquake),
            "prediction" | "predictions" => Ok(Self::Prediction),
            _ => Err(format!("unknown resource: {s} (expected: earthquake, prediction)")),
        }
    }
}

/// Available statistics series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsKind {
    Monthly,
    MagnitudeDistribution,
    CityDistribution,
}

impl StatsKind {
    /// Get the URL path segment for this series.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::MagnitudeDistribution => "magnitude-distribution",
            Self::CityDistribution => "city-distribution",
        }
    }
}

impl std::str::FromStr for StatsKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "magnitude-distribution" | "magnitude" => Ok(Self::MagnitudeDistribution),
            "city-distribution" | "city" => Ok(Self::CityDistribution),
            _ => Err(format!(
                "unknown stats series: {s} (expected: monthly, magnitude-distribution, city-distribution)"
            )),
        }
    }
}

/// Client for the earthquake backend.
///
/// Clones share the connection pool and the cookie jar.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    cookies: Arc<Jar>,
}

impl ApiClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: &ApiConfig) -> Result<Self, SeismodashError> {
        Self::build(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    /// Create a client against an explicit base URL with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn with_base_url(base_url: &str) -> Result<Self, SeismodashError> {
        Self::new(&ApiConfig {
            base_url: base_url.to_string(),
            ..ApiConfig::default()
        })
    }

    fn build(base_url: &str, timeout: Duration) -> Result<Self, SeismodashError> {
        let cookies = Arc::new(Jar::default());
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .cookie_provider(Arc::clone(&cookies))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cookies,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn parsed_base(&self) -> Result<Url, SeismodashError> {
        Url::parse(&self.base_url)
            .map_err(|e| SeismodashError::InvalidResponse(format!("invalid base URL: {e}")))
    }

    /// Cookies currently held for the backend, as a `Cookie` header value.
    #[must_use]
    pub fn export_cookies(&self) -> Option<String> {
        let url = self.parsed_base().ok()?;
        self.cookies
            .cookies(&url)
            .and_then(|v| v.to_str().ok().map(str::to_string))
    }

    /// Seed the jar from a previously exported `Cookie` header value.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not a valid URL.
    pub fn import_cookies(&self, header: &str) -> Result<(), SeismodashError> {
        let url = self.parsed_base()?;
        for pair in header.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            self.cookies.add_cookie_str(&format!("{pair}; Path=/"), &url);
        }
        Ok(())
    }

    /// Send a request, turning non-2xx statuses into [`SeismodashError::Api`].
    fn send(&self, request: RequestBuilder) -> Result<Response, SeismodashError> {
        let response = request.send()?;

        // Check status before parsing
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SeismodashError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(response)
    }

    fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SeismodashError> {
        let body = self.send(request)?.text()?;
        Ok(serde_json::from_str(&body)?)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SeismodashError> {
        let url = self.url(path);
        debug!("GET {}", url);
        self.send_json(self.client.get(&url))
    }

    // ------------------------------------------------------------------
    // Earthquakes and predictions
    // ------------------------------------------------------------------

    /// Summary set shown while no filter is active.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or response cannot be parsed.
    #[instrument(skip(self))]
    pub fn most_severe_earthquakes(&self) -> Result<Vec<EarthquakeRecord>, SeismodashError> {
        let records: Vec<EarthquakeRecord> = self.get_json("/earthquake/most-severe")?;
        for r in &records {
            r.validate()?;
        }
        debug!("fetched {} earthquakes", records.len());
        Ok(records)
    }

    /// Server-side filtered, paginated earthquakes.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or response cannot be parsed.
    #[instrument(skip(self, query), fields(page = query.page, size = query.size))]
    pub fn filter_earthquakes(
        &self,
        query: &EarthquakeQuery,
    ) -> Result<PageResult<EarthquakeRecord>, SeismodashError> {
        let url = self.url("/earthquake/filter");
        debug!("GET {} {:?}", url, query);
        let page: PageResult<EarthquakeRecord> =
            self.send_json(self.client.get(&url).query(&query.to_pairs()))?;
        for r in &page.content {
            r.validate()?;
        }
        debug!("fetched {} of {} earthquakes", page.content.len(), page.total_elements);
        Ok(page)
    }

    /// Server-side filtered, paginated predictions.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or response cannot be parsed.
    #[instrument(skip(self, query), fields(page = query.page, size = query.size))]
    pub fn filter_predictions(
        &self,
        query: &PredictionQuery,
    ) -> Result<PageResult<PredictionRecord>, SeismodashError> {
        let url = self.url("/predicted-earthquake/filter");
        debug!("POST {} {:?}", url, query);
        let page: PageResult<PredictionRecord> =
            self.send_json(self.client.post(&url).json(query))?;
        for r in &page.content {
            r.validate()?;
        }
        Ok(page)
    }

    /// Predictions with the highest possibility.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or response cannot be parsed.
    #[instrument(skip(self))]
    pub fn most_possible_predictions(&self) -> Result<Vec<PredictionRecord>, SeismodashError> {
        self.get_predictions("/predicted-earthquake/most-possible")
    }

    /// Predictions with the highest magnitude.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or response cannot be parsed.
    #[instrument(skip(self))]
    pub fn most_severe_predictions(&self) -> Result<Vec<PredictionRecord>, SeismodashError> {
        self.get_predictions("/predicted-earthquake/most-severe")
    }

    fn get_predictions(&self, path: &str) -> Result<Vec<PredictionRecord>, SeismodashError> {
        let records: Vec<PredictionRecord> = self.get_json(path)?;
        for r in &records {
            r.validate()?;
        }
        debug!("fetched {} predictions", records.len());
        Ok(records)
    }

    /// A statistics series; the shape is defined by the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or response cannot be parsed.
    #[instrument(skip(self))]
    pub fn stats(&self, resource: StatsResource, kind: StatsKind) -> Result<Value, SeismodashError> {
        self.get_json(&format!("{}/stats/{}", resource.path(), kind.as_str()))
    }

    // ------------------------------------------------------------------
    // Reports
    // ------------------------------------------------------------------

    /// List the generated reports.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or response cannot be parsed.
    #[instrument(skip(self))]
    pub fn list_reports(&self) -> Result<Vec<ReportSummary>, SeismodashError> {
        self.get_json("/report")
    }

    /// Download one report as raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub fn download_report(&self, id: &str) -> Result<ReportDocument, SeismodashError> {
        let url = self.url(&format!("/report/{id}"));
        debug!("GET {}", url);
        let response = self.send(self.client.get(&url))?;

        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| format!("report-{id}.pdf"));
        let content = response.bytes()?.to_vec();
        debug!("downloaded {} ({} bytes)", filename, content.len());

        Ok(ReportDocument { filename, content })
    }

    // ------------------------------------------------------------------
    // Auth and profile
    // ------------------------------------------------------------------

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub fn register(&self, request: &RegisterRequest) -> Result<(), SeismodashError> {
        self.send(self.client.post(self.url("/auth/register")).json(request))?;
        Ok(())
    }

    /// Log in; the session cookie lands in the shared jar.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or response cannot be parsed.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub fn login(&self, request: &LoginRequest) -> Result<UserSession, SeismodashError> {
        self.send_json(self.client.post(self.url("/auth/login")).json(request))
    }

    /// Confirm the email address with the 6-digit code.
    ///
    /// Returns the refreshed user when the backend sends one back.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub fn verify(&self, request: &VerifyRequest) -> Result<Option<UserSession>, SeismodashError> {
        let body = self
            .send(self.client.post(self.url("/auth/verify")).json(request))?
            .text()?;
        Ok(serde_json::from_str(&body).ok())
    }

    /// Ask for a new verification code.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub fn resend_verification(&self, email: &str) -> Result<(), SeismodashError> {
        let body = EmailRequest {
            email: email.to_string(),
        };
        self.send(
            self.client
                .post(self.url("/auth/verify-email/resend"))
                .json(&body),
        )?;
        Ok(())
    }

    /// Start the password reset flow.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub fn forgot_password(&self, email: &str) -> Result<(), SeismodashError> {
        let body = EmailRequest {
            email: email.to_string(),
        };
        self.send(
            self.client
                .post(self.url("/auth/forgot-my-password"))
                .json(&body),
        )?;
        Ok(())
    }

    /// End the backend session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub fn logout(&self) -> Result<(), SeismodashError> {
        self.send(self.client.get(self.url("/auth/logout")))?;
        Ok(())
    }

    /// Update the current user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or response cannot be parsed.
    #[instrument(skip(self, update))]
    pub fn update_profile(&self, update: &ProfileUpdate) -> Result<UserSession, SeismodashError> {
        self.send_json(self.client.patch(self.url("/user/me")).json(update))
    }

    /// Change the current user's password.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, current, new))]
    pub fn change_password(&self, current: &str, new: &str) -> Result<(), SeismodashError> {
        self.send(
            self.client
                .patch(self.url("/user/me/password"))
                .query(&[("password", current), ("newPassword", new)]),
        )?;
        Ok(())
    }
}

/// Extract the file name from a `Content-Disposition` header value.
///
/// Directory components are dropped.
#[must_use]
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let raw = header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))?;
    let name = raw.trim_matches('"');
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::FilterCriteria;
    use crate::transform::PageNumber;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Run blocking client code off the async test runtime.
    async fn blocking<T, F>(f: F) -> T
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(f).await.expect("blocking task")
    }

    fn quake_json(id: u32, city: &str, magnitude: f64) -> Value {
        json!({
            "id": id,
            "magnitude": magnitude,
            "depth": 8.5,
            "location": {"city": city, "latitude": 38.0, "longitude": 35.0},
            "occurrenceDate": "2024-04-01T12:00:00"
        })
    }

    #[test]
    fn test_stats_kind_round_trip() {
        for kind in [
            StatsKind::Monthly,
            StatsKind::MagnitudeDistribution,
            StatsKind::CityDistribution,
        ] {
            let parsed: StatsKind = kind.as_str().parse().expect("failed to parse");
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn test_filename_from_disposition() {
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="weekly.pdf""#),
            Some("weekly.pdf".to_string())
        );
        assert_eq!(
            filename_from_disposition("attachment; filename=../../etc/x.pdf"),
            Some("x.pdf".to_string())
        );
        assert_eq!(filename_from_disposition("inline"), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_most_severe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/earthquake/most-severe"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([quake_json(1, "Van", 6.1), quake_json(2, "Muş", 4.0)])),
            )
            .mount(&server)
            .await;

        let base = server.uri();
        let records = blocking(move || {
            ApiClient::with_base_url(&base)
                .expect("client")
                .most_severe_earthquakes()
        })
        .await
        .expect("fetch");

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].location.city, "Muş");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_filter_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/earthquake/filter"))
            .and(query_param("city", "Hatay"))
            .and(query_param("maxMagnitude", "10"))
            .and(query_param("page", "1"))
            .and(query_param("size", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [quake_json(9, "Hatay", 5.5)],
                "totalElements": 6,
                "totalPages": 2,
                "number": 1,
                "size": 5
            })))
            .mount(&server)
            .await;

        let base = server.uri();
        let page = blocking(move || {
            let criteria = FilterCriteria {
                city: Some("Hatay".into()),
                ..FilterCriteria::default()
            };
            let query = EarthquakeQuery::new(&criteria, PageNumber::new(2), 5);
            ApiClient::with_base_url(&base)
                .expect("client")
                .filter_earthquakes(&query)
        })
        .await
        .expect("fetch");

        assert_eq!(page.total_pages, 2);
        assert_eq!(PageNumber::from_api_index(page.page_number), PageNumber::new(2));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_prediction_filter_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predicted-earthquake/filter"))
            .and(body_json(json!({
                "minMagnitude": 0.0,
                "maxMagnitude": 10.0,
                "city": null,
                "startDate": null,
                "endDate": null,
                "page": 0,
                "size": 10
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [], "totalElements": 0, "totalPages": 0, "number": 0, "size": 10
            })))
            .mount(&server)
            .await;

        let base = server.uri();
        let page = blocking(move || {
            let query = PredictionQuery::new(&FilterCriteria::default(), PageNumber::FIRST, 10);
            ApiClient::with_base_url(&base)
                .expect("client")
                .filter_predictions(&query)
        })
        .await
        .expect("fetch");
        assert!(page.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_error_status_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .mount(&server)
            .await;

        let base = server.uri();
        let err = blocking(move || {
            ApiClient::with_base_url(&base).expect("client").login(&LoginRequest {
                email: "a@b.co".into(),
                password: "nope".into(),
            })
        })
        .await
        .expect_err("should fail");

        assert_eq!(err.status(), Some(401));
        assert_eq!(err.user_message(), "Invalid email or password.");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_download_report() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/report/17"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-disposition", r#"attachment; filename="march.pdf""#)
                    .set_body_bytes(b"%PDF-1.7".to_vec()),
            )
            .mount(&server)
            .await;

        let base = server.uri();
        let doc = blocking(move || {
            ApiClient::with_base_url(&base)
                .expect("client")
                .download_report("17")
        })
        .await
        .expect("download");

        assert_eq!(doc.filename, "march.pdf");
        assert_eq!(doc.content, b"%PDF-1.7");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_login_cookie_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "SESSION=abc123; Path=/; HttpOnly")
                    .set_body_json(json!({
                        "id": 3, "email": "a@b.co", "firstName": "A", "lastName": "B",
                        "authorities": ["ROLE_USER"], "isVerified": false
                    })),
            )
            .mount(&server)
            .await;

        let base = server.uri();
        let (user, cookies) = blocking(move || {
            let client = ApiClient::with_base_url(&base).expect("client");
            let user = client.login(&LoginRequest {
                email: "a@b.co".into(),
                password: "secret".into(),
            });
            (user, client.export_cookies())
        })
        .await;

        assert_eq!(user.expect("login").email, "a@b.co");
        assert_eq!(cookies.as_deref(), Some("SESSION=abc123"));
    }
}
