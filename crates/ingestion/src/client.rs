//! HTTP client for the parking sensor API
//!
//! Every request, login included, takes a token from the shared
//! [`TokenBucket`] first.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use contracts::{
    scalar_key, Device, Event, PhenomenonRecord, Project, SensorApi, SensorApiConfig, Spot,
    SyncError, Zone,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::metrics::FetchMetrics;
use crate::rate_limiter::TokenBucket;
use crate::window::FetchWindow;

/// Header carrying the session token
pub const IDENTITY_HEADER: &str = "IDENTITY_KEY";

/// Authenticated sensor API session
#[derive(Debug, Clone)]
pub struct SensorApiClient {
    http: Client,
    /// `{endpoint}/v2/organisms/{organism}`
    base: String,
    token: String,
    limiter: Arc<TokenBucket>,
    metrics: Arc<FetchMetrics>,
}

impl SensorApiClient {
    /// Log in with the configured credentials and a fresh rate limiter
    ///
    /// # Errors
    /// - `Authentication` on a non-2xx login response
    /// - `Transport` when the API is unreachable
    pub async fn login(config: &SensorApiConfig) -> Result<Self, SyncError> {
        let limiter = Arc::new(TokenBucket::from_config(&config.rate_limit)?);
        Self::login_with_limiter(config, limiter).await
    }

    /// Log in sharing an existing rate limiter
    #[instrument(
        name = "sensor_api_login",
        skip(config, limiter),
        fields(endpoint = %config.endpoint, organism = %config.organism)
    )]
    pub async fn login_with_limiter(
        config: &SensorApiConfig,
        limiter: Arc<TokenBucket>,
    ) -> Result<Self, SyncError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SyncError::transport(&config.endpoint, e))?;

        let endpoint = config.endpoint.trim_end_matches('/');
        let url = format!(
            "{endpoint}/v2/auth/{}/{}/{}",
            urlencoding::encode(&config.organism),
            urlencoding::encode(&config.username),
            urlencoding::encode(&config.password),
        );
        // The URL embeds the password; log the endpoint only.
        let login_url = format!("{endpoint}/v2/auth");

        let metrics = Arc::new(FetchMetrics::new());
        limiter.acquire().await;
        metrics.record_request();

        let response = http
            .get(&url)
            .send()
            .await
            .map_err(|e| SyncError::transport(&login_url, e.without_url()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SyncError::transport(&login_url, e.without_url()))?;

        if !status.is_success() {
            return Err(SyncError::authentication(
                "sensor api",
                format!("login returned {}: {}", status.as_u16(), body.trim()),
            ));
        }

        let token = body.trim().trim_matches('"').to_string();
        if token.is_empty() {
            return Err(SyncError::authentication(
                "sensor api",
                "login returned an empty token",
            ));
        }

        info!("sensor api session established");

        Ok(Self {
            http,
            base: format!(
                "{endpoint}/v2/organisms/{}",
                urlencoding::encode(&config.organism)
            ),
            token,
            limiter,
            metrics,
        })
    }

    /// Shared fetch counters
    pub fn metrics(&self) -> Arc<FetchMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Authenticated GET of a JSON array, re-keyed by `key_attr`
    ///
    /// # Errors
    /// - `Endpoint` on a non-2xx status
    /// - `Decode` when the body is not an array of records carrying `key_attr`
    #[instrument(name = "sensor_api_list", skip(self), fields(path = %path))]
    pub async fn list_resource<T: DeserializeOwned>(
        &self,
        path: &str,
        key_attr: &str,
    ) -> Result<BTreeMap<String, T>, SyncError> {
        let response = self.get(path, None).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::endpoint(path, status.as_u16(), body));
        }

        let records: Vec<Value> = response
            .json()
            .await
            .map_err(|e| SyncError::decode(path, e.without_url()))?;

        let mut keyed = BTreeMap::new();
        for record in records {
            let key = record
                .get(key_attr)
                .and_then(scalar_key)
                .ok_or_else(|| SyncError::decode(path, format!("record without '{key_attr}'")))?;
            let value = serde_json::from_value(record)
                .map_err(|e| SyncError::decode(format!("{path}[{key}]"), e))?;
            keyed.insert(key, value);
        }

        debug!(count = keyed.len(), "listed resource");
        Ok(keyed)
    }

    /// Raw parking records of a project, keyed by `pomid`
    pub async fn parkings(&self, project_id: &str) -> Result<BTreeMap<String, Value>, SyncError> {
        self.list_resource(&format!("projects/{project_id}/parkings"), "pomid")
            .await
    }

    /// Tokens left in the shared rate limiter
    pub async fn rate_headroom(&self) -> f64 {
        self.limiter.available().await
    }

    /// Occupancy events of one spot, ascending by timestamp.
    ///
    /// The window is clamped to seven days. A failed request is retried once;
    /// a second failure is logged and yields an empty list.
    #[instrument(name = "sensor_api_events", skip(self, from, to), fields(pomid = %pomid))]
    pub async fn fetch_events(
        &self,
        project_id: &str,
        pomid: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<Event> {
        let window = FetchWindow::clamped(from, to);
        if window.clamped {
            warn!(
                requested_to = %to,
                effective_to = %window.to,
                "fetch window exceeds seven days, later events deferred to next run"
            );
        }

        let first = match self.try_fetch_events(project_id, pomid, &window).await {
            Ok(events) => return self.fetched(events),
            Err(e) => e,
        };

        warn!(error = %first, "event fetch failed, retrying once");
        self.metrics.record_retry();
        metrics::counter!("parking_syncer_event_fetch_retries_total").increment(1);

        match self.try_fetch_events(project_id, pomid, &window).await {
            Ok(events) => self.fetched(events),
            Err(second) => {
                error!(error = %second, "event fetch failed twice, spot skipped for this run");
                self.metrics.record_degraded();
                metrics::counter!("parking_syncer_event_fetch_failures_total").increment(1);
                Vec::new()
            }
        }
    }

    fn fetched(&self, events: Vec<Event>) -> Vec<Event> {
        self.metrics.record_events(events.len());
        metrics::counter!("parking_syncer_events_fetched_total").increment(events.len() as u64);
        debug!(count = events.len(), "fetched events");
        events
    }

    async fn try_fetch_events(
        &self,
        project_id: &str,
        pomid: &str,
        window: &FetchWindow,
    ) -> Result<Vec<Event>, SyncError> {
        let transient = |message: String| SyncError::TransientFetch {
            pomid: pomid.to_string(),
            message,
        };

        let path = format!("projects/{project_id}/spots/{pomid}/phenomenons/vehicle_ctrl");
        let (start, end) = window.query_bounds();
        let response = self
            .get(&path, Some(&[("start", start), ("end", end)][..]))
            .await
            .map_err(|e| transient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(transient(format!("status {}: {}", status.as_u16(), body)));
        }

        let records: Vec<PhenomenonRecord> = response
            .json()
            .await
            .map_err(|e| transient(format!("undecodable body: {}", e.without_url())))?;

        let mut events: Vec<Event> = records
            .into_iter()
            .flat_map(PhenomenonRecord::into_events)
            .collect();
        events.sort_by_key(|event| event.timestamp);
        Ok(events)
    }

    async fn get(&self, path: &str, query: Option<&[(&str, i64)]>) -> Result<Response, SyncError> {
        let url = format!("{}/{}", self.base, path);
        self.limiter.acquire().await;
        self.metrics.record_request();
        metrics::counter!("parking_syncer_sensor_api_requests_total").increment(1);

        let mut request = self.http.get(&url).header(IDENTITY_HEADER, &self.token);
        if let Some(query) = query {
            request = request.query(query);
        }
        request
            .send()
            .await
            .map_err(|e| SyncError::transport(&url, e.without_url()))
    }
}

impl SensorApi for SensorApiClient {
    async fn projects(&self) -> Result<BTreeMap<String, Project>, SyncError> {
        self.list_resource("projects", "projectid").await
    }

    async fn zones(&self, project_id: &str) -> Result<BTreeMap<String, Zone>, SyncError> {
        self.list_resource(&format!("projects/{project_id}/zones"), "zoneid")
            .await
    }

    async fn devices(
        &self,
        project_id: &str,
        zone_id: &str,
    ) -> Result<BTreeMap<String, Device>, SyncError> {
        let mut devices: BTreeMap<String, Device> = self
            .list_resource(
                &format!("projects/{project_id}/zones/{zone_id}/devices"),
                "elementid",
            )
            .await?;
        for device in devices.values_mut() {
            device.zoneid.get_or_insert_with(|| zone_id.to_string());
        }
        Ok(devices)
    }

    async fn spots(&self, project_id: &str) -> Result<BTreeMap<String, Spot>, SyncError> {
        self.list_resource(&format!("projects/{project_id}/spots"), "pomid")
            .await
    }

    async fn events(
        &self,
        project_id: &str,
        pomid: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<Event> {
        self.fetch_events(project_id, pomid, from, to).await
    }
}
