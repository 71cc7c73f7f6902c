//! Context broker client (Keystone + Orion)

use std::sync::Arc;

use contracts::{BatchRequest, ContextStoreConfig, Entity, EntityStore, RetryPolicy, SyncError};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::auth::{
    KeystoneRequest, TokenRegistry, TokenState, AUTH_TOKEN_HEADER, SUBJECT_TOKEN_HEADER,
};
use crate::metrics::StoreMetrics;

const SERVICE_HEADER: &str = "Fiware-Service";
const SERVICE_PATH_HEADER: &str = "Fiware-ServicePath";

/// Last failure of a batch write, reported once the budget is spent
enum Failure {
    Status { status: u16, body: String },
    Transport(String),
}

/// Client for an Orion context broker behind Keystone
#[derive(Debug)]
pub struct ContextBrokerClient {
    http: Client,
    keystone_url: String,
    orion_url: String,
    service: String,
    username: String,
    password: String,
    policy: RetryPolicy,
    tokens: TokenRegistry,
    /// Serializes authentications and renewals
    auth_lock: Mutex<()>,
    metrics: Arc<StoreMetrics>,
}

impl ContextBrokerClient {
    /// Create a client; no request is made until the first call
    pub fn new(config: &ContextStoreConfig, policy: RetryPolicy) -> Result<Self, SyncError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SyncError::transport(&config.orion_url, e))?;

        Ok(Self {
            http,
            keystone_url: config.keystone_url.trim_end_matches('/').to_string(),
            orion_url: config.orion_url.trim_end_matches('/').to_string(),
            service: config.service.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            policy,
            tokens: TokenRegistry::new(),
            auth_lock: Mutex::new(()),
            metrics: Arc::new(StoreMetrics::new()),
        })
    }

    /// Shared store counters
    pub fn metrics(&self) -> Arc<StoreMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Current token state of a tenant
    pub async fn token_state(&self, tenant: &str) -> Option<TokenState> {
        self.tokens.get(tenant).await
    }

    /// Exchange the operator credentials for a tenant token
    ///
    /// # Errors
    /// `Authentication` on any status other than 201
    #[instrument(name = "store_authenticate", skip(self), fields(service = %self.service))]
    pub async fn authenticate(&self, tenant: &str) -> Result<String, SyncError> {
        let body = KeystoneRequest::password(&self.service, tenant, &self.username, &self.password);
        let token = self.request_token(tenant, &body).await?;
        self.tokens.set_authenticated(tenant, token.clone()).await;
        self.metrics.inc_authentications();
        info!("authenticated against keystone");
        Ok(token)
    }

    /// Exchange the tenant's current token for a fresh one
    ///
    /// Falls back to [`authenticate`](Self::authenticate) when the tenant
    /// holds no token yet.
    ///
    /// # Errors
    /// `Authentication` on any status other than 201
    #[instrument(name = "store_renew", skip(self), fields(service = %self.service))]
    pub async fn renew(&self, tenant: &str) -> Result<String, SyncError> {
        let Some(state) = self.tokens.get(tenant).await else {
            return self.authenticate(tenant).await;
        };

        let body = KeystoneRequest::token(&self.service, tenant, state.token());
        let token = self.request_token(tenant, &body).await?;
        self.tokens.set_authenticated(tenant, token.clone()).await;
        self.metrics.inc_renewals();
        metrics::counter!("parking_syncer_token_renewals_total").increment(1);
        info!("renewed keystone token");
        Ok(token)
    }

    /// Point lookup of one entity; `None` when the store answers 404
    ///
    /// # Errors
    /// - `NetworkFault` on any other non-200 status, and on a 401 that
    ///   survives one renewal (the tenant is left `Expired`)
    /// - `Authentication` when a required token exchange fails
    #[instrument(name = "store_get_entity", skip(self))]
    pub async fn get_entity(
        &self,
        tenant: &str,
        id: &str,
        entity_type: &str,
    ) -> Result<Option<Value>, SyncError> {
        let url = format!("{}/v2/entities/{}", self.orion_url, id);
        let mut token = self.token_for(tenant).await?;
        let mut renewed = false;

        loop {
            let response = self
                .http
                .get(&url)
                .query(&[("type", entity_type)])
                .headers(self.tenant_headers(tenant, &token)?)
                .send()
                .await
                .map_err(|e| SyncError::transport(&url, e))?;

            match response.status() {
                StatusCode::OK => {
                    let entity = response
                        .json::<Value>()
                        .await
                        .map_err(|e| SyncError::decode(&url, e))?;
                    return Ok(Some(entity));
                }
                StatusCode::NOT_FOUND => {
                    debug!("entity not found");
                    return Ok(None);
                }
                StatusCode::UNAUTHORIZED if !renewed => {
                    renewed = true;
                    token = self.renew_rejected(tenant, &token).await?;
                }
                StatusCode::UNAUTHORIZED => {
                    return Err(self.refused(tenant, &token, &url, response).await);
                }
                status => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(SyncError::network_fault(&url, status.as_u16(), body));
                }
            }
        }
    }

    /// Append-upsert one batch
    ///
    /// A 401 triggers one renewal that does not count against the retry
    /// budget. A second 401 fails the batch at once and leaves the tenant
    /// `Expired`. Any other non-204 answer is retried up to `retries` times.
    /// Every accepted batch is followed by the pacing sleep.
    ///
    /// # Errors
    /// `NetworkFault` (or `Transport`) carrying the last failure once the
    /// budget is spent
    #[instrument(
        name = "store_send_batch",
        skip(self, entities),
        fields(entities = entities.len())
    )]
    pub async fn send_batch(&self, tenant: &str, entities: &[Entity]) -> Result<(), SyncError> {
        let url = format!("{}/v2/op/update", self.orion_url);
        let body = serde_json::to_vec(&BatchRequest::append(entities))
            .map_err(|e| SyncError::decode("batch body", e))?;

        let mut token = self.token_for(tenant).await?;
        let mut renewed = false;
        let mut attempt: u32 = 0;

        loop {
            let sent = self
                .http
                .post(&url)
                .headers(self.tenant_headers(tenant, &token)?)
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone())
                .send()
                .await;

            let failure = match sent {
                Ok(response) => match response.status() {
                    StatusCode::NO_CONTENT => {
                        self.metrics.record_batch(entities.len());
                        metrics::counter!("parking_syncer_batches_sent_total").increment(1);
                        debug!(attempt, "batch accepted");
                        if !self.policy.pace.is_zero() {
                            tokio::time::sleep(self.policy.pace).await;
                        }
                        return Ok(());
                    }
                    StatusCode::UNAUTHORIZED if !renewed => {
                        renewed = true;
                        token = self.renew_rejected(tenant, &token).await?;
                        continue;
                    }
                    StatusCode::UNAUTHORIZED => {
                        return Err(self.refused(tenant, &token, &url, response).await);
                    }
                    status => Failure::Status {
                        status: status.as_u16(),
                        body: response.text().await.unwrap_or_default(),
                    },
                },
                Err(e) => Failure::Transport(e.to_string()),
            };

            if attempt >= self.policy.retries {
                return Err(match failure {
                    Failure::Status { status, body } => {
                        SyncError::network_fault(&url, status, body)
                    }
                    Failure::Transport(message) => SyncError::transport(&url, message),
                });
            }

            attempt += 1;
            self.metrics.inc_retries();
            metrics::counter!("parking_syncer_batch_retries_total").increment(1);
            match &failure {
                Failure::Status { status, body } => warn!(
                    attempt,
                    status,
                    body = %body,
                    "batch rejected, retrying"
                ),
                Failure::Transport(message) => warn!(
                    attempt,
                    error = %message,
                    "batch transport failure, retrying"
                ),
            }
            if !self.policy.retry_sleep.is_zero() {
                tokio::time::sleep(self.policy.retry_sleep).await;
            }
        }
    }

    /// Token usable for the next request, authenticating or renewing as needed
    async fn token_for(&self, tenant: &str) -> Result<String, SyncError> {
        match self.tokens.get(tenant).await {
            Some(TokenState::Authenticated(token)) => Ok(token),
            Some(TokenState::Expired(token)) => self.renew_rejected(tenant, &token).await,
            None => {
                let _guard = self.auth_lock.lock().await;
                match self.tokens.get(tenant).await {
                    Some(TokenState::Authenticated(token)) => Ok(token),
                    _ => self.authenticate(tenant).await,
                }
            }
        }
    }

    /// Renew after `rejected` got a 401, reusing a token another caller
    /// already obtained
    async fn renew_rejected(&self, tenant: &str, rejected: &str) -> Result<String, SyncError> {
        let _guard = self.auth_lock.lock().await;
        if let Some(TokenState::Authenticated(current)) = self.tokens.get(tenant).await {
            if current != rejected {
                debug!("token already renewed by a concurrent request");
                return Ok(current);
            }
        }
        self.tokens.mark_expired(tenant, rejected).await;
        self.renew(tenant).await
    }

    /// The renewed token was refused too: expire it so the next call renews
    async fn refused(
        &self,
        tenant: &str,
        token: &str,
        url: &str,
        response: reqwest::Response,
    ) -> SyncError {
        self.tokens.mark_expired(tenant, token).await;
        warn!("renewed token rejected, tenant left expired");
        let body = response.text().await.unwrap_or_default();
        SyncError::network_fault(url, StatusCode::UNAUTHORIZED.as_u16(), body)
    }

    async fn request_token(
        &self,
        tenant: &str,
        body: &KeystoneRequest<'_>,
    ) -> Result<String, SyncError> {
        let url = format!("{}/v3/auth/tokens", self.keystone_url);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| SyncError::transport(&url, e))?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let text = response.text().await.unwrap_or_default();
            return Err(SyncError::authentication(
                "keystone",
                format!(
                    "token request for '{tenant}' returned {}: {}",
                    status.as_u16(),
                    text
                ),
            ));
        }

        response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                SyncError::authentication(
                    "keystone",
                    format!("response lacks the {SUBJECT_TOKEN_HEADER} header"),
                )
            })
    }

    fn tenant_headers(&self, tenant: &str, token: &str) -> Result<HeaderMap, SyncError> {
        let value = |field: &str, raw: &str| {
            HeaderValue::from_str(raw)
                .map_err(|e| SyncError::config_validation(field.to_string(), e.to_string()))
        };

        let mut headers = HeaderMap::new();
        headers.insert(SERVICE_HEADER, value("context_store.service", &self.service)?);
        headers.insert(SERVICE_PATH_HEADER, value("context_store.subservice", tenant)?);
        headers.insert(AUTH_TOKEN_HEADER, value("token", token)?);
        Ok(headers)
    }
}

impl EntityStore for ContextBrokerClient {
    fn name(&self) -> &str {
        "orion"
    }

    async fn get_entity(
        &self,
        tenant: &str,
        id: &str,
        entity_type: &str,
    ) -> Result<Option<Value>, SyncError> {
        ContextBrokerClient::get_entity(self, tenant, id, entity_type).await
    }

    async fn send_batch(&self, tenant: &str, entities: &[Entity]) -> Result<(), SyncError> {
        ContextBrokerClient::send_batch(self, tenant, entities).await
    }
}
