//! CrowdStrike Falcon provider.
//!
//! Owns the OAuth2 client-credentials session: one token, one expiry, and
//! the three resource handles bound to that token. Re-authentication is a
//! full shutdown + initialize cycle so first login and re-login share one
//! code path.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::config::{Secret, Settings};
use crate::error::{FalconError, Result};
use crate::provider::{
    ApiBody, ApiResponse, DetectsApi, HostsApi, IncidentsApi, Provider, QueryParams,
    TOKEN_EXPIRY_BUFFER_SECS,
};

/// TTL assumed when the token grant omits `expires_in`.
const DEFAULT_TOKEN_TTL_SECS: i64 = 1800;

#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: Option<String>,
    expires_in: Option<i64>,
    #[serde(default)]
    errors: Option<Value>,
}

/// Authenticated HTTP channel to one Falcon cloud. Created per session;
/// replaced wholesale on re-authentication.
struct RestClient {
    http: reqwest::Client,
    base_url: String,
    token: Secret,
}

impl RestClient {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<ApiResponse> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(self.token.expose())
            .query(query)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn post(&self, path: &str, query: &[(&str, String)], body: Value) -> Result<ApiResponse> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(self.token.expose())
            .query(query)
            .json(&body)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn patch(&self, path: &str, body: Value) -> Result<ApiResponse> {
        let response = self
            .http
            .patch(format!("{}{}", self.base_url, path))
            .bearer_auth(self.token.expose())
            .json(&body)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn read(response: reqwest::Response) -> Result<ApiResponse> {
        let status_code = response.status().as_u16();
        let text = response.text().await?;
        let body = if text.trim().is_empty() {
            ApiBody::default()
        } else {
            serde_json::from_str(&text).unwrap_or_else(|_| ApiBody {
                errors: Some(json!([{ "message": text }])),
                ..ApiBody::default()
            })
        };
        Ok(ApiResponse { status_code, body })
    }
}

fn query_pairs(params: &QueryParams) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
        ("limit", params.limit.to_string()),
        ("offset", params.offset.to_string()),
    ];
    if let Some(filter) = &params.filter {
        pairs.push(("filter", filter.clone()));
    }
    if let Some(sort) = &params.sort {
        pairs.push(("sort", sort.clone()));
    }
    pairs
}

/// Hosts service collection.
struct FalconHosts {
    rest: Arc<RestClient>,
}

#[async_trait]
impl HostsApi for FalconHosts {
    async fn query_devices_by_filter(&self, params: QueryParams) -> Result<ApiResponse> {
        self.rest
            .get("/devices/queries/devices/v1", &query_pairs(&params))
            .await
    }

    async fn get_device_details(&self, ids: Vec<String>) -> Result<ApiResponse> {
        self.rest
            .post("/devices/entities/devices/v2", &[], json!({ "ids": ids }))
            .await
    }

    async fn perform_action(&self, action_name: &str, ids: Vec<String>) -> Result<ApiResponse> {
        self.rest
            .post(
                "/devices/entities/devices-actions/v2",
                &[("action_name", action_name.to_string())],
                json!({ "ids": ids }),
            )
            .await
    }
}

/// Detections service collection.
struct FalconDetects {
    rest: Arc<RestClient>,
}

#[async_trait]
impl DetectsApi for FalconDetects {
    async fn query_detects(&self, params: QueryParams) -> Result<ApiResponse> {
        self.rest
            .get("/detects/queries/detects/v1", &query_pairs(&params))
            .await
    }

    async fn get_detect_summaries(&self, ids: Vec<String>) -> Result<ApiResponse> {
        self.rest
            .post(
                "/detects/entities/summaries/GET/v1",
                &[],
                json!({ "ids": ids }),
            )
            .await
    }

    async fn update_detects_by_ids(
        &self,
        ids: Vec<String>,
        status: &str,
        comment: Option<String>,
    ) -> Result<ApiResponse> {
        let mut body = json!({ "ids": ids, "status": status });
        if let Some(comment) = comment {
            body["comment"] = Value::String(comment);
        }
        self.rest.patch("/detects/entities/detects/v2", body).await
    }
}

/// Incidents service collection.
struct FalconIncidents {
    rest: Arc<RestClient>,
}

#[async_trait]
impl IncidentsApi for FalconIncidents {
    async fn query_incidents(&self, params: QueryParams) -> Result<ApiResponse> {
        self.rest
            .get("/incidents/queries/incidents/v1", &query_pairs(&params))
            .await
    }

    async fn get_incidents(&self, ids: Vec<String>) -> Result<ApiResponse> {
        self.rest
            .post("/incidents/entities/GET/v1", &[], json!({ "ids": ids }))
            .await
    }
}

/// One authenticated session. Replaced atomically; never mutated in place.
struct Session {
    token: Secret,
    expires_at: DateTime<Utc>,
    hosts: Arc<FalconHosts>,
    detects: Arc<FalconDetects>,
    incidents: Arc<FalconIncidents>,
}

/// CrowdStrike Falcon API provider.
///
/// Tokens live in memory only and are never logged. The `lifecycle` mutex
/// serializes initialize/shutdown/refresh; the session lock is only held
/// for short synchronous reads and is never held across a remote call.
pub struct FalconProvider {
    settings: Settings,
    http: reqwest::Client,
    session: RwLock<Option<Arc<Session>>>,
    lifecycle: Mutex<()>,
}

impl FalconProvider {
    pub fn new(settings: Settings) -> Self {
        tracing::info!(base_url = %settings.base_url, "CrowdStrike provider created");
        Self {
            settings,
            http: reqwest::Client::new(),
            session: RwLock::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    fn current_session(&self) -> Option<Arc<Session>> {
        self.session
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn store_session(&self, session: Option<Arc<Session>>) {
        *self
            .session
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = session;
    }

    /// OAuth2 client-credentials exchange. Must only run under the
    /// lifecycle lock.
    async fn initialize_locked(&self) -> Result<()> {
        if self.current_session().is_some() {
            tracing::warn!("Provider already initialized");
            return Ok(());
        }

        tracing::info!("Initializing CrowdStrike Falcon API connection");

        let response = self
            .http
            .post(format!("{}/oauth2/token", self.settings.base_url))
            .form(&[
                ("client_id", self.settings.client_id.expose()),
                ("client_secret", self.settings.client_secret.expose()),
            ])
            .send()
            .await
            .map_err(|cause| {
                FalconError::auth_failed(None, format!("token request failed: {cause}"))
            })?;

        let status_code = response.status().as_u16();
        let grant: TokenGrant = response.json().await.map_err(|cause| {
            FalconError::auth_failed(
                Some(status_code),
                format!("malformed token response: {cause}"),
            )
        })?;

        // FalconPy reports 201 on success; some clouds return 200.
        if !matches!(status_code, 200 | 201) {
            let message = grant
                .errors
                .map(|errors| errors.to_string())
                .unwrap_or_else(|| "Unknown authentication error".to_string());
            tracing::error!(status_code, "Failed to authenticate with CrowdStrike");
            return Err(FalconError::auth_failed(Some(status_code), message));
        }

        let token = grant.access_token.ok_or_else(|| {
            FalconError::auth_failed(Some(status_code), "token response carried no access_token")
        })?;

        let expires_in = grant.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        let expires_at = Utc::now() + Duration::seconds(expires_in - TOKEN_EXPIRY_BUFFER_SECS);

        tracing::info!(expires_in, "Successfully authenticated with CrowdStrike");

        let rest = Arc::new(RestClient {
            http: self.http.clone(),
            base_url: self.settings.base_url.clone(),
            token: Secret::new(token.clone()),
        });

        self.store_session(Some(Arc::new(Session {
            token: Secret::new(token),
            expires_at,
            hosts: Arc::new(FalconHosts { rest: rest.clone() }),
            detects: Arc::new(FalconDetects { rest: rest.clone() }),
            incidents: Arc::new(FalconIncidents { rest }),
        })));

        tracing::info!("CrowdStrike provider initialized successfully");
        Ok(())
    }

    /// Revoke + clear. Must only run under the lifecycle lock. Revocation
    /// failure is logged, never raised: it must not block teardown.
    async fn shutdown_locked(&self) {
        let Some(session) = self.current_session() else {
            return;
        };

        tracing::info!("Shutting down CrowdStrike provider");

        let revoke = self
            .http
            .post(format!("{}/oauth2/revoke", self.settings.base_url))
            .basic_auth(
                self.settings.client_id.expose(),
                Some(self.settings.client_secret.expose()),
            )
            .form(&[("token", session.token.expose())])
            .send()
            .await;

        match revoke {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                tracing::warn!(
                    status_code = response.status().as_u16(),
                    "Failed to revoke token during shutdown"
                );
            }
            Err(cause) => {
                tracing::warn!(error = %cause, "Failed to revoke token during shutdown");
            }
        }

        self.store_session(None);
        tracing::info!("CrowdStrike provider shutdown complete");
    }
}

#[async_trait]
impl Provider for FalconProvider {
    async fn initialize(&self) -> Result<()> {
        let _guard = self.lifecycle.lock().await;
        self.initialize_locked().await
    }

    async fn shutdown(&self) -> Result<()> {
        let _guard = self.lifecycle.lock().await;
        self.shutdown_locked().await;
        Ok(())
    }

    async fn refresh_token_if_needed(&self) -> Result<()> {
        let _guard = self.lifecycle.lock().await;

        let expired = match self.current_session() {
            Some(session) => Utc::now() >= session.expires_at,
            // No session yet: treated as expired so the first caller
            // through this path establishes one.
            None => true,
        };

        if expired {
            tracing::info!("Token expired, re-initializing provider");
            self.shutdown_locked().await;
            self.initialize_locked().await?;
        }

        Ok(())
    }

    async fn health_check(&self) -> bool {
        if self.current_session().is_none() {
            tracing::warn!("Health check called on uninitialized provider");
            return false;
        }

        if let Err(error) = self.refresh_token_if_needed().await {
            tracing::error!(%error, "Health check failed during token refresh");
            return false;
        }

        let hosts = match self.hosts() {
            Ok(hosts) => hosts,
            Err(error) => {
                tracing::error!(%error, "Health check failed to obtain hosts handle");
                return false;
            }
        };

        let params = QueryParams {
            limit: 1,
            ..QueryParams::default()
        };

        match hosts.query_devices_by_filter(params).await {
            Ok(response) if response.status_code == 200 => {
                tracing::info!("Health check passed");
                true
            }
            Ok(response) => {
                tracing::warn!(
                    status_code = response.status_code,
                    "Health check failed - unexpected response"
                );
                false
            }
            Err(error) => {
                tracing::error!(%error, "Health check failed with error");
                false
            }
        }
    }

    fn hosts(&self) -> Result<Arc<dyn HostsApi>> {
        self.current_session()
            .map(|session| session.hosts.clone() as Arc<dyn HostsApi>)
            .ok_or(FalconError::NotInitialized)
    }

    fn detects(&self) -> Result<Arc<dyn DetectsApi>> {
        self.current_session()
            .map(|session| session.detects.clone() as Arc<dyn DetectsApi>)
            .ok_or(FalconError::NotInitialized)
    }

    fn incidents(&self) -> Result<Arc<dyn IncidentsApi>> {
        self.current_session()
            .map(|session| session.incidents.clone() as Arc<dyn IncidentsApi>)
            .ok_or(FalconError::NotInitialized)
    }
}
