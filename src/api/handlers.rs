use axum::{
    extract::{connect_info::ConnectInfo, FromRequestParts, Query, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::auth::AdminGate;
use crate::config::Config;
use crate::models::Visit;
use crate::storage::{StorageError, VisitStorage};
use crate::tracking::recorder::header_map;
use crate::tracking::{resolve_client, ReverseDns, VisitRecorder};

use super::pages;

pub struct AppState {
    pub storage: Arc<dyn VisitStorage>,
    pub recorder: VisitRecorder,
    pub admin: AdminGate,
    pub admin_list_limit: i64,
}

impl AppState {
    pub fn new(config: &Config, storage: Arc<dyn VisitStorage>) -> Self {
        let dns = ReverseDns::from_config(&config.tracking);
        Self {
            recorder: VisitRecorder::new(Arc::clone(&storage), dns),
            storage,
            admin: AdminGate::new(config.admin.key.as_deref()),
            admin_list_limit: config.admin.list_limit,
        }
    }
}

/// Socket peer address, when the server was started with connect info
#[derive(Debug, Clone, Copy)]
pub struct PeerAddr(pub Option<IpAddr>);

impl<S> FromRequestParts<S> for PeerAddr
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(PeerAddr(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip()),
        ))
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Failed to load visits")]
    Storage(#[source] StorageError),
    #[error("Failed to render response")]
    Render(#[from] serde_json::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Storage(e) => {
                tracing::error!(error = %e, "Failed to fetch visits");
                StatusCode::BAD_GATEWAY
            }
            ApiError::Render(e) => {
                tracing::error!(error = %e, "Failed to serialize response");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct AdminQuery {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdminListing {
    pub visits: Vec<Visit>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct RawInfo {
    pub ip: Option<String>,
    pub x_forwarded_for: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

/// Record the visit and greet the visitor. Storage failures never reach here.
pub async fn landing(
    State(state): State<Arc<AppState>>,
    PeerAddr(peer): PeerAddr,
    headers: HeaderMap,
) -> Html<String> {
    let visit = state.recorder.track(&headers, peer).await;
    Html(pages::landing(&visit))
}

/// Echo the resolved address and request headers as JSON without storing them
pub async fn raw_info(PeerAddr(peer): PeerAddr, headers: HeaderMap) -> Result<Response, ApiError> {
    let client = resolve_client(&headers, peer);
    let info = RawInfo {
        ip: client.ip,
        x_forwarded_for: client.forwarded_for,
        headers: header_map(&headers),
        timestamp: Utc::now(),
    };

    let body = serde_json::to_string_pretty(&info)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// List recent visits for holders of the admin key
pub async fn admin_view(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminQuery>,
) -> Result<Response, ApiError> {
    if !state.admin.validate_key(query.key.as_deref()) {
        return Err(ApiError::Unauthorized);
    }

    let visits = state
        .storage
        .list_recent(state.admin_list_limit)
        .await
        .map_err(ApiError::Storage)?;

    if query.format.as_deref() == Some("json") {
        let total = visits.len();
        return Ok(Json(AdminListing { visits, total }).into_response());
    }

    Ok(Html(pages::admin(&visits)).into_response())
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    #[derive(Serialize)]
    struct HealthResponse {
        status: String,
    }

    Json(HealthResponse {
        status: "OK".to_string(),
    })
}
