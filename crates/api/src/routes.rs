use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Instrument;
use uuid::Uuid;

use kkongdon_core::domain::product::{FinancialProduct, ProductCategory};
use kkongdon_core::domain::recommendation::RecommendationResponse;
use kkongdon_core::domain::request::RecommendRequestBody;
use kkongdon_core::engine::RecommendationOrchestrator;
use kkongdon_core::error::RecommendError;

const MALFORMED_BODY_MESSAGE: &str = "요청 형식이 올바르지 않습니다.";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<RecommendationOrchestrator>,
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/health", get(health))
        .route("/api/recommendation/recommend", post(recommend))
        .route("/api/recommendation/products", get(list_products))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Comma-separated origin list; unset or unusable means any origin.
pub fn cors_layer(allowed_origins: Option<&str>) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let Some(raw) = allowed_origins else {
        return base.allow_origin(Any);
    };

    let origins: Vec<HeaderValue> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS has no usable origin; allowing any origin");
        return base.allow_origin(Any);
    }

    tracing::info!(count = origins.len(), "CORS restricted to configured origins");
    base.allow_origin(AllowOrigin::list(origins))
}

/// `{"success": true, "data": …}` envelope.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<RecommendError> for ApiError {
    fn from(err: RecommendError) -> Self {
        let status = if err.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            message: err.user_message().to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "success": false,
            "error": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let narrative = if state.orchestrator.has_narrator() {
        "enabled"
    } else {
        "fallback"
    };
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "features": { "narrative": narrative },
        "catalogSize": state.orchestrator.catalog().len(),
    }))
}

pub async fn recommend(
    State(state): State<AppState>,
    body: Result<Json<RecommendRequestBody>, JsonRejection>,
) -> Result<Json<Envelope<RecommendationResponse>>, ApiError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("recommend", %request_id);
    handle_recommend(state, body).instrument(span).await
}

async fn handle_recommend(
    state: AppState,
    body: Result<Json<RecommendRequestBody>, JsonRejection>,
) -> Result<Json<Envelope<RecommendationResponse>>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        tracing::info!(error = %rejection.body_text(), "rejected malformed body");
        ApiError::bad_request(MALFORMED_BODY_MESSAGE)
    })?;

    let request = body.into_request().map_err(|err| {
        tracing::info!(error = %err, "rejected invalid request");
        ApiError::from(err)
    })?;

    match state.orchestrator.recommend(&request).await {
        Ok(response) => {
            tracing::info!(
                goal = %response.bucket_goal,
                count = response.total_products,
                "recommendation served"
            );
            Ok(Envelope::ok(response))
        }
        Err(err) => {
            if let RecommendError::Internal(e) = &err {
                sentry_anyhow::capture_anyhow(e);
                tracing::error!(error = %format!("{e:#}"), "recommendation failed");
            }
            Err(ApiError::from(err))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductsQuery {
    pub category: Option<String>,
}

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<Envelope<Vec<FinancialProduct>>>, ApiError> {
    let catalog = state.orchestrator.catalog();
    let products = match query.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        None => catalog.products().to_vec(),
        Some(raw) => {
            let category = ProductCategory::parse(raw).ok_or_else(|| {
                ApiError::bad_request(format!("알 수 없는 상품 카테고리입니다: {raw}"))
            })?;
            catalog.by_category(category).cloned().collect()
        }
    };
    Ok(Envelope::ok(products))
}
