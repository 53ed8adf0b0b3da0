//! HTTP surface: routing, handlers, trace middleware and CORS.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use shiftopt_core::model::{
    AlgorithmInfo, Constraint, OptimizationRequest, RunState, RunStatus, ValidationReport,
    Violation,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::ServiceConfig;
use crate::service::SharedService;

/// Per-request trace id, set by the middleware and echoed in error bodies.
#[derive(Debug, Clone)]
pub struct TraceId(pub String);

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
    version: &'static str,
    service: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    timestamp: DateTime<Utc>,
    trace_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct InvalidRequestBody {
    error: &'static str,
    message: String,
    violations: Vec<Violation>,
    warnings: Vec<String>,
    suggestions: Vec<String>,
}

impl InvalidRequestBody {
    fn from_report(report: ValidationReport) -> Self {
        InvalidRequestBody {
            error: "Invalid optimization request",
            message: report.error_message.unwrap_or_default(),
            violations: report.violations,
            warnings: report.warnings,
            suggestions: report.suggestions,
        }
    }
}

pub fn build_router(service: SharedService) -> Router {
    let cors = cors_layer(&service.config);
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/optimize", post(optimize))
        .route("/optimize/async", post(optimize_async))
        .route("/optimize/status/{run_id}", get(run_status))
        .route("/validate/constraints", post(validate_constraints))
        .route("/algorithms", get(algorithms))
        .route("/metrics", get(metrics))
        .layer(middleware::from_fn_with_state(
            service.clone(),
            trace_headers,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Adds `X-Process-Time` and `X-Trace-ID` to every response.
async fn trace_headers(
    State(service): State<SharedService>,
    mut request: Request,
    next: Next,
) -> Response {
    let trace_id = service.next_trace_id();
    request.extensions_mut().insert(TraceId(trace_id.clone()));
    let started = Instant::now();

    let mut response = next.run(request).await;

    let elapsed = started.elapsed().as_secs_f64();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&elapsed.to_string()) {
        headers.insert("X-Process-Time", value);
    }
    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        headers.insert("X-Trace-ID", value);
    }
    response
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        service: "optimization",
    })
}

async fn optimize(
    State(service): State<SharedService>,
    Extension(trace): Extension<TraceId>,
    Json(request): Json<OptimizationRequest>,
) -> Response {
    let report = service.validator.validate_request(&request);
    if !report.is_valid {
        warn!(
            trace_id = trace.0,
            error = report.error_message.as_deref().unwrap_or(""),
            "rejecting invalid optimization request"
        );
        return (
            StatusCode::BAD_REQUEST,
            Json(InvalidRequestBody::from_report(report)),
        )
            .into_response();
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let response = service
        .run_optimization(Arc::new(request), cancel)
        .await;
    if response.success {
        Json(response).into_response()
    } else {
        let body = ErrorBody {
            error: "Optimization failed".into(),
            message: response.error.unwrap_or_default(),
            timestamp: Utc::now(),
            trace_id: Some(trace.0),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

async fn optimize_async(
    State(service): State<SharedService>,
    Json(request): Json<OptimizationRequest>,
) -> Response {
    let report = service.validator.validate_request(&request);
    if !report.is_valid {
        return (
            StatusCode::BAD_REQUEST,
            Json(InvalidRequestBody::from_report(report)),
        )
            .into_response();
    }

    let run_id = format!(
        "run_{}_{}",
        request.user_id,
        Utc::now().format("%Y%m%d_%H%M%S")
    );
    service.spawn_run(run_id.clone(), request);

    Json(RunStatus {
        run_id,
        status: RunState::Started,
        progress: 0.0,
        message: "Optimization started successfully".into(),
        estimated_completion: None,
    })
    .into_response()
}

async fn run_status(
    State(service): State<SharedService>,
    Extension(trace): Extension<TraceId>,
    Path(run_id): Path<String>,
) -> Response {
    match service.runs.status(&run_id) {
        Some(status) => Json(status).into_response(),
        None => {
            let body = ErrorBody {
                error: "Not Found".into(),
                message: format!("Optimization run {run_id} not found"),
                timestamp: Utc::now(),
                trace_id: Some(trace.0),
            };
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
    }
}

async fn validate_constraints(
    State(service): State<SharedService>,
    Json(constraints): Json<Vec<Constraint>>,
) -> Response {
    let report = service.validator.validate_constraints(&constraints);
    Json(serde_json::json!({
        "is_valid": report.is_valid,
        "violations": report.violations,
        "suggestions": report.suggestions,
    }))
    .into_response()
}

async fn algorithms() -> Json<Vec<AlgorithmInfo>> {
    Json(AlgorithmInfo::catalog())
}

async fn metrics(State(service): State<SharedService>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain")],
        service.metrics.render(),
    )
        .into_response()
}

fn cors_layer(config: &ServiceConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}
