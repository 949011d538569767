// HTTP route handlers for the Gabarito API

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use gabarito_common::{Fixture, GradeRequest};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::metrics;
use crate::AppState;

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// POST /run - Grade against sample fixtures only
pub async fn run_samples(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GradeRequest>,
) -> Response {
    let fixtures = payload.sample_fixtures();
    grade_fixtures(&state, payload, fixtures, "run").await
}

/// POST /submit - Grade against every fixture
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Json(mut payload): Json<GradeRequest>,
) -> Response {
    let fixtures = std::mem::take(&mut payload.test_cases);
    grade_fixtures(&state, payload, fixtures, "submit").await
}

async fn grade_fixtures(
    state: &AppState,
    request: GradeRequest,
    fixtures: Vec<Fixture>,
    mode: &'static str,
) -> Response {
    let grading_id = Uuid::new_v4();
    let request = GradeRequest {
        test_cases: fixtures,
        ..request
    };

    if let Err(e) = request.validate(&state.config) {
        warn!(grading_id = %grading_id, mode, error = %e, "Rejected grading request");
        return error_response(StatusCode::BAD_REQUEST, e.to_string());
    }

    let time_limit = state.config.clamp_time_limit(request.timeout_ms);
    info!(
        grading_id = %grading_id,
        mode,
        entry_point = %request.function_name,
        test_cases = request.test_cases.len(),
        source_size = request.source_code.len(),
        time_limit_ms = time_limit.as_millis() as u64,
        "Grading request accepted"
    );

    match state
        .grader
        .grade_within(&request.program(), &request.test_cases, time_limit)
        .await
    {
        Ok(verdict) => {
            metrics::observe_verdict(&verdict, mode);
            info!(
                grading_id = %grading_id,
                status = %verdict.status,
                execution_time = verdict.execution_time,
                "Verdict ready"
            );
            (StatusCode::OK, Json(verdict)).into_response()
        }
        Err(e) => {
            metrics::ENGINE_FAILURES_TOTAL.inc();
            error!(grading_id = %grading_id, error = %e, "Grading engine failure");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Falha interna ao executar o código".to_string(),
            )
        }
    }
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus exposition
pub async fn metrics_text() -> Response {
    match metrics::render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}
