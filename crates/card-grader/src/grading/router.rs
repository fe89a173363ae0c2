use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{CardAssessment, GradeCapResult, GradeResult, GradingEngine};

/// Router builder exposing the grading endpoints.
pub fn grading_router(engine: Arc<GradingEngine>) -> Router {
    Router::new()
        .route("/api/v1/grade", post(grade_handler))
        .route("/api/v1/grade/validate", post(validate_handler))
        .with_state(engine)
}

#[derive(Debug, Serialize)]
pub(crate) struct GradeResponse {
    graded_at: DateTime<Utc>,
    #[serde(flatten)]
    result: GradeResult,
}

#[derive(Debug, Serialize)]
pub(crate) struct ValidateResponse {
    validated_at: DateTime<Utc>,
    result: Option<GradeCapResult>,
}

pub(crate) async fn grade_handler(
    State(engine): State<Arc<GradingEngine>>,
    Json(document): Json<Value>,
) -> Response {
    let result = engine.grade_json(document);
    info!(
        final_grade = result.final_grade,
        cap_applied = result.validation.cap_applied,
        "card graded"
    );

    let payload = GradeResponse {
        graded_at: Utc::now(),
        result,
    };
    (StatusCode::OK, Json(payload)).into_response()
}

/// Body: `{"proposed_grade": <number|null>, "assessment": {...}}`. A missing or
/// non-numeric grade is treated as not applicable.
pub(crate) async fn validate_handler(
    State(engine): State<Arc<GradingEngine>>,
    Json(body): Json<Value>,
) -> Response {
    let proposed = body.get("proposed_grade").and_then(Value::as_f64);
    let assessment =
        CardAssessment::from_json_value(body.get("assessment").cloned().unwrap_or(Value::Null));

    let payload = ValidateResponse {
        validated_at: Utc::now(),
        result: engine.validate_proposed(proposed, &assessment),
    };
    (StatusCode::OK, Json(payload)).into_response()
}
