//! HTTP request handlers for the report service.
//!
//! This module contains the handler functions for all API endpoints.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::aggregation::{build_client_department_stats, build_report};
use crate::models::AggregateReport;

use super::request::ReportRequest;
use super::response::{ApiError, ApiErrorResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/reports", post(report_handler))
        .route("/reports/client-stats", post(client_stats_handler))
        .with_state(state)
}

fn json_error(status: StatusCode, error: ApiError) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(error),
    )
        .into_response()
}

/// Unwraps the request body, mapping rejections to 400 responses.
fn parse_request(
    correlation_id: Uuid,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<ReportRequest, Response> {
    match payload {
        Ok(Json(request)) => Ok(request),
        Err(rejection) => {
            let error = match rejection {
                JsonRejection::JsonDataError(err) => {
                    let body_text = err.body_text();
                    warn!(
                        correlation_id = %correlation_id,
                        error = %body_text,
                        "JSON data error"
                    );
                    if body_text.contains("missing field") {
                        ApiError::validation_error(body_text)
                    } else {
                        ApiError::malformed_json(body_text)
                    }
                }
                JsonRejection::JsonSyntaxError(err) => {
                    warn!(
                        correlation_id = %correlation_id,
                        error = %err,
                        "JSON syntax error"
                    );
                    ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
                }
                JsonRejection::MissingJsonContentType(_) => {
                    ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
                }
                _ => ApiError::malformed_json("Failed to parse request body"),
            };
            Err(json_error(StatusCode::BAD_REQUEST, error))
        }
    }
}

/// Filters, scopes, and aggregates the request's checks.
fn run_report(
    correlation_id: Uuid,
    state: &AppState,
    request: &ReportRequest,
) -> Result<AggregateReport, Response> {
    let checks = request.filtered_checks().map_err(|err| {
        warn!(
            correlation_id = %correlation_id,
            error = %err,
            "Rejected report filters"
        );
        let api_error: ApiErrorResponse = err.into();
        json_error(api_error.status, api_error.error)
    })?;

    Ok(build_report(
        &request.companies,
        &request.clients,
        &checks,
        &request.scope,
        state.config().aggregation(),
    ))
}

/// Handler for POST /reports.
///
/// Returns the company → division → client report with reconciliation
/// warnings.
async fn report_handler(
    State(state): State<AppState>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing report request");

    let request = match parse_request(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let start_time = Instant::now();
    let report = match run_report(correlation_id, &state, &request) {
        Ok(report) => report,
        Err(response) => return response,
    };

    info!(
        correlation_id = %correlation_id,
        checks = request.checks.len(),
        companies = report.companies.len(),
        total = %report.totals.total_amount,
        warnings = report.warnings.len(),
        duration_us = start_time.elapsed().as_micros(),
        "Report built"
    );

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        Json(report),
    )
        .into_response()
}

/// Handler for POST /reports/client-stats.
///
/// Returns the flat client/division rows across companies.
async fn client_stats_handler(
    State(state): State<AppState>,
    payload: Result<Json<ReportRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing client stats request");

    let request = match parse_request(correlation_id, payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let start_time = Instant::now();
    let report = match run_report(correlation_id, &state, &request) {
        Ok(report) => report,
        Err(response) => return response,
    };
    let stats = build_client_department_stats(&report);

    info!(
        correlation_id = %correlation_id,
        rows = stats.len(),
        duration_us = start_time.elapsed().as_micros(),
        "Client stats built"
    );

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        Json(stats),
    )
        .into_response()
}
