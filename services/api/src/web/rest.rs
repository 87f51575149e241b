//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::protocol::{
    today, RuleDraftPayload, RulePayload, SessionView, SummaryView,
};
use crate::web::state::{AppState, CurrentScope};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use study_tracker_core::domain::{
    RuleDraft, SessionDraft, SessionFilter, StatusFilter, ValidationError,
};
use study_tracker_core::ports::PortError;
use study_tracker_core::rules::{normalize_rules, select_interval_days, validate_rules_for_save};
use study_tracker_core::schedule::{aggregate, filter_sessions};
use study_tracker_core::session::{create_session, toggle_reviewed};
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        create_session_handler,
        list_sessions_handler,
        preview_session_handler,
        toggle_review_handler,
        summary_handler,
        get_rules_handler,
        save_rules_handler,
        preview_rules_handler,
    ),
    components(
        schemas(
            CreateSessionRequest,
            SessionListResponse,
            SessionPreviewResponse,
            SessionView,
            SummaryView,
            RulesResponse,
            SaveRulesRequest,
            RulePayload,
            RuleDraftPayload,
            RulesPreviewRequest,
            RulesPreviewResponse,
        )
    ),
    tags(
        (name = "Study Tracker API", description = "API endpoints for the spaced-review study tracker.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A raw session submission.
#[derive(Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    pub topic: String,
    /// Calendar date the study happened, `YYYY-MM-DD`.
    pub studied_on: String,
    pub questions_total: i64,
    pub questions_correct: i64,
}

#[derive(Serialize, ToSchema)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionView>,
}

/// What a prospective submission would be scheduled as, without saving it.
#[derive(Serialize, ToSchema)]
pub struct SessionPreviewResponse {
    pub accuracy: u8,
    pub interval_days: u32,
    pub next_review_on: chrono::NaiveDate,
}

#[derive(Serialize, ToSchema)]
pub struct RulesResponse {
    pub rules: Vec<RulePayload>,
}

#[derive(Deserialize, ToSchema)]
pub struct SaveRulesRequest {
    pub rules: Vec<RuleDraftPayload>,
}

/// Draft rules plus an accuracy to probe them with.
#[derive(Deserialize, ToSchema)]
pub struct RulesPreviewRequest {
    pub rules: Vec<RuleDraftPayload>,
    pub accuracy: i64,
}

#[derive(Serialize, ToSchema)]
pub struct RulesPreviewResponse {
    pub interval_days: u32,
}

#[derive(Deserialize)]
pub struct ListSessionsQuery {
    /// all/done/overdue/due_soon/open; defaults to all.
    pub status: Option<String>,
    /// Case-insensitive topic substring.
    pub q: Option<String>,
}

#[derive(Deserialize)]
pub struct SessionPreviewQuery {
    pub studied_on: String,
    pub questions_total: i64,
    pub questions_correct: i64,
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn port_error(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Store(msg) => {
            error!("Store failure: {}", msg);
            (StatusCode::INTERNAL_SERVER_ERROR, "Storage failure".to_string())
        }
    }
}

fn validation_error(e: ValidationError) -> (StatusCode, String) {
    (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
}

fn parse_filter(status: Option<String>, text: Option<String>) -> Result<SessionFilter, ValidationError> {
    let status = match status.as_deref() {
        None | Some("") => StatusFilter::All,
        Some(raw) => StatusFilter::from_str(raw)?,
    };
    Ok(SessionFilter {
        status,
        text: text.unwrap_or_default(),
    })
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Log a new study session.
///
/// Validates the submission, derives accuracy, interval and next review date
/// from the scope's currently saved rules, and persists the record. The
/// derived fields are frozen: editing the rules later never reschedules
/// existing sessions.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = SessionView),
        (status = 422, description = "Invalid submission (date, topic or counts)"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentScope(scope)): Extension<CurrentScope>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // The same freshly loaded rules drive preview and save; a submission is
    // never derived from stale defaults.
    let rules = state.store.load_rules(&scope).await.map_err(port_error)?;

    let draft = SessionDraft {
        topic: req.topic,
        studied_on: req.studied_on,
        questions_total: req.questions_total,
        questions_correct: req.questions_correct,
    };
    let new = create_session(&draft, &rules).map_err(validation_error)?;

    let session = state
        .store
        .append_session(&scope, new)
        .await
        .map_err(port_error)?;

    Ok((
        StatusCode::CREATED,
        Json(SessionView::from_session(&session, today())),
    ))
}

/// List the scope's sessions, classified and optionally filtered.
#[utoipa::path(
    get,
    path = "/sessions",
    params(
        ("status" = Option<String>, Query, description = "all/done/overdue/due_soon/open"),
        ("q" = Option<String>, Query, description = "Topic substring, case-insensitive")
    ),
    responses(
        (status = 200, description = "Classified session list", body = SessionListResponse),
        (status = 422, description = "Unknown status filter"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentScope(scope)): Extension<CurrentScope>,
    Query(query): Query<ListSessionsQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let filter = parse_filter(query.status, query.q).map_err(validation_error)?;
    let sessions = state.store.list_sessions(&scope).await.map_err(port_error)?;

    let now = today();
    let views: Vec<SessionView> = filter_sessions(&sessions, &filter, now)
        .into_iter()
        .map(|s| SessionView::from_session(s, now))
        .collect();

    Ok(Json(SessionListResponse { sessions: views }))
}

/// Preview how a prospective submission would be scheduled.
///
/// Uses the scope's currently saved rules — the same ones a subsequent save
/// would use — so the previewed interval can never drift from the saved one.
#[utoipa::path(
    get,
    path = "/sessions/preview",
    params(
        ("studied_on" = String, Query, description = "Calendar date, YYYY-MM-DD"),
        ("questions_total" = i64, Query, description = "Questions attempted"),
        ("questions_correct" = i64, Query, description = "Questions answered correctly")
    ),
    responses(
        (status = 200, description = "Derived scheduling fields", body = SessionPreviewResponse),
        (status = 422, description = "Invalid date or counts"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn preview_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentScope(scope)): Extension<CurrentScope>,
    Query(query): Query<SessionPreviewQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let rules = state.store.load_rules(&scope).await.map_err(port_error)?;

    let draft = SessionDraft {
        topic: "preview".to_string(),
        studied_on: query.studied_on,
        questions_total: query.questions_total,
        questions_correct: query.questions_correct,
    };
    let new = create_session(&draft, &rules).map_err(validation_error)?;

    Ok(Json(SessionPreviewResponse {
        accuracy: new.accuracy,
        interval_days: new.interval_days,
        next_review_on: new.next_review_on,
    }))
}

/// Toggle a session's reviewed flag.
///
/// Marking reviewed stamps today's date; undoing clears it. Nothing else on
/// the record changes.
#[utoipa::path(
    post,
    path = "/sessions/{id}/review",
    params(
        ("id" = Uuid, Path, description = "Session id")
    ),
    responses(
        (status = 200, description = "Updated session", body = SessionView),
        (status = 404, description = "Session not found in this scope"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn toggle_review_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentScope(scope)): Extension<CurrentScope>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state
        .store
        .get_session(&scope, id)
        .await
        .map_err(port_error)?;

    let now = today();
    let change = toggle_reviewed(&session, now);
    let updated = state
        .store
        .set_reviewed(&scope, id, change)
        .await
        .map_err(port_error)?;

    Ok(Json(SessionView::from_session(&updated, now)))
}

/// Dashboard KPIs: overdue count, due-this-week count, average accuracy.
#[utoipa::path(
    get,
    path = "/summary",
    responses(
        (status = 200, description = "KPI summary", body = SummaryView),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn summary_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentScope(scope)): Extension<CurrentScope>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let sessions = state.store.list_sessions(&scope).await.map_err(port_error)?;
    let summary = aggregate(&sessions, today());
    Ok(Json(SummaryView::from(summary)))
}

/// The scope's current rule set (defaults if none was ever saved).
#[utoipa::path(
    get,
    path = "/rules",
    responses(
        (status = 200, description = "Current rules", body = RulesResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_rules_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentScope(scope)): Extension<CurrentScope>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let rules = state.store.load_rules(&scope).await.map_err(port_error)?;
    Ok(Json(RulesResponse {
        rules: rules.into_iter().map(RulePayload::from).collect(),
    }))
}

/// Replace the scope's rule set.
///
/// Validation is strict: out-of-range bounds, inverted bands and negative
/// day counts are rejected with a per-rule message, never silently clamped.
#[utoipa::path(
    put,
    path = "/rules",
    request_body = SaveRulesRequest,
    responses(
        (status = 200, description = "Saved rules", body = RulesResponse),
        (status = 422, description = "A rule is out of range, inverted, or has negative days"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn save_rules_handler(
    State(state): State<Arc<AppState>>,
    Extension(CurrentScope(scope)): Extension<CurrentScope>,
    Json(req): Json<SaveRulesRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let drafts: Vec<RuleDraft> = req.rules.into_iter().map(|r| r.to_draft()).collect();
    let rules = validate_rules_for_save(&drafts).map_err(validation_error)?;

    state
        .store
        .replace_rules(&scope, rules.clone())
        .await
        .map_err(port_error)?;

    Ok(Json(RulesResponse {
        rules: rules.into_iter().map(RulePayload::from).collect(),
    }))
}

/// Probe a draft rule set with an accuracy value.
///
/// This is the ephemeral preview path: drafts are coerced into range
/// (clamped and sorted) rather than rejected, so the rule editor can show
/// live feedback while the user is still typing.
#[utoipa::path(
    post,
    path = "/rules/preview",
    request_body = RulesPreviewRequest,
    responses(
        (status = 200, description = "Interval the first matching band selects", body = RulesPreviewResponse)
    )
)]
pub async fn preview_rules_handler(
    Json(req): Json<RulesPreviewRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let drafts: Vec<RuleDraft> = req.rules.into_iter().map(|r| r.to_draft()).collect();
    let rules = normalize_rules(&drafts);
    let accuracy = req.accuracy.clamp(0, 100) as u8;

    Ok(Json(RulesPreviewResponse {
        interval_days: select_interval_days(accuracy, &rules),
    }))
}
