//! services/api/src/web/middleware.rs
//!
//! Scope-resolution middleware: stamps every request with the owner scope
//! its data belongs to, either the fixed shared scope or the authenticated
//! user's scope, depending on the configured mode.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use study_tracker_core::ports::ScopeId;
use tracing::error;

use crate::web::state::{AppState, CurrentScope, ScopeMode};

/// Pulls the auth session id out of the `session` cookie, if present.
pub fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
}

/// Middleware that resolves the owner scope for the request.
///
/// In shared mode every request maps to the one configured scope. In
/// per-user mode the auth cookie is validated and the request maps to that
/// user's scope; a missing or invalid cookie yields 401 Unauthorized.
pub async fn resolve_scope(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let scope = match &state.scope_mode {
        ScopeMode::Shared(scope) => scope.clone(),
        ScopeMode::PerUser => {
            let auth_session_id =
                session_cookie(req.headers()).ok_or(StatusCode::UNAUTHORIZED)?;

            let user_id = state
                .auth
                .validate_auth_session(auth_session_id)
                .await
                .map_err(|e| {
                    error!("Failed to validate auth session: {:?}", e);
                    StatusCode::UNAUTHORIZED
                })?;

            ScopeId::user(user_id)
        }
    };

    req.extensions_mut().insert(CurrentScope(scope));
    Ok(next.run(req).await)
}
