//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the request-scope extension.

use crate::auth::AuthService;
use crate::config::Config;
use std::sync::Arc;
use study_tracker_core::ports::{ScopeId, SessionStore};

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// How the service maps an incoming request to an owner scope. Chosen once
/// at startup from configuration; handlers never branch on it themselves.
#[derive(Clone, Debug)]
pub enum ScopeMode {
    /// Every request reads and writes one fixed scope (no accounts).
    Shared(ScopeId),
    /// Each authenticated user gets their own scope; requests without a
    /// valid auth cookie are rejected.
    PerUser,
}

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SessionStore>,
    pub auth: Arc<dyn AuthService>,
    pub config: Arc<Config>,
    pub scope_mode: ScopeMode,
}

//=========================================================================================
// Request Extensions
//=========================================================================================

/// The resolved owner scope for the current request, inserted by the scope
/// middleware. Handlers read data for exactly this scope and nothing else.
#[derive(Clone, Debug)]
pub struct CurrentScope(pub ScopeId);
