//! services/api/src/auth.rs
//!
//! The authentication contract of the API service. Identity is service
//! plumbing, not scheduling logic, so this port lives here rather than in
//! the core crate; the core only ever sees the resolved `ScopeId`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use study_tracker_core::ports::PortResult;
use uuid::Uuid;

/// A registered account, as exposed to handlers.
#[derive(Debug, Clone)]
pub struct UserAccount {
    pub user_id: Uuid,
    pub email: String,
}

/// Only used internally for login - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// Account and browser-session persistence for the per-user scope mode.
/// Implemented by the same adapters that implement the session store.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<UserAccount>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    /// Resolves a cookie session id to its user, rejecting expired or
    /// unknown sessions with `PortError::Unauthorized`.
    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}
