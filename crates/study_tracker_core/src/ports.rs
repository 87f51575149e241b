//! crates/study_tracker_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the scheduling engine.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like databases.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::{NewStudySession, ReviewToggle, Rule, StudySession};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Store failure: {0}")]
    Store(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Owner Scopes
//=========================================================================================

/// Opaque isolation boundary for session and rule data. The engine never
/// reads across scopes; how a scope maps to a person is the host's concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeId(String);

impl ScopeId {
    /// A fixed, shared scope for single-owner deployments without accounts.
    pub fn shared(name: &str) -> Self {
        Self(format!("shared:{name}"))
    }

    /// The scope owned by one authenticated user.
    pub fn user(user_id: Uuid) -> Self {
        Self(format!("user:{user_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ScopeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

//=========================================================================================
// Snapshot Subscription
//=========================================================================================

/// A live feed of full session snapshots for one scope.
///
/// Every store change produces a complete, consistent snapshot ordered
/// newest-created-first — never a delta — so consumers can always recompute
/// views from whole collections. Delivery continues until [`cancel`] is
/// called or the feed is dropped; exactly one feed should be active per
/// consumer scope, and scope switches must cancel the old feed first.
///
/// [`cancel`]: SessionFeed::cancel
pub struct SessionFeed {
    snapshots: Pin<Box<dyn Stream<Item = Vec<StudySession>> + Send>>,
    token: CancellationToken,
}

impl SessionFeed {
    pub fn new(
        snapshots: Pin<Box<dyn Stream<Item = Vec<StudySession>> + Send>>,
        token: CancellationToken,
    ) -> Self {
        Self { snapshots, token }
    }

    /// Stops delivery. Idempotent; the stream ends on its next poll.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Waits for the next full snapshot, or `None` once the feed has ended.
    pub async fn next_snapshot(&mut self) -> Option<Vec<StudySession>> {
        use futures::StreamExt;
        self.snapshots.next().await
    }
}

impl Drop for SessionFeed {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

//=========================================================================================
// Store Port (Trait)
//=========================================================================================

/// The persistence contract the scheduling engine consumes. All reads and
/// writes are scoped; last-write-wins is the concurrency policy for rule
/// replacement. Retry/backoff, if any, belongs to the implementation.
#[async_trait]
pub trait SessionStore: Send + Sync {
    // --- Rule Sets ---

    /// Current rule set for the scope; the default band set when the scope
    /// has never saved one.
    async fn load_rules(&self, scope: &ScopeId) -> PortResult<Vec<Rule>>;

    /// Replaces the scope's rule set wholesale. Rules are never patched.
    async fn replace_rules(&self, scope: &ScopeId, rules: Vec<Rule>) -> PortResult<()>;

    // --- Sessions ---

    /// Persists a validated session, assigning its id and creation time.
    async fn append_session(
        &self,
        scope: &ScopeId,
        session: NewStudySession,
    ) -> PortResult<StudySession>;

    async fn get_session(&self, scope: &ScopeId, session_id: Uuid) -> PortResult<StudySession>;

    /// Applies a toggle-reviewed transition to an existing record. The
    /// frozen scheduling fields are left untouched.
    async fn set_reviewed(
        &self,
        scope: &ScopeId,
        session_id: Uuid,
        change: ReviewToggle,
    ) -> PortResult<StudySession>;

    /// Full collection for the scope, newest-created first. An empty scope
    /// yields an empty list, not an error.
    async fn list_sessions(&self, scope: &ScopeId) -> PortResult<Vec<StudySession>>;

    // --- Change Notification ---

    /// Subscribes to the scope's session collection. The feed delivers the
    /// current snapshot first, then a fresh snapshot after every change.
    async fn subscribe(&self, scope: &ScopeId) -> PortResult<SessionFeed>;
}
