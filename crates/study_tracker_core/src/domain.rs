//! crates/study_tracker_core/src/domain.rs
//!
//! Defines the pure, core data structures for the scheduling engine.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// A single scheduling rule: sessions whose accuracy falls inside the closed
/// band `[min, max]` are reviewed again after `days` days.
///
/// Rule sets are ordered `Vec<Rule>`s; evaluation is first-match in stored
/// order, so overlapping bands are legal and resolved by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub min: u8,
    pub max: u8,
    pub days: u32,
}

/// An unvalidated rule as it arrives from user input. Serde has already
/// guaranteed the fields are numeric; range checking happens in `rules`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleDraft {
    pub min: i64,
    pub max: i64,
    pub days: i64,
}

/// A raw session submission before validation. The studied date arrives as
/// text (`YYYY-MM-DD`) so that a malformed date can be reported as its own
/// validation failure rather than a decode error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDraft {
    pub topic: String,
    pub studied_on: String,
    pub questions_total: i64,
    pub questions_correct: i64,
}

/// A validated study session with all derived scheduling fields, before the
/// store has assigned it an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStudySession {
    pub topic: String,
    pub studied_on: NaiveDate,
    pub questions_total: u32,
    pub questions_correct: u32,
    pub accuracy: u8,
    pub interval_days: u32,
    pub next_review_on: NaiveDate,
    pub reviewed: bool,
    pub reviewed_on: Option<NaiveDate>,
}

/// One logged study session, as persisted.
///
/// `accuracy`, `interval_days` and `next_review_on` are frozen at creation
/// from the rule set in effect at that moment; later rule edits never touch
/// existing records. `reviewed`/`reviewed_on` are the only mutable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudySession {
    pub id: Uuid,
    pub topic: String,
    pub studied_on: NaiveDate,
    pub questions_total: u32,
    pub questions_correct: u32,
    pub accuracy: u8,
    pub interval_days: u32,
    pub next_review_on: NaiveDate,
    pub reviewed: bool,
    pub reviewed_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl StudySession {
    /// Attaches a store-assigned identity to a validated session.
    pub fn from_new(new: NewStudySession, id: Uuid, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            topic: new.topic,
            studied_on: new.studied_on,
            questions_total: new.questions_total,
            questions_correct: new.questions_correct,
            accuracy: new.accuracy,
            interval_days: new.interval_days,
            next_review_on: new.next_review_on,
            reviewed: new.reviewed,
            reviewed_on: new.reviewed_on,
            created_at,
        }
    }
}

/// Derived classification of a session relative to the current date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Done,
    Overdue,
    DueSoon,
    Open,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Done => "done",
            Status::Overdue => "overdue",
            Status::DueSoon => "due_soon",
            Status::Open => "open",
        }
    }
}

/// The updated fields produced by the toggle-reviewed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewToggle {
    pub reviewed: bool,
    pub reviewed_on: Option<NaiveDate>,
}

/// Summary KPIs over a session collection.
///
/// `average_accuracy` is `None` for an empty collection; there is no
/// divide-by-zero path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub overdue: usize,
    pub due_soon: usize,
    pub average_accuracy: Option<u8>,
}

/// Status dimension of a session filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Only(Status),
}

impl std::str::FromStr for StatusFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(StatusFilter::All),
            "done" => Ok(StatusFilter::Only(Status::Done)),
            "overdue" => Ok(StatusFilter::Only(Status::Overdue)),
            "due_soon" => Ok(StatusFilter::Only(Status::DueSoon)),
            "open" => Ok(StatusFilter::Only(Status::Open)),
            other => Err(ValidationError::UnknownStatusFilter(other.to_string())),
        }
    }
}

/// Conjunctive filter over a session collection: a status predicate AND a
/// case-insensitive topic substring predicate. An empty `text` is a no-op on
/// the text dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFilter {
    pub status: StatusFilter,
    pub text: String,
}

impl Default for SessionFilter {
    fn default() -> Self {
        Self {
            status: StatusFilter::All,
            text: String::new(),
        }
    }
}

/// Malformed or out-of-range user input. Each variant maps to one
/// user-facing message so callers can render a specific error per field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Studied date must be a valid calendar date (YYYY-MM-DD)")]
    InvalidDate,
    #[error("Topic must not be empty")]
    MissingTopic,
    #[error("Questions total must be greater than zero")]
    InvalidTotal,
    #[error("Questions correct must be between zero and the questions total")]
    InvalidCorrect,
    #[error("Rule {index}: bounds must be between 0 and 100")]
    RuleOutOfRange { index: usize },
    #[error("Rule {index}: lower bound must not exceed upper bound")]
    RuleInverted { index: usize },
    #[error("Rule {index}: days must not be negative")]
    RuleNegativeDays { index: usize },
    #[error("Unknown status filter: {0}")]
    UnknownStatusFilter(String),
}
