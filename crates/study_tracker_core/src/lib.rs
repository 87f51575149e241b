pub mod domain;
pub mod ports;
pub mod rules;
pub mod schedule;
pub mod session;

pub use domain::{
    NewStudySession, ReviewToggle, Rule, RuleDraft, SessionDraft, SessionFilter, Status,
    StatusFilter, StudySession, Summary, ValidationError,
};
pub use ports::{PortError, PortResult, ScopeId, SessionFeed, SessionStore};
pub use rules::{
    default_rules, normalize_rules, select_interval_days, validate_rules_for_save,
    FALLBACK_INTERVAL_DAYS,
};
pub use schedule::{
    aggregate, classify, days_until, filter_sessions, status_label, DUE_SOON_WINDOW_DAYS,
};
pub use session::{create_session, toggle_reviewed};
