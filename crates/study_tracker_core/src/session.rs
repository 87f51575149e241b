//! crates/study_tracker_core/src/session.rs
//!
//! Session creation (validation + derivation of the frozen scheduling
//! fields) and the toggle-reviewed transition.

use chrono::{Duration, NaiveDate};

use crate::domain::{
    NewStudySession, ReviewToggle, Rule, SessionDraft, StudySession, ValidationError,
};
use crate::rules::select_interval_days;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Validates a raw submission and derives the scheduling fields from the
/// rule set in effect right now.
///
/// Validation order is fixed — date, topic, total, correct — and the first
/// failure wins, so the same malformed input always reports the same error.
/// The caller persists the result via the store, which assigns identity.
pub fn create_session(
    draft: &SessionDraft,
    rules: &[Rule],
) -> Result<NewStudySession, ValidationError> {
    let studied_on = NaiveDate::parse_from_str(draft.studied_on.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate)?;

    let topic = draft.topic.trim();
    if topic.is_empty() {
        return Err(ValidationError::MissingTopic);
    }

    if draft.questions_total <= 0 {
        return Err(ValidationError::InvalidTotal);
    }
    let total = draft.questions_total as u32;

    if draft.questions_correct < 0 || draft.questions_correct > draft.questions_total {
        return Err(ValidationError::InvalidCorrect);
    }
    let correct = draft.questions_correct as u32;

    let accuracy = (100.0 * correct as f64 / total as f64).round() as u8;
    let interval_days = select_interval_days(accuracy, rules);
    let next_review_on = studied_on + Duration::days(interval_days as i64);

    Ok(NewStudySession {
        topic: topic.to_string(),
        studied_on,
        questions_total: total,
        questions_correct: correct,
        accuracy,
        interval_days,
        next_review_on,
        reviewed: false,
        reviewed_on: None,
    })
}

/// Flips the reviewed flag. The false→true transition stamps `reviewed_on`
/// with today's date; true→false clears it. Everything else on the record
/// is immutable after creation.
pub fn toggle_reviewed(session: &StudySession, today: NaiveDate) -> ReviewToggle {
    if session.reviewed {
        ReviewToggle {
            reviewed: false,
            reviewed_on: None,
        }
    } else {
        ReviewToggle {
            reviewed: true,
            reviewed_on: Some(today),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::default_rules;
    use chrono::Utc;
    use uuid::Uuid;

    fn draft(topic: &str, date: &str, total: i64, correct: i64) -> SessionDraft {
        SessionDraft {
            topic: topic.to_string(),
            studied_on: date.to_string(),
            questions_total: total,
            questions_correct: correct,
        }
    }

    #[test]
    fn accuracy_rounds_to_nearest_integer() {
        let new = create_session(&draft("ECG basics", "2024-03-10", 3, 2), &default_rules()).unwrap();
        assert_eq!(new.accuracy, 67);
    }

    #[test]
    fn next_review_is_studied_date_plus_interval() {
        let rules = vec![Rule { min: 0, max: 100, days: 14 }];
        let new = create_session(&draft("Arrhythmias", "2024-01-01", 10, 8), &rules).unwrap();
        assert_eq!(new.interval_days, 14);
        assert_eq!(new.next_review_on, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn derivation_uses_the_passed_rule_set() {
        let new = create_session(&draft("Heart failure", "2024-01-01", 10, 10), &default_rules()).unwrap();
        assert_eq!(new.accuracy, 100);
        assert_eq!(new.interval_days, 30);
        assert!(!new.reviewed);
        assert_eq!(new.reviewed_on, None);
    }

    #[test]
    fn invalid_date_is_reported_before_anything_else() {
        // Topic and counts are also bad; the date failure must win, every time.
        for _ in 0..3 {
            let err = create_session(&draft("", "not-a-date", 0, 5), &default_rules()).unwrap_err();
            assert_eq!(err, ValidationError::InvalidDate);
        }
    }

    #[test]
    fn impossible_calendar_date_is_invalid() {
        let err = create_session(&draft("Valves", "2024-02-31", 5, 3), &default_rules()).unwrap_err();
        assert_eq!(err, ValidationError::InvalidDate);
    }

    #[test]
    fn blank_topic_is_rejected_after_date() {
        let err = create_session(&draft("   ", "2024-03-10", 0, 0), &default_rules()).unwrap_err();
        assert_eq!(err, ValidationError::MissingTopic);
    }

    #[test]
    fn zero_or_negative_total_is_rejected() {
        let err = create_session(&draft("Valves", "2024-03-10", 0, 0), &default_rules()).unwrap_err();
        assert_eq!(err, ValidationError::InvalidTotal);
        let err = create_session(&draft("Valves", "2024-03-10", -4, 0), &default_rules()).unwrap_err();
        assert_eq!(err, ValidationError::InvalidTotal);
    }

    #[test]
    fn correct_count_must_fit_in_total() {
        let err = create_session(&draft("Valves", "2024-03-10", 5, 6), &default_rules()).unwrap_err();
        assert_eq!(err, ValidationError::InvalidCorrect);
        let err = create_session(&draft("Valves", "2024-03-10", 5, -1), &default_rules()).unwrap_err();
        assert_eq!(err, ValidationError::InvalidCorrect);
    }

    fn stored(new: NewStudySession) -> StudySession {
        StudySession::from_new(new, Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn toggle_stamps_and_clears_reviewed_on() {
        let session = stored(create_session(&draft("Valves", "2024-03-10", 5, 4), &default_rules()).unwrap());
        let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();

        let first = toggle_reviewed(&session, today);
        assert!(first.reviewed);
        assert_eq!(first.reviewed_on, Some(today));

        let mut reviewed = session.clone();
        reviewed.reviewed = first.reviewed;
        reviewed.reviewed_on = first.reviewed_on;

        let second = toggle_reviewed(&reviewed, today);
        assert!(!second.reviewed);
        assert_eq!(second.reviewed_on, None);
        // Back to the original reviewed state after a double toggle.
        assert_eq!(second.reviewed, session.reviewed);
        assert_eq!(second.reviewed_on, session.reviewed_on);
    }
}
