//! crates/study_tracker_core/src/schedule.rs
//!
//! Status derivation, human labels, KPI aggregation and filtering.
//! Everything here is pure: "now" is always an explicit parameter so the
//! same collection classifies identically for the same date.

use chrono::NaiveDate;

use crate::domain::{SessionFilter, Status, StatusFilter, StudySession, Summary};

/// Sessions due within this many days count as "due soon".
pub const DUE_SOON_WINDOW_DAYS: i64 = 7;

/// Calendar-day difference from `today` to `date`; negative when `date` is
/// in the past. Time-of-day never enters the computation.
pub fn days_until(today: NaiveDate, date: NaiveDate) -> i64 {
    (date - today).num_days()
}

/// Derives a session's status relative to `today`. A reviewed session is
/// `Done` no matter what its dates say.
pub fn classify(session: &StudySession, today: NaiveDate) -> Status {
    if session.reviewed {
        return Status::Done;
    }
    let diff = days_until(today, session.next_review_on);
    if diff < 0 {
        Status::Overdue
    } else if diff <= DUE_SOON_WINDOW_DAYS {
        Status::DueSoon
    } else {
        Status::Open
    }
}

/// Human label for a status. The day counts in the overdue/upcoming labels
/// are contract, not decoration: `abs(diff)` days overdue, `diff` days until
/// due, "due today" at zero.
pub fn status_label(status: Status, session: &StudySession, today: NaiveDate) -> String {
    if status == Status::Done {
        return "reviewed".to_string();
    }
    let diff = days_until(today, session.next_review_on);
    if diff < 0 {
        format!("overdue by {} day(s)", -diff)
    } else if diff == 0 {
        "due today".to_string()
    } else {
        format!("due in {} day(s)", diff)
    }
}

/// Computes the dashboard KPIs over a full session collection.
pub fn aggregate(sessions: &[StudySession], today: NaiveDate) -> Summary {
    let mut overdue = 0;
    let mut due_soon = 0;
    for session in sessions {
        match classify(session, today) {
            Status::Overdue => overdue += 1,
            Status::DueSoon => due_soon += 1,
            _ => {}
        }
    }

    let average_accuracy = if sessions.is_empty() {
        None
    } else {
        let sum: u32 = sessions.iter().map(|s| s.accuracy as u32).sum();
        Some((sum as f64 / sessions.len() as f64).round() as u8)
    };

    Summary {
        overdue,
        due_soon,
        average_accuracy,
    }
}

/// Applies a conjunctive status + topic-substring filter. Borrows the
/// records untouched; classification happens on the fly against `today`.
pub fn filter_sessions<'a>(
    sessions: &'a [StudySession],
    filter: &SessionFilter,
    today: NaiveDate,
) -> Vec<&'a StudySession> {
    let needle = filter.text.trim().to_lowercase();
    sessions
        .iter()
        .filter(|session| match filter.status {
            StatusFilter::All => true,
            StatusFilter::Only(status) => classify(session, today) == status,
        })
        .filter(|session| needle.is_empty() || session.topic.to_lowercase().contains(&needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn session(topic: &str, accuracy: u8, next_review_on: NaiveDate, reviewed: bool) -> StudySession {
        StudySession {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            studied_on: next_review_on - Duration::days(7),
            questions_total: 10,
            questions_correct: 7,
            accuracy,
            interval_days: 7,
            next_review_on,
            reviewed,
            reviewed_on: None,
            created_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn status_boundaries_around_the_review_date() {
        let due = date(2024, 6, 15);
        let s = session("Cardio", 80, due, false);

        assert_eq!(classify(&s, due), Status::DueSoon); // diff = 0
        assert_eq!(classify(&s, due + Duration::days(1)), Status::Overdue); // diff = -1
        assert_eq!(classify(&s, due - Duration::days(7)), Status::DueSoon); // diff = 7
        assert_eq!(classify(&s, due - Duration::days(8)), Status::Open); // diff = 8
    }

    #[test]
    fn reviewed_overrides_date_logic() {
        let long_overdue = session("Cardio", 80, date(2020, 1, 1), true);
        assert_eq!(classify(&long_overdue, date(2024, 6, 15)), Status::Done);
        assert_eq!(status_label(Status::Done, &long_overdue, date(2024, 6, 15)), "reviewed");
    }

    #[test]
    fn labels_carry_the_day_counts() {
        let due = date(2024, 6, 15);
        let s = session("Cardio", 80, due, false);

        assert_eq!(status_label(Status::DueSoon, &s, due), "due today");
        assert_eq!(
            status_label(Status::Overdue, &s, due + Duration::days(3)),
            "overdue by 3 day(s)"
        );
        assert_eq!(
            status_label(Status::DueSoon, &s, due - Duration::days(5)),
            "due in 5 day(s)"
        );
    }

    #[test]
    fn aggregate_counts_and_averages() {
        let today = date(2024, 6, 15);
        let sessions = vec![
            session("A", 80, today - Duration::days(2), false), // overdue
            session("B", 60, today + Duration::days(3), false), // due soon
            session("C", 90, today + Duration::days(30), true), // done
        ];
        let summary = aggregate(&sessions, today);
        assert_eq!(summary.overdue, 1);
        assert_eq!(summary.due_soon, 1);
        assert_eq!(summary.average_accuracy, Some(77)); // round(230 / 3)
    }

    #[test]
    fn average_accuracy_of_two_sessions() {
        let today = date(2024, 6, 15);
        let sessions = vec![
            session("A", 80, today, false),
            session("B", 60, today, false),
        ];
        assert_eq!(aggregate(&sessions, today).average_accuracy, Some(70));
    }

    #[test]
    fn empty_collection_has_no_average() {
        let summary = aggregate(&[], date(2024, 6, 15));
        assert_eq!(summary.overdue, 0);
        assert_eq!(summary.due_soon, 0);
        assert_eq!(summary.average_accuracy, None);
    }

    #[test]
    fn filter_is_conjunctive() {
        let today = date(2024, 6, 15);
        let sessions = vec![
            session("Cardiology", 80, today - Duration::days(1), false), // overdue, matches text
            session("Cardiology", 80, today + Duration::days(2), false), // due soon, matches text
            session("Neurology", 70, today - Duration::days(1), false),  // overdue, no text match
        ];

        let filter = SessionFilter {
            status: StatusFilter::Only(Status::Overdue),
            text: "cardio".to_string(),
        };
        let hits = filter_sessions(&sessions, &filter, today);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].topic, "Cardiology");
        assert_eq!(hits[0].next_review_on, today - Duration::days(1));
    }

    #[test]
    fn empty_text_is_a_no_op_on_the_text_dimension() {
        let today = date(2024, 6, 15);
        let sessions = vec![
            session("Cardiology", 80, today - Duration::days(1), false),
            session("Neurology", 70, today - Duration::days(1), false),
        ];
        let filter = SessionFilter {
            status: StatusFilter::Only(Status::Overdue),
            text: String::new(),
        };
        assert_eq!(filter_sessions(&sessions, &filter, today).len(), 2);
    }

    #[test]
    fn text_match_is_case_insensitive() {
        let today = date(2024, 6, 15);
        let sessions = vec![session("ECG Basics", 80, today, false)];
        let filter = SessionFilter {
            status: StatusFilter::All,
            text: "ecg".to_string(),
        };
        assert_eq!(filter_sessions(&sessions, &filter, today).len(), 1);
    }

    #[test]
    fn filtering_borrows_without_mutation() {
        let today = date(2024, 6, 15);
        let sessions = vec![session("Cardiology", 80, today, false)];
        let before = sessions.clone();
        let _ = filter_sessions(&sessions, &SessionFilter::default(), today);
        assert_eq!(sessions, before);
    }
}
