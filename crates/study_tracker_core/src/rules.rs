//! crates/study_tracker_core/src/rules.rs
//!
//! Rule set normalization, strict validation, and interval selection.
//!
//! There are two deliberately different entry points for user-edited rules:
//! `normalize_rules` coerces out-of-range values and is only ever used for
//! ephemeral preview computation, while `validate_rules_for_save` rejects
//! them outright so a bad band surfaces as a user-visible error instead of
//! being silently corrected on disk.

use crate::domain::{Rule, RuleDraft, ValidationError};

/// Interval returned when no rule band covers the accuracy.
pub const FALLBACK_INTERVAL_DAYS: u32 = 7;

/// The band set installed for a scope that has never saved rules.
/// The exact boundaries are a product decision; nothing in the engine
/// depends on them partitioning 0..=100.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule { min: 0, max: 49, days: 1 },
        Rule { min: 50, max: 69, days: 3 },
        Rule { min: 70, max: 79, days: 7 },
        Rule { min: 80, max: 90, days: 14 },
        Rule { min: 91, max: 100, days: 30 },
    ]
}

/// Coerces drafts into well-formed rules: clamps `min`/`max` into [0, 100],
/// floors `days` at zero, and sorts ascending by `min`. Total — preview
/// computation must never fail on odd input.
pub fn normalize_rules(drafts: &[RuleDraft]) -> Vec<Rule> {
    let mut rules: Vec<Rule> = drafts
        .iter()
        .map(|d| Rule {
            min: d.min.clamp(0, 100) as u8,
            max: d.max.clamp(0, 100) as u8,
            days: d.days.max(0) as u32,
        })
        .collect();
    rules.sort_by_key(|r| r.min);
    rules
}

/// Strict check used before persisting user edits. Rejects, does not clamp.
/// The submitted order is preserved because evaluation is first-match.
pub fn validate_rules_for_save(drafts: &[RuleDraft]) -> Result<Vec<Rule>, ValidationError> {
    drafts
        .iter()
        .enumerate()
        .map(|(index, d)| {
            if d.min < 0 || d.min > 100 || d.max < 0 || d.max > 100 {
                return Err(ValidationError::RuleOutOfRange { index });
            }
            if d.min > d.max {
                return Err(ValidationError::RuleInverted { index });
            }
            if d.days < 0 {
                return Err(ValidationError::RuleNegativeDays { index });
            }
            Ok(Rule {
                min: d.min as u8,
                max: d.max as u8,
                days: d.days as u32,
            })
        })
        .collect()
}

/// Maps an accuracy percentage to a review interval in days.
///
/// Scans the rules in stored order and returns the first band containing the
/// accuracy; overlapping bands are resolved by position, not by narrowest
/// match. Falls back to [`FALLBACK_INTERVAL_DAYS`] when no band covers the
/// value, so the function is total.
pub fn select_interval_days(accuracy: u8, rules: &[Rule]) -> u32 {
    let acc = accuracy.min(100);
    rules
        .iter()
        .find(|r| r.min <= acc && acc <= r.max)
        .map(|r| r.days)
        .unwrap_or(FALLBACK_INTERVAL_DAYS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bands_cover_every_accuracy() {
        let rules = default_rules();
        for acc in 0..=100u8 {
            let days = select_interval_days(acc, &rules);
            assert_ne!(days, FALLBACK_INTERVAL_DAYS, "accuracy {acc} fell through to the fallback");
        }
    }

    #[test]
    fn selection_is_total_for_any_accuracy() {
        let rules = default_rules();
        for acc in 0..=255u8 {
            // Never panics, never returns garbage.
            let days = select_interval_days(acc, &rules);
            assert!(days <= 30);
        }
    }

    #[test]
    fn first_matching_rule_wins_over_later_overlaps() {
        let rules = vec![
            Rule { min: 0, max: 100, days: 5 },
            Rule { min: 0, max: 50, days: 2 },
        ];
        assert_eq!(select_interval_days(30, &rules), 5);
    }

    #[test]
    fn gap_in_coverage_falls_back_to_seven_days() {
        let rules = vec![Rule { min: 50, max: 100, days: 10 }];
        assert_eq!(select_interval_days(10, &rules), 7);
    }

    #[test]
    fn empty_rule_set_falls_back() {
        assert_eq!(select_interval_days(80, &[]), FALLBACK_INTERVAL_DAYS);
    }

    #[test]
    fn normalize_clamps_and_sorts() {
        let drafts = vec![
            RuleDraft { min: 50, max: 120, days: -3 },
            RuleDraft { min: -10, max: 49, days: 1 },
        ];
        let rules = normalize_rules(&drafts);
        assert_eq!(
            rules,
            vec![
                Rule { min: 0, max: 49, days: 1 },
                Rule { min: 50, max: 100, days: 0 },
            ]
        );
    }

    #[test]
    fn normalize_keeps_inverted_bands_as_dead_bands() {
        // Clamping never swaps bounds; an inverted band simply matches nothing.
        let rules = normalize_rules(&[RuleDraft { min: 80, max: 20, days: 5 }]);
        assert_eq!(rules, vec![Rule { min: 80, max: 20, days: 5 }]);
        assert_eq!(select_interval_days(50, &rules), FALLBACK_INTERVAL_DAYS);
    }

    #[test]
    fn save_validation_rejects_out_of_range_bounds() {
        let err = validate_rules_for_save(&[RuleDraft { min: 0, max: 101, days: 1 }]).unwrap_err();
        assert_eq!(err, ValidationError::RuleOutOfRange { index: 0 });

        let err = validate_rules_for_save(&[RuleDraft { min: -1, max: 50, days: 1 }]).unwrap_err();
        assert_eq!(err, ValidationError::RuleOutOfRange { index: 0 });
    }

    #[test]
    fn save_validation_rejects_inverted_band() {
        let drafts = vec![
            RuleDraft { min: 0, max: 49, days: 1 },
            RuleDraft { min: 70, max: 60, days: 3 },
        ];
        let err = validate_rules_for_save(&drafts).unwrap_err();
        assert_eq!(err, ValidationError::RuleInverted { index: 1 });
    }

    #[test]
    fn save_validation_rejects_negative_days() {
        let err = validate_rules_for_save(&[RuleDraft { min: 0, max: 100, days: -1 }]).unwrap_err();
        assert_eq!(err, ValidationError::RuleNegativeDays { index: 0 });
    }

    #[test]
    fn save_validation_keeps_submitted_order() {
        let drafts = vec![
            RuleDraft { min: 50, max: 100, days: 10 },
            RuleDraft { min: 0, max: 60, days: 2 },
        ];
        let rules = validate_rules_for_save(&drafts).unwrap();
        assert_eq!(rules[0], Rule { min: 50, max: 100, days: 10 });
        // The overlap at accuracy 55 resolves to the first stored rule.
        assert_eq!(select_interval_days(55, &rules), 10);
    }
}
