//! Tally derivation: the typed vote map and its pure projections.
//!
//! Everything in this module is deterministic and side-effect-free;
//! percentages and totals are re-derived from the current poll snapshot
//! on every query, never cached.

use std::collections::{BTreeMap, BTreeSet};

use livepoll_common::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A voter identity attributed to an option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    /// User id.
    pub id: String,
    /// Display email shown in the creator-facing detail view.
    pub email: String,
}

/// Per-option tally: ballot count plus attribution in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyEntry {
    /// Number of ballots cast for this option.
    pub count: u64,
    /// Voters who chose this option, in submission order.
    #[serde(default)]
    pub users: Vec<Voter>,
}

/// The poll's votes map: stringified option index -> tally entry.
///
/// An absent key means zero votes for that option. Stored on the poll
/// row as a JSON column; parsed here at the service boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoteMap(BTreeMap<String, TallyEntry>);

impl VoteMap {
    /// Parse the entity's JSON column into a typed map.
    pub fn from_json(value: &JsonValue) -> AppResult<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| AppError::Internal(format!("Invalid votes map: {e}")))
    }

    /// Serialize back into the entity's JSON column shape.
    pub fn to_json(&self) -> AppResult<JsonValue> {
        serde_json::to_value(self)
            .map_err(|e| AppError::Internal(format!("Unserializable votes map: {e}")))
    }

    /// Tally entry for an option, if any ballot was cast for it.
    #[must_use]
    pub fn entry(&self, index: i32) -> Option<&TallyEntry> {
        self.0.get(&index.to_string())
    }

    /// Record one ballot for an option: increment the count and append
    /// the voter, keeping `count == users.len()`.
    pub fn record(&mut self, index: i32, voter: Voter) {
        let entry = self.0.entry(index.to_string()).or_default();
        entry.count += 1;
        entry.users.push(voter);
    }

    /// Sum of ballot counts over all options.
    #[must_use]
    pub fn total_votes(&self) -> u64 {
        self.0.values().map(|entry| entry.count).sum()
    }

    /// Share of ballots for an option, in percent. 0 when no ballots
    /// were cast at all.
    #[must_use]
    pub fn percentage(&self, index: i32) -> f64 {
        let total = self.total_votes();
        if total == 0 {
            return 0.0;
        }
        let count = self.entry(index).map_or(0, |entry| entry.count);
        100.0 * count as f64 / total as f64
    }

    /// Whether every entry's count matches its attribution length.
    #[must_use]
    pub fn attribution_consistent(&self) -> bool {
        self.0
            .values()
            .all(|entry| entry.count == entry.users.len() as u64)
    }
}

/// The creator-designated correct option(s), used for scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerKey {
    /// Single-choice answer key.
    Single(i32),
    /// Multiple-choice answer key.
    Multiple(BTreeSet<i32>),
}

impl AnswerKey {
    /// Build the answer key from the poll's stored fields, if the
    /// creator supplied one.
    pub fn from_poll_fields(
        multiple_choice: bool,
        correct_option: Option<i32>,
        correct_options: Option<&JsonValue>,
    ) -> AppResult<Option<Self>> {
        if multiple_choice {
            let Some(raw) = correct_options else {
                return Ok(None);
            };
            let indices: Vec<i32> = serde_json::from_value(raw.clone())
                .map_err(|e| AppError::Internal(format!("Invalid answer key: {e}")))?;
            if indices.is_empty() {
                return Ok(None);
            }
            Ok(Some(Self::Multiple(indices.into_iter().collect())))
        } else {
            Ok(correct_option.map(Self::Single))
        }
    }

    /// Whether a single option index is part of the answer key.
    #[must_use]
    pub fn contains(&self, index: i32) -> bool {
        match self {
            Self::Single(correct) => *correct == index,
            Self::Multiple(correct) => correct.contains(&index),
        }
    }

    /// Whether a submission exactly matches the answer key: single
    /// index match for single-choice, exact set equality for
    /// multiple-choice.
    #[must_use]
    pub fn matches_exactly(&self, selected: &[i32]) -> bool {
        match self {
            Self::Single(correct) => selected.len() == 1 && selected[0] == *correct,
            Self::Multiple(correct) => {
                let submitted: BTreeSet<i32> = selected.iter().copied().collect();
                submitted == *correct
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn voter(name: &str) -> Voter {
        Voter {
            id: name.to_string(),
            email: format!("{name}@example.com"),
        }
    }

    #[test]
    fn test_empty_map_totals_zero() {
        let votes = VoteMap::from_json(&json!({})).unwrap();
        assert_eq!(votes.total_votes(), 0);
        assert_eq!(votes.percentage(0), 0.0);
        assert!(votes.attribution_consistent());
    }

    #[test]
    fn test_record_keeps_count_and_attribution_in_sync() {
        let mut votes = VoteMap::default();
        votes.record(0, voter("x"));
        votes.record(0, voter("y"));
        votes.record(1, voter("z"));

        assert_eq!(votes.total_votes(), 3);
        assert_eq!(votes.entry(0).unwrap().count, 2);
        assert_eq!(votes.entry(0).unwrap().users.len(), 2);
        // Submission order is preserved
        assert_eq!(votes.entry(0).unwrap().users[0].id, "x");
        assert!(votes.attribution_consistent());
    }

    #[test]
    fn test_single_vote_is_hundred_percent() {
        let mut votes = VoteMap::default();
        votes.record(0, voter("x"));

        assert_eq!(votes.total_votes(), 1);
        assert_eq!(votes.percentage(0), 100.0);
        assert_eq!(votes.percentage(1), 0.0);
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        let mut votes = VoteMap::default();
        votes.record(0, voter("a"));
        votes.record(1, voter("b"));
        votes.record(2, voter("c"));

        let sum: f64 = (0..3).map(|i| votes.percentage(i)).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentage_is_idempotent() {
        let mut votes = VoteMap::default();
        votes.record(0, voter("a"));
        votes.record(1, voter("b"));

        assert_eq!(votes.percentage(0), votes.percentage(0));
    }

    #[test]
    fn test_json_round_trip_preserves_shape() {
        let raw = json!({
            "0": { "count": 2, "users": [
                { "id": "u1", "email": "u1@example.com" },
                { "id": "u2", "email": "u2@example.com" },
            ]},
            "2": { "count": 1, "users": [{ "id": "u3", "email": "u3@example.com" }] },
        });
        let votes = VoteMap::from_json(&raw).unwrap();
        assert_eq!(votes.total_votes(), 3);
        assert_eq!(votes.to_json().unwrap(), raw);
    }

    #[test]
    fn test_single_choice_answer_key() {
        let key = AnswerKey::from_poll_fields(false, Some(0), None)
            .unwrap()
            .unwrap();
        assert!(key.contains(0));
        assert!(!key.contains(1));
        assert!(key.matches_exactly(&[0]));
        assert!(!key.matches_exactly(&[1]));
        assert!(!key.matches_exactly(&[0, 1]));
    }

    #[test]
    fn test_multiple_choice_exact_set_equality() {
        let raw = json!([0, 2]);
        let key = AnswerKey::from_poll_fields(true, None, Some(&raw))
            .unwrap()
            .unwrap();
        assert!(key.matches_exactly(&[0, 2]));
        assert!(key.matches_exactly(&[2, 0]));
        assert!(!key.matches_exactly(&[0]));
        assert!(!key.matches_exactly(&[0, 1, 2]));
    }

    #[test]
    fn test_no_answer_key_when_unset() {
        assert!(
            AnswerKey::from_poll_fields(false, None, None)
                .unwrap()
                .is_none()
        );
        assert!(
            AnswerKey::from_poll_fields(true, None, None)
                .unwrap()
                .is_none()
        );
        let empty = json!([]);
        assert!(
            AnswerKey::from_poll_fields(true, None, Some(&empty))
                .unwrap()
                .is_none()
        );
    }
}
