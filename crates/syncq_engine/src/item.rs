//! Queue item data model.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Processing priority of a queued mutation.
///
/// Ordering is `High < Medium < Low`, so sorting ascending puts the most
/// urgent work first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Processed first.
    High,
    /// Default priority.
    Medium,
    /// Processed last.
    Low,
}

impl Priority {
    /// Returns the lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(format!("unknown priority: {other}")),
        }
    }
}

/// The closed set of mutation kinds the queue carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationKind {
    /// Mark a subject as favorite.
    Favorite,
    /// Remove a favorite mark.
    Unfavorite,
    /// Submit a written review.
    Review,
    /// Submit a rating.
    Rating,
    /// Update a counter or statistic.
    StatUpdate,
}

impl MutationKind {
    /// Every kind, in declaration order.
    pub const ALL: [MutationKind; 5] = [
        MutationKind::Favorite,
        MutationKind::Unfavorite,
        MutationKind::Review,
        MutationKind::Rating,
        MutationKind::StatUpdate,
    ];

    /// Returns the wire name of the kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Favorite => "favorite",
            MutationKind::Unfavorite => "unfavorite",
            MutationKind::Review => "review",
            MutationKind::Rating => "rating",
            MutationKind::StatUpdate => "stat-update",
        }
    }

    /// Wraps `payload` in the mutation variant for this kind.
    pub fn with_payload(self, payload: Value) -> Mutation {
        match self {
            MutationKind::Favorite => Mutation::Favorite(payload),
            MutationKind::Unfavorite => Mutation::Unfavorite(payload),
            MutationKind::Review => Mutation::Review(payload),
            MutationKind::Rating => Mutation::Rating(payload),
            MutationKind::StatUpdate => Mutation::StatUpdate(payload),
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MutationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MutationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown mutation kind: {s}"))
    }
}

/// A locally-originated state change awaiting delivery.
///
/// Each variant carries an opaque JSON payload that only the handler for
/// that kind interprets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum Mutation {
    /// See [`MutationKind::Favorite`].
    Favorite(Value),
    /// See [`MutationKind::Unfavorite`].
    Unfavorite(Value),
    /// See [`MutationKind::Review`].
    Review(Value),
    /// See [`MutationKind::Rating`].
    Rating(Value),
    /// See [`MutationKind::StatUpdate`].
    StatUpdate(Value),
}

impl Mutation {
    /// Returns the kind used for handler routing.
    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::Favorite(_) => MutationKind::Favorite,
            Mutation::Unfavorite(_) => MutationKind::Unfavorite,
            Mutation::Review(_) => MutationKind::Review,
            Mutation::Rating(_) => MutationKind::Rating,
            Mutation::StatUpdate(_) => MutationKind::StatUpdate,
        }
    }

    /// Returns the payload.
    pub fn payload(&self) -> &Value {
        match self {
            Mutation::Favorite(p)
            | Mutation::Unfavorite(p)
            | Mutation::Review(p)
            | Mutation::Rating(p)
            | Mutation::StatUpdate(p) => p,
        }
    }
}

/// One unit of deferred work in the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncQueueItem {
    /// Unique id within the queue.
    pub id: String,
    /// The mutation to deliver.
    #[serde(flatten)]
    pub mutation: Mutation,
    /// Enqueue time, epoch milliseconds.
    pub created_at: u64,
    /// Failed delivery attempts so far.
    pub attempts: u32,
    /// Time of the most recent attempt, epoch milliseconds; 0 if never.
    pub last_attempt_at: u64,
    /// Processing priority.
    pub priority: Priority,
}

impl SyncQueueItem {
    /// Creates a fresh, never-attempted item.
    pub fn new(id: String, mutation: Mutation, priority: Priority, created_at: u64) -> Self {
        Self {
            id,
            mutation,
            created_at,
            attempts: 0,
            last_attempt_at: 0,
            priority,
        }
    }

    /// Builds an item id of the form `{kind}_{subject}_{created_at}`.
    pub fn make_id(kind: MutationKind, subject: &str, created_at: u64) -> String {
        format!("{kind}_{subject}_{created_at}")
    }

    /// Returns the mutation kind.
    pub fn kind(&self) -> MutationKind {
        self.mutation.kind()
    }

    /// Sort key for processing order: priority, then age.
    pub fn order_key(&self) -> (Priority, u64) {
        (self.priority, self.created_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn priority_order() {
        assert!(Priority::High < Priority::Medium);
        assert!(Priority::Medium < Priority::Low);
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!("low".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in MutationKind::ALL {
            assert_eq!(kind.as_str().parse::<MutationKind>().unwrap(), kind);
            assert_eq!(kind.with_payload(json!(null)).kind(), kind);
        }
        assert_eq!(MutationKind::StatUpdate.to_string(), "stat-update");
        assert!("like".parse::<MutationKind>().is_err());
    }

    #[test]
    fn item_json_shape() {
        let item = SyncQueueItem::new(
            "favorite_a1_1700".into(),
            Mutation::Favorite(json!({"attractionId": "a1"})),
            Priority::High,
            1700,
        );

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "favorite_a1_1700",
                "type": "favorite",
                "payload": {"attractionId": "a1"},
                "createdAt": 1700,
                "attempts": 0,
                "lastAttemptAt": 0,
                "priority": "high"
            })
        );

        let back: SyncQueueItem = serde_json::from_value(value).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn stat_update_tag() {
        let item = SyncQueueItem::new(
            "stat-update_x_1".into(),
            Mutation::StatUpdate(json!({"delta": 1})),
            Priority::Low,
            1,
        );
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "stat-update");
    }

    #[test]
    fn make_id_format() {
        assert_eq!(
            SyncQueueItem::make_id(MutationKind::Review, "r9", 42),
            "review_r9_42"
        );
    }
}
