//! Enqueue command implementation.

use super::{open_queue, CliResult};
use serde_json::Value;
use std::path::Path;
use syncq_engine::{MutationKind, Priority};

/// Runs the enqueue command.
pub fn run(
    path: &Path,
    key: &str,
    kind: MutationKind,
    payload: &str,
    priority: Priority,
    id: Option<String>,
) -> CliResult<()> {
    let (id, added) = apply(path, key, kind, payload, priority, id)?;
    if added {
        println!("Enqueued {}", id);
    } else {
        println!("Already pending: {}", id);
    }
    Ok(())
}

/// Enqueues one mutation, creating the queue directory if needed.
///
/// Returns the item id and whether a new item was added; an id that is
/// already pending leaves the queue unchanged.
pub fn apply(
    path: &Path,
    key: &str,
    kind: MutationKind,
    payload: &str,
    priority: Priority,
    id: Option<String>,
) -> CliResult<(String, bool)> {
    let payload: Value = serde_json::from_str(payload)?;
    let engine = open_queue(path, key, true)?;
    let mutation = kind.with_payload(payload);

    let before = engine.stats().total_pending;
    let id = match id {
        Some(id) => engine.enqueue_with_id(id, mutation, priority),
        None => engine.enqueue(mutation, priority),
    };
    Ok((id, engine.stats().total_pending > before))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CliError;

    #[test]
    fn explicit_id_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path();

        let (id, added) = apply(
            path,
            "sync_queue",
            MutationKind::Favorite,
            r#"{"attractionId":"a1"}"#,
            Priority::High,
            Some("fav-a1".to_string()),
        )
        .unwrap();
        assert_eq!(id, "fav-a1");
        assert!(added);

        let (_, added) = apply(
            path,
            "sync_queue",
            MutationKind::Favorite,
            r#"{"attractionId":"other"}"#,
            Priority::Low,
            Some("fav-a1".to_string()),
        )
        .unwrap();
        assert!(!added);
    }

    #[test]
    fn generated_id_has_kind_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let (id, added) = apply(
            dir.path(),
            "sync_queue",
            MutationKind::StatUpdate,
            r#"{"steps":10}"#,
            Priority::Medium,
            None,
        )
        .unwrap();
        assert!(added);
        assert!(id.starts_with("stat-update_"));
    }

    #[test]
    fn bad_payload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = apply(
            dir.path(),
            "sync_queue",
            MutationKind::Rating,
            "{not json",
            Priority::Medium,
            None,
        );
        assert!(matches!(result, Err(CliError::Json(_))));
    }
}
