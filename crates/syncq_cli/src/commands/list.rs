//! List command implementation.

use super::{open_queue, CliResult};
use std::path::Path;
use syncq_engine::SyncQueueItem;

/// Runs the list command.
pub fn run(path: &Path, key: &str, limit: Option<usize>, format: &str) -> CliResult<()> {
    let items = collect(path, key, limit)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        _ => {
            print_text_output(&items);
        }
    }

    Ok(())
}

/// Loads pending items in processing order.
pub fn collect(path: &Path, key: &str, limit: Option<usize>) -> CliResult<Vec<SyncQueueItem>> {
    let mut items = open_queue(path, key, false)?.pending();
    if let Some(limit) = limit {
        items.truncate(limit);
    }
    Ok(items)
}

fn print_text_output(items: &[SyncQueueItem]) {
    if items.is_empty() {
        println!("Queue is empty");
        return;
    }

    println!(
        "{:<48} {:<12} {:<8} {:>8}  PAYLOAD",
        "ID", "KIND", "PRIORITY", "ATTEMPTS"
    );
    for item in items {
        println!(
            "{:<48} {:<12} {:<8} {:>8}  {}",
            item.id,
            item.kind().as_str(),
            item.priority.as_str(),
            item.attempts,
            item.mutation.payload()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::enqueue;
    use syncq_engine::{MutationKind, Priority};

    #[test]
    fn lists_in_processing_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path();
        for (id, priority) in [("low", Priority::Low), ("high", Priority::High)] {
            enqueue::apply(
                path,
                "sync_queue",
                MutationKind::Favorite,
                "{}",
                priority,
                Some(id.to_string()),
            )
            .unwrap();
        }

        let ids: Vec<_> = collect(path, "sync_queue", None)
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["high", "low"]);

        assert_eq!(collect(path, "sync_queue", Some(1)).unwrap().len(), 1);
    }
}
