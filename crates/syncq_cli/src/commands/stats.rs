//! Stats command implementation.

use super::{format_age, open_queue, CliResult};
use std::path::Path;
use syncq_engine::QueueStats;

/// Runs the stats command.
pub fn run(path: &Path, key: &str, format: &str) -> CliResult<()> {
    let stats = collect(path, key)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        _ => {
            print_text_output(path, key, &stats);
        }
    }

    Ok(())
}

/// Loads the queue and summarizes it.
pub fn collect(path: &Path, key: &str) -> CliResult<QueueStats> {
    Ok(open_queue(path, key, false)?.stats())
}

fn print_text_output(path: &Path, key: &str, stats: &QueueStats) {
    println!("SyncQ Queue Statistics");
    println!("======================");
    println!();
    println!("Path: {}", path.display());
    println!("Key:  {}", key);
    println!();
    println!("Pending:          {}", stats.total_pending);
    println!("Failed attempts:  {}", stats.items_with_failed_attempts);
    if stats.total_pending > 0 {
        println!("Oldest item age:  {}", format_age(stats.oldest_item_age_ms));
    }

    if !stats.by_kind.is_empty() {
        println!();
        println!("By kind:");
        for (kind, count) in &stats.by_kind {
            println!("  {:<12} {}", kind, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::enqueue;
    use syncq_engine::{MutationKind, Priority};

    #[test]
    fn counts_enqueued_items() {
        let dir = tempfile::tempdir().unwrap();
        enqueue::apply(
            dir.path(),
            "sync_queue",
            MutationKind::Review,
            r#"{"text":"nice"}"#,
            Priority::Low,
            None,
        )
        .unwrap();

        let stats = collect(dir.path(), "sync_queue").unwrap();
        assert_eq!(stats.total_pending, 1);
        assert_eq!(stats.by_kind.get("review"), Some(&1));
        assert_eq!(stats.items_with_failed_attempts, 0);
    }
}
