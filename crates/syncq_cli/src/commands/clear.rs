//! Clear command implementation.

use super::{open_queue, CliResult};
use std::path::Path;

/// Runs the clear command.
pub fn run(path: &Path, key: &str) -> CliResult<()> {
    let dropped = open_queue(path, key, false)?.clear_queue();
    println!("Dropped {} pending mutations", dropped);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{enqueue, stats};
    use syncq_engine::{MutationKind, Priority};

    #[test]
    fn clear_empties_queue_under_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path();
        for key in ["sync_queue", "other"] {
            enqueue::apply(
                path,
                key,
                MutationKind::Rating,
                r#"{"stars":5}"#,
                Priority::High,
                None,
            )
            .unwrap();
        }

        run(path, "sync_queue").unwrap();
        assert_eq!(stats::collect(path, "sync_queue").unwrap().total_pending, 0);
        assert_eq!(stats::collect(path, "other").unwrap().total_pending, 1);
    }
}
