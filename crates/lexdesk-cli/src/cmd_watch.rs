use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use lexdesk_core::AppState;
use lexdesk_store::{FileBackend, StateStore};

/// Print a line for every change other processes make to the state, until Ctrl-C.
pub fn execute(home: &Path, interval_ms: u64) -> anyhow::Result<()> {
    let backend = Arc::new(FileBackend::open(home)?);
    let _watcher = backend.watch(Duration::from_millis(interval_ms.max(50)));
    let store = StateStore::new(backend.clone());
    let mut sub = store.subscribe();
    let mut last = store.load();

    eprintln!("Watching {} (Ctrl-C to stop)", backend.root().display());
    tokio::runtime::Runtime::new()?.block_on(async {
        loop {
            tokio::select! {
                next = sub.changed() => {
                    let Some(next) = next else { break };
                    let ts = lexdesk_core::ids::now_rfc3339();
                    let time = ts.get(11..19).unwrap_or(&ts);
                    for line in describe_change(&last, &next) {
                        println!("{time}  {line}");
                    }
                    last = next;
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }
    });
    Ok(())
}

/// Human-readable differences between two snapshots.
fn describe_change(prev: &AppState, next: &AppState) -> Vec<String> {
    let mut lines = Vec::new();

    for doc in &next.documents {
        match prev.document(&doc.id) {
            None => lines.push(format!("document added: {}", doc.title)),
            Some(old) if old.status != doc.status => lines.push(format!(
                "document {}: {} -> {}",
                doc.title, old.status, doc.status
            )),
            Some(old) if old != doc => lines.push(format!("document updated: {}", doc.title)),
            Some(_) => {}
        }
    }
    for doc in &prev.documents {
        if next.document(&doc.id).is_none() {
            lines.push(format!("document removed: {}", doc.title));
        }
    }

    for task in &next.tasks {
        match prev.task(&task.id) {
            None => lines.push(format!("task added: {}", task.title)),
            Some(old) if old.status != task.status => lines.push(format!(
                "task {}: {} -> {}",
                task.title, old.status, task.status
            )),
            Some(_) => {}
        }
    }

    if next.events.len() != prev.events.len() {
        lines.push(format!("events: {} -> {}", prev.events.len(), next.events.len()));
    }
    if next.user.name != prev.user.name {
        lines.push(format!("user renamed: {} -> {}", prev.user.name, next.user.name));
    }
    if lines.is_empty() {
        lines.push("state rewritten".to_string());
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexdesk_core::{seed_state, DocumentStatus};

    #[test]
    fn reports_status_change_and_removal() {
        let prev = seed_state();
        let mut next = prev.clone();
        let first = next.documents[0].id.clone();
        next.set_document_status(&first, DocumentStatus::Final).unwrap();
        let removed = next.documents.pop().unwrap();

        let lines = describe_change(&prev, &next);
        assert!(lines.iter().any(|l| l.ends_with("-> final")));
        assert!(lines.contains(&format!("document removed: {}", removed.title)));
    }

    #[test]
    fn reports_rename() {
        let prev = seed_state();
        let mut next = prev.clone();
        next.rename_user("Dana").unwrap();
        assert_eq!(describe_change(&prev, &next), vec!["user renamed: Asma -> Dana"]);
    }

    #[test]
    fn identical_snapshots_still_report_something() {
        let s = seed_state();
        assert_eq!(describe_change(&s, &s), vec!["state rewritten"]);
    }
}
