use lexdesk_core::{ids, AppState, TaskStatus};
use lexdesk_store::StateStore;

use crate::cmd_tasks;

const RECENT_DOCUMENTS: usize = 3;

/// `lexdesk dashboard`
pub fn dashboard(store: &StateStore) -> anyhow::Result<()> {
    print!("{}", render_dashboard(&store.load(), &ids::today()));
    Ok(())
}

fn render_dashboard(state: &AppState, today: &str) -> String {
    let m = &state.metrics;
    let mut out = format!("Welcome back, {}\n\n", display_name(state));
    out.push_str(&format!(
        "Documents: {}   Case analyses: {}   AI generations: {}   Time saved: {}h\n",
        m.total_documents, m.case_analyses, m.ai_generations, m.time_saved_hours
    ));

    let c = cmd_tasks::counts(state, today);
    out.push_str(&format!(
        "Tasks: {} active, {} due today, {} overdue\n",
        c.active, c.due_today, c.overdue
    ));

    if !state.documents.is_empty() {
        out.push_str("\nRecent documents\n");
        for doc in state.documents.iter().take(RECENT_DOCUMENTS) {
            out.push_str(&format!("  {}  [{}]\n", doc.title, doc.status));
        }
    }

    let overdue: Vec<_> = state
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Overdue)
        .collect();
    if !overdue.is_empty() {
        out.push_str("\nOverdue\n");
        for t in overdue {
            out.push_str(&format!("  {} ({})\n", t.title, t.priority));
        }
    }

    let events = state.events_on(today);
    if !events.is_empty() {
        out.push_str("\nToday\n");
        for e in events {
            out.push_str(&format!("  {}\n", e.title));
        }
    }
    out
}

fn display_name(state: &AppState) -> &str {
    if state.user.name.trim().is_empty() {
        "there"
    } else {
        &state.user.name
    }
}

/// `lexdesk rename <name>`
pub fn rename(store: &StateStore, name: &str) -> anyhow::Result<()> {
    let (state, _) = store.try_mutate(|s| s.rename_user(name))?;
    println!("Name set to {}", state.user.name);
    Ok(())
}

/// `lexdesk reset --yes`
pub fn reset(store: &StateStore, yes: bool) -> anyhow::Result<()> {
    if !yes {
        anyhow::bail!("this discards every document, task and event; rerun with --yes");
    }
    let state = store.reset()?;
    println!(
        "Demo data restored ({} documents, {} tasks)",
        state.documents.len(),
        state.tasks.len()
    );
    Ok(())
}
