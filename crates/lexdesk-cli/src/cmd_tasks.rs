use clap::Subcommand;
use lexdesk_core::{ids, AppState, NewTask, Task, TaskPriority, TaskStatus};
use lexdesk_store::StateStore;
use time::OffsetDateTime;

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum TasksCmd {
    /// List tasks that are not done
    List {
        /// Include completed tasks
        #[arg(long)]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a task
    Add {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// low, medium, high, urgent
        #[arg(long, default_value = "medium")]
        priority: String,
        #[arg(long, default_value = "")]
        tag: String,
        #[arg(long, default_value = "")]
        client: String,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long, default_value = "")]
        due: String,
    },
    /// Mark a task done
    Done {
        /// Task ID (task_*)
        id: String,
    },
    /// Mark open tasks past their due time as overdue
    Sweep,
}

// ── Dispatch ──

pub fn run(cmd: TasksCmd, store: &StateStore) -> anyhow::Result<()> {
    match cmd {
        TasksCmd::List { all, json } => list(store, all, json),
        TasksCmd::Add {
            title,
            description,
            priority,
            tag,
            client,
            due,
        } => {
            let priority: TaskPriority = priority.parse()?;
            if !due.is_empty() && ids::parse_timestamp(&due).is_none() {
                anyhow::bail!("unrecognised due date: {due}");
            }
            let task = Task::new(NewTask {
                title,
                description,
                priority,
                tag,
                client,
                due_at: due,
            });
            let id = task.id.clone();
            store.try_mutate(|s| s.add_task(task))?;
            println!("Added {id}");
            Ok(())
        }
        TasksCmd::Done { id } => {
            store.try_mutate(|s| s.complete_task(&id))?;
            println!("Done: {id}");
            Ok(())
        }
        TasksCmd::Sweep => {
            let now = OffsetDateTime::now_utc();
            let (_, changed) = store.try_mutate(|s| Ok(s.sweep_overdue(now)))?;
            println!("{changed} task(s) marked overdue");
            Ok(())
        }
    }
}

// ── Command Implementations ──

/// Header counters of the task list.
#[derive(Debug, PartialEq, Eq)]
pub struct TaskCounts {
    pub active: usize,
    pub due_today: usize,
    pub overdue: usize,
}

pub fn counts(state: &AppState, today: &str) -> TaskCounts {
    let active: Vec<&Task> = state
        .tasks
        .iter()
        .filter(|t| t.status != TaskStatus::Done)
        .collect();
    TaskCounts {
        active: active.len(),
        due_today: active
            .iter()
            .filter(|t| t.due_at.get(..10) == Some(today))
            .count(),
        overdue: active
            .iter()
            .filter(|t| t.status == TaskStatus::Overdue)
            .count(),
    }
}

fn list(store: &StateStore, all: bool, json: bool) -> anyhow::Result<()> {
    let state = store.load();
    let mut tasks: Vec<&Task> = state
        .tasks
        .iter()
        .filter(|t| all || t.status != TaskStatus::Done)
        .collect();
    tasks.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.due_at.cmp(&b.due_at)));

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    let c = counts(&state, &ids::today());
    println!(
        "Active: {}   Due today: {}   Overdue: {}\n",
        c.active, c.due_today, c.overdue
    );
    if tasks.is_empty() {
        println!("Nothing to do.");
        return Ok(());
    }
    let now = OffsetDateTime::now_utc();
    for task in tasks {
        println!("{}", task_line(task, now));
        if !task.description.is_empty() {
            println!("    {}", task.description);
        }
    }
    Ok(())
}

fn task_line(task: &Task, now: OffsetDateTime) -> String {
    let mut status = task.status.as_str().to_string();
    if task.status != task.effective_status(now) {
        status.push_str(" (past due)");
    }
    let mut line = format!(
        "{:<31} {:<7} {:<18} {}",
        task.id,
        task.priority.as_str(),
        status,
        task.title
    );
    if !task.tag.is_empty() {
        line.push_str(&format!("  #{}", task.tag));
    }
    if !task.due_at.is_empty() {
        line.push_str(&format!("  due {}", task.due_at));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexdesk_store::MemoryBackend;
    use std::sync::Arc;

    fn task(title: &str, due: &str) -> Task {
        Task::new(NewTask {
            title: title.to_string(),
            due_at: due.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn counts_ignore_done_tasks() {
        let mut state = AppState::default();
        state.tasks.push(task("a", "2026-03-01T09:00:00Z"));
        state.tasks.push(task("b", "2026-03-02"));
        let mut done = task("c", "2026-03-01");
        done.status = TaskStatus::Done;
        state.tasks.push(done);
        let mut late = task("d", "2026-02-01");
        late.status = TaskStatus::Overdue;
        state.tasks.push(late);

        assert_eq!(
            counts(&state, "2026-03-01"),
            TaskCounts {
                active: 3,
                due_today: 1,
                overdue: 1,
            }
        );
    }

    #[test]
    fn task_line_flags_past_due_open_tasks() {
        let t = task("File motion", "2026-01-01");
        let line = task_line(&t, ids::parse_timestamp("2026-02-01").unwrap());
        assert!(line.contains("open (past due)"));
        let line = task_line(&t, ids::parse_timestamp("2025-12-01").unwrap());
        assert!(!line.contains("past due"));
    }

    #[test]
    fn sweep_persists_overdue() {
        let store = StateStore::new(Arc::new(MemoryBackend::new()));
        let t = task("Old", "2000-01-01");
        let id = t.id.clone();
        store.try_mutate(|s| s.add_task(t)).unwrap();

        run(TasksCmd::Sweep, &store).unwrap();
        assert_eq!(store.load().task(&id).unwrap().status, TaskStatus::Overdue);
    }

    #[test]
    fn add_rejects_bad_due_date() {
        let store = StateStore::new(Arc::new(MemoryBackend::new()));
        let cmd = TasksCmd::Add {
            title: "x".to_string(),
            description: String::new(),
            priority: "high".to_string(),
            tag: String::new(),
            client: String::new(),
            due: "next tuesday".to_string(),
        };
        assert!(run(cmd, &store).is_err());
    }
}
