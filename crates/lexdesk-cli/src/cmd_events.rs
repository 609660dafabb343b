use clap::Subcommand;
use lexdesk_core::{ids, CalendarEvent};
use lexdesk_store::StateStore;

#[derive(Subcommand)]
pub enum EventsCmd {
    /// List events, optionally for one day
    List {
        /// Day to show (YYYY-MM-DD); `today` for the current day
        #[arg(long)]
        on: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an event
    Add {
        title: String,
        /// YYYY-MM-DD, optionally with a time
        #[arg(long)]
        date: String,
        #[arg(long, default_value = "")]
        client: String,
        #[arg(long, default_value = "")]
        notes: String,
    },
}

pub fn run(cmd: EventsCmd, store: &StateStore) -> anyhow::Result<()> {
    match cmd {
        EventsCmd::List { on, json } => {
            let state = store.load();
            let day = on.map(|d| if d == "today" { ids::today() } else { d });
            let mut events: Vec<&CalendarEvent> = match &day {
                Some(day) => state.events_on(day),
                None => state.events.iter().collect(),
            };
            events.sort_by(|a, b| a.date.cmp(&b.date));

            if json {
                println!("{}", serde_json::to_string_pretty(&events)?);
            } else if events.is_empty() {
                println!("No events.");
            } else {
                for e in events {
                    println!("{}", event_line(e));
                }
            }
            Ok(())
        }
        EventsCmd::Add {
            title,
            date,
            client,
            notes,
        } => {
            let mut event = CalendarEvent::new(&title, &date);
            event.client = client;
            event.notes = notes;
            let id = event.id.clone();
            store.try_mutate(|s| s.add_event(event))?;
            println!("Added {id}");
            Ok(())
        }
    }
}

fn event_line(e: &CalendarEvent) -> String {
    let mut line = format!("{:<16} {}", e.date, e.title);
    if !e.client.is_empty() {
        line.push_str(&format!("  ({})", e.client));
    }
    if !e.notes.is_empty() {
        line.push_str(&format!("\n    {}", e.notes));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexdesk_store::MemoryBackend;
    use std::sync::Arc;

    #[test]
    fn add_then_find_by_day() {
        let store = StateStore::new(Arc::new(MemoryBackend::new()));
        run(
            EventsCmd::Add {
                title: "Hearing".to_string(),
                date: "2026-05-04T10:00:00Z".to_string(),
                client: "Acme".to_string(),
                notes: String::new(),
            },
            &store,
        )
        .unwrap();

        let state = store.load();
        let found = state.events_on("2026-05-04");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].client, "Acme");
        assert!(state.events_on("2026-05-05").is_empty());
    }

    #[test]
    fn add_rejects_garbage_date() {
        let store = StateStore::new(Arc::new(MemoryBackend::new()));
        let cmd = EventsCmd::Add {
            title: "Hearing".to_string(),
            date: "soon".to_string(),
            client: String::new(),
            notes: String::new(),
        };
        assert!(run(cmd, &store).is_err());
    }

    #[test]
    fn event_line_includes_client() {
        let mut e = CalendarEvent::new("Call", "2026-05-04");
        e.client = "Globex".to_string();
        assert_eq!(event_line(&e), "2026-05-04       Call  (Globex)");
    }
}
