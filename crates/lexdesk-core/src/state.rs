use time::OffsetDateTime;

use crate::error::StateError;
use crate::ids::{new_id, now_rfc3339, parse_timestamp, today};
use crate::types::{
    AnalysisResult, AppState, CalendarEvent, Document, DocumentStatus, DocumentType, Task,
    TaskPriority, TaskStatus,
};

/// Fields supplied when creating a document. Id and timestamps are generated.
#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub title: String,
    pub doc_type: DocumentType,
    pub client: String,
    pub matter: String,
    pub jurisdiction: String,
    pub summary: String,
    pub content: String,
    pub meta: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    pub fn new(params: NewDocument) -> Self {
        let title = if params.title.trim().is_empty() {
            default_title(params.doc_type, &params.client)
        } else {
            params.title
        };
        Self {
            id: new_id("doc"),
            title,
            doc_type: params.doc_type,
            status: DocumentStatus::Draft,
            client: params.client,
            matter: params.matter,
            jurisdiction: params.jurisdiction,
            created_at: today(),
            updated_at: Some(now_rfc3339()),
            summary: params.summary,
            content: params.content,
            meta: params.meta,
        }
    }

    /// The analysis attached by [`AppState::attach_analysis`], if any.
    pub fn last_analysis(&self) -> Option<AnalysisResult> {
        self.meta
            .get("lastAnalysis")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// `<Type label> - <client>`, with `Client` standing in for a blank client.
pub fn default_title(doc_type: DocumentType, client: &str) -> String {
    let client = client.trim();
    let client = if client.is_empty() { "Client" } else { client };
    format!("{} - {}", doc_type.label(), client)
}

/// Fields supplied when creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub tag: String,
    pub client: String,
    pub due_at: String,
}

impl Task {
    pub fn new(params: NewTask) -> Self {
        Self {
            id: new_id("task"),
            title: params.title,
            description: params.description,
            priority: params.priority,
            tag: params.tag,
            client: params.client,
            due_at: params.due_at,
            status: TaskStatus::Open,
        }
    }

    /// Clock-derived status: an open task whose due time has passed reads as
    /// overdue. Never mutates the stored status.
    pub fn effective_status(&self, now: OffsetDateTime) -> TaskStatus {
        match self.status {
            TaskStatus::Open if self.is_past_due(now) => TaskStatus::Overdue,
            status => status,
        }
    }

    fn is_past_due(&self, now: OffsetDateTime) -> bool {
        parse_timestamp(&self.due_at).is_some_and(|due| due < now)
    }
}

impl CalendarEvent {
    pub fn new(title: &str, date: &str) -> Self {
        Self {
            id: new_id("evt"),
            title: title.to_string(),
            date: date.to_string(),
            client: String::new(),
            notes: String::new(),
        }
    }

    /// The `YYYY-MM-DD` part of `date`.
    pub fn day(&self) -> &str {
        self.date.get(..10).unwrap_or(&self.date)
    }
}

// ── Operations ──
//
// Each operation is meant to run inside a store mutation against a private
// copy. Operations that fail return before touching the state.

impl AppState {
    /// Recompute counters derived from collection sizes.
    pub fn reconcile_metrics(&mut self) {
        self.metrics.total_documents = self.documents.len() as u64;
    }

    /// Give a fresh id to every record that was stored without one, so
    /// id-addressed operations can reach it. Returns how many were assigned.
    pub fn fill_missing_ids(&mut self) -> usize {
        let mut assigned = 0;
        let docs = self.documents.iter_mut().map(|d| (&mut d.id, "doc"));
        let tasks = self.tasks.iter_mut().map(|t| (&mut t.id, "task"));
        let events = self.events.iter_mut().map(|e| (&mut e.id, "evt"));
        for (id, prefix) in docs.chain(tasks).chain(events) {
            if id.trim().is_empty() {
                *id = new_id(prefix);
                assigned += 1;
            }
        }
        assigned
    }

    pub fn document(&self, id: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    fn document_mut(&mut self, id: &str) -> Result<&mut Document, StateError> {
        self.documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StateError::DocumentNotFound(id.to_string()))
    }

    /// Insert a document at the front (newest first).
    pub fn insert_document(&mut self, doc: Document) -> Result<(), StateError> {
        if self.document(&doc.id).is_some() {
            return Err(StateError::DuplicateId(doc.id));
        }
        self.documents.insert(0, doc);
        self.reconcile_metrics();
        Ok(())
    }

    /// Remove exactly one document by id.
    pub fn remove_document(&mut self, id: &str) -> Result<Document, StateError> {
        let idx = self
            .documents
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| StateError::DocumentNotFound(id.to_string()))?;
        let removed = self.documents.remove(idx);
        self.reconcile_metrics();
        Ok(removed)
    }

    pub fn set_document_status(
        &mut self,
        id: &str,
        status: DocumentStatus,
    ) -> Result<(), StateError> {
        let doc = self.document_mut(id)?;
        doc.status = status;
        doc.updated_at = Some(now_rfc3339());
        Ok(())
    }

    /// Store `result` under `meta.lastAnalysis` and count the analysis.
    pub fn attach_analysis(&mut self, id: &str, result: &AnalysisResult) -> Result<(), StateError> {
        let value = serde_json::to_value(result).unwrap_or_default();
        let now = now_rfc3339();
        let doc = self.document_mut(id)?;
        doc.meta.insert("lastAnalysis".to_string(), value);
        doc.meta
            .insert("lastAnalysisAt".to_string(), serde_json::Value::String(now.clone()));
        doc.updated_at = Some(now);
        self.metrics.case_analyses += 1;
        Ok(())
    }

    pub fn record_generation(&mut self) {
        self.metrics.ai_generations += 1;
    }

    pub fn add_task(&mut self, task: Task) -> Result<(), StateError> {
        if task.title.trim().is_empty() {
            return Err(StateError::Empty { field: "task title" });
        }
        if self.task(&task.id).is_some() {
            return Err(StateError::DuplicateId(task.id));
        }
        self.tasks.push(task);
        Ok(())
    }

    pub fn complete_task(&mut self, id: &str) -> Result<(), StateError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StateError::TaskNotFound(id.to_string()))?;
        task.status = TaskStatus::Done;
        Ok(())
    }

    /// Persist `open -> overdue` for every open task past its due time.
    /// Returns how many tasks changed.
    pub fn sweep_overdue(&mut self, now: OffsetDateTime) -> usize {
        let mut changed = 0;
        for task in &mut self.tasks {
            if task.status == TaskStatus::Open && task.is_past_due(now) {
                task.status = TaskStatus::Overdue;
                changed += 1;
            }
        }
        changed
    }

    pub fn rename_user(&mut self, name: &str) -> Result<(), StateError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StateError::Empty { field: "user name" });
        }
        self.user.name = name.to_string();
        Ok(())
    }

    pub fn add_event(&mut self, event: CalendarEvent) -> Result<(), StateError> {
        if event.title.trim().is_empty() {
            return Err(StateError::Empty { field: "event title" });
        }
        if parse_timestamp(&event.date).is_none() && parse_timestamp(event.day()).is_none() {
            return Err(StateError::UnknownValue {
                kind: "date",
                value: event.date,
            });
        }
        self.events.push(event);
        Ok(())
    }

    /// Events whose date falls on `day` (`YYYY-MM-DD`).
    pub fn events_on(&self, day: &str) -> Vec<&CalendarEvent> {
        self.events.iter().filter(|e| e.day() == day).collect()
    }
}
