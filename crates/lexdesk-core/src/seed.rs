use crate::types::{
    AppState, Document, DocumentStatus, DocumentType, Metrics, Task, TaskPriority, TaskStatus,
    User, SCHEMA_VERSION,
};

/// The first-run state returned when nothing has been persisted yet.
pub fn seed_state() -> AppState {
    let documents = vec![
        seed_document(
            "doc_contract_1",
            "Contract",
            DocumentType::Agreement,
            DocumentStatus::Draft,
            "Adam",
            "Professional contract between Adam (Client) and another party.",
        ),
        seed_document(
            "doc_nda_1",
            "Non-Disclosure Agreement - Tech Startup",
            DocumentType::Nda,
            DocumentStatus::Final,
            "TechVenture Inc.",
            "Mutual NDA for a technology startup collaboration.",
        ),
        seed_document(
            "doc_emp_1",
            "Employment Contract - Senior Developer",
            DocumentType::Contract,
            DocumentStatus::Draft,
            "Global Solutions Ltd.",
            "Employment agreement for a senior developer role.",
        ),
        seed_document(
            "doc_priv_1",
            "Privacy Policy - E-Commerce Platform",
            DocumentType::PrivacyPolicy,
            DocumentStatus::Review,
            "ShopEasy Inc.",
            "Privacy policy for an e-commerce platform.",
        ),
    ];

    let tasks = vec![
        seed_task(
            "t1",
            "Review and finalize NDA for TechVenture Inc.",
            TaskPriority::High,
            "review",
            "TechVenture Inc.",
            "2025-12-20T17:00:00",
            "Complete final review of non-disclosure agreement, ensure all terms are properly defined and update signature page.",
        ),
        seed_task(
            "t2",
            "Research case law for Johnson employment case",
            TaskPriority::Urgent,
            "research",
            "Robert Johnson",
            "2025-12-21T12:00:00",
            "Find precedents for wrongful termination based on whistleblower retaliation in California.",
        ),
        seed_task(
            "t3",
            "Prepare exhibits for court hearing",
            TaskPriority::Urgent,
            "preparation",
            "Robert Johnson",
            "2025-12-21T18:00:00",
            "Organize and label all exhibits for Johnson v. ABC Corp hearing on 12/22.",
        ),
        seed_task(
            "t4",
            "Draft motion to compel discovery",
            TaskPriority::High,
            "drafting",
            "Smith Family",
            "2025-12-22T16:00:00",
            "Prepare motion to compel production of documents in Smith trust matter.",
        ),
        seed_task(
            "t5",
            "File petition with county clerk",
            TaskPriority::Urgent,
            "filing",
            "Robert Johnson",
            "2025-12-23T17:00:00",
            "Submit petition and confirm docketing with county clerk.",
        ),
    ];

    AppState {
        schema_version: SCHEMA_VERSION,
        user: User {
            name: "Asma".to_string(),
        },
        metrics: Metrics {
            total_documents: documents.len() as u64,
            case_analyses: 2,
            ai_generations: 7,
            time_saved_hours: 14.0,
        },
        documents,
        tasks,
        events: Vec::new(),
    }
}

fn seed_document(
    id: &str,
    title: &str,
    doc_type: DocumentType,
    status: DocumentStatus,
    client: &str,
    summary: &str,
) -> Document {
    Document {
        id: id.to_string(),
        title: title.to_string(),
        doc_type,
        status,
        client: client.to_string(),
        matter: String::new(),
        jurisdiction: String::new(),
        created_at: "2026-01-01".to_string(),
        updated_at: None,
        summary: summary.to_string(),
        content: String::new(),
        meta: serde_json::Map::new(),
    }
}

fn seed_task(
    id: &str,
    title: &str,
    priority: TaskPriority,
    tag: &str,
    client: &str,
    due_at: &str,
    description: &str,
) -> Task {
    Task {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        priority,
        tag: tag.to_string(),
        client: client.to_string(),
        due_at: due_at.to_string(),
        status: TaskStatus::Overdue,
    }
}
