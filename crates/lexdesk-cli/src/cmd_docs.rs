use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;
use lexdesk_ai::CompletionClient;
use lexdesk_core::drafting::{summarize_text, template_body, DraftRequest, DRAFTING_SYSTEM_PROMPT};
use lexdesk_core::{ids, Document, DocumentStatus, NewDocument};
use lexdesk_store::StateStore;

use crate::ai_call;
use crate::cmd_analyze::print_analysis;

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum DocsCmd {
    /// List documents, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one document with its content and last analysis
    Show {
        /// Document ID (doc_*)
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save a document from existing text
    New {
        /// contract, nda, agreement, legal_letter, privacy_policy, terms, other
        #[arg(long = "type", default_value = "agreement")]
        doc_type: String,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        client: String,
        #[arg(long, default_value = "")]
        matter: String,
        /// Document text
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,
        /// Read the document text from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Draft a document with the model and save it
    Generate {
        #[arg(long = "type", default_value = "nda")]
        doc_type: String,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        client: String,
        #[arg(long, default_value = "")]
        matter: String,
        #[arg(long, default_value = "Ontario, Canada")]
        jurisdiction: String,
        #[arg(long, default_value = "Professional")]
        tone: String,
        /// Key terms or constraints the draft must include
        #[arg(long, default_value = "")]
        key_terms: String,
        #[arg(long, default_value = "")]
        notes: String,
        /// Use the offline template instead of the model
        #[arg(long)]
        offline: bool,
        /// Print the draft without saving it
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete a document
    Delete {
        /// Document ID (doc_*)
        id: String,
    },
    /// Set a document's status (draft, review, final)
    Status {
        /// Document ID (doc_*)
        id: String,
        status: String,
    },
    /// Analyze a document with the model and attach the result
    Analyze {
        /// Document ID (doc_*)
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

// ── Dispatch ──

pub fn run(cmd: DocsCmd, store: &StateStore) -> anyhow::Result<()> {
    match cmd {
        DocsCmd::List { json } => list(store, json),
        DocsCmd::Show { id, json } => show(store, &id, json),
        DocsCmd::New {
            doc_type,
            title,
            client,
            matter,
            content,
            file,
        } => {
            let content = match (content, file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("cannot read {}", path.display()))?,
                (None, None) => String::new(),
            };
            let id = save(
                store,
                NewDocument {
                    title,
                    doc_type: doc_type.parse()?,
                    client,
                    matter,
                    summary: summarize_text(&content),
                    content,
                    ..Default::default()
                },
                false,
            )?;
            println!("Saved {id}");
            Ok(())
        }
        DocsCmd::Generate {
            doc_type,
            title,
            client,
            matter,
            jurisdiction,
            tone,
            key_terms,
            notes,
            offline,
            dry_run,
        } => {
            let req = DraftRequest {
                doc_type: doc_type.parse()?,
                title,
                client,
                matter,
                jurisdiction,
                tone,
                key_terms,
                notes,
            };
            generate(store, req, offline, dry_run)
        }
        DocsCmd::Delete { id } => {
            let (_, removed) = store.try_mutate(|s| s.remove_document(&id))?;
            println!("Deleted {} ({})", removed.id, removed.title);
            Ok(())
        }
        DocsCmd::Status { id, status } => {
            let status: DocumentStatus = status.parse()?;
            store.try_mutate(|s| s.set_document_status(&id, status))?;
            println!("{id} is now {status}");
            Ok(())
        }
        DocsCmd::Analyze { id, json } => analyze(store, &id, json),
    }
}

// ── Command Implementations ──

fn list(store: &StateStore, json: bool) -> anyhow::Result<()> {
    let state = store.load();
    if json {
        println!("{}", serde_json::to_string_pretty(&state.documents)?);
        return Ok(());
    }
    if state.documents.is_empty() {
        println!("No documents.");
        return Ok(());
    }
    for doc in &state.documents {
        println!("{}", list_line(doc));
    }
    Ok(())
}

fn list_line(doc: &Document) -> String {
    let created = doc.created_at.get(..10).unwrap_or(&doc.created_at);
    format!(
        "{:<30} {:<6} {:<16} {:<20} {}  [{created}]",
        doc.id,
        doc.status.as_str(),
        doc.doc_type.label(),
        doc.client,
        doc.title
    )
}

fn show(store: &StateStore, id: &str, json: bool) -> anyhow::Result<()> {
    let state = store.load();
    let doc = state
        .document(id)
        .with_context(|| format!("document not found: {id}"))?;
    if json {
        println!("{}", serde_json::to_string_pretty(doc)?);
        return Ok(());
    }

    println!("{}", doc.title);
    println!("  id:      {}", doc.id);
    println!("  type:    {}", doc.doc_type.label());
    println!("  status:  {}", doc.status);
    if !doc.client.is_empty() {
        println!("  client:  {}", doc.client);
    }
    if !doc.matter.is_empty() {
        println!("  matter:  {}", doc.matter);
    }
    if !doc.jurisdiction.is_empty() {
        println!("  juris.:  {}", doc.jurisdiction);
    }
    println!("  created: {}", doc.created_at);
    if let Some(updated) = &doc.updated_at {
        println!("  updated: {updated}");
    }
    if !doc.summary.is_empty() {
        println!("\n{}", doc.summary);
    }
    if !doc.content.is_empty() {
        println!("\n{}", doc.content);
    }
    if let Some(analysis) = doc.last_analysis() {
        println!("\n── Last analysis ──");
        print_analysis(&analysis);
    }
    Ok(())
}

/// Insert a new document, counting it as an AI generation when `generated`.
fn save(store: &StateStore, params: NewDocument, generated: bool) -> anyhow::Result<String> {
    let doc = Document::new(params);
    let (_, id) = store.try_mutate(move |s| {
        let id = doc.id.clone();
        s.insert_document(doc)?;
        if generated {
            s.record_generation();
        }
        Ok(id)
    })?;
    Ok(id)
}

fn generate(
    store: &StateStore,
    req: DraftRequest,
    offline: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let client = if offline {
        None
    } else {
        ai_call::client_from_env()
    };

    let (content, generated) = match client {
        Some(client) => {
            let prompt = req.prompt();
            let draft = ai_call::interruptible("Generating draft", move || {
                lexdesk_ai::generate(
                    Some(&client as &dyn CompletionClient),
                    Some(prompt.as_str()),
                    Some(DRAFTING_SYSTEM_PROMPT),
                )
            })?;
            (draft.text, true)
        }
        None => {
            if !offline {
                eprintln!("OPENAI_API_KEY is not set; using the offline template.");
            }
            (template_body(&req, &ids::today()), false)
        }
    };

    if content.trim().is_empty() {
        anyhow::bail!("nothing to save: the model returned an empty draft");
    }
    if dry_run {
        println!("{content}");
        return Ok(());
    }

    let id = save(
        store,
        NewDocument {
            title: req.title.clone(),
            doc_type: req.doc_type,
            client: req.client.clone(),
            matter: req.matter.clone(),
            jurisdiction: req.jurisdiction.clone(),
            summary: summarize_text(&content),
            meta: req.meta(),
            content,
        },
        generated,
    )?;
    println!("Saved {id}");
    Ok(())
}

fn analyze(store: &StateStore, id: &str, json: bool) -> anyhow::Result<()> {
    let state = store.load();
    let doc = state
        .document(id)
        .with_context(|| format!("document not found: {id}"))?;
    let text = doc.content.clone();

    let client = ai_call::client_from_env();
    let result = ai_call::interruptible("Analyzing", move || {
        lexdesk_ai::analyze(ai_call::as_dyn(&client), Some(text.as_str()))
    })?;

    store.try_mutate(|s| s.attach_analysis(id, &result))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_analysis(&result);
    }
    Ok(())
}
