//! Document drafting helpers: the generator prompt and an offline template.

use crate::types::DocumentType;

/// System prompt sent with every drafting request.
pub const DRAFTING_SYSTEM_PROMPT: &str = "You are a careful legal drafting assistant. Draft professional documents, avoid hallucinating facts, and use placeholders when details are missing.";

const NOT_PROVIDED: &str = "(not provided)";
const NONE_GIVEN: &str = "(none)";

/// Inputs of the document generator form.
#[derive(Debug, Clone)]
pub struct DraftRequest {
    pub doc_type: DocumentType,
    pub title: String,
    pub client: String,
    pub matter: String,
    pub jurisdiction: String,
    pub tone: String,
    pub key_terms: String,
    pub notes: String,
}

impl Default for DraftRequest {
    fn default() -> Self {
        Self {
            doc_type: DocumentType::Nda,
            title: String::new(),
            client: String::new(),
            matter: String::new(),
            jurisdiction: "Ontario, Canada".to_string(),
            tone: "Professional".to_string(),
            key_terms: String::new(),
            notes: String::new(),
        }
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

impl DraftRequest {
    /// The user prompt sent to the completion endpoint.
    pub fn prompt(&self) -> String {
        format!(
            "Draft a {doc_type}.

Client: {client}
Matter/Context: {matter}
Jurisdiction: {jurisdiction}
Tone: {tone}

Key terms / constraints (must include if relevant):
{key_terms}

Additional notes:
{notes}

Output requirements:
- Use clear headings and numbered clauses.
- Keep it practical and readable.
- Include standard sections for this document type.
- Add placeholders where information is missing (e.g., [Effective Date], [Disclosing Party]).
- Provide the final document text only (no commentary).",
            doc_type = self.doc_type.label(),
            client = or_placeholder(&self.client, NOT_PROVIDED),
            matter = or_placeholder(&self.matter, NOT_PROVIDED),
            jurisdiction = or_placeholder(&self.jurisdiction, NOT_PROVIDED),
            tone = or_placeholder(&self.tone, "Professional"),
            key_terms = or_placeholder(&self.key_terms, NONE_GIVEN),
            notes = or_placeholder(&self.notes, NONE_GIVEN),
        )
    }

    /// Metadata stored on the saved document.
    pub fn meta(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut meta = serde_json::Map::new();
        for (key, value) in [
            ("jurisdiction", &self.jurisdiction),
            ("tone", &self.tone),
            ("keyTerms", &self.key_terms),
            ("notes", &self.notes),
        ] {
            meta.insert(key.to_string(), serde_json::Value::String(value.clone()));
        }
        meta
    }
}

/// Offline document body used when no completion endpoint is available.
pub fn template_body(req: &DraftRequest, date: &str) -> String {
    let title = if req.title.trim().is_empty() {
        req.doc_type.as_str().to_uppercase()
    } else {
        req.title.clone()
    };
    let mut body = format!("{title}\nClient: {}\nDate: {date}\n", req.client);
    if !req.jurisdiction.trim().is_empty() {
        body.push_str(&format!("\nJurisdiction: {}", req.jurisdiction));
    }
    if !req.notes.trim().is_empty() {
        body.push_str(&format!("\nNotes: {}", req.notes));
    }
    body.push_str("\n---\nThis document was generated for demo purposes. Replace placeholders and have a licensed attorney review before use.\n");
    body
}

/// Cheap local summary: the first six non-empty lines joined by spaces.
pub fn summarize_text(text: &str) -> String {
    let taken: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(6)
        .collect();
    if taken.is_empty() {
        "No content provided.".to_string()
    } else {
        taken.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_fills_placeholders() {
        let req = DraftRequest {
            client: "Acme".into(),
            jurisdiction: String::new(),
            ..Default::default()
        };
        let p = req.prompt();
        assert!(p.starts_with("Draft a NDA."));
        assert!(p.contains("Client: Acme"));
        assert!(p.contains("Matter/Context: (not provided)"));
        assert!(p.contains("Jurisdiction: (not provided)"));
        assert!(p.contains("Additional notes:\n(none)"));
    }

    #[test]
    fn template_includes_optional_sections() {
        let req = DraftRequest {
            client: "Acme".into(),
            notes: "rush".into(),
            ..Default::default()
        };
        let body = template_body(&req, "2026-01-01");
        assert!(body.starts_with("NDA\nClient: Acme\nDate: 2026-01-01\n"));
        assert!(body.contains("Jurisdiction: Ontario, Canada"));
        assert!(body.contains("Notes: rush"));
        assert!(body.contains("licensed attorney"));
    }

    #[test]
    fn summarize_takes_first_six_lines() {
        let text = "a\n\nb\nc\nd\ne\nf\ng";
        assert_eq!(summarize_text(text), "a b c d e f");
        assert_eq!(summarize_text("\n\n"), "No content provided.");
    }

    #[test]
    fn meta_records_form_inputs() {
        let req = DraftRequest {
            key_terms: "12 months".into(),
            ..Default::default()
        };
        let meta = req.meta();
        assert_eq!(meta["keyTerms"], "12 months");
        assert_eq!(meta["tone"], "Professional");
    }
}
