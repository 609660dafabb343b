use std::io::Read;
use std::path::Path;

use anyhow::Context;
use lexdesk_core::AnalysisResult;

use crate::ai_call;

/// `lexdesk analyze [TEXT] [--file PATH]`: analyze text without saving it.
pub fn execute(text: Option<&str>, file: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let text = match (text, file) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?,
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let client = ai_call::client_from_env();
    let result = ai_call::interruptible("Analyzing", move || {
        lexdesk_ai::analyze(ai_call::as_dyn(&client), Some(text.as_str()))
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_analysis(&result);
    }
    Ok(())
}

pub fn print_analysis(result: &AnalysisResult) {
    print!("{}", render_analysis(result));
}

fn render_analysis(result: &AnalysisResult) -> String {
    let mut out = format!("Summary\n  {}\n", result.summary);
    let section = |out: &mut String, title: &str, items: &[String]| {
        if items.is_empty() {
            return;
        }
        out.push_str(&format!("\n{title}\n"));
        for item in items {
            out.push_str(&format!("  - {item}\n"));
        }
    };
    section(&mut out, "Risks", &result.risks);
    if !result.clauses.is_empty() {
        out.push_str("\nClauses\n");
        for clause in &result.clauses {
            if clause.excerpt.is_empty() {
                out.push_str(&format!("  - {}\n", clause.name));
            } else {
                out.push_str(&format!("  - {}: \"{}\"\n", clause.name, clause.excerpt));
            }
        }
    }
    section(&mut out, "Recommendations", &result.recommendations);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexdesk_core::Clause;

    #[test]
    fn render_skips_empty_sections() {
        let out = render_analysis(&AnalysisResult {
            summary: "Short NDA.".to_string(),
            ..Default::default()
        });
        assert_eq!(out, "Summary\n  Short NDA.\n");
    }

    #[test]
    fn render_lists_every_section() {
        let out = render_analysis(&AnalysisResult {
            summary: "S".to_string(),
            risks: vec!["No term".to_string()],
            clauses: vec![
                Clause {
                    name: "Confidentiality".to_string(),
                    excerpt: "shall not disclose".to_string(),
                },
                Clause {
                    name: "Governing law".to_string(),
                    excerpt: String::new(),
                },
            ],
            recommendations: vec!["Add a term".to_string()],
        });
        assert!(out.contains("Risks\n  - No term\n"));
        assert!(out.contains("  - Confidentiality: \"shall not disclose\"\n"));
        assert!(out.contains("  - Governing law\n"));
        assert!(out.contains("Recommendations\n  - Add a term\n"));
    }
}
