use async_trait::async_trait;
use html_escape::encode_text;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// DocumentSection
///
/// One headed block of a printable document. Rows are flat JSON objects; their keys
/// become the table columns.
#[derive(Debug, Clone, Default)]
pub struct DocumentSection {
    pub heading: String,
    pub rows: Vec<Value>,
}

/// DocumentRequest
///
/// Content description handed to the document generator.
#[derive(Debug, Clone, Default)]
pub struct DocumentRequest {
    pub title: String,
    pub sections: Vec<DocumentSection>,
}

/// PrintableDocument
#[derive(Debug, Clone)]
pub struct PrintableDocument {
    pub content_type: &'static str,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document generator failed: {0}")]
    Generator(String),
}

/// DocumentGenerator
///
/// Black-box converter from a content description to a print-ready artifact. Report
/// screens call it; the navigation core never does.
#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    async fn render(&self, request: &DocumentRequest) -> Result<PrintableDocument, DocumentError>;
}

/// HtmlDocumentGenerator
///
/// Produces a self-contained HTML page with print styles, one table per section. All
/// content is escaped.
#[derive(Clone, Default)]
pub struct HtmlDocumentGenerator;

impl HtmlDocumentGenerator {
    pub fn new() -> Self {
        Self
    }
}

const PRINT_STYLE: &str = "body{font-family:sans-serif;margin:2rem}\
table{border-collapse:collapse;width:100%;margin-bottom:1.5rem}\
th,td{border:1px solid #999;padding:4px 8px;text-align:left}\
@media print{body{margin:0}}";

#[async_trait]
impl DocumentGenerator for HtmlDocumentGenerator {
    async fn render(&self, request: &DocumentRequest) -> Result<PrintableDocument, DocumentError> {
        let title = encode_text(&request.title);
        let mut html = format!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title>\
             <style>{PRINT_STYLE}</style></head><body><h1>{title}</h1>"
        );
        for section in &request.sections {
            html.push_str(&format!("<h2>{}</h2>", encode_text(&section.heading)));
            html.push_str(&render_table(&section.rows));
        }
        html.push_str("</body></html>");
        Ok(PrintableDocument {
            content_type: "text/html; charset=utf-8",
            body: html,
        })
    }
}

fn render_table(rows: &[Value]) -> String {
    if rows.is_empty() {
        return "<p>No records.</p>".to_string();
    }
    // Columns in first-seen order across all rows.
    let mut columns: Vec<&str> = Vec::new();
    for row in rows {
        if let Value::Object(map) = row {
            for key in map.keys() {
                if !columns.contains(&key.as_str()) {
                    columns.push(key);
                }
            }
        }
    }

    let mut table = String::from("<table><thead><tr>");
    for column in &columns {
        table.push_str(&format!("<th>{}</th>", encode_text(column)));
    }
    table.push_str("</tr></thead><tbody>");
    for row in rows {
        table.push_str("<tr>");
        for column in &columns {
            let cell = match row.get(*column) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };
            table.push_str(&format!("<td>{}</td>", encode_text(&cell)));
        }
        table.push_str("</tr>");
    }
    table.push_str("</tbody></table>");
    table
}

/// MockDocumentGenerator
///
/// Test double that records nothing and returns a fixed body, or fails on request.
#[derive(Clone, Default)]
pub struct MockDocumentGenerator {
    pub should_fail: bool,
}

impl MockDocumentGenerator {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl DocumentGenerator for MockDocumentGenerator {
    async fn render(&self, request: &DocumentRequest) -> Result<PrintableDocument, DocumentError> {
        if self.should_fail {
            return Err(DocumentError::Generator(
                "Mock generator error: simulation requested".to_string(),
            ));
        }
        Ok(PrintableDocument {
            content_type: "text/plain; charset=utf-8",
            body: format!("{} ({} sections)", request.title, request.sections.len()),
        })
    }
}

/// DocumentState
///
/// Shared handle to the document generator inside the application state.
pub type DocumentState = Arc<dyn DocumentGenerator>;
