use serde_json::{json, Value};

/// Wrap plain text in Jira's Atlassian Document Format (ADF). Blank lines
/// separate paragraphs; single newlines become hard breaks.
pub fn text_to_adf(text: &str) -> Value {
    let paragraphs: Vec<Value> = text
        .split("\n\n")
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            let mut content = Vec::new();
            for (i, line) in p.lines().enumerate() {
                if i > 0 {
                    content.push(json!({ "type": "hardBreak" }));
                }
                if !line.is_empty() {
                    content.push(json!({ "type": "text", "text": line }));
                }
            }
            json!({ "type": "paragraph", "content": content })
        })
        .collect();

    json!({ "type": "doc", "version": 1, "content": paragraphs })
}
