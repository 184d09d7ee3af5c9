use std::fmt::Write;

use crate::domain::SearchResultItem;

/// Render provider results as a numbered text block for the calling model.
pub fn format_results(query: &str, results: &[SearchResultItem]) -> String {
    if results.is_empty() {
        return format!("No results found for '{query}'.");
    }

    let mut out = format!("Search results for '{query}':\n\n");
    for (rank, item) in results.iter().enumerate() {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{}. **{}**", rank + 1, item.title);
        if let Some(url) = non_empty(&item.url) {
            let _ = writeln!(out, "   URL: {url}");
        }
        if let Some(snippet) = non_empty(&item.snippet) {
            let _ = writeln!(out, "   {snippet}");
        }
        out.push('\n');
    }
    out
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.trim().is_empty())
}
