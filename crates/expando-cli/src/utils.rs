use expando_core::{ExpandoError, Result, SnippetStore};
use uuid::Uuid;

/// One-line preview of an expansion for listings.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' || c == '\t' { ' ' } else { c })
        .collect();
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut)
}

/// Accept either a snippet ID or a stored trigger.
pub fn resolve_snippet_id(store: &SnippetStore, key: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(key.trim()) {
        if store.get(id).is_some() {
            return Ok(id);
        }
    }
    store
        .find_by_trigger(key)
        .map(|s| s.id)
        .ok_or_else(|| ExpandoError::NotFound(key.to_string()))
}
