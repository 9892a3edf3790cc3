use serde_json::Value;

/// Map selected rows (`{"metadata": {...}}`) to document titles.
///
/// Rows without a non-empty string `metadata.title` are dropped. Order is
/// preserved and repeated titles are kept.
pub fn extract_titles(rows: &[Value]) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.get("metadata")?.get("title")?.as_str())
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .collect()
}
