//! Recovery parsing for legacy alternative-name columns.
//!
//! Older rows carry escaped or nested array syntax from a previous storage
//! layer: `{"Name 1","Name 2"}`, `["Name 1", "Name 2"]`, or a bare
//! comma-separated string. New rows are plain JSON arrays.

/// Parse an alternative-names column defensively.
///
/// Order: JSON array first; then brace-wrapped arrays (quoted runs
/// extracted, else comma-split outside quotes); else comma-split. Fragments
/// shorter than two characters or starting with a backslash are dropped.
pub fn parse_legacy_array(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    if let Ok(serde_json::Value::Array(items)) = serde_json::from_str(trimmed) {
        return clean(items.into_iter().filter_map(|v| match v {
            serde_json::Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }));
    }

    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        let inner = &trimmed[1..trimmed.len() - 1];
        let quoted = extract_quoted(inner);
        if !quoted.is_empty() {
            return clean(quoted);
        }
        return clean(split_outside_quotes(inner));
    }

    clean(split_outside_quotes(trimmed))
}

fn extract_quoted(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in s.chars() {
        match c {
            '"' if in_quotes => {
                out.push(std::mem::take(&mut current));
                in_quotes = false;
            }
            '"' => in_quotes = true,
            _ if in_quotes => current.push(c),
            _ => {}
        }
    }
    out
}

fn split_outside_quotes(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in s.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => out.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    out.push(current);
    out
}

fn clean<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    items
        .into_iter()
        .map(|s| s.trim().trim_matches('"').trim().to_string())
        .filter(|s| s.len() >= 2 && !s.starts_with('\\'))
        .collect()
}
