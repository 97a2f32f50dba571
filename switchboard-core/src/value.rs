pub type Value = serde_json::Value;

/// Compact single-line rendering of `value`, cut to at most `max_chars`
/// characters. Used for log lines and audit trail entries.
pub fn value_preview(value: &Value, max_chars: usize) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() <= max_chars {
        return rendered;
    }
    let mut cut: String = rendered.chars().take(max_chars).collect();
    cut.push_str("...");
    cut
}
