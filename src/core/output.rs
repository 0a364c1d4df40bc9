//! Terminal output helpers.

/// Collapse whitespace to single spaces and cut at `max_chars`.
pub fn compact_line(input: &str, max_chars: usize) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max_chars {
        return collapsed;
    }
    let cut: String = collapsed.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

/// `a | b | c (+2 more)`
pub fn preview_messages(messages: &[String], max_items: usize, max_chars: usize) -> String {
    let shown = messages
        .iter()
        .take(max_items)
        .map(|m| compact_line(m, max_chars))
        .collect::<Vec<_>>()
        .join(" | ");
    match messages.len().checked_sub(max_items) {
        Some(extra) if extra > 0 => format!("{} (+{} more)", shown, extra),
        _ => shown,
    }
}

pub fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}
