/// Check if a channel takes part in history reconciliation.
///
/// An empty allowlist lets every channel through.
/// Entries are matched case-insensitively against the channel name.
/// Supports exact match and glob-style `*` wildcards.
pub fn is_allowed(channel: &str, allowlist: &[String]) -> bool {
    if allowlist.is_empty() {
        return true;
    }
    let channel = channel.to_lowercase();
    allowlist.iter().any(|pattern| {
        let pattern = pattern.trim_start_matches('#').to_lowercase();
        if pattern.contains('*') {
            glob_match(&pattern, &channel)
        } else {
            pattern == channel
        }
    })
}

/// Glob matching with `*` standing for any run of characters.
fn glob_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };
    let middle: Vec<&str> = parts.collect();
    let Some((last, middle)) = middle.split_last() else {
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}
