//! String utilities for the domain layer.

/// Truncate a string to a maximum length with ellipsis (UTF-8 safe)
///
/// Uses byte length for max_len but ensures truncation occurs at valid
/// UTF-8 character boundaries.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let target = max_len.saturating_sub(3);
        let mut end = target.min(s.len());
        while end > 0 && !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}

/// Lowercase a phrase and collapse punctuation and runs of whitespace into
/// single spaces, so keyword matching sees `"Guard-Duty?"` as `"guard duty"`.
pub fn normalize_phrase(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut pending_space = false;
    for ch in s.chars() {
        if ch.is_alphanumeric() || ch == '$' || ch == '%' {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.extend(ch.to_lowercase());
        } else if ch == '\'' {
            // "what's" → "whats"
            continue;
        } else {
            pending_space = true;
        }
    }
    out
}

/// Join items as an English list: `a`, `a and b`, `a, b and c`.
pub fn join_english(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
    }

    #[test]
    fn test_truncate_multibyte() {
        // 'é' is 2 bytes; cutting inside it must back up
        assert_eq!(truncate("café au lait", 30), "café au lait");
        assert_eq!(truncate("cafés au lait", 7), "caf...");
    }

    #[test]
    fn test_normalize_phrase() {
        assert_eq!(normalize_phrase("Guard-Duty?"), "guard duty");
        assert_eq!(normalize_phrase("  What's my   ROI "), "whats my roi");
        assert_eq!(normalize_phrase("us-west-2"), "us west 2");
    }

    #[test]
    fn test_join_english() {
        assert_eq!(join_english(&[]), "");
        assert_eq!(join_english(&["cost".to_string()]), "cost");
        assert_eq!(
            join_english(&["a".to_string(), "b".to_string(), "c".to_string()]),
            "a, b and c"
        );
    }
}
