/// Keep the first `words` space-separated words of `text`, appending "..." when
/// anything was cut. Text with `words` or fewer words is returned unchanged.
pub fn truncate_words(text: &str, words: usize) -> String {
    let parts: Vec<&str> = text.split(' ').collect();
    if parts.len() <= words {
        return text.to_string();
    }
    format!("{}...", parts[..words].join(" "))
}

/// Bound `value` to `[min, max]`. Callers guarantee `min <= max`.
pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Split a reply into Discord-safe chunks (max 1990 chars), preferring line
/// then word boundaries.
pub fn chunk_message(text: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        let mut chunk_len = remaining.len().min(1990);
        while !remaining.is_char_boundary(chunk_len) {
            chunk_len -= 1;
        }
        let split_at = if chunk_len < remaining.len() {
            remaining[..chunk_len]
                .rfind('\n')
                .or_else(|| remaining[..chunk_len].rfind(' '))
                .map(|i| i + 1)
                .unwrap_or(chunk_len)
        } else {
            chunk_len
        };
        chunks.push(&remaining[..split_at]);
        remaining = &remaining[split_at..];
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_words("a b c", 5), "a b c");
        assert_eq!(truncate_words("a b c", 3), "a b c");
    }

    #[test]
    fn test_truncate_long_text() {
        assert_eq!(truncate_words("a b c d e f", 3), "a b c...");
    }

    #[test]
    fn test_truncate_zero_words() {
        assert_eq!(truncate_words("a b", 0), "...");
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(5, 0, 10), 5);
        assert_eq!(clamp(-1, 0, 10), 0);
        assert_eq!(clamp(11, 0, 10), 10);
        assert_eq!(clamp(0, 0, 0), 0);
    }

    #[test]
    fn test_chunk_message_splits_on_newline() {
        let line = "x".repeat(1500);
        let text = format!("{}\n{}", line, line);
        let chunks = chunk_message(&text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 1501);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_chunk_message_short() {
        assert_eq!(chunk_message("hello"), vec!["hello"]);
        assert!(chunk_message("").is_empty());
    }
}
