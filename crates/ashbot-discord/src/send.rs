//! Message chunking for the platform's 2000-character limit.

/// Maximum characters per message (2000 is the limit; 1950 leaves margin).
const CHUNK_MAX: usize = 1950;

/// Split `text` into chunks of at most [`CHUNK_MAX`] characters, preferring
/// newline then space boundaries so words survive intact.
pub fn split_chunks(text: &str) -> Vec<String> {
    if text.len() <= CHUNK_MAX {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;

    while remaining.len() > CHUNK_MAX {
        let boundary = remaining
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i <= CHUNK_MAX)
            .last()
            .unwrap_or(CHUNK_MAX);
        let window = &remaining[..boundary];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .unwrap_or(boundary);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    if !remaining.is_empty() {
        chunks.push(remaining.to_string());
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_passes_through() {
        assert_eq!(split_chunks("Affirmative."), vec!["Affirmative.".to_string()]);
    }

    #[test]
    fn splits_prefer_line_boundaries() {
        let text = format!("{}\n{}", "a".repeat(1_200), "b".repeat(1_200));
        let chunks = split_chunks(&text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].chars().all(|c| c == 'a'));
        assert!(chunks[1].chars().all(|c| c == 'b'));
    }

    #[test]
    fn unbroken_runs_split_hard() {
        let chunks = split_chunks(&"x".repeat(4_000));
        assert!(chunks.len() >= 3);
        assert!(chunks.iter().all(|c| c.len() <= CHUNK_MAX));
    }

    #[test]
    fn multibyte_text_never_splits_mid_character() {
        let chunks = split_chunks(&"é".repeat(2_000));
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().all(|c| c.len() <= CHUNK_MAX));
    }
}
