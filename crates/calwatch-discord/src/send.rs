/// Maximum characters per Discord message (2000 is the limit; we use 1950 for safety).
pub const CHUNK_MAX: usize = 1950;

/// Split `text` into chunks of at most [`CHUNK_MAX`] characters, preferring
/// splits on newline, then space, boundaries to avoid cutting lines mid-way.
pub fn split_chunks(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut remaining = text;

    // Byte offset of the first character past the limit, if any.
    while let Some((limit, _)) = remaining.char_indices().nth(CHUNK_MAX) {
        let window = &remaining[..limit];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .filter(|&at| at > 0)
            .unwrap_or(limit);

        chunks.push(remaining[..split_at].to_string());
        remaining = remaining[split_at..].trim_start();
    }

    if !remaining.is_empty() || chunks.is_empty() {
        chunks.push(remaining.to_string());
    }

    chunks
}

/// Send `text` to `channel_id` in ≤1950-char chunks, stopping at the first failure.
pub async fn send_chunked(
    http: &serenity::http::Http,
    channel_id: serenity::model::id::ChannelId,
    text: &str,
) -> Result<usize, serenity::Error> {
    let chunks = split_chunks(text);
    for chunk in &chunks {
        channel_id.say(http, chunk).await?;
    }
    Ok(chunks.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_len(s: &str) -> usize {
        s.chars().count()
    }

    #[test]
    fn short_text_is_single_chunk() {
        let chunks = split_chunks("Hello, world!");
        assert_eq!(chunks, vec!["Hello, world!"]);
    }

    #[test]
    fn long_text_splits_on_newline() {
        let line = "a".repeat(1000);
        let text = format!("{}\n{}", line, line);
        let chunks = split_chunks(&text);
        assert_eq!(chunks, vec![line.clone(), line]);
    }

    #[test]
    fn very_long_word_still_splits() {
        let text = "x".repeat(4000);
        let chunks = split_chunks(&text);
        assert_eq!(chunks.len(), 3);
        for c in &chunks {
            assert!(char_len(c) <= CHUNK_MAX);
        }
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        // 3-byte characters; a byte-based split would land mid-character
        let line = "会議".repeat(600);
        let text = format!("{line}\n{line}");
        let chunks = split_chunks(&text);
        assert_eq!(chunks.len(), 2);
        for c in &chunks {
            assert!(char_len(c) <= CHUNK_MAX, "chunk too large: {}", char_len(c));
        }
    }

    #[test]
    fn limit_is_counted_in_characters() {
        let text = "é".repeat(CHUNK_MAX);
        assert_eq!(split_chunks(&text).len(), 1);
    }

    #[test]
    fn bullet_lines_are_kept_whole() {
        let lines: Vec<String> = (0..200)
            .map(|i| format!("• **Event number {i}** - 2026/02/05 14:00"))
            .collect();
        let text = lines.join("\n");
        let chunks = split_chunks(&text);
        assert!(chunks.len() > 1);
        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.lines()).collect();
        assert_eq!(rejoined, lines.iter().map(String::as_str).collect::<Vec<_>>());
    }
}
