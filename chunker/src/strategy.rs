use crate::config::{ChunkerConfig, ChunkingStrategy};

/// A raw, untrimmed slice of the source text with its byte offsets.
pub(crate) struct Piece {
    pub content: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

pub(crate) fn split(text: &str, config: &ChunkerConfig) -> Vec<Piece> {
    match config.strategy {
        ChunkingStrategy::Fixed => split_fixed(text, config.chunk_size, config.chunk_overlap),
        ChunkingStrategy::Sentence => split_sentence(text, config.chunk_size),
        ChunkingStrategy::Markdown => split_markdown(text, config),
        ChunkingStrategy::Recursive => split_recursive(text, 0, &config.separators, config.chunk_size, config.chunk_overlap),
    }
}

/// Window of chunk_size advancing by chunk_size - overlap.
fn split_fixed(text: &str, chunk_size: usize, overlap: usize) -> Vec<Piece> {
    let chars: Vec<char> = text.chars().collect();
    let step = chunk_size - overlap;
    let mut pieces = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        let content: String = chars[start..end].iter().collect();
        pieces.push(Piece { content, start_offset: start, end_offset: end });
        if end == chars.len() {
            break;
        }
        start += step;
    }
    pieces
}

/// Splits on `.!?` followed by whitespace, greedily packing sentences until
/// chunk_size; never splits a sentence.
fn split_sentence(text: &str, chunk_size: usize) -> Vec<Piece> {
    let sentences = sentence_spans(text);
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_start: Option<usize> = None;
    let mut current_end = 0usize;

    for (start, end, sentence) in sentences {
        if !current.is_empty() && current.len() + sentence.len() > chunk_size {
            pieces.push(Piece {
                content: std::mem::take(&mut current),
                start_offset: current_start.unwrap_or(start),
                end_offset: current_end,
            });
            current_start = None;
        }
        if current.is_empty() {
            current_start = Some(start);
        } else {
            current.push(' ');
        }
        current.push_str(sentence);
        current_end = end;
    }
    if !current.is_empty() {
        pieces.push(Piece {
            content: current,
            start_offset: current_start.unwrap_or(0),
            end_offset: current_end,
        });
    }
    pieces
}

fn sentence_spans(text: &str) -> Vec<(usize, usize, &str)> {
    let mut spans = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        let c = bytes[i];
        if c == b'.' || c == b'!' || c == b'?' {
            let followed_by_space = bytes.get(i + 1).map(|b| b.is_ascii_whitespace()).unwrap_or(true);
            if followed_by_space {
                let end = i + 1;
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    spans.push((start, end, sentence));
                }
                start = end;
            }
        }
        i += 1;
    }
    if start < text.len() {
        let sentence = text[start..].trim();
        if !sentence.is_empty() {
            spans.push((start, text.len(), sentence));
        }
    }
    spans
}

/// Splits at headers (levels 1-6); sections exceeding chunk_size are
/// re-split by fixed; headers are prepended to their body chunk.
fn split_markdown(text: &str, config: &ChunkerConfig) -> Vec<Piece> {
    let mut sections: Vec<(usize, String)> = Vec::new();
    let mut offset = 0usize;
    let mut current_header: Option<String> = None;
    let mut current_body = String::new();
    let mut section_start = 0usize;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_end_matches('\n');
        if is_markdown_header(trimmed) {
            if current_header.is_some() || !current_body.trim().is_empty() {
                sections.push((section_start, render_section(&current_header, &current_body)));
            }
            current_header = Some(trimmed.to_string());
            current_body = String::new();
            section_start = offset;
        } else {
            current_body.push_str(line);
        }
        offset += line.len();
    }
    if current_header.is_some() || !current_body.trim().is_empty() {
        sections.push((section_start, render_section(&current_header, &current_body)));
    }

    if sections.is_empty() {
        return split_fixed(text, config.chunk_size, config.chunk_overlap);
    }

    let mut pieces = Vec::new();
    for (start, content) in sections {
        if content.len() <= config.chunk_size {
            let end = start + content.len();
            pieces.push(Piece { content, start_offset: start, end_offset: end });
        } else {
            for mut sub in split_fixed(&content, config.chunk_size, config.chunk_overlap) {
                sub.start_offset += start;
                sub.end_offset += start;
                pieces.push(sub);
            }
        }
    }
    pieces
}

fn is_markdown_header(line: &str) -> bool {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    (1..=6).contains(&hashes) && trimmed.as_bytes().get(hashes).map(|b| *b == b' ').unwrap_or(false)
}

fn render_section(header: &Option<String>, body: &str) -> String {
    match header {
        Some(h) => format!("{h}\n{body}"),
        None => body.to_string(),
    }
}

/// Tries separators in order; if a piece still exceeds chunk_size, recurse
/// with the next separator; finally applies overlap between adjacent pieces.
fn split_recursive(text: &str, base_offset: usize, separators: &[String], chunk_size: usize, overlap: usize) -> Vec<Piece> {
    if text.len() <= chunk_size || separators.is_empty() {
        return split_fixed(text, chunk_size, overlap)
            .into_iter()
            .map(|mut p| {
                p.start_offset += base_offset;
                p.end_offset += base_offset;
                p
            })
            .collect();
    }

    let (separator, rest) = (&separators[0], &separators[1..]);
    let raw_parts: Vec<&str> = if separator.is_empty() {
        text.split("").filter(|s| !s.is_empty()).collect()
    } else {
        text.split(separator.as_str()).collect()
    };

    let mut pieces = Vec::new();
    let mut offset = base_offset;
    let mut buffer = String::new();
    let mut buffer_start = base_offset;

    for (i, part) in raw_parts.iter().enumerate() {
        let candidate_len = buffer.len() + part.len() + separator.len();
        if !buffer.is_empty() && candidate_len > chunk_size {
            pieces.push(Piece {
                content: std::mem::take(&mut buffer),
                start_offset: buffer_start,
                end_offset: offset,
            });
            buffer_start = offset;
        }
        buffer.push_str(part);
        offset += part.len();
        if i + 1 < raw_parts.len() {
            buffer.push_str(separator);
            offset += separator.len();
        }
    }
    if !buffer.is_empty() {
        pieces.push(Piece { content: buffer, start_offset: buffer_start, end_offset: offset });
    }

    // Recurse into any piece that still exceeds chunk_size with the next separator.
    let mut final_pieces = Vec::new();
    for piece in pieces {
        if piece.content.len() > chunk_size && !rest.is_empty() {
            final_pieces.extend(split_recursive(&piece.content, piece.start_offset, rest, chunk_size, overlap));
        } else {
            final_pieces.push(piece);
        }
    }
    apply_overlap(final_pieces, overlap)
}

/// Prepends the tail of the previous piece to each subsequent piece so
/// adjacent chunks overlap by `overlap` characters.
fn apply_overlap(pieces: Vec<Piece>, overlap: usize) -> Vec<Piece> {
    if overlap == 0 || pieces.len() < 2 {
        return pieces;
    }
    let mut result = Vec::with_capacity(pieces.len());
    let mut previous_tail = String::new();
    for piece in pieces {
        let mut content = piece.content;
        if !previous_tail.is_empty() {
            let mut combined = previous_tail.clone();
            combined.push_str(&content);
            content = combined;
        }
        previous_tail = content.chars().rev().take(overlap).collect::<Vec<_>>().into_iter().rev().collect();
        result.push(Piece { content, start_offset: piece.start_offset, end_offset: piece.end_offset });
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkerConfig;

    #[test]
    fn fixed_strategy_respects_step() {
        let text = "x".repeat(1000);
        let pieces = split_fixed(&text, 200, 20);
        assert!(pieces.len() > 1);
        assert_eq!(pieces[0].content.len(), 200);
    }

    #[test]
    fn sentence_strategy_never_splits_a_sentence() {
        let text = "One. Two. Three. Four five six seven eight nine ten.";
        let pieces = split_sentence(text, 10);
        for piece in &pieces {
            assert!(piece.content.contains('.') || piece.content.len() < 10);
        }
    }

    #[test]
    fn markdown_strategy_prepends_header() {
        let text = "# Title\nbody text here\n## Sub\nmore body";
        let mut config = ChunkerConfig::default();
        config.strategy = crate::config::ChunkingStrategy::Markdown;
        let pieces = split_markdown(text, &config);
        assert!(pieces[0].content.starts_with("# Title"));
    }
}
