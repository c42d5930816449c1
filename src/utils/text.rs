/// Rough token estimate: four characters per token, not rounded.
pub fn estimate_tokens(text: &str) -> f64 {
    text.chars().count() as f64 / 4.0
}

/// First `max_chars` characters of `text`, with "..." appended when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// How far past a section's nominal end we look for a space to cut on.
const BREAK_LOOKAHEAD: usize = 100;

/// Splits `text` into `sections` contiguous pieces of roughly equal character
/// length. Each cut moves forward to the last space within a short lookahead
/// window past the nominal end so words stay whole, and stays at the nominal
/// end when that window has no space; the final piece absorbs the remainder. Concatenating the
/// pieces always yields `text` again.
pub fn split_sections(text: &str, sections: usize) -> Vec<&str> {
    let sections = sections.max(1);
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total_chars = boundaries.len() - 1;
    if sections == 1 || total_chars == 0 {
        return vec![text];
    }

    let section_chars = total_chars / sections;
    let mut out = Vec::with_capacity(sections);
    let mut start = 0usize;

    for i in 0..sections {
        if start >= total_chars {
            break;
        }
        if i == sections - 1 {
            out.push(&text[boundaries[start]..]);
            break;
        }

        let target = ((i + 1) * section_chars).max(start + 1).min(total_chars);
        let window_end = (target + BREAK_LOOKAHEAD).min(total_chars);
        let mut end = target;
        for c in (target..window_end).rev() {
            if text[boundaries[c]..].starts_with(' ') {
                end = c;
                break;
            }
        }

        out.push(&text[boundaries[start]..boundaries[end]]);
        start = end;
    }

    out
}
