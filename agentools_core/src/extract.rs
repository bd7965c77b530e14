//! Bracket-matching extraction of the first JSON object in free text.

/// Returns the first top-level `{ … }` group found in `text`.
///
/// Scanning starts at the first `{` and tracks nesting depth until it
/// returns to zero; anything before or after the group is ignored. Braces
/// inside string literals count like any other brace. `None` means no
/// opening brace exists or the group never closes.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;

    for (offset, byte) in text.as_bytes()[start..].iter().enumerate() {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }

    None
}
