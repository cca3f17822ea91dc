//! Requirement identifiers.
//!
//! An identifier is a dot-separated sequence of segments, each made of
//! alphanumerics or `_` (e.g. `Parser.ERR_NO_SUBJ`). Comparison is
//! case-sensitive.

/// Whether `c` may appear inside an identifier segment
pub fn is_segment_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether `c` may appear anywhere in an identifier
pub fn is_identifier_char(c: char) -> bool {
    is_segment_char(c) || c == '.'
}

/// Check that `s` is a well-formed identifier.
pub fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.split('.')
            .all(|segment| !segment.is_empty() && segment.chars().all(is_segment_char))
}

/// Remove inline emphasis markers (`*`) and collapse runs of whitespace.
///
/// Used to compare requirement prose against a document subject, where the
/// subject may be italicized in one place and plain in another.
pub fn plain_text(s: &str) -> String {
    let without_markers: String = s.chars().filter(|&c| c != '*').collect();
    without_markers.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Find the word under byte offset `byte` in `line`.
///
/// When the offset falls inside an emphasised span (`*...*` or `**...**`),
/// the whole span text is returned so free-text phrases resolve as a unit.
/// Otherwise the surrounding run of identifier characters is returned, with
/// trailing dots trimmed. Returns the byte range of the word and the word.
pub fn word_at(line: &str, byte: usize) -> Option<(std::ops::Range<usize>, &str)> {
    if byte > line.len() {
        return None;
    }

    if let Some(found) = emphasis_at(line, byte) {
        return Some(found);
    }

    let is_word = |c: char| is_identifier_char(c);
    let start = line[..byte]
        .char_indices()
        .rev()
        .take_while(|&(_, c)| is_word(c))
        .last()
        .map(|(i, _)| i)
        .unwrap_or(byte);
    let end = line[byte..]
        .char_indices()
        .find(|&(_, c)| !is_word(c))
        .map(|(i, _)| byte + i)
        .unwrap_or(line.len());

    let word = line[start..end].trim_matches('.');
    if word.is_empty() {
        return None;
    }
    let offset = start + line[start..end].find(word).unwrap_or(0);
    Some((offset..offset + word.len(), word))
}

fn emphasis_at(line: &str, byte: usize) -> Option<(std::ops::Range<usize>, &str)> {
    let mut search = 0;
    while let Some(open_rel) = line[search..].find('*') {
        let open = search + open_rel;
        let marker = if line[open..].starts_with("**") { 2 } else { 1 };
        let inner_start = open + marker;
        // A marker followed by whitespace is a bullet or a literal asterisk
        if line[inner_start..]
            .chars()
            .next()
            .is_none_or(char::is_whitespace)
        {
            search = inner_start;
            continue;
        }
        let closing = if marker == 2 { "**" } else { "*" };
        let close = inner_start + line[inner_start..].find(closing)?;
        if open <= byte && byte <= close + marker {
            let text = line[inner_start..close].trim();
            if text.is_empty() {
                return None;
            }
            let offset = inner_start + line[inner_start..close].find(text).unwrap_or(0);
            return Some((offset..offset + text.len(), text));
        }
        search = close + marker;
    }
    None
}
