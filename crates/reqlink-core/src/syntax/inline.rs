//! Inline tokenizer: finds bold and italic spans on a single line.

use std::ops::Range as ByteRange;

use super::error::{LexicalError, SyntaxFailure};
use crate::span::column;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Emphasis {
    Bold,
    Italic,
}

impl Emphasis {
    fn marker(self) -> &'static str {
        match self {
            Emphasis::Bold => "**",
            Emphasis::Italic => "*",
        }
    }
}

/// An emphasised span on one line, in byte offsets
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Span {
    pub kind: Emphasis,
    /// Offsets of the text between the markers
    pub inner: ByteRange<usize>,
    /// Offsets including the markers
    pub outer: ByteRange<usize>,
}

impl Span {
    pub fn text<'a>(&self, line: &'a str) -> &'a str {
        &line[self.inner.clone()]
    }
}

/// Tokenize `line[from..]` into emphasis spans.
///
/// `line_no` is 0-based; errors report it 1-based. An unterminated marker
/// records a lexical error and ends tokenizing for the line.
pub(crate) fn lex_line(
    line: &str,
    from: usize,
    line_no: u32,
    errors: &mut Vec<SyntaxFailure>,
) -> Vec<Span> {
    let mut spans = Vec::new();
    let bytes = line.as_bytes();
    let mut i = from;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                // Escaped character, skip it whatever it is
                i += 1 + line[i + 1..].chars().next().map_or(0, char::len_utf8);
            }
            b'*' => {
                let kind = if bytes.get(i + 1) == Some(&b'*') {
                    Emphasis::Bold
                } else {
                    Emphasis::Italic
                };
                let marker = kind.marker();
                let inner_start = i + marker.len();

                // `* ` is a bullet or a literal asterisk, not an opener
                if line[inner_start..]
                    .chars()
                    .next()
                    .is_none_or(char::is_whitespace)
                {
                    i = inner_start;
                    continue;
                }

                let Some(close) = find_marker(line, inner_start, marker) else {
                    let what = match kind {
                        Emphasis::Bold => "bold",
                        Emphasis::Italic => "italic",
                    };
                    errors.push(SyntaxFailure::Lexical(LexicalError {
                        line: line_no + 1,
                        column: column(line, i),
                        token: Some(marker.to_string()),
                        message: format!("unterminated {what} text"),
                    }));
                    break;
                };

                let end = close + marker.len();
                spans.push(Span {
                    kind,
                    inner: inner_start..close,
                    outer: i..end,
                });
                i = end;
            }
            _ => i += 1,
        }
    }

    spans
}

/// Find the next unescaped occurrence of `marker` at or after `from`.
fn find_marker(line: &str, from: usize, marker: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 1 + line[i + 1..].chars().next().map_or(0, char::len_utf8);
            continue;
        }
        if bytes[i..].starts_with(marker.as_bytes()) {
            return Some(i);
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(line: &str) -> (Vec<Span>, Vec<SyntaxFailure>) {
        let mut errors = Vec::new();
        let spans = lex_line(line, 0, 0, &mut errors);
        (spans, errors)
    }

    #[test]
    fn bold_and_italic() {
        let line = "The *server* **shall** respond";
        let (spans, errors) = lex(line);
        assert!(errors.is_empty());
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].kind, Emphasis::Italic);
        assert_eq!(spans[0].text(line), "server");
        assert_eq!(spans[1].kind, Emphasis::Bold);
        assert_eq!(spans[1].text(line), "shall");
        assert_eq!(&line[spans[1].outer.clone()], "**shall**");
    }

    #[test]
    fn escaped_asterisks_are_literal() {
        let line = r"2 \* 3 is *six*";
        let (spans, errors) = lex(line);
        assert!(errors.is_empty());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text(line), "six");
    }

    #[test]
    fn lone_asterisk_followed_by_space_is_literal() {
        let (spans, errors) = lex("a * b");
        assert!(spans.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn unterminated_bold_is_a_lexical_error() {
        let (spans, errors) = lex("ok *fine* then **broken");
        assert_eq!(spans.len(), 1);
        assert_eq!(errors.len(), 1);
        let SyntaxFailure::Lexical(error) = &errors[0] else {
            panic!("expected lexical error");
        };
        assert_eq!(error.line, 1);
        assert_eq!(error.column, 15);
        assert_eq!(error.token.as_deref(), Some("**"));
    }
}
