//! Plain-text reference scanner.
//!
//! Files that are not requirement documents (source code, notes, anything)
//! can claim to implement requirements with a marker followed by a
//! comma-separated list of identifiers:
//!
//! ```text
//! // $$Implements Export.HTML, Export.Formats
//! ```
//!
//! The scanner never produces definitions or diagnostics.

use std::ops::Range as ByteRange;

use crate::ident::{is_identifier, is_identifier_char};
use crate::records::{Extraction, ImplementationReference};
use crate::span::{Range, column, lines};

/// Marker used when none is configured
pub const DEFAULT_MARKER: &str = "$$Implements";

/// Scan `text` for implementation markers.
///
/// Every occurrence of `marker` on a line is considered. Each identifier
/// yields one reference anchored at the identifier's own span.
pub fn scan(uri: &str, text: &str, marker: &str) -> Extraction {
    let mut out = Extraction::default();
    if marker.is_empty() {
        return out;
    }

    for (line_no, line) in lines(text).enumerate() {
        for (offset, _) in line.match_indices(marker) {
            // The marker must not end a longer word
            if line[..offset].chars().next_back().is_some_and(is_identifier_char) {
                continue;
            }
            for ids in identifiers_after(line, offset + marker.len()) {
                out.references.push(ImplementationReference {
                    id: line[ids.clone()].to_string(),
                    uri: uri.to_string(),
                    range: Range::on_line(
                        line_no as u32,
                        column(line, ids.start),
                        column(line, ids.end),
                    ),
                });
            }
        }
    }

    out
}

/// Byte ranges of the identifiers listed right after a marker ending at `from`.
fn identifiers_after(line: &str, from: usize) -> Vec<ByteRange<usize>> {
    let rest = &line[from..];
    let mut ids = Vec::new();
    let mut chars = rest.char_indices().peekable();

    // The marker must be a word of its own
    if chars.next_if(|&(_, c)| c.is_whitespace()).is_none() {
        return ids;
    }

    loop {
        while chars.next_if(|&(_, c)| c.is_whitespace()).is_some() {}

        let Some(&(start, _)) = chars.peek() else {
            break;
        };
        let mut end = start;
        while let Some((idx, c)) = chars.next_if(|&(_, c)| is_identifier_char(c)) {
            end = idx + c.len_utf8();
        }

        // A trailing dot ends the sentence, it is not part of the id
        let id = rest[start..end].trim_end_matches('.');
        if !is_identifier(id) {
            break;
        }
        ids.push(from + start..from + start + id.len());

        while chars.next_if(|&(_, c)| c.is_whitespace()).is_some() {}
        if chars.next_if(|&(_, c)| c == ',').is_none() {
            break;
        }
    }

    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    const URI: &str = "file:///project/src/export.rs";

    fn ids(extraction: &Extraction) -> Vec<&str> {
        extraction.references.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn test_single_reference() {
        let out = scan(URI, "fn f() {}\n// $$Implements Sys.A\n", DEFAULT_MARKER);
        assert_eq!(ids(&out), vec!["Sys.A"]);
        assert_eq!(out.references[0].range, Range::on_line(1, 16, 21));
        assert_eq!(out.references[0].uri, URI);
        assert!(out.definitions.is_empty());
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_comma_separated_list() {
        let out = scan(URI, "x $$Implements A.B, C.D ,E", DEFAULT_MARKER);
        assert_eq!(ids(&out), vec!["A.B", "C.D", "E"]);
        let ranges: Vec<_> = out.references.iter().map(|r| r.range).collect();
        assert_eq!(
            ranges,
            vec![
                Range::on_line(0, 15, 18),
                Range::on_line(0, 20, 23),
                Range::on_line(0, 25, 26),
            ]
        );
    }

    #[test]
    fn test_trailing_period_is_dropped() {
        let out = scan(URI, "See $$Implements Sys.A. Then more prose.", DEFAULT_MARKER);
        assert_eq!(ids(&out), vec!["Sys.A"]);
        assert_eq!(out.references[0].range, Range::on_line(0, 17, 22));
    }

    #[test]
    fn test_every_marker_on_a_line() {
        let out = scan(
            URI,
            "$$Implements A.One; also $$Implements B.Two",
            DEFAULT_MARKER,
        );
        assert_eq!(ids(&out), vec!["A.One", "B.Two"]);
    }

    #[test]
    fn test_marker_needs_whitespace_and_an_identifier() {
        let out = scan(URI, "$$ImplementsSys.A\n$$Implements\n$$Implements ,A", DEFAULT_MARKER);
        assert!(out.references.is_empty());
    }

    #[test]
    fn test_bare_word_is_not_a_marker() {
        let out = scan(URI, "This type Implements Display.", DEFAULT_MARKER);
        assert!(out.references.is_empty());
    }

    #[test]
    fn test_columns_are_utf16() {
        let out = scan(URI, "// é $$Implements X", DEFAULT_MARKER);
        assert_eq!(out.references[0].range, Range::on_line(0, 18, 19));
    }

    #[test]
    fn test_crlf_lines() {
        let out = scan(URI, "$$Implements A\r\n$$Implements B\r\n", DEFAULT_MARKER);
        let lines: Vec<_> = out.references.iter().map(|r| r.range.start.line).collect();
        assert_eq!(lines, vec![0, 1]);
        assert_eq!(ids(&out), vec!["A", "B"]);
    }

    #[test]
    fn test_custom_marker() {
        let out = scan(URI, "# @implements Build.Script", "@implements");
        assert_eq!(ids(&out), vec!["Build.Script"]);
        assert!(scan(URI, "# @implements Build.Script", "").references.is_empty());
    }

    #[test]
    fn test_marker_inside_a_word_is_ignored() {
        let out = scan(URI, "ReImplements X\nImplements Y, Z\n(Implements W)", "Implements");
        assert_eq!(ids(&out), vec!["Y", "Z", "W"]);
    }
}
