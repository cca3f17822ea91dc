//! Block reader: turns document text into a [`Document`].
//!
//! The reader never fails. It returns whatever blocks it could recover plus
//! every lexical and parse error it met along the way.

use super::error::{ParseError, SyntaxFailure};
use super::inline::{Emphasis, Span, lex_line};
use super::tree::*;
use crate::ident::is_identifier;
use crate::span::{self, Position, Range, column};

const IMPLEMENTS_KEYWORD: &str = "Implements";
const SHALL_KEYWORD: &str = "shall";

/// Result of reading one document
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub document: Document,
    pub errors: Vec<SyntaxFailure>,
}

/// Read a document. See the crate docs for the surface syntax.
pub fn parse(text: &str) -> ParsedDocument {
    let mut reader = Reader {
        lines: span::lines(text).collect(),
        blocks: Vec::new(),
        errors: Vec::new(),
    };
    reader.read();
    ParsedDocument {
        document: Document {
            blocks: reader.blocks,
        },
        errors: reader.errors,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Blank,
    Heading { level: u8, content: usize },
    Bullet { content: usize },
    Text { indented: bool },
}

fn classify(line: &str) -> LineKind {
    let trimmed = line.trim_start();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    let indent = line.len() - trimmed.len();
    // Markers followed only by whitespace have their content at the line end
    let end = line.trim_end().len();

    let hashes = trimmed.bytes().take_while(|&b| b == b'#').count();
    if (1..=6).contains(&hashes) {
        let rest = &trimmed[hashes..];
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            let content = (indent + hashes + (rest.len() - rest.trim_start().len())).min(end);
            return LineKind::Heading {
                level: hashes as u8,
                content,
            };
        }
    }

    if let Some(rest) = trimmed
        .strip_prefix('*')
        .or_else(|| trimmed.strip_prefix('-'))
        && rest.starts_with(char::is_whitespace)
    {
        let content = (indent + 1 + (rest.len() - rest.trim_start().len())).min(end);
        return LineKind::Bullet { content };
    }

    LineKind::Text {
        indented: indent > 0,
    }
}

/// A position inside the document in (line index, byte offset) form
type Cursor = (usize, usize);

struct Reader<'a> {
    lines: Vec<&'a str>,
    blocks: Vec<Block>,
    errors: Vec<SyntaxFailure>,
}

impl<'a> Reader<'a> {
    fn read(&mut self) {
        let mut i = 0;
        while i < self.lines.len() {
            let kind = classify(self.lines[i]);
            if i == 0 && !matches!(kind, LineKind::Blank | LineKind::Bullet { .. }) {
                self.title(kind);
                i += 1;
                continue;
            }
            i = match kind {
                LineKind::Blank => i + 1,
                LineKind::Heading { level, content } => {
                    self.heading(i, level, content);
                    i + 1
                }
                LineKind::Bullet { .. } => self.list(i),
                LineKind::Text { .. } => self.paragraph(i),
            };
        }
    }

    fn position(&self, (line, byte): Cursor) -> Position {
        Position::new(line as u32, column(self.lines[line], byte))
    }

    fn range(&self, start: Cursor, end: Cursor) -> Range {
        Range::new(self.position(start), self.position(end))
    }

    /// Cursor just past the last non-blank character of a line
    fn line_end(&self, line: usize) -> Cursor {
        (line, self.lines[line].trim_end().len())
    }

    fn line_start(&self, line: usize) -> Cursor {
        let text = self.lines[line];
        (line, text.len() - text.trim_start().len())
    }

    fn phrase(&self, line: usize, span: &Span) -> Phrase {
        Phrase {
            text: span.text(self.lines[line]).to_string(),
            range: self.range((line, span.inner.start), (line, span.inner.end)),
        }
    }

    fn italic_phrases(&self, line: usize, spans: &[Span]) -> Vec<Phrase> {
        spans
            .iter()
            .filter(|s| s.kind == Emphasis::Italic)
            .map(|s| self.phrase(line, s))
            .collect()
    }

    /// Source text between two cursors, lines joined by a single space
    fn text_between(&self, (from_line, from): Cursor, (to_line, to): Cursor) -> String {
        if from_line == to_line {
            return self.lines[from_line][from..to].to_string();
        }
        let mut parts = vec![&self.lines[from_line][from..]];
        for line in &self.lines[from_line + 1..to_line] {
            parts.push(line.trim());
        }
        parts.push(&self.lines[to_line][..to]);
        parts.join(" ")
    }

    fn parse_error(&mut self, (line, byte): Cursor, token: Option<&str>, message: &str) {
        self.errors.push(SyntaxFailure::Parse(ParseError {
            line: line as u32 + 1,
            column: column(self.lines[line], byte),
            token: token.map(str::to_string),
            message: message.to_string(),
        }));
    }

    fn title(&mut self, kind: LineKind) {
        let content = match kind {
            LineKind::Heading { content, .. } => content,
            _ => self.line_start(0).1,
        };
        let spans = lex_line(self.lines[0], content, 0, &mut self.errors);
        let title = Title {
            range: self.range((0, content), self.line_end(0)),
            phrases: self.italic_phrases(0, &spans),
        };
        self.blocks.push(Block::Title(title));
    }

    fn heading(&mut self, line: usize, level: u8, content: usize) {
        let spans = lex_line(self.lines[line], content, line as u32, &mut self.errors);
        let heading = Heading {
            level,
            range: self.range((line, content), self.line_end(line)),
            phrases: self.italic_phrases(line, &spans),
        };
        self.blocks.push(Block::Heading(heading));
    }

    /// Read a paragraph starting at `first`; returns the next unread line.
    fn paragraph(&mut self, first: usize) -> usize {
        let mut last = first;
        while last + 1 < self.lines.len()
            && matches!(classify(self.lines[last + 1]), LineKind::Text { .. })
        {
            last += 1;
        }

        let mut spans: Vec<(usize, Span)> = Vec::new();
        for line in first..=last {
            let from = self.line_start(line).1;
            for span in lex_line(self.lines[line], from, line as u32, &mut self.errors) {
                spans.push((line, span));
            }
        }

        let range = self.range(self.line_start(first), self.line_end(last));
        let start = self.line_start(first).1;
        let id = spans.first().filter(|(line, span)| {
            *line == first
                && span.kind == Emphasis::Bold
                && span.outer.start == start
                && is_identifier(span.text(self.lines[*line]))
        });

        let Some((id_line, id_span)) = id else {
            self.blocks.push(Block::Sentence(Sentence { range }));
            return last + 1;
        };

        let id = self.phrase(*id_line, id_span);
        let id_end = (*id_line, id_span.outer.end);
        let shall = spans.iter().skip(1).find(|(line, span)| {
            span.kind == Emphasis::Bold
                && span
                    .text(self.lines[*line])
                    .eq_ignore_ascii_case(SHALL_KEYWORD)
        });

        let pre = match shall {
            Some((line, span)) => {
                let pre_end = (*line, span.outer.start);
                Some(Phrase {
                    text: self.text_between(id_end, pre_end),
                    range: self.range(id_end, pre_end),
                })
            }
            None => {
                self.parse_error(
                    self.line_end(last),
                    None,
                    "requirement without **shall** keyword",
                );
                None
            }
        };

        self.blocks
            .push(Block::Requirement(Requirement { range, id, pre }));
        last + 1
    }

    /// Read a list starting at `first`; returns the next unread line.
    fn list(&mut self, first: usize) -> usize {
        let mut items = Vec::new();
        let mut line = first;
        let mut last_line = first;

        while line < self.lines.len() {
            let LineKind::Bullet { content } = classify(self.lines[line]) else {
                break;
            };
            let mut end = line;
            while end + 1 < self.lines.len()
                && matches!(
                    classify(self.lines[end + 1]),
                    LineKind::Text { indented: true }
                )
            {
                end += 1;
            }
            items.push(self.list_item(line, content, end));
            last_line = end;
            line = end + 1;
        }

        let range = self.range(self.line_start(first), self.line_end(last_line));
        self.blocks.push(Block::List(List { range, items }));
        line
    }

    fn list_item(&mut self, first: usize, content: usize, last: usize) -> ListItem {
        let range = self.range((first, content), self.line_end(last));

        let mut spans: Vec<(usize, Span)> = Vec::new();
        for line in first..=last {
            let from = if line == first {
                content
            } else {
                self.line_start(line).1
            };
            for span in lex_line(self.lines[line], from, line as u32, &mut self.errors) {
                spans.push((line, span));
            }
        }

        let text = &self.lines[first][content..];
        let is_link = text.strip_prefix(IMPLEMENTS_KEYWORD).is_some_and(|rest| {
            rest.chars()
                .next()
                .is_none_or(|c| !c.is_alphanumeric() && c != '_')
        });
        if !is_link {
            return ListItem::Text(range);
        }

        let keyword_end = (first, content + IMPLEMENTS_KEYWORD.len());
        let bold: Vec<(usize, Span)> = spans
            .into_iter()
            .filter(|(_, span)| span.kind == Emphasis::Bold)
            .collect();

        let targets = match bold.as_slice() {
            [] => {
                self.parse_error(
                    (first, content),
                    Some(IMPLEMENTS_KEYWORD),
                    "implements link without target",
                );
                LinkTargets::Identifiers(Vec::new())
            }
            [(line, span)] => {
                let phrase = self.phrase(*line, span);
                if is_identifier(&phrase.text) {
                    LinkTargets::Identifiers(vec![phrase])
                } else {
                    LinkTargets::Phrase(Phrase {
                        text: phrase.text.split_whitespace().collect::<Vec<_>>().join(" "),
                        range: phrase.range,
                    })
                }
            }
            many => {
                let mut ids = Vec::new();
                let mut previous_end = keyword_end;
                for (index, (line, span)) in many.iter().enumerate() {
                    let line_text: &'a str = self.lines[*line];
                    let token = &line_text[span.outer.clone()];
                    let here = (*line, span.outer.start);
                    if index > 0 && self.text_between(previous_end, here).trim() != "," {
                        self.parse_error(here, Some(token), "expected ',' between targets");
                    }
                    previous_end = (*line, span.outer.end);

                    let phrase = self.phrase(*line, span);
                    if is_identifier(&phrase.text) {
                        ids.push(phrase);
                    } else {
                        self.parse_error(here, Some(token), "expected requirement identifier");
                    }
                }
                LinkTargets::Identifiers(ids)
            }
        };

        ListItem::Implements(ImplementsLink { range, targets })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(text: &str) -> Vec<Block> {
        let parsed = parse(text);
        assert!(parsed.errors.is_empty(), "errors: {:?}", parsed.errors);
        parsed.document.blocks
    }

    #[test]
    fn first_line_is_the_title() {
        let blocks = blocks("# Requirements for the *server*\n");
        let Block::Title(title) = &blocks[0] else {
            panic!("expected title, got {:?}", blocks[0]);
        };
        assert_eq!(title.phrases.len(), 1);
        assert_eq!(title.phrases[0].text, "server");
        assert_eq!(title.phrases[0].range, Range::on_line(0, 24, 30));
    }

    #[test]
    fn requirement_with_pre_text() {
        let text = "# The *server*\n\n**Sys.R1** The server **shall** answer.\n";
        let blocks = blocks(text);
        let Block::Requirement(req) = &blocks[1] else {
            panic!("expected requirement, got {:?}", blocks[1]);
        };
        assert_eq!(req.id.text, "Sys.R1");
        assert_eq!(req.id.range, Range::on_line(2, 2, 8));
        let pre = req.pre.as_ref().expect("pre");
        assert_eq!(pre.text.trim(), "The server");
        assert_eq!(pre.range, Range::on_line(2, 10, 22));
    }

    #[test]
    fn requirement_spanning_lines() {
        let text = "# *x*\n**A.B** The\nx **shall** work\n";
        let blocks = blocks(text);
        let Block::Requirement(req) = &blocks[1] else {
            panic!("expected requirement");
        };
        assert_eq!(req.pre.as_ref().expect("pre").text.trim(), "The x");
        assert_eq!(req.range, Range::new(Position::new(1, 0), Position::new(2, 16)));
    }

    #[test]
    fn markers_with_only_trailing_whitespace() {
        let blocks = parse("# *x*\n##   \n*   \n").document.blocks;
        let Block::Heading(heading) = &blocks[1] else {
            panic!("expected heading, got {:?}", blocks[1]);
        };
        assert_eq!(heading.range, Range::on_line(1, 2, 2));
        let Block::List(list) = &blocks[2] else {
            panic!("expected list, got {:?}", blocks[2]);
        };
        let ListItem::Text(range) = &list.items[0] else {
            panic!("expected plain item");
        };
        assert_eq!(*range, Range::on_line(2, 1, 1));
    }

    #[test]
    fn paragraph_without_leading_identifier_is_a_sentence() {
        let blocks = blocks("# *x*\nSome prose with **Sys.A** inside.\n");
        assert!(matches!(blocks[1], Block::Sentence(_)));
    }

    #[test]
    fn list_with_implements_links() {
        let text = "# *x*\n## Heading *Export*\n* Implements **Sys.A**, **Sys.B**\n* plain item\n- Implements **export to html**\n";
        let blocks = blocks(text);
        let Block::Heading(heading) = &blocks[1] else {
            panic!("expected heading");
        };
        assert_eq!(heading.level, 2);
        assert_eq!(heading.phrases[0].text, "Export");

        let Block::List(list) = &blocks[2] else {
            panic!("expected list");
        };
        assert_eq!(list.items.len(), 3);
        let ListItem::Implements(link) = &list.items[0] else {
            panic!("expected link");
        };
        assert_eq!(link.ids(), vec!["Sys.A", "Sys.B"]);
        assert_eq!(link.range, Range::on_line(2, 2, 33));
        assert!(matches!(list.items[1], ListItem::Text(_)));
        let ListItem::Implements(link) = &list.items[2] else {
            panic!("expected link");
        };
        assert!(matches!(link.targets, LinkTargets::Phrase(_)));
        assert_eq!(link.ids(), vec!["export to html"]);
    }

    #[test]
    fn indented_lines_continue_a_list_item() {
        let text = "# *x*\n* Implements **Sys.A**,\n  **Sys.B**\nNext paragraph\n";
        let blocks = blocks(text);
        let Block::List(list) = &blocks[1] else {
            panic!("expected list");
        };
        let ListItem::Implements(link) = &list.items[0] else {
            panic!("expected link");
        };
        assert_eq!(link.ids(), vec!["Sys.A", "Sys.B"]);
        assert!(matches!(blocks[2], Block::Sentence(_)));
    }

    #[test]
    fn implements_prefix_of_longer_word_is_plain_text() {
        let blocks = blocks("# *x*\n* Implementsfoo **Sys.A**\n");
        let Block::List(list) = &blocks[1] else {
            panic!("expected list");
        };
        assert!(matches!(list.items[0], ListItem::Text(_)));
    }

    #[test]
    fn missing_shall_is_a_parse_error() {
        let parsed = parse("# *x*\n**Sys.A** The x works.\n");
        assert_eq!(parsed.errors.len(), 1);
        let SyntaxFailure::Parse(error) = &parsed.errors[0] else {
            panic!("expected parse error");
        };
        assert_eq!(error.line, 2);
        assert_eq!(error.column, 22);
        assert_eq!(error.token, None);
        let Block::Requirement(req) = &parsed.document.blocks[1] else {
            panic!("requirement is still produced");
        };
        assert!(req.pre.is_none());
    }

    #[test]
    fn implements_without_target_is_a_parse_error() {
        let parsed = parse("# *x*\n* Implements nothing\n");
        assert_eq!(parsed.errors.len(), 1);
        let SyntaxFailure::Parse(error) = &parsed.errors[0] else {
            panic!("expected parse error");
        };
        assert_eq!(error.token.as_deref(), Some("Implements"));
        assert_eq!(error.column, 2);
    }

    #[test]
    fn missing_comma_keeps_both_targets() {
        let parsed = parse("# *x*\n* Implements **Sys.A** **Sys.B**\n");
        assert_eq!(parsed.errors.len(), 1);
        let SyntaxFailure::Parse(error) = &parsed.errors[0] else {
            panic!("expected parse error");
        };
        assert_eq!(error.token.as_deref(), Some("**Sys.B**"));
        let Block::List(list) = &parsed.document.blocks[1] else {
            panic!("expected list");
        };
        let ListItem::Implements(link) = &list.items[0] else {
            panic!("expected link");
        };
        assert_eq!(link.ids(), vec!["Sys.A", "Sys.B"]);
    }

    #[test]
    fn unterminated_emphasis_is_reported() {
        let parsed = parse("# *x*\nSome **broken text\n");
        assert_eq!(parsed.errors.len(), 1);
        assert!(matches!(parsed.errors[0], SyntaxFailure::Lexical(_)));
        assert!(matches!(parsed.document.blocks[1], Block::Sentence(_)));
    }
}
