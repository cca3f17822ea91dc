//! Semantic pass over a parsed requirement document.
//!
//! Walks the blocks in order and tracks where the walk currently stands in a
//! [`Placement`] value. The placement decides whether an implements link is
//! attached to something: it must come right after a requirement or a
//! heading, in the list that follows it.

use crate::diagnostic::Diagnostic;
use crate::ident::plain_text;
use crate::records::{Extraction, ImplementationReference, RequirementDefinition};
use crate::syntax::{
    Block, Document, Heading, ImplementsLink, List, ListItem, ParsedDocument, Requirement, Title,
};

/// What the walk has just passed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    /// Nothing an implements link could attach to
    #[default]
    None,
    /// A requirement, so its list may carry implements links
    AfterRequirement,
    /// A title or heading
    AfterHeading,
}

/// Parse and extract a document in one step.
///
/// Syntax failures become diagnostics first, followed by the findings of the
/// semantic pass. `related_uri` enables related information on syntax
/// diagnostics (see [`crate::syntax::lexical_diagnostic`]).
pub fn extract_text(uri: &str, text: &str, related_uri: Option<&str>) -> Extraction {
    let parsed = crate::syntax::parse(text);
    extract(uri, &parsed, related_uri)
}

/// Extract definitions, references and structural findings from a parsed document.
pub fn extract(uri: &str, parsed: &ParsedDocument, related_uri: Option<&str>) -> Extraction {
    let mut extractor = Extractor {
        uri,
        placement: Placement::None,
        out: Extraction::default(),
    };
    extractor.out.diagnostics = parsed
        .errors
        .iter()
        .map(|e| e.to_diagnostic(related_uri))
        .collect();
    extractor.walk(&parsed.document);
    extractor.out
}

struct Extractor<'a> {
    uri: &'a str,
    placement: Placement,
    out: Extraction,
}

impl Extractor<'_> {
    fn walk(&mut self, document: &Document) {
        for block in &document.blocks {
            match block {
                Block::Title(title) => self.title(title),
                Block::Heading(heading) => self.heading(heading),
                Block::Requirement(requirement) => self.requirement(requirement),
                Block::Sentence(_) => self.placement = Placement::None,
                Block::List(list) => self.list(list),
            }
        }

        if self.out.subject.is_none() {
            self.out.diagnostics.push(Diagnostic::missing_subject());
        }
    }

    fn title(&mut self, title: &Title) {
        if let Some(subject) = title.phrases.first()
            && self.out.subject.is_none()
        {
            self.out.subject = Some(subject.text.clone());
        }
        self.placement = Placement::AfterHeading;
    }

    fn heading(&mut self, heading: &Heading) {
        // Links may follow any heading; only a single phrase defines an id
        match heading.phrases.as_slice() {
            [] => {}
            [phrase] => {
                self.out.definitions.push(RequirementDefinition {
                    id: phrase.text.clone(),
                    uri: self.uri.to_string(),
                    range: phrase.range,
                    id_range: phrase.range,
                });
            }
            _ => {
                self.out
                    .diagnostics
                    .push(Diagnostic::multiple_informal_identifiers(heading.range));
            }
        }
        self.placement = Placement::AfterHeading;
    }

    fn requirement(&mut self, requirement: &Requirement) {
        self.out.definitions.push(RequirementDefinition {
            id: requirement.id.text.clone(),
            uri: self.uri.to_string(),
            range: requirement.range,
            id_range: requirement.id.range,
        });

        if let (Some(subject), Some(pre)) = (&self.out.subject, &requirement.pre)
            && !plain_text(&pre.text).ends_with(&plain_text(subject))
        {
            let diagnostic = Diagnostic::subject_mismatch(subject, pre.range);
            self.out.diagnostics.push(diagnostic);
        }

        self.placement = Placement::AfterRequirement;
    }

    fn list(&mut self, list: &List) {
        for item in &list.items {
            match item {
                ListItem::Implements(link) => self.implements(link),
                // A plain item separates later links from the requirement
                ListItem::Text(_) => self.placement = Placement::None,
            }
        }
        self.placement = Placement::None;
    }

    fn implements(&mut self, link: &ImplementsLink) {
        if self.placement == Placement::None {
            self.out
                .diagnostics
                .push(Diagnostic::link_placement(link.range));
        }
        for id in link.ids() {
            self.out.references.push(ImplementationReference {
                id: id.to_string(),
                uri: self.uri.to_string(),
                range: link.range,
            });
        }
    }
}
