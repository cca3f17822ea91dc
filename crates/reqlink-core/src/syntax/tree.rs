//! Syntax tree of a requirement document.

use crate::span::Range;

/// A parsed document: blocks in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

/// Top-level block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Title(Title),
    Heading(Heading),
    Sentence(Sentence),
    Requirement(Requirement),
    List(List),
}

/// Emphasised text (the markers are not part of `text` nor `range`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    pub text: String,
    pub range: Range,
}

/// First line of the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title {
    pub range: Range,
    /// Italicized phrases; the first one is the document subject
    pub phrases: Vec<Phrase>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub range: Range,
    /// Italicized phrases, candidate informal identifiers
    pub phrases: Vec<Phrase>,
}

/// Plain prose paragraph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub range: Range,
}

/// Paragraph introduced by a bolded identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub range: Range,
    pub id: Phrase,
    /// Prose between the identifier and the `**shall**` keyword.
    /// `None` when the keyword is missing.
    pub pre: Option<Phrase>,
}

/// Bulleted list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    pub range: Range,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListItem {
    Text(Range),
    Implements(ImplementsLink),
}

/// `Implements **A.B**, **C.D**` list item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementsLink {
    pub range: Range,
    pub targets: LinkTargets,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTargets {
    /// A single bolded free-text phrase
    Phrase(Phrase),
    /// One or more bolded identifiers, all of which are implemented
    Identifiers(Vec<Phrase>),
}

impl ImplementsLink {
    /// Requirement ids this link claims to implement
    pub fn ids(&self) -> Vec<&str> {
        match &self.targets {
            LinkTargets::Phrase(phrase) => vec![phrase.text.as_str()],
            LinkTargets::Identifiers(ids) => ids.iter().map(|id| id.text.as_str()).collect(),
        }
    }
}
