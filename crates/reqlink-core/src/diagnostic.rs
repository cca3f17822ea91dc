//! Diagnostics produced by analysis.
//!
//! The core never assigns a severity. Every finding carries a stable
//! [`Category`] so a presentation layer can decide how loud it should be.

use facet::Facet;

use crate::span::{Location, Position, Range};

/// Stable tag identifying what kind of finding a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Facet)]
#[repr(u8)]
pub enum Category {
    /// Tokenizer or parser failure
    SyntaxError,
    /// Link placement, multiple informal identifiers, missing identifier
    StructuralPlacement,
    /// Requirement prose does not end with the subject, or no subject at all
    SubjectMismatch,
    /// Second definition of an already defined id
    DuplicateIdentifier,
    /// Reference to an id nobody defines
    UnresolvedReference,
    /// Definition nobody references
    NoImplementation,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::SyntaxError,
        Category::StructuralPlacement,
        Category::SubjectMismatch,
        Category::DuplicateIdentifier,
        Category::UnresolvedReference,
        Category::NoImplementation,
    ];

    /// Parse a category from its tag
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }

    /// Stable tag, also used as the LSP diagnostic code
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::SyntaxError => "syntax-error",
            Category::StructuralPlacement => "structural-placement",
            Category::SubjectMismatch => "subject-mismatch",
            Category::DuplicateIdentifier => "duplicate-identifier",
            Category::UnresolvedReference => "unresolved-reference",
            Category::NoImplementation => "no-implementation",
        }
    }

    /// Whether this finding depends on other files
    pub fn is_cross_file(&self) -> bool {
        matches!(
            self,
            Category::UnresolvedReference | Category::NoImplementation
        )
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extra context attached to a diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct RelatedInformation {
    pub message: String,
    /// Where the context points; `None` for free-standing explanations
    pub location: Option<Location>,
}

/// A single finding
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct Diagnostic {
    pub category: Category,
    pub message: String,
    pub range: Range,
    pub related: Vec<RelatedInformation>,
}

impl Diagnostic {
    pub fn new(category: Category, message: impl Into<String>, range: Range) -> Self {
        Self {
            category,
            message: message.into(),
            range,
            related: Vec::new(),
        }
    }

    /// Diagnostic anchored at a single position
    pub fn at(category: Category, message: impl Into<String>, position: Position) -> Self {
        Self::new(category, message, Range::point(position))
    }

    pub fn with_related(mut self, message: impl Into<String>, location: Option<Location>) -> Self {
        self.related.push(RelatedInformation {
            message: message.into(),
            location,
        });
        self
    }

    // Constructors for the findings the analysis raises. Keeping the wording
    // in one place keeps it identical between first and later analyses.

    pub fn link_placement(range: Range) -> Self {
        Self::new(
            Category::StructuralPlacement,
            "Implementation link in a list that does not immediately follow a requirement or heading",
            range,
        )
    }

    pub fn multiple_informal_identifiers(range: Range) -> Self {
        Self::new(
            Category::StructuralPlacement,
            "Heading shall have a single italicized phrase as an informal requirement identifier",
            range,
        )
    }

    pub fn missing_identifier(range: Range) -> Self {
        Self::new(
            Category::StructuralPlacement,
            "Requirement without identifier",
            range,
        )
    }

    pub fn subject_mismatch(subject: &str, range: Range) -> Self {
        Self::new(
            Category::SubjectMismatch,
            format!("The requirement subject is different from the document subject {subject}."),
            range,
        )
    }

    pub fn missing_subject() -> Self {
        Self::at(
            Category::SubjectMismatch,
            "No subject defined in the document.",
            Position::default(),
        )
        .with_related(
            "The subject of the document is defined by the only italicized group of words in the first line of the document",
            None,
        )
    }

    pub fn duplicate_identifier(id: &str, range: Range) -> Self {
        Self::new(
            Category::DuplicateIdentifier,
            format!("Requirement with id {id} already exists"),
            range,
        )
    }

    pub fn unresolved_reference(id: &str, range: Range) -> Self {
        Self::new(
            Category::UnresolvedReference,
            format!("Implementation of non-existing requirement {id}"),
            range,
        )
    }

    pub fn no_implementation(id: &str, range: Range) -> Self {
        Self::new(
            Category::NoImplementation,
            format!("Requirement {id} does not have implementation"),
            range,
        )
    }
}

/// Diagnostics for one file, as handed to a publisher
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct FileDiagnostics {
    pub uri: String,
    pub diagnostics: Vec<Diagnostic>,
}
