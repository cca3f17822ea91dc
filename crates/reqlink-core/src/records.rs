//! Records produced by the extractors and stored in the project index

use facet::Facet;

use crate::diagnostic::Diagnostic;
use crate::span::{Location, Range};

/// A declared requirement
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct RequirementDefinition {
    /// The requirement ID (e.g., "Parser.ERR_NO_SUBJ")
    pub id: String,
    /// Document that declares it
    pub uri: String,
    /// Range of the whole declaration
    pub range: Range,
    /// Range of the identifier alone
    pub id_range: Range,
}

impl RequirementDefinition {
    pub fn location(&self) -> Location {
        Location::new(self.uri.clone(), self.range)
    }
}

/// A claim that something implements a requirement
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct ImplementationReference {
    /// The referenced requirement ID
    pub id: String,
    /// Document that makes the claim
    pub uri: String,
    pub range: Range,
}

impl ImplementationReference {
    pub fn location(&self) -> Location {
        Location::new(self.uri.clone(), self.range)
    }
}

/// What one producer (document extractor or plain-text scanner) found in a file
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Document subject, only for structured documents
    pub subject: Option<String>,
    pub definitions: Vec<RequirementDefinition>,
    pub references: Vec<ImplementationReference>,
    /// Syntax and structural findings, in the order they were met
    pub diagnostics: Vec<Diagnostic>,
}
