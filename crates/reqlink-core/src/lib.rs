//! reqlink-core - Core library for requirement traceability analysis
//!
//! This crate provides the building blocks for:
//! - Reading structured requirement documents (see [`syntax`])
//! - Extracting formal and informal requirement definitions and implements
//!   links from them ([`extract`])
//! - Scanning any other file for implementation markers ([`scanner`])
//! - Keeping a project-wide index and checking it for consistency
//!   ([`ProjectIndex`])
//!
//! # Requirement documents
//!
//! ```text
//! # Requirements for the *exporter*
//!
//! **Export.HTML** The *exporter* **shall** write HTML.
//! * Implements **Product.Export**
//! ```
//!
//! # Implementation markers
//!
//! Source files claim requirements with a marker comment:
//!
//! ```text
//! // $$Implements Export.HTML
//! ```
//!
//! # Indexing a project
//!
//! Register every file with [`ProjectIndex::load`], then run one
//! [`ProjectIndex::validate_all`] sweep. After that every
//! [`ProjectIndex::analyze`] call runs the cross-file checks too:
//!
//! ```
//! use reqlink_core::{Category, ProjectIndex};
//!
//! let mut index = ProjectIndex::default();
//! index.load(
//!     "file:///p/reqs.shalldn",
//!     "# Requirements for the *exporter*\n\n**Export.HTML** The *exporter* **shall** write HTML.\n",
//! );
//! index.load("file:///p/src/html.rs", "// $$Implements Export.HTML\n");
//!
//! let results = index.validate_all();
//! assert!(results.iter().all(|file| file.diagnostics.is_empty()));
//! assert_eq!(index.find_references("Export.HTML").len(), 1);
//!
//! let diagnostics = index.analyze("file:///p/src/html.rs", "// $$Implements Export.PDF\n");
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics[0].category, Category::UnresolvedReference);
//! ```

pub mod diagnostic;
pub mod extract;
pub mod ident;
pub mod index;
mod records;
pub mod scanner;
mod span;
pub mod syntax;

pub use diagnostic::{Category, Diagnostic, FileDiagnostics, RelatedInformation};
pub use index::{
    AnalysisOptions, DEFAULT_DOCUMENT_EXTENSION, DefinitionError, FileKind, FileRecord, Phase,
    ProjectIndex,
};
pub use records::{Extraction, ImplementationReference, RequirementDefinition};
pub use scanner::DEFAULT_MARKER;
pub use span::{Location, Position, Range, byte_offset, column, lines, utf16_len};
