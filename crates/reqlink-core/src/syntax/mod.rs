//! Requirement document syntax.
//!
//! # Surface syntax
//!
//! ```text
//! # Requirements for the *Export Service*
//!
//! ## Formats *Export.Formats*
//! * Implements **Product.Export**
//!
//! **Export.HTML** The Export Service **shall** produce HTML.
//! * Implements **Product.Export**, **Product.Web**
//! ```
//!
//! - The first line is the title; its first italic phrase is the subject.
//! - `#` lines are headings; a single italic phrase is an informal identifier.
//! - A paragraph starting with a bolded identifier is a requirement. The prose
//!   between the identifier and `**shall**` must end with the subject.
//! - `*`/`-` items starting with `Implements` link to requirements.

pub mod error;
mod inline;
mod parser;
mod tree;

pub use error::{LexicalError, ParseError, SyntaxFailure, lexical_diagnostic, parse_diagnostic};
pub use parser::{ParsedDocument, parse};
pub use tree::*;
