//! Project-wide index of requirement definitions and implementation references.
//!
//! Every file owns a [`FileRecord`]. The global maps are keyed by id and only
//! ever hold entries that are also present in exactly one file record:
//! re-analyzing a file purges everything it owned before inserting what the
//! fresh parse found.
//!
//! Cross-file checks (unresolved references, unimplemented requirements) are
//! only meaningful once the whole project is known. A new index starts in
//! [`Phase::Loading`], where a file's first analysis skips them. Callers that
//! enumerate the project up front should [`ProjectIndex::load`] every file
//! and then call [`ProjectIndex::validate_all`], which moves the index to
//! [`Phase::Ready`].

use std::collections::{BTreeSet, HashMap};

use facet::Facet;
use thiserror::Error;
use tracing::{debug, info};

use crate::diagnostic::{Diagnostic, FileDiagnostics};
use crate::extract::extract_text;
use crate::records::{Extraction, ImplementationReference, RequirementDefinition};
use crate::scanner::{DEFAULT_MARKER, scan};
use crate::span::{Location, Range};

/// Extension of structured requirement documents when none is configured
pub const DEFAULT_DOCUMENT_EXTENSION: &str = "shalldn";

/// Knobs that change how files are analyzed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    /// Attach related information to syntax diagnostics and duplicates
    pub related_information: bool,
    /// File extensions (without the dot) treated as requirement documents
    pub document_extensions: Vec<String>,
    /// Marker the plain-text scanner looks for
    pub implements_marker: String,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            related_information: false,
            document_extensions: vec![DEFAULT_DOCUMENT_EXTENSION.to_string()],
            implements_marker: DEFAULT_MARKER.to_string(),
        }
    }
}

impl AnalysisOptions {
    /// Decide how a uri is analyzed from its path extension.
    pub fn file_kind(&self, uri: &str) -> FileKind {
        // Ignore any query or fragment, then look at the last path segment
        let path = uri.split(['?', '#']).next().unwrap_or(uri);
        let name = path.rsplit('/').next().unwrap_or(path);
        let Some((_, ext)) = name.rsplit_once('.') else {
            return FileKind::Plain;
        };

        let is_document = self
            .document_extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext));
        if is_document {
            FileKind::Document
        } else {
            FileKind::Plain
        }
    }
}

/// How a file is analyzed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Facet)]
#[repr(u8)]
pub enum FileKind {
    /// Structured requirement document, goes through the extractor
    Document,
    /// Anything else, goes through the marker scanner
    Plain,
}

/// Warm-up state of the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Facet)]
#[repr(u8)]
pub enum Phase {
    /// Files are still being registered; a file's first analysis skips
    /// cross-file checks
    Loading,
    /// The project has been validated once; every analysis runs all checks
    Ready,
}

/// Everything one file contributed to the index
#[derive(Debug, Clone, PartialEq, Eq, Facet)]
pub struct FileRecord {
    pub kind: FileKind,
    /// Document subject, if the file is a document that declares one
    pub subject: Option<String>,
    pub definitions: Vec<RequirementDefinition>,
    pub references: Vec<ImplementationReference>,
    /// Syntax and structural findings of the last analysis. Duplicates
    /// depend on other files and are derived on demand.
    pub diagnostics: Vec<Diagnostic>,
}

impl FileRecord {
    fn new(kind: FileKind) -> Self {
        Self {
            kind,
            subject: None,
            definitions: Vec::new(),
            references: Vec::new(),
            diagnostics: Vec::new(),
        }
    }
}

/// Why a definition was refused or flagged
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    /// The id already had a definition. The new one is still indexed.
    #[error("Requirement with id {id} already exists")]
    Duplicate { id: String, existing: Location },
    /// The definition has no id and was not indexed.
    #[error("Requirement without identifier")]
    MissingIdentifier,
}

/// The project index
#[derive(Debug, Clone)]
pub struct ProjectIndex {
    options: AnalysisOptions,
    phase: Phase,
    definitions: HashMap<String, Vec<RequirementDefinition>>,
    references: HashMap<String, Vec<ImplementationReference>>,
    files: HashMap<String, FileRecord>,
}

impl Default for ProjectIndex {
    fn default() -> Self {
        Self::new(AnalysisOptions::default())
    }
}

impl ProjectIndex {
    pub fn new(options: AnalysisOptions) -> Self {
        Self {
            options,
            phase: Phase::Loading,
            definitions: HashMap::new(),
            references: HashMap::new(),
            files: HashMap::new(),
        }
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Register a definition.
    ///
    /// A definition for an id that is already defined is inserted anyway, so
    /// lookups stay complete, and reported as [`DefinitionError::Duplicate`].
    pub fn add_definition(&mut self, def: RequirementDefinition) -> Result<(), DefinitionError> {
        if def.id.is_empty() {
            return Err(DefinitionError::MissingIdentifier);
        }

        let existing = self
            .definitions
            .get(&def.id)
            .and_then(|defs| defs.first())
            .map(RequirementDefinition::location);

        let kind = self.options.file_kind(&def.uri);
        self.files
            .entry(def.uri.clone())
            .or_insert_with(|| FileRecord::new(kind))
            .definitions
            .push(def.clone());
        let id = def.id.clone();
        self.definitions.entry(def.id.clone()).or_default().push(def);

        match existing {
            Some(existing) => Err(DefinitionError::Duplicate { id, existing }),
            None => Ok(()),
        }
    }

    /// Register one reference per id, all anchored at `range`.
    pub fn add_references<I>(&mut self, uri: &str, range: Range, ids: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        for id in ids {
            self.insert_reference(ImplementationReference {
                id: id.into(),
                uri: uri.to_string(),
                range,
            });
        }
    }

    /// Analyze a file and return its complete diagnostic list.
    ///
    /// The file's previous contribution is replaced wholesale. Cross-file
    /// checks run unless the index is still loading and this is the first
    /// time the uri is seen.
    pub fn analyze(&mut self, uri: &str, text: &str) -> Vec<Diagnostic> {
        let first_pass = !self.files.contains_key(uri);
        let mut diagnostics = self.rebuild(uri, text);

        let check = match self.phase {
            Phase::Loading => !first_pass,
            Phase::Ready => true,
        };
        if check {
            diagnostics.extend(self.consistency(uri));
        }

        debug!(
            uri,
            first_pass,
            checked = check,
            diagnostics = diagnostics.len(),
            "analyzed"
        );
        diagnostics
    }

    /// Register a file without running cross-file checks.
    pub fn load(&mut self, uri: &str, text: &str) {
        let local = self.rebuild(uri, text);
        debug!(uri, diagnostics = local.len(), "loaded");
    }

    /// Check every indexed file and leave the loading phase.
    ///
    /// Results are ordered by uri.
    pub fn validate_all(&mut self) -> Vec<FileDiagnostics> {
        self.phase = Phase::Ready;

        let mut uris: Vec<String> = self.files.keys().cloned().collect();
        uris.sort();

        let results: Vec<FileDiagnostics> = uris
            .into_iter()
            .filter_map(|uri| {
                let diagnostics = self.revalidate(&uri)?;
                Some(FileDiagnostics { uri, diagnostics })
            })
            .collect();

        info!(
            files = results.len(),
            definitions = self.definitions.len(),
            references = self.references.len(),
            "project validated"
        );
        results
    }

    /// Rebuild a file's diagnostics from its stored findings plus fresh
    /// cross-file checks, without re-reading it. `None` for unknown uris.
    pub fn revalidate(&self, uri: &str) -> Option<Vec<Diagnostic>> {
        let record = self.files.get(uri)?;
        let mut diagnostics = record.diagnostics.clone();
        diagnostics.extend(self.duplicates(uri));
        diagnostics.extend(self.consistency(uri));
        Some(diagnostics)
    }

    /// Drop a file and everything it contributed. Unknown uris are ignored.
    pub fn remove(&mut self, uri: &str) {
        self.purge(uri);
        if self.files.remove(uri).is_some() {
            debug!(uri, "removed");
        }
    }

    /// Where `id` is defined
    pub fn find_definition(&self, id: &str) -> Vec<Location> {
        self.definitions
            .get(id)
            .map(|defs| defs.iter().map(RequirementDefinition::location).collect())
            .unwrap_or_default()
    }

    /// Where `id` is claimed to be implemented
    pub fn find_references(&self, id: &str) -> Vec<Location> {
        self.references
            .get(id)
            .map(|refs| refs.iter().map(ImplementationReference::location).collect())
            .unwrap_or_default()
    }

    /// Files whose diagnostics may depend on `uri`: the owners of references
    /// to its definitions, other definers of its ids and the owners of
    /// definitions it references.
    pub fn linked(&self, uri: &str) -> BTreeSet<String> {
        let mut linked = BTreeSet::new();
        let Some(record) = self.files.get(uri) else {
            return linked;
        };

        for def in &record.definitions {
            if let Some(refs) = self.references.get(&def.id) {
                linked.extend(refs.iter().map(|r| r.uri.clone()));
            }
            if let Some(defs) = self.definitions.get(&def.id) {
                linked.extend(
                    defs.iter()
                        .filter(|d| d.uri != uri)
                        .map(|d| d.uri.clone()),
                );
            }
        }
        for reference in &record.references {
            if let Some(defs) = self.definitions.get(&reference.id) {
                linked.extend(defs.iter().map(|d| d.uri.clone()));
            }
        }

        linked
    }

    pub fn file(&self, uri: &str) -> Option<&FileRecord> {
        self.files.get(uri)
    }

    /// All indexed files, in no particular order
    pub fn files(&self) -> impl Iterator<Item = (&str, &FileRecord)> {
        self.files.iter().map(|(uri, record)| (uri.as_str(), record))
    }

    /// All definitions, duplicates included
    pub fn definitions(&self) -> impl Iterator<Item = &RequirementDefinition> {
        self.definitions.values().flatten()
    }

    /// Every defined id, sorted
    pub fn definition_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn subject(&self, uri: &str) -> Option<&str> {
        self.files.get(uri)?.subject.as_deref()
    }

    /// Purge, re-extract and re-register a file. Returns its local findings.
    fn rebuild(&mut self, uri: &str, text: &str) -> Vec<Diagnostic> {
        self.purge(uri);
        let kind = self.options.file_kind(uri);
        self.files.insert(uri.to_string(), FileRecord::new(kind));

        let extraction = match kind {
            FileKind::Document => {
                let related = self.options.related_information.then_some(uri);
                extract_text(uri, text, related)
            }
            FileKind::Plain => scan(uri, text, &self.options.implements_marker),
        };

        let mut local = self.register(uri, extraction);
        if let Some(record) = self.files.get_mut(uri) {
            record.diagnostics = local.clone();
        }
        local.extend(self.duplicates(uri));
        local
    }

    fn register(&mut self, uri: &str, extraction: Extraction) -> Vec<Diagnostic> {
        let Extraction {
            subject,
            definitions,
            references,
            mut diagnostics,
        } = extraction;

        if let Some(record) = self.files.get_mut(uri) {
            record.subject = subject;
        }

        for def in definitions {
            let range = def.range;
            // Duplicates are reported by `duplicates` once every definition is in
            if let Err(DefinitionError::MissingIdentifier) = self.add_definition(def) {
                diagnostics.push(Diagnostic::missing_identifier(range));
            }
        }

        for reference in references {
            self.insert_reference(reference);
        }

        diagnostics
    }

    /// Every definition of `uri` that is not the first one indexed under
    /// its id.
    fn duplicates(&self, uri: &str) -> Vec<Diagnostic> {
        let Some(record) = self.files.get(uri) else {
            return Vec::new();
        };

        record
            .definitions
            .iter()
            .filter_map(|def| {
                let first = self.definitions.get(&def.id)?.first()?;
                if first.uri == def.uri && first.id_range == def.id_range {
                    return None;
                }
                let mut diagnostic = Diagnostic::duplicate_identifier(&def.id, def.id_range);
                if self.options.related_information {
                    diagnostic = diagnostic.with_related("First defined here", Some(first.location()));
                }
                Some(diagnostic)
            })
            .collect()
    }

    fn insert_reference(&mut self, reference: ImplementationReference) {
        let kind = self.options.file_kind(&reference.uri);
        self.files
            .entry(reference.uri.clone())
            .or_insert_with(|| FileRecord::new(kind))
            .references
            .push(reference.clone());
        self.references
            .entry(reference.id.clone())
            .or_default()
            .push(reference);
    }

    /// Unresolved references and unimplemented requirements of one file
    fn consistency(&self, uri: &str) -> Vec<Diagnostic> {
        let Some(record) = self.files.get(uri) else {
            return Vec::new();
        };
        let mut diagnostics = Vec::new();

        for reference in &record.references {
            if !self.definitions.contains_key(&reference.id) {
                diagnostics.push(Diagnostic::unresolved_reference(
                    &reference.id,
                    reference.range,
                ));
            }
        }
        for def in &record.definitions {
            if !self.references.contains_key(&def.id) {
                diagnostics.push(Diagnostic::no_implementation(&def.id, def.id_range));
            }
        }

        diagnostics
    }

    /// Remove every global entry owned by `uri`. Keys left empty are dropped.
    fn purge(&mut self, uri: &str) {
        let Some(record) = self.files.get(uri) else {
            return;
        };
        for def in &record.definitions {
            prune(&mut self.definitions, &def.id, |d| d.uri == uri);
        }
        for reference in &record.references {
            prune(&mut self.references, &reference.id, |r| r.uri == uri);
        }
    }
}

fn prune<T>(map: &mut HashMap<String, Vec<T>>, id: &str, owned: impl Fn(&T) -> bool) {
    if let Some(entries) = map.get_mut(id) {
        entries.retain(|e| !owned(e));
        if entries.is_empty() {
            map.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Category;

    fn def(id: &str, uri: &str, line: u32) -> RequirementDefinition {
        let range = Range::on_line(line, 0, id.len() as u32 + 4);
        RequirementDefinition {
            id: id.to_string(),
            uri: uri.to_string(),
            range,
            id_range: Range::on_line(line, 2, id.len() as u32 + 2),
        }
    }

    #[test]
    fn file_kind_by_extension() {
        let options = AnalysisOptions::default();
        assert_eq!(
            options.file_kind("file:///p/reqs.shalldn"),
            FileKind::Document
        );
        assert_eq!(
            options.file_kind("file:///p/REQS.ShallDN"),
            FileKind::Document
        );
        assert_eq!(options.file_kind("file:///p/main.rs"), FileKind::Plain);
        assert_eq!(options.file_kind("file:///p/Makefile"), FileKind::Plain);
        assert_eq!(
            options.file_kind("file:///p.shalldn/Makefile"),
            FileKind::Plain
        );

        let options = AnalysisOptions {
            document_extensions: vec![".req".to_string()],
            ..AnalysisOptions::default()
        };
        assert_eq!(options.file_kind("file:///p/a.req"), FileKind::Document);
        assert_eq!(options.file_kind("file:///p/a.shalldn"), FileKind::Plain);
    }

    #[test]
    fn add_definition_reports_duplicates_but_keeps_them() {
        let mut index = ProjectIndex::default();
        assert_eq!(index.add_definition(def("Sys.A", "file:///a", 0)), Ok(()));

        let err = index
            .add_definition(def("Sys.A", "file:///b", 3))
            .unwrap_err();
        assert_eq!(
            err,
            DefinitionError::Duplicate {
                id: "Sys.A".to_string(),
                existing: Location::new("file:///a", Range::on_line(0, 0, 9)),
            }
        );
        assert_eq!(index.find_definition("Sys.A").len(), 2);
        assert_eq!(index.file("file:///b").map(|f| f.definitions.len()), Some(1));
    }

    #[test]
    fn add_definition_without_id_is_refused() {
        let mut index = ProjectIndex::default();
        assert_eq!(
            index.add_definition(def("", "file:///a", 0)),
            Err(DefinitionError::MissingIdentifier)
        );
        assert!(index.definition_ids().is_empty());
        assert!(index.file("file:///a").is_none());
    }

    #[test]
    fn add_references_share_the_range() {
        let mut index = ProjectIndex::default();
        let range = Range::on_line(4, 2, 30);
        index.add_references("file:///a.shalldn", range, ["X.One", "X.Two"]);
        assert_eq!(
            index.find_references("X.One"),
            vec![Location::new("file:///a.shalldn", range)]
        );
        assert_eq!(
            index.find_references("X.Two"),
            vec![Location::new("file:///a.shalldn", range)]
        );
        assert!(index.find_references("X.Three").is_empty());
    }

    #[test]
    fn remove_prunes_empty_keys() {
        let mut index = ProjectIndex::default();
        index.analyze("file:///a.rs", "// $$Implements Sys.A\n");
        assert_eq!(index.references.len(), 1);
        index.remove("file:///a.rs");
        assert!(index.references.is_empty());
        assert!(index.file("file:///a.rs").is_none());
        // idempotent
        index.remove("file:///a.rs");
    }

    #[test]
    fn duplicate_within_one_document() {
        let mut index = ProjectIndex::new(AnalysisOptions {
            related_information: true,
            ..AnalysisOptions::default()
        });
        let text = "# *x*\n**Sys.A** The x **shall** go.\n\n**Sys.A** The x **shall** stop.\n";
        let diagnostics = index.analyze("file:///a.shalldn", text);

        assert_eq!(diagnostics.len(), 1);
        let duplicate = &diagnostics[0];
        assert_eq!(duplicate.category, Category::DuplicateIdentifier);
        assert_eq!(duplicate.range, Range::on_line(3, 2, 7));
        assert_eq!(duplicate.related.len(), 1);
        assert_eq!(
            duplicate.related[0].location.as_ref().map(|l| l.range.start.line),
            Some(1)
        );
    }

    #[test]
    fn subject_is_recorded() {
        let mut index = ProjectIndex::default();
        index.load("file:///a.shalldn", "# Requirements for the *exporter*\n");
        assert_eq!(index.subject("file:///a.shalldn"), Some("exporter"));
        assert_eq!(index.subject("file:///missing.shalldn"), None);
    }
}
