//! LSP server for reqlink
//!
//! Keeps a [`ProjectIndex`] of the whole workspace up to date from editor
//! events and publishes its findings:
//! - Diagnostics: on open/change, for the edited file and every file linked
//!   to it through a requirement id
//! - Go-to-definition: jump from an id or phrase to where it is defined
//! - References: list every file claiming to implement it
//!
//! The custom request `reqlink/setErrorDemotion` switches findings between
//! errors and warnings, globally or for a single file.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use eyre::Result;
use reqlink_core as req;
use reqlink_core::ProjectIndex;
use serde::Deserialize;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result as LspResult;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing::{debug, info, warn};

use crate::policy::{Severity, SeverityPolicy};
use crate::workspace::Workspace;

/// Name of the request toggling error demotion
pub const SET_ERROR_DEMOTION: &str = "reqlink/setErrorDemotion";

/// Parameters of [`SET_ERROR_DEMOTION`]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetErrorDemotionParams {
    /// Report errors as warnings
    pub demote: bool,
    /// Only for this document; the whole workspace when absent
    #[serde(default)]
    pub uri: Option<Url>,
}

/// Run the LSP server over stdio
pub async fn run(root: PathBuf) -> Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(move |client| Backend::new(client, root))
        .custom_method(SET_ERROR_DEMOTION, Backend::set_error_demotion)
        .finish();
    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}

pub struct Backend {
    client: Client,
    settings: RwLock<Settings>,
    index: RwLock<ProjectIndex>,
    /// Document content cache for open documents: uri -> content
    documents: RwLock<HashMap<String, String>>,
    /// Last findings published per uri, so they can be re-rendered when the
    /// severity policy changes
    published: RwLock<HashMap<String, Vec<req::Diagnostic>>>,
}

struct Settings {
    root: PathBuf,
    workspace: Option<Workspace>,
    policy: SeverityPolicy,
}

impl Backend {
    pub fn new(client: Client, root: PathBuf) -> Self {
        Self {
            client,
            settings: RwLock::new(Settings {
                root,
                workspace: None,
                policy: SeverityPolicy::default(),
            }),
            index: RwLock::new(ProjectIndex::default()),
            documents: RwLock::new(HashMap::new()),
            published: RwLock::new(HashMap::new()),
        }
    }

    /// (Re)load the config of `root` and start over with an empty index.
    async fn configure(&self, root: PathBuf, client_related_information: bool) {
        let config = crate::load_config_or_default(&crate::config_path(&root));

        let mut options = config.analysis_options();
        options.related_information |= client_related_information;

        let workspace = match Workspace::new(&root, &config) {
            Ok(workspace) => Some(workspace),
            Err(e) => {
                warn!("{:#}", e);
                None
            }
        };

        *self.settings.write().await = Settings {
            root,
            workspace,
            policy: SeverityPolicy::from_config(&config),
        };
        *self.index.write().await = ProjectIndex::new(options);
    }

    /// Load every workspace file, then validate the project once.
    async fn load_workspace(&self) -> Vec<req::FileDiagnostics> {
        let settings = self.settings.read().await;
        let Some(workspace) = settings.workspace.as_ref() else {
            return Vec::new();
        };

        let mut index = self.index.write().await;
        let files = workspace.load_into(&mut index);

        // Open buffers win over what is on disk
        for (uri, text) in self.documents.read().await.iter() {
            index.load(uri, text);
        }

        let results = index.validate_all();
        info!("Indexed {} files under {}", files, settings.root.display());
        results
    }

    /// Analyze a document and refresh every file linked to it, before and
    /// after the edit.
    async fn refresh(&self, uri: &str, text: &str) {
        let (diagnostics, linked) = {
            let mut index = self.index.write().await;
            let mut linked = index.linked(uri);
            let diagnostics = index.analyze(uri, text);
            linked.extend(index.linked(uri));
            (diagnostics, revalidate_linked(&index, uri, linked))
        };

        self.publish(uri.to_string(), diagnostics).await;
        for (other, diagnostics) in linked {
            self.publish(other, diagnostics).await;
        }
    }

    /// Drop a document from the index and clear its diagnostics.
    async fn forget(&self, uri: &str) {
        let linked = {
            let mut index = self.index.write().await;
            let linked = index.linked(uri);
            index.remove(uri);
            revalidate_linked(&index, uri, linked)
        };

        self.published.write().await.remove(uri);
        if let Ok(url) = Url::parse(uri) {
            self.client.publish_diagnostics(url, Vec::new(), None).await;
        }
        for (other, diagnostics) in linked {
            self.publish(other, diagnostics).await;
        }
    }

    /// Refresh a document from disk when the editor is not holding it.
    async fn reload_from_disk(&self, uri: &Url) {
        let Ok(path) = uri.to_file_path() else {
            return;
        };
        let included = self
            .settings
            .read()
            .await
            .workspace
            .as_ref()
            .is_some_and(|w| w.is_included(&path));

        match tokio::fs::read_to_string(&path).await {
            Ok(text) if included => self.refresh(uri.as_str(), &text).await,
            Ok(_) => self.forget(uri.as_str()).await,
            Err(e) => {
                debug!("Dropping {}: {}", path.display(), e);
                self.forget(uri.as_str()).await;
            }
        }
    }

    async fn publish(&self, uri: String, diagnostics: Vec<req::Diagnostic>) {
        let Ok(url) = Url::parse(&uri) else {
            return;
        };

        let lsp_diagnostics: Vec<Diagnostic> = {
            let settings = self.settings.read().await;
            diagnostics
                .iter()
                .map(|d| to_lsp_diagnostic(&url, d, settings.policy.severity(&uri, d.category)))
                .collect()
        };

        self.published.write().await.insert(uri, diagnostics);
        self.client
            .publish_diagnostics(url, lsp_diagnostics, None)
            .await;
    }

    /// Publish everything again, e.g. after the severity policy changed.
    async fn republish(&self) {
        let published: Vec<(String, Vec<req::Diagnostic>)> = self
            .published
            .read()
            .await
            .iter()
            .map(|(uri, diagnostics)| (uri.clone(), diagnostics.clone()))
            .collect();

        for (uri, diagnostics) in published {
            self.publish(uri, diagnostics).await;
        }
    }

    /// Handler of [`SET_ERROR_DEMOTION`]. Returns the new demotion state.
    pub async fn set_error_demotion(&self, params: SetErrorDemotionParams) -> LspResult<bool> {
        {
            let mut settings = self.settings.write().await;
            match &params.uri {
                Some(uri) => settings.policy.set_uri_demoted(uri.as_str(), params.demote),
                None => settings.policy.set_demote_errors(params.demote),
            }
        }
        debug!(demote = params.demote, uri = ?params.uri, "error demotion changed");

        self.republish().await;
        Ok(params.demote)
    }

    async fn text_of(&self, uri: &Url) -> Option<String> {
        if let Some(text) = self.documents.read().await.get(uri.as_str()) {
            return Some(text.clone());
        }
        let path = uri.to_file_path().ok()?;
        tokio::fs::read_to_string(path).await.ok()
    }

    async fn word_at(&self, uri: &Url, position: Position) -> Option<String> {
        let text = self.text_of(uri).await?;
        word_at_position(&text, position)
    }

    async fn register_file_watcher(&self) {
        let options = DidChangeWatchedFilesRegistrationOptions {
            watchers: vec![FileSystemWatcher {
                glob_pattern: GlobPattern::String("**/*".to_string()),
                kind: None,
            }],
        };
        let registration = Registration {
            id: "reqlink-watched-files".to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: serde_json::to_value(options).ok(),
        };

        if let Err(e) = self.client.register_capability(vec![registration]).await {
            debug!("File watching unavailable: {}", e);
        }
    }
}

/// Fresh diagnostics for every linked file except `uri` itself
fn revalidate_linked(
    index: &ProjectIndex,
    uri: &str,
    linked: BTreeSet<String>,
) -> Vec<(String, Vec<req::Diagnostic>)> {
    linked
        .into_iter()
        .filter(|other| other != uri)
        .filter_map(|other| {
            let diagnostics = index.revalidate(&other)?;
            Some((other, diagnostics))
        })
        .collect()
}

/// Identifier or emphasised phrase under the cursor
pub fn word_at_position(text: &str, position: Position) -> Option<String> {
    let line = req::lines(text).nth(position.line as usize)?;
    let byte = req::byte_offset(line, position.character);
    req::ident::word_at(line, byte).map(|(_, word)| word.to_string())
}

fn to_lsp_range(range: req::Range) -> Range {
    Range::new(
        Position::new(range.start.line, range.start.character),
        Position::new(range.end.line, range.end.character),
    )
}

fn to_lsp_location(location: req::Location) -> Option<Location> {
    let uri = Url::parse(&location.uri).ok()?;
    Some(Location::new(uri, to_lsp_range(location.range)))
}

/// Convert a finding to an LSP diagnostic with the given severity.
///
/// Related information without a location of its own points back at the
/// diagnostic.
pub fn to_lsp_diagnostic(url: &Url, diagnostic: &req::Diagnostic, severity: Severity) -> Diagnostic {
    let range = to_lsp_range(diagnostic.range);

    let related_information = (!diagnostic.related.is_empty()).then(|| {
        diagnostic
            .related
            .iter()
            .map(|related| DiagnosticRelatedInformation {
                location: related
                    .location
                    .clone()
                    .and_then(to_lsp_location)
                    .unwrap_or_else(|| Location::new(url.clone(), range)),
                message: related.message.clone(),
            })
            .collect()
    });

    Diagnostic {
        range,
        severity: Some(match severity {
            Severity::Error => DiagnosticSeverity::ERROR,
            Severity::Warning => DiagnosticSeverity::WARNING,
        }),
        code: Some(NumberOrString::String(
            diagnostic.category.as_str().to_string(),
        )),
        source: Some("reqlink".into()),
        message: diagnostic.message.clone(),
        related_information,
        ..Default::default()
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> LspResult<InitializeResult> {
        #[allow(deprecated)]
        let root = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .map(|folder| folder.uri.clone())
            .or(params.root_uri.clone())
            .and_then(|uri| uri.to_file_path().ok());
        let root = match root {
            Some(root) => root,
            None => self.settings.read().await.root.clone(),
        };

        let client_related_information = params
            .capabilities
            .text_document
            .as_ref()
            .and_then(|t| t.publish_diagnostics.as_ref())
            .and_then(|p| p.related_information)
            .unwrap_or(false);

        self.configure(root, client_related_information).await;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                definition_provider: Some(OneOf::Left(true)),
                references_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "reqlink".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.register_file_watcher().await;

        let results = self.load_workspace().await;
        for file in results {
            self.publish(file.uri, file.diagnostics).await;
        }

        self.client
            .log_message(MessageType::INFO, "reqlink initialized")
            .await;
    }

    async fn shutdown(&self) -> LspResult<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        let text = params.text_document.text;
        self.documents
            .write()
            .await
            .insert(uri.clone(), text.clone());
        self.refresh(&uri, &text).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        // Full sync: the last change holds the whole document
        let Some(change) = params.content_changes.into_iter().last() else {
            return;
        };
        self.documents
            .write()
            .await
            .insert(uri.clone(), change.text.clone());
        self.refresh(&uri, &change.text).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.write().await.remove(uri.as_str());
        // The buffer may have held unsaved edits; what counts now is the disk
        self.reload_from_disk(&uri).await;
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        for change in params.changes {
            if self.documents.read().await.contains_key(change.uri.as_str()) {
                continue;
            }
            if change.typ == FileChangeType::DELETED {
                self.forget(change.uri.as_str()).await;
            } else {
                self.reload_from_disk(&change.uri).await;
            }
        }
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> LspResult<Option<GotoDefinitionResponse>> {
        let position = params.text_document_position_params;
        let Some(word) = self
            .word_at(&position.text_document.uri, position.position)
            .await
        else {
            return Ok(None);
        };

        let mut locations: Vec<Location> = self
            .index
            .read()
            .await
            .find_definition(&word)
            .into_iter()
            .filter_map(to_lsp_location)
            .collect();

        Ok(match locations.len() {
            0 => None,
            1 => locations.pop().map(GotoDefinitionResponse::Scalar),
            _ => Some(GotoDefinitionResponse::Array(locations)),
        })
    }

    async fn references(&self, params: ReferenceParams) -> LspResult<Option<Vec<Location>>> {
        let position = params.text_document_position;
        let Some(word) = self
            .word_at(&position.text_document.uri, position.position)
            .await
        else {
            return Ok(None);
        };

        let found = {
            let index = self.index.read().await;
            let mut found = Vec::new();
            if params.context.include_declaration {
                found.extend(index.find_definition(&word));
            }
            found.extend(index.find_references(&word));
            found
        };

        let locations: Vec<Location> = found.into_iter().filter_map(to_lsp_location).collect();
        Ok((!locations.is_empty()).then_some(locations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::path_to_uri;
    use reqlink_core::{Category, Phase};
    use std::fs;

    const REQS: &str = "# Requirements for the *exporter*\n\n\
                        **Export.HTML** The *exporter* **shall** write HTML.\n";

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("docs/reqs.shalldn"), REQS).unwrap();
        fs::write(
            dir.path().join("src/html.rs"),
            "// $$Implements Export.HTML\nfn html() {}\n",
        )
        .unwrap();
        dir
    }

    fn uri(dir: &tempfile::TempDir, relative: &str) -> String {
        path_to_uri(&dir.path().join(relative)).unwrap()
    }

    fn categories(diagnostics: Option<&Vec<req::Diagnostic>>) -> Vec<Category> {
        diagnostics
            .map(|d| d.iter().map(|d| d.category).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_workspace_load_and_linked_refresh() {
        let dir = project();
        let (service, _socket) =
            LspService::new(|client| Backend::new(client, dir.path().to_path_buf()));
        let backend = service.inner();

        backend.configure(dir.path().to_path_buf(), false).await;
        let results = backend.load_workspace().await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|f| f.diagnostics.is_empty()));
        assert_eq!(backend.index.read().await.phase(), Phase::Ready);

        let reqs = uri(&dir, "docs/reqs.shalldn");
        let html = uri(&dir, "src/html.rs");

        // Dropping the marker leaves the requirement without implementation
        backend.refresh(&html, "fn html() {}\n").await;
        assert_eq!(
            categories(backend.published.read().await.get(&reqs)),
            vec![Category::NoImplementation]
        );

        backend.refresh(&html, "// $$Implements Export.HTML\n").await;
        assert!(categories(backend.published.read().await.get(&reqs)).is_empty());

        // Removing the document makes the reference dangle
        backend.forget(&reqs).await;
        assert_eq!(
            categories(backend.published.read().await.get(&html)),
            vec![Category::UnresolvedReference]
        );
        assert!(backend.published.read().await.get(&reqs).is_none());
    }

    #[tokio::test]
    async fn test_set_error_demotion() {
        let dir = project();
        let (service, _socket) =
            LspService::new(|client| Backend::new(client, dir.path().to_path_buf()));
        let backend = service.inner();

        let demoted = backend
            .set_error_demotion(SetErrorDemotionParams {
                demote: true,
                uri: None,
            })
            .await
            .unwrap();
        assert!(demoted);
        assert!(backend.settings.read().await.policy.demote_errors());

        let file = Url::from_file_path(dir.path().join("docs/reqs.shalldn")).unwrap();
        backend
            .set_error_demotion(SetErrorDemotionParams {
                demote: false,
                uri: Some(file.clone()),
            })
            .await
            .unwrap();
        // Per-file toggles leave the global switch alone
        assert!(backend.settings.read().await.policy.demote_errors());
    }

    #[test]
    fn test_demotion_params_from_json() {
        let params: SetErrorDemotionParams =
            serde_json::from_value(serde_json::json!({ "demote": true })).unwrap();
        assert!(params.demote);
        assert!(params.uri.is_none());

        let params: SetErrorDemotionParams = serde_json::from_value(serde_json::json!({
            "demote": false,
            "uri": "file:///p/reqs.shalldn"
        }))
        .unwrap();
        assert_eq!(
            params.uri.map(|u| u.to_string()),
            Some("file:///p/reqs.shalldn".to_string())
        );
    }

    #[test]
    fn test_word_at_position() {
        let text = "# *x*\n* Implements **Export.HTML**, **Export.PDF**\n";
        assert_eq!(
            word_at_position(text, Position::new(1, 17)).as_deref(),
            Some("Export.HTML")
        );
        assert_eq!(
            word_at_position(text, Position::new(0, 3)).as_deref(),
            Some("x")
        );
        assert_eq!(word_at_position(text, Position::new(9, 0)), None);
    }

    #[test]
    fn test_to_lsp_diagnostic() {
        let url = Url::parse("file:///p/reqs.shalldn").unwrap();
        let diagnostic = req::Diagnostic::missing_subject();
        let lsp = to_lsp_diagnostic(&url, &diagnostic, Severity::Warning);

        assert_eq!(lsp.severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(
            lsp.code,
            Some(NumberOrString::String("subject-mismatch".to_string()))
        );
        assert_eq!(lsp.source.as_deref(), Some("reqlink"));
        let related = lsp.related_information.unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].location.uri, url);

        let plain = req::Diagnostic::no_implementation("Sys.A", req::Range::on_line(2, 2, 7));
        let lsp = to_lsp_diagnostic(&url, &plain, Severity::Error);
        assert_eq!(lsp.severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(lsp.range, Range::new(Position::new(2, 2), Position::new(2, 7)));
        assert!(lsp.related_information.is_none());
    }
}
