//! Finding the files of a project and mapping them to document uris.

use std::path::{Path, PathBuf};

use eyre::{Result, WrapErr};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use reqlink_core::ProjectIndex;
use tower_lsp::lsp_types::Url;
use tracing::{debug, info};

use crate::config::Config;

/// The set of files reqlink looks at under a project root
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    include: GlobSet,
    exclude: GlobSet,
}

impl Workspace {
    pub fn new(root: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let root = std::path::absolute(root.as_ref())
            .wrap_err_with(|| format!("Invalid project root: {}", root.as_ref().display()))?;

        Ok(Self {
            root,
            include: build_globset(&config.include_patterns())?,
            exclude: build_globset(&config.exclude_patterns())?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path` is under the root, matches an include pattern and no
    /// exclude pattern. Gitignore rules are applied by [`Self::discover`] only.
    pub fn is_included(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        self.include.is_match(relative) && !self.exclude.is_match(relative)
    }

    /// All files of the project, sorted.
    pub fn discover(&self) -> Vec<PathBuf> {
        let walker = WalkBuilder::new(&self.root)
            .follow_links(true)
            .hidden(false)
            .git_ignore(true)
            .require_git(false)
            .filter_entry(|entry| entry.file_name() != ".git")
            .build();

        let mut files: Vec<PathBuf> = walker
            .flatten()
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .map(ignore::DirEntry::into_path)
            .filter(|path| self.is_included(path))
            .collect();
        files.sort();
        files
    }

    /// Register every readable project file with the index, without checks.
    ///
    /// Returns the number of files loaded. Files that are not valid UTF-8 are
    /// skipped.
    pub fn load_into(&self, index: &mut ProjectIndex) -> usize {
        let mut loaded = 0;
        for path in self.discover() {
            let Some(uri) = path_to_uri(&path) else {
                continue;
            };
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    index.load(&uri, &text);
                    loaded += 1;
                }
                Err(e) => debug!("Skipping {}: {}", path.display(), e),
            }
        }
        info!("Loaded {} files from {}", loaded, self.root.display());
        loaded
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).wrap_err_with(|| format!("Invalid glob pattern: {}", pattern))?;
        builder.add(glob);
    }
    builder.build().wrap_err("Failed to build glob set")
}

/// `file://` uri of an absolute path
pub fn path_to_uri(path: &Path) -> Option<String> {
    Url::from_file_path(path).ok().map(|url| url.to_string())
}

/// Local path of a `file://` uri
pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    Url::parse(uri).ok()?.to_file_path().ok()
}
