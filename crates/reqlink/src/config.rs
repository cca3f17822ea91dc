//! Configuration schema for reqlink
//!
//! Config lives at `.config/reqlink/config.yaml` relative to the project root.
//! Every field is optional:
//!
//! ```yaml
//! include: ["docs/**", "src/**"]
//! exclude: ["target/**"]
//! document_extensions: ["shalldn"]
//! implements_marker: "$$Implements"
//! related_information: true
//! demote_errors: false
//! warning_categories: ["no-implementation"]
//! ```

use facet::Facet;
use reqlink_core::{AnalysisOptions, Category, DEFAULT_DOCUMENT_EXTENSION, DEFAULT_MARKER};
use tracing::warn;

/// Path of the config file, relative to the project root
pub const CONFIG_PATH: &str = ".config/reqlink/config.yaml";

/// Root configuration for reqlink
#[derive(Debug, Clone, Default, Facet)]
pub struct Config {
    /// Glob patterns of files to index. Defaults to everything.
    #[facet(default)]
    pub include: Vec<String>,

    /// Glob patterns to skip. Defaults to `target/**`.
    #[facet(default)]
    pub exclude: Vec<String>,

    /// Extensions of requirement documents. Defaults to `shalldn`.
    #[facet(default)]
    pub document_extensions: Vec<String>,

    /// Marker that introduces implementation references in other files
    #[facet(default)]
    pub implements_marker: Option<String>,

    /// Attach related information to diagnostics
    #[facet(default)]
    pub related_information: bool,

    /// Report every finding as a warning
    #[facet(default)]
    pub demote_errors: bool,

    /// Categories always reported as warnings, by tag (e.g. `no-implementation`)
    #[facet(default)]
    pub warning_categories: Vec<String>,
}

impl Config {
    pub fn include_patterns(&self) -> Vec<String> {
        if self.include.is_empty() {
            vec!["**/*".to_string()]
        } else {
            self.include.clone()
        }
    }

    pub fn exclude_patterns(&self) -> Vec<String> {
        if self.exclude.is_empty() {
            vec!["target/**".to_string()]
        } else {
            self.exclude.clone()
        }
    }

    /// Options handed to the project index
    pub fn analysis_options(&self) -> AnalysisOptions {
        let document_extensions = if self.document_extensions.is_empty() {
            vec![DEFAULT_DOCUMENT_EXTENSION.to_string()]
        } else {
            self.document_extensions.clone()
        };

        AnalysisOptions {
            related_information: self.related_information,
            document_extensions,
            implements_marker: self
                .implements_marker
                .clone()
                .unwrap_or_else(|| DEFAULT_MARKER.to_string()),
        }
    }

    /// Categories listed in `warning_categories`. Unknown tags are skipped.
    pub fn warning_categories(&self) -> Vec<Category> {
        self.warning_categories
            .iter()
            .filter_map(|tag| {
                let category = Category::parse(tag);
                if category.is_none() {
                    warn!("Unknown diagnostic category in config: {}", tag);
                }
                category
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = facet_yaml::from_str("demote_errors: false\n").unwrap();
        assert_eq!(config.include_patterns(), vec!["**/*"]);
        assert_eq!(config.exclude_patterns(), vec!["target/**"]);
        assert_eq!(config.analysis_options(), AnalysisOptions::default());
        assert!(!config.demote_errors);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
include:
  - "docs/**"
  - "src/**"
exclude:
  - "docs/drafts/**"
document_extensions:
  - req
implements_marker: "@implements"
related_information: true
demote_errors: true
warning_categories:
  - no-implementation
  - made-up
"#;
        let config: Config = facet_yaml::from_str(yaml).unwrap();
        assert_eq!(config.include_patterns(), vec!["docs/**", "src/**"]);
        assert_eq!(config.exclude_patterns(), vec!["docs/drafts/**"]);

        let options = config.analysis_options();
        assert!(options.related_information);
        assert_eq!(options.document_extensions, vec!["req"]);
        assert_eq!(options.implements_marker, "@implements");

        assert!(config.demote_errors);
        assert_eq!(
            config.warning_categories(),
            vec![Category::NoImplementation]
        );
    }
}
