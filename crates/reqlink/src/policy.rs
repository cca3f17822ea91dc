//! Mapping from finding categories to severities.
//!
//! The analysis itself never decides how loud a finding is. A policy starts
//! with everything as an error and can demote per category, per file, or
//! globally.

use std::collections::BTreeSet;

use facet::Facet;
use reqlink_core::Category;

use crate::config::Config;

/// How a finding is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Facet)]
#[repr(u8)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SeverityPolicy {
    warning_categories: BTreeSet<Category>,
    demote_errors: bool,
    demoted_uris: BTreeSet<String>,
}

impl SeverityPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            warning_categories: config.warning_categories().into_iter().collect(),
            demote_errors: config.demote_errors,
            demoted_uris: BTreeSet::new(),
        }
    }

    pub fn severity(&self, uri: &str, category: Category) -> Severity {
        if self.demote_errors
            || self.demoted_uris.contains(uri)
            || self.warning_categories.contains(&category)
        {
            Severity::Warning
        } else {
            Severity::Error
        }
    }

    pub fn demote_errors(&self) -> bool {
        self.demote_errors
    }

    pub fn set_demote_errors(&mut self, demote: bool) {
        self.demote_errors = demote;
    }

    /// Report everything in one file as warnings (or stop doing so)
    pub fn set_uri_demoted(&mut self, uri: &str, demote: bool) {
        if demote {
            self.demoted_uris.insert(uri.to_string());
        } else {
            self.demoted_uris.remove(uri);
        }
    }
}
