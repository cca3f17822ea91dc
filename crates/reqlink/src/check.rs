//! One-shot project check: load everything, validate once, report.

use std::path::Path;

use eyre::Result;
use facet::Facet;
use owo_colors::OwoColorize;
use reqlink_core::{Diagnostic, ProjectIndex};

use crate::config::Config;
use crate::policy::{Severity, SeverityPolicy};
use crate::workspace::{Workspace, uri_to_path};

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// A diagnostic with the severity the policy gave it
#[derive(Debug, Clone, Facet)]
pub struct Finding {
    /// Path relative to the project root
    pub path: String,
    pub severity: Severity,
    pub diagnostic: Diagnostic,
}

#[derive(Debug, Clone, Default, Facet)]
pub struct CheckReport {
    /// Number of files looked at
    pub files: usize,
    pub findings: Vec<Finding>,
}

impl CheckReport {
    pub fn errors(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warnings(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors() > 0
    }

    fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }
}

/// Check the project under `root`.
pub fn run_check(root: &Path, config: &Config) -> Result<CheckReport> {
    let workspace = Workspace::new(root, config)?;
    let policy = SeverityPolicy::from_config(config);
    let mut index = ProjectIndex::new(config.analysis_options());

    let files = workspace.load_into(&mut index);
    let results = index.validate_all();

    let mut findings = Vec::new();
    for file in results {
        let path = uri_to_path(&file.uri)
            .map(|p| {
                p.strip_prefix(workspace.root())
                    .unwrap_or(&p)
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .unwrap_or_else(|| file.uri.clone());

        for diagnostic in file.diagnostics {
            findings.push(Finding {
                path: path.clone(),
                severity: policy.severity(&file.uri, diagnostic.category),
                diagnostic,
            });
        }
    }

    Ok(CheckReport { files, findings })
}

/// Render a check report in the specified format
pub fn render_report(report: &CheckReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(report)),
        OutputFormat::Json => facet_json::to_string_pretty(report)
            .map_err(|e| eyre::eyre!("Failed to serialize report: {}", e)),
    }
}

fn render_text(report: &CheckReport) -> String {
    let mut output = String::new();

    for finding in &report.findings {
        let severity = match finding.severity {
            Severity::Error => finding.severity.as_str().red().bold().to_string(),
            Severity::Warning => finding.severity.as_str().yellow().bold().to_string(),
        };
        output.push_str(&format!(
            "{}:{} {}[{}] {}\n",
            finding.path,
            finding.diagnostic.range,
            severity,
            finding.diagnostic.category.dimmed(),
            finding.diagnostic.message
        ));
    }

    if !report.findings.is_empty() {
        output.push('\n');
    }

    let summary = format!(
        "Checked {} files: {} errors, {} warnings",
        report.files,
        report.errors(),
        report.warnings()
    );
    if report.has_errors() {
        output.push_str(&format!("{} {}\n", "!".red().bold(), summary));
    } else {
        output.push_str(&format!("{} {}\n", "OK".green().bold(), summary));
    }

    output
}
