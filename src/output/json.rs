//! JSON output formatter for machine processing
//!
//! This module provides:
//! - Operation outcomes in their tagged `status`/`result` form
//! - Graph counts, package version lists and normalized requirements

use crate::constraint::Normalized;
use crate::domain::{GraphSummary, ImpactAttributes, Outcome, Package};
use crate::output::{OutputFormatter, Verbosity};
use crate::service::NormalizedRequirement;
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbosity level affects detail in output
    verbosity: Verbosity,
}

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    fn write_json<T: Serialize>(value: &T, writer: &mut dyn Write) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
        writeln!(writer, "{}", json)
    }
}

/// JSON representation of an operation result
#[derive(Serialize)]
struct JsonOutcome<'a> {
    root: &'a str,
    operation: &'a str,
    #[serde(flatten)]
    outcome: &'a Outcome,
}

/// JSON representation of graph counts
#[derive(Serialize)]
struct JsonSummary<'a> {
    root: &'a str,
    #[serde(flatten)]
    summary: &'a GraphSummary,
}

/// JSON representation of a package record
#[derive(Serialize)]
struct JsonPackage<'a> {
    ecosystem: String,
    name: &'a str,
    refreshed_at: String,
    versions: Vec<JsonVersion<'a>>,
}

/// JSON representation of one numbered version
#[derive(Serialize)]
struct JsonVersion<'a> {
    version: &'a str,
    serial_number: i64,
    /// Impact attributes (only in verbose mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    impact: Option<&'a ImpactAttributes>,
}

/// JSON representation of the requirements of one version
#[derive(Serialize)]
struct JsonRequirements<'a> {
    package: &'a str,
    version: &'a str,
    requirements: Vec<JsonRequirement<'a>>,
}

/// JSON representation of one normalized requirement
#[derive(Serialize)]
struct JsonRequirement<'a> {
    dependency: &'a str,
    constraint: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    predicate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dropped: Option<&'a str>,
}

impl OutputFormatter for JsonFormatter {
    fn format_outcome(
        &self,
        root: &str,
        operation: &str,
        outcome: &Outcome,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        Self::write_json(
            &JsonOutcome {
                root,
                operation,
                outcome,
            },
            writer,
        )
    }

    fn format_summary(&self, root: &str, summary: &GraphSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        Self::write_json(&JsonSummary { root, summary }, writer)
    }

    fn format_package(&self, package: &Package, writer: &mut dyn Write) -> std::io::Result<()> {
        let mut versions: Vec<_> = package.versions.iter().collect();
        versions.sort_by_key(|v| v.serial_number);

        let output = JsonPackage {
            ecosystem: package.ecosystem.to_string(),
            name: &package.name,
            refreshed_at: package.refreshed_at.to_rfc3339(),
            versions: versions
                .into_iter()
                .map(|v| JsonVersion {
                    version: &v.name,
                    serial_number: v.serial_number,
                    impact: (self.verbosity == Verbosity::Verbose).then_some(&v.impact),
                })
                .collect(),
        };
        Self::write_json(&output, writer)
    }

    fn format_requirements(
        &self,
        package: &str,
        version: &str,
        requirements: &[NormalizedRequirement],
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let output = JsonRequirements {
            package,
            version,
            requirements: requirements
                .iter()
                .map(|r| {
                    let (predicate, dropped) = match &r.normalized {
                        Normalized::Predicate(p) => (Some(p.to_string()), None),
                        Normalized::Dropped { reason } => (None, Some(reason.as_str())),
                    };
                    JsonRequirement {
                        dependency: &r.dependency,
                        constraint: &r.raw,
                        predicate,
                        dropped,
                    }
                })
                .collect(),
        };
        Self::write_json(&output, writer)
    }
}
