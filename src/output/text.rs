//! Text output formatter for human-readable display
//!
//! This module provides:
//! - Configurations as aligned dependency/version tables
//! - Colored status lines for found, not found and timed out outcomes
//! - Graph counts, package version lists and normalized requirements

use colored::Colorize;
use std::io::Write;

use crate::constraint::Normalized;
use crate::domain::{Configuration, GraphSummary, Outcome, Package};
use crate::output::{OutputFormatter, Verbosity};
use crate::service::NormalizedRequirement;

/// Minimum width of the name column
const MIN_NAME_WIDTH: usize = 20;

/// Text formatter for human-readable output
pub struct TextFormatter {
    verbosity: Verbosity,
    color: bool,
}

impl TextFormatter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self::with_color(verbosity, true)
    }

    pub fn with_color(verbosity: Verbosity, color: bool) -> Self {
        Self { verbosity, color }
    }

    fn plural(count: usize, singular: &str, plural: &str) -> String {
        format!("{} {}", count, if count == 1 { singular } else { plural })
    }

    fn format_configuration(
        &self,
        index: usize,
        config: &Configuration,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if self.verbosity != Verbosity::Quiet {
            let impact = config
                .impact
                .map(|v| format!(" (impact {:.2})", v))
                .unwrap_or_default();
            if self.color {
                writeln!(writer, "{}{}", format!("#{}", index + 1).bold(), impact.dimmed())?;
            } else {
                writeln!(writer, "#{}{}", index + 1, impact)?;
            }
        }

        let width = config
            .versions
            .keys()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max(MIN_NAME_WIDTH);
        for (name, chosen) in &config.versions {
            let serial = if self.verbosity == Verbosity::Verbose {
                format!(" [{}]", chosen.serial_number)
            } else {
                String::new()
            };
            if self.color {
                writeln!(
                    writer,
                    "  {:width$} {}{}",
                    name,
                    chosen.version.bright_white().bold(),
                    serial.dimmed(),
                    width = width
                )?;
            } else {
                writeln!(writer, "  {:width$} {}{}", name, chosen.version, serial, width = width)?;
            }
        }
        Ok(())
    }
}

impl OutputFormatter for TextFormatter {
    fn format_outcome(
        &self,
        root: &str,
        operation: &str,
        outcome: &Outcome,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        match outcome {
            Outcome::Configurations(configs) if configs.is_empty() => {
                let line = format!("{}: satisfiable", root);
                if self.color {
                    writeln!(writer, "{} {}", "✓".green(), line)?;
                } else {
                    writeln!(writer, "{}", line)?;
                }
            }
            Outcome::Configurations(configs) => {
                if self.verbosity != Verbosity::Quiet {
                    let header = format!(
                        "{} ({}) — {}",
                        root,
                        operation,
                        Self::plural(configs.len(), "configuration", "configurations")
                    );
                    if self.color {
                        writeln!(writer, "{}", header.bold())?;
                    } else {
                        writeln!(writer, "{}", header)?;
                    }
                }
                for (index, config) in configs.iter().enumerate() {
                    self.format_configuration(index, config, writer)?;
                }
            }
            Outcome::NotFound => {
                let line = format!("{}: no configuration found", root);
                if self.color {
                    writeln!(writer, "{} {}", "✗".yellow(), line.yellow())?;
                } else {
                    writeln!(writer, "{}", line)?;
                }
            }
            Outcome::TimedOut(message) => {
                if self.color {
                    writeln!(writer, "{} {}", "⏱".red(), message.red())?;
                } else {
                    writeln!(writer, "{}", message)?;
                }
            }
        }
        Ok(())
    }

    fn format_summary(&self, root: &str, summary: &GraphSummary, writer: &mut dyn Write) -> std::io::Result<()> {
        let counts = format!(
            "{}, {}, {}",
            Self::plural(summary.dependencies, "dependency", "dependencies"),
            Self::plural(summary.edges, "requirement", "requirements"),
            Self::plural(summary.vulnerable_versions, "vulnerable version", "vulnerable versions"),
        );
        if self.color {
            writeln!(writer, "{} {}", root.bold(), counts.dimmed())
        } else {
            writeln!(writer, "{} {}", root, counts)
        }
    }

    fn format_package(&self, package: &Package, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.verbosity != Verbosity::Quiet {
            let header = format!(
                "{} ({}) — {}",
                package.name,
                package.ecosystem,
                Self::plural(package.versions.len(), "version", "versions")
            );
            if self.color {
                writeln!(writer, "{}", header.bold())?;
            } else {
                writeln!(writer, "{}", header)?;
            }
        }

        let mut versions: Vec<_> = package.versions.iter().collect();
        versions.sort_by_key(|v| v.serial_number);
        let width = versions.iter().map(|v| v.name.len()).max().unwrap_or(0);
        for version in versions {
            let impact = match (version.impact.vulnerability_count, version.impact.mean) {
                (Some(count), Some(mean)) if count > 0 => format!(" {} vulns, mean {:.1}", count, mean),
                _ => String::new(),
            };
            if self.color {
                writeln!(
                    writer,
                    "  {:width$} {}{}",
                    version.name,
                    version.serial_number.to_string().dimmed(),
                    impact.red(),
                    width = width
                )?;
            } else {
                writeln!(
                    writer,
                    "  {:width$} {}{}",
                    version.name,
                    version.serial_number,
                    impact,
                    width = width
                )?;
            }
        }
        Ok(())
    }

    fn format_requirements(
        &self,
        package: &str,
        version: &str,
        requirements: &[NormalizedRequirement],
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if self.verbosity != Verbosity::Quiet {
            let header = format!(
                "{} {} — {}",
                package,
                version,
                Self::plural(requirements.len(), "requirement", "requirements")
            );
            if self.color {
                writeln!(writer, "{}", header.bold())?;
            } else {
                writeln!(writer, "{}", header)?;
            }
        }

        let width = requirements
            .iter()
            .map(|r| r.dependency.len())
            .max()
            .unwrap_or(0)
            .max(MIN_NAME_WIDTH);
        for requirement in requirements {
            let raw = if requirement.raw.is_empty() { "*" } else { requirement.raw.as_str() };
            match &requirement.normalized {
                Normalized::Predicate(predicate) => {
                    if self.color {
                        writeln!(
                            writer,
                            "  {:width$} {} {} {}",
                            requirement.dependency,
                            raw.dimmed(),
                            "→".dimmed(),
                            predicate.to_string().bright_white(),
                            width = width
                        )?;
                    } else {
                        writeln!(
                            writer,
                            "  {:width$} {} -> {}",
                            requirement.dependency,
                            raw,
                            predicate,
                            width = width
                        )?;
                    }
                }
                Normalized::Dropped { reason } => {
                    let line = format!("{:width$} {} (dropped: {})", requirement.dependency, raw, reason, width = width);
                    if self.color {
                        writeln!(writer, "  {}", line.dimmed())?;
                    } else {
                        writeln!(writer, "  {}", line)?;
                    }
                }
            }
        }
        Ok(())
    }
}
