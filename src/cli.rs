//! CLI argument parsing module for depconf

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::{Depth, Ecosystem};
use crate::error::ValidationError;
use crate::model::{Aggregator, ImpactAxis};
use crate::request::{parse_pins, OperationRequest};
use crate::solver::SolverOperation;

/// Default directory holding graph snapshots
pub const DEFAULT_GRAPH_DIR: &str = ".depconf/graphs";

fn to_limit(value: i64) -> Result<usize, ValidationError> {
    usize::try_from(value).map_err(|_| ValidationError::InvalidLimit { value })
}

/// Constraint modeling and impact optimization over dependency graphs
#[derive(Parser, Debug, Clone)]
#[command(
    name = "depconf",
    version,
    about = "Constraint modeling and impact optimization over dependency graphs"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    // Storage options
    /// Directory holding graph snapshots (<root>.json)
    #[arg(long, global = true, default_value = DEFAULT_GRAPH_DIR)]
    pub graph_dir: PathBuf,

    /// Directory for cached models and package records (overrides the settings file)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Settings file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    // Model options
    /// Dependency levels to include; -1 for the whole graph
    #[arg(long, global = true, default_value_t = -1, allow_negative_numbers = true)]
    pub depth: i64,

    /// Impact axis: package-impact or vulnerability-count
    #[arg(long, global = true, default_value = "package-impact")]
    pub axis: ImpactAxis,

    /// Aggregator: sum, mean or weighted-mean
    #[arg(long, global = true, default_value = "mean")]
    pub aggregator: Aggregator,

    // Output options
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Check that a configuration satisfying every requirement exists
    Valid {
        /// Root requirement file identifier
        root: String,
    },

    /// Find the configurations with the lowest impact
    Minimize {
        root: String,
        /// Number of configurations to return
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        limit: i64,
    },

    /// Find the configurations with the highest impact
    Maximize {
        root: String,
        /// Number of configurations to return
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        limit: i64,
    },

    /// Enumerate configurations whose impact lies within [min, max]
    Filter {
        root: String,
        /// Lowest accepted impact
        #[arg(long, allow_negative_numbers = true)]
        min: f64,
        /// Highest accepted impact
        #[arg(long, allow_negative_numbers = true)]
        max: f64,
        /// Number of configurations to return
        #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
        limit: i64,
    },

    /// Find the configuration whose impact is closest to a target
    ConfigByImpact {
        root: String,
        /// Target impact between 0 and 10
        #[arg(long, allow_negative_numbers = true)]
        impact: f64,
    },

    /// Complete a partial configuration (can pin multiple dependencies)
    Complete {
        root: String,
        /// Pinned version as name=serial
        #[arg(long = "pin", action = ArgAction::Append)]
        pins: Vec<String>,
    },

    /// Show dependency and requirement counts of a graph
    Info { root: String },

    /// List the numbered versions of a package
    Versions {
        /// Ecosystem: pypi, npm, cargo, maven, nuget or rubygems
        ecosystem: Ecosystem,
        package: String,
    },

    /// Show the normalized requirements of one package version
    Requires {
        /// Ecosystem: pypi, npm, cargo, maven, nuget or rubygems
        ecosystem: Ecosystem,
        package: String,
        version: String,
    },
}

impl CliArgs {
    /// Requested depth
    pub fn depth(&self) -> Result<Depth, ValidationError> {
        Depth::try_from(self.depth)
    }

    /// Cache directory, falling back to `default`
    pub fn cache_dir_or(&self, default: &std::path::Path) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| default.to_path_buf())
    }

    /// Solver request for the operation commands, `None` for queries
    pub fn operation_request(&self) -> Result<Option<OperationRequest>, ValidationError> {
        let (root, operation) = match &self.command {
            Command::Valid { root } => (root, SolverOperation::ValidityCheck),
            Command::Minimize { root, limit } => (
                root,
                SolverOperation::MinimizeImpact {
                    limit: to_limit(*limit)?,
                },
            ),
            Command::Maximize { root, limit } => (
                root,
                SolverOperation::MaximizeImpact {
                    limit: to_limit(*limit)?,
                },
            ),
            Command::Filter { root, min, max, limit } => (
                root,
                SolverOperation::FilterConfigs {
                    min: *min,
                    max: *max,
                    limit: to_limit(*limit)?,
                },
            ),
            Command::ConfigByImpact { root, impact } => (root, SolverOperation::ConfigByImpact { impact: *impact }),
            Command::Complete { root, pins } => (
                root,
                SolverOperation::CompleteConfig {
                    partial: parse_pins(pins)?,
                },
            ),
            Command::Info { .. } | Command::Versions { .. } | Command::Requires { .. } => return Ok(None),
        };

        let request = OperationRequest::new(root.clone(), operation)
            .with_depth(self.depth()?)
            .with_axis(self.axis)
            .with_aggregator(self.aggregator);
        request.validate()?;
        Ok(Some(request))
    }
}
