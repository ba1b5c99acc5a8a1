//! Requirement constraint parsing for different package ecosystems
//!
//! This module provides parsers for requirement syntax in:
//! - PyPI (PEP 440 specifier lists with environment markers)
//! - npm (node-semver ranges)
//! - Cargo (semver requirements)
//! - Maven (interval notation)
//! - NuGet (interval notation with floating versions)
//! - RubyGems (pessimistic requirements)
//!
//! Every parser produces a [`ConstraintPredicate`] that answers whether a
//! version string satisfies the requirement.

mod cargo;
mod markers;
mod maven;
mod npm;
mod nuget;
mod pypi;
mod rubygems;

pub use cargo::CargoConstraintParser;
pub use markers::{evaluate as evaluate_marker, MarkerVerdict, RuntimeTarget, DEFAULT_PYTHON};
pub use maven::MavenConstraintParser;
pub use npm::NpmConstraintParser;
pub use nuget::NuGetConstraintParser;
pub use pypi::PyPIConstraintParser;
pub use rubygems::RubyGemsConstraintParser;

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::domain::Ecosystem;
use crate::version::ParsedVersion;

/// Comparison operator of a single comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    NotEq,
    Gt,
    Ge,
    Lt,
    Le,
    /// Release components start with the comparator's components
    Prefix,
    /// Release components do not start with the comparator's components
    NotPrefix,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Op::Eq => "==",
            Op::NotEq => "!=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Prefix => "==*",
            Op::NotPrefix => "!=*",
        };
        write!(f, "{}", symbol)
    }
}

/// One operator applied to one version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    pub op: Op,
    pub version: ParsedVersion,
}

impl Comparator {
    pub fn new(op: Op, version: ParsedVersion) -> Self {
        Self { op, version }
    }

    /// Parse the version text; `None` if it is not a version
    pub fn parse(op: Op, version: &str) -> Option<Self> {
        ParsedVersion::parse(version).map(|version| Self::new(op, version))
    }

    /// Prefix comparator over release components
    pub fn prefix(release: Vec<u64>) -> Self {
        Self::new(Op::Prefix, ParsedVersion::from_release(release))
    }

    pub fn matches(&self, candidate: &ParsedVersion) -> bool {
        match self.op {
            Op::Eq => *candidate == self.version,
            Op::NotEq => *candidate != self.version,
            Op::Gt => *candidate > self.version,
            Op::Ge => *candidate >= self.version,
            Op::Lt => *candidate < self.version,
            Op::Le => *candidate <= self.version,
            Op::Prefix => candidate.has_release_prefix(&self.version.release),
            Op::NotPrefix => !candidate.has_release_prefix(&self.version.release),
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let release: Vec<String> = self.version.release.iter().map(u64::to_string).collect();
        write!(f, "{}{}", self.op, release.join("."))
    }
}

/// Predicate over versions produced by normalizing a requirement
#[derive(Debug, Clone)]
pub enum ConstraintPredicate {
    /// Every version satisfies the requirement
    Any,
    /// Disjunction of conjunctions of comparators
    Ranges(Vec<Vec<Comparator>>),
    /// A semver requirement (Cargo)
    Semver(semver::VersionReq),
}

impl ConstraintPredicate {
    /// A single conjunction of comparators
    pub fn all_of(comparators: Vec<Comparator>) -> Self {
        ConstraintPredicate::Ranges(vec![comparators])
    }

    /// Returns true if `version` satisfies the predicate
    ///
    /// A version that cannot be parsed only satisfies [`ConstraintPredicate::Any`].
    pub fn satisfied_by(&self, version: &str) -> bool {
        match self {
            ConstraintPredicate::Any => true,
            ConstraintPredicate::Ranges(alternatives) => {
                let Some(candidate) = ParsedVersion::parse(version) else {
                    return false;
                };
                alternatives
                    .iter()
                    .any(|conjunction| conjunction.iter().all(|c| c.matches(&candidate)))
            }
            ConstraintPredicate::Semver(req) => {
                cargo::lenient_semver(version).is_some_and(|v| req.matches(&v))
            }
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, ConstraintPredicate::Any)
    }
}

impl fmt::Display for ConstraintPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintPredicate::Any => write!(f, "*"),
            ConstraintPredicate::Ranges(alternatives) => {
                let rendered: Vec<String> = alternatives
                    .iter()
                    .map(|conjunction| {
                        conjunction
                            .iter()
                            .map(Comparator::to_string)
                            .collect::<Vec<_>>()
                            .join(",")
                    })
                    .collect();
                write!(f, "{}", rendered.join(" || "))
            }
            ConstraintPredicate::Semver(req) => write!(f, "{}", req),
        }
    }
}

/// Result of normalizing one requirement
#[derive(Debug, Clone)]
pub enum Normalized {
    /// The requirement applies and restricts versions by the predicate
    Predicate(ConstraintPredicate),
    /// The requirement does not apply to the target runtime
    Dropped { reason: String },
}

impl Normalized {
    pub fn predicate(&self) -> Option<&ConstraintPredicate> {
        match self {
            Normalized::Predicate(p) => Some(p),
            Normalized::Dropped { .. } => None,
        }
    }
}

/// Trait for parsing requirement syntax
pub trait ConstraintParser {
    /// Parse a cleaned, non-empty requirement; `None` if it is malformed
    fn parse(&self, constraint: &str) -> Option<ConstraintPredicate>;

    /// Returns the ecosystem this parser handles
    fn ecosystem(&self) -> Ecosystem;
}

/// Get a constraint parser for the specified ecosystem
pub fn get_parser(ecosystem: Ecosystem) -> Box<dyn ConstraintParser> {
    match ecosystem {
        Ecosystem::PyPI => Box::new(PyPIConstraintParser),
        Ecosystem::Npm => Box::new(NpmConstraintParser),
        Ecosystem::Cargo => Box::new(CargoConstraintParser),
        Ecosystem::Maven => Box::new(MavenConstraintParser),
        Ecosystem::NuGet => Box::new(NuGetConstraintParser),
        Ecosystem::RubyGems => Box::new(RubyGemsConstraintParser),
    }
}

/// Normalizes requirements against a runtime target
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    runtime: RuntimeTarget,
}

impl Normalizer {
    pub fn new(runtime: RuntimeTarget) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &RuntimeTarget {
        &self.runtime
    }

    /// Normalize a raw requirement string of `ecosystem`
    pub fn normalize(&self, ecosystem: Ecosystem, raw: &str) -> Normalized {
        let body = if ecosystem == Ecosystem::PyPI {
            let (body, marker) = markers::split_marker(raw);
            if let Some(marker) = marker {
                if let MarkerVerdict::Excluded(reason) = markers::evaluate(marker, &self.runtime) {
                    debug!(constraint = raw, %reason, "requirement dropped");
                    return Normalized::Dropped { reason };
                }
            }
            pypi::strip_noise(body)
        } else {
            raw.trim().to_string()
        };

        if is_unbounded(&body) {
            return Normalized::Predicate(ConstraintPredicate::Any);
        }

        match get_parser(ecosystem).parse(&body) {
            Some(predicate) => Normalized::Predicate(predicate),
            None => {
                warn!(%ecosystem, constraint = raw, "malformed constraint, accepting every version");
                Normalized::Predicate(ConstraintPredicate::Any)
            }
        }
    }
}

/// Normalize a raw requirement against the default runtime target
pub fn normalize(ecosystem: Ecosystem, raw: &str) -> Normalized {
    Normalizer::default().normalize(ecosystem, raw)
}

fn is_unbounded(constraint: &str) -> bool {
    let trimmed = constraint.trim();
    trimmed.is_empty()
        || trimmed == "*"
        || ["latest", "x", "any", "release"].iter().any(|k| trimmed.eq_ignore_ascii_case(k))
}

static INEQUALITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(==|!=|>=|<=|=|>|<)?\s*([0-9vV][^\s,<>=!]*)$").unwrap());

/// Parse a generic inequality chain such as `>=1.0,<2.0` or `>=1.0 <2.0`
///
/// A bare version is an exact match.
pub(crate) fn parse_inequality_chain(constraint: &str) -> Option<ConstraintPredicate> {
    let tokens = join_operators(constraint.split([',', ' ']).map(str::trim).filter(|t| !t.is_empty()));
    if tokens.is_empty() {
        return None;
    }

    let comparators = tokens
        .iter()
        .map(|token| {
            let caps = INEQUALITY_RE.captures(token)?;
            let op = match caps.get(1).map(|m| m.as_str()) {
                Some("!=") => Op::NotEq,
                Some(">=") => Op::Ge,
                Some("<=") => Op::Le,
                Some(">") => Op::Gt,
                Some("<") => Op::Lt,
                _ => Op::Eq,
            };
            Comparator::parse(op, &caps[2])
        })
        .collect::<Option<Vec<_>>>()?;

    Some(ConstraintPredicate::all_of(comparators))
}

/// Rejoin operators that were separated from their version by whitespace
pub(crate) fn join_operators<'a>(tokens: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut joined: Vec<String> = Vec::new();
    let mut pending = String::new();
    for token in tokens {
        if token.chars().all(|c| matches!(c, '<' | '>' | '=' | '!' | '~' | '^')) {
            pending.push_str(token);
        } else {
            joined.push(format!("{}{}", pending, token));
            pending.clear();
        }
    }
    if !pending.is_empty() {
        joined.push(pending);
    }
    joined
}

/// Upper prefix of a pessimistic/compatible requirement (`1.4.2` -> `1.4`)
pub(crate) fn compatible_prefix(release: &[u64]) -> Vec<u64> {
    if release.len() <= 1 {
        release.to_vec()
    } else {
        release[..release.len() - 1].to_vec()
    }
}
