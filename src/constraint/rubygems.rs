//! RubyGems requirement parser
//!
//! Handles requirement formats:
//! - Exact: `= 1.2.3`, `1.2.3`
//! - Exclusion: `!= 1.2.3`
//! - Comparison: `>= 1.2.3`, `> 1.2.3`, `<= 1.2.3`, `< 1.2.3`
//! - Pessimistic: `~> 1.2.3` (>= 1.2.3, < 1.3), `~> 1.2` (>= 1.2, < 2.0)
//! - Lists: `>= 1.0, < 2.0`

use regex::Regex;
use std::sync::LazyLock;

use super::{compatible_prefix, Comparator, ConstraintParser, ConstraintPredicate, Op};
use crate::domain::Ecosystem;
use crate::version::ParsedVersion;

/// RubyGems requirement parser
pub struct RubyGemsConstraintParser;

static REQUIREMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(~>|>=|<=|!=|=|>|<)?\s*(\S+)$").unwrap());

fn parse_requirement(requirement: &str) -> Option<Vec<Comparator>> {
    let caps = REQUIREMENT_RE.captures(requirement.trim())?;
    let version = ParsedVersion::parse(&caps[2])?;
    let comparators = match caps.get(1).map(|m| m.as_str()) {
        Some("~>") => {
            let prefix = compatible_prefix(&version.release);
            vec![Comparator::new(Op::Ge, version), Comparator::prefix(prefix)]
        }
        Some(">=") => vec![Comparator::new(Op::Ge, version)],
        Some("<=") => vec![Comparator::new(Op::Le, version)],
        Some("!=") => vec![Comparator::new(Op::NotEq, version)],
        Some(">") => vec![Comparator::new(Op::Gt, version)],
        Some("<") => vec![Comparator::new(Op::Lt, version)],
        _ => vec![Comparator::new(Op::Eq, version)],
    };
    Some(comparators)
}

impl ConstraintParser for RubyGemsConstraintParser {
    fn parse(&self, constraint: &str) -> Option<ConstraintPredicate> {
        let mut comparators = Vec::new();
        for requirement in constraint.split(',').filter(|r| !r.trim().is_empty()) {
            comparators.extend(parse_requirement(requirement)?);
        }
        if comparators.is_empty() {
            return Some(ConstraintPredicate::Any);
        }
        Some(ConstraintPredicate::all_of(comparators))
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::RubyGems
    }
}
