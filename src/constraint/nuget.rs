//! NuGet version range parser
//!
//! Interval notation is shared with Maven. Unlike Maven, a bare version
//! (`1.0`) is an inclusive minimum, and floating versions (`1.*`,
//! `1.2.*`, `1.2.3-*`) match every version with that prefix.

use super::maven::parse_intervals;
use super::{parse_inequality_chain, Comparator, ConstraintParser, ConstraintPredicate, Op};
use crate::domain::Ecosystem;
use crate::version::ParsedVersion;

/// NuGet range parser
pub struct NuGetConstraintParser;

impl ConstraintParser for NuGetConstraintParser {
    fn parse(&self, constraint: &str) -> Option<ConstraintPredicate> {
        if constraint.starts_with(['[', '(']) {
            let alternatives = parse_intervals(constraint)?;
            if alternatives.iter().any(Vec::is_empty) {
                return Some(ConstraintPredicate::Any);
            }
            return Some(ConstraintPredicate::Ranges(alternatives));
        }

        if let Some(prefix) = constraint
            .strip_suffix(".*")
            .or_else(|| constraint.strip_suffix("-*"))
        {
            let release = ParsedVersion::parse(prefix)?.release;
            return Some(ConstraintPredicate::all_of(vec![Comparator::prefix(release)]));
        }

        if constraint.starts_with(|c: char| c.is_ascii_digit()) && !constraint.contains([',', ' ']) {
            return Some(ConstraintPredicate::all_of(vec![Comparator::parse(
                Op::Ge, constraint,
            )?]));
        }

        parse_inequality_chain(constraint)
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::NuGet
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allows(constraint: &str, version: &str) -> bool {
        NuGetConstraintParser
            .parse(constraint)
            .unwrap()
            .satisfied_by(version)
    }

    #[test]
    fn test_bare_version_is_minimum() {
        assert!(allows("6.0.0", "6.0.0"));
        assert!(allows("6.0.0", "13.0.1"));
        assert!(!allows("6.0.0", "5.9.9"));
    }

    #[test]
    fn test_intervals() {
        assert!(allows("[1.0, 2.0)", "1.9"));
        assert!(!allows("[1.0, 2.0)", "2.0"));
        assert!(allows("[4.1.3]", "4.1.3"));
    }

    #[test]
    fn test_floating() {
        assert!(allows("1.*", "1.7.2"));
        assert!(!allows("1.*", "2.0.0"));
        assert!(allows("1.2.*", "1.2.0"));
        assert!(!allows("1.2.*", "1.3.0"));
        assert!(allows("1.2.3-*", "1.2.3-beta1"));
    }

    #[test]
    fn test_malformed() {
        assert!(NuGetConstraintParser.parse("[1.0,2.0").is_none());
        assert!(NuGetConstraintParser.parse("abc.*").is_none());
    }
}
