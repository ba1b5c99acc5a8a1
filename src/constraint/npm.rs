//! npm (node-semver) range parser
//!
//! Handles range formats:
//! - Caret: `^1.2.3`, `^0.2`, `^1.x`
//! - Tilde: `~1.2.3`, `~1.2`
//! - X-ranges: `1.x`, `1.2.*`, `1`
//! - Comparison: `>=1.2.3 <2.0.0`, `>1`, `<=1.2`
//! - Hyphen ranges: `1.2.3 - 2.3.4`
//! - Unions: `^1.0.0 || ^2.0.0`
//!
//! Upper bounds are plain comparisons, so a pre-release of the next major
//! (`2.0.0-alpha`) satisfies `^1.2.3`.

use regex::Regex;
use std::sync::LazyLock;

use super::{join_operators, Comparator, ConstraintParser, ConstraintPredicate, Op};
use crate::domain::Ecosystem;
use crate::version::ParsedVersion;

/// npm range parser
pub struct NpmConstraintParser;

static HYPHEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\S+)\s+-\s+(\S+)$").unwrap());
static COMPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\^|~>|~|>=|<=|>|<|=)?v?(.+)$").unwrap());

/// A possibly partial version such as `1`, `1.2.x` or `1.2.3-beta.1`
#[derive(Debug, Clone)]
struct Partial {
    parts: Vec<u64>,
    prerelease: Option<String>,
}

impl Partial {
    fn parse(raw: &str) -> Option<Self> {
        let (core, prerelease) = match raw.split_once('-') {
            Some((core, pre)) => (core, Some(pre.to_string())),
            None => (raw, None),
        };
        let core = core.split('+').next().unwrap_or(core);

        let mut parts = Vec::new();
        for segment in core.split('.') {
            if matches!(segment, "x" | "X" | "*") {
                break;
            }
            parts.push(segment.parse::<u64>().ok()?);
        }
        if parts.len() > 3 {
            return None;
        }
        Some(Self { parts, prerelease })
    }

    fn is_full(&self) -> bool {
        self.parts.len() == 3
    }

    fn part(&self, index: usize) -> u64 {
        self.parts.get(index).copied().unwrap_or(0)
    }

    /// Lowest version the partial covers
    fn floor(&self) -> ParsedVersion {
        match (&self.prerelease, self.is_full()) {
            (Some(pre), true) => ParsedVersion::parse(&format!(
                "{}.{}.{}-{}",
                self.part(0),
                self.part(1),
                self.part(2),
                pre
            ))
            .unwrap_or_else(|| self.release_floor()),
            _ => self.release_floor(),
        }
    }

    fn release_floor(&self) -> ParsedVersion {
        ParsedVersion::from_release(vec![self.part(0), self.part(1), self.part(2)])
    }

    /// First version above everything the partial covers (`1.2` -> `1.3.0`)
    fn ceiling(&self) -> ParsedVersion {
        let release = match self.parts.len() {
            0 => vec![u64::MAX, 0, 0],
            1 => vec![self.part(0) + 1, 0, 0],
            2 => vec![self.part(0), self.part(1) + 1, 0],
            _ => vec![self.part(0), self.part(1), self.part(2) + 1],
        };
        ParsedVersion::from_release(release)
    }

    fn caret_ceiling(&self) -> ParsedVersion {
        let release = match (self.part(0), self.part(1), self.parts.len()) {
            (0, 0, 3) => vec![0, 0, self.part(2) + 1],
            (0, 0, 2) => vec![0, 1, 0],
            (0, minor, n) if n >= 2 => vec![0, minor + 1, 0],
            (major, _, _) => vec![major + 1, 0, 0],
        };
        ParsedVersion::from_release(release)
    }

    fn tilde_ceiling(&self) -> ParsedVersion {
        let release = if self.parts.len() <= 1 {
            vec![self.part(0) + 1, 0, 0]
        } else {
            vec![self.part(0), self.part(1) + 1, 0]
        };
        ParsedVersion::from_release(release)
    }
}

fn parse_comparator(token: &str) -> Option<Vec<Comparator>> {
    if matches!(token, "*" | "x" | "X") {
        return Some(Vec::new());
    }
    let caps = COMPARATOR_RE.captures(token)?;
    let op = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    let partial = Partial::parse(&caps[2])?;
    if partial.parts.is_empty() {
        return match op {
            "" | "=" | ">=" | "^" | "~" | "~>" => Some(Vec::new()),
            _ => None,
        };
    }

    let comparators = match op {
        "^" => vec![
            Comparator::new(Op::Ge, partial.floor()),
            Comparator::new(Op::Lt, partial.caret_ceiling()),
        ],
        "~" | "~>" => vec![
            Comparator::new(Op::Ge, partial.floor()),
            Comparator::new(Op::Lt, partial.tilde_ceiling()),
        ],
        ">=" => vec![Comparator::new(Op::Ge, partial.floor())],
        "<" => vec![Comparator::new(Op::Lt, partial.floor())],
        ">" if partial.is_full() => vec![Comparator::new(Op::Gt, partial.floor())],
        ">" => vec![Comparator::new(Op::Ge, partial.ceiling())],
        "<=" if partial.is_full() => vec![Comparator::new(Op::Le, partial.floor())],
        "<=" => vec![Comparator::new(Op::Lt, partial.ceiling())],
        _ if partial.is_full() => vec![Comparator::new(Op::Eq, partial.floor())],
        _ => vec![
            Comparator::new(Op::Ge, partial.floor()),
            Comparator::new(Op::Lt, partial.ceiling()),
        ],
    };
    Some(comparators)
}

fn parse_hyphen(low: &str, high: &str) -> Option<Vec<Comparator>> {
    let low = Partial::parse(low.trim_start_matches('v'))?;
    let high = Partial::parse(high.trim_start_matches('v'))?;
    let mut comparators = vec![Comparator::new(Op::Ge, low.floor())];
    if high.is_full() {
        comparators.push(Comparator::new(Op::Le, high.floor()));
    } else if !high.parts.is_empty() {
        comparators.push(Comparator::new(Op::Lt, high.ceiling()));
    }
    Some(comparators)
}

fn parse_range(range: &str) -> Option<Vec<Comparator>> {
    if let Some(caps) = HYPHEN_RE.captures(range) {
        return parse_hyphen(&caps[1], &caps[2]);
    }
    let mut comparators = Vec::new();
    let range = range.replace(',', " ");
    for token in join_operators(range.split_whitespace()) {
        comparators.extend(parse_comparator(&token)?);
    }
    Some(comparators)
}

impl ConstraintParser for NpmConstraintParser {
    fn parse(&self, constraint: &str) -> Option<ConstraintPredicate> {
        let mut alternatives = Vec::new();
        for range in constraint.split("||").map(str::trim) {
            let conjunction = if range.is_empty() {
                Vec::new()
            } else {
                parse_range(range)?
            };
            if conjunction.is_empty() {
                return Some(ConstraintPredicate::Any);
            }
            alternatives.push(conjunction);
        }
        Some(ConstraintPredicate::Ranges(alternatives))
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allows(constraint: &str, version: &str) -> bool {
        NpmConstraintParser
            .parse(constraint)
            .unwrap()
            .satisfied_by(version)
    }

    #[test]
    fn test_caret() {
        assert!(allows("^1.2.3", "1.2.3"));
        assert!(allows("^1.2.3", "1.9.0"));
        assert!(!allows("^1.2.3", "2.0.0"));
        assert!(!allows("^1.2.3", "1.2.2"));
    }

    #[test]
    fn test_caret_zero_major() {
        assert!(allows("^0.2.3", "0.2.9"));
        assert!(!allows("^0.2.3", "0.3.0"));
        assert!(allows("^0.0.3", "0.0.3"));
        assert!(!allows("^0.0.3", "0.0.4"));
        assert!(allows("^0.x", "0.9.0"));
        assert!(!allows("^0.x", "1.0.0"));
    }

    #[test]
    fn test_tilde() {
        assert!(allows("~1.2.3", "1.2.9"));
        assert!(!allows("~1.2.3", "1.3.0"));
        assert!(allows("~1", "1.9.0"));
        assert!(!allows("~1", "2.0.0"));
    }

    #[test]
    fn test_x_ranges() {
        assert!(allows("1.x", "1.4.0"));
        assert!(!allows("1.x", "2.0.0"));
        assert!(allows("1.2.*", "1.2.7"));
        assert!(!allows("1.2.*", "1.3.0"));
        assert!(allows("1", "1.0.1"));
    }

    #[test]
    fn test_exact() {
        assert!(allows("1.2.3", "1.2.3"));
        assert!(!allows("1.2.3", "1.2.4"));
        assert!(allows("=1.2.3-beta.1", "1.2.3-beta.1"));
    }

    #[test]
    fn test_comparisons_with_spaces() {
        assert!(allows(">= 1.2.0 < 2", "1.5.0"));
        assert!(!allows(">= 1.2.0 < 2", "2.0.0"));
        assert!(allows(">1", "2.0.0"));
        assert!(!allows(">1", "1.9.0"));
        assert!(allows("<=1.2", "1.2.9"));
        assert!(!allows("<=1.2", "1.3.0"));
    }

    #[test]
    fn test_hyphen_range() {
        assert!(allows("1.2.3 - 2.3.4", "2.3.4"));
        assert!(!allows("1.2.3 - 2.3.4", "2.3.5"));
        assert!(allows("1.2 - 2.3", "2.3.9"));
        assert!(!allows("1.2 - 2.3", "2.4.0"));
    }

    #[test]
    fn test_union() {
        assert!(allows("^1.0.0 || ^3.0.0", "1.5.0"));
        assert!(allows("^1.0.0 || ^3.0.0", "3.1.0"));
        assert!(!allows("^1.0.0 || ^3.0.0", "2.0.0"));
        assert!(NpmConstraintParser.parse("^1.0.0 || *").unwrap().is_any());
    }

    #[test]
    fn test_prerelease_of_next_major_is_admitted() {
        assert!(allows("^1.2.3", "2.0.0-alpha"));
    }

    #[test]
    fn test_non_semver_specs_are_malformed() {
        assert!(NpmConstraintParser.parse("git+https://github.com/a/b.git").is_none());
        assert!(NpmConstraintParser.parse("workspace:*").is_none());
        assert!(NpmConstraintParser.parse("file:../local").is_none());
    }
}
