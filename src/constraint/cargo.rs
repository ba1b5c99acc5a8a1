//! Cargo requirement parser
//!
//! Requirements are parsed by the `semver` crate, so a bare version is a
//! caret requirement (`1.2` means `^1.2`). Space-separated inequality
//! chains that `semver` rejects fall back to plain comparators.

use super::{parse_inequality_chain, ConstraintParser, ConstraintPredicate};
use crate::domain::Ecosystem;

/// Cargo requirement parser
pub struct CargoConstraintParser;

/// Parse a version, padding missing minor/patch components with zeros
pub(crate) fn lenient_semver(raw: &str) -> Option<semver::Version> {
    let trimmed = raw.trim().trim_start_matches(['v', 'V']);
    if let Ok(version) = semver::Version::parse(trimmed) {
        return Some(version);
    }

    let split = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, rest) = trimmed.split_at(split);
    let components = core.split('.').count();
    if components >= 3 {
        return None;
    }
    let padding = ".0".repeat(3 - components);
    semver::Version::parse(&format!("{}{}{}", core, padding, rest)).ok()
}

impl ConstraintParser for CargoConstraintParser {
    fn parse(&self, constraint: &str) -> Option<ConstraintPredicate> {
        match semver::VersionReq::parse(constraint) {
            Ok(req) => Some(ConstraintPredicate::Semver(req)),
            Err(_) => parse_inequality_chain(constraint),
        }
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Cargo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allows(constraint: &str, version: &str) -> bool {
        CargoConstraintParser
            .parse(constraint)
            .unwrap()
            .satisfied_by(version)
    }

    #[test]
    fn test_bare_version_is_caret() {
        assert!(allows("1.2", "1.9.0"));
        assert!(!allows("1.2", "2.0.0"));
        assert!(!allows("1.2", "1.1.9"));
    }

    #[test]
    fn test_zero_major_caret() {
        assert!(allows("0.3", "0.3.5"));
        assert!(!allows("0.3", "0.4.0"));
    }

    #[test]
    fn test_tilde_and_exact() {
        assert!(allows("~1.2.3", "1.2.9"));
        assert!(!allows("~1.2.3", "1.3.0"));
        assert!(allows("=1.2.3", "1.2.3"));
        assert!(!allows("=1.2.3", "1.2.4"));
    }

    #[test]
    fn test_prerelease_excluded_by_default() {
        assert!(!allows("^1.0", "1.5.0-alpha.1"));
    }

    #[test]
    fn test_space_separated_chain_falls_back() {
        assert!(allows(">=1.0 <2.0", "1.5.0"));
        assert!(!allows(">=1.0 <2.0", "2.0.0"));
    }

    #[test]
    fn test_lenient_semver() {
        assert_eq!(lenient_semver("1.2"), Some(semver::Version::new(1, 2, 0)));
        assert_eq!(lenient_semver("v3"), Some(semver::Version::new(3, 0, 0)));
        assert!(lenient_semver("1.2-rc.1").is_some());
        assert!(lenient_semver("1.2.3.4").is_none());
        assert!(lenient_semver("latest").is_none());
    }
}
