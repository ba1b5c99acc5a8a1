//! PyPI (PEP 440) requirement parser
//!
//! Handles specifier formats:
//! - Exact: `==1.2.3`, `===1.2.3`
//! - Exclusion: `!=1.2.3`, `!=1.2.*`
//! - Comparison: `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3`
//! - Compatible release: `~=1.4.2`
//! - Prefix: `==1.2.*`
//! - Lists: `>=1.0,<2.0,!=1.5`
//!
//! An exclusive `<V` on a final release also excludes the pre-releases of
//! `V` (`<2.0` rejects `2.0rc1`).

use regex::Regex;
use std::sync::LazyLock;

use super::{compatible_prefix, Comparator, ConstraintParser, ConstraintPredicate, Op};
use crate::domain::Ecosystem;
use crate::version::{ParsedVersion, Stage};

/// PyPI requirement parser
pub struct PyPIConstraintParser;

static SPECIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(===|==|!=|~=|<=|>=|<|>)?(.+)$").unwrap());
static EXTRAS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[[^\]]*\]").unwrap());

/// Remove extras, parentheses, quotes, whitespace and a leading project name
pub(crate) fn strip_noise(body: &str) -> String {
    let without_extras = EXTRAS_RE.replace_all(body, "");
    let cleaned: String = without_extras
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | '"' | '\''))
        .collect();

    if cleaned.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return match cleaned.find(['<', '>', '=', '!', '~']) {
            Some(index) => cleaned[index..].to_string(),
            None => String::new(),
        };
    }
    cleaned
}

fn parse_specifier(specifier: &str) -> Option<Vec<Comparator>> {
    let caps = SPECIFIER_RE.captures(specifier)?;
    let op = caps.get(1).map(|m| m.as_str()).unwrap_or("==");
    let version = &caps[2];

    if let Some(prefix) = version.strip_suffix(".*") {
        let release = ParsedVersion::parse(prefix)?.release;
        return match op {
            "==" => Some(vec![Comparator::prefix(release)]),
            "!=" => Some(vec![Comparator::new(
                Op::NotPrefix,
                ParsedVersion::from_release(release),
            )]),
            _ => None,
        };
    }

    let parsed = ParsedVersion::parse(version)?;
    let comparators = match op {
        "==" | "===" => vec![Comparator::new(Op::Eq, parsed)],
        "!=" => vec![Comparator::new(Op::NotEq, parsed)],
        "<" => vec![Comparator::new(Op::Lt, below_prereleases(parsed))],
        "<=" => vec![Comparator::new(Op::Le, parsed)],
        ">" => vec![Comparator::new(Op::Gt, parsed)],
        ">=" => vec![Comparator::new(Op::Ge, parsed)],
        "~=" => {
            let prefix = compatible_prefix(&parsed.release);
            vec![Comparator::new(Op::Ge, parsed), Comparator::prefix(prefix)]
        }
        _ => return None,
    };
    Some(comparators)
}

/// Lowest version sharing the release of a final `bound`
fn below_prereleases(bound: ParsedVersion) -> ParsedVersion {
    if bound.stage != Stage::Release {
        return bound;
    }
    ParsedVersion {
        stage: Stage::Dev,
        stage_number: 0,
        tail: String::new(),
        ..bound
    }
}

impl ConstraintParser for PyPIConstraintParser {
    fn parse(&self, constraint: &str) -> Option<ConstraintPredicate> {
        let mut comparators = Vec::new();
        for specifier in constraint.split(',').filter(|s| !s.is_empty()) {
            comparators.extend(parse_specifier(specifier)?);
        }
        if comparators.is_empty() {
            return Some(ConstraintPredicate::Any);
        }
        Some(ConstraintPredicate::all_of(comparators))
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::PyPI
    }
}
