//! Maven version range parser
//!
//! Handles range formats:
//! - Closed: `[1.0,2.0]`
//! - Open: `(1.0,2.0)`
//! - Half-bounded: `[1.0,)`, `(,2.0]`
//! - Exact: `[1.0]`
//! - Unions: `(,1.0],[1.2,)`
//!
//! A bare version (`1.0`) is treated as an exact pin.

use super::{parse_inequality_chain, Comparator, ConstraintParser, ConstraintPredicate, Op};
use crate::domain::Ecosystem;

/// Maven range parser
pub struct MavenConstraintParser;

/// Parse bracketed interval notation shared by Maven and NuGet
///
/// Returns `None` if the text is not a well-formed union of intervals.
pub(crate) fn parse_intervals(constraint: &str) -> Option<Vec<Vec<Comparator>>> {
    let compact: String = constraint.chars().filter(|c| !c.is_whitespace()).collect();
    let mut alternatives = Vec::new();
    let mut rest = compact.as_str();

    while !rest.is_empty() {
        let open = rest.chars().next()?;
        if open != '[' && open != '(' {
            return None;
        }
        let close_at = rest.find([']', ')'])?;
        let close = rest[close_at..].chars().next()?;
        alternatives.push(parse_interval(open, &rest[1..close_at], close)?);
        rest = rest[close_at + 1..].trim_start_matches(',');
    }

    if alternatives.is_empty() {
        return None;
    }
    Some(alternatives)
}

fn parse_interval(open: char, body: &str, close: char) -> Option<Vec<Comparator>> {
    match body.split_once(',') {
        None => {
            // Only `[x]` is meaningful without a comma
            if open != '[' || close != ']' || body.is_empty() {
                return None;
            }
            Some(vec![Comparator::parse(Op::Eq, body)?])
        }
        Some((low, high)) => {
            let mut comparators = Vec::new();
            if !low.is_empty() {
                let op = if open == '[' { Op::Ge } else { Op::Gt };
                comparators.push(Comparator::parse(op, low)?);
            }
            if !high.is_empty() {
                let op = if close == ']' { Op::Le } else { Op::Lt };
                comparators.push(Comparator::parse(op, high)?);
            }
            Some(comparators)
        }
    }
}

impl ConstraintParser for MavenConstraintParser {
    fn parse(&self, constraint: &str) -> Option<ConstraintPredicate> {
        if constraint.starts_with(['[', '(']) {
            let alternatives = parse_intervals(constraint)?;
            if alternatives.iter().any(Vec::is_empty) {
                return Some(ConstraintPredicate::Any);
            }
            return Some(ConstraintPredicate::Ranges(alternatives));
        }
        parse_inequality_chain(constraint)
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Maven
    }
}
