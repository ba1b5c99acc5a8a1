//! Serial number assignment
//!
//! Serial numbers are a non-dense decimal packing of the ordering
//! components, so a version discovered later never forces existing
//! versions to be renumbered:
//!
//! ```text
//! serial = (major·10^10 + minor·10^6 + patch·10^2 + stage·10 + stage_number) · 100 + tie_rank
//! ```
//!
//! A field that overflows saturates, and so does every field below it, so
//! the packed key never inverts the natural order. Distinct strings that
//! share a packed key (fourth components, saturated fields, `1.0` against
//! `1.0.0`) are told apart by `tie_rank`, their rank among the package's
//! known versions with that key. Strings without a numeric release sort
//! last, above every packed key.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::{debug, warn};

use super::parsed::ParsedVersion;
use crate::domain::SerialNumber;

const MAJOR_MAX: u64 = 999_999;
const MINOR_MAX: u64 = 9_999;
const PATCH_MAX: u64 = 9_999;
const STAGE_MAX: u64 = 9;
const STAGE_NUMBER_MAX: u64 = 9;
const TIE_SLOTS: i64 = 100;

/// Base serial for versions that cannot be parsed; above every packed key
pub const FALLBACK_BASE: SerialNumber = 1_000_000_000_000_000_000;

/// Packed ordering key of one version string
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PackedKey {
    Packed(i64),
    Fallback,
}

fn pack(package: &str, raw: &str, parsed: &ParsedVersion) -> i64 {
    let mut fields = [
        (parsed.component(0), MAJOR_MAX),
        (parsed.component(1), MINOR_MAX),
        (parsed.component(2), PATCH_MAX),
        (parsed.stage.rank(), STAGE_MAX),
        (parsed.stage_number, STAGE_NUMBER_MAX),
    ];

    // Non-zero components past the third outrank every stage of the same
    // major.minor.patch, so they saturate the stage fields.
    if parsed.release.iter().skip(3).any(|c| *c != 0) {
        fields[3].0 = STAGE_MAX;
        fields[4].0 = STAGE_NUMBER_MAX;
    }

    let mut saturated = false;
    for (index, (value, max)) in fields.iter_mut().enumerate() {
        if saturated || *value > *max {
            if !saturated && index < 3 {
                debug!(package, version = raw, "version component out of range, saturating");
            }
            saturated = true;
            *value = *max;
        }
    }

    let [major, minor, patch, stage, stage_number] = fields.map(|(v, _)| v as i64);
    major * 10_000_000_000 + minor * 1_000_000 + patch * 100 + stage * 10 + stage_number
}

fn key_of(package: &str, raw: &str) -> (PackedKey, Option<ParsedVersion>) {
    match ParsedVersion::parse(raw) {
        Some(parsed) => (PackedKey::Packed(pack(package, raw, &parsed)), Some(parsed)),
        None => (PackedKey::Fallback, None),
    }
}

fn tie_order(
    a: (&str, Option<&ParsedVersion>),
    b: (&str, Option<&ParsedVersion>),
) -> Ordering {
    match (a.1, b.1) {
        (Some(pa), Some(pb)) => pa.cmp(pb).then_with(|| a.0.cmp(b.0)),
        _ => a.0.cmp(b.0),
    }
}

fn serial_from(package: &str, raw: &str, key: PackedKey, rank: usize) -> SerialNumber {
    let rank = if rank as i64 >= TIE_SLOTS {
        warn!(package, version = raw, rank, "too many versions share one serial slot");
        TIE_SLOTS - 1
    } else {
        rank as i64
    };
    match key {
        PackedKey::Packed(base) => base * TIE_SLOTS + rank,
        PackedKey::Fallback => FALLBACK_BASE + rank,
    }
}

/// Serial number of `version` among the package's `known_versions`
///
/// `version` need not be in `known_versions`; it is ranked as if it were.
/// The result is stable as long as the known-version set is unchanged.
pub fn totalize<S: AsRef<str>>(package: &str, version: &str, known_versions: &[S]) -> SerialNumber {
    let (key, parsed) = key_of(package, version);
    if key == PackedKey::Fallback {
        warn!(package, version, "unparseable version, sorting it last");
    }

    let mut tied: Vec<(&str, Option<ParsedVersion>)> = known_versions
        .iter()
        .map(AsRef::as_ref)
        .filter(|known| *known != version)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter_map(|known| {
            let (known_key, known_parsed) = key_of(package, known);
            (known_key == key).then_some((known, known_parsed))
        })
        .collect();
    tied.push((version, parsed));
    tied.sort_by(|a, b| tie_order((a.0, a.1.as_ref()), (b.0, b.1.as_ref())));

    let rank = tied
        .iter()
        .position(|(name, _)| *name == version)
        .unwrap_or(0);
    serial_from(package, version, key, rank)
}

/// Lowest serial of the tie group `version` falls into
///
/// Two versions share a group exactly when their serials differ only in
/// `tie_rank`.
pub fn slot_base(package: &str, version: &str) -> SerialNumber {
    let (key, _) = key_of(package, version);
    serial_from(package, version, key, 0)
}

/// Assign serial numbers to every distinct version of a package at once
///
/// Equivalent to calling [`totalize`] for each version against the whole
/// list, in input order with duplicates removed.
pub fn assign_serials<S: AsRef<str>>(package: &str, versions: &[S]) -> Vec<(String, SerialNumber)> {
    let mut seen = BTreeSet::new();
    let distinct: Vec<&str> = versions
        .iter()
        .map(AsRef::as_ref)
        .filter(|v| seen.insert(*v))
        .collect();

    let keyed: Vec<(PackedKey, &str, Option<ParsedVersion>)> = distinct
        .iter()
        .map(|raw| {
            let (key, parsed) = key_of(package, raw);
            if key == PackedKey::Fallback {
                warn!(package, version = *raw, "unparseable version, sorting it last");
            }
            (key, *raw, parsed)
        })
        .collect();

    let mut order: Vec<usize> = (0..keyed.len()).collect();
    order.sort_by(|&a, &b| {
        keyed[a].0.cmp(&keyed[b].0).then_with(|| {
            tie_order(
                (keyed[a].1, keyed[a].2.as_ref()),
                (keyed[b].1, keyed[b].2.as_ref()),
            )
        })
    });

    let mut serials = vec![0; keyed.len()];
    let mut rank = 0;
    for (position, &index) in order.iter().enumerate() {
        if position > 0 && keyed[order[position - 1]].0 != keyed[index].0 {
            rank = 0;
        }
        serials[index] = serial_from(package, keyed[index].1, keyed[index].0, rank);
        rank += 1;
    }

    distinct
        .into_iter()
        .zip(serials)
        .map(|(name, serial)| (name.to_string(), serial))
        .collect()
}
