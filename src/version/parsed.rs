//! Natural release ordering of version strings
//!
//! Numeric dot-separated components compare component-wise with zero
//! padding (`1.0` == `1.0.0`). A recognised pre-release tag sorts below the
//! release, a post-release tag above it, and an unrecognised textual or
//! numeric suffix sorts lexicographically after everything recognised.

use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

/// Release stage derived from the suffix after the numeric components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// `dev`
    Dev,
    /// `a`, `alpha`
    Alpha,
    /// `b`, `beta`
    Beta,
    /// `m`, `milestone`
    Milestone,
    /// `rc`, `c`, `cr`, `pre`, `preview`
    Candidate,
    /// `snapshot`
    Snapshot,
    /// No suffix, or `final`/`ga`/`release`
    Release,
    /// `post`, `r`, `rev`, `sp`, `p`, `patch`
    Post,
    /// Anything else
    Unknown,
}

impl Stage {
    /// Numeric rank used when packing serial numbers
    pub fn rank(&self) -> u64 {
        *self as u64
    }

    fn from_tag(tag: &str) -> Stage {
        match tag.to_ascii_lowercase().as_str() {
            "dev" => Stage::Dev,
            "a" | "alpha" => Stage::Alpha,
            "b" | "beta" => Stage::Beta,
            "m" | "milestone" => Stage::Milestone,
            "c" | "rc" | "cr" | "pre" | "preview" => Stage::Candidate,
            "snapshot" => Stage::Snapshot,
            "final" | "ga" | "release" => Stage::Release,
            "post" | "r" | "rev" | "sp" | "p" | "patch" => Stage::Post,
            _ => Stage::Unknown,
        }
    }
}

static SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z]+)[.\-_]?(\d*)(.*)$").unwrap());

/// A version string split into its ordering components
#[derive(Debug, Clone)]
pub struct ParsedVersion {
    /// Numeric release components
    pub release: Vec<u64>,
    /// Release stage
    pub stage: Stage,
    /// Number following the stage tag (`rc2` -> 2)
    pub stage_number: u64,
    /// Remaining text, compared lexicographically
    pub tail: String,
}

impl ParsedVersion {
    /// Parse a version string; `None` if it has no leading numeric component
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let trimmed = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        // Build metadata never takes part in ordering
        let trimmed = trimmed.split('+').next().unwrap_or("");

        let bytes = trimmed.as_bytes();
        let mut release = Vec::new();
        let mut pos = 0;
        loop {
            let start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            if pos == start {
                break;
            }
            release.push(trimmed[start..pos].parse::<u64>().unwrap_or(u64::MAX));
            if pos + 1 < bytes.len() && bytes[pos] == b'.' && bytes[pos + 1].is_ascii_digit() {
                pos += 1;
            } else {
                break;
            }
        }

        if release.is_empty() {
            return None;
        }

        let rest = trimmed[pos..].trim_start_matches(['.', '-', '_']);
        if rest.is_empty() {
            return Some(Self {
                release,
                stage: Stage::Release,
                stage_number: 0,
                tail: String::new(),
            });
        }

        if let Some(caps) = SUFFIX_RE.captures(rest) {
            let stage = Stage::from_tag(&caps[1]);
            if stage != Stage::Unknown {
                return Some(Self {
                    release,
                    stage,
                    stage_number: caps[2].parse().unwrap_or(0),
                    tail: caps[3].to_string(),
                });
            }
        }

        Some(Self {
            release,
            stage: Stage::Unknown,
            stage_number: 0,
            tail: rest.to_string(),
        })
    }

    /// A final release with the given numeric components
    pub fn from_release(release: Vec<u64>) -> Self {
        Self {
            release,
            stage: Stage::Release,
            stage_number: 0,
            tail: String::new(),
        }
    }

    /// Release component at `index`, zero when absent
    pub fn component(&self, index: usize) -> u64 {
        self.release.get(index).copied().unwrap_or(0)
    }

    /// Compare only the numeric release components, zero padded
    pub fn cmp_release(&self, other: &Self) -> Ordering {
        let len = self.release.len().max(other.release.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }

    /// Returns true if the release components start with `prefix` (zero padded)
    pub fn has_release_prefix(&self, prefix: &[u64]) -> bool {
        prefix
            .iter()
            .enumerate()
            .all(|(i, part)| self.component(i) == *part)
    }

    /// Returns true for any stage below a final release
    pub fn is_prerelease(&self) -> bool {
        self.stage < Stage::Release
    }
}

impl Ord for ParsedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_release(other)
            .then(self.stage.cmp(&other.stage))
            .then(self.stage_number.cmp(&other.stage_number))
            .then_with(|| self.tail.cmp(&other.tail))
    }
}

impl PartialOrd for ParsedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ParsedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ParsedVersion {}

/// Compare two version strings by natural release order
///
/// Unparseable strings sort after parseable ones and among themselves
/// lexicographically.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (ParsedVersion::parse(a), ParsedVersion::parse(b)) {
        (Some(pa), Some(pb)) => pa.cmp(&pb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}
