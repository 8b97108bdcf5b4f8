//! Version parsing, comparison, ranges and constraints.
//!
//! Versions use Maven-style ordering rather than semver:
//! - Segments are split on `.` and `-` and at every digit/non-digit boundary
//! - Numeric segments compare as arbitrary-precision integers
//! - Known qualifiers are ordered
//!   `alpha` < `beta` < `milestone` < `rc` = `cr` < `snapshot` < `""` (release) < `sp`
//! - Unknown qualifiers sort after every known one, case-insensitively among themselves
//! - `0` and the release qualifier are the neutral element, so trailing ones
//!   never matter: `1` == `1.0` == `1.0.0-ga`

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::ParseError;

/// A parsed version with comparable segments.
#[derive(Debug, Clone)]
pub struct Version {
    original: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum Segment {
    /// Decimal digits with leading zeros stripped; zero is `""`.
    Numeric(String),
    Qualifier(QualifierKind),
    Text(String),
}

/// Well-known qualifiers with defined ordering.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
enum QualifierKind {
    Alpha,
    Beta,
    Milestone,
    Rc,
    Snapshot,
    Release,
    Sp,
}

/// Position of a segment in the total order. Variants are declared in ascending order.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
enum Rank {
    PreRelease,
    Neutral,
    ServicePack,
    Text,
    Number,
}

impl Segment {
    fn rank(&self) -> Rank {
        match self {
            Segment::Numeric(digits) if digits.is_empty() => Rank::Neutral,
            Segment::Numeric(_) => Rank::Number,
            Segment::Qualifier(QualifierKind::Release) => Rank::Neutral,
            Segment::Qualifier(QualifierKind::Sp) => Rank::ServicePack,
            Segment::Qualifier(_) => Rank::PreRelease,
            Segment::Text(_) => Rank::Text,
        }
    }

    fn is_neutral(&self) -> bool {
        self.rank() == Rank::Neutral
    }
}

impl Version {
    pub fn parse(version: &str) -> Result<Self, ParseError> {
        let trimmed = version.trim();
        if trimmed.is_empty() {
            return Err(ParseError::EmptyVersion);
        }
        if let Some(character) = trimmed
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '[' | ']' | '(' | ')' | ','))
        {
            return Err(ParseError::InvalidVersion {
                input: version.to_string(),
                character,
            });
        }
        Ok(Self {
            original: trimmed.to_string(),
            segments: parse_segments(trimmed),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.original
    }

    pub fn is_snapshot(&self) -> bool {
        self.original.ends_with("-SNAPSHOT")
    }

    /// Segments with trailing neutral elements removed.
    fn canonical(&self) -> &[Segment] {
        let len = self
            .segments
            .iter()
            .rposition(|s| !s.is_neutral())
            .map_or(0, |i| i + 1);
        &self.segments[..len]
    }
}

impl FromStr for Version {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for seg in self.canonical() {
            let rank = seg.rank();
            rank.hash(state);
            match (rank, seg) {
                (Rank::Number, Segment::Numeric(digits)) => digits.hash(state),
                (Rank::PreRelease, Segment::Qualifier(q)) => q.hash(state),
                (Rank::Text, Segment::Text(s)) => s.hash(state),
                _ => {}
            }
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let max_len = self.segments.len().max(other.segments.len());
        for i in 0..max_len {
            let a = self.segments.get(i);
            let b = other.segments.get(i);
            let ord = compare_segments(a, b);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn compare_segments(a: Option<&Segment>, b: Option<&Segment>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(s), None) => s.rank().cmp(&Rank::Neutral),
        (None, Some(s)) => Rank::Neutral.cmp(&s.rank()),
        (Some(a), Some(b)) => compare_two_segments(a, b),
    }
}

fn compare_two_segments(a: &Segment, b: &Segment) -> Ordering {
    let by_rank = a.rank().cmp(&b.rank());
    if by_rank != Ordering::Equal {
        return by_rank;
    }
    match (a, b) {
        (Segment::Numeric(a), Segment::Numeric(b)) => compare_digits(a, b),
        (Segment::Qualifier(a), Segment::Qualifier(b)) if a.rank_is_pre_release() => a.cmp(b),
        (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
        // Same rank but different kinds: only the neutral pair remains.
        _ => Ordering::Equal,
    }
}

impl QualifierKind {
    fn rank_is_pre_release(&self) -> bool {
        *self < QualifierKind::Release
    }
}

/// Compare two canonical digit strings numerically without overflow.
fn compare_digits(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn parse_segments(version: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut current_is_digit = false;

    for ch in version.chars() {
        if ch == '.' || ch == '-' {
            segments.push(classify(&current));
            current.clear();
            continue;
        }
        let is_digit = ch.is_ascii_digit();
        if !current.is_empty() && is_digit != current_is_digit {
            segments.push(classify(&current));
            current.clear();
        }
        current_is_digit = is_digit;
        current.push(ch);
    }
    if !current.is_empty() {
        segments.push(classify(&current));
    }

    segments
}

fn classify(token: &str) -> Segment {
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        return Segment::Numeric(token.trim_start_matches('0').to_string());
    }
    match token.to_lowercase().as_str() {
        "alpha" | "a" => Segment::Qualifier(QualifierKind::Alpha),
        "beta" | "b" => Segment::Qualifier(QualifierKind::Beta),
        "milestone" | "m" => Segment::Qualifier(QualifierKind::Milestone),
        "rc" | "cr" => Segment::Qualifier(QualifierKind::Rc),
        "snapshot" => Segment::Qualifier(QualifierKind::Snapshot),
        "" | "ga" | "final" | "release" => Segment::Qualifier(QualifierKind::Release),
        "sp" => Segment::Qualifier(QualifierKind::Sp),
        other => Segment::Text(other.to_string()),
    }
}

/// One side of a [`VersionRange`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bound {
    pub version: Version,
    pub inclusive: bool,
}

/// A version range expression.
///
/// Supports: `[1.0,2.0)`, `[1.0,]`, `(,2.0)`, `[1.0]` (exact).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

impl VersionRange {
    /// Parse a bracketed range literal.
    pub fn parse(spec: &str) -> Result<Self, ParseError> {
        let s = spec.trim();
        if !s.starts_with('[') && !s.starts_with('(') {
            return Err(ParseError::MissingOpenDelimiter {
                input: spec.to_string(),
            });
        }
        if s.len() < 2 || (!s.ends_with(']') && !s.ends_with(')')) {
            return Err(ParseError::MissingCloseDelimiter {
                input: spec.to_string(),
            });
        }

        let open_inclusive = s.starts_with('[');
        let close_inclusive = s.ends_with(']');
        let inner = &s[1..s.len() - 1];

        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        let range = match parts.as_slice() {
            [exact] => {
                if !open_inclusive || !close_inclusive || exact.is_empty() {
                    return Err(ParseError::ExactRangeNeedsBrackets {
                        input: spec.to_string(),
                    });
                }
                let v = Version::parse(exact)?;
                VersionRange {
                    lower: Some(Bound {
                        version: v.clone(),
                        inclusive: true,
                    }),
                    upper: Some(Bound {
                        version: v,
                        inclusive: true,
                    }),
                }
            }
            [lower, upper] => VersionRange {
                lower: parse_bound(lower, open_inclusive)?,
                upper: parse_bound(upper, close_inclusive)?,
            },
            _ => {
                return Err(ParseError::TooManyBounds {
                    input: spec.to_string(),
                })
            }
        };

        if let (Some(lower), Some(upper)) = (&range.lower, &range.upper) {
            match lower.version.cmp(&upper.version) {
                Ordering::Greater => {
                    return Err(ParseError::InvertedRange {
                        input: spec.to_string(),
                    })
                }
                Ordering::Equal if !(lower.inclusive && upper.inclusive) => {
                    return Err(ParseError::EmptyRange {
                        input: spec.to_string(),
                    })
                }
                _ => {}
            }
        }
        Ok(range)
    }

    /// The range containing exactly `version`.
    pub fn exact(version: Version) -> Self {
        VersionRange {
            lower: Some(Bound {
                version: version.clone(),
                inclusive: true,
            }),
            upper: Some(Bound {
                version,
                inclusive: true,
            }),
        }
    }

    /// Check if a version satisfies this range.
    pub fn contains(&self, version: &Version) -> bool {
        if let Some(ref lower) = self.lower {
            let cmp = version.cmp(&lower.version);
            if lower.inclusive {
                if cmp == Ordering::Less {
                    return false;
                }
            } else if cmp != Ordering::Greater {
                return false;
            }
        }
        if let Some(ref upper) = self.upper {
            let cmp = version.cmp(&upper.version);
            if upper.inclusive {
                if cmp == Ordering::Greater {
                    return false;
                }
            } else if cmp != Ordering::Less {
                return false;
            }
        }
        true
    }

    fn exact_version(&self) -> Option<&Version> {
        match (&self.lower, &self.upper) {
            (Some(l), Some(u)) if l.inclusive && u.inclusive && l.version == u.version => {
                Some(&l.version)
            }
            _ => None,
        }
    }
}

fn parse_bound(text: &str, inclusive: bool) -> Result<Option<Bound>, ParseError> {
    if text.is_empty() {
        return Ok(None);
    }
    Ok(Some(Bound {
        version: Version::parse(text)?,
        inclusive,
    }))
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(v) = self.exact_version() {
            return write!(f, "[{v}]");
        }
        match &self.lower {
            Some(b) => write!(f, "{}{}", if b.inclusive { '[' } else { '(' }, b.version)?,
            None => f.write_str("(")?,
        }
        f.write_str(",")?;
        match &self.upper {
            Some(b) => write!(f, "{}{}", b.version, if b.inclusive { ']' } else { ')' }),
            None => f.write_str(")"),
        }
    }
}

/// A soft recommended version, or a hard union of ranges.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionConstraint {
    Recommended(Version),
    Ranges(Vec<VersionRange>),
}

impl VersionConstraint {
    /// Parse a comma-separated list of ranges, or a single bare version.
    ///
    /// Mixing a bare version with ranges is rejected.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(ParseError::EmptyConstraint);
        }

        let mut ranges = Vec::new();
        let mut rest = s;
        while rest.starts_with('[') || rest.starts_with('(') {
            let close = rest
                .find([']', ')'])
                .ok_or_else(|| ParseError::MissingCloseDelimiter {
                    input: rest.to_string(),
                })?;
            ranges.push(VersionRange::parse(&rest[..=close])?);
            rest = rest[close + 1..].trim_start();
            if let Some(after_comma) = rest.strip_prefix(',') {
                rest = after_comma.trim_start();
                if rest.is_empty() {
                    return Err(ParseError::TrailingInput {
                        input: input.to_string(),
                        rest: ",".to_string(),
                    });
                }
            } else if !rest.is_empty() {
                return Err(ParseError::TrailingInput {
                    input: input.to_string(),
                    rest: rest.to_string(),
                });
            }
        }

        if !ranges.is_empty() {
            if !rest.is_empty() {
                return Err(ParseError::MixedConstraint {
                    input: input.to_string(),
                });
            }
            return Ok(VersionConstraint::Ranges(ranges));
        }
        if s.contains(['[', ']', '(', ')']) {
            return Err(ParseError::MixedConstraint {
                input: input.to_string(),
            });
        }
        if s.contains(',') {
            return Err(ParseError::MultipleRecommended {
                input: input.to_string(),
            });
        }
        Ok(VersionConstraint::Recommended(Version::parse(s)?))
    }

    /// The recommended version; `None` for range constraints.
    pub fn version(&self) -> Option<&Version> {
        match self {
            VersionConstraint::Recommended(v) => Some(v),
            VersionConstraint::Ranges(_) => None,
        }
    }

    pub fn ranges(&self) -> &[VersionRange] {
        match self {
            VersionConstraint::Recommended(_) => &[],
            VersionConstraint::Ranges(r) => r,
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, VersionConstraint::Ranges(_))
    }

    pub fn contains(&self, version: &Version) -> bool {
        match self {
            VersionConstraint::Recommended(v) => v == version,
            VersionConstraint::Ranges(ranges) => ranges.iter().any(|r| r.contains(version)),
        }
    }

    /// Highest candidate satisfying this constraint.
    pub fn highest_match<'a>(&self, candidates: &'a [Version]) -> Option<&'a Version> {
        candidates.iter().filter(|v| self.contains(v)).max()
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionConstraint::Recommended(v) => write!(f, "{v}"),
            VersionConstraint::Ranges(ranges) => {
                for (i, r) in ranges.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{r}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn basic_ordering() {
        assert!(v("1.0") < v("2.0"));
    }

    #[test]
    fn three_part_ordering() {
        let v1 = v("1.0.0");
        let v2 = v("1.0.1");
        let v3 = v("1.1.0");
        assert!(v1 < v2);
        assert!(v2 < v3);
    }

    #[test]
    fn qualifier_ordering() {
        let alpha = v("1.0-alpha");
        let beta = v("1.0-beta");
        let milestone = v("1.0-milestone");
        let rc = v("1.0-rc");
        let release = v("1.0");
        let sp = v("1.0-sp");

        assert!(alpha < beta);
        assert!(beta < milestone);
        assert!(milestone < rc);
        assert!(rc < release);
        assert!(release < sp);
        assert_eq!(v("1.0-rc"), v("1.0-cr"));
    }

    #[test]
    fn snapshot_before_release() {
        assert!(v("1.0-SNAPSHOT") < v("1.0"));
        assert!(v("1.0-rc") < v("1.0-SNAPSHOT"));
    }

    #[test]
    fn trailing_zeros_equal() {
        assert_eq!(v("1.0"), v("1.0.0"));
        assert_eq!(v("1"), v("1.0-ga"));
        assert_eq!(v("1.0-final"), v("1"));
    }

    #[test]
    fn unknown_qualifiers_after_known() {
        assert!(v("1.0-sp") < v("1.0-jre"));
        assert!(v("1.0") < v("1.0-jre"));
        assert!(v("1.0-android") < v("1.0-jre"));
        assert_eq!(v("1.0-JRE"), v("1.0-jre"));
    }

    #[test]
    fn positive_number_beats_text() {
        assert!(v("1.0.1") > v("1.0-jre"));
        assert!(v("31.0.1-jre") > v("31.0-jre"));
    }

    #[test]
    fn guava_style_versions() {
        assert!(v("31.0-jre") < v("32.0-jre"));
    }

    #[test]
    fn digit_letter_boundaries_split() {
        assert!(v("1a") < v("1b"));
        assert_eq!(v("1alpha2"), v("1-alpha-2"));
        assert!(v("1.0alpha1") < v("1.0alpha2"));
    }

    #[test]
    fn long_versions() {
        assert!(v("1.2.3.4.5") < v("1.2.3.4.6"));
    }

    #[test]
    fn huge_numbers_do_not_overflow() {
        let big = v("1.123456789012345678901234567890");
        let bigger = v("1.123456789012345678901234567891");
        assert!(big < bigger);
        assert_eq!(v("1.007"), v("1.7"));
    }

    #[test]
    fn equal_versions_hash_equal() {
        use std::collections::HashSet;
        let set: HashSet<Version> = ["1", "1.0", "1.0.0-ga", "1-final"]
            .into_iter()
            .map(v)
            .collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(Version::parse("  "), Err(ParseError::EmptyVersion));
        assert!(matches!(
            Version::parse("1.0,2.0"),
            Err(ParseError::InvalidVersion { character: ',', .. })
        ));
        assert!(Version::parse("1 0").is_err());
    }

    #[test]
    fn is_snapshot() {
        assert!(v("1.0-SNAPSHOT").is_snapshot());
        assert!(!v("1.0.0").is_snapshot());
    }

    #[test]
    fn display() {
        assert_eq!(v("1.8.0").to_string(), "1.8.0");
    }

    #[test]
    fn version_range_inclusive() {
        let range = VersionRange::parse("[1.0,2.0]").unwrap();
        assert!(range.contains(&v("1.0")));
        assert!(range.contains(&v("1.5")));
        assert!(range.contains(&v("2.0")));
        assert!(!range.contains(&v("0.9")));
        assert!(!range.contains(&v("2.1")));
    }

    #[test]
    fn version_range_exclusive_both() {
        let range = VersionRange::parse("(1.0,2.0)").unwrap();
        assert!(!range.contains(&v("1.0")));
        assert!(range.contains(&v("1.5")));
        assert!(!range.contains(&v("2.0")));
    }

    #[test]
    fn version_range_exclusive_upper() {
        let range = VersionRange::parse("[1.0,2.0)").unwrap();
        assert!(range.contains(&v("1.0")));
        assert!(range.contains(&v("1.9.9")));
        assert!(!range.contains(&v("2.0")));
    }

    #[test]
    fn version_range_open_sides() {
        let upper_only = VersionRange::parse("(,2.0)").unwrap();
        assert!(upper_only.contains(&v("1.0")));
        assert!(!upper_only.contains(&v("2.0")));

        let lower_only = VersionRange::parse("(1,)").unwrap();
        assert!(!lower_only.contains(&v("1")));
        assert!(lower_only.contains(&v("1.0.1")));
        assert!(lower_only.contains(&v("999")));
    }

    #[test]
    fn version_range_exact() {
        for spec in ["[1.5]", "[1.5,1.5]"] {
            let range = VersionRange::parse(spec).unwrap();
            assert!(range.contains(&v("1.5")));
            assert!(!range.contains(&v("1.4")));
            assert!(!range.contains(&v("1.6")));
        }
    }

    #[test]
    fn version_range_requires_delimiters() {
        assert!(matches!(
            VersionRange::parse("1.0"),
            Err(ParseError::MissingOpenDelimiter { .. })
        ));
        assert!(matches!(
            VersionRange::parse("[1.0,2.0"),
            Err(ParseError::MissingCloseDelimiter { .. })
        ));
        assert!(matches!(
            VersionRange::parse("1.0,2.0]"),
            Err(ParseError::MissingOpenDelimiter { .. })
        ));
    }

    #[test]
    fn version_range_rejects_bad_bounds() {
        assert!(matches!(
            VersionRange::parse("[1,2,3]"),
            Err(ParseError::TooManyBounds { .. })
        ));
        assert!(matches!(
            VersionRange::parse("(1)"),
            Err(ParseError::ExactRangeNeedsBrackets { .. })
        ));
        assert!(matches!(
            VersionRange::parse("[2,1]"),
            Err(ParseError::InvertedRange { .. })
        ));
        assert!(matches!(
            VersionRange::parse("[1,1)"),
            Err(ParseError::EmptyRange { .. })
        ));
    }

    #[test]
    fn version_range_display_reparses() {
        let samples = ["0.5", "1", "1.5", "2", "2.0.1", "3"];
        for spec in ["[1,2]", "(1,2)", "[1,2)", "(,2]", "[1,)", "[1.5]", "(,)"] {
            let range = VersionRange::parse(spec).unwrap();
            let reparsed = VersionRange::parse(&range.to_string()).unwrap();
            for s in samples {
                assert_eq!(
                    range.contains(&v(s)),
                    reparsed.contains(&v(s)),
                    "{spec} vs {reparsed} at {s}"
                );
            }
        }
        assert_eq!(VersionRange::parse("[1.5,1.5]").unwrap().to_string(), "[1.5]");
    }

    #[test]
    fn constraint_bare_version_is_soft() {
        let c = VersionConstraint::parse("1.2").unwrap();
        assert!(!c.is_range());
        assert_eq!(c.version(), Some(&v("1.2")));
        assert!(c.ranges().is_empty());
        assert!(c.contains(&v("1.2.0")));
        assert!(!c.contains(&v("1.3")));
    }

    #[test]
    fn constraint_union_of_ranges() {
        let c = VersionConstraint::parse("[1,3),(3,5)").unwrap();
        assert!(c.is_range());
        assert_eq!(c.version(), None);
        assert_eq!(c.ranges().len(), 2);
        for ok in ["1", "2", "4"] {
            assert!(c.contains(&v(ok)), "{ok}");
        }
        for bad in ["3", "5"] {
            assert!(!c.contains(&v(bad)), "{bad}");
        }
    }

    #[test]
    fn constraint_rejects_mixed_lists() {
        assert!(matches!(
            VersionConstraint::parse("[1,2],3"),
            Err(ParseError::MixedConstraint { .. })
        ));
        assert!(matches!(
            VersionConstraint::parse("3,[1,2]"),
            Err(ParseError::MixedConstraint { .. })
        ));
        assert!(VersionConstraint::parse("[1,2],(3,").is_err());
        assert!(matches!(
            VersionConstraint::parse("1,2"),
            Err(ParseError::MultipleRecommended { .. })
        ));
        assert_eq!(VersionConstraint::parse(""), Err(ParseError::EmptyConstraint));
        assert!(VersionConstraint::parse("[1,2],").is_err());
    }

    #[test]
    fn constraint_highest_match() {
        let c = VersionConstraint::parse("[1.0,2.0)").unwrap();
        let candidates: Vec<Version> = ["0.9", "1.0", "1.5", "2.0"].into_iter().map(v).collect();
        assert_eq!(c.highest_match(&candidates), Some(&v("1.5")));
    }

    #[test]
    fn constraint_display() {
        let c = VersionConstraint::parse("[1,3), (3,5)").unwrap();
        assert_eq!(c.to_string(), "[1,3),(3,5)");
    }
}
