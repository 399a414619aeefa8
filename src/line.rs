//! Line-level value model: coverage values, per-session contributions, and
//! the `ReportLine` stored for each tracked source line.
//!
//! Coverage values come in three shapes. A plain hit count, a branch
//! fraction `covered/total`, and a bare partial-hit marker. The persisted
//! encoding keeps the historical wire shapes: a number, a `"c/t"` string,
//! and the boolean `true` respectively.

use std::cmp::Ordering;
use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Coverage state of a line, or of one session's contribution to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoverageValue {
    /// Plain hit count. Zero means the line was never executed.
    Hit(u64),
    /// Branch coverage `covered/total`.
    Fraction(u64, u64),
    /// Partial-hit marker with no branch detail.
    Partial,
}

/// Classification used by totals and by the merge order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CoverageKind {
    Miss,
    Partial,
    Hit,
}

impl CoverageValue {
    #[must_use]
    pub fn kind(&self) -> CoverageKind {
        match self {
            CoverageValue::Hit(0) => CoverageKind::Miss,
            CoverageValue::Hit(_) => CoverageKind::Hit,
            CoverageValue::Partial => CoverageKind::Partial,
            CoverageValue::Fraction(0, _) => CoverageKind::Miss,
            CoverageValue::Fraction(covered, total) if covered >= total => CoverageKind::Hit,
            CoverageValue::Fraction(..) => CoverageKind::Partial,
        }
    }
}

impl Default for CoverageValue {
    fn default() -> Self {
        CoverageValue::Hit(0)
    }
}

/// Total order for "worse than" comparisons: miss < partial < hit, ties
/// broken by the numeric payload. A `Fraction` outranks an equally
/// classified plain value since it carries branch detail.
impl Ord for CoverageValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use CoverageValue::*;
        self.kind().cmp(&other.kind()).then_with(|| match (self, other) {
            (Hit(a), Hit(b)) => a.cmp(b),
            (Fraction(c1, t1), Fraction(c2, t2)) => {
                let left = u128::from(*c1) * u128::from(*t2);
                let right = u128::from(*c2) * u128::from(*t1);
                left.cmp(&right).then_with(|| (c1, t1).cmp(&(c2, t2)))
            }
            (Fraction(..), _) => Ordering::Greater,
            (_, Fraction(..)) => Ordering::Less,
            // remaining pairs never share a kind
            _ => Ordering::Equal,
        })
    }
}

impl PartialOrd for CoverageValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CoverageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoverageValue::Hit(n) => write!(f, "{n}"),
            CoverageValue::Fraction(covered, total) => write!(f, "{covered}/{total}"),
            CoverageValue::Partial => f.write_str("partial"),
        }
    }
}

impl Serialize for CoverageValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CoverageValue::Hit(n) => serializer.serialize_u64(*n),
            CoverageValue::Fraction(covered, total) => {
                serializer.serialize_str(&format!("{covered}/{total}"))
            }
            CoverageValue::Partial => serializer.serialize_bool(true),
        }
    }
}

struct CoverageVisitor;

impl Visitor<'_> for CoverageVisitor {
    type Value = CoverageValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a hit count, a \"covered/total\" string, or a partial marker")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<CoverageValue, E> {
        Ok(CoverageValue::Hit(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<CoverageValue, E> {
        u64::try_from(value)
            .map(CoverageValue::Hit)
            .map_err(|_| E::custom(format!("negative hit count: {value}")))
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<CoverageValue, E> {
        // historical encodings used `true` for partial, `false` for miss
        Ok(if value {
            CoverageValue::Partial
        } else {
            CoverageValue::Hit(0)
        })
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<CoverageValue, E> {
        if let Some((covered, total)) = value.split_once('/') {
            let covered = covered
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("bad fraction: {value}")))?;
            let total = total
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("bad fraction: {value}")))?;
            Ok(CoverageValue::Fraction(covered, total))
        } else {
            value
                .trim()
                .parse()
                .map(CoverageValue::Hit)
                .map_err(|_| E::custom(format!("bad coverage value: {value}")))
        }
    }
}

impl<'de> Deserialize<'de> for CoverageValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CoverageVisitor)
    }
}

/// Cyclomatic-complexity style `(covered, total)` pair, persisted as a
/// two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Complexity {
    pub covered: u64,
    pub total: u64,
}

impl Serialize for Complexity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&self.covered)?;
        seq.serialize_element(&self.total)?;
        seq.end()
    }
}

struct ComplexityVisitor;

impl<'de> Visitor<'de> for ComplexityVisitor {
    type Value = Complexity;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a complexity count or a [covered, total] pair")
    }

    // old records stored a bare count with no total
    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Complexity, E> {
        Ok(Complexity { covered: value, total: 0 })
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Complexity, A::Error> {
        let covered = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let total = seq.next_element()?.unwrap_or(0);
        Ok(Complexity { covered, total })
    }
}

impl<'de> Deserialize<'de> for Complexity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ComplexityVisitor)
    }
}

/// Column range of a line that a session covered `hits` times, persisted as
/// `[start, end, hits]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinePartial {
    pub start: Option<u64>,
    pub end: Option<u64>,
    pub hits: u64,
}

impl Serialize for LinePartial {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(3))?;
        seq.serialize_element(&self.start)?;
        seq.serialize_element(&self.end)?;
        seq.serialize_element(&self.hits)?;
        seq.end()
    }
}

struct LinePartialVisitor;

impl<'de> Visitor<'de> for LinePartialVisitor {
    type Value = LinePartial;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a [start, end, hits] column range")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<LinePartial, A::Error> {
        let start = seq.next_element()?.unwrap_or(None);
        let end = seq.next_element()?.unwrap_or(None);
        let hits = seq.next_element()?.unwrap_or(0);
        Ok(LinePartial { start, end, hits })
    }
}

impl<'de> Deserialize<'de> for LinePartial {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(LinePartialVisitor)
    }
}

/// One upload session's contribution to a line.
///
/// Persisted as the five-element array
/// `[session_id, coverage, branches, partials, complexity]`. Decoding
/// accepts the short forms older records wrote (two or more elements).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSession {
    pub session_id: u32,
    pub coverage: CoverageValue,
    /// Labels of branch arms this session missed.
    pub branches: Option<Vec<String>>,
    pub partials: Option<Vec<LinePartial>>,
    pub complexity: Option<Complexity>,
}

impl LineSession {
    #[must_use]
    pub fn new(session_id: u32, coverage: CoverageValue) -> Self {
        LineSession {
            session_id,
            coverage,
            branches: None,
            partials: None,
            complexity: None,
        }
    }
}

impl Serialize for LineSession {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(5))?;
        seq.serialize_element(&self.session_id)?;
        seq.serialize_element(&self.coverage)?;
        seq.serialize_element(&self.branches)?;
        seq.serialize_element(&self.partials)?;
        seq.serialize_element(&self.complexity)?;
        seq.end()
    }
}

struct LineSessionVisitor;

impl<'de> Visitor<'de> for LineSessionVisitor {
    type Value = LineSession;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a [session_id, coverage, ...] array")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<LineSession, A::Error> {
        let session_id = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let coverage = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        let branches = seq.next_element()?.unwrap_or(None);
        let partials = seq.next_element()?.unwrap_or(None);
        let complexity = seq.next_element()?.unwrap_or(None);
        Ok(LineSession {
            session_id,
            coverage,
            branches,
            partials,
            complexity,
        })
    }
}

impl<'de> Deserialize<'de> for LineSession {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(LineSessionVisitor)
    }
}

/// Coverage state of one tracked source line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportLine {
    pub coverage: CoverageValue,
    /// Classification tag, preserved verbatim. `"b"` marks a branch line,
    /// `"m"` a method line; totals count both.
    pub line_type: Option<String>,
    /// Contributions in session append order.
    pub sessions: Vec<LineSession>,
    pub messages: Option<Vec<String>>,
    pub complexity: Option<Complexity>,
}

impl ReportLine {
    #[must_use]
    pub fn new(coverage: CoverageValue, sessions: Vec<LineSession>) -> Self {
        ReportLine {
            coverage,
            sessions,
            ..ReportLine::default()
        }
    }

    /// True when this line carries no information at all. Such a line is
    /// equivalent to "no line" and is rejected by storage.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
            && self.coverage == CoverageValue::Hit(0)
            && self.line_type.is_none()
            && self.messages.as_ref().map_or(true, |m| m.is_empty())
            && self.complexity.is_none()
    }
}
