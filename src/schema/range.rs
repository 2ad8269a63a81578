//! `_range` patterns such as `0 <= int < 10` or `float <= 1.5`.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

/// The accepted syntax. The metaschema's `rangePattern` rule uses the same expression.
pub const RANGE_PATTERN: &str = r"^ *(?:(-?[0-9]+(?:\.[0-9]+)?) *(<=?) *)?(int|float)(?: *(<=?) *(-?[0-9]+(?:\.[0-9]+)?))? *$";

lazy_static! {
    static ref RANGE: Regex = Regex::new(RANGE_PATTERN).unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericKind {
    Int,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Less,
    LessOrEqual,
}

impl Comparison {
    fn parse(op: &str) -> Self {
        if op == "<=" {
            Comparison::LessOrEqual
        } else {
            Comparison::Less
        }
    }

    fn holds(self, left: f64, right: f64) -> bool {
        match self {
            Comparison::Less => left < right,
            Comparison::LessOrEqual => left <= right,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeSpec {
    pub low: Option<(f64, Comparison)>,
    pub kind: NumericKind,
    pub high: Option<(Comparison, f64)>,
    /// The pattern as written in the schema.
    pub source: String,
}

impl RangeSpec {
    pub fn parse(text: &str) -> Option<Self> {
        let caps = RANGE.captures(text)?;
        let bound = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<f64>().ok());
        let op = |i: usize| caps.get(i).map(|m| Comparison::parse(m.as_str()));

        let low = match (bound(1), op(2)) {
            (Some(value), Some(cmp)) => Some((value, cmp)),
            _ => None,
        };
        let high = match (op(4), bound(5)) {
            (Some(cmp), Some(value)) => Some((cmp, value)),
            _ => None,
        };
        let kind = if &caps[3] == "int" {
            NumericKind::Int
        } else {
            NumericKind::Float
        };

        Some(Self {
            low,
            kind,
            high,
            source: text.trim().to_string(),
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        let above = self.low.map_or(true, |(low, cmp)| cmp.holds(low, value));
        let below = self.high.map_or(true, |(cmp, high)| cmp.holds(value, high));
        above && below
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_bounds() {
        let range = RangeSpec::parse("0 <= int < 10").unwrap();
        assert_eq!(range.kind, NumericKind::Int);
        assert!(range.contains(0.0));
        assert!(range.contains(9.0));
        assert!(!range.contains(10.0));
        assert!(!range.contains(-1.0));
    }

    #[test]
    fn float_exclusive_low() {
        let range = RangeSpec::parse("0 < float <= 1.0").unwrap();
        assert_eq!(range.kind, NumericKind::Float);
        assert!(range.contains(1.0));
        assert!(range.contains(0.5));
        assert!(!range.contains(0.0));
    }

    #[test]
    fn single_bounds_and_negatives() {
        let range = RangeSpec::parse("float < -2.5").unwrap();
        assert!(range.low.is_none());
        assert!(range.contains(-3.0));
        assert!(!range.contains(-2.5));

        let range = RangeSpec::parse("int").unwrap();
        assert!(range.contains(f64::MAX));
    }

    #[test]
    fn rejects_garbage() {
        assert!(RangeSpec::parse("1 <= number").is_none());
        assert!(RangeSpec::parse("int > 3").is_none());
        assert!(RangeSpec::parse("").is_none());
    }
}
