//! Closed integer intervals.
//!
//! [`Range`] is used both as the bound of a numeric slice and as an axis
//! descriptor when summarizing groups. It has no notion of an unbounded
//! range.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An immutable closed interval `[min, max]` over `i32`.
///
/// `min <= max` always holds; [`Range::new`] swaps reversed bounds.
///
/// # Examples
///
/// ```rust
/// use playcube::Range;
///
/// let yards = Range::new(10, 0);
/// assert_eq!(yards.lower(), 0);
/// assert_eq!(yards.upper(), 10);
/// assert!(yards.contains(10));
/// assert!(!yards.contains(11));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Bounds", into = "Bounds")]
pub struct Range {
    min: i32,
    max: i32,
}

/// Serialized form; routed through [`Range::new`] so reversed bounds are fixed on load.
#[derive(Serialize, Deserialize)]
struct Bounds {
    min: i32,
    max: i32,
}

impl From<Bounds> for Range {
    fn from(bounds: Bounds) -> Self {
        Self::new(bounds.min, bounds.max)
    }
}

impl From<Range> for Bounds {
    fn from(range: Range) -> Self {
        Self {
            min: range.min,
            max: range.max,
        }
    }
}

impl Range {
    /// Creates a range, silently swapping the bounds if `min > max`.
    pub fn new(min: i32, max: i32) -> Self {
        if min > max {
            Self { min: max, max: min }
        } else {
            Self { min, max }
        }
    }

    /// Creates a range containing exactly one value.
    pub fn single(value: i32) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Returns `true` if `value` lies within the range, bounds included.
    pub fn contains(&self, value: i32) -> bool {
        value >= self.min && value <= self.max
    }

    /// Returns the smallest range covering both `self` and `other`.
    ///
    /// This is not a set union: if the ranges are disjoint, every value in
    /// the gap between them is included too.
    ///
    /// ```rust
    /// use playcube::Range;
    ///
    /// assert_eq!(Range::new(0, 2).union(Range::new(8, 10)), Range::new(0, 10));
    /// ```
    #[must_use]
    pub fn union(self, other: Range) -> Range {
        Range {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Returns the range widened to include `value`.
    ///
    /// Equivalent to `self.union(Range::single(value))`.
    #[must_use]
    pub fn extend(self, value: i32) -> Range {
        self.union(Range::single(value))
    }

    /// Returns `max - min`.
    ///
    /// Unsigned, so the full `i32` span fits.
    pub fn length(&self) -> u32 {
        self.max.abs_diff(self.min)
    }

    /// Returns the lower bound.
    pub fn lower(&self) -> i32 {
        self.min
    }

    /// Returns the upper bound.
    pub fn upper(&self) -> i32 {
        self.max
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.min, self.max)
    }
}
