//! Filter chains.
//!
//! A [`SliceChain`] is a singly linked sequence of slice steps. Chains are
//! built tail-first: the last step to run is constructed first, then wrapped
//! by the steps that run before it.
//!
//! ```rust
//! use playcube::{Category, Down, NumericField, PlayType, Range, SliceChain};
//!
//! // Runs: down, then play type, then the yardage range.
//! let yards = SliceChain::range(NumericField::DistanceGained, Range::new(0, 10), None);
//! let punts = SliceChain::category(Category::PlayType(PlayType::Punt), Some(yards));
//! let chain = SliceChain::category(Category::Down(Down::Fourth), Some(punts));
//! assert_eq!(chain.len(), 3);
//! ```
//!
//! Step order never changes the resulting record set, only the amount of
//! work: a categorical step on a dimension near the root of the tree cuts
//! whole subtrees, while a range step always visits every bucket.

use std::fmt;

use crate::range::Range;
use crate::record::{Categorized, Category, NumericField};
use crate::store::Store;

/// One slice operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceStep {
    /// Keep records whose value for the category's dimension is that category.
    Category(Category),
    /// Keep records whose field value lies within the range.
    Range {
        /// Field to test.
        field: NumericField,
        /// Inclusive bounds.
        range: Range,
    },
}

impl SliceStep {
    /// Applies this step alone to `store`.
    pub fn apply<R: Categorized>(&self, store: &mut Store<R>) {
        match *self {
            Self::Category(wanted) => store.slice(wanted),
            Self::Range { field, range } => store.slice_range(field, range),
        }
    }

    /// Returns `true` for numeric range steps.
    pub fn is_range(&self) -> bool {
        matches!(self, Self::Range { .. })
    }
}

impl fmt::Display for SliceStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Category(category) => write!(f, "{}={category}", category.dimension()),
            Self::Range { field, range } => write!(f, "{field} in {range}"),
        }
    }
}

/// A step followed by an optional remainder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceChain {
    step: SliceStep,
    next: Option<Box<SliceChain>>,
}

impl SliceChain {
    /// Creates a categorical step that runs before `next`.
    pub fn category(wanted: Category, next: Option<SliceChain>) -> Self {
        Self::new(SliceStep::Category(wanted), next)
    }

    /// Creates a numeric range step that runs before `next`.
    pub fn range(field: NumericField, range: Range, next: Option<SliceChain>) -> Self {
        Self::new(SliceStep::Range { field, range }, next)
    }

    /// Creates a chain from a step and an optional remainder.
    pub fn new(step: SliceStep, next: Option<SliceChain>) -> Self {
        Self {
            step,
            next: next.map(Box::new),
        }
    }

    /// Builds a chain that runs `steps` in the given order.
    ///
    /// Returns `None` for an empty sequence.
    pub fn from_steps<I>(steps: I) -> Option<Self>
    where
        I: IntoIterator<Item = SliceStep>,
        I::IntoIter: DoubleEndedIterator,
    {
        steps
            .into_iter()
            .rev()
            .fold(None, |next, step| Some(Self::new(step, next)))
    }

    /// Returns this chain's first step.
    pub fn step(&self) -> &SliceStep {
        &self.step
    }

    /// Returns the remainder of the chain.
    pub fn remainder(&self) -> Option<&SliceChain> {
        self.next.as_deref()
    }

    /// Returns the steps in run order.
    pub fn steps(&self) -> impl Iterator<Item = &SliceStep> + '_ {
        std::iter::successors(Some(self), |chain| chain.remainder()).map(SliceChain::step)
    }

    /// Returns the number of steps. A chain is never empty.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.steps().count()
    }

    /// Applies this step, then the rest of the chain, to `store`.
    pub fn apply<R: Categorized>(&self, store: &mut Store<R>) {
        for step in self.steps() {
            step.apply(store);
        }
        tracing::debug!(steps = self.len(), remaining = store.record_count(), "applied slice chain");
    }
}

impl fmt::Display for SliceChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("slice by ")?;
        for (i, step) in self.steps().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}
