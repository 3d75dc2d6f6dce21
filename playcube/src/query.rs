//! Query interface over a play cube.
//!
//! A [`Query`] combines an optional [`SliceChain`] with a [`Grouping`] and
//! runs them against a copy of a store, so the caller's store is never
//! changed. The [`QueryResult`] owns the resulting store and exposes its
//! groups together with summary helpers.
//!
//! Queries are usually described by a [`QueryConfig`], which is plain serde
//! data loaded from JSON:
//!
//! ```json
//! {
//!   "filters": [
//!     { "dimension": "down", "value": "THIRD_DOWN" },
//!     { "field": "distance_gained", "min": -5, "max": 30 }
//!   ],
//!   "group_by": ["distance", "play_type"]
//! }
//! ```
//!
//! [`QueryConfig::build`] orders the slice steps so the cheapest ones run
//! first: categorical steps follow the tree layout policy (down first, play
//! type last) and numeric range steps run after every categorical step.
//!
//! # Example Usage
//!
//! ```rust
//! use playcube::{Dimension, Down, Play, PlayFields, PlayType, QueryConfig, Store};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = Store::new();
//! store.insert(Play::new(PlayFields {
//!     ref_id: 1,
//!     play_type: PlayType::RunRight,
//!     down: Down::Third,
//!     distance_needed: 2,
//!     yard_line: 30,
//!     minutes_left: 14,
//!     score_differential: 0,
//!     distance_gained: 3,
//!     turnover: false,
//! }))?;
//!
//! let config: QueryConfig = serde_json::from_str(
//!     r#"{ "filters": [{ "dimension": "down", "value": "third_down" }], "group_by": ["play_type"] }"#,
//! )?;
//! let result = config.build()?.run(&store)?;
//! assert_eq!(result.group_count(), 1);
//! assert_eq!(result.dimensions(), vec![Dimension::PlayType]);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::cube::{CubeNode, Groups, LAYOUT_POLICY};
use crate::error::{QueryError, Result};
use crate::range::Range;
use crate::record::{Categorized, Category, Dimension, NumericField};
use crate::slice::{SliceChain, SliceStep};
use crate::stats::{self, GroupSummary, ScatterAxes, ScatterPlot};
use crate::store::Store;

/// How a query groups its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Grouping {
    /// Everything in one group.
    #[default]
    All,
    /// One group per category of the dimension.
    By(Dimension),
    /// One group per pair of categories, the second nested in the first.
    ByPair(Dimension, Dimension),
}

impl Grouping {
    /// Creates a grouping from up to two dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::TooManyGroupDimensions`] for more than two
    /// dimensions and [`QueryError::DuplicateGroupDimension`] for a repeat.
    pub fn from_dimensions(dimensions: &[Dimension]) -> Result<Self> {
        match *dimensions {
            [] => Ok(Self::All),
            [dimension] => Ok(Self::By(dimension)),
            [first, second] if first == second => {
                Err(QueryError::DuplicateGroupDimension { dimension: first }.into())
            }
            [first, second] => Ok(Self::ByPair(first, second)),
            _ => Err(QueryError::TooManyGroupDimensions {
                count: dimensions.len(),
            }
            .into()),
        }
    }

    /// Returns the grouping dimensions, outermost first.
    pub fn dimensions(&self) -> Vec<Dimension> {
        match *self {
            Self::All => Vec::new(),
            Self::By(dimension) => vec![dimension],
            Self::ByPair(first, second) => vec![first, second],
        }
    }

    /// Regroups `store` accordingly.
    ///
    /// # Errors
    ///
    /// Returns a pivot error if a pair grouping repeats a dimension.
    pub fn apply<R: Categorized>(&self, store: &mut Store<R>) -> Result<()> {
        match *self {
            Self::All => store.rollup(),
            Self::By(dimension) => store.pivot(dimension),
            Self::ByPair(first, second) => store.pivot_pair(first, second)?,
        }
        Ok(())
    }
}

impl fmt::Display for Grouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::By(dimension) => write!(f, "{dimension}"),
            Self::ByPair(first, second) => write!(f, "{first} x {second}"),
        }
    }
}

/// A slice chain plus a grouping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Query {
    slices: Option<SliceChain>,
    grouping: Grouping,
}

impl Query {
    /// Creates a query.
    pub fn new(slices: Option<SliceChain>, grouping: Grouping) -> Self {
        Self { slices, grouping }
    }

    /// Returns the slice chain, if any.
    pub fn slices(&self) -> Option<&SliceChain> {
        self.slices.as_ref()
    }

    /// Returns the grouping.
    pub fn grouping(&self) -> Grouping {
        self.grouping
    }

    /// Runs the query against a copy of `store`.
    ///
    /// # Errors
    ///
    /// Returns a pivot error if the grouping repeats a dimension.
    pub fn run<R: Categorized>(&self, store: &Store<R>) -> Result<QueryResult<R>> {
        let mut result = store.clone();
        if let Some(chain) = &self.slices {
            chain.apply(&mut result);
        }
        self.grouping.apply(&mut result)?;

        tracing::debug!(
            grouping = %self.grouping,
            records = result.record_count(),
            "ran query"
        );

        Ok(QueryResult {
            store: result,
            grouping: self.grouping,
        })
    }
}

/// Result of running a [`Query`].
#[derive(Debug)]
pub struct QueryResult<R> {
    store: Store<R>,
    grouping: Grouping,
}

/// One group of a query result with its key and summary.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    /// Categories shared by every record in the group, outermost first.
    pub key: Vec<Category>,
    /// Outcome counts and yardage.
    pub summary: GroupSummary,
    /// Range of yards gained within the group.
    pub gained: Option<Range>,
}

impl<R: Categorized> QueryResult<R> {
    /// Returns the grouping the result was built with.
    pub fn grouping(&self) -> Grouping {
        self.grouping
    }

    /// Returns the grouping dimensions, outermost first.
    pub fn dimensions(&self) -> Vec<Dimension> {
        self.grouping.dimensions()
    }

    /// Returns the sliced and regrouped store.
    pub fn store(&self) -> &Store<R> {
        &self.store
    }

    /// Consumes the result, returning its store.
    pub fn into_store(self) -> Store<R> {
        self.store
    }

    /// Returns a walk over the result's groups.
    pub fn groups(&self) -> Groups<&CubeNode<R>> {
        self.store.groups()
    }

    /// Returns the number of non-empty groups.
    pub fn group_count(&self) -> usize {
        self.groups().count()
    }

    /// Returns the range of `field` across every group.
    pub fn range(&self, field: NumericField) -> Option<Range> {
        stats::overall_range::<R, _>(self.groups(), field)
    }

    /// Returns one row per group, in group order.
    pub fn rows(&self) -> Vec<GroupRow> {
        let dimensions = self.dimensions();
        self.groups()
            .map(|records| row(&records, &dimensions))
            .collect()
    }

    /// Returns each group's key, in group order.
    pub fn keys(&self) -> Vec<Vec<Category>> {
        let dimensions = self.dimensions();
        self.groups()
            .map(|records| stats::group_key(&records, &dimensions))
            .collect()
    }

    /// Returns scatter data for `axes`, one series per group in group order.
    ///
    /// Both axes span every group, so the series can be drawn side by side.
    pub fn scatter(&self, axes: ScatterAxes) -> ScatterPlot {
        let groups: Vec<Vec<Rc<R>>> = self.groups().collect();
        ScatterPlot::of::<R, _>(&groups, axes)
    }
}

fn row<R: Categorized>(records: &[Rc<R>], dimensions: &[Dimension]) -> GroupRow {
    GroupRow {
        key: stats::group_key(records, dimensions),
        summary: GroupSummary::of(records),
        gained: stats::value_range(records, NumericField::DistanceGained),
    }
}

/// One filter in a [`QueryConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterConfig {
    /// Keep one category of a dimension.
    Category {
        /// Dimension to filter on.
        dimension: Dimension,
        /// Category name within the dimension, case-insensitive.
        value: String,
    },
    /// Keep a numeric range of a field.
    Range {
        /// Field to filter on.
        field: NumericField,
        /// Lower bound, inclusive.
        min: i32,
        /// Upper bound, inclusive.
        max: i32,
    },
}

impl FilterConfig {
    /// Parses a categorical filter written as `dimension=VALUE`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidFilter`] if there is no `=`,
    /// [`QueryError::UnknownDimension`] for an unknown dimension and
    /// [`QueryError::UnknownCategory`] for an unknown value.
    pub fn parse_category(expr: &str) -> Result<Self> {
        let (dimension, value) = split_filter(expr, "expected dimension=VALUE")?;
        let dimension: Dimension = dimension.parse()?;
        Category::parse(dimension, value)?;
        Ok(Self::Category {
            dimension,
            value: value.to_string(),
        })
    }

    /// Parses a range filter written as `field=min:max`.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidFilter`] if the expression is malformed
    /// and [`QueryError::UnknownField`] for an unknown field.
    pub fn parse_range(expr: &str) -> Result<Self> {
        let (field, bounds) = split_filter(expr, "expected field=min:max")?;
        let field: NumericField = field.parse()?;
        let invalid = |reason: &str| QueryError::InvalidFilter {
            expr: expr.to_string(),
            reason: reason.to_string(),
        };

        let (min, max) = bounds
            .split_once(':')
            .ok_or_else(|| invalid("expected min:max bounds"))?;
        let min = min
            .trim()
            .parse()
            .map_err(|_| invalid("lower bound is not an integer"))?;
        let max = max
            .trim()
            .parse()
            .map_err(|_| invalid("upper bound is not an integer"))?;

        Ok(Self::Range { field, min, max })
    }

    /// Returns the name of the dimension or numeric field this filter constrains.
    pub fn target(&self) -> &'static str {
        match self {
            Self::Category { dimension, .. } => dimension.as_str(),
            Self::Range { field, .. } => field.as_str(),
        }
    }

    /// Returns the dimension this filter constrains, if it is categorical.
    pub fn dimension(&self) -> Option<Dimension> {
        match self {
            Self::Category { dimension, .. } => Some(*dimension),
            Self::Range { .. } => None,
        }
    }

    /// Converts the filter into a slice step.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownCategory`] if a categorical value is not
    /// in its dimension's domain.
    pub fn to_step(&self) -> Result<SliceStep> {
        match self {
            Self::Category { dimension, value } => {
                Ok(SliceStep::Category(Category::parse(*dimension, value)?))
            }
            Self::Range { field, min, max } => Ok(SliceStep::Range {
                field: *field,
                range: Range::new(*min, *max),
            }),
        }
    }
}

fn split_filter<'a>(expr: &'a str, reason: &str) -> Result<(&'a str, &'a str)> {
    expr.split_once('=')
        .map(|(name, value)| (name.trim(), value.trim()))
        .ok_or_else(|| {
            QueryError::InvalidFilter {
                expr: expr.to_string(),
                reason: reason.to_string(),
            }
            .into()
        })
}

/// Serializable description of a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// Filters to slice by. Order does not matter.
    #[serde(default)]
    pub filters: Vec<FilterConfig>,
    /// Up to two dimensions to group by, outermost first.
    #[serde(default)]
    pub group_by: Vec<Dimension>,
}

impl QueryConfig {
    /// Loads and validates a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::ConfigRead`] or [`QueryError::ConfigParse`] if
    /// the file cannot be read or parsed, and any error from
    /// [`QueryConfig::validate`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| QueryError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&data).map_err(|source| QueryError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - more than two grouping dimensions are given
    /// - a grouping dimension is repeated
    /// - two filters constrain the same dimension or field
    /// - a dimension is both filtered and grouped on
    /// - a categorical filter names an unknown value
    pub fn validate(&self) -> Result<()> {
        Grouping::from_dimensions(&self.group_by)?;

        let mut seen = BTreeSet::new();
        for filter in &self.filters {
            let target = filter.target();
            if !seen.insert(target) {
                return Err(QueryError::DuplicateFilter { target }.into());
            }
            if let Some(dimension) = filter.dimension()
                && self.group_by.contains(&dimension)
            {
                return Err(QueryError::FilterOnGroupDimension { dimension }.into());
            }
            filter.to_step()?;
        }

        Ok(())
    }

    /// Returns the slice steps in the order they should run.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownCategory`] for an unknown filter value.
    pub fn slice_steps(&self) -> Result<Vec<SliceStep>> {
        let mut steps = self
            .filters
            .iter()
            .map(FilterConfig::to_step)
            .collect::<Result<Vec<_>>>()?;
        steps.sort_by_key(step_rank);
        Ok(steps)
    }

    /// Validates the configuration and builds the query.
    ///
    /// # Errors
    ///
    /// Returns any error from [`QueryConfig::validate`].
    pub fn build(&self) -> Result<Query> {
        self.validate()?;
        let grouping = Grouping::from_dimensions(&self.group_by)?;
        let slices = SliceChain::from_steps(self.slice_steps()?);
        Ok(Query::new(slices, grouping))
    }
}

/// Run position of a step: categorical steps in layout order, then ranges.
fn step_rank(step: &SliceStep) -> usize {
    match step {
        SliceStep::Category(category) => LAYOUT_POLICY
            .iter()
            .position(|dimension| *dimension == category.dimension())
            .unwrap_or(LAYOUT_POLICY.len()),
        SliceStep::Range { .. } => LAYOUT_POLICY.len() + 1,
    }
}
