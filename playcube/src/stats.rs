//! Group statistics.
//!
//! Helpers for summarizing the record groups a cursor yields, and for putting
//! several groups on a common scale before rendering them side by side.
//!
//! Two report shapes are built here. [`GroupSummary`] counts outcomes per
//! group. [`ScatterPlot`] extracts one `(x, y)` point per play for two
//! per-play fields, splits the points of each group into successful plays and
//! turnovers, and carries one range per axis shared by every group.

use std::rc::Rc;

use serde::Serialize;

use crate::error::QueryError;
use crate::range::Range;
use crate::record::{Categorized, Category, Dimension, NumericField};

/// Returns the range of `field` over `records`, or `None` if there are none.
///
/// For count fields ([`NumericField::is_count`]) the range is `[0, total]`,
/// so a group's count can be drawn as a bar from zero. Every other field
/// gives the smallest range covering each record's value.
pub fn value_range<R: Categorized>(records: &[Rc<R>], field: NumericField) -> Option<Range> {
    let (first, rest) = records.split_first()?;

    if field.is_count() {
        let total = records.iter().map(|r| r.numeric(field)).sum();
        return Some(Range::new(0, total));
    }

    let start = Range::single(first.numeric(field));
    Some(rest.iter().fold(start, |range, r| range.extend(r.numeric(field))))
}

/// Returns the union of every group's range of `field`.
///
/// Empty groups are ignored; `None` means no group had records. The union
/// covers any gaps between groups.
pub fn overall_range<R, G>(groups: G, field: NumericField) -> Option<Range>
where
    R: Categorized,
    G: IntoIterator,
    G::Item: AsRef<[Rc<R>]>,
{
    groups
        .into_iter()
        .filter_map(|group| value_range(group.as_ref(), field))
        .reduce(Range::union)
}

/// Returns the categories a group shares for `dimensions`.
///
/// All records in a pivot group agree on the pivot dimensions, so the key is
/// read from the first record. Dimensions the record lacks are skipped.
pub fn group_key<R: Categorized>(records: &[Rc<R>], dimensions: &[Dimension]) -> Vec<Category> {
    records.first().map_or_else(Vec::new, |record| {
        dimensions
            .iter()
            .filter_map(|dimension| record.category(*dimension))
            .collect()
    })
}

/// Outcome counts and yardage for one group of plays.
///
/// Each play counts as exactly one of turnover, positive gain, or
/// non-positive gain. Turnovers are checked first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupSummary {
    /// Number of plays.
    pub plays: usize,
    /// Plays that gained yards without a turnover.
    pub positive: usize,
    /// Plays that gained no yards or lost yards, without a turnover.
    pub non_positive: usize,
    /// Plays that turned the ball over.
    pub turnovers: usize,
    /// Sum of yards gained over all plays, turnovers included.
    pub total_gained: i64,
}

impl GroupSummary {
    /// Summarizes a group.
    pub fn of<R: Categorized>(records: &[Rc<R>]) -> Self {
        let mut summary = Self {
            plays: records.len(),
            positive: 0,
            non_positive: 0,
            turnovers: 0,
            total_gained: 0,
        };

        for record in records {
            let gained = record.numeric(NumericField::DistanceGained);
            summary.total_gained += i64::from(gained);

            if record.numeric(NumericField::TurnoverCount) > 0 {
                summary.turnovers += 1;
            } else if gained <= 0 {
                summary.non_positive += 1;
            } else {
                summary.positive += 1;
            }
        }

        summary
    }

    /// Returns mean yards gained per play, or `None` for an empty group.
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_gained(&self) -> Option<f64> {
        (self.plays > 0).then(|| self.total_gained as f64 / self.plays as f64)
    }

    /// Returns the fraction of plays that were turnovers, or `None` for an empty group.
    #[allow(clippy::cast_precision_loss)]
    pub fn turnover_rate(&self) -> Option<f64> {
        (self.plays > 0).then(|| self.turnovers as f64 / self.plays as f64)
    }
}

/// Two distinct per-play fields plotted against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScatterAxes {
    x: NumericField,
    y: NumericField,
}

impl ScatterAxes {
    /// Creates a pair of axes.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::SameScatterAxes`] if `x == y` and
    /// [`QueryError::CountFieldOnAxis`] if either is a count field.
    pub fn new(x: NumericField, y: NumericField) -> Result<Self, QueryError> {
        if x == y {
            return Err(QueryError::SameScatterAxes { field: x });
        }
        if let Some(field) = [x, y].into_iter().find(|field| field.is_count()) {
            return Err(QueryError::CountFieldOnAxis { field });
        }
        Ok(Self { x, y })
    }

    /// Returns the horizontal field.
    pub fn x(&self) -> NumericField {
        self.x
    }

    /// Returns the vertical field.
    pub fn y(&self) -> NumericField {
        self.y
    }

    /// Returns the point for one record.
    pub fn point<R: Categorized>(&self, record: &R) -> (i32, i32) {
        (record.numeric(self.x), record.numeric(self.y))
    }
}

/// The points of one group, split by outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScatterSeries {
    /// Points of plays that kept possession.
    pub successful: Vec<(i32, i32)>,
    /// Points of plays that turned the ball over.
    pub turnovers: Vec<(i32, i32)>,
}

impl ScatterSeries {
    /// Extracts the points of one group, in record order.
    pub fn of<R: Categorized>(records: &[Rc<R>], axes: ScatterAxes) -> Self {
        let mut series = Self::default();
        for record in records {
            let point = axes.point(&**record);
            if record.numeric(NumericField::TurnoverCount) > 0 {
                series.turnovers.push(point);
            } else {
                series.successful.push(point);
            }
        }
        series
    }

    /// Returns the total number of points.
    pub fn len(&self) -> usize {
        self.successful.len() + self.turnovers.len()
    }

    /// Returns `true` if the series has no points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Scatter data for a set of groups drawn on common axes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScatterPlot {
    /// The plotted fields.
    pub axes: ScatterAxes,
    /// Range of the x field over every group; `None` if all are empty.
    pub x_range: Option<Range>,
    /// Range of the y field over every group; `None` if all are empty.
    pub y_range: Option<Range>,
    /// One series per group, in group order.
    pub series: Vec<ScatterSeries>,
}

impl ScatterPlot {
    /// Builds scatter data for `groups`, sharing one range per axis.
    pub fn of<R, G>(groups: &[G], axes: ScatterAxes) -> Self
    where
        R: Categorized,
        G: AsRef<[Rc<R>]>,
    {
        Self {
            axes,
            x_range: overall_range::<R, _>(groups, axes.x),
            y_range: overall_range::<R, _>(groups, axes.y),
            series: groups
                .iter()
                .map(|group| ScatterSeries::of(group.as_ref(), axes))
                .collect(),
        }
    }
}
