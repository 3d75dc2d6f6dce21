//! Store module: the single entry point to a play cube.
//!
//! The [`Store`] owns the root of the cube storage tree and routes every
//! structural operation to it. It also owns the iteration guard: every
//! [`Cursor`] is stamped with the store's generation at the time it was
//! issued, and every read compares that stamp against the live value.
//!
//! # Design
//!
//! - The root is held behind an `Rc`. A cursor shares that `Rc`, and a
//!   mutation copies the tree first if a cursor still holds it, so a stale
//!   cursor never observes a half-updated tree.
//! - The generation is bumped at most once per mutation, and only if a cursor
//!   has been issued since the previous bump. Issuing ten cursors and then
//!   mutating once moves the generation by one.
//! - Cloning a store deep-copies the tree and starts a fresh generation; the
//!   copy's cursors are unaffected by the original's mutations.
//!
//! # Thread Safety
//!
//! The store is single-threaded and is not `Send`. Callers that need to share
//! one must serialize access themselves.
//!
//! # Example Usage
//!
//! ```rust
//! use playcube::{Category, Dimension, Down, Play, PlayFields, PlayType, Store};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = Store::new();
//! for (ref_id, down) in [(1, Down::First), (2, Down::First), (3, Down::Third)] {
//!     store.insert(Play::new(PlayFields {
//!         ref_id,
//!         play_type: PlayType::RunLeft,
//!         down,
//!         distance_needed: 10,
//!         yard_line: 60,
//!         minutes_left: 40,
//!         score_differential: 0,
//!         distance_gained: 4,
//!         turnover: false,
//!     }))?;
//! }
//!
//! store.pivot(Dimension::Down);
//! let sizes: Vec<usize> = store.cursor().map(|group| group.len()).collect();
//! assert_eq!(sizes, vec![2, 1]);
//!
//! store.slice(Category::Down(Down::Third));
//! assert_eq!(store.record_count(), 1);
//! # Ok(())
//! # }
//! ```

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::cube::{CubeNode, Groups};
use crate::error::{CursorError, PivotError, Result};
use crate::range::Range;
use crate::record::{Categorized, Category, Dimension, NumericField, Play};

/// In-memory play cube.
///
/// `R` is the record type; it defaults to [`Play`]. Any [`Categorized`]
/// record can be stored.
#[derive(Debug)]
pub struct Store<R = Play> {
    /// Root of the storage tree. Shared with live cursors.
    root: Rc<CubeNode<R>>,
    /// Live generation, shared with every cursor issued by this store.
    generation: Rc<Cell<u64>>,
    /// Whether a cursor has been issued since the last bump.
    cursors_issued: Cell<bool>,
}

impl<R> Default for Store<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for Store<R> {
    fn clone(&self) -> Self {
        Self {
            root: Rc::new(CubeNode::clone(&self.root)),
            generation: Rc::new(Cell::new(0)),
            cursors_issued: Cell::new(false),
        }
    }
}

impl<R> Store<R> {
    /// Creates an empty store using the default tree layout.
    pub fn new() -> Self {
        Self::from_root(CubeNode::new())
    }

    /// Creates an empty store grouping by `layout`, root first.
    ///
    /// An empty layout gives an ungrouped store, as if rolled up.
    pub fn with_layout(layout: &[Dimension]) -> Self {
        Self::from_root(CubeNode::with_layout(layout))
    }

    fn from_root(root: CubeNode<R>) -> Self {
        Self {
            root: Rc::new(root),
            generation: Rc::new(Cell::new(0)),
            cursors_issued: Cell::new(false),
        }
    }

    /// Returns `true` if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Returns the number of records in the store.
    pub fn record_count(&self) -> usize {
        self.root.record_count()
    }

    /// Returns the current tree layout, root first.
    pub fn layout(&self) -> Vec<Dimension> {
        self.root.layout()
    }

    /// Returns the live generation.
    ///
    /// This only changes when the store is mutated after a cursor was issued.
    pub fn generation(&self) -> u64 {
        self.generation.get()
    }

    /// Returns the root of the storage tree.
    pub fn root(&self) -> &CubeNode<R> {
        &self.root
    }

    /// Returns a borrowing walk over the current groups.
    ///
    /// The borrow keeps the store from being mutated while the walk is alive,
    /// so this walk needs no generation check.
    pub fn groups(&self) -> Groups<&CubeNode<R>> {
        self.root.groups()
    }

    /// Returns every record in traversal order, without changing the store.
    pub fn records(&self) -> Vec<Rc<R>> {
        let mut records = Vec::with_capacity(self.record_count());
        self.root.rollup_into(&mut records);
        records
    }

    /// Issues a cursor over the current groups.
    ///
    /// The cursor does not borrow the store. It stops yielding as soon as the
    /// store is mutated; see [`Cursor`].
    pub fn cursor(&self) -> Cursor<R> {
        self.cursors_issued.set(true);
        Cursor {
            groups: Groups::new(Rc::clone(&self.root)),
            issued_at: self.generation.get(),
            generation: Rc::clone(&self.generation),
        }
    }

    /// Flattens every record into a single ungrouped bucket.
    ///
    /// Later inserts are appended to that bucket.
    pub fn rollup(&mut self) {
        self.invalidate_cursors();
        let records = self.records();
        tracing::debug!(records = records.len(), "rolled up cube");
        self.root = Rc::new(CubeNode::from_records(records));
    }

    /// Bumps the generation if any cursor has been issued since the last bump.
    fn invalidate_cursors(&mut self) {
        if self.cursors_issued.replace(false) {
            let next = self.generation.get() + 1;
            self.generation.set(next);
            tracing::trace!(generation = next, "invalidated outstanding cursors");
        }
    }
}

impl<R: Categorized> Store<R> {
    /// Inserts a record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::InsertError::MissingDimension`] if the record has no
    /// value for a dimension the current layout groups by. The store's
    /// records are unchanged in that case, though outstanding cursors are
    /// still invalidated.
    pub fn insert(&mut self, record: R) -> Result<()> {
        self.insert_shared(Rc::new(record))
    }

    /// Inserts a record that is already shared.
    ///
    /// # Errors
    ///
    /// See [`Store::insert`].
    pub fn insert_shared(&mut self, record: Rc<R>) -> Result<()> {
        self.invalidate_cursors();
        Rc::make_mut(&mut self.root).insert(record)?;
        Ok(())
    }

    /// Inserts every record from `records`, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// See [`Store::insert`]. Records before the failing one stay inserted.
    pub fn extend<I>(&mut self, records: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
    {
        for record in records {
            self.insert(record)?;
        }
        Ok(())
    }

    /// Keeps only records whose value for `wanted`'s dimension is `wanted`.
    ///
    /// Records that have no value for the dimension are kept.
    pub fn slice(&mut self, wanted: Category) {
        self.invalidate_cursors();
        if self.root.is_empty() {
            return;
        }
        Rc::make_mut(&mut self.root).slice(wanted);
        tracing::debug!(
            dimension = %wanted.dimension(),
            value = %wanted,
            remaining = self.root.record_count(),
            "sliced cube"
        );
    }

    /// Keeps only records whose `field` value lies within `range`.
    pub fn slice_range(&mut self, field: NumericField, range: Range) {
        self.invalidate_cursors();
        if self.root.is_empty() {
            return;
        }
        Rc::make_mut(&mut self.root).slice_range(field, range);
        tracing::debug!(
            %field,
            %range,
            remaining = self.root.record_count(),
            "sliced cube by range"
        );
    }

    /// Regroups every record by `dimension`.
    ///
    /// Records with no value for `dimension` are dropped from the store.
    pub fn pivot(&mut self, dimension: Dimension) {
        self.invalidate_cursors();
        let mut groups = BTreeMap::new();
        self.root.pivot_into(&mut groups, dimension);
        let root = CubeNode::from_groups(dimension, groups);
        tracing::debug!(%dimension, records = root.record_count(), "pivoted cube");
        self.root = Rc::new(root);
    }

    /// Regroups every record by `first`, then by `second` within each group.
    ///
    /// Records missing either dimension are dropped from the store.
    ///
    /// # Errors
    ///
    /// Returns [`PivotError::DuplicateDimension`] if `first == second`. The
    /// store is unchanged in that case.
    pub fn pivot_pair(&mut self, first: Dimension, second: Dimension) -> Result<()> {
        if first == second {
            return Err(PivotError::DuplicateDimension { dimension: first }.into());
        }

        self.invalidate_cursors();
        let mut groups = BTreeMap::new();
        self.root.pivot_pair_into(&mut groups, first, second);
        let root = CubeNode::from_nested_groups(first, second, groups);
        tracing::debug!(%first, %second, records = root.record_count(), "pivoted cube");
        self.root = Rc::new(root);
        Ok(())
    }

    /// Regroups by up to two dimensions. An empty list rolls the store up.
    ///
    /// # Errors
    ///
    /// Returns [`PivotError::TooManyDimensions`] for more than two dimensions
    /// and [`PivotError::DuplicateDimension`] for a repeated one.
    pub fn pivot_by(&mut self, dimensions: &[Dimension]) -> Result<()> {
        match *dimensions {
            [] => self.rollup(),
            [dimension] => self.pivot(dimension),
            [first, second] => self.pivot_pair(first, second)?,
            _ => {
                return Err(PivotError::TooManyDimensions {
                    count: dimensions.len(),
                }
                .into());
            }
        }
        Ok(())
    }
}

impl<R: fmt::Display> fmt::Display for Store<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.render(&mut Vec::new(), f)
    }
}

/// A lazy cursor over a store's groups, guarded by a generation stamp.
///
/// The cursor yields one fresh record list per non-empty bucket, in tree
/// order, and cannot be restarted. Once the issuing store is mutated the
/// cursor is stale: [`Cursor::has_next`] reports `false`,
/// [`Cursor::try_next`] returns [`CursorError::Invalidated`], and
/// [`Iterator::next`] panics.
#[derive(Debug)]
pub struct Cursor<R> {
    groups: Groups<Rc<CubeNode<R>>>,
    issued_at: u64,
    generation: Rc<Cell<u64>>,
}

impl<R> Cursor<R> {
    /// Returns `true` if the issuing store has not been mutated since.
    pub fn is_valid(&self) -> bool {
        self.generation.get() == self.issued_at
    }

    /// Returns `true` if the cursor is valid and another group remains.
    pub fn has_next(&self) -> bool {
        self.is_valid() && self.groups.has_next()
    }

    /// Returns the next group, or `None` when exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Invalidated`] if the store was mutated after
    /// this cursor was issued.
    pub fn try_next(&mut self) -> std::result::Result<Option<Vec<Rc<R>>>, CursorError> {
        let current = self.generation.get();
        if current != self.issued_at {
            return Err(CursorError::Invalidated {
                issued_at: self.issued_at,
                current,
            });
        }
        Ok(self.groups.next())
    }
}

impl<R> Iterator for Cursor<R> {
    type Item = Vec<Rc<R>>;

    /// Yields the next group, or `None` when exhausted.
    ///
    /// # Panics
    ///
    /// Panics with the [`CursorError::Invalidated`] message if the store was
    /// mutated after this cursor was issued. Use [`Cursor::try_next`] to
    /// handle that case without unwinding.
    fn next(&mut self) -> Option<Self::Item> {
        match self.try_next() {
            Ok(group) => group,
            Err(err) => panic!("{err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{InsertError, PlaycubeError};
    use crate::record::{Distance, Down, PlayFields, PlayType};

    fn play(ref_id: i32, down: Down, distance_needed: i32, gained: i32, turnover: bool) -> Play {
        Play::new(PlayFields {
            ref_id,
            play_type: PlayType::PassShortMiddle,
            down,
            distance_needed,
            yard_line: 40,
            minutes_left: 12,
            score_differential: 3,
            distance_gained: gained,
            turnover,
        })
    }

    fn scenario_store() -> Store {
        let mut store = Store::new();
        store.insert(play(1, Down::First, 10, 11, false)).unwrap();
        store.insert(play(2, Down::First, 1, -2, true)).unwrap();
        store.insert(play(3, Down::Third, 10, 5, false)).unwrap();
        store
    }

    fn sorted_ids(records: &[Rc<Play>]) -> Vec<i32> {
        let mut ids: Vec<i32> = records.iter().map(|p| p.ref_id()).collect();
        ids.sort_unstable();
        ids
    }

    /// Record type without a down, for exercising absent dimensions.
    #[derive(Debug)]
    struct Kick {
        play_type: PlayType,
        gained: i32,
    }

    impl Categorized for Kick {
        fn category(&self, dimension: Dimension) -> Option<Category> {
            match dimension {
                Dimension::PlayType => Some(Category::PlayType(self.play_type)),
                _ => None,
            }
        }

        fn numeric(&self, field: NumericField) -> i32 {
            match field {
                NumericField::DistanceGained => self.gained,
                NumericField::PlayCount => 1,
                _ => 0,
            }
        }
    }

    #[test]
    fn test_new_store_is_empty() {
        let store: Store = Store::new();
        assert!(store.is_empty());
        assert_eq!(store.record_count(), 0);
        assert_eq!(store.cursor().count(), 0);
    }

    #[test]
    fn test_slice_then_rollup_scenario() {
        let mut store = scenario_store();
        store.slice(Category::Down(Down::First));
        store.rollup();
        let groups: Vec<_> = store.cursor().collect();
        assert_eq!(groups.len(), 1);
        assert_eq!(sorted_ids(&groups[0]), vec![1, 2]);
    }

    #[test]
    fn test_pivot_scenario() {
        let mut store = scenario_store();
        store.pivot(Dimension::Down);
        let groups: Vec<_> = store.cursor().collect();
        assert_eq!(groups.len(), 2);
        assert_eq!(sorted_ids(&groups[0]), vec![1, 2]);
        assert_eq!(sorted_ids(&groups[1]), vec![3]);
        assert_eq!(store.layout(), vec![Dimension::Down]);
    }

    #[test]
    fn test_insert_after_pivot_keeps_pivot_layout() {
        let mut store = scenario_store();
        store.pivot(Dimension::Down);
        store.insert(play(4, Down::Third, 20, 0, false)).unwrap();
        let groups: Vec<_> = store.cursor().collect();
        assert_eq!(groups.len(), 2);
        assert_eq!(sorted_ids(&groups[1]), vec![3, 4]);
    }

    #[test]
    fn test_insert_after_rollup_appends_to_single_group() {
        let mut store = scenario_store();
        store.rollup();
        store.insert(play(4, Down::Fourth, 2, 1, false)).unwrap();
        let groups: Vec<_> = store.cursor().collect();
        assert_eq!(groups.len(), 1);
        assert_eq!(sorted_ids(&groups[0]), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_pivot_pair_nests_second_dimension() {
        let mut store = scenario_store();
        store.pivot_pair(Dimension::Down, Dimension::Distance).unwrap();
        let groups: Vec<_> = store.cursor().map(|g| sorted_ids(&g)).collect();
        // FIRST/TEN_TO_FOUR, FIRST/ONE_OR_LESS, THIRD/TEN_TO_FOUR
        assert_eq!(groups, vec![vec![1], vec![2], vec![3]]);
        assert_eq!(store.layout(), vec![Dimension::Down, Dimension::Distance]);
    }

    #[test]
    fn test_pivot_pair_rejects_duplicate_without_invalidating() {
        let mut store = scenario_store();
        let cursor = store.cursor();
        let err = store.pivot_pair(Dimension::Down, Dimension::Down).unwrap_err();
        assert!(matches!(
            err,
            PlaycubeError::Pivot(PivotError::DuplicateDimension { dimension: Dimension::Down })
        ));
        assert!(cursor.is_valid());
        assert_eq!(store.record_count(), 3);
    }

    #[test]
    fn test_pivot_by_dispatches_on_length() {
        let mut store = scenario_store();
        store.pivot_by(&[]).unwrap();
        assert!(store.layout().is_empty());

        store.pivot_by(&[Dimension::Distance]).unwrap();
        assert_eq!(store.layout(), vec![Dimension::Distance]);

        let err = store
            .pivot_by(&[Dimension::Down, Dimension::Distance, Dimension::PlayType])
            .unwrap_err();
        assert!(matches!(
            err,
            PlaycubeError::Pivot(PivotError::TooManyDimensions { count: 3 })
        ));
    }

    #[test]
    fn test_cursor_invalidated_mid_traversal() {
        let mut store = scenario_store();
        let mut cursor = store.cursor();
        assert!(cursor.has_next());
        assert!(cursor.next().is_some());

        store.slice(Category::Distance(Distance::TenToFour));
        assert!(!cursor.has_next());
        assert_eq!(
            cursor.try_next(),
            Err(CursorError::Invalidated {
                issued_at: 0,
                current: 1
            })
        );
    }

    #[test]
    #[should_panic(expected = "store modified during iteration")]
    fn test_stale_cursor_next_panics() {
        let mut store = scenario_store();
        let mut cursor = store.cursor();
        assert!(cursor.next().is_some());

        store.slice(Category::Down(Down::First));
        for _ in cursor.by_ref() {}
    }

    #[test]
    fn test_generation_bump_is_debounced() {
        let mut store = scenario_store();
        assert_eq!(store.generation(), 0);

        // No cursor issued yet: mutation leaves the generation alone.
        store.slice(Category::Down(Down::First));
        assert_eq!(store.generation(), 0);

        let _cursors: Vec<_> = (0..10).map(|_| store.cursor()).collect();
        store.rollup();
        assert_eq!(store.generation(), 1);
        store.rollup();
        assert_eq!(store.generation(), 1);
    }

    #[test]
    fn test_stale_cursor_keeps_its_snapshot() {
        let mut store = scenario_store();
        let cursor = store.cursor();
        store.slice(Category::Down(Down::Fourth));
        assert!(store.is_empty());
        // The cursor is stale, but its snapshot was not torn.
        assert!(!cursor.is_valid());
    }

    #[test]
    fn test_slice_empty_store_still_invalidates() {
        let mut store: Store = Store::new();
        let cursor = store.cursor();
        store.slice(Category::Down(Down::First));
        assert!(store.is_empty());
        assert!(!cursor.is_valid());
    }

    #[test]
    fn test_clone_has_independent_invalidation_state() {
        let mut store = scenario_store();
        let copy = store.clone();
        let copy_cursor = copy.cursor();

        let _ = store.cursor();
        store.slice(Category::Down(Down::Third));

        assert!(copy_cursor.is_valid());
        assert_eq!(copy.record_count(), 3);
        assert_eq!(store.record_count(), 1);
    }

    #[test]
    fn test_insert_missing_dimension_leaves_store_unchanged() {
        let mut store: Store<Kick> = Store::new();
        let err = store
            .insert(Kick {
                play_type: PlayType::Punt,
                gained: 40,
            })
            .unwrap_err();
        assert!(matches!(
            err,
            PlaycubeError::Insert(InsertError::MissingDimension { dimension: Dimension::Down })
        ));
        assert!(store.is_empty());
        assert_eq!(store.cursor().count(), 0);
    }

    #[test]
    fn test_records_lacking_dimension_survive_slice_and_drop_from_pivot() {
        let mut store: Store<Kick> = Store::with_layout(&[Dimension::PlayType]);
        store
            .extend([
                Kick {
                    play_type: PlayType::Punt,
                    gained: 40,
                },
                Kick {
                    play_type: PlayType::FieldGoal,
                    gained: 0,
                },
            ])
            .unwrap();

        store.slice(Category::Down(Down::Fourth));
        assert_eq!(store.record_count(), 2);

        store.pivot(Dimension::Down);
        assert!(store.is_empty());
    }

    #[test]
    fn test_display_renders_groups() {
        let mut store = scenario_store();
        store.pivot(Dimension::Down);
        let rendered = store.to_string();
        assert!(rendered.contains("group FIRST_DOWN"));
        assert!(rendered.contains("group THIRD_DOWN"));
        assert!(rendered.contains("#2 PASS_SHORT_MIDDLE gained=-2 turnover=true"));

        let empty: Store = Store::new();
        assert_eq!(empty.to_string(), "group\nempty\n");
    }
}
