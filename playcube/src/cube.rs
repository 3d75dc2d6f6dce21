//! Cube storage tree.
//!
//! The cube is a wide tree emulating nested maps of maps whose depth is not
//! known statically. A [`CubeNode`] is either a grouping node, which owns one
//! child per value of its dimension, or a bucket, which owns a plain list of
//! records. Every record in a bucket shares the category of each grouping
//! node above it.
//!
//! # Layout
//!
//! Each grouping node carries the dimensions of the levels below it. New
//! children are created lazily on insert, following that layout; when the
//! layout is exhausted the child is a bucket. A fresh tree uses
//! [`LAYOUT_POLICY`]: cheap categorical dimensions near the root so slices and
//! pivots on them can cut whole subtrees.
//!
//! ```text
//! Down ─┬─ FIRST_DOWN ── Distance ─┬─ TEN_TO_FOUR ── TimeLeft ── ... ── [records]
//!       │                          └─ ONE_OR_LESS ── TimeLeft ── ... ── [records]
//!       └─ THIRD_DOWN ── Distance ─── ...
//! ```
//!
//! Layout only affects speed. Every operation classifies records through
//! [`Categorized`], never by tree position, so a dimension gives the same
//! result wherever it sits (or when it is not in the tree at all, like
//! `play_type`).

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use crate::error::InsertError;
use crate::range::Range;
use crate::record::{Categorized, Category, Dimension, NumericField};

/// Grouping order of a freshly created cube, root first.
pub const LAYOUT_POLICY: [Dimension; 5] = [
    Dimension::Down,
    Dimension::Distance,
    Dimension::TimeLeft,
    Dimension::FieldZone,
    Dimension::ScoreMargin,
];

/// Records regrouped by one dimension.
pub type PivotGroups<R> = BTreeMap<Category, Vec<Rc<R>>>;

/// Records regrouped by two dimensions, the second nested in the first.
pub type NestedPivotGroups<R> = BTreeMap<Category, PivotGroups<R>>;

/// A node of the cube storage tree.
#[derive(Debug)]
pub enum CubeNode<R> {
    /// Internal node keyed by one dimension.
    Grouping(GroupingNode<R>),
    /// Leaf holding records.
    Bucket(Bucket<R>),
}

/// Internal node mapping each category of one dimension to a subtree.
#[derive(Debug)]
pub struct GroupingNode<R> {
    dimension: Dimension,
    /// Dimensions of the levels below this node; empty means children are buckets.
    below: Vec<Dimension>,
    children: BTreeMap<Category, CubeNode<R>>,
}

/// Leaf node holding records in insertion order.
#[derive(Debug)]
pub struct Bucket<R> {
    records: Vec<Rc<R>>,
}

impl<R> GroupingNode<R> {
    /// Returns the dimension this node groups by.
    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    /// Returns the child for `category`, if one exists.
    pub fn child(&self, category: Category) -> Option<&CubeNode<R>> {
        self.children.get(&category)
    }

    /// Returns the categories that currently have children, in domain order.
    pub fn keys(&self) -> impl Iterator<Item = Category> + '_ {
        self.children.keys().copied()
    }
}

impl<R> Bucket<R> {
    /// Returns the records in this bucket.
    pub fn records(&self) -> &[Rc<R>] {
        &self.records
    }
}

// Manual impls: records are shared, so cloning never needs `R: Clone`.
impl<R> Clone for CubeNode<R> {
    fn clone(&self) -> Self {
        match self {
            Self::Grouping(node) => Self::Grouping(GroupingNode {
                dimension: node.dimension,
                below: node.below.clone(),
                children: node.children.clone(),
            }),
            Self::Bucket(bucket) => Self::Bucket(Bucket {
                records: bucket.records.clone(),
            }),
        }
    }
}

impl<R> Default for CubeNode<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> CubeNode<R> {
    /// Creates an empty tree using [`LAYOUT_POLICY`].
    pub fn new() -> Self {
        Self::with_layout(&LAYOUT_POLICY)
    }

    /// Creates an empty tree grouping by `layout`, root first.
    ///
    /// An empty layout yields a single bucket.
    pub fn with_layout(layout: &[Dimension]) -> Self {
        match layout.split_first() {
            Some((&dimension, below)) => Self::Grouping(GroupingNode {
                dimension,
                below: below.to_vec(),
                children: BTreeMap::new(),
            }),
            None => Self::Bucket(Bucket {
                records: Vec::new(),
            }),
        }
    }

    /// Creates a single bucket holding `records`.
    pub fn from_records(records: Vec<Rc<R>>) -> Self {
        Self::Bucket(Bucket { records })
    }

    /// Builds a one-level tree from pivot output. Empty groups are skipped.
    pub fn from_groups(dimension: Dimension, groups: PivotGroups<R>) -> Self {
        let children = groups
            .into_iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(category, records)| (category, Self::from_records(records)))
            .collect();

        Self::Grouping(GroupingNode {
            dimension,
            below: Vec::new(),
            children,
        })
    }

    /// Builds a two-level tree from nested pivot output. Empty groups are skipped.
    pub fn from_nested_groups(
        first: Dimension,
        second: Dimension,
        groups: NestedPivotGroups<R>,
    ) -> Self {
        let children = groups
            .into_iter()
            .filter(|(_, inner)| inner.values().any(|records| !records.is_empty()))
            .map(|(category, inner)| (category, Self::from_groups(second, inner)))
            .collect();

        Self::Grouping(GroupingNode {
            dimension: first,
            below: vec![second],
            children,
        })
    }

    /// Returns `true` if no records are reachable from this node.
    ///
    /// Grouping nodes never keep empty children, so a grouping node is empty
    /// exactly when it has no children.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Grouping(node) => node.children.is_empty(),
            Self::Bucket(bucket) => bucket.records.is_empty(),
        }
    }

    /// Returns the number of records reachable from this node.
    pub fn record_count(&self) -> usize {
        match self {
            Self::Grouping(node) => node.children.values().map(Self::record_count).sum(),
            Self::Bucket(bucket) => bucket.records.len(),
        }
    }

    /// Returns the grouping layout from this node down, root first.
    ///
    /// Follows the node's own layout, so it is known even for an empty node.
    pub fn layout(&self) -> Vec<Dimension> {
        match self {
            Self::Grouping(node) => {
                let mut layout = Vec::with_capacity(node.below.len() + 1);
                layout.push(node.dimension);
                layout.extend_from_slice(&node.below);
                layout
            }
            Self::Bucket(_) => Vec::new(),
        }
    }

    /// Appends every reachable record to `out`, in traversal order.
    ///
    /// The result carries no grouping; group membership can only be recovered
    /// from the records' own categories.
    pub fn rollup_into(&self, out: &mut Vec<Rc<R>>) {
        match self {
            Self::Grouping(node) => {
                for child in node.children.values() {
                    child.rollup_into(out);
                }
            }
            Self::Bucket(bucket) => out.extend(bucket.records.iter().cloned()),
        }
    }

    /// Returns a lazy walk over the non-empty buckets below this node.
    pub fn groups(&self) -> Groups<&Self> {
        Groups::new(self)
    }

    /// Finds the first non-empty bucket strictly after `after` in traversal order.
    ///
    /// Positions are child indices from this node down. `None` starts from
    /// the beginning. On success `path` holds the bucket's position.
    fn next_bucket(&self, after: Option<&[usize]>, path: &mut Vec<usize>) -> Option<&[Rc<R>]> {
        match self {
            Self::Bucket(bucket) => match after {
                None if !bucket.records.is_empty() => Some(&bucket.records),
                _ => None,
            },
            Self::Grouping(node) => {
                let (start, mut resume) = match after {
                    None => (0, None),
                    Some([first, rest @ ..]) => (*first, Some(rest)),
                    Some([]) => return None,
                };
                for (index, child) in node.children.values().enumerate().skip(start) {
                    path.push(index);
                    if let Some(records) = child.next_bucket(resume.take(), path) {
                        return Some(records);
                    }
                    path.pop();
                }
                None
            }
        }
    }
}

impl<R: Categorized> CubeNode<R> {
    /// Inserts a record, creating children along its path as needed.
    ///
    /// # Errors
    ///
    /// Returns [`InsertError::MissingDimension`] if the record has no value
    /// for a dimension this tree groups by. Nothing is inserted in that case
    /// and no empty children are left behind.
    pub fn insert(&mut self, record: Rc<R>) -> Result<(), InsertError> {
        match self {
            Self::Bucket(bucket) => {
                bucket.records.push(record);
                Ok(())
            }
            Self::Grouping(node) => {
                let category = record.category(node.dimension).ok_or(
                    InsertError::MissingDimension {
                        dimension: node.dimension,
                    },
                )?;
                debug_assert_eq!(category.dimension(), node.dimension);

                match node.children.entry(category) {
                    Entry::Occupied(mut child) => child.get_mut().insert(record),
                    Entry::Vacant(slot) => {
                        let mut child = Self::with_layout(&node.below);
                        child.insert(record)?;
                        slot.insert(child);
                        Ok(())
                    }
                }
            }
        }
    }

    /// Removes every record whose value for `wanted`'s dimension differs from `wanted`.
    ///
    /// Records with no value for that dimension are kept. A grouping node on
    /// the same dimension keeps only the matching child; other grouping nodes
    /// slice every child and drop those left empty.
    pub fn slice(&mut self, wanted: Category) {
        let dimension = wanted.dimension();
        match self {
            Self::Grouping(node) if node.dimension == dimension => {
                node.children.retain(|category, _| *category == wanted);
            }
            Self::Grouping(node) => {
                node.children.retain(|_, child| {
                    child.slice(wanted);
                    !child.is_empty()
                });
            }
            Self::Bucket(bucket) => bucket.records.retain(|record| {
                record
                    .category(dimension)
                    .is_none_or(|category| category == wanted)
            }),
        }
    }

    /// Removes every record whose `field` value falls outside `range`.
    pub fn slice_range(&mut self, field: NumericField, range: Range) {
        match self {
            Self::Grouping(node) => {
                node.children.retain(|_, child| {
                    child.slice_range(field, range);
                    !child.is_empty()
                });
            }
            Self::Bucket(bucket) => bucket
                .records
                .retain(|record| range.contains(record.numeric(field))),
        }
    }

    /// Regroups every reachable record by `dimension` into `out`.
    ///
    /// Records with no value for `dimension` are left out.
    pub fn pivot_into(&self, out: &mut PivotGroups<R>, dimension: Dimension) {
        match self {
            Self::Grouping(node) if node.dimension == dimension => {
                for (category, child) in &node.children {
                    child.rollup_into(out.entry(*category).or_default());
                }
            }
            Self::Grouping(node) => {
                for child in node.children.values() {
                    child.pivot_into(out, dimension);
                }
            }
            Self::Bucket(bucket) => {
                for record in &bucket.records {
                    if let Some(category) = record.category(dimension) {
                        out.entry(category).or_default().push(Rc::clone(record));
                    }
                }
            }
        }
    }

    /// Regroups every reachable record by `first`, then `second`, into `out`.
    ///
    /// Records missing either dimension are left out. A grouping node on
    /// `second` above one on `first` gives no shortcut (the nesting is the
    /// other way round), so it is walked like any other node and the records
    /// are classified at the buckets.
    pub fn pivot_pair_into(
        &self,
        out: &mut NestedPivotGroups<R>,
        first: Dimension,
        second: Dimension,
    ) {
        match self {
            Self::Grouping(node) if node.dimension == first => {
                for (category, child) in &node.children {
                    child.pivot_into(out.entry(*category).or_default(), second);
                }
            }
            Self::Grouping(node) => {
                for child in node.children.values() {
                    child.pivot_pair_into(out, first, second);
                }
            }
            Self::Bucket(bucket) => {
                for record in &bucket.records {
                    if let (Some(outer), Some(inner)) =
                        (record.category(first), record.category(second))
                    {
                        out.entry(outer)
                            .or_default()
                            .entry(inner)
                            .or_default()
                            .push(Rc::clone(record));
                    }
                }
            }
        }
    }
}

impl<R: fmt::Display> CubeNode<R> {
    /// Renders every bucket under a header of the categories leading to it.
    ///
    /// # Errors
    ///
    /// Returns any error raised by `out`.
    pub fn render<W: fmt::Write>(&self, keys: &mut Vec<Category>, out: &mut W) -> fmt::Result {
        match self {
            Self::Grouping(node) if node.children.is_empty() => {
                write_header(keys, out)?;
                out.write_str("empty\n")
            }
            Self::Grouping(node) => {
                for (category, child) in &node.children {
                    keys.push(*category);
                    child.render(keys, out)?;
                    keys.pop();
                }
                Ok(())
            }
            Self::Bucket(bucket) => {
                write_header(keys, out)?;
                if bucket.records.is_empty() {
                    out.write_str("empty\n")?;
                }
                for record in &bucket.records {
                    writeln!(out, "  {record}")?;
                }
                Ok(())
            }
        }
    }
}

fn write_header<W: fmt::Write>(keys: &[Category], out: &mut W) -> fmt::Result {
    out.write_str("group")?;
    for key in keys {
        write!(out, " {key}")?;
    }
    out.write_char('\n')
}

/// Lazy, non-restartable walk over the non-empty buckets of a tree.
///
/// Each item is a fresh copy of one bucket's record list; changing it does
/// not affect the tree. `N` is anything that dereferences to the root node,
/// so the walk can borrow a tree or share ownership of one.
#[derive(Debug)]
pub struct Groups<N> {
    root: N,
    /// Position of the last bucket yielded; `None` before the first.
    position: Option<Vec<usize>>,
    finished: bool,
}

impl<N> Groups<N> {
    pub(crate) fn new(root: N) -> Self {
        Self {
            root,
            position: None,
            finished: false,
        }
    }
}

impl<R, N> Groups<N>
where
    N: Deref<Target = CubeNode<R>>,
{
    /// Returns `true` if another group remains.
    pub fn has_next(&self) -> bool {
        !self.finished
            && self
                .root
                .next_bucket(self.position.as_deref(), &mut Vec::new())
                .is_some()
    }
}

impl<R, N> Iterator for Groups<N>
where
    N: Deref<Target = CubeNode<R>>,
{
    type Item = Vec<Rc<R>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut path = Vec::new();
        match self.root.next_bucket(self.position.as_deref(), &mut path) {
            Some(records) => {
                let group = records.to_vec();
                self.position = Some(path);
                Some(group)
            }
            None => {
                self.finished = true;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Down, Play, PlayFields, PlayType};

    fn play(ref_id: i32, down: Down, distance_needed: i32, gained: i32) -> Rc<Play> {
        Rc::new(Play::new(PlayFields {
            ref_id,
            play_type: PlayType::RunLeft,
            down,
            distance_needed,
            yard_line: 50,
            minutes_left: 45,
            score_differential: 0,
            distance_gained: gained,
            turnover: false,
        }))
    }

    fn ids(records: &[Rc<Play>]) -> Vec<i32> {
        let mut ids: Vec<i32> = records.iter().map(|p| p.ref_id()).collect();
        ids.sort_unstable();
        ids
    }

    fn sample_tree() -> CubeNode<Play> {
        let mut tree = CubeNode::new();
        tree.insert(play(1, Down::First, 10, 11)).unwrap();
        tree.insert(play(2, Down::First, 1, -2)).unwrap();
        tree.insert(play(3, Down::Third, 10, 5)).unwrap();
        tree.insert(play(4, Down::Third, 10, 8)).unwrap();
        tree
    }

    #[test]
    fn test_new_tree_follows_layout_policy() {
        let tree: CubeNode<Play> = CubeNode::new();
        assert!(tree.is_empty());
        assert_eq!(tree.layout(), LAYOUT_POLICY.to_vec());
    }

    #[test]
    fn test_insert_creates_children_lazily() {
        let tree = sample_tree();
        let CubeNode::Grouping(root) = &tree else {
            panic!("root should be a grouping node");
        };
        assert_eq!(root.dimension(), Dimension::Down);
        assert_eq!(
            root.keys().collect::<Vec<_>>(),
            vec![Category::Down(Down::First), Category::Down(Down::Third)]
        );
        let first = root.child(Category::Down(Down::First)).unwrap();
        assert_eq!(first.layout()[0], Dimension::Distance);
        assert_eq!(first.record_count(), 2);
        assert_eq!(tree.record_count(), 4);
    }

    #[test]
    fn test_groups_walk_buckets_in_order() {
        let tree = sample_tree();
        let groups: Vec<Vec<i32>> = tree.groups().map(|g| ids(&g)).collect();
        // FIRST/TEN_TO_FOUR, FIRST/ONE_OR_LESS, THIRD/TEN_TO_FOUR
        assert_eq!(groups, vec![vec![1], vec![2], vec![3, 4]]);
    }

    #[test]
    fn test_groups_are_copies() {
        let tree = sample_tree();
        let mut first = tree.groups().next().unwrap();
        first.clear();
        assert_eq!(tree.record_count(), 4);
    }

    #[test]
    fn test_groups_not_restartable() {
        let tree = sample_tree();
        let mut groups = tree.groups();
        assert!(groups.has_next());
        assert_eq!(groups.by_ref().count(), 3);
        assert!(!groups.has_next());
        assert!(groups.next().is_none());
    }

    #[test]
    fn test_slice_on_root_dimension_keeps_one_child() {
        let mut tree = sample_tree();
        tree.slice(Category::Down(Down::Third));
        let mut all = Vec::new();
        tree.rollup_into(&mut all);
        assert_eq!(ids(&all), vec![3, 4]);
    }

    #[test]
    fn test_slice_missing_value_empties_tree() {
        let mut tree = sample_tree();
        tree.slice(Category::Down(Down::Fourth));
        assert!(tree.is_empty());
        assert_eq!(tree.groups().count(), 0);
    }

    #[test]
    fn test_slice_on_inner_dimension_prunes_empty_children() {
        let mut tree = sample_tree();
        tree.slice(Category::Distance(crate::record::Distance::OneOrLess));
        let CubeNode::Grouping(root) = &tree else {
            panic!("root should be a grouping node");
        };
        // THIRD_DOWN had no short-yardage plays and is gone entirely.
        assert_eq!(root.keys().collect::<Vec<_>>(), vec![Category::Down(Down::First)]);
        assert_eq!(tree.record_count(), 1);
    }

    #[test]
    fn test_slice_at_buckets_for_unlaid_dimension() {
        let mut tree = sample_tree();
        tree.slice(Category::PlayType(PlayType::Punt));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_slice_range() {
        let mut tree = sample_tree();
        tree.slice_range(NumericField::DistanceGained, Range::new(0, 10));
        let mut all = Vec::new();
        tree.rollup_into(&mut all);
        assert_eq!(ids(&all), vec![3, 4]);
    }

    #[test]
    fn test_pivot_into_uses_matching_level() {
        let tree = sample_tree();
        let mut out = PivotGroups::new();
        tree.pivot_into(&mut out, Dimension::Down);
        assert_eq!(ids(&out[&Category::Down(Down::First)]), vec![1, 2]);
        assert_eq!(ids(&out[&Category::Down(Down::Third)]), vec![3, 4]);
    }

    #[test]
    fn test_pivot_pair_in_reverse_tree_order() {
        let tree = sample_tree();
        let mut out = NestedPivotGroups::new();
        // Distance sits below Down in the tree; ask for it first.
        tree.pivot_pair_into(&mut out, Dimension::Distance, Dimension::Down);
        let ten = &out[&Category::Distance(crate::record::Distance::TenToFour)];
        assert_eq!(ids(&ten[&Category::Down(Down::First)]), vec![1]);
        assert_eq!(ids(&ten[&Category::Down(Down::Third)]), vec![3, 4]);
        let short = &out[&Category::Distance(crate::record::Distance::OneOrLess)];
        assert_eq!(short.len(), 1);
        assert_eq!(ids(&short[&Category::Down(Down::First)]), vec![2]);
    }

    #[test]
    fn test_from_groups_skips_empty_groups() {
        let mut groups = PivotGroups::new();
        groups.insert(Category::Down(Down::First), vec![play(1, Down::First, 10, 0)]);
        groups.insert(Category::Down(Down::Second), Vec::new());
        let tree = CubeNode::from_groups(Dimension::Down, groups);
        assert_eq!(tree.groups().count(), 1);
        assert_eq!(tree.layout(), vec![Dimension::Down]);
    }

    #[test]
    fn test_clone_is_structurally_disjoint() {
        let tree = sample_tree();
        let mut copy = tree.clone();
        copy.slice(Category::Down(Down::First));
        assert_eq!(tree.record_count(), 4);
        assert_eq!(copy.record_count(), 2);

        // Records themselves are shared, not duplicated.
        let mut original = Vec::new();
        tree.rollup_into(&mut original);
        let mut copied = Vec::new();
        copy.rollup_into(&mut copied);
        assert!(original.iter().any(|a| Rc::ptr_eq(a, &copied[0])));
    }

    #[test]
    fn test_render_lists_group_keys() {
        let tree = sample_tree();
        let mut out = String::new();
        tree.render(&mut Vec::new(), &mut out).unwrap();
        assert!(out.contains("group FIRST_DOWN TEN_TO_FOUR OUTSIDE_TWO_MINUTES MIDDLE EVEN_SCORE"));
        assert!(out.contains("#3 RUN_LEFT gained=5"));
    }

    #[test]
    fn test_render_empty_tree() {
        let tree: CubeNode<Play> = CubeNode::new();
        let mut out = String::new();
        tree.render(&mut Vec::new(), &mut out).unwrap();
        assert_eq!(out, "group\nempty\n");
    }

    #[test]
    fn test_render_propagates_writer_errors() {
        struct Full;
        impl fmt::Write for Full {
            fn write_str(&mut self, _: &str) -> fmt::Result {
                Err(fmt::Error)
            }
        }

        let tree = sample_tree();
        assert_eq!(tree.render(&mut Vec::new(), &mut Full), Err(fmt::Error));
    }
}
