//! Integration tests for cursor invalidation.
//!
//! A cursor must stop yielding as soon as its store is mutated, whichever
//! operation did the mutating. A checked read reports why, and an unchecked
//! read panics rather than ending the walk early.

mod common;

use common::{play, scenario_plays, synthetic_plays};
use playcube::{Category, CursorError, Dimension, Down, NumericField, Range, Store};

fn loaded() -> Store {
    let mut store = Store::new();
    store.extend(synthetic_plays(250, 99)).unwrap();
    store
}

type Mutation = fn(&mut Store);

fn insert(store: &mut Store) {
    store.insert(play(9_999, Down::Second, 5, 5, false)).unwrap();
}

fn slice(store: &mut Store) {
    store.slice(Category::Down(Down::First));
}

fn slice_range(store: &mut Store) {
    store.slice_range(NumericField::DistanceGained, Range::new(0, 5));
}

fn pivot(store: &mut Store) {
    store.pivot(Dimension::PlayType);
}

fn pivot_pair(store: &mut Store) {
    store.pivot_pair(Dimension::FieldZone, Dimension::Down).unwrap();
}

fn mutations() -> [(&'static str, Mutation); 6] {
    [
        ("insert", insert as Mutation),
        ("slice", slice as Mutation),
        ("slice_range", slice_range as Mutation),
        ("rollup", Store::rollup as Mutation),
        ("pivot", pivot as Mutation),
        ("pivot_pair", pivot_pair as Mutation),
    ]
}

#[test]
fn test_every_mutation_invalidates_mid_traversal() {
    for (name, mutate) in mutations() {
        let mut store = loaded();
        let mut cursor = store.cursor();
        assert!(cursor.has_next(), "{name}: fresh cursor should have groups");
        assert!(cursor.next().is_some());
        assert!(cursor.has_next());

        mutate(&mut store);

        assert!(!cursor.is_valid(), "{name}");
        assert!(!cursor.has_next(), "{name}");
        assert!(
            matches!(cursor.try_next(), Err(CursorError::Invalidated { .. })),
            "{name}"
        );
    }
}

#[test]
fn test_every_mutation_makes_unchecked_reads_panic() {
    for (name, mutate) in mutations() {
        let mut store = loaded();
        let mut cursor = store.cursor();
        assert!(cursor.next().is_some());

        mutate(&mut store);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cursor.next()));
        assert!(outcome.is_err(), "{name}: stale read should panic");
    }
}

#[test]
#[should_panic(expected = "store modified during iteration")]
fn test_for_loop_over_stale_cursor_panics() {
    let mut store = Store::new();
    store.extend(scenario_plays()).unwrap();
    store.pivot(Dimension::Down);

    let mut cursor = store.cursor();
    assert!(cursor.next().is_some());
    assert!(cursor.has_next());
    store.slice(Category::Down(Down::First));

    for _ in cursor.by_ref() {}
}

#[test]
fn test_cursor_valid_until_mutation() {
    let store = loaded();
    let mut cursor = store.cursor();
    let mut seen = 0;
    while cursor.has_next() {
        assert!(cursor.try_next().unwrap().is_some());
        seen += 1;
    }
    assert_eq!(seen, store.groups().count());
    assert_eq!(cursor.try_next(), Ok(None));
    assert!(cursor.is_valid());
}

#[test]
fn test_cursors_are_not_restartable() {
    let mut store = Store::new();
    store.extend(scenario_plays()).unwrap();
    store.pivot(Dimension::Down);

    let mut cursor = store.cursor();
    assert_eq!(cursor.by_ref().count(), 2);
    assert!(!cursor.has_next());
    assert!(cursor.next().is_none());

    // A new cursor starts over.
    assert_eq!(store.cursor().count(), 2);
}

#[test]
fn test_yielded_groups_are_copies() {
    let mut store = Store::new();
    store.extend(scenario_plays()).unwrap();
    store.rollup();

    let mut group = store.cursor().next().unwrap();
    group.clear();
    assert_eq!(store.record_count(), 3);
    assert_eq!(store.cursor().next().unwrap().len(), 3);
}

#[test]
fn test_invalidation_is_debounced() {
    let mut store = loaded();
    let start = store.generation();

    let cursors: Vec<_> = (0..10).map(|_| store.cursor()).collect();
    store.slice(Category::Down(Down::Third));
    assert_eq!(store.generation(), start + 1);
    assert!(cursors.iter().all(|c| !c.is_valid()));

    // No cursor since the last bump: further mutations leave it alone.
    store.rollup();
    store.pivot(Dimension::Distance);
    assert_eq!(store.generation(), start + 1);

    let cursor = store.cursor();
    store.slice(Category::Down(Down::Third));
    assert_eq!(store.generation(), start + 2);
    assert!(!cursor.is_valid());
}

#[test]
fn test_invalidated_error_reports_generations() {
    let mut store = loaded();
    let _ = store.cursor();
    store.rollup();

    let mut cursor = store.cursor();
    store.rollup();

    assert_eq!(
        cursor.try_next(),
        Err(CursorError::Invalidated {
            issued_at: 1,
            current: 2
        })
    );
}

#[test]
fn test_copies_keep_their_own_cursors_valid() {
    let mut store = loaded();
    let copy = store.clone();
    let mut copy_cursor = copy.cursor();
    let store_cursor = store.cursor();

    store.slice(Category::Down(Down::Fourth));

    assert!(!store_cursor.is_valid());
    assert!(copy_cursor.is_valid());
    assert!(copy_cursor.try_next().unwrap().is_some());
}
