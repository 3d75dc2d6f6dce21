//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::rc::Rc;

use playcube::{Down, Play, PlayFields, PlayGenerator, PlayType};

/// Builds a play with neutral situation fields.
pub fn play(ref_id: i32, down: Down, distance_needed: i32, gained: i32, turnover: bool) -> Play {
    Play::new(PlayFields {
        ref_id,
        play_type: PlayType::RunMiddle,
        down,
        distance_needed,
        yard_line: 60,
        minutes_left: 40,
        score_differential: 0,
        distance_gained: gained,
        turnover,
    })
}

/// The three plays used by the documented scenarios.
pub fn scenario_plays() -> Vec<Play> {
    vec![
        play(1, Down::First, 10, 11, false),
        play(2, Down::First, 1, -2, true),
        play(3, Down::Third, 10, 5, false),
    ]
}

/// Generates `count` plays with ids `0..count`, spread over every dimension.
pub fn synthetic_plays(count: usize, seed: u64) -> Vec<Play> {
    PlayGenerator::new(seed).plays(count)
}

/// Returns the sorted reference ids of `records`.
pub fn ids<P: std::ops::Deref<Target = Play>>(records: &[P]) -> Vec<i32> {
    let mut ids: Vec<i32> = records.iter().map(|p| p.ref_id()).collect();
    ids.sort_unstable();
    ids
}

/// Returns the sorted reference ids of every record in every group.
pub fn all_ids(groups: &[Vec<Rc<Play>>]) -> Vec<i32> {
    let mut ids: Vec<i32> = groups.iter().flatten().map(|p| p.ref_id()).collect();
    ids.sort_unstable();
    ids
}
