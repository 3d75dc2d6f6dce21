//! Deterministic synthetic plays.
//!
//! A small linear congruential generator that spreads plays over every
//! category of every dimension. The same seed always yields the same plays,
//! so benchmarks and tests can compare runs.
//!
//! # Example Usage
//!
//! ```rust
//! use playcube::{PlayGenerator, Store};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = Store::new();
//! store.extend(PlayGenerator::new(7).plays(100))?;
//! assert_eq!(store.record_count(), 100);
//! # Ok(())
//! # }
//! ```

use crate::record::{Down, Play, PlayFields, PlayType};

/// Seeded generator of plausible plays.
#[derive(Debug, Clone)]
pub struct PlayGenerator {
    state: u64,
}

impl PlayGenerator {
    /// Creates a generator from `seed`.
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.state >> 33
    }

    /// Returns a value in `0..n`, or 0 when `n` is 0.
    #[allow(clippy::cast_possible_truncation)] // the remainder is below n
    pub fn below(&mut self, n: u32) -> u32 {
        (self.next_u64() % u64::from(n.max(1))) as u32
    }

    /// Returns a value in `low..=high`. Reversed bounds are swapped.
    pub fn between(&mut self, low: i32, high: i32) -> i32 {
        let (low, high) = (low.min(high), low.max(high));
        let span = high.abs_diff(low).saturating_add(1);
        let offset = i64::from(self.below(span));
        i32::try_from(i64::from(low) + offset).unwrap_or(high)
    }

    fn pick<T: Copy>(&mut self, values: &[T]) -> T {
        let len = u32::try_from(values.len()).unwrap_or(u32::MAX);
        values[self.below(len) as usize]
    }

    /// Generates one play with the given reference id.
    ///
    /// Roughly one play in twenty is a turnover.
    pub fn play(&mut self, ref_id: i32) -> Play {
        Play::new(PlayFields {
            ref_id,
            play_type: self.pick(PlayType::ALL),
            down: self.pick(Down::ALL),
            distance_needed: self.between(1, 25),
            yard_line: self.between(1, 99),
            minutes_left: self.between(0, 60),
            score_differential: self.between(-28, 28),
            distance_gained: self.between(-10, 40),
            turnover: self.below(20) == 0,
        })
    }

    /// Generates `count` plays with reference ids `0..count`.
    pub fn plays(&mut self, count: usize) -> Vec<Play> {
        (0..count)
            .map(|i| self.play(i32::try_from(i).unwrap_or(i32::MAX)))
            .collect()
    }
}
