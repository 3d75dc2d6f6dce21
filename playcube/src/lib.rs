//! # playcube
//!
//! In-memory OLAP cube for categorical football play records.
//!
//! playcube keeps a set of plays in a tree grouped by categorical dimensions
//! (down, yards needed, time left, field position, score margin) and supports
//! the classic cube operations on it: slice by a category or a numeric range,
//! roll everything up into one group, and pivot into groups keyed by one or
//! two dimensions. The resulting groups are read through a cursor that refuses
//! to read once the store changes underneath it.
//!
//! **Status**: This crate is in early development. The API is not yet stable.
//!
//! ## Key Properties
//!
//! - Records are immutable and shared; cloning a store copies only the tree
//! - Slices prune whole subtrees when the dimension is laid out in the tree
//! - Cursors are lazy, non-restartable, and guarded by a generation stamp
//! - Single-threaded by design, with no internal locking
//!
//! ## Quick Start
//!
//! ```rust
//! use playcube::{Category, Dimension, Down, Play, PlayFields, PlayType, Store};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = Store::new();
//! let plays = [
//!     (1, Down::First, 10, 11, false),
//!     (2, Down::First, 1, -2, true),
//!     (3, Down::Third, 10, 5, false),
//! ];
//! for (ref_id, down, distance_needed, distance_gained, turnover) in plays {
//!     store.insert(Play::new(PlayFields {
//!         ref_id,
//!         play_type: PlayType::RunMiddle,
//!         down,
//!         distance_needed,
//!         yard_line: 65,
//!         minutes_left: 40,
//!         score_differential: 0,
//!         distance_gained,
//!         turnover,
//!     }))?;
//! }
//!
//! // Keep first downs only, then flatten into one group.
//! store.slice(Category::Down(Down::First));
//! store.rollup();
//! let groups: Vec<_> = store.cursor().collect();
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].len(), 2);
//!
//! // Regroup by down.
//! store.pivot(Dimension::Down);
//! for group in store.cursor() {
//!     println!("{}: {} plays", group[0].down(), group.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`Store`]: Entry point; owns the tree and the cursor guard
//! - [`Play`]: Immutable play record with cached category buckets
//! - [`SliceChain`]: Tail-first chain of categorical and range slices
//! - [`QueryConfig`]: JSON-loadable filters and grouping, built into a [`Query`]
//!
//! ## Modules
//!
//! For lower-level access, the individual modules are also public:
//!
//! - [`store`]: Store operations and cursors
//! - [`cube`]: The storage tree
//! - [`record`]: Dimensions, categories, numeric fields, and plays
//! - [`range`]: Closed integer intervals
//! - [`slice`]: Filter chains
//! - [`query`]: Query configuration and results
//! - [`stats`]: Group ranges, summaries and scatter data
//! - [`synthetic`]: Deterministic generated plays
//! - [`error`]: Error types

pub mod cube;
pub mod error;
pub mod query;
pub mod range;
pub mod record;
pub mod slice;
pub mod stats;
pub mod store;
pub mod synthetic;

// Re-export primary API types at crate root for convenience.
pub use cube::{CubeNode, LAYOUT_POLICY};
pub use error::{CursorError, InsertError, PivotError, PlaycubeError, QueryError, Result};
pub use query::{FilterConfig, GroupRow, Grouping, Query, QueryConfig, QueryResult};
pub use range::Range;
pub use record::{
    Categorized, Category, Dimension, Distance, Down, FieldZone, NumericField, Play, PlayFields,
    PlayType, ScoreMargin, TimeLeft,
};
pub use slice::{SliceChain, SliceStep};
pub use stats::{GroupSummary, ScatterAxes, ScatterPlot, ScatterSeries};
pub use store::{Cursor, Store};
pub use synthetic::PlayGenerator;
