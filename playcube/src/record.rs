//! Record and dimension model.
//!
//! A play is described by a fixed set of categorical [`Dimension`]s (each with
//! a closed, ordered domain of values) and a fixed set of [`NumericField`]s.
//! The cube never looks inside a record directly: it classifies records only
//! through the [`Categorized`] accessors, so any record type can be stored as
//! long as it answers them.
//!
//! # Dimensions
//!
//! | Dimension      | Values                                                    |
//! |----------------|-----------------------------------------------------------|
//! | `down`         | `FIRST_DOWN` .. `FOURTH_DOWN`                             |
//! | `distance`     | `OVER_TWENTY` .. `ONE_OR_LESS` (yards needed)             |
//! | `field_zone`   | `OWN_RED_ZONE`, `MIDDLE`, `OPP_RED_ZONE`                  |
//! | `time_left`    | `OUTSIDE_TWO_MINUTES`, `INSIDE_TWO_MINUTES`               |
//! | `score_margin` | `DOWN_OVER_FOURTEEN` .. `UP_OVER_FOURTEEN`                |
//! | `play_type`    | `RUN_LEFT` .. `PUNT`                                      |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Declares a closed, ordered domain of category values.
macro_rules! domain {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every value of the domain, in domain order.
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// Returns the canonical `SCREAMING_SNAKE_CASE` name.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }

            /// Looks up a value by name, ignoring ASCII case.
            pub fn from_name(name: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|value| value.as_str().eq_ignore_ascii_case(name))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

domain! {
    /// Down number.
    Down {
        /// First down.
        First => "FIRST_DOWN",
        /// Second down.
        Second => "SECOND_DOWN",
        /// Third down.
        Third => "THIRD_DOWN",
        /// Fourth down.
        Fourth => "FOURTH_DOWN",
    }
}

domain! {
    /// Yards needed for a first down, bucketed by how they affect play calling.
    Distance {
        /// 20 yards or more.
        OverTwenty => "OVER_TWENTY",
        /// 11 to 19 yards.
        TwentyToTen => "TWENTY_TO_TEN",
        /// 5 to 10 yards.
        TenToFour => "TEN_TO_FOUR",
        /// 2 to 4 yards.
        FourToOne => "FOUR_TO_ONE",
        /// 1 yard or less.
        OneOrLess => "ONE_OR_LESS",
    }
}

domain! {
    /// Field position at the snap.
    ///
    /// A red zone here is the 10 yards closest to a goal line.
    FieldZone {
        /// Within 10 yards of the offense's own goal line.
        OwnRedZone => "OWN_RED_ZONE",
        /// Between the red zones.
        Middle => "MIDDLE",
        /// Within 10 yards of the opponent's goal line.
        OppRedZone => "OPP_RED_ZONE",
    }
}

domain! {
    /// Time left in the half.
    TimeLeft {
        /// Two minutes or more left.
        OutsideTwoMinutes => "OUTSIDE_TWO_MINUTES",
        /// Under two minutes left.
        InsideTwoMinutes => "INSIDE_TWO_MINUTES",
    }
}

domain! {
    /// Score differential from the offense's point of view.
    ScoreMargin {
        /// Trailing by 15 or more.
        DownOverFourteen => "DOWN_OVER_FOURTEEN",
        /// Trailing by 8 to 14.
        DownOverSeven => "DOWN_OVER_SEVEN",
        /// Trailing by 1 to 7.
        DownSevenLess => "DOWN_SEVEN_LESS",
        /// Tied.
        EvenScore => "EVEN_SCORE",
        /// Leading by 1 to 7.
        UpSevenLess => "UP_SEVEN_LESS",
        /// Leading by 8 to 14.
        UpOverSeven => "UP_OVER_SEVEN",
        /// Leading by 15 or more.
        UpOverFourteen => "UP_OVER_FOURTEEN",
    }
}

domain! {
    /// Called play.
    PlayType {
        /// Run to the left.
        RunLeft => "RUN_LEFT",
        /// Run up the middle.
        RunMiddle => "RUN_MIDDLE",
        /// Run to the right.
        RunRight => "RUN_RIGHT",
        /// Short pass to the right.
        PassShortRight => "PASS_SHORT_RIGHT",
        /// Short pass over the middle.
        PassShortMiddle => "PASS_SHORT_MIDDLE",
        /// Short pass to the left.
        PassShortLeft => "PASS_SHORT_LEFT",
        /// Deep pass to the right.
        PassDeepRight => "PASS_DEEP_RIGHT",
        /// Deep pass over the middle.
        PassDeepMiddle => "PASS_DEEP_MIDDLE",
        /// Deep pass to the left.
        PassDeepLeft => "PASS_DEEP_LEFT",
        /// Field goal attempt.
        FieldGoal => "FIELD_GOAL",
        /// Punt.
        Punt => "PUNT",
    }
}

impl Distance {
    /// Buckets the yards needed for a first down.
    pub fn classify(yards: i32) -> Self {
        if yards <= 1 {
            Self::OneOrLess
        } else if yards <= 4 {
            Self::FourToOne
        } else if yards <= 10 {
            Self::TenToFour
        } else if yards < 20 {
            Self::TwentyToTen
        } else {
            Self::OverTwenty
        }
    }
}

impl FieldZone {
    /// Buckets a yard line given as yards to the opponent's goal line.
    pub fn classify(yard_line: i32) -> Self {
        if yard_line >= 90 {
            Self::OwnRedZone
        } else if yard_line > 10 {
            Self::Middle
        } else {
            Self::OppRedZone
        }
    }
}

impl TimeLeft {
    /// Buckets the minutes left in the game into time left in the half.
    pub fn classify(minutes: i32) -> Self {
        if minutes < 2 || (30..32).contains(&minutes) {
            Self::InsideTwoMinutes
        } else {
            Self::OutsideTwoMinutes
        }
    }
}

impl ScoreMargin {
    /// Buckets a score differential (own score minus opponent's).
    pub fn classify(differential: i32) -> Self {
        if differential < -14 {
            Self::DownOverFourteen
        } else if differential < -7 {
            Self::DownOverSeven
        } else if differential < 0 {
            Self::DownSevenLess
        } else if differential == 0 {
            Self::EvenScore
        } else if differential <= 7 {
            Self::UpSevenLess
        } else if differential <= 14 {
            Self::UpOverSeven
        } else {
            Self::UpOverFourteen
        }
    }
}

/// A categorical dimension kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Down number.
    Down,
    /// Bucketed yards needed.
    Distance,
    /// Bucketed field position.
    FieldZone,
    /// Bucketed time left in the half.
    TimeLeft,
    /// Bucketed score differential.
    ScoreMargin,
    /// Called play.
    PlayType,
}

impl Dimension {
    /// Every dimension kind.
    pub const ALL: [Dimension; 6] = [
        Dimension::Down,
        Dimension::Distance,
        Dimension::FieldZone,
        Dimension::TimeLeft,
        Dimension::ScoreMargin,
        Dimension::PlayType,
    ];

    /// Returns the canonical `snake_case` name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Down => "down",
            Self::Distance => "distance",
            Self::FieldZone => "field_zone",
            Self::TimeLeft => "time_left",
            Self::ScoreMargin => "score_margin",
            Self::PlayType => "play_type",
        }
    }

    /// Returns every category of this dimension, in domain order.
    pub fn domain(self) -> Vec<Category> {
        match self {
            Self::Down => Down::ALL.iter().copied().map(Category::Down).collect(),
            Self::Distance => Distance::ALL.iter().copied().map(Category::Distance).collect(),
            Self::FieldZone => FieldZone::ALL.iter().copied().map(Category::FieldZone).collect(),
            Self::TimeLeft => TimeLeft::ALL.iter().copied().map(Category::TimeLeft).collect(),
            Self::ScoreMargin => ScoreMargin::ALL
                .iter()
                .copied()
                .map(Category::ScoreMargin)
                .collect(),
            Self::PlayType => PlayType::ALL.iter().copied().map(Category::PlayType).collect(),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|dimension| dimension.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| QueryError::UnknownDimension {
                name: s.to_string(),
            })
    }
}

/// One value of one dimension.
///
/// The variant names the dimension kind; the payload is the value within that
/// dimension's domain. Within a single dimension, categories order by domain
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    /// A down number.
    Down(Down),
    /// A yards-needed bucket.
    Distance(Distance),
    /// A field position bucket.
    FieldZone(FieldZone),
    /// A time-left bucket.
    TimeLeft(TimeLeft),
    /// A score differential bucket.
    ScoreMargin(ScoreMargin),
    /// A play type.
    PlayType(PlayType),
}

impl Category {
    /// Returns the dimension this category belongs to.
    pub fn dimension(self) -> Dimension {
        match self {
            Self::Down(_) => Dimension::Down,
            Self::Distance(_) => Dimension::Distance,
            Self::FieldZone(_) => Dimension::FieldZone,
            Self::TimeLeft(_) => Dimension::TimeLeft,
            Self::ScoreMargin(_) => Dimension::ScoreMargin,
            Self::PlayType(_) => Dimension::PlayType,
        }
    }

    /// Returns the value's canonical name, without the dimension.
    pub fn name(self) -> &'static str {
        match self {
            Self::Down(v) => v.as_str(),
            Self::Distance(v) => v.as_str(),
            Self::FieldZone(v) => v.as_str(),
            Self::TimeLeft(v) => v.as_str(),
            Self::ScoreMargin(v) => v.as_str(),
            Self::PlayType(v) => v.as_str(),
        }
    }

    /// Parses a value name within the given dimension.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownCategory`] if `name` is not in the
    /// dimension's domain.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use playcube::{Category, Dimension, Down};
    ///
    /// let first = Category::parse(Dimension::Down, "first_down")?;
    /// assert_eq!(first, Category::Down(Down::First));
    /// # Ok::<(), playcube::error::QueryError>(())
    /// ```
    pub fn parse(dimension: Dimension, name: &str) -> Result<Self, QueryError> {
        let name = name.trim();
        let found = match dimension {
            Dimension::Down => Down::from_name(name).map(Self::Down),
            Dimension::Distance => Distance::from_name(name).map(Self::Distance),
            Dimension::FieldZone => FieldZone::from_name(name).map(Self::FieldZone),
            Dimension::TimeLeft => TimeLeft::from_name(name).map(Self::TimeLeft),
            Dimension::ScoreMargin => ScoreMargin::from_name(name).map(Self::ScoreMargin),
            Dimension::PlayType => PlayType::from_name(name).map(Self::PlayType),
        };
        found.ok_or_else(|| QueryError::UnknownCategory {
            dimension,
            value: name.to_string(),
        })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An integer-valued field of a record.
///
/// `PlayCount` and `TurnoverCount` are degenerate on a single record (always 1,
/// and 0 or 1) but total meaningfully over a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    /// Yards needed for a first down.
    DistanceNeeded,
    /// Yards to the opponent's goal line.
    YardLine,
    /// Minutes left in the game.
    MinutesLeft,
    /// Own score minus opponent's score.
    ScoreDifferential,
    /// Yards gained on the play.
    DistanceGained,
    /// Always 1.
    PlayCount,
    /// 1 if the play turned the ball over, else 0.
    TurnoverCount,
}

impl NumericField {
    /// Every numeric field.
    pub const ALL: [NumericField; 7] = [
        NumericField::DistanceNeeded,
        NumericField::YardLine,
        NumericField::MinutesLeft,
        NumericField::ScoreDifferential,
        NumericField::DistanceGained,
        NumericField::PlayCount,
        NumericField::TurnoverCount,
    ];

    /// Returns the canonical `snake_case` name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DistanceNeeded => "distance_needed",
            Self::YardLine => "yard_line",
            Self::MinutesLeft => "minutes_left",
            Self::ScoreDifferential => "score_differential",
            Self::DistanceGained => "distance_gained",
            Self::PlayCount => "play_count",
            Self::TurnoverCount => "turnover_count",
        }
    }

    /// Returns `true` for fields that are counts when totalled over a group.
    pub fn is_count(self) -> bool {
        matches!(self, Self::PlayCount | Self::TurnoverCount)
    }
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NumericField {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| QueryError::UnknownField {
                name: s.to_string(),
            })
    }
}

/// Generic read access to a record's dimensions and numeric fields.
///
/// This is the only way the cube classifies a record. Both accessors must be
/// total: `category` returns `None` when the record has no value for a
/// dimension, and `numeric` always returns a value.
pub trait Categorized: fmt::Debug {
    /// Returns the record's value for `dimension`, if it has one.
    fn category(&self, dimension: Dimension) -> Option<Category>;

    /// Returns the record's value for `field`.
    fn numeric(&self, field: NumericField) -> i32;
}

/// Raw fields of a play, as produced by ingestion.
///
/// This is also the serialized form of [`Play`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayFields {
    /// Reference id used to trace a play through the system.
    pub ref_id: i32,
    /// The called play.
    pub play_type: PlayType,
    /// Down number.
    pub down: Down,
    /// Yards needed for a first down.
    pub distance_needed: i32,
    /// Yards to the opponent's goal line.
    pub yard_line: i32,
    /// Minutes left in the game.
    pub minutes_left: i32,
    /// Own score minus opponent's score.
    pub score_differential: i32,
    /// Yards gained on the play.
    pub distance_gained: i32,
    /// Whether the play turned the ball over.
    #[serde(default)]
    pub turnover: bool,
}

/// An immutable play record.
///
/// Bucketed categories are computed once at construction and always agree
/// with the raw fields; there is no way to change one without the other.
///
/// # Examples
///
/// ```rust
/// use playcube::{Categorized, Category, Dimension, Distance, Down, Play, PlayFields, PlayType};
///
/// let play = Play::new(PlayFields {
///     ref_id: 7,
///     play_type: PlayType::RunMiddle,
///     down: Down::Third,
///     distance_needed: 1,
///     yard_line: 45,
///     minutes_left: 20,
///     score_differential: -3,
///     distance_gained: 2,
///     turnover: false,
/// });
///
/// assert_eq!(play.category(Dimension::Distance), Some(Category::Distance(Distance::OneOrLess)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PlayFields", into = "PlayFields")]
pub struct Play {
    fields: PlayFields,
    distance: Distance,
    field_zone: FieldZone,
    time_left: TimeLeft,
    score_margin: ScoreMargin,
}

impl Play {
    /// Creates a play, classifying every bucketed field.
    pub fn new(fields: PlayFields) -> Self {
        Self {
            distance: Distance::classify(fields.distance_needed),
            field_zone: FieldZone::classify(fields.yard_line),
            time_left: TimeLeft::classify(fields.minutes_left),
            score_margin: ScoreMargin::classify(fields.score_differential),
            fields,
        }
    }

    /// Returns the raw fields.
    pub fn fields(&self) -> &PlayFields {
        &self.fields
    }

    /// Returns the reference id.
    pub fn ref_id(&self) -> i32 {
        self.fields.ref_id
    }

    /// Returns the called play.
    pub fn play_type(&self) -> PlayType {
        self.fields.play_type
    }

    /// Returns the down number.
    pub fn down(&self) -> Down {
        self.fields.down
    }

    /// Returns the yards-needed bucket.
    pub fn distance(&self) -> Distance {
        self.distance
    }

    /// Returns the field position bucket.
    pub fn field_zone(&self) -> FieldZone {
        self.field_zone
    }

    /// Returns the time-left bucket.
    pub fn time_left(&self) -> TimeLeft {
        self.time_left
    }

    /// Returns the score differential bucket.
    pub fn score_margin(&self) -> ScoreMargin {
        self.score_margin
    }

    /// Returns the yards gained.
    pub fn distance_gained(&self) -> i32 {
        self.fields.distance_gained
    }

    /// Returns whether the play turned the ball over.
    pub fn turnover(&self) -> bool {
        self.fields.turnover
    }
}

impl From<PlayFields> for Play {
    fn from(fields: PlayFields) -> Self {
        Self::new(fields)
    }
}

impl From<Play> for PlayFields {
    fn from(play: Play) -> Self {
        play.fields
    }
}

impl Categorized for Play {
    fn category(&self, dimension: Dimension) -> Option<Category> {
        let category = match dimension {
            Dimension::Down => Category::Down(self.fields.down),
            Dimension::Distance => Category::Distance(self.distance),
            Dimension::FieldZone => Category::FieldZone(self.field_zone),
            Dimension::TimeLeft => Category::TimeLeft(self.time_left),
            Dimension::ScoreMargin => Category::ScoreMargin(self.score_margin),
            Dimension::PlayType => Category::PlayType(self.fields.play_type),
        };
        Some(category)
    }

    fn numeric(&self, field: NumericField) -> i32 {
        match field {
            NumericField::DistanceNeeded => self.fields.distance_needed,
            NumericField::YardLine => self.fields.yard_line,
            NumericField::MinutesLeft => self.fields.minutes_left,
            NumericField::ScoreDifferential => self.fields.score_differential,
            NumericField::DistanceGained => self.fields.distance_gained,
            NumericField::PlayCount => 1,
            NumericField::TurnoverCount => i32::from(self.fields.turnover),
        }
    }
}

impl fmt::Display for Play {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} gained={} turnover={} [{} {} {} {} {}]",
            self.fields.ref_id,
            self.fields.play_type,
            self.fields.distance_gained,
            self.fields.turnover,
            self.fields.down,
            self.distance,
            self.field_zone,
            self.time_left,
            self.score_margin,
        )
    }
}
