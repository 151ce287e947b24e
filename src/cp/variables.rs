//! Interval variables.

use serde::{Deserialize, Serialize};

/// Closed integer range `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// Lower end.
    pub min: i64,
    /// Upper end.
    pub max: i64,
}

impl Bounds {
    /// Creates a range.
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// A single value.
    pub fn fixed(value: i64) -> Self {
        Self {
            min: value,
            max: value,
        }
    }

    /// Whether the range holds a single value.
    pub fn is_fixed(&self) -> bool {
        self.min == self.max
    }

    /// Whether `value` lies in the range.
    pub fn contains(&self, value: i64) -> bool {
        self.min <= value && value <= self.max
    }
}

/// An activity with start, end and size, `end = start + size`.
///
/// Optional intervals may be absent from a solution; their presence is
/// decided by the solver under `Alternative` and `SamePresence`
/// constraints.
///
/// # Examples
///
/// ```
/// use u_formulate::cp::IntervalVar;
///
/// let op = IntervalVar::new("op_0_0", 0, 100, 50, 150);
/// assert!(op.size.is_fixed());
/// assert_eq!(op.end.min, 50);
///
/// let child = IntervalVar::new("op_0_0_m1", 0, 100, 50, 150).as_optional();
/// assert!(child.is_optional);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalVar {
    /// Unique name.
    pub name: String,
    /// Start time range.
    pub start: Bounds,
    /// End time range.
    pub end: Bounds,
    /// Size (processing time) range.
    pub size: Bounds,
    /// Whether the interval may be absent.
    pub is_optional: bool,
}

impl IntervalVar {
    /// Creates a present, fixed-size interval.
    pub fn new(
        name: impl Into<String>,
        start_min: i64,
        start_max: i64,
        size: i64,
        end_max: i64,
    ) -> Self {
        Self {
            name: name.into(),
            start: Bounds::new(start_min, start_max),
            end: Bounds::new(start_min + size, end_max),
            size: Bounds::fixed(size),
            is_optional: false,
        }
    }

    /// A fixed-size interval anywhere inside `[0, horizon]`.
    pub fn within(name: impl Into<String>, size: i64, horizon: i64) -> Self {
        Self::new(name, 0, (horizon - size).max(0), size, horizon.max(size))
    }

    /// Makes this interval optional.
    pub fn as_optional(mut self) -> Self {
        self.is_optional = true;
        self
    }

    /// Replaces the fixed size by a range, as for the master interval
    /// of an alternative whose children differ in size.
    pub fn with_size_range(mut self, min: i64, max: i64) -> Self {
        self.size = Bounds::new(min, max);
        self.end.min = self.start.min + min;
        self.start.max = (self.end.max - min).max(self.start.min);
        self
    }
}
