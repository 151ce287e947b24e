//! Interval (CP) model definition.
//!
//! Intervals keep their insertion order, which consumers may use as a
//! placement priority. Constraints refer to intervals by name.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::variables::IntervalVar;
use crate::error::ScheduleError;
use crate::models::SetupMatrix;
use crate::solver::CpSolution;

/// A scheduling constraint over interval variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    /// No two present intervals of the set overlap.
    ///
    /// With `transitions`, an interval at position `b` that directly
    /// follows one at position `a` starts no earlier than
    /// `end(a) + transitions[a][b]`. Positions index `intervals`.
    NoOverlap {
        intervals: Vec<String>,
        transitions: Option<SetupMatrix>,
    },

    /// At any time, the demands of running intervals sum to at most
    /// `capacity`.
    Cumulative {
        intervals: Vec<String>,
        demands: Vec<i64>,
        capacity: i64,
    },

    /// `end(before) + min_delay ≤ start(after)`.
    Precedence {
        before: String,
        after: String,
        min_delay: i64,
    },

    /// `main` is present iff exactly one of `alternatives` is, and then
    /// shares its start and end.
    Alternative {
        main: String,
        alternatives: Vec<String>,
    },

    /// Both intervals are present or both are absent.
    SamePresence { interval1: String, interval2: String },

    /// Present intervals appear in the same relative order in both
    /// lists; `first[i]` corresponds to `second[i]`.
    SameSequence {
        first: Vec<String>,
        second: Vec<String>,
    },
}

/// Objective of an interval model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Objective {
    /// Minimize the latest end among the listed intervals.
    MinimizeMaxEnd { intervals: Vec<String> },
}

/// An interval model.
///
/// # Examples
///
/// ```
/// use u_formulate::cp::{CpModel, IntervalVar, Objective};
///
/// let mut model = CpModel::new("example", 100);
/// model.add_interval(IntervalVar::within("a", 50, 100));
/// model.add_interval(IntervalVar::within("b", 30, 100));
/// model.add_no_overlap(vec!["a".into(), "b".into()]);
/// model.set_objective(Objective::MinimizeMaxEnd { intervals: vec!["a".into(), "b".into()] });
/// assert!(model.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "CpModelData")]
pub struct CpModel {
    /// Model name.
    pub name: String,
    /// Planning horizon.
    pub horizon: i64,
    intervals: Vec<IntervalVar>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    constraints: Vec<Constraint>,
    objective: Option<Objective>,
}

/// Serialized fields of [`CpModel`]; the name index is rebuilt.
#[derive(Deserialize)]
struct CpModelData {
    name: String,
    horizon: i64,
    intervals: Vec<IntervalVar>,
    constraints: Vec<Constraint>,
    objective: Option<Objective>,
}

impl From<CpModelData> for CpModel {
    fn from(data: CpModelData) -> Self {
        let mut model = CpModel::new(data.name, data.horizon);
        for var in data.intervals {
            model.add_interval(var);
        }
        model.constraints = data.constraints;
        model.objective = data.objective;
        model
    }
}

impl CpModel {
    /// Creates an empty model.
    pub fn new(name: impl Into<String>, horizon: i64) -> Self {
        Self {
            name: name.into(),
            horizon,
            intervals: Vec::new(),
            index: HashMap::new(),
            constraints: Vec::new(),
            objective: None,
        }
    }

    /// Adds an interval variable.
    pub fn add_interval(&mut self, var: IntervalVar) {
        self.index
            .entry(var.name.clone())
            .or_insert(self.intervals.len());
        self.intervals.push(var);
    }

    /// Adds a constraint.
    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Adds a plain no-overlap constraint.
    pub fn add_no_overlap(&mut self, intervals: Vec<String>) {
        self.add_constraint(Constraint::NoOverlap {
            intervals,
            transitions: None,
        });
    }

    /// Adds a no-overlap constraint with transition times.
    pub fn add_no_overlap_with_transitions(
        &mut self,
        intervals: Vec<String>,
        transitions: SetupMatrix,
    ) {
        self.add_constraint(Constraint::NoOverlap {
            intervals,
            transitions: Some(transitions),
        });
    }

    /// Adds a cumulative constraint.
    pub fn add_cumulative(&mut self, intervals: Vec<String>, demands: Vec<i64>, capacity: i64) {
        self.add_constraint(Constraint::Cumulative {
            intervals,
            demands,
            capacity,
        });
    }

    /// Adds a precedence constraint.
    pub fn add_precedence(&mut self, before: String, after: String, min_delay: i64) {
        self.add_constraint(Constraint::Precedence {
            before,
            after,
            min_delay,
        });
    }

    /// Adds an alternative constraint.
    pub fn add_alternative(&mut self, main: String, alternatives: Vec<String>) {
        self.add_constraint(Constraint::Alternative { main, alternatives });
    }

    /// Links the presence of two optional intervals.
    pub fn add_same_presence(&mut self, interval1: String, interval2: String) {
        self.add_constraint(Constraint::SamePresence {
            interval1,
            interval2,
        });
    }

    /// Requires the same order in two interval lists.
    pub fn add_same_sequence(&mut self, first: Vec<String>, second: Vec<String>) {
        self.add_constraint(Constraint::SameSequence { first, second });
    }

    /// Sets the objective.
    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = Some(objective);
    }

    /// Intervals in insertion order.
    pub fn intervals(&self) -> &[IntervalVar] {
        &self.intervals
    }

    /// Interval by name.
    pub fn interval(&self, name: &str) -> Option<&IntervalVar> {
        self.index.get(name).and_then(|&i| self.intervals.get(i))
    }

    /// Constraints in insertion order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Objective, if set.
    pub fn objective(&self) -> Option<&Objective> {
        self.objective.as_ref()
    }

    /// Number of interval variables.
    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    /// Number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Number of no-overlap constraints.
    pub fn no_overlap_count(&self) -> usize {
        self.constraints
            .iter()
            .filter(|c| matches!(c, Constraint::NoOverlap { .. }))
            .count()
    }

    /// Checks that every referenced interval exists and that the
    /// constraint shapes are consistent.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        let mut names = HashMap::with_capacity(self.intervals.len());
        for var in &self.intervals {
            if names.insert(var.name.as_str(), var).is_some() {
                return Err(defect(format!("duplicate interval: {}", var.name)));
            }
        }
        let known = |name: &String| {
            names
                .get(name.as_str())
                .copied()
                .ok_or_else(|| defect(format!("undefined interval: {name}")))
        };

        for constraint in &self.constraints {
            match constraint {
                Constraint::NoOverlap {
                    intervals,
                    transitions,
                } => {
                    for name in intervals {
                        known(name)?;
                    }
                    if let Some(matrix) = transitions {
                        if matrix.size() != intervals.len()
                            || matrix.rows().iter().any(|r| r.len() != intervals.len())
                        {
                            return Err(defect(format!(
                                "transition matrix of size {} for {} intervals",
                                matrix.size(),
                                intervals.len()
                            )));
                        }
                    }
                }
                Constraint::Cumulative {
                    intervals,
                    demands,
                    capacity,
                } => {
                    if intervals.len() != demands.len() {
                        return Err(defect(
                            "cumulative: intervals and demands length mismatch".into(),
                        ));
                    }
                    if *capacity < 1 {
                        return Err(defect(format!("cumulative capacity {capacity} < 1")));
                    }
                    for name in intervals {
                        known(name)?;
                    }
                }
                Constraint::Precedence { before, after, .. } => {
                    known(before)?;
                    known(after)?;
                }
                Constraint::Alternative { main, alternatives } => {
                    known(main)?;
                    if alternatives.is_empty() {
                        return Err(defect(format!("alternative {main} has no candidates")));
                    }
                    for name in alternatives {
                        if !known(name)?.is_optional {
                            return Err(defect(format!(
                                "alternative candidate {name} is not optional"
                            )));
                        }
                    }
                }
                Constraint::SamePresence {
                    interval1,
                    interval2,
                } => {
                    known(interval1)?;
                    known(interval2)?;
                }
                Constraint::SameSequence { first, second } => {
                    if first.len() != second.len() {
                        return Err(defect("same-sequence lists differ in length".into()));
                    }
                    for name in first.iter().chain(second) {
                        known(name)?;
                    }
                }
            }
        }

        if let Some(Objective::MinimizeMaxEnd { intervals }) = &self.objective {
            for name in intervals {
                known(name)?;
            }
        }
        Ok(())
    }

    /// Objective value of a solution (latest end among objective intervals).
    pub fn objective_value(&self, solution: &CpSolution) -> Option<i64> {
        match self.objective.as_ref()? {
            Objective::MinimizeMaxEnd { intervals } => intervals
                .iter()
                .filter_map(|n| solution.intervals.get(n))
                .filter(|s| s.is_present)
                .map(|s| s.end)
                .max(),
        }
    }

    /// Lists every constraint `solution` violates.
    pub fn check(&self, solution: &CpSolution) -> Vec<String> {
        let mut violations = Vec::new();
        let placed = |name: &str| solution.intervals.get(name).filter(|s| s.is_present);

        for var in &self.intervals {
            match solution.intervals.get(&var.name) {
                None => violations.push(format!("{} has no value", var.name)),
                Some(s) if !s.is_present && !var.is_optional => {
                    violations.push(format!("{} is mandatory but absent", var.name))
                }
                Some(s) if s.is_present => {
                    if !var.start.contains(s.start)
                        || !var.end.contains(s.end)
                        || !var.size.contains(s.end - s.start)
                    {
                        violations.push(format!(
                            "{} placed at [{}, {}] outside its domain",
                            var.name, s.start, s.end
                        ));
                    }
                }
                Some(_) => {}
            }
        }

        for constraint in &self.constraints {
            match constraint {
                Constraint::NoOverlap {
                    intervals,
                    transitions,
                } => {
                    let mut present: Vec<(usize, i64, i64)> = intervals
                        .iter()
                        .enumerate()
                        .filter_map(|(pos, n)| placed(n.as_str()).map(|s| (pos, s.start, s.end)))
                        .collect();
                    present.sort_by_key(|&(pos, start, end)| (start, end, pos));
                    for w in present.windows(2) {
                        let (a, _, a_end) = w[0];
                        let (b, b_start, _) = w[1];
                        let gap = transitions.as_ref().map_or(0, |t| t.get(a, b));
                        if b_start < a_end + gap {
                            violations.push(format!(
                                "no-overlap: {} starts before {} is cleared",
                                intervals[b], intervals[a]
                            ));
                        }
                    }
                }
                Constraint::Cumulative {
                    intervals,
                    demands,
                    capacity,
                } => {
                    let active: Vec<(i64, i64, i64)> = intervals
                        .iter()
                        .zip(demands)
                        .filter_map(|(n, &d)| placed(n.as_str()).map(|s| (s.start, s.end, d)))
                        .collect();
                    for &(t, _, _) in &active {
                        let load: i64 = active
                            .iter()
                            .filter(|&&(s, e, _)| s <= t && t < e)
                            .map(|&(_, _, d)| d)
                            .sum();
                        if load > *capacity {
                            violations.push(format!(
                                "cumulative: load {load} exceeds {capacity} at {t}"
                            ));
                            break;
                        }
                    }
                }
                Constraint::Precedence {
                    before,
                    after,
                    min_delay,
                } => {
                    if let (Some(b), Some(a)) = (placed(before.as_str()), placed(after.as_str())) {
                        if a.start < b.end + min_delay {
                            violations.push(format!("precedence: {after} starts before {before} ends"));
                        }
                    }
                }
                Constraint::Alternative { main, alternatives } => {
                    let chosen: Vec<_> = alternatives.iter().filter_map(|n| placed(n.as_str())).collect();
                    match (placed(main.as_str()), chosen.as_slice()) {
                        (None, []) => {}
                        (Some(m), [c]) if m.start == c.start && m.end == c.end => {}
                        _ => violations.push(format!(
                            "alternative: {main} must match exactly one candidate"
                        )),
                    }
                }
                Constraint::SamePresence {
                    interval1,
                    interval2,
                } => {
                    if placed(interval1.as_str()).is_some() != placed(interval2.as_str()).is_some() {
                        violations.push(format!(
                            "same-presence: {interval1} and {interval2} disagree"
                        ));
                    }
                }
                Constraint::SameSequence { first, second } => {
                    let order = |list: &[String]| -> Vec<usize> {
                        let mut idx: Vec<(i64, usize)> = list
                            .iter()
                            .enumerate()
                            .filter_map(|(i, n)| placed(n.as_str()).map(|s| (s.start, i)))
                            .collect();
                        idx.sort_unstable();
                        idx.into_iter().map(|(_, i)| i).collect()
                    };
                    if order(first.as_slice()) != order(second.as_slice()) {
                        violations.push("same-sequence: orders differ".to_string());
                    }
                }
            }
        }

        violations
    }
}

fn defect(message: String) -> ScheduleError {
    ScheduleError::Formulation(message)
}
