//! Solver-agnostic linear model.
//!
//! Ordered variables with kinds and bounds, ordered sparse rows, and a
//! minimization objective. Rows reference variables by [`VarId`], the
//! position in the variable list, and names are kept unique so a
//! solver's name → value answer maps back unambiguously.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// Index of a variable in a [`LinearModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub usize);

impl VarId {
    /// Position in the model's variable list.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Variable domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    /// 0/1 integer.
    Binary,
    /// Real-valued.
    Continuous,
}

/// A decision variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Unique name.
    pub name: String,
    /// Domain.
    pub kind: VarKind,
    /// Lower bound.
    pub lower: f64,
    /// Upper bound, `None` for unbounded.
    pub upper: Option<f64>,
}

impl Variable {
    /// A 0/1 variable.
    pub fn binary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: VarKind::Binary,
            lower: 0.0,
            upper: Some(1.0),
        }
    }

    /// A non-negative, unbounded continuous variable.
    pub fn continuous(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: VarKind::Continuous,
            lower: 0.0,
            upper: None,
        }
    }

    /// Whether this is a 0/1 variable.
    pub fn is_binary(&self) -> bool {
        self.kind == VarKind::Binary
    }
}

/// Row relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    /// `lhs ≤ rhs`
    Le,
    /// `lhs = rhs`
    Eq,
    /// `lhs ≥ rhs`
    Ge,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Le => "<=",
            Self::Eq => "=",
            Self::Ge => ">=",
        })
    }
}

/// A sparse linear row: `Σ coef·var  sense  rhs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearConstraint {
    /// Row name, unique within its family.
    pub name: String,
    /// `(variable, coefficient)` terms.
    pub terms: Vec<(VarId, f64)>,
    /// Relation.
    pub sense: Sense,
    /// Right-hand side constant.
    pub rhs: f64,
}

impl LinearConstraint {
    /// Creates a row.
    pub fn new(name: impl Into<String>, terms: Vec<(VarId, f64)>, sense: Sense, rhs: f64) -> Self {
        Self {
            name: name.into(),
            terms,
            sense,
            rhs,
        }
    }

    /// Left-hand side evaluated at `values` (indexed by [`VarId`]).
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(v, c)| c * values.get(v.index()).copied().unwrap_or(0.0))
            .sum()
    }

    /// Signed distance from violation; negative means violated.
    ///
    /// For `≥` rows this is `lhs − rhs`, for `≤` rows `rhs − lhs`, and
    /// for equalities `−|lhs − rhs|`.
    pub fn slack(&self, values: &[f64]) -> f64 {
        let lhs = self.activity(values);
        match self.sense {
            Sense::Ge => lhs - self.rhs,
            Sense::Le => self.rhs - lhs,
            Sense::Eq => -(lhs - self.rhs).abs(),
        }
    }

    /// Coefficient of `var` in this row (0 if absent).
    pub fn coefficient(&self, var: VarId) -> f64 {
        self.terms
            .iter()
            .filter(|(v, _)| *v == var)
            .map(|(_, c)| c)
            .sum()
    }
}

/// A value assignment that breaks the model, found by [`LinearModel::check`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelViolation {
    /// Row or variable name.
    pub name: String,
    /// How far the value is from satisfying it (negative).
    pub slack: f64,
}

/// A minimization MILP.
///
/// # Examples
///
/// ```
/// use u_formulate::mip::{LinearConstraint, LinearModel, Sense, Variable};
///
/// let mut model = LinearModel::new("tiny");
/// let x = model.add_variable(Variable::binary("x"));
/// let c = model.add_variable(Variable::continuous("c"));
/// model.add_constraint(LinearConstraint::new("r", vec![(c, 1.0), (x, -5.0)], Sense::Ge, 0.0));
/// model.set_objective(vec![(c, 1.0)]);
///
/// assert!(model.validate().is_ok());
/// assert!(model.check(&[1.0, 5.0], 1e-9).is_empty());
/// assert_eq!(model.check(&[1.0, 4.0], 1e-9).len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "LinearModelData")]
pub struct LinearModel {
    /// Model name.
    pub name: String,
    variables: Vec<Variable>,
    constraints: Vec<LinearConstraint>,
    objective: Vec<(VarId, f64)>,
    #[serde(skip)]
    index: HashMap<String, VarId>,
}

/// Serialized fields of [`LinearModel`]; the name index is rebuilt.
#[derive(Deserialize)]
struct LinearModelData {
    name: String,
    variables: Vec<Variable>,
    constraints: Vec<LinearConstraint>,
    objective: Vec<(VarId, f64)>,
}

impl From<LinearModelData> for LinearModel {
    fn from(data: LinearModelData) -> Self {
        let mut model = LinearModel::new(data.name);
        for var in data.variables {
            model.add_variable(var);
        }
        model.constraints = data.constraints;
        model.objective = data.objective;
        model
    }
}

impl LinearModel {
    /// Creates an empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends a variable and returns its id.
    ///
    /// A duplicate name keeps the first id in the name index and is
    /// reported by [`validate`](Self::validate).
    pub fn add_variable(&mut self, var: Variable) -> VarId {
        let id = VarId(self.variables.len());
        self.index.entry(var.name.clone()).or_insert(id);
        self.variables.push(var);
        id
    }

    /// Appends a row.
    pub fn add_constraint(&mut self, constraint: LinearConstraint) {
        self.constraints.push(constraint);
    }

    /// Appends several rows.
    pub fn add_constraints(&mut self, constraints: impl IntoIterator<Item = LinearConstraint>) {
        self.constraints.extend(constraints);
    }

    /// Sets the minimization objective.
    pub fn set_objective(&mut self, terms: Vec<(VarId, f64)>) {
        self.objective = terms;
    }

    /// Variables in id order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Variable by id.
    pub fn variable(&self, id: VarId) -> Option<&Variable> {
        self.variables.get(id.index())
    }

    /// Id of the variable named `name`.
    pub fn var_id(&self, name: &str) -> Option<VarId> {
        self.index.get(name).copied()
    }

    /// Rows in insertion order.
    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    /// Rows whose name starts with `prefix`.
    pub fn constraints_with_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = &'a LinearConstraint> + 'a {
        self.constraints
            .iter()
            .filter(move |c| c.name.starts_with(prefix))
    }

    /// Objective terms.
    pub fn objective(&self) -> &[(VarId, f64)] {
        &self.objective
    }

    /// Number of variables.
    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    /// Number of binary variables.
    pub fn binary_count(&self) -> usize {
        self.variables.iter().filter(|v| v.is_binary()).count()
    }

    /// Number of rows.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Objective value at `values`.
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective
            .iter()
            .map(|&(v, c)| c * values.get(v.index()).copied().unwrap_or(0.0))
            .sum()
    }

    /// Re-keys a name → value answer into a dense vector by id.
    ///
    /// Missing names read as 0.
    pub fn dense_values(&self, values: &HashMap<String, f64>) -> Vec<f64> {
        self.variables
            .iter()
            .map(|v| values.get(&v.name).copied().unwrap_or(0.0))
            .collect()
    }

    /// Checks internal consistency.
    ///
    /// Names must be unique, every term must reference an existing
    /// variable, and all coefficients and constants must be finite.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        let mut seen = HashSet::with_capacity(self.variables.len());
        for var in &self.variables {
            if !seen.insert(var.name.as_str()) {
                return Err(ScheduleError::Formulation(format!(
                    "duplicate variable name: {}",
                    var.name
                )));
            }
            if let Some(upper) = var.upper {
                if upper < var.lower {
                    return Err(ScheduleError::Formulation(format!(
                        "empty domain for variable {}",
                        var.name
                    )));
                }
            }
        }

        let terms = self
            .constraints
            .iter()
            .flat_map(|c| c.terms.iter().map(move |t| (c.name.as_str(), t)))
            .chain(self.objective.iter().map(|t| ("objective", t)));
        for (row, &(var, coef)) in terms {
            if var.index() >= self.variables.len() {
                return Err(ScheduleError::Formulation(format!(
                    "row {row} references undefined variable #{}",
                    var.index()
                )));
            }
            if !coef.is_finite() {
                return Err(ScheduleError::Formulation(format!(
                    "row {row} has a non-finite coefficient"
                )));
            }
        }

        if let Some(row) = self.constraints.iter().find(|c| !c.rhs.is_finite()) {
            return Err(ScheduleError::Formulation(format!(
                "row {} has a non-finite right-hand side",
                row.name
            )));
        }
        Ok(())
    }

    /// Lists every row, bound and integrality requirement that `values`
    /// breaks by more than `tolerance`.
    pub fn check(&self, values: &[f64], tolerance: f64) -> Vec<ModelViolation> {
        let mut violations = Vec::new();

        for (i, var) in self.variables.iter().enumerate() {
            let value = values.get(i).copied().unwrap_or(0.0);
            let below = var.lower - value;
            let above = var.upper.map_or(0.0, |u| value - u);
            let fractional = if var.is_binary() {
                (value - value.round()).abs()
            } else {
                0.0
            };
            let worst = below.max(above).max(fractional);
            if worst > tolerance {
                violations.push(ModelViolation {
                    name: var.name.clone(),
                    slack: -worst,
                });
            }
        }

        for row in &self.constraints {
            let slack = row.slack(values);
            if slack < -tolerance {
                violations.push(ModelViolation {
                    name: row.name.clone(),
                    slack,
                });
            }
        }

        violations
    }
}

impl fmt::Display for LinearModel {
    /// Writes the model in a readable LP-like text form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = |id: VarId| {
            self.variables
                .get(id.index())
                .map(|v| v.name.as_str())
                .unwrap_or("?")
        };
        let write_terms = |f: &mut fmt::Formatter<'_>, terms: &[(VarId, f64)]| -> fmt::Result {
            for (i, &(v, c)) in terms.iter().enumerate() {
                let sign = if c < 0.0 { "-" } else if i > 0 { "+" } else { "" };
                write!(f, "{sign} {} {} ", c.abs(), name(v))?;
            }
            Ok(())
        };

        writeln!(f, "\\ {}", self.name)?;
        write!(f, "minimize ")?;
        write_terms(f, &self.objective)?;
        writeln!(f)?;
        writeln!(f, "subject to")?;
        for row in &self.constraints {
            write!(f, "  {}: ", row.name)?;
            write_terms(f, &row.terms)?;
            writeln!(f, "{} {}", row.sense, row.rhs)?;
        }
        writeln!(f, "binary")?;
        for var in self.variables.iter().filter(|v| v.is_binary()) {
            writeln!(f, "  {}", var.name)?;
        }
        writeln!(f, "end")
    }
}
