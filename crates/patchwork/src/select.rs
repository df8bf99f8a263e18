//! Solver boundary: the external MIQP solver picks a subset of candidates.
//!
//! The energy formulation lives outside this crate. We only define the shape of
//! the problem handed over, the solver trait, and how a (possibly relaxed)
//! solution vector turns into the surviving primitive pool.

use nalgebra::{DMatrix, DVector};

use crate::error::Error;
use crate::pool::PatchPool;

/// `min xᵀQx + cᵀx  s.t.  lower <= A x <= upper,  x ∈ {0,1}ⁿ`.
#[derive(Clone, Debug, PartialEq)]
pub struct QpProblem {
    pub linear: DVector<f64>,
    pub quadratic: DMatrix<f64>,
    pub constraints: DMatrix<f64>,
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
}

impl QpProblem {
    /// Problem over `n` binary variables with zero objective and no constraints.
    pub fn new(n: usize) -> Self {
        Self {
            linear: DVector::zeros(n),
            quadratic: DMatrix::zeros(n, n),
            constraints: DMatrix::zeros(0, n),
            lower: DVector::zeros(0),
            upper: DVector::zeros(0),
        }
    }

    #[inline]
    pub fn num_vars(&self) -> usize {
        self.linear.len()
    }

    pub fn validate(&self) -> Result<(), Error> {
        let n = self.num_vars();
        if self.quadratic.shape() != (n, n) {
            return Err(Error::invalid(format!(
                "quadratic objective is {:?}, expected ({n}, {n})",
                self.quadratic.shape()
            )));
        }
        let m = self.constraints.nrows();
        if self.constraints.ncols() != n || self.lower.len() != m || self.upper.len() != m {
            return Err(Error::invalid("constraint matrix and bounds disagree in shape"));
        }
        Ok(())
    }

    /// Objective value at `x`.
    pub fn objective(&self, x: &[f64]) -> f64 {
        let x = DVector::from_column_slice(x);
        (x.transpose() * &self.quadratic * &x)[(0, 0)] + self.linear.dot(&x)
    }
}

/// External mixed-integer solver, treated as a black box.
pub trait MiqpSolver {
    fn solve(&mut self, problem: &QpProblem) -> Result<Vec<f64>, Error>;
}

/// Keep the candidates whose solution entry rounds to a positive integer.
///
/// `x` is indexed in pool iteration order (GID ascending, then local index).
pub fn select_from_solution(candidates: &PatchPool, x: &[f64]) -> Result<PatchPool, Error> {
    if x.len() != candidates.len() {
        return Err(Error::SolutionLength {
            expected: candidates.len(),
            got: x.len(),
        });
    }
    let mut out = PatchPool::new();
    for ((key, prim), &xi) in candidates.iter().zip(x) {
        if xi.round() > 0.0 {
            out.add(key.gid, prim.clone());
        }
    }
    tracing::info!(candidates = candidates.len(), selected = out.len(), "selected primitives");
    Ok(out)
}

/// Run `solver` on `problem` and select the chosen candidates.
pub fn solve_and_select(
    solver: &mut dyn MiqpSolver,
    problem: &QpProblem,
    candidates: &PatchPool,
) -> Result<PatchPool, Error> {
    problem.validate()?;
    if problem.num_vars() != candidates.len() {
        return Err(Error::invalid(format!(
            "problem has {} variables for {} candidates",
            problem.num_vars(),
            candidates.len()
        )));
    }
    let x = solver.solve(problem).map_err(|e| match e {
        Error::Solver { .. } => e,
        other => Error::Solver {
            reason: other.to_string(),
        },
    })?;
    if let Some(i) = x.iter().position(|v| !v.is_finite()) {
        return Err(Error::Solver {
            reason: format!("entry {i} of the solution is {}", x[i]),
        });
    }
    if x.len() == problem.num_vars() {
        tracing::info!(energy = problem.objective(&x), "solver finished");
    }
    select_from_solution(candidates, &x)
}
