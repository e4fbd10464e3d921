//! Backend stub for builds without a numerical solver.

use super::{QpProblem, SolverError, SolverProfile, SolverSolution, TargetSolver};

/// Always reports that no solver is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableSolver;

impl TargetSolver for UnavailableSolver {
    fn name(&self) -> &'static str {
        "UNAVAILABLE"
    }

    fn solve(&self, _: &QpProblem, _: &SolverProfile) -> Result<SolverSolution, SolverError> {
        Err(SolverError::Unavailable(self.name().to_string()))
    }
}
