//! Projected gradient ascent on the group-constraint dual.
//!
//! For multipliers μ ≥ 0 the inner minimiser is the box-slab projection of
//! `m − Σ μ_G a_G`; the dual gradient is the group violation. The step uses
//! the Frobenius bound on the constraint matrix.

use std::time::Instant;

use rust_decimal::Decimal;

use super::problem::{QpProblem, project_box_slab};
use super::{SolveStatus, SolverError, SolverProfile, SolverSolution, TargetSolver};

/// Secondary backend. Does not support polishing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DualAscentSolver;

impl DualAscentSolver {
    fn primal(problem: &QpProblem, multipliers: &[Decimal]) -> Vec<Decimal> {
        let mut shifted = problem.model.clone();
        for (group, mu) in problem.groups.iter().zip(multipliers) {
            for &i in &group.members {
                shifted[i] -= *mu;
            }
        }
        project_box_slab(&shifted, &problem.upper, problem.sum_lower, problem.sum_upper)
    }
}

impl TargetSolver for DualAscentSolver {
    fn name(&self) -> &'static str {
        "DUAL_ASCENT"
    }

    fn solve(
        &self,
        problem: &QpProblem,
        profile: &SolverProfile,
    ) -> Result<SolverSolution, SolverError> {
        if profile.polish {
            return Err(SolverError::IncompatibleProfile("polish".to_string()));
        }
        if problem.is_structurally_infeasible() {
            return Ok(SolverSolution {
                status: SolveStatus::Infeasible,
                weights: Vec::new(),
                iterations: 0,
            });
        }
        if problem.is_empty() {
            let status = if problem.sum_lower > profile.tolerance {
                SolveStatus::Infeasible
            } else {
                SolveStatus::Optimal
            };
            return Ok(SolverSolution {
                status,
                weights: Vec::new(),
                iterations: 0,
            });
        }

        let memberships: usize = problem.groups.iter().map(|g| g.members.len()).sum();
        if memberships == 0 {
            let weights = Self::primal(problem, &[]);
            let status = if problem.max_violation(&weights) <= profile.tolerance {
                SolveStatus::Optimal
            } else {
                SolveStatus::Infeasible
            };
            let weights = if status.is_optimal() { weights } else { Vec::new() };
            return Ok(SolverSolution {
                status,
                weights,
                iterations: 1,
            });
        }

        let started = Instant::now();
        let step = Decimal::ONE / Decimal::from(memberships);
        let mut multipliers = vec![Decimal::ZERO; problem.groups.len()];
        let mut x = Self::primal(problem, &multipliers);
        let mut iterations = 0;

        while iterations < profile.max_iterations {
            iterations += 1;
            let mut slack_ok = true;
            for (k, group) in problem.groups.iter().enumerate() {
                let gradient: Decimal =
                    group.members.iter().map(|&i| x[i]).sum::<Decimal>() - group.capacity();
                multipliers[k] = (multipliers[k] + step * gradient).max(Decimal::ZERO);
                if gradient > profile.tolerance
                    || (multipliers[k] > Decimal::ZERO && gradient.abs() > profile.tolerance)
                {
                    slack_ok = false;
                }
            }
            let next = Self::primal(problem, &multipliers);
            let change = next
                .iter()
                .zip(&x)
                .map(|(a, b)| (*a - *b).abs())
                .max()
                .unwrap_or(Decimal::ZERO);
            x = next;
            if slack_ok && change <= profile.tolerance {
                return Ok(SolverSolution {
                    status: SolveStatus::Optimal,
                    weights: x,
                    iterations,
                });
            }
            if profile
                .time_budget
                .is_some_and(|budget| started.elapsed() >= budget)
            {
                return Ok(SolverSolution {
                    status: SolveStatus::UserLimit,
                    weights: Vec::new(),
                    iterations,
                });
            }
        }

        let status = if problem.max_violation(&x) <= profile.tolerance * Decimal::ONE_THOUSAND {
            SolveStatus::OptimalInaccurate
        } else {
            SolveStatus::UserLimit
        };
        let weights = if status.is_optimal() { x } else { Vec::new() };
        Ok(SolverSolution {
            status,
            weights,
            iterations,
        })
    }
}
