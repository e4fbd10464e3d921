//! Dykstra alternating projections.
//!
//! The solution of `min ‖w − m‖²` over an intersection of convex sets is the
//! projection of `m` onto that intersection. Dykstra's method converges to
//! it by cycling projections onto the box-slab set and each group
//! half-space, carrying a correction term per set.

use std::time::Instant;

use rust_decimal::Decimal;

use super::problem::{QpProblem, project_box_slab, project_group};
use super::{SolveStatus, SolverError, SolverProfile, SolverSolution, TargetSolver};

/// Primary backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct DykstraSolver;

fn max_abs_diff(a: &[Decimal], b: &[Decimal]) -> Decimal {
    a.iter()
        .zip(b)
        .map(|(x, y)| (*x - *y).abs())
        .max()
        .unwrap_or(Decimal::ZERO)
}

impl TargetSolver for DykstraSolver {
    fn name(&self) -> &'static str {
        "DYKSTRA"
    }

    fn solve(
        &self,
        problem: &QpProblem,
        profile: &SolverProfile,
    ) -> Result<SolverSolution, SolverError> {
        if problem.is_structurally_infeasible() {
            return Ok(SolverSolution {
                status: SolveStatus::Infeasible,
                weights: Vec::new(),
                iterations: 0,
            });
        }
        let n = problem.len();
        if n == 0 {
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

        let started = Instant::now();
        let sets = problem.groups.len() + 1;
        let mut x = problem.model.clone();
        let mut corrections = vec![vec![Decimal::ZERO; n]; sets];
        let mut converged = false;
        let mut iterations = 0;

        while iterations < profile.max_iterations {
            iterations += 1;
            let previous = x.clone();

            let y: Vec<Decimal> = x.iter().zip(&corrections[0]).map(|(a, c)| *a + *c).collect();
            let projected =
                project_box_slab(&y, &problem.upper, problem.sum_lower, problem.sum_upper);
            corrections[0] = y.iter().zip(&projected).map(|(a, b)| *a - *b).collect();
            x = projected;

            for (k, group) in problem.groups.iter().enumerate() {
                let y: Vec<Decimal> = x
                    .iter()
                    .zip(&corrections[k + 1])
                    .map(|(a, c)| *a + *c)
                    .collect();
                let mut projected = y.clone();
                project_group(&mut projected, &group.members, group.capacity());
                corrections[k + 1] = y.iter().zip(&projected).map(|(a, b)| *a - *b).collect();
                x = projected;
            }

            if max_abs_diff(&x, &previous) <= profile.tolerance
                && problem.max_violation(&x) <= profile.tolerance
            {
                converged = true;
                break;
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

        if profile.polish && problem.groups.is_empty() {
            x = project_box_slab(&x, &problem.upper, problem.sum_lower, problem.sum_upper);
        }

        let violation = problem.max_violation(&x);
        let status = if converged {
            SolveStatus::Optimal
        } else if violation <= profile.tolerance * Decimal::ONE_THOUSAND {
            SolveStatus::OptimalInaccurate
        } else {
            SolveStatus::InfeasibleInaccurate
        };
        let weights = if status.is_optimal() { x } else { Vec::new() };
        Ok(SolverSolution {
            status,
            weights,
            iterations,
        })
    }
}
