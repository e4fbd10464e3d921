//! Solver-based target generation.
//!
//! Backends implement [`TargetSolver`] and are tried in order, each first
//! with the strict profile and, when the backend rejects it, with the
//! compatibility profile. Any failure of the whole chain becomes a BLOCKED
//! outcome with an empty trace; nothing propagates to the caller.

mod dual_ascent;
mod dykstra;
mod problem;
mod unavailable;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

pub use dual_ascent::DualAscentSolver;
pub use dykstra::DykstraSolver;
pub use problem::{GroupRow, QpProblem, project_box_slab, project_group};
pub use unavailable::UnavailableSolver;

use super::targets::assemble_trace;
use super::universe::{Tradeability, Universe};
use crate::domain::portfolio::Shelf;
use crate::domain::rebalance::value_objects::{
    DiagnosticsData, EngineOptions, RunStatus, SolverAttempt, SolverDiagnostics, TargetMethod,
    TargetTag, TargetTrace,
};
use crate::domain::shared::{CurrencyCode, InstrumentId};

/// Terminal status reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    /// Converged within tolerance.
    Optimal,
    /// Feasible but not converged to tolerance.
    OptimalInaccurate,
    /// Proven infeasible.
    Infeasible,
    /// Likely infeasible.
    InfeasibleInaccurate,
    /// Objective unbounded.
    Unbounded,
    /// Likely unbounded.
    UnboundedInaccurate,
    /// Iteration or time budget exhausted.
    UserLimit,
}

impl SolveStatus {
    /// Lower-case status name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Optimal => "optimal",
            Self::OptimalInaccurate => "optimal_inaccurate",
            Self::Infeasible => "infeasible",
            Self::InfeasibleInaccurate => "infeasible_inaccurate",
            Self::Unbounded => "unbounded",
            Self::UnboundedInaccurate => "unbounded_inaccurate",
            Self::UserLimit => "user_limit",
        }
    }

    /// Whether the status carries a usable solution.
    #[must_use]
    pub const fn is_optimal(&self) -> bool {
        matches!(self, Self::Optimal | Self::OptimalInaccurate)
    }
}

/// Backend failure other than a terminal status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    /// The backend does not accept a profile setting.
    IncompatibleProfile(String),
    /// The backend is not available in this build.
    Unavailable(String),
    /// The backend failed numerically.
    Numerical(String),
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncompatibleProfile(setting) => write!(f, "incompatible profile: {setting}"),
            Self::Unavailable(name) => write!(f, "solver unavailable: {name}"),
            Self::Numerical(msg) => write!(f, "numerical failure: {msg}"),
        }
    }
}

impl std::error::Error for SolverError {}

/// Settings for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverProfile {
    /// Profile name.
    pub name: &'static str,
    /// Convergence and feasibility tolerance.
    pub tolerance: Decimal,
    /// Iteration budget.
    pub max_iterations: u32,
    /// Wall-clock budget.
    pub time_budget: Option<Duration>,
    /// Run a final polishing projection.
    pub polish: bool,
}

/// Solution returned by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverSolution {
    /// Terminal status.
    pub status: SolveStatus,
    /// Weights, one per problem variable. Empty unless optimal.
    pub weights: Vec<Decimal>,
    /// Iterations used.
    pub iterations: u32,
}

/// A quadratic-program backend.
pub trait TargetSolver: Send + Sync {
    /// Backend name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Solve the problem with the given profile.
    ///
    /// # Errors
    ///
    /// Returns `SolverError` when the backend cannot attempt the problem.
    fn solve(&self, problem: &QpProblem, profile: &SolverProfile)
    -> Result<SolverSolution, SolverError>;
}

/// Backend selector used in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverBackend {
    /// Dykstra alternating projections.
    Dykstra,
    /// Projected dual gradient ascent.
    DualAscent,
    /// Stub that always reports unavailability.
    Unavailable,
}

impl SolverBackend {
    /// Instantiate the backend.
    #[must_use]
    pub fn instantiate(self) -> Box<dyn TargetSolver> {
        match self {
            Self::Dykstra => Box::new(DykstraSolver),
            Self::DualAscent => Box::new(DualAscentSolver),
            Self::Unavailable => Box::new(UnavailableSolver),
        }
    }
}

/// Solver chain settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverSettings {
    /// Backends in order.
    pub backends: Vec<SolverBackend>,
    /// Iteration budget per attempt.
    pub max_iterations: u32,
    /// Wall-clock budget per attempt.
    pub time_budget: Option<Duration>,
    /// Strict profile tolerance.
    pub strict_tolerance: Decimal,
    /// Compatibility profile tolerance.
    pub compat_tolerance: Decimal,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            backends: vec![SolverBackend::Dykstra, SolverBackend::DualAscent],
            max_iterations: 5000,
            time_budget: Some(Duration::from_millis(2000)),
            strict_tolerance: dec!(0.0000000001),
            compat_tolerance: dec!(0.0000001),
        }
    }
}

impl SolverSettings {
    /// Strict profile.
    #[must_use]
    pub fn strict_profile(&self) -> SolverProfile {
        SolverProfile {
            name: "strict",
            tolerance: self.strict_tolerance,
            max_iterations: self.max_iterations,
            time_budget: self.time_budget,
            polish: true,
        }
    }

    /// Reduced compatibility profile.
    #[must_use]
    pub fn compat_profile(&self) -> SolverProfile {
        SolverProfile {
            name: "compatibility",
            tolerance: self.compat_tolerance,
            max_iterations: self.max_iterations,
            time_budget: self.time_budget,
            polish: false,
        }
    }
}

/// Outcome of running the backend chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// A backend produced a usable solution.
    Solved(SolverSolution),
    /// Every backend finished with a non-optimal terminal status; holds the last.
    Failed(SolveStatus),
    /// No backend could attempt the problem.
    Unavailable,
}

/// Run the backends in order, recording every attempt.
pub fn run_chain(
    solvers: &[Box<dyn TargetSolver>],
    settings: &SolverSettings,
    problem: &QpProblem,
    record: &mut SolverDiagnostics,
) -> ChainOutcome {
    let strict = settings.strict_profile();
    let compat = settings.compat_profile();
    let mut last_status = None;
    for solver in solvers {
        let mut attempt = solver.solve(problem, &strict);
        let mut profile = &strict;
        if let Err(SolverError::IncompatibleProfile(setting)) = &attempt {
            record.attempts.push(SolverAttempt {
                backend: solver.name().to_string(),
                profile: strict.name.to_string(),
                outcome: format!("incompatible_profile:{setting}"),
            });
            attempt = solver.solve(problem, &compat);
            profile = &compat;
        }
        let outcome = match &attempt {
            Ok(solution) => solution.status.as_str().to_string(),
            Err(SolverError::IncompatibleProfile(s)) => format!("incompatible_profile:{s}"),
            Err(SolverError::Unavailable(_)) => "unavailable".to_string(),
            Err(SolverError::Numerical(_)) => "error".to_string(),
        };
        record.attempts.push(SolverAttempt {
            backend: solver.name().to_string(),
            profile: profile.name.to_string(),
            outcome,
        });
        match attempt {
            Ok(solution) if solution.status.is_optimal() => return ChainOutcome::Solved(solution),
            Ok(solution) => last_status = Some(solution.status),
            Err(_) => {}
        }
    }
    last_status.map_or(ChainOutcome::Unavailable, ChainOutcome::Failed)
}

/// Failure classification for a terminal status.
#[must_use]
pub fn classify_failure(status: SolveStatus) -> String {
    let upper = status.as_str().to_uppercase();
    match status {
        SolveStatus::Infeasible | SolveStatus::InfeasibleInaccurate => {
            format!("INFEASIBLE_{upper}")
        }
        SolveStatus::Unbounded | SolveStatus::UnboundedInaccurate => {
            format!("UNBOUNDED_{upper}")
        }
        _ => format!("SOLVER_NON_OPTIMAL_{upper}"),
    }
}

/// Produce final target weights with the solver chain.
///
/// Any chain failure yields a BLOCKED trace with no instruments.
#[must_use]
pub fn solver_targets(
    universe: &Universe,
    shelf: &Shelf,
    options: &EngineOptions,
    solvers: &[Box<dyn TargetSolver>],
    settings: &SolverSettings,
    base_currency: &CurrencyCode,
    diagnostics: &mut DiagnosticsData,
) -> TargetTrace {
    let problem = QpProblem::build(universe, shelf, options, diagnostics);
    let mut record = SolverDiagnostics::default();
    let outcome = run_chain(solvers, settings, &problem, &mut record);

    let trace = match outcome {
        ChainOutcome::Solved(solution) => {
            if solution.status == SolveStatus::OptimalInaccurate {
                diagnostics.warn("SOLVER_OPTIMAL_INACCURATE");
            }
            let weights: BTreeMap<InstrumentId, Decimal> = problem
                .instruments
                .iter()
                .cloned()
                .zip(solution.weights.iter().map(|w| (*w).max(Decimal::ZERO)))
                .collect();
            let tags = solution_tags(universe, &weights, options);
            assemble_trace(
                universe,
                &weights,
                tags,
                TargetMethod::Solver,
                RunStatus::Ready,
                base_currency,
            )
        }
        ChainOutcome::Failed(status) => {
            let failure = classify_failure(status);
            if failure.starts_with("INFEASIBLE_") {
                record.hints = problem.infeasibility_hints();
            }
            diagnostics.warn(failure.clone());
            record.failure = Some(failure);
            blocked_trace()
        }
        ChainOutcome::Unavailable => {
            diagnostics.warn("SOLVER_ERROR");
            record.failure = Some("SOLVER_ERROR".to_string());
            blocked_trace()
        }
    };
    diagnostics.solver = Some(record);
    trace
}

fn blocked_trace() -> TargetTrace {
    TargetTrace {
        method: TargetMethod::Solver,
        status: RunStatus::Blocked,
        instruments: Vec::new(),
    }
}

fn solution_tags(
    universe: &Universe,
    weights: &BTreeMap<InstrumentId, Decimal>,
    options: &EngineOptions,
) -> BTreeMap<InstrumentId, BTreeSet<TargetTag>> {
    let near = dec!(0.000001);
    let mut tags: BTreeMap<InstrumentId, BTreeSet<TargetTag>> = BTreeMap::new();
    for entry in &universe.entries {
        let set = tags.entry(entry.instrument_id.clone()).or_default();
        if entry.tradeability == Tradeability::Locked {
            set.insert(TargetTag::LockedPosition);
            continue;
        }
        let weight = weights.get(&entry.instrument_id).copied().unwrap_or(Decimal::ZERO);
        if entry.model_weight.is_zero() && entry.current_weight > Decimal::ZERO {
            set.insert(TargetTag::ImplicitSellToZero);
        }
        if let Some(cap) = options.single_position_max_weight {
            if entry.model_weight > cap && weight >= cap - near {
                set.insert(TargetTag::CappedByMaxWeight);
            }
        }
        if weight > entry.model_weight + near {
            set.insert(TargetTag::RedistributedRecipient);
        }
    }
    tags.retain(|_, set| !set.is_empty());
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedStatus(SolveStatus);

    impl TargetSolver for FixedStatus {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn solve(
            &self,
            problem: &QpProblem,
            _: &SolverProfile,
        ) -> Result<SolverSolution, SolverError> {
            Ok(SolverSolution {
                status: self.0,
                weights: problem.model.clone(),
                iterations: 1,
            })
        }
    }

    fn empty_problem() -> QpProblem {
        QpProblem {
            instruments: Vec::new(),
            model: Vec::new(),
            upper: Vec::new(),
            sum_lower: Decimal::ZERO,
            sum_upper: Decimal::ONE,
            groups: Vec::new(),
        }
    }

    #[test]
    fn classification_prefixes() {
        assert_eq!(classify_failure(SolveStatus::Infeasible), "INFEASIBLE_INFEASIBLE");
        assert_eq!(
            classify_failure(SolveStatus::InfeasibleInaccurate),
            "INFEASIBLE_INFEASIBLE_INACCURATE"
        );
        assert_eq!(classify_failure(SolveStatus::Unbounded), "UNBOUNDED_UNBOUNDED");
        assert_eq!(classify_failure(SolveStatus::UserLimit), "SOLVER_NON_OPTIMAL_USER_LIMIT");
    }

    #[test]
    fn chain_falls_through_to_next_backend() {
        let solvers: Vec<Box<dyn TargetSolver>> = vec![
            Box::new(FixedStatus(SolveStatus::UserLimit)),
            Box::new(FixedStatus(SolveStatus::Optimal)),
        ];
        let mut record = SolverDiagnostics::default();
        let outcome =
            run_chain(&solvers, &SolverSettings::default(), &empty_problem(), &mut record);
        assert!(matches!(outcome, ChainOutcome::Solved(_)));
        assert_eq!(record.attempts.len(), 2);
        assert_eq!(record.attempts[0].outcome, "user_limit");
    }

    #[test]
    fn chain_of_unavailable_backends_is_unavailable() {
        let solvers: Vec<Box<dyn TargetSolver>> = vec![Box::new(UnavailableSolver)];
        let mut record = SolverDiagnostics::default();
        let outcome =
            run_chain(&solvers, &SolverSettings::default(), &empty_problem(), &mut record);
        assert_eq!(outcome, ChainOutcome::Unavailable);
        assert_eq!(record.attempts[0].outcome, "unavailable");
    }

    #[test]
    fn incompatible_profile_retries_with_compatibility() {
        let solvers: Vec<Box<dyn TargetSolver>> = vec![Box::new(DualAscentSolver)];
        let mut record = SolverDiagnostics::default();
        let outcome =
            run_chain(&solvers, &SolverSettings::default(), &empty_problem(), &mut record);
        assert!(matches!(outcome, ChainOutcome::Solved(_)));
        assert_eq!(record.attempts[0].outcome, "incompatible_profile:polish");
        assert_eq!(record.attempts[1].profile, "compatibility");
    }

    #[test]
    fn empty_chain_is_unavailable() {
        let mut record = SolverDiagnostics::default();
        let outcome = run_chain(&[], &SolverSettings::default(), &empty_problem(), &mut record);
        assert_eq!(outcome, ChainOutcome::Unavailable);
    }
}
