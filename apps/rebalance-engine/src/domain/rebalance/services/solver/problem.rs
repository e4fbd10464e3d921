//! Quadratic program over tradeable target weights.
//!
//! minimise Σ (wᵢ − mᵢ)² subject to
//! 0 ≤ wᵢ ≤ uᵢ, `sum_lower` ≤ Σ wᵢ ≤ `sum_upper`, and Σ_{i∈G} wᵢ ≤ cap_G.

use rust_decimal::Decimal;

use crate::domain::portfolio::Shelf;
use crate::domain::rebalance::services::targets::EPSILON;
use crate::domain::rebalance::services::universe::{Tradeability, Universe};
use crate::domain::rebalance::value_objects::{DiagnosticsData, EngineOptions, parse_group_key};
use crate::domain::shared::InstrumentId;

/// One group row: members and remaining capacity after locked weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRow {
    /// Group key.
    pub key: String,
    /// Indices of tradeable members.
    pub members: Vec<usize>,
    /// Configured cap.
    pub max_weight: Decimal,
    /// Weight already held in locked members.
    pub locked_weight: Decimal,
}

impl GroupRow {
    /// Capacity left for tradeable members.
    #[must_use]
    pub fn capacity(&self) -> Decimal {
        self.max_weight - self.locked_weight
    }
}

/// A box-, slab-, and group-constrained least-squares problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QpProblem {
    /// Tradeable instruments, one per variable.
    pub instruments: Vec<InstrumentId>,
    /// Model weights: the point being projected.
    pub model: Vec<Decimal>,
    /// Upper bound per variable.
    pub upper: Vec<Decimal>,
    /// Lower bound on the invested sum.
    pub sum_lower: Decimal,
    /// Upper bound on the invested sum.
    pub sum_upper: Decimal,
    /// Group rows.
    pub groups: Vec<GroupRow>,
}

impl QpProblem {
    /// Build the problem from a classified universe.
    ///
    /// Group keys whose attribute is unknown to the shelf are skipped with a
    /// warning.
    #[must_use]
    pub fn build(
        universe: &Universe,
        shelf: &Shelf,
        options: &EngineOptions,
        diagnostics: &mut DiagnosticsData,
    ) -> Self {
        let cap = options.single_position_max_weight.unwrap_or(Decimal::ONE);
        let mut instruments = Vec::new();
        let mut model = Vec::new();
        let mut upper = Vec::new();
        for entry in &universe.entries {
            let bound = match entry.tradeability {
                Tradeability::Locked => continue,
                Tradeability::Tradeable => cap,
                Tradeability::SellOnly => cap.min(entry.current_weight).max(Decimal::ZERO),
            };
            instruments.push(entry.instrument_id.clone());
            model.push(entry.model_weight);
            upper.push(bound);
        }

        let locked = universe.locked_weight();
        let cash_floor = options.cash_band_min_weight.max(options.min_cash_buffer_pct);
        let sum_upper = Decimal::ONE - cash_floor - locked;
        let sum_lower = (Decimal::ONE - options.cash_band_max_weight - locked).max(Decimal::ZERO);

        let mut groups = Vec::new();
        for (key, constraint) in &options.group_constraints {
            let Some((attribute, value)) = parse_group_key(key) else {
                continue;
            };
            if !shelf.knows_attribute(attribute) {
                diagnostics.warn(format!("UNKNOWN_CONSTRAINT_ATTRIBUTE:{attribute}"));
                continue;
            }
            let in_group = |id: &InstrumentId| shelf.attribute(id, attribute) == Some(value);
            let members = instruments
                .iter()
                .enumerate()
                .filter(|(_, id)| in_group(id))
                .map(|(i, _)| i)
                .collect();
            let locked_weight = universe
                .entries
                .iter()
                .filter(|e| e.tradeability == Tradeability::Locked && in_group(&e.instrument_id))
                .map(|e| e.current_weight)
                .sum();
            groups.push(GroupRow {
                key: key.clone(),
                members,
                max_weight: constraint.max_weight,
                locked_weight,
            });
        }

        Self {
            instruments,
            model,
            upper,
            sum_lower,
            sum_upper,
            groups,
        }
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.model.len()
    }

    /// Whether the problem has no variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.model.is_empty()
    }

    /// Largest constraint violation of a candidate point.
    #[must_use]
    pub fn max_violation(&self, w: &[Decimal]) -> Decimal {
        let mut worst = Decimal::ZERO;
        for (x, u) in w.iter().zip(&self.upper) {
            worst = worst.max(-*x).max(*x - *u);
        }
        let sum: Decimal = w.iter().copied().sum();
        worst = worst.max(self.sum_lower - sum).max(sum - self.sum_upper);
        for group in &self.groups {
            let group_sum: Decimal = group.members.iter().map(|&i| w[i]).sum();
            worst = worst.max(group_sum - group.capacity());
        }
        worst
    }

    /// Hints explaining why the problem cannot be satisfied. Empty when no
    /// structural contradiction is visible.
    #[must_use]
    pub fn infeasibility_hints(&self) -> Vec<String> {
        let mut hints = Vec::new();
        if self.sum_upper < Decimal::ZERO || self.sum_lower > self.sum_upper + EPSILON {
            hints.push("CASH_BAND_CONTRADICTION".to_string());
        }
        let capacity: Decimal = self.upper.iter().copied().sum();
        if capacity + EPSILON < self.sum_lower {
            hints.push("POSITION_CAP_CAPACITY_INSUFFICIENT".to_string());
        }
        for group in &self.groups {
            if group.capacity() < -EPSILON {
                hints.push(format!("LOCKED_GROUP_WEIGHT_EXCEEDS_CAP:{}", group.key));
            }
        }
        hints
    }

    /// Whether an obvious contradiction makes the problem infeasible.
    #[must_use]
    pub fn is_structurally_infeasible(&self) -> bool {
        !self.infeasibility_hints().is_empty()
    }
}

/// Euclidean projection onto `{0 ≤ xᵢ ≤ uᵢ, lo ≤ Σ xᵢ ≤ hi}`.
///
/// Finds the shift λ with Σ clip(yᵢ − λ) on the violated bound by bisection,
/// then solves for λ exactly on the resulting free set.
#[must_use]
pub fn project_box_slab(
    y: &[Decimal],
    upper: &[Decimal],
    lo: Decimal,
    hi: Decimal,
) -> Vec<Decimal> {
    let clip = |lambda: Decimal| -> Vec<Decimal> {
        y.iter()
            .zip(upper)
            .map(|(v, u)| (*v - lambda).max(Decimal::ZERO).min(*u))
            .collect()
    };
    let clipped = clip(Decimal::ZERO);
    let sum: Decimal = clipped.iter().copied().sum();
    if sum >= lo && sum <= hi {
        return clipped;
    }
    let target = if sum > hi { hi.max(Decimal::ZERO) } else { lo };

    let mut low = y
        .iter()
        .zip(upper)
        .map(|(v, u)| *v - *u)
        .min()
        .unwrap_or(Decimal::ZERO);
    let mut high = y.iter().copied().max().unwrap_or(Decimal::ZERO);
    let capacity: Decimal = upper.iter().copied().sum();
    if target >= capacity {
        return clip(low);
    }
    if target <= Decimal::ZERO {
        return clip(high);
    }
    for _ in 0..80 {
        let mid = (low + high) / Decimal::TWO;
        let s: Decimal = clip(mid).iter().copied().sum();
        if s > target {
            low = mid;
        } else {
            high = mid;
        }
    }
    let lambda = (low + high) / Decimal::TWO;
    let approx = clip(lambda);

    // Exact shift on the free set.
    let mut free_sum = Decimal::ZERO;
    let mut fixed_sum = Decimal::ZERO;
    let mut free = 0_u32;
    for ((v, u), x) in y.iter().zip(upper).zip(&approx) {
        if *x > Decimal::ZERO && *x < *u {
            free_sum += *v;
            free += 1;
        } else {
            fixed_sum += *x;
        }
    }
    if free == 0 {
        return approx;
    }
    let exact = (free_sum + fixed_sum - target) / Decimal::from(free);
    let refined = clip(exact);
    let refined_gap = (refined.iter().copied().sum::<Decimal>() - target).abs();
    let approx_gap = (approx.iter().copied().sum::<Decimal>() - target).abs();
    if refined_gap <= approx_gap {
        refined
    } else {
        approx
    }
}

/// Euclidean projection onto the half-space `Σ_{i∈members} xᵢ ≤ cap`.
pub fn project_group(x: &mut [Decimal], members: &[usize], cap: Decimal) {
    if members.is_empty() {
        return;
    }
    let sum: Decimal = members.iter().map(|&i| x[i]).sum();
    if sum <= cap {
        return;
    }
    let shift = (sum - cap) / Decimal::from(members.len());
    for &i in members {
        x[i] -= shift;
    }
}
