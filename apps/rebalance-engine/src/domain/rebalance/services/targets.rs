//! Heuristic target generation: proportional capping and redistribution.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::universe::{Tradeability, Universe};
use crate::domain::portfolio::Shelf;
use crate::domain::rebalance::value_objects::{
    DiagnosticsData, EngineOptions, GroupConstraintEvent, RunStatus, TargetInstrument,
    TargetMethod, TargetTag, TargetTrace, parse_group_key, round_target_weight,
};
use crate::domain::shared::{CurrencyCode, InstrumentId, Money};

/// Weights closer than this are treated as equal.
pub(crate) const EPSILON: Decimal = dec!(0.000000000001);

type Weights = BTreeMap<InstrumentId, Decimal>;
type Tags = BTreeMap<InstrumentId, BTreeSet<TargetTag>>;

/// A candidate for redistributed weight.
struct Recipient {
    instrument_id: InstrumentId,
    basis: Decimal,
    headroom: Decimal,
}

/// Spread `amount` over recipients in proportion to their basis, never
/// exceeding any recipient's headroom.
///
/// Returns what each recipient received and the amount left over.
fn redistribute(
    weights: &mut Weights,
    amount: Decimal,
    mut recipients: Vec<Recipient>,
) -> (Weights, Decimal) {
    let mut received = Weights::new();
    let mut remaining = amount;
    recipients.retain(|r| r.headroom > EPSILON);
    let rounds = recipients.len() + 1;
    for _ in 0..rounds {
        if remaining <= EPSILON || recipients.is_empty() {
            break;
        }
        let total_basis: Decimal = recipients.iter().map(|r| r.basis).sum();
        let equal_split = total_basis <= Decimal::ZERO;
        let count = Decimal::from(recipients.len());
        let mut given_total = Decimal::ZERO;
        for recipient in &mut recipients {
            let share = if equal_split {
                remaining / count
            } else {
                remaining * recipient.basis / total_basis
            };
            let given = share.min(recipient.headroom);
            recipient.headroom -= given;
            given_total += given;
            *weights
                .entry(recipient.instrument_id.clone())
                .or_insert(Decimal::ZERO) += given;
            *received
                .entry(recipient.instrument_id.clone())
                .or_insert(Decimal::ZERO) += given;
        }
        remaining -= given_total;
        recipients.retain(|r| r.headroom > EPSILON);
    }
    (received, remaining.max(Decimal::ZERO))
}

fn tag(tags: &mut Tags, instrument_id: &InstrumentId, tag: TargetTag) {
    tags.entry(instrument_id.clone()).or_default().insert(tag);
}

fn scale(weights: &mut Weights, ids: &[InstrumentId], factor: Decimal) {
    for id in ids {
        if let Some(w) = weights.get_mut(id) {
            *w *= factor;
        }
    }
}

fn group_members(
    universe: &Universe,
    shelf: &Shelf,
    attribute: &str,
    value: &str,
) -> Vec<InstrumentId> {
    universe
        .entries
        .iter()
        .filter(|e| shelf.attribute(&e.instrument_id, attribute) == Some(value))
        .map(|e| e.instrument_id.clone())
        .collect()
}

/// Per-instrument headroom under every group cap the instrument belongs to.
fn group_headroom(
    instrument_id: &InstrumentId,
    universe: &Universe,
    shelf: &Shelf,
    options: &EngineOptions,
    weights: &Weights,
) -> Decimal {
    let mut headroom = Decimal::ONE;
    for (key, constraint) in &options.group_constraints {
        let Some((attribute, value)) = parse_group_key(key) else {
            continue;
        };
        if shelf.attribute(instrument_id, attribute) != Some(value) {
            continue;
        }
        let group_weight = group_weight(universe, shelf, attribute, value, weights);
        headroom = headroom.min((constraint.max_weight - group_weight).max(Decimal::ZERO));
    }
    headroom
}

fn group_weight(
    universe: &Universe,
    shelf: &Shelf,
    attribute: &str,
    value: &str,
    weights: &Weights,
) -> Decimal {
    group_members(universe, shelf, attribute, value)
        .iter()
        .filter_map(|id| universe.get(id))
        .map(|e| match e.tradeability {
            Tradeability::Locked => e.current_weight,
            _ => weights.get(&e.instrument_id).copied().unwrap_or(Decimal::ZERO),
        })
        .sum()
}

/// Produce final target weights by capping and proportional redistribution.
///
/// Unallocatable weight degrades the status to `PendingReview`; this never
/// fails.
#[must_use]
pub fn heuristic_targets(
    universe: &Universe,
    shelf: &Shelf,
    options: &EngineOptions,
    base_currency: &CurrencyCode,
    diagnostics: &mut DiagnosticsData,
) -> TargetTrace {
    let mut status = RunStatus::Ready;
    let mut weights = Weights::new();
    let mut tags = Tags::new();
    let mut sell_only_excess = Decimal::ZERO;

    for entry in &universe.entries {
        match entry.tradeability {
            Tradeability::Locked => tag(&mut tags, &entry.instrument_id, TargetTag::LockedPosition),
            Tradeability::Tradeable => {
                weights.insert(entry.instrument_id.clone(), entry.model_weight);
            }
            Tradeability::SellOnly => {
                let allowed = entry.model_weight.min(entry.current_weight);
                sell_only_excess += entry.model_weight - allowed;
                weights.insert(entry.instrument_id.clone(), allowed);
            }
        }
        if entry.tradeability != Tradeability::Locked
            && entry.model_weight.is_zero()
            && entry.current_weight > Decimal::ZERO
        {
            tag(&mut tags, &entry.instrument_id, TargetTag::ImplicitSellToZero);
        }
    }

    let buy_list = universe.buy_list();
    let basis_of = |id: &InstrumentId| universe.get(id).map_or(Decimal::ZERO, |e| e.model_weight);

    // Sell-only excess goes to buy-eligible instruments.
    if sell_only_excess > EPSILON {
        let recipients = buy_list
            .iter()
            .map(|id| Recipient {
                instrument_id: id.clone(),
                basis: basis_of(id),
                headroom: Decimal::ONE,
            })
            .collect();
        let (received, leftover) = redistribute(&mut weights, sell_only_excess, recipients);
        for id in received.keys() {
            tag(&mut tags, id, TargetTag::RedistributedRecipient);
        }
        if leftover > EPSILON {
            diagnostics.warn("SELL_ONLY_EXCESS_UNALLOCATED");
            status = status.worst(RunStatus::PendingReview);
        }
    }

    // Fit the invested weight inside the cash band.
    let locked = universe.locked_weight();
    let band_upper = Decimal::ONE - options.cash_band_min_weight - locked;
    let band_lower = Decimal::ONE - options.cash_band_max_weight - locked;
    let all_ids: Vec<InstrumentId> = weights.keys().cloned().collect();
    let invested: Decimal = weights.values().copied().sum();
    if band_upper < Decimal::ZERO {
        scale(&mut weights, &all_ids, Decimal::ZERO);
        diagnostics.warn("LOCKED_WEIGHT_EXCEEDS_INVESTED_BAND");
        status = status.worst(RunStatus::PendingReview);
    } else if invested > band_upper + EPSILON {
        scale(&mut weights, &all_ids, band_upper / invested);
    } else if invested + EPSILON < band_lower {
        let buyable: Vec<InstrumentId> = all_ids
            .iter()
            .filter(|id| buy_list.contains(*id))
            .cloned()
            .collect();
        let buyable_sum: Decimal = buyable.iter().filter_map(|id| weights.get(id)).copied().sum();
        if buyable_sum > Decimal::ZERO {
            let fixed = invested - buyable_sum;
            scale(&mut weights, &buyable, (band_lower - fixed) / buyable_sum);
        } else {
            diagnostics.warn("INVESTED_BAND_UNREACHABLE");
            status = status.worst(RunStatus::PendingReview);
        }
    }

    // Per-position cap.
    if let Some(cap) = options.single_position_max_weight {
        let mut released = Decimal::ZERO;
        for (id, weight) in &mut weights {
            if *weight > cap + EPSILON {
                released += *weight - cap;
                *weight = cap;
                tag(&mut tags, id, TargetTag::CappedByMaxWeight);
            }
        }
        if released > EPSILON {
            let recipients = buy_list
                .iter()
                .filter(|id| {
                    !tags
                        .get(*id)
                        .is_some_and(|t| t.contains(&TargetTag::CappedByMaxWeight))
                })
                .map(|id| Recipient {
                    instrument_id: id.clone(),
                    basis: basis_of(id),
                    headroom: cap - weights.get(id).copied().unwrap_or(Decimal::ZERO),
                })
                .collect();
            let (received, leftover) = redistribute(&mut weights, released, recipients);
            for id in received.keys() {
                tag(&mut tags, id, TargetTag::RedistributedRecipient);
            }
            if leftover > EPSILON {
                diagnostics.warn("POSITION_CAP_UNALLOCATED_WEIGHT");
                status = status.worst(RunStatus::PendingReview);
            }
        }
    }

    // Group caps. Later redistribution can push an earlier group back over its
    // cap, so groups are revisited a bounded number of times.
    let passes = options.group_constraints.len() + 1;
    for pass in 0..passes {
        let mut breached = false;
        for (key, constraint) in &options.group_constraints {
            let Some((attribute, value)) = parse_group_key(key) else {
                continue;
            };
            if !shelf.knows_attribute(attribute) {
                if pass == 0 {
                    diagnostics.warn(format!("UNKNOWN_CONSTRAINT_ATTRIBUTE:{attribute}"));
                }
                continue;
            }
            let weight_before = group_weight(universe, shelf, attribute, value, &weights);
            if weight_before <= constraint.max_weight + EPSILON {
                continue;
            }
            breached = true;
            let members: Vec<InstrumentId> = group_members(universe, shelf, attribute, value)
                .into_iter()
                .filter(|id| weights.contains_key(id))
                .collect();
            let member_sum: Decimal =
                members.iter().filter_map(|id| weights.get(id)).copied().sum();
            if member_sum <= EPSILON {
                diagnostics.warn(format!("LOCKED_GROUP_WEIGHT_EXCEEDS_CAP:{key}"));
                status = status.worst(RunStatus::PendingReview);
                continue;
            }
            let release = (weight_before - constraint.max_weight).min(member_sum);
            scale(&mut weights, &members, (member_sum - release) / member_sum);

            let recipients = buy_list
                .iter()
                .filter(|id| !members.contains(*id))
                .map(|id| {
                    let current = weights.get(id).copied().unwrap_or(Decimal::ZERO);
                    let cap_room = options
                        .single_position_max_weight
                        .map_or(Decimal::ONE, |cap| (cap - current).max(Decimal::ZERO));
                    Recipient {
                        instrument_id: id.clone(),
                        basis: basis_of(id),
                        headroom: cap_room
                            .min(group_headroom(id, universe, shelf, options, &weights)),
                    }
                })
                .collect();
            let (received, leftover) = redistribute(&mut weights, release, recipients);
            for id in received.keys() {
                tag(&mut tags, id, TargetTag::RedistributedRecipient);
            }
            diagnostics.group_constraint_events.push(GroupConstraintEvent {
                group_key: key.clone(),
                max_weight: constraint.max_weight,
                weight_before,
                released_weight: release,
                recipients: received,
                status: "CAPPED".to_string(),
            });
            if leftover > EPSILON {
                diagnostics.warn(format!("GROUP_CAP_UNALLOCATED_WEIGHT:{key}"));
                status = status.worst(RunStatus::PendingReview);
            }
        }
        if !breached {
            break;
        }
        if pass + 1 == passes {
            diagnostics.warn("GROUP_CAPS_NOT_SETTLED");
            status = status.worst(RunStatus::PendingReview);
        }
    }

    // Minimum cash buffer.
    if options.min_cash_buffer_pct > Decimal::ZERO {
        let max_invested = (Decimal::ONE - locked - options.min_cash_buffer_pct).max(Decimal::ZERO);
        let invested: Decimal = weights.values().copied().sum();
        if invested > max_invested + EPSILON {
            scale(&mut weights, &all_ids, max_invested / invested);
        }
    }

    assemble_trace(
        universe,
        &weights,
        tags,
        TargetMethod::Heuristic,
        status,
        base_currency,
    )
}

/// Build the uniform trace from final weights of tradeable instruments.
/// Locked instruments keep their current weight.
pub(crate) fn assemble_trace(
    universe: &Universe,
    weights: &Weights,
    mut tags: Tags,
    method: TargetMethod,
    status: RunStatus,
    base_currency: &CurrencyCode,
) -> TargetTrace {
    let instruments = universe
        .entries
        .iter()
        .map(|entry| {
            let final_weight = match entry.tradeability {
                Tradeability::Locked => entry.current_weight,
                _ => weights
                    .get(&entry.instrument_id)
                    .copied()
                    .unwrap_or(Decimal::ZERO)
                    .max(Decimal::ZERO),
            };
            let final_weight = round_target_weight(final_weight);
            TargetInstrument {
                final_value: Money::quantized(
                    final_weight * universe.total_value,
                    base_currency.clone(),
                ),
                model_weight: entry.model_weight,
                final_weight,
                tags: tags.remove(&entry.instrument_id).unwrap_or_default(),
                instrument_id: entry.instrument_id.clone(),
            }
        })
        .collect();
    TargetTrace {
        method,
        status,
        instruments,
    }
}
