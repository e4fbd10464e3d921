//! Diagnostics accumulated during one run.
//!
//! Stages only append; nothing earlier in the pipeline reads them back.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TradeSide;
use crate::domain::shared::{CurrencyCode, InstrumentId, IntentId, Money};

/// Missing reference data by category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQuality {
    /// Instruments without a price.
    pub price_missing: Vec<InstrumentId>,
    /// FX pairs without a rate.
    pub fx_missing: Vec<String>,
    /// Instruments without a shelf entry.
    pub shelf_missing: Vec<InstrumentId>,
}

/// A trade dropped for being below the minimum notional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressedIntent {
    /// Instrument.
    pub instrument_id: InstrumentId,
    /// Side the trade would have had.
    pub side: TradeSide,
    /// Units the trade would have had.
    pub quantity: Decimal,
    /// Base-currency notional.
    pub notional_base: Money,
    /// Threshold in force.
    pub threshold: Money,
    /// Reason code.
    pub reason: String,
}

/// An intent removed before execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedIntent {
    /// Identifier the intent had or would have had.
    pub intent_id: Option<IntentId>,
    /// Instrument, when the intent is a trade.
    pub instrument_id: Option<InstrumentId>,
    /// Reason code.
    pub reason: String,
}

/// Outcome of funding one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FundingStatus {
    /// Existing cash covers the buys.
    NoFxNeeded,
    /// An FX spot covers the shortfall.
    Funded,
    /// No rate available; buys skipped without blocking.
    Unfunded,
    /// No rate available; the run is blocked.
    MissingFx,
    /// Rates exist but no ledger holds enough cash.
    InsufficientCash,
}

/// Funding plan row for one target currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingPlanEntry {
    /// Currency the buys settle in.
    pub target_currency: CurrencyCode,
    /// Total buy notional.
    pub required: Decimal,
    /// Cash on hand before FX.
    pub available_before_fx: Decimal,
    /// Shortfall to cover.
    pub fx_needed: Decimal,
    /// Ledger selected to fund the shortfall.
    pub funding_currency: Option<CurrencyCode>,
    /// Pair used.
    pub fx_pair: Option<String>,
    /// Estimated amount sold in the funding currency.
    pub sell_amount_estimated: Option<Decimal>,
    /// FX intent created.
    pub fx_intent_id: Option<IntentId>,
    /// Outcome.
    pub status: FundingStatus,
}

/// Shortfall that no ledger could cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsufficientCashEntry {
    /// Currency that could not be funded.
    pub currency: CurrencyCode,
    /// Amount needed.
    pub required: Decimal,
    /// Closest funding ledger, if any candidate had a rate.
    pub funding_currency: Option<CurrencyCode>,
    /// Smallest deficit observed across candidates, in the funding currency.
    pub deficit: Decimal,
}

/// Record of a group cap binding during target generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConstraintEvent {
    /// Group key `<attribute_key>:<attribute_value>`.
    pub group_key: String,
    /// Cap in force.
    pub max_weight: Decimal,
    /// Group weight before capping.
    pub weight_before: Decimal,
    /// Weight released from group members.
    pub released_weight: Decimal,
    /// Weight received per recipient.
    pub recipients: BTreeMap<InstrumentId, Decimal>,
    /// Always `CAPPED`.
    pub status: String,
}

/// Instrument left out of trading, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcludedInstrument {
    /// Instrument.
    pub instrument_id: InstrumentId,
    /// Reason code.
    pub reason: String,
}

/// One solver backend attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverAttempt {
    /// Backend name.
    pub backend: String,
    /// Profile used.
    pub profile: String,
    /// Terminal status or error.
    pub outcome: String,
}

/// Solver chain diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverDiagnostics {
    /// Attempts in order.
    pub attempts: Vec<SolverAttempt>,
    /// Final classification, when the chain failed.
    pub failure: Option<String>,
    /// Infeasibility hints.
    pub hints: Vec<String>,
}

/// Diagnostics of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsData {
    /// Warning codes, in order of first occurrence.
    pub warnings: Vec<String>,
    /// Dust trades.
    pub suppressed_intents: Vec<SuppressedIntent>,
    /// Intents removed before execution.
    pub dropped_intents: Vec<DroppedIntent>,
    /// Missing reference data.
    pub data_quality: DataQuality,
    /// FX pairs missing during funding.
    pub missing_fx_pairs: Vec<String>,
    /// Funding plan.
    pub funding_plan: Vec<FundingPlanEntry>,
    /// Unfundable shortfalls.
    pub insufficient_cash: Vec<InsufficientCashEntry>,
    /// Currencies whose buys were skipped.
    pub unfunded_currencies: Vec<CurrencyCode>,
    /// Group caps that bound.
    pub group_constraint_events: Vec<GroupConstraintEvent>,
    /// Instruments excluded from trading.
    pub excluded_instruments: Vec<ExcludedInstrument>,
    /// Solver chain record, for solver runs.
    pub solver: Option<SolverDiagnostics>,
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}

impl DiagnosticsData {
    /// Record a warning code once.
    pub fn warn(&mut self, code: impl Into<String>) {
        push_unique(&mut self.warnings, code.into());
    }

    /// Record an instrument without a price.
    pub fn record_missing_price(&mut self, instrument_id: &InstrumentId) {
        push_unique(&mut self.data_quality.price_missing, instrument_id.clone());
    }

    /// Record a pair without a rate.
    pub fn record_missing_fx(&mut self, pair: impl Into<String>) {
        push_unique(&mut self.data_quality.fx_missing, pair.into());
    }

    /// Record a pair missing during funding, in both lists.
    pub fn record_missing_funding_pair(&mut self, pair: &str) {
        push_unique(&mut self.missing_fx_pairs, pair.to_string());
        self.record_missing_fx(pair);
    }

    /// Record an instrument without a shelf entry.
    pub fn record_missing_shelf(&mut self, instrument_id: &InstrumentId) {
        push_unique(&mut self.data_quality.shelf_missing, instrument_id.clone());
    }

    /// Record an excluded instrument once.
    pub fn exclude(&mut self, instrument_id: &InstrumentId, reason: &str) {
        push_unique(
            &mut self.excluded_instruments,
            ExcludedInstrument {
                instrument_id: instrument_id.clone(),
                reason: reason.to_string(),
            },
        );
    }

    /// Record an intent dropped before execution.
    pub fn drop_intent(
        &mut self,
        intent_id: Option<IntentId>,
        instrument_id: Option<InstrumentId>,
        reason: &str,
    ) {
        self.dropped_intents.push(DroppedIntent {
            intent_id,
            instrument_id,
            reason: reason.to_string(),
        });
    }

    /// Mark a currency as unfunded.
    pub fn mark_unfunded(&mut self, currency: &CurrencyCode) {
        push_unique(&mut self.unfunded_currencies, currency.clone());
    }

    /// Sort the data-quality lists for stable output.
    pub fn normalize(&mut self) {
        self.data_quality.price_missing.sort();
        self.data_quality.fx_missing.sort();
        self.data_quality.shelf_missing.sort();
        self.missing_fx_pairs.sort();
        self.unfunded_currencies.sort();
    }
}
