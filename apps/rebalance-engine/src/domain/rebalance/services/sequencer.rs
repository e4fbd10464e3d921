//! Execution ordering and dependency edges.

use std::collections::BTreeSet;

use crate::domain::rebalance::value_objects::{
    DiagnosticsData, EngineOptions, OrderIntent, TradeSide,
};
use crate::domain::shared::{CurrencyCode, IntentId};

/// Reason recorded for buys dropped because their currency is unfunded.
pub const BUY_SKIPPED_UNFUNDED: &str = "BUY_SKIPPED_UNFUNDED";

fn sort_key(intent: &OrderIntent) -> (u8, String) {
    match intent {
        OrderIntent::CashFlow(_) => (0, String::new()),
        OrderIntent::SecurityTrade(t) if t.side == TradeSide::Sell => {
            (1, t.instrument_id.as_str().to_string())
        }
        OrderIntent::FxSpot(fx) => (2, fx.pair.clone()),
        OrderIntent::SecurityTrade(t) => (3, t.instrument_id.as_str().to_string()),
    }
}

/// Order intents for execution and attach dependencies.
///
/// Order is cash flows, sells by instrument, FX spots by pair, then buys by
/// instrument. Buys in an unfunded currency are dropped.
#[must_use]
pub fn sequence_intents(
    intents: Vec<OrderIntent>,
    unfunded: &BTreeSet<CurrencyCode>,
    options: &EngineOptions,
    diagnostics: &mut DiagnosticsData,
) -> Vec<OrderIntent> {
    let mut kept: Vec<OrderIntent> = Vec::with_capacity(intents.len());
    for intent in intents {
        let skipped = intent
            .as_trade()
            .filter(|t| t.side == TradeSide::Buy && unfunded.contains(&t.notional.currency))
            .map(|t| (t.intent_id.clone(), t.instrument_id.clone(), t.notional.currency.clone()));
        if let Some((intent_id, instrument_id, currency)) = skipped {
            diagnostics.drop_intent(Some(intent_id), Some(instrument_id), BUY_SKIPPED_UNFUNDED);
            diagnostics.warn(format!("{BUY_SKIPPED_UNFUNDED}:{currency}"));
            continue;
        }
        kept.push(intent);
    }
    kept.sort_by_cached_key(sort_key);

    let fx_by_currency: Vec<(CurrencyCode, IntentId)> = kept
        .iter()
        .filter_map(OrderIntent::as_fx)
        .map(|fx| (fx.buy_currency.clone(), fx.intent_id.clone()))
        .collect();
    let sells_by_currency: Vec<(CurrencyCode, IntentId)> = kept
        .iter()
        .filter_map(OrderIntent::as_trade)
        .filter(|t| t.side == TradeSide::Sell)
        .map(|t| (t.notional.currency.clone(), t.intent_id.clone()))
        .collect();

    for intent in &mut kept {
        let Some(currency) = intent
            .as_trade()
            .filter(|t| t.side == TradeSide::Buy)
            .map(|t| t.notional.currency.clone())
        else {
            continue;
        };
        for (_, id) in fx_by_currency.iter().filter(|(c, _)| *c == currency) {
            intent.add_dependency(id);
        }
        if options.link_buy_to_same_currency_sell_dependency {
            for (_, id) in sells_by_currency.iter().filter(|(c, _)| *c == currency) {
                intent.add_dependency(id);
            }
        }
    }
    kept
}
