//! Trade intents from final targets.

use rust_decimal::Decimal;

use super::universe::{Tradeability, Universe};
use crate::domain::rebalance::value_objects::{
    DiagnosticsData, EngineOptions, OrderIntent, SecurityTradeIntent, SuppressedIntent,
    TargetTrace, TradeSide,
};
use crate::domain::shared::{CurrencyCode, IntentId, Money};

/// Reason recorded for dust trades.
pub const MIN_TRADE_NOTIONAL: &str = "BELOW_MIN_TRADE_NOTIONAL";

/// Turn target weights into whole-unit trades.
///
/// Quantities are floored toward zero; a zero target liquidates the full
/// holding. Trades below `min_trade_notional` (base currency) are suppressed.
/// Identifiers are `oi_<n>` in instrument order.
#[must_use]
pub fn generate_trades(
    universe: &Universe,
    trace: &TargetTrace,
    base_currency: &CurrencyCode,
    options: &EngineOptions,
    diagnostics: &mut DiagnosticsData,
) -> Vec<OrderIntent> {
    let mut intents = Vec::new();
    for target in &trace.instruments {
        let Some(entry) = universe.get(&target.instrument_id) else {
            continue;
        };
        if entry.tradeability == Tradeability::Locked {
            continue;
        }
        let (Some(price), Some(currency), Some(fx)) =
            (entry.price, entry.currency.as_ref(), entry.fx_to_base)
        else {
            continue;
        };
        if price <= Decimal::ZERO || fx <= Decimal::ZERO {
            continue;
        }

        let quantity = if target.final_weight.is_zero() {
            -entry.current_quantity.max(Decimal::ZERO)
        } else {
            let target_value = target.final_weight * universe.total_value;
            let delta_base = target_value - entry.current_value;
            (delta_base / fx / price).trunc()
        };
        let (side, quantity) = if quantity > Decimal::ZERO {
            if entry.tradeability == Tradeability::SellOnly {
                continue;
            }
            (TradeSide::Buy, quantity)
        } else {
            (TradeSide::Sell, (-quantity).min(entry.current_quantity))
        };
        if quantity <= Decimal::ZERO {
            continue;
        }

        let notional = Money::quantized(quantity * price, currency.clone());
        let notional_base = Money::quantized(quantity * price * fx, base_currency.clone());
        if let Some(min) = options.min_trade_notional {
            if notional_base.amount < min {
                diagnostics.suppressed_intents.push(SuppressedIntent {
                    instrument_id: entry.instrument_id.clone(),
                    side,
                    quantity,
                    notional_base,
                    threshold: Money::quantized(min, base_currency.clone()),
                    reason: MIN_TRADE_NOTIONAL.to_string(),
                });
                continue;
            }
        }

        intents.push(OrderIntent::SecurityTrade(SecurityTradeIntent {
            intent_id: IntentId::new(format!("oi_{}", intents.len() + 1)),
            side,
            instrument_id: entry.instrument_id.clone(),
            quantity,
            price,
            notional,
            notional_base: Some(notional_base),
            dependencies: Vec::new(),
        }));
    }
    intents
}
