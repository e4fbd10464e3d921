//! Intents from caller-proposed cash flows and trades.

use rust_decimal::Decimal;

use crate::domain::portfolio::{MarketDataSnapshot, Shelf, ShelfStatus, pair_label};
use crate::domain::rebalance::value_objects::{
    CashFlowIntent, DiagnosticsData, EngineOptions, OrderIntent, ProposedCashFlow, ProposedTrade,
    SecurityTradeIntent, TradeSide,
};
use crate::domain::shared::{CurrencyCode, IntentId, Money};

/// Cash flow with a zero amount.
pub const PROPOSAL_ZERO_CASH_FLOW: &str = "PROPOSAL_ZERO_CASH_FLOW";
/// Instrument without a shelf entry.
pub const PROPOSAL_MISSING_SHELF: &str = "PROPOSAL_MISSING_SHELF";
/// Instrument without a price.
pub const PROPOSAL_MISSING_PRICE: &str = "PROPOSAL_MISSING_PRICE";
/// Notional in a currency that cannot be converted to the price currency.
pub const PROPOSAL_MISSING_FX_FOR_NOTIONAL: &str = "PROPOSAL_MISSING_FX_FOR_NOTIONAL";
/// Buy of an instrument the shelf does not allow buying.
pub const PROPOSAL_BUY_NOT_ALLOWED: &str = "PROPOSAL_BUY_NOT_ALLOWED";
/// Sell of a suspended instrument.
pub const PROPOSAL_SELL_SUSPENDED: &str = "PROPOSAL_SELL_SUSPENDED";
/// Trade that rounds to zero whole units.
pub const PROPOSAL_ZERO_QUANTITY: &str = "PROPOSAL_ZERO_QUANTITY";

/// Build cash-flow and trade intents for an advisory run.
///
/// Cash flows become `oi_cf_<n>` and trades `oi_<n>`, numbered in input order
/// over the accepted items. Rejected items land in `dropped_intents`.
#[must_use]
pub fn proposal_intents(
    base_currency: &CurrencyCode,
    market: &MarketDataSnapshot,
    shelf: &Shelf,
    options: &EngineOptions,
    cash_flows: &[ProposedCashFlow],
    trades: &[ProposedTrade],
    diagnostics: &mut DiagnosticsData,
) -> Vec<OrderIntent> {
    let mut intents = Vec::new();
    let mut flows = 0;
    for flow in cash_flows {
        if flow.amount.is_zero() {
            diagnostics.drop_intent(None, None, PROPOSAL_ZERO_CASH_FLOW);
            continue;
        }
        flows += 1;
        intents.push(OrderIntent::CashFlow(CashFlowIntent {
            intent_id: IntentId::new(format!("oi_cf_{flows}")),
            amount: Money::quantized(flow.amount, flow.currency.clone()),
            dependencies: Vec::new(),
        }));
    }

    let mut accepted = 0;
    for trade in trades {
        let instrument = Some(trade.instrument_id.clone());
        let Some(entry) = shelf.get(&trade.instrument_id) else {
            diagnostics.record_missing_shelf(&trade.instrument_id);
            diagnostics.drop_intent(None, instrument, PROPOSAL_MISSING_SHELF);
            continue;
        };
        if let Some(reason) = governance_block(trade.side, entry.status, options) {
            diagnostics.drop_intent(None, instrument, reason);
            continue;
        }
        let Some(price) = market
            .price_of(&trade.instrument_id)
            .filter(|p| p.price > Decimal::ZERO)
        else {
            diagnostics.record_missing_price(&trade.instrument_id);
            diagnostics.drop_intent(None, instrument, PROPOSAL_MISSING_PRICE);
            continue;
        };

        let quantity = match (&trade.quantity, &trade.notional) {
            (Some(quantity), _) => quantity.trunc(),
            (None, Some(notional)) => {
                let Some(amount) =
                    market.convert(notional.amount, &notional.currency, &price.currency)
                else {
                    diagnostics.record_missing_fx(pair_label(&notional.currency, &price.currency));
                    diagnostics.drop_intent(None, instrument, PROPOSAL_MISSING_FX_FOR_NOTIONAL);
                    continue;
                };
                (amount / price.price).trunc()
            }
            (None, None) => Decimal::ZERO,
        };
        if quantity <= Decimal::ZERO {
            diagnostics.drop_intent(None, instrument, PROPOSAL_ZERO_QUANTITY);
            continue;
        }

        let gross = quantity * price.price;
        accepted += 1;
        intents.push(OrderIntent::SecurityTrade(SecurityTradeIntent {
            intent_id: IntentId::new(format!("oi_{accepted}")),
            side: trade.side,
            instrument_id: trade.instrument_id.clone(),
            quantity,
            price: price.price,
            notional: Money::quantized(gross, price.currency.clone()),
            notional_base: market
                .convert(gross, &price.currency, base_currency)
                .map(|amount| Money::quantized(amount, base_currency.clone())),
            dependencies: Vec::new(),
        }));
    }
    intents
}

fn governance_block(
    side: TradeSide,
    status: ShelfStatus,
    options: &EngineOptions,
) -> Option<&'static str> {
    match (side, status) {
        (TradeSide::Buy, ShelfStatus::Banned | ShelfStatus::Suspended | ShelfStatus::SellOnly) => {
            Some(PROPOSAL_BUY_NOT_ALLOWED)
        }
        (TradeSide::Buy, ShelfStatus::Restricted) if !options.allow_restricted => {
            Some(PROPOSAL_BUY_NOT_ALLOWED)
        }
        (TradeSide::Sell, ShelfStatus::Suspended) => Some(PROPOSAL_SELL_SUSPENDED),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::portfolio::{FxRate, Price, ShelfEntry};
    use crate::domain::shared::InstrumentId;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    fn market() -> MarketDataSnapshot {
        MarketDataSnapshot {
            prices: vec![
                Price {
                    instrument_id: InstrumentId::new("US_EQ"),
                    price: dec!(100),
                    currency: CurrencyCode::new("USD"),
                },
                Price {
                    instrument_id: InstrumentId::new("SG_EQ"),
                    price: dec!(10),
                    currency: CurrencyCode::new("SGD"),
                },
            ],
            fx_rates: vec![FxRate {
                pair: "USD/SGD".to_string(),
                rate: dec!(1.35),
            }],
        }
    }

    fn shelf(status: ShelfStatus) -> Shelf {
        Shelf::new(vec![
            ShelfEntry::new("US_EQ", status),
            ShelfEntry::new("SG_EQ", ShelfStatus::Approved),
        ])
    }

    fn buy(instrument: &str, quantity: Decimal) -> ProposedTrade {
        ProposedTrade {
            side: TradeSide::Buy,
            instrument_id: InstrumentId::new(instrument),
            quantity: Some(quantity),
            notional: None,
        }
    }

    fn build(
        shelf: &Shelf,
        flows: &[ProposedCashFlow],
        trades: &[ProposedTrade],
    ) -> (Vec<OrderIntent>, DiagnosticsData) {
        let mut diagnostics = DiagnosticsData::default();
        let intents = proposal_intents(
            &CurrencyCode::new("SGD"),
            &market(),
            shelf,
            &EngineOptions::default(),
            flows,
            trades,
            &mut diagnostics,
        );
        (intents, diagnostics)
    }

    #[test]
    fn builds_cash_flow_and_trade_ids() {
        let flows = [
            ProposedCashFlow {
                currency: CurrencyCode::new("SGD"),
                amount: dec!(1000),
            },
            ProposedCashFlow {
                currency: CurrencyCode::new("SGD"),
                amount: Decimal::ZERO,
            },
        ];
        let (intents, diagnostics) = build(
            &shelf(ShelfStatus::Approved),
            &flows,
            &[buy("US_EQ", dec!(50)), buy("SG_EQ", dec!(3))],
        );
        let ids: Vec<&str> = intents.iter().map(|i| i.intent_id().as_str()).collect();
        assert_eq!(ids, vec!["oi_cf_1", "oi_1", "oi_2"]);
        let trade = intents[1].as_trade().unwrap();
        assert_eq!(trade.notional.to_string(), "5000.00 USD");
        assert_eq!(trade.notional_base.as_ref().unwrap().amount, dec!(6750.00));
        assert_eq!(diagnostics.dropped_intents[0].reason, PROPOSAL_ZERO_CASH_FLOW);
    }

    #[test]
    fn notional_sizing_floors_to_whole_units() {
        let trade = ProposedTrade {
            side: TradeSide::Buy,
            instrument_id: InstrumentId::new("US_EQ"),
            quantity: None,
            notional: Some(Money::new(dec!(1000), CurrencyCode::new("SGD"))),
        };
        let (intents, _) = build(&shelf(ShelfStatus::Approved), &[], &[trade]);
        // 1000 SGD = 740.74 USD, 7 whole units at 100
        assert_eq!(intents[0].as_trade().unwrap().quantity, dec!(7));
    }

    #[test_case(ShelfStatus::Banned ; "banned")]
    #[test_case(ShelfStatus::Suspended ; "suspended")]
    #[test_case(ShelfStatus::SellOnly ; "sell only")]
    #[test_case(ShelfStatus::Restricted ; "restricted without allowance")]
    fn buy_blocked_by_shelf(status: ShelfStatus) {
        let (intents, diagnostics) = build(&shelf(status), &[], &[buy("US_EQ", dec!(1))]);
        assert!(intents.is_empty());
        assert_eq!(diagnostics.dropped_intents[0].reason, PROPOSAL_BUY_NOT_ALLOWED);
    }

    #[test]
    fn sell_of_suspended_is_dropped() {
        let sell = ProposedTrade {
            side: TradeSide::Sell,
            ..buy("US_EQ", dec!(1))
        };
        let (intents, diagnostics) = build(&shelf(ShelfStatus::Suspended), &[], &[sell]);
        assert!(intents.is_empty());
        assert_eq!(diagnostics.dropped_intents[0].reason, PROPOSAL_SELL_SUSPENDED);
    }

    #[test]
    fn unknown_instrument_is_missing_shelf() {
        let (intents, diagnostics) =
            build(&shelf(ShelfStatus::Approved), &[], &[buy("XX", dec!(1))]);
        assert!(intents.is_empty());
        assert_eq!(diagnostics.data_quality.shelf_missing, vec![InstrumentId::new("XX")]);
    }

    #[test]
    fn missing_base_rate_keeps_trade_without_base_notional() {
        let mut market = market();
        market.fx_rates.clear();
        let mut diagnostics = DiagnosticsData::default();
        let intents = proposal_intents(
            &CurrencyCode::new("SGD"),
            &market,
            &shelf(ShelfStatus::Approved),
            &EngineOptions::default(),
            &[],
            &[buy("US_EQ", dec!(1))],
            &mut diagnostics,
        );
        assert!(intents[0].as_trade().unwrap().notional_base.is_none());
    }
}
