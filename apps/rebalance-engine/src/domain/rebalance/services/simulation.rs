//! After-state simulation on an owned copy of the portfolio.

use crate::domain::portfolio::PortfolioSnapshot;
use crate::domain::rebalance::value_objects::{OrderIntent, TradeSide};

/// Apply one intent to a working portfolio.
pub fn apply_intent(working: &mut PortfolioSnapshot, intent: &OrderIntent) {
    match intent {
        OrderIntent::CashFlow(flow) => {
            working.adjust_cash(&flow.amount.currency, flow.amount.amount);
        }
        OrderIntent::SecurityTrade(trade) => {
            let (units, cash) = match trade.side {
                TradeSide::Buy => (trade.quantity, -trade.notional.amount),
                TradeSide::Sell => (-trade.quantity, trade.notional.amount),
            };
            working.adjust_position(&trade.instrument_id, units);
            working.adjust_cash(&trade.notional.currency, cash);
        }
        OrderIntent::FxSpot(fx) => {
            working.adjust_cash(&fx.buy_currency, fx.buy_amount);
            working.adjust_cash(&fx.sell_currency, -fx.sell_amount_estimated);
        }
    }
}

/// Apply intents in order to a copy of `portfolio`.
///
/// The caller's snapshot is never touched.
#[must_use]
pub fn simulate(portfolio: &PortfolioSnapshot, intents: &[OrderIntent]) -> PortfolioSnapshot {
    let mut working = portfolio.clone();
    for intent in intents {
        apply_intent(&mut working, intent);
    }
    working
}
