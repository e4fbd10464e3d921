//! Order intents produced by a run.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{CurrencyCode, InstrumentId, IntentId, Money};

/// Side of a security trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeSide {
    /// Buy units.
    Buy,
    /// Sell units.
    Sell,
}

impl TradeSide {
    /// Wire name of the side.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

/// A cash movement into or out of the portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashFlowIntent {
    /// Intent identifier.
    pub intent_id: IntentId,
    /// Signed amount; negative is a withdrawal.
    pub amount: Money,
    /// Intents that must complete first.
    #[serde(default)]
    pub dependencies: Vec<IntentId>,
}

/// A buy or sell of a security.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityTradeIntent {
    /// Intent identifier.
    pub intent_id: IntentId,
    /// Side.
    pub side: TradeSide,
    /// Traded instrument.
    pub instrument_id: InstrumentId,
    /// Units, always positive.
    pub quantity: Decimal,
    /// Unit price used.
    pub price: Decimal,
    /// Notional in the instrument currency.
    pub notional: Money,
    /// Notional in base currency, when a rate is available.
    pub notional_base: Option<Money>,
    /// Intents that must complete first.
    #[serde(default)]
    pub dependencies: Vec<IntentId>,
}

/// An FX spot buying one currency against another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FxSpotIntent {
    /// Intent identifier.
    pub intent_id: IntentId,
    /// Pair `BUY/SELL`.
    pub pair: String,
    /// Currency bought.
    pub buy_currency: CurrencyCode,
    /// Amount bought.
    pub buy_amount: Decimal,
    /// Currency sold.
    pub sell_currency: CurrencyCode,
    /// Estimated amount sold.
    pub sell_amount_estimated: Decimal,
    /// Rate used: units of sell currency per unit of buy currency.
    pub rate: Decimal,
    /// Intents that must complete first.
    #[serde(default)]
    pub dependencies: Vec<IntentId>,
}

/// Instruction produced by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderIntent {
    /// Cash movement.
    CashFlow(CashFlowIntent),
    /// Security trade.
    SecurityTrade(SecurityTradeIntent),
    /// FX spot.
    FxSpot(FxSpotIntent),
}

impl OrderIntent {
    /// Intent identifier.
    #[must_use]
    pub const fn intent_id(&self) -> &IntentId {
        match self {
            Self::CashFlow(i) => &i.intent_id,
            Self::SecurityTrade(i) => &i.intent_id,
            Self::FxSpot(i) => &i.intent_id,
        }
    }

    /// Dependency edges.
    #[must_use]
    pub fn dependencies(&self) -> &[IntentId] {
        match self {
            Self::CashFlow(i) => &i.dependencies,
            Self::SecurityTrade(i) => &i.dependencies,
            Self::FxSpot(i) => &i.dependencies,
        }
    }

    /// Add a dependency edge; duplicates are ignored.
    pub fn add_dependency(&mut self, dependency: &IntentId) {
        let dependencies = match self {
            Self::CashFlow(i) => &mut i.dependencies,
            Self::SecurityTrade(i) => &mut i.dependencies,
            Self::FxSpot(i) => &mut i.dependencies,
        };
        if !dependencies.contains(dependency) {
            dependencies.push(dependency.clone());
        }
    }

    /// The trade, if this is a security trade.
    #[must_use]
    pub const fn as_trade(&self) -> Option<&SecurityTradeIntent> {
        match self {
            Self::SecurityTrade(t) => Some(t),
            _ => None,
        }
    }

    /// The FX spot, if this is one.
    #[must_use]
    pub const fn as_fx(&self) -> Option<&FxSpotIntent> {
        match self {
            Self::FxSpot(f) => Some(f),
            _ => None,
        }
    }

    /// Whether this is a buy trade.
    #[must_use]
    pub fn is_buy(&self) -> bool {
        self.as_trade().is_some_and(|t| t.side == TradeSide::Buy)
    }

    /// Whether this is a sell trade.
    #[must_use]
    pub fn is_sell(&self) -> bool {
        self.as_trade().is_some_and(|t| t.side == TradeSide::Sell)
    }
}
