//! Market data snapshot: prices and FX rates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{CurrencyCode, InstrumentId};

/// Price of one instrument in its trading currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Priced instrument.
    pub instrument_id: InstrumentId,
    /// Unit price.
    pub price: Decimal,
    /// Currency of the price.
    pub currency: CurrencyCode,
}

/// FX rate for an ordered pair.
///
/// `"USD/SGD"` at `1.35` means one USD buys 1.35 SGD.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FxRate {
    /// Ordered pair `BASE/QUOTE`.
    pub pair: String,
    /// Units of quote currency per unit of base currency.
    pub rate: Decimal,
}

impl FxRate {
    /// Split the pair into its two currency codes.
    #[must_use]
    pub fn currencies(&self) -> Option<(CurrencyCode, CurrencyCode)> {
        let (from, to) = self.pair.split_once('/')?;
        Some((CurrencyCode::new(from), CurrencyCode::new(to)))
    }
}

/// Read-only reference data for one computation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDataSnapshot {
    /// Instrument prices.
    #[serde(default)]
    pub prices: Vec<Price>,
    /// FX rates.
    #[serde(default)]
    pub fx_rates: Vec<FxRate>,
}

impl MarketDataSnapshot {
    /// Price of an instrument, if quoted.
    #[must_use]
    pub fn price_of(&self, instrument_id: &InstrumentId) -> Option<&Price> {
        self.prices.iter().find(|p| &p.instrument_id == instrument_id)
    }

    /// Factor converting one unit of `from` into `to`.
    ///
    /// Uses the direct pair when quoted, else the inverse of the reverse pair.
    /// Same-currency conversion is always 1.
    #[must_use]
    pub fn fx_rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Option<Decimal> {
        if from == to {
            return Some(Decimal::ONE);
        }
        let mut inverse = None;
        for rate in &self.fx_rates {
            let Some((base, quote)) = rate.currencies() else {
                continue;
            };
            if &base == from && &quote == to && rate.rate > Decimal::ZERO {
                return Some(rate.rate);
            }
            if inverse.is_none() && &base == to && &quote == from && rate.rate > Decimal::ZERO {
                inverse = Decimal::ONE.checked_div(rate.rate);
            }
        }
        inverse
    }

    /// Convert an amount between currencies, if a rate is available.
    #[must_use]
    pub fn convert(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Option<Decimal> {
        self.fx_rate(from, to).map(|rate| amount * rate)
    }
}

/// Pair label used in diagnostics for a missing conversion.
#[must_use]
pub fn pair_label(from: &CurrencyCode, to: &CurrencyCode) -> String {
    format!("{from}/{to}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn market() -> MarketDataSnapshot {
        MarketDataSnapshot {
            prices: vec![Price {
                instrument_id: InstrumentId::new("US_EQ"),
                price: dec!(100),
                currency: CurrencyCode::new("USD"),
            }],
            fx_rates: vec![FxRate {
                pair: "USD/SGD".to_string(),
                rate: dec!(1.35),
            }],
        }
    }

    #[test]
    fn direct_pair() {
        let rate = market().fx_rate(&CurrencyCode::new("USD"), &CurrencyCode::new("SGD"));
        assert_eq!(rate, Some(dec!(1.35)));
    }

    #[test]
    fn inverse_pair() {
        let rate = market()
            .fx_rate(&CurrencyCode::new("SGD"), &CurrencyCode::new("USD"))
            .unwrap();
        assert_eq!(rate.round_dp(6), dec!(0.740741));
    }

    #[test]
    fn identity_and_missing() {
        let m = market();
        assert_eq!(
            m.fx_rate(&CurrencyCode::new("EUR"), &CurrencyCode::new("EUR")),
            Some(Decimal::ONE)
        );
        assert!(m.fx_rate(&CurrencyCode::new("EUR"), &CurrencyCode::new("SGD")).is_none());
    }

    #[test]
    fn price_lookup() {
        let m = market();
        assert!(m.price_of(&InstrumentId::new("US_EQ")).is_some());
        assert!(m.price_of(&InstrumentId::new("NOPE")).is_none());
    }

    #[test]
    fn convert_amount() {
        let m = market();
        let sgd = m.convert(dec!(5000), &CurrencyCode::new("USD"), &CurrencyCode::new("SGD"));
        assert_eq!(sgd, Some(dec!(6750.00)));
    }
}
