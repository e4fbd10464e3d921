//! Engine options: the full per-run configuration surface.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::domain::shared::DomainError;

/// Strategy used to produce final target weights.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetMethod {
    /// Proportional capping and redistribution.
    #[default]
    Heuristic,
    /// Quadratic program over the configured solver chain.
    Solver,
}

/// Whether FX spot intents are generated to fund buys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FundingMode {
    /// Generate FX spot intents for currency shortfalls.
    #[default]
    AutoFx,
    /// Never generate FX.
    Off,
}

/// Which cash ledgers may fund an FX spot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FxFundingSource {
    /// Only the base currency.
    BaseOnly,
    /// Base currency first, then any other ledger.
    #[default]
    AnyCash,
}

/// Upper bound for one attribute group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConstraint {
    /// Maximum combined weight of the group.
    pub max_weight: Decimal,
}

/// Severity used by suitability and gate reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueSeverity {
    /// Requires compliance review.
    High,
    /// Requires risk review.
    Medium,
    /// Informational.
    Low,
}

impl IssueSeverity {
    /// Wire name of the severity.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        }
    }
}

/// Suitability scanner settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuitabilityOptions {
    /// Run the scanner.
    pub enabled: bool,
    /// Concentration threshold per instrument.
    pub single_position_max_weight: Decimal,
    /// Concentration threshold per issuer.
    pub issuer_max_weight: Decimal,
    /// Maximum weight per liquidity tier.
    pub max_weight_by_liquidity_tier: BTreeMap<String, Decimal>,
    /// Severity of missing-enrichment issues.
    pub data_quality_issue_severity: IssueSeverity,
}

impl Default for SuitabilityOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            single_position_max_weight: dec!(0.10),
            issuer_max_weight: dec!(0.20),
            max_weight_by_liquidity_tier: BTreeMap::from([
                ("L4".to_string(), dec!(0.10)),
                ("L5".to_string(), dec!(0.05)),
            ]),
            data_quality_issue_severity: IssueSeverity::Low,
        }
    }
}

/// Drift analytics settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftOptions {
    /// Run drift analytics.
    pub enabled: bool,
    /// Also analyse the instrument dimension.
    pub include_instrument: bool,
    /// Contributors and highlights kept per list.
    pub top_n: usize,
    /// Minimum weight for an unmodeled bucket to be highlighted.
    pub unmodeled_exposure_threshold: Decimal,
}

impl Default for DriftOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            include_instrument: false,
            top_n: 5,
            unmodeled_exposure_threshold: dec!(0.01),
        }
    }
}

/// Workflow settings feeding the gate decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowOptions {
    /// Override the policy default for requiring client consent.
    pub require_client_consent: Option<bool>,
    /// Consent has already been captured.
    pub client_consent_already_obtained: bool,
}

/// Options for one engine run. Immutable once the run starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    /// Target generation strategy.
    pub target_method: TargetMethod,
    /// Lower bound of the cash band.
    pub cash_band_min_weight: Decimal,
    /// Upper bound of the cash band.
    pub cash_band_max_weight: Decimal,
    /// Per-instrument cap.
    pub single_position_max_weight: Option<Decimal>,
    /// Group caps keyed `<attribute_key>:<attribute_value>`.
    pub group_constraints: BTreeMap<String, GroupConstraint>,
    /// Minimum cash kept after targets are set.
    pub min_cash_buffer_pct: Decimal,
    /// Allow trading RESTRICTED instruments.
    pub allow_restricted: bool,
    /// Trades below this base-currency notional are suppressed.
    pub min_trade_notional: Option<Decimal>,
    /// Plan FX funding for buys.
    pub auto_funding: bool,
    /// FX funding mode.
    pub funding_mode: FundingMode,
    /// Ledgers allowed to fund FX.
    pub fx_funding_source: FxFundingSource,
    /// Make buys depend on sells settling in the same currency.
    pub link_buy_to_same_currency_sell_dependency: bool,
    /// Missing prices fail the data-quality rule.
    pub block_on_missing_prices: bool,
    /// Missing FX rates fail the data-quality rule and funding.
    pub block_on_missing_fx: bool,
    /// Suitability scanner settings.
    pub suitability: SuitabilityOptions,
    /// Drift analytics settings.
    pub drift: DriftOptions,
    /// Workflow settings.
    pub workflow: WorkflowOptions,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            target_method: TargetMethod::Heuristic,
            cash_band_min_weight: Decimal::ZERO,
            cash_band_max_weight: Decimal::ONE,
            single_position_max_weight: None,
            group_constraints: BTreeMap::new(),
            min_cash_buffer_pct: Decimal::ZERO,
            allow_restricted: false,
            min_trade_notional: None,
            auto_funding: true,
            funding_mode: FundingMode::AutoFx,
            fx_funding_source: FxFundingSource::AnyCash,
            link_buy_to_same_currency_sell_dependency: false,
            block_on_missing_prices: true,
            block_on_missing_fx: true,
            suitability: SuitabilityOptions::default(),
            drift: DriftOptions::default(),
            workflow: WorkflowOptions::default(),
        }
    }
}

/// Split a group key into `(attribute_key, attribute_value)`.
#[must_use]
pub fn parse_group_key(key: &str) -> Option<(&str, &str)> {
    let (attribute, value) = key.split_once(':')?;
    let valid = |part: &str| !part.is_empty() && part.trim() == part && !part.contains(':');
    (valid(attribute) && valid(value)).then_some((attribute, value))
}

impl EngineOptions {
    /// Whether FX funding runs at all.
    #[must_use]
    pub fn fx_funding_enabled(&self) -> bool {
        self.auto_funding && self.funding_mode == FundingMode::AutoFx
    }

    /// Validate option combinations before a run.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), DomainError> {
        let unit = |v: Decimal| v >= Decimal::ZERO && v <= Decimal::ONE;
        if !unit(self.cash_band_min_weight) {
            return Err(DomainError::invalid("cash_band_min_weight", "must be within [0, 1]"));
        }
        if !unit(self.cash_band_max_weight) {
            return Err(DomainError::invalid("cash_band_max_weight", "must be within [0, 1]"));
        }
        if self.cash_band_min_weight > self.cash_band_max_weight {
            return Err(DomainError::invalid(
                "cash_band_min_weight",
                "must not exceed cash_band_max_weight",
            ));
        }
        if self
            .single_position_max_weight
            .is_some_and(|cap| cap <= Decimal::ZERO || cap > Decimal::ONE)
        {
            return Err(DomainError::invalid(
                "single_position_max_weight",
                "must be within (0, 1]",
            ));
        }
        for (key, constraint) in &self.group_constraints {
            if parse_group_key(key).is_none() {
                return Err(DomainError::invalid(
                    format!("group_constraints.{key}"),
                    "key must be <attribute_key>:<attribute_value>",
                ));
            }
            if !unit(constraint.max_weight) {
                return Err(DomainError::invalid(
                    format!("group_constraints.{key}.max_weight"),
                    "must be within [0, 1]",
                ));
            }
        }
        if self.min_cash_buffer_pct < Decimal::ZERO || self.min_cash_buffer_pct >= Decimal::ONE {
            return Err(DomainError::invalid("min_cash_buffer_pct", "must be within [0, 1)"));
        }
        if self.min_trade_notional.is_some_and(|min| min < Decimal::ZERO) {
            return Err(DomainError::invalid("min_trade_notional", "must not be negative"));
        }
        if self.drift.top_n == 0 {
            return Err(DomainError::invalid("drift.top_n", "must be at least 1"));
        }
        if self.drift.unmodeled_exposure_threshold < Decimal::ZERO {
            return Err(DomainError::invalid(
                "drift.unmodeled_exposure_threshold",
                "must not be negative",
            ));
        }
        let positive_unit = |v: Decimal| v > Decimal::ZERO && v <= Decimal::ONE;
        if !positive_unit(self.suitability.single_position_max_weight) {
            return Err(DomainError::invalid(
                "suitability.single_position_max_weight",
                "must be within (0, 1]",
            ));
        }
        if !positive_unit(self.suitability.issuer_max_weight) {
            return Err(DomainError::invalid(
                "suitability.issuer_max_weight",
                "must be within (0, 1]",
            ));
        }
        for (tier, max) in &self.suitability.max_weight_by_liquidity_tier {
            if !positive_unit(*max) {
                return Err(DomainError::invalid(
                    format!("suitability.max_weight_by_liquidity_tier.{tier}"),
                    "must be within (0, 1]",
                ));
            }
        }
        Ok(())
    }
}
