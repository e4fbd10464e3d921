//! Governance shelf.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::shared::InstrumentId;

/// Governance status of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShelfStatus {
    /// Freely tradeable.
    Approved,
    /// Tradeable only when restricted products are allowed.
    Restricted,
    /// Not tradeable.
    Banned,
    /// Temporarily not tradeable.
    Suspended,
    /// May be liquidated but not bought.
    SellOnly,
}

impl ShelfStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "APPROVED",
            Self::Restricted => "RESTRICTED",
            Self::Banned => "BANNED",
            Self::Suspended => "SUSPENDED",
            Self::SellOnly => "SELL_ONLY",
        }
    }
}

impl std::fmt::Display for ShelfStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Governance record for one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfEntry {
    /// Instrument.
    pub instrument_id: InstrumentId,
    /// Governance status.
    pub status: ShelfStatus,
    /// Issuer, used by concentration checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_id: Option<String>,
    /// Liquidity tier, used by liquidity checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquidity_tier: Option<String>,
    /// Asset class bucket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_class: Option<String>,
    /// Free-form attribute tags used by group constraints.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl ShelfEntry {
    /// Create an entry with no tags.
    #[must_use]
    pub fn new(instrument_id: impl Into<String>, status: ShelfStatus) -> Self {
        Self {
            instrument_id: InstrumentId::new(instrument_id),
            status,
            issuer_id: None,
            liquidity_tier: None,
            asset_class: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Set the asset class.
    #[must_use]
    pub fn with_asset_class(mut self, asset_class: impl Into<String>) -> Self {
        self.asset_class = Some(asset_class.into());
        self
    }

    /// Set the issuer.
    #[must_use]
    pub fn with_issuer(mut self, issuer_id: impl Into<String>) -> Self {
        self.issuer_id = Some(issuer_id.into());
        self
    }

    /// Set the liquidity tier.
    #[must_use]
    pub fn with_liquidity_tier(mut self, tier: impl Into<String>) -> Self {
        self.liquidity_tier = Some(tier.into());
        self
    }

    /// Add an attribute tag.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Shelf entries indexed by instrument.
#[derive(Debug, Clone, Default)]
pub struct Shelf {
    entries: BTreeMap<InstrumentId, ShelfEntry>,
}

impl Shelf {
    /// Index a list of entries. Later duplicates win.
    #[must_use]
    pub fn new(entries: Vec<ShelfEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|e| (e.instrument_id.clone(), e))
            .collect();
        Self { entries }
    }

    /// Entry for an instrument.
    #[must_use]
    pub fn get(&self, instrument_id: &InstrumentId) -> Option<&ShelfEntry> {
        self.entries.get(instrument_id)
    }

    /// Attribute value of an instrument, if tagged.
    #[must_use]
    pub fn attribute(&self, instrument_id: &InstrumentId, key: &str) -> Option<&str> {
        self.get(instrument_id)
            .and_then(|e| e.attributes.get(key))
            .map(String::as_str)
    }

    /// Whether any entry carries the attribute key.
    #[must_use]
    pub fn knows_attribute(&self, key: &str) -> bool {
        self.entries.values().any(|e| e.attributes.contains_key(key))
    }

    /// All attribute keys used on the shelf, ascending.
    #[must_use]
    pub fn attribute_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .values()
            .flat_map(|e| e.attributes.keys().cloned())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_screaming() {
        let json = serde_json::to_string(&ShelfStatus::SellOnly).unwrap();
        assert_eq!(json, "\"SELL_ONLY\"");
        assert_eq!(ShelfStatus::Banned.to_string(), "BANNED");
    }

    #[test]
    fn shelf_attribute_lookup() {
        let shelf = Shelf::new(vec![
            ShelfEntry::new("A", ShelfStatus::Approved).with_attribute("sector", "TECH"),
            ShelfEntry::new("B", ShelfStatus::Approved),
        ]);
        assert_eq!(shelf.attribute(&InstrumentId::new("A"), "sector"), Some("TECH"));
        assert_eq!(shelf.attribute(&InstrumentId::new("B"), "sector"), None);
        assert!(shelf.knows_attribute("sector"));
        assert!(!shelf.knows_attribute("region"));
        assert_eq!(shelf.attribute_keys(), vec!["sector".to_string()]);
    }
}
