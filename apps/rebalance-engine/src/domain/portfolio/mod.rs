//! Portfolio Bounded Context
//!
//! Caller-supplied holdings, reference data, and valuation into a normalized
//! simulated state.
//!
//! # Key Concepts
//!
//! - **Portfolio Snapshot**: Positions and cash ledgers in one base currency
//! - **Market Data**: Prices and FX rates for one computation
//! - **Shelf**: Governance catalogue of instruments
//! - **Simulated State**: Valued portfolio with allocation tables

pub mod services;
pub mod value_objects;

pub use services::{UNASSIGNED_BUCKET, ValuationOutcome, value_portfolio};
pub use value_objects::{
    AllocationRow, CASH_BUCKET, CashBalance, CashValuation, FxRate, MarketDataSnapshot,
    ModelPortfolio, ModelTarget, PortfolioSnapshot, Position, PositionValuation, Price,
    ReferenceModel, Shelf, ShelfEntry, ShelfStatus, SimulatedState, TaxLot, UNCLASSIFIED_BUCKET,
    pair_label,
};
