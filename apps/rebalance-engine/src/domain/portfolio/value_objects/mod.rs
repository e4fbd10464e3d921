//! Portfolio value objects.

mod market_data;
mod model;
mod shelf;
mod snapshot;
mod state;

pub use market_data::{FxRate, MarketDataSnapshot, Price, pair_label};
pub use model::{CASH_BUCKET, ModelPortfolio, ModelTarget, ReferenceModel, UNCLASSIFIED_BUCKET};
pub use shelf::{Shelf, ShelfEntry, ShelfStatus};
pub use snapshot::{CashBalance, PortfolioSnapshot, Position, TaxLot};
pub use state::{AllocationRow, CashValuation, PositionValuation, SimulatedState};
