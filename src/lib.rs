mod allocation;
mod bundle;
mod error;
mod feasibility;
mod market;
mod preference;
mod prices;
mod search;
mod types;

pub mod instances;

pub use allocation::{Allocation, Allocations};
pub use bundle::Bundle;
pub use error::MarketError;
pub use feasibility::{CheckerConfig, DEFAULT_EPSILON, FeasibilityChecker, PriceSign};
pub use market::Market;
pub use preference::{AdditivePreference, PreferenceModel, RankedPreference, TablePreference};
pub use prices::PriceVector;
pub use search::{Equilibrium, EquilibriumSearch, PersonalizedEquilibrium, SearchConfig};
pub use types::*;

/// Prices supporting `allocation` in the market of `good_count` goods given by
/// `preferences` and `budgets`, with the checker configured by `config`.
///
/// `allocation[g]` is the agent receiving good `g`. Returns `Ok(None)` if no prices
/// support the allocation.
pub fn find_equilibrium_prices(
    good_count: usize,
    preferences: Vec<Box<dyn PreferenceModel>>,
    budgets: Vec<Budget>,
    allocation: Vec<Agent>,
    config: CheckerConfig,
) -> Result<Option<PriceVector>, MarketError> {
    let checker = FeasibilityChecker::new(config)?;
    let market = Market::new(good_count, preferences, budgets)?;
    let alloc = market.allocation(allocation)?;
    checker.find_equilibrium_prices(&market, &alloc)
}

/// First allocation, in enumeration order, with prices making it a competitive
/// equilibrium of the market given by `preferences` and `budgets`.
pub fn find_equilibrium(
    good_count: usize,
    preferences: Vec<Box<dyn PreferenceModel>>,
    budgets: Vec<Budget>,
    config: SearchConfig,
) -> Result<Option<Equilibrium>, MarketError> {
    let search = EquilibriumSearch::new(config)?;
    let market = Market::new(good_count, preferences, budgets)?;
    search.find_equilibrium(&market)
}
