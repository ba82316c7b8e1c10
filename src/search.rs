//! Exhaustive search for an allocation with supporting prices.

use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::*;

/// Configuration of an equilibrium search.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Configuration of the feasibility program solved for each allocation.
    pub checker: CheckerConfig,

    /// Largest number of allocations a search may visit. A market with more allocations
    /// is rejected before any program is solved.
    pub max_allocations: Option<usize>,

    /// Checks allocations on the rayon thread pool. The result is the same as for the
    /// sequential search.
    pub parallel: bool,
}

impl SearchConfig {
    pub fn chores() -> Self {
        SearchConfig {
            checker: CheckerConfig::chores(),
            ..Self::default()
        }
    }
}

/// A competitive equilibrium: an allocation with prices supporting it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Equilibrium {
    pub allocation: Allocation,
    pub prices: PriceVector,
}

/// An allocation with one supporting price vector per agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersonalizedEquilibrium {
    pub allocation: Allocation,
    pub prices: Vec<PriceVector>,
}

/// Walks every allocation of a market, in enumeration order, and checks each one for
/// supporting prices. There is no pruning: "no equilibrium" is only reported once every
/// allocation has been checked.
#[derive(Clone, Debug, Default)]
pub struct EquilibriumSearch {
    config: SearchConfig,
    checker: FeasibilityChecker,
}

impl EquilibriumSearch {
    pub fn new(config: SearchConfig) -> Result<Self, MarketError> {
        let checker = FeasibilityChecker::new(config.checker.clone())?;
        Ok(EquilibriumSearch { config, checker })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn checker(&self) -> &FeasibilityChecker {
        &self.checker
    }

    /// The first allocation, in enumeration order, that has equilibrium prices.
    pub fn find_equilibrium(&self, market: &Market) -> Result<Option<Equilibrium>, MarketError> {
        let found = self.find_first(market, |alloc| self.checker.find_equilibrium_prices(market, alloc))?;
        Ok(found.map(|(allocation, prices)| Equilibrium { allocation, prices }))
    }

    /// The first allocation, in enumeration order, with personalized equilibrium prices.
    pub fn find_personalized_equilibrium(
        &self,
        market: &Market,
    ) -> Result<Option<PersonalizedEquilibrium>, MarketError> {
        let found = self.find_first(market, |alloc| {
            self.checker.find_personalized_equilibrium_prices(market, alloc)
        })?;
        Ok(found.map(|(allocation, prices)| PersonalizedEquilibrium { allocation, prices }))
    }

    pub fn has_equilibrium(&self, market: &Market) -> Result<bool, MarketError> {
        Ok(self.find_equilibrium(market)?.is_some())
    }

    /// Every allocation with equilibrium prices, in enumeration order.
    pub fn equilibria(&self, market: &Market) -> Result<Vec<Equilibrium>, MarketError> {
        let total = self.allocation_budget(market)?;
        let start = Instant::now();
        let check = |alloc: Allocation| -> Result<Option<Equilibrium>, MarketError> {
            Ok(self
                .checker
                .find_equilibrium_prices(market, &alloc)?
                .map(|prices| Equilibrium { allocation: alloc, prices }))
        };

        let res: Vec<Equilibrium> = match (self.config.parallel, total) {
            (true, Some(total)) => (0..total)
                .into_par_iter()
                .filter_map(|i| Allocation::from_index(i, market.good_count(), market.agent_count()))
                .map(check)
                .filter_map(Result::transpose)
                .collect::<Result<_, _>>()?,
            _ => market.allocations().map(check).filter_map(Result::transpose).collect::<Result<_, _>>()?,
        };

        info!(
            "Found {} equilibria among {} allocations in {:.2}s",
            res.len(),
            total.map_or_else(|| "too many".to_string(), |t| t.to_string()),
            start.elapsed().as_secs_f64()
        );
        Ok(res)
    }

    /// Number of allocations of `market`, after checking it against the configured cap.
    fn allocation_budget(&self, market: &Market) -> Result<Option<usize>, MarketError> {
        let total = market.allocation_count();
        if let Some(limit) = self.config.max_allocations
            && total.is_none_or(|t| t > limit)
        {
            return Err(MarketError::EnumerationLimit {
                limit,
                total: total.unwrap_or(usize::MAX),
            });
        }
        Ok(total)
    }

    fn find_first<T, F>(&self, market: &Market, check: F) -> Result<Option<(Allocation, T)>, MarketError>
    where
        T: Send,
        F: Fn(&Allocation) -> Result<Option<T>, MarketError> + Sync,
    {
        let total = self.allocation_budget(market)?;
        let start = Instant::now();
        info!(
            goods = market.good_count(),
            agents = market.agent_count(),
            allocations = ?total,
            parallel = self.config.parallel,
            "Starting equilibrium search"
        );

        let res = match (self.config.parallel, total) {
            (true, Some(total)) => Self::find_first_parallel(market, total, &check)?,
            _ => Self::find_first_sequential(market, &check)?,
        };

        match &res {
            Some((alloc, _)) => info!(
                "Found equilibrium allocation {} in {:.2}s",
                market.describe(alloc),
                start.elapsed().as_secs_f64()
            ),
            None => info!(
                "No allocation has equilibrium prices ({:.2}s)",
                start.elapsed().as_secs_f64()
            ),
        }
        Ok(res)
    }

    fn find_first_sequential<T>(
        market: &Market,
        check: &impl Fn(&Allocation) -> Result<Option<T>, MarketError>,
    ) -> Result<Option<(Allocation, T)>, MarketError> {
        let mut allocations = market.allocations();
        let mut index = 0usize;
        while let Some(alloc) = allocations.next_lending() {
            index += 1;
            match check(alloc)? {
                Some(found) => {
                    debug!("{}. Allocation {}: equilibrium prices found", index, market.describe(alloc));
                    return Ok(Some((alloc.clone(), found)));
                }
                None => debug!("{}. Allocation {}: no equilibrium prices", index, market.describe(alloc)),
            }
        }
        Ok(None)
    }

    /// Checks allocations in parallel by index. `find_map_first` keeps the result of the
    /// lowest index, so errors and hits are reported as the sequential search would.
    fn find_first_parallel<T: Send>(
        market: &Market,
        total: usize,
        check: &(impl Fn(&Allocation) -> Result<Option<T>, MarketError> + Sync),
    ) -> Result<Option<(Allocation, T)>, MarketError> {
        (0..total)
            .into_par_iter()
            .find_map_first(|index| {
                let alloc = Allocation::from_index(index, market.good_count(), market.agent_count())?;
                let res = check(&alloc).transpose()?;
                debug!(
                    "{}. Allocation {}: {}",
                    index + 1,
                    market.describe(&alloc),
                    if res.is_ok() { "equilibrium prices found" } else { "error" }
                );
                Some(res.map(|found| (alloc, found)))
            })
            .transpose()
    }
}
