use std::fmt;

use grid::*;

use super::*;

/// A market of indivisible goods: one preference model and one budget per agent.
///
/// Markets are immutable once built; searches only read them.
pub struct Market {
    preferences: Vec<Box<dyn PreferenceModel>>,
    budgets: Vec<Budget>,
    good_count: usize,
    items: Option<String>,
}

impl Market {
    /// Builds a market of `good_count` goods.
    ///
    /// Fails if there are no agents, if preferences and budgets differ in number, if a
    /// budget is not finite, or if a preference model was built for another good count.
    pub fn new(
        good_count: usize,
        preferences: Vec<Box<dyn PreferenceModel>>,
        budgets: Vec<Budget>,
    ) -> Result<Self, MarketError> {
        if good_count > MAX_GOODS {
            return Err(MarketError::TooManyGoods {
                count: good_count,
                max: MAX_GOODS,
            });
        }
        if budgets.len() != preferences.len() {
            return Err(MarketError::BudgetCountMismatch {
                budgets: budgets.len(),
                preferences: preferences.len(),
            });
        }
        if budgets.is_empty() {
            return Err(MarketError::NoAgents);
        }
        if let Some((agent, &value)) = budgets.iter().enumerate().find(|(_, b)| !b.is_finite()) {
            return Err(MarketError::InvalidBudget { agent, value });
        }
        for (agent, pref) in preferences.iter().enumerate() {
            if let Some(found) = pref.good_count()
                && found != good_count
            {
                return Err(MarketError::PreferenceSize {
                    agent,
                    expected: good_count,
                    found,
                });
            }
        }
        Ok(Market {
            preferences,
            budgets,
            good_count,
            items: None,
        })
    }

    /// Builds a market whose goods are named by the characters of `items`, e.g. `"wxyz"`.
    pub fn with_items(
        items: &str,
        preferences: Vec<Box<dyn PreferenceModel>>,
        budgets: Vec<Budget>,
    ) -> Result<Self, MarketError> {
        let mut market = Self::new(items.chars().count(), preferences, budgets)?;
        market.items = Some(items.to_string());
        Ok(market)
    }

    /// Builds a market of agents with ordinal preferences, each given as a ranking of
    /// labelled bundles from best to worst.
    pub fn ranked<S: AsRef<str>>(
        items: &str,
        rankings: &[Vec<S>],
        budgets: Vec<Budget>,
    ) -> Result<Self, MarketError> {
        let preferences = rankings
            .iter()
            .map(|r| RankedPreference::parse(items, &r[..]).map(|p| Box::new(p) as Box<dyn PreferenceModel>))
            .collect::<Result<Vec<_>, _>>()?;
        Self::with_items(items, preferences, budgets)
    }

    /// Builds a market of additive agents: row `i` of `values` holds the value of each good
    /// for agent `i`.
    pub fn additive(values: &Grid<Valuation>, budgets: Vec<Budget>) -> Result<Self, MarketError> {
        let preferences = AdditivePreference::from_grid(values)
            .into_iter()
            .map(|p| Box::new(p) as Box<dyn PreferenceModel>)
            .collect();
        Self::new(values.cols(), preferences, budgets)
    }

    pub fn good_count(&self) -> usize {
        self.good_count
    }

    pub fn agent_count(&self) -> usize {
        self.budgets.len()
    }

    pub fn goods(&self) -> impl Iterator<Item = Good> + use<> {
        0..self.good_count
    }

    pub fn agents(&self) -> impl Iterator<Item = Agent> + use<> {
        0..self.agent_count()
    }

    /// Labels of the goods, if the market was built with them.
    pub fn items(&self) -> Option<&str> {
        self.items.as_deref()
    }

    pub fn budget(&self, ag: Agent) -> Budget {
        debug_assert!(ag < self.agent_count(), "Agent number out of range.");
        self.budgets[ag]
    }

    pub fn budgets(&self) -> &[Budget] {
        &self.budgets
    }

    pub fn preference(&self, ag: Agent) -> &dyn PreferenceModel {
        debug_assert!(ag < self.agent_count(), "Agent number out of range.");
        self.preferences[ag].as_ref()
    }

    pub fn valuation(&self, ag: Agent, bundle: Bundle) -> Valuation {
        self.preference(ag).valuation(bundle)
    }

    /// All bundles of the market that `ag` strictly prefers to `bundle`.
    pub fn preferred_bundles(&self, ag: Agent, bundle: Bundle) -> impl Iterator<Item = Bundle> + '_ {
        let pref = self.preference(ag);
        let value = pref.valuation(bundle);
        Bundle::all(self.good_count).filter(move |&b| pref.valuation(b) > value)
    }

    /// Iterator over every allocation of the market's goods to its agents.
    pub fn allocations(&self) -> Allocations {
        Allocation::enumerate(self.good_count, self.agent_count())
    }

    /// Number of allocations a full search visits, or `None` if it overflows `usize`.
    pub fn allocation_count(&self) -> Option<usize> {
        Allocation::count(self.good_count, self.agent_count())
    }

    /// Builds an allocation of this market from the owner of each good.
    pub fn allocation(&self, owners: Vec<Agent>) -> Result<Allocation, MarketError> {
        let alloc = Allocation::new(owners, self.agent_count())?;
        self.check_allocation(&alloc)?;
        Ok(alloc)
    }

    /// Builds an allocation of this market from labelled bundles, one per agent.
    pub fn parse_allocation<S: AsRef<str>>(&self, bundles: &[S]) -> Result<Allocation, MarketError> {
        let bundles = bundles
            .iter()
            .map(|b| self.parse_bundle(b.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let alloc = Allocation::from_bundles(&bundles, self.good_count)?;
        self.check_allocation(&alloc)?;
        Ok(alloc)
    }

    /// Parses a labelled bundle. Without labels, goods are named `0`..`9`.
    pub fn parse_bundle(&self, bundle: &str) -> Result<Bundle, MarketError> {
        match &self.items {
            Some(items) => Bundle::parse(bundle, items),
            None => {
                let digits: String = (0..self.good_count.min(10))
                    .filter_map(|g| char::from_digit(g as u32, 10))
                    .collect();
                Bundle::parse(bundle, &digits)
            }
        }
    }

    /// Checks that `alloc` partitions exactly the goods of this market among its agents.
    pub fn check_allocation(&self, alloc: &Allocation) -> Result<(), MarketError> {
        if alloc.good_count() != self.good_count {
            return Err(MarketError::AllocationLength {
                expected: self.good_count,
                found: alloc.good_count(),
            });
        }
        if alloc.agent_count() != self.agent_count() {
            return Err(MarketError::AgentCountMismatch {
                expected: self.agent_count(),
                found: alloc.agent_count(),
            });
        }
        Ok(())
    }

    /// Checks the equilibrium conditions directly, under the price sign and empty-bundle
    /// rule of `config`: every agent whose budget binds spends it (up to `tolerance`) and
    /// every bundle an agent strictly prefers costs more than its budget.
    pub fn is_equilibrium(
        &self,
        alloc: &Allocation,
        prices: &PriceVector,
        config: &CheckerConfig,
        tolerance: f64,
    ) -> bool {
        if self.check_allocation(alloc).is_err() || prices.good_count() != self.good_count {
            return false;
        }
        let signed = prices.iter().all(|&p| match config.price_sign {
            PriceSign::NonNegative => p >= -tolerance,
            PriceSign::NonPositive => p <= tolerance,
        });
        signed
            && self.agents().all(|ag| {
                let bundle = alloc.bundle(ag);
                let budget = self.budget(ag);
                (!config.binds_budget(bundle, budget) || (prices.cost(bundle) - budget).abs() <= tolerance)
                    && self.preferred_bundles(ag, bundle).all(|b| prices.cost(b) > budget)
            })
    }

    /// Writes an allocation with the market's good labels, if any.
    pub fn describe(&self, alloc: &Allocation) -> String {
        match &self.items {
            Some(items) => format!("{:?}", alloc.to_labels(items)),
            None => alloc.to_string(),
        }
    }

    /// Prices for which `alloc` is a competitive equilibrium, with the default checker.
    pub fn find_equilibrium_prices(&self, alloc: &Allocation) -> Result<Option<PriceVector>, MarketError> {
        FeasibilityChecker::default().find_equilibrium_prices(self, alloc)
    }

    /// First competitive equilibrium in enumeration order, with the default search.
    pub fn find_equilibrium(&self) -> Result<Option<Equilibrium>, MarketError> {
        EquilibriumSearch::default().find_equilibrium(self)
    }

    pub fn has_equilibrium(&self) -> Result<bool, MarketError> {
        Ok(self.find_equilibrium()?.is_some())
    }

    /// Every competitive equilibrium allocation with supporting prices, with the default search.
    pub fn equilibria(&self) -> Result<Vec<Equilibrium>, MarketError> {
        EquilibriumSearch::default().equilibria(self)
    }
}

impl fmt::Debug for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Market")
            .field("good_count", &self.good_count)
            .field("budgets", &self.budgets)
            .field("items", &self.items)
            .finish()
    }
}
