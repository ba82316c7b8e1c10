//! Linear feasibility program for the prices supporting a fixed allocation.

use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem, Variable};
use serde::{Deserialize, Serialize};
use tracing::trace;

use super::*;

/// Strict-preference margin used when none is configured.
pub const DEFAULT_EPSILON: f64 = 1e-4;

/// Sign constraint on the price of every good.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceSign {
    /// Prices of goods, `p ≥ 0`.
    #[default]
    NonNegative,
    /// Prices of chores, `p ≤ 0`.
    NonPositive,
}

impl PriceSign {
    /// Bounds of a price variable.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            PriceSign::NonNegative => (0.0, f64::INFINITY),
            PriceSign::NonPositive => (f64::NEG_INFINITY, 0.0),
        }
    }
}

/// Configuration of the feasibility program.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// A bundle an agent strictly prefers to its own must cost at least `budget + epsilon`.
    pub epsilon: f64,
    pub price_sign: PriceSign,
    /// When `false`, an agent holding the empty bundle with a nonnegative budget gets no
    /// budget equality.
    pub exhaust_empty_bundles: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        CheckerConfig {
            epsilon: DEFAULT_EPSILON,
            price_sign: PriceSign::NonNegative,
            exhaust_empty_bundles: true,
        }
    }
}

impl CheckerConfig {
    /// Default configuration for markets of chores: nonpositive prices.
    pub fn chores() -> Self {
        CheckerConfig {
            price_sign: PriceSign::NonPositive,
            ..Self::default()
        }
    }

    pub fn with_epsilon(self, epsilon: f64) -> Self {
        CheckerConfig { epsilon, ..self }
    }

    /// Whether an agent holding `bundle` must spend exactly `budget`.
    pub fn binds_budget(&self, bundle: Bundle, budget: Budget) -> bool {
        self.exhaust_empty_bundles || !bundle.is_empty() || budget < 0.0
    }

    pub fn validate(&self) -> Result<(), MarketError> {
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(MarketError::InvalidEpsilon { value: self.epsilon });
        }
        Ok(())
    }
}

/// Decides whether an allocation can be supported by prices.
///
/// For an allocation `A`, the program has one price variable per good and:
///
/// * for every agent `i`, the equality `cost(A(i)) = budget(i)`;
/// * for every agent `i` and every bundle `B` that `i` strictly prefers to `A(i)`, the
///   inequality `cost(B) ≥ budget(i) + epsilon`.
///
/// The objective is zero: any feasible point is a supporting price vector.
#[derive(Clone, Debug, Default)]
pub struct FeasibilityChecker {
    config: CheckerConfig,
}

impl FeasibilityChecker {
    pub fn new(config: CheckerConfig) -> Result<Self, MarketError> {
        config.validate()?;
        Ok(FeasibilityChecker { config })
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Prices for which `alloc` is a competitive equilibrium of `market`, or `None` if
    /// there are none.
    pub fn find_equilibrium_prices(
        &self,
        market: &Market,
        alloc: &Allocation,
    ) -> Result<Option<PriceVector>, MarketError> {
        self.solve(market, alloc, |_| true)
    }

    /// One price vector per agent, each supporting the bundle of its own agent while
    /// exhausting every budget. `None` if the program of some agent is infeasible.
    pub fn find_personalized_equilibrium_prices(
        &self,
        market: &Market,
        alloc: &Allocation,
    ) -> Result<Option<Vec<PriceVector>>, MarketError> {
        market.check_allocation(alloc)?;
        let mut res = Vec::with_capacity(market.agent_count());
        for ag in market.agents() {
            match self.solve(market, alloc, |other| other == ag)? {
                Some(prices) => res.push(prices),
                None => return Ok(None),
            }
        }
        Ok(Some(res))
    }

    /// Builds and solves the program, with preference inequalities only for the agents
    /// selected by `constrained`.
    fn solve(
        &self,
        market: &Market,
        alloc: &Allocation,
        constrained: impl Fn(Agent) -> bool,
    ) -> Result<Option<PriceVector>, MarketError> {
        market.check_allocation(alloc)?;
        let eps = self.config.epsilon;

        let mut problem = Problem::new(OptimizationDirection::Minimize);
        let bounds = self.config.price_sign.bounds();
        let prices: Vec<Variable> = market.goods().map(|_| problem.add_var(0.0, bounds)).collect();
        let expr = |bundle: Bundle| {
            let mut expr = LinearExpr::empty();
            for g in bundle.goods() {
                expr.add(prices[g], 1.0);
            }
            expr
        };

        let mut equalities = 0;
        let mut inequalities = 0;
        for ag in market.agents() {
            let bundle = alloc.bundle(ag);
            let budget = market.budget(ag);
            if self.config.binds_budget(bundle, budget) {
                if bundle.is_empty() {
                    // the empty bundle always costs nothing
                    if budget != 0.0 {
                        trace!(agent = ag, budget, "empty bundle cannot exhaust the budget");
                        return Ok(None);
                    }
                } else {
                    problem.add_constraint(expr(bundle), ComparisonOp::Eq, budget);
                    equalities += 1;
                }
            }
            if !constrained(ag) {
                continue;
            }
            for better in market.preferred_bundles(ag, bundle) {
                if better.is_empty() {
                    if 0.0 < budget + eps {
                        trace!(agent = ag, budget, "empty bundle is preferred and affordable");
                        return Ok(None);
                    }
                } else {
                    problem.add_constraint(expr(better), ComparisonOp::Ge, budget + eps);
                    inequalities += 1;
                }
            }
        }

        trace!(
            variables = prices.len(),
            equalities, inequalities, "solving feasibility program"
        );
        if prices.is_empty() {
            return Ok(Some(PriceVector::default()));
        }
        match problem.solve() {
            Ok(solution) => Ok(Some(PriceVector::new(
                prices.iter().map(|&var| solution[var]).collect(),
            ))),
            Err(minilp::Error::Infeasible) => Ok(None),
            Err(err) => Err(MarketError::Solver {
                message: err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use std::sync::LazyLock;

    static MARKET_XY: LazyLock<Market> = LazyLock::new(|| {
        Market::ranked("xy", &[vec!["xy", "x", "y", ""], vec!["xy", "x", "y", ""]], vec![5.0, 2.0]).unwrap()
    });

    static CHECKER: LazyLock<FeasibilityChecker> = LazyLock::new(FeasibilityChecker::default);

    fn prices(market: &Market, bundles: &[&str]) -> Option<PriceVector> {
        let alloc = market.parse_allocation(bundles).unwrap();
        CHECKER.find_equilibrium_prices(market, &alloc).unwrap()
    }

    #[test]
    fn test_config() {
        let config = CheckerConfig::default();
        assert_eq!(config.epsilon, DEFAULT_EPSILON);
        assert_eq!(config.price_sign, PriceSign::NonNegative);
        assert!(config.exhaust_empty_bundles);
        assert_eq!(CheckerConfig::chores().price_sign, PriceSign::NonPositive);
        assert_eq!(PriceSign::NonPositive.bounds(), (f64::NEG_INFINITY, 0.0));
        assert_eq!(
            FeasibilityChecker::new(config.clone().with_epsilon(0.0)).unwrap_err(),
            MarketError::InvalidEpsilon { value: 0.0 }
        );
        assert!(FeasibilityChecker::new(config.with_epsilon(f64::NAN)).is_err());
    }

    #[test]
    fn test_config_from_json() {
        let config: CheckerConfig = serde_json::from_str(r#"{"epsilon": 0.01}"#).unwrap();
        assert_eq!(config, CheckerConfig::default().with_epsilon(0.01));

        let config: CheckerConfig =
            serde_json::from_str(r#"{"price_sign": "NonPositive", "exhaust_empty_bundles": false}"#).unwrap();
        assert_eq!(config.epsilon, DEFAULT_EPSILON);
        assert_eq!(config.price_sign, PriceSign::NonPositive);
        assert!(!config.exhaust_empty_bundles);

        assert!(serde_json::from_str::<CheckerConfig>(r#"{"price_sign": "Negative"}"#).is_err());
    }

    #[test]
    fn test_supporting_prices() {
        let p = prices(&MARKET_XY, &["x", "y"]).unwrap();
        assert!(approx_eq!(f64, p[0], 5.0, epsilon = 1e-6));
        assert!(approx_eq!(f64, p[1], 2.0, epsilon = 1e-6));
        let alloc = MARKET_XY.parse_allocation(&["x", "y"]).unwrap();
        assert!(MARKET_XY.is_equilibrium(&alloc, &p, CHECKER.config(), 1e-6));
    }

    #[test]
    fn test_infeasible_allocations() {
        // agent 0 could afford x, which agent 1 buys for 2
        assert_eq!(prices(&MARKET_XY, &["y", "x"]), None);
        // agent 1 cannot spend its budget on the empty bundle
        assert_eq!(prices(&MARKET_XY, &["xy", ""]), None);
        assert_eq!(prices(&MARKET_XY, &["", "xy"]), None);
    }

    #[test]
    fn test_empty_bundle_rule() {
        let checker = FeasibilityChecker::new(CheckerConfig {
            exhaust_empty_bundles: false,
            ..CheckerConfig::default()
        })
        .unwrap();
        let alloc = MARKET_XY.parse_allocation(&["xy", ""]).unwrap();
        let p = checker.find_equilibrium_prices(&MARKET_XY, &alloc).unwrap().unwrap();
        assert!(approx_eq!(f64, p.cost(Bundle::full(2)), 5.0, epsilon = 1e-6));
        assert!(p[0] >= 2.0 + DEFAULT_EPSILON - 1e-6);
        assert!(p[1] >= 2.0 + DEFAULT_EPSILON - 1e-6);
    }

    #[test]
    fn test_opposite_favourites() {
        let market = Market::ranked("ab", &[vec!["a", "ab", "b", ""], vec!["b", "ab", "a", ""]], vec![3.0, 7.0]).unwrap();
        let p = prices(&market, &["a", "b"]).unwrap();
        assert!(approx_eq!(f64, p[0], 3.0, epsilon = 1e-6));
        assert!(approx_eq!(f64, p[1], 7.0, epsilon = 1e-6));
    }

    #[test]
    fn test_additive_market() {
        let market = Market::additive(&grid::grid![[3.0, 1.0][1.0, 3.0]], vec![2.0, 1.0]).unwrap();
        let alloc = market.allocation(vec![0, 1]).unwrap();
        let p = CHECKER.find_equilibrium_prices(&market, &alloc).unwrap().unwrap();
        assert!(market.is_equilibrium(&alloc, &p, CHECKER.config(), 1e-6));
        let alloc = market.allocation(vec![1, 0]).unwrap();
        assert_eq!(CHECKER.find_equilibrium_prices(&market, &alloc), Ok(None));
    }

    #[test]
    fn test_tied_bundle_is_unconstrained() {
        // agent 0 likes a and b equally and b costs less than its budget
        let market = Market::additive(&grid::grid![[5.0, 5.0][1.0, 0.0]], vec![5.0, 1.0]).unwrap();
        let alloc = market.allocation(vec![0, 1]).unwrap();
        let p = CHECKER.find_equilibrium_prices(&market, &alloc).unwrap().unwrap();
        assert!(approx_eq!(f64, p[0], 5.0, epsilon = 1e-6));
        assert!(approx_eq!(f64, p[1], 1.0, epsilon = 1e-6));
        assert!(market.is_equilibrium(&alloc, &p, CHECKER.config(), 1e-6));

        // unlisted bundles of a ranking are tied with each other
        let market = Market::ranked("xy", &[vec!["xy"], vec!["xy", "x"]], vec![3.0, 1.0]).unwrap();
        let p = prices(&market, &["x", "y"]).unwrap();
        assert!(approx_eq!(f64, p[0], 3.0, epsilon = 1e-6));
        assert!(approx_eq!(f64, p[1], 1.0, epsilon = 1e-6));
    }

    #[test]
    fn test_chores() {
        let ranking = vec!["", "x", "y", "xy"];
        let market = Market::ranked("xy", &[ranking.clone(), ranking], vec![-3.0, -1.0]).unwrap();
        let checker = FeasibilityChecker::new(CheckerConfig::chores()).unwrap();
        let alloc = market.parse_allocation(&["y", "x"]).unwrap();
        let p = checker.find_equilibrium_prices(&market, &alloc).unwrap().unwrap();
        assert!(approx_eq!(f64, p[0], -1.0, epsilon = 1e-6));
        assert!(approx_eq!(f64, p[1], -3.0, epsilon = 1e-6));
        // with nonnegative prices no bundle can cost a negative budget
        assert_eq!(CHECKER.find_equilibrium_prices(&market, &alloc), Ok(None));
        // agent 1 would rather take x, paid -3
        let alloc = market.parse_allocation(&["x", "y"]).unwrap();
        assert_eq!(checker.find_equilibrium_prices(&market, &alloc), Ok(None));
    }

    #[test]
    fn test_no_goods() {
        let market = Market::new(0, vec![Box::new(AdditivePreference::new(Vec::new()))], vec![0.0]).unwrap();
        let alloc = market.allocation(Vec::new()).unwrap();
        assert_eq!(CHECKER.find_equilibrium_prices(&market, &alloc), Ok(Some(PriceVector::default())));
    }

    #[test]
    fn test_personalized() {
        let market = Market::ranked("xyz", &[vec!["xz", "xy"], vec!["y", "z"]], vec![4.0, 2.0]).unwrap();
        let alloc = market.parse_allocation(&["xy", "z"]).unwrap();
        // x and y cannot both cost more than 2
        assert_eq!(CHECKER.find_equilibrium_prices(&market, &alloc), Ok(None));

        let personalized = CHECKER
            .find_personalized_equilibrium_prices(&market, &alloc)
            .unwrap()
            .unwrap();
        assert_eq!(personalized.len(), 2);
        for p in &personalized {
            assert!(approx_eq!(f64, p[0] + p[1], 4.0, epsilon = 1e-6));
            assert!(approx_eq!(f64, p[2], 2.0, epsilon = 1e-6));
        }
        assert!(personalized[0][0] >= 2.0 + DEFAULT_EPSILON - 1e-6);
        assert!(personalized[1][1] >= 2.0 + DEFAULT_EPSILON - 1e-6);

        let alloc = market.parse_allocation(&["z", "xy"]).unwrap();
        assert_eq!(CHECKER.find_personalized_equilibrium_prices(&market, &alloc), Ok(None));
    }

    #[test]
    fn test_validation() {
        let alloc = Allocation::new(vec![0, 1, 1], 2).unwrap();
        assert_eq!(
            CHECKER.find_equilibrium_prices(&MARKET_XY, &alloc),
            Err(MarketError::AllocationLength { expected: 2, found: 3 })
        );
    }
}
