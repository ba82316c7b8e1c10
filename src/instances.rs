//! Markets without a competitive equilibrium, each paired with a control market that
//! has one.
//!
//! Agents have ordinal preferences over bundles of goods labelled by single characters.
//! Unless noted otherwise, Alice, Bob, Carl and Dana are agents `0`, `1`, `2` and `3`.
//! All instances use the rule under which an agent holding nothing with a nonnegative
//! budget does not have to spend it.

use super::*;

/// A market together with the search configuration it is meant to be solved with and
/// whether a competitive equilibrium exists.
#[derive(Debug)]
pub struct Instance {
    pub name: &'static str,
    pub market: Market,
    pub config: SearchConfig,
    pub has_equilibrium: bool,
}

impl Instance {
    fn goods(name: &'static str, market: Market, has_equilibrium: bool) -> Self {
        Instance {
            name,
            market,
            config: SearchConfig {
                checker: CheckerConfig {
                    exhaust_empty_bundles: false,
                    ..CheckerConfig::default()
                },
                ..SearchConfig::default()
            },
            has_equilibrium,
        }
    }

    fn chores(name: &'static str, market: Market, has_equilibrium: bool) -> Self {
        let mut inst = Self::goods(name, market, has_equilibrium);
        inst.config.checker.price_sign = PriceSign::NonPositive;
        inst
    }

    pub fn search(&self) -> Result<EquilibriumSearch, MarketError> {
        EquilibriumSearch::new(self.config.clone())
    }

    pub fn find_equilibrium(&self) -> Result<Option<Equilibrium>, MarketError> {
        self.search()?.find_equilibrium(&self.market)
    }

    pub fn find_personalized_equilibrium(&self) -> Result<Option<PersonalizedEquilibrium>, MarketError> {
        self.search()?.find_personalized_equilibrium(&self.market)
    }
}

/// All bundles of `size` goods, in lexicographic order of labels.
pub fn bundles_of_size(items: &str, size: usize) -> Vec<String> {
    fn extend(labels: &[char], size: usize, current: &mut String, res: &mut Vec<String>) {
        if current.chars().count() == size {
            res.push(current.clone());
            return;
        }
        for (i, &c) in labels.iter().enumerate() {
            current.push(c);
            extend(&labels[i + 1..], size, current, res);
            current.pop();
        }
    }

    let labels: Vec<char> = items.chars().collect();
    let mut res = Vec::new();
    extend(&labels, size, &mut String::new(), &mut res);
    res
}

fn list(bundles: &[&str]) -> Vec<String> {
    bundles.iter().map(|b| b.to_string()).collect()
}

fn boxed(preferences: Vec<RankedPreference>) -> Vec<Box<dyn PreferenceModel>> {
    preferences
        .into_iter()
        .map(|p| Box::new(p) as Box<dyn PreferenceModel>)
        .collect()
}

const GOODS4: &str = "wxyz";
const GOODS5: &str = "vwxyz";

/// Rankings over `wxyz` shared by the four- and five-agent instances.
struct FourGoods {
    alice: Vec<String>,
    bob: Vec<String>,
    carl: Vec<String>,
    dana: Vec<String>,
}

impl FourGoods {
    fn new(empty: bool) -> Self {
        let top = [bundles_of_size(GOODS4, 4), bundles_of_size(GOODS4, 3)].concat();
        let all_pairs = [top.clone(), bundles_of_size(GOODS4, 2)].concat();
        let tail = if empty { list(&[""]) } else { Vec::new() };
        FourGoods {
            alice: [
                top,
                list(&["wx", "wy", "wz", "xy", "w", "xz", "yz", "x", "y", "z"]),
                tail.clone(),
            ]
            .concat(),
            bob: [all_pairs.clone(), list(&["w", "z", "x", "y"]), tail.clone()].concat(),
            carl: [all_pairs.clone(), list(&["x", "y", "w", "z"]), tail.clone()].concat(),
            dana: [all_pairs, list(&["w", "x", "y", "z"]), tail].concat(),
        }
    }

    /// The same rankings over `wxyzo`, where `o` is a good of negligible value.
    fn with_low_value_good(&self) -> Result<Vec<RankedPreference>, MarketError> {
        let items = format!("{}o", GOODS4);
        [&self.alice, &self.bob, &self.carl, &self.dana]
            .into_iter()
            .map(|r| -> Result<RankedPreference, MarketError> {
                Ok(RankedPreference::parse(&items, r)?.with_low_value_good(4))
            })
            .collect()
    }
}

/// Rankings over `vwxyz` of the five-goods instances. Alice ranks `xyz` right below the
/// triplets containing `vw`, and Bob ranks it among the pairs.
struct FiveGoods {
    alice: Vec<String>,
    alice_control: Vec<String>,
    bob: Vec<String>,
    carl: Vec<String>,
}

impl FiveGoods {
    fn new(empty: bool) -> Self {
        let top = [bundles_of_size(GOODS5, 5), bundles_of_size(GOODS5, 4)].concat();
        let triplets = bundles_of_size(GOODS5, 3);
        let rest = [
            triplets.clone(),
            bundles_of_size(GOODS5, 2),
            bundles_of_size(GOODS5, 1),
        ]
        .concat();
        let tail = if empty { list(&[""]) } else { Vec::new() };
        let triplets_except_xyz: Vec<String> = triplets.into_iter().filter(|t| t != "xyz").collect();
        FiveGoods {
            alice: [
                top.clone(),
                list(&["vwx", "vwy", "vwz", "vw", "xyz"]),
                rest.clone(),
                tail.clone(),
            ]
            .concat(),
            alice_control: [top.clone(), list(&["vwx", "vwy", "vwz", "vw"]), rest.clone(), tail.clone()].concat(),
            bob: [
                top.clone(),
                triplets_except_xyz,
                list(&[
                    "vx", "vy", "vz", "wx", "wy", "wz", "xyz", "vw", "w", "v", "xy", "xz", "yz", "x", "y", "z",
                ]),
                tail.clone(),
            ]
            .concat(),
            carl: [top, rest, tail].concat(),
        }
    }
}

/// Four goods and three agents with budgets 20, 11 and 8.
pub fn goods4_agents3() -> Result<Instance, MarketError> {
    let top = [bundles_of_size(GOODS4, 4), bundles_of_size(GOODS4, 3)].concat();
    let pairs = bundles_of_size(GOODS4, 2);
    let singletons = bundles_of_size(GOODS4, 1);
    let alice = [top.clone(), list(&["wx", "yz", "wy", "xz", "wz", "xy"]), singletons.clone()].concat();
    let bob = [top.clone(), pairs.clone(), list(&["w", "x", "y", "z"])].concat();
    let carl = [top, pairs, singletons].concat();
    let market = Market::ranked(GOODS4, &[alice, bob, carl], vec![20.0, 11.0, 8.0])?;
    Ok(Instance::goods("4 goods, 3 agents", market, false))
}

/// As [`goods4_agents3`], but Alice ranks the pairs in lexicographic order.
pub fn goods4_agents3_control() -> Result<Instance, MarketError> {
    let top = [bundles_of_size(GOODS4, 4), bundles_of_size(GOODS4, 3)].concat();
    let pairs = bundles_of_size(GOODS4, 2);
    let singletons = bundles_of_size(GOODS4, 1);
    let alice = [top.clone(), pairs.clone(), singletons.clone()].concat();
    let bob = [top.clone(), pairs.clone(), list(&["w", "x", "y", "z"])].concat();
    let carl = [top, pairs, singletons].concat();
    let market = Market::ranked(GOODS4, &[alice, bob, carl], vec![20.0, 11.0, 8.0])?;
    Ok(Instance::goods("4 goods, 3 agents (control)", market, true))
}

fn goods3_rankings() -> Vec<Vec<String>> {
    let carl = [
        bundles_of_size("xyz", 3),
        bundles_of_size("xyz", 2),
        bundles_of_size("xyz", 1),
        list(&[""]),
    ]
    .concat();
    vec![
        list(&["xyz", "xy", "yz", "xz", "x", "y", "z", ""]),
        list(&["xyz", "xy", "xz", "yz", "y", "x", "z", ""]),
        carl,
    ]
}

/// Three goods and two agents with the same budget.
pub fn goods3_agents2() -> Result<Instance, MarketError> {
    let rankings = goods3_rankings();
    let market = Market::ranked("xyz", &rankings[..2], vec![4.0, 4.0])?;
    Ok(Instance::goods("3 goods, 2 agents", market, false))
}

/// [`goods3_agents2`] with a third agent of smaller budget, which restores an equilibrium.
pub fn goods3_agents3() -> Result<Instance, MarketError> {
    let market = Market::ranked("xyz", &goods3_rankings(), vec![4.0, 4.0, 2.0])?;
    Ok(Instance::goods("3 goods, 3 agents", market, true))
}

/// Four goods and four agents with budgets 16, 11, 9 and 6.
pub fn goods4_agents4() -> Result<Instance, MarketError> {
    let prefs = FourGoods::new(true);
    let market = Market::ranked(
        GOODS4,
        &[prefs.alice, prefs.bob, prefs.carl, prefs.dana],
        vec![16.0, 11.0, 9.0, 6.0],
    )?;
    Ok(Instance::goods("4 goods, 4 agents", market, false))
}

/// As [`goods4_agents4`] with budgets 18, 11, 9 and 6.
pub fn goods4_agents4_control() -> Result<Instance, MarketError> {
    let prefs = FourGoods::new(true);
    let market = Market::ranked(
        GOODS4,
        &[prefs.alice, prefs.bob, prefs.carl, prefs.dana],
        vec![18.0, 11.0, 9.0, 6.0],
    )?;
    Ok(Instance::goods("4 goods, 4 agents (control)", market, true))
}

/// Four goods and five agents with budgets 16, 11, 9, 6 and 5. The last two agents share
/// the same ranking.
pub fn goods4_agents5() -> Result<Instance, MarketError> {
    goods4_agents5_with_budgets("4 goods, 5 agents", vec![16.0, 11.0, 9.0, 6.0, 5.0], false)
}

/// As [`goods4_agents5`] with budgets 18, 11, 9, 6 and 5.
pub fn goods4_agents5_control() -> Result<Instance, MarketError> {
    goods4_agents5_with_budgets("4 goods, 5 agents (control)", vec![18.0, 11.0, 9.0, 6.0, 5.0], true)
}

fn goods4_agents5_with_budgets(
    name: &'static str,
    budgets: Vec<Budget>,
    has_equilibrium: bool,
) -> Result<Instance, MarketError> {
    let prefs = FourGoods::new(false);
    let market = Market::ranked(
        GOODS4,
        &[prefs.alice, prefs.bob, prefs.carl, prefs.dana.clone(), prefs.dana],
        budgets,
    )?;
    Ok(Instance::goods(name, market, has_equilibrium))
}

/// Five goods and two agents with budgets 12 and 10.
pub fn goods5_agents2() -> Result<Instance, MarketError> {
    let prefs = FiveGoods::new(false);
    let market = Market::ranked(GOODS5, &[prefs.alice, prefs.bob], vec![12.0, 10.0])?;
    Ok(Instance::goods("5 goods, 2 agents", market, false))
}

/// As [`goods5_agents2`], but Alice ranks `xyz` with the other triplets.
pub fn goods5_agents2_control() -> Result<Instance, MarketError> {
    let prefs = FiveGoods::new(false);
    let market = Market::ranked(GOODS5, &[prefs.alice_control, prefs.bob], vec![12.0, 10.0])?;
    Ok(Instance::goods("5 goods, 2 agents (control)", market, true))
}

/// [`goods5_agents2`] with a third agent of budget 1.
pub fn goods5_agents3() -> Result<Instance, MarketError> {
    let prefs = FiveGoods::new(true);
    let market = Market::ranked(GOODS5, &[prefs.alice, prefs.bob, prefs.carl], vec![12.0, 10.0, 1.0])?;
    Ok(Instance::goods("5 goods, 3 agents", market, false))
}

/// As [`goods5_agents3`], but Alice ranks `xyz` with the other triplets.
pub fn goods5_agents3_control() -> Result<Instance, MarketError> {
    let prefs = FiveGoods::new(true);
    let alice: Vec<String> = prefs.alice_control.into_iter().filter(|b| !b.is_empty()).collect();
    let market = Market::ranked(GOODS5, &[alice, prefs.bob, prefs.carl], vec![12.0, 10.0, 1.0])?;
    Ok(Instance::goods("5 goods, 3 agents (control)", market, true))
}

/// [`goods4_agents4`] with a fifth good `o` of negligible value to every agent.
pub fn goods5_agents4() -> Result<Instance, MarketError> {
    let market = Market::with_items(
        "wxyzo",
        boxed(FourGoods::new(true).with_low_value_good()?),
        vec![16.0, 11.0, 9.0, 6.0],
    )?;
    Ok(Instance::goods("5 goods, 4 agents", market, false))
}

/// As [`goods5_agents4`] with budgets 18, 11, 9 and 6.
pub fn goods5_agents4_control() -> Result<Instance, MarketError> {
    let market = Market::with_items(
        "wxyzo",
        boxed(FourGoods::new(true).with_low_value_good()?),
        vec![18.0, 11.0, 9.0, 6.0],
    )?;
    Ok(Instance::goods("5 goods, 4 agents (control)", market, true))
}

/// Four goods and four agents with budgets 160, 130, 90 and 66, close to additive
/// valuations.
pub fn additive_goods4_agents4() -> Result<Instance, MarketError> {
    let prefs = FourGoods::new(true);
    let market = Market::ranked(
        GOODS4,
        &[prefs.alice, prefs.bob, prefs.carl, prefs.dana],
        vec![160.0, 130.0, 90.0, 66.0],
    )?;
    Ok(Instance::goods("4 goods, 4 additive agents", market, false))
}

/// [`additive_goods4_agents4`] without Dana.
pub fn additive_goods4_agents4_control() -> Result<Instance, MarketError> {
    let prefs = FourGoods::new(true);
    let market = Market::ranked(GOODS4, &[prefs.alice, prefs.bob, prefs.carl], vec![160.0, 130.0, 90.0])?;
    Ok(Instance::goods("4 goods, 4 additive agents (control)", market, true))
}

/// Alice, Bob and Carl of [`additive_goods4_agents4`] with budgets 16, 13 and 9, and a
/// fifth good `o` of negligible value.
///
/// Unlike the other instances with a low-value good, this one has an equilibrium: Alice
/// buys `wo`, Bob `xz` and Carl `y`. It is only ruled out if `o` may never be bundled with
/// another good.
pub fn additive_goods5_agents3() -> Result<Instance, MarketError> {
    let mut prefs = FourGoods::new(true).with_low_value_good()?;
    prefs.truncate(3);
    let market = Market::with_items("wxyzo", boxed(prefs), vec![16.0, 13.0, 9.0])?;
    Ok(Instance::goods("5 goods, 3 additive agents", market, true))
}

/// [`additive_goods5_agents3`] without the low-value good.
pub fn additive_goods5_agents3_control() -> Result<Instance, MarketError> {
    let prefs = FourGoods::new(true);
    let market = Market::ranked(GOODS4, &[prefs.alice, prefs.bob, prefs.carl], vec![16.0, 13.0, 9.0])?;
    Ok(Instance::goods("5 goods, 3 additive agents (control)", market, true))
}

/// [`additive_goods4_agents4`] with a fifth good `o` of negligible value.
pub fn additive_goods5_agents4() -> Result<Instance, MarketError> {
    let market = Market::with_items(
        "wxyzo",
        boxed(FourGoods::new(true).with_low_value_good()?),
        vec![160.0, 130.0, 90.0, 66.0],
    )?;
    Ok(Instance::goods("5 goods, 4 additive agents", market, false))
}

/// [`additive_goods5_agents4`] without Dana.
pub fn additive_goods5_agents4_control() -> Result<Instance, MarketError> {
    let mut prefs = FourGoods::new(true).with_low_value_good()?;
    prefs.truncate(3);
    let market = Market::with_items("wxyzo", boxed(prefs), vec![160.0, 130.0, 90.0])?;
    Ok(Instance::goods("5 goods, 4 additive agents (control)", market, true))
}

fn chores3_market(budgets: Vec<Budget>) -> Result<Market, MarketError> {
    let ranking = list(&["", "x", "y", "xy", "z", "zx", "zy", "zxy"]);
    Market::ranked("xyz", &[ranking.clone(), ranking.clone(), ranking], budgets)
}

/// Three chores and three agents with the same ranking and budgets -7, -8 and -9.
pub fn chores3_agents3() -> Result<Instance, MarketError> {
    Ok(Instance::chores("3 chores, 3 agents", chores3_market(vec![-7.0, -8.0, -9.0])?, false))
}

/// As [`chores3_agents3`] with budgets -3, -7 and -15.
pub fn chores3_agents3_control() -> Result<Instance, MarketError> {
    Ok(Instance::chores(
        "3 chores, 3 agents (control)",
        chores3_market(vec![-3.0, -7.0, -15.0])?,
        true,
    ))
}

fn chores5_market(alice: &[String], bob: &[String]) -> Result<Market, MarketError> {
    let prefs = [alice, bob]
        .into_iter()
        .map(|r| -> Result<RankedPreference, MarketError> {
            Ok(RankedPreference::parse(GOODS5, r)?.to_chores(GOODS5.len()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Market::with_items(GOODS5, boxed(prefs), vec![-10.0, -12.0])
}

/// The goods of [`goods5_agents2`] turned into chores: every bundle of the goods
/// ranking is replaced by its complement. Budgets are -10 and -12.
pub fn chores5_agents2() -> Result<Instance, MarketError> {
    let prefs = FiveGoods::new(true);
    let market = chores5_market(&prefs.alice, &prefs.bob)?;
    Ok(Instance::chores("5 chores, 2 agents", market, false))
}

/// As [`chores5_agents2`], but Alice ranks `xyz` right after the triplets containing `vw`
/// and `vw` with the other pairs.
pub fn chores5_agents2_control() -> Result<Instance, MarketError> {
    let prefs = FiveGoods::new(true);
    let alice = [
        bundles_of_size(GOODS5, 5),
        bundles_of_size(GOODS5, 4),
        list(&["vwx", "vwy", "vwz", "xyz"]),
        bundles_of_size(GOODS5, 3),
        bundles_of_size(GOODS5, 2),
        bundles_of_size(GOODS5, 1),
        list(&[""]),
    ]
    .concat();
    let market = chores5_market(&alice, &prefs.bob)?;
    Ok(Instance::chores("5 chores, 2 agents (control)", market, true))
}

/// Every instance, each followed by its control. All instances but
/// [`additive_goods5_agents3`] have no equilibrium.
pub fn all() -> Result<Vec<Instance>, MarketError> {
    Ok(vec![
        goods4_agents3()?,
        goods4_agents3_control()?,
        goods3_agents2()?,
        goods3_agents3()?,
        goods4_agents4()?,
        goods4_agents4_control()?,
        goods4_agents5()?,
        goods4_agents5_control()?,
        goods5_agents2()?,
        goods5_agents2_control()?,
        goods5_agents3()?,
        goods5_agents3_control()?,
        goods5_agents4()?,
        goods5_agents4_control()?,
        additive_goods4_agents4()?,
        additive_goods4_agents4_control()?,
        additive_goods5_agents3()?,
        additive_goods5_agents3_control()?,
        additive_goods5_agents4()?,
        additive_goods5_agents4_control()?,
        chores3_agents3()?,
        chores3_agents3_control()?,
        chores5_agents2()?,
        chores5_agents2_control()?,
    ])
}

/// Two agents with the same ranking over four goods and budgets 9 and 7. No prices
/// support the allocation `wx`, `yz`, while `wy`, `xz` has supporting prices.
///
/// Returns the market, the unsupported allocation and the supported one.
pub fn goods4_agents2() -> Result<(Market, Allocation, Allocation), MarketError> {
    let ranking = [
        bundles_of_size(GOODS4, 4),
        bundles_of_size(GOODS4, 3),
        list(&["wx", "wy", "wz", "xy", "xz", "w", "yz", "x", "y", "z", ""]),
    ]
    .concat();
    let market = Market::ranked(GOODS4, &[ranking.clone(), ranking], vec![9.0, 7.0])?;
    let unsupported = market.parse_allocation(&["wx", "yz"])?;
    let supported = market.parse_allocation(&["wy", "xz"])?;
    Ok((market, unsupported, supported))
}
