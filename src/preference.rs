use std::collections::HashMap;

use grid::*;

use super::*;

/// Valuation of an agent over bundles of goods.
///
/// The equilibrium checker only relies on [`PreferenceModel::valuation`]: it never assumes
/// additivity, and two bundles with the same valuation are treated as indifferent.
pub trait PreferenceModel: Send + Sync {
    /// Utility of `bundle`. Must be defined for every bundle, including the empty one.
    fn valuation(&self, bundle: Bundle) -> Valuation;

    /// Number of goods the model was built for, when it depends on it.
    ///
    /// A market rejects a model whose good count differs from its own.
    fn good_count(&self) -> Option<usize> {
        None
    }

    /// Returns `true` if the agent strictly prefers `better` to `worse`.
    fn prefers(&self, better: Bundle, worse: Bundle) -> bool {
        self.valuation(better) > self.valuation(worse)
    }
}

/// Additive valuation: the utility of a bundle is the sum of the values of its goods.
///
/// Negative values model chores.
#[derive(Clone, Debug, PartialEq)]
pub struct AdditivePreference {
    values: Vec<Valuation>,
}

impl AdditivePreference {
    pub fn new(values: Vec<Valuation>) -> Self {
        AdditivePreference { values }
    }

    /// Builds one additive agent per row of `grid`; column `g` is the value of good `g`.
    pub fn from_grid(grid: &Grid<Valuation>) -> Vec<Self> {
        (0..grid.rows())
            .map(|row| Self::new(grid.iter_row(row).copied().collect()))
            .collect()
    }

    pub fn value(&self, good: Good) -> Valuation {
        self.values[good]
    }
}

impl PreferenceModel for AdditivePreference {
    fn valuation(&self, bundle: Bundle) -> Valuation {
        debug_assert!(bundle.fits(self.values.len()), "Bundle refers to unknown goods.");
        bundle.goods().map(|g| self.values[g]).sum()
    }

    fn good_count(&self) -> Option<usize> {
        Some(self.values.len())
    }
}

/// Ordinal preference given as a ranking of bundles, from best to worst.
///
/// Bundles missing from the ranking are worse than every listed bundle and indifferent
/// among themselves. When a bundle is listed more than once, its best position counts.
#[derive(Clone, Debug)]
pub struct RankedPreference {
    ranking: Vec<Bundle>,
    ranks: HashMap<Bundle, usize>,
}

impl RankedPreference {
    pub fn new(ranking: Vec<Bundle>) -> Result<Self, MarketError> {
        if ranking.is_empty() {
            return Err(MarketError::EmptyRanking);
        }
        Ok(Self::from_ranking(ranking))
    }

    fn from_ranking(ranking: Vec<Bundle>) -> Self {
        let mut ranks = HashMap::with_capacity(ranking.len());
        let mut deduped = Vec::with_capacity(ranking.len());
        for bundle in ranking {
            if !ranks.contains_key(&bundle) {
                ranks.insert(bundle, deduped.len());
                deduped.push(bundle);
            }
        }
        RankedPreference {
            ranking: deduped,
            ranks,
        }
    }

    /// Parses a ranking written with one character per good, e.g.
    /// `["wxyz", "wx", "yz", "w", ""]` over the goods `"wxyz"`.
    pub fn parse<S: AsRef<str>>(items: &str, ranking: &[S]) -> Result<Self, MarketError> {
        let bundles = ranking
            .iter()
            .map(|b| Bundle::parse(b.as_ref(), items))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(bundles)
    }

    /// Bundles from best to worst, without repetitions.
    pub fn ranking(&self) -> &[Bundle] {
        &self.ranking
    }

    /// Position of `bundle` in the ranking (`0` is the best one), if listed.
    pub fn rank(&self, bundle: Bundle) -> Option<usize> {
        self.ranks.get(&bundle).copied()
    }

    /// Listed bundles the agent strictly prefers to `bundle`, from the best one down.
    pub fn bundles_preferred_to(&self, bundle: Bundle) -> impl Iterator<Item = Bundle> + '_ {
        self.ranking.iter().copied().take_while(move |&b| b != bundle)
    }

    /// Turns a ranking of goods into a ranking of chores by replacing every bundle with
    /// its complement: the agent prefers to be left with what the goods ranking would
    /// have given away.
    pub fn to_chores(&self, good_count: usize) -> Self {
        Self::from_ranking(self.ranking.iter().map(|b| b.complement(good_count)).collect())
    }

    /// Adds a good of negligible value: every bundle `B` is replaced by `B ∪ {good}`
    /// immediately followed by `B`.
    pub fn with_low_value_good(&self, good: Good) -> Self {
        let mut ranking = Vec::with_capacity(2 * self.ranking.len());
        for &b in &self.ranking {
            ranking.push(b.with(good));
            ranking.push(b);
        }
        Self::from_ranking(ranking)
    }
}

impl PreferenceModel for RankedPreference {
    fn valuation(&self, bundle: Bundle) -> Valuation {
        match self.rank(bundle) {
            Some(r) => (self.ranking.len() - r) as Valuation,
            None => 0.0,
        }
    }
}

/// Arbitrary valuation stored as a table with one entry per bundle, indexed by the
/// bundle's bitset.
#[derive(Clone, Debug, PartialEq)]
pub struct TablePreference {
    good_count: usize,
    values: Vec<Valuation>,
}

impl TablePreference {
    pub fn new(good_count: usize, values: Vec<Valuation>) -> Result<Self, MarketError> {
        if good_count > MAX_GOODS {
            return Err(MarketError::TooManyGoods {
                count: good_count,
                max: MAX_GOODS,
            });
        }
        let expected = 1usize << good_count;
        if values.len() != expected {
            return Err(MarketError::TableSize {
                expected,
                found: values.len(),
            });
        }
        Ok(TablePreference { good_count, values })
    }

    /// Tabulates `f` over all bundles of `good_count` goods.
    pub fn from_fn(good_count: usize, f: impl Fn(Bundle) -> Valuation) -> Result<Self, MarketError> {
        if good_count > MAX_GOODS {
            return Err(MarketError::TooManyGoods {
                count: good_count,
                max: MAX_GOODS,
            });
        }
        Self::new(good_count, Bundle::all(good_count).map(f).collect())
    }
}

impl PreferenceModel for TablePreference {
    fn valuation(&self, bundle: Bundle) -> Valuation {
        debug_assert!(bundle.fits(self.good_count), "Bundle refers to unknown goods.");
        self.values[bundle.bits() as usize]
    }

    fn good_count(&self) -> Option<usize> {
        Some(self.good_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::LazyLock;

    static RANKED: LazyLock<RankedPreference> =
        LazyLock::new(|| RankedPreference::parse("xyz", &["xyz", "xy", "x", "y", ""]).unwrap());

    fn b(s: &str) -> Bundle {
        Bundle::parse(s, "xyz").unwrap()
    }

    fn labels(it: impl Iterator<Item = Bundle>) -> Vec<String> {
        it.map(|b| b.to_labels("xyz")).collect()
    }

    #[test]
    fn test_additive() {
        let p = AdditivePreference::new(vec![3.0, -1.0, 0.5]);
        assert_eq!(p.valuation(Bundle::empty()), 0.0);
        assert_eq!(p.valuation(b("xz")), 3.5);
        assert_eq!(p.valuation(b("xyz")), 2.5);
        assert_eq!(p.good_count(), Some(3));
        assert!(p.prefers(b("x"), b("xy")));
    }

    #[test]
    fn test_additive_from_grid() {
        let profile = AdditivePreference::from_grid(&grid![[1.0, 2.0][4.0, 0.0]]);
        assert_eq!(profile.len(), 2);
        assert_eq!(profile[0].value(1), 2.0);
        assert_eq!(profile[1].valuation(Bundle::full(2)), 4.0);
    }

    #[test]
    fn test_ranked_valuation() {
        assert!(RANKED.prefers(b("xyz"), b("xy")));
        assert!(RANKED.prefers(b("y"), b("")));
        assert_eq!(RANKED.valuation(b("xyz")), 5.0);
        assert_eq!(RANKED.valuation(b("")), 1.0);
        // unlisted bundles are the worst and indifferent among themselves
        assert_eq!(RANKED.valuation(b("z")), 0.0);
        assert!(!RANKED.prefers(b("z"), b("yz")));
        assert!(!RANKED.prefers(b("yz"), b("z")));
        assert!(RANKED.prefers(b(""), b("yz")));
    }

    #[test]
    fn test_ranked_bundles_preferred_to() {
        assert_eq!(labels(RANKED.bundles_preferred_to(b(""))), ["xyz", "xy", "x", "y"]);
        assert_eq!(labels(RANKED.bundles_preferred_to(b("y"))), ["xyz", "xy", "x"]);
        assert_eq!(labels(RANKED.bundles_preferred_to(b("yx"))), ["xyz"]);
        assert!(RANKED.bundles_preferred_to(b("zyx")).next().is_none());

        let reversed = RankedPreference::parse("xyz", &["", "y", "x", "xy", "xyz"]).unwrap();
        assert!(reversed.bundles_preferred_to(b("")).next().is_none());
        assert_eq!(labels(reversed.bundles_preferred_to(b("x"))), ["", "y"]);
        assert_eq!(labels(reversed.bundles_preferred_to(b("yx"))), ["", "y", "x"]);
    }

    #[test]
    fn test_ranked_errors_and_duplicates() {
        assert_eq!(
            RankedPreference::new(Vec::new()).unwrap_err(),
            MarketError::EmptyRanking
        );
        assert!(RankedPreference::parse("xyz", &["xa"]).is_err());

        let p = RankedPreference::parse("xyz", &["xy", "x", "yx", "y"]).unwrap();
        assert_eq!(labels(p.ranking().iter().copied()), ["xy", "x", "y"]);
        assert_eq!(p.rank(b("y")), Some(2));
    }

    #[test]
    fn test_ranked_to_chores() {
        let chores = RANKED.to_chores(3);
        assert_eq!(labels(chores.ranking().iter().copied()), ["", "z", "yz", "xz", "xyz"]);
        assert!(chores.prefers(b(""), b("z")));
    }

    #[test]
    fn test_ranked_with_low_value_good() {
        let p = RankedPreference::parse("xyz", &["xy", "x", ""]).unwrap().with_low_value_good(2);
        assert_eq!(labels(p.ranking().iter().copied()), ["xyz", "xy", "xz", "x", "z", ""]);
    }

    #[test]
    fn test_table() {
        let p = TablePreference::from_fn(2, |b| b.len() as f64 * 2.0).unwrap();
        assert_eq!(p.valuation(Bundle::full(2)), 4.0);
        assert_eq!(p.good_count(), Some(2));
        assert_eq!(
            TablePreference::new(2, vec![0.0; 3]),
            Err(MarketError::TableSize { expected: 4, found: 3 })
        );
        assert!(matches!(
            TablePreference::new(MAX_GOODS + 1, Vec::new()),
            Err(MarketError::TooManyGoods { .. })
        ));
    }
}
