use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use super::*;

/// Price of every good in a market, indexed by good.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceVector(Vec<Price>);

impl PriceVector {
    pub fn new(prices: Vec<Price>) -> Self {
        PriceVector(prices)
    }

    pub fn good_count(&self) -> usize {
        self.0.len()
    }

    /// Total price of the goods in `bundle`.
    pub fn cost(&self, bundle: Bundle) -> Price {
        debug_assert!(bundle.fits(self.good_count()), "Bundle refers to unknown goods.");
        bundle.goods().map(|g| self.0[g]).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Price> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Price] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Price> {
        self.0
    }
}

impl Index<Good> for PriceVector {
    type Output = Price;

    fn index(&self, good: Good) -> &Self::Output {
        &self.0[good]
    }
}

impl From<Vec<Price>> for PriceVector {
    fn from(prices: Vec<Price>) -> Self {
        PriceVector(prices)
    }
}

impl fmt::Display for PriceVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prices: Vec<String> = self.0.iter().map(|p| format!("{:.4}", p)).collect();
        write!(f, "[{}]", prices.join(", "))
    }
}
