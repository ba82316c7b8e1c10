use std::fmt;

use serde::{Deserialize, Serialize};

use super::*;

/// A set of goods, stored as a bitset indicator over good indices.
///
/// Bit `g` is set when good `g` belongs to the bundle. The bundle does not know how many
/// goods the market has: operations that depend on it (complement, enumeration) take the
/// good count as a parameter.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Bundle(u64);

impl Bundle {
    const BITS: usize = u64::BITS as usize;

    /// The empty bundle.
    pub const fn empty() -> Self {
        Bundle(0)
    }

    /// Builds a bundle directly from its bitset.
    pub const fn from_bits(bits: u64) -> Self {
        Bundle(bits)
    }

    /// Bitset representation.
    pub const fn bits(&self) -> u64 {
        self.0
    }

    /// The bundle with all of the first `good_count` goods.
    pub fn full(good_count: usize) -> Self {
        debug_assert!(good_count <= MAX_GOODS, "Too many goods.");
        Bundle((1u64 << good_count) - 1)
    }

    /// A bundle with a single good.
    ///
    /// Panics if `good` is not below [`MAX_GOODS`].
    pub fn singleton(good: Good) -> Self {
        Self::empty().with(good)
    }

    /// Builds a bundle from a list of goods. Repeated goods are counted once.
    ///
    /// Panics if a good is not below [`MAX_GOODS`]; see [`Bundle::try_from_goods`].
    pub fn from_goods(goods: &[Good]) -> Self {
        goods.iter().fold(Self::empty(), |b, &g| b.with(g))
    }

    /// Builds a bundle from a list of goods, failing on a good a bundle cannot hold.
    pub fn try_from_goods(goods: &[Good]) -> Result<Self, MarketError> {
        goods.iter().try_fold(Self::empty(), |b, &g| b.checked_with(g))
    }

    /// Parses a bundle written with one character per good, e.g. `"wy"` over the goods
    /// `"wxyz"`. The order of characters is irrelevant.
    pub fn parse(bundle: &str, items: &str) -> Result<Self, MarketError> {
        let mut res = Self::empty();
        for label in bundle.chars() {
            match items.chars().position(|c| c == label) {
                Some(good) => res = res.checked_with(good)?,
                None => {
                    return Err(MarketError::UnknownLabel {
                        label,
                        items: items.to_string(),
                    });
                }
            }
        }
        Ok(res)
    }

    /// Returns a copy of the bundle with `good` added.
    ///
    /// Panics if `good` is not below [`MAX_GOODS`].
    pub fn with(self, good: Good) -> Self {
        assert!(good < MAX_GOODS, "Good number out of range.");
        Bundle(self.0 | (1u64 << good))
    }

    /// As [`Bundle::with`], but fails instead of panicking.
    pub fn checked_with(self, good: Good) -> Result<Self, MarketError> {
        if good >= MAX_GOODS {
            return Err(MarketError::GoodOutOfRange {
                good,
                good_count: MAX_GOODS,
            });
        }
        Ok(self.with(good))
    }

    /// Returns a copy of the bundle with `good` removed.
    pub fn without(self, good: Good) -> Self {
        if good < Self::BITS {
            Bundle(self.0 & !(1u64 << good))
        } else {
            self
        }
    }

    pub fn contains(&self, good: Good) -> bool {
        good < Self::BITS && self.0 & (1u64 << good) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of goods in the bundle.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn union(self, other: Bundle) -> Self {
        Bundle(self.0 | other.0)
    }

    pub fn intersection(self, other: Bundle) -> Self {
        Bundle(self.0 & other.0)
    }

    /// Goods of the market (of `good_count` goods) that are not in the bundle.
    pub fn complement(self, good_count: usize) -> Self {
        Bundle(!self.0 & Self::full(good_count).0)
    }

    /// Returns `true` if the bundle only uses goods `0..good_count`.
    pub fn fits(&self, good_count: usize) -> bool {
        self.0 & !Self::full(good_count).0 == 0
    }

    /// Iterator over the goods in the bundle, in increasing order.
    ///
    /// Bits set with [`Bundle::from_bits`] beyond [`MAX_GOODS`] are reported too, so that
    /// validation can reject them.
    pub fn goods(&self) -> impl Iterator<Item = Good> + use<> {
        let bits = self.0;
        (0..Self::BITS).filter(move |&g| bits & (1u64 << g) != 0)
    }

    /// Iterator over all `2^good_count` bundles, starting from the empty one.
    pub fn all(good_count: usize) -> impl Iterator<Item = Bundle> {
        debug_assert!(good_count <= MAX_GOODS, "Too many goods.");
        (0..=Self::full(good_count).0).map(Bundle)
    }

    /// Writes the bundle with one character per good.
    ///
    /// Goods without a label are written as their index in brackets.
    pub fn to_labels(&self, items: &str) -> String {
        let labels: Vec<char> = items.chars().collect();
        self.goods()
            .map(|g| match labels.get(g) {
                Some(c) => c.to_string(),
                None => format!("[{}]", g),
            })
            .collect()
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let goods: Vec<String> = self.goods().map(|g| g.to_string()).collect();
        write!(f, "{{{}}}", goods.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(Bundle::empty().bits(), 0);
        assert_eq!(Bundle::full(3).bits(), 0b111);
        assert_eq!(Bundle::full(0), Bundle::empty());
        assert_eq!(Bundle::singleton(2).bits(), 0b100);
        assert_eq!(Bundle::from_goods(&[0, 2, 2]).bits(), 0b101);
    }

    #[test]
    fn test_parse() {
        assert_eq!(Bundle::parse("wy", "wxyz"), Ok(Bundle::from_goods(&[0, 2])));
        assert_eq!(Bundle::parse("yw", "wxyz"), Ok(Bundle::from_goods(&[0, 2])));
        assert_eq!(Bundle::parse("", "wxyz"), Ok(Bundle::empty()));
        assert_eq!(
            Bundle::parse("wq", "wxyz"),
            Err(MarketError::UnknownLabel {
                label: 'q',
                items: "wxyz".to_string()
            })
        );
    }

    #[test]
    fn test_set_operations() {
        let b = Bundle::from_goods(&[1, 3]);
        assert!(b.contains(1));
        assert!(!b.contains(0));
        assert!(!b.contains(MAX_GOODS + 3));
        assert_eq!(b.len(), 2);
        assert_eq!(b.with(0), Bundle::from_goods(&[0, 1, 3]));
        assert_eq!(b.without(3), Bundle::singleton(1));
        assert_eq!(b.complement(4), Bundle::from_goods(&[0, 2]));
        assert_eq!(b.union(Bundle::singleton(2)).len(), 3);
        assert_eq!(b.intersection(Bundle::singleton(3)), Bundle::singleton(3));
        assert!(b.fits(4));
        assert!(!b.fits(3));
    }

    #[test]
    fn test_goods() {
        assert_eq!(Bundle::from_goods(&[4, 0, 2]).goods().collect::<Vec<_>>(), [0, 2, 4]);
        assert_eq!(Bundle::empty().goods().count(), 0);
        assert_eq!(Bundle::from_bits(1 << 40 | 1).goods().collect::<Vec<_>>(), [0, 40]);
        assert!(Bundle::from_bits(1 << 63).contains(63));
    }

    #[test]
    fn test_out_of_range() {
        let err = MarketError::GoodOutOfRange {
            good: MAX_GOODS,
            good_count: MAX_GOODS,
        };
        assert_eq!(Bundle::empty().checked_with(MAX_GOODS), Err(err.clone()));
        assert_eq!(Bundle::try_from_goods(&[0, MAX_GOODS]), Err(err));
        assert_eq!(Bundle::try_from_goods(&[0, 3]), Ok(Bundle::from_goods(&[0, 3])));
        assert_eq!(Bundle::singleton(2).without(70), Bundle::singleton(2));

        let items: String = ('\u{100}'..).take(MAX_GOODS + 1).collect();
        let last = items.chars().last().unwrap();
        assert!(matches!(
            Bundle::parse(&last.to_string(), &items),
            Err(MarketError::GoodOutOfRange { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "Good number out of range.")]
    fn test_with_out_of_range() {
        let _ = Bundle::empty().with(64);
    }

    #[test]
    fn test_all() {
        assert_eq!(Bundle::all(0).collect::<Vec<_>>(), [Bundle::empty()]);
        let all = Bundle::all(3).collect::<Vec<_>>();
        assert_eq!(all.len(), 8);
        assert_eq!(all[0], Bundle::empty());
        assert_eq!(all[7], Bundle::full(3));
    }

    #[test]
    fn test_display() {
        let b = Bundle::from_goods(&[0, 2]);
        assert_eq!(b.to_string(), "{0,2}");
        assert_eq!(b.to_labels("wxyz"), "wy");
        assert_eq!(Bundle::from_goods(&[0, 5]).to_labels("wxyz"), "w[5]");
        assert_eq!(Bundle::empty().to_string(), "{}");
    }
}
