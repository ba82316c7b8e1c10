use std::fmt;

use serde::{Deserialize, Serialize};

use super::*;

/// Assignment of every good to exactly one agent.
///
/// Stored as the owner of each good, so the partition invariant holds by construction:
/// bundles of different agents are disjoint and their union is the set of all goods.
/// Agents may receive the empty bundle.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Allocation {
    owners: Vec<Agent>,
    agent_count: usize,
}

impl Allocation {
    fn _check_owners(owners: &[Agent], agent_count: usize) -> Result<(), MarketError> {
        if owners.len() > MAX_GOODS {
            return Err(MarketError::TooManyGoods {
                count: owners.len(),
                max: MAX_GOODS,
            });
        }
        match owners.iter().position(|&ag| ag >= agent_count) {
            Some(good) => Err(MarketError::UnknownAgent {
                good,
                agent: owners[good],
                agent_count,
            }),
            None => Ok(()),
        }
    }

    /// Builds an allocation from the owner of each good.
    pub fn new(owners: Vec<Agent>, agent_count: usize) -> Result<Self, MarketError> {
        Self::_check_owners(&owners, agent_count)?;
        Ok(Self::new_unchecked(owners, agent_count))
    }

    pub fn new_unchecked(owners: Vec<Agent>, agent_count: usize) -> Self {
        debug_assert!(
            Self::_check_owners(&owners, agent_count).is_ok(),
            "Owners should be valid agents."
        );
        Allocation { owners, agent_count }
    }

    /// Builds an allocation from one bundle per agent.
    ///
    /// Fails if a good of `0..good_count` is in no bundle, is in two bundles, or if a bundle
    /// contains a good outside the market.
    pub fn from_bundles(bundles: &[Bundle], good_count: usize) -> Result<Self, MarketError> {
        if good_count > MAX_GOODS {
            return Err(MarketError::TooManyGoods {
                count: good_count,
                max: MAX_GOODS,
            });
        }
        let mut owners: Vec<Option<Agent>> = vec![None; good_count];
        for (ag, bundle) in bundles.iter().enumerate() {
            if !bundle.fits(good_count)
                && let Some(good) = bundle.goods().find(|&g| g >= good_count)
            {
                return Err(MarketError::GoodOutOfRange { good, good_count });
            }
            for good in bundle.goods() {
                match owners.get_mut(good) {
                    None => return Err(MarketError::GoodOutOfRange { good, good_count }),
                    Some(Some(_)) => return Err(MarketError::GoodDuplicated { good }),
                    Some(owner) => *owner = Some(ag),
                }
            }
        }
        let owners = owners
            .into_iter()
            .enumerate()
            .map(|(good, owner)| owner.ok_or(MarketError::GoodMissing { good }))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new_unchecked(owners, bundles.len()))
    }

    /// Parses one labelled bundle per agent, e.g. `["wx", "yz", ""]` over the goods `"wxyz"`.
    pub fn parse<S: AsRef<str>>(bundles: &[S], items: &str) -> Result<Self, MarketError> {
        let bundles = bundles
            .iter()
            .map(|b| Bundle::parse(b.as_ref(), items))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_bundles(&bundles, items.chars().count())
    }

    /// The `index`-th allocation in enumeration order, or `None` past the last one.
    ///
    /// The owners are the digits of `index` written in base `agent_count`, with the last
    /// good as the least significant digit.
    pub fn from_index(index: usize, good_count: usize, agent_count: usize) -> Option<Self> {
        if index >= Self::count(good_count, agent_count)? {
            return None;
        }
        let mut owners = vec![0; good_count];
        let mut rest = index;
        for owner in owners.iter_mut().rev() {
            *owner = rest % agent_count;
            rest /= agent_count;
        }
        Some(Self::new_unchecked(owners, agent_count))
    }

    /// Number of allocations of `good_count` goods to `agent_count` agents, i.e.
    /// `agent_count^good_count`, or `None` if it overflows `usize`.
    pub fn count(good_count: usize, agent_count: usize) -> Option<usize> {
        agent_count.checked_pow(u32::try_from(good_count).ok()?)
    }

    /// Enumerates all allocations in a fixed order.
    pub fn enumerate(good_count: usize, agent_count: usize) -> Allocations {
        Allocations::new(good_count, agent_count)
    }

    pub fn good_count(&self) -> usize {
        self.owners.len()
    }

    pub fn agent_count(&self) -> usize {
        self.agent_count
    }

    pub fn goods(&self) -> impl Iterator<Item = Good> + use<> {
        0..self.good_count()
    }

    pub fn agents(&self) -> impl Iterator<Item = Agent> + use<> {
        0..self.agent_count()
    }

    /// Agent that receives `good`.
    pub fn owner(&self, good: Good) -> Agent {
        debug_assert!(good < self.good_count(), "Good number out of range.");
        self.owners[good]
    }

    pub fn owners(&self) -> &[Agent] {
        &self.owners
    }

    /// Bundle assigned to `ag`.
    pub fn bundle(&self, ag: Agent) -> Bundle {
        debug_assert!(ag < self.agent_count(), "Agent number out of range.");
        self.owners
            .iter()
            .enumerate()
            .filter(|&(_, &owner)| owner == ag)
            .fold(Bundle::empty(), |b, (good, _)| b.with(good))
    }

    /// Bundles of all agents, in agent order.
    pub fn bundles(&self) -> Vec<Bundle> {
        let mut res = vec![Bundle::empty(); self.agent_count()];
        for (good, &ag) in self.owners.iter().enumerate() {
            res[ag] = res[ag].with(good);
        }
        res
    }

    pub fn to_list(&self) -> Vec<Vec<Good>> {
        let mut res = vec![Vec::new(); self.agent_count()];
        for (good, &ag) in self.owners.iter().enumerate() {
            res[ag].push(good);
        }
        res
    }

    /// Bundles written with one character per good.
    pub fn to_labels(&self, items: &str) -> Vec<String> {
        self.bundles().iter().map(|b| b.to_labels(items)).collect()
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bundles: Vec<String> = self.bundles().iter().map(|b| b.to_string()).collect();
        write!(f, "[{}]", bundles.join(", "))
    }
}

/// Iterator over all allocations of a fixed number of goods to a fixed number of agents.
///
/// The allocation is a mixed-radix counter over goods: the owner of the last good changes
/// fastest. Allocation `i` of the sequence equals [`Allocation::from_index`]`(i, ..)`.
#[derive(Clone, Debug)]
pub struct Allocations {
    alloc: Allocation,
    started: bool,
    exhausted: bool,
    remaining: Option<usize>,
}

impl Allocations {
    pub fn new(good_count: usize, agent_count: usize) -> Self {
        debug_assert!(good_count <= MAX_GOODS, "Too many goods.");
        let remaining = Allocation::count(good_count, agent_count);
        Allocations {
            alloc: Allocation {
                owners: vec![0; good_count],
                agent_count,
            },
            started: false,
            exhausted: remaining == Some(0),
            remaining,
        }
    }

    fn advance(&mut self) -> bool {
        if !self.started {
            self.started = true;
            return true;
        }
        let agent_count = self.alloc.agent_count;
        for owner in self.alloc.owners.iter_mut().rev() {
            *owner += 1;
            if *owner < agent_count {
                return true;
            }
            *owner = 0;
        }
        false
    }

    /// Moves to the next allocation and lends it, avoiding a clone.
    pub fn next_lending(&mut self) -> Option<&Allocation> {
        if self.exhausted {
            return None;
        }
        if self.advance() {
            self.remaining = self.remaining.map(|r| r - 1);
            Some(&self.alloc)
        } else {
            self.exhausted = true;
            None
        }
    }
}

impl Iterator for Allocations {
    type Item = Allocation;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_lending().cloned()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.remaining {
            Some(r) => (r, Some(r)),
            None => (usize::MAX, None),
        }
    }
}

impl std::iter::FusedIterator for Allocations {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::LazyLock;

    static ALLOC1: LazyLock<Allocation> = LazyLock::new(|| Allocation::new(vec![0, 1, 0], 3).unwrap());

    fn owners(it: impl Iterator<Item = Allocation>) -> Vec<Vec<Agent>> {
        it.map(|a| a.owners().to_vec()).collect()
    }

    #[test]
    fn test_accessors() {
        assert_eq!(ALLOC1.good_count(), 3);
        assert_eq!(ALLOC1.agent_count(), 3);
        assert_eq!(ALLOC1.owner(1), 1);
        assert_eq!(ALLOC1.bundle(0), Bundle::from_goods(&[0, 2]));
        assert_eq!(ALLOC1.bundle(2), Bundle::empty());
        assert_eq!(
            ALLOC1.bundles(),
            [Bundle::from_goods(&[0, 2]), Bundle::singleton(1), Bundle::empty()]
        );
        assert_eq!(ALLOC1.to_list(), vec![vec![0, 2], vec![1], vec![]]);
        assert_eq!(ALLOC1.to_labels("xyz"), ["xz", "y", ""]);
        assert_eq!(ALLOC1.to_string(), "[{0,2}, {1}, {}]");
    }

    #[test]
    fn test_new_rejects_unknown_agent() {
        assert_eq!(
            Allocation::new(vec![0, 2], 2),
            Err(MarketError::UnknownAgent {
                good: 1,
                agent: 2,
                agent_count: 2
            })
        );
    }

    #[test]
    fn test_from_bundles() {
        let bundles = [Bundle::from_goods(&[0, 2]), Bundle::singleton(1), Bundle::empty()];
        assert_eq!(Allocation::from_bundles(&bundles, 3).as_ref(), Ok(&*ALLOC1));
        assert_eq!(Allocation::parse(&["xz", "y", ""], "xyz").as_ref(), Ok(&*ALLOC1));

        assert_eq!(
            Allocation::from_bundles(&[Bundle::singleton(0), Bundle::empty()], 2),
            Err(MarketError::GoodMissing { good: 1 })
        );
        assert_eq!(
            Allocation::from_bundles(&[Bundle::full(2), Bundle::singleton(1)], 2),
            Err(MarketError::GoodDuplicated { good: 1 })
        );
        assert_eq!(
            Allocation::from_bundles(&[Bundle::full(3)], 2),
            Err(MarketError::GoodOutOfRange { good: 2, good_count: 2 })
        );
        assert_eq!(
            Allocation::from_bundles(&[Bundle::from_bits(0b11 | 1 << 40)], 2),
            Err(MarketError::GoodOutOfRange { good: 40, good_count: 2 })
        );
    }

    #[test]
    fn test_count() {
        assert_eq!(Allocation::count(3, 2), Some(8));
        assert_eq!(Allocation::count(0, 4), Some(1));
        assert_eq!(Allocation::count(4, 0), Some(0));
        assert_eq!(Allocation::count(32, 1 << 20), None);
    }

    #[test]
    fn test_enumerate_order() {
        assert_eq!(
            owners(Allocation::enumerate(2, 3)),
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2],
                vec![2, 0],
                vec![2, 1],
                vec![2, 2],
            ]
        );
        assert_eq!(owners(Allocation::enumerate(3, 1)), vec![vec![0, 0, 0]]);
        assert_eq!(owners(Allocation::enumerate(0, 2)), vec![Vec::<Agent>::new()]);
        assert_eq!(Allocation::enumerate(2, 0).count(), 0);
    }

    #[test]
    fn test_enumerate_is_fused_and_sized() {
        let mut it = Allocation::enumerate(2, 2);
        assert_eq!(it.size_hint(), (4, Some(4)));
        it.next();
        assert_eq!(it.size_hint(), (3, Some(3)));
        assert_eq!(it.by_ref().count(), 3);
        assert!(it.next().is_none());
        assert!(it.next_lending().is_none());
    }

    #[test]
    fn test_enumerate_partition_invariant() {
        for (good_count, agent_count) in [(4, 3), (3, 4), (5, 2)] {
            let all = Allocation::enumerate(good_count, agent_count).collect::<Vec<_>>();
            assert_eq!(Some(all.len()), Allocation::count(good_count, agent_count));
            for alloc in &all {
                let bundles = alloc.bundles();
                assert_eq!(bundles.len(), agent_count);
                let union = bundles.iter().fold(Bundle::empty(), |u, &b| u.union(b));
                assert_eq!(union, Bundle::full(good_count));
                let total: usize = bundles.iter().map(|b| b.len()).sum();
                assert_eq!(total, good_count);
            }
            let mut sorted = all.clone();
            sorted.sort_by(|a, b| a.owners().cmp(b.owners()));
            sorted.dedup();
            assert_eq!(sorted.len(), all.len());
        }
    }

    #[test]
    fn test_from_index_matches_enumeration() {
        for (i, alloc) in Allocation::enumerate(4, 3).enumerate() {
            assert_eq!(Allocation::from_index(i, 4, 3), Some(alloc));
        }
        assert_eq!(Allocation::from_index(81, 4, 3), None);
    }
}
