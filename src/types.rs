/// Good identifier, an index in `0..good_count`.
pub type Good = usize;
/// Agent identifier, an index in `0..agent_count`.
pub type Agent = usize;
/// Budget of a single agent. Negative budgets are used for chores.
pub type Budget = f64;
/// Price of a single good.
pub type Price = f64;
/// Utility an agent assigns to a bundle.
pub type Valuation = f64;

/// Largest number of goods a market may contain. Bundles are stored as bitsets and
/// every check walks all `2^good_count` subsets.
pub const MAX_GOODS: usize = 32;
