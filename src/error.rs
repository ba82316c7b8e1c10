//! Error types for market construction, allocation validation and solving.

use thiserror::Error;

use super::*;

/// Errors raised by the equilibrium engine.
///
/// A market or allocation without equilibrium prices is not an error: the checker
/// and the search report it as `Ok(None)`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MarketError {
    /// The market has no agents.
    #[error("A market needs at least one agent")]
    NoAgents,

    /// More goods than a bundle bitset can hold.
    #[error("Too many goods: {count} (at most {max} are supported)")]
    TooManyGoods {
        /// Requested number of goods.
        count: usize,
        /// Supported maximum.
        max: usize,
    },

    /// Preferences and budgets are not given for the same agents.
    #[error("Number of budgets ({budgets}) does not match number of preferences ({preferences})")]
    BudgetCountMismatch {
        /// Number of budgets.
        budgets: usize,
        /// Number of preference models.
        preferences: usize,
    },

    /// A budget is NaN or infinite.
    #[error("Budget of agent {agent} is not a finite number: {value}")]
    InvalidBudget {
        /// Offending agent.
        agent: Agent,
        /// Offending value.
        value: Budget,
    },

    /// The allocation does not assign the right number of goods.
    #[error("Allocation covers {found} goods, but the market has {expected}")]
    AllocationLength {
        /// Goods in the market.
        expected: usize,
        /// Goods in the allocation.
        found: usize,
    },

    /// A good is assigned to an agent that does not exist.
    #[error("Good {good} is assigned to agent {agent}, but there are only {agent_count} agents")]
    UnknownAgent {
        /// Offending good.
        good: Good,
        /// Agent it was assigned to.
        agent: Agent,
        /// Agents in the market.
        agent_count: usize,
    },

    /// A good is not in any bundle.
    #[error("Good {good} is not allocated to any agent")]
    GoodMissing {
        /// Missing good.
        good: Good,
    },

    /// A good is in more than one bundle.
    #[error("Good {good} is allocated to more than one agent")]
    GoodDuplicated {
        /// Duplicated good.
        good: Good,
    },

    /// The allocation was built for a different number of agents.
    #[error("Allocation is for {found} agents, but the market has {expected}")]
    AgentCountMismatch {
        /// Agents in the market.
        expected: usize,
        /// Agents in the allocation.
        found: usize,
    },

    /// A bundle label does not name a good.
    #[error("Unknown good label '{label}' (goods are \"{items}\")")]
    UnknownLabel {
        /// Offending character.
        label: char,
        /// Labels of all goods.
        items: String,
    },

    /// A bundle mentions a good outside the market.
    #[error("Bundle refers to good {good}, but there are only {good_count} goods")]
    GoodOutOfRange {
        /// Offending good.
        good: Good,
        /// Goods in the market.
        good_count: usize,
    },

    /// A ranked preference lists no bundle.
    #[error("Empty preference ranking")]
    EmptyRanking,

    /// A valuation table does not have one entry per bundle.
    #[error("Valuation table has {found} entries, expected {expected}")]
    TableSize {
        /// `2^good_count`.
        expected: usize,
        /// Entries given.
        found: usize,
    },

    /// A preference model was built for a different number of goods.
    #[error("Preference of agent {agent} is defined over {found} goods, but the market has {expected}")]
    PreferenceSize {
        /// Offending agent.
        agent: Agent,
        /// Goods in the market.
        expected: usize,
        /// Goods known to the preference.
        found: usize,
    },

    /// The strict-inequality tolerance is not a positive finite number.
    #[error("Epsilon must be positive and finite, got {value}")]
    InvalidEpsilon {
        /// Offending value.
        value: f64,
    },

    /// The search would exceed the configured enumeration cap.
    #[error("Search needs {total} allocations, above the limit of {limit}")]
    EnumerationLimit {
        /// Configured cap.
        limit: usize,
        /// Allocations the search would visit, saturated at `usize::MAX`.
        total: usize,
    },

    /// The LP backend failed for a reason other than infeasibility.
    #[error("LP solver failed: {message}")]
    Solver {
        /// Backend message.
        message: String,
    },
}
