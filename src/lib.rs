//! Branching core for Dantzig-Wolfe branch-and-price: strong branching
//! with pricing, Vanderbeck generic (component-bound-sequence)
//! branching, reliability pseudocost branching with probing, and the
//! node-local branch constraint stack that ties a chosen decision to
//! the B&B tree's activate/deactivate/propagate lifecycle.
//!
//! This crate owns none of the LP solver, the pricer, or the search
//! tree itself — those are supplied by a host implementing [`host::Host`].
//! `support::FixtureHost` (test-only) is the in-memory double every
//! module's tests are driven against.

pub mod decision;
pub mod error;
pub mod generic;
pub mod host;
pub mod ledger;
pub mod param;
pub mod probing;
pub mod reliability;
pub mod rule;
pub mod scorer;
pub mod scoring_state;
pub mod stack;
pub mod strong;
pub mod types;

#[cfg(test)]
pub(crate) mod support;

pub use decision::{DecisionRecord, Direction};
pub use error::{BranchingError, BranchingResult};
pub use host::Host;
pub use rule::{BranchRuleKind, RuleInput, RuleSelection};
