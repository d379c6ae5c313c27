//! Error taxonomy for the branching core (spec §7).

use std::fmt;

/// Distinct failure kinds the branching core can signal to its host.
///
/// Each variant has its own propagation policy, documented on the variant
/// itself; see spec §7 for the full table.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchingError {
    /// The current node (or a child under construction) is proven
    /// infeasible by probing or propagation. Surfaced to the host as a
    /// cutoff; scores and ledgers for the call are discarded.
    Infeasible,
    /// Two probes proved mutually exclusive bounds on the same variable.
    /// Surfaced the same way as `Infeasible`.
    ContradictoryBound { variable: crate::types::OriginalVariableId },
    /// No valid branching entity exists (e.g. every candidate is
    /// continuous, or all candidates were filtered out). The host should
    /// try the next branching rule.
    NoCandidate,
    /// The probing LP did not converge. Treated like `NoCandidate` for
    /// the current call, except the candidate that triggered it is
    /// dropped rather than the whole call failing, unless it recurs.
    LpError,
    /// The host signalled an interrupt or a time limit during phase
    /// execution. No partial decision is committed.
    Stopped,
    /// An internal consistency check on a `DecisionRecord` failed. Not
    /// recoverable.
    MalformedDecision(String),
}

impl fmt::Display for BranchingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchingError::Infeasible => write!(f, "node proven infeasible"),
            BranchingError::ContradictoryBound { variable } => {
                write!(f, "contradictory bounds proven on variable {variable:?}")
            }
            BranchingError::NoCandidate => write!(f, "no valid branching candidate"),
            BranchingError::LpError => write!(f, "probing LP did not converge"),
            BranchingError::Stopped => write!(f, "host signalled stop"),
            BranchingError::MalformedDecision(msg) => write!(f, "malformed decision: {msg}"),
        }
    }
}

impl std::error::Error for BranchingError {}

/// The outward-facing result of a branching call, independent of the
/// `Result<_, BranchingError>` used for fallible internal plumbing.
///
/// Mirrors the shape of the teacher's `branchrule::BranchingResult`, but
/// extended with the domain-reduction and generic-branching outcomes this
/// core needs (spec §7).
#[derive(Debug, Clone, PartialEq)]
pub enum BranchingResult {
    /// The rule did not run; the host should try another rule.
    DidNotRun,
    /// The current node was cut off.
    CutOff,
    /// Bound tightenings were applied to the current node; the host
    /// should re-solve the LP instead of branching.
    ReducedDomain { n_changes: usize },
    /// A two-or-more-child branching decision was committed.
    Branched,
}

impl From<&BranchingError> for BranchingResult {
    fn from(err: &BranchingError) -> Self {
        match err {
            BranchingError::Infeasible | BranchingError::ContradictoryBound { .. } => {
                BranchingResult::CutOff
            }
            BranchingError::NoCandidate | BranchingError::LpError | BranchingError::Stopped => {
                BranchingResult::DidNotRun
            }
            BranchingError::MalformedDecision(msg) => {
                panic!("malformed decision is not recoverable: {msg}")
            }
        }
    }
}
