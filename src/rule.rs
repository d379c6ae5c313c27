//! `BranchRuleKind` (spec §9 design notes): the branching rules as a
//! tagged variant rather than a function-pointer table. `NodeBranchStack`
//! dispatches on the tag to an inherent method; each variant owns its
//! `DecisionRecord` shape directly (no common base type).
//!
//! Grounded on the teacher's `BranchRule` trait (one object-safe trait
//! implemented per rule) generalized here into a closed enum, since the
//! rule set is fixed by this crate rather than open for third-party
//! plugins; `other_examples`'s CP brancher (`huub`) confirms a tagged
//! dispatch list is idiomatic for a small, closed set of strategies.

use crate::decision::DecisionRecord;
use crate::error::BranchingError;
use crate::generic::GenericBranchingEngine;
use crate::host::{Candidate, Host};
use crate::reliability::{ReliabilityParams, ReliabilityProbingEngine, ReliabilityResult};
use crate::strong::{OriginalSelection, RyanFosterSelection, StrongBranchingEngine, StrongBranchingParams};

/// The outcome of running a rule through [`BranchRuleKind::select`].
#[derive(Debug)]
pub enum RuleSelection {
    Original(OriginalSelection),
    RyanFoster(RyanFosterSelection),
    Generic(Vec<DecisionRecord>),
    Reliability(ReliabilityResult),
}

/// A branching rule, tagged by which engine backs it.
pub enum BranchRuleKind {
    StrongBranching(StrongBranchingEngine),
    RyanFoster(StrongBranchingEngine),
    Generic(GenericBranchingEngine),
    ReliabilityProbing(ReliabilityProbingEngine),
}

impl BranchRuleKind {
    pub fn strong_branching(params: StrongBranchingParams) -> Self {
        BranchRuleKind::StrongBranching(StrongBranchingEngine::new(params))
    }

    pub fn ryan_foster(params: StrongBranchingParams) -> Self {
        BranchRuleKind::RyanFoster(StrongBranchingEngine::new(params))
    }

    pub fn generic() -> Self {
        BranchRuleKind::Generic(GenericBranchingEngine::new())
    }

    pub fn reliability_probing(params: ReliabilityParams) -> Self {
        BranchRuleKind::ReliabilityProbing(ReliabilityProbingEngine::new(params))
    }

    /// Dispatches to the owned engine's selection entry point. The
    /// caller provides whatever extra arguments that engine's variant
    /// needs (a pricing gap for strong branching, Ryan-Foster pair
    /// candidates, a block index for generic branching, or a depth /
    /// branching count for reliability probing) via `RuleInput`.
    pub fn select(&mut self, host: &mut dyn Host, input: RuleInput) -> Result<RuleSelection, BranchingError> {
        match (self, input) {
            (BranchRuleKind::StrongBranching(engine), RuleInput::Strong { gap }) => {
                engine.select_original(host, gap).map(RuleSelection::Original)
            }
            (BranchRuleKind::RyanFoster(engine), RuleInput::RyanFoster { pairs }) => {
                engine.select_ryan_foster(host, &pairs).map(RuleSelection::RyanFoster)
            }
            (BranchRuleKind::Generic(engine), RuleInput::Generic { block, ancestors }) => {
                engine.branch(host, block, &ancestors).map(RuleSelection::Generic)
            }
            (BranchRuleKind::ReliabilityProbing(engine), RuleInput::Reliability { candidates, depth, total_branchings }) => {
                engine.select(host, &candidates, depth, total_branchings).map(RuleSelection::Reliability)
            }
            _ => Err(BranchingError::MalformedDecision(
                "RuleInput variant does not match the BranchRuleKind it was dispatched to".into(),
            )),
        }
    }
}

/// Per-rule extra arguments for [`BranchRuleKind::select`], mirroring
/// each engine's own `select*`/`branch` signature.
pub enum RuleInput {
    Strong { gap: f64 },
    RyanFoster { pairs: Vec<(crate::types::OriginalVariableId, crate::types::OriginalVariableId, usize)> },
    Generic {
        block: usize,
        /// Active generic-branching ancestors on the current root-to-
        /// focus path, as `(block, sequence, lhs)` — see
        /// [`crate::generic::GenericBranchingEngine::branch`].
        ancestors: Vec<(usize, crate::types::ComponentBoundSequence, f64)>,
    },
    Reliability { candidates: Vec<Candidate>, depth: u32, total_branchings: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::support::FixtureHost;

    #[test]
    fn strong_branching_tag_dispatches_to_its_engine() {
        let mut host = FixtureHost::new();
        let x = host.add_integer_var(0.0, 10.0);
        host.set_sol_val(x, 3.5);

        let mut rule = BranchRuleKind::strong_branching(StrongBranchingParams::default());
        let result = rule.select(&mut host, RuleInput::Strong { gap: 0.5 });
        assert!(matches!(result, Ok(RuleSelection::Original(_))));
    }

    #[test]
    fn mismatched_input_is_malformed() {
        let mut host = FixtureHost::new();
        let mut rule = BranchRuleKind::generic();
        let err = rule.select(&mut host, RuleInput::Strong { gap: 0.0 }).unwrap_err();
        assert!(matches!(err, BranchingError::MalformedDecision(_)));
    }
}
