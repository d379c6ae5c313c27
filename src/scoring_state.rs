//! `ScoringState` (spec §3): per-candidate persistent data owned by a
//! single running branch rule. Shared read-only during scoring, mutated
//! only by that rule's own update paths (spec §3 Ownership, §5
//! Shared-resource policy).

use std::collections::HashMap;

use crate::host::NodeId;
use crate::types::OriginalVariableId;

/// Block-uniqueness classification a candidate carries after
/// `assignUniqueBlockFlags` (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockUniqueness {
    /// Not yet classified this call.
    #[default]
    Unknown,
    /// Not assigned to a block but directly transferred to the master.
    DirectTransfer,
    /// Belongs to exactly one pricing block.
    UniqueBlock,
    /// Classified and rejected — neither of the above qualifies.
    Unclassified,
}

/// Persistent strong-branching history for one candidate.
#[derive(Debug, Clone, Default)]
pub struct ScoringState {
    last_score: Option<f64>,
    recorded_node: Option<NodeId>,
    /// True iff every ancestor between `recorded_node` and the current
    /// node was created purely for domain reduction (spec §3, §4.4
    /// score reuse policy).
    score_recency: bool,
    n_branchings: u64,
    n_probings: u64,
    block_uniqueness: BlockUniqueness,
}

impl ScoringState {
    pub fn new() -> Self {
        ScoringState::default()
    }

    /// The last recorded strong-branching score, if any has ever been
    /// computed for this candidate (spec §8: "a candidate whose stored
    /// score equals -1 (never computed)" is `None` here).
    pub fn last_score(&self) -> Option<f64> {
        self.last_score
    }

    pub fn recorded_node(&self) -> Option<NodeId> {
        self.recorded_node
    }

    pub fn score_recency(&self) -> bool {
        self.score_recency
    }

    pub fn n_branchings(&self) -> u64 {
        self.n_branchings
    }

    pub fn n_probings(&self) -> u64 {
        self.n_probings
    }

    pub fn block_uniqueness(&self) -> BlockUniqueness {
        self.block_uniqueness
    }

    /// Records a freshly computed strong-branching score at `node`,
    /// marking it recency-valid.
    pub fn record_score(&mut self, node: NodeId, score: f64) {
        self.last_score = Some(score);
        self.recorded_node = Some(node);
        self.score_recency = true;
    }

    /// Called when an ancestor on the path from `recorded_node` to the
    /// current node turns out not to be a pure infeasibility reduction;
    /// the stored score is no longer trustworthy (spec §8 boundary
    /// behavior).
    pub fn invalidate_recency(&mut self) {
        self.score_recency = false;
    }

    pub fn increment_branching(&mut self) {
        self.n_branchings += 1;
    }

    pub fn increment_probing(&mut self) {
        self.n_probings += 1;
    }

    pub fn set_block_uniqueness(&mut self, classification: BlockUniqueness) {
        self.block_uniqueness = classification;
    }

    /// Whether a stored score can be reused without re-probing, given
    /// how many infeasibility-reduction ancestors separate the recording
    /// node from the current one and the rule's `reevalage` parameter
    /// (spec §4.4, scenario 5 in §8).
    pub fn is_score_reusable(&self, ancestors_since_recorded: u32, reevalage: u32) -> bool {
        self.score_recency && self.last_score.is_some() && ancestors_since_recorded <= reevalage
    }

    /// `(probings + branchings) / (totalBranchings + 1)`, the
    /// reliability ratio compared against `reliabilityThreshold` in
    /// §4.6.
    pub fn reliability_ratio(&self, total_branchings: u64) -> f64 {
        (self.n_probings + self.n_branchings) as f64 / (total_branchings + 1) as f64
    }
}

/// Process-wide, per-rule table of [`ScoringState`] keyed by candidate.
#[derive(Debug, Clone, Default)]
pub struct ScoringStateTable {
    states: HashMap<OriginalVariableId, ScoringState>,
}

impl ScoringStateTable {
    pub fn new() -> Self {
        ScoringStateTable {
            states: HashMap::new(),
        }
    }

    pub fn get(&self, var: OriginalVariableId) -> Option<&ScoringState> {
        self.states.get(&var)
    }

    /// Mutable entry, created with defaults on first access.
    pub fn entry_mut(&mut self, var: OriginalVariableId) -> &mut ScoringState {
        self.states.entry(var).or_default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
