//! `DecisionRecord` (spec §3, §4.8): per-child branch data, serialization
//! free, with the invariants spec §4.8 requires enforced at
//! construction rather than left to callers to remember.

use crate::error::BranchingError;
use crate::host::ConsId;
use crate::types::{ComponentBoundSequence, OriginalVariableId};

/// Direction of a [`DecisionRecord::SingleVariable`] child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Down,
    Up,
}

/// Per-child branch data (spec §3 variants).
#[derive(Debug, Clone, PartialEq)]
pub enum DecisionRecord {
    /// A single-variable down/up split.
    SingleVariable {
        variable: OriginalVariableId,
        branching_value: f64,
        direction: Direction,
    },
    /// A Ryan-Foster same/differ pair split.
    RyanFosterPair {
        var1: OriginalVariableId,
        var2: OriginalVariableId,
        same: bool,
        block: usize,
        induced_pricing_cons: Option<ConsId>,
    },
    /// A Vanderbeck generic-branching child.
    GenericChild {
        block: usize,
        sequence: ComponentBoundSequence,
        lhs: f64,
        induced_master_cons: Option<ConsId>,
        /// Prior-sequence list `C` used by `Explore` during propagation
        /// of descendants, if this child was produced under an already
        /// active generic branching.
        prior_sequences: Option<Vec<ComponentBoundSequence>>,
    },
}

impl DecisionRecord {
    /// Builds a [`DecisionRecord::SingleVariable`], checked against spec
    /// §4.8's invariant that the variable is integer-typed and
    /// fractional in the current LP solution.
    pub fn single_variable(
        variable: OriginalVariableId,
        branching_value: f64,
        direction: Direction,
        is_integral: bool,
    ) -> Result<Self, BranchingError> {
        if !is_integral {
            return Err(BranchingError::MalformedDecision(
                "SingleVariable branching candidate must be integer-typed".into(),
            ));
        }
        let frac = branching_value - branching_value.floor();
        if frac <= 0.0 || frac >= 1.0 {
            return Err(BranchingError::MalformedDecision(
                "SingleVariable branching candidate must be fractional".into(),
            ));
        }
        Ok(DecisionRecord::SingleVariable {
            variable,
            branching_value,
            direction,
        })
    }

    /// Builds a [`DecisionRecord::RyanFosterPair`], checked against spec
    /// §4.8's invariant that the two variables are distinct and belong
    /// to the same pricing block.
    pub fn ryan_foster_pair(
        var1: OriginalVariableId,
        var2: OriginalVariableId,
        same: bool,
        block: usize,
    ) -> Result<Self, BranchingError> {
        if var1 == var2 {
            return Err(BranchingError::MalformedDecision(
                "RyanFosterPair requires two distinct variables".into(),
            ));
        }
        Ok(DecisionRecord::RyanFosterPair {
            var1,
            var2,
            same,
            block,
            induced_pricing_cons: None,
        })
    }

    /// Builds a [`DecisionRecord::GenericChild`], checked against spec
    /// §4.8's invariant that the sequence is non-empty.
    pub fn generic_child(
        block: usize,
        sequence: ComponentBoundSequence,
        lhs: f64,
        prior_sequences: Option<Vec<ComponentBoundSequence>>,
    ) -> Result<Self, BranchingError> {
        if sequence.is_empty() {
            return Err(BranchingError::MalformedDecision(
                "GenericChild requires a non-empty component-bound sequence".into(),
            ));
        }
        Ok(DecisionRecord::GenericChild {
            block,
            sequence,
            lhs,
            induced_master_cons: None,
            prior_sequences,
        })
    }
}
