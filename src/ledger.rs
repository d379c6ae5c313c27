//! `BoundChangeLedger` (spec §4.1): accumulates bound changes discovered
//! during probing, rejects contradictory changes, and applies them to a
//! node at the end of a branching attempt.

use std::collections::HashMap;

use crate::error::BranchingError;
use crate::host::{BoundKind, Host, NodeId};
use crate::types::OriginalVariableId;

#[derive(Debug, Clone, Copy)]
struct Entry {
    lb: f64,
    ub: f64,
    infeasible_rounding: bool,
}

/// Accumulates tightened bounds for a set of variables across one
/// branching attempt.
///
/// Invariant: a stored lower bound only increases and a stored upper
/// bound only decreases (monotone `add`); `infeasible_rounding` is set
/// only when probing one direction of that variable proved infeasible.
#[derive(Debug, Clone, Default)]
pub struct BoundChangeLedger {
    entries: HashMap<OriginalVariableId, Entry>,
    n_changes: usize,
}

impl BoundChangeLedger {
    /// Initializes an empty ledger. `variables` seeds entries with their
    /// current bounds; the spec permits the ledger to grow beyond this
    /// initial set (§9 design notes), so `variables` need not be
    /// exhaustive — it exists purely to record starting bounds so `add`
    /// can tell "tightened" from "no change".
    pub fn new(variables: impl IntoIterator<Item = (OriginalVariableId, f64, f64)>) -> Self {
        let entries = variables
            .into_iter()
            .map(|(var, lb, ub)| {
                (
                    var,
                    Entry {
                        lb,
                        ub,
                        infeasible_rounding: false,
                    },
                )
            })
            .collect();
        BoundChangeLedger {
            entries,
            n_changes: 0,
        }
    }

    /// Number of successful `add` calls so far.
    pub fn n_changes(&self) -> usize {
        self.n_changes
    }

    pub fn is_empty(&self) -> bool {
        self.n_changes == 0
    }

    /// Tightens the stored bound of `var`. New variables are appended
    /// on first mention, seeded at `(-inf, +inf)`, growing the ledger
    /// without invalidating existing entries.
    ///
    /// Returns `Err(BranchingError::ContradictoryBound)` if the new
    /// lower bound would exceed the stored upper bound, or vice versa —
    /// this is global infeasibility at the current node and the caller
    /// must cut the node off.
    pub fn add(
        &mut self,
        var: OriginalVariableId,
        kind: BoundKind,
        bound: f64,
        from_infeasible_rounding: bool,
    ) -> Result<(), BranchingError> {
        let entry = self.entries.entry(var).or_insert(Entry {
            lb: f64::NEG_INFINITY,
            ub: f64::INFINITY,
            infeasible_rounding: false,
        });

        let (new_lb, new_ub) = match kind {
            BoundKind::Lower => (entry.lb.max(bound), entry.ub),
            BoundKind::Upper => (entry.lb, entry.ub.min(bound)),
        };
        if new_lb > new_ub {
            return Err(BranchingError::ContradictoryBound { variable: var });
        }
        entry.lb = new_lb;
        entry.ub = new_ub;
        if from_infeasible_rounding {
            entry.infeasible_rounding = true;
        }
        self.n_changes += 1;
        Ok(())
    }

    /// Whether probing one direction of `var` proved infeasible,
    /// forcing this ledger's bound on it.
    pub fn is_infeasible_rounding(&self, var: OriginalVariableId) -> bool {
        self.entries
            .get(&var)
            .map(|e| e.infeasible_rounding)
            .unwrap_or(false)
    }

    /// Applies every stored bound that is tighter than `node`'s current
    /// local bound, issuing the corresponding permanent host bound
    /// change (spec §4.1 `apply`: this installs a real node domain
    /// reduction, not a probing-scoped one). Returns the number of
    /// changes actually applied.
    pub fn apply(&self, host: &mut dyn Host, node: NodeId) -> usize {
        let mut applied = 0;
        for (&var, entry) in self.entries.iter() {
            let cur_lb = host.var_lb_local(var);
            let cur_ub = host.var_ub_local(var);
            if entry.lb > cur_lb {
                host.chg_var_bound_node(node, var, BoundKind::Lower, entry.lb);
                applied += 1;
            }
            if entry.ub < cur_ub {
                host.chg_var_bound_node(node, var, BoundKind::Upper, entry.ub);
                applied += 1;
            }
        }
        applied
    }
}
