//! `NodeBranchStack` (spec §4.7): per-node constraint pairing a
//! [`DecisionRecord`] with activation/deactivation/propagation hooks,
//! plus cross-problem (master/origin) mirroring and tree navigation.
//!
//! Grounded on the teacher's `Conshdlr` trait (activate/deactivate
//! paired by node focus) and `Node` parent-link navigation; node-local
//! rule-private data is attached the way the teacher's optional
//! `datastore` feature attaches arbitrary per-model state via
//! `anymap3`.

use std::collections::HashSet;

use crate::decision::{DecisionRecord, Direction};
use crate::error::BranchingError;
use crate::generic;
use crate::host::{BoundKind, ConsFlags, ConsId, Host, NodeId};
use crate::types::MasterVariableId;

const EPS: f64 = 1e-6;

/// Which engine produced the [`DecisionRecord`] a stack entry carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchRuleTag {
    Strong,
    Generic,
    Reliability,
    RyanFoster,
}

/// Opaque handle into a [`NodeBranchStack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackHandle(pub u64);

/// Outcome of [`NodeBranchStack::propagate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagateResult {
    Cutoff,
    ReducedDom { n_changes: usize },
    DidNotFind,
}

struct StackEntry {
    node: NodeId,
    parent: Option<StackHandle>,
    children: Vec<StackHandle>,
    rule: BranchRuleTag,
    decision: DecisionRecord,
    cons: Option<ConsId>,
    /// `(variable, kind, prior bound)` to restore on deactivation, for
    /// `SingleVariable` decisions only.
    restore: Option<(crate::types::OriginalVariableId, BoundKind, f64)>,
    /// Columns already fixed by a Ryan-Foster propagate pass, so repeat
    /// calls do not re-add the same coefficient.
    fixed_columns: HashSet<MasterVariableId>,
    mirror: Option<StackHandle>,
    active: bool,
    #[cfg(feature = "datastore")]
    rule_data: anymap3::AnyMap,
}

/// Per-node branch-constraint stack, LIFO with respect to tree
/// traversal (spec §5 ordering guarantees).
#[derive(Default)]
pub struct NodeBranchStack {
    entries: Vec<StackEntry>,
    active_chain: Vec<StackHandle>,
}

impl NodeBranchStack {
    pub fn new() -> Self {
        NodeBranchStack {
            entries: Vec::new(),
            active_chain: Vec::new(),
        }
    }

    /// `create(node, parentStack, branchRule, decisionData)`.
    pub fn create(&mut self, node: NodeId, parent: Option<StackHandle>, rule: BranchRuleTag, decision: DecisionRecord) -> StackHandle {
        let handle = StackHandle(self.entries.len() as u64);
        self.entries.push(StackEntry {
            node,
            parent,
            children: Vec::new(),
            rule,
            decision,
            cons: None,
            restore: None,
            fixed_columns: HashSet::new(),
            mirror: None,
            active: false,
            #[cfg(feature = "datastore")]
            rule_data: anymap3::AnyMap::new(),
        });
        if let Some(p) = parent {
            self.entries[p.0 as usize].children.push(handle);
        }
        handle
    }

    /// Links `a` and `b` as each other's cross-problem mirror (spec
    /// §4.7 "cross-problem mirroring"): origin-side and master-side
    /// handles created for the same branching decision.
    pub fn link_mirror(&mut self, a: StackHandle, b: StackHandle) {
        self.entries[a.0 as usize].mirror = Some(b);
        self.entries[b.0 as usize].mirror = Some(a);
    }

    pub fn mirror(&self, handle: StackHandle) -> Option<StackHandle> {
        self.entries[handle.0 as usize].mirror
    }

    pub fn node(&self, handle: StackHandle) -> NodeId {
        self.entries[handle.0 as usize].node
    }

    pub fn parent(&self, handle: StackHandle) -> Option<StackHandle> {
        self.entries[handle.0 as usize].parent
    }

    pub fn first_child(&self, handle: StackHandle) -> Option<StackHandle> {
        self.entries[handle.0 as usize].children.first().copied()
    }

    pub fn second_child(&self, handle: StackHandle) -> Option<StackHandle> {
        self.entries[handle.0 as usize].children.get(1).copied()
    }

    pub fn all_children(&self, handle: StackHandle) -> &[StackHandle] {
        &self.entries[handle.0 as usize].children
    }

    /// `getActiveCons`: the handle at the top of the active chain, i.e.
    /// the one materialized for the current focus node.
    pub fn active(&self) -> Option<StackHandle> {
        self.active_chain.last().copied()
    }

    pub fn is_active(&self, handle: StackHandle) -> bool {
        self.entries[handle.0 as usize].active
    }

    pub fn active_cons(&self, handle: StackHandle) -> Option<ConsId> {
        self.entries[handle.0 as usize].cons
    }

    pub fn decision(&self, handle: StackHandle) -> &DecisionRecord {
        &self.entries[handle.0 as usize].decision
    }

    pub fn rule(&self, handle: StackHandle) -> BranchRuleTag {
        self.entries[handle.0 as usize].rule
    }

    /// `(block, sequence, lhs)` of every active `GenericChild` decision
    /// on the active chain, root-to-focus order — the ancestor list
    /// [`generic::GenericBranchingEngine::branch`] needs for dominance
    /// pruning and for choosing `Explore` over `Separate`.
    pub fn generic_ancestors(&self) -> Vec<(usize, crate::types::ComponentBoundSequence, f64)> {
        self.active_chain
            .iter()
            .filter_map(|&h| match &self.entries[h.0 as usize].decision {
                DecisionRecord::GenericChild { block, sequence, lhs, .. } => Some((*block, sequence.clone(), *lhs)),
                _ => None,
            })
            .collect()
    }

    /// `(block, sequence, inducedCons)` of every active `GenericChild`
    /// decision that has materialized its induced master constraint —
    /// the `active_chain` argument `eventExecGenericbranchvaradd`
    /// ([`generic::on_master_variable_added`]) needs when pricing
    /// creates a new master variable.
    pub fn generic_active_chain(&self) -> Vec<(usize, crate::types::ComponentBoundSequence, ConsId)> {
        self.active_chain
            .iter()
            .filter_map(|&h| {
                let entry = &self.entries[h.0 as usize];
                let cons = entry.cons?;
                match &entry.decision {
                    DecisionRecord::GenericChild { block, sequence, .. } => Some((*block, sequence.clone(), cons)),
                    _ => None,
                }
            })
            .collect()
    }

    #[cfg(feature = "datastore")]
    pub fn attach_data<T: 'static>(&mut self, handle: StackHandle, data: T) {
        self.entries[handle.0 as usize].rule_data.insert(data);
    }

    #[cfg(feature = "datastore")]
    pub fn data<T: 'static>(&self, handle: StackHandle) -> Option<&T> {
        self.entries[handle.0 as usize].rule_data.get::<T>()
    }

    #[cfg(feature = "datastore")]
    pub fn data_mut<T: 'static>(&mut self, handle: StackHandle) -> Option<&mut T> {
        self.entries[handle.0 as usize].rule_data.get_mut::<T>()
    }

    /// `activate(handle)`: materializes the induced master constraint
    /// (if any) and installs the variable bound changes implied by the
    /// decision. Fails with `ContradictoryBound` if the resulting
    /// bounds are empty.
    pub fn activate(&mut self, handle: StackHandle, host: &mut dyn Host) -> Result<(), BranchingError> {
        let decision = self.entries[handle.0 as usize].decision.clone();
        match decision {
            DecisionRecord::SingleVariable {
                variable,
                branching_value,
                direction,
            } => {
                let (kind, prior, bound) = match direction {
                    Direction::Down => (BoundKind::Upper, host.var_ub_local(variable), branching_value.floor()),
                    Direction::Up => (BoundKind::Lower, host.var_lb_local(variable), branching_value.ceil()),
                };
                self.entries[handle.0 as usize].restore = Some((variable, kind, prior));
                host.chg_var_bound_probing(variable, kind, bound);
                if host.var_lb_local(variable) > host.var_ub_local(variable) + EPS {
                    return Err(BranchingError::ContradictoryBound { variable });
                }
            }
            DecisionRecord::GenericChild { .. } => {
                let cons = generic::activate(host, &self.entries[handle.0 as usize].decision)?;
                self.entries[handle.0 as usize].cons = Some(cons);
            }
            DecisionRecord::RyanFosterPair { .. } => {
                // the fixing constraint is created lazily the first time
                // `propagate` finds a contradicting column.
            }
        }
        self.entries[handle.0 as usize].active = true;
        self.active_chain.push(handle);
        Ok(())
    }

    /// `deactivate(handle)`: removes the induced constraint from the
    /// local active set and undoes any bound change pushed by
    /// `activate`.
    pub fn deactivate(&mut self, handle: StackHandle, host: &mut dyn Host) {
        let idx = handle.0 as usize;
        if let Some((variable, kind, prior)) = self.entries[idx].restore.take() {
            host.chg_var_bound_probing(variable, kind, prior);
        }
        if let Some(cons) = self.entries[idx].cons {
            generic::deactivate(host, cons);
        }
        self.entries[idx].active = false;
        self.active_chain.retain(|h| *h != handle);
    }

    /// `propagate(handle)`. Ryan-Foster fixes the upper bound (to zero,
    /// via a lazily-materialized `Σ 1·m <= 0` constraint) of every
    /// master variable in the pair's block whose column contradicts the
    /// same/differ requirement; generic and single-variable decisions
    /// have nothing further to propagate.
    pub fn propagate(&mut self, handle: StackHandle, host: &mut dyn Host) -> Result<PropagateResult, BranchingError> {
        let idx = handle.0 as usize;
        let decision = self.entries[idx].decision.clone();
        let DecisionRecord::RyanFosterPair { var1, var2, same, block, .. } = decision else {
            return Ok(PropagateResult::DidNotFind);
        };

        let cons = match self.entries[idx].cons {
            Some(c) => c,
            None => {
                let c = host.create_cons_linear(
                    "ryanfosterfix",
                    0.0,
                    0.0,
                    ConsFlags {
                        modifiable: true,
                        removable: true,
                    },
                );
                host.add_cons(c);
                self.entries[idx].cons = Some(c);
                if let DecisionRecord::RyanFosterPair { induced_pricing_cons, .. } = &mut self.entries[idx].decision {
                    *induced_pricing_cons = Some(c);
                }
                c
            }
        };

        let mut n_fixed = 0;
        for mvar in host.master_variables_in_block(block) {
            if self.entries[idx].fixed_columns.contains(&mvar) {
                continue;
            }
            let info = host.master_variable_info(mvar);
            let c1 = info.coefficients.iter().any(|(v, c)| *v == var1 && c.abs() > EPS);
            let c2 = info.coefficients.iter().any(|(v, c)| *v == var2 && c.abs() > EPS);
            let contradicts = if same { c1 != c2 } else { c1 && c2 };
            if contradicts {
                host.add_coef_linear(cons, mvar, 1.0);
                self.entries[idx].fixed_columns.insert(mvar);
                n_fixed += 1;
            }
        }

        if n_fixed > 0 {
            Ok(PropagateResult::ReducedDom { n_changes: n_fixed })
        } else {
            Ok(PropagateResult::DidNotFind)
        }
    }

    /// `destroy(handle)`: releases the induced constraint and drops the
    /// decision data. The arena slot itself is retained so sibling
    /// navigation through already-visited handles remains valid.
    pub fn destroy(&mut self, handle: StackHandle, host: &mut dyn Host) {
        let idx = handle.0 as usize;
        if let Some(cons) = self.entries[idx].cons.take() {
            host.release_cons(cons);
        }
        self.active_chain.retain(|h| *h != handle);
    }
}
