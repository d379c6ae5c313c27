//! In-memory [`Host`] test double (`#[cfg(test)]` only).
//!
//! Plays the role the teacher crate gives `data/test/*.mps` plus a real
//! SCIP instance: every engine's unit tests build one of these and drive
//! it exactly like the teacher drives a `Model<Solving>` in its
//! `#[cfg(test)]` modules (see `SPEC_FULL.md` §0/§1).

#![cfg(test)]

use std::collections::HashMap;

use crate::host::{
    BoundKind, Candidate, ConsFlags, ConsId, Host, MasterVariableInfo, NodeId, PropagateOutcome,
    ProbingLpOutcome,
};
use crate::types::{BlockAssignment, MasterVariableId, OriginalVariableId, VarKind};

#[derive(Clone)]
struct VarRec {
    kind: VarKind,
    lb: f64,
    ub: f64,
    global_lb: f64,
    global_ub: f64,
    sol_val: f64,
    pseudocost: f64,
    conflict: f64,
    conflictlength: f64,
    inference: f64,
    cutoff: f64,
    block: BlockAssignment,
}

struct MasterVarRec {
    block: Option<usize>,
    is_ray: bool,
    coefficients: Vec<(OriginalVariableId, f64)>,
    lp_value: f64,
}

struct ConsRec {
    name: String,
    lhs: f64,
    rhs: f64,
    #[allow(dead_code)]
    flags: ConsFlags,
    coefs: Vec<(MasterVariableId, f64)>,
    active: bool,
}

struct NodeRec {
    parent: Option<NodeId>,
    lower_bound: f64,
    infeasible: bool,
    reduction_only: bool,
}

/// A minimal, fully scripted `Host`. Every piece of state an engine
/// might query is explicit and settable from a test, instead of being
/// derived by solving anything — there is no LP solver behind this.
pub struct FixtureHost {
    vars: Vec<VarRec>,
    master_vars: Vec<MasterVarRec>,
    conss: HashMap<u64, ConsRec>,
    name_index: HashMap<String, ConsId>,
    next_cons_id: u64,
    nodes: Vec<NodeRec>,
    focus: NodeId,
    upper_bound: f64,
    identical_blocks: HashMap<usize, usize>,
    master_set_covering: bool,
    master_set_partitioning: bool,

    in_probing: bool,
    pre_probing_bounds: Vec<(f64, f64)>,
    last_probing_change: Option<(OriginalVariableId, BoundKind, f64)>,
    probe_script: HashMap<(OriginalVariableId, bool), ProbingLpOutcome>,
    next_probing_lp_error: bool,
    stopped: bool,
}

impl FixtureHost {
    pub fn new() -> Self {
        FixtureHost {
            vars: Vec::new(),
            master_vars: Vec::new(),
            conss: HashMap::new(),
            name_index: HashMap::new(),
            next_cons_id: 0,
            nodes: vec![NodeRec {
                parent: None,
                lower_bound: 0.0,
                infeasible: false,
                reduction_only: false,
            }],
            focus: NodeId(0),
            upper_bound: f64::INFINITY,
            identical_blocks: HashMap::new(),
            master_set_covering: false,
            master_set_partitioning: false,
            in_probing: false,
            pre_probing_bounds: Vec::new(),
            last_probing_change: None,
            probe_script: HashMap::new(),
            next_probing_lp_error: false,
            stopped: false,
        }
    }

    fn push_var(&mut self, kind: VarKind, lb: f64, ub: f64) -> OriginalVariableId {
        let id = OriginalVariableId(self.vars.len() as u32);
        self.vars.push(VarRec {
            kind,
            lb,
            ub,
            global_lb: lb,
            global_ub: ub,
            sol_val: (lb + ub) / 2.0,
            pseudocost: 1.0,
            conflict: 0.0,
            conflictlength: 0.0,
            inference: 0.0,
            cutoff: 0.0,
            block: BlockAssignment::None,
        });
        id
    }

    pub fn add_integer_var(&mut self, lb: f64, ub: f64) -> OriginalVariableId {
        self.push_var(VarKind::Integer, lb, ub)
    }

    pub fn add_binary_var(&mut self) -> OriginalVariableId {
        self.push_var(VarKind::Binary, 0.0, 1.0)
    }

    pub fn add_continuous_var(&mut self, lb: f64, ub: f64) -> OriginalVariableId {
        self.push_var(VarKind::Continuous, lb, ub)
    }

    pub fn set_sol_val(&mut self, var: OriginalVariableId, value: f64) {
        self.vars[var.0 as usize].sol_val = value;
    }

    pub fn set_block(&mut self, var: OriginalVariableId, block: BlockAssignment) {
        self.vars[var.0 as usize].block = block;
    }

    pub fn set_pseudocost(&mut self, var: OriginalVariableId, value: f64) {
        self.vars[var.0 as usize].pseudocost = value;
    }

    pub fn set_scores(
        &mut self,
        var: OriginalVariableId,
        conflict: f64,
        conflictlength: f64,
        inference: f64,
        cutoff: f64,
    ) {
        let v = &mut self.vars[var.0 as usize];
        v.conflict = conflict;
        v.conflictlength = conflictlength;
        v.inference = inference;
        v.cutoff = cutoff;
    }

    pub fn add_master_var(
        &mut self,
        block: Option<usize>,
        coefficients: Vec<(OriginalVariableId, f64)>,
        lp_value: f64,
    ) -> MasterVariableId {
        let id = MasterVariableId(self.master_vars.len() as u32);
        self.master_vars.push(MasterVarRec {
            block,
            is_ray: false,
            coefficients,
            lp_value,
        });
        id
    }

    pub fn set_n_identical_blocks(&mut self, block: usize, n: usize) {
        self.identical_blocks.insert(block, n);
    }

    pub fn set_master_set_partitioning(&mut self, value: bool) {
        self.master_set_partitioning = value;
    }

    /// Scripts the outcome of the next probe in direction `kind` on
    /// `var`: `kind == Upper` means "down branch" (tightening the upper
    /// bound), `kind == Lower` means "up branch".
    pub fn set_probe_result(&mut self, var: OriginalVariableId, kind: BoundKind, outcome: ProbingLpOutcome) {
        let is_up = matches!(kind, BoundKind::Lower);
        self.probe_script.insert((var, is_up), outcome);
    }

    pub fn set_next_probing_lp_error(&mut self, value: bool) {
        self.next_probing_lp_error = value;
    }

    pub fn focus_node_id(&self) -> NodeId {
        self.focus
    }

    pub fn set_focus(&mut self, node: NodeId) {
        self.focus = node;
    }

    pub fn set_stopped(&mut self, value: bool) {
        self.stopped = value;
    }

    /// Marks `node` as having been created purely to carry a strong
    /// branching domain reduction rather than a genuine two-sided split
    /// (spec §4.4 score-recency policy).
    pub fn set_node_reduction_only(&mut self, node: NodeId, value: bool) {
        self.nodes[node.0 as usize].reduction_only = value;
    }
}

impl Default for FixtureHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for FixtureHost {
    fn focus_node(&self) -> NodeId {
        self.focus
    }

    fn focus_node_number(&self) -> u64 {
        self.focus.0
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0 as usize].parent
    }

    fn lower_bound(&self, node: NodeId) -> f64 {
        self.nodes[node.0 as usize].lower_bound
    }

    fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    fn create_child(&mut self, estimate: f64) -> NodeId {
        let id = NodeId(self.nodes.len() as u64);
        self.nodes.push(NodeRec {
            parent: Some(self.focus),
            lower_bound: estimate,
            infeasible: false,
            reduction_only: false,
        });
        id
    }

    fn add_cons_node(&mut self, _node: NodeId, _cons: ConsId) {}

    fn node_is_infeasible(&self, node: NodeId) -> bool {
        self.nodes[node.0 as usize].infeasible
    }

    fn node_is_infeasibility_reduction(&self, node: NodeId) -> bool {
        self.nodes[node.0 as usize].reduction_only
    }

    fn extern_branch_cands(&self) -> Vec<Candidate> {
        self.lp_branch_cands()
    }

    fn lp_branch_cands(&self) -> Vec<Candidate> {
        self.vars
            .iter()
            .enumerate()
            .filter(|(_, v)| v.kind.is_integral())
            .filter_map(|(i, v)| {
                let frac = v.sol_val - v.sol_val.floor();
                if frac > 1e-6 && frac < 1.0 - 1e-6 {
                    Some(Candidate {
                        variable: OriginalVariableId(i as u32),
                        lp_sol_val: v.sol_val,
                        frac,
                    })
                } else {
                    None
                }
            })
            .collect()
    }

    fn pseudo_branch_cands(&self) -> Vec<Candidate> {
        self.lp_branch_cands()
    }

    fn var_lb_local(&self, var: OriginalVariableId) -> f64 {
        self.vars[var.0 as usize].lb
    }

    fn var_ub_local(&self, var: OriginalVariableId) -> f64 {
        self.vars[var.0 as usize].ub
    }

    fn var_lb_global(&self, var: OriginalVariableId) -> f64 {
        self.vars[var.0 as usize].global_lb
    }

    fn var_ub_global(&self, var: OriginalVariableId) -> f64 {
        self.vars[var.0 as usize].global_ub
    }

    fn var_type(&self, var: OriginalVariableId) -> VarKind {
        self.vars[var.0 as usize].kind
    }

    fn sol_val(&self, var: OriginalVariableId) -> f64 {
        self.vars[var.0 as usize].sol_val
    }

    fn var_pseudocost_score(&self, var: OriginalVariableId, _sol_val: f64) -> f64 {
        self.vars[var.0 as usize].pseudocost
    }

    fn var_conflict_score(&self, var: OriginalVariableId) -> f64 {
        self.vars[var.0 as usize].conflict
    }

    fn var_conflictlength_score(&self, var: OriginalVariableId) -> f64 {
        self.vars[var.0 as usize].conflictlength
    }

    fn var_avg_inference_score(&self, var: OriginalVariableId) -> f64 {
        self.vars[var.0 as usize].inference
    }

    fn var_avg_cutoff_score(&self, var: OriginalVariableId) -> f64 {
        self.vars[var.0 as usize].cutoff
    }

    fn branch_score(&self, down_gain: f64, up_gain: f64) -> f64 {
        down_gain.max(1e-6) * up_gain.max(1e-6)
    }

    fn update_var_pseudocost(&mut self, var: OriginalVariableId, _sol_delta: f64, gain: f64) {
        self.vars[var.0 as usize].pseudocost = gain;
    }

    fn start_probing(&mut self) {
        assert!(!self.in_probing);
        self.in_probing = true;
        self.pre_probing_bounds = self.vars.iter().map(|v| (v.lb, v.ub)).collect();
    }

    fn new_probing_node(&mut self) {
        assert!(self.in_probing);
    }

    fn chg_var_bound_probing(&mut self, var: OriginalVariableId, kind: BoundKind, value: f64) {
        let v = &mut self.vars[var.0 as usize];
        match kind {
            BoundKind::Lower => v.lb = value,
            BoundKind::Upper => v.ub = value,
        }
        self.last_probing_change = Some((var, kind, value));
    }

    fn propagate_probing(&mut self) -> PropagateOutcome {
        if let Some((var, _, _)) = self.last_probing_change {
            let v = &self.vars[var.0 as usize];
            if v.lb > v.ub {
                return PropagateOutcome::Cutoff;
            }
        }
        PropagateOutcome::Ok { n_reductions: 0 }
    }

    fn perform_probing(&mut self, _with_pricing: bool, _iter_limit: Option<usize>) -> ProbingLpOutcome {
        if self.next_probing_lp_error {
            self.next_probing_lp_error = false;
            return ProbingLpOutcome {
                objective: None,
                solved: false,
                error: true,
                propagation_cutoff: false,
                pricing_cutoff: false,
                lp_iterations_used: 0,
            };
        }
        if let Some((var, kind, _)) = self.last_probing_change {
            let is_up = matches!(kind, BoundKind::Lower);
            if let Some(outcome) = self.probe_script.get(&(var, is_up)) {
                return *outcome;
            }
        }
        ProbingLpOutcome {
            objective: Some(0.0),
            solved: true,
            error: false,
            propagation_cutoff: false,
            pricing_cutoff: false,
            lp_iterations_used: 1,
        }
    }

    fn end_probing(&mut self) {
        assert!(self.in_probing);
        for (v, (lb, ub)) in self.vars.iter_mut().zip(self.pre_probing_bounds.iter()) {
            v.lb = *lb;
            v.ub = *ub;
        }
        self.in_probing = false;
        self.last_probing_change = None;
    }

    fn in_probing(&self) -> bool {
        self.in_probing
    }

    fn chg_var_bound_node(&mut self, _node: NodeId, var: OriginalVariableId, kind: BoundKind, value: f64) {
        let v = &mut self.vars[var.0 as usize];
        match kind {
            BoundKind::Lower => v.lb = value,
            BoundKind::Upper => v.ub = value,
        }
    }

    fn master_variable_info(&self, mvar: MasterVariableId) -> MasterVariableInfo {
        let rec = &self.master_vars[mvar.0 as usize];
        MasterVariableInfo {
            block: rec.block,
            is_ray: rec.is_ray,
            coefficients: rec.coefficients.clone(),
        }
    }

    fn master_variables_in_block(&self, block: usize) -> Vec<MasterVariableId> {
        self.master_vars
            .iter()
            .enumerate()
            .filter(|(_, r)| r.block == Some(block))
            .map(|(i, _)| MasterVariableId(i as u32))
            .collect()
    }

    fn master_variable_lp_value(&self, mvar: MasterVariableId) -> f64 {
        self.master_vars[mvar.0 as usize].lp_value
    }

    fn original_variable_block(&self, var: OriginalVariableId) -> BlockAssignment {
        self.vars[var.0 as usize].block.clone()
    }

    fn is_master_set_covering(&self) -> bool {
        self.master_set_covering
    }

    fn is_master_set_partitioning(&self) -> bool {
        self.master_set_partitioning
    }

    fn n_identical_blocks(&self, block: usize) -> usize {
        *self.identical_blocks.get(&block).unwrap_or(&1)
    }

    fn create_cons_linear(&mut self, name: &str, lhs: f64, rhs: f64, flags: ConsFlags) -> ConsId {
        let id = ConsId(self.next_cons_id);
        self.next_cons_id += 1;
        self.conss.insert(
            id.0,
            ConsRec {
                name: name.to_string(),
                lhs,
                rhs,
                flags,
                coefs: Vec::new(),
                active: false,
            },
        );
        self.name_index.insert(name.to_string(), id);
        id
    }

    fn add_coef_linear(&mut self, cons: ConsId, mvar: MasterVariableId, coef: f64) {
        self.conss.get_mut(&cons.0).unwrap().coefs.push((mvar, coef));
    }

    fn add_cons(&mut self, cons: ConsId) {
        self.conss.get_mut(&cons.0).unwrap().active = true;
    }

    fn del_cons(&mut self, cons: ConsId) {
        self.conss.get_mut(&cons.0).unwrap().active = false;
    }

    fn release_cons(&mut self, cons: ConsId) {
        if let Some(rec) = self.conss.remove(&cons.0) {
            self.name_index.remove(&rec.name);
        }
    }

    fn find_cons(&self, name: &str) -> Option<ConsId> {
        self.name_index.get(name).copied()
    }

    fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl FixtureHost {
    pub fn cons_is_active(&self, cons: ConsId) -> bool {
        self.conss.get(&cons.0).map(|c| c.active).unwrap_or(false)
    }

    pub fn cons_lhs(&self, cons: ConsId) -> f64 {
        self.conss[&cons.0].lhs
    }

    pub fn cons_rhs(&self, cons: ConsId) -> f64 {
        self.conss[&cons.0].rhs
    }

    pub fn cons_coefs(&self, cons: ConsId) -> &[(MasterVariableId, f64)] {
        &self.conss[&cons.0].coefs
    }
}
