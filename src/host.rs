//! The external interface this core requires from its host solver
//! (spec §6). Only the interface is specified here — the LP solver, the
//! pricer, and the underlying bound-propagation arithmetic are the
//! host's job (spec §1).
//!
//! This plays the role the teacher crate's `scip-sys` FFI binding plays
//! for `russcip`: a boundary the rest of the crate is written against.
//! Unlike the teacher, nothing here binds a concrete C library — a host
//! is anything implementing [`Host`], including the in-memory test
//! double in `support` (see `SPEC_FULL.md` §0).

use crate::types::{BlockAssignment, MasterVariableId, OriginalVariableId, VarKind};

/// Opaque handle to a node in the host's branch-and-bound tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

/// Opaque handle to a constraint in the host's master or original
/// problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConsId(pub u64);

/// Which bound of a variable is being changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    Lower,
    Upper,
}

/// A fractional LP candidate as reported by the host (spec §6
/// "Candidates").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub variable: OriginalVariableId,
    pub lp_sol_val: f64,
    pub frac: f64,
}

/// Outcome of [`Host::propagate_probing`] / the propagation step of a
/// probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagateOutcome {
    Cutoff,
    Ok { n_reductions: usize },
}

/// Outcome of [`Host::perform_probing`]: solving the probing LP, with or
/// without pricing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbingLpOutcome {
    pub objective: Option<f64>,
    pub solved: bool,
    pub error: bool,
    /// True iff propagation detected infeasibility (as opposed to a
    /// pricing-only signal); spec §9 requires these be tracked
    /// separately rather than folded into one ambiguous `cutoff` flag.
    pub propagation_cutoff: bool,
    /// True iff the cutoff signal came from the pricing loop rather than
    /// from propagation (spec §9 open question, resolved explicitly).
    pub pricing_cutoff: bool,
    pub lp_iterations_used: usize,
}

impl ProbingLpOutcome {
    /// Either signal indicates the probe direction is infeasible.
    pub fn is_cutoff(&self) -> bool {
        self.propagation_cutoff || self.pricing_cutoff
    }
}

/// Flags controlling how an induced master constraint is created
/// (spec §6 `createConsLinear(name, lhs, rhs, flags)`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsFlags {
    pub modifiable: bool,
    pub removable: bool,
}

/// Per-pricing-block master-structure facts the host exposes about a
/// [`MasterVariableId`] / [`OriginalVariableId`] (spec §6 "Master/
/// original mapping").
pub struct MasterVariableInfo {
    pub block: Option<usize>,
    pub is_ray: bool,
    pub coefficients: Vec<(OriginalVariableId, f64)>,
}

/// The external interface required from the host solver (spec §6).
///
/// Grouped exactly as spec §6 groups it; a host implements all of it.
/// Methods are free functions on `&mut self` rather than split across
/// SCIP's many `SCIPxxx` global calls, the way the teacher crate folds
/// the SCIP C API into inherent methods on `Model<State>` / `Variable` /
/// `Node`.
pub trait Host {
    // -- Node and tree --------------------------------------------------
    fn focus_node(&self) -> NodeId;
    fn focus_node_number(&self) -> u64;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    fn lower_bound(&self, node: NodeId) -> f64;
    fn upper_bound(&self) -> f64;
    /// Creates a new child of the focus node with the given dual-bound
    /// estimate and returns its handle.
    fn create_child(&mut self, estimate: f64) -> NodeId;
    /// Attaches an already-created constraint to a node so it activates
    /// when the node becomes the focus node.
    fn add_cons_node(&mut self, node: NodeId, cons: ConsId);
    fn node_is_infeasible(&self, node: NodeId) -> bool;
    /// True iff `node` was created purely to carry a domain reduction
    /// discovered when one direction of strong branching proved
    /// infeasible, as opposed to a genuine two-sided branching split
    /// (spec §4.4 score-recency policy, §8 scenario 5). The host is the
    /// one that actually creates tree nodes, so it is the one that
    /// knows which kind a given node is.
    fn node_is_infeasibility_reduction(&self, node: NodeId) -> bool;

    // -- Candidates -------------------------------------------------------
    fn extern_branch_cands(&self) -> Vec<Candidate>;
    fn lp_branch_cands(&self) -> Vec<Candidate>;
    fn pseudo_branch_cands(&self) -> Vec<Candidate>;

    // -- Variable queries -------------------------------------------------
    fn var_lb_local(&self, var: OriginalVariableId) -> f64;
    fn var_ub_local(&self, var: OriginalVariableId) -> f64;
    fn var_lb_global(&self, var: OriginalVariableId) -> f64;
    fn var_ub_global(&self, var: OriginalVariableId) -> f64;
    fn var_type(&self, var: OriginalVariableId) -> VarKind;
    fn is_integral(&self, value: f64, feastol: f64) -> bool {
        (value - value.round()).abs() <= feastol
    }
    fn sol_val(&self, var: OriginalVariableId) -> f64;
    fn var_pseudocost_score(&self, var: OriginalVariableId, sol_val: f64) -> f64;
    fn var_conflict_score(&self, var: OriginalVariableId) -> f64;
    fn var_conflictlength_score(&self, var: OriginalVariableId) -> f64;
    fn var_avg_inference_score(&self, var: OriginalVariableId) -> f64;
    fn var_avg_cutoff_score(&self, var: OriginalVariableId) -> f64;
    /// The host's own branching-score combination of a down- and an
    /// up-gain (spec §4.4 phase 1/2 scoring function, e.g. a product
    /// rule with a minimum-fraction safeguard).
    fn branch_score(&self, down_gain: f64, up_gain: f64) -> f64;
    fn update_var_pseudocost(&mut self, var: OriginalVariableId, sol_delta: f64, gain: f64);
    fn feastol(&self) -> f64 {
        1e-6
    }

    // -- Probing ------------------------------------------------------------
    fn start_probing(&mut self);
    fn new_probing_node(&mut self);
    fn chg_var_bound_probing(&mut self, var: OriginalVariableId, kind: BoundKind, value: f64);
    fn propagate_probing(&mut self) -> PropagateOutcome;
    fn perform_probing(&mut self, with_pricing: bool, iter_limit: Option<usize>) -> ProbingLpOutcome;
    fn end_probing(&mut self);
    fn in_probing(&self) -> bool;
    /// Installs a permanent bound tightening on `node` (spec §4.1
    /// `apply`). Unlike `chg_var_bound_probing`, this is not undone when
    /// a probing session ends — it is the way a domain reduction found
    /// during probing is actually committed to the tree.
    fn chg_var_bound_node(&mut self, node: NodeId, var: OriginalVariableId, kind: BoundKind, value: f64);

    // -- Master / original mapping -----------------------------------------
    fn master_variable_info(&self, mvar: MasterVariableId) -> MasterVariableInfo;
    fn master_variables_in_block(&self, block: usize) -> Vec<MasterVariableId>;
    fn master_variable_lp_value(&self, mvar: MasterVariableId) -> f64;
    fn original_variable_block(&self, var: OriginalVariableId) -> BlockAssignment;
    fn is_master_set_covering(&self) -> bool;
    fn is_master_set_partitioning(&self) -> bool;
    fn n_identical_blocks(&self, block: usize) -> usize;

    // -- Constraint I/O -------------------------------------------------------
    fn create_cons_linear(&mut self, name: &str, lhs: f64, rhs: f64, flags: ConsFlags) -> ConsId;
    fn add_coef_linear(&mut self, cons: ConsId, mvar: MasterVariableId, coef: f64);
    fn add_cons(&mut self, cons: ConsId);
    fn del_cons(&mut self, cons: ConsId);
    fn release_cons(&mut self, cons: ConsId);
    fn find_cons(&self, name: &str) -> Option<ConsId>;

    /// Debug-level host log line. No logging crate is pulled in for this
    /// (see `SPEC_FULL.md` §1) — the host owns message routing, the way
    /// SCIP's own message handler does for the teacher crate.
    fn log_debug(&self, _msg: &str) {}

    /// True if the host has signalled an interrupt or a time/node limit.
    fn is_stopped(&self) -> bool {
        false
    }
}
