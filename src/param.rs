//! Named-parameter surface (spec §6 parameter list), mirroring the
//! teacher's `src/param.rs` `ScipParameter` get/set-by-name trait: hosts
//! that expose their own parameter system (the way SCIP exposes
//! `branching/bp_strong/*`) can wire these rule parameter structs
//! through a uniform interface instead of poking at fields directly.

use crate::generic::GenericBranchingEngine;
use crate::reliability::ReliabilityParams;
use crate::strong::StrongBranchingParams;

/// A single named parameter value, typed the way SCIP parameters are
/// (`bool`, `int`, `real`) rather than a single stringly-typed variant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Real(f64),
}

/// Uniform get/set-by-dotted-name access to a rule's parameters
/// (spec §6: `branching/bp_strong/*`, `branching/relpsprob/*`).
pub trait NamedParam {
    fn get_param(&self, name: &str) -> Option<ParamValue>;
    fn set_param(&mut self, name: &str, value: ParamValue) -> bool;
}

impl NamedParam for StrongBranchingParams {
    fn get_param(&self, name: &str) -> Option<ParamValue> {
        Some(match name {
            "branching/bp_strong/stronglite" => ParamValue::Bool(self.stronglite),
            "branching/bp_strong/strongtraining" => ParamValue::Bool(self.strongtraining),
            "branching/bp_strong/immediateinf" => ParamValue::Bool(self.immediateinf),
            "branching/bp_strong/reevalage" => ParamValue::Int(self.reevalage as i64),
            "branching/bp_strong/mincolgencands" => ParamValue::Int(self.mincolgencands as i64),
            "branching/bp_strong/minphase0outcands" => ParamValue::Int(self.phase0.min_out as i64),
            "branching/bp_strong/maxphase0outcands" => ParamValue::Int(self.phase0.max_out as i64),
            "branching/bp_strong/maxphase0outcandsfrac" => ParamValue::Real(self.phase0.max_out_frac),
            "branching/bp_strong/phase0gapweight" => ParamValue::Real(self.phase0.gap_weight),
            "branching/bp_strong/minphase1outcands" => ParamValue::Int(self.phase1.min_out as i64),
            "branching/bp_strong/maxphase1outcands" => ParamValue::Int(self.phase1.max_out as i64),
            "branching/bp_strong/maxphase1outcandsfrac" => ParamValue::Real(self.phase1.max_out_frac),
            "branching/bp_strong/phase1gapweight" => ParamValue::Real(self.phase1.gap_weight),
            "branching/bp_strong/histweight" => ParamValue::Real(self.histweight),
            "branching/bp_strong/usepseudocosts" => ParamValue::Bool(self.usepseudocosts),
            "branching/bp_strong/usemostfrac" => ParamValue::Bool(self.usemostfrac),
            _ => return None,
        })
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> bool {
        match (name, value) {
            ("branching/bp_strong/stronglite", ParamValue::Bool(v)) => self.stronglite = v,
            ("branching/bp_strong/strongtraining", ParamValue::Bool(v)) => self.strongtraining = v,
            ("branching/bp_strong/immediateinf", ParamValue::Bool(v)) => self.immediateinf = v,
            ("branching/bp_strong/reevalage", ParamValue::Int(v)) => self.reevalage = v.max(0) as u32,
            ("branching/bp_strong/mincolgencands", ParamValue::Int(v)) => self.mincolgencands = v.max(0) as usize,
            ("branching/bp_strong/minphase0outcands", ParamValue::Int(v)) => self.phase0.min_out = v.max(0) as usize,
            ("branching/bp_strong/maxphase0outcands", ParamValue::Int(v)) => self.phase0.max_out = v.max(0) as usize,
            ("branching/bp_strong/maxphase0outcandsfrac", ParamValue::Real(v)) => self.phase0.max_out_frac = v,
            ("branching/bp_strong/phase0gapweight", ParamValue::Real(v)) => self.phase0.gap_weight = v,
            ("branching/bp_strong/minphase1outcands", ParamValue::Int(v)) => self.phase1.min_out = v.max(0) as usize,
            ("branching/bp_strong/maxphase1outcands", ParamValue::Int(v)) => self.phase1.max_out = v.max(0) as usize,
            ("branching/bp_strong/maxphase1outcandsfrac", ParamValue::Real(v)) => self.phase1.max_out_frac = v,
            ("branching/bp_strong/phase1gapweight", ParamValue::Real(v)) => self.phase1.gap_weight = v,
            ("branching/bp_strong/histweight", ParamValue::Real(v)) => self.histweight = v,
            ("branching/bp_strong/usepseudocosts", ParamValue::Bool(v)) => self.usepseudocosts = v,
            ("branching/bp_strong/usemostfrac", ParamValue::Bool(v)) => self.usemostfrac = v,
            _ => return false,
        }
        true
    }
}

impl NamedParam for ReliabilityParams {
    fn get_param(&self, name: &str) -> Option<ParamValue> {
        Some(match name {
            "branching/relpsprob/conflictweight" => ParamValue::Real(self.weights.conflict),
            "branching/relpsprob/conflictlengthweight" => ParamValue::Real(self.weights.conflictlength),
            "branching/relpsprob/inferenceweight" => ParamValue::Real(self.weights.inference),
            "branching/relpsprob/cutoffweight" => ParamValue::Real(self.weights.cutoff),
            "branching/relpsprob/pscostweight" => ParamValue::Real(self.weights.pscost),
            "branching/relpsprob/minreliable" => ParamValue::Real(self.minreliable),
            "branching/relpsprob/maxreliable" => ParamValue::Real(self.maxreliable),
            "branching/relpsprob/iterquot" => ParamValue::Real(self.iterquot),
            "branching/relpsprob/iterofs" => ParamValue::Int(self.iterofs as i64),
            "branching/relpsprob/maxlookahead" => ParamValue::Int(self.maxlookahead as i64),
            "branching/relpsprob/initcand" => ParamValue::Int(self.initcand as i64),
            "branching/relpsprob/inititer" => ParamValue::Int(self.inititer.unwrap_or(0) as i64),
            "branching/relpsprob/maxbdchgs" => ParamValue::Int(self.maxbdchgs.min(i64::MAX as usize) as i64),
            "branching/relpsprob/minbdchgs" => ParamValue::Int(self.minbdchgs as i64),
            "branching/relpsprob/uselp" => ParamValue::Bool(self.uselp),
            "branching/relpsprob/reliability" => ParamValue::Real(self.reliability_threshold),
            _ => return None,
        })
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> bool {
        match (name, value) {
            ("branching/relpsprob/conflictweight", ParamValue::Real(v)) => self.weights.conflict = v,
            ("branching/relpsprob/conflictlengthweight", ParamValue::Real(v)) => self.weights.conflictlength = v,
            ("branching/relpsprob/inferenceweight", ParamValue::Real(v)) => self.weights.inference = v,
            ("branching/relpsprob/cutoffweight", ParamValue::Real(v)) => self.weights.cutoff = v,
            ("branching/relpsprob/pscostweight", ParamValue::Real(v)) => self.weights.pscost = v,
            ("branching/relpsprob/minreliable", ParamValue::Real(v)) => self.minreliable = v,
            ("branching/relpsprob/maxreliable", ParamValue::Real(v)) => self.maxreliable = v,
            ("branching/relpsprob/iterquot", ParamValue::Real(v)) => self.iterquot = v,
            ("branching/relpsprob/iterofs", ParamValue::Int(v)) => self.iterofs = v.max(0) as usize,
            ("branching/relpsprob/maxlookahead", ParamValue::Int(v)) => self.maxlookahead = v.max(0) as usize,
            ("branching/relpsprob/initcand", ParamValue::Int(v)) => self.initcand = v.max(0) as usize,
            ("branching/relpsprob/inititer", ParamValue::Int(v)) => self.inititer = Some(v.max(0) as usize),
            ("branching/relpsprob/maxbdchgs", ParamValue::Int(v)) => self.maxbdchgs = v.max(0) as usize,
            ("branching/relpsprob/minbdchgs", ParamValue::Int(v)) => self.minbdchgs = v.max(0) as usize,
            ("branching/relpsprob/uselp", ParamValue::Bool(v)) => self.uselp = v,
            ("branching/relpsprob/reliability", ParamValue::Real(v)) => self.reliability_threshold = v,
            _ => return false,
        }
        true
    }
}

/// Generic branching has no tunable parameters today (spec §6 lists
/// none for Vanderbeck branching beyond what `StrongBranchingParams`
/// already covers for qualification); kept as a marker so `rule.rs`'s
/// dispatch has a uniform story across all three engines.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericBranchingParams;

impl GenericBranchingParams {
    pub fn build(self) -> GenericBranchingEngine {
        GenericBranchingEngine::new()
    }
}
