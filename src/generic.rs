//! `GenericBranchingEngine` (spec §4.5): Vanderbeck component-bound-
//! sequence branching — `Separate`, `Explore`, `ChooseS`, child-node
//! construction, dominance pruning, and the induced master constraint
//! lifecycle.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::decision::{DecisionRecord, Direction};
use crate::error::BranchingError;
use crate::host::{ConsFlags, ConsId, Host};
use crate::types::{
    ComponentBound, ComponentBoundSequence, MasterVariable, MasterVariableId, OriginalVariableId, RayOrPoint, Sense,
};

const EPS: f64 = 1e-6;

fn is_fractional(value: f64) -> bool {
    let nearest = value.round();
    (value - nearest).abs() > EPS
}

/// A block's fractional master column, cached for repeated coefficient
/// lookups during separation.
#[derive(Debug, Clone)]
pub struct FractionalColumn {
    pub id: MasterVariableId,
    pub lp_value: f64,
    pub coefficients: Vec<(OriginalVariableId, f64)>,
}

fn coefficient_of(column: &FractionalColumn, var: OriginalVariableId) -> f64 {
    column
        .coefficients
        .iter()
        .find(|(v, _)| *v == var)
        .map(|(_, c)| *c)
        .unwrap_or(0.0)
}

fn median_of(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

fn column_satisfies(column: &FractionalColumn, cb: &ComponentBound) -> bool {
    cb.sense.satisfied_by(coefficient_of(column, cb.variable), cb.bound)
}

fn sum_lp_value_satisfying(columns: &[FractionalColumn], sequence: &ComponentBoundSequence) -> f64 {
    columns
        .iter()
        .filter(|c| sequence.as_slice().iter().all(|cb| column_satisfies(c, cb)))
        .map(|c| c.lp_value)
        .sum()
}

/// Reads the fractional columns of `block` from the host, discarding
/// columns whose LP value rounds to zero.
pub fn collect_block_columns(host: &dyn Host, block: usize) -> Vec<FractionalColumn> {
    host.master_variables_in_block(block)
        .into_iter()
        .filter_map(|id| {
            let lp_value = host.master_variable_lp_value(id);
            if lp_value <= EPS {
                return None;
            }
            let info = host.master_variable_info(id);
            Some(FractionalColumn {
                id,
                lp_value,
                coefficients: info.coefficients,
            })
        })
        .collect()
}

/// The set of original variables appearing in at least one column,
/// standing in for the block's full component index set.
pub fn collect_index_set(columns: &[FractionalColumn]) -> Vec<OriginalVariableId> {
    let mut set: Vec<OriginalVariableId> = columns.iter().flat_map(|c| c.coefficients.iter().map(|(v, _)| *v)).collect();
    set.sort();
    set.dedup();
    set
}

/// A sequence discovered by `Separate`/`Explore`, carrying the
/// discriminating component's `maxCoef - minCoef` priority so `ChooseS`
/// can rank it without re-deriving the statistic.
#[derive(Debug, Clone)]
pub struct CandidateSequence {
    pub sequence: ComponentBoundSequence,
    pub priority: f64,
}

/// `Separate(F, IndexSet, S, record)` (spec §4.5): root-style separation.
pub fn separate(
    columns: &[FractionalColumn],
    index_set: &[OriginalVariableId],
    prefix: ComponentBoundSequence,
    record: &mut Vec<CandidateSequence>,
) {
    if columns.is_empty() || index_set.is_empty() {
        return;
    }

    let mut any_fractional = false;
    let mut best: Option<(f64, OriginalVariableId, f64)> = None; // (priority, var, median)

    for &var in index_set {
        let mut coefs: Vec<f64> = columns.iter().map(|c| coefficient_of(c, var)).collect();
        let median = median_of(&mut coefs);
        let alpha: f64 = columns
            .iter()
            .filter(|c| coefficient_of(c, var) >= median)
            .map(|c| c.lp_value)
            .sum();

        let max_c = coefs.iter().cloned().fold(f64::MIN, f64::max);
        let min_c = coefs.iter().cloned().fold(f64::MAX, f64::min);
        let priority = max_c - min_c;

        if is_fractional(alpha) {
            record.push(CandidateSequence {
                sequence: prefix.extended(ComponentBound::new(var, Sense::Ge, median)),
                priority,
            });
            any_fractional = true;
            continue;
        }

        if best.as_ref().map(|&(p, _, _)| priority > p).unwrap_or(true) {
            best = Some((priority, var, median));
        }
    }

    if any_fractional {
        return;
    }

    let Some((_, var, median)) = best else {
        return;
    };

    let ge: Vec<FractionalColumn> = columns.iter().filter(|c| coefficient_of(c, var) >= median).cloned().collect();
    let lt: Vec<FractionalColumn> = columns.iter().filter(|c| coefficient_of(c, var) < median).cloned().collect();
    let remaining: Vec<OriginalVariableId> = index_set.iter().copied().filter(|&v| v != var).collect();

    if ge.len() <= lt.len() {
        separate(&ge, &remaining, prefix.extended(ComponentBound::new(var, Sense::Ge, median)), record);
    } else {
        separate(&lt, &remaining, prefix.extended(ComponentBound::new(var, Sense::Lt, median)), record);
    }
}

/// `Explore(C, F, IndexSet, S, record)` (spec §4.5): constrained
/// descendant separation under an already active generic branching.
/// Falls back to [`separate`] when `C` fixes no common component at the
/// current depth.
pub fn explore(
    prior: &[ComponentBoundSequence],
    columns: &[FractionalColumn],
    index_set: &[OriginalVariableId],
    prefix: ComponentBoundSequence,
    record: &mut Vec<CandidateSequence>,
) {
    let depth = prefix.len();
    let components_at_depth: Vec<OriginalVariableId> = prior
        .iter()
        .filter_map(|seq| seq.as_slice().get(depth))
        .map(|cb| cb.variable)
        .collect();

    let var = match components_at_depth.first() {
        Some(&first) if components_at_depth.iter().all(|&v| v == first) => first,
        _ => {
            separate(columns, index_set, prefix, record);
            return;
        }
    };

    let bounds_at_depth: Vec<ComponentBound> = prior
        .iter()
        .filter_map(|seq| seq.as_slice().get(depth).copied())
        .collect();

    let restricted: Vec<FractionalColumn> = columns
        .iter()
        .filter(|c| bounds_at_depth.iter().all(|cb| column_satisfies(c, cb)))
        .cloned()
        .collect();
    if restricted.is_empty() {
        return;
    }

    let mut coefs: Vec<f64> = restricted.iter().map(|c| coefficient_of(c, var)).collect();
    let median = median_of(&mut coefs);
    let alpha: f64 = restricted
        .iter()
        .filter(|c| coefficient_of(c, var) >= median)
        .map(|c| c.lp_value)
        .sum();

    let max_c = coefs.iter().cloned().fold(f64::MIN, f64::max);
    let min_c = coefs.iter().cloned().fold(f64::MAX, f64::min);
    let priority = max_c - min_c;

    if is_fractional(alpha) {
        record.push(CandidateSequence {
            sequence: prefix.extended(ComponentBound::new(var, Sense::Ge, median)),
            priority,
        });
        return;
    }

    let follow_ge = bounds_at_depth.iter().any(|cb| cb.sense == Sense::Ge);
    let (subset, sense) = if follow_ge {
        (
            restricted.into_iter().filter(|c| coefficient_of(c, var) >= median).collect::<Vec<_>>(),
            Sense::Ge,
        )
    } else {
        (
            restricted.into_iter().filter(|c| coefficient_of(c, var) < median).collect::<Vec<_>>(),
            Sense::Lt,
        )
    };
    if subset.is_empty() {
        return;
    }
    let remaining: Vec<OriginalVariableId> = index_set.iter().copied().filter(|&v| v != var).collect();
    explore(prior, &subset, &remaining, prefix.extended(ComponentBound::new(var, sense, median)), record);
}

/// `ChooseS(record)` (spec §4.5): highest-priority discriminating
/// component wins; ties go to the strictly shorter sequence (spec §9
/// redesign flag — never `<=`).
pub fn choose_s(record: &[CandidateSequence]) -> Option<ComponentBoundSequence> {
    record
        .iter()
        .max_by(|a, b| {
            a.priority
                .partial_cmp(&b.priority)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.sequence.len().cmp(&a.sequence.len()))
        })
        .map(|c| c.sequence.clone())
}

/// One child of `createChildNodesGeneric`.
#[derive(Debug, Clone)]
pub struct GenericChildSpec {
    pub sequence: ComponentBoundSequence,
    pub lhs: f64,
}

/// `createChildNodesGeneric(S, block, parentBranchCons)` (spec §4.5):
/// builds `|S|+1` children. The first `|S|` children flip the sense of
/// their defining position and get `lhs = pL - mu + 1`; the last child
/// uses the full sequence and its `lhs` is set to the exact residual
/// needed to satisfy `Σlhs = pL + |S|` (spec §8 testable property 2).
pub fn create_child_nodes_generic(
    columns: &[FractionalColumn],
    sequence: &ComponentBoundSequence,
    parent_identical_blocks: usize,
) -> Vec<GenericChildSpec> {
    let elements = sequence.as_slice();
    let n = elements.len();
    let mut children = Vec::with_capacity(n + 1);
    let mut lhs_sum = 0.0;

    for p in 0..n {
        let mut flipped = elements[p];
        flipped.sense = flipped.sense.flipped();
        let mut child_seq = elements[..p].iter().fold(ComponentBoundSequence::new(), |acc, cb| acc.extended(*cb));
        child_seq = child_seq.extended(flipped);

        let mu = sum_lp_value_satisfying(columns, &child_seq);
        let lhs = parent_identical_blocks as f64 - mu + 1.0;
        lhs_sum += lhs;
        children.push(GenericChildSpec { sequence: child_seq, lhs });
    }

    let last_lhs = parent_identical_blocks as f64 + n as f64 - lhs_sum;
    children.push(GenericChildSpec {
        sequence: sequence.clone(),
        lhs: last_lhs,
    });

    children
}

/// `pruneChildNodeByDominanceGeneric` (spec §4.5): a child is dominated
/// if an ancestor already carries an identical `(block, |S|, S, lhs)`.
pub fn is_dominated(block: usize, child: &GenericChildSpec, ancestors: &[(usize, ComponentBoundSequence, f64)]) -> bool {
    ancestors.iter().any(|(anc_block, anc_seq, anc_lhs)| {
        *anc_block == block
            && anc_seq.len() == child.sequence.len()
            && anc_seq == &child.sequence
            && (*anc_lhs - child.lhs).abs() < EPS
    })
}

/// `LexicographicSort`: orders columns by coefficients over `var_order`.
pub fn lexicographic_cmp(var_order: &[OriginalVariableId], a: &FractionalColumn, b: &FractionalColumn) -> Ordering {
    for &v in var_order {
        let ord = coefficient_of(a, v).partial_cmp(&coefficient_of(b, v)).unwrap_or(Ordering::Equal);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// `InducedLexicographicSort`: like [`lexicographic_cmp`] but skips
/// components already fixed by `prior`, respecting its prefix structure.
pub fn induced_lexicographic_cmp(
    var_order: &[OriginalVariableId],
    prior: &[ComponentBoundSequence],
    a: &FractionalColumn,
    b: &FractionalColumn,
) -> Ordering {
    let fixed: HashSet<OriginalVariableId> = prior.iter().flat_map(|s| s.as_slice().iter().map(|cb| cb.variable)).collect();
    let free_order: Vec<OriginalVariableId> = var_order.iter().copied().filter(|v| !fixed.contains(v)).collect();
    lexicographic_cmp(&free_order, a, b)
}

fn column_to_master_variable(host: &dyn Host, id: MasterVariableId) -> MasterVariable {
    let info = host.master_variable_info(id);
    MasterVariable {
        id,
        block: info.block,
        ray_or_point: if info.is_ray { RayOrPoint::Ray } else { RayOrPoint::Point },
        coefficients: info.coefficients,
        lp_value: host.master_variable_lp_value(id),
    }
}

/// `branchActiveMasterGeneric` (spec §4.5): materializes (or
/// reactivates) the induced master constraint `Σ 1·m >= lhs` over
/// columns of `block` satisfying `sequence`.
pub fn activate(host: &mut dyn Host, decision: &DecisionRecord) -> Result<ConsId, BranchingError> {
    let DecisionRecord::GenericChild {
        block,
        sequence,
        lhs,
        induced_master_cons,
        ..
    } = decision
    else {
        return Err(BranchingError::MalformedDecision(
            "activate called on a non-GenericChild decision".into(),
        ));
    };

    if let Some(cons) = induced_master_cons {
        host.add_cons(*cons);
        return Ok(*cons);
    }

    let cons = host.create_cons_linear(
        "genericbranch",
        *lhs,
        f64::INFINITY,
        ConsFlags {
            modifiable: true,
            removable: true,
        },
    );
    for id in host.master_variables_in_block(*block) {
        let column = column_to_master_variable(host, id);
        if sequence.is_satisfied_by(&column) {
            host.add_coef_linear(cons, id, 1.0);
        }
    }
    host.add_cons(cons);
    Ok(cons)
}

/// `branchDeactiveMasterGeneric` (spec §4.5): removes the induced
/// constraint from the local active set without releasing it.
pub fn deactivate(host: &mut dyn Host, cons: ConsId) {
    host.del_cons(cons);
}

/// `eventExecGenericbranchvaradd` (spec §4.5): when pricing creates a
/// new master variable, add it to every active ancestor's induced
/// constraint whose sequence it satisfies.
pub fn on_master_variable_added(host: &mut dyn Host, new_var: MasterVariableId, active_chain: &[(usize, ComponentBoundSequence, ConsId)]) {
    let info = host.master_variable_info(new_var);
    let Some(block) = info.block else {
        return;
    };
    let column = MasterVariable {
        id: new_var,
        block: Some(block),
        ray_or_point: if info.is_ray { RayOrPoint::Ray } else { RayOrPoint::Point },
        coefficients: info.coefficients,
        lp_value: host.master_variable_lp_value(new_var),
    };
    for (anc_block, seq, cons) in active_chain {
        if *anc_block == block && seq.is_satisfied_by(&column) {
            host.add_coef_linear(*cons, new_var, 1.0);
        }
    }
}

/// Special case for a directly-transferred original variable
/// (block = -1, non-linking): degenerates to a direct up/down split on
/// the variable itself at `⌈LPvalue⌉`.
pub fn branch_direct_transfer(host: &dyn Host, var: OriginalVariableId) -> Result<(DecisionRecord, DecisionRecord), BranchingError> {
    let val = host.sol_val(var);
    let is_integral = host.var_type(var).is_integral();
    let down = DecisionRecord::single_variable(var, val, Direction::Down, is_integral)?;
    let up = DecisionRecord::single_variable(var, val, Direction::Up, is_integral)?;
    Ok((down, up))
}

/// Orchestrates `Separate -> ChooseS -> createChildNodesGeneric` for one
/// block, producing the [`DecisionRecord::GenericChild`] set for its
/// children.
pub struct GenericBranchingEngine;

impl GenericBranchingEngine {
    pub fn new() -> Self {
        GenericBranchingEngine
    }

    /// `ancestors` carries the `(block, sequence, lhs)` of every active
    /// generic-branching decision on the current root-to-focus path
    /// (spec §4.5 dominance pruning and the `Explore` prior-sequence
    /// list `C`, which is exactly the same-block subset of this list).
    pub fn branch(&self, host: &dyn Host, block: usize, ancestors: &[(usize, ComponentBoundSequence, f64)]) -> Result<Vec<DecisionRecord>, BranchingError> {
        let columns = collect_block_columns(host, block);
        if columns.is_empty() {
            return Err(BranchingError::NoCandidate);
        }
        let index_set = collect_index_set(&columns);

        let prior: Vec<ComponentBoundSequence> = ancestors
            .iter()
            .filter(|(anc_block, _, _)| *anc_block == block)
            .map(|(_, seq, _)| seq.clone())
            .collect();

        let mut record = Vec::new();
        if prior.is_empty() {
            separate(&columns, &index_set, ComponentBoundSequence::new(), &mut record);
        } else {
            explore(&prior, &columns, &index_set, ComponentBoundSequence::new(), &mut record);
        }

        let chosen = match choose_s(&record) {
            Some(s) => s,
            None => return Err(BranchingError::NoCandidate),
        };

        let parent_identical = host.n_identical_blocks(block);
        let specs = create_child_nodes_generic(&columns, &chosen, parent_identical);

        let surviving: Vec<GenericChildSpec> = specs.into_iter().filter(|spec| !is_dominated(block, spec, ancestors)).collect();
        if surviving.is_empty() {
            // every would-be child duplicates an ancestor's (block, |S|, S, lhs) — cut the node off.
            return Err(BranchingError::NoCandidate);
        }

        let prior_sequences = if prior.is_empty() { None } else { Some(prior) };
        let mut decisions = Vec::with_capacity(surviving.len());
        for spec in surviving {
            decisions.push(DecisionRecord::generic_child(block, spec.sequence, spec.lhs, prior_sequences.clone())?);
        }
        Ok(decisions)
    }
}

impl Default for GenericBranchingEngine {
    fn default() -> Self {
        Self::new()
    }
}
