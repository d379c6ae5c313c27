//! `StrongBranchingEngine` (spec §4.4): three-phase candidate filtering
//! and probing-based strong branching over single variables and, for
//! set-partitioning/-covering masters, Ryan-Foster pairs.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::decision::{DecisionRecord, Direction};
use crate::error::BranchingError;
use crate::host::{BoundKind, Candidate, Host, NodeId, PropagateOutcome};
use crate::probing::ProbingSession;
use crate::scorer::{fractionality_score, pair_score};
use crate::scoring_state::{BlockUniqueness, ScoringStateTable};
use crate::types::{BlockAssignment, OriginalVariableId};

/// Candidate-count limits for one phase (spec §4.4 phase 0/1 formula):
/// `n = min(maxOutFrac * |cands|, minOut + ceil((maxOut-minOut) * (gap *
/// gapWeight + (1 - gapWeight))))`.
#[derive(Debug, Clone, Copy)]
pub struct PhaseLimits {
    pub min_out: usize,
    pub max_out: usize,
    pub max_out_frac: f64,
    pub gap_weight: f64,
}

impl Default for PhaseLimits {
    fn default() -> Self {
        PhaseLimits {
            min_out: 10,
            max_out: 100,
            max_out_frac: 0.2,
            gap_weight: 0.25,
        }
    }
}

fn phase_top_n(n_cands: usize, limits: &PhaseLimits, gap: f64) -> usize {
    if n_cands == 0 {
        return 0;
    }
    let weighted =
        (gap * limits.gap_weight + (1.0 - limits.gap_weight)) * limits.max_out.saturating_sub(limits.min_out) as f64;
    let bound = limits.min_out + weighted.ceil() as usize;
    let cand_frac_n = (limits.max_out_frac * n_cands as f64).ceil() as usize;
    cand_frac_n.min(bound).max(1).min(n_cands)
}

/// Parameters of [`StrongBranchingEngine`] (spec §6 `branching/bp_strong/*`).
#[derive(Debug, Clone)]
pub struct StrongBranchingParams {
    pub stronglite: bool,
    pub strongtraining: bool,
    pub immediateinf: bool,
    pub reevalage: u32,
    pub mincolgencands: usize,
    pub phase0: PhaseLimits,
    pub phase1: PhaseLimits,
    pub histweight: f64,
    pub usepseudocosts: bool,
    pub usemostfrac: bool,
}

impl Default for StrongBranchingParams {
    fn default() -> Self {
        StrongBranchingParams {
            stronglite: false,
            strongtraining: false,
            immediateinf: true,
            reevalage: 1,
            mincolgencands: 4,
            phase0: PhaseLimits::default(),
            phase1: PhaseLimits {
                min_out: 2,
                max_out: 20,
                max_out_frac: 0.1,
                gap_weight: 0.25,
            },
            histweight: 0.5,
            usepseudocosts: true,
            usemostfrac: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PhaseResult {
    candidate: Candidate,
    down_infeasible: bool,
    up_infeasible: bool,
    score: f64,
}

/// Result of [`StrongBranchingEngine::select_original`].
#[derive(Debug, Clone)]
pub struct OriginalSelection {
    pub variable: OriginalVariableId,
    pub down_infeasible: bool,
    pub up_infeasible: bool,
    /// `None` iff `down_infeasible`.
    pub down: Option<DecisionRecord>,
    /// `None` iff `up_infeasible`.
    pub up: Option<DecisionRecord>,
}

/// Result of [`StrongBranchingEngine::select_ryan_foster`].
#[derive(Debug, Clone)]
pub struct RyanFosterSelection {
    pub var1: OriginalVariableId,
    pub var2: OriginalVariableId,
    pub block: usize,
    pub same: DecisionRecord,
    pub differ: DecisionRecord,
}

/// Three-phase strong branching with pricing (spec §4.4).
pub struct StrongBranchingEngine {
    params: StrongBranchingParams,
    scoring: ScoringStateTable,
}

impl StrongBranchingEngine {
    pub fn new(params: StrongBranchingParams) -> Self {
        StrongBranchingEngine {
            params,
            scoring: ScoringStateTable::new(),
        }
    }

    pub fn params(&self) -> &StrongBranchingParams {
        &self.params
    }

    pub fn scoring(&self) -> &ScoringStateTable {
        &self.scoring
    }

    /// `assignUniqueBlockFlags`: first pass keeps integer candidates
    /// uniquely assigned to a block; if none qualify, a second pass
    /// keeps integer candidates directly transferred to the master.
    fn qualify_candidates(&mut self, host: &dyn Host, candidates: &[Candidate]) -> Vec<Candidate> {
        let mut first_pass = Vec::new();
        for &c in candidates {
            if !host.var_type(c.variable).is_integral() {
                continue;
            }
            if let BlockAssignment::Block(_) = host.original_variable_block(c.variable) {
                self.scoring
                    .entry_mut(c.variable)
                    .set_block_uniqueness(BlockUniqueness::UniqueBlock);
                first_pass.push(c);
            }
        }
        if !first_pass.is_empty() {
            return first_pass;
        }

        let mut second_pass = Vec::new();
        for &c in candidates {
            if !host.var_type(c.variable).is_integral() {
                continue;
            }
            if matches!(host.original_variable_block(c.variable), BlockAssignment::None) {
                self.scoring
                    .entry_mut(c.variable)
                    .set_block_uniqueness(BlockUniqueness::DirectTransfer);
                second_pass.push(c);
            }
        }
        second_pass
    }

    /// Walks from the focus node up to `recorded_node` via `Host::parent`,
    /// counting how many ancestors were pure infeasibility-reduction
    /// nodes (spec §4.4 score-recency policy, §8 scenario 5). The moment
    /// a non-reduction ancestor is crossed — a genuine branching split —
    /// recency is invalidated for `var` (spec §8 boundary behavior) and
    /// the walk stops early.
    fn count_reduction_ancestors(&mut self, host: &dyn Host, var: OriginalVariableId, recorded_node: NodeId) -> Option<u32> {
        let mut node = host.focus_node();
        let mut count = 0u32;
        while node != recorded_node {
            if !host.node_is_infeasibility_reduction(node) {
                self.scoring.entry_mut(var).invalidate_recency();
                return None;
            }
            count += 1;
            node = match host.parent(node) {
                Some(p) => p,
                None => {
                    self.scoring.entry_mut(var).invalidate_recency();
                    return None;
                }
            };
        }
        Some(count)
    }

    /// The stored strong-branching score for `var`, if spec §4.4's
    /// reuse policy allows it to be used without re-probing.
    fn reused_score(&mut self, host: &dyn Host, var: OriginalVariableId) -> Option<f64> {
        let (recorded_node, recency, last_score) = {
            let state = self.scoring.get(var)?;
            (state.recorded_node()?, state.score_recency(), state.last_score()?)
        };
        if !recency {
            return None;
        }
        let ancestors = self.count_reduction_ancestors(host, var, recorded_node)?;
        let reevalage = self.params.reevalage;
        if self.scoring.get(var)?.is_score_reusable(ancestors, reevalage) {
            Some(last_score)
        } else {
            None
        }
    }

    /// Phase 0 heuristic filtering: score each qualified candidate
    /// (reused history, pseudocost, or fractionality), keep the top
    /// `n0`, then mix in up to `histweight * n0` historical candidates
    /// by replacing the worst newly-scored survivors.
    fn phase0_filter(&mut self, host: &dyn Host, qualified: &[Candidate], gap: f64) -> Vec<Candidate> {
        let mut scored: Vec<(Candidate, f64, bool)> = qualified
            .iter()
            .map(|&c| {
                let reused = self.reused_score(host, c.variable);
                let reusable = reused.is_some();
                let score = if let Some(s) = reused {
                    s
                } else if self.params.usepseudocosts && !self.params.usemostfrac {
                    host.var_pseudocost_score(c.variable, c.lp_sol_val)
                } else {
                    fractionality_score(c.lp_sol_val)
                };
                (c, score, reusable)
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        let n0 = phase_top_n(qualified.len(), &self.params.phase0, gap);
        let mut selected: Vec<(Candidate, f64, bool)> = scored.iter().take(n0).copied().collect();

        let max_hist = (self.params.histweight * n0 as f64).floor() as usize;
        let hist_in_selected = selected.iter().filter(|(_, _, h)| *h).count();
        if hist_in_selected < max_hist {
            let budget = max_hist - hist_in_selected;
            let selected_vars: HashSet<_> = selected.iter().map(|(c, _, _)| c.variable).collect();
            let mut extra_hist: Vec<_> = scored
                .iter()
                .filter(|(c, _, h)| *h && !selected_vars.contains(&c.variable))
                .copied()
                .collect();
            extra_hist.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
            selected.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));
            for hist_cand in extra_hist.into_iter().take(budget) {
                if let Some(worst_new) = selected.iter().position(|(_, _, h)| !*h) {
                    selected[worst_new] = hist_cand;
                }
            }
        }

        selected.into_iter().map(|(c, _, _)| c).collect()
    }

    /// Evaluates each candidate by opening one probing session per
    /// direction (spec §4.4 phases 1/2). A candidate whose probe hits an
    /// unresolved LP error is dropped (spec §7 `LpError` policy); a
    /// candidate infeasible in both directions makes the whole call
    /// infeasible.
    fn strong_branch_candidates(
        &mut self,
        host: &mut dyn Host,
        candidates: &[Candidate],
        with_pricing: bool,
        parent_bound: f64,
    ) -> Result<Vec<PhaseResult>, BranchingError> {
        let mut results = Vec::with_capacity(candidates.len());
        for &cand in candidates {
            if host.is_stopped() {
                return Err(BranchingError::Stopped);
            }

            let down = probe_direction(
                host,
                cand.variable,
                BoundKind::Upper,
                cand.lp_sol_val.floor(),
                with_pricing,
                parent_bound,
            );
            let up = probe_direction(
                host,
                cand.variable,
                BoundKind::Lower,
                cand.lp_sol_val.ceil(),
                with_pricing,
                parent_bound,
            );

            let (down_gain, down_infeasible) = match down {
                Ok(v) => v,
                Err(BranchingError::LpError) => {
                    host.log_debug("strong branching: LP error on down probe, dropping candidate");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let (up_gain, up_infeasible) = match up {
                Ok(v) => v,
                Err(BranchingError::LpError) => {
                    host.log_debug("strong branching: LP error on up probe, dropping candidate");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if down_infeasible && up_infeasible {
                return Err(BranchingError::Infeasible);
            }

            let one_sided = down_infeasible || up_infeasible;
            let score = if one_sided {
                f64::INFINITY
            } else {
                host.branch_score(down_gain, up_gain)
            };

            if with_pricing {
                self.scoring
                    .entry_mut(cand.variable)
                    .record_score(host.focus_node(), score);
            }

            // spec §4.4 scopes the immediate-infeasibility commit to
            // Phase 2: a Phase-1 (LP-only) one-sided cutoff is recorded
            // and scoring continues over the rest of the candidates.
            let stop_here = one_sided && self.params.immediateinf && with_pricing;
            results.push(PhaseResult {
                candidate: cand,
                down_infeasible,
                up_infeasible,
                score,
            });
            if stop_here {
                break;
            }
        }
        Ok(results)
    }

    /// `select_original` (spec §4.4): picks a single-variable branching
    /// candidate by three-phase strong branching.
    pub fn select_original(&mut self, host: &mut dyn Host, gap: f64) -> Result<OriginalSelection, BranchingError> {
        if host.is_stopped() {
            return Err(BranchingError::Stopped);
        }

        let candidates = host.lp_branch_cands();
        if candidates.is_empty() {
            return Err(BranchingError::NoCandidate);
        }

        let qualified = self.qualify_candidates(host, &candidates);
        if qualified.is_empty() {
            return Err(BranchingError::NoCandidate);
        }

        let phase0 = self.phase0_filter(host, &qualified, gap);
        if phase0.is_empty() {
            return Err(BranchingError::NoCandidate);
        }

        let parent_bound = host.lower_bound(host.focus_node());
        let phase1 = self.strong_branch_candidates(host, &phase0, false, parent_bound)?;

        // Phase 2 is suppressed below `mincolgencands` (spec §8 boundary
        // behavior) and in stronglite mode (spec §4.4).
        let run_phase2 = !self.params.stronglite && phase0.len() >= self.params.mincolgencands;
        let final_results = if run_phase2 {
            let n1 = phase_top_n(phase1.len(), &self.params.phase1, gap);
            let mut sorted = phase1.clone();
            sorted.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
            let survivors: Vec<Candidate> = sorted.into_iter().take(n1).map(|r| r.candidate).collect();
            self.strong_branch_candidates(host, &survivors, true, parent_bound)?
        } else {
            phase1
        };

        let best = match final_results
            .iter()
            .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal))
        {
            Some(b) => *b,
            None => return Err(BranchingError::NoCandidate),
        };

        let var = best.candidate.variable;
        let val = best.candidate.lp_sol_val;
        let down = if best.down_infeasible {
            None
        } else {
            Some(DecisionRecord::single_variable(var, val, Direction::Down, true)?)
        };
        let up = if best.up_infeasible {
            None
        } else {
            Some(DecisionRecord::single_variable(var, val, Direction::Up, true)?)
        };

        Ok(OriginalSelection {
            variable: var,
            down_infeasible: best.down_infeasible,
            up_infeasible: best.up_infeasible,
            down,
            up,
        })
    }

    /// `select_ryan_foster` (spec §4.4): picks the pair maximizing
    /// `pair_score` of the two variables' per-variable scores.
    ///
    /// The host interface (spec §6) exposes no way to probe a same/differ
    /// split directly — that split fixes master-variable bounds, which
    /// only [`crate::stack::NodeBranchStack::propagate`] can do once the
    /// decision is committed — so pair selection here is heuristic
    /// (matches the worked example in spec §8 scenario 2), not
    /// probing-based.
    pub fn select_ryan_foster(
        &self,
        host: &dyn Host,
        pairs: &[(OriginalVariableId, OriginalVariableId, usize)],
    ) -> Result<RyanFosterSelection, BranchingError> {
        if pairs.is_empty() {
            return Err(BranchingError::NoCandidate);
        }

        let score_of = |var: OriginalVariableId| -> f64 {
            let sol_val = host.sol_val(var);
            if self.params.usepseudocosts {
                host.var_pseudocost_score(var, sol_val)
            } else {
                fractionality_score(sol_val)
            }
        };

        let mut best: Option<(f64, (OriginalVariableId, OriginalVariableId, usize))> = None;
        for &(v1, v2, block) in pairs {
            let score = pair_score(score_of(v1), score_of(v2));
            let better = best.as_ref().map(|&(b, _)| score > b).unwrap_or(true);
            if better {
                best = Some((score, (v1, v2, block)));
            }
        }

        let (_, (var1, var2, block)) = match best {
            Some(b) => b,
            None => return Err(BranchingError::NoCandidate),
        };
        let same = DecisionRecord::ryan_foster_pair(var1, var2, true, block)?;
        let differ = DecisionRecord::ryan_foster_pair(var1, var2, false, block)?;
        Ok(RyanFosterSelection {
            var1,
            var2,
            block,
            same,
            differ,
        })
    }
}

fn probe_direction(
    host: &mut dyn Host,
    var: OriginalVariableId,
    kind: BoundKind,
    value: f64,
    with_pricing: bool,
    parent_bound: f64,
) -> Result<(f64, bool), BranchingError> {
    let mut session = ProbingSession::open(host, vec![var]);
    session.set_bound(var, kind, value);
    if let PropagateOutcome::Cutoff = session.propagate() {
        return Ok((0.0, true));
    }
    let outcome = session.solve_relaxation(with_pricing, None)?;
    if outcome.is_cutoff() {
        return Ok((0.0, true));
    }
    let gain = outcome.objective.map(|o| (o - parent_bound).max(0.0)).unwrap_or(0.0);
    Ok((gain, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ProbingLpOutcome;
    use crate::support::FixtureHost;

    fn feasible_outcome(objective: f64) -> ProbingLpOutcome {
        ProbingLpOutcome {
            objective: Some(objective),
            solved: true,
            error: false,
            propagation_cutoff: false,
            pricing_cutoff: false,
            lp_iterations_used: 1,
        }
    }

    fn infeasible_outcome() -> ProbingLpOutcome {
        ProbingLpOutcome {
            objective: None,
            solved: false,
            error: false,
            propagation_cutoff: true,
            pricing_cutoff: false,
            lp_iterations_used: 1,
        }
    }

    #[test]
    fn scenario_one_selects_higher_product_score() {
        // Spec §8 scenario 1: x=(down=1.0,up=0.3) beats y=(down=0.2,up=0.8).
        let mut host = FixtureHost::new();
        let x = host.add_integer_var(0.0, 10.0);
        let y = host.add_integer_var(0.0, 10.0);
        host.set_sol_val(x, 0.6);
        host.set_sol_val(y, 0.6);
        host.set_block(x, BlockAssignment::None);
        host.set_block(y, BlockAssignment::None);

        host.set_probe_result(x, BoundKind::Upper, feasible_outcome(1.0));
        host.set_probe_result(x, BoundKind::Lower, feasible_outcome(0.3));
        host.set_probe_result(y, BoundKind::Upper, feasible_outcome(0.2));
        host.set_probe_result(y, BoundKind::Lower, feasible_outcome(0.8));

        let mut engine = StrongBranchingEngine::new(StrongBranchingParams {
            mincolgencands: 100, // force single-phase, matching the worked example
            phase0: PhaseLimits {
                min_out: 10,
                max_out: 10,
                max_out_frac: 1.0,
                gap_weight: 0.0,
            },
            ..StrongBranchingParams::default()
        });
        let selection = engine.select_original(&mut host, 0.5).unwrap();
        assert_eq!(selection.variable, x);
        assert!(!selection.down_infeasible);
        assert!(!selection.up_infeasible);
        assert!(selection.down.is_some());
        assert!(selection.up.is_some());
    }

    #[test]
    fn both_directions_infeasible_is_global_cutoff() {
        let mut host = FixtureHost::new();
        let w = host.add_integer_var(0.0, 10.0);
        host.set_sol_val(w, 0.5);
        host.set_probe_result(w, BoundKind::Upper, infeasible_outcome());
        host.set_probe_result(w, BoundKind::Lower, infeasible_outcome());

        let mut engine = StrongBranchingEngine::new(StrongBranchingParams::default());
        let err = engine.select_original(&mut host, 0.5).unwrap_err();
        assert_eq!(err, BranchingError::Infeasible);
    }

    #[test]
    fn one_sided_infeasible_commits_immediate_candidate() {
        let mut host = FixtureHost::new();
        let z = host.add_integer_var(0.0, 10.0);
        host.set_sol_val(z, 2.5);
        host.set_probe_result(z, BoundKind::Upper, feasible_outcome(0.4));
        host.set_probe_result(z, BoundKind::Lower, infeasible_outcome());

        let mut engine = StrongBranchingEngine::new(StrongBranchingParams {
            immediateinf: true,
            ..StrongBranchingParams::default()
        });
        let selection = engine.select_original(&mut host, 0.5).unwrap();
        assert_eq!(selection.variable, z);
        assert!(selection.up_infeasible);
        assert!(selection.up.is_none());
        assert!(selection.down.is_some());
    }

    #[test]
    fn block_uniqueness_prefers_unique_block_candidates() {
        let mut host = FixtureHost::new();
        let direct = host.add_integer_var(0.0, 10.0);
        let blocked = host.add_integer_var(0.0, 10.0);
        host.set_sol_val(direct, 0.4);
        host.set_sol_val(blocked, 0.4);
        host.set_block(direct, BlockAssignment::None);
        host.set_block(blocked, BlockAssignment::Block(0));

        let mut engine = StrongBranchingEngine::new(StrongBranchingParams::default());
        let candidates = host.lp_branch_cands();
        let qualified = engine.qualify_candidates(&host, &candidates);
        assert_eq!(qualified.len(), 1);
        assert_eq!(qualified[0].variable, blocked);
    }

    #[test]
    fn reused_score_is_available_within_reevalage_through_reduction_ancestors() {
        // spec §8 scenario 5: score recorded at the root, two pure
        // infeasibility-reduction nodes separate it from the focus node.
        let mut host = FixtureHost::new();
        let z = host.add_integer_var(0.0, 10.0);
        let recorded_node = host.focus_node_id();

        let n1 = host.create_child(0.0);
        host.set_node_reduction_only(n1, true);
        host.set_focus(n1);
        let n2 = host.create_child(0.0);
        host.set_node_reduction_only(n2, true);
        host.set_focus(n2);

        let mut engine = StrongBranchingEngine::new(StrongBranchingParams {
            reevalage: 2,
            ..StrongBranchingParams::default()
        });
        engine.scoring.entry_mut(z).record_score(recorded_node, 0.42);
        assert_eq!(engine.reused_score(&host, z), Some(0.42));

        // reevalage=1 must discard the same score over the same two ancestors.
        let mut strict_engine = StrongBranchingEngine::new(StrongBranchingParams {
            reevalage: 1,
            ..StrongBranchingParams::default()
        });
        strict_engine.scoring.entry_mut(z).record_score(recorded_node, 0.42);
        assert_eq!(strict_engine.reused_score(&host, z), None);
    }

    #[test]
    fn crossing_a_genuine_branch_invalidates_recency_even_with_large_reevalage() {
        let mut host = FixtureHost::new();
        let z = host.add_integer_var(0.0, 10.0);
        let recorded_node = host.focus_node_id();

        // a real two-sided split, not a reduction: `reduction_only` defaults to false.
        let n1 = host.create_child(0.0);
        host.set_focus(n1);

        let mut engine = StrongBranchingEngine::new(StrongBranchingParams {
            reevalage: 1000,
            ..StrongBranchingParams::default()
        });
        engine.scoring.entry_mut(z).record_score(recorded_node, 0.42);
        assert_eq!(engine.reused_score(&host, z), None);
        assert!(!engine.scoring.get(z).unwrap().score_recency());
    }

    #[test]
    fn immediateinf_break_is_scoped_to_phase_two() {
        let mut host = FixtureHost::new();
        let x = host.add_integer_var(0.0, 10.0);
        let y = host.add_integer_var(0.0, 10.0);
        host.set_probe_result(x, BoundKind::Upper, feasible_outcome(0.4));
        host.set_probe_result(x, BoundKind::Lower, infeasible_outcome());
        host.set_probe_result(y, BoundKind::Upper, feasible_outcome(0.3));
        host.set_probe_result(y, BoundKind::Lower, feasible_outcome(0.6));

        let mut engine = StrongBranchingEngine::new(StrongBranchingParams {
            immediateinf: true,
            ..StrongBranchingParams::default()
        });
        let candidates = vec![
            Candidate { variable: x, lp_sol_val: 2.5, frac: 0.5 },
            Candidate { variable: y, lp_sol_val: 3.5, frac: 0.5 },
        ];

        let phase1 = engine.strong_branch_candidates(&mut host, &candidates, false, 0.0).unwrap();
        assert_eq!(phase1.len(), 2, "a phase 1 one-sided cutoff must not stop scoring");

        let phase2 = engine.strong_branch_candidates(&mut host, &candidates, true, 0.0).unwrap();
        assert_eq!(phase2.len(), 1, "phase 2 still commits immediately on a one-sided cutoff");
    }

    #[test]
    fn ryan_foster_picks_higher_pair_score() {
        let mut host = FixtureHost::new();
        let a = host.add_binary_var();
        let b = host.add_binary_var();
        let c = host.add_binary_var();
        host.set_sol_val(a, 0.5);
        host.set_sol_val(b, 0.5);
        host.set_sol_val(c, 0.1);

        let engine = StrongBranchingEngine::new(StrongBranchingParams {
            usepseudocosts: false,
            ..StrongBranchingParams::default()
        });
        let pairs = vec![(a, b, 0), (a, c, 0)];
        let selection = engine.select_ryan_foster(&host, &pairs).unwrap();
        assert_eq!((selection.var1, selection.var2), (a, b));
    }
}
