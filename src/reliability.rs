//! `ReliabilityProbingEngine` (spec §4.6): pseudocost-based branching
//! that only probes candidates whose history is unreliable, accumulates
//! bound tightenings in a [`BoundChangeLedger`], and can return a
//! domain-reduction result in place of a branching decision.

use crate::decision::{DecisionRecord, Direction};
use crate::error::BranchingError;
use crate::host::{BoundKind, Candidate, Host};
use crate::ledger::BoundChangeLedger;
use crate::probing::ProbingSession;
use crate::scorer::{clamp_fractional_part, combined_score, CombinedScoreAverages, CombinedScoreWeights, ScoredCandidate};
use crate::scoring_state::ScoringStateTable;
use crate::types::OriginalVariableId;

#[derive(Debug, Clone, Copy)]
pub struct ReliabilityParams {
    pub weights: CombinedScoreWeights,
    pub minreliable: f64,
    pub maxreliable: f64,
    pub iterquot: f64,
    pub iterofs: usize,
    pub maxlookahead: usize,
    pub initcand: usize,
    pub inititer: Option<usize>,
    pub maxbdchgs: usize,
    pub minbdchgs: usize,
    pub uselp: bool,
    pub reliability_threshold: f64,
}

impl Default for ReliabilityParams {
    fn default() -> Self {
        ReliabilityParams {
            weights: CombinedScoreWeights::default(),
            minreliable: 1.0,
            maxreliable: 8.0,
            iterquot: 0.5,
            iterofs: 1000,
            maxlookahead: 8,
            initcand: 100,
            inititer: None,
            maxbdchgs: usize::MAX,
            minbdchgs: 1,
            uselp: true,
            reliability_threshold: 0.8,
        }
    }
}

/// Outcome of [`ReliabilityProbingEngine::select`].
#[derive(Debug)]
pub enum ReliabilityResult {
    /// A branching variable was chosen; `down`/`up` are `None` exactly
    /// on the side that probing proved infeasible.
    Branch {
        variable: OriginalVariableId,
        down: Option<DecisionRecord>,
        up: Option<DecisionRecord>,
    },
    /// The ledger accumulated enough tightenings to apply directly
    /// instead of branching (spec §8 scenario 4).
    ReducedDomain { n_changes: usize },
}

pub struct ReliabilityProbingEngine {
    params: ReliabilityParams,
    scoring: ScoringStateTable,
}

impl ReliabilityProbingEngine {
    pub fn new(params: ReliabilityParams) -> Self {
        ReliabilityProbingEngine {
            params,
            scoring: ScoringStateTable::new(),
        }
    }

    pub fn params(&self) -> &ReliabilityParams {
        &self.params
    }

    pub fn scoring(&self) -> &ScoringStateTable {
        &self.scoring
    }

    fn is_unreliable(&self, var: OriginalVariableId, depth: u32, total_branchings: u64) -> bool {
        if depth <= 2 {
            return true;
        }
        let ratio = self
            .scoring
            .get(var)
            .map(|s| s.reliability_ratio(total_branchings))
            .unwrap_or(0.0);
        ratio < self.params.reliability_threshold
    }

    fn score_of(&self, host: &dyn Host, candidate: &Candidate) -> f64 {
        let averages = CombinedScoreAverages {
            conflict: 1.0,
            conflictlength: 1.0,
            inference: 1.0,
            cutoff: 1.0,
            pscost: 1.0,
        };
        let fractional_part = clamp_fractional_part(candidate.frac);
        combined_score(
            host.var_conflict_score(candidate.variable),
            host.var_conflictlength_score(candidate.variable),
            host.var_avg_inference_score(candidate.variable),
            host.var_avg_cutoff_score(candidate.variable),
            host.var_pseudocost_score(candidate.variable, candidate.lp_sol_val),
            averages,
            self.params.weights,
            fractional_part,
            host.feastol(),
        )
    }

    /// `select(candidates, candidate_values, candidate_fractions)` (spec
    /// §4.6). `depth` and `total_branchings` feed the reliability
    /// predicate; `host` supplies everything else.
    pub fn select(
        &mut self,
        host: &mut dyn Host,
        candidates: &[Candidate],
        depth: u32,
        total_branchings: u64,
    ) -> Result<ReliabilityResult, BranchingError> {
        if host.is_stopped() {
            return Err(BranchingError::Stopped);
        }
        if candidates.is_empty() {
            return Err(BranchingError::NoCandidate);
        }

        let mut ledger = BoundChangeLedger::new(
            candidates
                .iter()
                .map(|c| (c.variable, host.var_lb_local(c.variable), host.var_ub_local(c.variable))),
        );

        let unreliable: Vec<Candidate> = candidates
            .iter()
            .filter(|c| self.is_unreliable(c.variable, depth, total_branchings))
            .copied()
            .collect();

        let reliable_pool = if unreliable.is_empty() { candidates } else { &unreliable };
        let mut scored: Vec<(Candidate, f64)> = reliable_pool.iter().map(|c| (*c, self.score_of(host, c))).collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(self.params.initcand);

        let mut best: Option<ScoredCandidate<OriginalVariableId>> = None;
        let mut best_down: Option<DecisionRecord> = None;
        let mut best_up: Option<DecisionRecord> = None;
        let mut since_improvement = 0usize;
        let mut n_infeasibility_probes = 0usize;

        for (candidate, _prior_score) in scored {
            if since_improvement >= self.params.maxlookahead {
                break;
            }

            let var = candidate.variable;
            let val = candidate.lp_sol_val;
            let cur_ub = host.var_ub_local(var);
            let cur_lb = host.var_lb_local(var);

            let mut down_floor = val.floor();
            if down_floor == cur_ub {
                down_floor -= 1.0;
            }
            let mut up_ceil = val.ceil();
            if up_ceil == cur_lb {
                up_ceil += 1.0;
            }

            let (down_obj, down_infeasible) = probe_bound(host, var, BoundKind::Upper, down_floor, self.params.uselp)?;
            let (up_obj, up_infeasible) = probe_bound(host, var, BoundKind::Lower, up_ceil, self.params.uselp)?;

            if down_infeasible && up_infeasible {
                return Err(BranchingError::Infeasible);
            }

            if down_infeasible {
                n_infeasibility_probes += 1;
                ledger.add(var, BoundKind::Lower, val.ceil(), true)?;
            }
            if up_infeasible {
                n_infeasibility_probes += 1;
                ledger.add(var, BoundKind::Upper, val.floor(), true)?;
            }

            if !down_infeasible && !up_infeasible {
                if let Some(gain) = down_obj {
                    host.update_var_pseudocost(var, val - down_floor, gain);
                }
                if let Some(gain) = up_obj {
                    host.update_var_pseudocost(var, up_ceil - val, gain);
                }
            }

            let score = self.score_of(host, &candidate);
            let scored_candidate = ScoredCandidate {
                id: var,
                combined: score,
                fractionality: crate::scorer::fractionality_score(val),
                domain_size: cur_ub - cur_lb,
            };

            let is_better = match &best {
                None => true,
                Some(current) => scored_candidate.cmp_by_tiebreak(current) == std::cmp::Ordering::Less,
            };

            if is_better {
                let is_integral = host.var_type(var).is_integral();
                best_down = if down_infeasible {
                    None
                } else {
                    Some(DecisionRecord::single_variable(var, val, Direction::Down, is_integral)?)
                };
                best_up = if up_infeasible {
                    None
                } else {
                    Some(DecisionRecord::single_variable(var, val, Direction::Up, is_integral)?)
                };
                best = Some(scored_candidate);
                since_improvement = 0;
            } else {
                since_improvement += 1;
            }

            self.scoring.entry_mut(var).increment_probing();
        }

        let should_apply = ledger.n_changes() >= self.params.minbdchgs || n_infeasibility_probes >= 5;
        if should_apply && !ledger.is_empty() {
            let focus_node = host.focus_node();
            let applied = ledger.apply(host, focus_node);
            return Ok(ReliabilityResult::ReducedDomain { n_changes: applied });
        }

        let Some(best) = best else {
            return Err(BranchingError::NoCandidate);
        };
        self.scoring.entry_mut(best.id).increment_branching();

        Ok(ReliabilityResult::Branch {
            variable: best.id,
            down: best_down,
            up: best_up,
        })
    }
}

/// Runs one probing direction, returning `(objective, infeasible)`.
fn probe_bound(
    host: &mut dyn Host,
    var: OriginalVariableId,
    kind: BoundKind,
    value: f64,
    with_pricing: bool,
) -> Result<(Option<f64>, bool), BranchingError> {
    let mut session = ProbingSession::open(host, vec![var]);
    session.set_bound(var, kind, value);
    if matches!(session.propagate(), crate::host::PropagateOutcome::Cutoff) {
        return Ok((None, true));
    }
    let outcome = session.solve_relaxation(with_pricing, None)?;
    Ok((outcome.objective, outcome.is_cutoff()))
}
