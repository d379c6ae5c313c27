//! `CandidateScorer` (spec §4.3): pure scoring functions used to order
//! and compare branching candidates. Nothing in this module touches the
//! host — every function is given the numbers it needs and returns a
//! number, mirroring the teacher's `BranchingCandidate` being a plain
//! data struct (`lp_sol_val`, `frac`) rather than a live handle.

use std::cmp::Ordering;

/// Weights for [`combined_score`] (spec §4.3 / §6 `conflict`,
/// `conflictlength`, `inference`, `cutoff`, `pscost` parameters).
#[derive(Debug, Clone, Copy)]
pub struct CombinedScoreWeights {
    pub conflict: f64,
    pub conflictlength: f64,
    pub inference: f64,
    pub cutoff: f64,
    pub pscost: f64,
}

impl Default for CombinedScoreWeights {
    fn default() -> Self {
        CombinedScoreWeights {
            conflict: 1.0,
            conflictlength: 0.0,
            inference: 1.0,
            cutoff: 1.0,
            pscost: 1.0,
        }
    }
}

/// Running averages the combined score normalizes each raw score
/// against (spec §4.3: "normalize each raw score by its running
/// average").
#[derive(Debug, Clone, Copy)]
pub struct CombinedScoreAverages {
    pub conflict: f64,
    pub conflictlength: f64,
    pub inference: f64,
    pub cutoff: f64,
    pub pscost: f64,
}

/// `min(frac, 1 - frac)`: how close `sol_value` is to the nearest
/// integer, symmetrically (spec §4.3).
pub fn fractionality_score(sol_value: f64) -> f64 {
    let frac = sol_value - sol_value.floor();
    frac.min(1.0 - frac)
}

/// Normalizes `raw` against its running average `avg` via
/// `1 - 1/(1 + raw/avg)`, the same normalization spec §4.3 uses for
/// every component of [`combined_score`].
fn normalize(raw: f64, avg: f64) -> f64 {
    if avg <= 0.0 {
        return 0.0;
    }
    1.0 - 1.0 / (1.0 + raw / avg)
}

/// Weighted combination of conflict/inference/cutoff/pseudocost
/// statistics for a candidate (spec §4.3).
///
/// Each raw score is normalized by its running average, then the
/// weighted sum is taken. If `fractional_part` is within `10 *
/// feastol` of an integer the total is scaled down by `1e-6` (such a
/// candidate should almost never win a tie against a genuinely
/// fractional one); the fractional part itself is floored at `0.0001`
/// when near-integral to avoid a zero denominator downstream.
#[allow(clippy::too_many_arguments)]
pub fn combined_score(
    conflict: f64,
    conflictlength: f64,
    inference: f64,
    cutoff: f64,
    pscost: f64,
    averages: CombinedScoreAverages,
    weights: CombinedScoreWeights,
    fractional_part: f64,
    feastol: f64,
) -> f64 {
    let total = weights.conflict * normalize(conflict, averages.conflict)
        + weights.conflictlength * normalize(conflictlength, averages.conflictlength)
        + weights.inference * normalize(inference, averages.inference)
        + weights.cutoff * normalize(cutoff, averages.cutoff)
        + weights.pscost * normalize(pscost, averages.pscost);

    let near_integral = (fractional_part - fractional_part.round()).abs() <= 10.0 * feastol;
    if near_integral {
        total * 1e-6
    } else {
        total
    }
}

/// Clamps a fractional part away from zero near an integer, per spec
/// §4.3 ("clamp the fractional part to >= 0.0001 when near-integral").
pub fn clamp_fractional_part(fractional_part: f64) -> f64 {
    if fractional_part < 0.0001 {
        0.0001
    } else {
        fractional_part
    }
}

/// Geometric product of two per-variable scores, used for Ryan-Foster
/// pair candidates (spec §4.3).
pub fn pair_score(score1: f64, score2: f64) -> f64 {
    score1 * score2
}

/// A scored candidate, carrying enough to apply the spec §4.3 tie-break
/// order without re-deriving it at every call site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate<Id> {
    pub id: Id,
    pub combined: f64,
    pub fractionality: f64,
    /// Smaller is preferred (spec §4.3 tertiary tie-break).
    pub domain_size: f64,
}

impl<Id> ScoredCandidate<Id> {
    /// Total order: primary = combined score (descending), secondary =
    /// fractionality score (descending), tertiary = domain size
    /// (ascending). Spec §9 flags the source's `score_compare_function`
    /// as inconsistent on equal scores ("returns 1 for equal-or-less");
    /// this is a strict, total tie-break instead.
    pub fn cmp_by_tiebreak(&self, other: &Self) -> Ordering {
        other
            .combined
            .partial_cmp(&self.combined)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                other
                    .fractionality
                    .partial_cmp(&self.fractionality)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| {
                self.domain_size
                    .partial_cmp(&other.domain_size)
                    .unwrap_or(Ordering::Equal)
            })
    }
}

/// Sorts `candidates` best-first by the spec §4.3 tie-break order.
pub fn sort_by_tiebreak<Id>(candidates: &mut [ScoredCandidate<Id>]) {
    candidates.sort_by(|a, b| a.cmp_by_tiebreak(b));
}
