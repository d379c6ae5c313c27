//! `ProbingSession` (spec §4.2): scoped acquisition of the host's probing
//! mode, guaranteeing `open -> apply -> propagate -> maybe-solve-LP ->
//! record -> close` symmetry on every exit path.
//!
//! Grounded on the teacher's `probing::Prober`: a guard struct whose
//! `Drop` impl calls the host's `end_probing`, so an early return from a
//! probe cannot leak an open probing session.

use crate::error::BranchingError;
use crate::host::{BoundKind, Host, PropagateOutcome};
use crate::types::OriginalVariableId;

/// Scoped handle to the host's probing mode. At most one session may be
/// open at a time (spec §4.2 ordering guarantee); entering any probing
/// call while a session exists is a programmer error that this guard
/// prevents by construction — there is nowhere else to get a session
/// from.
pub struct ProbingSession<'h> {
    host: &'h mut dyn Host,
    watched: Vec<OriginalVariableId>,
    closed: bool,
}

impl<'h> ProbingSession<'h> {
    /// Starts probing and pushes a new probing node. `watched` is the
    /// set of variables `snapshot_bounds` will report on.
    pub fn open(host: &'h mut dyn Host, watched: Vec<OriginalVariableId>) -> Self {
        assert!(
            !host.in_probing(),
            "nested probing sessions are forbidden: only one probing mode may be active at a time"
        );
        host.start_probing();
        host.new_probing_node();
        ProbingSession {
            host,
            watched,
            closed: false,
        }
    }

    /// Changes a bound within the probing node.
    pub fn set_bound(&mut self, var: OriginalVariableId, kind: BoundKind, value: f64) {
        self.host.chg_var_bound_probing(var, kind, value);
    }

    /// Runs host propagation; returns a cutoff outcome if infeasibility
    /// was detected.
    pub fn propagate(&mut self) -> PropagateOutcome {
        self.host.propagate_probing()
    }

    /// Solves the probing relaxation, optionally with pricing.
    ///
    /// Per spec §4.2, an unresolved LP error means the caller must treat
    /// the probe as inconclusive — this returns `Err(LpError)` rather
    /// than a best-effort value so callers cannot accidentally use a
    /// half-valid objective.
    pub fn solve_relaxation(
        &mut self,
        with_pricing: bool,
        iter_limit: Option<usize>,
    ) -> Result<crate::host::ProbingLpOutcome, BranchingError> {
        let outcome = self.host.perform_probing(with_pricing, iter_limit);
        if outcome.error {
            return Err(BranchingError::LpError);
        }
        Ok(outcome)
    }

    /// Captures post-propagation `(lb, ub)` bounds of every watched
    /// variable.
    pub fn snapshot_bounds(&self) -> Vec<(f64, f64)> {
        self.watched
            .iter()
            .map(|&v| (self.host.var_lb_local(v), self.host.var_ub_local(v)))
            .collect()
    }

    /// Ends probing early. Calling this explicitly is optional — `Drop`
    /// does it too — but it lets a caller observe the moment probing
    /// actually ends rather than relying on scope exit.
    pub fn close(mut self) {
        self.close_inner();
    }

    fn close_inner(&mut self) {
        if !self.closed {
            self.host.end_probing();
            self.closed = true;
        }
    }
}

impl Drop for ProbingSession<'_> {
    fn drop(&mut self) {
        self.close_inner();
    }
}
