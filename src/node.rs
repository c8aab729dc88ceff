/// ==============================================================================================
/// ================================ Per-Node State & SSA Stepper =================================
/// ==============================================================================================
//
// `NodeState` is the exclusive-ownership unit from `spec.md` §3: `u[:,n]`, `v[:,n]`, `t_node[n]`,
// `rate[:,n]`, `rate_sum[n]` live here, touched only by the worker currently processing this node
// (plus, transiently, the driver thread during event application — see `driver.rs`).

use ndarray::Array1;

use crate::error::SimError;
use crate::event::{Event, EventKind};
use crate::gdata::GlobalData;
use crate::propensity::Registry;
use crate::rng::WorkerRng;
use crate::sparse::CscMatrix;

/// Recompute every rate from scratch after this many fires, bounding the numerical drift that an
/// incrementally-maintained `rate_sum` accumulates (`spec.md` §4.3 "Edge cases").
pub const RATE_REFRESH_INTERVAL: u64 = 10_000;

pub struct NodeState {
    pub u: Array1<i64>,
    pub v: Array1<f64>,
    pub t: f64,
    pub rate: Vec<f64>,
    pub rate_sum: f64,
    fires_since_refresh: u64,
}

impl NodeState {
    pub fn new(u0: Array1<i64>, v0: Array1<f64>, t0: f64, n_transitions: usize) -> Self {
        Self {
            u: u0,
            v: v0,
            t: t0,
            rate: vec![0.0; n_transitions],
            rate_sum: 0.0,
            fires_since_refresh: 0,
        }
    }

    /// Recompute rate `j` from the current `(u, v)` and adjust `rate_sum` by the resulting delta.
    /// `node_idx` is only used for error messages.
    pub(crate) fn recompute_rate(
        &mut self,
        node_idx: usize,
        j: usize,
        registry: &Registry,
        ldata_col: &[f64],
        gdata: &GlobalData,
    ) -> Result<(), SimError> {
        let value = registry.eval(j, self.u.as_slice().unwrap(), self.v.as_slice().unwrap(), ldata_col, gdata, self.t);
        if !value.is_finite() || value < 0.0 {
            return Err(SimError::PropensityError {
                transition: j,
                node: node_idx,
                t: self.t,
                value,
            });
        }
        self.rate_sum += value - self.rate[j];
        self.rate[j] = value;
        Ok(())
    }

    /// Recompute every rate from scratch and reset `rate_sum` exactly to their sum (used at
    /// initialization, after any event, and periodically to bound drift).
    pub fn recompute_all_rates(
        &mut self,
        node_idx: usize,
        registry: &Registry,
        ldata_col: &[f64],
        gdata: &GlobalData,
    ) -> Result<(), SimError> {
        let mut sum = 0.0;
        for j in 0..registry.len() {
            let value = registry.eval(j, self.u.as_slice().unwrap(), self.v.as_slice().unwrap(), ldata_col, gdata, self.t);
            if !value.is_finite() || value < 0.0 {
                return Err(SimError::PropensityError {
                    transition: j,
                    node: node_idx,
                    t: self.t,
                    value,
                });
            }
            self.rate[j] = value;
            sum += value;
        }
        self.rate_sum = sum;
        self.fires_since_refresh = 0;
        Ok(())
    }

    /// Apply `S[:, j]` to `u`, failing if any compartment would go negative (`spec.md` §4.3 step 5).
    fn apply_stoichiometry(&mut self, node_idx: usize, j: usize, s: &CscMatrix) -> Result<(), SimError> {
        for (row, delta) in s.column(j) {
            let new_val = self.u[row] + delta.round() as i64;
            if new_val < 0 {
                return Err(SimError::StoichiometryViolation {
                    node: node_idx,
                    transition: j,
                    compartment: row,
                    value: new_val,
                });
            }
            self.u[row] = new_val;
        }
        Ok(())
    }

    /// Advance this node's clock from `self.t` up to but not past `t_target`, firing transitions
    /// via the Gillespie direct method (`spec.md` §4.3). Does nothing if `self.t >= t_target`
    /// already (used by the driver when a node is "ahead" relative to a shared tick boundary).
    pub fn advance(
        &mut self,
        node_idx: usize,
        t_target: f64,
        registry: &Registry,
        g: &CscMatrix,
        s: &CscMatrix,
        ldata_col: &[f64],
        gdata: &GlobalData,
        rng: &mut WorkerRng,
    ) -> Result<(), SimError> {
        loop {
            if self.t >= t_target {
                self.t = t_target;
                return Ok(());
            }
            if self.rate_sum <= 0.0 {
                self.t = t_target;
                return Ok(());
            }

            let tau = rng.exponential(self.rate_sum);
            if self.t + tau > t_target {
                self.t = t_target;
                return Ok(());
            }

            let r = rng.uniform() * self.rate_sum;
            let j = self.select_transition(r);

            self.apply_stoichiometry(node_idx, j, s)?;

            for (i, _) in g.column(j) {
                self.recompute_rate(node_idx, i, registry, ldata_col, gdata)?;
            }

            self.fires_since_refresh += 1;
            if self.fires_since_refresh >= RATE_REFRESH_INTERVAL
                || !self.rate_sum.is_finite()
                || self.rate_sum < 0.0
            {
                self.recompute_all_rates(node_idx, registry, ldata_col, gdata)?;
            }

            self.t += tau;
        }
    }

    /// Cumulative scan: smallest `j` with `sum(rate[0..=j]) >= r`. Linear in `Nt`, acceptable
    /// since `Nt` is small in practice (`spec.md` §4.3 step 4).
    fn select_transition(&self, r: f64) -> usize {
        let mut acc = 0.0;
        for (j, &rate) in self.rate.iter().enumerate() {
            acc += rate;
            if acc >= r {
                return j;
            }
        }
        // Floating-point drift can leave the cumulative sum a hair below `r`; fall back to the
        // last transition with nonzero rate rather than panic.
        self.rate
            .iter()
            .rposition(|&rate| rate > 0.0)
            .unwrap_or(self.rate.len() - 1)
    }

    /// Mark all rates stale and recompute in full (`spec.md` §4.4 "State invalidation": after any
    /// event touches `u`, the dependency graph is not trusted — an event can touch many
    /// compartments at once).
    pub fn invalidate_after_event(
        &mut self,
        node_idx: usize,
        registry: &Registry,
        ldata_col: &[f64],
        gdata: &GlobalData,
    ) -> Result<(), SimError> {
        self.recompute_all_rates(node_idx, registry, ldata_col, gdata)
    }
}

/// Resolve an event's requested count against the current state of its selected compartments,
/// per `spec.md` §4.4 "Count resolution": an explicit `n > 0` is used as-is; `n == 0` instead
/// scales `proportion` against the total currently held across the selected compartments,
/// rounding half-away-from-zero (the rounding convention `spec.md` §9 leaves open).
pub fn resolve_count(event: &Event, selected_total: i64) -> u64 {
    if event.n > 0 {
        return event.n;
    }
    let raw = event.proportion * selected_total as f64;
    round_half_away_from_zero(raw).max(0.0) as u64
}

fn round_half_away_from_zero(x: f64) -> f64 {
    if x >= 0.0 {
        (x + 0.5).floor()
    } else {
        (x - 0.5).ceil()
    }
}

/// Apply an `EXIT`, `ENTER`, or `INTERNAL_TRANSFER` event to a single node in place.
/// `EXTERNAL_TRANSFER` needs mutable access to two nodes at once and is handled by the driver.
pub fn apply_local_event(
    node_idx: usize,
    state: &mut NodeState,
    event: &Event,
    e: &CscMatrix,
    n_matrix: &CscMatrix,
    rng: &mut WorkerRng,
) -> Result<(), SimError> {
    debug_assert!(event.kind != EventKind::ExternalTransfer);

    let select_cols: Vec<(usize, f64)> = e.column(event.select).collect();

    match event.kind {
        EventKind::Enter => {
            // Conventionally the first nonzero entry of the select column.
            let Some(&(compartment, _)) = select_cols.first() else {
                return Err(SimError::InconsistentEvent {
                    node: node_idx,
                    time: event.time,
                    message: format!("ENTER event select column {} is empty", event.select),
                });
            };
            let count = resolve_count(event, 0);
            state.u[compartment] += count as i64;
        }
        EventKind::Exit => {
            let drawn = draw_from_selection(node_idx, state, event, &select_cols, rng)?;
            for (compartment, k) in drawn {
                state.u[compartment] -= k as i64;
            }
        }
        EventKind::InternalTransfer => {
            let Some(shift_col) = event.shift else {
                return Err(SimError::InconsistentEvent {
                    node: node_idx,
                    time: event.time,
                    message: "INTERNAL_TRANSFER event missing shift column".to_string(),
                });
            };
            let shift_entries: Vec<(usize, f64)> = n_matrix.column(shift_col).collect();
            let drawn = draw_from_selection(node_idx, state, event, &select_cols, rng)?;
            for (compartment, k) in drawn {
                if k == 0 {
                    continue;
                }
                state.u[compartment] -= k as i64;
                let target = remap_compartment(compartment, &shift_entries);
                state.u[target] += k as i64;
            }
        }
        EventKind::ExternalTransfer => unreachable!("handled by the driver"),
    }

    if state.u.iter().any(|&x| x < 0) {
        return Err(SimError::InconsistentEvent {
            node: node_idx,
            time: event.time,
            message: "event application drove a compartment negative".to_string(),
        });
    }

    Ok(())
}

/// Shared EXIT-style sampling used by `EXIT`, `INTERNAL_TRANSFER`, and (from `driver.rs`) the
/// source side of `EXTERNAL_TRANSFER`: draw `k` individuals without replacement across the
/// selected compartments, weighted by current count.
pub fn draw_from_selection(
    node_idx: usize,
    state: &NodeState,
    event: &Event,
    select_cols: &[(usize, f64)],
    rng: &mut WorkerRng,
) -> Result<Vec<(usize, u64)>, SimError> {
    let weights: Vec<f64> = select_cols
        .iter()
        .map(|&(c, _)| state.u[c] as f64)
        .collect();
    let total: i64 = weights.iter().map(|&w| w as i64).sum();
    let k = resolve_count(event, total);

    if k as i64 > total {
        return Err(SimError::InconsistentEvent {
            node: node_idx,
            time: event.time,
            message: format!(
                "requested {k} individuals but only {total} are available in the selected compartments"
            ),
        });
    }

    let drawn = rng.sample_without_replacement(&weights, k);
    Ok(select_cols
        .iter()
        .zip(drawn)
        .map(|(&(c, _), k)| (c, k))
        .collect())
}

/// For `INTERNAL_TRANSFER`: the destination compartment for an individual currently in
/// `compartment`, per the shift-remapping column (`N[:, shift]`, a one-to-one row permutation
/// encoded as a delta: `N[c, shift]` nonzero marks `c` as a source whose target is
/// `c + N[c, shift]`, per `spec.md`'s "shift amounts" description of `N`).
fn remap_compartment(compartment: usize, shift_entries: &[(usize, f64)]) -> usize {
    for &(row, delta) in shift_entries {
        if row == compartment {
            let target = compartment as i64 + delta.round() as i64;
            debug_assert!(target >= 0, "shift produced a negative compartment index");
            return target as usize;
        }
    }
    compartment
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn resolve_count_uses_explicit_n_when_nonzero() {
        let event = Event {
            kind: EventKind::Exit,
            time: 1,
            node: 0,
            dest: None,
            n: 7,
            proportion: 0.9,
            select: 0,
            shift: None,
        };
        assert_eq!(resolve_count(&event, 100), 7);
    }

    #[test]
    fn resolve_count_rounds_half_away_from_zero() {
        let event = Event {
            kind: EventKind::Exit,
            time: 1,
            node: 0,
            dest: None,
            n: 0,
            proportion: 0.5,
            select: 0,
            shift: None,
        };
        // 0.5 * 5 = 2.5 -> 3
        assert_eq!(resolve_count(&event, 5), 3);
    }
}
