/// ==============================================================================================
/// ===================================== Result Recorder ==========================================
/// ==============================================================================================
//
// Dense or sparse, `U`/`V` are written only from the driver thread after a tick's parallel phase
// has rejoined (`spec.md` §4.6: "serial ... to avoid contention").

use std::collections::HashSet;

use ndarray::Array2;

use crate::node::NodeState;

/// Which `(node, compartment)` / `(node, dim)` triples to keep, for sparse recording.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SparseMask {
    pub u_cells: HashSet<(usize, usize)>,
    pub v_cells: HashSet<(usize, usize)>,
}

/// `spec.md`'s "Persisted state" note leaves serialization to the caller; `Recorder` derives
/// `Serialize`/`Deserialize` so a caller can do that with `serde_json` directly (see
/// `SimOutput::to_json`/`SimOutput::save` in `driver.rs` for the concrete, ready-to-use form).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub enum Recorder {
    Dense {
        u: Array2<i64>,
        v: Array2<f64>,
    },
    Sparse {
        mask: SparseMask,
        u_entries: Vec<(usize, usize, usize, i64)>,
        v_entries: Vec<(usize, usize, usize, f64)>,
    },
}

impl Recorder {
    pub fn dense(n_compartments: usize, n_dims_v: usize, n_nodes: usize, n_time: usize) -> Self {
        Recorder::Dense {
            u: Array2::zeros((n_compartments * n_nodes, n_time)),
            v: Array2::zeros((n_dims_v * n_nodes, n_time)),
        }
    }

    pub fn sparse(mask: SparseMask) -> Self {
        Recorder::Sparse {
            mask,
            u_entries: Vec::new(),
            v_entries: Vec::new(),
        }
    }

    /// Record node `n`'s state into time column `k`. `n_compartments`/`n_dims_v` are needed to
    /// compute the dense row offset (`compartment * Nn + n`, following `spec.md` §3's
    /// `U[Nc*Nn, T]` layout).
    pub fn record(
        &mut self,
        k: usize,
        n: usize,
        n_compartments: usize,
        n_dims_v: usize,
        state: &NodeState,
    ) {
        match self {
            Recorder::Dense { u, v } => {
                let n_nodes_u = u.nrows() / n_compartments.max(1);
                for c in 0..n_compartments {
                    u[[c * n_nodes_u + n, k]] = state.u[c];
                }
                let n_nodes_v = if n_dims_v > 0 { v.nrows() / n_dims_v } else { 0 };
                for d in 0..n_dims_v {
                    v[[d * n_nodes_v + n, k]] = state.v[d];
                }
            }
            Recorder::Sparse {
                mask,
                u_entries,
                v_entries,
            } => {
                for c in 0..n_compartments {
                    if mask.u_cells.contains(&(n, c)) {
                        u_entries.push((n, c, k, state.u[c]));
                    }
                }
                for d in 0..n_dims_v {
                    if mask.v_cells.contains(&(n, d)) {
                        v_entries.push((n, d, k, state.v[d]));
                    }
                }
            }
        }
    }
}
