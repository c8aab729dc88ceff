/// ==============================================================================================
/// ======================================= Model / Inputs =========================================
/// ==============================================================================================
//
// The source this engine is modeled after exposes its inputs as typed slots on a model value
// (`spec.md` §9). Here that is a plain struct, `Model`, validated exactly once by `Model::new` —
// every invariant from `spec.md` §3/§6 is checked up front so nothing downstream needs to
// re-validate shapes.

use ndarray::{Array1, Array2};

use crate::error::SimError;
use crate::event::{sort_events, Event};
use crate::gdata::GlobalData;
use crate::propensity::Registry;
use crate::sparse::CscMatrix;

/// Optional per-node hook invoked once after every `tspan` output point.
pub trait PostStep: Send + Sync {
    fn call(
        &self,
        u_col: &mut [i64],
        v_col: &mut [f64],
        ldata_col: &[f64],
        gdata: &GlobalData,
        t: f64,
    ) -> PostStepSignal;
}

#[derive(Debug, Clone, PartialEq)]
pub enum PostStepSignal {
    /// Nothing changed that would affect any transition's rate.
    Unchanged,
    /// `v` (or something read by a propensity) changed; the node's rates must be recomputed.
    RatesChanged,
    /// Caller-detected failure; aborts the run.
    Abort(String),
}

pub struct Model {
    pub n_nodes: usize,
    pub n_compartments: usize,
    pub n_transitions: usize,
    pub n_dims_v: usize,
    pub n_ldata: usize,

    pub g: CscMatrix,
    pub s: CscMatrix,
    pub e: CscMatrix,
    pub n_matrix: CscMatrix,

    pub u0: Array2<i64>,
    pub v0: Array2<f64>,
    /// Rownames for `v0`'s `Nd` rows; required (non-empty, length `Nd`) whenever `Nd > 0`
    /// (`spec.md` §6), empty otherwise.
    pub v_row_names: Vec<String>,
    pub ldata: Array2<f64>,
    pub gdata: GlobalData,

    pub tspan: Vec<f64>,
    pub events: Vec<Event>,

    pub propensities: Registry,
    pub post_step: Option<Box<dyn PostStep>>,

    pub seed: u64,
    pub n_threads: usize,
}

/// Everything needed to construct a `Model`, gathered into one record so `Model::new` has a
/// single flat argument list matching `spec.md` §6's input table.
pub struct ModelInputs {
    pub g: CscMatrix,
    pub s: CscMatrix,
    pub e: CscMatrix,
    pub n_matrix: CscMatrix,
    pub u0: Array2<i64>,
    pub v0: Array2<f64>,
    pub v_row_names: Vec<String>,
    pub ldata: Array2<f64>,
    pub gdata: GlobalData,
    pub tspan: Vec<f64>,
    pub events: Vec<Event>,
    pub propensities: Registry,
    pub post_step: Option<Box<dyn PostStep>>,
    pub seed: u64,
    pub n_threads: Option<usize>,
}

fn default_thread_count() -> usize {
    use once_cell::sync::Lazy;
    static DEFAULT: Lazy<usize> = Lazy::new(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    *DEFAULT
}

impl Model {
    /// Validate and assemble a `Model`. All shape, rowname, and monotonicity checks happen here;
    /// nothing downstream re-checks them (`spec.md` §9).
    pub fn new(mut inputs: ModelInputs) -> Result<Self, SimError> {
        let n_compartments = inputs.s.nrows();
        let n_transitions = inputs.s.ncols();
        let n_nodes = inputs.u0.ncols();
        let n_dims_v = inputs.v0.nrows();
        let n_ldata = inputs.ldata.nrows();
        let n_select = inputs.e.ncols();
        let n_shift = inputs.n_matrix.ncols();

        if inputs.g.nrows() != n_transitions || inputs.g.ncols() != n_transitions {
            return Err(SimError::invalid_input(format!(
                "G must be {n_transitions}x{n_transitions} (Nt x Nt), got {}x{}",
                inputs.g.nrows(),
                inputs.g.ncols()
            )));
        }
        if inputs.e.nrows() != n_compartments {
            return Err(SimError::invalid_input(format!(
                "E must have {n_compartments} rows (Nc), got {}",
                inputs.e.nrows()
            )));
        }
        if inputs.n_matrix.nrows() != n_compartments {
            return Err(SimError::invalid_input(format!(
                "N must have {n_compartments} rows (Nc), got {}",
                inputs.n_matrix.nrows()
            )));
        }
        if !inputs.s.row_names().is_empty() && !inputs.e.row_names().is_empty() {
            if inputs.s.row_names() != inputs.e.row_names() {
                return Err(SimError::invalid_input(
                    "rownames of S must equal rownames of E",
                ));
            }
        }
        if inputs.u0.nrows() != n_compartments {
            return Err(SimError::invalid_input(format!(
                "u0 must have {n_compartments} rows (Nc), got {}",
                inputs.u0.nrows()
            )));
        }
        if inputs.u0.iter().any(|&x| x < 0) {
            return Err(SimError::invalid_input("u0 must be non-negative"));
        }
        if n_dims_v > 0 && inputs.v0.ncols() != n_nodes {
            return Err(SimError::invalid_input(format!(
                "v0 must have {n_nodes} columns (Nn), got {}",
                inputs.v0.ncols()
            )));
        }
        if n_dims_v > 0 && inputs.v_row_names.is_empty() {
            return Err(SimError::invalid_input(
                "v_row_names is required when v0 has Nd > 0 rows",
            ));
        }
        if !inputs.v_row_names.is_empty() && inputs.v_row_names.len() != n_dims_v {
            return Err(SimError::invalid_input(format!(
                "v_row_names must have {n_dims_v} entries (Nd), got {}",
                inputs.v_row_names.len()
            )));
        }
        if n_ldata > 0 && inputs.ldata.ncols() != n_nodes {
            return Err(SimError::invalid_input(format!(
                "ldata must have {n_nodes} columns (Nn), got {}",
                inputs.ldata.ncols()
            )));
        }
        if inputs.tspan.len() < 2 {
            return Err(SimError::invalid_input("tspan must have length >= 2"));
        }
        if !inputs.tspan.windows(2).all(|w| w[1] > w[0]) {
            return Err(SimError::invalid_input("tspan must be strictly increasing"));
        }
        if inputs.propensities.len() != n_transitions {
            return Err(SimError::invalid_input(format!(
                "propensities must have {n_transitions} entries (Nt), got {}",
                inputs.propensities.len()
            )));
        }

        for event in &inputs.events {
            event.validate(n_nodes, n_select, n_shift)?;
        }
        sort_events(&mut inputs.events);

        let n_threads = inputs.n_threads.unwrap_or_else(default_thread_count).max(1);

        Ok(Self {
            n_nodes,
            n_compartments,
            n_transitions,
            n_dims_v,
            n_ldata,
            g: inputs.g,
            s: inputs.s,
            e: inputs.e,
            n_matrix: inputs.n_matrix,
            u0: inputs.u0,
            v0: inputs.v0,
            v_row_names: inputs.v_row_names,
            ldata: inputs.ldata,
            gdata: inputs.gdata,
            tspan: inputs.tspan,
            events: inputs.events,
            propensities: inputs.propensities,
            post_step: inputs.post_step,
            seed: inputs.seed,
            n_threads,
        })
    }

    #[inline]
    pub fn ldata_column(&self, node: usize) -> Vec<f64> {
        if self.n_ldata == 0 {
            return Vec::new();
        }
        self.ldata.column(node).iter().copied().collect()
    }
}

/// Convenience constructor for unnamed `gdata`, matching the common case in `spec.md` §6 where
/// `gdata` names are optional.
pub fn unnamed_gdata(values: Array1<f64>) -> GlobalData {
    GlobalData::unnamed(values.to_vec())
}
