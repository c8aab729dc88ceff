/// ==============================================================================================
/// ==================================== Scheduler / Driver =========================================
/// ==============================================================================================
//
// Top-level sequence, per `spec.md` §4.5: for each `tspan` output point, advance every node's SSA
// to the next integer tick (or to the output point, whichever is sooner), apply that tick's
// events, repeat until the output point is reached, run the post-step hook, then record.
//
// Nodes are statically partitioned into contiguous worker chunks once, at the start of `run`.
// Each worker owns a disjoint `&mut [NodeState]` slice (via `split_at_mut` over one `Vec`) plus
// its own RNG stream for the whole run; both are handed to a `crossbeam::thread::scope` per SSA
// phase. Event application at each tick is done by the driver thread alone, after that phase's
// scope has rejoined — see DESIGN.md for why this (rather than per-node-parallel event
// application with node-index-ordered locking) is the simpler and still fully compliant choice
// for `EXTERNAL_TRANSFER`'s cross-node write.

use std::fs::File;
use std::io::{Error, ErrorKind, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indicatif::ProgressBar;
use rayon::prelude::*;

use crate::error::{Partial, Result, SimError};
use crate::event::{Event, EventKind};
use crate::model::{Model, PostStepSignal};
use crate::node::{self, NodeState};
use crate::recorder::{Recorder, SparseMask};
use crate::rng::WorkerRng;
use crate::status::Status;

#[derive(serde::Serialize)]
pub struct SimOutput {
    pub recorder: Recorder,
    pub status: Status,
    /// How many `tspan` columns were fully recorded (may be less than `tspan.len()` on
    /// cancellation or a mid-run error).
    pub completed_columns: usize,
}

impl SimOutput {
    /// Pretty-printed JSON of the whole output, for callers that want one in-memory string
    /// rather than a file (`spec.md`'s "Persisted state" note leaves the choice to the caller).
    pub fn to_json(&self) -> std::io::Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::new(ErrorKind::InvalidData, format!("SimOutput::to_json: {e}")))
    }

    /// Write this output as pretty-printed JSON to `path`, creating parent directories as
    /// needed.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::new(
                        e.kind(),
                        format!("SimOutput::save: create dir {}: {e}", parent.display()),
                    )
                })?;
            }
        }

        let json = self.to_json()?;

        let mut file = File::create(path).map_err(|e| {
            Error::new(
                e.kind(),
                format!("SimOutput::save: create {}: {e}", path.display()),
            )
        })?;

        file.write_all(json.as_bytes()).map_err(|e| {
            Error::new(
                e.kind(),
                format!("SimOutput::save: write {}: {e}", path.display()),
            )
        })
    }
}

/// Contiguous node ranges, one per worker. `ranges[w] = (start, end)`, nodes `[start, end)`.
fn partition_nodes(n_nodes: usize, n_workers: usize) -> Vec<(usize, usize)> {
    let n_workers = n_workers.max(1).min(n_nodes.max(1));
    let base = n_nodes / n_workers;
    let extra = n_nodes % n_workers;
    let mut ranges = Vec::with_capacity(n_workers);
    let mut start = 0;
    for w in 0..n_workers {
        let len = base + if w < extra { 1 } else { 0 };
        ranges.push((start, start + len));
        start += len;
    }
    ranges
}

fn worker_of(node: usize, ranges: &[(usize, usize)]) -> usize {
    ranges
        .iter()
        .position(|&(start, end)| node >= start && node < end)
        .expect("node index must fall within exactly one worker's range")
}

/// Run the whole simulation described by `model`, producing one `U`/`V` column per `tspan` entry.
pub fn run(
    model: &Model,
    mask: Option<SparseMask>,
    cancel: Option<Arc<AtomicBool>>,
    progress: Option<&ProgressBar>,
) -> std::result::Result<SimOutput, Partial<SimOutput>> {
    let n_nodes = model.n_nodes;
    let n_time = model.tspan.len();
    let ranges = partition_nodes(n_nodes, model.n_threads);
    let n_workers = ranges.len();

    let mut nodes: Vec<NodeState> = (0..n_nodes)
        .map(|n| {
            NodeState::new(
                model.u0.column(n).to_owned(),
                if model.n_dims_v > 0 {
                    model.v0.column(n).to_owned()
                } else {
                    ndarray::Array1::zeros(0)
                },
                model.tspan[0],
                model.n_transitions,
            )
        })
        .collect();

    let mut rngs: Vec<WorkerRng> = (0..n_workers)
        .map(|w| WorkerRng::new(model.seed, w))
        .collect();

    let mut recorder = match mask {
        Some(mask) => Recorder::sparse(mask),
        None => Recorder::dense(model.n_compartments, model.n_dims_v, n_nodes, n_time),
    };

    // Initialize every node's rates before the clock moves at all.
    if let Err(e) = init_rates(&mut nodes, model) {
        return Err(Partial {
            output: SimOutput {
                recorder,
                status: Status::RuntimeError,
                completed_columns: 0,
            },
            error: e,
        });
    }

    let mut next_tick: i64 = model.tspan[0].ceil() as i64;

    for k in 0..n_time {
        if let Some(flag) = &cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(Partial {
                    output: SimOutput {
                        recorder,
                        status: Status::Cancelled,
                        completed_columns: k,
                    },
                    error: SimError::Cancelled,
                });
            }
        }

        let t_next = model.tspan[k];

        loop {
            if let Err(e) = advance_all(&mut nodes, &ranges, &mut rngs, model, t_next.min(next_tick as f64)) {
                return Err(Partial {
                    output: SimOutput {
                        recorder,
                        status: Status::RuntimeError,
                        completed_columns: k,
                    },
                    error: e,
                });
            }

            if (next_tick as f64) > t_next {
                break;
            }

            if let Err(e) = apply_tick_events(&mut nodes, &ranges, &mut rngs, model, next_tick) {
                return Err(Partial {
                    output: SimOutput {
                        recorder,
                        status: Status::RuntimeError,
                        completed_columns: k,
                    },
                    error: e,
                });
            }

            next_tick += 1;
        }

        if let Some(post_step) = &model.post_step {
            if let Err(e) = run_post_step(&mut nodes, model, post_step.as_ref(), t_next) {
                return Err(Partial {
                    output: SimOutput {
                        recorder,
                        status: Status::RuntimeError,
                        completed_columns: k,
                    },
                    error: e,
                });
            }
        }

        for (n, state) in nodes.iter().enumerate() {
            recorder.record(k, n, model.n_compartments, model.n_dims_v, state);
        }

        if let Some(pb) = progress {
            pb.set_position((k + 1) as u64);
        }
    }

    Ok(SimOutput {
        recorder,
        status: Status::Ok,
        completed_columns: n_time,
    })
}

/// Every node's first rate computation is independent of every other node's, so this one-shot
/// pass (unlike the tick loop, which must barrier on shared tick boundaries) is plain data
/// parallelism rather than the driver's own worker partition.
fn init_rates(nodes: &mut [NodeState], model: &Model) -> Result<()> {
    nodes
        .par_iter_mut()
        .enumerate()
        .map(|(n, state)| {
            let ldata_col = model.ldata_column(n);
            state.recompute_all_rates(n, &model.propensities, &ldata_col, &model.gdata)
        })
        .collect::<Result<Vec<()>>>()?;
    Ok(())
}

/// Advance every node to `min(t_target, its own clock)`, in parallel across the static worker
/// partition. `t_target` is already the min of the `tspan` output and the next tick boundary.
fn advance_all(
    nodes: &mut [NodeState],
    ranges: &[(usize, usize)],
    rngs: &mut [WorkerRng],
    model: &Model,
    t_target: f64,
) -> Result<()> {
    let results: Vec<Result<()>> = crossbeam::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(ranges.len());
        let mut remaining_nodes: &mut [NodeState] = nodes;
        let mut remaining_rngs: &mut [WorkerRng] = rngs;
        let mut offset = 0usize;

        for &(start, end) in ranges {
            let chunk_len = end - start;
            let (chunk, rest) = remaining_nodes.split_at_mut(chunk_len);
            remaining_nodes = rest;
            let (rng_chunk, rng_rest) = remaining_rngs.split_at_mut(1);
            remaining_rngs = rng_rest;
            let rng = &mut rng_chunk[0];
            let base_index = offset;
            offset += chunk_len;

            handles.push(scope.spawn(move |_| -> Result<()> {
                for (local_idx, state) in chunk.iter_mut().enumerate() {
                    let node_idx = base_index + local_idx;
                    let ldata_col = model.ldata_column(node_idx);
                    state.advance(
                        node_idx,
                        t_target,
                        &model.propensities,
                        &model.g,
                        &model.s,
                        &ldata_col,
                        &model.gdata,
                        rng,
                    )?;
                }
                Ok(())
            }));
        }

        handles
            .into_iter()
            .map(|h| h.join().expect("worker thread panicked"))
            .collect()
    })
    .expect("crossbeam scope panicked");

    results.into_iter().collect::<Result<Vec<()>>>()?;
    Ok(())
}

/// Apply every event scheduled at `tick` (already pre-sorted), serially on the driver thread.
fn apply_tick_events(
    nodes: &mut [NodeState],
    ranges: &[(usize, usize)],
    rngs: &mut [WorkerRng],
    model: &Model,
    tick: i64,
) -> Result<()> {
    let mut touched: Vec<usize> = Vec::new();

    for event in model.events.iter().filter(|e| e.time == tick) {
        match event.kind {
            EventKind::ExternalTransfer => {
                apply_external_transfer(nodes, ranges, rngs, model, event)?;
                touched.push(event.node);
                touched.push(event.dest.expect("validated at construction"));
            }
            _ => {
                let w = worker_of(event.node, ranges);
                apply_single_node_event(nodes, event, model, &mut rngs[w])?;
                touched.push(event.node);
            }
        }
    }

    touched.sort_unstable();
    touched.dedup();
    for n in touched {
        let ldata_col = model.ldata_column(n);
        nodes[n].invalidate_after_event(n, &model.propensities, &ldata_col, &model.gdata)?;
    }

    Ok(())
}

fn apply_single_node_event(
    nodes: &mut [NodeState],
    event: &Event,
    model: &Model,
    rng: &mut WorkerRng,
) -> Result<()> {
    node::apply_local_event(event.node, &mut nodes[event.node], event, &model.e, &model.n_matrix, rng)
}

fn apply_external_transfer(
    nodes: &mut [NodeState],
    ranges: &[(usize, usize)],
    rngs: &mut [WorkerRng],
    model: &Model,
    event: &Event,
) -> Result<()> {
    let dest = event.dest.expect("validated at construction");
    let source = event.node;

    let select_cols: Vec<(usize, f64)> = model.e.column(event.select).collect();
    let source_worker = worker_of(source, ranges);

    let drawn = {
        let source_state = &nodes[source];
        node::draw_from_selection(source, source_state, event, &select_cols, &mut rngs[source_worker])?
    };

    let (lo, hi) = if source < dest { (source, dest) } else { (dest, source) };
    let (left, right) = nodes.split_at_mut(hi);
    let (source_state, dest_state) = if source < dest {
        (&mut left[source - lo], &mut right[0])
    } else {
        (&mut right[0], &mut left[dest - lo])
    };

    for (compartment, k) in drawn {
        if k == 0 {
            continue;
        }
        source_state.u[compartment] -= k as i64;
        dest_state.u[compartment] += k as i64;
    }

    if source_state.u.iter().any(|&x| x < 0) || dest_state.u.iter().any(|&x| x < 0) {
        return Err(SimError::InconsistentEvent {
            node: source,
            time: event.time,
            message: "EXTERNAL_TRANSFER drove a compartment negative".to_string(),
        });
    }

    Ok(())
}

fn run_post_step(
    nodes: &mut [NodeState],
    model: &Model,
    post_step: &dyn crate::model::PostStep,
    t: f64,
) -> Result<()> {
    for (n, state) in nodes.iter_mut().enumerate() {
        let ldata_col = model.ldata_column(n);
        let u_slice = state.u.as_slice_mut().expect("u is contiguous");
        let v_slice = state.v.as_slice_mut().expect("v is contiguous");
        match post_step.call(u_slice, v_slice, &ldata_col, &model.gdata, t) {
            PostStepSignal::Unchanged => {}
            PostStepSignal::RatesChanged => {
                state.recompute_all_rates(n, &model.propensities, &ldata_col, &model.gdata)?;
            }
            PostStepSignal::Abort(message) => {
                return Err(SimError::internal(format!("post_step aborted: {message}")));
            }
        }
    }
    Ok(())
}
