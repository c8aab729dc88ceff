/// ==============================================================================================
/// ================================ Demo: Single-Node SIR =========================================
/// ==============================================================================================
//
// Assembles a one-node SIR model (S, I, R compartments; mass-action infection, exponential
// recovery), runs it to completion, and prints the final compartment counts. Mirrors the
// assemble-inputs-then-call-the-library shape of the library's own example binaries.

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array2;

use ssanet::{unnamed_gdata, Closure, CscMatrix, GlobalData, Model, ModelInputs, Registry};

const BETA: f64 = 0.16;
const GAMMA: f64 = 0.077;
const N_TOTAL: f64 = 100.0;

fn build_model(seed: u64) -> anyhow::Result<Model> {
    // S -1/I +1 on infection; I -1/R +1 on recovery.
    let s = CscMatrix::from_triplets(
        3,
        2,
        &[(0, 0, -1.0), (1, 0, 1.0), (1, 1, -1.0), (2, 1, 1.0)],
        vec!["S".into(), "I".into(), "R".into()],
    )?;
    // Both transitions read S and I, so either firing invalidates both rates.
    let g = CscMatrix::from_triplets(2, 2, &[(0, 0, 1.0), (1, 0, 1.0), (0, 1, 1.0), (1, 1, 1.0)], vec![])?;
    let e = CscMatrix::from_triplets(3, 0, &[], vec![])?;
    let n_matrix = CscMatrix::from_triplets(3, 0, &[], vec![])?;

    let u0 = Array2::from_shape_vec((3, 1), vec![99, 1, 0])?;
    let gdata = GlobalData::named(vec![
        ("beta".into(), BETA),
        ("gamma".into(), GAMMA),
        ("n_total".into(), N_TOTAL),
    ]);

    let propensities = Registry::new(vec![
        Box::new(Closure(|u: &[i64], _v: &[f64], _l: &[f64], gdata: &GlobalData, _t: f64| {
            gdata.get("beta").unwrap() * u[0] as f64 * u[1] as f64 / gdata.get("n_total").unwrap()
        })),
        Box::new(Closure(|u: &[i64], _v: &[f64], _l: &[f64], gdata: &GlobalData, _t: f64| {
            gdata.get("gamma").unwrap() * u[1] as f64
        })),
    ]);

    let tspan: Vec<f64> = (1..=150).map(|t| t as f64).collect();

    Ok(Model::new(ModelInputs {
        g,
        s,
        e,
        n_matrix,
        u0,
        v0: Array2::zeros((0, 1)),
        v_row_names: vec![],
        ldata: Array2::zeros((0, 1)),
        gdata,
        tspan,
        events: vec![],
        propensities,
        post_step: None,
        seed,
        n_threads: Some(1),
    })?)
}

fn main() -> anyhow::Result<()> {
    ssanet::logging::init();
    log::info!("assembling single-node SIR model");

    let model = build_model(1)?;
    let pb = ProgressBar::new(model.tspan.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap()
            .progress_chars("=>-"),
    );
    pb.set_message("sir_single_node");

    match ssanet::run(&model, None, None, Some(&pb)) {
        Ok(out) => {
            pb.finish_with_message("done");
            if let ssanet::Recorder::Dense { u, .. } = out.recorder {
                let last = u.ncols() - 1;
                log::info!(
                    "final compartments: S={} I={} R={}",
                    u[[0, last]],
                    u[[1, last]],
                    u[[2, last]]
                );
                println!("S={} I={} R={}", u[[0, last]], u[[1, last]], u[[2, last]]);
            }
            Ok(())
        }
        Err(partial) => {
            pb.abandon_with_message("failed");
            log::error!("simulation failed: {}", partial.error);
            Err(anyhow::anyhow!(partial.error))
        }
    }
}
