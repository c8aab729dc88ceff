/// ==============================================================================================
/// ============================== Demo: Two-Node External Transfer ================================
/// ==============================================================================================
//
// Two SIR nodes with zero local transmission, connected by a single scheduled EXTERNAL_TRANSFER
// event that moves susceptibles from node 0 to node 1 partway through the run.

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array2;

use ssanet::{CscMatrix, Event, EventKind, GlobalData, Model, ModelInputs, Registry};

fn build_model(seed: u64) -> anyhow::Result<Model> {
    let s = CscMatrix::from_triplets(3, 0, &[], vec!["S".into(), "I".into(), "R".into()])?;
    let g = CscMatrix::from_triplets(0, 0, &[], vec![])?;
    let e = CscMatrix::from_triplets(3, 1, &[(0, 0, 1.0)], vec![])?;
    let n_matrix = CscMatrix::from_triplets(3, 0, &[], vec![])?;

    let u0 = Array2::from_shape_vec((3, 2), vec![100, 0, 0, 0, 0, 0])?;

    let propensities = Registry::new(vec![]);

    let event = Event {
        kind: EventKind::ExternalTransfer,
        time: 5,
        node: 0,
        dest: Some(1),
        n: 10,
        proportion: 0.0,
        select: 0,
        shift: None,
    };

    Ok(Model::new(ModelInputs {
        g,
        s,
        e,
        n_matrix,
        u0,
        v0: Array2::zeros((0, 2)),
        v_row_names: vec![],
        ldata: Array2::zeros((0, 2)),
        gdata: GlobalData::unnamed(vec![]),
        tspan: vec![0.0, 10.0],
        events: vec![event],
        propensities,
        post_step: None,
        seed,
        n_threads: Some(1),
    })?)
}

fn main() -> anyhow::Result<()> {
    ssanet::logging::init();
    log::info!("assembling two-node external-transfer model");

    let model = build_model(1)?;
    let pb = ProgressBar::new(model.tspan.len() as u64);
    pb.set_style(
        ProgressStyle::with_template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap()
            .progress_chars("=>-"),
    );
    pb.set_message("sir_two_node_transfer");

    match ssanet::run(&model, None, None, Some(&pb)) {
        Ok(out) => {
            pb.finish_with_message("done");
            if let ssanet::Recorder::Dense { u, .. } = out.recorder {
                let last = u.ncols() - 1;
                let n_nodes = model.n_nodes;
                for node in 0..n_nodes {
                    println!(
                        "node {node}: S={} I={} R={}",
                        u[[0 * n_nodes + node, last]],
                        u[[1 * n_nodes + node, last]],
                        u[[2 * n_nodes + node, last]]
                    );
                }
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
