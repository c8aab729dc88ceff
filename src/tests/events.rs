//! P3, P4, and scenarios 2, 3, 4, 6 — all event kinds, driven with zero propensities so only the
//! event applier's own arithmetic is under test.

use ndarray::Array2;

use crate::driver;
use crate::error::ErrorKind;
use crate::event::{Event, EventKind};
use crate::gdata::GlobalData;
use crate::model::{Model, ModelInputs};
use crate::propensity::{Closure, Registry};
use crate::recorder::Recorder;
use crate::sparse::CscMatrix;

fn zero_propensities(n_transitions: usize) -> Registry {
    Registry::new(
        (0..n_transitions)
            .map(|_| -> Box<dyn crate::propensity::Propensity> {
                Box::new(Closure(|_: &[i64], _: &[f64], _: &[f64], _: &GlobalData, _: f64| 0.0))
            })
            .collect(),
    )
}

fn final_column(out: &Recorder) -> Vec<i64> {
    match out {
        Recorder::Dense { u, .. } => u.column(u.ncols() - 1).to_vec(),
        _ => panic!("expected dense recorder"),
    }
}

#[test]
fn scenario_2_external_transfer_moves_individuals_between_nodes() {
    let e = CscMatrix::from_triplets(3, 1, &[(0, 0, 1.0)], vec![]).unwrap();
    let n_matrix = CscMatrix::from_triplets(3, 0, &[], vec![]).unwrap();
    let s = CscMatrix::from_triplets(3, 0, &[], vec![]).unwrap();
    let g = CscMatrix::from_triplets(0, 0, &[], vec![]).unwrap();

    let u0 = Array2::from_shape_vec((3, 2), vec![100, 0, 0, 0, 0, 0]).unwrap();

    let model = Model::new(ModelInputs {
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
        events: vec![Event {
            kind: EventKind::ExternalTransfer,
            time: 5,
            node: 0,
            dest: Some(1),
            n: 10,
            proportion: 0.0,
            select: 0,
            shift: None,
        }],
        propensities: zero_propensities(0),
        post_step: None,
        seed: 1,
        n_threads: Some(1),
    })
    .unwrap();

    let out = driver::run(&model, None, None, None).expect("scenario 2 should run to completion");
    let col = final_column(&out.recorder);
    // Dense layout is compartment-major: [S_n0, S_n1, I_n0, I_n1, R_n0, R_n1].
    assert_eq!(col, vec![90, 10, 0, 0, 0, 0]);
}

#[test]
fn scenario_3_internal_transfer_shifts_within_a_node() {
    let e = CscMatrix::from_triplets(2, 1, &[(0, 0, 1.0)], vec![]).unwrap();
    let n_matrix = CscMatrix::from_triplets(2, 1, &[(0, 0, 1.0)], vec![]).unwrap();
    let s = CscMatrix::from_triplets(2, 0, &[], vec![]).unwrap();
    let g = CscMatrix::from_triplets(0, 0, &[], vec![]).unwrap();

    let u0 = Array2::from_shape_vec((2, 1), vec![50, 0]).unwrap();

    let model = Model::new(ModelInputs {
        g,
        s,
        e,
        n_matrix,
        u0,
        v0: Array2::zeros((0, 1)),
        v_row_names: vec![],
        ldata: Array2::zeros((0, 1)),
        gdata: GlobalData::unnamed(vec![]),
        tspan: vec![0.0, 5.0],
        events: vec![Event {
            kind: EventKind::InternalTransfer,
            time: 3,
            node: 0,
            dest: None,
            n: 20,
            proportion: 0.0,
            select: 0,
            shift: Some(0),
        }],
        propensities: zero_propensities(0),
        post_step: None,
        seed: 1,
        n_threads: Some(1),
    })
    .unwrap();

    let out = driver::run(&model, None, None, None).expect("scenario 3 should run to completion");
    assert_eq!(final_column(&out.recorder), vec![30, 20]);
}

#[test]
fn p3_internal_transfer_preserves_node_total() {
    // Same model as scenario 3; the invariant under test is the per-node sum, not the split.
    let e = CscMatrix::from_triplets(2, 1, &[(0, 0, 1.0)], vec![]).unwrap();
    let n_matrix = CscMatrix::from_triplets(2, 1, &[(0, 0, 1.0)], vec![]).unwrap();
    let s = CscMatrix::from_triplets(2, 0, &[], vec![]).unwrap();
    let g = CscMatrix::from_triplets(0, 0, &[], vec![]).unwrap();
    let u0 = Array2::from_shape_vec((2, 1), vec![50, 0]).unwrap();

    let model = Model::new(ModelInputs {
        g,
        s,
        e,
        n_matrix,
        u0,
        v0: Array2::zeros((0, 1)),
        v_row_names: vec![],
        ldata: Array2::zeros((0, 1)),
        gdata: GlobalData::unnamed(vec![]),
        tspan: vec![0.0, 5.0],
        events: vec![Event {
            kind: EventKind::InternalTransfer,
            time: 3,
            node: 0,
            dest: None,
            n: 20,
            proportion: 0.0,
            select: 0,
            shift: Some(0),
        }],
        propensities: zero_propensities(0),
        post_step: None,
        seed: 1,
        n_threads: Some(1),
    })
    .unwrap();

    let out = driver::run(&model, None, None, None).expect("should run to completion");
    let col = final_column(&out.recorder);
    assert_eq!(col.iter().sum::<i64>(), 50);
}

#[test]
fn p4_external_transfer_preserves_global_total() {
    let e = CscMatrix::from_triplets(3, 1, &[(0, 0, 1.0)], vec![]).unwrap();
    let n_matrix = CscMatrix::from_triplets(3, 0, &[], vec![]).unwrap();
    let s = CscMatrix::from_triplets(3, 0, &[], vec![]).unwrap();
    let g = CscMatrix::from_triplets(0, 0, &[], vec![]).unwrap();
    let u0 = Array2::from_shape_vec((3, 2), vec![100, 0, 0, 0, 0, 0]).unwrap();

    let model = Model::new(ModelInputs {
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
        events: vec![Event {
            kind: EventKind::ExternalTransfer,
            time: 5,
            node: 0,
            dest: Some(1),
            n: 10,
            proportion: 0.0,
            select: 0,
            shift: None,
        }],
        propensities: zero_propensities(0),
        post_step: None,
        seed: 1,
        n_threads: Some(1),
    })
    .unwrap();

    let out = driver::run(&model, None, None, None).expect("should run to completion");
    let col = final_column(&out.recorder);
    assert_eq!(col.iter().sum::<i64>(), 100);
}

#[test]
fn scenario_4_proportional_exit_mean_matches_requested_proportion() {
    // Over many seeds, the mean surviving population in compartment 0 should converge to 40
    // (80 - half of the 50 removed, split proportionally to weight).
    let mut total_compartment_0 = 0i64;
    let trials = 2000u64;

    for seed in 0..trials {
        let e = CscMatrix::from_triplets(2, 1, &[(0, 0, 1.0), (1, 0, 1.0)], vec![]).unwrap();
        let n_matrix = CscMatrix::from_triplets(2, 0, &[], vec![]).unwrap();
        let s = CscMatrix::from_triplets(2, 0, &[], vec![]).unwrap();
        let g = CscMatrix::from_triplets(0, 0, &[], vec![]).unwrap();
        let u0 = Array2::from_shape_vec((2, 1), vec![80, 20]).unwrap();

        let model = Model::new(ModelInputs {
            g,
            s,
            e,
            n_matrix,
            u0,
            v0: Array2::zeros((0, 1)),
            v_row_names: vec![],
            ldata: Array2::zeros((0, 1)),
            gdata: GlobalData::unnamed(vec![]),
            tspan: vec![0.0, 3.0],
            events: vec![Event {
                kind: EventKind::Exit,
                time: 1,
                node: 0,
                dest: None,
                n: 0,
                proportion: 0.5,
                select: 0,
                shift: None,
            }],
            propensities: zero_propensities(0),
            post_step: None,
            seed,
            n_threads: Some(1),
        })
        .unwrap();

        let out = driver::run(&model, None, None, None).expect("should run to completion");
        total_compartment_0 += final_column(&out.recorder)[0];
    }

    let mean = total_compartment_0 as f64 / trials as f64;
    assert!((mean - 40.0).abs() < 1.0, "mean surviving compartment-0 count {mean} should be near 40.0");
}

#[test]
fn scenario_6_inconsistent_event_reports_error_with_partial_output() {
    let e = CscMatrix::from_triplets(1, 1, &[(0, 0, 1.0)], vec![]).unwrap();
    let n_matrix = CscMatrix::from_triplets(1, 0, &[], vec![]).unwrap();
    let s = CscMatrix::from_triplets(1, 0, &[], vec![]).unwrap();
    let g = CscMatrix::from_triplets(0, 0, &[], vec![]).unwrap();
    let u0 = Array2::from_shape_vec((1, 1), vec![5]).unwrap();

    let model = Model::new(ModelInputs {
        g,
        s,
        e,
        n_matrix,
        u0,
        v0: Array2::zeros((0, 1)),
        v_row_names: vec![],
        ldata: Array2::zeros((0, 1)),
        gdata: GlobalData::unnamed(vec![]),
        tspan: vec![0.0, 5.0],
        events: vec![Event {
            kind: EventKind::Exit,
            time: 1,
            node: 0,
            dest: None,
            n: 10,
            proportion: 0.0,
            select: 0,
            shift: None,
        }],
        propensities: zero_propensities(0),
        post_step: None,
        seed: 1,
        n_threads: Some(1),
    })
    .unwrap();

    let err = driver::run(&model, None, None, None).expect_err("requesting more than available must fail");
    assert_eq!(err.error.kind(), ErrorKind::InconsistentEvent);
    assert_eq!(err.output.completed_columns, 1, "the first tspan column (t=0) should still be recorded");
}
