//! CSC construction / column-scan correctness against the matrices a real SIR model builds.

use crate::sparse::CscMatrix;

fn sir_stoichiometry() -> CscMatrix {
    // S: Nc=3 (S,I,R) x Nt=2 (infection, recovery).
    // infection: S -1, I +1. recovery: I -1, R +1.
    CscMatrix::from_triplets(
        3,
        2,
        &[(0, 0, -1.0), (1, 0, 1.0), (1, 1, -1.0), (2, 1, 1.0)],
        vec!["S".into(), "I".into(), "R".into()],
    )
    .unwrap()
}

fn sir_dependency_graph() -> CscMatrix {
    // Both transitions read S and I, so either firing invalidates both.
    CscMatrix::from_triplets(
        2,
        2,
        &[(0, 0, 1.0), (1, 0, 1.0), (0, 1, 1.0), (1, 1, 1.0)],
        vec![],
    )
    .unwrap()
}

#[test]
fn stoichiometry_columns_sum_to_zero() {
    let s = sir_stoichiometry();
    for j in 0..s.ncols() {
        let sum: f64 = s.column(j).map(|(_, v)| v).sum();
        assert_eq!(sum, 0.0, "column {j} should conserve total population");
    }
}

#[test]
fn dependency_graph_is_fully_connected_for_sir() {
    let g = sir_dependency_graph();
    assert!(g.contains(0, 0));
    assert!(g.contains(1, 0));
    assert!(g.contains(0, 1));
    assert!(g.contains(1, 1));
    assert_eq!(g.column_len(0), 2);
    assert_eq!(g.column_len(1), 2);
}

#[test]
fn row_names_carry_through_construction() {
    let s = sir_stoichiometry();
    assert_eq!(s.row_names(), &["S".to_string(), "I".to_string(), "R".to_string()]);
}

#[test]
fn column_with_no_entries_is_empty() {
    let m = CscMatrix::from_triplets(3, 2, &[(0, 0, 1.0)], vec![]).unwrap();
    assert_eq!(m.column_len(1), 0);
    assert_eq!(m.column(1).count(), 0);
}
