//! Integration tests for `SparseMatrix`: construction from triplets, SpMV,
//! structural queries, and the COO round-trip property.

mod helpers;

use std::collections::BTreeMap;

use approx::assert_relative_eq;
use proptest::prelude::*;
use sparse_cg::{Problem, SparseMatrix, Triplets, ValidationError};

use helpers::{random_diag_dominant_spd, random_vector, Lcg};

// ---------------------------------------------------------------------------
// Construction from triplets
// ---------------------------------------------------------------------------

#[test]
fn test_matrix_from_unordered_triplets() {
    //  [ 2  -1   0 ]
    //  [-1   3  -1 ]
    //  [ 0  -1   2 ]
    let a = SparseMatrix::from_triplets(
        3,
        &[2, 1, 0, 1, 2, 0, 1],
        &[2, 2, 1, 0, 1, 0, 1],
        &[2.0, -1.0, -1.0, -1.0, -1.0, 2.0, 3.0],
    )
    .unwrap();

    assert_eq!(a.n(), 3);
    assert_eq!(a.nnz(), 7);
    assert_eq!(a.row_ptr(), &[0, 2, 5, 7]);
    assert_eq!(a.col_indices(), &[0, 1, 0, 1, 2, 1, 2]);
    assert_eq!(a.row_degree(0), 2);
    assert_eq!(a.row_degree(1), 3);
    assert_eq!(a.row_degree(2), 2);
    assert!(a.is_symmetric(0.0));
}

#[test]
fn test_matrix_duplicates_summed_in_input_order() {
    let a = SparseMatrix::from_triplets(
        2,
        &[1, 1, 1, 0],
        &[0, 0, 0, 0],
        &[0.1, 0.2, 0.3, 5.0],
    )
    .unwrap();
    assert_eq!(a.nnz(), 2);
    assert_eq!(a.get(1, 0), (0.1 + 0.2) + 0.3);
}

#[test]
fn test_matrix_invalid_index_reports_position() {
    let err = SparseMatrix::from_triplets(4, &[0, 1, 4], &[0, 1, 2], &[1.0, 1.0, 1.0]).unwrap_err();
    assert_eq!(
        err,
        ValidationError::InvalidIndex {
            position: 2,
            row: 4,
            col: 2,
            n: 4
        }
    );

    let err = SparseMatrix::from_triplets(4, &[0], &[-3], &[1.0]).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidIndex { col: -3, .. }));
}

#[test]
fn test_matrix_length_mismatch() {
    let err = SparseMatrix::from_triplets(2, &[0, 1], &[0, 1], &[1.0]).unwrap_err();
    assert!(matches!(err, ValidationError::DimensionMismatch(_)));
}

#[test]
fn test_matrix_non_finite_value() {
    let err = SparseMatrix::from_triplets(2, &[0], &[0], &[f64::NAN]).unwrap_err();
    assert!(matches!(err, ValidationError::NonFiniteValue(_)));
}

// ---------------------------------------------------------------------------
// SpMV
// ---------------------------------------------------------------------------

#[test]
fn test_matrix_spmv_against_dense() {
    let n = 30;
    let a = random_diag_dominant_spd(n, 0.2, 99);
    let x = random_vector(n, 100);

    let mut dense = vec![vec![0.0; n]; n];
    for (i, j, v) in a.entries() {
        dense[i][j] = v;
    }
    let expected: Vec<f64> = dense
        .iter()
        .map(|row| row.iter().zip(&x).map(|(aij, xj)| aij * xj).sum())
        .collect();

    let mut y = vec![0.0; n];
    a.spmv(&x, &mut y);
    for (yi, ei) in y.iter().zip(&expected) {
        assert_relative_eq!(*yi, *ei, epsilon = 1e-12);
    }
}

#[test]
fn test_matrix_spmv_rows_partition_equals_full() {
    let n = 17;
    let a = random_diag_dominant_spd(n, 0.3, 5);
    let x = random_vector(n, 6);

    let mut full = vec![0.0; n];
    a.spmv(&x, &mut full);

    let mut pieces = vec![0.0; n];
    let (head, tail) = pieces.split_at_mut(6);
    a.spmv_rows(0..6, &x, head);
    a.spmv_rows(6..n, &x, tail);
    assert_eq!(full, pieces);
}

#[test]
fn test_matrix_spmv_is_deterministic() {
    let problem = Problem::random_spd(40, 3, 0.5).unwrap();
    let x = random_vector(40, 4);
    let mut y1 = vec![0.0; 40];
    let mut y2 = vec![0.0; 40];
    problem.matrix.spmv(&x, &mut y1);
    problem.matrix.spmv(&x, &mut y2);
    let bits = |v: &[f64]| v.iter().map(|f| f.to_bits()).collect::<Vec<_>>();
    assert_eq!(bits(&y1), bits(&y2));
}

// ---------------------------------------------------------------------------
// Construction paths agree
// ---------------------------------------------------------------------------

#[test]
fn test_matrix_construction_paths_agree() {
    let mut rng = Lcg::new(2024);
    let n = 12;
    let mut triplets = Triplets::new(n);
    let mut coo = Vec::new();
    for _ in 0..60 {
        let r = (rng.next_u64() % n as u64) as usize;
        let c = (rng.next_u64() % n as u64) as usize;
        let v = rng.next_f64_range(-2.0, 2.0);
        triplets.push(r as i32, c as i32, v);
        coo.push((r, c, v));
    }

    let from_i32 = triplets.to_matrix().unwrap();
    let from_usize = SparseMatrix::from_coo(n, coo).unwrap();
    assert_eq!(from_i32, from_usize);

    let raw = SparseMatrix::from_raw_parts(
        n,
        from_i32.row_ptr().to_vec(),
        from_i32.col_indices().to_vec(),
        from_i32.values().to_vec(),
    )
    .unwrap();
    assert_eq!(raw, from_i32);
}

// ---------------------------------------------------------------------------
// Round-trip property
// ---------------------------------------------------------------------------

fn triplet_strategy() -> impl Strategy<Value = (usize, Vec<(i32, i32, f64)>)> {
    (1usize..24).prop_flat_map(|n| {
        let idx = 0..n as i32;
        let entry = (idx.clone(), idx, -100.0f64..100.0);
        (Just(n), prop::collection::vec(entry, 0..120))
    })
}

proptest! {
    // Property: triplets -> CSR -> entries() reproduces the summed set.
    #[test]
    fn test_matrix_round_trip((n, entries) in triplet_strategy()) {
        let rows: Vec<i32> = entries.iter().map(|e| e.0).collect();
        let cols: Vec<i32> = entries.iter().map(|e| e.1).collect();
        let vals: Vec<f64> = entries.iter().map(|e| e.2).collect();

        let mut expected: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        for &(r, c, v) in &entries {
            *expected.entry((r as usize, c as usize)).or_insert(0.0) += v;
        }

        let a = SparseMatrix::from_triplets(n, &rows, &cols, &vals).unwrap();
        let actual: Vec<(usize, usize, f64)> = a.entries().collect();
        let expected: Vec<(usize, usize, f64)> =
            expected.into_iter().map(|((r, c), v)| (r, c, v)).collect();

        prop_assert_eq!(actual, expected);
    }

    // Property: row pointers are monotone and columns strictly increase per row.
    #[test]
    fn test_matrix_structural_invariants((n, entries) in triplet_strategy()) {
        let a = SparseMatrix::from_coo(
            n,
            entries.iter().map(|&(r, c, v)| (r as usize, c as usize, v)),
        )
        .unwrap();

        prop_assert_eq!(a.row_ptr().len(), n + 1);
        prop_assert_eq!(a.row_ptr()[n], a.nnz());
        for row in 0..n {
            let cols = &a.col_indices()[a.row_range(row)];
            prop_assert!(cols.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(cols.iter().all(|&c| c < n));
        }
    }
}
