//! Integration tests for selection, subsetting and upwinding.

use adblock::{AutoDiffBlock, BlockPartition, Criterion, Selector, SparseMatrix, UpwindSelector};

fn cells() -> Vec<AutoDiffBlock> {
    AutoDiffBlock::variables(&[vec![100.0, 90.0, 80.0, 70.0], vec![0.1, 0.2, 0.3, 0.4]])
}

#[test]
fn test_subset_of_superset_is_identity() {
    let vars = cells();
    let x = &vars[0] * &vars[1];
    let indices = [5, 1, 7, 2];
    let round_trip = x.superset(&indices, 8).unwrap().subset(&indices).unwrap();
    assert_eq!(round_trip, x);
}

#[test]
fn test_select_same_operand_is_structural_identity() {
    let vars = cells();
    let x = &vars[0] / &vars[1];
    let s = AutoDiffBlock::select(&[true, false, false, true], &x, &x).unwrap();
    assert_eq!(s, x);
}

#[test]
fn test_select_never_blends_rows() {
    let vars = cells();
    let a = &vars[0] * 2.0;
    let b = &vars[1] * 3.0;
    let s = AutoDiffBlock::select(&[true, false, true, false], &a, &b).unwrap();
    for row in 0..4 {
        let from_a = row % 2 == 0;
        for col in 0..4 {
            let (ja, jb) = (s.jacobian(0).get(row, col), s.jacobian(1).get(row, col));
            if from_a {
                assert_eq!(ja, a.jacobian(0).get(row, col));
                assert_eq!(jb, 0.0);
            } else {
                assert_eq!(ja, 0.0);
                assert_eq!(jb, b.jacobian(1).get(row, col));
            }
        }
    }
}

#[test]
fn test_selection_keeps_empty_blocks() {
    let p = BlockPartition::new([4, 4]);
    let x = AutoDiffBlock::variable(0, [1.0, 2.0, 3.0, 4.0], &p).unwrap();
    let c = AutoDiffBlock::constant([0.0; 4], &p);
    let s = Selector::new(&[1.0, -1.0, 1.0, -1.0], Criterion::GreaterZero)
        .select(&x, &c)
        .unwrap();
    assert!(s.jacobian(1).is_empty());
    assert!(x.subset(&[0, 0]).unwrap().jacobian(1).is_empty());
    assert!(x.superset(&[3, 2, 1, 0], 6).unwrap().jacobian(1).is_empty());
    assert!(AutoDiffBlock::vertcat(&[c.clone(), c]).unwrap().jacobian(0).is_empty());
}

#[test]
fn test_upwind_flux_assembly() {
    // 1D column of four cells, three internal faces, flow left to right except
    // the last face.
    let vars = cells();
    let (p, s) = (&vars[0], &vars[1]);
    let neighbours = [(0, 1), (1, 2), (2, 3)];
    let grad = SparseMatrix::from_triplets(
        3,
        4,
        &[
            (0, 0, 1.0),
            (0, 1, -1.0),
            (1, 1, 1.0),
            (1, 2, -1.0),
            (2, 2, 1.0),
            (2, 3, -1.0),
        ],
    )
    .unwrap();
    let dp = &grad * p;
    let mut flux_sign = dp.value().as_slice().to_vec();
    flux_sign[2] = -1.0;
    let upwind = UpwindSelector::new(4, &neighbours, &flux_sign).unwrap();
    let mobility = upwind.select(s).unwrap();
    assert_eq!(mobility.value().as_slice(), &[0.1, 0.2, 0.4]);
    assert_eq!(mobility.jacobian(1).get(2, 3), 1.0);
    assert!(mobility.jacobian(0).is_empty());

    let flux = &mobility * &dp;
    // d(flux_0)/d(s_0) = dp_0, d(flux_0)/d(p_1) = -mobility_0
    assert_eq!(flux.jacobian(1).get(0, 0), 10.0);
    assert_eq!(flux.jacobian(0).get(0, 1), -0.1);
}

#[test]
fn test_max_min_through_selector() {
    let vars = cells();
    let scaled = &vars[1] * 300.0;
    let hi = vars[0].try_max(&scaled).unwrap();
    let lo = vars[0].try_min(&scaled).unwrap();
    // 300 * s = [30, 60, 90, 120] against p = [100, 90, 80, 70].
    assert_eq!(hi.value().as_slice(), &[100.0, 90.0, 90.0, 120.0]);
    assert_eq!(lo.value().as_slice(), &[30.0, 60.0, 80.0, 70.0]);
    assert_eq!(hi.jacobian(1).get(2, 2), 300.0);
    assert_eq!(lo.jacobian(0).get(2, 2), 1.0);
}
