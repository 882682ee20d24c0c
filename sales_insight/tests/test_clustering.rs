use approx::assert_abs_diff_eq;
use pretty_assertions::assert_eq;
use rstest::rstest;
use sales_insight::aggregation::{AggregationRow, AggregationView};
use sales_insight::clustering::{elbow_k, ClusterEngine};
use sales_insight::config::ClusteringConfig;
use sales_insight::data::{SalesDataset, SalesRecord};
use sales_insight::InsightError;
use std::sync::Arc;

fn view_from_totals(totals: &[f64]) -> AggregationView {
    let rows = totals
        .iter()
        .enumerate()
        .map(|(i, &sales_total)| AggregationRow {
            category: (i / 5) as u32,
            store_id: (i % 5) as u32,
            sales_total,
        })
        .collect();
    AggregationView::from_rows(rows)
}

/// 5 categories x 5 stores with totals spread over a narrow band
fn near_uniform_view() -> AggregationView {
    let totals: Vec<f64> = (0..25)
        .map(|i| 1000.0 + ((i * 37) % 25) as f64 * 4.0)
        .collect();
    view_from_totals(&totals)
}

#[rstest]
#[case(vec![100.0, 60.0, 55.0, 53.0, 52.0], 2)]
#[case(vec![100.0, 90.0, 20.0, 15.0, 14.0], 3)]
#[case(vec![100.0, 99.0, 98.0, 50.0, 49.0], 4)]
#[case(vec![10.0, 5.0, 0.0], 2)]
#[case(vec![7.0], 2)]
#[case(vec![], 2)]
fn test_elbow_k(#[case] inertia: Vec<f64>, #[case] expected: usize) {
    assert_eq!(elbow_k(&inertia).unwrap(), expected);
}

#[test]
fn test_elbow_rejects_non_finite_inertia() {
    assert!(matches!(
        elbow_k(&[10.0, f64::NAN, 1.0]),
        Err(InsightError::ClusteringError(_))
    ));
    assert!(elbow_k(&[f64::INFINITY, 1.0]).is_err());
}

#[test]
fn test_well_separated_groups_are_recovered() {
    let view = view_from_totals(&[10.0, 11.0, 12.0, 1000.0, 1010.0, 1020.0, 5000.0, 5050.0]);
    let outcome = ClusterEngine::default().cluster_all(&view).unwrap();

    assert_eq!(outcome.chosen_k, 2);
    assert_eq!(outcome.inertia.len(), 5);

    let label_of = |total: f64| {
        outcome
            .assignments
            .iter()
            .find(|a| a.sales_total == total)
            .map(|a| a.cluster_id)
            .unwrap()
    };
    assert_eq!(label_of(5000.0), label_of(5050.0));
    assert_eq!(label_of(10.0), label_of(1020.0));
    assert_ne!(label_of(10.0), label_of(5000.0));
}

#[test]
fn test_near_uniform_rows() {
    let view = near_uniform_view();
    let outcome = ClusterEngine::default().cluster_all(&view).unwrap();

    assert_eq!(outcome.assignments.len(), 25);
    assert_eq!(outcome.inertia.len(), 5);
    // The first drop dominates on an evenly spread band
    assert_abs_diff_eq!(outcome.inertia[0], 20800.0, epsilon = 1e-6);
    assert_eq!(outcome.chosen_k, 2);
    assert!(outcome
        .assignments
        .iter()
        .all(|a| a.cluster_id < outcome.chosen_k));

    // Assignments follow the view's row order
    for (assignment, row) in outcome.assignments.iter().zip(view.rows()) {
        assert_eq!(assignment.category, row.category);
        assert_eq!(assignment.store_id, row.store_id);
        assert_eq!(assignment.sales_total, row.sales_total);
    }
}

#[test]
fn test_inertia_sweep_is_non_increasing() {
    let view = near_uniform_view();
    let inertia = ClusterEngine::default()
        .inertia_sweep(&view.features())
        .unwrap();

    assert_eq!(inertia.len(), 5);
    for pair in inertia.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-9, "inertia increased: {:?}", inertia);
    }
}

#[rstest]
#[case(vec![42.0], 1)]
#[case(vec![1.0, 2.0], 2)]
#[case(vec![1.0, 2.0, 100.0], 2)]
fn test_fewer_rows_than_max_k(#[case] totals: Vec<f64>, #[case] expected_k: usize) {
    let view = view_from_totals(&totals);
    let outcome = ClusterEngine::default().cluster_all(&view).unwrap();

    assert_eq!(outcome.inertia.len(), totals.len());
    assert_eq!(outcome.chosen_k, expected_k);
    assert_eq!(outcome.assignments.len(), totals.len());
}

#[test]
fn test_empty_view_is_an_error() {
    let result = ClusterEngine::default().cluster_all(&AggregationView::default());
    match result {
        Err(err @ InsightError::ClusteringError(_)) => assert_eq!(err.status_code(), 500),
        other => panic!("Expected ClusteringError, got {:?}", other),
    }
}

#[test]
fn test_clustering_leaves_view_untouched() {
    let view = near_uniform_view();
    let before = view.rows().to_vec();
    let engine = ClusterEngine::default();

    let first = engine.cluster_all(&view).unwrap();
    let second = engine.cluster_all(&view).unwrap();

    assert_eq!(view.rows(), before.as_slice());
    assert_eq!(first, second);
}

#[test]
fn test_concurrent_clustering_agrees() {
    let view = Arc::new(near_uniform_view());
    let engine = Arc::new(ClusterEngine::new(&ClusteringConfig::default()));
    let expected = engine.cluster_all(&view).unwrap();

    let outcomes: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let view = Arc::clone(&view);
                let engine = Arc::clone(&engine);
                scope.spawn(move || engine.cluster_all(&view).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for outcome in outcomes {
        assert_eq!(outcome, expected);
    }
}

#[test]
fn test_aggregation_sums_per_category_and_store() {
    let day = |d: u32| chrono::NaiveDate::from_ymd_opt(2023, 1, d).unwrap();
    let dataset = SalesDataset::from_records(vec![
        // store 1, category 2: two products over two days
        SalesRecord::new(day(1), 1, 0, 2, 0, 10.0),
        SalesRecord::new(day(2), 1, 0, 2, 0, 12.0),
        SalesRecord::new(day(1), 1, 5, 2, 0, 3.0),
        // store 0, category 2
        SalesRecord::new(day(1), 0, 0, 2, 0, 7.0),
        // store 0, category 0
        SalesRecord::new(day(1), 0, 9, 0, 0, 1.5),
    ])
    .unwrap();

    let view = AggregationView::from_dataset(&dataset);

    assert_eq!(
        view.rows(),
        &[
            AggregationRow { category: 0, store_id: 0, sales_total: 1.5 },
            AggregationRow { category: 2, store_id: 0, sales_total: 7.0 },
            AggregationRow { category: 2, store_id: 1, sales_total: 25.0 },
        ]
    );
    assert_eq!(view.features(), vec![vec![1.5], vec![7.0], vec![25.0]]);
}
