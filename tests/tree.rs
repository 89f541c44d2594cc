//! End-to-end build-then-query scenarios against the public API only.
//!
//! Per-module edge cases (codec round trips, reservoir sampling, the
//! reverser's offset arithmetic) live next to the code they test in
//! `src/*.rs`; this file only exercises the full pipeline a caller
//! actually drives: bulk load a point stream, build a tree, query it.

use dkdtree::{Point, PointLog, Tree};

#[test]
fn builds_and_queries_a_small_tree() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = PointLog::create(dir.path().join("points"), 2, 0, true).unwrap();
    for (x, y) in [(0.0, 0.0), (10.0, 10.0), (1.0, 1.0), (5.0, 5.0), (-3.0, 4.0)] {
        log.add(&Point::new(vec![x, y], vec![])).unwrap();
    }

    let mut tree = Tree::create(
        dir.path().join("scratch"),
        dir.path().join("tree"),
        log,
    )
    .unwrap();
    assert_eq!(tree.count(), 5);

    let nearest = tree.nearest(&Point::new(vec![0.0, 0.0], vec![]), 2).unwrap();
    assert_eq!(nearest.len(), 2);
    assert_eq!(nearest[0].point.pos, vec![0.0, 0.0]);
    assert_eq!(nearest[0].distance, 0.0);
    assert!(nearest[0].distance <= nearest[1].distance);
}

#[test]
fn querying_for_more_neighbours_than_points_returns_all_of_them() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = PointLog::create(dir.path().join("points"), 1, 0, true).unwrap();
    for v in [1.0, 2.0, 3.0] {
        log.add(&Point::new(vec![v], vec![])).unwrap();
    }
    let mut tree = Tree::create(dir.path().join("scratch"), dir.path().join("tree"), log)
        .unwrap();

    let got = tree.nearest(&Point::new(vec![0.0], vec![]), 100).unwrap();
    assert_eq!(got.len(), 3);
    for w in got.windows(2) {
        assert!(w[0].distance <= w[1].distance);
    }
}

#[test]
fn payload_survives_the_round_trip_through_a_built_tree() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = PointLog::create(dir.path().join("points"), 2, 8, true).unwrap();
    log.add(&Point::new(vec![1.0, 1.0], b"alpha".to_vec()))
        .unwrap();
    log.add(&Point::new(vec![9.0, 9.0], b"beta".to_vec()))
        .unwrap();

    let mut tree = Tree::create(dir.path().join("scratch"), dir.path().join("tree"), log)
        .unwrap();
    let nearest = tree
        .nearest(&Point::new(vec![1.0, 2.0], vec![]), 1)
        .unwrap();
    assert_eq!(nearest[0].point.data, b"alpha".to_vec());
}

#[test]
fn a_tree_built_once_answers_the_same_queries_after_reopening() {
    let dir = tempfile::tempdir().unwrap();
    let mut log = PointLog::create(dir.path().join("points"), 3, 0, true).unwrap();
    for i in 0..80 {
        log.add(&Point::new(
            vec![i as f64, (i * 3) as f64, (i % 7) as f64],
            vec![],
        ))
        .unwrap();
    }
    let target = dir.path().join("tree");
    let mut built = Tree::create(dir.path().join("scratch"), &target, log).unwrap();

    let probe = Point::new(vec![40.0, 40.0, 3.0], vec![]);
    let from_build = built.nearest(&probe, 4).unwrap();

    let mut reopened = Tree::open(&target).unwrap();
    assert_eq!(reopened.count(), built.count());
    let from_reopen = reopened.nearest(&probe, 4).unwrap();

    assert_eq!(from_build.len(), from_reopen.len());
    for (a, b) in from_build.iter().zip(from_reopen.iter()) {
        assert_eq!(a.point, b.point);
        assert_eq!(a.distance, b.distance);
    }
}

#[test]
fn empty_point_log_builds_an_empty_queryable_tree() {
    let dir = tempfile::tempdir().unwrap();
    let log = PointLog::create(dir.path().join("points"), 4, 0, true).unwrap();
    let mut tree = Tree::create(dir.path().join("scratch"), dir.path().join("tree"), log)
        .unwrap();
    assert_eq!(tree.count(), 0);
    assert!(tree
        .nearest(&Point::new(vec![0.0, 0.0, 0.0, 0.0], vec![]), 10)
        .unwrap()
        .is_empty());
}
