//! End-to-end generation runs against an in-memory store.

use chrono::NaiveDate;
use tracker_seed_core::{
    config::{DateRange, GenConfig},
    error::GenError,
    generator::generate,
    store::{tables, TrackerStore},
    types::{IdWindow, Persisted, RequestKind},
};

fn store() -> TrackerStore {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = TrackerStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

#[test]
fn fresh_run_persists_everything_requested() {
    let store = store();
    let config = GenConfig::default_test();
    let report = generate(&store, &config).expect("generate");

    assert_eq!(report.seed, config.seed);
    assert_eq!(report.topics.persisted, Persisted(3));
    assert_eq!(report.features.requested.0, 40);
    assert_eq!(report.features.persisted, Persisted(40));
    assert_eq!(report.bugs.persisted, Persisted(60));
    assert_eq!(report.feature_assignments.persisted, Persisted(120));
    assert_eq!(report.bug_assignments.persisted, Persisted(180));

    let criteria = report.acceptance_criteria.persisted.0;
    assert!((40..=120).contains(&criteria), "{criteria} criteria for 40 features");

    // Sparse ids may collide; the store holds exactly what landed.
    assert!(report.users.persisted.0 <= report.users.requested.0);
    assert_eq!(
        store.row_count(&tables::APP_USER).unwrap(),
        report.users.persisted.0 as i64
    );
    assert_eq!(
        store.row_count(&tables::ENGINEER_SPECIALTY).unwrap(),
        (report.specialties.persisted.0 + report.specialty_repairs.persisted.0) as i64
    );
}

#[test]
fn every_storage_invariant_holds_after_a_run() {
    let store = store();
    let config = GenConfig::default_test();
    generate(&store, &config).expect("generate");

    assert!(store.max_specialties_held().unwrap() <= 2);
    for (topic, n) in store.specialist_counts().unwrap() {
        assert!(n >= 3, "topic {topic} has {n} specialists");
    }
    for kind in [RequestKind::Feature, RequestKind::Bug] {
        assert!(store.max_daily_submissions(kind).unwrap() <= 25);
        assert_eq!(store.mismatched_assignments(kind).unwrap(), 0);
        for (id, n) in store.assignee_counts(kind).unwrap() {
            assert_eq!(n, 3, "{} {id} has {n} assignees", kind.name());
        }
    }
}

#[test]
fn replaying_the_same_seed_is_a_no_op() {
    let store = store();
    let config = GenConfig::default_test();
    generate(&store, &config).expect("first run");
    let before = store.row_counts().unwrap();

    let replay = generate(&store, &config).expect("replay");
    assert_eq!(store.row_counts().unwrap(), before);
    for (label, count) in replay.entities() {
        assert_eq!(count.persisted, Persisted(0), "{label} persisted rows on replay");
    }
    assert_eq!(replay.features.requested.0, 0, "stored request ids are not regenerated");
    assert_eq!(replay.feature_assignments.requested.0, 0);
}

#[test]
fn same_seed_same_data_in_separate_databases() {
    let a = store();
    let b = store();
    let config = GenConfig::default_test();
    let report_a = generate(&a, &config).expect("run a");
    let report_b = generate(&b, &config).expect("run b");

    assert_eq!(
        serde_json::to_string(&report_a).unwrap(),
        serde_json::to_string(&report_b).unwrap()
    );
    assert_eq!(a.specialists_by_topic().unwrap(), b.specialists_by_topic().unwrap());
    for id in 1..=40 {
        assert_eq!(
            a.assignees_of(RequestKind::Feature, id).unwrap(),
            b.assignees_of(RequestKind::Feature, id).unwrap(),
            "feature {id} diverged"
        );
    }
}

#[test]
fn a_different_seed_over_stored_requests_adds_only_people() {
    let store = store();
    let config = GenConfig::default_test();
    generate(&store, &config).expect("first run");
    let features = store.row_count(&tables::FEATURE).unwrap();
    let bugs = store.row_count(&tables::BUG).unwrap();
    let assignments = store.row_count(&tables::FEATURE_ASSIGNMENT).unwrap();

    let mut reseeded = config.clone();
    reseeded.seed = 7;
    let report = generate(&store, &reseeded).expect("reseeded run");

    assert_eq!(report.features.requested.0, 0);
    assert_eq!(report.bugs.requested.0, 0);
    assert_eq!(report.feature_assignments.requested.0, 0);
    assert_eq!(report.bug_assignments.requested.0, 0);
    assert!(report.users.persisted.0 > 0, "new seed draws new users");
    assert_eq!(store.row_count(&tables::FEATURE).unwrap(), features);
    assert_eq!(store.row_count(&tables::BUG).unwrap(), bugs);
    assert_eq!(store.row_count(&tables::FEATURE_ASSIGNMENT).unwrap(), assignments);
    assert!(store.max_specialties_held().unwrap() <= 2);
    for kind in [RequestKind::Feature, RequestKind::Bug] {
        assert_eq!(store.mismatched_assignments(kind).unwrap(), 0);
    }
}

#[test]
fn a_run_failing_midway_leaves_the_store_untouched() {
    let store = store();
    // Two users on a single day: 50 feature slots in total.
    let day = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
    let mut config = GenConfig::default_test();
    config.users.count = 2;
    config.bugs.count = 0;
    config.dates = DateRange { start: day, end: day };
    generate(&store, &config).expect("first run");
    let before = store.row_counts().unwrap();

    // Six more engineers and their specialties land before the scheduler
    // runs out of room: only 10 of the 40 new features fit.
    let mut overflow = config.clone();
    overflow.engineers.count = 30;
    overflow.features.window = IdWindow::new(5_000, 1_000);
    overflow.criteria_window = IdWindow::new(50_000, 10_000);
    overflow.validate().expect("the configuration alone is satisfiable");
    let err = generate(&store, &overflow).unwrap_err();
    assert!(matches!(err, GenError::CapacityExhausted { cap: 25, .. }), "{err}");
    assert_eq!(store.row_counts().unwrap(), before);
}

#[test]
fn invalid_configuration_writes_nothing() {
    let store = store();
    let mut config = GenConfig::default_test();
    config.engineers.count = 2;
    let err = generate(&store, &config).unwrap_err();
    assert!(matches!(err, GenError::Configuration { .. }), "{err}");
    assert!(store.row_counts().unwrap().values().all(|&n| n == 0));
}

#[test]
fn disjoint_windows_accumulate() {
    let store = store();
    let first = GenConfig::default_test();
    let r1 = generate(&store, &first).expect("first run");

    let mut second = GenConfig::default_test();
    second.seed = 9;
    second.users.window = IdWindow::new(30_000_000, 1_000_000);
    second.engineers.window = IdWindow::new(40_000_000, 1_000_000);
    second.features.window = IdWindow::new(5_000, 1_000);
    second.bugs.window = IdWindow::new(5_000, 1_000);
    second.criteria_window = IdWindow::new(50_000, 10_000);
    let r2 = generate(&store, &second).expect("second run");

    assert_eq!(r2.features.persisted, Persisted(40));
    assert_eq!(r2.bugs.persisted, Persisted(60));
    assert_eq!(store.row_count(&tables::FEATURE).unwrap(), 80);
    assert_eq!(store.row_count(&tables::BUG).unwrap(), 120);
    assert_eq!(
        store.row_count(&tables::FEATURE_ASSIGNMENT).unwrap(),
        (r1.feature_assignments.persisted.0 + r2.feature_assignments.persisted.0) as i64
    );
    assert!(store.max_specialties_held().unwrap() <= 2);
    assert_eq!(store.mismatched_assignments(RequestKind::Bug).unwrap(), 0);
}
