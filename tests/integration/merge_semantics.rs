//! Merge engine semantics: last-writer-wins, idempotence, partial updates.

use crate::integration::test_utils::{
    faulty_grades_system, get_entry, grades_system, item, set_entry,
};
use rowsync::merge::merge_logs;
use rowsync::oplog::EntryFilter;
use rowsync::types::CompositeKey;
use std::sync::atomic::Ordering;

#[test]
fn out_of_order_entries_resolve_to_highest_timestamp() {
    let system = grades_system("SQL");
    let remote = vec![
        set_entry(1, "S1", "C1", &[("grade", "A")]),
        set_entry(3, "S1", "C1", &[("grade", "B")]),
        set_entry(2, "S1", "C1", &[("grade", "C")]),
    ];

    let outcome = merge_logs(&system, &remote).unwrap();
    assert_eq!(outcome.applied, 1);
    assert_eq!(outcome.stale_skipped, 2);

    let key = CompositeKey::new(["S1", "C1"]);
    let record = system.get(&key, 10).unwrap().unwrap();
    assert_eq!(record.values["grade"], "B");
    assert_eq!(system.cached_timestamp(&key), 3);
}

#[test]
fn merge_is_idempotent() {
    let system = grades_system("SQL");
    let remote = vec![
        set_entry(1, "S1", "C1", &[("grade", "A")]),
        set_entry(2, "S2", "C2", &[("grade", "B")]),
    ];

    let first = merge_logs(&system, &remote).unwrap();
    assert_eq!(first.applied, 2);

    let second = merge_logs(&system, &remote).unwrap();
    assert_eq!(second.applied, 0);
    assert_eq!(second.stale_skipped, 2);
}

#[test]
fn get_entries_never_change_state() {
    let system = grades_system("SQL");
    let remote = vec![get_entry(5, "S1", "C1"), get_entry(6, "S2", "C2")];

    let outcome = merge_logs(&system, &remote).unwrap();
    assert_eq!(outcome.applied, 0);
    assert_eq!(outcome.gets_ignored, 2);

    let key = CompositeKey::new(["S1", "C1"]);
    assert!(system.get(&key, 7).unwrap().is_none());
    assert_eq!(system.cached_timestamp(&key), -1);
}

#[test]
fn merge_commutes_on_disjoint_keys() {
    // Two source logs touching disjoint keys; both merge orders converge.
    let log_a = vec![set_entry(1, "S1", "C1", &[("grade", "A")])];
    let log_b = vec![set_entry(2, "S2", "C2", &[("grade", "B")])];

    let ab = grades_system("AB");
    merge_logs(&ab, &log_a).unwrap();
    merge_logs(&ab, &log_b).unwrap();

    let ba = grades_system("BA");
    merge_logs(&ba, &log_b).unwrap();
    merge_logs(&ba, &log_a).unwrap();

    for system in [&ab, &ba] {
        let r1 = system
            .get(&CompositeKey::new(["S1", "C1"]), 10)
            .unwrap()
            .unwrap();
        let r2 = system
            .get(&CompositeKey::new(["S2", "C2"]), 10)
            .unwrap()
            .unwrap();
        assert_eq!(r1.values["grade"], "A");
        assert_eq!(r2.values["grade"], "B");
    }
}

#[test]
fn partial_field_merge_preserves_untouched_attributes() {
    let system = grades_system("SQL");
    let key = CompositeKey::new(["S1", "C1"]);
    system
        .set(&key, &item(&[("roll_no", "7"), ("grade", "A")]), 1)
        .unwrap();

    // Remote write touches only the grade.
    let remote = vec![set_entry(5, "S1", "C1", &[("grade", "B")])];
    let outcome = merge_logs(&system, &remote).unwrap();
    assert_eq!(outcome.applied, 1);

    let record = system.get(&key, 10).unwrap().unwrap();
    assert_eq!(record.values["roll_no"], "7");
    assert_eq!(record.values["grade"], "B");
}

#[test]
fn remote_entries_older_than_local_are_stale() {
    let system = grades_system("SQL");
    let key = CompositeKey::new(["S1", "C1"]);
    system.set(&key, &item(&[("grade", "A")]), 9).unwrap();

    let remote = vec![set_entry(4, "S1", "C1", &[("grade", "F")])];
    let outcome = merge_logs(&system, &remote).unwrap();
    assert_eq!(outcome.applied, 0);
    assert_eq!(outcome.stale_skipped, 1);
    assert_eq!(
        system.get(&key, 10).unwrap().unwrap().values["grade"],
        "A"
    );
}

#[test]
fn equal_timestamps_keep_the_local_write() {
    let system = grades_system("SQL");
    let key = CompositeKey::new(["S1", "C1"]);
    system.set(&key, &item(&[("grade", "A")]), 5).unwrap();

    let remote = vec![set_entry(5, "S1", "C1", &[("grade", "Z")])];
    let outcome = merge_logs(&system, &remote).unwrap();
    assert_eq!(outcome.applied, 0);
    assert_eq!(
        system.get(&key, 10).unwrap().unwrap().values["grade"],
        "A"
    );
}

#[test]
fn merge_applied_writes_land_in_the_target_oplog() {
    let system = grades_system("SQL");
    let remote = vec![set_entry(3, "S1", "C1", &[("grade", "B")])];
    merge_logs(&system, &remote).unwrap();

    let log = system.oplog_entries(&EntryFilter::sets()).unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].timestamp, 3);
    assert_eq!(log[0].item["grade"], "B");
}

#[test]
fn entries_for_foreign_tables_are_ignored() {
    let system = grades_system("SQL");
    let mut entry = set_entry(3, "S1", "C1", &[("grade", "B")]);
    entry.table = "enrollments".to_string();

    let outcome = merge_logs(&system, &[entry]).unwrap();
    assert_eq!(outcome.applied, 0);
    assert!(system
        .get(&CompositeKey::new(["S1", "C1"]), 10)
        .unwrap()
        .is_none());
}

#[test]
fn failed_merge_keeps_applied_prefix_and_resumes() {
    // The store accepts two writes, then fails. Writes are applied in
    // ascending timestamp order, so the failure lands on the third entry.
    let (system, budget) = faulty_grades_system("SQL", 2);
    let remote = vec![
        set_entry(1, "S1", "C1", &[("grade", "A")]),
        set_entry(2, "S2", "C2", &[("grade", "B")]),
        set_entry(3, "S3", "C3", &[("grade", "C")]),
    ];

    assert!(merge_logs(&system, &remote).is_err());

    // The writes that went through are cached and logged; the failed one
    // left no trace in cache, store or oplog.
    assert_eq!(system.cached_timestamp(&CompositeKey::new(["S1", "C1"])), 1);
    assert_eq!(system.cached_timestamp(&CompositeKey::new(["S2", "C2"])), 2);
    assert_eq!(
        system.cached_timestamp(&CompositeKey::new(["S3", "C3"])),
        -1
    );
    let log = system.oplog_entries(&EntryFilter::sets()).unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].timestamp, 2);

    // Once the store recovers, re-merging the same source applies only the
    // entry that failed; the already-applied prefix is gated as stale.
    budget.store(usize::MAX, Ordering::SeqCst);
    let outcome = merge_logs(&system, &remote).unwrap();
    assert_eq!(outcome.applied, 1);
    assert_eq!(outcome.stale_skipped, 2);
    let record = system
        .get(&CompositeKey::new(["S3", "C3"]), 10)
        .unwrap()
        .unwrap();
    assert_eq!(record.values["grade"], "C");
}

#[test]
fn two_systems_converge_after_mutual_merge() {
    let hive = grades_system("HIVE");
    let sql = grades_system("SQL");

    hive.set(
        &CompositeKey::new(["S1", "C1"]),
        &item(&[("grade", "A")]),
        1,
    )
    .unwrap();
    sql.set(
        &CompositeKey::new(["S1", "C1"]),
        &item(&[("grade", "B")]),
        2,
    )
    .unwrap();
    sql.set(
        &CompositeKey::new(["S2", "C2"]),
        &item(&[("grade", "C")]),
        3,
    )
    .unwrap();

    let sql_log = sql.oplog_entries(&EntryFilter::all()).unwrap();
    merge_logs(&hive, &sql_log).unwrap();
    let hive_log = hive.oplog_entries(&EntryFilter::all()).unwrap();
    merge_logs(&sql, &hive_log).unwrap();

    for system in [&hive, &sql] {
        let r1 = system
            .get(&CompositeKey::new(["S1", "C1"]), 10)
            .unwrap()
            .unwrap();
        assert_eq!(r1.values["grade"], "B");
        let r2 = system
            .get(&CompositeKey::new(["S2", "C2"]), 10)
            .unwrap()
            .unwrap();
        assert_eq!(r2.values["grade"], "C");
    }
}
