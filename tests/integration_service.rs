//! Integration tests for the job submission and polling API.

use assert_fs::prelude::*;
use photo_sieve::config::StageFlags;
use photo_sieve::service::{FilterRequest, Service};
use predicates::prelude::*;
use std::time::Duration;

fn request(temp: &assert_fs::TempDir, workers: &str) -> FilterRequest {
    FilterRequest {
        source: temp.child("src").path().to_path_buf(),
        cache_dir: Some(temp.child("cache").path().to_path_buf()),
        output_dir: Some(temp.child("out").path().to_path_buf()),
        workers: workers.to_string(),
        quality_boundary_kb: None,
        flags: StageFlags::default(),
    }
}

#[test]
fn polling_sees_processing_until_done() {
    let temp = assert_fs::TempDir::new().unwrap();
    for i in 0..10u8 {
        temp.child(format!("src/{i}.jpg")).write_binary(&[i; 32]).unwrap();
    }
    temp.child("src/dup.jpg").write_binary(&[0u8; 32]).unwrap();
    let service = Service::with_grace_period(Duration::from_millis(20));

    let handle = service.spawn_filter(request(&temp, "3"));
    while !handle.is_finished() {
        let snapshot = service.get_result();
        assert!(snapshot.processed <= snapshot.total_jobs);
        std::thread::sleep(Duration::from_millis(2));
    }
    let report = handle.join().unwrap();

    assert!(report.is_success());
    assert_eq!(report.duplicates_removed(), 1);
    assert!(!service.get_processing());
    assert_eq!(service.last_report().map(|r| r.run_id), Some(report.run_id));
    temp.child("out/LOW").assert(predicate::path::is_dir());
}

#[test]
fn empty_worker_count_is_a_config_error() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("src").create_dir_all().unwrap();
    let service = Service::with_grace_period(Duration::ZERO);

    let report = service.start_filter(request(&temp, "   "));

    assert!(!report.is_success());
    assert!(report.stages.is_empty());
    temp.child("out").assert(predicate::path::missing());
}

#[test]
fn cancel_before_start_is_cleared_by_next_run() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("src/a.jpg").write_binary(b"a").unwrap();
    let service = Service::with_grace_period(Duration::ZERO);
    service.cancel();

    let report = service.start_filter(request(&temp, "1"));

    // A new run resets the token, so a stale request does not stop it
    assert!(!report.cancelled);
    temp.child("out/LOW/a.jpg").assert(predicate::path::exists());
}

#[test]
fn merge_through_service_reports_progress() {
    let temp = assert_fs::TempDir::new().unwrap();
    temp.child("a/x.jpg").write_binary(b"1").unwrap();
    temp.child("b/x.jpg").write_binary(b"2").unwrap();
    let service = Service::new();

    let report = service
        .start_merge(temp.child("a").path(), temp.child("b").path(), temp.child("m").path())
        .unwrap();

    assert_eq!(report.renamed, 1);
    let snapshot = service.get_result();
    assert_eq!(snapshot.current_task, "merge");
    assert_eq!(snapshot.processed, 2);
    temp.child("m/0A_1_x.jpg").assert(predicate::path::exists());
}
