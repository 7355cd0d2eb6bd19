//! Run lifecycle integration tests.
//!
//! Each test drives one or more complete runs against a mock lftp backend,
//! a file-backed catalog and real temporary directories:
//! - Launching and queueing transfers
//! - Settling finished and failed transfers
//! - Moving finished items and removing remote sources
//! - Coexisting with a backgrounded session

use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

use locomotive_core::{
    catalog::{ItemCatalog, ItemStatus, SqliteCatalog},
    lftp::{escape_path, Lftp},
    notify::{NotificationEvent, NotifierSet},
    orchestrator::{ConcurrencyLimits, Locomotive, RunSettings, RunStage, SourceTarget},
    placer::FsPlacer,
    schedule::SpeedSchedule,
    testing::{fixtures, MockBackend, MockNotifier},
};

const HOST: &str = "example.com";

struct TestHarness {
    notifier: MockNotifier,
    work_dir: TempDir,
    target_dir: TempDir,
    db_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        Self {
            notifier: MockNotifier::new(),
            work_dir: TempDir::new().expect("Failed to create work dir"),
            target_dir: TempDir::new().expect("Failed to create target dir"),
            db_dir: TempDir::new().expect("Failed to create db dir"),
        }
    }

    fn work(&self) -> &Path {
        self.work_dir.path()
    }

    fn target(&self) -> &Path {
        self.target_dir.path()
    }

    fn db_path(&self) -> PathBuf {
        self.db_dir.path().join("locomotive.db")
    }

    fn settings(&self) -> RunSettings {
        RunSettings::new(HOST, self.work())
            .with_source(SourceTarget::new("/in", Some(self.target().to_path_buf())))
            .with_limits(ConcurrencyLimits {
                transfer_limit: 2,
                ..ConcurrencyLimits::default()
            })
    }

    fn locomotive(
        &self,
        backend: MockBackend,
        settings: RunSettings,
    ) -> Locomotive<MockBackend, SqliteCatalog, FsPlacer> {
        let lftp = Lftp::new(fixtures::credentials(), self.work(), backend);
        let catalog = SqliteCatalog::new(&self.db_path()).expect("Failed to open catalog");
        let notifiers = NotifierSet::new().with(self.notifier.clone());

        Locomotive::new(settings, lftp, catalog, FsPlacer::with_defaults(), notifiers)
            .expect("Failed to create runner")
            .with_clock_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap())
    }

    fn catalog(&self) -> SqliteCatalog {
        SqliteCatalog::new(&self.db_path()).expect("Failed to open catalog")
    }
}

/// A backend with no backgrounded session that lists `entries` in `/in`.
fn idle_backend(entries: &[(&str, u64, bool)]) -> MockBackend {
    let backend = MockBackend::new();
    backend.on_script("jobs -v", "lftp: attach: no such process", 1);
    backend.on_script("cls", fixtures::listing(entries), 0);
    backend
}

fn names(items: &[locomotive_core::RemoteItem]) -> Vec<&str> {
    items.iter().map(|i| i.name.as_str()).collect()
}

#[tokio::test]
async fn test_first_run_launches_and_queues() {
    let harness = TestHarness::new();
    let backend = idle_backend(&[
        ("Show S01", 4096, true),
        ("movie.mkv", 100, false),
        ("Other", 4096, true),
    ]);

    let mut loco = harness.locomotive(backend.clone(), harness.settings());
    let report = assert_ok!(loco.run().await);

    assert_eq!(loco.stage(), RunStage::Terminal);
    assert!(!report.backgrounded);
    assert_eq!(report.available_slots, 2);
    assert_eq!(report.new_transfers, vec!["Show S01", "movie.mkv"]);
    assert_eq!(report.queued_transfers, vec!["Other"]);

    let scripts = backend.background_scripts();
    assert_eq!(scripts.len(), 1);
    let script = &scripts[0];
    assert!(script.starts_with("connect -p 22 -u user,secret sftp://example.com;"));
    assert!(script.ends_with(" exit parent;"));

    let show_dir = escape_path(&harness.work().join("Show S01").to_string_lossy());
    let mirror = script
        .find(&format!("mirror -c --use-pget-n=25 /in/Show\\ S01 {};", show_dir))
        .expect("mirror command missing");
    let speed = script.find("set net:limit-total-rate 0;").unwrap();
    let parallel = script.find("set cmd:queue-parallel 2;").unwrap();
    assert!(speed < mirror);
    assert!(parallel < mirror);

    let work = escape_path(&harness.work().to_string_lossy());
    assert!(script.contains(&format!("pget -c -n 25 /in/movie.mkv -o {};", work)));
    assert!(script.contains("queue mirror -c --use-pget-n=25 /in/Other "));

    let transferring = harness
        .catalog()
        .in_status(HOST, ItemStatus::Transferring)
        .unwrap();
    assert_eq!(transferring.len(), 3);
    assert!(transferring.iter().all(|i| i.attempts == 1));

    let events = harness.notifier.events();
    assert_eq!(events.len(), 3);
    assert!(matches!(&events[0], NotificationEvent::TransferStarted { name } if name == "Show S01"));
}

#[tokio::test]
async fn test_finished_items_are_moved_and_unfinished_marked_failed() {
    let harness = TestHarness::new();
    let entries = [("Show S01", 4096, true), ("movie.mkv", 100, false)];

    let mut first = harness.locomotive(idle_backend(&entries), harness.settings());
    first.run().await.unwrap();

    // lftp finished the directory but left the file half done
    let show = harness.work().join("Show S01");
    std::fs::create_dir_all(&show).unwrap();
    std::fs::write(show.join("e01.mkv"), b"episode").unwrap();
    std::fs::write(harness.work().join("movie.mkv"), b"mov").unwrap();
    std::fs::write(harness.work().join("movie.mkv.lftp-pget-status"), b"").unwrap();

    let backend = idle_backend(&entries);
    let mut second = harness.locomotive(backend.clone(), harness.settings());
    let report = second.run().await.unwrap();

    assert!(report.launched().next().is_none());
    assert!(backend.background_scripts().is_empty());
    assert_eq!(report.completed, vec!["Show S01"]);
    assert_eq!(report.failed, vec!["movie.mkv"]);
    assert_eq!(report.moved_items, vec!["Show S01"]);

    assert!(harness.target().join("Show S01/e01.mkv").exists());
    assert!(!show.exists());

    let catalog = harness.catalog();
    assert!(catalog.awaiting_move(HOST).unwrap().is_empty());
    let failed = catalog.in_status(HOST, ItemStatus::Failed).unwrap();
    assert_eq!(names(&failed), vec!["movie.mkv"]);

    let last = harness.notifier.events().pop().unwrap();
    assert_eq!(
        last,
        NotificationEvent::ItemMoved {
            name: "Show S01".to_string(),
            destination: harness.target().join("Show S01"),
        }
    );

    // the failed file is retried on the next run
    let mut third = harness.locomotive(idle_backend(&entries), harness.settings());
    let report = third.run().await.unwrap();
    assert_eq!(report.new_transfers, vec!["movie.mkv"]);

    let retried = harness
        .catalog()
        .in_status(HOST, ItemStatus::Transferring)
        .unwrap();
    assert_eq!(retried[0].attempts, 2);
}

#[tokio::test]
async fn test_retries_stop_at_max_retries() {
    let harness = TestHarness::new();
    let entries = [("Film", 4096, true)];
    let mut settings = harness.settings();
    settings.limits.max_retries = 1;

    for _ in 0..2 {
        let mut loco = harness.locomotive(idle_backend(&entries), settings.clone());
        loco.run().await.unwrap();
    }

    let backend = idle_backend(&entries);
    let mut loco = harness.locomotive(backend.clone(), settings);
    let report = loco.run().await.unwrap();

    assert!(report.new_transfers.is_empty());
    assert!(backend.background_scripts().is_empty());
    let failed = harness.catalog().in_status(HOST, ItemStatus::Failed).unwrap();
    assert_eq!(failed[0].attempts, 1);
}

#[tokio::test]
async fn test_backgrounded_session_is_respected() {
    let harness = TestHarness::new();

    let mut first = harness.locomotive(
        idle_backend(&[("Show", 4096, true), ("Film", 4096, true)]),
        harness.settings(),
    );
    first.run().await.unwrap();

    let work = harness.work().to_string_lossy().into_owned();
    let backend = MockBackend::new();
    backend.on_script("jobs -v", fixtures::jobs_output(&["/in/Show"], &[], &work), 0);
    backend.on_script(
        "cls",
        fixtures::listing(&[("Show", 4096, true), ("Film", 4096, true), ("New", 4096, true)]),
        0,
    );

    let mut second = harness.locomotive(backend.clone(), harness.settings());
    let report = second.run().await.unwrap();

    assert!(report.backgrounded);
    assert_eq!(report.available_slots, 1);
    assert_eq!(report.new_transfers, vec!["New"]);
    assert!(report.queued_transfers.is_empty());
    // Film is gone from the session and never landed locally
    assert_eq!(report.failed, vec!["Film"]);

    let transferring = harness
        .catalog()
        .in_status(HOST, ItemStatus::Transferring)
        .unwrap();
    assert_eq!(names(&transferring), vec!["Show", "New"]);
}

#[tokio::test]
async fn test_every_running_job_stays_in_flight() {
    let harness = TestHarness::new();
    let entries = [("Show", 4096, true), ("Film", 4096, true)];

    let mut first = harness.locomotive(idle_backend(&entries), harness.settings());
    first.run().await.unwrap();

    // Film is half downloaded and still running as the session's second job
    let film = harness.work().join("Film");
    std::fs::create_dir_all(&film).unwrap();
    std::fs::write(film.join("part.mkv"), b"pa").unwrap();
    std::fs::write(film.join("part.mkv.lftp-pget-status"), b"").unwrap();

    let work = harness.work().to_string_lossy().into_owned();
    let backend = MockBackend::new();
    backend.on_script(
        "jobs -v",
        fixtures::jobs_output(&["/in/Show", "/in/Film"], &[], &work),
        0,
    );
    backend.on_script("cls", fixtures::listing(&entries), 0);

    let mut second = harness.locomotive(backend.clone(), harness.settings());
    let report = second.run().await.unwrap();

    assert!(report.backgrounded);
    assert_eq!(report.available_slots, 0);
    assert!(report.failed.is_empty());
    assert!(report.launched().next().is_none());
    assert!(backend.background_scripts().is_empty());

    let transferring = harness
        .catalog()
        .in_status(HOST, ItemStatus::Transferring)
        .unwrap();
    assert_eq!(names(&transferring), vec!["Show", "Film"]);
    assert!(transferring.iter().all(|i| i.attempts == 1));
}

#[tokio::test]
async fn test_limits_pushed_to_session_without_new_items() {
    let harness = TestHarness::new();
    let work = harness.work().to_string_lossy().into_owned();

    let backend = MockBackend::new();
    backend.on_script("jobs -v", fixtures::jobs_output(&["/elsewhere/x"], &[], &work), 0);
    backend.on_script("cls", "", 0);

    let schedule = SpeedSchedule::new()
        .with_entry(NaiveTime::from_hms_opt(8, 0, 0).unwrap(), 500_000)
        .with_entry(NaiveTime::from_hms_opt(23, 0, 0).unwrap(), 0);
    let settings = harness.settings().with_speed_schedule(schedule);

    let mut loco = harness.locomotive(backend.clone(), settings);
    let report = loco.run().await.unwrap();

    assert!(report.backgrounded);
    assert!(backend.background_scripts().is_empty());

    let pushed = backend
        .foreground_scripts()
        .into_iter()
        .find(|s| s.contains("| lftp -c attach") && !s.contains("jobs -v"))
        .expect("limits were not pushed");
    assert!(pushed.contains("set net:limit-total-rate 500000;"));
    assert!(pushed.contains("set cmd:queue-parallel 2;"));
}

#[tokio::test]
async fn test_remove_sources_honors_exclusions() {
    let harness = TestHarness::new();
    let entries = [("Show", 4096, true), ("notes.keep", 10, false)];
    let settings = harness
        .settings()
        .with_source_removal(vec!["\\.keep$".to_string()]);

    let mut first = harness.locomotive(idle_backend(&entries), settings.clone());
    first.run().await.unwrap();

    std::fs::create_dir_all(harness.work().join("Show")).unwrap();
    std::fs::write(harness.work().join("Show/a.mkv"), b"a").unwrap();
    std::fs::write(harness.work().join("notes.keep"), b"n").unwrap();

    let backend = idle_backend(&entries);
    let mut second = harness.locomotive(backend.clone(), settings);
    let report = second.run().await.unwrap();

    assert_eq!(report.completed, vec!["Show", "notes.keep"]);
    assert_eq!(report.removed_sources, vec!["Show"]);
    assert_eq!(report.moved_items, vec!["Show", "notes.keep"]);

    let removal = backend
        .foreground_scripts()
        .into_iter()
        .find(|s| s.contains("rm -r /in/Show;"))
        .expect("removal script missing");
    assert!(!removal.contains("notes.keep"));

    let catalog = harness.catalog();
    let pending_removal = catalog.awaiting_source_removal(HOST).unwrap();
    assert_eq!(names(&pending_removal), vec!["notes.keep"]);
}

#[tokio::test]
async fn test_listing_failure_aborts_run() {
    let harness = TestHarness::new();
    let backend = MockBackend::new();
    backend.on_script("jobs -v", "", 1);
    backend.on_script("cls", "cls: Access failed: No such file (/in)", 1);

    let mut loco = harness.locomotive(backend.clone(), harness.settings());
    let err = assert_err!(loco.run().await);

    assert_eq!(loco.stage(), RunStage::InitiateTransfers);
    assert!(err.client_output().unwrap().contains("Access failed"));
    assert!(backend.background_scripts().is_empty());
    assert!(loco.lftp().command_log().is_empty());
}

#[tokio::test]
async fn test_failed_move_is_retried_later() {
    let harness = TestHarness::new();
    let entries = [("Show", 4096, true)];

    let mut first = harness.locomotive(idle_backend(&entries), harness.settings());
    first.run().await.unwrap();

    std::fs::create_dir_all(harness.work().join("Show")).unwrap();
    std::fs::create_dir_all(harness.target().join("Show")).unwrap();

    let mut second = harness.locomotive(idle_backend(&entries), harness.settings());
    let report = second.run().await.unwrap();

    assert_eq!(second.stage(), RunStage::Terminal);
    assert!(report.moved_items.is_empty());
    assert_eq!(report.failed_moves, vec!["Show"]);
    assert!(harness.work().join("Show").exists());
    assert_eq!(harness.catalog().awaiting_move(HOST).unwrap().len(), 1);
}

#[tokio::test]
async fn test_items_without_target_stay_in_working_dir() {
    let harness = TestHarness::new();
    let entries = [("Show", 4096, true)];
    let settings = RunSettings::new(HOST, harness.work()).with_source(SourceTarget::new("/in", None));

    let mut first = harness.locomotive(idle_backend(&entries), settings.clone());
    first.run().await.unwrap();
    std::fs::create_dir_all(harness.work().join("Show")).unwrap();

    let mut second = harness.locomotive(idle_backend(&entries), settings);
    let report = second.run().await.unwrap();

    assert_eq!(report.completed, vec!["Show"]);
    assert!(report.moved_items.is_empty());
    assert!(report.failed_moves.is_empty());
    assert!(harness.work().join("Show").exists());
}
