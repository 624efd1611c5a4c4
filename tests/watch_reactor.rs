// tests/watch_reactor.rs

//! Reactor behaviour driven by synthetic file-change events.

mod common;
use crate::common::probe::Recorder;
use crate::common::{init_tracing, with_timeout, write_file};

use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use assetpipe::engine::{Reactor, ReactorEvent, ReactorStats, Runner};
use assetpipe::registry::TaskRegistry;
use assetpipe::reload::LiveReload;
use assetpipe::types::TriggeredWhileRunning;
use assetpipe::watch::{RawBindingSpec, WatchBinding};

type TestResult = Result<(), Box<dyn Error>>;

fn spec(name: &str, globs: &[&str], task: Option<&str>, delay_ms: u64) -> RawBindingSpec {
    RawBindingSpec {
        name: name.to_string(),
        globs: globs.iter().map(|g| g.to_string()).collect(),
        exclude: Vec::new(),
        task: task.map(str::to_string),
        reload: false,
        use_hash: false,
        delay: Duration::from_millis(delay_ms),
        triggered_while_running: TriggeredWhileRunning::Queue,
    }
}

struct Harness {
    tx: mpsc::Sender<ReactorEvent>,
    reload: LiveReload,
    handle: JoinHandle<assetpipe::errors::Result<ReactorStats>>,
}

impl Harness {
    fn start(root: &Path, specs: Vec<RawBindingSpec>, registry: TaskRegistry) -> Self {
        let bindings = specs
            .into_iter()
            .map(|s| WatchBinding::compile(s).unwrap())
            .collect();
        let runner = Arc::new(Runner::new(Arc::new(registry)));
        let reload = LiveReload::new();
        let (tx, rx) = mpsc::channel(64);
        let reactor = Reactor::new(root, bindings, runner, reload.clone(), tx.clone(), rx);
        let handle = tokio::spawn(reactor.run());
        Self { tx, reload, handle }
    }

    async fn change(&self, path: &str) {
        self.tx
            .send(ReactorEvent::file_changed(path))
            .await
            .unwrap();
    }

    async fn shutdown(self) -> ReactorStats {
        self.tx.send(ReactorEvent::ShutdownRequested).await.unwrap();
        self.handle.await.unwrap().unwrap()
    }
}

#[tokio::test]
async fn burst_of_changes_runs_task_once() -> TestResult {
    with_timeout(async {
        init_tracing();
        let rec = Recorder::new();
        let mut registry = TaskRegistry::new();
        registry.register("styles", rec.action("styles", Duration::ZERO))?;

        let h = Harness::start(
            Path::new("."),
            vec![spec("styles", &["app/src/sass/**/*.scss"], Some("styles"), 50)],
            registry,
        );

        for i in 0..10 {
            h.change(&format!("app/src/sass/part{}.scss", i % 3)).await;
        }
        sleep(Duration::from_millis(300)).await;

        let stats = h.shutdown().await;
        assert_eq!(rec.starts("styles"), 1);
        assert_eq!(stats.triggers, 1);
        assert_eq!(stats.failures, 0);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn unmatched_and_excluded_paths_are_ignored() -> TestResult {
    with_timeout(async {
        init_tracing();
        let rec = Recorder::new();
        let mut registry = TaskRegistry::new();
        registry.register("scripts", rec.action("scripts", Duration::ZERO))?;

        let mut s = spec("scripts", &["app/src/js/**/*.js"], Some("scripts"), 20);
        s.exclude = vec!["app/src/js/vendor/**".to_string()];
        let h = Harness::start(Path::new("."), vec![s], registry);

        h.change("app/src/sass/main.scss").await;
        h.change("app/src/js/vendor/lib.js").await;
        h.change("app/js/main.js").await;
        sleep(Duration::from_millis(150)).await;
        assert_eq!(rec.starts("scripts"), 0);

        h.change("app/src/js/main.js").await;
        sleep(Duration::from_millis(150)).await;

        h.shutdown().await;
        assert_eq!(rec.starts("scripts"), 1);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn changes_during_run_queue_one_more_run() -> TestResult {
    with_timeout(async {
        init_tracing();
        let rec = Recorder::new();
        let mut registry = TaskRegistry::new();
        registry.register("build", rec.action("build", Duration::from_millis(200)))?;

        let h = Harness::start(
            Path::new("."),
            vec![spec("src", &["src/**"], Some("build"), 20)],
            registry,
        );

        h.change("src/a.txt").await;
        sleep(Duration::from_millis(80)).await;
        assert_eq!(rec.starts("build"), 1);

        // Task is still running.
        h.change("src/b.txt").await;
        h.change("src/c.txt").await;
        h.change("src/b.txt").await;
        sleep(Duration::from_millis(500)).await;

        let stats = h.shutdown().await;
        assert_eq!(rec.starts("build"), 2);
        assert_eq!(stats.triggers, 2);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn changes_during_run_are_dropped_in_drop_mode() -> TestResult {
    with_timeout(async {
        init_tracing();
        let rec = Recorder::new();
        let mut registry = TaskRegistry::new();
        registry.register("build", rec.action("build", Duration::from_millis(200)))?;

        let mut s = spec("src", &["src/**"], Some("build"), 20);
        s.triggered_while_running = TriggeredWhileRunning::Drop;
        let h = Harness::start(Path::new("."), vec![s], registry);

        h.change("src/a.txt").await;
        sleep(Duration::from_millis(80)).await;
        h.change("src/b.txt").await;
        sleep(Duration::from_millis(500)).await;

        let stats = h.shutdown().await;
        assert_eq!(rec.starts("build"), 1);
        assert_eq!(stats.triggers, 1);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn failing_task_keeps_watching() -> TestResult {
    with_timeout(async {
        init_tracing();
        let rec = Recorder::new();
        let mut registry = TaskRegistry::new();
        registry.register("lint", rec.failing("lint", Duration::ZERO, "lint errors"))?;

        let h = Harness::start(
            Path::new("."),
            vec![spec("js", &["**/*.js"], Some("lint"), 20)],
            registry,
        );

        h.change("main.js").await;
        sleep(Duration::from_millis(150)).await;
        h.change("other.js").await;
        sleep(Duration::from_millis(150)).await;

        let stats = h.shutdown().await;
        assert_eq!(rec.starts("lint"), 2);
        assert_eq!(stats.failures, 2);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn reload_only_binding_broadcasts_without_running_anything() -> TestResult {
    with_timeout(async {
        init_tracing();
        let rec = Recorder::new();
        let mut registry = TaskRegistry::new();
        registry.register("unused", rec.action("unused", Duration::ZERO))?;

        let mut s = spec("html", &["app/*.html"], None, 20);
        s.reload = true;
        let h = Harness::start(Path::new("."), vec![s], registry);
        let mut observer = h.reload.subscribe();

        h.change("app/index.html").await;
        let event = observer.recv().await?;

        assert_eq!(event.binding, "html");
        assert_eq!(event.paths, vec!["app/index.html".to_string()]);

        let stats = h.shutdown().await;
        assert!(rec.events().is_empty());
        assert_eq!(stats.reloads, 1);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn reload_follows_successful_run_only() -> TestResult {
    with_timeout(async {
        init_tracing();
        let rec = Recorder::new();
        let mut registry = TaskRegistry::new();
        registry.register("styles", rec.action("styles", Duration::from_millis(30)))?;
        registry.register("broken", rec.failing("broken", Duration::ZERO, "nope"))?;

        let mut ok = spec("styles", &["css/*.scss"], Some("styles"), 20);
        ok.reload = true;
        let mut bad = spec("broken", &["js/*.js"], Some("broken"), 20);
        bad.reload = true;
        let h = Harness::start(Path::new("."), vec![ok, bad], registry);
        let mut observer = h.reload.subscribe();

        h.change("js/app.js").await;
        sleep(Duration::from_millis(100)).await;
        h.change("css/main.scss").await;

        let event = observer.recv().await?;
        assert_eq!(event.binding, "styles");
        assert!(rec.position("end:styles").is_some());

        let stats = h.shutdown().await;
        assert_eq!(stats.reloads, 1);
        assert_eq!(stats.failures, 1);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn one_change_can_fire_several_bindings() -> TestResult {
    with_timeout(async {
        init_tracing();
        let rec = Recorder::new();
        let mut registry = TaskRegistry::new();
        registry.register("copy", rec.action("copy", Duration::ZERO))?;
        registry.register("lint", rec.action("lint", Duration::ZERO))?;

        let h = Harness::start(
            Path::new("."),
            vec![
                spec("copy", &["src/**"], Some("copy"), 20),
                spec("lint", &["src/**/*.js"], Some("lint"), 20),
            ],
            registry,
        );

        h.change("src/app.js").await;
        sleep(Duration::from_millis(150)).await;

        h.shutdown().await;
        assert_eq!(rec.starts("copy"), 1);
        assert_eq!(rec.starts("lint"), 1);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn use_hash_ignores_unchanged_content() -> TestResult {
    with_timeout(async {
        init_tracing();
        let dir = tempfile::tempdir()?;
        write_file(dir.path(), "src/a.txt", "one");

        let rec = Recorder::new();
        let mut registry = TaskRegistry::new();
        registry.register("build", rec.action("build", Duration::ZERO))?;

        let mut s = spec("src", &["src/*.txt"], Some("build"), 20);
        s.use_hash = true;
        let h = Harness::start(dir.path(), vec![s], registry);

        h.change("src/a.txt").await;
        sleep(Duration::from_millis(150)).await;
        // Touched but not modified.
        h.change("src/a.txt").await;
        sleep(Duration::from_millis(150)).await;
        assert_eq!(rec.starts("build"), 1);

        write_file(dir.path(), "src/a.txt", "two");
        h.change("src/a.txt").await;
        sleep(Duration::from_millis(150)).await;

        h.shutdown().await;
        assert_eq!(rec.starts("build"), 2);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn shutdown_waits_for_in_flight_run() -> TestResult {
    with_timeout(async {
        init_tracing();
        let rec = Recorder::new();
        let mut registry = TaskRegistry::new();
        registry.register("build", rec.action("build", Duration::from_millis(400)))?;

        let h = Harness::start(
            Path::new("."),
            vec![spec("build", &["app/src/**/*.js"], Some("build"), 10)],
            registry,
        );

        h.change("app/src/main.js").await;
        sleep(Duration::from_millis(100)).await;
        assert_eq!(rec.starts("build"), 1);
        assert!(rec.position("end:build").is_none());

        let stats = h.shutdown().await;
        assert!(rec.position("end:build").is_some(), "{:?}", rec.events());
        assert_eq!(stats.triggers, 1);
        assert_eq!(stats.failures, 0);
        Ok(())
    })
    .await
}
