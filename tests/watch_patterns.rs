// tests/watch_patterns.rs

mod common;
use crate::common::{init_tracing, with_timeout, write_file};

use std::path::{Path, PathBuf};
use std::time::Duration;

use assetpipe::globs::{glob_base, normalize, split_negation};
use tokio::sync::mpsc;

use assetpipe::engine::ReactorEvent;
use assetpipe::types::TriggeredWhileRunning;
use assetpipe::watch::{spawn_watcher, watch_dirs, RawBindingSpec, WatchBinding};

fn binding(globs: &[&str], exclude: &[&str]) -> anyhow::Result<WatchBinding> {
    WatchBinding::compile(RawBindingSpec {
        name: "test".to_string(),
        globs: globs.iter().map(|g| g.to_string()).collect(),
        exclude: exclude.iter().map(|g| g.to_string()).collect(),
        task: Some("build".to_string()),
        reload: false,
        use_hash: false,
        delay: Duration::from_millis(100),
        triggered_while_running: TriggeredWhileRunning::Queue,
    })
}

#[test]
fn glob_base_is_the_literal_prefix() {
    assert_eq!(glob_base("app/src/**/*.js"), PathBuf::from("app/src"));
    assert_eq!(glob_base("./app/index.html"), PathBuf::from("app"));
    assert_eq!(glob_base("**/*.css"), PathBuf::from("."));
    assert_eq!(glob_base("app/src/img/*.{png,jpg}"), PathBuf::from("app/src/img"));
}

#[test]
fn normalize_and_negation() {
    assert_eq!(normalize("./app/css/"), "app/css");
    assert_eq!(split_negation("!app/js/vendor/**"), (true, "app/js/vendor/**"));
    assert_eq!(split_negation("app/js/*.js"), (false, "app/js/*.js"));
}

#[test]
fn star_does_not_cross_directories() -> anyhow::Result<()> {
    init_tracing();
    let b = binding(&["app/*.html"], &[])?;
    assert!(b.matches("app/index.html"));
    assert!(!b.matches("app/pages/index.html"));
    Ok(())
}

#[test]
fn negated_patterns_fold_into_excludes() -> anyhow::Result<()> {
    init_tracing();
    let b = binding(&["app/src/**/*.js", "!app/src/vendor/**"], &["**/*.test.js"])?;
    assert!(b.matches("app/src/main.js"));
    assert!(!b.matches("app/src/vendor/jquery.js"));
    assert!(!b.matches("app/src/main.test.js"));
    assert_eq!(b.globs(), &["app/src/**/*.js".to_string()]);
    Ok(())
}

#[test]
fn binding_needs_positive_patterns() {
    init_tracing();
    assert!(binding(&["!app/**"], &[]).is_err());
    assert!(binding(&["app/[oops"], &[]).is_err());
}

#[test]
fn watch_dirs_are_existing_glob_bases_without_nesting() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path();
    write_file(root, "app/src/sass/main.scss", "");
    write_file(root, "app/src/js/main.js", "");
    write_file(root, "app/index.html", "");

    let bindings = vec![
        binding(&["app/src/sass/**/*.scss"], &[])?,
        binding(&["app/src/js/**/*.js"], &[])?,
        binding(&["app/src/**/*.json"], &[])?,
        binding(&["app/missing/deeper/*.css"], &[])?,
    ];

    let dirs = watch_dirs(root, &bindings);
    // app/src covers sass and js; the missing dir climbs to app, which
    // covers everything.
    assert_eq!(dirs, vec![root.join("app")]);

    let only_styles = watch_dirs(root, &bindings[..1]);
    assert_eq!(only_styles, vec![root.join("app/src/sass")]);

    let nothing_exists = watch_dirs(Path::new(root), &[binding(&["nope/*.x"], &[])?]);
    assert_eq!(nothing_exists, vec![root.to_path_buf()]);
    Ok(())
}

#[tokio::test]
async fn watcher_forwards_relative_paths_from_glob_bases_only() -> anyhow::Result<()> {
    with_timeout(async {
        init_tracing();
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        write_file(root, "app/src/sass/main.scss", "");
        write_file(root, "app/css/style.css", "");

        let (tx, mut rx) = mpsc::channel(256);
        let handle = spawn_watcher(root, &[binding(&["app/src/sass/**/*.scss"], &[])?], tx)?;
        assert_eq!(handle.dirs().len(), 1);

        write_file(root, "app/css/style.css", "body {}");
        write_file(root, "app/src/sass/parts/_grid.scss", "$cols: 12;");

        let mut seen = Vec::new();
        while !seen.iter().any(|p| p == "app/src/sass/parts/_grid.scss") {
            match rx.recv().await {
                Some(ReactorEvent::FileChanged { path }) => seen.push(path),
                Some(other) => panic!("unexpected event {other:?}"),
                None => panic!("watcher channel closed"),
            }
        }

        write_file(root, "app/css/other.css", "");
        tokio::time::sleep(Duration::from_millis(200)).await;
        while let Ok(event) = rx.try_recv() {
            if let ReactorEvent::FileChanged { path } = event {
                seen.push(path);
            }
        }

        assert!(
            seen.iter().all(|p| p.starts_with("app/src/sass")),
            "{seen:?}"
        );
        Ok(())
    })
    .await
}
