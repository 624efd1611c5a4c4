// tests/watch_machine.rs

use std::time::{Duration, Instant};

use assetpipe::engine::{BindingMachine, Trigger, WatchState};
use assetpipe::types::TriggeredWhileRunning;

const DELAY: Duration = Duration::from_millis(100);

fn watching(behaviour: TriggeredWhileRunning) -> BindingMachine {
    let mut m = BindingMachine::new(DELAY, behaviour);
    m.start();
    m
}

#[test]
fn starts_idle_and_ignores_changes_until_started() {
    let mut m = BindingMachine::new(DELAY, TriggeredWhileRunning::Queue);
    assert_eq!(m.state(), WatchState::Idle);
    assert!(!m.on_change("a.css", Instant::now()));

    m.start();
    assert_eq!(m.state(), WatchState::Watching);
}

#[test]
fn burst_of_changes_coalesces_into_one_trigger() {
    let mut m = watching(TriggeredWhileRunning::Queue);
    let t0 = Instant::now();

    for i in 0..10 {
        assert!(m.on_change("app/src/sass/main.scss", t0 + Duration::from_millis(i * 10)));
    }
    assert!(m.on_change("app/src/sass/_vars.scss", t0 + Duration::from_millis(95)));
    assert_eq!(m.state(), WatchState::Debouncing);

    // Each change re-arms the timer.
    assert_eq!(m.deadline(), Some(t0 + Duration::from_millis(195)));
    assert_eq!(m.poll_deadline(t0 + Duration::from_millis(150)), None);

    let trigger = m.poll_deadline(t0 + Duration::from_millis(195));
    assert_eq!(
        trigger,
        Some(Trigger {
            paths: vec![
                "app/src/sass/_vars.scss".to_string(),
                "app/src/sass/main.scss".to_string(),
            ],
        })
    );
    assert_eq!(m.state(), WatchState::Triggering);
    assert_eq!(m.poll_deadline(t0 + Duration::from_secs(10)), None);
}

#[test]
fn completion_returns_to_watching() {
    let mut m = watching(TriggeredWhileRunning::Queue);
    let t0 = Instant::now();
    m.on_change("a", t0);
    m.poll_deadline(t0 + DELAY).unwrap();

    m.on_run_complete(t0 + DELAY * 2);
    assert_eq!(m.state(), WatchState::Watching);
    assert_eq!(m.deadline(), None);
}

#[test]
fn queue_mode_rearms_after_run_with_changes_seen_while_running() {
    let mut m = watching(TriggeredWhileRunning::Queue);
    let t0 = Instant::now();
    m.on_change("a", t0);
    m.poll_deadline(t0 + DELAY).unwrap();

    assert!(m.on_change("b", t0 + DELAY + Duration::from_millis(5)));
    assert!(m.on_change("c", t0 + DELAY + Duration::from_millis(6)));
    assert_eq!(m.state(), WatchState::Triggering);

    let done = t0 + DELAY * 3;
    m.on_run_complete(done);
    assert_eq!(m.state(), WatchState::Debouncing);
    assert_eq!(m.deadline(), Some(done + DELAY));

    let again = m.poll_deadline(done + DELAY).unwrap();
    assert_eq!(again.paths, vec!["b".to_string(), "c".to_string()]);
}

#[test]
fn drop_mode_discards_changes_seen_while_running() {
    let mut m = watching(TriggeredWhileRunning::Drop);
    let t0 = Instant::now();
    m.on_change("a", t0);
    m.poll_deadline(t0 + DELAY).unwrap();

    assert!(!m.on_change("b", t0 + DELAY + Duration::from_millis(5)));
    m.on_run_complete(t0 + DELAY * 3);
    assert_eq!(m.state(), WatchState::Watching);
    assert_eq!(m.deadline(), None);
}

#[test]
fn stop_discards_pending_work() {
    let mut m = watching(TriggeredWhileRunning::Queue);
    let t0 = Instant::now();
    m.on_change("a", t0);

    m.stop();
    assert_eq!(m.state(), WatchState::Stopped);
    assert_eq!(m.deadline(), None);
    assert_eq!(m.poll_deadline(t0 + DELAY), None);
    assert!(!m.on_change("b", t0));

    m.start();
    assert_eq!(m.state(), WatchState::Stopped);
}
