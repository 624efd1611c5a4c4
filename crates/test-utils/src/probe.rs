//! Recording actions for runner and reactor tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assetpipe::registry::{action_fn, Action};

/// Shared log of action lifecycle events.
///
/// Every probe action appends `start:<name>` when invoked and then either
/// `end:<name>` or `fail:<name>`.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// How many times `name` was invoked.
    pub fn starts(&self, name: &str) -> usize {
        let needle = format!("start:{name}");
        self.events().iter().filter(|e| **e == needle).count()
    }

    /// Names in invocation order.
    pub fn started(&self) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|e| e.strip_prefix("start:").map(str::to_string))
            .collect()
    }

    /// Position of `event` in the log.
    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    /// Largest number of probe actions running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn enter(&self, name: &str) {
        self.push(format!("start:{name}"));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self, event: String) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.push(event);
    }

    /// Action that sleeps for `delay` and succeeds.
    pub fn action(&self, name: &str, delay: Duration) -> Arc<dyn Action> {
        self.probe(name, delay, None)
    }

    /// Action that sleeps for `delay` and fails with `message`.
    pub fn failing(&self, name: &str, delay: Duration, message: &str) -> Arc<dyn Action> {
        self.probe(name, delay, Some(message.to_string()))
    }

    fn probe(&self, name: &str, delay: Duration, failure: Option<String>) -> Arc<dyn Action> {
        let recorder = self.clone();
        let name = name.to_string();
        action_fn(move || {
            let recorder = recorder.clone();
            let name = name.clone();
            let failure = failure.clone();
            async move {
                recorder.enter(&name);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                match failure {
                    Some(message) => {
                        recorder.leave(format!("fail:{name}"));
                        Err(anyhow::anyhow!(message))
                    }
                    None => {
                        recorder.leave(format!("end:{name}"));
                        Ok(())
                    }
                }
            }
        })
    }
}
