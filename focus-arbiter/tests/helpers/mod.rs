//! Test helper modules for focus-arbiter integration tests
//!
//! Provides reusable test infrastructure components:
//! - RecordingListener: collects every focus change with the thread it ran on
//! - TestClient: a built request paired with its recorder
//! - fresh_arbiter: arbiter with an isolated default execution context

#![allow(dead_code)]

use focus_arbiter::config::ArbiterConfig;
use focus_arbiter::focus::{ExecutionContext, FocusArbiter, FocusListener, FocusRequest};
use focus_arbiter::{FocusChange, FocusGain};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const WAIT: Duration = Duration::from_secs(5);

/// One observed callback
#[derive(Debug, Clone, PartialEq)]
pub struct Observed {
    pub change: FocusChange,
    pub thread: Option<String>,
}

/// Listener that records every change it receives
#[derive(Default)]
pub struct RecordingListener {
    seen: Mutex<Vec<Observed>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn changes(&self) -> Vec<FocusChange> {
        self.seen.lock().unwrap().iter().map(|o| o.change).collect()
    }

    pub fn observed(&self) -> Vec<Observed> {
        self.seen.lock().unwrap().clone()
    }
}

impl FocusListener for RecordingListener {
    fn on_focus_change(&self, change: FocusChange) {
        self.seen.lock().unwrap().push(Observed {
            change,
            thread: std::thread::current().name().map(str::to_string),
        });
    }
}

/// A request and the recorder attached to it
pub struct TestClient {
    pub request: FocusRequest,
    pub recorder: Arc<RecordingListener>,
}

impl TestClient {
    /// Client delivered on the arbiter's default context
    pub fn new(tag: &str, gain: FocusGain) -> Self {
        let recorder = RecordingListener::new();
        let request = FocusRequest::builder(gain)
            .set_client_tag(tag)
            .set_on_focus_change_listener(Some(recorder.clone() as Arc<dyn FocusListener>))
            .unwrap()
            .build()
            .unwrap();
        Self { request, recorder }
    }

    /// Client delivered on its own context
    pub fn with_context(tag: &str, gain: FocusGain, context: ExecutionContext) -> Self {
        let recorder = RecordingListener::new();
        let request = FocusRequest::builder(gain)
            .set_client_tag(tag)
            .set_on_focus_change_listener_with_context(
                Some(recorder.clone() as Arc<dyn FocusListener>),
                Some(context),
            )
            .unwrap()
            .build()
            .unwrap();
        Self { request, recorder }
    }

    pub fn changes(&self) -> Vec<FocusChange> {
        self.recorder.changes()
    }
}

/// Arbiter whose default context is private to the test
pub fn fresh_arbiter(name: &str) -> FocusArbiter {
    fresh_arbiter_with(name, ArbiterConfig::default())
}

pub fn fresh_arbiter_with(name: &str, config: ArbiterConfig) -> FocusArbiter {
    FocusArbiter::with_default_context(config, ExecutionContext::spawn(name).unwrap())
}

/// Wait for every notification queued so far on the given contexts
pub fn settle(contexts: &[&ExecutionContext]) {
    for ctx in contexts {
        assert!(ctx.flush(WAIT), "context '{}' did not drain", ctx.name());
    }
}
