//! Arbitration engine
//!
//! Grants focus requests, decides which holder loses focus and how, and
//! restores the next holder when the top abandons.
//!
//! Policy: the newest request always becomes the top. Only the holder it
//! displaces is notified, with a loss kind derived from the new request's
//! gain type. Holders further down hear nothing until they are top again.
//!
//! All registry mutation, delta computation and notification queuing happen
//! inside one critical section, so concurrent requests and abandons see a
//! consistent stack and every context receives its notifications in
//! mutation order. Listeners run later on their own contexts; the lock is
//! never held while a listener executes.

use super::attributes::AudioAttributes;
use super::context::ExecutionContext;
use super::dispatcher::NotificationDispatcher;
use super::registry::{FocusHolder, FocusRegistry};
use super::request::{FocusRequest, FocusRequestId};
use crate::config::ArbiterConfig;
use focus_common::events::{EventBus, FocusChange, FocusEvent, FocusGain, FocusResult};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

static SHARED: Lazy<FocusArbiter> = Lazy::new(|| FocusArbiter::new(ArbiterConfig::default()));

/// Snapshot of one focus holder, for dumps and transcripts
#[derive(Debug, Clone, Serialize)]
pub struct FocusInfo {
    /// 0 = top of the stack
    pub position: usize,
    pub request_id: Uuid,
    pub client: String,
    pub gain: FocusGain,
    pub attributes: AudioAttributes,
    pub has_listener: bool,
    pub execution_context: String,
    pub last_delivered: Option<FocusChange>,
    pub granted_at: chrono::DateTime<chrono::Utc>,
}

struct ArbiterState {
    registry: FocusRegistry,
    shut_down: bool,
}

/// The audio focus arbiter
pub struct FocusArbiter {
    state: Mutex<ArbiterState>,
    dispatcher: NotificationDispatcher,
    event_bus: EventBus,
    config: ArbiterConfig,
}

impl FocusArbiter {
    /// New arbiter delivering default-context notifications on the
    /// process-wide default execution context
    pub fn new(config: ArbiterConfig) -> Self {
        Self::with_default_context(config, ExecutionContext::default_context())
    }

    /// New arbiter with its own default execution context
    pub fn with_default_context(config: ArbiterConfig, default_context: ExecutionContext) -> Self {
        let event_bus = EventBus::new(config.event_capacity);
        info!(
            "Focus arbiter initialized (default context '{}', event capacity {})",
            default_context.name(),
            config.event_capacity
        );
        Self {
            state: Mutex::new(ArbiterState {
                registry: FocusRegistry::new(),
                shut_down: false,
            }),
            dispatcher: NotificationDispatcher::new(default_context, event_bus.clone()),
            event_bus,
            config,
        }
    }

    /// Process-wide arbiter, constructed on first use
    pub fn shared() -> &'static FocusArbiter {
        &SHARED
    }

    pub fn config(&self) -> &ArbiterConfig {
        &self.config
    }

    pub fn default_context(&self) -> &ExecutionContext {
        self.dispatcher.default_context()
    }

    /// Observe arbitration decisions
    pub fn subscribe(&self) -> broadcast::Receiver<FocusEvent> {
        self.event_bus.subscribe()
    }

    /// Make `request` the top of the focus stack
    ///
    /// The previous top (if any, and if it is a different request) gets the
    /// loss matching `request.gain()`. A request that is already registered
    /// is moved to the top rather than duplicated. Denied only after
    /// `shutdown()`.
    pub fn request_focus(&self, request: &FocusRequest) -> FocusResult {
        let mut state = self.lock_state();
        let client = request.client_tag();

        if state.shut_down {
            debug!("Focus request from '{}' denied: arbiter shut down", client);
            return FocusResult::Denied;
        }

        let previous_top = state.registry.top().cloned();
        state.registry.push(request.clone());
        let stack_depth = state.registry.len();

        let displaced = previous_top.filter(|holder| holder.id() != request.id());

        if let Some(loser) = &displaced {
            let change = FocusChange::loss_for(request.gain());
            debug!(
                "'{}' took focus ({}), '{}' gets {}",
                client,
                request.gain(),
                loser.request().client_tag(),
                change
            );
            self.dispatcher.dispatch(loser, change);
            self.event_bus.emit_lossy(FocusEvent::FocusLost {
                request_id: loser.id().as_uuid(),
                client: loser.request().client_tag(),
                change,
                timestamp: chrono::Utc::now(),
            });
        } else {
            debug!(
                "'{}' took focus ({}), nobody displaced (depth {})",
                client,
                request.gain(),
                stack_depth
            );
        }

        self.event_bus.emit_lossy(FocusEvent::FocusGranted {
            request_id: request.id().as_uuid(),
            client,
            gain: request.gain(),
            displaced: displaced.map(|h| h.id().as_uuid()),
            stack_depth,
            timestamp: chrono::Utc::now(),
        });

        FocusResult::Granted
    }

    /// Remove `request` from the focus stack
    ///
    /// Denied (with no notification) when the request is not registered.
    /// If it was the top, the holder beneath it is restored with GAIN.
    pub fn abandon_focus(&self, request: &FocusRequest) -> FocusResult {
        let mut state = self.lock_state();
        let client = request.client_tag();

        let (_removed, was_top) = match state.registry.remove(request.id()) {
            Some(removed) => removed,
            None => {
                debug!("Abandon from '{}' denied: not holding focus", client);
                return FocusResult::Denied;
            }
        };
        let stack_depth = state.registry.len();

        debug!(
            "'{}' abandoned focus (was top: {}, depth now {})",
            client, was_top, stack_depth
        );
        self.event_bus.emit_lossy(FocusEvent::FocusAbandoned {
            request_id: request.id().as_uuid(),
            client,
            was_top,
            stack_depth,
            timestamp: chrono::Utc::now(),
        });

        if was_top {
            if let Some(restored) = state.registry.top() {
                debug!("'{}' restored to GAIN", restored.request().client_tag());
                self.dispatcher.dispatch(restored, FocusChange::Gain);
                self.event_bus.emit_lossy(FocusEvent::FocusRestored {
                    request_id: restored.id().as_uuid(),
                    client: restored.request().client_tag(),
                    timestamp: chrono::Utc::now(),
                });
            }
        }

        FocusResult::Granted
    }

    /// Drop every holder without notifying anyone
    ///
    /// Returns the number of holders removed.
    pub fn abandon_all(&self) -> usize {
        let removed = self.lock_state().registry.clear();
        if !removed.is_empty() {
            info!("Cleared {} focus holder(s)", removed.len());
        }
        removed.len()
    }

    /// Clear the stack and deny every later request
    pub fn shutdown(&self) {
        let mut state = self.lock_state();
        if state.shut_down {
            return;
        }
        state.shut_down = true;
        let removed = state.registry.clear();
        info!(
            "Focus arbiter shut down ({} holder(s) released)",
            removed.len()
        );
    }

    pub fn is_shut_down(&self) -> bool {
        self.lock_state().shut_down
    }

    pub fn top_request_id(&self) -> Option<FocusRequestId> {
        self.lock_state().registry.top().map(FocusHolder::id)
    }

    pub fn is_registered(&self, request: &FocusRequest) -> bool {
        self.lock_state().registry.contains(request.id())
    }

    pub fn stack_depth(&self) -> usize {
        self.lock_state().registry.len()
    }

    /// Last change delivered to `request`'s listener while it is registered
    pub fn last_delivered(&self, request: &FocusRequest) -> Option<FocusChange> {
        self.lock_state()
            .registry
            .get(request.id())
            .and_then(|h| h.last_delivered().get())
    }

    /// Wait until notifications already queued for `request` have run
    pub fn flush(&self, request: &FocusRequest) -> bool {
        let context = request
            .execution_context()
            .unwrap_or_else(|| self.dispatcher.default_context());
        context.flush(self.config.flush_timeout)
    }

    /// Snapshot of the stack, top first
    pub fn focus_info(&self) -> Vec<FocusInfo> {
        let state = self.lock_state();
        state
            .registry
            .iter_top_down()
            .enumerate()
            .map(|(position, holder)| {
                let request = holder.request();
                FocusInfo {
                    position,
                    request_id: holder.id().as_uuid(),
                    client: request.client_tag(),
                    gain: holder.gain(),
                    attributes: request.attributes(),
                    has_listener: request.has_listener(),
                    execution_context: self.dispatcher.context_for(holder).name().to_string(),
                    last_delivered: holder.last_delivered().get(),
                    granted_at: holder.granted_at(),
                }
            })
            .collect()
    }

    /// Human-readable state, one line per holder
    pub fn dump(&self) -> String {
        let info = self.focus_info();
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Audio focus stack (depth {}{}):",
            info.len(),
            if self.is_shut_down() { ", shut down" } else { "" }
        );
        for entry in &info {
            let _ = writeln!(
                out,
                "  #{} '{}' {} [{}] context={} last={}",
                entry.position,
                entry.client,
                entry.gain,
                entry.attributes,
                entry.execution_context,
                entry
                    .last_delivered
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "none".to_string())
            );
        }
        out
    }

    fn lock_state(&self) -> MutexGuard<'_, ArbiterState> {
        // No listener code runs under this lock, so a poisoned guard still
        // holds a consistent registry
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::focus::request::FocusListener;
    use std::sync::{mpsc, Arc};
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    fn arbiter() -> FocusArbiter {
        FocusArbiter::with_default_context(
            ArbiterConfig::default(),
            ExecutionContext::spawn("engine-test").unwrap(),
        )
    }

    fn client(tag: &str, gain: FocusGain) -> (FocusRequest, mpsc::Receiver<FocusChange>) {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let listener: Arc<dyn FocusListener> = Arc::new(move |change: FocusChange| {
            let _ = tx.lock().unwrap().send(change);
        });
        let request = FocusRequest::builder(gain)
            .set_client_tag(tag)
            .set_on_focus_change_listener(Some(listener))
            .unwrap()
            .build()
            .unwrap();
        (request, rx)
    }

    fn drained(arbiter: &FocusArbiter, rx: &mpsc::Receiver<FocusChange>) -> Vec<FocusChange> {
        assert!(arbiter.default_context().flush(WAIT));
        rx.try_iter().collect()
    }

    #[test]
    fn test_first_request_granted_silently() {
        let arbiter = arbiter();
        let (music, music_rx) = client("music", FocusGain::Gain);

        assert_eq!(arbiter.request_focus(&music), FocusResult::Granted);
        assert_eq!(arbiter.top_request_id(), Some(music.id()));
        assert!(drained(&arbiter, &music_rx).is_empty());
    }

    #[test]
    fn test_loss_kind_follows_new_gain() {
        for (gain, expected) in [
            (FocusGain::Gain, FocusChange::Loss),
            (FocusGain::GainTransient, FocusChange::LossTransient),
            (FocusGain::GainTransientMayDuck, FocusChange::LossTransientCanDuck),
        ] {
            let arbiter = arbiter();
            let (music, music_rx) = client("music", FocusGain::Gain);
            let (other, other_rx) = client("other", gain);

            arbiter.request_focus(&music);
            arbiter.request_focus(&other);

            assert_eq!(drained(&arbiter, &music_rx), vec![expected]);
            assert!(drained(&arbiter, &other_rx).is_empty());
        }
    }

    #[test]
    fn test_only_previous_top_notified() {
        let arbiter = arbiter();
        let (a, a_rx) = client("a", FocusGain::Gain);
        let (b, b_rx) = client("b", FocusGain::GainTransient);
        let (c, c_rx) = client("c", FocusGain::GainTransientMayDuck);

        arbiter.request_focus(&a);
        arbiter.request_focus(&b);
        arbiter.request_focus(&c);

        assert_eq!(drained(&arbiter, &a_rx), vec![FocusChange::LossTransient]);
        assert_eq!(
            drained(&arbiter, &b_rx),
            vec![FocusChange::LossTransientCanDuck]
        );
        assert!(drained(&arbiter, &c_rx).is_empty());
        assert_eq!(arbiter.stack_depth(), 3);
    }

    #[test]
    fn test_abandon_top_restores_next() {
        let arbiter = arbiter();
        let (a, a_rx) = client("a", FocusGain::Gain);
        let (b, b_rx) = client("b", FocusGain::Gain);

        arbiter.request_focus(&a);
        arbiter.request_focus(&b);
        assert_eq!(arbiter.abandon_focus(&b), FocusResult::Granted);

        assert_eq!(
            drained(&arbiter, &a_rx),
            vec![FocusChange::Loss, FocusChange::Gain]
        );
        assert_eq!(arbiter.last_delivered(&a), Some(FocusChange::Gain));

        assert_eq!(arbiter.abandon_focus(&a), FocusResult::Granted);
        assert_eq!(arbiter.stack_depth(), 0);
        assert!(drained(&arbiter, &a_rx).is_empty());
        assert!(drained(&arbiter, &b_rx).is_empty());
    }

    #[test]
    fn test_abandon_non_top_notifies_nobody() {
        let arbiter = arbiter();
        let (a, a_rx) = client("a", FocusGain::Gain);
        let (b, b_rx) = client("b", FocusGain::Gain);
        let (c, c_rx) = client("c", FocusGain::Gain);

        arbiter.request_focus(&a);
        arbiter.request_focus(&b);
        arbiter.request_focus(&c);
        let _ = drained(&arbiter, &a_rx);
        let _ = drained(&arbiter, &b_rx);

        assert_eq!(arbiter.abandon_focus(&b), FocusResult::Granted);

        assert!(drained(&arbiter, &a_rx).is_empty());
        assert!(drained(&arbiter, &c_rx).is_empty());
        let clients: Vec<String> = arbiter.focus_info().into_iter().map(|i| i.client).collect();
        assert_eq!(clients, vec!["c", "a"]);
    }

    #[test]
    fn test_abandon_unregistered_denied_repeatedly() {
        let arbiter = arbiter();
        let (a, a_rx) = client("a", FocusGain::Gain);

        assert_eq!(arbiter.abandon_focus(&a), FocusResult::Denied);
        arbiter.request_focus(&a);
        assert_eq!(arbiter.abandon_focus(&a), FocusResult::Granted);
        for _ in 0..3 {
            assert_eq!(arbiter.abandon_focus(&a), FocusResult::Denied);
        }
        assert!(drained(&arbiter, &a_rx).is_empty());
    }

    #[test]
    fn test_rerequest_by_top_is_silent_and_not_duplicated() {
        let arbiter = arbiter();
        let (a, a_rx) = client("a", FocusGain::Gain);

        arbiter.request_focus(&a);
        arbiter.request_focus(&a);

        assert_eq!(arbiter.stack_depth(), 1);
        assert!(drained(&arbiter, &a_rx).is_empty());
    }

    #[test]
    fn test_rerequest_from_below_moves_to_top() {
        let arbiter = arbiter();
        let (a, a_rx) = client("a", FocusGain::Gain);
        let (b, b_rx) = client("b", FocusGain::Gain);

        arbiter.request_focus(&a);
        arbiter.request_focus(&b);
        arbiter.request_focus(&a);

        assert_eq!(arbiter.stack_depth(), 2);
        assert_eq!(arbiter.top_request_id(), Some(a.id()));
        assert_eq!(drained(&arbiter, &a_rx), vec![FocusChange::Loss]);
        assert_eq!(drained(&arbiter, &b_rx), vec![FocusChange::Loss]);
    }

    #[test]
    fn test_shutdown_denies_and_clears() {
        let arbiter = arbiter();
        let (a, _a_rx) = client("a", FocusGain::Gain);
        arbiter.request_focus(&a);

        arbiter.shutdown();

        assert!(arbiter.is_shut_down());
        assert_eq!(arbiter.stack_depth(), 0);
        assert_eq!(arbiter.request_focus(&a), FocusResult::Denied);
        assert_eq!(arbiter.abandon_focus(&a), FocusResult::Denied);
        assert!(arbiter.dump().contains("shut down"));
    }

    #[test]
    fn test_abandon_all_is_silent() {
        let arbiter = arbiter();
        let (a, a_rx) = client("a", FocusGain::Gain);
        let (b, b_rx) = client("b", FocusGain::GainTransient);
        arbiter.request_focus(&a);
        arbiter.request_focus(&b);
        let _ = drained(&arbiter, &a_rx);

        assert_eq!(arbiter.abandon_all(), 2);
        assert_eq!(arbiter.stack_depth(), 0);
        assert!(drained(&arbiter, &a_rx).is_empty());
        assert!(drained(&arbiter, &b_rx).is_empty());
    }

    #[test]
    fn test_events_describe_decisions() {
        let arbiter = arbiter();
        let mut events = arbiter.subscribe();
        let (a, _a_rx) = client("a", FocusGain::Gain);
        let (b, _b_rx) = client("b", FocusGain::GainTransientMayDuck);

        arbiter.request_focus(&a);
        arbiter.request_focus(&b);
        arbiter.abandon_focus(&b);

        let types: Vec<&'static str> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|e| e.event_type())
            .collect();
        assert_eq!(
            types,
            vec![
                "FocusGranted",
                "FocusLost",
                "FocusGranted",
                "FocusAbandoned",
                "FocusRestored"
            ]
        );
    }

    #[test]
    fn test_dump_lists_holders_top_first() {
        let arbiter = arbiter();
        let (a, _a_rx) = client("music", FocusGain::Gain);
        let (b, _b_rx) = client("nav", FocusGain::GainTransientMayDuck);
        arbiter.request_focus(&a);
        arbiter.request_focus(&b);
        assert!(arbiter.flush(&a));

        let dump = arbiter.dump();
        let nav_line = dump.lines().position(|l| l.contains("'nav'")).unwrap();
        let music_line = dump.lines().position(|l| l.contains("'music'")).unwrap();
        assert!(nav_line < music_line);
        assert!(dump.contains("last=LOSS_TRANSIENT_CAN_DUCK"));
        assert!(dump.contains("depth 2"));
    }
}
