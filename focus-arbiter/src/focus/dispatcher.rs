//! Notification dispatcher
//!
//! Queues focus-change callbacks onto each holder's execution context.
//! Dispatch is fire-and-forget: it returns once the job is queued, there
//! are no retries, and a context that no longer accepts work causes the
//! notification to be dropped and logged. Drops are reported to event bus
//! observers only, never to the caller of the arbiter.

use super::context::ExecutionContext;
use super::registry::FocusHolder;
use focus_common::events::{EventBus, FocusChange, FocusEvent};
use tracing::{debug, warn};

/// Routes focus changes to listeners
pub struct NotificationDispatcher {
    /// Used for requests without an explicit context
    default_context: ExecutionContext,
    event_bus: EventBus,
}

impl NotificationDispatcher {
    pub fn new(default_context: ExecutionContext, event_bus: EventBus) -> Self {
        Self {
            default_context,
            event_bus,
        }
    }

    pub fn default_context(&self) -> &ExecutionContext {
        &self.default_context
    }

    /// Context a holder's notifications run on
    pub fn context_for<'a>(&'a self, holder: &'a FocusHolder) -> &'a ExecutionContext {
        holder
            .request()
            .execution_context()
            .unwrap_or(&self.default_context)
    }

    /// Queue `change` for the holder's listener
    ///
    /// Returns true if the notification was queued. Holders without a
    /// listener are skipped.
    pub fn dispatch(&self, holder: &FocusHolder, change: FocusChange) -> bool {
        let tag = holder.request().client_tag();

        let listener = match holder.request().listener() {
            Some(listener) => listener.clone(),
            None => {
                debug!("No listener for '{}', skipping {}", tag, change);
                return false;
            }
        };

        let context = self.context_for(holder);
        let delivered = holder.last_delivered().clone();

        let result = context.post(move || {
            listener.on_focus_change(change);
            delivered.set(change);
        });

        match result {
            Ok(()) => {
                debug!(
                    "Queued {} for '{}' on context '{}'",
                    change,
                    tag,
                    context.name()
                );
                true
            }
            Err(e) => {
                warn!("Dropping {} for '{}': {}", change, tag, e);
                self.event_bus.emit_lossy(FocusEvent::NotificationDropped {
                    request_id: holder.id().as_uuid(),
                    client: tag,
                    change,
                    reason: e.to_string(),
                    timestamp: chrono::Utc::now(),
                });
                false
            }
        }
    }
}
