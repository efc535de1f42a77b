//! Execution contexts for listener callbacks
//!
//! An execution context is a named worker thread draining a FIFO queue of
//! jobs, the equivalent of a handler bound to its own looper thread. Jobs
//! posted to one context run strictly in posting order; separate contexts
//! run independently of each other.
//!
//! The queue is a `tokio::sync::mpsc` unbounded channel so posting never
//! blocks and never needs a runtime. The worker drains it with
//! `blocking_recv` on a plain OS thread.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Name of the process-wide default context
pub const DEFAULT_CONTEXT_NAME: &str = "focus-default";

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

static DEFAULT_CONTEXT: Lazy<ExecutionContext> = Lazy::new(|| {
    ExecutionContext::start(DEFAULT_CONTEXT_NAME.to_string(), true).unwrap_or_else(|e| {
        error!("Failed to start default execution context: {}", e);
        ExecutionContext::terminated(DEFAULT_CONTEXT_NAME)
    })
});

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Message {
    Run(Job),
    Flush(std::sync::mpsc::SyncSender<()>),
}

struct ContextInner {
    id: u64,
    name: String,
    thread_id: Option<ThreadId>,
    /// The process-wide default context ignores shutdown
    persistent: bool,
    /// None once the context has been shut down
    sender: Mutex<Option<mpsc::UnboundedSender<Message>>>,
}

/// Handle to a serialized delivery queue
///
/// Cheap to clone; all clones refer to the same worker. The worker exits
/// once the context is shut down (or every handle is dropped) and the
/// already-queued jobs have run.
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

impl ExecutionContext {
    /// Start a new context with its own worker thread
    ///
    /// The name becomes the worker thread's name, so it must be non-empty
    /// and free of NUL bytes.
    pub fn spawn(name: impl Into<String>) -> Result<Self> {
        Self::start(name.into(), false)
    }

    fn start(name: String, persistent: bool) -> Result<Self> {
        if name.is_empty() || name.contains('\0') {
            return Err(Error::InvalidName(format!(
                "execution context name {:?}",
                name
            )));
        }

        let (tx, rx) = mpsc::unbounded_channel::<Message>();

        let worker_name = name.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_worker(worker_name, rx))?;

        info!("Execution context '{}' started", name);

        Ok(Self {
            inner: Arc::new(ContextInner {
                id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
                name,
                thread_id: Some(handle.thread().id()),
                persistent,
                sender: Mutex::new(Some(tx)),
            }),
        })
    }

    /// The process-wide default context, started on first use
    ///
    /// Shared by every focus request that did not name its own context.
    /// It lives for the whole process: `shutdown()` on it is ignored.
    pub fn default_context() -> ExecutionContext {
        DEFAULT_CONTEXT.clone()
    }

    /// A context that rejects all work
    fn terminated(name: &str) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
                name: name.to_string(),
                thread_id: None,
                persistent: false,
                sender: Mutex::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Unique id of this context within the process
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// True when called from this context's worker thread
    pub fn is_current(&self) -> bool {
        self.inner.thread_id == Some(thread::current().id())
    }

    /// Queue a job; it runs after every job queued before it
    ///
    /// Fails with `Error::ContextTerminated` after `shutdown()`.
    pub fn post<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.send(Message::Run(Box::new(job)))
    }

    /// Block until every job queued before this call has run
    ///
    /// Returns false on timeout or if the context no longer accepts work.
    /// Called from the context's own thread it returns false at once.
    pub fn flush(&self, timeout: Duration) -> bool {
        if self.is_current() {
            warn!(
                "flush() called on context '{}' from its own thread",
                self.inner.name
            );
            return false;
        }

        let (done_tx, done_rx) = std::sync::mpsc::sync_channel(1);
        if self.send(Message::Flush(done_tx)).is_err() {
            return false;
        }
        done_rx.recv_timeout(timeout).is_ok()
    }

    /// Stop accepting work
    ///
    /// Jobs already queued still run; the worker exits afterwards.
    /// Ignored (with a warning) on the process-wide default context.
    pub fn shutdown(&self) {
        if self.inner.persistent {
            warn!(
                "Ignoring shutdown of process-wide context '{}'",
                self.inner.name
            );
            return;
        }
        let previous = self
            .inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            info!("Execution context '{}' shut down", self.inner.name);
        }
    }

    pub fn is_terminated(&self) -> bool {
        match self
            .inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(tx) => tx.is_closed(),
            None => true,
        }
    }

    fn send(&self, message: Message) -> Result<()> {
        let guard = self
            .inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(tx) => tx
                .send(message)
                .map_err(|_| Error::ContextTerminated(self.inner.name.clone())),
            None => Err(Error::ContextTerminated(self.inner.name.clone())),
        }
    }
}

impl PartialEq for ExecutionContext {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for ExecutionContext {}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}

fn run_worker(name: String, mut rx: mpsc::UnboundedReceiver<Message>) {
    debug!("Execution context '{}' worker running", name);

    while let Some(message) = rx.blocking_recv() {
        match message {
            Message::Run(job) => {
                // A panicking listener must not take the context down
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                    error!(
                        "Job on execution context '{}' panicked: {}",
                        name,
                        panic_message(payload.as_ref())
                    );
                }
            }
            Message::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    debug!("Execution context '{}' worker exited", name);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
