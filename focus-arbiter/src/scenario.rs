//! Scripted focus scenarios
//!
//! A scenario declares a set of clients and an ordered list of
//! request/abandon steps. Running it drives a fresh arbiter, waits for every
//! execution context to drain, and produces a transcript of results and
//! delivered notifications.
//!
//! ```toml
//! [[client]]
//! name = "music"
//! gain = "gain"
//! content_type = "music"
//!
//! [[client]]
//! name = "nav"
//! gain = "gain_transient_may_duck"
//! usage = "navigation_guidance"
//! own_context = true
//!
//! [[step]]
//! action = "request"
//! client = "music"
//! ```

use crate::config::ArbiterConfig;
use crate::error::{Error, Result};
use crate::focus::{
    AudioAttributes, ContentType, ExecutionContext, FocusArbiter, FocusInfo, FocusListener,
    FocusRequest, Usage,
};
use focus_common::events::{FocusChange, FocusGain, FocusResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// A parsed scenario file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Scenario {
    #[serde(default, rename = "client")]
    pub clients: Vec<ClientSpec>,

    #[serde(default, rename = "step")]
    pub steps: Vec<StepSpec>,
}

/// One focus client
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSpec {
    pub name: String,

    #[serde(default = "default_gain")]
    pub gain: FocusGain,

    #[serde(default)]
    pub usage: Usage,

    #[serde(default)]
    pub content_type: ContentType,

    /// Deliver on a dedicated execution context instead of the default one
    #[serde(default)]
    pub own_context: bool,

    /// Register a listener (clients without one are never notified)
    #[serde(default = "default_true")]
    pub listener: bool,

    #[serde(default)]
    pub accepts_delayed_focus_gain: bool,

    #[serde(default)]
    pub will_pause_when_ducked: bool,
}

/// Step action
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Request,
    Abandon,
}

impl std::fmt::Display for StepAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepAction::Request => write!(f, "request"),
            StepAction::Abandon => write!(f, "abandon"),
        }
    }
}

/// One scripted call
#[derive(Debug, Clone, Deserialize)]
pub struct StepSpec {
    pub action: StepAction,
    pub client: String,
}

fn default_gain() -> FocusGain {
    FocusGain::Gain
}

fn default_true() -> bool {
    true
}

/// Result of one step
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub action: StepAction,
    pub client: String,
    pub result: FocusResult,
    /// Client names top first, after the step
    pub stack: Vec<String>,
}

/// A notification observed by a client's listener
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Delivery {
    /// Order in which listeners ran across all contexts
    pub sequence: u64,
    pub client: String,
    pub change: FocusChange,
    pub context: String,
}

/// Everything a scenario run produced
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    pub steps: Vec<StepOutcome>,
    pub deliveries: Vec<Delivery>,
    pub final_stack: Vec<FocusInfo>,
    /// False if some context did not drain within the flush timeout
    pub drained: bool,
}

impl Transcript {
    /// Notifications one client received, in delivery order
    pub fn deliveries_for(&self, client: &str) -> Vec<FocusChange> {
        self.deliveries
            .iter()
            .filter(|d| d.client == client)
            .map(|d| d.change)
            .collect()
    }

    /// Steps whose call returned GRANTED
    pub fn granted_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.result.is_granted()).count()
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Steps ({} of {} granted):",
            self.granted_steps(),
            self.steps.len()
        );
        for step in &self.steps {
            let _ = writeln!(
                out,
                "  {:>3}. {} {} -> {}  stack: [{}]",
                step.index + 1,
                step.action,
                step.client,
                step.result,
                step.stack.join(", ")
            );
        }
        let _ = writeln!(out, "Notifications:");
        if self.deliveries.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for delivery in &self.deliveries {
            let _ = writeln!(
                out,
                "  {:>3}. {} <- {} (on {})",
                delivery.sequence, delivery.client, delivery.change, delivery.context
            );
        }
        let _ = writeln!(out, "Final stack:");
        if self.final_stack.is_empty() {
            let _ = writeln!(out, "  (empty)");
        }
        for info in &self.final_stack {
            let _ = writeln!(out, "  #{} {} {}", info.position, info.client, info.gain);
        }
        if !self.drained {
            let _ = writeln!(out, "WARNING: some notifications were still pending");
        }
        out
    }
}

impl Scenario {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(content)
            .map_err(|e| Error::Scenario(format!("Failed to parse scenario: {}", e)))?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let scenario = Self::from_toml_str(&content)?;
        info!(
            "Loaded scenario {} ({} clients, {} steps)",
            path.display(),
            scenario.clients.len(),
            scenario.steps.len()
        );
        Ok(scenario)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for client in &self.clients {
            if client.name.is_empty() || client.name.contains('\0') {
                return Err(Error::Scenario(format!(
                    "Invalid client name: {:?}",
                    client.name
                )));
            }
            if !seen.insert(client.name.as_str()) {
                return Err(Error::Scenario(format!(
                    "Duplicate client name: {}",
                    client.name
                )));
            }
        }
        for (index, step) in self.steps.iter().enumerate() {
            if !seen.contains(step.client.as_str()) {
                return Err(Error::Scenario(format!(
                    "Step {} references unknown client: {}",
                    index + 1,
                    step.client
                )));
            }
        }
        Ok(())
    }

    /// Run against a fresh arbiter
    pub fn run(&self, config: &ArbiterConfig) -> Result<Transcript> {
        self.validate()?;

        let default_context = ExecutionContext::spawn("scenario-default")?;
        let arbiter = FocusArbiter::with_default_context(config.clone(), default_context.clone());

        let log: Arc<Mutex<Vec<Delivery>>> = Arc::new(Mutex::new(Vec::new()));
        let sequence = Arc::new(AtomicU64::new(1));

        let mut contexts = vec![default_context];
        let mut requests: HashMap<String, FocusRequest> = HashMap::new();
        for spec in &self.clients {
            let own_context = if spec.own_context {
                let ctx = ExecutionContext::spawn(format!("client-{}", spec.name))?;
                contexts.push(ctx.clone());
                Some(ctx)
            } else {
                None
            };
            let request = build_request(spec, own_context, &log, &sequence)?;
            requests.insert(spec.name.clone(), request);
        }

        let mut steps = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            let request = requests.get(&step.client).ok_or_else(|| {
                Error::Scenario(format!("Unknown client: {}", step.client))
            })?;
            let result = match step.action {
                StepAction::Request => arbiter.request_focus(request),
                StepAction::Abandon => arbiter.abandon_focus(request),
            };
            debug!("Step {}: {} {} -> {}", index + 1, step.action, step.client, result);
            steps.push(StepOutcome {
                index,
                action: step.action,
                client: step.client.clone(),
                result,
                stack: arbiter.focus_info().into_iter().map(|i| i.client).collect(),
            });
        }

        let mut drained = true;
        for ctx in &contexts {
            if !ctx.flush(arbiter.config().flush_timeout) {
                warn!(
                    "Context '{}' did not drain within {:?}",
                    ctx.name(),
                    arbiter.config().flush_timeout
                );
                drained = false;
            }
        }

        let final_stack = arbiter.focus_info();
        for ctx in &contexts {
            ctx.shutdown();
        }

        let mut deliveries = log.lock().unwrap_or_else(PoisonError::into_inner).clone();
        deliveries.sort_by_key(|d| d.sequence);

        Ok(Transcript {
            steps,
            deliveries,
            final_stack,
            drained,
        })
    }
}

fn build_request(
    spec: &ClientSpec,
    context: Option<ExecutionContext>,
    log: &Arc<Mutex<Vec<Delivery>>>,
    sequence: &Arc<AtomicU64>,
) -> Result<FocusRequest> {
    let mut builder = FocusRequest::builder(spec.gain)
        .set_client_tag(spec.name.clone())
        .set_audio_attributes(AudioAttributes::new(spec.usage, spec.content_type))
        .set_accepts_delayed_focus_gain(spec.accepts_delayed_focus_gain)
        .set_will_pause_when_ducked(spec.will_pause_when_ducked);

    if spec.listener {
        let log = Arc::clone(log);
        let sequence = Arc::clone(sequence);
        let client = spec.name.clone();
        let listener: Arc<dyn FocusListener> = Arc::new(move |change: FocusChange| {
            let context = std::thread::current()
                .name()
                .unwrap_or("unnamed")
                .to_string();
            let mut log = log.lock().unwrap_or_else(PoisonError::into_inner);
            log.push(Delivery {
                sequence: sequence.fetch_add(1, Ordering::SeqCst),
                client: client.clone(),
                change,
                context,
            });
        });

        builder = match context {
            Some(ctx) => {
                builder.set_on_focus_change_listener_with_context(Some(listener), Some(ctx))?
            }
            None => builder.set_on_focus_change_listener(Some(listener))?,
        };
    }

    builder.build()
}
