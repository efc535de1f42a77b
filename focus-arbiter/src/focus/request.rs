//! Focus requests and their builder
//!
//! A `FocusRequest` is immutable once built. Its identity is the
//! `FocusRequestId` assigned by `build()`: the arbiter uses it to find the
//! request again on abandon and to keep the focus stack free of duplicates.
//!
//! Builder contract:
//! - a `None` listener is a `NullArgument` error at the setter call site
//! - a listener paired with a `None` execution context is a `NullArgument` error
//! - `build()` fails with `InvalidConfiguration` when `accepts_delayed_focus_gain`
//!   or `will_pause_when_ducked` is set without a listener
//! - `from_request()` copies every field; later setters override per field

use super::attributes::AudioAttributes;
use super::context::ExecutionContext;
use crate::error::{Error, Result};
use focus_common::events::{FocusChange, FocusGain};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Identity of a built focus request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FocusRequestId(Uuid);

impl FocusRequestId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// First 8 hex digits, used as the default client label
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl std::fmt::Display for FocusRequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capability invoked when the focus state of a request changes
///
/// Called on the request's execution context, never on the thread that
/// called the arbiter.
pub trait FocusListener: Send + Sync {
    fn on_focus_change(&self, change: FocusChange);
}

impl<F> FocusListener for F
where
    F: Fn(FocusChange) + Send + Sync,
{
    fn on_focus_change(&self, change: FocusChange) {
        self(change)
    }
}

/// Immutable description of what a client wants
#[derive(Clone)]
pub struct FocusRequest {
    id: FocusRequestId,
    gain: FocusGain,
    attributes: AudioAttributes,
    listener: Option<Arc<dyn FocusListener>>,
    execution_context: Option<ExecutionContext>,
    accepts_delayed_focus_gain: bool,
    will_pause_when_ducked: bool,
    client_tag: Option<String>,
}

impl FocusRequest {
    /// Shorthand for `FocusRequestBuilder::new(gain)`
    pub fn builder(gain: FocusGain) -> FocusRequestBuilder {
        FocusRequestBuilder::new(gain)
    }

    pub fn id(&self) -> FocusRequestId {
        self.id
    }

    pub fn gain(&self) -> FocusGain {
        self.gain
    }

    pub fn attributes(&self) -> AudioAttributes {
        self.attributes
    }

    pub fn listener(&self) -> Option<&Arc<dyn FocusListener>> {
        self.listener.as_ref()
    }

    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    /// Explicit execution context, None means the arbiter's default context
    pub fn execution_context(&self) -> Option<&ExecutionContext> {
        self.execution_context.as_ref()
    }

    pub fn accepts_delayed_focus_gain(&self) -> bool {
        self.accepts_delayed_focus_gain
    }

    pub fn will_pause_when_ducked(&self) -> bool {
        self.will_pause_when_ducked
    }

    /// Human-readable label (explicit tag, or the short request id)
    pub fn client_tag(&self) -> String {
        self.client_tag
            .clone()
            .unwrap_or_else(|| self.id.short())
    }
}

impl std::fmt::Debug for FocusRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusRequest")
            .field("id", &self.id)
            .field("client_tag", &self.client_tag)
            .field("gain", &self.gain)
            .field("attributes", &self.attributes)
            .field("has_listener", &self.listener.is_some())
            .field("execution_context", &self.execution_context)
            .field("accepts_delayed_focus_gain", &self.accepts_delayed_focus_gain)
            .field("will_pause_when_ducked", &self.will_pause_when_ducked)
            .finish()
    }
}

/// Builder for `FocusRequest`
#[derive(Clone)]
pub struct FocusRequestBuilder {
    gain: FocusGain,
    attributes: AudioAttributes,
    listener: Option<Arc<dyn FocusListener>>,
    execution_context: Option<ExecutionContext>,
    accepts_delayed_focus_gain: bool,
    will_pause_when_ducked: bool,
    client_tag: Option<String>,
}

impl FocusRequestBuilder {
    pub fn new(gain: FocusGain) -> Self {
        Self {
            gain,
            attributes: AudioAttributes::default(),
            listener: None,
            execution_context: None,
            accepts_delayed_focus_gain: false,
            will_pause_when_ducked: false,
            client_tag: None,
        }
    }

    /// Copy every field of an existing request
    ///
    /// The built request gets a new identity.
    pub fn from_request(request: &FocusRequest) -> Self {
        Self {
            gain: request.gain,
            attributes: request.attributes,
            listener: request.listener.clone(),
            execution_context: request.execution_context.clone(),
            accepts_delayed_focus_gain: request.accepts_delayed_focus_gain,
            will_pause_when_ducked: request.will_pause_when_ducked,
            client_tag: request.client_tag.clone(),
        }
    }

    pub fn set_focus_gain(mut self, gain: FocusGain) -> Self {
        self.gain = gain;
        self
    }

    pub fn set_audio_attributes(mut self, attributes: AudioAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn set_accepts_delayed_focus_gain(mut self, accepts: bool) -> Self {
        self.accepts_delayed_focus_gain = accepts;
        self
    }

    pub fn set_will_pause_when_ducked(mut self, pause_on_duck: bool) -> Self {
        self.will_pause_when_ducked = pause_on_duck;
        self
    }

    pub fn set_client_tag(mut self, tag: impl Into<String>) -> Self {
        self.client_tag = Some(tag.into());
        self
    }

    /// Set the listener, delivered on the default execution context
    ///
    /// Clears any execution context set earlier.
    pub fn set_on_focus_change_listener(
        mut self,
        listener: Option<Arc<dyn FocusListener>>,
    ) -> Result<Self> {
        let listener = listener.ok_or_else(|| {
            Error::NullArgument("focus change listener must not be None".to_string())
        })?;
        self.listener = Some(listener);
        self.execution_context = None;
        Ok(self)
    }

    /// Set the listener together with the context it is called on
    pub fn set_on_focus_change_listener_with_context(
        mut self,
        listener: Option<Arc<dyn FocusListener>>,
        context: Option<ExecutionContext>,
    ) -> Result<Self> {
        let listener = listener.ok_or_else(|| {
            Error::NullArgument("focus change listener must not be None".to_string())
        })?;
        let context = context.ok_or_else(|| {
            Error::NullArgument("execution context must not be None".to_string())
        })?;
        self.listener = Some(listener);
        self.execution_context = Some(context);
        Ok(self)
    }

    pub fn build(self) -> Result<FocusRequest> {
        if self.listener.is_none() {
            if self.accepts_delayed_focus_gain {
                return Err(Error::InvalidConfiguration(
                    "accepting delayed focus gain requires a focus change listener".to_string(),
                ));
            }
            if self.will_pause_when_ducked {
                return Err(Error::InvalidConfiguration(
                    "pausing when ducked requires a focus change listener".to_string(),
                ));
            }
        }

        Ok(FocusRequest {
            id: FocusRequestId::new(),
            gain: self.gain,
            attributes: self.attributes,
            listener: self.listener,
            execution_context: self.execution_context,
            accepts_delayed_focus_gain: self.accepts_delayed_focus_gain,
            will_pause_when_ducked: self.will_pause_when_ducked,
            client_tag: self.client_tag,
        })
    }
}
