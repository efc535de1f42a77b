//! Focus value types
//!
//! Gain requests, focus-change notifications and arbitration results. Raw
//! codes match the platform's integer constants so transcripts stay
//! comparable with platform logs.

use serde::{Deserialize, Serialize};

/// Kind of focus a client asks for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FocusGain {
    /// Exclusive focus of unknown duration
    Gain,
    /// Exclusive focus for a short time
    GainTransient,
    /// Short focus; the previous holder may keep playing at reduced volume
    GainTransientMayDuck,
}

impl FocusGain {
    /// Platform integer code (1, 2, 3)
    pub fn as_raw(&self) -> i32 {
        match self {
            FocusGain::Gain => 1,
            FocusGain::GainTransient => 2,
            FocusGain::GainTransientMayDuck => 3,
        }
    }

    /// Parse a platform integer code
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(FocusGain::Gain),
            2 => Some(FocusGain::GainTransient),
            3 => Some(FocusGain::GainTransientMayDuck),
            _ => None,
        }
    }
}

impl std::fmt::Display for FocusGain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FocusGain::Gain => write!(f, "GAIN"),
            FocusGain::GainTransient => write!(f, "GAIN_TRANSIENT"),
            FocusGain::GainTransientMayDuck => write!(f, "GAIN_TRANSIENT_MAY_DUCK"),
        }
    }
}

/// Focus state change delivered to a listener
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FocusChange {
    /// Focus granted back (restoration after the holder above abandoned)
    Gain,
    /// Focus lost for an unknown duration
    Loss,
    /// Focus lost for a short time
    LossTransient,
    /// Focus lost for a short time; playback may continue ducked
    LossTransientCanDuck,
}

impl FocusChange {
    /// Loss delivered to the displaced holder when a request of `gain` takes the top
    pub fn loss_for(gain: FocusGain) -> Self {
        match gain {
            FocusGain::Gain => FocusChange::Loss,
            FocusGain::GainTransient => FocusChange::LossTransient,
            FocusGain::GainTransientMayDuck => FocusChange::LossTransientCanDuck,
        }
    }

    /// Platform integer code (1, -1, -2, -3)
    pub fn as_raw(&self) -> i32 {
        match self {
            FocusChange::Gain => 1,
            FocusChange::Loss => -1,
            FocusChange::LossTransient => -2,
            FocusChange::LossTransientCanDuck => -3,
        }
    }

    /// True for every loss variant
    pub fn is_loss(&self) -> bool {
        !matches!(self, FocusChange::Gain)
    }
}

impl std::fmt::Display for FocusChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FocusChange::Gain => write!(f, "GAIN"),
            FocusChange::Loss => write!(f, "LOSS"),
            FocusChange::LossTransient => write!(f, "LOSS_TRANSIENT"),
            FocusChange::LossTransientCanDuck => write!(f, "LOSS_TRANSIENT_CAN_DUCK"),
        }
    }
}

/// Synchronous outcome of a request or abandon call
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FocusResult {
    Granted,
    Denied,
}

impl FocusResult {
    /// Platform integer code (granted = 1, failed = 0)
    pub fn as_raw(&self) -> i32 {
        match self {
            FocusResult::Granted => 1,
            FocusResult::Denied => 0,
        }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, FocusResult::Granted)
    }
}

impl std::fmt::Display for FocusResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FocusResult::Granted => write!(f, "GRANTED"),
            FocusResult::Denied => write!(f, "DENIED"),
        }
    }
}
