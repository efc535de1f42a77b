//! Audio stream classification carried by focus requests
//!
//! Attributes are opaque to arbitration: they never influence who wins the
//! top of the stack. They exist for equality checks and for display in
//! dumps and transcripts.

use serde::{Deserialize, Serialize};

/// What the audio stream is used for
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Usage {
    Unknown,
    #[default]
    Media,
    VoiceCommunication,
    Alarm,
    Notification,
    Assistant,
    NavigationGuidance,
    Game,
}

impl std::fmt::Display for Usage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Usage::Unknown => write!(f, "USAGE_UNKNOWN"),
            Usage::Media => write!(f, "USAGE_MEDIA"),
            Usage::VoiceCommunication => write!(f, "USAGE_VOICE_COMMUNICATION"),
            Usage::Alarm => write!(f, "USAGE_ALARM"),
            Usage::Notification => write!(f, "USAGE_NOTIFICATION"),
            Usage::Assistant => write!(f, "USAGE_ASSISTANT"),
            Usage::NavigationGuidance => write!(f, "USAGE_NAVIGATION_GUIDANCE"),
            Usage::Game => write!(f, "USAGE_GAME"),
        }
    }
}

/// What kind of content the stream carries
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    #[default]
    Unknown,
    Speech,
    Music,
    Movie,
    Sonification,
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Unknown => write!(f, "CONTENT_TYPE_UNKNOWN"),
            ContentType::Speech => write!(f, "CONTENT_TYPE_SPEECH"),
            ContentType::Music => write!(f, "CONTENT_TYPE_MUSIC"),
            ContentType::Movie => write!(f, "CONTENT_TYPE_MOVIE"),
            ContentType::Sonification => write!(f, "CONTENT_TYPE_SONIFICATION"),
        }
    }
}

/// Usage + content type pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct AudioAttributes {
    pub usage: Usage,
    pub content_type: ContentType,
}

impl AudioAttributes {
    pub fn new(usage: Usage, content_type: ContentType) -> Self {
        Self {
            usage,
            content_type,
        }
    }
}

impl std::fmt::Display for AudioAttributes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.usage, self.content_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_media_unknown() {
        let attrs = AudioAttributes::default();
        assert_eq!(attrs.usage, Usage::Media);
        assert_eq!(attrs.content_type, ContentType::Unknown);
    }

    #[test]
    fn test_display() {
        let attrs = AudioAttributes::new(Usage::NavigationGuidance, ContentType::Speech);
        assert_eq!(
            attrs.to_string(),
            "USAGE_NAVIGATION_GUIDANCE CONTENT_TYPE_SPEECH"
        );
    }

    #[test]
    fn test_equality_is_field_wise() {
        let a = AudioAttributes::new(Usage::Alarm, ContentType::Sonification);
        let b = AudioAttributes::new(Usage::Alarm, ContentType::Sonification);
        let c = AudioAttributes::new(Usage::Alarm, ContentType::Music);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
