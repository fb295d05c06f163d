//! Message Types for Thread Communication
//!
//! Events flow from the audio side (stream callbacks, players) to whichever
//! control thread holds the receiving end of the channel.

use serde::{Deserialize, Serialize};

/// Events sent from the audio side to control threads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// Output stream started
    Started,

    /// Output stream stopped or paused
    Stopped,

    /// Error reported by the output stream
    Error { message: String },

    /// A sample player reached the end of its buffer
    PlaybackEnded,
}

impl Event {
    /// Create an error event from any error type
    pub fn error<E: std::fmt::Display>(err: E) -> Self {
        Event::Error {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_string(&Event::PlaybackEnded).unwrap();
        assert!(json.contains("PlaybackEnded"));

        let deserialized: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, Event::PlaybackEnded);
    }

    #[test]
    fn test_error_event() {
        let event = Event::error("device unplugged");
        if let Event::Error { message } = &event {
            assert_eq!(message, "device unplugged");
        } else {
            panic!("Should be Error variant");
        }

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("payload"));
        assert!(json.contains("device unplugged"));
    }
}
