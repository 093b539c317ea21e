//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the
//! API server for the voice lab.

use serde::{Deserialize, Serialize};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================
// NOTE: Captured microphone audio is sent as raw Binary frames of 32-bit
// little-endian float samples at 16 kHz, not as part of this enum.
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Opens the tutoring session. Must be the first message on the
    /// connection; audio frames sent before it are dropped.
    Start,

    /// Ends the session. The upstream connection is closed; audio the client
    /// has already been told to schedule may finish playing.
    Stop,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Lifecycle of one voice-lab connection.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Connecting,
    Live,
    Ended,
    Errored,
}

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Reports a lifecycle transition. The UI mirrors this directly.
    Status { status: SessionStatus },

    /// An incremental transcript fragment, tagged by speaker
    /// (`"tutor"` / `"learner"`).
    Transcript { role: String, text: String },

    /// One chunk of tutor speech: base64 PCM16 at 24 kHz, with the playback
    /// slot it was assigned. `start` is in seconds on the session clock;
    /// chunks scheduled back-to-back leave no gap and never overlap.
    Audio { data: String, start: f64, duration: f64 },

    /// Reports a session-fatal problem to the client.
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_messages_parse_by_tag() {
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type": "start"}"#).unwrap(),
            ClientMessage::Start
        ));
        assert!(matches!(
            serde_json::from_str::<ClientMessage>(r#"{"type": "stop"}"#).unwrap(),
            ClientMessage::Stop
        ));
    }

    #[test]
    fn server_messages_serialize_with_snake_case_tags() {
        let status = serde_json::to_string(&ServerMessage::Status {
            status: SessionStatus::Live,
        })
        .unwrap();
        assert_eq!(status, r#"{"type":"status","status":"live"}"#);

        let audio = serde_json::to_string(&ServerMessage::Audio {
            data: "AAAA".to_string(),
            start: 1.5,
            duration: 0.25,
        })
        .unwrap();
        assert!(audio.contains(r#""type":"audio""#));
        assert!(audio.contains(r#""start":1.5"#));
    }
}
