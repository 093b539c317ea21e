//! services/api/src/adapters/live_llm.rs
//!
//! This module contains the adapter for the realtime voice tutoring session.
//! It implements the `LiveTutorService` port from the `core` crate by holding
//! a WebSocket connection to the provider's realtime endpoint: microphone
//! frames flow up as base64 PCM16, transcript fragments and synthesized audio
//! flow back down as tagged JSON events.

const TUTOR_INSTRUCTIONS: &str = "You are Kore, a brilliant and empathetic English tutor. \
You help the user gain fluency by having natural, engaging conversations. Correct their \
grammar only when necessary and provide 1-2 advanced synonyms for basic words they use. \
Keep responses concise.";

use async_trait::async_trait;
use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use linguist_core::domain::SpeakerRole;
use linguist_core::ports::{
    LiveTutorEvent, LiveTutorService, LiveTutorSink, LiveTutorSource, PortError, PortResult,
};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

type UpstreamSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `LiveTutorService` against an OpenAI-style
/// realtime WebSocket endpoint.
#[derive(Clone)]
pub struct OpenAiLiveAdapter {
    url: String,
    model: String,
    api_key: String,
    voice: String,
}

impl OpenAiLiveAdapter {
    /// Creates a new `OpenAiLiveAdapter`.
    pub fn new(url: String, model: String, api_key: String, voice: String) -> Self {
        Self {
            url,
            model,
            api_key,
            voice,
        }
    }
}

#[async_trait]
impl LiveTutorService for OpenAiLiveAdapter {
    async fn open_session(
        &self,
    ) -> PortResult<(Box<dyn LiveTutorSink>, Box<dyn LiveTutorSource>)> {
        let url = format!("{}?model={}", self.url, self.model);
        let mut request = url
            .into_client_request()
            .map_err(|e| PortError::Unexpected(format!("invalid realtime url: {e}")))?;

        let auth_value = format!("Bearer {}", self.api_key)
            .parse()
            .map_err(|_| PortError::Unexpected("api key is not a valid header value".to_string()))?;
        request.headers_mut().insert("Authorization", auth_value);
        request.headers_mut().insert(
            "OpenAI-Beta",
            "realtime=v1"
                .parse()
                .expect("static header value is always valid"),
        );

        let (socket, _response) = connect_async(request)
            .await
            .map_err(|e| PortError::Unexpected(format!("failed to open realtime session: {e}")))?;
        info!("Realtime tutoring session connected.");

        let (mut write, read) = socket.split();

        // Configure the session before any audio flows: PCM16 both ways,
        // input transcription on, and turn-taking handled upstream.
        let configure = json!({
            "type": "session.update",
            "session": {
                "instructions": TUTOR_INSTRUCTIONS,
                "voice": self.voice,
                "input_audio_format": "pcm16",
                "output_audio_format": "pcm16",
                "input_audio_transcription": { "model": "whisper-1" },
                "turn_detection": { "type": "server_vad" },
            }
        });
        write
            .send(Message::Text(configure.to_string()))
            .await
            .map_err(|e| PortError::Unexpected(format!("failed to configure session: {e}")))?;

        Ok((
            Box::new(RealtimeSink { write }),
            Box::new(RealtimeSource { read }),
        ))
    }
}

//=========================================================================================
// Session Halves
//=========================================================================================

struct RealtimeSink {
    write: SplitSink<UpstreamSocket, Message>,
}

#[async_trait]
impl LiveTutorSink for RealtimeSink {
    async fn send_audio(&mut self, frame_b64: &str) -> PortResult<()> {
        let message = json!({
            "type": "input_audio_buffer.append",
            "audio": frame_b64,
        });
        self.write
            .send(Message::Text(message.to_string()))
            .await
            .map_err(|e| PortError::Unexpected(format!("failed to send audio frame: {e}")))
    }

    async fn close(&mut self) -> PortResult<()> {
        // A close race with the server is not an error worth surfacing.
        let _ = self.write.send(Message::Close(None)).await;
        Ok(())
    }
}

struct RealtimeSource {
    read: SplitStream<UpstreamSocket>,
}

#[async_trait]
impl LiveTutorSource for RealtimeSource {
    async fn next_event(&mut self) -> PortResult<Option<LiveTutorEvent>> {
        loop {
            match self.read.next().await {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<UpstreamEvent>(&text) {
                        Ok(event) => {
                            if let Some(mapped) = map_event(event)? {
                                return Ok(Some(mapped));
                            }
                        }
                        Err(error) => {
                            debug!(%error, "skipping unrecognized upstream message");
                        }
                    }
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue,
                Some(Err(error)) => {
                    return Err(PortError::Unexpected(format!(
                        "realtime transport failed: {error}"
                    )));
                }
            }
        }
    }
}

//=========================================================================================
// Upstream Wire Messages
//=========================================================================================

#[derive(Deserialize, Debug)]
#[serde(tag = "type")]
enum UpstreamEvent {
    /// A chunk of synthesized tutor speech (base64 PCM16 at 24 kHz).
    #[serde(rename = "response.audio.delta")]
    AudioDelta { delta: String },

    /// An incremental fragment of the tutor's spoken text.
    #[serde(rename = "response.audio_transcript.delta")]
    TutorTranscriptDelta { delta: String },

    /// The finished transcription of what the learner just said.
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    LearnerTranscript { transcript: String },

    #[serde(rename = "error")]
    Error { error: UpstreamErrorBody },

    /// Lifecycle chatter we have no use for.
    #[serde(other)]
    Ignored,
}

#[derive(Deserialize, Debug)]
struct UpstreamErrorBody {
    #[serde(default)]
    message: String,
}

fn map_event(event: UpstreamEvent) -> PortResult<Option<LiveTutorEvent>> {
    match event {
        UpstreamEvent::AudioDelta { delta } => Ok(Some(LiveTutorEvent::Audio { data: delta })),
        UpstreamEvent::TutorTranscriptDelta { delta } => Ok(Some(LiveTutorEvent::Transcript {
            role: SpeakerRole::Tutor,
            text: delta,
        })),
        UpstreamEvent::LearnerTranscript { transcript } => Ok(Some(LiveTutorEvent::Transcript {
            role: SpeakerRole::Learner,
            text: transcript,
        })),
        UpstreamEvent::Error { error } => {
            warn!(message = %error.message, "realtime session reported an error");
            Err(PortError::Unexpected(error.message))
        }
        UpstreamEvent::Ignored => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_audio_and_transcript_events() {
        let audio: UpstreamEvent =
            serde_json::from_str(r#"{"type": "response.audio.delta", "delta": "AAAA"}"#).unwrap();
        assert!(matches!(
            map_event(audio).unwrap(),
            Some(LiveTutorEvent::Audio { .. })
        ));

        let tutor: UpstreamEvent = serde_json::from_str(
            r#"{"type": "response.audio_transcript.delta", "delta": "Hello there"}"#,
        )
        .unwrap();
        match map_event(tutor).unwrap() {
            Some(LiveTutorEvent::Transcript { role, text }) => {
                assert_eq!(role, SpeakerRole::Tutor);
                assert_eq!(text, "Hello there");
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn unknown_event_types_are_ignored() {
        let event: UpstreamEvent =
            serde_json::from_str(r#"{"type": "session.created", "session": {}}"#).unwrap();
        assert!(map_event(event).unwrap().is_none());
    }

    #[test]
    fn error_events_become_port_errors() {
        let event: UpstreamEvent =
            serde_json::from_str(r#"{"type": "error", "error": {"message": "rate limited"}}"#)
                .unwrap();
        assert!(map_event(event).is_err());
    }
}
