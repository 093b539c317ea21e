//! services/api/src/web/live_session.rs
//!
//! This is the entry point and control loop for a voice-lab WebSocket
//! connection. It bridges the browser to the upstream tutoring session:
//! microphone audio flows up, transcript fragments and scheduled tutor
//! speech flow down.

use crate::{
    audio::{
        self, chunk_duration_secs, FrameChunker, PlaybackScheduler, PLAYBACK_SAMPLE_RATE,
    },
    web::{
        protocol::{ClientMessage, ServerMessage, SessionStatus},
        state::AppState,
    },
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use linguist_core::ports::{LiveTutorEvent, LiveTutorSink, LiveTutorSource};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// The handler for upgrading HTTP requests to voice-lab WebSocket
/// connections.
pub async fn live_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

/// Per-connection session state. The scheduler has a single writer (the
/// event pump); a second concurrent session gets its own cursor.
struct LiveLabState {
    status: SessionStatus,
    scheduler: PlaybackScheduler,
    transcript: Vec<(String, String)>,
}

impl LiveLabState {
    /// Terminal states never regress: an errored session stays errored even
    /// if a stop arrives afterwards.
    fn advance(&mut self, next: SessionStatus) -> SessionStatus {
        if self.status != SessionStatus::Errored && self.status != SessionStatus::Ended {
            self.status = next;
        }
        self.status
    }
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New voice lab connection established.");

    let (sender, mut receiver) = socket.split();
    let ws_sender: WsSender = Arc::new(Mutex::new(sender));

    // --- 1. Initialization Phase ---
    // The first message must be `start`; it is what requests microphone
    // access on the client, so nothing useful can happen before it.
    match receiver.next().await {
        Some(Ok(Message::Text(init_json))) => {
            match serde_json::from_str::<ClientMessage>(&init_json) {
                Ok(ClientMessage::Start) => {}
                _ => {
                    error!("First message was not a valid start message.");
                    return;
                }
            }
        }
        _ => {
            error!("Client disconnected before starting the session.");
            return;
        }
    }

    send_message(&ws_sender, &ServerMessage::Status { status: SessionStatus::Connecting }).await;

    let (mut sink, source) = match app_state.live_adapter.open_session().await {
        Ok(halves) => halves,
        Err(e) => {
            error!("Failed to open tutoring session: {:?}", e);
            send_message(
                &ws_sender,
                &ServerMessage::Error { message: "Failed to reach the tutor.".to_string() },
            )
            .await;
            send_message(&ws_sender, &ServerMessage::Status { status: SessionStatus::Errored })
                .await;
            return;
        }
    };

    let session_state = Arc::new(Mutex::new(LiveLabState {
        status: SessionStatus::Live,
        scheduler: PlaybackScheduler::new(),
        transcript: Vec::new(),
    }));
    let session_clock = Instant::now();
    let cancellation_token = CancellationToken::new();

    send_message(&ws_sender, &ServerMessage::Status { status: SessionStatus::Live }).await;

    // --- 2. Event Pump (upstream -> client) ---
    // Runs independently of the capture loop below; the two only share the
    // session state and the sender. Ordering holds within each stream, not
    // across them.
    let pump_handle = {
        let session_state = session_state.clone();
        let ws_sender = ws_sender.clone();
        let token = cancellation_token.clone();
        tokio::spawn(async move {
            pump_events(source, session_state, ws_sender, session_clock, token).await;
        })
    };

    // --- 3. Capture Loop (client -> upstream) ---
    // One logical stream: frames leave in capture order.
    let mut chunker = FrameChunker::new();
    loop {
        match receiver.next().await {
            Some(Ok(Message::Binary(data))) => {
                let samples = audio::f32_to_i16(&audio::le_bytes_to_f32(&data));
                let mut failed = false;
                for frame in chunker.push(&samples) {
                    if let Err(e) = sink.send_audio(&audio::encode_frame(&frame)).await {
                        error!("Failed to forward audio frame: {:?}", e);
                        failed = true;
                        break;
                    }
                }
                if failed {
                    let status = session_state.lock().await.advance(SessionStatus::Errored);
                    send_message(&ws_sender, &ServerMessage::Status { status }).await;
                    break;
                }
            }
            Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Stop) => {
                    info!("Stop message received. Closing tutoring session.");
                    cancellation_token.cancel();
                    let _ = sink.close().await;
                    let status = session_state.lock().await.advance(SessionStatus::Ended);
                    // Chunks already handed to the client keep their playback
                    // slots; stopping does not cut them off mid-word.
                    send_message(&ws_sender, &ServerMessage::Status { status }).await;
                    break;
                }
                Ok(ClientMessage::Start) => {
                    warn!("Received subsequent start message, which is ignored.");
                }
                Err(e) => {
                    warn!("Failed to deserialize client message: {}", e);
                }
            },
            Some(Ok(Message::Close(_))) | None => {
                info!("Client disconnected.");
                cancellation_token.cancel();
                let _ = sink.close().await;
                session_state.lock().await.advance(SessionStatus::Ended);
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("Client socket error: {}", e);
                cancellation_token.cancel();
                let _ = sink.close().await;
                break;
            }
        }
    }

    // --- 4. Cleanup ---
    pump_handle.abort();
    let session = session_state.lock().await;
    info!(
        transcript_fragments = session.transcript.len(),
        "Voice lab connection closed."
    );
}

/// Forwards upstream events to the client until the upstream half closes or
/// fails. Audio chunks get their playback slot here, from the one cursor
/// this session owns.
async fn pump_events(
    mut source: Box<dyn LiveTutorSource>,
    session_state: Arc<Mutex<LiveLabState>>,
    ws_sender: WsSender,
    session_clock: Instant,
    cancellation_token: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancellation_token.cancelled() => {
                info!("Event pump cancelled.");
                return;
            }
            event = source.next_event() => event,
        };

        match event {
            Ok(Some(LiveTutorEvent::Transcript { role, text })) => {
                let message = ServerMessage::Transcript {
                    role: role.as_str().to_string(),
                    text: text.clone(),
                };
                session_state
                    .lock()
                    .await
                    .transcript
                    .push((role.as_str().to_string(), text));
                send_message(&ws_sender, &message).await;
            }
            Ok(Some(LiveTutorEvent::Audio { data })) => {
                let samples = match audio::decode_chunk(&data) {
                    Ok(samples) => samples,
                    Err(e) => {
                        warn!("Dropping undecodable audio chunk: {}", e);
                        continue;
                    }
                };
                let duration = chunk_duration_secs(samples.len(), PLAYBACK_SAMPLE_RATE);
                let now = session_clock.elapsed().as_secs_f64();
                // Chunks are scheduled in arrival order, which matches
                // generation order on the single upstream stream.
                let start = session_state.lock().await.scheduler.schedule(now, duration);
                send_message(&ws_sender, &ServerMessage::Audio { data, start, duration }).await;
            }
            Ok(None) => {
                info!("Tutoring session closed upstream.");
                let status = session_state.lock().await.advance(SessionStatus::Ended);
                send_message(&ws_sender, &ServerMessage::Status { status }).await;
                break;
            }
            Err(e) => {
                error!("Tutoring session failed: {:?}", e);
                {
                    let mut session = session_state.lock().await;
                    session.advance(SessionStatus::Errored);
                }
                send_message(
                    &ws_sender,
                    &ServerMessage::Error { message: "The tutoring session failed.".to_string() },
                )
                .await;
                send_message(
                    &ws_sender,
                    &ServerMessage::Status { status: SessionStatus::Errored },
                )
                .await;
                break;
            }
        }
    }
}

/// Serializes and sends one server message; delivery failures are logged,
/// not propagated, since the connection teardown path handles the rest.
async fn send_message(ws_sender: &WsSender, message: &ServerMessage) {
    let json = serde_json::to_string(message).expect("protocol messages always serialize");
    if ws_sender
        .lock()
        .await
        .send(Message::Text(json.into()))
        .await
        .is_err()
    {
        warn!("Failed to deliver a message to the client.");
    }
}
