//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use linguist_core::ports::{
    ContentGenerationService, ImageGenerationService, LiveTutorService, ProfileRepository,
    TextToSpeechService,
};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn ProfileRepository>,
    pub config: Arc<Config>,
    pub content_adapter: Arc<dyn ContentGenerationService>,
    pub image_adapter: Arc<dyn ImageGenerationService>,
    pub tts_adapter: Arc<dyn TextToSpeechService>,
    pub live_adapter: Arc<dyn LiveTutorService>,
}
