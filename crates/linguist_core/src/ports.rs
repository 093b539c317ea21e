//! crates/linguist_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like the local
//! store or the generative API.

use async_trait::async_trait;

use crate::domain::{
    ActivityKind, GeneratedLesson, GrammarFeedback, InterviewEvaluation, Lesson, LessonDraft,
    PlanUpgrade, ScenarioExercise, SpeakerRole, StoreSnapshot, User, VocabularyItem,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external collaborators
/// (e.g., the filesystem, the generative API).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The domain repository: every durable read and write of learner state goes
/// through this single object. Callers never see raw storage keys.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    // --- Authentication ---

    /// Succeeds iff `access_code` matches the configured shared code. On the
    /// first success the default learner account is created. The
    /// authenticated flag is set as a side effect.
    async fn authenticate(&self, access_code: &str) -> PortResult<User>;

    async fn is_authenticated(&self) -> bool;

    /// Clears the authenticated flag only; the account and lessons stay.
    async fn logout(&self) -> PortResult<()>;

    /// The stored account, or the guest zero-state when nothing is stored.
    /// Never fails.
    async fn current_user(&self) -> User;

    async fn change_subscription(&self, upgrade: PlanUpgrade) -> PortResult<User>;

    // --- Lesson catalog ---

    /// Built-in lessons first, then custom lessons in creation order.
    async fn list_lessons(&self) -> PortResult<Vec<Lesson>>;

    /// Lookup by id or display slug.
    async fn get_lesson(&self, id: &str) -> PortResult<Lesson>;

    async fn create_lesson(&self, draft: LessonDraft) -> PortResult<Lesson>;

    // --- Progress ledger ---

    /// Adds `floor(score * 10)` XP, prepends a log entry (log capped at 50),
    /// recomputes the proficiency tier and marks `lesson_id` completed if
    /// given. The single integration point between every learning activity
    /// and the XP ledger.
    async fn record_activity(
        &self,
        kind: ActivityKind,
        title: &str,
        score: f64,
        lesson_id: Option<&str>,
    ) -> PortResult<User>;

    // --- Diagnostics ---

    /// Wipes the learner account and all custom lessons.
    async fn reset_all(&self) -> PortResult<()>;

    async fn snapshot(&self) -> PortResult<StoreSnapshot>;
}

/// Structured content generation. Any malformed or missing model output
/// degrades to an empty/default payload; callers must tolerate partially
/// populated results.
#[async_trait]
pub trait ContentGenerationService: Send + Sync {
    async fn generate_lesson(
        &self,
        topic: &str,
        level: &str,
        context: &str,
    ) -> PortResult<GeneratedLesson>;

    async fn grammar_feedback(&self, text: &str) -> PortResult<GrammarFeedback>;

    async fn generate_vocabulary(&self, topic: &str) -> PortResult<Vec<VocabularyItem>>;

    async fn generate_scenario(
        &self,
        level: &str,
        scenario: &str,
        culture: &str,
    ) -> PortResult<ScenarioExercise>;

    async fn evaluate_interview(
        &self,
        job_role: &str,
        question: &str,
        answer: &str,
    ) -> PortResult<InterviewEvaluation>;
}

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Generates an illustration for a vocabulary word, returned as a
    /// `data:image/png;base64,...` URL, or `None` when the model produced no
    /// image.
    async fn word_image(&self, word: &str) -> PortResult<Option<String>>;
}

#[async_trait]
pub trait TextToSpeechService: Send + Sync {
    /// Generates 24 kHz mono signed 16-bit PCM for the given text.
    async fn synthesize(&self, text: &str) -> PortResult<Vec<u8>>;
}

//=========================================================================================
// Live Tutoring Session
//=========================================================================================

/// One event on the inbound half of a live tutoring session.
#[derive(Debug, Clone)]
pub enum LiveTutorEvent {
    /// An incremental transcript fragment, tagged by speaker.
    Transcript { role: SpeakerRole, text: String },
    /// Base64-encoded 24 kHz mono PCM16 audio.
    Audio { data: String },
}

/// Outbound half of a live session: microphone frames flow upstream here,
/// in capture order.
#[async_trait]
pub trait LiveTutorSink: Send {
    /// Sends one base64-encoded 16 kHz mono PCM16 frame.
    async fn send_audio(&mut self, frame_b64: &str) -> PortResult<()>;

    async fn close(&mut self) -> PortResult<()>;
}

/// Inbound half of a live session.
#[async_trait]
pub trait LiveTutorSource: Send {
    /// The next upstream event, or `None` once the session has closed.
    async fn next_event(&mut self) -> PortResult<Option<LiveTutorEvent>>;
}

/// Opens bidirectional streaming sessions against the tutoring model.
#[async_trait]
pub trait LiveTutorService: Send + Sync {
    async fn open_session(&self)
        -> PortResult<(Box<dyn LiveTutorSink>, Box<dyn LiveTutorSource>)>;
}
