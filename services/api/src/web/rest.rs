//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use linguist_core::domain::{
    ActivityEntry, ActivityKind, GeneratedLesson, GrammarFeedback, InterviewEvaluation, Lesson,
    LessonDraft, PlanUpgrade, ScenarioExercise, User, VocabularyItem,
};
use linguist_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        login_handler,
        logout_handler,
        me_handler,
        subscription_handler,
        list_lessons_handler,
        get_lesson_handler,
        create_lesson_handler,
        record_activity_handler,
        generate_lesson_handler,
        grammar_handler,
        vocabulary_handler,
        scenario_handler,
        interview_handler,
        image_handler,
        speech_handler,
        snapshot_handler,
        reset_handler,
    ),
    components(schemas(
        LoginRequest,
        SubscriptionRequest,
        CreateLessonRequest,
        ActivityRequest,
        LessonGenerationRequest,
        GrammarRequest,
        VocabularyRequest,
        ScenarioRequest,
        InterviewRequest,
        ImageRequest,
        SpeechRequest,
        UserResponse,
        ActivityResponse,
        LessonResponse,
        LessonContentResponse,
        QuizQuestionResponse,
        GrammarFeedbackResponse,
        VocabularyItemResponse,
        ScenarioResponse,
        InterviewResponse,
        ImageResponse,
        SnapshotResponse,
    )),
    tags(
        (name = "Linguist API", description = "API endpoints for the language-learning service.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Request and Response Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub access_code: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SubscriptionRequest {
    /// `pro` or `immersion`.
    pub plan: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateLessonRequest {
    pub title: String,
    pub level: String,
    pub category: String,
    pub icon: String,
    pub description: Option<String>,
    pub video_url: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ActivityRequest {
    /// `quiz`, `voice`, `culture` or `vocab`.
    pub kind: String,
    pub title: String,
    pub score: f64,
    pub lesson_id: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LessonGenerationRequest {
    pub topic: String,
    pub level: String,
    pub context: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct GrammarRequest {
    pub text: String,
}

#[derive(Deserialize, ToSchema)]
pub struct VocabularyRequest {
    pub topic: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ScenarioRequest {
    pub level: String,
    pub scenario: String,
    pub culture: String,
}

#[derive(Deserialize, ToSchema)]
pub struct InterviewRequest {
    pub job_role: String,
    pub question: String,
    pub answer: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ImageRequest {
    pub word: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SpeechRequest {
    pub text: String,
}

#[derive(Serialize, ToSchema)]
pub struct ActivityResponse {
    pub id: Uuid,
    pub kind: String,
    pub title: String,
    pub xp_earned: u64,
    pub timestamp: DateTime<Utc>,
}

impl ActivityResponse {
    fn from_domain(entry: ActivityEntry) -> Self {
        Self {
            id: entry.id,
            kind: entry.kind.as_str().to_string(),
            title: entry.title,
            xp_earned: entry.xp_earned,
            timestamp: entry.timestamp,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub xp: u64,
    pub level: String,
    pub completed: Vec<String>,
    pub logs: Vec<ActivityResponse>,
    pub subscription: String,
}

impl UserResponse {
    fn from_domain(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            xp: user.xp,
            level: user.level.as_str().to_string(),
            completed: user.completed,
            logs: user
                .logs
                .into_iter()
                .map(ActivityResponse::from_domain)
                .collect(),
            subscription: user.subscription.as_str().to_string(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct LessonResponse {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub level: String,
    pub category: String,
    pub icon: String,
    pub description: Option<String>,
    pub video_url: Option<String>,
    pub custom: bool,
}

impl LessonResponse {
    fn from_domain(lesson: Lesson) -> Self {
        Self {
            id: lesson.id,
            slug: lesson.slug,
            title: lesson.title,
            level: lesson.level,
            category: lesson.category,
            icon: lesson.icon,
            description: lesson.description,
            video_url: lesson.video_url,
            custom: lesson.custom,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct QuizQuestionResponse {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
}

#[derive(Serialize, ToSchema)]
pub struct LessonContentResponse {
    pub theory: String,
    pub quiz: Vec<QuizQuestionResponse>,
}

impl LessonContentResponse {
    fn from_domain(lesson: GeneratedLesson) -> Self {
        Self {
            theory: lesson.theory,
            quiz: lesson
                .quiz
                .into_iter()
                .map(|q| QuizQuestionResponse {
                    question: q.question,
                    options: q.options,
                    correct_answer: q.correct_answer,
                    explanation: q.explanation,
                })
                .collect(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct GrammarFeedbackResponse {
    pub corrected_text: String,
    pub explanations: Vec<String>,
    pub usage_examples: Vec<String>,
    pub suggestions: Vec<String>,
}

impl GrammarFeedbackResponse {
    fn from_domain(feedback: GrammarFeedback) -> Self {
        Self {
            corrected_text: feedback.corrected_text,
            explanations: feedback.explanations,
            usage_examples: feedback.usage_examples,
            suggestions: feedback.suggestions,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct VocabularyItemResponse {
    pub word: String,
    pub definition: String,
    pub example: String,
}

impl VocabularyItemResponse {
    fn from_domain(item: VocabularyItem) -> Self {
        Self {
            word: item.word,
            definition: item.definition,
            example: item.example,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ScenarioResponse {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: String,
    pub cultural_insight: String,
}

impl ScenarioResponse {
    fn from_domain(exercise: ScenarioExercise) -> Self {
        Self {
            question: exercise.question,
            options: exercise.options,
            correct_answer: exercise.correct_answer,
            explanation: exercise.explanation,
            cultural_insight: exercise.cultural_insight,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct InterviewResponse {
    pub score: f64,
    pub feedback: String,
    pub better_version: String,
    pub next_question: String,
}

impl InterviewResponse {
    fn from_domain(evaluation: InterviewEvaluation) -> Self {
        Self {
            score: evaluation.score,
            feedback: evaluation.feedback,
            better_version: evaluation.better_version,
            next_question: evaluation.next_question,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SnapshotResponse {
    pub user: UserResponse,
    pub custom_lessons: Vec<LessonResponse>,
    pub authenticated: bool,
    pub storage_usage: String,
}

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Maps repository failures onto HTTP statuses.
fn repo_error(e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid access code".to_string()),
        PortError::Unexpected(message) => {
            error!("Repository operation failed: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong".to_string(),
            )
        }
    }
}

/// Maps generative transport failures onto a transient 502. Malformed model
/// output never reaches here; the adapters already degraded it to an empty
/// payload.
fn generation_error(e: PortError) -> (StatusCode, String) {
    error!("Generation request failed: {:?}", e);
    (
        StatusCode::BAD_GATEWAY,
        "The language model is unavailable right now".to_string(),
    )
}

//=========================================================================================
// Auth and Account Handlers
//=========================================================================================

/// Unlock the application with the shared access code.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = UserResponse),
        (status = 401, description = "Invalid access code")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user = state
        .repo
        .authenticate(&req.access_code)
        .await
        .map_err(repo_error)?;
    Ok(Json(UserResponse::from_domain(user)))
}

/// Clear the authenticated flag. Learner state is retained.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 200, description = "Logged out"))
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.repo.logout().await.map_err(repo_error)?;
    Ok(StatusCode::OK)
}

/// The current learner account; a guest zero-state when nothing is stored.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Current account", body = UserResponse))
)]
pub async fn me_handler(State(state): State<Arc<AppState>>) -> Json<UserResponse> {
    Json(UserResponse::from_domain(state.repo.current_user().await))
}

/// Move the account onto a paid plan.
#[utoipa::path(
    put,
    path = "/me/subscription",
    request_body = SubscriptionRequest,
    responses(
        (status = 200, description = "Subscription updated", body = UserResponse),
        (status = 400, description = "Not a paid plan")
    )
)]
pub async fn subscription_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SubscriptionRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let upgrade = PlanUpgrade::parse(&req.plan).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("'{}' is not a paid plan", req.plan),
        )
    })?;
    let user = state
        .repo
        .change_subscription(upgrade)
        .await
        .map_err(repo_error)?;
    Ok(Json(UserResponse::from_domain(user)))
}

//=========================================================================================
// Lesson Catalog Handlers
//=========================================================================================

/// The full catalog: built-in courses first, then custom lessons.
#[utoipa::path(
    get,
    path = "/lessons",
    responses((status = 200, description = "Lesson catalog", body = [LessonResponse]))
)]
pub async fn list_lessons_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let lessons = state.repo.list_lessons().await.map_err(repo_error)?;
    Ok(Json(
        lessons
            .into_iter()
            .map(LessonResponse::from_domain)
            .collect::<Vec<_>>(),
    ))
}

/// Look up one lesson by id or display slug.
#[utoipa::path(
    get,
    path = "/lessons/{id}",
    params(("id" = String, Path, description = "Lesson id or slug")),
    responses(
        (status = 200, description = "The lesson", body = LessonResponse),
        (status = 404, description = "No such lesson")
    )
)]
pub async fn get_lesson_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let lesson = state.repo.get_lesson(&id).await.map_err(repo_error)?;
    Ok(Json(LessonResponse::from_domain(lesson)))
}

/// Create a custom lesson.
#[utoipa::path(
    post,
    path = "/lessons",
    request_body = CreateLessonRequest,
    responses(
        (status = 201, description = "Lesson created", body = LessonResponse),
        (status = 400, description = "Empty title")
    )
)]
pub async fn create_lesson_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateLessonRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.title.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Lesson title must not be empty".to_string(),
        ));
    }

    let lesson = state
        .repo
        .create_lesson(LessonDraft {
            title: req.title,
            level: req.level,
            category: req.category,
            icon: req.icon,
            description: req.description,
            video_url: req.video_url,
        })
        .await
        .map_err(repo_error)?;
    Ok((StatusCode::CREATED, Json(LessonResponse::from_domain(lesson))))
}

//=========================================================================================
// Progress Handler
//=========================================================================================

/// Record a finished activity: XP, activity log and completion set all move
/// through this one endpoint.
#[utoipa::path(
    post,
    path = "/progress/activities",
    request_body = ActivityRequest,
    responses(
        (status = 200, description = "Updated account", body = UserResponse),
        (status = 400, description = "Unknown activity kind")
    )
)]
pub async fn record_activity_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ActivityRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let kind = ActivityKind::parse(&req.kind).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("'{}' is not an activity kind", req.kind),
        )
    })?;

    let user = state
        .repo
        .record_activity(kind, &req.title, req.score, req.lesson_id.as_deref())
        .await
        .map_err(repo_error)?;
    Ok(Json(UserResponse::from_domain(user)))
}

//=========================================================================================
// Generation Handlers
//=========================================================================================

/// Generate a full lesson body (theory plus quiz) for a topic.
#[utoipa::path(
    post,
    path = "/generate/lesson",
    request_body = LessonGenerationRequest,
    responses(
        (status = 200, description = "Generated lesson", body = LessonContentResponse),
        (status = 502, description = "Model unavailable")
    )
)]
pub async fn generate_lesson_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LessonGenerationRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let lesson = state
        .content_adapter
        .generate_lesson(&req.topic, &req.level, req.context.as_deref().unwrap_or(""))
        .await
        .map_err(generation_error)?;
    Ok(Json(LessonContentResponse::from_domain(lesson)))
}

/// Correct a writing sample and explain the fixes.
#[utoipa::path(
    post,
    path = "/generate/grammar",
    request_body = GrammarRequest,
    responses(
        (status = 200, description = "Correction feedback", body = GrammarFeedbackResponse),
        (status = 502, description = "Model unavailable")
    )
)]
pub async fn grammar_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GrammarRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let feedback = state
        .content_adapter
        .grammar_feedback(&req.text)
        .await
        .map_err(generation_error)?;
    Ok(Json(GrammarFeedbackResponse::from_domain(feedback)))
}

/// Build a vocabulary list for a topic.
#[utoipa::path(
    post,
    path = "/generate/vocabulary",
    request_body = VocabularyRequest,
    responses(
        (status = 200, description = "Vocabulary items", body = [VocabularyItemResponse]),
        (status = 502, description = "Model unavailable")
    )
)]
pub async fn vocabulary_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VocabularyRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let items = state
        .content_adapter
        .generate_vocabulary(&req.topic)
        .await
        .map_err(generation_error)?;
    Ok(Json(
        items
            .into_iter()
            .map(VocabularyItemResponse::from_domain)
            .collect::<Vec<_>>(),
    ))
}

/// Generate a situational exercise set in a specific culture.
#[utoipa::path(
    post,
    path = "/generate/scenario",
    request_body = ScenarioRequest,
    responses(
        (status = 200, description = "Scenario exercise", body = ScenarioResponse),
        (status = 502, description = "Model unavailable")
    )
)]
pub async fn scenario_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ScenarioRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let exercise = state
        .content_adapter
        .generate_scenario(&req.level, &req.scenario, &req.culture)
        .await
        .map_err(generation_error)?;
    Ok(Json(ScenarioResponse::from_domain(exercise)))
}

/// Evaluate an interview answer with the STAR method.
#[utoipa::path(
    post,
    path = "/generate/interview",
    request_body = InterviewRequest,
    responses(
        (status = 200, description = "Evaluation", body = InterviewResponse),
        (status = 502, description = "Model unavailable")
    )
)]
pub async fn interview_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<InterviewRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let evaluation = state
        .content_adapter
        .evaluate_interview(&req.job_role, &req.question, &req.answer)
        .await
        .map_err(generation_error)?;
    Ok(Json(InterviewResponse::from_domain(evaluation)))
}

/// Illustrate a vocabulary word. `image` is a data URL, or null when the
/// model produced nothing.
#[utoipa::path(
    post,
    path = "/generate/image",
    request_body = ImageRequest,
    responses(
        (status = 200, description = "Generated image", body = ImageResponse),
        (status = 502, description = "Model unavailable")
    )
)]
pub async fn image_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImageRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let image = state
        .image_adapter
        .word_image(&req.word)
        .await
        .map_err(generation_error)?;
    Ok(Json(ImageResponse { image }))
}

#[derive(Serialize, ToSchema)]
pub struct ImageResponse {
    pub image: Option<String>,
}

/// Speak a piece of text. Returns a mono 24 kHz WAV file.
#[utoipa::path(
    post,
    path = "/generate/speech",
    request_body = SpeechRequest,
    responses(
        (status = 200, description = "Mono 24 kHz WAV audio"),
        (status = 502, description = "Model unavailable")
    )
)]
pub async fn speech_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SpeechRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let pcm = state
        .tts_adapter
        .synthesize(&req.text)
        .await
        .map_err(generation_error)?;

    let wav = pcm16_to_wav(&pcm, crate::audio::PLAYBACK_SAMPLE_RATE).map_err(|e| {
        error!("Failed to encode WAV: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to encode audio".to_string(),
        )
    })?;

    Ok((
        [(header::CONTENT_TYPE, "audio/wav")],
        Bytes::from(wav),
    ))
}

/// Wraps raw little-endian PCM16 samples in a mono WAV container.
fn pcm16_to_wav(pcm_data: &[u8], sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let mut cursor = std::io::Cursor::new(Vec::new());

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
    for chunk in pcm_data.chunks_exact(2) {
        writer.write_sample(i16::from_le_bytes([chunk[0], chunk[1]]))?;
    }
    writer.finalize()?;

    Ok(cursor.into_inner())
}

//=========================================================================================
// Diagnostics Handlers
//=========================================================================================

/// Unredacted view of the persistent store for the admin panel.
#[utoipa::path(
    get,
    path = "/admin/snapshot",
    responses((status = 200, description = "Store contents", body = SnapshotResponse))
)]
pub async fn snapshot_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let snapshot = state.repo.snapshot().await.map_err(repo_error)?;
    Ok(Json(SnapshotResponse {
        user: UserResponse::from_domain(snapshot.user),
        custom_lessons: snapshot
            .custom_lessons
            .into_iter()
            .map(LessonResponse::from_domain)
            .collect(),
        authenticated: snapshot.authenticated,
        storage_usage: snapshot.storage_usage,
    }))
}

/// Full wipe: learner account and custom lessons.
#[utoipa::path(
    post,
    path = "/admin/reset",
    responses((status = 200, description = "Store cleared"))
)]
pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.repo.reset_all().await.map_err(repo_error)?;
    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_wrapper_preserves_sample_count() {
        // 100 samples of silence.
        let pcm = vec![0u8; 200];
        let wav = pcm16_to_wav(&pcm, 24_000).unwrap();

        let reader = hound::WavReader::new(std::io::Cursor::new(wav)).unwrap();
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().sample_rate, 24_000);
        assert_eq!(reader.len(), 100);
    }
}
