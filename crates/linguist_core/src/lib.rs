pub mod domain;
pub mod ports;

pub use domain::{
    slugify, xp_for_score, ActivityEntry, ActivityKind, GeneratedLesson, GrammarFeedback,
    InterviewEvaluation, Lesson, LessonDraft, PlanUpgrade, ProficiencyLevel, QuizQuestion,
    ScenarioExercise, SpeakerRole, StoreSnapshot, SubscriptionPlan, User, VocabularyItem,
    ACTIVITY_LOG_CAP, XP_PER_LEVEL,
};
pub use ports::{
    ContentGenerationService, ImageGenerationService, LiveTutorEvent, LiveTutorService,
    LiveTutorSink, LiveTutorSource, PortError, PortResult, ProfileRepository, TextToSpeechService,
};
