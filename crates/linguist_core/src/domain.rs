//! crates/linguist_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any storage backend or serialization
//! format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// XP required to advance one proficiency tier.
pub const XP_PER_LEVEL: u64 = 1_000;

/// Maximum number of activity log entries retained per learner.
pub const ACTIVITY_LOG_CAP: usize = 50;

/// CEFR proficiency tiers, ordered lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProficiencyLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl ProficiencyLevel {
    pub const ALL: [ProficiencyLevel; 6] = [
        ProficiencyLevel::A1,
        ProficiencyLevel::A2,
        ProficiencyLevel::B1,
        ProficiencyLevel::B2,
        ProficiencyLevel::C1,
        ProficiencyLevel::C2,
    ];

    /// Derives the tier for an XP total. The tier is never stored on its
    /// own; every mutation path recomputes it through this function.
    pub fn for_xp(xp: u64) -> Self {
        let index = ((xp / XP_PER_LEVEL) as usize).min(Self::ALL.len() - 1);
        Self::ALL[index]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProficiencyLevel::A1 => "A1",
            ProficiencyLevel::A2 => "A2",
            ProficiencyLevel::B1 => "B1",
            ProficiencyLevel::B2 => "B2",
            ProficiencyLevel::C1 => "C1",
            ProficiencyLevel::C2 => "C2",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(value))
    }
}

impl std::fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// XP awarded for a scored activity.
pub fn xp_for_score(score: f64) -> u64 {
    // `as` saturates negative and NaN inputs to zero.
    (score * 10.0).floor() as u64
}

/// Subscription tier of a learner account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionPlan {
    Starter,
    Pro,
    Immersion,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Starter => "starter",
            SubscriptionPlan::Pro => "pro",
            SubscriptionPlan::Immersion => "immersion",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "starter" => Some(SubscriptionPlan::Starter),
            "pro" => Some(SubscriptionPlan::Pro),
            "immersion" => Some(SubscriptionPlan::Immersion),
            _ => None,
        }
    }
}

/// The two paid tiers an account can move to. `Starter` is only ever the
/// default plan, so it is not representable as an upgrade target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanUpgrade {
    Pro,
    Immersion,
}

impl PlanUpgrade {
    pub fn plan(self) -> SubscriptionPlan {
        match self {
            PlanUpgrade::Pro => SubscriptionPlan::Pro,
            PlanUpgrade::Immersion => SubscriptionPlan::Immersion,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "pro" => Some(PlanUpgrade::Pro),
            "immersion" => Some(PlanUpgrade::Immersion),
            _ => None,
        }
    }
}

/// Kind of learning activity that can earn XP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Quiz,
    Voice,
    Culture,
    Vocab,
}

impl ActivityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Quiz => "quiz",
            ActivityKind::Voice => "voice",
            ActivityKind::Culture => "culture",
            ActivityKind::Vocab => "vocab",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "quiz" => Some(ActivityKind::Quiz),
            "voice" => Some(ActivityKind::Voice),
            "culture" => Some(ActivityKind::Culture),
            "vocab" => Some(ActivityKind::Vocab),
            _ => None,
        }
    }
}

/// One completed learning activity. Entries are only ever inserted,
/// never mutated.
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub kind: ActivityKind,
    pub title: String,
    pub xp_earned: u64,
    pub timestamp: DateTime<Utc>,
}

/// A learner account with its XP ledger.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub xp: u64,
    pub level: ProficiencyLevel,
    /// Identifiers of completed lessons. Insertion order is irrelevant;
    /// membership is what matters.
    pub completed: Vec<String>,
    /// Most-recent-first, capped at [`ACTIVITY_LOG_CAP`].
    pub logs: Vec<ActivityEntry>,
    pub subscription: SubscriptionPlan,
}

impl User {
    /// The zero-state record returned when nothing has been stored yet.
    pub fn guest() -> Self {
        Self {
            id: "u0".to_string(),
            name: "Estudiante".to_string(),
            email: String::new(),
            xp: 0,
            level: ProficiencyLevel::A1,
            completed: Vec::new(),
            logs: Vec::new(),
            subscription: SubscriptionPlan::Starter,
        }
    }
}

/// Display slug for a lesson title: lowercased, whitespace runs joined
/// with `-`.
pub fn slugify(title: &str) -> String {
    title
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// A course in the catalog, either built-in or learner-created.
#[derive(Debug, Clone)]
pub struct Lesson {
    /// Unique identifier. Built-in lessons use fixed ids; custom lessons
    /// get a generated one so that same-titled lessons never shadow each
    /// other.
    pub id: String,
    /// Human-readable slug derived from the title, kept for display only.
    pub slug: String,
    pub title: String,
    pub level: String,
    pub category: String,
    pub icon: String,
    /// Free-form context handed to lesson generation.
    pub description: Option<String>,
    pub video_url: Option<String>,
    pub custom: bool,
}

/// Input for creating a custom lesson.
#[derive(Debug, Clone)]
pub struct LessonDraft {
    pub title: String,
    pub level: String,
    pub category: String,
    pub icon: String,
    pub description: Option<String>,
    pub video_url: Option<String>,
}

/// A generated lesson body: theory text plus a quiz.
#[derive(Debug, Clone, Default)]
pub struct GeneratedLesson {
    pub theory: String,
    pub quiz: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Default)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub explanation: String,
}

/// Correction feedback for a free-form writing sample.
#[derive(Debug, Clone, Default)]
pub struct GrammarFeedback {
    pub corrected_text: String,
    pub explanations: Vec<String>,
    pub usage_examples: Vec<String>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct VocabularyItem {
    pub word: String,
    pub definition: String,
    pub example: String,
}

/// A single multiple-choice exercise set in a cultural context.
#[derive(Debug, Clone, Default)]
pub struct ScenarioExercise {
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`.
    pub correct_answer: usize,
    pub explanation: String,
    pub cultural_insight: String,
}

/// STAR-method evaluation of an interview answer.
#[derive(Debug, Clone, Default)]
pub struct InterviewEvaluation {
    pub score: f64,
    pub feedback: String,
    pub better_version: String,
    pub next_question: String,
}

/// Who produced a fragment of the live-session transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeakerRole {
    Tutor,
    Learner,
}

impl SpeakerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeakerRole::Tutor => "tutor",
            SpeakerRole::Learner => "learner",
        }
    }
}

/// Unredacted diagnostic view of the persistent store.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub user: User,
    pub custom_lessons: Vec<Lesson>,
    pub authenticated: bool,
    pub storage_usage: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_a_step_function_of_xp() {
        assert_eq!(ProficiencyLevel::for_xp(0), ProficiencyLevel::A1);
        assert_eq!(ProficiencyLevel::for_xp(999), ProficiencyLevel::A1);
        assert_eq!(ProficiencyLevel::for_xp(1_000), ProficiencyLevel::A2);
        assert_eq!(ProficiencyLevel::for_xp(2_500), ProficiencyLevel::B1);
        assert_eq!(ProficiencyLevel::for_xp(5_000), ProficiencyLevel::C2);
        // Saturates at the top tier.
        assert_eq!(ProficiencyLevel::for_xp(120_000), ProficiencyLevel::C2);
    }

    #[test]
    fn tier_boundaries_are_exact() {
        for (index, level) in ProficiencyLevel::ALL.into_iter().enumerate() {
            let threshold = index as u64 * XP_PER_LEVEL;
            assert_eq!(ProficiencyLevel::for_xp(threshold), level);
            if index > 0 {
                assert_eq!(
                    ProficiencyLevel::for_xp(threshold - 1),
                    ProficiencyLevel::ALL[index - 1]
                );
            }
        }
    }

    #[test]
    fn xp_for_score_floors() {
        assert_eq!(xp_for_score(18.0), 180);
        assert_eq!(xp_for_score(7.49), 74);
        assert_eq!(xp_for_score(0.0), 0);
        assert_eq!(xp_for_score(-3.0), 0);
    }

    #[test]
    fn slugify_joins_whitespace_runs() {
        assert_eq!(slugify("Present Continuous"), "present-continuous");
        assert_eq!(slugify("  Airport   Survival "), "airport-survival");
        assert_eq!(slugify("One"), "one");
    }

    #[test]
    fn plan_upgrade_only_names_paid_tiers() {
        assert_eq!(PlanUpgrade::parse("pro"), Some(PlanUpgrade::Pro));
        assert_eq!(PlanUpgrade::parse("Immersion"), Some(PlanUpgrade::Immersion));
        assert_eq!(PlanUpgrade::parse("starter"), None);
    }

    #[test]
    fn guest_is_the_zero_state() {
        let guest = User::guest();
        assert_eq!(guest.xp, 0);
        assert_eq!(guest.level, ProficiencyLevel::A1);
        assert!(guest.completed.is_empty());
        assert!(guest.logs.is_empty());
        assert_eq!(guest.subscription, SubscriptionPlan::Starter);
    }
}
