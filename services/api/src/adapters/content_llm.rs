//! services/api/src/adapters/content_llm.rs
//!
//! This module contains the adapter for all structured content generation.
//! It implements the `ContentGenerationService` port from the `core` crate.
//! Every request instructs the model to reply with a single JSON object of a
//! fixed shape; whatever fails to parse degrades to an empty payload so that
//! callers always receive something renderable.

const LESSON_INSTRUCTIONS: &str = r#"You are an expert English teacher writing a complete mini-lesson.

Reply with a single JSON object and nothing else, shaped exactly like:
{
  "theory": "...",
  "quiz": [
    {
      "question": "...",
      "options": ["...", "...", "...", "..."],
      "correctAnswer": "...",
      "explanation": "..."
    }
  ]
}

"theory" is a clear explanation of the topic at the requested level, written
for a learner. "quiz" holds 4-6 multiple-choice questions; "correctAnswer"
repeats one of the options verbatim. Do not wrap the JSON in markdown."#;

const GRAMMAR_INSTRUCTIONS: &str = r#"You are an English grammar coach. Correct the text you receive.

Reply with a single JSON object and nothing else, shaped exactly like:
{
  "correctedText": "...",
  "explanations": ["..."],
  "usageExamples": ["..."],
  "suggestions": ["..."]
}

Keep explanations short and concrete. If the text is already correct, return
it unchanged with empty lists. Do not wrap the JSON in markdown."#;

const VOCABULARY_INSTRUCTIONS: &str = r#"You build vocabulary lists for English learners.

Reply with a single JSON array and nothing else, shaped exactly like:
[
  { "word": "...", "definition": "...", "example": "..." }
]

Return 8-12 items for the requested topic. Do not wrap the JSON in markdown."#;

const SCENARIO_INSTRUCTIONS: &str = r#"You write situational English exercises set in a specific culture.

Reply with a single JSON object and nothing else, shaped exactly like:
{
  "question": "...",
  "options": ["...", "...", "...", "..."],
  "correctAnswer": 0,
  "explanation": "...",
  "culturalInsight": "..."
}

"correctAnswer" is the zero-based index of the right option.
"culturalInsight" explains the local custom behind the answer. Do not wrap
the JSON in markdown."#;

const INTERVIEW_INSTRUCTIONS: &str = r#"You evaluate interview answers with the STAR method (Situation, Task, Action, Result).

Reply with a single JSON object and nothing else, shaped exactly like:
{
  "score": 7.5,
  "feedback": "...",
  "betterVersion": "...",
  "nextQuestion": "..."
}

"score" is 0-10. "betterVersion" rewrites the answer the way a strong
candidate would phrase it. "nextQuestion" is a natural follow-up for the same
role. Do not wrap the JSON in markdown."#;

use async_openai::{
    config::OpenAIConfig, error::OpenAIError, types::responses::CreateResponseArgs, Client,
};
use async_trait::async_trait;
use linguist_core::domain::{
    GeneratedLesson, GrammarFeedback, InterviewEvaluation, QuizQuestion, ScenarioExercise,
    VocabularyItem,
};
use linguist_core::ports::{ContentGenerationService, PortError, PortResult};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ContentGenerationService` using an
/// OpenAI-compatible LLM. Lessons use the stronger model; the quicker
/// coaching calls (grammar, vocabulary, scenarios, interviews) use the
/// lighter one.
#[derive(Clone)]
pub struct OpenAiContentAdapter {
    client: Client<OpenAIConfig>,
    lesson_model: String,
    coach_model: String,
}

impl OpenAiContentAdapter {
    /// Creates a new `OpenAiContentAdapter`.
    pub fn new(client: Client<OpenAIConfig>, lesson_model: String, coach_model: String) -> Self {
        Self {
            client,
            lesson_model,
            coach_model,
        }
    }

    async fn request_json(
        &self,
        model: &str,
        instructions: &str,
        input: String,
        max_output_tokens: u32,
    ) -> PortResult<String> {
        let request = CreateResponseArgs::default()
            .model(model)
            .instructions(instructions)
            .input(input)
            .max_output_tokens(max_output_tokens)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .responses()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        Ok(response.output_text().unwrap_or_default())
    }
}

/// Parses a model reply into `T`, stripping a markdown code fence if the
/// model added one anyway. Anything unparseable becomes `T::default()`.
fn parse_payload<T: DeserializeOwned + Default>(raw: &str) -> T {
    let fence = Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").unwrap();
    let cleaned = match fence.captures(raw) {
        Some(captures) => captures[1].to_string(),
        None => raw.trim().to_string(),
    };

    match serde_json::from_str::<T>(&cleaned) {
        Ok(value) => value,
        Err(error) => {
            warn!(%error, "model reply did not match the expected shape; returning empty payload");
            T::default()
        }
    }
}

//=========================================================================================
// Reply Payload Structs
//=========================================================================================

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct LessonPayload {
    theory: String,
    quiz: Vec<QuizQuestionPayload>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct QuizQuestionPayload {
    question: String,
    options: Vec<String>,
    correct_answer: String,
    explanation: String,
}

impl LessonPayload {
    fn to_domain(self) -> GeneratedLesson {
        GeneratedLesson {
            theory: self.theory,
            quiz: self
                .quiz
                .into_iter()
                .map(|q| QuizQuestion {
                    question: q.question,
                    options: q.options,
                    correct_answer: q.correct_answer,
                    explanation: q.explanation,
                })
                .collect(),
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct GrammarPayload {
    corrected_text: String,
    explanations: Vec<String>,
    usage_examples: Vec<String>,
    suggestions: Vec<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct VocabularyPayload {
    word: String,
    definition: String,
    example: String,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ScenarioPayload {
    question: String,
    options: Vec<String>,
    correct_answer: usize,
    explanation: String,
    cultural_insight: String,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct InterviewPayload {
    score: f64,
    feedback: String,
    better_version: String,
    next_question: String,
}

//=========================================================================================
// `ContentGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ContentGenerationService for OpenAiContentAdapter {
    async fn generate_lesson(
        &self,
        topic: &str,
        level: &str,
        context: &str,
    ) -> PortResult<GeneratedLesson> {
        let input = if context.is_empty() {
            format!("Create a complete lesson about \"{topic}\" for level {level}.")
        } else {
            format!(
                "Create a complete lesson about \"{topic}\" for level {level}. \
                 Additional context: {context}"
            )
        };

        let raw = self
            .request_json(&self.lesson_model, LESSON_INSTRUCTIONS, input, 2_000)
            .await?;
        Ok(parse_payload::<LessonPayload>(&raw).to_domain())
    }

    async fn grammar_feedback(&self, text: &str) -> PortResult<GrammarFeedback> {
        let input = format!("Correct this English text: \"{text}\"");
        let raw = self
            .request_json(&self.coach_model, GRAMMAR_INSTRUCTIONS, input, 1_000)
            .await?;
        let payload: GrammarPayload = parse_payload(&raw);
        Ok(GrammarFeedback {
            corrected_text: payload.corrected_text,
            explanations: payload.explanations,
            usage_examples: payload.usage_examples,
            suggestions: payload.suggestions,
        })
    }

    async fn generate_vocabulary(&self, topic: &str) -> PortResult<Vec<VocabularyItem>> {
        let input = format!("Vocabulary for \"{topic}\".");
        let raw = self
            .request_json(&self.coach_model, VOCABULARY_INSTRUCTIONS, input, 1_500)
            .await?;
        let items: Vec<VocabularyPayload> = parse_payload(&raw);
        Ok(items
            .into_iter()
            .map(|item| VocabularyItem {
                word: item.word,
                definition: item.definition,
                example: item.example,
            })
            .collect())
    }

    async fn generate_scenario(
        &self,
        level: &str,
        scenario: &str,
        culture: &str,
    ) -> PortResult<ScenarioExercise> {
        let input = format!("Create the scenario \"{scenario}\" set in {culture} for level {level}.");
        let raw = self
            .request_json(&self.coach_model, SCENARIO_INSTRUCTIONS, input, 1_000)
            .await?;
        let payload: ScenarioPayload = parse_payload(&raw);
        Ok(ScenarioExercise {
            question: payload.question,
            options: payload.options,
            correct_answer: payload.correct_answer,
            explanation: payload.explanation,
            cultural_insight: payload.cultural_insight,
        })
    }

    async fn evaluate_interview(
        &self,
        job_role: &str,
        question: &str,
        answer: &str,
    ) -> PortResult<InterviewEvaluation> {
        let input = format!("Job: {job_role}. Question: {question}. Answer: {answer}.");
        let raw = self
            .request_json(&self.coach_model, INTERVIEW_INSTRUCTIONS, input, 1_000)
            .await?;
        let payload: InterviewPayload = parse_payload(&raw);
        Ok(InterviewEvaluation {
            score: payload.score,
            feedback: payload.feedback,
            better_version: payload.better_version,
            next_question: payload.next_question,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_plain_json_reply() {
        let raw = r#"{"theory": "Use -ing for actions happening now.", "quiz": [
            {"question": "She ___ now.", "options": ["runs", "is running"],
             "correctAnswer": "is running", "explanation": "Happening now."}
        ]}"#;
        let lesson = parse_payload::<LessonPayload>(raw).to_domain();
        assert_eq!(lesson.quiz.len(), 1);
        assert_eq!(lesson.quiz[0].correct_answer, "is running");
    }

    #[test]
    fn strips_a_markdown_fence() {
        let raw = "```json\n{\"correctedText\": \"I went home.\", \"explanations\": [\"past tense\"], \"usageExamples\": [], \"suggestions\": []}\n```";
        let payload: GrammarPayload = parse_payload(raw);
        assert_eq!(payload.corrected_text, "I went home.");
        assert_eq!(payload.explanations, vec!["past tense".to_string()]);
    }

    #[test]
    fn malformed_reply_degrades_to_default() {
        let payload: InterviewPayload = parse_payload("the model rambled instead of emitting JSON");
        assert_eq!(payload.score, 0.0);
        assert!(payload.feedback.is_empty());

        let items: Vec<VocabularyPayload> = parse_payload("{}");
        assert!(items.is_empty());
    }

    #[test]
    fn missing_fields_fall_back_per_field() {
        let payload: ScenarioPayload = parse_payload(r#"{"question": "Pick one.", "options": ["a"]}"#);
        assert_eq!(payload.question, "Pick one.");
        assert_eq!(payload.correct_answer, 0);
        assert!(payload.cultural_insight.is_empty());
    }
}
