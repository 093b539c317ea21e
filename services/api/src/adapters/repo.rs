//! services/api/src/adapters/repo.rs
//!
//! This module contains the repository adapter, the concrete implementation
//! of the `ProfileRepository` port from the `core` crate. All reads and
//! writes of learner state funnel through it; access to the underlying store
//! is serialized by a single mutex, so read-modify-write cycles never
//! interleave.

use async_trait::async_trait;
use chrono::Utc;
use linguist_core::domain::{
    slugify, xp_for_score, ActivityEntry, ActivityKind, Lesson, LessonDraft, PlanUpgrade,
    ProficiencyLevel, StoreSnapshot, SubscriptionPlan, User, ACTIVITY_LOG_CAP,
};
use linguist_core::ports::{PortError, PortResult, ProfileRepository};
use std::path::PathBuf;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::store::LocalStore;

/// XP granted to a freshly created account.
const STARTING_XP: u64 = 250;

/// A repository adapter backed by the local JSON store.
pub struct LocalRepository {
    store: Mutex<LocalStore>,
    access_code: String,
}

impl LocalRepository {
    /// Opens the repository over the store file at `path`.
    pub fn open(path: impl Into<PathBuf>, access_code: impl Into<String>) -> Self {
        Self {
            store: Mutex::new(LocalStore::open(path)),
            access_code: access_code.into(),
        }
    }

    /// The fixed built-in course catalog. Always present, regardless of what
    /// learners create.
    fn builtin_lessons() -> Vec<Lesson> {
        fn builtin(id: &str, title: &str, level: &str, icon: &str, category: &str) -> Lesson {
            Lesson {
                id: id.to_string(),
                slug: id.to_string(),
                title: title.to_string(),
                level: level.to_string(),
                category: category.to_string(),
                icon: icon.to_string(),
                description: None,
                video_url: None,
                custom: false,
            }
        }

        vec![
            builtin("pres-cont", "Present Continuous", "A1", "🏃", "Grammar"),
            builtin("job-interview", "Corporate Interview Prep", "B2", "💼", "Business"),
            builtin("condit-1", "First Conditional", "B1", "🔀", "Grammar"),
            builtin("travel-airport", "Airport Survival", "A2", "✈️", "Travel"),
        ]
    }

    /// The account created on first successful login.
    fn default_user() -> User {
        User {
            id: "u1".to_string(),
            name: "Founding Linguist".to_string(),
            email: "admin@linguist.app".to_string(),
            xp: STARTING_XP,
            level: ProficiencyLevel::for_xp(STARTING_XP),
            completed: Vec::new(),
            logs: Vec::new(),
            subscription: SubscriptionPlan::Starter,
        }
    }

    /// Recomputes the derived tier and writes the account record. Every
    /// mutation path ends here, which is what keeps level and XP in lockstep.
    fn save_user(store: &mut LocalStore, user: &mut User) -> PortResult<()> {
        user.level = ProficiencyLevel::for_xp(user.xp);
        store.save_user(user)
    }
}

#[async_trait]
impl ProfileRepository for LocalRepository {
    async fn authenticate(&self, access_code: &str) -> PortResult<User> {
        if access_code != self.access_code {
            return Err(PortError::Unauthorized);
        }

        let mut store = self.store.lock().await;
        let mut user = match store.load_user() {
            Some(existing) => existing,
            None => Self::default_user(),
        };
        Self::save_user(&mut store, &mut user)?;
        store.set_authenticated(true);
        store.persist().await?;
        Ok(user)
    }

    async fn is_authenticated(&self) -> bool {
        self.store.lock().await.authenticated()
    }

    async fn logout(&self) -> PortResult<()> {
        let mut store = self.store.lock().await;
        store.set_authenticated(false);
        store.persist().await
    }

    async fn current_user(&self) -> User {
        self.store
            .lock()
            .await
            .load_user()
            .unwrap_or_else(User::guest)
    }

    async fn change_subscription(&self, upgrade: PlanUpgrade) -> PortResult<User> {
        let mut store = self.store.lock().await;
        let mut user = store.load_user().unwrap_or_else(User::guest);
        user.subscription = upgrade.plan();
        Self::save_user(&mut store, &mut user)?;
        store.persist().await?;
        Ok(user)
    }

    async fn list_lessons(&self) -> PortResult<Vec<Lesson>> {
        let store = self.store.lock().await;
        let mut lessons = Self::builtin_lessons();
        lessons.extend(store.load_custom_lessons());
        Ok(lessons)
    }

    async fn get_lesson(&self, id: &str) -> PortResult<Lesson> {
        self.list_lessons()
            .await?
            .into_iter()
            .find(|lesson| lesson.id == id || lesson.slug == id)
            .ok_or_else(|| PortError::NotFound(format!("Lesson {} not found", id)))
    }

    async fn create_lesson(&self, draft: LessonDraft) -> PortResult<Lesson> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(PortError::Unexpected(
                "lesson title must not be empty".to_string(),
            ));
        }

        let lesson = Lesson {
            // A generated id plus a display slug: two lessons with the same
            // title never shadow each other in lookups.
            id: Uuid::new_v4().to_string(),
            slug: slugify(title),
            title: title.to_string(),
            level: draft.level,
            category: draft.category,
            icon: draft.icon,
            description: draft.description,
            video_url: draft.video_url,
            custom: true,
        };

        let mut store = self.store.lock().await;
        let mut customs = store.load_custom_lessons();
        customs.push(lesson.clone());
        store.save_custom_lessons(&customs)?;
        store.persist().await?;
        Ok(lesson)
    }

    async fn record_activity(
        &self,
        kind: ActivityKind,
        title: &str,
        score: f64,
        lesson_id: Option<&str>,
    ) -> PortResult<User> {
        let xp_earned = xp_for_score(score);
        let entry = ActivityEntry {
            id: Uuid::new_v4(),
            kind,
            title: title.to_string(),
            xp_earned,
            timestamp: Utc::now(),
        };

        let mut store = self.store.lock().await;
        let mut user = store.load_user().unwrap_or_else(User::guest);

        user.xp += xp_earned;
        user.logs.insert(0, entry);
        user.logs.truncate(ACTIVITY_LOG_CAP);

        if let Some(lesson_id) = lesson_id {
            if !user.completed.iter().any(|id| id == lesson_id) {
                user.completed.push(lesson_id.to_string());
            }
        }

        Self::save_user(&mut store, &mut user)?;
        store.persist().await?;
        Ok(user)
    }

    async fn reset_all(&self) -> PortResult<()> {
        let mut store = self.store.lock().await;
        store.clear_learner_state();
        store.persist().await
    }

    async fn snapshot(&self) -> PortResult<StoreSnapshot> {
        let store = self.store.lock().await;
        Ok(StoreSnapshot {
            user: store.load_user().unwrap_or_else(User::guest),
            custom_lessons: store.load_custom_lessons(),
            authenticated: store.authenticated(),
            storage_usage: store.approx_usage(),
        })
    }
}
