//! services/api/src/adapters/store.rs
//!
//! The file-backed key-value store that holds all durable learner state.
//! Values are JSON strings keyed the same way the original client kept them,
//! so a store file is a faithful mirror of that layout. Serde record structs
//! at this boundary convert to and from the pure domain types.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use linguist_core::domain::{
    ActivityEntry, ActivityKind, Lesson, ProficiencyLevel, SubscriptionPlan, User,
};
use linguist_core::ports::{PortError, PortResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const USER_KEY: &str = "db_user";
pub const CUSTOM_LESSONS_KEY: &str = "db_lessons_custom";
pub const AUTH_FLAG_KEY: &str = "isAuthenticated";

//=========================================================================================
// The Store
//=========================================================================================

/// An in-memory key→JSON-string map mirrored to a single file on disk.
///
/// Loading tolerates a missing or unreadable file by booting empty: the
/// service always renders something, it never refuses to start over a bad
/// store file.
pub struct LocalStore {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl LocalStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = Self::load_entries(&path);
        Self { path, entries }
    }

    fn load_entries(path: &Path) -> HashMap<String, String> {
        let raw = match std::fs::read_to_string(path) {
            Ok(value) => value,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return HashMap::new();
            }
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %error,
                    "failed to read store file; booting with empty state",
                );
                return HashMap::new();
            }
        };

        match serde_json::from_str::<HashMap<String, String>>(&raw) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %error,
                    "failed to parse store file; booting with empty state",
                );
                HashMap::new()
            }
        }
    }

    /// Writes the whole map back to disk via a temp file + rename, so a
    /// crash mid-write never leaves a truncated store behind.
    pub async fn persist(&self) -> PortResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Unexpected(format!("failed to prepare store dir: {e}")))?;
        }

        let payload = serde_json::to_vec(&self.entries)
            .map_err(|e| PortError::Unexpected(format!("failed to encode store: {e}")))?;

        let temp_path = self
            .path
            .with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&temp_path, payload)
            .await
            .map_err(|e| PortError::Unexpected(format!("failed to write store: {e}")))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| PortError::Unexpected(format!("failed to finalize store: {e}")))?;

        Ok(())
    }

    /// Approximate on-disk footprint, formatted for the diagnostics panel.
    pub fn approx_usage(&self) -> String {
        let bytes: usize = self
            .entries
            .iter()
            .map(|(key, value)| key.len() + value.len())
            .sum();
        format!("{:.2} KB", bytes as f64 / 1024.0)
    }

    // --- Typed accessors ---

    pub fn load_user(&self) -> Option<User> {
        let raw = self.entries.get(USER_KEY)?;
        match serde_json::from_str::<UserRecord>(raw) {
            Ok(record) => Some(record.to_domain()),
            Err(error) => {
                tracing::warn!(error = %error, "stored user record is unreadable; ignoring it");
                None
            }
        }
    }

    pub fn save_user(&mut self, user: &User) -> PortResult<()> {
        let raw = serde_json::to_string(&UserRecord::from_domain(user))
            .map_err(|e| PortError::Unexpected(format!("failed to encode user record: {e}")))?;
        self.entries.insert(USER_KEY.to_string(), raw);
        Ok(())
    }

    pub fn load_custom_lessons(&self) -> Vec<Lesson> {
        let Some(raw) = self.entries.get(CUSTOM_LESSONS_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<LessonRecord>>(raw) {
            Ok(records) => records.into_iter().map(LessonRecord::to_domain).collect(),
            Err(error) => {
                tracing::warn!(error = %error, "stored lesson list is unreadable; ignoring it");
                Vec::new()
            }
        }
    }

    pub fn save_custom_lessons(&mut self, lessons: &[Lesson]) -> PortResult<()> {
        let records: Vec<LessonRecord> = lessons.iter().map(LessonRecord::from_domain).collect();
        let raw = serde_json::to_string(&records)
            .map_err(|e| PortError::Unexpected(format!("failed to encode lesson list: {e}")))?;
        self.entries.insert(CUSTOM_LESSONS_KEY.to_string(), raw);
        Ok(())
    }

    pub fn authenticated(&self) -> bool {
        self.entries
            .get(AUTH_FLAG_KEY)
            .map(|value| value == "true")
            .unwrap_or(false)
    }

    pub fn set_authenticated(&mut self, authenticated: bool) {
        if authenticated {
            self.entries
                .insert(AUTH_FLAG_KEY.to_string(), "true".to_string());
        } else {
            self.entries.remove(AUTH_FLAG_KEY);
        }
    }

    /// Drops the learner account and every custom lesson in one sweep.
    pub fn clear_learner_state(&mut self) {
        self.entries.remove(USER_KEY);
        self.entries.remove(CUSTOM_LESSONS_KEY);
    }
}

//=========================================================================================
// "Impure" Store Record Structs
//=========================================================================================

#[derive(Serialize, Deserialize)]
struct ActivityRecord {
    id: Uuid,
    kind: String,
    title: String,
    xp_earned: u64,
    timestamp: DateTime<Utc>,
}

impl ActivityRecord {
    fn to_domain(self) -> ActivityEntry {
        ActivityEntry {
            id: self.id,
            kind: ActivityKind::parse(&self.kind).unwrap_or(ActivityKind::Quiz),
            title: self.title,
            xp_earned: self.xp_earned,
            timestamp: self.timestamp,
        }
    }

    fn from_domain(entry: &ActivityEntry) -> Self {
        Self {
            id: entry.id,
            kind: entry.kind.as_str().to_string(),
            title: entry.title.clone(),
            xp_earned: entry.xp_earned,
            timestamp: entry.timestamp,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct UserRecord {
    id: String,
    name: String,
    email: String,
    xp: u64,
    level: String,
    completed: Vec<String>,
    logs: Vec<ActivityRecord>,
    subscription: String,
}

impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            // The stored tier is advisory; XP is authoritative.
            level: ProficiencyLevel::for_xp(self.xp),
            xp: self.xp,
            completed: self.completed,
            logs: self.logs.into_iter().map(ActivityRecord::to_domain).collect(),
            subscription: SubscriptionPlan::parse(&self.subscription)
                .unwrap_or(SubscriptionPlan::Starter),
        }
    }

    fn from_domain(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            xp: user.xp,
            level: user.level.as_str().to_string(),
            completed: user.completed.clone(),
            logs: user.logs.iter().map(ActivityRecord::from_domain).collect(),
            subscription: user.subscription.as_str().to_string(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct LessonRecord {
    id: String,
    slug: String,
    title: String,
    level: String,
    category: String,
    icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    video_url: Option<String>,
    #[serde(default)]
    custom: bool,
}

impl LessonRecord {
    fn to_domain(self) -> Lesson {
        Lesson {
            id: self.id,
            slug: self.slug,
            title: self.title,
            level: self.level,
            category: self.category,
            icon: self.icon,
            description: self.description,
            video_url: self.video_url,
            custom: self.custom,
        }
    }

    fn from_domain(lesson: &Lesson) -> Self {
        Self {
            id: lesson.id.clone(),
            slug: lesson.slug.clone(),
            title: lesson.title.clone(),
            level: lesson.level.clone(),
            category: lesson.category.clone(),
            icon: lesson.icon.clone(),
            description: lesson.description.clone(),
            video_url: lesson.video_url.clone(),
            custom: lesson.custom,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store_path() -> PathBuf {
        std::env::temp_dir().join(format!("linguist-store-{}.json", Uuid::new_v4().simple()))
    }

    #[tokio::test]
    async fn round_trips_user_and_lessons_through_disk() {
        let path = temp_store_path();

        let mut store = LocalStore::open(&path);
        let mut user = User::guest();
        user.xp = 1_250;
        store.save_user(&user).unwrap();
        store
            .save_custom_lessons(&[Lesson {
                id: "l-1".to_string(),
                slug: "greetings".to_string(),
                title: "Greetings".to_string(),
                level: "A1".to_string(),
                category: "Basics".to_string(),
                icon: "👋".to_string(),
                description: None,
                video_url: None,
                custom: true,
            }])
            .unwrap();
        store.set_authenticated(true);
        store.persist().await.unwrap();

        let reloaded = LocalStore::open(&path);
        let user = reloaded.load_user().unwrap();
        assert_eq!(user.xp, 1_250);
        // The tier comes back derived from XP, whatever was written.
        assert_eq!(user.level, ProficiencyLevel::A2);
        assert_eq!(reloaded.load_custom_lessons().len(), 1);
        assert!(reloaded.authenticated());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_boots_empty() {
        let store = LocalStore::open(temp_store_path());
        assert!(store.load_user().is_none());
        assert!(store.load_custom_lessons().is_empty());
        assert!(!store.authenticated());
    }

    #[test]
    fn corrupt_value_is_ignored() {
        let path = temp_store_path();
        std::fs::write(&path, r#"{"db_user": "not json"}"#).unwrap();
        let store = LocalStore::open(&path);
        assert!(store.load_user().is_none());
        let _ = std::fs::remove_file(&path);
    }
}
