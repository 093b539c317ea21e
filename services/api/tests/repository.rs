//! Integration tests for the local repository: authentication, the XP
//! ledger, the lesson catalog and the reset path, all against a real store
//! file.

use api_lib::adapters::LocalRepository;
use linguist_core::domain::{
    ActivityKind, LessonDraft, PlanUpgrade, ProficiencyLevel, SubscriptionPlan,
    ACTIVITY_LOG_CAP,
};
use linguist_core::ports::{PortError, ProfileRepository};
use std::path::PathBuf;
use uuid::Uuid;

const ACCESS_CODE: &str = "LINGUIST2025";

struct TempRepo {
    repo: LocalRepository,
    path: PathBuf,
}

impl TempRepo {
    fn new() -> Self {
        let path =
            std::env::temp_dir().join(format!("linguist-repo-{}.json", Uuid::new_v4().simple()));
        Self {
            repo: LocalRepository::open(&path, ACCESS_CODE),
            path,
        }
    }
}

impl Drop for TempRepo {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

fn draft(title: &str) -> LessonDraft {
    LessonDraft {
        title: title.to_string(),
        level: "B1".to_string(),
        category: "Custom".to_string(),
        icon: "📚".to_string(),
        description: Some("Practice ordering food".to_string()),
        video_url: None,
    }
}

#[tokio::test]
async fn correct_code_creates_the_default_account() {
    let t = TempRepo::new();

    let user = t.repo.authenticate(ACCESS_CODE).await.unwrap();
    assert_eq!(user.xp, 250);
    assert_eq!(user.level, ProficiencyLevel::A1);
    assert_eq!(user.subscription, SubscriptionPlan::Starter);
    assert!(user.completed.is_empty());
    assert!(t.repo.is_authenticated().await);

    // A second login finds the same account rather than recreating it.
    let again = t.repo.authenticate(ACCESS_CODE).await.unwrap();
    assert_eq!(again.id, user.id);
}

#[tokio::test]
async fn wrong_code_creates_nothing() {
    let t = TempRepo::new();

    let result = t.repo.authenticate("password123").await;
    assert!(matches!(result, Err(PortError::Unauthorized)));
    assert!(!t.repo.is_authenticated().await);

    // No account materialized: current_user is still the guest zero-state.
    let user = t.repo.current_user().await;
    assert_eq!(user.xp, 0);
    assert!(user.logs.is_empty());
}

#[tokio::test]
async fn logout_clears_the_flag_but_keeps_state() {
    let t = TempRepo::new();
    t.repo.authenticate(ACCESS_CODE).await.unwrap();

    t.repo.logout().await.unwrap();
    assert!(!t.repo.is_authenticated().await);
    assert_eq!(t.repo.current_user().await.xp, 250);
}

#[tokio::test]
async fn activity_awards_floor_of_ten_times_score() {
    let t = TempRepo::new();
    t.repo.authenticate(ACCESS_CODE).await.unwrap();

    let user = t
        .repo
        .record_activity(ActivityKind::Quiz, "Quiz: conditionals", 18.0, None)
        .await
        .unwrap();
    assert_eq!(user.xp, 250 + 180);
    assert_eq!(user.logs[0].xp_earned, 180);
    assert_eq!(user.logs[0].kind, ActivityKind::Quiz);
}

#[tokio::test]
async fn xp_never_decreases() {
    let t = TempRepo::new();
    t.repo.authenticate(ACCESS_CODE).await.unwrap();

    let mut previous = t.repo.current_user().await.xp;
    for score in [0.0, 0.4, 7.0, 12.5, 100.0] {
        let user = t
            .repo
            .record_activity(ActivityKind::Vocab, "Vocab drill", score, None)
            .await
            .unwrap();
        assert!(user.xp >= previous);
        previous = user.xp;
    }
}

#[tokio::test]
async fn level_tracks_xp_across_activities() {
    let t = TempRepo::new();
    t.repo.authenticate(ACCESS_CODE).await.unwrap();

    // 250 + 800 = 1050 XP crosses the first tier boundary.
    let user = t
        .repo
        .record_activity(ActivityKind::Culture, "Tapas night", 80.0, None)
        .await
        .unwrap();
    assert_eq!(user.xp, 1_050);
    assert_eq!(user.level, ProficiencyLevel::A2);
}

#[tokio::test]
async fn completing_a_lesson_twice_records_it_once() {
    let t = TempRepo::new();
    t.repo.authenticate(ACCESS_CODE).await.unwrap();

    t.repo
        .record_activity(ActivityKind::Quiz, "Quiz: present continuous", 9.0, Some("pres-cont"))
        .await
        .unwrap();
    let user = t
        .repo
        .record_activity(ActivityKind::Quiz, "Quiz: present continuous", 10.0, Some("pres-cont"))
        .await
        .unwrap();

    assert_eq!(
        user.completed.iter().filter(|id| *id == "pres-cont").count(),
        1
    );
}

#[tokio::test]
async fn activity_log_is_newest_first_and_capped() {
    let t = TempRepo::new();
    t.repo.authenticate(ACCESS_CODE).await.unwrap();

    for i in 0..(ACTIVITY_LOG_CAP + 5) {
        t.repo
            .record_activity(ActivityKind::Voice, &format!("Session {i}"), 1.0, None)
            .await
            .unwrap();
    }

    let user = t.repo.current_user().await;
    assert_eq!(user.logs.len(), ACTIVITY_LOG_CAP);
    // Newest entry first; the oldest five were evicted.
    assert_eq!(user.logs[0].title, format!("Session {}", ACTIVITY_LOG_CAP + 4));
    assert_eq!(user.logs.last().unwrap().title, "Session 5");
}

#[tokio::test]
async fn catalog_keeps_builtins_and_appends_customs() {
    let t = TempRepo::new();
    t.repo.authenticate(ACCESS_CODE).await.unwrap();

    let builtin_count = t.repo.list_lessons().await.unwrap().len();
    assert!(builtin_count >= 4);

    let created = t.repo.create_lesson(draft("Restaurant Talk")).await.unwrap();
    assert!(created.custom);
    assert_eq!(created.slug, "restaurant-talk");

    let lessons = t.repo.list_lessons().await.unwrap();
    assert_eq!(lessons.len(), builtin_count + 1);
    // Built-ins come first; the custom lesson is appended.
    assert!(!lessons[0].custom);
    assert_eq!(lessons.last().unwrap().id, created.id);

    let fetched = t.repo.get_lesson(&created.id).await.unwrap();
    assert_eq!(fetched.title, "Restaurant Talk");
    // The display slug also resolves.
    assert!(t.repo.get_lesson("restaurant-talk").await.is_ok());
}

#[tokio::test]
async fn same_title_lessons_do_not_shadow_each_other() {
    let t = TempRepo::new();
    t.repo.authenticate(ACCESS_CODE).await.unwrap();

    let first = t.repo.create_lesson(draft("Restaurant Talk")).await.unwrap();
    let second = t.repo.create_lesson(draft("Restaurant Talk")).await.unwrap();

    assert_ne!(first.id, second.id);
    assert!(t.repo.get_lesson(&first.id).await.is_ok());
    assert!(t.repo.get_lesson(&second.id).await.is_ok());
}

#[tokio::test]
async fn empty_title_is_rejected() {
    let t = TempRepo::new();
    assert!(t.repo.create_lesson(draft("   ")).await.is_err());
}

#[tokio::test]
async fn unknown_lesson_is_not_found() {
    let t = TempRepo::new();
    let result = t.repo.get_lesson("no-such-lesson").await;
    assert!(matches!(result, Err(PortError::NotFound(_))));
}

#[tokio::test]
async fn subscription_upgrade_persists() {
    let t = TempRepo::new();
    t.repo.authenticate(ACCESS_CODE).await.unwrap();

    let user = t
        .repo
        .change_subscription(PlanUpgrade::Immersion)
        .await
        .unwrap();
    assert_eq!(user.subscription, SubscriptionPlan::Immersion);
    assert_eq!(
        t.repo.current_user().await.subscription,
        SubscriptionPlan::Immersion
    );
}

#[tokio::test]
async fn reset_returns_to_the_zero_state() {
    let t = TempRepo::new();
    t.repo.authenticate(ACCESS_CODE).await.unwrap();
    t.repo
        .record_activity(ActivityKind::Quiz, "Quiz: warmup", 5.0, Some("pres-cont"))
        .await
        .unwrap();
    t.repo.create_lesson(draft("Restaurant Talk")).await.unwrap();

    t.repo.reset_all().await.unwrap();

    let user = t.repo.current_user().await;
    assert_eq!(user.xp, 0);
    assert_eq!(user.level, ProficiencyLevel::A1);
    assert!(user.logs.is_empty());
    assert!(user.completed.is_empty());

    // Custom lessons are gone; the built-in catalog survives.
    let lessons = t.repo.list_lessons().await.unwrap();
    assert!(lessons.iter().all(|lesson| !lesson.custom));
}

#[tokio::test]
async fn snapshot_reflects_the_store() {
    let t = TempRepo::new();
    t.repo.authenticate(ACCESS_CODE).await.unwrap();
    t.repo.create_lesson(draft("Restaurant Talk")).await.unwrap();

    let snapshot = t.repo.snapshot().await.unwrap();
    assert!(snapshot.authenticated);
    assert_eq!(snapshot.custom_lessons.len(), 1);
    assert_eq!(snapshot.user.xp, 250);
    assert!(snapshot.storage_usage.ends_with("KB"));
}

#[tokio::test]
async fn state_survives_a_reopen() {
    let t = TempRepo::new();
    t.repo.authenticate(ACCESS_CODE).await.unwrap();
    t.repo
        .record_activity(ActivityKind::Voice, "Live session", 25.0, None)
        .await
        .unwrap();

    let reopened = LocalRepository::open(&t.path, ACCESS_CODE);
    let user = reopened.current_user().await;
    assert_eq!(user.xp, 500);
    assert_eq!(user.logs.len(), 1);
}
