// SPDX-FileCopyrightText: 2026 Outreach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the SQLite storage adapter.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::json;
use tempfile::TempDir;

use outreach_config::model::StorageConfig;
use outreach_core::types::{
    Channel, Direction, Enrollment, EnrollmentKey, EnrollmentStatus, MessageRole, NewCommunication,
    NewLead, ReleaseOutcome, StepUpdate, TouchTemplate,
};
use outreach_core::{
    CommunicationRepository, ConversationRepository, EnrollmentStore, LeadRepository,
    NotificationRepository, OutreachError, TemplateCatalog,
};
use outreach_storage::SqliteStorage;

async fn open_storage() -> (SqliteStorage, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        database_path: dir.path().join("test.db").to_string_lossy().into_owned(),
        wal_mode: true,
    };
    let storage = SqliteStorage::open(&config).await.unwrap();
    (storage, dir)
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

fn template(campaign: &str, order: u32, delay_hours: f64) -> TouchTemplate {
    TouchTemplate {
        campaign_id: campaign.to_string(),
        sequence_order: order,
        delay_hours,
        channel: Channel::Email,
        subject: Some(format!("step {order}")),
        content: format!("touch {order}"),
    }
}

#[tokio::test]
async fn lead_create_and_find() {
    let (storage, _dir) = open_storage().await;
    let lead = LeadRepository::create(
        &storage,
        NewLead {
            name: "Ann".into(),
            email: Some("ann@example.com".into()),
            phone: None,
            source: "chat_widget".into(),
            metadata: json!({"page": "/pricing"}),
        },
    )
    .await
    .unwrap();

    let found = storage.find_by_id(&lead.id).await.unwrap().unwrap();
    assert_eq!(found, lead);
    assert!(storage.find_by_id("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn conversation_messages_keep_append_order() {
    let (storage, _dir) = open_storage().await;
    let lead = LeadRepository::create(&storage, NewLead::default()).await.unwrap();
    let conversation = ConversationRepository::create(&storage, &lead.id, Channel::Chat, "chat")
        .await
        .unwrap();

    storage
        .append_message(&conversation.id, MessageRole::User, "hi")
        .await
        .unwrap();
    storage
        .append_message(&conversation.id, MessageRole::Assistant, "hello!")
        .await
        .unwrap();

    let loaded = storage
        .find_by_lead_and_channel(&lead.id, Channel::Chat)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.id, conversation.id);
    let roles: Vec<_> = loaded.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);
    assert_eq!(loaded.messages[1].content, "hello!");

    assert!(
        storage
            .find_by_lead_and_channel(&lead.id, Channel::Email)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn append_to_unknown_conversation_is_not_found() {
    let (storage, _dir) = open_storage().await;
    let err = storage
        .append_message("nope", MessageRole::User, "hi")
        .await
        .unwrap_err();
    assert!(matches!(err, OutreachError::NotFound { entity: "conversation", .. }));
}

#[tokio::test]
async fn communications_are_listed_per_lead() {
    let (storage, _dir) = open_storage().await;
    for (lead, direction) in [
        ("lead-1", Direction::Inbound),
        ("lead-1", Direction::Outbound),
        ("lead-2", Direction::Outbound),
    ] {
        CommunicationRepository::create(
            &storage,
            NewCommunication {
                lead_id: lead.into(),
                channel: Channel::Chat,
                direction,
                content: "x".into(),
                status: "delivered".into(),
                provider_id: None,
                metadata: json!({}),
            },
        )
        .await
        .unwrap();
    }

    let records = storage.list_for_lead("lead-1").await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].direction, Direction::Inbound);
    assert_eq!(records[1].direction, Direction::Outbound);
}

#[tokio::test]
async fn notifications_are_scoped_to_their_user() {
    let (storage, _dir) = open_storage().await;
    let mine = storage.create_notification("u1", "New lead", "Ann").await.unwrap();
    storage.create_notification("u1", "Reply", "Bob").await.unwrap();
    let theirs = storage.create_notification("u2", "New lead", "Cy").await.unwrap();

    assert!(!storage.mark_read("u1", &theirs.id).await.unwrap());
    assert!(storage.mark_read("u1", &mine.id).await.unwrap());
    assert_eq!(storage.mark_all_read("u1").await.unwrap(), 1);
    assert!(storage.list_notifications("u1").await.unwrap().iter().all(|n| n.read));
    assert!(!storage.list_notifications("u2").await.unwrap()[0].read);

    assert!(!storage.delete("u1", &theirs.id).await.unwrap());
    assert!(storage.delete("u2", &theirs.id).await.unwrap());
    assert!(storage.list_notifications("u2").await.unwrap().is_empty());
}

#[tokio::test]
async fn templates_are_ordered_and_upserted() {
    let (storage, _dir) = open_storage().await;
    storage.upsert_template(&template("c1", 2, 48.0)).await.unwrap();
    storage.upsert_template(&template("c1", 1, 24.0)).await.unwrap();
    storage.upsert_template(&template("c1", 1, 12.0)).await.unwrap();

    let all = storage.list_templates("c1").await.unwrap();
    assert_eq!(all.iter().map(|t| t.sequence_order).collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(all[0].delay_hours, 12.0);
    assert!(storage.get_template("c1", 3).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_enrollment_is_a_conflict() {
    let (storage, _dir) = open_storage().await;
    let enrollment = Enrollment::new("lead-1", "c1", t0(), t0());
    storage.create_enrollment(&enrollment).await.unwrap();
    let err = storage.create_enrollment(&enrollment).await.unwrap_err();
    assert!(matches!(err, OutreachError::Conflict(_)));
}

#[tokio::test]
async fn due_selection_respects_time_status_and_claims() {
    let (storage, _dir) = open_storage().await;
    let now = t0();
    storage
        .create_enrollment(&Enrollment::new("due", "c1", now - Duration::hours(1), now))
        .await
        .unwrap();
    storage
        .create_enrollment(&Enrollment::new("future", "c1", now + Duration::hours(1), now))
        .await
        .unwrap();
    storage
        .create_enrollment(&Enrollment::new("claimed", "c1", now, now))
        .await
        .unwrap();
    let claimed = EnrollmentKey::new("claimed", "c1");
    assert!(storage.claim(&claimed, 0, now, now + Duration::minutes(5)).await.unwrap());

    let due = storage.due_enrollments(now).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].lead_id, "due");

    // An expired claim makes the row selectable again.
    let later = now + Duration::minutes(6);
    let due_later: Vec<_> = storage
        .due_enrollments(later)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.lead_id)
        .collect();
    assert_eq!(due_later, vec!["due".to_string(), "claimed".to_string()]);
}

#[tokio::test]
async fn unreadable_due_row_does_not_hide_others() {
    let (storage, _dir) = open_storage().await;
    let now = t0();
    storage
        .create_enrollment(&Enrollment::new("good", "c1", now, now))
        .await
        .unwrap();

    // A six digit year sorts before every four digit one and cannot be parsed.
    storage
        .database()
        .connection()
        .call(|conn| {
            conn.execute(
                "INSERT INTO enrollments
                 (lead_id, campaign_id, current_step, status, next_touch_at, attempts,
                  created_at, updated_at)
                 VALUES ('broken', 'c1', 1, 'in_progress', '+262142-12-31T23:59:59.999Z', 0,
                         '2026-03-01T09:00:00.000Z', '2026-03-01T09:00:00.000Z')",
                [],
            )
        })
        .await
        .unwrap();

    let due = storage.due_enrollments(now).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].lead_id, "good");
}

#[tokio::test]
async fn far_future_due_time_is_stored_clamped() {
    let (storage, _dir) = open_storage().await;
    let now = t0();
    let key = EnrollmentKey::new("lead-1", "c1");
    storage
        .create_enrollment(&Enrollment::new("lead-1", "c1", now, now))
        .await
        .unwrap();

    assert!(storage.claim(&key, 0, now, now + Duration::minutes(5)).await.unwrap());
    let update = StepUpdate::scheduled(1, DateTime::<Utc>::MAX_UTC);
    assert!(storage.advance(&key, 0, &update).await.unwrap());

    let row = storage.get_enrollment(&key).await.unwrap().unwrap();
    assert_eq!(row.next_touch_at, Some(outreach_core::types::latest_timestamp()));
    assert!(storage.due_enrollments(now + Duration::days(365)).await.unwrap().is_empty());
}

#[tokio::test]
async fn claim_and_advance_are_compare_and_set() {
    let (storage, _dir) = open_storage().await;
    let now = t0();
    let key = EnrollmentKey::new("lead-1", "c1");
    storage
        .create_enrollment(&Enrollment::new("lead-1", "c1", now, now))
        .await
        .unwrap();

    let until = now + Duration::minutes(5);
    assert!(storage.claim(&key, 0, now, until).await.unwrap());
    assert!(!storage.claim(&key, 0, now, until).await.unwrap(), "lease is held");

    let next = now + Duration::hours(24);
    assert!(storage.advance(&key, 0, &StepUpdate::scheduled(1, next)).await.unwrap());
    assert!(
        !storage.advance(&key, 0, &StepUpdate::scheduled(1, next)).await.unwrap(),
        "stale step must lose"
    );

    let row = storage.get_enrollment(&key).await.unwrap().unwrap();
    assert_eq!(row.current_step, 1);
    assert_eq!(row.status, EnrollmentStatus::InProgress);
    assert_eq!(row.next_touch_at, Some(next));
    assert_eq!(row.claimed_until, None);
    assert_eq!(row.attempts, 0);

    assert!(storage.advance(&key, 1, &StepUpdate::completed(2)).await.unwrap());
    let row = storage.get_enrollment(&key).await.unwrap().unwrap();
    assert_eq!(row.status, EnrollmentStatus::Completed);
    assert_eq!(row.next_touch_at, None);
    assert!(storage.due_enrollments(now + Duration::days(365)).await.unwrap().is_empty());
}

#[tokio::test]
async fn release_counts_attempts_until_failed() {
    let (storage, _dir) = open_storage().await;
    let now = t0();
    let key = EnrollmentKey::new("lead-1", "c1");
    storage
        .create_enrollment(&Enrollment::new("lead-1", "c1", now, now))
        .await
        .unwrap();

    for expected in 1..3 {
        assert!(storage.claim(&key, 0, now, now + Duration::minutes(5)).await.unwrap());
        assert_eq!(
            storage.release(&key, 0, 3).await.unwrap(),
            ReleaseOutcome::Retry { attempts: expected }
        );
    }
    let row = storage.get_enrollment(&key).await.unwrap().unwrap();
    assert_eq!(row.current_step, 0);
    assert_eq!(row.next_touch_at, Some(now));
    assert_eq!(row.claimed_until, None);

    assert_eq!(
        storage.release(&key, 0, 3).await.unwrap(),
        ReleaseOutcome::Failed { attempts: 3 }
    );
    let row = storage.get_enrollment(&key).await.unwrap().unwrap();
    assert_eq!(row.status, EnrollmentStatus::Failed);
    assert_eq!(row.next_touch_at, None);

    assert_eq!(storage.release(&key, 0, 3).await.unwrap(), ReleaseOutcome::Stale);
}

#[tokio::test]
async fn unlimited_attempts_never_fail() {
    let (storage, _dir) = open_storage().await;
    let now = t0();
    let key = EnrollmentKey::new("lead-1", "c1");
    storage
        .create_enrollment(&Enrollment::new("lead-1", "c1", now, now))
        .await
        .unwrap();
    for expected in 1..=20 {
        assert_eq!(
            storage.release(&key, 0, 0).await.unwrap(),
            ReleaseOutcome::Retry { attempts: expected }
        );
    }
}
