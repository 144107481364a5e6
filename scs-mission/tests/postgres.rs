//! Runs against a live database when `SCS__DATABASE__URL` is set; every
//! test returns early otherwise. Rows are keyed by fresh UUIDs, so runs do
//! not interfere with each other.

use chrono::{DateTime, Duration, Utc};
use scs_core::{IncidentId, IncidentMedia, MediaId, MediaKind, MissionStore, StepId, UserId};
use scs_mission::services::adapters::PostgresStore;
use sqlx::postgres::PgPool;
use uuid::Uuid;

async fn connect() -> Option<(PostgresStore, PgPool)> {
    let Ok(url) = std::env::var("SCS__DATABASE__URL") else {
        eprintln!("SCS__DATABASE__URL not set, skipping");
        return None;
    };
    let store = PostgresStore::connect(&url, 4).await.unwrap();
    store.migrate().await.unwrap();
    let seed = PgPool::connect(&url).await.unwrap();
    Some((store, seed))
}

async fn seed_incident(pool: &PgPool) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO incidents (id, name) VALUES ($1, 'Gate breach')")
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
    id
}

async fn seed_guidance(pool: &PgPool, incident: Uuid, assignee: Uuid, created_at: DateTime<Utc>) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO incident_guidances
            (id, incident_id, guidance_template_id, assignee_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $5)
        "#,
    )
    .bind(id)
    .bind(incident)
    .bind(Uuid::new_v4())
    .bind(assignee)
    .bind(created_at)
    .execute(pool)
    .await
    .unwrap();
    id
}

async fn seed_step(pool: &PgPool, guidance: Uuid, step_number: i64) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO incident_guidance_steps (id, incident_guidance_id, step_number, title) VALUES ($1, $2, $3, 'Secure the area')",
    )
    .bind(id)
    .bind(guidance)
    .bind(step_number)
    .execute(pool)
    .await
    .unwrap();
    id
}

fn media(incident: Uuid, name: &str) -> IncidentMedia {
    IncidentMedia {
        id: MediaId::generate(),
        incident_id: IncidentId::new(incident.to_string()),
        media_type: MediaKind::Image,
        file_url: format!("http://localhost:9000/media/{incident}/{name}"),
        file_size: 42,
        file_type: "image/png".to_string(),
        file_name: format!("{incident}/{name}"),
        created_at: Utc::now(),
    }
}

async fn media_count(pool: &PgPool, incident: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM incident_media WHERE incident_id = $1")
        .bind(incident)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn step_latch_flips_once() {
    let Some((store, pool)) = connect().await else { return };
    let incident = seed_incident(&pool).await;
    let guidance = seed_guidance(&pool, incident, Uuid::new_v4(), Utc::now()).await;
    let step = StepId::new(seed_step(&pool, guidance, 1).await.to_string());

    store.update_step_completed(&step, Utc::now()).await.unwrap();
    let first = store.get_step_by_id(&step).await.unwrap();
    assert!(first.is_completed);
    assert!(first.completed_at.is_some());

    let err = store
        .update_step_completed(&step, Utc::now() + Duration::seconds(5))
        .await
        .unwrap_err();
    assert!(err.is_already_completed());
    assert_eq!(store.get_step_by_id(&step).await.unwrap().completed_at, first.completed_at);

    let missing = StepId::new(Uuid::new_v4().to_string());
    assert!(store.update_step_completed(&missing, Utc::now()).await.unwrap_err().is_not_found());
    assert!(store
        .update_step_completed(&StepId::new("S1"), Utc::now())
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn concurrent_latches_let_exactly_one_through() {
    let Some((store, pool)) = connect().await else { return };
    let incident = seed_incident(&pool).await;
    let guidance = seed_guidance(&pool, incident, Uuid::new_v4(), Utc::now()).await;
    let step = StepId::new(seed_step(&pool, guidance, 1).await.to_string());

    let (a, b) = tokio::join!(
        store.update_step_completed(&step, Utc::now()),
        store.update_step_completed(&step, Utc::now()),
    );
    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| e.is_already_completed()));
}

#[tokio::test]
async fn failed_batch_insert_rolls_back_every_row() {
    let Some((store, pool)) = connect().await else { return };
    let incident = seed_incident(&pool).await;

    // The second row violates the incident foreign key.
    let err = store
        .batch_insert_media(&[media(incident, "a.png"), media(Uuid::new_v4(), "b.png")])
        .await
        .unwrap_err();
    assert!(!err.is_not_found());
    assert_eq!(media_count(&pool, incident).await, 0);

    store
        .batch_insert_media(&[media(incident, "a.png"), media(incident, "b.png")])
        .await
        .unwrap();
    assert_eq!(media_count(&pool, incident).await, 2);
}

#[tokio::test]
async fn assignments_come_back_in_creation_and_step_order() {
    let Some((store, pool)) = connect().await else { return };
    let incident = seed_incident(&pool).await;
    let guard = Uuid::new_v4();
    let now = Utc::now();

    let late = seed_guidance(&pool, incident, guard, now).await;
    let early = seed_guidance(&pool, incident, guard, now - Duration::hours(1)).await;
    seed_guidance(&pool, incident, Uuid::new_v4(), now).await;
    seed_step(&pool, early, 2).await;
    seed_step(&pool, early, 1).await;
    seed_step(&pool, late, 1).await;

    let mine = store
        .get_guidance_by_assignee(&UserId::new(guard.to_string()))
        .await
        .unwrap();

    let ids: Vec<String> = mine.iter().map(|g| g.id.to_string()).collect();
    assert_eq!(ids, vec![early.to_string(), late.to_string()]);
    let numbers: Vec<i64> = mine[0].incident_guidance_steps.iter().map(|s| s.step_number).collect();
    assert_eq!(numbers, vec![1, 2]);
    assert_eq!(mine[1].incident_guidance_steps.len(), 1);

    let nobody = store
        .get_guidance_by_assignee(&UserId::new("not-a-uuid"))
        .await
        .unwrap();
    assert!(nobody.is_empty());
}
