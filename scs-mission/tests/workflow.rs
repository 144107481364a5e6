use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use scs_blob::{
    BlobError, BlobResult, BlobStore, ByteStream, IncidentKeyStrategy, MemoryBlobStore, PublicUrl,
    PutObject, PutResult,
};
use scs_core::{
    CallerContext, CandidateFile, CompleteStepRequest, ErrorKind, Incident, IncidentGuidance,
    IncidentGuidanceStep, IncidentId, IncidentMedia, MediaKind, MemoryStore, MissionError,
    MissionService, MissionStore, StepId, StoreError, StoreResult, UserId, ValidatedFile,
};
use scs_mission::media::MediaValidator;
use scs_mission::services::missions::{MissionWorkflow, MissionsService};
use serde_json::json;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR";

async fn seeded_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.insert_incident(Incident::new("I1", "Gate breach")).await.unwrap();
    store
        .insert_guidance(
            IncidentGuidance::new("M1", "I1", "T1")
                .assigned("boss", "u-1")
                .with_step("S1", 1, "Secure the area")
                .with_step("S2", 2, "Report"),
        )
        .await
        .unwrap();
    store
        .insert_guidance(
            IncidentGuidance::new("M2", "I1", "T2")
                .assigned("boss", "u-2")
                .with_step("S3", 1, "Check cameras"),
        )
        .await
        .unwrap();
    Arc::new(store)
}

fn urls() -> PublicUrl {
    PublicUrl::new("http://localhost:9000", "media")
}

fn workflow(store: Arc<dyn MissionStore>, blobs: Arc<dyn BlobStore>) -> MissionWorkflow {
    MissionWorkflow::new(store, blobs, Arc::new(IncidentKeyStrategy), urls())
}

fn png_of_size(size: usize) -> Bytes {
    let mut data = PNG.to_vec();
    data.resize(size, 0);
    Bytes::from(data)
}

fn validated(name: &str, content: Bytes) -> ValidatedFile {
    MediaValidator::default()
        .validate(CandidateFile::new(name, content))
        .unwrap()
}

fn mp4() -> Bytes {
    let mut data = vec![0, 0, 0, 0x1C];
    data.extend_from_slice(b"ftypisom");
    data.extend_from_slice(&[0, 0, 2, 0]);
    data.extend_from_slice(b"isomiso2mp41");
    Bytes::from(data)
}

fn kind(err: &anyhow::Error) -> ErrorKind {
    MissionError::kind_of(err)
}

fn message(err: &anyhow::Error) -> String {
    MissionError::find(err).map(|e| e.message.clone()).unwrap_or_default()
}

async fn step(store: &MemoryStore, id: &str) -> IncidentGuidanceStep {
    store.get_step_by_id(&StepId::new(id)).await.unwrap()
}

// ---- Step completion ----

#[tokio::test]
async fn completing_a_step_latches_it_once() {
    let store = seeded_store().await;
    let wf = workflow(store.clone(), Arc::new(MemoryBlobStore::new("media")));
    let ctx = CallerContext::new();

    wf.complete_step(&ctx, "M1", "S1").await.unwrap();
    let s1 = step(&store, "S1").await;
    assert!(s1.is_completed);
    assert!(s1.completed_at.is_some());

    let err = wf.complete_step(&ctx, "M1", "S1").await.unwrap_err();
    assert_eq!(kind(&err), ErrorKind::Validation);
    assert_eq!(message(&err), "step already completed");
    assert_eq!(step(&store, "S1").await.completed_at, s1.completed_at);
    assert!(!step(&store, "S2").await.is_completed);
}

#[tokio::test]
async fn steps_of_another_mission_are_refused() {
    let store = seeded_store().await;
    let wf = workflow(store.clone(), Arc::new(MemoryBlobStore::new("media")));

    let err = wf
        .complete_step(&CallerContext::new(), "M1", "S3")
        .await
        .unwrap_err();

    assert_eq!(kind(&err), ErrorKind::Validation);
    assert_eq!(message(&err), "step does not belong to the mission");
    assert!(!step(&store, "S3").await.is_completed);
}

#[tokio::test]
async fn mission_ids_compare_normalized() {
    let store = seeded_store().await;
    let wf = workflow(store.clone(), Arc::new(MemoryBlobStore::new("media")));

    wf.complete_step(&CallerContext::new(), " m1 ", "S2").await.unwrap();
    assert!(step(&store, "S2").await.is_completed);
}

#[tokio::test]
async fn unknown_step_is_not_found() {
    let store = seeded_store().await;
    let wf = workflow(store, Arc::new(MemoryBlobStore::new("media")));

    let err = wf
        .complete_step(&CallerContext::new(), "M1", "S404")
        .await
        .unwrap_err();
    assert_eq!(kind(&err), ErrorKind::NotFound);
}

/// Store that pauses after every step read, so concurrent completions
/// both see the step as open.
struct SlowReads {
    inner: Arc<MemoryStore>,
}

#[async_trait]
impl MissionStore for SlowReads {
    async fn get_step_by_id(&self, id: &StepId) -> StoreResult<IncidentGuidanceStep> {
        let step = self.inner.get_step_by_id(id).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        step
    }

    async fn update_step_completed(&self, id: &StepId, completed_at: DateTime<Utc>) -> StoreResult<()> {
        self.inner.update_step_completed(id, completed_at).await
    }

    async fn get_incident_by_id(&self, id: &IncidentId) -> StoreResult<Incident> {
        self.inner.get_incident_by_id(id).await
    }

    async fn batch_insert_media(&self, media: &[IncidentMedia]) -> StoreResult<()> {
        self.inner.batch_insert_media(media).await
    }

    async fn get_guidance_by_assignee(&self, assignee: &UserId) -> StoreResult<Vec<IncidentGuidance>> {
        self.inner.get_guidance_by_assignee(assignee).await
    }
}

#[tokio::test]
async fn concurrent_completions_latch_once() {
    let inner = seeded_store().await;
    let store = Arc::new(SlowReads { inner: inner.clone() });
    let wf = workflow(store, Arc::new(MemoryBlobStore::new("media")));
    let (c1, c2) = (CallerContext::new(), CallerContext::new());

    let (first, second) = tokio::join!(
        wf.complete_step(&c1, "M1", "S1"),
        wf.complete_step(&c2, "M1", "S1"),
    );

    let results = [first, second];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let err = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(kind(err), ErrorKind::Validation);
    assert_eq!(message(err), "step already completed");
    assert!(step(&inner, "S1").await.is_completed);
}

// ---- Assignments ----

#[tokio::test]
async fn assignments_are_filtered_by_caller() {
    let store = seeded_store().await;
    let service = MissionsService::new(
        MediaValidator::default(),
        workflow(store, Arc::new(MemoryBlobStore::new("media"))),
    );

    let mine = service
        .get_assignments(&CallerContext::new().with_caller("u-1"))
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id.as_str(), "M1");
    let steps: Vec<_> = mine[0]
        .incident_guidance_steps
        .iter()
        .map(|s| s.id.as_str())
        .collect();
    assert_eq!(steps, vec!["S1", "S2"]);

    let none = service
        .get_assignments(&CallerContext::new().with_caller("u-9"))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn assignments_need_a_caller() {
    let store = seeded_store().await;
    let service = MissionsService::new(
        MediaValidator::default(),
        workflow(store, Arc::new(MemoryBlobStore::new("media"))),
    );

    let err = service.get_assignments(&CallerContext::new()).await.unwrap_err();
    assert_eq!(kind(&err), ErrorKind::NotAuthenticated);
}

// ---- Incident media ----

#[tokio::test]
async fn uploaded_photo_becomes_one_media_row() {
    let store = seeded_store().await;
    let blobs = Arc::new(MemoryBlobStore::new("media"));
    let wf = workflow(store.clone(), blobs.clone());

    let photo = validated("photo.png", png_of_size(2 * 1024 * 1024));
    let media = wf
        .update_incident_info(&CallerContext::new(), "I1", vec![photo])
        .await
        .unwrap();

    assert_eq!(media.len(), 1);
    let row = &media[0];
    assert_eq!(row.file_name, "I1/photo.png");
    assert_eq!(row.media_type, MediaKind::Image);
    assert_eq!(row.file_type, "image/png");
    assert_eq!(row.file_url, "http://localhost:9000/media/I1/photo.png");

    let stored = blobs.get("I1/photo.png").await.unwrap();
    assert_eq!(row.file_size as usize, stored.data.len());
    assert_eq!(store.media_for(&IncidentId::new("I1")).await, media);
}

#[tokio::test]
async fn media_is_classified_coarsely() {
    let store = seeded_store().await;
    let wf = workflow(store.clone(), Arc::new(MemoryBlobStore::new("media")));

    let files = vec![
        validated("clip.mp4", mp4()),
        validated("anim.gif", Bytes::from_static(b"GIF89a\x01\x00\x01\x00")),
        validated("cam.jpg", Bytes::from_static(b"\xFF\xD8\xFF\xE0\x00\x10JFIF")),
    ];
    let media = wf
        .update_incident_info(&CallerContext::new(), "I1", files)
        .await
        .unwrap();

    let kinds: Vec<_> = media.iter().map(|m| m.media_type).collect();
    assert_eq!(kinds, vec![MediaKind::Video, MediaKind::Other, MediaKind::Image]);
    assert_eq!(store.media().await.len(), 3);
}

#[tokio::test]
async fn missing_incident_uploads_nothing() {
    let store = seeded_store().await;
    let blobs = Arc::new(MemoryBlobStore::new("media"));
    let wf = workflow(store.clone(), blobs.clone());

    let err = wf
        .update_incident_info(
            &CallerContext::new(),
            "I2",
            vec![validated("photo.png", png_of_size(64))],
        )
        .await
        .unwrap_err();

    assert_eq!(kind(&err), ErrorKind::Validation);
    assert_eq!(message(&err), "incident not found");
    assert!(blobs.is_empty().await);
    assert!(store.media().await.is_empty());
}

#[tokio::test]
async fn empty_upload_checks_the_incident_and_writes_nothing() {
    let store = seeded_store().await;
    let blobs = Arc::new(MemoryBlobStore::new("media"));
    let wf = workflow(store.clone(), blobs.clone());

    let media = wf
        .update_incident_info(&CallerContext::new(), "I1", Vec::new())
        .await
        .unwrap();
    assert!(media.is_empty());
    assert!(store.media().await.is_empty());

    let err = wf
        .update_incident_info(&CallerContext::new(), "I2", Vec::new())
        .await
        .unwrap_err();
    assert_eq!(message(&err), "incident not found");
}

#[tokio::test]
async fn validator_rejects_before_any_upload() {
    let store = seeded_store().await;
    let blobs = Arc::new(MemoryBlobStore::new("media"));
    let service = MissionsService::new(MediaValidator::default(), workflow(store, blobs.clone()));
    let ctx = CallerContext::new();

    let oversized = CandidateFile::new("big.png", png_of_size(64)).with_declared_size(10 * 1024 * 1024 + 1);
    let err = service
        .update_incident_info(&ctx, "I1", vec![CandidateFile::new("ok.png", png_of_size(64)), oversized])
        .await
        .unwrap_err();
    assert_eq!(message(&err), "file size exceeds 10MB");

    let disguised = CandidateFile::new("photo.jpg", Bytes::from_static(b"%PDF-1.7 report"));
    let err = service
        .update_incident_info(&ctx, "I1", vec![disguised])
        .await
        .unwrap_err();
    assert_eq!(message(&err), "invalid file type: only image and video allowed");

    assert!(blobs.is_empty().await);
}

// ---- Failure semantics ----

/// Blob store that fails the n-th upload (0-based).
struct FlakyBlobs {
    inner: MemoryBlobStore,
    fail_on: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl BlobStore for FlakyBlobs {
    async fn put_object(&self, put: PutObject, stream: ByteStream) -> BlobResult<PutResult> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == self.fail_on {
            return Err(BlobError::upload_failed(put.key, "connection reset"));
        }
        self.inner.put_object(put, stream).await
    }

    fn bucket(&self) -> &str {
        self.inner.bucket()
    }
}

#[tokio::test]
async fn failed_upload_reports_what_was_already_stored() {
    let store = seeded_store().await;
    let blobs = Arc::new(FlakyBlobs {
        inner: MemoryBlobStore::new("media"),
        fail_on: 1,
        calls: AtomicUsize::new(0),
    });
    let wf = workflow(store.clone(), blobs.clone());

    let err = wf
        .update_incident_info(
            &CallerContext::new(),
            "I1",
            vec![
                validated("a.png", png_of_size(32)),
                validated("b.png", png_of_size(32)),
                validated("c.png", png_of_size(32)),
            ],
        )
        .await
        .unwrap_err();

    assert_eq!(kind(&err), ErrorKind::Storage);
    let details = MissionError::find(&err).unwrap().details.clone().unwrap();
    assert_eq!(details["uploaded"], json!(["I1/a.png"]));

    // No rollback of earlier objects, and no rows without a full batch.
    assert_eq!(blobs.inner.keys().await, vec!["I1/a.png".to_string()]);
    assert_eq!(blobs.calls.load(Ordering::SeqCst), 2);
    assert!(store.media().await.is_empty());
}

/// Relational store whose batch insert always fails.
struct BrokenLedger {
    inner: Arc<MemoryStore>,
}

#[async_trait]
impl MissionStore for BrokenLedger {
    async fn get_step_by_id(&self, id: &StepId) -> StoreResult<IncidentGuidanceStep> {
        self.inner.get_step_by_id(id).await
    }

    async fn update_step_completed(&self, _id: &StepId, _completed_at: DateTime<Utc>) -> StoreResult<()> {
        Err(StoreError::backend(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "connection lost",
        )))
    }

    async fn get_incident_by_id(&self, id: &IncidentId) -> StoreResult<Incident> {
        self.inner.get_incident_by_id(id).await
    }

    async fn batch_insert_media(&self, _media: &[IncidentMedia]) -> StoreResult<()> {
        Err(StoreError::backend(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "connection lost",
        )))
    }

    async fn get_guidance_by_assignee(&self, assignee: &UserId) -> StoreResult<Vec<IncidentGuidance>> {
        self.inner.get_guidance_by_assignee(assignee).await
    }
}

#[tokio::test]
async fn store_failures_keep_their_kind_and_operation() {
    let inner = seeded_store().await;
    let store = Arc::new(BrokenLedger { inner: inner.clone() });
    let wf = workflow(store, Arc::new(MemoryBlobStore::new("media")));

    let err = wf
        .update_incident_info(&CallerContext::new(), "I1", vec![validated("a.png", png_of_size(16))])
        .await
        .unwrap_err();
    let found = MissionError::find(&err).unwrap();
    assert_eq!(found.kind, ErrorKind::Storage);
    assert_eq!(found.operation, Some("create incident media"));
    assert_eq!(found.details.as_ref().unwrap()["uploaded"], json!(["I1/a.png"]));

    let err = wf
        .complete_step(&CallerContext::new(), "M1", "S1")
        .await
        .unwrap_err();
    assert_eq!(kind(&err), ErrorKind::Storage);
    assert!(!step(&inner, "S1").await.is_completed);
}

// ---- Cancellation ----

/// Blob store whose uploads never finish.
struct StalledBlobs {
    started: AtomicUsize,
}

#[async_trait]
impl BlobStore for StalledBlobs {
    async fn put_object(&self, _put: PutObject, _stream: ByteStream) -> BlobResult<PutResult> {
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    fn bucket(&self) -> &str {
        "media"
    }
}

#[tokio::test]
async fn cancellation_mid_upload_skips_the_batch_insert() {
    let store = seeded_store().await;
    let blobs = Arc::new(StalledBlobs {
        started: AtomicUsize::new(0),
    });
    let wf = workflow(store.clone(), blobs.clone());

    let ctx = CallerContext::new();
    let token = ctx.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });

    let err = wf
        .update_incident_info(&ctx, "I1", vec![validated("a.png", png_of_size(16))])
        .await
        .unwrap_err();

    assert_eq!(kind(&err), ErrorKind::Cancelled);
    assert_eq!(blobs.started.load(Ordering::SeqCst), 1);
    assert!(store.media().await.is_empty());
}

#[tokio::test]
async fn deadline_expiry_is_a_cancellation() {
    let store = seeded_store().await;
    let blobs = Arc::new(StalledBlobs {
        started: AtomicUsize::new(0),
    });
    let wf = workflow(store.clone(), blobs);

    let ctx = CallerContext::new().with_timeout(Duration::from_millis(20));
    let err = wf
        .update_incident_info(&ctx, "I1", vec![validated("a.png", png_of_size(16))])
        .await
        .unwrap_err();

    assert_eq!(kind(&err), ErrorKind::Cancelled);
    assert!(store.media().await.is_empty());
}

#[tokio::test]
async fn cancelled_requests_touch_nothing() {
    let store = seeded_store().await;
    let blobs = Arc::new(MemoryBlobStore::new("media"));
    let service = MissionsService::new(MediaValidator::default(), workflow(store.clone(), blobs.clone()));

    let ctx = CallerContext::new();
    ctx.cancel.cancel();

    let err = service
        .complete_step(
            &ctx,
            CompleteStepRequest {
                mission_id: "M1".into(),
                step_id: "S1".into(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(kind(&err), ErrorKind::Cancelled);
    assert!(!step(&store, "S1").await.is_completed);

    let err = service
        .update_incident_info(&ctx, "I1", vec![CandidateFile::new("a.png", png_of_size(16))])
        .await
        .unwrap_err();
    assert_eq!(kind(&err), ErrorKind::Cancelled);
    assert!(blobs.is_empty().await);
}
