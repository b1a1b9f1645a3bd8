//! Router-level tests: requests go through the full middleware stack against
//! an in-memory job database.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tscribe_api::{create_router, ApiConfig, AppState, WebhookVerifier, SIGNATURE_HEADER};
use tscribe_dispatch::{DispatchClient, DispatchConfig, Dispatcher, NoopDispatcher};
use tscribe_models::{CanonicalUrl, Job, JobId, JobStatus, ModelSize, Transition};
use tscribe_store::{
    CreateOutcome, Database, JobPage, JobStore, NewJob, PageRequest, SqliteJobStore, StoreError,
    StoreResult,
};

const SECRET: &str = "test-webhook-secret";
const VIDEO: &str = "https://youtu.be/abc12345678";
const CANONICAL: &str = "https://www.youtube.com/watch?v=abc12345678";

// ============================================================================
// Harness
// ============================================================================

/// SQLite store wrapper that counts calls and can inject failures.
struct TestStore {
    inner: SqliteJobStore,
    calls: AtomicUsize,
    fail_lookup: bool,
    fail_create: bool,
}

impl TestStore {
    fn new() -> Self {
        Self {
            inner: SqliteJobStore::new(Database::open_in_memory().expect("in-memory db")),
            calls: AtomicUsize::new(0),
            fail_lookup: false,
            fail_create: false,
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl JobStore for TestStore {
    async fn create(&self, job: NewJob) -> StoreResult<CreateOutcome> {
        self.touch();
        if self.fail_create {
            return Err(StoreError::LockPoisoned);
        }
        self.inner.create(job).await
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<Job>> {
        self.touch();
        self.inner.get(id).await
    }

    async fn find_active(
        &self,
        video_url: &CanonicalUrl,
        model_size: ModelSize,
    ) -> StoreResult<Option<Job>> {
        self.touch();
        if self.fail_lookup {
            return Err(StoreError::Task("lookup unavailable".into()));
        }
        self.inner.find_active(video_url, model_size).await
    }

    async fn apply_transition(&self, id: &JobId, transition: Transition) -> StoreResult<Job> {
        self.touch();
        self.inner.apply_transition(id, transition).await
    }

    async fn list(&self, page: PageRequest) -> StoreResult<JobPage> {
        self.touch();
        self.inner.list(page).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }
}

fn test_config() -> ApiConfig {
    ApiConfig {
        webhook_secret: SECRET.to_string(),
        public_base_url: "https://tscribe.test".to_string(),
        rate_limit_rps: 1000,
        ..Default::default()
    }
}

fn router(config: ApiConfig, store: Arc<TestStore>, dispatcher: Arc<dyn Dispatcher>) -> Router {
    create_router(AppState::from_parts(config, store, dispatcher), None)
}

fn default_app() -> (Router, Arc<TestStore>) {
    let store = Arc::new(TestStore::new());
    let app = router(test_config(), store.clone(), Arc::new(NoopDispatcher));
    (app, store)
}

fn dispatcher_for(server: &MockServer) -> Arc<dyn Dispatcher> {
    let client = DispatchClient::new(DispatchConfig {
        api_base: server.uri(),
        repo: Some("acme/transcriber".into()),
        token: Some("token".into()),
        timeout: Duration::from_secs(2),
        ..Default::default()
    })
    .expect("dispatch client");
    Arc::new(client)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("router error");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };
    (status, body)
}

fn submit_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/submit")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn signed_webhook(body: &Value) -> Request<Body> {
    let raw = body.to_string();
    let signature = WebhookVerifier::new(SECRET)
        .sign(raw.as_bytes())
        .expect("sign");
    webhook_request(raw, Some(signature))
}

fn webhook_request(raw: String, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/webhook")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    builder.body(Body::from(raw)).unwrap()
}

fn completed_payload(job_id: &str) -> Value {
    json!({
        "job_id": job_id,
        "status": "completed",
        "transcript_url": "https://cdn.example/t.json",
        "audio_url": "https://cdn.example/a.m4a",
        "srt_url": "https://cdn.example/t.srt",
        "txt_url": "https://cdn.example/t.txt",
        "video_title": "Never Gonna Give You Up",
        "video_duration": 212.0,
        "processing_time": 48.5
    })
}

async fn submit(app: &Router, video_url: &str) -> (StatusCode, Value) {
    send(app, submit_request(json!({ "video_url": video_url }))).await
}

fn job_id_of(body: &Value) -> String {
    body["data"]["job_id"]
        .as_str()
        .expect("job_id in response")
        .to_string()
}

async fn wait_for_requests(server: &MockServer, count: usize) -> usize {
    for _ in 0..100 {
        let received = server.received_requests().await.unwrap_or_default().len();
        if received >= count {
            return received;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    server.received_requests().await.unwrap_or_default().len()
}

// ============================================================================
// Submission
// ============================================================================

/// A new submission is created, stored in canonical form and dispatched.
#[tokio::test]
async fn test_submit_creates_and_dispatches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/repos/acme/transcriber/dispatches"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let store = Arc::new(TestStore::new());
    let app = router(test_config(), store.clone(), dispatcher_for(&server));

    let (status, body) = send(
        &app,
        submit_request(json!({ "video_url": VIDEO, "model_size": "small", "language": "en" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "pending");
    assert!(body.get("message").is_none());

    let id = job_id_of(&body);
    let job = store
        .inner
        .get(&JobId::parse(&id).expect("uuid job id"))
        .await
        .unwrap()
        .expect("stored job");
    assert_eq!(job.video_url, CANONICAL);
    assert_eq!(job.model_size, ModelSize::Small);

    assert_eq!(wait_for_requests(&server, 1).await, 1);
    let requests = server.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(sent["event_type"], "transcription_job");
    assert_eq!(sent["client_payload"]["job_id"], id.as_str());
    assert_eq!(sent["client_payload"]["video_url"], CANONICAL);
    assert_eq!(
        sent["client_payload"]["webhook_url"],
        "https://tscribe.test/api/webhook"
    );
}

/// Resubmitting the same video and model while pending returns the same job.
#[tokio::test]
async fn test_duplicate_submission_is_recovered() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let store = Arc::new(TestStore::new());
    let app = router(test_config(), store.clone(), dispatcher_for(&server));

    let (first_status, first) = submit(&app, VIDEO).await;
    let (second_status, second) =
        submit(&app, "https://www.youtube.com/watch?v=abc12345678&t=30").await;
    let (third_status, third) = submit(&app, "https://youtube.com/shorts/abc12345678").await;

    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(third_status, StatusCode::OK);
    assert_eq!(second["message"], "Job recovered from cache");
    assert_eq!(job_id_of(&first), job_id_of(&second));
    assert_eq!(job_id_of(&first), job_id_of(&third));

    let page = store.inner.list(PageRequest::default()).await.unwrap();
    assert_eq!(page.total, 1);

    // Only the first submission triggers the worker
    wait_for_requests(&server, 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

/// A different model size is a different job.
#[tokio::test]
async fn test_model_size_separates_jobs() {
    let (app, _) = default_app();

    let (_, medium) = submit(&app, VIDEO).await;
    let (status, tiny) = send(
        &app,
        submit_request(json!({ "video_url": VIDEO, "model_size": "tiny" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(job_id_of(&medium), job_id_of(&tiny));
}

/// After a failure, the same video can be submitted again.
#[tokio::test]
async fn test_failed_job_allows_resubmission() {
    let (app, _) = default_app();

    let (_, first) = submit(&app, VIDEO).await;
    let first_id = job_id_of(&first);

    let (status, _) = send(
        &app,
        signed_webhook(&json!({
            "job_id": first_id,
            "status": "failed",
            "error_code": "DOWNLOAD_FAILED",
            "error_message": "HTTP Error 403"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, second) = submit(&app, VIDEO).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(job_id_of(&second), first_id);
}

/// Invalid input is rejected before the store is touched.
#[tokio::test]
async fn test_invalid_submissions_rejected() {
    let (app, store) = default_app();

    let cases = [
        json!({ "video_url": "https://vimeo.com/123456" }),
        json!({ "video_url": "https://youtube.com/watch?v=short" }),
        json!({ "video_url": "" }),
        json!({ "model_size": "medium" }),
        json!({ "video_url": VIDEO, "model_size": "huge" }),
        json!({ "video_url": VIDEO, "language": "en_US" }),
        json!({ "video_url": VIDEO, "language": "" }),
    ];

    for case in cases {
        let (status, body) = send(&app, submit_request(case.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "case: {}", case);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "INVALID_URL", "case: {}", case);
        assert!(body["timestamp"].is_i64());
    }

    let (status, body) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/api/submit")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_URL");

    assert_eq!(store.calls(), 0);
}

/// Any well-formed language tag is stored and forwarded as given.
#[tokio::test]
async fn test_submit_accepts_language_tags() {
    let (app, store) = default_app();

    for (language, model_size) in [("pt", "tiny"), ("nl", "base"), ("en-US", "small")] {
        let (status, body) = send(
            &app,
            submit_request(json!({
                "video_url": VIDEO,
                "model_size": model_size,
                "language": language
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "language: {}", language);

        let job_id = JobId::parse(&job_id_of(&body)).unwrap();
        let job = store.inner.get(&job_id).await.unwrap().unwrap();
        assert_eq!(job.language.as_str(), language);
    }
}

/// Model size error lists the accepted values.
#[tokio::test]
async fn test_invalid_model_size_message() {
    let (app, _) = default_app();
    let (_, body) = send(
        &app,
        submit_request(json!({ "video_url": VIDEO, "model_size": "xl" })),
    )
    .await;

    assert_eq!(
        body["error"]["message"],
        "Invalid model_size. Must be one of: tiny, base, small, medium, large-v3"
    );
}

/// A failing dedup lookup does not block submission.
#[tokio::test]
async fn test_dedup_lookup_failure_falls_through() {
    let store = Arc::new(TestStore {
        fail_lookup: true,
        ..TestStore::new()
    });
    let app = router(test_config(), store.clone(), Arc::new(NoopDispatcher));

    let (status, first) = submit(&app, VIDEO).await;
    assert_eq!(status, StatusCode::CREATED);

    // The unique index still prevents a second live job
    let (status, second) = submit(&app, VIDEO).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(job_id_of(&first), job_id_of(&second));
    assert_eq!(store.inner.list(PageRequest::default()).await.unwrap().total, 1);
}

/// A store failure on create is a database error.
#[tokio::test]
async fn test_create_failure_is_database_error() {
    let store = Arc::new(TestStore {
        fail_create: true,
        ..TestStore::new()
    });
    let app = router(test_config(), store, Arc::new(NoopDispatcher));

    let (status, body) = submit(&app, VIDEO).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "DATABASE_ERROR");
}

/// Internal detail is shown in development and withheld in production.
#[tokio::test]
async fn test_internal_error_detail_hidden_in_production() {
    let failing = || {
        Arc::new(TestStore {
            fail_create: true,
            ..TestStore::new()
        })
    };

    let app = router(test_config(), failing(), Arc::new(NoopDispatcher));
    let (_, body) = submit(&app, VIDEO).await;
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Database error"));

    let production = ApiConfig {
        environment: "Production".to_string(),
        ..test_config()
    };
    let app = router(production, failing(), Arc::new(NoopDispatcher));
    let (status, body) = submit(&app, VIDEO).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "DATABASE_ERROR");
    assert_eq!(body["error"]["message"], "An internal error occurred");
    assert_eq!(body["success"], false);
}

/// Dispatch failure does not change the response; the job stays pending.
#[tokio::test]
async fn test_dispatch_failure_is_swallowed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let app = router(test_config(), Arc::new(TestStore::new()), dispatcher_for(&server));

    let (status, body) = submit(&app, VIDEO).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "pending");

    wait_for_requests(&server, 1).await;

    let id = job_id_of(&body);
    let (status, body) = send(&app, get_request(&format!("/api/status/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "pending");
}

// ============================================================================
// Status and history
// ============================================================================

#[tokio::test]
async fn test_status_lookup() {
    let (app, _) = default_app();

    let (_, created) = submit(&app, VIDEO).await;
    let id = job_id_of(&created);

    let (status, body) = send(&app, get_request(&format!("/api/status/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id.as_str());
    assert_eq!(body["data"]["video_url"], CANONICAL);
    assert_eq!(body["data"]["model_size"], "medium");
    assert_eq!(body["data"]["language"], "auto");
    assert!(body["data"]["created_at"].is_i64());
}

#[tokio::test]
async fn test_status_unknown_and_malformed_ids() {
    let (app, _) = default_app();

    let unknown = format!("/api/status/{}", JobId::new());
    let (status, body) = send(&app, get_request(&unknown)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "VIDEO_NOT_FOUND");

    let (status, body) = send(&app, get_request("/api/status/not-a-job")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_URL");
}

#[tokio::test]
async fn test_history_paginates_and_clamps() {
    let (app, _) = default_app();

    for id in ["aaaaaaaaaa1", "aaaaaaaaaa2", "aaaaaaaaaa3"] {
        submit(&app, &format!("https://youtu.be/{}", id)).await;
    }

    let (status, body) = send(&app, get_request("/api/history?limit=2&offset=1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 3);
    assert_eq!(body["data"]["limit"], 2);
    assert_eq!(body["data"]["offset"], 1);
    assert_eq!(body["data"]["jobs"].as_array().unwrap().len(), 2);
    assert_eq!(
        body["data"]["jobs"][0]["video_url"],
        "https://www.youtube.com/watch?v=aaaaaaaaaa2"
    );

    let (_, body) = send(&app, get_request("/api/history?limit=500&offset=-3")).await;
    assert_eq!(body["data"]["limit"], 100);
    assert_eq!(body["data"]["offset"], 0);

    let (_, body) = send(&app, get_request("/api/history?limit=abc")).await;
    assert_eq!(body["data"]["limit"], 20);
}

// ============================================================================
// Webhook
// ============================================================================

/// A signed completion callback completes the job.
#[tokio::test]
async fn test_webhook_completes_job() {
    let (app, _) = default_app();
    let (_, created) = submit(&app, VIDEO).await;
    let id = job_id_of(&created);

    let (status, body) = send(&app, signed_webhook(&completed_payload(&id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Job updated successfully");

    let (_, body) = send(&app, get_request(&format!("/api/status/{}", id))).await;
    assert_eq!(body["data"]["status"], "completed");
    assert_eq!(body["data"]["transcript_url"], "https://cdn.example/t.json");
    assert_eq!(body["data"]["video_duration"], 212.0);
    assert!(body["data"].get("error_code").is_none());
}

/// Callbacks may only request a terminal status.
#[tokio::test]
async fn test_webhook_processing_status_rejected() {
    let (app, store) = default_app();
    let (_, created) = submit(&app, VIDEO).await;
    let id = job_id_of(&created);

    let (status, body) = send(
        &app,
        signed_webhook(&json!({ "job_id": id, "status": "processing" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_STATUS");

    let job_id = JobId::parse(&id).unwrap();
    let job = store.inner.get(&job_id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Pending);

    let (status, _) = send(&app, signed_webhook(&completed_payload(&id))).await;
    assert_eq!(status, StatusCode::OK);
}

/// A second completion is rejected and the first results are kept.
#[tokio::test]
async fn test_webhook_double_completion_rejected() {
    let (app, store) = default_app();
    let (_, created) = submit(&app, VIDEO).await;
    let id = job_id_of(&created);

    send(&app, signed_webhook(&completed_payload(&id))).await;
    let job_id = JobId::parse(&id).unwrap();
    let before = store.inner.get(&job_id).await.unwrap().unwrap();

    let mut replay = completed_payload(&id);
    replay["transcript_url"] = json!("https://evil.example/t.json");
    let (status, body) = send(&app, signed_webhook(&replay)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_PAYLOAD");
    assert_eq!(store.inner.get(&job_id).await.unwrap().unwrap(), before);
}

/// Failure details are stored structured, or as an opaque string.
#[tokio::test]
async fn test_webhook_failure_details() {
    let (app, _) = default_app();
    let (_, a) = submit(&app, VIDEO).await;
    let (_, b) = submit(&app, "https://youtu.be/zzzzzzzzzzz").await;
    let a = job_id_of(&a);
    let b = job_id_of(&b);

    for (id, details) in [
        (&a, json!({ "stage": "download", "http_status": 403 })),
        (&b, json!("yt-dlp: unavailable")),
    ] {
        let (status, _) = send(
            &app,
            signed_webhook(&json!({
                "job_id": id,
                "status": "failed",
                "error_code": "DOWNLOAD_FAILED",
                "error_message": "Video unavailable",
                "error_details": details
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = send(&app, get_request(&format!("/api/status/{}", a))).await;
    assert_eq!(body["data"]["status"], "failed");
    assert_eq!(body["data"]["error_details"]["http_status"], 403);

    let (_, body) = send(&app, get_request(&format!("/api/status/{}", b))).await;
    assert_eq!(body["data"]["error_details"], "yt-dlp: unavailable");
}

/// Bad or missing signatures are rejected without touching the store.
#[tokio::test]
async fn test_webhook_bad_signature_rejected() {
    let (app, store) = default_app();
    let (_, created) = submit(&app, VIDEO).await;
    let id = job_id_of(&created);
    let calls_before = store.calls();

    let raw = completed_payload(&id).to_string();
    let wrong = WebhookVerifier::new("wrong-secret").sign(raw.as_bytes()).unwrap();

    for signature in [Some(wrong), Some("zz-not-hex".to_string()), None] {
        let (status, body) = send(&app, webhook_request(raw.clone(), signature)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "WEBHOOK_INVALID");
    }

    assert_eq!(store.calls(), calls_before);
    let job = store
        .inner
        .get(&JobId::parse(&id).unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(job.status, JobStatus::Pending);
}

/// Without a configured secret every callback is rejected.
#[tokio::test]
async fn test_webhook_without_secret_fails_closed() {
    let store = Arc::new(TestStore::new());
    let config = ApiConfig {
        webhook_secret: String::new(),
        ..test_config()
    };
    let app = router(config, store.clone(), Arc::new(NoopDispatcher));

    let payload = completed_payload(&JobId::new().to_string());
    let (status, body) = send(&app, signed_webhook(&payload)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "WEBHOOK_INVALID");
    assert_eq!(store.calls(), 0);
}

/// Unknown job ids are not found and nothing is written.
#[tokio::test]
async fn test_webhook_unknown_job() {
    let (app, store) = default_app();

    let (status, body) = send(
        &app,
        signed_webhook(&completed_payload(&JobId::new().to_string())),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "VIDEO_NOT_FOUND");
    assert_eq!(store.inner.list(PageRequest::default()).await.unwrap().total, 0);
}

#[tokio::test]
async fn test_webhook_malformed_payloads() {
    let (app, _) = default_app();
    let (_, created) = submit(&app, VIDEO).await;
    let id = job_id_of(&created);

    let (status, body) = send(&app, signed_webhook(&json!({ "status": "completed" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_URL");
    assert_eq!(body["error"]["message"], "Missing required fields: job_id, status");

    let (status, body) = send(
        &app,
        signed_webhook(&json!({ "job_id": id, "status": "cancelled" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_STATUS");

    let (status, body) = send(
        &app,
        signed_webhook(&json!({ "job_id": id, "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_PAYLOAD");
}

// ============================================================================
// Operational endpoints and middleware
// ============================================================================

#[tokio::test]
async fn test_health_and_ready() {
    let (app, _) = default_app();

    let response = app.clone().oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("X-Content-Type-Options").unwrap(),
        "nosniff"
    );
    assert!(response.headers().get("X-Request-ID").is_some());

    let (status, body) = send(&app, get_request("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"]["status"], "ok");
}

#[tokio::test]
async fn test_rate_limit_per_client() {
    let store = Arc::new(TestStore::new());
    let config = ApiConfig {
        rate_limit_rps: 1,
        ..test_config()
    };
    let app = router(config, store, Arc::new(NoopDispatcher));

    let from = |ip: &str| {
        Request::builder()
            .uri("/api/history")
            .header("X-Forwarded-For", ip)
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = send(&app, from("203.0.113.9")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, from("203.0.113.9")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "RATE_LIMITED");

    let (status, _) = send(&app, from("198.51.100.1")).await;
    assert_eq!(status, StatusCode::OK);
}
