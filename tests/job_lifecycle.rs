use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use screenshot_jobs::client::simulated::Method;
use screenshot_jobs::{
    BackoffPolicy, Transport, BrowserTarget, ClientError, Credentials, JobClient, JobState, JobWatcher,
    RequestPayload, ScreenshotRequest, SimulatedTransport, TransportError, WatchError,
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

const JOB_ID: &str = "be9989892cbba9b9edc2c95f403050aa4996ac6a";

fn client(transport: &SimulatedTransport) -> JobClient {
    JobClient::with_transport(Credentials::new("alice", "k3y").unwrap(), transport.clone())
}

fn snapshot(state: &str, shots: &[&str]) -> Value {
    let screenshots: Vec<Value> = shots
        .iter()
        .enumerate()
        .map(|(i, shot_state)| {
            let image_url = if *shot_state == "done" {
                json!(format!("https://img.test/{i}.png"))
            } else {
                Value::Null
            };
            json!({
                "id": format!("shot-{i}"),
                "os": "Windows",
                "os_version": "7",
                "browser": "ie",
                "browser_version": "11.0",
                "url": "http://example.com",
                "state": shot_state,
                "image_url": image_url,
                "created_at": "2014-05-02 10:00:00 UTC"
            })
        })
        .collect();
    json!({ "id": JOB_ID, "state": state, "screenshots": screenshots })
}

fn fast_policy(timeout: Option<Duration>) -> BackoffPolicy {
    BackoffPolicy {
        initial: Duration::from_millis(1),
        max: Duration::from_millis(5),
        multiplier: 2.0,
        timeout,
    }
}

fn request() -> ScreenshotRequest {
    let mut request = ScreenshotRequest::new();
    request
        .set_url("http://example.com")
        .set_windows_resolution("1280x1024")
        .unwrap()
        .add_browser_target(BrowserTarget::new("Windows", "7").with_browser("ie").with_browser_version("11.0"))
        .unwrap();
    request
}

#[test]
fn empty_credentials_fail_before_any_call() {
    let transport = SimulatedTransport::new();

    assert!(matches!(
        Credentials::new("", "k3y"),
        Err(ClientError::InvalidCredentials)
    ));
    assert!(matches!(
        Credentials::new("alice", ""),
        Err(ClientError::InvalidCredentials)
    ));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn lists_supported_browsers_without_caching() {
    let transport = SimulatedTransport::new();
    transport.respond_get(
        "browsers.json",
        json!([
            {"os": "Windows", "os_version": "XP", "browser": "chrome", "device": null, "browser_version": "21.0"},
            {"os": "ios", "os_version": "6.0", "browser": "Mobile Safari", "device": "iPhone 4S (6.0)", "browser_version": null}
        ]),
    );
    let client = client(&transport);

    let browsers = client.list_supported_browsers().await.unwrap();
    assert_eq!(browsers.len(), 2);
    assert_eq!(browsers[1].device.as_deref(), Some("iPhone 4S (6.0)"));

    client.list_supported_browsers().await.unwrap();
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test]
async fn submit_posts_the_serialized_request() {
    let transport = SimulatedTransport::new();
    transport.respond_post(
        "",
        json!({
            "job_id": JOB_ID,
            "state": "queued_all",
            "win_res": "1280x1024",
            "screenshots": [
                {"id": "shot-0", "os": "Windows", "os_version": "7", "browser": "ie", "browser_version": "11.0", "state": "pending"}
            ]
        }),
    );
    let client = client(&transport);

    let handle = client.submit_request(&request()).await.unwrap();
    assert_eq!(handle.job_id, JOB_ID);
    assert_eq!(handle.state, Some(JobState::QueuedAll));
    assert_eq!(handle.screenshots[0].state, JobState::Pending);

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, Method::Post);
    assert_eq!(calls[0].username, "alice");

    let sent: Value = serde_json::from_str(calls[0].body.as_deref().unwrap()).unwrap();
    assert_eq!(
        sent,
        json!({
            "url": "http://example.com",
            "win_res": "1280x1024",
            "browsers": [{"os": "Windows", "os_version": "7", "browser": "ie", "browser_version": "11.0"}]
        })
    );
}

#[tokio::test]
async fn invalid_request_is_never_sent() {
    let transport = SimulatedTransport::new();
    let client = client(&transport);

    let mut request = ScreenshotRequest::new();
    request.set_url("http://example.com");

    let err = client.submit_request(&request).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn submit_accepts_a_parsed_payload() {
    let transport = SimulatedTransport::new();
    transport.respond_post("", json!({"job_id": "xyz"}));
    let client = client(&transport);

    let payload = RequestPayload::parse(
        r#"{"url": "http://example.com", "browsers": [{"os": "android", "os_version": "4.4", "device": "Nexus 5"}]}"#,
    )
    .unwrap();
    let handle = client.submit(&payload).await.unwrap();
    assert_eq!(handle.job_id, "xyz");
    assert!(handle.state.is_none());
}

#[tokio::test]
async fn job_info_reports_partial_results() {
    let transport = SimulatedTransport::new();
    transport.respond_get(&format!("{JOB_ID}.json"), snapshot("processing", &["done", "processing"]));
    let client = client(&transport);

    let job = client.get_job_info(JOB_ID).await.unwrap();
    assert_eq!(job.state, JobState::Processing);
    assert_eq!(job.progress(), (1, 2));
    assert_eq!(
        job.screenshots[0].image_url.as_deref(),
        Some("https://img.test/0.png")
    );
    assert!(job.screenshots[1].image_url.is_none());
}

#[tokio::test]
async fn is_finished_only_for_done() {
    let path = format!("{JOB_ID}.json");
    for (state, finished) in [
        ("queued_all", false),
        ("processing", false),
        ("error", false),
        ("timed-out", false),
        ("something-new", false),
        ("done", true),
    ] {
        let transport = SimulatedTransport::new();
        transport.respond_get(&path, snapshot(state, &[]));
        let client = client(&transport);

        assert_eq!(client.is_finished(JOB_ID).await.unwrap(), finished, "state {state}");
        assert_eq!(client.get_status(JOB_ID).await.unwrap().as_str(), state);
    }
}

#[tokio::test]
async fn remote_failures_propagate_unchanged() {
    let transport = SimulatedTransport::new();
    transport.fail(Method::Get, "missing.json", 404, "Job not found");
    let client = client(&transport);

    let err = client.get_status("missing").await.unwrap_err();
    match err {
        ClientError::Transport(TransportError::Status { status, body }) => {
            assert_eq!(status, 404);
            assert_eq!(body, "Job not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn watcher_polls_until_done() {
    let transport = SimulatedTransport::new();
    let path = format!("{JOB_ID}.json");
    transport
        .respond_get(&path, snapshot("queued_all", &["pending", "pending"]))
        .respond_get(&path, snapshot("processing", &["done", "processing"]))
        .respond_get(&path, snapshot("done", &["done", "done"]));

    let watcher = JobWatcher::new(client(&transport), fast_policy(Some(Duration::from_secs(5))));
    let job = watcher.watch(JOB_ID, &CancellationToken::new()).await.unwrap();

    assert_eq!(job.state, JobState::Done);
    assert_eq!(job.progress(), (2, 2));
    assert_eq!(transport.calls().len(), 3);
}

#[tokio::test]
async fn watcher_stops_on_error_state() {
    let transport = SimulatedTransport::new();
    let path = format!("{JOB_ID}.json");
    transport
        .respond_get(&path, snapshot("processing", &["processing"]))
        .respond_get(&path, snapshot("error", &["timed-out"]));

    let watcher = JobWatcher::new(client(&transport), fast_policy(None));
    let job = watcher.watch(JOB_ID, &CancellationToken::new()).await.unwrap();

    assert_eq!(job.state, JobState::Error);
    assert_eq!(job.screenshots[0].state, JobState::TimedOut);
}

#[tokio::test]
async fn watcher_times_out_with_last_state() {
    let transport = SimulatedTransport::new();
    transport.respond_get(&format!("{JOB_ID}.json"), snapshot("processing", &["processing"]));

    let watcher = JobWatcher::new(client(&transport), fast_policy(Some(Duration::from_millis(30))));
    let err = watcher.watch(JOB_ID, &CancellationToken::new()).await.unwrap_err();

    match err {
        WatchError::TimedOut { job_id, last_state, .. } => {
            assert_eq!(job_id, JOB_ID);
            assert_eq!(last_state, Some(JobState::Processing));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(transport.calls().len() > 1);
}

#[tokio::test]
async fn cancelled_watch_makes_no_calls() {
    let transport = SimulatedTransport::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let watcher = JobWatcher::new(client(&transport), fast_policy(None));
    let err = watcher.watch(JOB_ID, &cancel).await.unwrap_err();

    assert!(matches!(err, WatchError::Cancelled { .. }));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn watch_can_be_cancelled_while_waiting() {
    let transport = SimulatedTransport::new();
    transport.respond_get(&format!("{JOB_ID}.json"), snapshot("processing", &[]));

    let policy = BackoffPolicy {
        initial: Duration::from_secs(60),
        max: Duration::from_secs(60),
        multiplier: 1.0,
        timeout: None,
    };
    let watcher = JobWatcher::new(client(&transport), policy);
    let cancel = CancellationToken::new();

    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { watcher.watch(JOB_ID, &cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("watcher did not stop after cancellation")
        .expect("watcher task panicked");
    assert!(matches!(result, Err(WatchError::Cancelled { .. })));
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn watcher_propagates_client_errors() {
    let transport = SimulatedTransport::new();
    transport.fail(Method::Get, &format!("{JOB_ID}.json"), 401, "Unauthorized");

    let watcher = JobWatcher::new(client(&transport), fast_policy(None));
    let err = watcher.watch(JOB_ID, &CancellationToken::new()).await.unwrap_err();

    assert!(matches!(
        err,
        WatchError::Client(ClientError::Transport(TransportError::Status { status: 401, .. }))
    ));
    assert_eq!(transport.calls().len(), 1);
}

/// Answers the first poll at once, then stalls every later one.
struct StallingTransport {
    polls: Arc<AtomicUsize>,
    stall: Duration,
}

#[async_trait]
impl Transport for StallingTransport {
    async fn get_json(
        &self,
        _path: &str,
        _credentials: &Credentials,
    ) -> Result<Value, TransportError> {
        if self.polls.fetch_add(1, Ordering::SeqCst) > 0 {
            tokio::time::sleep(self.stall).await;
        }
        Ok(snapshot("processing", &["processing"]))
    }

    async fn post_json(
        &self,
        _path: &str,
        _body: &str,
        _credentials: &Credentials,
    ) -> Result<Value, TransportError> {
        Ok(json!({"job_id": JOB_ID}))
    }
}

#[tokio::test]
async fn watcher_timeout_bounds_a_slow_poll() {
    let polls = Arc::new(AtomicUsize::new(0));
    let transport = StallingTransport {
        polls: polls.clone(),
        stall: Duration::from_secs(5),
    };
    let client = JobClient::with_transport(Credentials::new("alice", "k3y").unwrap(), transport);
    let watcher = JobWatcher::new(client, fast_policy(Some(Duration::from_millis(50))));

    let started = Instant::now();
    let err = watcher.watch(JOB_ID, &CancellationToken::new()).await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(elapsed < Duration::from_secs(1), "watch overran its timeout: {elapsed:?}");
    match err {
        WatchError::TimedOut { timeout, last_state, .. } => {
            assert_eq!(timeout, Duration::from_millis(50));
            assert_eq!(last_state, Some(JobState::Processing));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(polls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn watcher_times_out_before_first_answer() {
    let polls = Arc::new(AtomicUsize::new(1));
    let transport = StallingTransport {
        polls: polls.clone(),
        stall: Duration::from_secs(5),
    };
    let client = JobClient::with_transport(Credentials::new("alice", "k3y").unwrap(), transport);
    let watcher = JobWatcher::new(client, fast_policy(Some(Duration::from_millis(30))));

    let err = watcher.watch(JOB_ID, &CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, WatchError::TimedOut { last_state: None, .. }));
}

#[tokio::test]
async fn job_ids_that_escape_the_base_path_are_rejected() {
    let transport = SimulatedTransport::new();
    let client = client(&transport);

    for bad in ["", "../x", "a/b", "a\\b"] {
        let err = client.get_job_info(bad).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidJobId { .. }), "{bad:?}: {err:?}");
    }
    assert!(transport.calls().is_empty());
}
