//! Trigger surface served on an ephemeral port and driven over HTTP.

use kv_loadtest::config::AppConfig;
use kv_loadtest::loadtest::{build_coordinator, build_orchestrator};
use kv_loadtest::server::{self, AppState};
use kv_loadtest::{BackendKind, BackendSet, JobTracker};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

struct TestServer {
    base: String,
    shutdown: CancellationToken,
    backends: BackendSet,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl TestServer {
    /// Serve `kinds` on 127.0.0.1. The fan-out targets this server itself.
    async fn start(config: AppConfig, kinds: &[BackendKind]) -> Self {
        Self::start_with_peers(config, kinds, &["self"]).await
    }

    /// Serve `kinds` with one static peer per name, all pointing back at
    /// this server.
    async fn start_with_peers(mut config: AppConfig, kinds: &[BackendKind], peers: &[&str]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        config.fanout.peer_port = port;
        config.fanout.static_peers = peers.iter().map(|name| format!("{name}=127.0.0.1")).collect();

        let shutdown = CancellationToken::new();
        let backends = BackendSet::open(&config, kinds, shutdown.clone())
            .await
            .unwrap();
        let state = AppState {
            orchestrator: Arc::new(build_orchestrator(&config, &backends)),
            jobs: Arc::new(JobTracker::default()),
            fanout: Arc::new(build_coordinator(&config).unwrap()),
            metrics: backends.prometheus(),
            spans_per_trace: config.traces.spans_per_trace,
            compaction_levels: config.fjall.compaction_levels,
        };
        let handle = tokio::spawn(server::serve(listener, state, shutdown.clone()));

        Self {
            base: format!("http://127.0.0.1:{port}"),
            shutdown,
            backends,
            handle,
        }
    }

    async fn get(&self, path: &str) -> (u16, String) {
        let response = reqwest::get(format!("{}{path}", self.base)).await.unwrap();
        let status = response.status().as_u16();
        (status, response.text().await.unwrap())
    }

    /// Poll `/jobs/{id}` until the job leaves the running state.
    async fn wait_for_job(&self, id: &str) -> serde_json::Value {
        for _ in 0..200 {
            let (status, body) = self.get(&format!("/jobs/{id}")).await;
            assert_eq!(status, 200, "{body}");
            let record: serde_json::Value = serde_json::from_str(&body).unwrap();
            if record["status"]["state"] != "running" {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!("job {id} did not finish");
    }

    async fn stop(self) {
        self.shutdown.cancel();
        self.handle.await.unwrap().unwrap();
        self.backends.shutdown().await;
    }
}

/// The job id is the last word of an accepted response.
fn job_id(body: &str) -> String {
    body.rsplit(' ').next().unwrap().to_string()
}

#[tokio::test]
async fn test_health_and_memory_load() {
    let server = TestServer::start(AppConfig::default(), &[BackendKind::Memory]).await;

    assert_eq!(server.get("/healthz").await, (200, "pong".to_string()));

    let (status, body) = server.get("/gen-memory-load?traceCount=3").await;
    assert_eq!(status, 202);
    assert!(body.starts_with("accepted: 3 traces for memory"), "{body}");

    let record = server.wait_for_job(&job_id(&body)).await;
    assert_eq!(record["kind"], "generate");
    assert_eq!(record["status"]["state"], "succeeded");
    assert_eq!(record["status"]["report"]["records_written"], 30);

    let (status, metrics) = server.get("/metrics").await;
    assert_eq!(status, 200);
    assert!(metrics.contains("loadtest_write_requests_total"), "{metrics}");

    server.stop().await;
}

#[tokio::test]
async fn test_missing_count_defaults_to_two() {
    let server = TestServer::start(AppConfig::default(), &[BackendKind::Memory]).await;

    let (status, body) = server.get("/gen-memory-load?traceCount=zero").await;
    assert_eq!(status, 202);
    assert!(body.starts_with("accepted: 2 traces"), "{body}");

    server.stop().await;
}

#[tokio::test]
async fn test_disabled_backend_and_unknown_jobs() {
    let server = TestServer::start(AppConfig::default(), &[BackendKind::Memory]).await;

    assert_eq!(server.get("/gen-badger-load?traceCount=1").await.0, 404);
    assert_eq!(server.get("/gen-redis-load").await.0, 404);
    assert_eq!(server.get("/get-badger-total-count").await.0, 404);
    assert_eq!(server.get("/badger-start-gc").await.0, 404);
    assert_eq!(server.get("/jobs/not-a-uuid").await.0, 400);
    let unknown = uuid::Uuid::new_v4();
    assert_eq!(server.get(&format!("/jobs/{unknown}")).await.0, 404);

    server.stop().await;
}

#[tokio::test]
async fn test_fjall_routes() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.fjall.path = dir.path().join("fjall");
    config.traces.sync_interval = 50;
    let server = TestServer::start(config, &[BackendKind::Fjall]).await;

    assert_eq!(server.get("/get-badger-random-data").await.0, 404);
    assert_eq!(server.get("/get-badger-data").await.0, 400);
    assert_eq!(server.get("/get-badger-data?id=missing").await.0, 404);

    let (status, body) = server.get("/gen-badger-load?traceCount=2").await;
    assert_eq!(status, 202);
    let record = server.wait_for_job(&job_id(&body)).await;
    assert_eq!(record["status"]["report"]["records_written"], 20);

    // The driver commits the tail of the run on its next tick.
    let mut count = String::new();
    for _ in 0..100 {
        count = server.get("/get-badger-total-count").await.1;
        if count == "Count: 20" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert_eq!(count, "Count: 20");

    let (status, body) = server.get("/get-badger-random-data").await;
    assert_eq!(status, 200);
    assert!(body.starts_with("Key: "), "{body}");
    let key = body["Key: ".len()..].split(',').next().unwrap().to_string();
    let (status, value) = server.get(&format!("/get-badger-data?id={key}")).await;
    assert_eq!(status, 200);
    assert!(value.contains("zk-db-test"), "{value}");

    let (status, body) = server.get("/badger-start-compaction").await;
    assert_eq!(status, 202);
    let record = server.wait_for_job(&job_id(&body)).await;
    assert_eq!(record["kind"], "compaction");
    assert_eq!(record["status"]["state"], "succeeded");

    let (status, body) = server.get("/badger-start-gc").await;
    assert_eq!(status, 202);
    let record = server.wait_for_job(&job_id(&body)).await;
    assert_eq!(record["status"]["report"]["expired_removed"], 0);

    server.stop().await;
}

#[tokio::test]
async fn test_fanout_reaches_self() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut config = AppConfig::default();
    config.fjall.path = dir.path().join("fjall");
    let server = TestServer::start(config, &[BackendKind::Fjall, BackendKind::Memory]).await;

    let (status, body) = server.get("/gen-badger-load-all?traceCount=4").await;
    assert_eq!(status, 202);
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 2, "{body}");
    assert_eq!(lines[0], "accepted for all pods: 1 replica, 4 traces each, 0 failed");
    assert!(lines[1].starts_with("PodName: self, IP: 127.0.0.1"), "{body}");
    assert!(lines[1].contains("accepted: 4 traces for fjall"), "{body}");

    // Redis is not enabled here, so the replica answers 404.
    let (status, body) = server.get("/gen-redis-load-all?traceCountPerPod=1").await;
    assert_eq!(status, 202);
    assert!(body.starts_with("accepted for all pods: 1 replica, 1 traces each, 1 failed"), "{body}");

    server.stop().await;
}

#[tokio::test]
async fn test_fanout_share_of_zero_generates_nothing() {
    let server = TestServer::start_with_peers(
        AppConfig::default(),
        &[BackendKind::Memory],
        &["pod-a", "pod-b", "pod-c"],
    )
    .await;

    let (status, body) = server.get("/gen-memory-load-all?traceCount=2").await;
    assert_eq!(status, 202);
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(
        lines[0],
        "accepted for all pods: 3 replicas, 0 traces each, 0 failed, 3 skipped"
    );
    assert_eq!(lines.len(), 4, "{body}");
    assert!(lines[1..].iter().all(|line| line.ends_with("Status: skipped, 0 traces")), "{body}");

    let (status, body) = server.get("/gen-memory-load-all?traceCount=6").await;
    assert_eq!(status, 202);
    assert!(body.starts_with("accepted for all pods: 3 replicas, 2 traces each, 0 failed"), "{body}");
    assert_eq!(body.matches("accepted: 2 traces for memory").count(), 3, "{body}");

    server.stop().await;
}
