//! Tests against a live Redis server. They return early when `REDIS_URL`
//! is not set.

use loadtest_generator::SpanGenerator;
use loadtest_pipeline::{BatchPipeline, EntryReader, FlushOutcome, FlushPolicy, PipelineStats};
use loadtest_pipeline_redis::{open_pipeline, RedisConfig, RedisReader, RedisStore};
use span_record::Span;
use std::sync::Arc;
use std::time::Duration;

fn redis_config() -> Option<RedisConfig> {
    std::env::var("REDIS_URL").ok().map(RedisConfig::new)
}

#[tokio::test]
async fn spans_round_trip_through_redis() {
    let Some(config) = redis_config() else {
        return;
    };
    let policy = FlushPolicy {
        batch_size: 100,
        interval: Duration::from_secs(3600),
        ttl: Some(Duration::from_secs(60)),
    };
    let (pipeline, reader) = open_pipeline(config, policy, Arc::new(PipelineStats::new()))
        .await
        .unwrap();

    let mut generator = SpanGenerator::from_entropy();
    let spans: Vec<_> = generator.trace(10).collect();
    for generated in &spans {
        pipeline
            .put(&generated.key.group_id, &generated.key.item_id, &generated.span)
            .await
            .unwrap();
    }
    assert_eq!(pipeline.force_flush().await, FlushOutcome::Committed(10));

    for generated in &spans {
        let bytes = reader
            .get(&generated.key.storage_key())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(Span::from_bytes(&bytes).unwrap(), generated.span);
    }
    assert!(reader.count().await.unwrap() >= 10);
    assert!(reader.first_entry().await.unwrap().is_some());

    pipeline.close().await.unwrap();
    pipeline.close().await.unwrap();
}

#[tokio::test]
async fn check_connection_succeeds_on_live_server() {
    let Some(config) = redis_config() else {
        return;
    };
    let mut store = RedisStore::connect(config).await.unwrap();
    store.check_connection().await.unwrap();
}

#[tokio::test]
async fn connect_to_closed_port_fails() {
    if redis_config().is_none() {
        return;
    }
    let result = RedisStore::connect(RedisConfig::new("redis://127.0.0.1:1/0")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn reader_reconnects_after_connection_is_killed() {
    let Some(config) = redis_config() else {
        return;
    };
    let reader = RedisReader::connect(&config).await.unwrap();
    let id = reader.client_id().await.unwrap();

    let client = redis::Client::open(config.url.as_str()).unwrap();
    let mut admin = client.get_multiplexed_async_connection().await.unwrap();
    let killed: u64 = redis::cmd("CLIENT")
        .arg("KILL")
        .arg("ID")
        .arg(id)
        .query_async(&mut admin)
        .await
        .unwrap();
    assert_eq!(killed, 1);

    assert_eq!(reader.get("kv-loadtest-missing-key").await.unwrap(), None);
    assert_ne!(reader.client_id().await.unwrap(), id);
}
