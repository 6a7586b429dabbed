mod common;

use std::sync::Arc;
use std::time::Duration;

use rust_quant_monitor::api::EngineApi;
use rust_quant_monitor::model::DecisionLogResponse;
use rust_quant_monitor::sync::{PollSettings, Poller, ViewStore};

use common::{decision, live_state, server_error, FakeEngine, Reply};

fn settings() -> PollSettings {
    PollSettings {
        state_interval: Duration::from_millis(2000),
        log_interval: Duration::from_millis(3000),
        log_limit: 80,
    }
}

async fn advance(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

#[tokio::test(start_paused = true)]
async fn test_slow_first_tick_does_not_overwrite_newer_state() {
    let engine = FakeEngine::new();
    let a = live_state(1_000_000.0, vec![1_000_000.0]);
    let b = live_state(1_010_000.0, vec![1_000_000.0, 1_010_000.0]);
    // tick1 在 3000ms 才返回 A，tick2 在 2100ms 返回 B
    engine.state.push(Reply::ok(a).after(3000));
    engine.state.push(Reply::ok(b.clone()).after(100));
    engine.state.set_fallback(Ok(b));

    let store = ViewStore::new();
    let api: Arc<dyn EngineApi> = engine.clone();
    let mut poller = Poller::new(api, store.clone(), settings());
    poller.start().unwrap();

    advance(2500).await;
    assert_eq!(store.snapshot().portfolio_value, 1_010_000.0);

    // A 在 3000ms 到达，序号更小，被丢弃
    advance(1000).await;
    let view = store.snapshot();
    assert_eq!(view.portfolio_value, 1_010_000.0);
    assert_eq!(view.equity.len(), 2);

    poller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_response_after_stop_is_discarded() {
    let engine = FakeEngine::new();
    engine
        .state
        .push(Reply::ok(live_state(500.0, vec![500.0])).after(500));

    let store = ViewStore::new();
    let api: Arc<dyn EngineApi> = engine.clone();
    let mut poller = Poller::new(api, store.clone(), settings());
    poller.start().unwrap();

    advance(100).await;
    poller.stop().await;
    assert!(!poller.is_running());

    advance(10_000).await;
    assert_eq!(store.snapshot().portfolio_value, 0.0);
    assert_eq!(engine.calls("state"), 1);
    assert_eq!(engine.calls("engine_log"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_restart_does_not_duplicate_timers() {
    let engine = FakeEngine::new();
    let store = ViewStore::new();
    let api: Arc<dyn EngineApi> = engine.clone();
    let mut poller = Poller::new(api, store.clone(), settings());

    poller.start().unwrap();
    poller.start().unwrap();
    advance(4100).await;
    // 0 / 2000 / 4000
    assert_eq!(engine.calls("state"), 3);

    poller.stop().await;
    poller.start().unwrap();
    advance(2050).await;
    assert_eq!(engine.calls("state"), 5);

    poller.stop().await;
    advance(10_000).await;
    assert_eq!(engine.calls("state"), 5);
}

#[tokio::test(start_paused = true)]
async fn test_poll_failure_keeps_last_good_state() {
    let engine = FakeEngine::new();
    let good = live_state(1_000.0, vec![1_000.0]);
    engine.state.push(Reply::ok(good.clone()));
    engine.state.push(Reply::err(server_error(500, "engine down")));
    engine.state.set_fallback(Ok(live_state(1_100.0, vec![1_000.0, 1_100.0])));

    let store = ViewStore::new();
    let api: Arc<dyn EngineApi> = engine.clone();
    let mut poller = Poller::new(api, store.clone(), settings());
    poller.start().unwrap();

    advance(2500).await;
    let view = store.snapshot();
    assert_eq!(view.state_poll_error.as_deref(), Some("engine down"));
    assert_eq!(view.portfolio_value, 1_000.0);

    advance(2000).await;
    let view = store.snapshot();
    assert!(view.state_poll_error.is_none());
    assert_eq!(view.portfolio_value, 1_100.0);

    poller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_decision_log_is_newest_first() {
    let engine = FakeEngine::new();
    engine.engine_log.set_fallback(Ok(DecisionLogResponse {
        logs: vec![
            decision("2024-01-01", "held"),
            decision("2024-01-02", "rebalanced"),
            decision("2024-01-03", "cut risk"),
        ],
    }));

    let store = ViewStore::new();
    let api: Arc<dyn EngineApi> = engine.clone();
    let mut poller = Poller::new(api, store.clone(), settings());
    poller.start().unwrap();

    advance(100).await;
    let view = store.snapshot();
    assert_eq!(view.decision_log.len(), 3);
    assert_eq!(view.decision_log[0].what_we_did, "cut risk");
    assert_eq!(view.decision_log[2].date, "2024-01-01");

    poller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_log_failure_does_not_touch_state_loop() {
    let engine = FakeEngine::new();
    engine
        .state
        .set_fallback(Ok(live_state(2_000.0, vec![2_000.0])));
    engine
        .engine_log
        .set_fallback(Err(server_error(503, "log unavailable")));

    let store = ViewStore::new();
    let api: Arc<dyn EngineApi> = engine.clone();
    let mut poller = Poller::new(api, store.clone(), settings());
    poller.start().unwrap();

    advance(100).await;
    let view = store.snapshot();
    assert_eq!(view.log_poll_error.as_deref(), Some("log unavailable"));
    assert!(view.state_poll_error.is_none());
    assert_eq!(view.portfolio_value, 2_000.0);

    poller.stop().await;
}
