mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rust_quant_monitor::api::EngineApi;
use rust_quant_monitor::dispatcher::CommandDispatcher;
use rust_quant_monitor::error::AppError;
use rust_quant_monitor::model::{CardDetails, FundsAck};
use rust_quant_monitor::payment::{PaymentFlow, PaymentMode, PaymentState, PaymentTimings};
use rust_quant_monitor::sync::ViewStore;

use common::{server_error, FakeEngine, Reply};

fn flow(engine: &Arc<FakeEngine>, mode: PaymentMode) -> PaymentFlow {
    let api: Arc<dyn EngineApi> = engine.clone();
    let dispatcher = CommandDispatcher::new(api, ViewStore::new());
    PaymentFlow::new(mode, dispatcher, PaymentTimings::default())
}

async fn advance(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

#[tokio::test(start_paused = true)]
async fn test_negative_amount_returns_to_idle_without_request() {
    let engine = FakeEngine::new();
    let flow = flow(&engine, PaymentMode::AddFunds);
    flow.set_amount("-5").unwrap();

    let err = flow.submit().await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    match flow.state() {
        PaymentState::Idle { form, message } => {
            assert_eq!(form.amount, "-5");
            assert!(message.is_some());
        }
        other => panic!("unexpected state {:?}", other),
    }
    assert_eq!(engine.calls("add_funds"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_successful_deposit_auto_dismisses() {
    let engine = FakeEngine::new();
    let deltas = Arc::new(Mutex::new(Vec::new()));
    let seen = deltas.clone();
    let flow = flow(&engine, PaymentMode::AddFunds)
        .with_on_success(move |delta| seen.lock().unwrap().push(delta));
    flow.set_amount("100").unwrap();
    flow.set_card(CardDetails {
        card_number: "4242 4242 4242 4242".into(),
        expiry: "12/30".into(),
        cvv: "123".into(),
    })
    .unwrap();

    let f = flow.clone();
    let handle = tokio::spawn(async move { f.submit().await });
    advance(100).await;
    assert!(matches!(flow.state(), PaymentState::Processing { amount, .. } if amount == 100.0));
    assert!(flow.close().is_err());
    assert!(flow.set_amount("200").is_err());
    assert!(flow.submit().await.is_err());

    assert_eq!(handle.await.unwrap().unwrap(), 100.0);
    assert_eq!(flow.state(), PaymentState::Succeeded { delta: 100.0 });
    assert_eq!(*deltas.lock().unwrap(), vec![100.0]);
    assert_eq!(engine.calls("add_funds"), 1);
    let body = engine.received.lock().unwrap()[0].clone();
    assert_eq!(body["amount"], 100.0);
    assert_eq!(body["cvv"], "123");

    advance(1300).await;
    assert_eq!(flow.state(), PaymentState::default());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_withdrawal_keeps_form() {
    let engine = FakeEngine::new();
    engine
        .withdraw
        .push(Reply::err(server_error(400, "Insufficient funds")));
    let flow = flow(&engine, PaymentMode::Withdraw);
    flow.set_amount("5000").unwrap();

    assert!(flow.submit().await.is_err());
    match flow.state() {
        PaymentState::Failed { form, error } => {
            assert_eq!(form.amount, "5000");
            assert_eq!(error, "Insufficient funds");
        }
        other => panic!("unexpected state {:?}", other),
    }

    // 修改金额后重新提交
    flow.set_amount("50").unwrap();
    assert_eq!(flow.submit().await.unwrap(), -50.0);
    assert_eq!(engine.calls("withdraw"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_missing_server_detail_uses_generic_message() {
    let engine = FakeEngine::new();
    engine.add_funds.push(Reply::err(server_error(500, "")));
    let flow = flow(&engine, PaymentMode::AddFunds);
    flow.set_amount("10").unwrap();

    assert!(flow.submit().await.is_err());
    assert!(matches!(
        flow.state(),
        PaymentState::Failed { error, .. } if error == "Request failed"
    ));
}

#[tokio::test(start_paused = true)]
async fn test_close_before_dismiss_cancels_auto_close() {
    let engine = FakeEngine::new();
    engine.add_funds.push(Reply::ok(FundsAck::default()));
    let flow = flow(&engine, PaymentMode::AddFunds);
    flow.set_amount("20").unwrap();
    flow.submit().await.unwrap();

    flow.close().unwrap();
    flow.set_amount("30").unwrap();
    advance(1300).await;

    // 过期的自动关闭不会清掉新输入
    match flow.state() {
        PaymentState::Idle { form, .. } => assert_eq!(form.amount, "30"),
        other => panic!("unexpected state {:?}", other),
    }
}
