use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use tracing::{debug, error, info, warn};

use crate::api::{EngineApi, EngineClient};
use crate::app::session::DashboardSession;
use crate::app_config::log::{setup_logging, LogGuards};
use crate::app_config::ClientSettings;
use crate::model::backtest::{
    METRIC_CAGR, METRIC_CALMAR, METRIC_MAX_DRAWDOWN, METRIC_SHARPE, METRIC_SORTINO,
};
use crate::model::{
    BacktestRequest, CardDetails, CorrelationMatrix, MetricMap, RiskLevel, StressTestRequest,
    ViewModel,
};
use crate::payment::{PaymentMode, PaymentState};

#[derive(Debug, Parser)]
#[command(name = "rust_quant_monitor", about = "组合引擎的监控与控制客户端")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 持续轮询并输出视图变化，Ctrl+C 退出
    Watch,
    /// 查询市场状态与风险状态
    Status,
    Start,
    Stop,
    Rebalance,
    /// 运行回测（默认 2015-01-01 ~ 2024-01-01, SPY/TLT/GLD）
    Backtest {
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long)]
        end_date: Option<NaiveDate>,
        #[arg(long, value_delimiter = ',')]
        tickers: Option<Vec<String>>,
        #[arg(long)]
        risk_level: Option<RiskLevel>,
    },
    /// 运行压力测试
    StressTest {
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long)]
        end_date: Option<NaiveDate>,
        #[arg(long, value_delimiter = ',')]
        tickers: Option<Vec<String>>,
    },
    /// 设置风险等级 LOW | MEDIUM | HIGH
    RiskLevel { level: RiskLevel },
    AddFunds {
        #[arg(long)]
        amount: String,
        #[arg(long, default_value = "")]
        card_number: String,
        #[arg(long, default_value = "")]
        expiry: String,
        #[arg(long, default_value = "")]
        cvv: String,
    },
    Withdraw {
        #[arg(long)]
        amount: String,
    },
}

/// 应用初始化：环境变量 + 日志
pub fn app_init() -> Result<(ClientSettings, LogGuards)> {
    dotenv().ok();
    let guards = setup_logging()?;
    let settings = ClientSettings::from_env()?;
    Ok((settings, guards))
}

pub async fn run(cli: Cli, settings: ClientSettings) -> Result<()> {
    let client = EngineClient::new(&settings)?;
    info!("引擎地址: {}", client.base_url());
    let api: Arc<dyn EngineApi> = Arc::new(client);
    let mut session = DashboardSession::new(Arc::clone(&api), &settings);
    let dispatcher = session.dispatcher().clone();

    match cli.command {
        Command::Watch => watch(&mut session).await?,
        Command::Status => {
            let regime = api.get_regime().await?;
            let risk = api.get_risk().await?;
            info!("regime={} risk={}", regime.current_regime, risk.risk_status);
        }
        Command::Start => {
            dispatcher.start().await?;
            info!("engine: {}", session.view().engine_status);
        }
        Command::Stop => {
            dispatcher.stop().await?;
            info!("engine: {}", session.view().engine_status);
        }
        Command::Rebalance => {
            let ack = dispatcher.rebalance().await?;
            info!("rebalance: {}", ack.message.unwrap_or(ack.status));
        }
        Command::Backtest {
            start_date,
            end_date,
            tickers,
            risk_level,
        } => {
            let mut request = BacktestRequest::with_risk_level(
                risk_level.unwrap_or_else(|| dispatcher.store().selected_risk_level()),
            );
            if let Some(d) = start_date {
                request.start_date = d;
            }
            if let Some(d) = end_date {
                request.end_date = d;
            }
            if let Some(t) = tickers {
                request.tickers = t;
            }
            let ack = dispatcher.run_backtest(Some(request)).await?;
            info!("{} (suspicious={})", ack.message, ack.suspicious);
            log_metrics(&session.view());
        }
        Command::StressTest {
            start_date,
            end_date,
            tickers,
        } => {
            let result = dispatcher
                .run_stress_test(StressTestRequest {
                    start_date,
                    end_date,
                    tickers,
                })
                .await?;
            info!(
                "{}: max drawdown {:.2}%, stressed CAGR {:.2}%",
                result.scenario_or_default(),
                result.max_drawdown() * 100.0,
                result.stressed_cagr() * 100.0
            );
        }
        Command::RiskLevel { level } => {
            dispatcher.set_risk_level(level).await?;
            info!("risk level set to {}", level);
        }
        Command::AddFunds {
            amount,
            card_number,
            expiry,
            cvv,
        } => {
            let flow = session.payment_flow(PaymentMode::AddFunds);
            flow.set_amount(amount)?;
            flow.set_card(CardDetails {
                card_number,
                expiry,
                cvv,
            })?;
            submit_payment(flow).await?;
        }
        Command::Withdraw { amount } => {
            let flow = session.payment_flow(PaymentMode::Withdraw);
            flow.set_amount(amount)?;
            submit_payment(flow).await?;
        }
    }
    Ok(())
}

async fn submit_payment(flow: crate::payment::PaymentFlow) -> Result<()> {
    info!("正在处理 {:?} ...", flow.mode());
    match flow.submit().await {
        Ok(delta) => {
            info!("Success. Balance updated ({:+.2})", delta);
            Ok(())
        }
        Err(e) => {
            let message = match flow.state() {
                PaymentState::Idle { message: Some(m), .. } => m,
                PaymentState::Failed { error, .. } => error,
                _ => e.user_message(),
            };
            if e.is_local() {
                warn!("输入被拒绝，未发送请求: {}", message);
            }
            Err(anyhow!(message))
        }
    }
}

async fn watch(session: &mut DashboardSession) -> Result<()> {
    let mut rx = session.subscribe();
    session.activate().await?;

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    warn!("视图通道已关闭");
                    break;
                }
                let view = rx.borrow_and_update().clone();
                log_view(&view);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("收到 Ctrl+C，停止轮询");
                break;
            }
        }
    }

    session.deactivate().await;
    Ok(())
}

fn log_view(view: &ViewModel) {
    info!(
        "v{} engine={} value=${:.2} regime={} risk={} (selected {}) equity_points={} max_dd={:.2}% current_dd={:.2}%",
        view.version,
        view.engine_status,
        view.portfolio_value,
        view.regime,
        view.risk_level,
        view.selected_risk_level,
        view.equity.len(),
        view.max_drawdown * 100.0,
        view.current_drawdown * 100.0,
    );
    if !view.allocations.is_empty() {
        let parts: Vec<String> = view
            .allocations
            .iter()
            .map(|(k, w)| format!("{}:{:.0}%", k, w * 100.0))
            .collect();
        info!("allocations: {}", parts.join(", "));
    }
    if let Some(entry) = view.decision_log.first() {
        info!("[{}] {} {}", entry.date, entry.regime, entry.what_we_did);
        if let Some(description) = entry.regime_description() {
            info!("  {}", description);
        }
    }
    for (a, b, c) in correlation_pairs(&view.correlation) {
        debug!("corr {}/{} = {:.2}", a, b, c);
    }
    if let Some(stress) = &view.stress {
        info!(
            "stress: {} max_dd={:.2}%",
            stress.scenario_or_default(),
            stress.max_drawdown() * 100.0
        );
    }
    if let Some(e) = &view.state_poll_error {
        error!("state poll: {}", e);
    }
    if let Some(e) = &view.log_poll_error {
        error!("decision log poll: {}", e);
    }
}

const HEADLINE_METRICS: [&str; 5] = [
    METRIC_CAGR,
    METRIC_SHARPE,
    METRIC_SORTINO,
    METRIC_MAX_DRAWDOWN,
    METRIC_CALMAR,
];

/// 上三角的相关系数对，不含对角线
fn correlation_pairs(matrix: &CorrelationMatrix) -> Vec<(&str, &str, f64)> {
    let labels = &matrix.labels;
    labels
        .iter()
        .enumerate()
        .flat_map(move |(i, a)| {
            labels.iter().skip(i + 1).filter_map(move |b| {
                matrix
                    .coefficient(a, b)
                    .map(|c| (a.as_str(), b.as_str(), c))
            })
        })
        .collect()
}

/// 按固定顺序取出常用指标，缺失的跳过
fn headline_metrics(metrics: &MetricMap) -> Vec<(&'static str, f64)> {
    HEADLINE_METRICS
        .iter()
        .filter_map(|name| metrics.get(*name).map(|v| (*name, *v)))
        .collect()
}

fn log_metrics(view: &ViewModel) {
    let sides: [(&str, &Option<MetricMap>); 2] = [
        ("with risk", &view.metrics_with_risk),
        ("without risk", &view.metrics_without_risk),
    ];
    for (label, metrics) in sides {
        let Some(metrics) = metrics else { continue };
        for (name, value) in headline_metrics(metrics) {
            info!("[{}] {} = {:.4}", label, name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn headline_metrics_keep_fixed_order() {
        let metrics = MetricMap::from([
            (METRIC_CALMAR.to_string(), 0.5),
            (METRIC_CAGR.to_string(), 0.07),
            (METRIC_SHARPE.to_string(), 1.1),
            ("Volatility".to_string(), 0.12),
        ]);
        assert_eq!(
            headline_metrics(&metrics),
            vec![(METRIC_CAGR, 0.07), (METRIC_SHARPE, 1.1), (METRIC_CALMAR, 0.5)]
        );
        assert!(headline_metrics(&MetricMap::new()).is_empty());
        assert!(!HEADLINE_METRICS.contains(&"Volatility"));
        assert!(HEADLINE_METRICS.contains(&METRIC_SORTINO));
    }

    #[test]
    fn correlation_pairs_skip_diagonal_and_mirror() {
        let labels = vec!["SPY".to_string(), "TLT".to_string(), "GLD".to_string()];
        let rows = vec![
            BTreeMap::from([
                ("SPY".to_string(), 1.0),
                ("TLT".to_string(), -0.3),
                ("GLD".to_string(), 0.1),
            ]),
            BTreeMap::from([
                ("SPY".to_string(), -0.3),
                ("TLT".to_string(), 1.0),
                ("GLD".to_string(), 0.2),
            ]),
            BTreeMap::from([
                ("SPY".to_string(), 0.1),
                ("TLT".to_string(), 0.2),
                ("GLD".to_string(), 1.0),
            ]),
        ];
        let matrix = CorrelationMatrix::from_rows(&labels, &rows);
        assert_eq!(
            correlation_pairs(&matrix),
            vec![("SPY", "TLT", -0.3), ("SPY", "GLD", 0.1), ("TLT", "GLD", 0.2)]
        );
        assert!(correlation_pairs(&CorrelationMatrix::default()).is_empty());
    }
}
