//! 视图对账
//!
//! 从每个数据源的最新值纯函数式地重建 ViewModel，不触发任何 IO。
//! 合并优先级:
//! 1. 权益曲线：回测的 equity_with_risk 非空时原样使用，否则用实时 history，以下标作为标签
//! 2. 回撤：始终由解析后的权益曲线推导
//! 3. 持仓、市场状态、风险等级、活动记录：只来自最新的实时快照
//! 4. 回测指标：只来自最新的回测结果
//! 5. 压力测试：只来自最新的压力测试结果，实时轮询不会清除

use crate::analytics::{drawdown_series, max_drawdown};
use crate::model::{
    BacktestResult, DecisionLogEntry, EngineStatus, EquityPoint, LiveState, RiskLevel,
    StressResult, ViewModel,
};

/// 各数据源的最新已知值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sources {
    pub live: Option<LiveState>,
    pub decision_log: Vec<DecisionLogEntry>,
    pub backtest: Option<BacktestResult>,
    pub stress: Option<StressResult>,
    /// 最后一次被确认的 start/stop 标签
    pub engine_status: Option<EngineStatus>,
    pub selected_risk_level: RiskLevel,
    /// 已确认但尚未被轮询覆盖的资金变动
    pub funds_delta: f64,
    pub state_error: Option<String>,
    pub log_error: Option<String>,
}

/// 解析权益曲线
pub fn resolve_equity(live: Option<&LiveState>, backtest: Option<&BacktestResult>) -> Vec<EquityPoint> {
    match backtest {
        Some(bt) if bt.has_equity() => bt.equity_with_risk.clone(),
        _ => live
            .map(|state| {
                state
                    .history
                    .iter()
                    .enumerate()
                    .map(|(i, v)| EquityPoint::new(i.to_string(), *v))
                    .collect()
            })
            .unwrap_or_default(),
    }
}

pub fn reconcile(sources: &Sources, version: u64) -> ViewModel {
    let live = sources.live.as_ref();
    let backtest = sources.backtest.as_ref();

    let equity = resolve_equity(live, backtest);
    let drawdown = drawdown_series(&equity);
    let max_dd = max_drawdown(&drawdown);
    let current_dd = drawdown.last().map(|p| p.drawdown).unwrap_or(0.0);

    let engine_status = sources
        .engine_status
        .unwrap_or_else(|| EngineStatus::from_running(live.map(|s| s.running).unwrap_or(false)));

    ViewModel {
        version,
        portfolio_value: live.map(|s| s.value).unwrap_or(0.0) + sources.funds_delta,
        equity,
        equity_without_risk: backtest
            .map(|bt| bt.equity_without_risk.clone())
            .unwrap_or_default(),
        drawdown,
        max_drawdown: max_dd,
        current_drawdown: current_dd,
        allocations: live.map(|s| s.allocations.clone()).unwrap_or_default(),
        regime: live.map(|s| s.regime.clone()).unwrap_or_default(),
        risk_level: live.map(|s| s.risk_level).unwrap_or_default(),
        selected_risk_level: sources.selected_risk_level,
        engine_status,
        metrics_with_risk: backtest.and_then(|bt| bt.metrics_with_risk.clone()),
        metrics_without_risk: backtest.and_then(|bt| bt.metrics_without_risk.clone()),
        correlation: backtest.map(|bt| bt.correlation()).unwrap_or_default(),
        stress: sources.stress.clone(),
        decision_log: sources.decision_log.clone(),
        activity: live.map(|s| s.logs.clone()).unwrap_or_default(),
        state_poll_error: sources.state_error.clone(),
        log_poll_error: sources.log_error.clone(),
    }
}
