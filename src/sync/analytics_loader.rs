use futures::future::join;
use tracing::{info, warn};

use crate::api::EngineApi;
use crate::error::AppResult;
use crate::sync::store::{SourceUpdate, ViewStore};

/// 激活时的分析数据加载：并发拉取 /portfolio 与 /backtest/results，失败只记录日志
pub async fn load_initial_analytics(api: &dyn EngineApi, store: &ViewStore) {
    let (portfolio, backtest) = join(api.get_portfolio(), api.get_backtest_results()).await;

    match portfolio {
        Ok(summary) => {
            store.publish(SourceUpdate::PortfolioMetrics(summary.metrics));
        }
        Err(e) => warn!("加载组合指标失败: {}", e),
    }

    match backtest {
        // 未跑过回测时服务端返回空壳，不覆盖已有数据
        Ok(result) if result.has_equity() => {
            info!("加载已缓存的回测结果: {} 个权益点", result.equity_with_risk.len());
            store.publish(SourceUpdate::Backtest(result));
        }
        Ok(_) => info!("服务端暂无回测结果"),
        Err(e) => warn!("加载回测结果失败: {}", e),
    }
}

/// 回测完成后整体替换回测结果
pub async fn refresh_backtest(api: &dyn EngineApi, store: &ViewStore) -> AppResult<()> {
    let result = api.get_backtest_results().await?;
    store.publish(SourceUpdate::Backtest(result));
    Ok(())
}
