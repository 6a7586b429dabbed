use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::backtest::{deserialize_metrics, MetricMap, METRIC_CAGR, METRIC_MAX_DRAWDOWN};

/// `POST /stress_test` 请求体，未填字段由服务端取默认值
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StressTestRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tickers: Option<Vec<String>>,
}

/// 压力测试结果，只由会话生命周期清除
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StressResult {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub scenario: String,
    #[serde(default, deserialize_with = "deserialize_metrics")]
    pub metrics_after_stress: MetricMap,
    #[serde(default)]
    pub drawdown_after_shock: Option<f64>,
}

impl StressResult {
    pub const DEFAULT_SCENARIO: &'static str = "-5% daily shock for 5 days";

    pub fn scenario_or_default(&self) -> &str {
        if self.scenario.is_empty() {
            Self::DEFAULT_SCENARIO
        } else {
            &self.scenario
        }
    }

    pub fn max_drawdown(&self) -> f64 {
        self.metrics_after_stress
            .get(METRIC_MAX_DRAWDOWN)
            .copied()
            .or(self.drawdown_after_shock)
            .unwrap_or(0.0)
    }

    pub fn stressed_cagr(&self) -> f64 {
        self.metrics_after_stress.get(METRIC_CAGR).copied().unwrap_or(0.0)
    }
}
