use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::model::enums::RiskLevel;

/// 指标名 -> 数值
pub type MetricMap = BTreeMap<String, f64>;

pub const METRIC_CAGR: &str = "CAGR";
pub const METRIC_SHARPE: &str = "Sharpe Ratio";
pub const METRIC_SORTINO: &str = "Sortino Ratio";
pub const METRIC_MAX_DRAWDOWN: &str = "Max Drawdown";
pub const METRIC_CALMAR: &str = "Calmar Ratio";

/// 服务端的指标里混有 `suspicious`、`suspicious_flags` 等非数值字段，只保留数值
fn numeric_only(raw: BTreeMap<String, serde_json::Value>) -> MetricMap {
    raw.into_iter()
        .filter_map(|(k, v)| match v {
            serde_json::Value::Number(n) => n.as_f64().map(|f| (k, f)),
            _ => None,
        })
        .collect()
}

pub(crate) fn deserialize_metrics<'de, D>(deserializer: D) -> Result<MetricMap, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw.map(numeric_only).unwrap_or_default())
}

pub(crate) fn deserialize_optional_metrics<'de, D>(
    deserializer: D,
) -> Result<Option<MetricMap>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw.map(numeric_only))
}

/// 带日期标签的权益点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: String,
    pub value: f64,
}

impl EquityPoint {
    pub fn new(date: impl Into<String>, value: f64) -> Self {
        Self {
            date: date.into(),
            value,
        }
    }
}

/// 回测结果，下一次拉取前不可变
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BacktestResult {
    #[serde(default, deserialize_with = "deserialize_optional_metrics")]
    pub metrics_with_risk: Option<MetricMap>,
    #[serde(default, deserialize_with = "deserialize_optional_metrics")]
    pub metrics_without_risk: Option<MetricMap>,
    #[serde(default)]
    pub equity_with_risk: Vec<EquityPoint>,
    #[serde(default)]
    pub equity_without_risk: Vec<EquityPoint>,
    /// 按行给出的相关系数，行顺序与 correlation_labels 一致
    #[serde(default)]
    pub correlation_matrix: Vec<BTreeMap<String, f64>>,
    #[serde(default)]
    pub correlation_labels: Vec<String>,
}

impl BacktestResult {
    /// 服务端在未跑过回测时返回空壳
    pub fn has_equity(&self) -> bool {
        !self.equity_with_risk.is_empty()
    }

    pub fn correlation(&self) -> CorrelationMatrix {
        CorrelationMatrix::from_rows(&self.correlation_labels, &self.correlation_matrix)
    }
}

/// 方阵形式的相关系数：ticker -> ticker -> [-1, 1]
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    pub cells: BTreeMap<String, BTreeMap<String, f64>>,
}

impl CorrelationMatrix {
    pub fn from_rows(labels: &[String], rows: &[BTreeMap<String, f64>]) -> Self {
        // 旧版本服务端不返回 labels，从首行的键推断
        let labels: Vec<String> = if labels.is_empty() {
            rows.first()
                .map(|row| row.keys().cloned().collect())
                .unwrap_or_default()
        } else {
            labels.to_vec()
        };
        let cells = labels
            .iter()
            .zip(rows.iter())
            .map(|(label, row)| {
                let row = row
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clamp(-1.0, 1.0)))
                    .collect();
                (label.clone(), row)
            })
            .collect();
        Self { labels, cells }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn coefficient(&self, a: &str, b: &str) -> Option<f64> {
        self.cells.get(a).and_then(|row| row.get(b)).copied()
    }
}

/// `GET /portfolio`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PortfolioSummary {
    #[serde(default)]
    pub portfolio_value: f64,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default, deserialize_with = "deserialize_metrics")]
    pub metrics: MetricMap,
}

/// `POST /run_backtest` 请求体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub tickers: Vec<String>,
    pub risk_level: RiskLevel,
}

impl BacktestRequest {
    pub const DEFAULT_TICKERS: [&'static str; 3] = ["SPY", "TLT", "GLD"];

    /// 默认回测区间与标的，风险等级取当前选择
    pub fn with_risk_level(risk_level: RiskLevel) -> Self {
        Self {
            start_date: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            tickers: Self::DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
            risk_level,
        }
    }
}

/// `POST /run_backtest` 响应
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BacktestAck {
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "deserialize_optional_metrics")]
    pub metrics_with_risk: Option<MetricMap>,
    #[serde(default, deserialize_with = "deserialize_optional_metrics")]
    pub metrics_without_risk: Option<MetricMap>,
    #[serde(default)]
    pub suspicious: bool,
}
