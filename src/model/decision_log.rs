use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::enums::Regime;

/// 引擎的一条调仓/风控决策记录
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub regime: Regime,
    #[serde(default)]
    pub portfolio_volatility: Option<f64>,
    #[serde(default)]
    pub action_taken: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub new_allocation: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub drawdown: Option<f64>,
    #[serde(default)]
    pub risk_reduced: bool,
    #[serde(default)]
    pub plain_summary: String,
    #[serde(default)]
    pub what_we_did: String,
    #[serde(default)]
    pub why_it_matters: String,
    #[serde(default)]
    pub regime_in_plain_english: Option<String>,
}

impl DecisionLogEntry {
    /// 去掉 markdown 加粗标记后的市场描述
    pub fn regime_description(&self) -> Option<String> {
        self.regime_in_plain_english
            .as_ref()
            .map(|text| text.replace("**", ""))
    }
}

/// `GET /engine/log` 响应体，服务端按时间正序返回
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecisionLogResponse {
    #[serde(default)]
    pub logs: Vec<DecisionLogEntry>,
}

impl DecisionLogResponse {
    /// 最新在前，最多 limit 条
    pub fn newest_first(self, limit: usize) -> Vec<DecisionLogEntry> {
        self.logs.into_iter().rev().take(limit).collect()
    }
}
