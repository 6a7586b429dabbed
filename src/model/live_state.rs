use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::enums::{Regime, RiskLevel};

/// `/state` 中的简要活动记录
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActivityEntry {
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub message: String,
}

/// 引擎推送的实时快照，每次轮询整体替换
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LiveState {
    /// 组合市值
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub regime: Regime,
    /// 标的 -> 权重，调仓过程中权重和不一定为 1
    #[serde(default)]
    pub allocations: BTreeMap<String, f64>,
    /// 权益历史，服务端只追加
    #[serde(default)]
    pub history: Vec<f64>,
    #[serde(default)]
    pub logs: Vec<ActivityEntry>,
    #[serde(default)]
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub running: bool,
}

/// `GET /regime`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RegimeStatus {
    #[serde(default)]
    pub current_regime: Regime,
}

/// `GET /risk`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskStatus {
    #[serde(default)]
    pub risk_status: RiskLevel,
}
