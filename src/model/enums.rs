use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AppError;

/// 市场状态（由引擎识别）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Regime {
    #[default]
    Unknown,
    Bull,
    Bear,
    TrendingUp,
    TrendingDown,
    HighVol,
    Crash,
    /// 引擎新增的标签，原样保留
    Other(String),
}

impl Regime {
    pub fn as_str(&self) -> &str {
        match self {
            Regime::Unknown => "UNKNOWN",
            Regime::Bull => "BULL",
            Regime::Bear => "BEAR",
            Regime::TrendingUp => "TRENDING_UP",
            Regime::TrendingDown => "TRENDING_DOWN",
            Regime::HighVol => "HIGH_VOL",
            Regime::Crash => "CRASH",
            Regime::Other(label) => label.as_str(),
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "" | "UNKNOWN" => Regime::Unknown,
            "BULL" => Regime::Bull,
            "BEAR" => Regime::Bear,
            "TRENDING_UP" => Regime::TrendingUp,
            "TRENDING_DOWN" => Regime::TrendingDown,
            "HIGH_VOL" => Regime::HighVol,
            "CRASH" => Regime::Crash,
            _ => Regime::Other(label.to_string()),
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Regime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Regime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.map(|l| Regime::from_label(&l)).unwrap_or_default())
    }
}

/// 风险等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(RiskLevel::Low),
            "MEDIUM" => Ok(RiskLevel::Medium),
            "HIGH" => Ok(RiskLevel::High),
            other => Err(AppError::Validation(format!(
                "invalid risk level: {} (expected LOW, MEDIUM or HIGH)",
                other
            ))),
        }
    }
}

/// 引擎运行状态（界面标签）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EngineStatus {
    Running,
    #[default]
    Stopped,
}

impl EngineStatus {
    pub fn from_running(running: bool) -> Self {
        if running {
            EngineStatus::Running
        } else {
            EngineStatus::Stopped
        }
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineStatus::Running => f.write_str("Running"),
            EngineStatus::Stopped => f.write_str("Stopped"),
        }
    }
}
