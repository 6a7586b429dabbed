use serde::{Deserialize, Serialize};

use crate::model::enums::RiskLevel;

/// 银行卡信息，服务端不做真实扣款
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CardDetails {
    pub card_number: String,
    pub expiry: String,
    pub cvv: String,
}

/// `POST /add-funds`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddFundsRequest {
    pub amount: f64,
    #[serde(flatten)]
    pub card: CardDetails,
}

/// `POST /withdraw`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub amount: f64,
}

/// `POST /risk-level`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLevelRequest {
    pub level: RiskLevel,
}

/// 资金变动确认
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FundsAck {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub new_balance: Option<f64>,
}

/// 控制类接口的通用确认（start/stop/rebalance/risk-level）
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlAck {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_funds_body_is_flat() {
        let req = AddFundsRequest {
            amount: 100.0,
            card: CardDetails {
                card_number: "4242 4242 4242 4242".into(),
                expiry: "12/30".into(),
                cvv: "123".into(),
            },
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"amount": 100.0, "card_number": "4242 4242 4242 4242", "expiry": "12/30", "cvv": "123"})
        );
    }
}
