//! 回撤序列计算
//!
//! 按原始顺序遍历一次权益序列，维护历史峰值:
//! - drawdown[i] = (value[i] - peak) / peak，峰值 <= 0 时记为 0
//! - 输出长度与输入一致，所有值 <= 0，创新高处为 0

use serde::{Deserialize, Serialize};

use crate::model::backtest::EquityPoint;

/// 带日期标签的回撤点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPoint {
    pub date: String,
    pub drawdown: f64,
}

/// 权益序列 -> 回撤序列（空输入返回空序列）
pub fn compute_drawdown(values: &[f64]) -> Vec<f64> {
    let Some(&first) = values.first() else {
        return Vec::new();
    };

    let mut peak = first;
    values
        .iter()
        .map(|&value| {
            if value > peak {
                peak = value;
            }
            if peak > 0.0 {
                // 浮点误差或 NaN 不能让回撤变成正数
                ((value - peak) / peak).min(0.0)
            } else {
                0.0
            }
        })
        .collect()
}

/// 对已解析的权益曲线计算回撤，日期标签原样沿用
pub fn drawdown_series(equity: &[EquityPoint]) -> Vec<DrawdownPoint> {
    let values: Vec<f64> = equity.iter().map(|p| p.value).collect();
    equity
        .iter()
        .zip(compute_drawdown(&values))
        .map(|(point, drawdown)| DrawdownPoint {
            date: point.date.clone(),
            drawdown,
        })
        .collect()
}

/// 最大回撤（序列最小值），空序列为 0
pub fn max_drawdown(drawdowns: &[DrawdownPoint]) -> f64 {
    drawdowns
        .iter()
        .map(|p| p.drawdown)
        .fold(0.0, f64::min)
}
