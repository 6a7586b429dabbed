//! 乐观更新策略表
//!
//! 只影响界面且可被下一次轮询纠正的字段可以在确认前更新；
//! 资金等财务状态必须等服务端确认后才更新。

use crate::dispatcher::command::CommandKind;
use crate::sync::store::SourceUpdate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateTiming {
    /// 调用时立即更新
    BeforeAck,
    /// 收到确认后更新
    AfterAck,
    /// 不做乐观更新
    Never,
}

/// 允许乐观更新的视图字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimisticField {
    EngineStatus,
    SelectedRiskLevel,
    PortfolioValue,
    None,
}

impl OptimisticField {
    pub fn of(update: &SourceUpdate) -> Self {
        match update {
            SourceUpdate::EngineStatus(_) => OptimisticField::EngineStatus,
            SourceUpdate::SelectedRiskLevel(_) => OptimisticField::SelectedRiskLevel,
            SourceUpdate::FundsDelta(_) => OptimisticField::PortfolioValue,
            _ => OptimisticField::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimisticPolicy {
    pub kind: CommandKind,
    pub field: OptimisticField,
    pub timing: UpdateTiming,
}

pub const OPTIMISTIC_POLICY: [OptimisticPolicy; 8] = [
    OptimisticPolicy {
        kind: CommandKind::Start,
        field: OptimisticField::EngineStatus,
        timing: UpdateTiming::AfterAck,
    },
    OptimisticPolicy {
        kind: CommandKind::Stop,
        field: OptimisticField::EngineStatus,
        timing: UpdateTiming::AfterAck,
    },
    OptimisticPolicy {
        kind: CommandKind::Rebalance,
        field: OptimisticField::None,
        timing: UpdateTiming::Never,
    },
    OptimisticPolicy {
        kind: CommandKind::Backtest,
        field: OptimisticField::None,
        timing: UpdateTiming::Never,
    },
    OptimisticPolicy {
        kind: CommandKind::StressTest,
        field: OptimisticField::None,
        timing: UpdateTiming::Never,
    },
    // 只影响后续调仓，失败时下一次轮询会纠正
    OptimisticPolicy {
        kind: CommandKind::RiskLevel,
        field: OptimisticField::SelectedRiskLevel,
        timing: UpdateTiming::BeforeAck,
    },
    OptimisticPolicy {
        kind: CommandKind::AddFunds,
        field: OptimisticField::PortfolioValue,
        timing: UpdateTiming::AfterAck,
    },
    OptimisticPolicy {
        kind: CommandKind::Withdraw,
        field: OptimisticField::PortfolioValue,
        timing: UpdateTiming::AfterAck,
    },
];

pub fn policy_for(kind: CommandKind) -> OptimisticPolicy {
    OPTIMISTIC_POLICY
        .iter()
        .copied()
        .find(|p| p.kind == kind)
        .unwrap_or(OptimisticPolicy {
            kind,
            field: OptimisticField::None,
            timing: UpdateTiming::Never,
        })
}

/// 该更新是否允许在给定时机应用
pub fn permits(kind: CommandKind, timing: UpdateTiming, update: &SourceUpdate) -> bool {
    let policy = policy_for(kind);
    policy.timing == timing
        && policy.timing != UpdateTiming::Never
        && policy.field == OptimisticField::of(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EngineStatus, RiskLevel};

    #[test]
    fn every_command_has_exactly_one_policy() {
        for kind in CommandKind::ALL {
            assert_eq!(OPTIMISTIC_POLICY.iter().filter(|p| p.kind == kind).count(), 1);
        }
    }

    #[test]
    fn financial_state_waits_for_ack() {
        let delta = SourceUpdate::FundsDelta(10.0);
        assert!(!permits(CommandKind::AddFunds, UpdateTiming::BeforeAck, &delta));
        assert!(permits(CommandKind::AddFunds, UpdateTiming::AfterAck, &delta));
        assert!(permits(CommandKind::Withdraw, UpdateTiming::AfterAck, &delta));
    }

    #[test]
    fn risk_level_is_applied_before_ack() {
        let update = SourceUpdate::SelectedRiskLevel(RiskLevel::High);
        assert!(permits(CommandKind::RiskLevel, UpdateTiming::BeforeAck, &update));
        assert!(!permits(CommandKind::RiskLevel, UpdateTiming::AfterAck, &update));
    }

    #[test]
    fn field_must_match_table() {
        let update = SourceUpdate::EngineStatus(EngineStatus::Running);
        assert!(permits(CommandKind::Start, UpdateTiming::AfterAck, &update));
        assert!(!permits(CommandKind::Rebalance, UpdateTiming::AfterAck, &update));
        assert!(!permits(
            CommandKind::Start,
            UpdateTiming::AfterAck,
            &SourceUpdate::FundsDelta(1.0)
        ));
    }
}
