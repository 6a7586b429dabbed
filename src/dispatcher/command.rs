use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// 用户可触发的命令
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Start,
    Stop,
    Rebalance,
    Backtest,
    StressTest,
    RiskLevel,
    AddFunds,
    Withdraw,
}

impl CommandKind {
    pub const ALL: [CommandKind; 8] = [
        CommandKind::Start,
        CommandKind::Stop,
        CommandKind::Rebalance,
        CommandKind::Backtest,
        CommandKind::StressTest,
        CommandKind::RiskLevel,
        CommandKind::AddFunds,
        CommandKind::Withdraw,
    ];

    /// start/stop 共用引擎控制通道，其余命令各占一个
    pub fn lane(&self) -> CommandLane {
        match self {
            CommandKind::Start | CommandKind::Stop => CommandLane::EngineControl,
            other => CommandLane::Single(*other),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Start => "start",
            CommandKind::Stop => "stop",
            CommandKind::Rebalance => "rebalance",
            CommandKind::Backtest => "backtest",
            CommandKind::StressTest => "stress_test",
            CommandKind::RiskLevel => "risk_level",
            CommandKind::AddFunds => "add_funds",
            CommandKind::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandLane {
    EngineControl,
    Single(CommandKind),
}

impl CommandLane {
    pub fn members(&self) -> Vec<CommandKind> {
        CommandKind::ALL
            .iter()
            .copied()
            .filter(|kind| kind.lane() == *self)
            .collect()
    }
}

/// 单个命令的瞬时状态，被同类命令的下一次调用重置
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    #[default]
    Idle,
    Pending,
    Succeeded,
    Failed(String),
}

impl CommandStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, CommandStatus::Pending)
    }
}

/// 所有命令状态的只读快照，每次变更整体替换
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandBoard {
    statuses: BTreeMap<CommandKind, CommandStatus>,
}

impl Default for CommandBoard {
    fn default() -> Self {
        Self {
            statuses: CommandKind::ALL
                .iter()
                .map(|kind| (*kind, CommandStatus::Idle))
                .collect(),
        }
    }
}

impl CommandBoard {
    pub fn status(&self, kind: CommandKind) -> &CommandStatus {
        self.statuses.get(&kind).unwrap_or(&CommandStatus::Idle)
    }

    pub fn is_pending(&self, kind: CommandKind) -> bool {
        self.status(kind).is_pending()
    }

    pub fn lane_has_pending(&self, lane: CommandLane) -> bool {
        lane.members().into_iter().any(|kind| self.is_pending(kind))
    }

    pub(crate) fn set(&mut self, kind: CommandKind, status: CommandStatus) {
        self.statuses.insert(kind, status);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CommandKind, &CommandStatus)> {
        self.statuses.iter()
    }
}
