pub mod command;
pub mod command_dispatcher;
pub mod policy;

pub use command::{CommandBoard, CommandKind, CommandLane, CommandStatus};
pub use command_dispatcher::{validate_amount, CommandDispatcher};
pub use policy::{policy_for, OptimisticField, OptimisticPolicy, UpdateTiming, OPTIMISTIC_POLICY};
