//! # Rust Quant Monitor
//!
//! 组合引擎的监控与控制客户端：轮询实时状态、对账出统一视图、推导回撤、分发控制命令、管理资金弹窗

pub mod analytics;
pub mod api;
pub mod app;
pub mod app_config;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod model;
pub mod payment;
pub mod sync;
