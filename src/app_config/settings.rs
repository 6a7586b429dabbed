use std::time::Duration;

use crate::app_config::env::{env_i64, env_or_default};
use crate::error::{AppError, AppResult};

/// 调度器允许的最小间隔
pub const MIN_INTERVAL_MS: u64 = 100;

/// 客户端配置
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    /// 引擎服务地址
    pub base_url: String,
    /// 单次请求超时
    pub request_timeout: Duration,
    /// 实时状态轮询间隔
    pub state_poll_interval: Duration,
    /// 决策日志轮询间隔
    pub log_poll_interval: Duration,
    /// 每次拉取的决策日志条数
    pub decision_log_limit: usize,
    /// 模拟支付授权延迟
    pub payment_auth_delay: Duration,
    /// 支付成功后自动关闭延迟
    pub payment_dismiss_delay: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout: Duration::from_millis(30_000),
            state_poll_interval: Duration::from_millis(2_000),
            log_poll_interval: Duration::from_millis(3_000),
            decision_log_limit: 80,
            payment_auth_delay: Duration::from_millis(2_000),
            payment_dismiss_delay: Duration::from_millis(1_200),
        }
    }
}

impl ClientSettings {
    /// 从环境变量加载，缺省值与 Default 一致
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();
        let settings = Self {
            base_url: env_or_default("ENGINE_BASE_URL", &defaults.base_url),
            request_timeout: millis_from_env("ENGINE_REQUEST_TIMEOUT_MS", defaults.request_timeout)?,
            state_poll_interval: millis_from_env("STATE_POLL_INTERVAL_MS", defaults.state_poll_interval)?,
            log_poll_interval: millis_from_env(
                "DECISION_LOG_POLL_INTERVAL_MS",
                defaults.log_poll_interval,
            )?,
            decision_log_limit: {
                let limit = env_i64("DECISION_LOG_LIMIT", defaults.decision_log_limit as i64);
                usize::try_from(limit)
                    .map_err(|_| AppError::Config(format!("DECISION_LOG_LIMIT must be >= 1, got {}", limit)))?
            },
            payment_auth_delay: millis_from_env("PAYMENT_AUTH_DELAY_MS", defaults.payment_auth_delay)?,
            payment_dismiss_delay: millis_from_env(
                "PAYMENT_DISMISS_DELAY_MS",
                defaults.payment_dismiss_delay,
            )?,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(AppError::Config("ENGINE_BASE_URL is empty".to_string()));
        }
        for (name, interval) in [
            ("state_poll_interval", self.state_poll_interval),
            ("log_poll_interval", self.log_poll_interval),
        ] {
            if interval < Duration::from_millis(MIN_INTERVAL_MS) {
                return Err(AppError::Config(format!(
                    "{} must be at least {}ms, got {:?}",
                    name, MIN_INTERVAL_MS, interval
                )));
            }
        }
        if self.decision_log_limit == 0 {
            return Err(AppError::Config("DECISION_LOG_LIMIT must be >= 1".to_string()));
        }
        Ok(())
    }
}

fn millis_from_env(key: &str, default: Duration) -> AppResult<Duration> {
    let ms = env_i64(key, default.as_millis() as i64);
    u64::try_from(ms)
        .map(Duration::from_millis)
        .map_err(|_| AppError::Config(format!("{} must not be negative, got {}", key, ms)))
}
