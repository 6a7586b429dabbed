use thiserror::Error;

/// 通用失败提示（服务端未给出 detail 时使用）
pub const GENERIC_FAILURE_MESSAGE: &str = "Request failed";

/// 应用错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    /// 网络错误：不可达、超时、连接被重置
    #[error("transport error: {0}")]
    Transport(String),

    /// 服务端返回非 2xx
    #[error("server error ({status}): {detail}")]
    Server { status: u16, detail: String },

    /// 响应体结构不符合预期
    #[error("decode error: {0}")]
    Decode(String),

    /// 本地校验失败，不会发出请求
    #[error("validation error: {0}")]
    Validation(String),

    /// 当前状态下不允许的操作
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// 配置错误
    #[error("configuration error: {0}")]
    Config(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// 展示给发起操作的界面元素的文案
    pub fn user_message(&self) -> String {
        match self {
            AppError::Server { detail, .. } if !detail.is_empty() => detail.clone(),
            AppError::Server { .. } => GENERIC_FAILURE_MESSAGE.to_string(),
            AppError::Transport(msg)
            | AppError::Decode(msg)
            | AppError::Validation(msg)
            | AppError::InvalidTransition(msg)
            | AppError::Config(msg) => {
                if msg.is_empty() {
                    GENERIC_FAILURE_MESSAGE.to_string()
                } else {
                    msg.clone()
                }
            }
        }
    }

    /// 是否在本地就被拒绝（未触达服务端）
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_) | AppError::InvalidTransition(_) | AppError::Config(_)
        )
    }
}

/// 把 reqwest 的错误归类为传输错误
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Decode(err.to_string())
        } else {
            AppError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Decode(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_detail_is_shown_verbatim() {
        let err = AppError::Server {
            status: 400,
            detail: "Insufficient funds".to_string(),
        };
        assert_eq!(err.user_message(), "Insufficient funds");
    }

    #[test]
    fn empty_detail_falls_back_to_generic_message() {
        let err = AppError::Server {
            status: 502,
            detail: String::new(),
        };
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
        assert_eq!(
            AppError::Transport(String::new()).user_message(),
            GENERIC_FAILURE_MESSAGE
        );
    }

    #[test]
    fn local_errors_never_reach_network() {
        assert!(AppError::Validation("amount".into()).is_local());
        assert!(!AppError::Transport("timeout".into()).is_local());
    }
}
