//! 入金/出金弹窗的状态机
//!
//! Idle -> Validating -> Processing -> Succeeded -> (自动关闭) Idle
//!                    \-> Idle(校验提示)  \-> Failed(保留输入，可重新提交)
//!
//! Processing 期间不允许关闭或再次提交。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::app_config::ClientSettings;
use crate::dispatcher::{validate_amount, CommandDispatcher};
use crate::error::{AppError, AppResult};
use crate::model::CardDetails;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMode {
    AddFunds,
    Withdraw,
}

impl PaymentMode {
    /// 成功回调里的带符号金额
    pub fn signed(&self, amount: f64) -> f64 {
        match self {
            PaymentMode::AddFunds => amount,
            PaymentMode::Withdraw => -amount,
        }
    }
}

/// 表单原始输入
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaymentForm {
    pub amount: String,
    pub card_number: String,
    pub expiry: String,
    pub cvv: String,
}

impl PaymentForm {
    pub fn parse_amount(&self) -> AppResult<f64> {
        let amount = self
            .amount
            .trim()
            .parse::<f64>()
            .map_err(|_| AppError::Validation(format!("amount is not a number: {:?}", self.amount)))?;
        validate_amount(amount)
    }

    fn card(&self) -> CardDetails {
        CardDetails {
            card_number: self.card_number.clone(),
            expiry: self.expiry.clone(),
            cvv: self.cvv.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentState {
    Idle {
        form: PaymentForm,
        message: Option<String>,
    },
    Validating {
        form: PaymentForm,
    },
    Processing {
        form: PaymentForm,
        amount: f64,
    },
    Succeeded {
        delta: f64,
    },
    Failed {
        form: PaymentForm,
        error: String,
    },
}

impl Default for PaymentState {
    fn default() -> Self {
        PaymentState::Idle {
            form: PaymentForm::default(),
            message: None,
        }
    }
}

impl PaymentState {
    pub fn form(&self) -> Option<&PaymentForm> {
        match self {
            PaymentState::Idle { form, .. }
            | PaymentState::Validating { form }
            | PaymentState::Processing { form, .. }
            | PaymentState::Failed { form, .. } => Some(form),
            PaymentState::Succeeded { .. } => None,
        }
    }

    /// Idle 与 Failed 都可以编辑和提交
    pub fn accepts_input(&self) -> bool {
        matches!(self, PaymentState::Idle { .. } | PaymentState::Failed { .. })
    }

    /// 请求进行中，关闭按钮与提交按钮都不可用
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            PaymentState::Validating { .. } | PaymentState::Processing { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            PaymentState::Idle { .. } => "Idle",
            PaymentState::Validating { .. } => "Validating",
            PaymentState::Processing { .. } => "Processing",
            PaymentState::Succeeded { .. } => "Succeeded",
            PaymentState::Failed { .. } => "Failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentTimings {
    /// 模拟授权延迟，在真正发请求之前
    pub auth_delay: Duration,
    /// 成功后自动关闭
    pub dismiss_delay: Duration,
}

impl Default for PaymentTimings {
    fn default() -> Self {
        Self {
            auth_delay: Duration::from_millis(2000),
            dismiss_delay: Duration::from_millis(1200),
        }
    }
}

impl From<&ClientSettings> for PaymentTimings {
    fn from(settings: &ClientSettings) -> Self {
        Self {
            auth_delay: settings.payment_auth_delay,
            dismiss_delay: settings.payment_dismiss_delay,
        }
    }
}

pub type SuccessCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// 弹窗级别的支付流程，关闭即丢弃
#[derive(Clone)]
pub struct PaymentFlow {
    mode: PaymentMode,
    dispatcher: CommandDispatcher,
    timings: PaymentTimings,
    state: Arc<watch::Sender<PaymentState>>,
    /// 每次提交递增，过期的自动关闭计时器据此失效
    submission: Arc<AtomicU64>,
    on_success: Option<SuccessCallback>,
}

impl PaymentFlow {
    pub fn new(mode: PaymentMode, dispatcher: CommandDispatcher, timings: PaymentTimings) -> Self {
        let (state, _) = watch::channel(PaymentState::default());
        Self {
            mode,
            dispatcher,
            timings,
            state: Arc::new(state),
            submission: Arc::new(AtomicU64::new(0)),
            on_success: None,
        }
    }

    pub fn with_on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn mode(&self) -> PaymentMode {
        self.mode
    }

    pub fn state(&self) -> PaymentState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PaymentState> {
        self.state.subscribe()
    }

    fn transition(&self, next: PaymentState) {
        debug!("支付状态 -> {}", next.name());
        self.state.send_replace(next);
    }

    /// 修改表单，只在可输入状态下允许
    pub fn edit<F>(&self, f: F) -> AppResult<()>
    where
        F: FnOnce(&mut PaymentForm),
    {
        let mut rejected = None;
        self.state.send_if_modified(|state| match state {
            PaymentState::Idle { form, .. } | PaymentState::Failed { form, .. } => {
                f(form);
                true
            }
            other => {
                rejected = Some(other.name());
                false
            }
        });
        match rejected {
            Some(name) => Err(AppError::InvalidTransition(format!(
                "form is not editable while {}",
                name
            ))),
            None => Ok(()),
        }
    }

    pub fn set_amount(&self, amount: impl Into<String>) -> AppResult<()> {
        let amount = amount.into();
        self.edit(|form| form.amount = amount)
    }

    pub fn set_card(&self, card: CardDetails) -> AppResult<()> {
        self.edit(|form| {
            form.card_number = card.card_number;
            form.expiry = card.expiry;
            form.cvv = card.cvv;
        })
    }

    /// 提交表单；成功时返回带符号金额
    pub async fn submit(&self) -> AppResult<f64> {
        // Idle/Failed -> Validating 必须原子完成，避免重复提交
        let mut form = None;
        self.state.send_if_modified(|state| {
            if !state.accepts_input() {
                return false;
            }
            let current = state.form().cloned().unwrap_or_default();
            *state = PaymentState::Validating {
                form: current.clone(),
            };
            form = Some(current);
            true
        });
        let Some(form) = form else {
            return Err(AppError::InvalidTransition(format!(
                "submit is not offered while {}",
                self.state().name()
            )));
        };

        let amount = match form.parse_amount() {
            Ok(amount) => amount,
            Err(e) => {
                self.transition(PaymentState::Idle {
                    form,
                    message: Some(e.user_message()),
                });
                return Err(e);
            }
        };

        let id = self.submission.fetch_add(1, Ordering::SeqCst) + 1;
        self.transition(PaymentState::Processing {
            form: form.clone(),
            amount,
        });

        tokio::time::sleep(self.timings.auth_delay).await;

        let result = match self.mode {
            PaymentMode::AddFunds => self
                .dispatcher
                .add_funds(amount, form.card())
                .await
                .map(|_| ()),
            PaymentMode::Withdraw => self.dispatcher.withdraw(amount).await.map(|_| ()),
        };

        match result {
            Ok(()) => {
                let delta = self.mode.signed(amount);
                info!("支付成功: {:?} {}", self.mode, delta);
                self.transition(PaymentState::Succeeded { delta });
                if let Some(callback) = &self.on_success {
                    callback(delta);
                }
                self.schedule_dismiss(id);
                Ok(delta)
            }
            Err(e) => {
                warn!("支付失败: {}", e);
                self.transition(PaymentState::Failed {
                    form,
                    error: e.user_message(),
                });
                Err(e)
            }
        }
    }

    fn schedule_dismiss(&self, id: u64) {
        let state = Arc::clone(&self.state);
        let submission = Arc::clone(&self.submission);
        let delay = self.timings.dismiss_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            state.send_if_modified(|s| {
                let current = submission.load(Ordering::SeqCst) == id;
                if current && matches!(s, PaymentState::Succeeded { .. }) {
                    *s = PaymentState::default();
                    true
                } else {
                    false
                }
            });
        });
    }

    /// 关闭弹窗：除 Processing 外任意状态都可放弃，不产生副作用
    pub fn close(&self) -> AppResult<()> {
        let mut busy = false;
        self.state.send_if_modified(|state| {
            if state.is_busy() {
                busy = true;
                return false;
            }
            *state = PaymentState::default();
            true
        });
        if busy {
            return Err(AppError::InvalidTransition(
                "close is not offered while processing".to_string(),
            ));
        }
        Ok(())
    }
}
