use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::api::engine_api::*;
use crate::app_config::ClientSettings;
use crate::error::{AppError, AppResult, GENERIC_FAILURE_MESSAGE};
use crate::model::{
    AddFundsRequest, BacktestAck, BacktestRequest, BacktestResult, ControlAck,
    DecisionLogResponse, FundsAck, LiveState, PortfolioSummary, RegimeStatus, RiskLevelRequest,
    RiskStatus, StressResult, StressTestRequest, WithdrawRequest,
};

/// 基于 reqwest 的引擎客户端：固定地址 + 有界超时，不做重试
#[derive(Debug, Clone)]
pub struct EngineClient {
    client: Client,
    base_url: String,
}

impl EngineClient {
    pub fn new(settings: &ClientSettings) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send_request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> AppResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request_builder = self.client.request(method.clone(), &url);
        if !query.is_empty() {
            request_builder = request_builder.query(query);
        }
        if let Some(body) = body {
            request_builder = request_builder.json(body);
        }

        let response = request_builder.send().await?;
        let status_code = response.status();
        let response_body = response.text().await?;
        debug!(
            "{} {} -> {} ({} bytes)",
            method,
            path,
            status_code.as_u16(),
            response_body.len()
        );

        if status_code.is_success() {
            let result: T = serde_json::from_str(&response_body)?;
            Ok(result)
        } else {
            Err(server_error(status_code.as_u16(), &response_body))
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        self.send_request::<T, ()>(Method::GET, path, &[], None).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> AppResult<T> {
        self.send_request(Method::POST, path, &[], body).await
    }
}

/// 非 2xx 响应：取 JSON 中的 `detail`，否则用通用提示
pub(crate) fn server_error(status: u16, body: &str) -> AppError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned())
        .map(|detail| match detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());
    AppError::Server { status, detail }
}

#[async_trait]
impl EngineApi for EngineClient {
    async fn get_state(&self) -> AppResult<LiveState> {
        self.get(PATH_STATE).await
    }

    async fn get_portfolio(&self) -> AppResult<PortfolioSummary> {
        self.get(PATH_PORTFOLIO).await
    }

    async fn get_backtest_results(&self) -> AppResult<BacktestResult> {
        self.get(PATH_BACKTEST_RESULTS).await
    }

    async fn get_engine_log(&self, limit: usize) -> AppResult<DecisionLogResponse> {
        self.send_request::<_, ()>(
            Method::GET,
            PATH_ENGINE_LOG,
            &[("limit", limit.to_string())],
            None,
        )
        .await
    }

    async fn get_regime(&self) -> AppResult<RegimeStatus> {
        self.get(PATH_REGIME).await
    }

    async fn get_risk(&self) -> AppResult<RiskStatus> {
        self.get(PATH_RISK).await
    }

    async fn start(&self) -> AppResult<ControlAck> {
        self.post::<_, ()>(PATH_START, None).await
    }

    async fn stop(&self) -> AppResult<ControlAck> {
        self.post::<_, ()>(PATH_STOP, None).await
    }

    async fn rebalance(&self) -> AppResult<ControlAck> {
        self.post::<_, ()>(PATH_REBALANCE, None).await
    }

    async fn run_backtest(&self, request: &BacktestRequest) -> AppResult<BacktestAck> {
        self.post(PATH_RUN_BACKTEST, Some(request)).await
    }

    async fn run_stress_test(&self, request: &StressTestRequest) -> AppResult<StressResult> {
        self.post(PATH_STRESS_TEST, Some(request)).await
    }

    async fn add_funds(&self, request: &AddFundsRequest) -> AppResult<FundsAck> {
        self.post(PATH_ADD_FUNDS, Some(request)).await
    }

    async fn withdraw(&self, request: &WithdrawRequest) -> AppResult<FundsAck> {
        self.post(PATH_WITHDRAW, Some(request)).await
    }

    async fn set_risk_level(&self, request: &RiskLevelRequest) -> AppResult<ControlAck> {
        self.post(PATH_RISK_LEVEL, Some(request)).await
    }
}
