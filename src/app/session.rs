use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use crate::api::EngineApi;
use crate::app_config::ClientSettings;
use crate::dispatcher::CommandDispatcher;
use crate::error::AppResult;
use crate::model::ViewModel;
use crate::payment::{PaymentFlow, PaymentMode, PaymentTimings};
use crate::sync::{load_initial_analytics, PollSettings, Poller, ViewStore};

/// 一次看板会话：视图存储 + 轮询 + 命令分发，生命周期与观察者一致
pub struct DashboardSession {
    api: Arc<dyn EngineApi>,
    store: ViewStore,
    poller: Poller,
    dispatcher: CommandDispatcher,
    payment_timings: PaymentTimings,
}

impl DashboardSession {
    pub fn new(api: Arc<dyn EngineApi>, settings: &ClientSettings) -> Self {
        let store = ViewStore::new();
        let poller = Poller::new(Arc::clone(&api), store.clone(), PollSettings::from(settings));
        let dispatcher = CommandDispatcher::new(Arc::clone(&api), store.clone());
        Self {
            api,
            store,
            poller,
            dispatcher,
            payment_timings: PaymentTimings::from(settings),
        }
    }

    /// 开始观察：启动轮询，并发加载一次分析数据
    pub async fn activate(&mut self) -> AppResult<()> {
        self.poller.start()?;
        load_initial_analytics(self.api.as_ref(), &self.store).await;
        info!("看板会话已激活");
        Ok(())
    }

    /// 停止观察，两个轮询循环一起取消
    pub async fn deactivate(&mut self) {
        self.poller.stop().await;
        info!("看板会话已停止");
    }

    pub fn is_active(&self) -> bool {
        self.poller.is_running()
    }

    pub fn view(&self) -> Arc<ViewModel> {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ViewModel>> {
        self.store.subscribe()
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    /// 打开资金弹窗
    pub fn payment_flow(&self, mode: PaymentMode) -> PaymentFlow {
        PaymentFlow::new(mode, self.dispatcher.clone(), self.payment_timings)
    }
}
