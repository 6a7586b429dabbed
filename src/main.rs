use anyhow::Result;
use clap::Parser;

use rust_quant_monitor::app::bootstrap::{self, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // 日志守卫需要活到进程结束
    let (settings, _log_guards) = bootstrap::app_init()?;
    bootstrap::run(cli, settings).await
}
