use clap::Parser;
use small_stack::utils::{logger, validation::Validate};
use small_stack::{CliConfig, LocalStackPipeline, PythonEnvRuntime, StackEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting small-stack CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 創建環境後端和啟動管道
    let runtime = PythonEnvRuntime::new(config.python.clone());
    let pipeline = LocalStackPipeline::new(runtime, config);

    // 創建啟動引擎並運行
    let engine = StackEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(outcome) => {
            tracing::info!("✅ Stack shut down cleanly");
            println!("✅ Stack shut down cleanly");
            println!(
                "📊 backend pid {:?}, frontend pid {:?}, frontend exit {:?}",
                outcome.backend.pid, outcome.frontend.pid, outcome.exit_code
            );

            // 前端的退出碼就是啟動器的退出碼
            if let Some(code) = outcome.exit_code {
                if code != 0 {
                    std::process::exit(code);
                }
            }
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Stack launch failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            // 輸出用戶友好的錯誤信息
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                small_stack::utils::error::ErrorSeverity::Low => 0, // 警告，但成功
                small_stack::utils::error::ErrorSeverity::Medium => 2, // 重試錯誤
                small_stack::utils::error::ErrorSeverity::High => 1, // 啟動錯誤
                small_stack::utils::error::ErrorSeverity::Critical => 3, // 系統錯誤
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
