use clap::Parser;
use small_stack::config::toml_config::StackConfig;
use small_stack::core::ReadinessSpec;
use small_stack::domain::ports::ConfigProvider;
use small_stack::utils::{logger, validation::Validate};
use small_stack::{LocalStackPipeline, PythonEnvRuntime, StackEngine};

#[derive(Parser)]
#[command(name = "toml-launch")]
#[command(about = "Stack launcher with TOML configuration support")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "configs/stack-example.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override forced re-provisioning from config
    #[arg(long)]
    force_provision: Option<bool>,

    /// Dry run - show what would be launched without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting TOML-based stack launcher");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    // 載入 TOML 配置
    let mut config = match StackConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 應用命令列覆蓋設定
    if let Some(force) = args.force_provision {
        let provision = config.provision.get_or_insert_with(Default::default);
        provision.force = Some(force);
        tracing::info!("🔧 Forced re-provisioning overridden to: {}", force);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    // 顯示配置摘要
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - Nothing will be provisioned or launched");
        perform_dry_run(&config).await?;
        return Ok(());
    }

    // 決定監控設定
    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());

    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 創建環境後端和啟動管道
    let runtime = PythonEnvRuntime::new(config.python().to_string());
    let pipeline = LocalStackPipeline::new(runtime, config);

    // 創建啟動引擎並運行
    let engine = StackEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(outcome) => {
            tracing::info!("✅ Stack shut down cleanly");
            println!("✅ Stack shut down cleanly");
            println!("📊 Frontend exit code: {:?}", outcome.exit_code);

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

fn display_config_summary(config: &StackConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Stack: {} v{}", config.stack.name, config.stack.version);
    println!("  Backend: {}", config.backend.command.join(" "));
    println!("  Frontend: {}", config.frontend.command.join(" "));

    if let Some(url) = &config.frontend.url {
        println!("  Frontend URL: {}", url);
    }

    println!("  Python: {}", config.python());
    println!("  Force provision: {}", config.force());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

async fn perform_dry_run(config: &StackConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Dry Run Analysis:");
    println!();

    for spec in [config.backend_spec(), config.frontend_spec()] {
        println!("📦 Service: {}", spec.name);
        println!("  Working directory: {}", spec.workdir.display());
        println!("  Environment: {}", spec.env_dir.display());

        if spec.env_dir.exists() {
            println!("  ⏭️ Environment exists - provisioning will be skipped");
        } else {
            println!("  🔨 Environment missing - will be created from {}", spec.manifest.display());
            if !spec.manifest.exists() {
                println!("  ⚠️ Manifest not found - provisioning would fail!");
            }
        }

        println!("  Command: {}", spec.command.join(" "));

        match &spec.readiness {
            ReadinessSpec::None => println!("  Readiness: none (started blind)"),
            ReadinessSpec::Delay { duration } => {
                println!("  Readiness: fixed delay {:?} ⚠️ race-prone", duration)
            }
            ReadinessSpec::Http { url, timeout, .. } => {
                println!("  Readiness: poll {} (timeout {:?})", url, timeout)
            }
            ReadinessSpec::Tcp {
                address, timeout, ..
            } => println!("  Readiness: connect {} (timeout {:?})", address, timeout),
        }

        println!();
    }

    println!("✅ Dry run analysis complete. Run without --dry-run to launch the stack.");

    Ok(())
}
