use clap::Parser;
use small_stack::config::sequence_config::SequenceConfig;
use small_stack::core::sequence::{self, ServiceSequence, SpecService};
use small_stack::utils::logger;
use small_stack::utils::validation::Validate;
use small_stack::PythonEnvRuntime;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sequence-launch")]
#[command(about = "Stack launcher with multi-service sequence support")]
struct Args {
    /// Path to sequence configuration file
    #[arg(short, long, default_value = "configs/sequence-example.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Dry run - show the launch plan without executing
    #[arg(long)]
    dry_run: bool,

    /// Execution ID for this run
    #[arg(long)]
    execution_id: Option<String>,

    /// Launch only specific services (comma-separated)
    #[arg(long)]
    only: Option<String>,

    /// Skip specific services (comma-separated)
    #[arg(long)]
    skip: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting service sequence launcher");
    tracing::info!("📁 Loading sequence configuration from: {}", args.config);

    // 載入序列配置
    let config = match SequenceConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "❌ Failed to load sequence config file '{}': {}",
                args.config, e
            );
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Sequence configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    tracing::info!("✅ Sequence configuration loaded and validated successfully");

    // 生成執行 ID
    let execution_id = args
        .execution_id
        .clone()
        .unwrap_or_else(|| format!("launch_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S")));

    // 顯示序列摘要
    display_sequence_summary(&config, &args, &execution_id);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - Nothing will be provisioned or launched");
        perform_dry_run(&config, &args).await?;
        return Ok(());
    }

    // 決定監控設定
    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());

    // 創建序列執行器
    let mut launch_sequence =
        ServiceSequence::new(execution_id.clone()).with_monitoring(monitor_enabled);

    // 獲取要啟動的服務列表
    let services_to_launch = determine_services_to_launch(&config, &args);

    // 所有服務共用同一個環境後端
    let runtime = Arc::new(PythonEnvRuntime::new(config.python().to_string()));

    for definition in &services_to_launch {
        tracing::info!("📦 Setting up service: {}", definition.name);

        let spec = config.service_spec(definition);
        let service = SpecService::new(spec, runtime.clone(), config.force_provision());
        launch_sequence.add_service(Box::new(service));
    }

    // 執行序列
    tracing::info!("🎬 Starting service sequence launch");
    match launch_sequence.execute_all().await {
        Ok((handles, context)) => {
            tracing::info!("🎉 All services are up!");

            // 顯示啟動結果摘要
            display_launch_results(&context.reports, &execution_id);

            // 匯出啟動摘要
            if let Some(monitoring) = &config.monitoring {
                if monitoring.export_metrics.unwrap_or(false) {
                    export_launch_metrics(&context.reports, &execution_id, monitoring).await?;
                }
            }

            // 前景等待最後一個服務
            let exit_code = sequence::supervise(handles).await?;

            println!("✅ Service sequence shut down");
            println!("🆔 Execution ID: {}", execution_id);
            println!("📊 Services launched: {}", context.reports.len());

            if let Some(code) = exit_code {
                if code != 0 {
                    std::process::exit(code);
                }
            }
        }
        Err(e) => {
            tracing::error!("❌ Service sequence failed: {}", e);
            eprintln!("❌ Service sequence failed: {}", e);
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    }

    Ok(())
}

fn display_sequence_summary(config: &SequenceConfig, args: &Args, execution_id: &str) {
    println!("📋 Service Sequence Summary:");
    println!("  Name: {} v{}", config.launch.name, config.launch.version);
    println!("  Description: {}", config.launch.description);
    println!("  Execution ID: {}", execution_id);
    println!("  Total Services: {}", config.services.len());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    if let Some(only) = &args.only {
        println!("  🎯 Only launching: {}", only);
    }

    if let Some(skip) = &args.skip {
        println!("  ⏭️ Skipping: {}", skip);
    }

    println!();
    println!("📝 Launch Order:");
    for (index, service_name) in config.launch.execution_order.iter().enumerate() {
        if let Some(service) = config.get_service(service_name) {
            let status = if service.enabled.unwrap_or(true) {
                "✅"
            } else {
                "⏸️"
            };
            println!(
                "  {}. {} {} - {}",
                index + 1,
                status,
                service_name,
                service.description.as_deref().unwrap_or("No description")
            );

            if let Some(deps) = &service.depends_on {
                println!("     Dependencies: {}", deps.join(", "));
            }
        }
    }
    println!();
}

fn determine_services_to_launch<'a>(
    config: &'a SequenceConfig,
    args: &'a Args,
) -> Vec<&'a small_stack::config::sequence_config::ServiceDefinition> {
    let mut services = config.get_enabled_services();

    // 處理 --only 參數
    if let Some(only_list) = &args.only {
        let only_names: std::collections::HashSet<&str> =
            only_list.split(',').map(|s| s.trim()).collect();
        services.retain(|s| only_names.contains(s.name.as_str()));
    }

    // 處理 --skip 參數
    if let Some(skip_list) = &args.skip {
        let skip_names: std::collections::HashSet<&str> =
            skip_list.split(',').map(|s| s.trim()).collect();
        services.retain(|s| !skip_names.contains(s.name.as_str()));
    }

    services
}

async fn perform_dry_run(
    config: &SequenceConfig,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Dry Run Analysis:");
    println!();

    let services_to_launch = determine_services_to_launch(config, args);

    for (index, definition) in services_to_launch.iter().enumerate() {
        let spec = config.service_spec(definition);

        println!("📦 Service {}: {}", index + 1, definition.name);
        println!("  Command: {}", spec.command.join(" "));
        println!("  Environment: {}", spec.env_dir.display());

        if spec.env_dir.exists() {
            println!("  ⏭️ Environment exists - provisioning will be skipped");
        } else {
            println!("  🔨 Environment will be created from {}", spec.manifest.display());
        }

        if let Some(url) = &definition.url {
            println!("  🌐 Expected at: {}", url);
        }

        if let Some(deps) = &definition.depends_on {
            println!("  🔗 Dependencies: {}", deps.join(", "));
        }

        println!();
    }

    println!("📊 Summary:");
    println!("  Total services to launch: {}", services_to_launch.len());
    println!("  The last service in the order runs in the foreground.");
    println!();
    println!("✅ Dry run analysis complete.");

    Ok(())
}

fn display_launch_results(
    reports: &[small_stack::core::LaunchReport],
    execution_id: &str,
) {
    println!();
    println!("📊 Launch Results Summary:");
    println!("  Execution ID: {}", execution_id);
    println!("  Launched Services: {}", reports.len());
    println!();

    println!("📝 Service Details:");
    for (index, report) in reports.iter().enumerate() {
        println!(
            "  {}. {} - pid {:?}, ready after {:?}",
            index + 1,
            report.service,
            report.pid,
            report.ready_after
        );
    }
    println!();
}

async fn export_launch_metrics(
    reports: &[small_stack::core::LaunchReport],
    execution_id: &str,
    monitoring_config: &small_stack::config::sequence_config::MonitoringSection,
) -> Result<(), Box<dyn std::error::Error>> {
    let metrics_file = monitoring_config
        .metrics_file
        .as_deref()
        .unwrap_or("launch_metrics.json");

    let mut metrics = HashMap::new();
    metrics.insert(
        "execution_id",
        serde_json::Value::String(execution_id.to_string()),
    );
    metrics.insert(
        "timestamp",
        serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
    );

    let summary = ServiceSequence::get_execution_summary(reports);
    metrics.insert(
        "summary",
        serde_json::Value::Object(summary.into_iter().collect()),
    );

    let service_metrics: Vec<serde_json::Value> = reports
        .iter()
        .map(|report| {
            let mut service_data = HashMap::new();
            service_data.insert(
                "name".to_string(),
                serde_json::Value::String(report.service.clone()),
            );
            service_data.insert(
                "pid".to_string(),
                report
                    .pid
                    .map(|pid| serde_json::Value::Number(pid.into()))
                    .unwrap_or(serde_json::Value::Null),
            );
            service_data.insert(
                "started_at".to_string(),
                serde_json::Value::String(report.started_at.to_rfc3339()),
            );
            service_data.insert(
                "ready_after_ms".to_string(),
                report
                    .ready_after
                    .map(|d| serde_json::Value::Number((d.as_millis() as u64).into()))
                    .unwrap_or(serde_json::Value::Null),
            );

            serde_json::Value::Object(service_data.into_iter().collect())
        })
        .collect();

    metrics.insert("services", serde_json::Value::Array(service_metrics));

    let metrics_json = serde_json::to_string_pretty(&metrics)?;
    tokio::fs::write(metrics_file, metrics_json).await?;

    tracing::info!("📊 Launch metrics exported to: {}", metrics_file);
    println!("📊 Metrics exported to: {}", metrics_file);

    Ok(())
}
