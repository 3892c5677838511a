use clap::Parser;
use networth_tracker::config::YamlConfig;
use networth_tracker::utils::{logger, validation::Validate};
use networth_tracker::{LocalStorage, QuarterlyReportPipeline, ReportEngine};

#[derive(Parser)]
#[command(name = "networth-tracker")]
#[command(about = "Quarterly net worth reporting job (GIS valuations + email snapshot)")]
struct Args {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Render everything but skip the email send
    #[arg(long)]
    dry_run: bool,

    /// Skip only the email send (snapshot and bundle still written)
    #[arg(long)]
    skip_send: bool,

    /// Enable system monitoring
    #[arg(long)]
    monitor: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting networth-tracker");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    // 載入 YAML 配置
    let mut config = match YamlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid YAML format");
            std::process::exit(1);
        }
    };

    // 應用命令列覆蓋設定
    let delivery = config.delivery.get_or_insert_with(Default::default);
    if args.dry_run {
        delivery.dry_run = Some(true);
        tracing::info!("🔧 Dry-run mode enabled from command line");
    }
    if args.skip_send {
        delivery.skip_send = Some(true);
        tracing::info!("🔧 Email send disabled from command line");
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
        perform_dry_run_analysis(&config);
    }

    if args.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 創建存儲和報表管道
    let storage = LocalStorage::new(config.output_dir().to_string());
    let pipeline = QuarterlyReportPipeline::new(storage, config);

    // 創建引擎並運行
    let engine = ReportEngine::new_with_monitoring(pipeline, args.monitor);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Quarterly report run completed successfully!");
            tracing::info!("📁 Output saved to: {}", output_path);
            println!("✅ Quarterly report run completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Report run failed: {} (Category: {:?}, Severity: {:?})",
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
                networth_tracker::utils::error::ErrorSeverity::Low => 0,
                networth_tracker::utils::error::ErrorSeverity::Medium => 2, // 重試錯誤
                networth_tracker::utils::error::ErrorSeverity::High => 1,   // 處理錯誤
                networth_tracker::utils::error::ErrorSeverity::Critical => 3, // 系統錯誤
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &YamlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Report: {}", config.report.name);
    println!("  Holdings: {}", config.real_estate.len());
    println!("  GIS endpoints: {}", config.gis.endpoints.len());
    println!("  Snapshots: {}", config.snapshots_dir());
    println!("  Output: {}", config.output_dir());
    println!(
        "  Securities master: {}",
        config.securities_master_path().unwrap_or("(disabled)")
    );
    println!("  Chart series: {}", config.chart.series.len());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    } else if config.skip_send() {
        println!("  ⏭️ EMAIL SEND DISABLED");
    }

    println!();
}

fn perform_dry_run_analysis(config: &YamlConfig) {
    println!("🔍 Dry Run Analysis:");
    println!();

    println!("🏠 Real Estate Holdings:");
    for (key, holding) in &config.real_estate {
        println!(
            "  {} ({}): mode={}, ownership={:.0}%, fallback=${:.0}",
            holding.display_label(key),
            holding.county,
            holding.mode.as_str(),
            holding.ownership_pct.unwrap_or(1.0) * 100.0,
            holding.fallback_value.unwrap_or(0.0)
        );
    }

    println!();
    println!("📡 GIS Endpoints:");
    for (county, endpoint) in &config.gis.endpoints {
        println!("  {}: {}", county, endpoint.url);
        println!(
            "    fields: address={}, value={}",
            endpoint.address_field, endpoint.value_field
        );
    }
    println!(
        "  retries: {} attempts, {}s delay, {}s timeout",
        config.gis_retry_attempts(),
        config.gis_retry_delay_seconds(),
        config.gis_timeout_seconds()
    );

    println!();
    println!("📧 Delivery:");
    println!("  Subject: {}", config.email.subject);
    println!("  From: {}", config.email.from);
    println!("  To: ${} (env)", config.email.to_env);
    println!("  Token URL: {}", config.token_url());
    println!("  ⏭️ Send will be SKIPPED in this run");

    println!();
    println!("✅ Dry run analysis complete. Artifacts will still be written locally.");
    println!();
}
