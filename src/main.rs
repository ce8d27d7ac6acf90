use clap::Parser;
use sentiment_trainer::core::TrainingReport;
use sentiment_trainer::utils::{logger, validation::Validate};
use sentiment_trainer::{CliConfig, LocalStorage, SentimentPipeline, TrainingEngine};

fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting sentiment-train");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.severity().exit_code().max(1));
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 創建存儲和管道
    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = SentimentPipeline::new(storage, config);

    let engine = TrainingEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run() {
        Ok(report) => print_report(&report),
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Training failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = e.severity().exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }
}

fn print_report(report: &TrainingReport) {
    println!("✅ Training completed successfully!");
    println!("{}", report);
}
