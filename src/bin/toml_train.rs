use anyhow::Context;
use clap::Parser;
use sentiment_trainer::core::ConfigProvider;
use sentiment_trainer::data::{planned_sizes, SentimentDataset};
use sentiment_trainer::utils::{logger, validation::Validate};
use sentiment_trainer::{LocalStorage, SentimentPipeline, TomlConfig, TrainingEngine};

#[derive(Parser)]
#[command(name = "toml-train")]
#[command(about = "Sentiment model training with TOML configuration support")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "sentiment-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override the input file from config
    #[arg(long)]
    input: Option<String>,

    /// Dry run - inspect the input and configuration without training
    #[arg(long)]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 載入 TOML 配置
    let mut config = TomlConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config file '{}'", args.config))?;

    // 初始化日誌
    if config.json_logs() {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting TOML-based sentiment training");
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    // 應用命令列覆蓋設定
    if let Some(input) = &args.input {
        config.data.input_path = input.clone();
        tracing::info!("🔧 Input overridden to: {}", input);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.severity().exit_code().max(1));
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No training will occur");
        return perform_dry_run(&config);
    }

    // 決定監控設定
    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(config.output_path().to_string());
    let pipeline = SentimentPipeline::new(storage, config);
    let engine = TrainingEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run() {
        Ok(report) => {
            println!("✅ Training completed successfully!");
            println!("{}", report);
        }
        Err(e) => {
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

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Pipeline: {}", config.pipeline.name);
    if let Some(description) = &config.pipeline.description {
        println!("  Description: {}", description);
    }
    println!("  Input: {}", config.input_path());
    println!(
        "  Output: {}/{}",
        config.output_path(),
        config.model_file()
    );
    println!(
        "  Split: test_fraction={} seed={} stratify={}",
        config.split.test_fraction, config.split.seed, config.split.stratify
    );
    println!(
        "  Trainer: L1={} L2={} tolerance={:e}",
        config.trainer.l1_regularization,
        config.trainer.l2_regularization,
        config.trainer.optimization_tolerance
    );

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &TomlConfig) -> anyhow::Result<()> {
    println!("🔍 Dry Run Analysis:");
    println!();

    let dataset = SentimentDataset::open(config.input_path(), config.data_options())
        .with_context(|| format!("cannot open input '{}'", config.input_path()))?;

    println!("📄 Schema:");
    for column in &dataset.schema().columns {
        println!("  #{} {} ({:?})", column.index, column.name, column.kind);
    }

    let mut rows = dataset.records()?;
    let mut negative = 0usize;
    let mut positive = 0usize;
    for record in rows.by_ref() {
        let record = record.context("input row could not be read")?;
        if record.is_negative {
            negative += 1;
        } else {
            positive += 1;
        }
    }

    println!();
    println!("📊 Rows:");
    println!("  Negative: {}", negative);
    println!("  Positive: {}", positive);
    if rows.skipped() > 0 {
        println!("  Skipped (malformed): {}", rows.skipped());
    }

    let (train_rows, test_rows) = planned_sizes(negative, positive, &config.split);
    println!(
        "  Expected split: {} training / {} validation",
        train_rows, test_rows
    );

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");

    Ok(())
}
