use clap::Parser;
use sentiment_trainer::core::artifact::{
    self, FEATURIZER_ENTRY, METADATA_ENTRY, MODEL_ENTRY, SCHEMA_ENTRY,
};
use sentiment_trainer::core::{Pipeline, TrainingReport};
use sentiment_trainer::{
    CliConfig, LocalStorage, PipelineError, SentimentPipeline, TrainingEngine,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const NEGATIVE: [&str; 6] = [
    "The food was terrible and cold",
    "Awful service, never coming back",
    "Worst meal I have had in years",
    "The waiter was rude and slow",
    "Bland soup and a dirty table",
    "Overpriced and disappointing",
];

const POSITIVE: [&str; 6] = [
    "Wonderful dinner, great staff",
    "The pasta was delicious",
    "Lovely place with friendly service",
    "Best dessert in town",
    "Fresh ingredients and a nice view",
    "Amazing experience, highly recommended",
];

const LIGHT_REGULARIZATION: [&str; 4] = [
    "--l1-regularization",
    "0",
    "--l2-regularization",
    "0.1",
];

fn write_reviews(dir: &Path, name: &str, rounds: usize) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "Text\tIsNegative").unwrap();
    for round in 0..rounds {
        for text in NEGATIVE {
            writeln!(file, "{} #{}\ttrue", text, round).unwrap();
        }
        for text in POSITIVE {
            writeln!(file, "{} #{}\tfalse", text, round).unwrap();
        }
    }
    path
}

fn cli_config(input: &Path, output: &Path, extra: &[&str]) -> CliConfig {
    let mut args = vec![
        "sentiment-train".to_string(),
        "--input".to_string(),
        input.display().to_string(),
        "--output-path".to_string(),
        output.display().to_string(),
    ];
    args.extend(extra.iter().map(|s| s.to_string()));
    CliConfig::parse_from(args)
}

fn run(config: CliConfig) -> sentiment_trainer::Result<TrainingReport> {
    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = SentimentPipeline::new(storage, config);
    TrainingEngine::new(pipeline).run()
}

#[test]
fn test_end_to_end_with_default_settings() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_reviews(temp_dir.path(), "reviews.tsv", 5);
    let output_dir = temp_dir.path().join("models");

    let report = run(cli_config(&input, &output_dir, &[])).unwrap();

    assert_eq!(report.training_rows, 48);
    assert_eq!(report.validation_rows, 12);
    assert!(report.output_path.ends_with("SentimentAnalysisDemoModel.zip"));
    let metrics = report.metrics.expect("validation metrics");
    assert_eq!(metrics.confusion_matrix.total(), 12);

    // Verify output file exists
    let model_path = output_dir.join("SentimentAnalysisDemoModel.zip");
    let bytes = std::fs::read(&model_path).unwrap();
    assert!(!bytes.is_empty());

    // Verify ZIP content
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.clone())).unwrap();
    let file_names: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect();
    assert_eq!(file_names.len(), 4);
    for entry in [SCHEMA_ENTRY, FEATURIZER_ENTRY, MODEL_ENTRY, METADATA_ENTRY] {
        assert!(file_names.contains(&entry.to_string()), "missing {}", entry);
    }

    let decoded = artifact::decode(&bytes).unwrap();
    assert_eq!(decoded.metadata.training_rows, 48);
    assert_eq!(decoded.metadata.validation_rows, 12);
    assert_eq!(decoded.metadata.pipeline_name, "sentiment-analysis");
    assert!(decoded.schema.column("Text").is_some());
    assert!(decoded.schema.column("IsNegative").is_some());
}

#[test]
fn test_model_separates_reviews() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_reviews(temp_dir.path(), "reviews.tsv", 5);

    let report = run(cli_config(&input, temp_dir.path(), &LIGHT_REGULARIZATION)).unwrap();

    let metrics = report.metrics.unwrap();
    assert!(metrics.accuracy > 0.9, "accuracy was {}", metrics.accuracy);
    assert!(metrics.auc.unwrap() > 0.9);
}

#[test]
fn test_saved_model_reproduces_scores() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_reviews(temp_dir.path(), "reviews.tsv", 4);
    let mut extra = vec!["--model-file", "scores.zip"];
    extra.extend(LIGHT_REGULARIZATION);
    let config = cli_config(&input, temp_dir.path(), &extra);

    let storage = LocalStorage::new(config.output_path.clone());
    let pipeline = SentimentPipeline::new(storage, config);

    let dataset = pipeline.extract().unwrap();
    let split = pipeline.split(&dataset).unwrap();
    let outcome = pipeline.fit(&dataset, &split.train).unwrap();
    let metrics = pipeline.evaluate(&outcome.model, &split.test).unwrap();
    let path = pipeline
        .save(&outcome, split.test.len(), Some(&metrics))
        .unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let decoded = artifact::decode(&bytes).unwrap();
    assert_eq!(decoded.model, outcome.model);

    for text in ["terrible and rude", "delicious pasta, friendly staff", ""] {
        assert_eq!(outcome.model.predict(text), decoded.model.predict(text));
    }
    assert!(decoded.model.predict("terrible and rude waiter").predicted_label);
}

#[test]
fn test_same_seed_gives_same_model() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_reviews(temp_dir.path(), "reviews.tsv", 3);
    let first_dir = temp_dir.path().join("first");
    let second_dir = temp_dir.path().join("second");

    run(cli_config(&input, &first_dir, &["--seed", "7"])).unwrap();
    run(cli_config(&input, &second_dir, &["--seed", "7"])).unwrap();

    let read = |dir: &Path| {
        let bytes = std::fs::read(dir.join("SentimentAnalysisDemoModel.zip")).unwrap();
        artifact::decode(&bytes).unwrap()
    };
    let first = read(&first_dir);
    let second = read(&second_dir);

    assert_eq!(first.model, second.model);
    assert_eq!(first.metadata.metrics, second.metadata.metrics);
}

#[test]
fn test_missing_input_file() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("does-not-exist.tsv");

    let err = run(cli_config(&input, temp_dir.path(), &[])).unwrap_err();
    assert!(matches!(err, PipelineError::IoError(_)));
    assert!(!temp_dir
        .path()
        .join("SentimentAnalysisDemoModel.zip")
        .exists());
}

#[test]
fn test_missing_label_column_is_schema_error() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("no-label.tsv");
    std::fs::write(&input, "Text\tSentiment\nnice place\tfalse\n").unwrap();

    let err = run(cli_config(&input, temp_dir.path(), &[])).unwrap_err();
    assert!(matches!(err, PipelineError::SchemaError { .. }));
}

#[test]
fn test_malformed_rows_fail_or_skip() {
    let temp_dir = TempDir::new().unwrap();
    let input = write_reviews(temp_dir.path(), "reviews.tsv", 3);
    {
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&input)
            .unwrap();
        writeln!(file, "a row with an unreadable label\tmaybe").unwrap();
        writeln!(file, "a row without any label column").unwrap();
    }

    let err = run(cli_config(&input, temp_dir.path(), &[])).unwrap_err();
    assert!(matches!(err, PipelineError::MalformedRow { .. }));

    let report = run(cli_config(&input, temp_dir.path(), &["--skip-malformed"])).unwrap();
    assert_eq!(report.training_rows + report.validation_rows, 36);
}

#[test]
fn test_single_class_input_is_training_error() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("negative-only.tsv");
    let mut content = String::from("Text\tIsNegative\n");
    for text in NEGATIVE {
        content.push_str(&format!("{}\ttrue\n", text));
    }
    std::fs::write(&input, content).unwrap();

    let err = run(cli_config(&input, temp_dir.path(), &[])).unwrap_err();
    assert!(matches!(err, PipelineError::TrainingError { .. }));
    assert_eq!(err.severity().exit_code(), 2);
}

#[test]
fn test_comma_separated_input_without_header() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("reviews.csv");
    let mut content = String::new();
    for round in 0..3 {
        for text in NEGATIVE {
            content.push_str(&format!("\"{} {}\",1\n", text, round));
        }
        for text in POSITIVE {
            content.push_str(&format!("\"{} {}\",0\n", text, round));
        }
    }
    std::fs::write(&input, content).unwrap();

    let report = run(cli_config(
        &input,
        temp_dir.path(),
        &[
            "--separator",
            "comma",
            "--allow-quoting",
            "--no-header",
            "--stratify",
        ],
    ))
    .unwrap();
    assert_eq!(report.training_rows + report.validation_rows, 36);

    // 分層抽樣：每個標籤各保留 round(18 * 0.2) 筆
    let cm = report.metrics.unwrap().confusion_matrix;
    assert_eq!(cm.tp + cm.fn_count, 4);
    assert_eq!(cm.tn + cm.fp, 4);
}

#[test]
fn test_quote_characters_in_reviews_keep_every_row() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("quoted.tsv");
    let mut content = String::from("Text\tIsNegative\n");
    for round in 0..3 {
        for text in NEGATIVE {
            content.push_str(&format!("\"{} {}\ttrue\n", text, round));
        }
        for text in POSITIVE {
            content.push_str(&format!("{} \"really\" {}\tfalse\n", text, round));
        }
    }
    std::fs::write(&input, content).unwrap();

    let report = run(cli_config(&input, temp_dir.path(), &[])).unwrap();
    assert_eq!(report.training_rows + report.validation_rows, 36);
}
