pub mod cli;
pub mod toml_config;

use crate::core::ConfigProvider;
use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::{
    validate_file_name, validate_fraction, validate_non_empty_string, validate_non_negative,
    validate_path, validate_positive_number, validate_range,
};

pub const DEFAULT_MODEL_FILE: &str = "SentimentAnalysisDemoModel.zip";
pub const DEFAULT_PIPELINE_NAME: &str = "sentiment-analysis";

/// Checks shared by every configuration source.
pub fn validate_provider<C: ConfigProvider>(config: &C) -> Result<()> {
    if config.input_path().is_empty() {
        return Err(PipelineError::MissingConfigError {
            field: "data.input_path".to_string(),
        });
    }
    validate_path("data.input_path", config.input_path())?;
    validate_path("output.output_path", config.output_path())?;
    validate_file_name("output.model_file", config.model_file())?;

    let data = config.data_options();
    if data.has_header {
        validate_non_empty_string("data.text_column", &data.text_column)?;
        validate_non_empty_string("data.label_column", &data.label_column)?;
    }

    let split = config.split_options();
    validate_fraction("split.test_fraction", split.test_fraction)?;

    let featurizer = config.featurizer_options();
    validate_range("featurizer.word_ngram_length", featurizer.word_ngram_length, 1, 3)?;
    validate_range("featurizer.char_ngram_length", featurizer.char_ngram_length, 0, 8)?;

    let trainer = config.trainer_options();
    validate_non_negative("trainer.l1_regularization", trainer.l1_regularization as f64)?;
    validate_non_negative("trainer.l2_regularization", trainer.l2_regularization as f64)?;
    validate_range(
        "trainer.optimization_tolerance",
        trainer.optimization_tolerance,
        f64::MIN_POSITIVE,
        1.0,
    )?;
    validate_positive_number("trainer.history_size", trainer.history_size, 1)?;
    validate_positive_number("trainer.max_iterations", trainer.max_iterations, 1)?;

    Ok(())
}

#[cfg(feature = "cli")]
pub use args::CliConfig;

#[cfg(feature = "cli")]
mod args {
    use super::{validate_provider, DEFAULT_MODEL_FILE, DEFAULT_PIPELINE_NAME};
    use crate::core::ConfigProvider;
    use crate::data::loader::{
        parse_separator, DataOptions, MalformedRowPolicy, DEFAULT_LABEL_COLUMN,
        DEFAULT_TEXT_COLUMN,
    };
    use crate::data::split::SplitOptions;
    use crate::ml::featurizer::{CaseMode, FeaturizerOptions, Norm};
    use crate::ml::logistic::LbfgsOptions;
    use crate::utils::error::Result;
    use crate::utils::validation::Validate;
    use clap::Parser;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "sentiment-train")]
    #[command(about = "Train a binary sentiment classifier from a labeled text file")]
    pub struct CliConfig {
        #[arg(short, long, help = "Labeled input file (header row, text + IsNegative columns)")]
        pub input: String,

        #[arg(long, default_value = ".")]
        pub output_path: String,

        #[arg(long, default_value = DEFAULT_MODEL_FILE)]
        pub model_file: String,

        #[arg(long, default_value = DEFAULT_PIPELINE_NAME)]
        pub pipeline_name: String,

        #[arg(long, default_value = "tab", help = "Column separator: tab, comma, semicolon, pipe or a single character")]
        pub separator: String,

        #[arg(long, help = "Input has no header row; columns are taken by position")]
        pub no_header: bool,

        #[arg(long, default_value = DEFAULT_TEXT_COLUMN)]
        pub text_column: String,

        #[arg(long, default_value = DEFAULT_LABEL_COLUMN)]
        pub label_column: String,

        #[arg(long, help = "Drop rows that cannot be parsed instead of failing")]
        pub skip_malformed: bool,

        #[arg(long, help = "Treat '\"' as a field quote (off: quotes are part of the text)")]
        pub allow_quoting: bool,

        #[arg(long, default_value_t = 0.2)]
        pub test_fraction: f64,

        #[arg(long, default_value_t = 42)]
        pub seed: u64,

        #[arg(long, help = "Keep the label ratio in both partitions")]
        pub stratify: bool,

        #[arg(long, value_enum, default_value_t = CaseMode::Lower)]
        pub case_mode: CaseMode,

        #[arg(long)]
        pub remove_punctuation: bool,

        #[arg(long)]
        pub remove_numbers: bool,

        #[arg(long, default_value_t = 1)]
        pub word_ngram_length: usize,

        #[arg(long, default_value_t = 3)]
        pub char_ngram_length: usize,

        #[arg(long, value_enum, default_value_t = Norm::L2)]
        pub norm: Norm,

        #[arg(long, default_value_t = 1.0)]
        pub l1_regularization: f32,

        #[arg(long, default_value_t = 1.0)]
        pub l2_regularization: f32,

        #[arg(long, default_value_t = 1e-7)]
        pub optimization_tolerance: f64,

        #[arg(long, default_value_t = 20)]
        pub history_size: usize,

        #[arg(long, default_value_t = 1000)]
        pub max_iterations: usize,

        #[arg(short, long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Emit logs as JSON lines")]
        pub json_logs: bool,

        #[arg(long, help = "Log CPU and memory usage per phase")]
        pub monitor: bool,
    }

    impl ConfigProvider for CliConfig {
        fn pipeline_name(&self) -> &str {
            &self.pipeline_name
        }

        fn input_path(&self) -> &str {
            &self.input
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn model_file(&self) -> &str {
            &self.model_file
        }

        fn data_options(&self) -> DataOptions {
            let defaults = DataOptions::default();
            DataOptions {
                // 無效的分隔符號會在 validate() 中被拒絕
                separator: parse_separator(&self.separator).unwrap_or(defaults.separator),
                has_header: !self.no_header,
                text_column: self.text_column.clone(),
                label_column: self.label_column.clone(),
                on_malformed_row: if self.skip_malformed {
                    MalformedRowPolicy::Skip
                } else {
                    MalformedRowPolicy::Error
                },
                allow_quoting: self.allow_quoting,
                ..defaults
            }
        }

        fn split_options(&self) -> SplitOptions {
            SplitOptions {
                test_fraction: self.test_fraction,
                seed: self.seed,
                stratify: self.stratify,
            }
        }

        fn featurizer_options(&self) -> FeaturizerOptions {
            FeaturizerOptions {
                case_mode: self.case_mode,
                keep_punctuation: !self.remove_punctuation,
                keep_numbers: !self.remove_numbers,
                word_ngram_length: self.word_ngram_length,
                char_ngram_length: self.char_ngram_length,
                norm: self.norm,
            }
        }

        fn trainer_options(&self) -> LbfgsOptions {
            LbfgsOptions {
                l1_regularization: self.l1_regularization,
                l2_regularization: self.l2_regularization,
                optimization_tolerance: self.optimization_tolerance,
                history_size: self.history_size,
                max_iterations: self.max_iterations,
            }
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            parse_separator(&self.separator)?;
            validate_provider(self)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_defaults_match_demo_settings() {
            let config = CliConfig::parse_from(["sentiment-train", "--input", "reviews.tsv"]);
            assert!(config.validate().is_ok());
            assert_eq!(config.model_file(), "SentimentAnalysisDemoModel.zip");
            assert_eq!(config.data_options(), DataOptions::default());
            assert_eq!(config.split_options(), SplitOptions::default());
            assert_eq!(config.featurizer_options(), FeaturizerOptions::default());
            assert_eq!(config.trainer_options(), LbfgsOptions::default());
        }

        #[test]
        fn test_flags_map_to_options() {
            let config = CliConfig::parse_from([
                "sentiment-train",
                "--input",
                "reviews.csv",
                "--separator",
                "comma",
                "--skip-malformed",
                "--allow-quoting",
                "--stratify",
                "--norm",
                "l1",
                "--word-ngram-length",
                "2",
                "--l1-regularization",
                "0",
            ]);
            assert!(config.validate().is_ok());
            assert_eq!(config.data_options().separator, b',');
            assert_eq!(
                config.data_options().on_malformed_row,
                MalformedRowPolicy::Skip
            );
            assert!(config.data_options().allow_quoting);
            assert!(config.split_options().stratify);
            assert_eq!(config.featurizer_options().norm, Norm::L1);
            assert_eq!(config.trainer_options().l1_regularization, 0.0);
        }

        #[test]
        fn test_invalid_values_rejected() {
            let bad_separator =
                CliConfig::parse_from(["sentiment-train", "--input", "a.tsv", "--separator", "::"]);
            assert!(bad_separator.validate().is_err());

            let bad_fraction = CliConfig::parse_from([
                "sentiment-train",
                "--input",
                "a.tsv",
                "--test-fraction",
                "1.5",
            ]);
            assert!(bad_fraction.validate().is_err());

            let empty_input = CliConfig::parse_from(["sentiment-train", "--input", ""]);
            assert!(empty_input.validate().is_err());
        }
    }
}
