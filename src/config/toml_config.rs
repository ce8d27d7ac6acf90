use crate::config::{validate_provider, DEFAULT_MODEL_FILE, DEFAULT_PIPELINE_NAME};
use crate::core::ConfigProvider;
use crate::data::loader::{
    parse_separator, DataOptions, MalformedRowPolicy, DEFAULT_LABEL_COLUMN, DEFAULT_TEXT_COLUMN,
};
use crate::data::split::SplitOptions;
use crate::ml::featurizer::FeaturizerOptions;
use crate::ml::logistic::LbfgsOptions;
use crate::utils::error::{PipelineError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub split: SplitOptions,
    #[serde(default)]
    pub featurizer: FeaturizerOptions,
    #[serde(default)]
    pub trainer: LbfgsOptions,
    #[serde(default)]
    pub output: OutputConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PIPELINE_NAME.to_string(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub input_path: String,
    pub separator: String,
    pub has_header: bool,
    pub text_column: String,
    pub label_column: String,
    pub text_index: usize,
    pub label_index: usize,
    pub on_malformed_row: MalformedRowPolicy,
    pub allow_quoting: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            input_path: String::new(),
            separator: "tab".to_string(),
            has_header: true,
            text_column: DEFAULT_TEXT_COLUMN.to_string(),
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
            text_index: 0,
            label_index: 1,
            on_malformed_row: MalformedRowPolicy::Error,
            allow_quoting: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub output_path: String,
    pub model_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_path: ".".to_string(),
            model_file: DEFAULT_MODEL_FILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PipelineError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PipelineError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SENTIMENT_DATA})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| PipelineError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        parse_separator(&self.data.separator)?;

        if self.data.input_path.contains("${") {
            return Err(PipelineError::ConfigValidationError {
                field: "data.input_path".to_string(),
                message: format!(
                    "unresolved environment variable in '{}'",
                    self.data.input_path
                ),
            });
        }

        validate_provider(self)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn pipeline_name(&self) -> &str {
        &self.pipeline.name
    }

    fn input_path(&self) -> &str {
        &self.data.input_path
    }

    fn output_path(&self) -> &str {
        &self.output.output_path
    }

    fn model_file(&self) -> &str {
        &self.output.model_file
    }

    fn data_options(&self) -> DataOptions {
        let defaults = DataOptions::default();
        DataOptions {
            separator: parse_separator(&self.data.separator).unwrap_or(defaults.separator),
            has_header: self.data.has_header,
            text_column: self.data.text_column.clone(),
            label_column: self.data.label_column.clone(),
            text_index: self.data.text_index,
            label_index: self.data.label_index,
            on_malformed_row: self.data.on_malformed_row,
            allow_quoting: self.data.allow_quoting,
        }
    }

    fn split_options(&self) -> SplitOptions {
        self.split.clone()
    }

    fn featurizer_options(&self) -> FeaturizerOptions {
        self.featurizer.clone()
    }

    fn trainer_options(&self) -> LbfgsOptions {
        self.trainer.clone()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
