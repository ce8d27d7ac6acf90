use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Schema error: {message}")]
    SchemaError { message: String },

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("Empty dataset: {message}")]
    EmptyDataset { message: String },

    #[error("Training error: {message}")]
    TrainingError { message: String },

    #[error("Evaluation error: {message}")]
    EvaluationError { message: String },

    #[error("Model format error: {message}")]
    ModelFormatError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Data,
    Training,
    Storage,
    Serialization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// 根據錯誤嚴重程度決定退出碼
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,      // 警告，但成功
            ErrorSeverity::Medium => 2,   // 訓練錯誤，可調整參數重試
            ErrorSeverity::High => 1,     // 輸入或配置錯誤
            ErrorSeverity::Critical => 3, // 系統錯誤
        }
    }
}

impl PipelineError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PipelineError::ConfigValidationError { .. }
            | PipelineError::InvalidConfigValueError { .. }
            | PipelineError::MissingConfigError { .. } => ErrorCategory::Configuration,
            PipelineError::CsvError(_)
            | PipelineError::SchemaError { .. }
            | PipelineError::MalformedRow { .. }
            | PipelineError::EmptyDataset { .. } => ErrorCategory::Data,
            PipelineError::TrainingError { .. } | PipelineError::EvaluationError { .. } => {
                ErrorCategory::Training
            }
            PipelineError::IoError(_) | PipelineError::ZipError(_) => ErrorCategory::Storage,
            PipelineError::SerializationError(_) | PipelineError::ModelFormatError { .. } => {
                ErrorCategory::Serialization
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Training => ErrorSeverity::Medium,
            ErrorCategory::Storage | ErrorCategory::Serialization => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            PipelineError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                "Check that the input file path exists and is readable".to_string()
            }
            PipelineError::IoError(_) => {
                "Check file permissions and free disk space for the output directory".to_string()
            }
            PipelineError::CsvError(_) => {
                "Make sure the input file uses the configured separator and has a consistent column count".to_string()
            }
            PipelineError::ZipError(_) | PipelineError::ModelFormatError { .. } => {
                "The model file is damaged or was not written by this tool; retrain to regenerate it".to_string()
            }
            PipelineError::SerializationError(_) => {
                "Retrain the model; the artifact contents could not be encoded".to_string()
            }
            PipelineError::ConfigValidationError { field, .. }
            | PipelineError::InvalidConfigValueError { field, .. } => {
                format!("Fix the value of '{}' and run again", field)
            }
            PipelineError::MissingConfigError { field } => {
                format!("Provide a value for '{}'", field)
            }
            PipelineError::SchemaError { .. } => {
                "Check --text-column / --label-column against the header row of the input file".to_string()
            }
            PipelineError::MalformedRow { .. } => {
                "Fix the row, or rerun with --skip-malformed to drop unparsable rows".to_string()
            }
            PipelineError::EmptyDataset { .. } => {
                "Provide an input file with at least one labeled row".to_string()
            }
            PipelineError::TrainingError { .. } => {
                "Make sure the training data contains both labels, or adjust the regularization settings".to_string()
            }
            PipelineError::EvaluationError { .. } => {
                "Increase --test-fraction so the validation set is not empty".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Data => format!("Could not read the training data: {}", self),
            ErrorCategory::Training => format!("Model training failed: {}", self),
            ErrorCategory::Storage => format!("File access failed: {}", self),
            ErrorCategory::Serialization => format!("Model file could not be processed: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
