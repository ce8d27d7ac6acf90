use crate::utils::error::{PipelineError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(PipelineError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(PipelineError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

/// File names must not escape the output directory.
pub fn validate_file_name(field_name: &str, name: &str) -> Result<()> {
    validate_path(field_name, name)?;

    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(PipelineError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: name.to_string(),
            reason: "Expected a plain file name without directory components".to_string(),
        });
    }
    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(PipelineError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PipelineError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if !(value >= min && value <= max) {
        return Err(PipelineError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// Open interval (0, 1).
pub fn validate_fraction(field_name: &str, value: f64) -> Result<()> {
    if !(value > 0.0 && value < 1.0) {
        return Err(PipelineError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value must be strictly between 0 and 1".to_string(),
        });
    }
    Ok(())
}

pub fn validate_non_negative(field_name: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(PipelineError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value must be a finite number >= 0".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("data.input_path", "data/reviews.tsv").is_ok());
        assert!(validate_path("data.input_path", "").is_err());
        assert!(validate_path("data.input_path", "   ").is_err());
        assert!(validate_path("data.input_path", "bad\0path").is_err());
    }

    #[test]
    fn test_validate_file_name() {
        assert!(validate_file_name("output.model_file", "model.zip").is_ok());
        assert!(validate_file_name("output.model_file", "../model.zip").is_err());
        assert!(validate_file_name("output.model_file", "..").is_err());
    }

    #[test]
    fn test_validate_fraction() {
        assert!(validate_fraction("split.test_fraction", 0.2).is_ok());
        assert!(validate_fraction("split.test_fraction", 0.0).is_err());
        assert!(validate_fraction("split.test_fraction", 1.0).is_err());
        assert!(validate_fraction("split.test_fraction", f64::NAN).is_err());
    }

    #[test]
    fn test_validate_range_and_numbers() {
        assert!(validate_range("featurizer.word_ngram_length", 2, 1, 3).is_ok());
        assert!(validate_range("featurizer.word_ngram_length", 4, 1, 3).is_err());
        assert!(validate_positive_number("trainer.history_size", 0, 1).is_err());
        assert!(validate_non_negative("trainer.l1_regularization", -0.5).is_err());
        assert!(validate_non_negative("trainer.l1_regularization", 0.0).is_ok());
        assert!(validate_non_empty_string("data.text_column", " ").is_err());
    }
}
