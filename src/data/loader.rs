use crate::domain::model::SentimentRecord;
use crate::utils::error::{PipelineError, Result};
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

pub const DEFAULT_TEXT_COLUMN: &str = "Text";
pub const DEFAULT_LABEL_COLUMN: &str = "IsNegative";

/// What to do with a row whose label cannot be parsed or that lacks a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum MalformedRowPolicy {
    #[default]
    Error,
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataOptions {
    pub separator: u8,
    pub has_header: bool,
    pub text_column: String,
    pub label_column: String,
    /// Column positions used when the file has no header row.
    pub text_index: usize,
    pub label_index: usize,
    pub on_malformed_row: MalformedRowPolicy,
    /// Treat `"` as a field quote. Off by default, so quotes in review text are kept verbatim.
    pub allow_quoting: bool,
}

impl Default for DataOptions {
    fn default() -> Self {
        Self {
            separator: b'\t',
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub index: usize,
    pub kind: ColumnKind,
}

/// Layout of the file a model was trained on. Stored in the model artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSchema {
    pub columns: Vec<ColumnSchema>,
    pub separator: char,
    pub has_header: bool,
    #[serde(default)]
    pub allow_quoting: bool,
}

impl DatasetSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Lazy handle over a labeled text file. Opening reads only the header;
/// rows are parsed while iterating.
#[derive(Debug, Clone)]
pub struct SentimentDataset {
    path: PathBuf,
    options: DataOptions,
    schema: DatasetSchema,
    text_index: usize,
    label_index: usize,
}

impl SentimentDataset {
    pub fn open<P: AsRef<Path>>(path: P, options: DataOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let mut reader = reader_builder(&options).from_reader(file);

        let (text_index, label_index) = if options.has_header {
            let headers = reader.headers()?.clone();
            tracing::debug!("Header row: {:?}", headers);
            (
                find_column(&headers, &options.text_column)?,
                find_column(&headers, &options.label_column)?,
            )
        } else {
            (options.text_index, options.label_index)
        };

        if text_index == label_index {
            return Err(PipelineError::SchemaError {
                message: format!(
                    "text column '{}' and label column '{}' resolve to the same position {}",
                    options.text_column, options.label_column, text_index
                ),
            });
        }

        let schema = DatasetSchema {
            columns: vec![
                ColumnSchema {
                    name: options.label_column.clone(),
                    index: label_index,
                    kind: ColumnKind::Boolean,
                },
                ColumnSchema {
                    name: options.text_column.clone(),
                    index: text_index,
                    kind: ColumnKind::Text,
                },
            ],
            separator: char::from(options.separator),
            has_header: options.has_header,
            allow_quoting: options.allow_quoting,
        };

        tracing::debug!(
            "Opened dataset '{}' (text column #{}, label column #{})",
            path.display(),
            text_index,
            label_index
        );

        Ok(Self {
            path,
            options,
            schema,
            text_index,
            label_index,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    /// Streams the rows of the file. Each call starts from the top.
    pub fn records(&self) -> Result<RecordIter> {
        let file = File::open(&self.path)?;
        let reader = reader_builder(&self.options).from_reader(file);

        Ok(RecordIter {
            inner: reader.into_records(),
            text_index: self.text_index,
            label_index: self.label_index,
            policy: self.options.on_malformed_row,
            skipped: 0,
        })
    }

    pub fn collect_records(&self) -> Result<Vec<SentimentRecord>> {
        let mut iter = self.records()?;
        let mut records = Vec::new();
        for record in iter.by_ref() {
            records.push(record?);
        }

        if iter.skipped() > 0 {
            tracing::warn!("Skipped {} malformed rows", iter.skipped());
        }
        tracing::debug!("Read {} rows from '{}'", records.len(), self.path.display());
        Ok(records)
    }
}

pub struct RecordIter {
    inner: StringRecordsIntoIter<File>,
    text_index: usize,
    label_index: usize,
    policy: MalformedRowPolicy,
    skipped: usize,
}

impl RecordIter {
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn parse(&self, row: &StringRecord) -> std::result::Result<SentimentRecord, PipelineError> {
        let line = row.position().map(|p| p.line()).unwrap_or(0);

        let label = row
            .get(self.label_index)
            .ok_or_else(|| PipelineError::MalformedRow {
                line,
                reason: format!("missing label column #{}", self.label_index),
            })?;
        let text = row
            .get(self.text_index)
            .ok_or_else(|| PipelineError::MalformedRow {
                line,
                reason: format!("missing text column #{}", self.text_index),
            })?;

        let is_negative = parse_label(label).ok_or_else(|| PipelineError::MalformedRow {
            line,
            reason: format!("cannot parse '{}' as a boolean label", label),
        })?;

        Ok(SentimentRecord::new(text, is_negative))
    }
}

impl Iterator for RecordIter {
    type Item = Result<SentimentRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let parsed = match self.inner.next()? {
                Ok(row) => self.parse(&row),
                Err(e) => {
                    let utf8_line = match e.kind() {
                        csv::ErrorKind::Utf8 { pos, .. } => {
                            Some(pos.as_ref().map(|p| p.line()).unwrap_or(0))
                        }
                        _ => None,
                    };
                    match utf8_line {
                        Some(line) => Err(PipelineError::MalformedRow {
                            line,
                            reason: "row is not valid UTF-8".to_string(),
                        }),
                        None => return Some(Err(e.into())),
                    }
                }
            };

            match parsed {
                Ok(record) => return Some(Ok(record)),
                Err(e) if self.policy == MalformedRowPolicy::Skip => {
                    tracing::warn!("Skipping row: {}", e);
                    self.skipped += 1;
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

fn reader_builder(options: &DataOptions) -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder
        .delimiter(options.separator)
        .has_headers(options.has_header)
        .quoting(options.allow_quoting)
        .flexible(true);
    builder
}

fn find_column(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}').trim() == name)
        .ok_or_else(|| PipelineError::SchemaError {
            message: format!(
                "column '{}' not found in header [{}]",
                name,
                headers.iter().collect::<Vec<_>>().join(", ")
            ),
        })
}

/// Accepts true/false, t/f, yes/no, y/n and 1/0, case-insensitive.
pub fn parse_label(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

pub fn parse_separator(value: &str) -> Result<u8> {
    let separator = match value {
        "tab" | "\\t" | "\t" => b'\t',
        "comma" | "," => b',',
        "semicolon" | ";" => b';',
        "pipe" | "|" => b'|',
        "space" | " " => b' ',
        other if other.len() == 1 && other.is_ascii() => other.as_bytes()[0],
        other => {
            return Err(PipelineError::InvalidConfigValueError {
                field: "data.separator".to_string(),
                value: other.to_string(),
                reason: "Expected a single ASCII character or one of: tab, comma, semicolon, pipe, space".to_string(),
            })
        }
    };
    Ok(separator)
}
