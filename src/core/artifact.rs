use crate::data::loader::DatasetSchema;
use crate::ml::featurizer::TextFeaturizer;
use crate::ml::logistic::{LogisticRegressionModel, TrainingSummary};
use crate::ml::metrics::BinaryClassificationMetrics;
use crate::ml::TrainedModel;
use crate::utils::error::{PipelineError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Write};
use zip::write::{FileOptions, ZipWriter};
use zip::ZipArchive;

pub const SCHEMA_ENTRY: &str = "schema.json";
pub const FEATURIZER_ENTRY: &str = "featurizer.json";
pub const MODEL_ENTRY: &str = "model.json";
pub const METADATA_ENTRY: &str = "metadata.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub created_at: DateTime<Utc>,
    pub pipeline_name: String,
    pub training_rows: usize,
    pub validation_rows: usize,
    pub summary: TrainingSummary,
    pub metrics: Option<BinaryClassificationMetrics>,
}

/// Decoded contents of a model file.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    pub schema: DatasetSchema,
    pub model: TrainedModel,
    pub metadata: ArtifactMetadata,
}

pub fn encode(
    model: &TrainedModel,
    schema: &DatasetSchema,
    metadata: &ArtifactMetadata,
) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    write_json(&mut zip, SCHEMA_ENTRY, schema)?;
    write_json(&mut zip, FEATURIZER_ENTRY, &model.featurizer)?;
    write_json(&mut zip, MODEL_ENTRY, &model.classifier)?;
    write_json(&mut zip, METADATA_ENTRY, metadata)?;

    let cursor = zip.finish()?;
    let bytes = cursor.into_inner();
    tracing::debug!("Encoded model artifact ({} bytes)", bytes.len());
    Ok(bytes)
}

pub fn decode(bytes: &[u8]) -> Result<ModelArtifact> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let schema: DatasetSchema = read_json(&mut archive, SCHEMA_ENTRY)?;
    let featurizer: TextFeaturizer = read_json(&mut archive, FEATURIZER_ENTRY)?;
    let classifier: LogisticRegressionModel = read_json(&mut archive, MODEL_ENTRY)?;
    let metadata: ArtifactMetadata = read_json(&mut archive, METADATA_ENTRY)?;

    if classifier.weights.len() != featurizer.dimension() {
        return Err(PipelineError::ModelFormatError {
            message: format!(
                "classifier has {} weights but the featurizer produces {} features",
                classifier.weights.len(),
                featurizer.dimension()
            ),
        });
    }

    Ok(ModelArtifact {
        schema,
        model: TrainedModel {
            featurizer,
            classifier,
        },
        metadata,
    })
}

fn write_json<T: Serialize>(
    zip: &mut ZipWriter<Cursor<Vec<u8>>>,
    name: &str,
    value: &T,
) -> Result<()> {
    zip.start_file::<_, ()>(name, FileOptions::default())?;
    let json = serde_json::to_vec_pretty(value)?;
    zip.write_all(&json)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<T> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(PipelineError::ModelFormatError {
                message: format!("missing entry '{}'", name),
            })
        }
        Err(e) => return Err(e.into()),
    };

    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    serde_json::from_str(&content).map_err(|e| PipelineError::ModelFormatError {
        message: format!("invalid '{}': {}", name, e),
    })
}
