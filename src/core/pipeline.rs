use crate::core::artifact::{self, ArtifactMetadata};
use crate::core::{ConfigProvider, Pipeline, SentimentRecord, Storage, TrainTestSplit, TrainingOutcome};
use crate::data::loader::SentimentDataset;
use crate::data::split::train_test_split;
use crate::ml::featurizer::{SparseVector, TextFeaturizer};
use crate::ml::logistic::LbfgsLogisticRegressionTrainer;
use crate::ml::metrics::{self, BinaryClassificationMetrics};
use crate::ml::TrainedModel;
use crate::utils::error::Result;
use chrono::Utc;
use std::path::Path;

pub struct SentimentPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> SentimentPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

impl<S: Storage, C: ConfigProvider> Pipeline for SentimentPipeline<S, C> {
    fn extract(&self) -> Result<SentimentDataset> {
        tracing::debug!("Opening input file: {}", self.config.input_path());
        SentimentDataset::open(self.config.input_path(), self.config.data_options())
    }

    fn split(&self, dataset: &SentimentDataset) -> Result<TrainTestSplit> {
        let records = dataset.collect_records()?;
        tracing::info!("Loaded {} labeled rows", records.len());
        train_test_split(records, &self.config.split_options())
    }

    fn fit(&self, dataset: &SentimentDataset, train: &[SentimentRecord]) -> Result<TrainingOutcome> {
        let featurizer = TextFeaturizer::fit(
            self.config.featurizer_options(),
            train.iter().map(|r| r.text.as_str()),
        );

        let features: Vec<SparseVector> = train
            .iter()
            .map(|r| featurizer.transform(&r.text))
            .collect();
        let labels: Vec<bool> = train.iter().map(|r| r.is_negative).collect();

        let trainer = LbfgsLogisticRegressionTrainer::new(self.config.trainer_options());
        let (classifier, summary) = trainer.fit(&features, &labels, featurizer.dimension())?;

        tracing::debug!(
            "Fit finished: {} iterations, objective={:.6}, {} non-zero weights",
            summary.iterations,
            summary.objective,
            summary.non_zero_weights
        );
        log_strongest_features(&featurizer, &classifier.weights);

        Ok(TrainingOutcome {
            model: TrainedModel {
                featurizer,
                classifier,
            },
            summary,
            schema: dataset.schema().clone(),
            training_rows: train.len(),
        })
    }

    fn evaluate(
        &self,
        model: &TrainedModel,
        validation: &[SentimentRecord],
    ) -> Result<BinaryClassificationMetrics> {
        let predictions = model.predict_batch(validation.iter().map(|r| r.text.as_str()));
        let labels: Vec<bool> = validation.iter().map(|r| r.is_negative).collect();
        metrics::evaluate(&predictions, &labels)
    }

    fn save(
        &self,
        outcome: &TrainingOutcome,
        validation_rows: usize,
        metrics: Option<&BinaryClassificationMetrics>,
    ) -> Result<String> {
        let metadata = ArtifactMetadata {
            created_at: Utc::now(),
            pipeline_name: self.config.pipeline_name().to_string(),
            training_rows: outcome.training_rows,
            validation_rows,
            summary: outcome.summary.clone(),
            metrics: metrics.cloned(),
        };

        let bytes = artifact::encode(&outcome.model, &outcome.schema, &metadata)?;

        tracing::debug!("Writing model file ({} bytes) to storage", bytes.len());
        self.storage.write_file(self.config.model_file(), &bytes)?;

        let output_path = Path::new(self.config.output_path())
            .join(self.config.model_file())
            .display()
            .to_string();
        Ok(output_path)
    }
}

/// Debug view of the terms the classifier leans on most.
fn log_strongest_features(featurizer: &TextFeaturizer, weights: &[f32]) -> Vec<(String, f32)> {
    const SHOWN: usize = 5;

    let mut ranked: Vec<(usize, f32)> = weights
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, w)| *w != 0.0)
        .collect();
    ranked.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));

    let strongest: Vec<(String, f32)> = ranked
        .into_iter()
        .take(SHOWN)
        .filter_map(|(index, weight)| featurizer.feature_name(index).map(|name| (name, weight)))
        .collect();

    tracing::debug!(
        "Vocabulary: {} word terms, {} char terms; strongest features: {:?}",
        featurizer.word_vocabulary().len(),
        featurizer.char_vocabulary().len(),
        strongest
    );
    strongest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::DataOptions;
    use crate::data::split::SplitOptions;
    use crate::ml::featurizer::FeaturizerOptions;
    use crate::ml::logistic::LbfgsOptions;
    use crate::utils::error::PipelineError;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io::Write;
    use std::rc::Rc;
    use tempfile::NamedTempFile;

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Rc<RefCell<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            self.files.borrow().get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            self.files.borrow_mut().insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        input_path: String,
    }

    impl ConfigProvider for MockConfig {
        fn pipeline_name(&self) -> &str {
            "mock"
        }

        fn input_path(&self) -> &str {
            &self.input_path
        }

        fn output_path(&self) -> &str {
            "test_output"
        }

        fn model_file(&self) -> &str {
            "model.zip"
        }

        fn data_options(&self) -> DataOptions {
            DataOptions::default()
        }

        fn split_options(&self) -> SplitOptions {
            SplitOptions::default()
        }

        fn featurizer_options(&self) -> FeaturizerOptions {
            FeaturizerOptions::default()
        }

        fn trainer_options(&self) -> LbfgsOptions {
            LbfgsOptions {
                l1_regularization: 0.0,
                l2_regularization: 0.1,
                ..LbfgsOptions::default()
            }
        }
    }

    fn reviews_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Text\tIsNegative").unwrap();
        for i in 0..30 {
            writeln!(file, "terrible awful meal number {}\ttrue", i).unwrap();
            writeln!(file, "wonderful tasty dinner number {}\tfalse", i).unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn pipeline(file: &NamedTempFile) -> (SentimentPipeline<MockStorage, MockConfig>, MockStorage) {
        let storage = MockStorage::default();
        let config = MockConfig {
            input_path: file.path().display().to_string(),
        };
        (SentimentPipeline::new(storage.clone(), config), storage)
    }

    #[test]
    fn test_extract_and_split() {
        let file = reviews_file();
        let (pipeline, _) = pipeline(&file);

        let dataset = pipeline.extract().unwrap();
        let split = pipeline.split(&dataset).unwrap();
        assert_eq!(split.train.len(), 48);
        assert_eq!(split.test.len(), 12);
    }

    #[test]
    fn test_fit_evaluate_and_save() {
        let file = reviews_file();
        let (pipeline, storage) = pipeline(&file);

        let dataset = pipeline.extract().unwrap();
        let split = pipeline.split(&dataset).unwrap();
        let outcome = pipeline.fit(&dataset, &split.train).unwrap();
        assert_eq!(outcome.training_rows, 48);

        let metrics = pipeline.evaluate(&outcome.model, &split.test).unwrap();
        assert!((metrics.accuracy - 1.0).abs() < 1e-9);

        let path = pipeline
            .save(&outcome, split.test.len(), Some(&metrics))
            .unwrap();
        assert!(path.ends_with("model.zip"));

        let bytes = storage.get_file("model.zip").unwrap();
        let decoded = artifact::decode(&bytes).unwrap();
        assert_eq!(decoded.metadata.validation_rows, 12);
        let saved = decoded.metadata.metrics.unwrap();
        assert_eq!(saved.confusion_matrix, metrics.confusion_matrix);
        assert!((saved.accuracy - metrics.accuracy).abs() < 1e-12);
        assert_eq!(decoded.schema, *dataset.schema());
    }

    #[test]
    fn test_strongest_features_are_named_and_ordered() {
        let options = FeaturizerOptions {
            char_ngram_length: 0,
            ..FeaturizerOptions::default()
        };
        let featurizer = TextFeaturizer::fit(options, ["bad food", "good"]);
        let strongest = log_strongest_features(&featurizer, &[0.5, 0.0, -2.0]);

        assert_eq!(
            strongest,
            vec![("w:good".to_string(), -2.0), ("w:bad".to_string(), 0.5)]
        );
    }

    #[test]
    fn test_extract_missing_file() {
        let storage = MockStorage::default();
        let config = MockConfig {
            input_path: "/no/such/reviews.tsv".to_string(),
        };
        let pipeline = SentimentPipeline::new(storage, config);
        assert!(matches!(pipeline.extract(), Err(PipelineError::IoError(_))));
    }
}
