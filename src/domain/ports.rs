use crate::data::loader::{DataOptions, SentimentDataset};
use crate::data::split::SplitOptions;
use crate::domain::model::{SentimentRecord, TrainTestSplit, TrainingOutcome};
use crate::ml::featurizer::FeaturizerOptions;
use crate::ml::logistic::LbfgsOptions;
use crate::ml::metrics::BinaryClassificationMetrics;
use crate::ml::TrainedModel;
use crate::utils::error::Result;

pub trait Storage {
    fn write_file(&self, path: &str, data: &[u8]) -> Result<()>;
}

pub trait ConfigProvider {
    fn pipeline_name(&self) -> &str;
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn model_file(&self) -> &str;
    fn data_options(&self) -> DataOptions;
    fn split_options(&self) -> SplitOptions;
    fn featurizer_options(&self) -> FeaturizerOptions;
    fn trainer_options(&self) -> LbfgsOptions;
}

pub trait Pipeline {
    fn extract(&self) -> Result<SentimentDataset>;
    fn split(&self, dataset: &SentimentDataset) -> Result<TrainTestSplit>;
    fn fit(&self, dataset: &SentimentDataset, train: &[SentimentRecord]) -> Result<TrainingOutcome>;
    fn evaluate(
        &self,
        model: &TrainedModel,
        validation: &[SentimentRecord],
    ) -> Result<BinaryClassificationMetrics>;
    fn save(
        &self,
        outcome: &TrainingOutcome,
        validation_rows: usize,
        metrics: Option<&BinaryClassificationMetrics>,
    ) -> Result<String>;
}
