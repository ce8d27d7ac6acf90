pub mod featurizer;
pub mod lbfgs;
pub mod logistic;
pub mod metrics;

use featurizer::TextFeaturizer;
use logistic::{LogisticRegressionModel, Prediction};
use serde::{Deserialize, Serialize};

/// Featurizer followed by the classifier; what gets fitted and persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub featurizer: TextFeaturizer,
    pub classifier: LogisticRegressionModel,
}

impl TrainedModel {
    pub fn predict(&self, text: &str) -> Prediction {
        self.classifier.predict(&self.featurizer.transform(text))
    }

    pub fn predict_batch<'a, I>(&self, texts: I) -> Vec<Prediction>
    where
        I: IntoIterator<Item = &'a str>,
    {
        texts.into_iter().map(|t| self.predict(t)).collect()
    }
}
