pub mod artifact;
pub mod engine;
pub mod pipeline;

pub use crate::domain::model::{SentimentRecord, TrainTestSplit, TrainingOutcome, TrainingReport};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
