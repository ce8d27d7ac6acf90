pub mod loader;
pub mod split;

pub use loader::{DataOptions, DatasetSchema, MalformedRowPolicy, SentimentDataset};
pub use split::{planned_sizes, train_test_split, SplitOptions};
