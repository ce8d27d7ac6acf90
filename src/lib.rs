pub mod config;
pub mod core;
pub mod data;
pub mod domain;
pub mod ml;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{cli::LocalStorage, toml_config::TomlConfig};
pub use core::{engine::TrainingEngine, pipeline::SentimentPipeline};
pub use ml::TrainedModel;
pub use utils::error::{PipelineError, Result};
