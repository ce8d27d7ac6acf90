use crate::core::{Pipeline, TrainingReport};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct TrainingEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> TrainingEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn run(&self) -> Result<TrainingReport> {
        tracing::info!("Starting training run");
        self.monitor.log_stats("Start");

        // Extract
        let dataset = self.pipeline.extract()?;
        tracing::info!("Input: {}", dataset.path().display());

        // Split
        let split = self.pipeline.split(&dataset)?;
        tracing::info!(
            "Split into {} training and {} validation rows",
            split.train.len(),
            split.test.len()
        );
        self.monitor.log_stats("Load");

        // Fit
        let outcome = self.pipeline.fit(&dataset, &split.train)?;
        tracing::info!(
            "Model trained in {} iterations (converged: {})",
            outcome.summary.iterations,
            outcome.summary.converged
        );
        self.monitor.log_stats("Fit");

        // Evaluate
        let metrics = if split.test.is_empty() {
            tracing::warn!("Validation set is empty, skipping evaluation");
            None
        } else {
            let metrics = self.pipeline.evaluate(&outcome.model, &split.test)?;
            tracing::info!("Validation metrics: {}", metrics);
            Some(metrics)
        };
        self.monitor.log_stats("Evaluate");

        // Save
        let output_path = self
            .pipeline
            .save(&outcome, split.test.len(), metrics.as_ref())?;
        tracing::info!("Model saved to: {}", output_path);
        self.monitor.log_final_stats();

        Ok(TrainingReport {
            output_path,
            training_rows: outcome.training_rows,
            validation_rows: split.test.len(),
            summary: outcome.summary,
            metrics,
        })
    }
}
