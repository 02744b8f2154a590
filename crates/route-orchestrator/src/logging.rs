//! Structured, per-job logging helper.
//!
//! Every call stamps the job's `output_id` and current pipeline `stage`
//! onto the emitted event so log lines for concurrent jobs stay
//! distinguishable in aggregate log output.

use route_models::JobStage;

pub struct JobLogger {
    output_id: String,
    stage: JobStage,
}

impl JobLogger {
    pub fn new(output_id: impl Into<String>, stage: JobStage) -> Self {
        Self {
            output_id: output_id.into(),
            stage,
        }
    }

    pub fn output_id(&self) -> &str {
        &self.output_id
    }

    pub fn log_start(&self) {
        tracing::info!(output_id = %self.output_id, stage = ?self.stage, "stage started");
    }

    pub fn log_progress(&self, percent: u8, message: &str) {
        tracing::info!(output_id = %self.output_id, stage = ?self.stage, percent, message, "progress");
    }

    pub fn log_warning(&self, message: &str) {
        tracing::warn!(output_id = %self.output_id, stage = ?self.stage, message, "warning");
    }

    pub fn log_error(&self, message: &str) {
        tracing::error!(output_id = %self.output_id, stage = ?self.stage, message, "error");
    }

    pub fn log_completion(&self) {
        tracing::info!(output_id = %self.output_id, stage = ?self.stage, "stage completed");
    }

    pub fn create_span(&self) -> tracing::Span {
        tracing::info_span!("job", output_id = %self.output_id, stage = ?self.stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carries_output_id_and_stage() {
        let logger = JobLogger::new("abc123", JobStage::Analyze);
        assert_eq!(logger.output_id(), "abc123");
        logger.log_start();
        logger.log_completion();
    }
}
